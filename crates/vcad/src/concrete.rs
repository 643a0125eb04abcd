//! Kernel-level evaluation results.

use std::collections::HashSet;
use vcad_ir::OriginalIdKey;

/// The outcome of evaluating an IR node all the way down to a concrete
/// kernel value: the primitive itself, plus every original-ID that
/// appears somewhere in it (so exporters can look each one up in
/// [`vcad_ir::ResultElements::material_record`] without re-walking the
/// mesh/polygon).
#[derive(Debug, Clone)]
pub struct ConcreteResult<C> {
    /// The concrete cross-section or manifold.
    pub primitive: C,
    /// Every original-ID assigned somewhere within `primitive`.
    pub original_ids: HashSet<OriginalIdKey>,
}

impl<C> ConcreteResult<C> {
    /// A result with no recorded original IDs.
    pub fn bare(primitive: C) -> Self {
        Self { primitive, original_ids: HashSet::new() }
    }
}
