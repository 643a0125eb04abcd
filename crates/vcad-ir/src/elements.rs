//! The auxiliary metadata channel that rides alongside a [`crate::Node`]
//! through every build: part catalogs, material assignments, document
//! metadata, and diagnostics. Each field defines its own combine rule,
//! applied when a composite boolean merges its children's elements.

use crate::{BooleanKind, Dim3, Node, OriginalIdKey};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Whether a [`Part`] contributes to the manifold solid, a visual-only
/// overlay, or context geometry excluded from both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Semantic {
    /// Counts toward the manufacturable solid.
    Solid,
    /// Rendered but not manufactured.
    Visual,
    /// Neither rendered nor manufactured; reference geometry only.
    Context,
}

/// A named, semantically-tagged sub-assembly key in the part catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Part {
    /// The part's name, as given to `.inPart(name, semantic)`.
    pub name: String,
    /// What the part contributes to export.
    pub semantic: Semantic,
}

impl Part {
    /// Construct a part key.
    pub fn new(name: impl Into<String>, semantic: Semantic) -> Self {
        Self { name: name.into(), semantic }
    }
}

/// A material assigned to an original-ID via [`crate::Node::tagged`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialAssignment {
    /// Display name.
    pub name: String,
    /// Base color, linear RGB.
    pub color: [f64; 3],
    /// Metallic factor, 0.0 to 1.0.
    pub metallic: f64,
    /// Roughness factor, 0.0 to 1.0.
    pub roughness: f64,
}

impl MaterialAssignment {
    /// A plain-color, fully rough, non-metallic material.
    pub fn matte(name: impl Into<String>, color: [f64; 3]) -> Self {
        Self { name: name.into(), color, metallic: 0.0, roughness: 1.0 }
    }
}

/// The typed metadata map carried by a [`crate::BuildResult`].
///
/// Every field has its own per-[`BooleanKind`] combine rule, applied by
/// [`ResultElements::combine`] when a composite boolean's children's
/// elements are merged into the parent's.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultElements {
    /// Named sub-parts, each a separately-exportable 3D node. Combine is
    /// per-key union: two children contributing the same `Part` have
    /// their nodes unioned together rather than one overwriting the other.
    pub part_catalog: HashMap<Part, Node<Dim3>>,
    /// Materials assigned via `Tagged`, keyed by the original-ID under
    /// which the kernel recorded the tagged subtree.
    pub material_record: HashMap<OriginalIdKey, MaterialAssignment>,
    /// Ordered document metadata (title, designer, description, license).
    pub metadata: Vec<(String, String)>,
    /// Named anchors/tags referenced but never defined, for diagnostics.
    pub reference_state: HashSet<String>,
    /// Sticky flag: true once any subtree used a debugging "only this"
    /// selector.
    pub has_only: bool,
    /// Non-fatal diagnostic strings attached via a debug annotation,
    /// reported at export time without altering geometry.
    pub warnings: Vec<String>,
}

impl ResultElements {
    /// Combine the elements of a boolean's children into one, per the
    /// rule for `kind`: union and intersection merge every field from
    /// every child; difference keeps only the first (positive) child's
    /// part catalog, since subtracted geometry isn't itself exportable,
    /// but still merges every other field from all children.
    pub fn combine(kind: BooleanKind, children: Vec<ResultElements>) -> Self {
        let mut iter = children.into_iter();
        let Some(mut acc) = iter.next() else { return Self::default() };

        match kind {
            BooleanKind::Union | BooleanKind::Intersection => {
                for child in iter {
                    acc.merge_part_catalog(child.part_catalog);
                    acc.merge_rest(child.material_record, child.metadata, child.reference_state, child.has_only, child.warnings);
                }
            }
            BooleanKind::Difference => {
                for child in iter {
                    acc.merge_rest(child.material_record, child.metadata, child.reference_state, child.has_only, child.warnings);
                }
            }
        }
        acc
    }

    fn merge_part_catalog(&mut self, other: HashMap<Part, Node<Dim3>>) {
        for (part, node) in other {
            self.part_catalog
                .entry(part)
                .and_modify(|existing| *existing = Node::union(existing.clone(), node.clone()))
                .or_insert(node);
        }
    }

    fn merge_rest(
        &mut self,
        material_record: HashMap<OriginalIdKey, MaterialAssignment>,
        metadata: Vec<(String, String)>,
        reference_state: HashSet<String>,
        has_only: bool,
        warnings: Vec<String>,
    ) {
        self.material_record.extend(material_record);
        self.metadata.extend(metadata);
        self.reference_state.extend(reference_state);
        self.has_only = self.has_only || has_only;
        self.warnings.extend(warnings);
    }

    /// Attach a part under `part`, unioning with any existing contents.
    pub fn with_part(mut self, part: Part, node: Node<Dim3>) -> Self {
        self.merge_part_catalog(HashMap::from([(part, node)]));
        self
    }

    /// Attach a non-fatal diagnostic.
    pub fn with_warning(mut self, message: impl Into<String>) -> Self {
        self.warnings.push(message.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Node;

    fn solid_part(name: &str) -> Part {
        Part::new(name, Semantic::Solid)
    }

    #[test]
    fn union_merges_catalogs_of_the_same_key() {
        let a = ResultElements::default().with_part(solid_part("a"), Node::<Dim3>::cuboid(1.0, 1.0, 1.0));
        let b = ResultElements::default().with_part(solid_part("a"), Node::<Dim3>::sphere(1.0, 16));
        let combined = ResultElements::combine(BooleanKind::Union, vec![a, b]);
        assert_eq!(combined.part_catalog.len(), 1);
        assert!(!combined.part_catalog[&solid_part("a")].is_empty());
    }

    #[test]
    fn difference_drops_negative_children_part_catalog() {
        let positive = ResultElements::default().with_part(solid_part("base"), Node::<Dim3>::cuboid(1.0, 1.0, 1.0));
        let negative = ResultElements::default().with_part(solid_part("hole"), Node::<Dim3>::sphere(1.0, 16));
        let combined = ResultElements::combine(BooleanKind::Difference, vec![positive, negative]);
        assert_eq!(combined.part_catalog.len(), 1);
        assert!(combined.part_catalog.contains_key(&solid_part("base")));
    }

    #[test]
    fn difference_still_merges_warnings_from_negative_children() {
        let positive = ResultElements::default();
        let negative = ResultElements::default().with_warning("empty subtrahend");
        let combined = ResultElements::combine(BooleanKind::Difference, vec![positive, negative]);
        assert_eq!(combined.warnings, vec!["empty subtrahend".to_string()]);
    }
}
