//! The immutable, downward-threaded build environment.

use crate::{Affine3, Compose, FillRule};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Mesh/polygon segmentation strategy for curved primitives (circles,
/// spheres, cylinders).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Segmentation {
    /// A fixed segment count, regardless of size.
    Fixed(u32),
    /// Segment count derived from the curve's size so that facets never
    /// exceed `min_angle_deg` of arc or `min_size` of chord length.
    Adaptive {
        /// Minimum angle per segment, in degrees.
        min_angle_deg: f64,
        /// Minimum chord length per segment.
        min_size: f64,
    },
}

impl Default for Segmentation {
    fn default() -> Self {
        Segmentation::Adaptive { min_angle_deg: 2.0, min_size: 0.15 }
    }
}

/// Whether the current subtree lies beneath a positive (additive) or
/// negative (subtracted) branch of a difference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationSign {
    /// Contributes material.
    Addition,
    /// Removes material from an ancestor's positive branch.
    Subtraction,
}

impl Default for OperationSign {
    fn default() -> Self {
        OperationSign::Addition
    }
}

/// The immutable map threaded downward through every build. Library-level
/// geometry may stash extra opaque keys (`overhangAngle`,
/// `naturalUpDirection`, ...) in `extensions` without the core needing to
/// know about them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Environment {
    /// Curve/sphere/cylinder facet density.
    pub segmentation: Segmentation,
    /// Default polygon fill rule for 2D shapes built under this branch.
    pub fill_rule: FillRule,
    /// Default offset miter cap, at least 2.0.
    pub miter_limit: f64,
    /// Whether the current branch adds or subtracts material.
    pub operation: OperationSign,
    /// Accumulated 3D affine transform from the root to this point,
    /// independent of IR `Transform` nodes; geometry that needs its
    /// absolute orientation (overhang teardrops, natural-up alignment)
    /// reads this rather than walking the IR.
    pub accumulated_transform: Affine3,
    /// Library-level, core-opaque keys (overhang angle, natural-up
    /// direction, circular-overhang method, ...).
    pub extensions: HashMap<String, serde_json::Value>,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            segmentation: Segmentation::default(),
            fill_rule: FillRule::default(),
            miter_limit: 2.0,
            operation: OperationSign::default(),
            accumulated_transform: Affine3::identity(),
            extensions: HashMap::new(),
        }
    }
}

impl Environment {
    /// Derive an environment for a child built under an additional
    /// transform `t`, composing it into `accumulated_transform`.
    pub fn applying_transform(&self, t: &Affine3) -> Self {
        Self { accumulated_transform: self.accumulated_transform.compose(t), ..self.clone() }
    }

    /// Derive the environment passed to a difference's subtrahends
    /// (children 2..N): `operation` flips to `Subtraction`.
    pub fn flipped_for_subtraction(&self) -> Self {
        Self { operation: OperationSign::Subtraction, ..self.clone() }
    }

    /// Read a library-level opaque extension key.
    pub fn extension(&self, key: &str) -> Option<&serde_json::Value> {
        self.extensions.get(key)
    }

    /// Derive an environment with an extension key set, e.g. for
    /// `overhangAngle` propagation.
    pub fn with_extension(&self, key: impl Into<String>, value: serde_json::Value) -> Self {
        let mut extensions = self.extensions.clone();
        extensions.insert(key.into(), value);
        Self { extensions, ..self.clone() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_segmentation_is_adaptive_two_degrees() {
        match Environment::default().segmentation {
            Segmentation::Adaptive { min_angle_deg, min_size } => {
                assert_eq!(min_angle_deg, 2.0);
                assert_eq!(min_size, 0.15);
            }
            Segmentation::Fixed(_) => panic!("expected adaptive default"),
        }
    }

    #[test]
    fn applying_transform_composes_into_accumulated() {
        let env = Environment::default();
        let t1 = Affine3::translation(1.0, 0.0, 0.0);
        let t2 = Affine3::translation(0.0, 2.0, 0.0);
        let child = env.applying_transform(&t1).applying_transform(&t2);
        let direct = env.applying_transform(&t1.compose(&t2));
        assert_eq!(child.accumulated_transform, direct.accumulated_transform);
    }

    #[test]
    fn flipped_for_subtraction_toggles_operation() {
        let env = Environment::default();
        assert_eq!(env.operation, OperationSign::Addition);
        assert_eq!(env.flipped_for_subtraction().operation, OperationSign::Subtraction);
    }
}
