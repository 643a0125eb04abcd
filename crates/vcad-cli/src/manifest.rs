//! `vcad.toml` project manifest: a minimal, serializable model list so the
//! CLI has something concrete to build and export without a plugin or
//! dynamic-loading mechanism. Library consumers embedding `vcad` in their
//! own binary construct `Project`/`Model` directly in Rust instead; this
//! manifest only exists to give `vcad-cli` a standalone surface.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use vcad::builders::{boxed, Composite, PrimitiveShape, TransformBuilder};
use vcad::project::Model;
use vcad::Geometry;
use vcad_ir::{Affine3, BooleanKind, Dim3, Node};

/// Top-level `vcad.toml` contents.
#[derive(Debug, Deserialize)]
pub struct Manifest {
    /// Every declared model, in file order.
    #[serde(default, rename = "model")]
    pub models: Vec<ModelSpec>,
}

/// One `[[model]]` table.
#[derive(Debug, Deserialize)]
pub struct ModelSpec {
    /// The model's name, used as the exported file stem.
    pub name: String,
    /// What kind of node this model lowers to; see [`ShapeKind`].
    pub shape: ShapeKind,
    /// Primitive size, for `cuboid`.
    #[serde(default)]
    pub size: Option<[f64; 3]>,
    /// Primitive radius, for `sphere`/`cylinder`.
    #[serde(default)]
    pub radius: Option<f64>,
    /// Top radius, for `cylinder` (defaults to `radius`, giving a plain
    /// cylinder rather than a frustum).
    #[serde(default)]
    pub top_radius: Option<f64>,
    /// Height, for `cylinder`.
    #[serde(default)]
    pub height: Option<f64>,
    /// Facet count for curved primitives.
    #[serde(default = "default_segments")]
    pub segments: u32,
    /// Other models this one operates on, for `union`/`difference`/
    /// `intersection`, referenced by name and resolved in declaration
    /// order (so a model can only reference ones declared earlier).
    #[serde(default)]
    pub of: Vec<String>,
    /// A translation applied to the finished node.
    #[serde(default)]
    pub translate: Option<[f64; 3]>,
}

fn default_segments() -> u32 {
    32
}

/// The shape or combinator a [`ModelSpec`] lowers to.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKind {
    /// An axis-aligned box (`size`).
    Cuboid,
    /// A sphere (`radius`, `segments`).
    Sphere,
    /// A cylinder or frustum (`radius`, `top_radius`, `height`, `segments`).
    Cylinder,
    /// The union of `of`.
    Union,
    /// `of[0]` minus `of[1..]`.
    Difference,
    /// The overlap of `of`.
    Intersection,
}

/// An error resolving a manifest into buildable models.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    /// `of` named a model not yet declared.
    #[error("model {0:?} references undeclared model {1:?}")]
    UndeclaredReference(String, String),
    /// A primitive was missing a field its shape requires.
    #[error("model {0:?} ({1:?}) is missing required field {2:?}")]
    MissingField(String, ShapeKind, &'static str),
}

/// Resolve a manifest's models into buildable [`Model`]s, in declaration
/// order. Boolean combinators may reference any model declared earlier in
/// the same manifest.
pub fn resolve(manifest: &Manifest) -> Result<Vec<Model>, ManifestError> {
    let mut built: HashMap<String, Arc<dyn Geometry<Dim3>>> = HashMap::new();
    let mut models = Vec::with_capacity(manifest.models.len());

    for spec in &manifest.models {
        let geometry = lower(spec, &built)?;
        let shared: Arc<dyn Geometry<Dim3>> = Arc::from(geometry);
        built.insert(spec.name.clone(), shared.clone());
        models.push(Model::solid(spec.name.clone(), shared));
    }

    Ok(models)
}

fn lower(spec: &ModelSpec, built: &HashMap<String, Arc<dyn Geometry<Dim3>>>) -> Result<Box<dyn Geometry<Dim3>>, ManifestError> {
    let node = match spec.shape {
        ShapeKind::Cuboid => {
            let [x, y, z] = spec.size.ok_or(ManifestError::MissingField(spec.name.clone(), spec.shape, "size"))?;
            Some(Node::cuboid(x, y, z))
        }
        ShapeKind::Sphere => {
            let r = spec.radius.ok_or(ManifestError::MissingField(spec.name.clone(), spec.shape, "radius"))?;
            Some(Node::sphere(r, spec.segments))
        }
        ShapeKind::Cylinder => {
            let r = spec.radius.ok_or(ManifestError::MissingField(spec.name.clone(), spec.shape, "radius"))?;
            let h = spec.height.ok_or(ManifestError::MissingField(spec.name.clone(), spec.shape, "height"))?;
            Some(Node::cylinder(r, spec.top_radius.unwrap_or(r), h, spec.segments))
        }
        ShapeKind::Union | ShapeKind::Difference | ShapeKind::Intersection => None,
    };

    let geometry: Box<dyn Geometry<Dim3>> = if let Some(node) = node {
        boxed(PrimitiveShape::new(node))
    } else {
        let kind = match spec.shape {
            ShapeKind::Union => BooleanKind::Union,
            ShapeKind::Difference => BooleanKind::Difference,
            ShapeKind::Intersection => BooleanKind::Intersection,
            _ => unreachable!("primitive shapes handled above"),
        };
        let mut children = Vec::with_capacity(spec.of.len());
        for name in &spec.of {
            let child = built.get(name).ok_or_else(|| ManifestError::UndeclaredReference(spec.name.clone(), name.clone()))?;
            children.push(boxed(child.clone()));
        }
        boxed(Composite::new(kind, children))
    };

    Ok(match spec.translate {
        Some([x, y, z]) => {
            let shared: Arc<dyn Geometry<Dim3>> = Arc::from(geometry);
            boxed(TransformBuilder::new(shared, Affine3::translation(x, y, z)))
        }
        None => geometry,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difference_requires_earlier_declaration() {
        let manifest = Manifest {
            models: vec![ModelSpec {
                name: "bracket".into(),
                shape: ShapeKind::Difference,
                size: None,
                radius: None,
                top_radius: None,
                height: None,
                segments: 32,
                of: vec!["missing".into()],
                translate: None,
            }],
        };
        assert!(resolve(&manifest).is_err());
    }

    #[test]
    fn cuboid_spec_resolves() {
        let manifest = Manifest {
            models: vec![ModelSpec {
                name: "block".into(),
                shape: ShapeKind::Cuboid,
                size: Some([1.0, 2.0, 3.0]),
                radius: None,
                top_radius: None,
                height: None,
                segments: 32,
                of: Vec::new(),
                translate: None,
            }],
        };
        assert!(resolve(&manifest).is_ok());
    }
}
