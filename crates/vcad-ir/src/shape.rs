//! Primitive shape payloads and the parameters of the dimension-specific
//! node operations (offset, projection, extrusion).

use crate::{QVec2, QVec3, Quantized};
use serde::{Deserialize, Serialize};

/// Polygon fill rule, governing how self-intersecting or nested contours
/// resolve to solid material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FillRule {
    /// Winding number != 0 is solid.
    NonZero,
    /// Odd winding number is solid.
    EvenOdd,
    /// Winding number > 0 is solid.
    Positive,
    /// Winding number < 0 is solid.
    Negative,
}

impl Default for FillRule {
    fn default() -> Self {
        FillRule::NonZero
    }
}

/// The 2D primitive-shape sum type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Shape2D {
    /// An axis-aligned rectangle with corner at the origin.
    Rectangle {
        /// Width along X.
        width: Quantized,
        /// Height along Y.
        height: Quantized,
    },
    /// A regular polygon approximating a circle.
    Circle {
        /// Radius.
        radius: Quantized,
        /// Segment count.
        segments: u32,
    },
    /// An explicit point-loop polygon.
    Polygon {
        /// Vertex loop.
        points: Vec<QVec2>,
        /// How overlapping/nested contours resolve.
        fill_rule: FillRule,
    },
    /// The convex hull of a raw point set.
    ConvexHullPoints(Vec<QVec2>),
}

/// The 3D primitive-shape sum type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Shape3D {
    /// An axis-aligned box with corner at the origin.
    Cuboid(QVec3),
    /// A sphere centered at the origin.
    Sphere {
        /// Radius.
        radius: Quantized,
        /// Segment count.
        segments: u32,
    },
    /// A cylinder (or frustum) along Z.
    Cylinder {
        /// Radius at `z=0`.
        bottom_radius: Quantized,
        /// Radius at `z=height`.
        top_radius: Quantized,
        /// Height along Z.
        height: Quantized,
        /// Segment count.
        segments: u32,
    },
    /// The convex hull of a raw point set.
    ConvexHullPoints(Vec<QVec3>),
    /// An explicit indexed triangle mesh.
    Mesh {
        /// Vertex positions.
        vertices: Vec<QVec3>,
        /// Triangle vertex-index triples.
        faces: Vec<[u32; 3]>,
    },
}

/// How an [`crate::Node::offset`] rounds its corners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OffsetJoin {
    /// Sharp corners, capped by `miter_limit`.
    Miter,
    /// Rounded corners.
    Round,
    /// Flattened corners.
    Bevel,
    /// Square-extended corners.
    Square,
}

/// Parameters of an [`crate::Node::offset`] operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OffsetParams {
    /// Growth (positive) or shrink (negative) amount.
    pub amount: Quantized,
    /// Corner join style.
    pub join: OffsetJoin,
    /// Miter length cap, as a multiple of `amount` (minimum 2.0).
    pub miter_limit: Quantized,
    /// Circular segment count for round joins.
    pub segments: u32,
}

/// How a [`crate::Node::<crate::Dim2>::projection`] cuts a 3D child.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProjectionMode {
    /// The full silhouette, as seen looking down Z.
    Full,
    /// A single cross-section at the given `z`.
    Slice(Quantized),
}

/// How a [`crate::Node::<crate::Dim3>::extrusion`] sweeps a 2D child.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExtrusionMode {
    /// Linear extrusion from `z=0` to `z=height`, optionally twisting and
    /// scaling the top face relative to the bottom.
    Linear {
        /// Extrusion height.
        height: Quantized,
        /// Total twist applied to the top face, in degrees.
        twist_degrees: Quantized,
        /// Number of intermediate cross-sections (0 = just top/bottom).
        divisions: u32,
        /// Non-uniform scale applied to the top face.
        top_scale: QVec2,
    },
    /// Revolve around the Z axis.
    Rotational {
        /// Revolution angle in degrees (360 for a full revolution).
        angle_degrees: Quantized,
        /// Segment count.
        segments: u32,
    },
}
