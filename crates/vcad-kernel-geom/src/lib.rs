#![warn(missing_docs)]

//! Mesh and polygon data types shared by the vcad kernel crates.
//!
//! A [`Mesh3`] is an indexed triangle soup with a per-triangle original-ID
//! tag, used to carry material/part provenance through boolean operations.
//! A [`Polygon2`] is a (possibly multi-contour) 2D cross-section, the input
//! and output type of all 2D kernel operations.

use serde::{Deserialize, Serialize};
use vcad_kernel_math::{Point2, Point3, Vec3};

/// Opaque identifier tracking which original primitive a face/edge came
/// from, surviving boolean operations (union/difference/intersection).
///
/// `None` means "no original owner" (e.g. a face introduced by a cut).
pub type OriginalId = Option<u64>;

/// An axis-aligned bounding box in 3D.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds3 {
    /// Minimum corner.
    pub min: Point3,
    /// Maximum corner.
    pub max: Point3,
}

impl Bounds3 {
    /// An empty bounds (no points). `union`-ing into this yields the other.
    pub fn empty() -> Self {
        Self {
            min: Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            max: Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    /// True if this bounds contains no points.
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Grow to include `p`.
    pub fn include(&mut self, p: &Point3) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.min.z = self.min.z.min(p.z);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
        self.max.z = self.max.z.max(p.z);
    }

    /// Union of two bounds.
    pub fn union(&self, other: &Bounds3) -> Self {
        let mut b = *self;
        b.include(&other.min);
        b.include(&other.max);
        b
    }

    /// True if the two bounds overlap (touching counts as overlap).
    pub fn overlaps(&self, other: &Bounds3) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// Size along each axis.
    pub fn size(&self) -> Vec3 {
        Vec3::new(self.max.x - self.min.x, self.max.y - self.min.y, self.max.z - self.min.z)
    }

    /// Center point.
    pub fn center(&self) -> Point3 {
        nalgebra::center(&self.min, &self.max)
    }

    /// Length of the diagonal.
    pub fn diagonal(&self) -> f64 {
        (self.max - self.min).norm()
    }
}

/// An axis-aligned bounding box in 2D.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds2 {
    /// Minimum corner.
    pub min: Point2,
    /// Maximum corner.
    pub max: Point2,
}

impl Bounds2 {
    /// An empty bounds.
    pub fn empty() -> Self {
        Self {
            min: Point2::new(f64::INFINITY, f64::INFINITY),
            max: Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    /// True if this bounds contains no points.
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y
    }

    /// Grow to include `p`.
    pub fn include(&mut self, p: &Point2) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
    }

    /// Union of two bounds.
    pub fn union(&self, other: &Bounds2) -> Self {
        let mut b = *self;
        b.include(&other.min);
        b.include(&other.max);
        b
    }

    /// True if the two bounds overlap.
    pub fn overlaps(&self, other: &Bounds2) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }
}

/// A triangle in a [`Mesh3`], stored as three vertex indices plus the
/// original-ID of the face it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Triangle {
    /// Vertex indices into the owning mesh's `vertices`, CCW winding when
    /// viewed from outside the solid.
    pub indices: [u32; 3],
    /// Original-ID of the source face, for material/part provenance.
    pub original_id: Option<u64>,
}

/// An indexed triangle mesh with per-triangle original-ID provenance.
///
/// This is the sole geometric representation the 3D kernel operates on —
/// there is no separate B-rep topology layer. Booleans, transforms and
/// tessellation all read and produce `Mesh3`.
#[derive(Debug, Clone, Default)]
pub struct Mesh3 {
    /// Vertex positions.
    pub vertices: Vec<Point3>,
    /// Triangles referencing `vertices`.
    pub triangles: Vec<Triangle>,
}

impl Mesh3 {
    /// An empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of triangles.
    pub fn num_triangles(&self) -> usize {
        self.triangles.len()
    }

    /// Number of vertices.
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// True if this mesh has no geometry.
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Append `other`'s vertices and triangles, offsetting indices.
    pub fn merge(&mut self, other: &Mesh3) {
        let offset = self.vertices.len() as u32;
        self.vertices.extend(other.vertices.iter().copied());
        self.triangles.extend(other.triangles.iter().map(|t| Triangle {
            indices: [t.indices[0] + offset, t.indices[1] + offset, t.indices[2] + offset],
            original_id: t.original_id,
        }));
    }

    /// Axis-aligned bounding box of all vertices actually referenced by a
    /// triangle. Empty if the mesh has no triangles.
    pub fn bounds(&self) -> Bounds3 {
        let mut b = Bounds3::empty();
        for tri in &self.triangles {
            for &i in &tri.indices {
                b.include(&self.vertices[i as usize]);
            }
        }
        b
    }

    /// Triangle vertex positions as three points.
    pub fn triangle_points(&self, tri: &Triangle) -> [Point3; 3] {
        [
            self.vertices[tri.indices[0] as usize],
            self.vertices[tri.indices[1] as usize],
            self.vertices[tri.indices[2] as usize],
        ]
    }

    /// Signed volume via the divergence theorem (sum of signed tetrahedron
    /// volumes from the origin). Valid for closed, consistently-wound
    /// meshes.
    pub fn signed_volume(&self) -> f64 {
        self.triangles
            .iter()
            .map(|t| {
                let [a, b, c] = self.triangle_points(t);
                a.coords.dot(&b.coords.cross(&c.coords)) / 6.0
            })
            .sum()
    }

    /// Surface area, summed over all triangles.
    pub fn surface_area(&self) -> f64 {
        self.triangles
            .iter()
            .map(|t| {
                let [a, b, c] = self.triangle_points(t);
                (b - a).cross(&(c - a)).norm() * 0.5
            })
            .sum()
    }
}

/// A single closed contour in a [`Polygon2`], a sequence of points with an
/// implicit closing edge back to the first point.
pub type Contour2 = Vec<Point2>;

/// A 2D cross-section made of one or more contours (outer boundaries and
/// holes), the sole geometric representation the 2D kernel operates on.
///
/// Winding order determines fill: counter-clockwise contours are solid
/// material, clockwise contours are holes, matching the convention used by
/// `Manifold`'s `CrossSection` and mirrored here for the 2D adapter.
#[derive(Debug, Clone, Default)]
pub struct Polygon2 {
    /// The contours making up this cross-section.
    pub contours: Vec<Contour2>,
}

impl Polygon2 {
    /// An empty cross-section.
    pub fn new() -> Self {
        Self::default()
    }

    /// True if this cross-section has no contours.
    pub fn is_empty(&self) -> bool {
        self.contours.iter().all(|c| c.len() < 3)
    }

    /// Bounding box over all contour points.
    pub fn bounds(&self) -> Bounds2 {
        let mut b = Bounds2::empty();
        for contour in &self.contours {
            for p in contour {
                b.include(p);
            }
        }
        b
    }

    /// Signed area of a single contour (positive if CCW).
    pub fn contour_signed_area(contour: &[Point2]) -> f64 {
        if contour.len() < 3 {
            return 0.0;
        }
        let mut area = 0.0;
        for i in 0..contour.len() {
            let a = contour[i];
            let b = contour[(i + 1) % contour.len()];
            area += a.x * b.y - b.x * a.y;
        }
        area * 0.5
    }

    /// Total unsigned area (outer contours minus holes).
    pub fn area(&self) -> f64 {
        self.contours.iter().map(|c| Self::contour_signed_area(c)).sum::<f64>().abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds3_overlap() {
        let a = Bounds3 { min: Point3::new(0.0, 0.0, 0.0), max: Point3::new(1.0, 1.0, 1.0) };
        let b = Bounds3 { min: Point3::new(0.5, 0.5, 0.5), max: Point3::new(2.0, 2.0, 2.0) };
        let c = Bounds3 { min: Point3::new(5.0, 5.0, 5.0), max: Point3::new(6.0, 6.0, 6.0) };
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
    }

    #[test]
    fn mesh_merge_offsets_indices() {
        let mut a = Mesh3 {
            vertices: vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0), Point3::new(0.0, 1.0, 0.0)],
            triangles: vec![Triangle { indices: [0, 1, 2], original_id: Some(1) }],
        };
        let b = Mesh3 {
            vertices: vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0), Point3::new(0.0, 1.0, 0.0)],
            triangles: vec![Triangle { indices: [0, 1, 2], original_id: Some(2) }],
        };
        a.merge(&b);
        assert_eq!(a.num_vertices(), 6);
        assert_eq!(a.triangles[1].indices, [3, 4, 5]);
    }

    #[test]
    fn polygon_winding_area_sign() {
        let ccw = vec![Point2::new(0.0, 0.0), Point2::new(1.0, 0.0), Point2::new(1.0, 1.0), Point2::new(0.0, 1.0)];
        let cw: Vec<_> = ccw.iter().rev().copied().collect();
        assert!(Polygon2::contour_signed_area(&ccw) > 0.0);
        assert!(Polygon2::contour_signed_area(&cw) < 0.0);
    }

    #[test]
    fn cube_volume_via_divergence() {
        // unit cube, two triangles per face, CCW from outside
        let v = vec![
            Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0), Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0), Point3::new(1.0, 0.0, 1.0),
            Point3::new(1.0, 1.0, 1.0), Point3::new(0.0, 1.0, 1.0),
        ];
        let tri = |a: u32, b: u32, c: u32| Triangle { indices: [a, b, c], original_id: None };
        let triangles = vec![
            tri(0, 3, 2), tri(0, 2, 1), // bottom z=0
            tri(4, 5, 6), tri(4, 6, 7), // top z=1
            tri(0, 1, 5), tri(0, 5, 4), // y=0
            tri(3, 7, 6), tri(3, 6, 2), // y=1
            tri(0, 4, 7), tri(0, 7, 3), // x=0
            tri(1, 2, 6), tri(1, 6, 5), // x=1
        ];
        let mesh = Mesh3 { vertices: v, triangles };
        assert!((mesh.signed_volume().abs() - 1.0).abs() < 1e-9);
    }
}
