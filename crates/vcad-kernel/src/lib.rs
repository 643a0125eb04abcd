#![warn(missing_docs)]

//! CAD kernel facade for vcad.
//!
//! Exposes the kernel contract the core evaluation pipeline builds
//! against: [`CrossSection`] for 2D cross-sections and [`Manifold`] for 3D
//! solids, each implemented by a concrete facade type ([`CrossSectionImpl`],
//! [`ManifoldImpl`]) backed by the math/geom/primitives/tessellate/booleans
//! crates.

pub use vcad_kernel_booleans;
pub use vcad_kernel_geom;
pub use vcad_kernel_math;
pub use vcad_kernel_primitives;
pub use vcad_kernel_tessellate;

use std::collections::HashMap;

use thiserror::Error;
use vcad_kernel_booleans::BooleanOp;
use vcad_kernel_geom::{Bounds2, Bounds3, Contour2, Mesh3, Polygon2, Triangle};
use vcad_kernel_math::{Point2, Point3, Transform, Transform2, Vec2, Vec3};

/// Errors the kernel can report.
///
/// Geometry itself never fails — empty or degenerate input produces an
/// empty result, never an error — these are reserved for inputs the kernel
/// cannot represent at all.
#[derive(Debug, Error)]
pub enum KernelError {
    /// A mesh supplied to [`Manifold::from_mesh`] isn't a valid manifold
    /// (self-intersecting, non-manifold edges, inconsistent winding).
    #[error("mesh is not manifold")]
    NotManifold,
    /// An internal kernel invariant was violated.
    #[error("kernel internal error: {0}")]
    KernelInternal(String),
}

/// The 2D cross-section kernel contract.
pub trait CrossSection: Sized + Clone {
    /// An axis-aligned rectangle with corner at the origin.
    fn square(size: Vec2) -> Self;
    /// A regular polygon approximating a circle.
    fn circle(radius: f64, segments: u32) -> Self;
    /// A cross-section from an explicit point loop.
    fn polygon(points: Vec<Point2>) -> Self;
    /// Union of `self` and `other`.
    fn union(&self, other: &Self) -> Self;
    /// `self` minus `other`.
    fn difference(&self, other: &Self) -> Self;
    /// Overlap of `self` and `other`.
    fn intersection(&self, other: &Self) -> Self;
    /// Apply an affine transform.
    fn transform(&self, t: &Transform2) -> Self;
    /// Convex hull of this cross-section's vertices.
    fn convex_hull(&self) -> Self;
    /// Grow (positive) or shrink (negative) the boundary by `delta`,
    /// rendering rounded corners with `segments_per_circle` segments.
    fn offset(&self, delta: f64, segments_per_circle: u32) -> Self;
    /// Axis-aligned bounds.
    fn bounds(&self) -> Bounds2;
    /// The contours making up this cross-section.
    fn contours(&self) -> &[Contour2];
}

/// The 3D manifold kernel contract.
pub trait Manifold: Sized + Clone {
    /// An axis-aligned box with corner at the origin.
    fn cuboid(size: Vec3) -> Self;
    /// A sphere centered at the origin.
    fn sphere(radius: f64, segments: u32) -> Self;
    /// A cylinder (or frustum, if the radii differ) along Z.
    fn cylinder(radius_bottom: f64, radius_top: f64, height: f64, segments: u32) -> Self;
    /// Build from an explicit vertex/triangle-index mesh. Errors if the
    /// mesh isn't manifold (unpaired edges).
    fn from_mesh(vertices: Vec<Point3>, triangles: Vec<[u32; 3]>) -> Result<Self, KernelError>;
    /// Union of `self` and `other`.
    fn union(&self, other: &Self) -> Self;
    /// `self` minus `other`.
    fn difference(&self, other: &Self) -> Self;
    /// Overlap of `self` and `other`.
    fn intersection(&self, other: &Self) -> Self;
    /// Apply an affine transform.
    fn transform(&self, t: &Transform) -> Self;
    /// Convex hull of this solid's vertices.
    fn convex_hull(&self) -> Self;
    /// Warp every vertex through an arbitrary function.
    fn warp(&self, f: impl Fn(Point3) -> Point3) -> Self;
    /// Subdivide triangles until no edge exceeds `edge_length`.
    fn refine(&self, edge_length: f64) -> Self;
    /// The backing mesh.
    fn mesh(&self) -> &Mesh3;
    /// Axis-aligned bounds.
    fn bounds(&self) -> Bounds3;
    /// Split into one [`Manifold`] per connected component.
    fn connected_components(&self) -> Vec<Self>;
    /// Run-length encoding of each triangle's original-ID, in triangle
    /// order — `(id, run_length)` pairs.
    fn original_id_runs(&self) -> Vec<(Option<u64>, usize)>;
}

/// A concrete 2D cross-section.
#[derive(Debug, Clone, Default)]
pub struct CrossSectionImpl(pub Polygon2);

impl CrossSection for CrossSectionImpl {
    fn square(size: Vec2) -> Self {
        Self(vcad_kernel_primitives::square(size))
    }

    fn circle(radius: f64, segments: u32) -> Self {
        Self(vcad_kernel_primitives::circle(radius, segments))
    }

    fn polygon(points: Vec<Point2>) -> Self {
        Self(vcad_kernel_primitives::polygon(points))
    }

    fn union(&self, other: &Self) -> Self {
        Self(vcad_kernel_booleans::boolean_2d(&self.0, &other.0, BooleanOp::Union))
    }

    fn difference(&self, other: &Self) -> Self {
        Self(vcad_kernel_booleans::boolean_2d(&self.0, &other.0, BooleanOp::Difference))
    }

    fn intersection(&self, other: &Self) -> Self {
        Self(vcad_kernel_booleans::boolean_2d(&self.0, &other.0, BooleanOp::Intersection))
    }

    fn transform(&self, t: &Transform2) -> Self {
        let contours = self
            .0
            .contours
            .iter()
            .map(|c| c.iter().map(|p| t.apply_point(p)).collect())
            .collect();
        Self(Polygon2 { contours })
    }

    fn convex_hull(&self) -> Self {
        let points: Vec<Point2> = self.0.contours.iter().flatten().copied().collect();
        Self(vcad_kernel_primitives::convex_hull_2d(&points))
    }

    fn offset(&self, delta: f64, segments_per_circle: u32) -> Self {
        Self(vcad_kernel_tessellate::offset(&self.0, delta, segments_per_circle))
    }

    fn bounds(&self) -> Bounds2 {
        self.0.bounds()
    }

    fn contours(&self) -> &[Contour2] {
        &self.0.contours
    }
}

impl CrossSectionImpl {
    /// Split into one cross-section per group of contours sharing an
    /// enclosing outer boundary.
    pub fn connected_components(&self) -> Vec<Self> {
        vcad_kernel_tessellate::connected_components_2d(&self.0).into_iter().map(Self).collect()
    }

    /// Triangulate for rendering/export.
    pub fn triangulate(&self) -> Vec<[Point2; 3]> {
        vcad_kernel_tessellate::triangulate(&self.0)
    }
}

/// A concrete 3D solid.
#[derive(Debug, Clone, Default)]
pub struct ManifoldImpl(pub Mesh3);

impl Manifold for ManifoldImpl {
    fn cuboid(size: Vec3) -> Self {
        Self(vcad_kernel_primitives::cube(size, None))
    }

    fn sphere(radius: f64, segments: u32) -> Self {
        Self(vcad_kernel_primitives::sphere(radius, segments, None))
    }

    fn cylinder(radius_bottom: f64, radius_top: f64, height: f64, segments: u32) -> Self {
        Self(vcad_kernel_primitives::cylinder(radius_bottom, radius_top, height, segments, None))
    }

    fn from_mesh(vertices: Vec<Point3>, triangles: Vec<[u32; 3]>) -> Result<Self, KernelError> {
        if vertices.is_empty() || triangles.is_empty() {
            return Ok(Self(Mesh3::new()));
        }
        let max_index = triangles.iter().flatten().copied().max().unwrap_or(0);
        if max_index as usize >= vertices.len() {
            return Err(KernelError::NotManifold);
        }
        let mesh = Mesh3 {
            vertices,
            triangles: triangles.into_iter().map(|indices| Triangle { indices, original_id: None }).collect(),
        };
        if !is_edge_manifold(&mesh) {
            return Err(KernelError::NotManifold);
        }
        Ok(Self(mesh))
    }

    fn union(&self, other: &Self) -> Self {
        Self(vcad_kernel_booleans::boolean_3d(&self.0, &other.0, BooleanOp::Union))
    }

    fn difference(&self, other: &Self) -> Self {
        Self(vcad_kernel_booleans::boolean_3d(&self.0, &other.0, BooleanOp::Difference))
    }

    fn intersection(&self, other: &Self) -> Self {
        Self(vcad_kernel_booleans::boolean_3d(&self.0, &other.0, BooleanOp::Intersection))
    }

    fn transform(&self, t: &Transform) -> Self {
        let vertices = self.0.vertices.iter().map(|p| t.apply_point(p)).collect();
        Self(Mesh3 { vertices, triangles: self.0.triangles.clone() })
    }

    fn convex_hull(&self) -> Self {
        Self(vcad_kernel_primitives::convex_hull_3d(&self.0.vertices, None))
    }

    fn warp(&self, f: impl Fn(Point3) -> Point3) -> Self {
        let vertices = self.0.vertices.iter().map(|p| f(*p)).collect();
        Self(Mesh3 { vertices, triangles: self.0.triangles.clone() })
    }

    fn refine(&self, edge_length: f64) -> Self {
        Self(refine_mesh(&self.0, edge_length))
    }

    fn mesh(&self) -> &Mesh3 {
        &self.0
    }

    fn bounds(&self) -> Bounds3 {
        self.0.bounds()
    }

    fn connected_components(&self) -> Vec<Self> {
        vcad_kernel_tessellate::connected_components(&self.0).into_iter().map(Self).collect()
    }

    fn original_id_runs(&self) -> Vec<(Option<u64>, usize)> {
        let mut runs: Vec<(Option<u64>, usize)> = Vec::new();
        for tri in &self.0.triangles {
            match runs.last_mut() {
                Some((id, count)) if *id == tri.original_id => *count += 1,
                _ => runs.push((tri.original_id, 1)),
            }
        }
        runs
    }
}

impl ManifoldImpl {
    /// Linearly extrude a cross-section into a solid.
    pub fn extrude_linear(cross: &CrossSectionImpl, height: f64, twist_degrees: f64, scale_top: Vec2) -> Self {
        Self(vcad_kernel_tessellate::extrude_linear(&cross.0, height, twist_degrees, scale_top, None))
    }

    /// Revolve a cross-section around the Z axis.
    pub fn revolve(cross: &CrossSectionImpl, angle_degrees: f64, segments: u32) -> Self {
        Self(vcad_kernel_tessellate::extrude_rotational(&cross.0, angle_degrees, segments, None))
    }

    /// Orthographic projection onto the XY plane.
    pub fn project(&self) -> CrossSectionImpl {
        let mut acc = Polygon2::new();
        for tri in &self.0.triangles {
            let [a, b, c] = self.0.triangle_points(tri);
            let footprint = Polygon2 { contours: vec![vec![Point2::new(a.x, a.y), Point2::new(b.x, b.y), Point2::new(c.x, c.y)]] };
            acc = vcad_kernel_booleans::boolean_2d(&acc, &footprint, BooleanOp::Union);
        }
        CrossSectionImpl(acc)
    }

    /// Cross-section of this solid at `z`.
    pub fn slice(&self, z: f64) -> CrossSectionImpl {
        let mut segments = Vec::new();
        for tri in &self.0.triangles {
            let pts = self.0.triangle_points(tri);
            let mut crossing = Vec::new();
            for i in 0..3 {
                let a = pts[i];
                let b = pts[(i + 1) % 3];
                let (da, db) = (a.z - z, b.z - z);
                if (da >= 0.0) != (db >= 0.0) && (da - db).abs() > 1e-12 {
                    let t = da / (da - db);
                    crossing.push(Point2::new(a.x + (b.x - a.x) * t, a.y + (b.y - a.y) * t));
                }
            }
            if crossing.len() == 2 {
                segments.push((crossing[0], crossing[1]));
            }
        }
        CrossSectionImpl(Polygon2 { contours: chain_segments(segments) })
    }
}

fn key(p: Point2) -> (i64, i64) {
    ((p.x * 1e6).round() as i64, (p.y * 1e6).round() as i64)
}

fn chain_segments(segments: Vec<(Point2, Point2)>) -> Vec<Contour2> {
    let mut by_start: HashMap<(i64, i64), Vec<usize>> = HashMap::new();
    for (i, (a, _)) in segments.iter().enumerate() {
        by_start.entry(key(*a)).or_default().push(i);
    }
    let mut used = vec![false; segments.len()];
    let mut loops = Vec::new();
    for start in 0..segments.len() {
        if used[start] {
            continue;
        }
        let origin = segments[start].0;
        let mut chain = vec![segments[start].0, segments[start].1];
        used[start] = true;
        let mut current = segments[start].1;
        loop {
            if key(current) == key(origin) {
                break;
            }
            let Some(candidates) = by_start.get(&key(current)) else { break };
            let Some(&next) = candidates.iter().find(|&&i| !used[i]) else { break };
            used[next] = true;
            current = segments[next].1;
            chain.push(current);
        }
        chain.pop();
        if chain.len() >= 3 {
            loops.push(chain);
        }
    }
    loops
}

fn is_edge_manifold(mesh: &Mesh3) -> bool {
    let mut edge_counts: HashMap<(u32, u32), i32> = HashMap::new();
    for tri in &mesh.triangles {
        for i in 0..3 {
            let a = tri.indices[i];
            let b = tri.indices[(i + 1) % 3];
            *edge_counts.entry((a.min(b), a.max(b))).or_insert(0) += 1;
        }
    }
    edge_counts.values().all(|&c| c == 2)
}

fn refine_mesh(mesh: &Mesh3, edge_length: f64) -> Mesh3 {
    let mut vertices = mesh.vertices.clone();
    let mut triangles = mesh.triangles.clone();

    for _ in 0..6 {
        let mut next_triangles = Vec::with_capacity(triangles.len());
        let mut any_split = false;
        for tri in &triangles {
            let pts = [vertices[tri.indices[0] as usize], vertices[tri.indices[1] as usize], vertices[tri.indices[2] as usize]];
            let edges = [(pts[0], pts[1]), (pts[1], pts[2]), (pts[2], pts[0])];
            let longest = edges.iter().map(|(a, b)| (b - a).norm()).fold(0.0_f64, f64::max);
            if longest <= edge_length {
                next_triangles.push(*tri);
                continue;
            }
            any_split = true;
            let midpoints: Vec<u32> = (0..3)
                .map(|i| {
                    let a = pts[i];
                    let b = pts[(i + 1) % 3];
                    let m = Point3::from((a.coords + b.coords) * 0.5);
                    vertices.push(m);
                    (vertices.len() - 1) as u32
                })
                .collect();
            let [i0, i1, i2] = tri.indices;
            let [m0, m1, m2] = [midpoints[0], midpoints[1], midpoints[2]];
            let id = tri.original_id;
            next_triangles.push(Triangle { indices: [i0, m0, m2], original_id: id });
            next_triangles.push(Triangle { indices: [m0, i1, m1], original_id: id });
            next_triangles.push(Triangle { indices: [m2, m1, i2], original_id: id });
            next_triangles.push(Triangle { indices: [m0, m1, m2], original_id: id });
        }
        triangles = next_triangles;
        if !any_split {
            break;
        }
    }

    Mesh3 { vertices, triangles }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cuboid_bounds_match_size() {
        let m = ManifoldImpl::cuboid(Vec3::new(2.0, 3.0, 4.0));
        let b = m.bounds();
        assert!((b.size().x - 2.0).abs() < 1e-9);
        assert!((b.size().y - 3.0).abs() < 1e-9);
        assert!((b.size().z - 4.0).abs() < 1e-9);
    }

    #[test]
    fn union_of_disjoint_cuboids_keeps_all_triangles() {
        let a = ManifoldImpl::cuboid(Vec3::new(1.0, 1.0, 1.0));
        let b = a.transform(&Transform::translation(10.0, 0.0, 0.0));
        let u = a.union(&b);
        assert_eq!(u.mesh().num_triangles(), a.mesh().num_triangles() + b.mesh().num_triangles());
    }

    #[test]
    fn from_mesh_rejects_dangling_triangle() {
        let vertices = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0), Point3::new(0.0, 1.0, 0.0)];
        let result = ManifoldImpl::from_mesh(vertices, vec![[0, 1, 2]]);
        assert!(matches!(result, Err(KernelError::NotManifold)));
    }

    #[test]
    fn refine_subdivides_large_triangles() {
        let m = ManifoldImpl::cuboid(Vec3::new(10.0, 10.0, 10.0));
        let refined = m.refine(1.0);
        assert!(refined.mesh().num_triangles() > m.mesh().num_triangles());
    }

    #[test]
    fn slice_of_cube_through_middle_has_area() {
        let m = ManifoldImpl::cuboid(Vec3::new(2.0, 2.0, 2.0));
        let cross = m.slice(1.0);
        assert!(!cross.0.is_empty());
    }

    #[test]
    fn square_offset_outward_grows_bounds() {
        let s = CrossSectionImpl::square(Vec2::new(2.0, 2.0));
        let grown = s.offset(0.5, 16);
        let b = grown.bounds();
        assert!(b.size().x > 2.0);
    }

    #[test]
    fn original_id_runs_tracks_provenance() {
        let mesh = vcad_kernel_primitives::cube(Vec3::new(1.0, 1.0, 1.0), Some(7));
        let m = ManifoldImpl(mesh);
        let runs = m.original_id_runs();
        assert!(runs.iter().all(|(id, _)| *id == Some(7)));
    }
}
