#![warn(missing_docs)]

//! CSG boolean operations for the vcad kernel.
//!
//! 3D booleans run a BSP-tree algorithm over triangle-derived polygons
//! (the classic csg.js / Evan Wallace construction); 2D booleans run the
//! same construction specialized to line splits in the plane. Both
//! preserve `original_id` provenance on every output facet by inheriting
//! it from the polygon a split facet came from.

mod bsp2;
mod bsp3;

use rayon::prelude::*;
use vcad_kernel_geom::{Bounds2, Bounds3, Mesh3, Polygon2, Triangle};

/// A CSG boolean operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BooleanOp {
    /// Combine both operands.
    Union,
    /// Subtract the second operand from the first.
    Difference,
    /// Keep only the overlap of both operands.
    Intersection,
}

fn mesh_to_polygons(mesh: &Mesh3) -> Vec<bsp3::Polygon> {
    mesh.triangles
        .par_iter()
        .filter_map(|t| {
            let pts = mesh.triangle_points(t);
            bsp3::Polygon::from_points(pts.to_vec(), t.original_id)
        })
        .collect()
}

fn polygons_to_mesh(polys: &[bsp3::Polygon]) -> Mesh3 {
    let mut vertices = Vec::new();
    let mut triangles = Vec::new();
    for poly in polys {
        for tri in poly.triangulate() {
            let start = vertices.len() as u32;
            vertices.push(tri[0]);
            vertices.push(tri[1]);
            vertices.push(tri[2]);
            triangles.push(Triangle { indices: [start, start + 1, start + 2], original_id: poly.original_id });
        }
    }
    Mesh3 { vertices, triangles }
}

/// Perform a 3D boolean operation on two meshes.
///
/// Falls back to a plain concatenation/no-op when the operands' bounding
/// boxes don't overlap at all, since the BSP construction degenerates to
/// that result anyway but at a fraction of the cost.
pub fn boolean_3d(a: &Mesh3, b: &Mesh3, op: BooleanOp) -> Mesh3 {
    let (bounds_a, bounds_b) = (a.bounds(), b.bounds());
    if !bounds_a.overlaps(&bounds_b) {
        return match op {
            BooleanOp::Union => {
                let mut m = a.clone();
                m.merge(b);
                m
            }
            BooleanOp::Difference => a.clone(),
            BooleanOp::Intersection => Mesh3::new(),
        };
    }

    let polys_a = mesh_to_polygons(a);
    let polys_b = mesh_to_polygons(b);
    let result = match op {
        BooleanOp::Union => bsp3::union(polys_a, polys_b),
        BooleanOp::Difference => bsp3::subtract(polys_a, polys_b),
        BooleanOp::Intersection => bsp3::intersect(polys_a, polys_b),
    };
    polygons_to_mesh(&result)
}

/// True if two 3D bounding boxes overlap — exposed so callers (e.g. the
/// kernel facade) can short-circuit before even building a BSP tree.
pub fn bounds_overlap_3d(a: &Bounds3, b: &Bounds3) -> bool {
    a.overlaps(b)
}

fn polygon_to_loops(poly: &Polygon2) -> Vec<bsp2::Loop> {
    poly.contours.iter().filter_map(|c| bsp2::Loop::from_points(c.clone())).collect()
}

fn loops_to_polygon(loops: &[bsp2::Loop]) -> Polygon2 {
    Polygon2 { contours: loops.iter().map(|l| l.points.clone()).collect() }
}

/// Perform a 2D boolean operation on two cross-sections.
pub fn boolean_2d(a: &Polygon2, b: &Polygon2, op: BooleanOp) -> Polygon2 {
    let (bounds_a, bounds_b) = (a.bounds(), b.bounds());
    if !bounds_a.overlaps(&bounds_b) {
        return match op {
            BooleanOp::Union => {
                let mut p = a.clone();
                p.contours.extend(b.contours.clone());
                p
            }
            BooleanOp::Difference => a.clone(),
            BooleanOp::Intersection => Polygon2::new(),
        };
    }

    let loops_a = polygon_to_loops(a);
    let loops_b = polygon_to_loops(b);
    let result = match op {
        BooleanOp::Union => bsp2::union(loops_a, loops_b),
        BooleanOp::Difference => bsp2::subtract(loops_a, loops_b),
        BooleanOp::Intersection => bsp2::intersect(loops_a, loops_b),
    };
    loops_to_polygon(&result)
}

/// True if two 2D bounding boxes overlap.
pub fn bounds_overlap_2d(a: &Bounds2, b: &Bounds2) -> bool {
    a.overlaps(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vcad_kernel_math::Vec3;
    use vcad_kernel_primitives::{cube, square};

    #[test]
    fn disjoint_union_just_merges() {
        let a = cube(Vec3::new(1.0, 1.0, 1.0), Some(1));
        let mut b = cube(Vec3::new(1.0, 1.0, 1.0), Some(2));
        for v in b.vertices.iter_mut() {
            v.x += 10.0;
        }
        let result = boolean_3d(&a, &b, BooleanOp::Union);
        assert_eq!(result.num_triangles(), a.num_triangles() + b.num_triangles());
    }

    #[test]
    fn overlapping_union_has_volume_between_operands_and_sum() {
        let a = cube(Vec3::new(2.0, 2.0, 2.0), Some(1));
        let mut b = cube(Vec3::new(2.0, 2.0, 2.0), Some(2));
        for v in b.vertices.iter_mut() {
            v.x += 1.0;
        }
        let result = boolean_3d(&a, &b, BooleanOp::Union);
        let vol = result.signed_volume().abs();
        assert!(vol > 8.0 && vol < 16.0);
    }

    #[test]
    fn difference_of_identical_cubes_is_empty() {
        let a = cube(Vec3::new(2.0, 2.0, 2.0), Some(1));
        let b = cube(Vec3::new(2.0, 2.0, 2.0), Some(2));
        let result = boolean_3d(&a, &b, BooleanOp::Difference);
        assert!(result.signed_volume().abs() < 1e-6);
    }

    #[test]
    fn intersection_of_disjoint_cubes_is_empty() {
        let a = cube(Vec3::new(1.0, 1.0, 1.0), Some(1));
        let mut b = cube(Vec3::new(1.0, 1.0, 1.0), Some(2));
        for v in b.vertices.iter_mut() {
            v.x += 10.0;
        }
        let result = boolean_3d(&a, &b, BooleanOp::Intersection);
        assert!(result.is_empty());
    }

    #[test]
    fn union_2d_of_overlapping_squares_grows_area() {
        let a = square(vcad_kernel_math::Vec2::new(2.0, 2.0));
        let mut b = square(vcad_kernel_math::Vec2::new(2.0, 2.0));
        for c in b.contours.iter_mut() {
            for p in c.iter_mut() {
                p.x += 1.0;
            }
        }
        let result = boolean_2d(&a, &b, BooleanOp::Union);
        assert!(result.area() > a.area() && result.area() < a.area() + b.area());
    }

    #[test]
    fn intersection_2d_of_disjoint_squares_is_empty() {
        let a = square(vcad_kernel_math::Vec2::new(1.0, 1.0));
        let mut b = square(vcad_kernel_math::Vec2::new(1.0, 1.0));
        for c in b.contours.iter_mut() {
            for p in c.iter_mut() {
                p.x += 10.0;
            }
        }
        let result = boolean_2d(&a, &b, BooleanOp::Intersection);
        assert!(result.is_empty());
    }
}
