#![warn(missing_docs)]

//! Concrete primitive construction for the vcad kernel.
//!
//! Builds [`Mesh3`]/[`Polygon2`] geometry directly — cubes, cylinders,
//! spheres, cones in 3D; squares, circles, polygons in 2D — plus convex
//! hull in both dimensions. Every 3D triangle is tagged with the
//! `original_id` the caller supplies, so provenance survives into whatever
//! boolean tree the primitive later participates in.

use vcad_kernel_geom::{Contour2, Mesh3, Polygon2, Triangle};
use vcad_kernel_math::{Point2, Point3, Vec3};

fn tri(a: u32, b: u32, c: u32, original_id: Option<u64>) -> Triangle {
    Triangle { indices: [a, b, c], original_id }
}

/// Build a box centered at the local origin with the given full extents.
pub fn cube(size: Vec3, original_id: Option<u64>) -> Mesh3 {
    let (hx, hy, hz) = (size.x / 2.0, size.y / 2.0, size.z / 2.0);
    let vertices = vec![
        Point3::new(-hx, -hy, -hz),
        Point3::new(hx, -hy, -hz),
        Point3::new(hx, hy, -hz),
        Point3::new(-hx, hy, -hz),
        Point3::new(-hx, -hy, hz),
        Point3::new(hx, -hy, hz),
        Point3::new(hx, hy, hz),
        Point3::new(-hx, hy, hz),
    ];
    let triangles = vec![
        tri(0, 3, 2, original_id), tri(0, 2, 1, original_id), // z = -hz
        tri(4, 5, 6, original_id), tri(4, 6, 7, original_id), // z = hz
        tri(0, 1, 5, original_id), tri(0, 5, 4, original_id), // y = -hy
        tri(3, 7, 6, original_id), tri(3, 6, 2, original_id), // y = hy
        tri(0, 4, 7, original_id), tri(0, 7, 3, original_id), // x = -hx
        tri(1, 2, 6, original_id), tri(1, 6, 5, original_id), // x = hx
    ];
    Mesh3 { vertices, triangles }
}

/// Build a cylinder/cone/frustum along the local Z axis from `z=0` to
/// `z=height`, with independent bottom and top radii (equal radii give a
/// cylinder, `radius_top == 0` gives a cone).
pub fn cylinder(radius_bottom: f64, radius_top: f64, height: f64, segments: u32, original_id: Option<u64>) -> Mesh3 {
    let segments = segments.max(3);
    let mut vertices = Vec::new();
    let mut triangles = Vec::new();

    let ring = |vertices: &mut Vec<Point3>, radius: f64, z: f64| -> u32 {
        let base = vertices.len() as u32;
        for i in 0..segments {
            let theta = 2.0 * std::f64::consts::PI * (i as f64) / (segments as f64);
            vertices.push(Point3::new(radius * theta.cos(), radius * theta.sin(), z));
        }
        base
    };

    let bottom_has_face = radius_bottom > 0.0;
    let top_has_face = radius_top > 0.0;

    let bottom_ring = ring(&mut vertices, radius_bottom.max(1e-12), 0.0);
    let top_ring = ring(&mut vertices, radius_top.max(1e-12), height);

    for i in 0..segments {
        let j = (i + 1) % segments;
        let (b0, b1) = (bottom_ring + i, bottom_ring + j);
        let (t0, t1) = (top_ring + i, top_ring + j);
        triangles.push(tri(b0, b1, t1, original_id));
        triangles.push(tri(b0, t1, t0, original_id));
    }

    if bottom_has_face {
        let center = vertices.len() as u32;
        vertices.push(Point3::new(0.0, 0.0, 0.0));
        for i in 0..segments {
            let j = (i + 1) % segments;
            triangles.push(tri(center, bottom_ring + j, bottom_ring + i, original_id));
        }
    }
    if top_has_face {
        let center = vertices.len() as u32;
        vertices.push(Point3::new(0.0, 0.0, height));
        for i in 0..segments {
            let j = (i + 1) % segments;
            triangles.push(tri(center, top_ring + i, top_ring + j, original_id));
        }
    }

    Mesh3 { vertices, triangles }
}

/// Build a UV sphere centered at the local origin.
pub fn sphere(radius: f64, segments: u32, original_id: Option<u64>) -> Mesh3 {
    let segments = segments.max(3);
    let rings = segments;
    let mut vertices = Vec::new();
    let mut triangles = Vec::new();

    for ring in 0..=rings {
        let phi = std::f64::consts::PI * (ring as f64) / (rings as f64);
        let (sin_phi, cos_phi) = phi.sin_cos();
        for seg in 0..segments {
            let theta = 2.0 * std::f64::consts::PI * (seg as f64) / (segments as f64);
            let (sin_t, cos_t) = theta.sin_cos();
            vertices.push(Point3::new(
                radius * sin_phi * cos_t,
                radius * sin_phi * sin_t,
                radius * cos_phi,
            ));
        }
    }

    for ring in 0..rings {
        for seg in 0..segments {
            let next_seg = (seg + 1) % segments;
            let a = ring * segments + seg;
            let b = ring * segments + next_seg;
            let c = (ring + 1) * segments + next_seg;
            let d = (ring + 1) * segments + seg;
            if ring > 0 {
                triangles.push(tri(a, b, d, original_id));
            }
            if ring < rings - 1 {
                triangles.push(tri(b, c, d, original_id));
            }
        }
    }

    Mesh3 { vertices, triangles }
}

/// Build an axis-aligned rectangle centered at the local origin.
pub fn square(size: vcad_kernel_math::Vec2) -> Polygon2 {
    let (hx, hy) = (size.x / 2.0, size.y / 2.0);
    let contour: Contour2 = vec![
        Point2::new(-hx, -hy),
        Point2::new(hx, -hy),
        Point2::new(hx, hy),
        Point2::new(-hx, hy),
    ];
    Polygon2 { contours: vec![contour] }
}

/// Build a regular polygon approximating a circle centered at the origin.
pub fn circle(radius: f64, segments: u32) -> Polygon2 {
    let segments = segments.max(3);
    let contour: Contour2 = (0..segments)
        .map(|i| {
            let theta = 2.0 * std::f64::consts::PI * (i as f64) / (segments as f64);
            Point2::new(radius * theta.cos(), radius * theta.sin())
        })
        .collect();
    Polygon2 { contours: vec![contour] }
}

/// Build a cross-section from an explicit point list, closing the contour
/// implicitly. Winding is taken as given by the caller.
pub fn polygon(points: Vec<Point2>) -> Polygon2 {
    Polygon2 { contours: vec![points] }
}

/// Convex hull of a 2D point set via the monotone-chain (Andrew) algorithm.
/// Returns a single CCW contour; degenerate input (fewer than 3 distinct
/// points, or all collinear) yields an empty polygon.
pub fn convex_hull_2d(points: &[Point2]) -> Polygon2 {
    let mut pts: Vec<Point2> = points.to_vec();
    pts.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap().then(a.y.partial_cmp(&b.y).unwrap()));
    pts.dedup_by(|a, b| (a.x - b.x).abs() < 1e-12 && (a.y - b.y).abs() < 1e-12);
    if pts.len() < 3 {
        return Polygon2::new();
    }

    fn cross(o: Point2, a: Point2, b: Point2) -> f64 {
        (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
    }

    let mut lower: Vec<Point2> = Vec::new();
    for &p in &pts {
        while lower.len() >= 2 && cross(lower[lower.len() - 2], lower[lower.len() - 1], p) <= 0.0 {
            lower.pop();
        }
        lower.push(p);
    }
    let mut upper: Vec<Point2> = Vec::new();
    for &p in pts.iter().rev() {
        while upper.len() >= 2 && cross(upper[upper.len() - 2], upper[upper.len() - 1], p) <= 0.0 {
            upper.pop();
        }
        upper.push(p);
    }
    lower.pop();
    upper.pop();
    lower.extend(upper);
    if lower.len() < 3 {
        return Polygon2::new();
    }
    Polygon2 { contours: vec![lower] }
}

/// Convex hull of a 3D point set via a simple incremental algorithm:
/// start from a seed tetrahedron, then repeatedly fold in the farthest
/// outside point, removing faces it can see and patching the resulting
/// horizon with new triangles. Quadratic in the number of points; adequate
/// for the modestly-sized hulls CAD modeling produces.
pub fn convex_hull_3d(points: &[Point3], original_id: Option<u64>) -> Mesh3 {
    let pts: Vec<Point3> = points.to_vec();
    if pts.len() < 4 {
        return Mesh3::new();
    }

    // Seed tetrahedron: extreme-x points plus farthest-from-line and
    // farthest-from-plane points, guarding against degenerate coplanar input.
    let mut idx: Vec<usize> = (0..pts.len()).collect();
    idx.sort_by(|&a, &b| pts[a].x.partial_cmp(&pts[b].x).unwrap());
    let p0 = idx[0];
    let p1 = *idx.last().unwrap();
    let dir = (pts[p1] - pts[p0]).normalize();
    let p2 = idx
        .iter()
        .copied()
        .max_by(|&a, &b| {
            let da = (pts[a] - pts[p0]).cross(&dir).norm_squared();
            let db = (pts[b] - pts[p0]).cross(&dir).norm_squared();
            da.partial_cmp(&db).unwrap()
        })
        .unwrap();
    let normal = (pts[p1] - pts[p0]).cross(&(pts[p2] - pts[p0]));
    if normal.norm_squared() < 1e-18 {
        return Mesh3::new();
    }
    let normal = normal.normalize();
    let p3 = idx
        .iter()
        .copied()
        .max_by(|&a, &b| {
            let da = (pts[a] - pts[p0]).dot(&normal).abs();
            let db = (pts[b] - pts[p0]).dot(&normal).abs();
            da.partial_cmp(&db).unwrap()
        })
        .unwrap();
    if (pts[p3] - pts[p0]).dot(&normal).abs() < 1e-12 {
        // coplanar point set, no 3D hull
        return Mesh3::new();
    }

    #[derive(Clone, Copy)]
    struct Face {
        a: usize,
        b: usize,
        c: usize,
    }

    fn face_normal(pts: &[Point3], f: &Face) -> Vec3 {
        (pts[f.b] - pts[f.a]).cross(&(pts[f.c] - pts[f.a]))
    }

    fn centroid_inside(pts: &[Point3], verts: &[usize], f: &Face) -> bool {
        let mut c = Point3::origin();
        for &v in verts {
            c = Point3::from(c.coords + pts[v].coords);
        }
        c = Point3::from(c.coords / verts.len() as f64);
        face_normal(pts, f).dot(&(c - pts[f.a])) <= 0.0
    }

    let seed_verts = [p0, p1, p2, p3];
    let mut faces = vec![
        Face { a: p0, b: p1, c: p2 },
        Face { a: p0, b: p2, c: p3 },
        Face { a: p0, b: p3, c: p1 },
        Face { a: p1, b: p3, c: p2 },
    ];
    for f in faces.iter_mut() {
        if !centroid_inside(&pts, &seed_verts, f) {
            std::mem::swap(&mut f.b, &mut f.c);
        }
    }

    let mut used: std::collections::HashSet<usize> = seed_verts.into_iter().collect();

    for (i, &p) in pts.iter().enumerate() {
        if used.contains(&i) {
            continue;
        }
        let visible: Vec<usize> = faces
            .iter()
            .enumerate()
            .filter(|(_, f)| face_normal(&pts, f).dot(&(p - pts[f.a])) > 1e-9)
            .map(|(fi, _)| fi)
            .collect();
        if visible.is_empty() {
            continue;
        }
        used.insert(i);

        // collect horizon edges: edges of visible faces not shared by
        // another visible face
        let mut edge_count: std::collections::HashMap<(usize, usize), i32> = std::collections::HashMap::new();
        for &fi in &visible {
            let f = faces[fi];
            for (x, y) in [(f.a, f.b), (f.b, f.c), (f.c, f.a)] {
                *edge_count.entry((x.min(y), x.max(y))).or_insert(0) += 1;
            }
        }
        let visible_set: std::collections::HashSet<usize> = visible.iter().copied().collect();
        let mut horizon: Vec<(usize, usize)> = Vec::new();
        for &fi in &visible {
            let f = faces[fi];
            for (x, y) in [(f.a, f.b), (f.b, f.c), (f.c, f.a)] {
                if edge_count[&(x.min(y), x.max(y))] == 1 {
                    horizon.push((x, y));
                }
            }
        }
        let _ = visible_set;

        let mut new_faces: Vec<Face> = faces
            .iter()
            .enumerate()
            .filter(|(fi, _)| !visible.contains(fi))
            .map(|(_, f)| *f)
            .collect();
        for (x, y) in horizon {
            new_faces.push(Face { a: x, b: y, c: i });
        }
        faces = new_faces;
    }

    let vertices = pts;
    let triangles = faces.into_iter().map(|f| tri(f.a as u32, f.b as u32, f.c as u32, original_id)).collect();
    Mesh3 { vertices, triangles }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_is_closed_and_has_volume() {
        let m = cube(Vec3::new(2.0, 2.0, 2.0), Some(1));
        assert_eq!(m.num_triangles(), 12);
        assert!((m.signed_volume().abs() - 8.0).abs() < 1e-9);
    }

    #[test]
    fn cylinder_cone_has_positive_volume() {
        let cyl = cylinder(1.0, 1.0, 2.0, 32, Some(1));
        assert!(cyl.signed_volume().abs() > 0.0);
        let cone = cylinder(1.0, 0.0, 2.0, 32, Some(1));
        assert!(cone.signed_volume().abs() > 0.0);
        assert!(cone.signed_volume().abs() < cyl.signed_volume().abs());
    }

    #[test]
    fn sphere_volume_approximates_analytic() {
        let s = sphere(1.0, 48, Some(1));
        let expected = 4.0 / 3.0 * std::f64::consts::PI;
        assert!((s.signed_volume().abs() - expected).abs() / expected < 0.01);
    }

    #[test]
    fn square_area_matches() {
        let p = square(vcad_kernel_math::Vec2::new(4.0, 2.0));
        assert!((p.area() - 8.0).abs() < 1e-9);
    }

    #[test]
    fn circle_area_approximates_analytic() {
        let p = circle(1.0, 128);
        assert!((p.area() - std::f64::consts::PI).abs() < 0.001);
    }

    #[test]
    fn hull_2d_of_square_plus_center_drops_center() {
        let pts = vec![
            Point2::new(0.0, 0.0), Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0), Point2::new(0.0, 1.0),
            Point2::new(0.5, 0.5),
        ];
        let hull = convex_hull_2d(&pts);
        assert_eq!(hull.contours[0].len(), 4);
    }

    #[test]
    fn hull_3d_of_cube_corners_plus_center() {
        let mut pts = vec![
            Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0), Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0), Point3::new(1.0, 0.0, 1.0),
            Point3::new(1.0, 1.0, 1.0), Point3::new(0.0, 1.0, 1.0),
        ];
        pts.push(Point3::new(0.5, 0.5, 0.5));
        let hull = convex_hull_3d(&pts, Some(1));
        assert!(!hull.is_empty());
        assert!((hull.signed_volume().abs() - 1.0).abs() < 1e-6);
    }
}
