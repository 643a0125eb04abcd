#![warn(missing_docs)]

//! Triangulation, extrusion, offset and decomposition for the vcad kernel.
//!
//! Operates purely on [`Mesh3`]/[`Polygon2`] — there is no B-rep topology
//! to walk, so triangulation is ear-clipping with hole bridging and
//! extrusion is direct vertex-ring construction.

use std::collections::{HashMap, HashSet};

use vcad_kernel_geom::{Bounds2, Mesh3, Polygon2, Triangle};
use vcad_kernel_math::{Point2, Point3, Transform2, Vec2};

fn cross2(o: Point2, a: Point2, b: Point2) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

fn point_in_triangle(p: Point2, a: Point2, b: Point2, c: Point2) -> bool {
    let d1 = cross2(a, b, p);
    let d2 = cross2(b, c, p);
    let d3 = cross2(c, a, p);
    let has_neg = d1 < 0.0 || d2 < 0.0 || d3 < 0.0;
    let has_pos = d1 > 0.0 || d2 > 0.0 || d3 > 0.0;
    !(has_neg && has_pos)
}

/// Merge a polygon's holes into its outer contour(s) via bridge edges,
/// producing one simple (hole-free) polygon per outer contour, ready for
/// ear-clipping.
fn merge_holes(polygon: &Polygon2) -> Vec<Vec<Point2>> {
    let mut outers: Vec<Vec<Point2>> = Vec::new();
    let mut holes: Vec<Vec<Point2>> = Vec::new();
    for contour in &polygon.contours {
        if contour.len() < 3 {
            continue;
        }
        if Polygon2::contour_signed_area(contour) >= 0.0 {
            outers.push(contour.clone());
        } else {
            holes.push(contour.clone());
        }
    }

    fn contains(outer: &[Point2], p: Point2) -> bool {
        let mut inside = false;
        let n = outer.len();
        let mut j = n - 1;
        for i in 0..n {
            let (pi, pj) = (outer[i], outer[j]);
            if ((pi.y > p.y) != (pj.y > p.y))
                && (p.x < (pj.x - pi.x) * (p.y - pi.y) / (pj.y - pi.y) + pi.x)
            {
                inside = !inside;
            }
            j = i;
        }
        inside
    }

    let mut merged: Vec<Vec<Point2>> = outers;
    for hole in holes {
        let anchor = hole[0];
        let owner = merged
            .iter_mut()
            .find(|outer| contains(outer, anchor))
            .unwrap_or_else(|| merged.first_mut().expect("polygon has no outer contour for hole"));

        // Find the outer vertex closest to the hole's rightmost point,
        // bridge with a pair of coincident edges (zero-width channel).
        let hole_start = hole
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.x.partial_cmp(&b.x).unwrap())
            .map(|(i, _)| i)
            .unwrap();
        let bridge_from = owner
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                let da = (**a - hole[hole_start]).norm_squared();
                let db = (**b - hole[hole_start]).norm_squared();
                da.partial_cmp(&db).unwrap()
            })
            .map(|(i, _)| i)
            .unwrap();

        let mut spliced = Vec::with_capacity(owner.len() + hole.len() + 2);
        spliced.extend(owner[..=bridge_from].iter().copied());
        let rotated_hole = hole[hole_start..].iter().chain(hole[..=hole_start].iter());
        spliced.extend(rotated_hole.copied());
        spliced.extend(owner[bridge_from..].iter().copied());
        *owner = spliced;
    }
    merged
}

/// Ear-clip a simple (hole-free) CCW polygon into triangles.
fn ear_clip(poly: &[Point2]) -> Vec<[Point2; 3]> {
    let mut indices: Vec<usize> = (0..poly.len()).collect();
    let mut triangles = Vec::new();
    if indices.len() < 3 {
        return triangles;
    }

    let mut guard = 0;
    while indices.len() > 3 && guard < poly.len() * poly.len() + 16 {
        guard += 1;
        let n = indices.len();
        let mut clipped = false;
        for i in 0..n {
            let ia = indices[(i + n - 1) % n];
            let ib = indices[i];
            let ic = indices[(i + 1) % n];
            let (a, b, c) = (poly[ia], poly[ib], poly[ic]);
            if cross2(a, b, c) <= 0.0 {
                continue; // reflex vertex, not an ear
            }
            let is_ear = indices
                .iter()
                .filter(|&&idx| idx != ia && idx != ib && idx != ic)
                .all(|&idx| !point_in_triangle(poly[idx], a, b, c));
            if is_ear {
                triangles.push([a, b, c]);
                indices.remove(i);
                clipped = true;
                break;
            }
        }
        if !clipped {
            break; // degenerate input; stop rather than loop forever
        }
    }
    if indices.len() == 3 {
        triangles.push([poly[indices[0]], poly[indices[1]], poly[indices[2]]]);
    }
    triangles
}

/// Triangulate a (possibly multi-contour, with holes) cross-section.
pub fn triangulate(polygon: &Polygon2) -> Vec<[Point2; 3]> {
    merge_holes(polygon).iter().flat_map(|simple| ear_clip(simple)).collect()
}

/// Linearly extrude a cross-section from `z=0` to `z=height`, optionally
/// twisting and scaling the top face relative to the bottom.
pub fn extrude_linear(
    polygon: &Polygon2,
    height: f64,
    twist_degrees: f64,
    scale_top: Vec2,
    original_id: Option<u64>,
) -> Mesh3 {
    let mut vertices: Vec<Point3> = Vec::new();
    let mut triangles: Vec<Triangle> = Vec::new();

    let bottom_tris = triangulate(polygon);
    let base = 0u32;
    for t in &bottom_tris {
        let start = vertices.len() as u32;
        // reverse winding so the bottom cap faces -Z (outward)
        vertices.push(Point3::new(t[0].x, t[0].y, 0.0));
        vertices.push(Point3::new(t[2].x, t[2].y, 0.0));
        vertices.push(Point3::new(t[1].x, t[1].y, 0.0));
        triangles.push(Triangle { indices: [start, start + 1, start + 2], original_id });
    }
    let _ = base;

    let top_transform = Transform2::rotation(twist_degrees.to_radians()).then(&Transform2::scale(scale_top.x, scale_top.y));
    for t in &bottom_tris {
        let start = vertices.len() as u32;
        for p in t {
            let tp = top_transform.apply_point(p);
            vertices.push(Point3::new(tp.x, tp.y, height));
        }
        triangles.push(Triangle { indices: [start, start + 1, start + 2], original_id });
    }

    for contour in &polygon.contours {
        if contour.len() < 2 {
            continue;
        }
        let n = contour.len();
        for i in 0..n {
            let j = (i + 1) % n;
            let b0 = contour[i];
            let b1 = contour[j];
            let t0 = top_transform.apply_point(&b0);
            let t1 = top_transform.apply_point(&b1);
            let start = vertices.len() as u32;
            vertices.push(Point3::new(b0.x, b0.y, 0.0));
            vertices.push(Point3::new(b1.x, b1.y, 0.0));
            vertices.push(Point3::new(t1.x, t1.y, height));
            vertices.push(Point3::new(t0.x, t0.y, height));
            triangles.push(Triangle { indices: [start, start + 1, start + 2], original_id });
            triangles.push(Triangle { indices: [start, start + 2, start + 3], original_id });
        }
    }

    Mesh3 { vertices, triangles }
}

/// Revolve a cross-section around the Z axis by `angle_degrees` (360 for a
/// full revolution). The profile's local X is radius, local Y is height.
pub fn extrude_rotational(polygon: &Polygon2, angle_degrees: f64, segments: u32, original_id: Option<u64>) -> Mesh3 {
    let segments = segments.max(3);
    let full = (angle_degrees - 360.0).abs() < 1e-9;
    let steps = if full { segments } else { segments + 1 };
    let angle = angle_degrees.to_radians();

    let profile_tris = triangulate(polygon);
    let mut vertices: Vec<Point3> = Vec::new();
    let mut triangles: Vec<Triangle> = Vec::new();

    let place = |p: Point2, theta: f64| -> Point3 {
        Point3::new(p.x * theta.cos(), p.x * theta.sin(), p.y)
    };

    if !full {
        for t in &profile_tris {
            let start = vertices.len() as u32;
            vertices.push(place(t[0], 0.0));
            vertices.push(place(t[1], 0.0));
            vertices.push(place(t[2], 0.0));
            triangles.push(Triangle { indices: [start + 2, start + 1, start], original_id });
        }
        for t in &profile_tris {
            let start = vertices.len() as u32;
            vertices.push(place(t[0], angle));
            vertices.push(place(t[1], angle));
            vertices.push(place(t[2], angle));
            triangles.push(Triangle { indices: [start, start + 1, start + 2], original_id });
        }
    }

    for contour in &polygon.contours {
        let n = contour.len();
        if n < 2 {
            continue;
        }
        for step in 0..(steps - if full { 0 } else { 1 }) {
            let theta0 = angle * (step as f64) / (segments as f64);
            let theta1 = angle * ((step + 1) as f64) / (segments as f64);
            for i in 0..n {
                let j = (i + 1) % n;
                let a0 = contour[i];
                let a1 = contour[j];
                if a0.x.abs() < 1e-12 && a1.x.abs() < 1e-12 {
                    continue; // both points on the revolve axis: degenerate quad
                }
                let start = vertices.len() as u32;
                vertices.push(place(a0, theta0));
                vertices.push(place(a1, theta0));
                vertices.push(place(a1, theta1));
                vertices.push(place(a0, theta1));
                triangles.push(Triangle { indices: [start, start + 1, start + 2], original_id });
                triangles.push(Triangle { indices: [start, start + 2, start + 3], original_id });
            }
        }
    }

    Mesh3 { vertices, triangles }
}

/// Offset a cross-section outward (positive `delta`) or inward (negative)
/// by translating every edge along its outward normal and rejoining
/// adjacent edges with a round join of `segments_per_circle` arc segments.
pub fn offset(polygon: &Polygon2, delta: f64, segments_per_circle: u32) -> Polygon2 {
    if delta.abs() < 1e-12 {
        return polygon.clone();
    }
    let segments_per_circle = segments_per_circle.max(4);
    let mut out = Polygon2::new();
    for contour in &polygon.contours {
        if contour.len() < 3 {
            continue;
        }
        let n = contour.len();
        let mut result = Vec::new();
        for i in 0..n {
            let prev = contour[(i + n - 1) % n];
            let cur = contour[i];
            let next = contour[(i + 1) % n];
            let e0 = (cur - prev).normalize();
            let e1 = (next - cur).normalize();
            let n0 = Vec2::new(e0.y, -e0.x);
            let n1 = Vec2::new(e1.y, -e1.x);
            let p0 = cur + n0 * delta;
            let p1 = cur + n1 * delta;
            result.push(p0);
            if delta > 0.0 && n0.dot(&n1) < 0.999 {
                let start_angle = n0.y.atan2(n0.x);
                let mut end_angle = n1.y.atan2(n1.x);
                if end_angle < start_angle {
                    end_angle += 2.0 * std::f64::consts::PI;
                }
                let steps = ((end_angle - start_angle) / (2.0 * std::f64::consts::PI) * segments_per_circle as f64).ceil() as i32;
                for s in 1..steps.max(1) {
                    let a = start_angle + (end_angle - start_angle) * (s as f64) / (steps as f64);
                    result.push(cur + Vec2::new(a.cos(), a.sin()) * delta);
                }
            }
            result.push(p1);
        }
        out.contours.push(result);
    }
    out
}

/// Split a mesh into its connected components (triangles connected via a
/// shared vertex index).
pub fn connected_components(mesh: &Mesh3) -> Vec<Mesh3> {
    let n = mesh.triangles.len();
    if n == 0 {
        return Vec::new();
    }
    let mut vertex_to_tris: HashMap<u32, Vec<usize>> = HashMap::new();
    for (ti, t) in mesh.triangles.iter().enumerate() {
        for &v in &t.indices {
            vertex_to_tris.entry(v).or_default().push(ti);
        }
    }

    let mut visited = vec![false; n];
    let mut components = Vec::new();
    for start in 0..n {
        if visited[start] {
            continue;
        }
        let mut stack = vec![start];
        let mut group = HashSet::new();
        visited[start] = true;
        while let Some(ti) = stack.pop() {
            group.insert(ti);
            for &v in &mesh.triangles[ti].indices {
                for &other in &vertex_to_tris[&v] {
                    if !visited[other] {
                        visited[other] = true;
                        stack.push(other);
                    }
                }
            }
        }

        let mut remap: HashMap<u32, u32> = HashMap::new();
        let mut vertices = Vec::new();
        let mut triangles = Vec::new();
        for &ti in &group {
            let t = &mesh.triangles[ti];
            let mut indices = [0u32; 3];
            for (k, &v) in t.indices.iter().enumerate() {
                indices[k] = *remap.entry(v).or_insert_with(|| {
                    vertices.push(mesh.vertices[v as usize]);
                    (vertices.len() - 1) as u32
                });
            }
            triangles.push(Triangle { indices, original_id: t.original_id });
        }
        components.push(Mesh3 { vertices, triangles });
    }
    components
}

/// Split a cross-section into connected components: each outer (CCW)
/// contour starts a new component; each hole (CW) joins the smallest
/// enclosing outer contour's component.
pub fn connected_components_2d(polygon: &Polygon2) -> Vec<Polygon2> {
    let mut outers: Vec<(Vec<Point2>, Bounds2)> = Vec::new();
    let mut holes: Vec<Vec<Point2>> = Vec::new();
    for c in &polygon.contours {
        if c.len() < 3 {
            continue;
        }
        if Polygon2::contour_signed_area(c) >= 0.0 {
            let mut b = Bounds2::empty();
            for p in c {
                b.include(p);
            }
            outers.push((c.clone(), b));
        } else {
            holes.push(c.clone());
        }
    }

    let mut components: Vec<Polygon2> = outers
        .iter()
        .map(|(c, _)| Polygon2 { contours: vec![c.clone()] })
        .collect();

    for hole in holes {
        let anchor = hole[0];
        let mut best: Option<(usize, f64)> = None;
        for (i, (_, b)) in outers.iter().enumerate() {
            if b.min.x <= anchor.x && anchor.x <= b.max.x && b.min.y <= anchor.y && anchor.y <= b.max.y {
                let area = (b.max.x - b.min.x) * (b.max.y - b.min.y);
                let better = match best {
                    Some((_, a)) => area < a,
                    None => true,
                };
                if better {
                    best = Some((i, area));
                }
            }
        }
        if let Some((i, _)) = best {
            components[i].contours.push(hole);
        } else if let Some(first) = components.first_mut() {
            first.contours.push(hole);
        }
    }
    components
}

#[cfg(test)]
mod tests {
    use super::*;
    use vcad_kernel_primitives::{circle, square};

    #[test]
    fn triangulate_square_gives_two_triangles() {
        let sq = square(Vec2::new(2.0, 2.0));
        let tris = triangulate(&sq);
        assert_eq!(tris.len(), 2);
    }

    #[test]
    fn extrude_linear_cube_has_volume() {
        let sq = square(Vec2::new(2.0, 2.0));
        let mesh = extrude_linear(&sq, 2.0, 0.0, Vec2::new(1.0, 1.0), Some(1));
        assert!((mesh.signed_volume().abs() - 8.0).abs() < 1e-9);
    }

    #[test]
    fn revolve_full_circle_approximates_sphere_like_volume() {
        // revolving a half-disc profile (quarter circle outline) around Z
        // full 360 degrees gives a rounded solid with positive volume
        let mut pts = Vec::new();
        for i in 0..=16 {
            let t = std::f64::consts::FRAC_PI_2 * (i as f64) / 16.0;
            pts.push(Point2::new(t.cos(), t.sin()));
        }
        pts.push(Point2::new(0.0, 0.0));
        let profile = vcad_kernel_primitives::polygon(pts);
        let mesh = extrude_rotational(&profile, 360.0, 32, Some(1));
        assert!(mesh.signed_volume().abs() > 0.0);
    }

    #[test]
    fn offset_grows_area() {
        let c = circle(1.0, 64);
        let grown = offset(&c, 0.5, 16);
        assert!(grown.area() > c.area());
    }

    #[test]
    fn connected_components_splits_disjoint_triangles() {
        let mesh = Mesh3 {
            vertices: vec![
                Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0), Point3::new(0.0, 1.0, 0.0),
                Point3::new(10.0, 0.0, 0.0), Point3::new(11.0, 0.0, 0.0), Point3::new(10.0, 1.0, 0.0),
            ],
            triangles: vec![
                Triangle { indices: [0, 1, 2], original_id: Some(1) },
                Triangle { indices: [3, 4, 5], original_id: Some(2) },
            ],
        };
        let comps = connected_components(&mesh);
        assert_eq!(comps.len(), 2);
    }

    #[test]
    fn connected_components_2d_assigns_hole_to_enclosing_outer() {
        let outer_a = vec![Point2::new(0.0, 0.0), Point2::new(10.0, 0.0), Point2::new(10.0, 10.0), Point2::new(0.0, 10.0)];
        let hole = vec![Point2::new(4.0, 4.0), Point2::new(4.0, 6.0), Point2::new(6.0, 6.0), Point2::new(6.0, 4.0)];
        let outer_b = vec![Point2::new(20.0, 0.0), Point2::new(24.0, 0.0), Point2::new(24.0, 4.0), Point2::new(20.0, 4.0)];
        let poly = Polygon2 { contours: vec![outer_a, hole.into_iter().rev().collect(), outer_b] };
        let comps = connected_components_2d(&poly);
        assert_eq!(comps.len(), 2);
        assert_eq!(comps.iter().find(|c| c.contours.len() == 2).unwrap().contours.len(), 2);
    }
}
