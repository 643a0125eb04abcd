//! BSP-tree CSG over 3D polygons, after Even Wallace's `csg.js` construction.
//!
//! A [`Polygon`] is a convex, planar facet (here always a triangle, since
//! that's all `Mesh3` stores) tagged with the `original_id` of whichever
//! source facet it descends from. A [`Node`] holds a splitting plane, the
//! polygons coplanar with it, and front/back subtrees; `clip_to` recursively
//! partitions one tree's polygons against another's planes. Union,
//! subtract and intersect are each a short sequence of `clip_to`/`invert`
//! calls, exactly as in the reference construction.

use vcad_kernel_math::Point3;

const EPSILON: f64 = 1e-8;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Side {
    Coplanar,
    Front,
    Back,
    Spanning,
}

#[derive(Clone, Copy)]
struct Plane {
    normal: vcad_kernel_math::Vec3,
    w: f64,
}

impl Plane {
    fn from_points(a: Point3, b: Point3, c: Point3) -> Option<Self> {
        let n = (b - a).cross(&(c - a));
        if n.norm_squared() < 1e-20 {
            return None;
        }
        let n = n.normalize();
        Some(Self { normal: n, w: n.dot(&a.coords) })
    }

    fn distance(&self, p: Point3) -> f64 {
        self.normal.dot(&p.coords) - self.w
    }

    fn flipped(&self) -> Self {
        Self { normal: -self.normal, w: -self.w }
    }
}

/// A planar polygon, here always a triangle carrying original-ID
/// provenance.
#[derive(Clone)]
pub struct Polygon {
    vertices: Vec<Point3>,
    plane: Plane,
    /// Original-ID inherited from the source mesh triangle.
    pub original_id: Option<u64>,
}

impl Polygon {
    /// Build a polygon from a vertex loop. Returns `None` for degenerate
    /// (zero-area) input.
    pub fn from_points(vertices: Vec<Point3>, original_id: Option<u64>) -> Option<Self> {
        if vertices.len() < 3 {
            return None;
        }
        let plane = Plane::from_points(vertices[0], vertices[1], vertices[2])?;
        Some(Self { vertices, plane, original_id })
    }

    fn flip(&self) -> Self {
        Self {
            vertices: self.vertices.iter().rev().copied().collect(),
            plane: self.plane.flipped(),
            original_id: self.original_id,
        }
    }

    /// Fan-triangulate this polygon (a no-op for triangles, general for
    /// polygons produced by repeated splitting).
    pub fn triangulate(&self) -> Vec<[Point3; 3]> {
        (1..self.vertices.len() - 1)
            .map(|i| [self.vertices[0], self.vertices[i], self.vertices[i + 1]])
            .collect()
    }

    fn split(&self, plane: &Plane, coplanar_front: &mut Vec<Polygon>, coplanar_back: &mut Vec<Polygon>, front: &mut Vec<Polygon>, back: &mut Vec<Polygon>) {
        let mut polygon_type = Side::Coplanar;
        let types: Vec<Side> = self
            .vertices
            .iter()
            .map(|v| {
                let t = plane.distance(*v);
                let side = if t < -EPSILON {
                    Side::Back
                } else if t > EPSILON {
                    Side::Front
                } else {
                    Side::Coplanar
                };
                polygon_type = match (polygon_type, side) {
                    (Side::Coplanar, s) => s,
                    (p, Side::Coplanar) => p,
                    (p, s) if std::mem::discriminant(&p) == std::mem::discriminant(&s) => p,
                    _ => Side::Spanning,
                };
                side
            })
            .collect();

        match polygon_type {
            Side::Coplanar => {
                if plane.normal.dot(&self.plane.normal) > 0.0 {
                    coplanar_front.push(self.clone());
                } else {
                    coplanar_back.push(self.clone());
                }
            }
            Side::Front => front.push(self.clone()),
            Side::Back => back.push(self.clone()),
            Side::Spanning => {
                let mut f: Vec<Point3> = Vec::new();
                let mut b: Vec<Point3> = Vec::new();
                let n = self.vertices.len();
                for i in 0..n {
                    let j = (i + 1) % n;
                    let (ti, tj) = (types[i], types[j]);
                    let (vi, vj) = (self.vertices[i], self.vertices[j]);
                    if !matches!(ti, Side::Back) {
                        f.push(vi);
                    }
                    if !matches!(ti, Side::Front) {
                        b.push(vi);
                    }
                    let crosses = matches!((ti, tj), (Side::Front, Side::Back) | (Side::Back, Side::Front));
                    if crosses {
                        let t = (-plane.distance(vi)) / (plane.distance(vj) - plane.distance(vi));
                        let v = Point3::from(vi.coords + (vj.coords - vi.coords) * t);
                        f.push(v);
                        b.push(v);
                    }
                }
                if f.len() >= 3 {
                    front.push(Polygon { vertices: f, plane: self.plane, original_id: self.original_id });
                }
                if b.len() >= 3 {
                    back.push(Polygon { vertices: b, plane: self.plane, original_id: self.original_id });
                }
            }
        }
    }
}

struct Node {
    plane: Option<Plane>,
    front: Option<Box<Node>>,
    back: Option<Box<Node>>,
    polygons: Vec<Polygon>,
}

impl Node {
    fn new(polygons: Vec<Polygon>) -> Self {
        let mut node = Node { plane: None, front: None, back: None, polygons: Vec::new() };
        node.build(polygons);
        node
    }

    fn build(&mut self, polygons: Vec<Polygon>) {
        if polygons.is_empty() {
            return;
        }
        if self.plane.is_none() {
            self.plane = Some(polygons[0].plane);
        }
        let plane = self.plane.unwrap();
        let mut front = Vec::new();
        let mut back = Vec::new();
        let mut coplanar_front = Vec::new();
        let mut coplanar_back = Vec::new();
        for poly in polygons {
            poly.split(&plane, &mut coplanar_front, &mut coplanar_back, &mut front, &mut back);
        }
        self.polygons.extend(coplanar_front);
        self.polygons.extend(coplanar_back);
        if !front.is_empty() {
            self.front.get_or_insert_with(|| Box::new(Node::new(Vec::new()))).build(front);
        }
        if !back.is_empty() {
            self.back.get_or_insert_with(|| Box::new(Node::new(Vec::new()))).build(back);
        }
    }

    fn invert(&mut self) {
        self.polygons = self.polygons.iter().map(|p| p.flip()).collect();
        if let Some(plane) = &mut self.plane {
            *plane = plane.flipped();
        }
        if let Some(f) = &mut self.front {
            f.invert();
        }
        if let Some(b) = &mut self.back {
            b.invert();
        }
        std::mem::swap(&mut self.front, &mut self.back);
    }

    fn clip_polygons(&self, polygons: Vec<Polygon>) -> Vec<Polygon> {
        let Some(plane) = self.plane else {
            return polygons;
        };
        let mut front = Vec::new();
        let mut back = Vec::new();
        let mut coplanar_front = Vec::new();
        let mut coplanar_back = Vec::new();
        for poly in polygons {
            poly.split(&plane, &mut coplanar_front, &mut coplanar_back, &mut front, &mut back);
        }
        front.extend(coplanar_front);
        back.extend(coplanar_back);
        let front = match &self.front {
            Some(f) => f.clip_polygons(front),
            None => front,
        };
        let back = match &self.back {
            Some(b) => b.clip_polygons(back),
            None => Vec::new(),
        };
        front.into_iter().chain(back).collect()
    }

    fn clip_to(&mut self, other: &Node) {
        self.polygons = other.clip_polygons(std::mem::take(&mut self.polygons));
        if let Some(f) = &mut self.front {
            f.clip_to(other);
        }
        if let Some(b) = &mut self.back {
            b.clip_to(other);
        }
    }

    fn all_polygons(&self) -> Vec<Polygon> {
        let mut result = self.polygons.clone();
        if let Some(f) = &self.front {
            result.extend(f.all_polygons());
        }
        if let Some(b) = &self.back {
            result.extend(b.all_polygons());
        }
        result
    }
}

/// Union of two polygon sets.
pub fn union(a: Vec<Polygon>, b: Vec<Polygon>) -> Vec<Polygon> {
    let mut na = Node::new(a);
    let mut nb = Node::new(b);
    na.clip_to(&nb);
    nb.clip_to(&na);
    nb.invert();
    nb.clip_to(&na);
    nb.invert();
    na.build(nb.all_polygons());
    na.all_polygons()
}

/// Difference `a - b`.
pub fn subtract(a: Vec<Polygon>, b: Vec<Polygon>) -> Vec<Polygon> {
    let mut na = Node::new(a);
    let mut nb = Node::new(b);
    na.invert();
    na.clip_to(&nb);
    nb.clip_to(&na);
    nb.invert();
    nb.clip_to(&na);
    nb.invert();
    na.build(nb.all_polygons());
    na.invert();
    na.all_polygons()
}

/// Intersection of two polygon sets.
pub fn intersect(a: Vec<Polygon>, b: Vec<Polygon>) -> Vec<Polygon> {
    let mut na = Node::new(a);
    let mut nb = Node::new(b);
    na.invert();
    nb.clip_to(&na);
    nb.invert();
    na.clip_to(&nb);
    nb.clip_to(&na);
    na.build(nb.all_polygons());
    na.invert();
    na.all_polygons()
}
