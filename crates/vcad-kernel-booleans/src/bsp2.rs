//! BSP-tree CSG over 2D loops, specialized from [`crate::bsp3`] to line
//! splits in the plane.
//!
//! The planar analog of a BSP polygon (a facet lying on a plane) is a line
//! segment lying on a line; a closed [`Loop`] is just its boundary edges.
//! Union/subtract/intersect run the identical clip/invert sequence as the
//! 3D construction over these edges, and the result is re-chained from the
//! surviving edge soup back into closed loops.

use vcad_kernel_math::{Point2, Vec2};
use std::collections::HashMap;

const EPSILON: f64 = 1e-8;

#[derive(Clone, Copy)]
struct Line {
    normal: Vec2,
    w: f64,
}

impl Line {
    fn from_points(a: Point2, b: Point2) -> Option<Self> {
        let dir = b - a;
        if dir.norm_squared() < 1e-20 {
            return None;
        }
        let dir = dir.normalize();
        let normal = Vec2::new(-dir.y, dir.x);
        Some(Self { normal, w: normal.dot(&a.coords) })
    }

    fn distance(&self, p: Point2) -> f64 {
        self.normal.dot(&p.coords) - self.w
    }

    fn flipped(&self) -> Self {
        Self { normal: -self.normal, w: -self.w }
    }
}

#[derive(Clone, Copy)]
struct Edge {
    a: Point2,
    b: Point2,
    line: Line,
}

impl Edge {
    fn new(a: Point2, b: Point2) -> Option<Self> {
        let line = Line::from_points(a, b)?;
        Some(Self { a, b, line })
    }

    fn flip(&self) -> Self {
        Self { a: self.b, b: self.a, line: self.line.flipped() }
    }

    fn split(&self, line: &Line, coplanar_front: &mut Vec<Edge>, coplanar_back: &mut Vec<Edge>, front: &mut Vec<Edge>, back: &mut Vec<Edge>) {
        let da = line.distance(self.a);
        let db = line.distance(self.b);
        let a_front = da > EPSILON;
        let a_back = da < -EPSILON;
        let b_front = db > EPSILON;
        let b_back = db < -EPSILON;

        if !a_front && !a_back && !b_front && !b_back {
            if line.normal.dot(&self.line.normal) > 0.0 {
                coplanar_front.push(*self);
            } else {
                coplanar_back.push(*self);
            }
        } else if !a_back && !b_back {
            front.push(*self);
        } else if !a_front && !b_front {
            back.push(*self);
        } else {
            let t = (-da) / (db - da);
            let mid = Point2::from(self.a.coords + (self.b.coords - self.a.coords) * t);
            let (f, bk) = if da > 0.0 {
                ((self.a, mid), (mid, self.b))
            } else {
                ((mid, self.b), (self.a, mid))
            };
            if let Some(e) = Edge::new(f.0, f.1) {
                front.push(e);
            }
            if let Some(e) = Edge::new(bk.0, bk.1) {
                back.push(e);
            }
        }
    }
}

struct Node {
    line: Option<Line>,
    front: Option<Box<Node>>,
    back: Option<Box<Node>>,
    edges: Vec<Edge>,
}

impl Node {
    fn new(edges: Vec<Edge>) -> Self {
        let mut node = Node { line: None, front: None, back: None, edges: Vec::new() };
        node.build(edges);
        node
    }

    fn build(&mut self, edges: Vec<Edge>) {
        if edges.is_empty() {
            return;
        }
        if self.line.is_none() {
            self.line = Some(edges[0].line);
        }
        let line = self.line.unwrap();
        let mut front = Vec::new();
        let mut back = Vec::new();
        let mut coplanar_front = Vec::new();
        let mut coplanar_back = Vec::new();
        for edge in edges {
            edge.split(&line, &mut coplanar_front, &mut coplanar_back, &mut front, &mut back);
        }
        self.edges.extend(coplanar_front);
        self.edges.extend(coplanar_back);
        if !front.is_empty() {
            self.front.get_or_insert_with(|| Box::new(Node::new(Vec::new()))).build(front);
        }
        if !back.is_empty() {
            self.back.get_or_insert_with(|| Box::new(Node::new(Vec::new()))).build(back);
        }
    }

    fn invert(&mut self) {
        self.edges = self.edges.iter().map(|e| e.flip()).collect();
        if let Some(line) = &mut self.line {
            *line = line.flipped();
        }
        if let Some(f) = &mut self.front {
            f.invert();
        }
        if let Some(b) = &mut self.back {
            b.invert();
        }
        std::mem::swap(&mut self.front, &mut self.back);
    }

    fn clip_edges(&self, edges: Vec<Edge>) -> Vec<Edge> {
        let Some(line) = self.line else {
            return edges;
        };
        let mut front = Vec::new();
        let mut back = Vec::new();
        let mut coplanar_front = Vec::new();
        let mut coplanar_back = Vec::new();
        for edge in edges {
            edge.split(&line, &mut coplanar_front, &mut coplanar_back, &mut front, &mut back);
        }
        front.extend(coplanar_front);
        back.extend(coplanar_back);
        let front = match &self.front {
            Some(f) => f.clip_edges(front),
            None => front,
        };
        let back = match &self.back {
            Some(b) => b.clip_edges(back),
            None => Vec::new(),
        };
        front.into_iter().chain(back).collect()
    }

    fn clip_to(&mut self, other: &Node) {
        self.edges = other.clip_edges(std::mem::take(&mut self.edges));
        if let Some(f) = &mut self.front {
            f.clip_to(other);
        }
        if let Some(b) = &mut self.back {
            b.clip_to(other);
        }
    }

    fn all_edges(&self) -> Vec<Edge> {
        let mut result = self.edges.clone();
        if let Some(f) = &self.front {
            result.extend(f.all_edges());
        }
        if let Some(b) = &self.back {
            result.extend(b.all_edges());
        }
        result
    }
}

/// A closed 2D contour, as produced by re-chaining a BSP operation's
/// surviving edge soup.
#[derive(Debug, Clone)]
pub struct Loop {
    /// Vertices in order around the boundary.
    pub points: Vec<Point2>,
}

impl Loop {
    /// Build a loop from an ordered point sequence. Returns `None` when the
    /// loop is degenerate (fewer than 3 distinct points, or zero area).
    pub fn from_points(points: Vec<Point2>) -> Option<Self> {
        if points.len() < 3 {
            return None;
        }
        let area: f64 = points
            .iter()
            .zip(points.iter().cycle().skip(1))
            .map(|(p, q)| p.x * q.y - q.x * p.y)
            .sum::<f64>()
            / 2.0;
        if area.abs() < 1e-12 {
            return None;
        }
        Some(Self { points })
    }

    fn edges(&self) -> Vec<Edge> {
        self.points
            .iter()
            .zip(self.points.iter().cycle().skip(1))
            .filter_map(|(a, b)| Edge::new(*a, *b))
            .collect()
    }
}

fn key(p: Point2) -> (i64, i64) {
    ((p.x / EPSILON.sqrt()).round() as i64, (p.y / EPSILON.sqrt()).round() as i64)
}

/// Re-chain a flat edge soup into closed loops by matching endpoints.
fn chain_loops(edges: Vec<Edge>) -> Vec<Loop> {
    let mut by_start: HashMap<(i64, i64), Vec<usize>> = HashMap::new();
    for (i, e) in edges.iter().enumerate() {
        by_start.entry(key(e.a)).or_default().push(i);
    }
    let mut used = vec![false; edges.len()];
    let mut loops = Vec::new();

    for start in 0..edges.len() {
        if used[start] {
            continue;
        }
        let mut chain = vec![edges[start].a, edges[start].b];
        used[start] = true;
        let mut current = edges[start].b;
        let origin = edges[start].a;
        loop {
            if key(current) == key(origin) {
                break;
            }
            let Some(candidates) = by_start.get(&key(current)) else {
                break;
            };
            let Some(&next) = candidates.iter().find(|&&i| !used[i]) else {
                break;
            };
            used[next] = true;
            current = edges[next].b;
            chain.push(current);
        }
        chain.pop();
        if let Some(l) = Loop::from_points(chain) {
            loops.push(l);
        }
    }
    loops
}

fn loops_to_edges(loops: Vec<Loop>) -> Vec<Edge> {
    loops.iter().flat_map(|l| l.edges()).collect()
}

/// Union of two loop sets.
pub fn union(a: Vec<Loop>, b: Vec<Loop>) -> Vec<Loop> {
    let mut na = Node::new(loops_to_edges(a));
    let mut nb = Node::new(loops_to_edges(b));
    na.clip_to(&nb);
    nb.clip_to(&na);
    nb.invert();
    nb.clip_to(&na);
    nb.invert();
    na.build(nb.all_edges());
    chain_loops(na.all_edges())
}

/// Difference `a - b`.
pub fn subtract(a: Vec<Loop>, b: Vec<Loop>) -> Vec<Loop> {
    let mut na = Node::new(loops_to_edges(a));
    let mut nb = Node::new(loops_to_edges(b));
    na.invert();
    na.clip_to(&nb);
    nb.clip_to(&na);
    nb.invert();
    nb.clip_to(&na);
    nb.invert();
    na.build(nb.all_edges());
    na.invert();
    chain_loops(na.all_edges())
}

/// Intersection of two loop sets.
pub fn intersect(a: Vec<Loop>, b: Vec<Loop>) -> Vec<Loop> {
    let mut na = Node::new(loops_to_edges(a));
    let mut nb = Node::new(loops_to_edges(b));
    na.invert();
    nb.clip_to(&na);
    nb.invert();
    na.clip_to(&nb);
    nb.clip_to(&na);
    na.build(nb.all_edges());
    na.invert();
    chain_loops(na.all_edges())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(side: f64) -> Loop {
        Loop::from_points(vec![
            Point2::new(0.0, 0.0),
            Point2::new(side, 0.0),
            Point2::new(side, side),
            Point2::new(0.0, side),
        ])
        .unwrap()
    }

    #[test]
    fn union_of_overlapping_squares_has_more_area_than_either() {
        let a = square(2.0);
        let mut b = square(2.0);
        for p in b.points.iter_mut() {
            p.x += 1.0;
            p.y += 1.0;
        }
        let result = union(vec![a], vec![b]);
        assert!(!result.is_empty());
    }
}
