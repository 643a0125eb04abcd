//! Intermediate representation for the vcad geometry core.
//!
//! The IR is a dimensionality-polymorphic, hashable, immutable DAG. It is
//! purely declarative — no mesh data lives here, only the operation graph
//! that [`Geometry::build`](https://docs.rs/vcad) lowers to and that the
//! evaluation cache later dispatches to the concrete kernel. Smart
//! constructors on [`Node`] are the only way to build one and enforce the
//! canonicalization invariants (empty-pruning, transform-folding,
//! non-positive-dimension collapse) so that two trees differing only in
//! folded structure are guaranteed equal and hash-equal.

use serde::{Deserialize, Serialize};
use std::hash::Hash;
use std::sync::Arc;

mod quantize;
pub use quantize::{Quantized, QVec2, QVec3};

mod affine;
pub use affine::{Affine2, Affine3, Compose};

mod shape;
pub use shape::{ExtrusionMode, FillRule, OffsetJoin, OffsetParams, ProjectionMode, Shape2D, Shape3D};

mod elements;
pub use elements::{MaterialAssignment, Part, ResultElements, Semantic};

mod environment;
pub use environment::{Environment, OperationSign, Segmentation};

/// Opaque key into an [`EvaluationContext`](https://docs.rs/vcad)'s
/// key-materialized cache — a `Materialized`/`Raw` node references a
/// concrete result stored there rather than computing one.
pub type CacheKey = String;

/// Key used to assign a material to a sub-mesh surviving through CSG via
/// its original-ID (§4.4).
pub type OriginalIdKey = u64;

/// Compile-time dimensionality tag parameterizing [`Node`], `Environment`,
/// and the concrete kernel types. `Dim2` and `Dim3` are the only
/// implementors.
pub trait Dim: Copy + Clone + std::fmt::Debug + PartialEq + Eq + Hash + 'static {
    /// This dimension's primitive-shape sum type.
    type Shape: Clone + std::fmt::Debug + PartialEq + Eq + Hash + Serialize + for<'de> Deserialize<'de>;
    /// This dimension's affine transform representation.
    type Affine: Compose + Serialize + for<'de> Deserialize<'de>;

    /// Derive the environment a child built under transform `t` sees.
    /// `Environment::accumulated_transform` only tracks the 3D frame, so
    /// 2D transforms leave it untouched — a 2D sketch has no "natural up
    /// direction" of its own, only the solid it's eventually extruded into
    /// does.
    fn thread_environment(env: &Environment, t: &Self::Affine) -> Environment;
}

/// The 2D dimensionality marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dim2;

impl Dim for Dim2 {
    type Shape = Shape2D;
    type Affine = Affine2;

    fn thread_environment(env: &Environment, _t: &Self::Affine) -> Environment {
        env.clone()
    }
}

/// The 3D dimensionality marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dim3;

impl Dim for Dim3 {
    type Shape = Shape3D;
    type Affine = Affine3;

    fn thread_environment(env: &Environment, t: &Self::Affine) -> Environment {
        env.applying_transform(t)
    }
}

/// Boolean combination kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BooleanKind {
    /// Combine all children.
    Union,
    /// First child minus the rest.
    Difference,
    /// Overlap of all children.
    Intersection,
}

/// The sum of operations a [`Node`] can represent. Not public: constructed
/// only through `Node`'s canonicalizing smart constructors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
enum NodeKind<D: Dim> {
    Empty,
    Shape(D::Shape),
    Boolean(BooleanKind, Vec<Node<D>>),
    Transform(Node<D>, D::Affine),
    ConvexHull(Node<D>),
    Offset(Node<D>, OffsetParams),
    /// 2D-only in practice: a cross-section cut from a 3D child. Present
    /// generically (see module docs) but only ever constructed via
    /// `Node::<Dim2>::projection`.
    Projection(Node<Dim3>, ProjectionMode),
    /// 3D-only in practice: a solid built by sweeping a 2D child. Only
    /// ever constructed via `Node::<Dim3>::extrusion`.
    Extrusion(Node<Dim2>, ExtrusionMode),
    /// A handle to a concrete result already stored in the evaluation
    /// cache under `key` (imports, SDF extraction, warped meshes).
    Materialized(CacheKey),
    /// Like `Materialized`, but marks the value as kernel-opaque raw
    /// input that bypasses further IR-level canonicalization.
    Raw(CacheKey),
    /// Tags a subtree with an original-ID so materials can follow it
    /// through CSG (§4.4).
    Tagged(Node<D>, OriginalIdKey),
}

/// An immutable node in the geometry IR, parameterized by dimensionality.
///
/// `Node` is cheap to clone (an `Arc`-backed kind plus an optional debug
/// label) and compares/hashes only on its structural `kind` — the
/// `debug_label` is diagnostic-only and never participates in equality,
/// hashing, or canonicalization, matching a `.name`/`.warning()` debug tag
/// a caller may have attached.
#[derive(Debug, Clone)]
pub struct Node<D: Dim> {
    kind: Arc<NodeKind<D>>,
    debug_label: Option<Arc<str>>,
}

impl<D: Dim> PartialEq for Node<D> {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl<D: Dim> Eq for Node<D> {}

impl<D: Dim> Hash for Node<D> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
    }
}

impl<D: Dim> Serialize for Node<D> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.kind.serialize(serializer)
    }
}

impl<'de, D: Dim> Deserialize<'de> for Node<D> {
    fn deserialize<De: serde::Deserializer<'de>>(deserializer: De) -> Result<Self, De::Error> {
        Ok(Self { kind: Arc::new(NodeKind::deserialize(deserializer)?), debug_label: None })
    }
}

/// A read-only view into a [`Node`]'s structure, for external recursive
/// evaluators (the evaluation cache dispatching to the kernel). Distinct
/// from the private `NodeKind` storage: this is how the core introspects
/// a node without being able to construct one outside of `Node`'s
/// canonicalizing smart constructors.
pub enum NodeView<'a, D: Dim> {
    /// The canonical empty node.
    Empty,
    /// A primitive shape.
    Shape(&'a D::Shape),
    /// A boolean combination of children, in IR order.
    Boolean(BooleanKind, &'a [Node<D>]),
    /// A child under an affine transform.
    Transform(&'a Node<D>, &'a D::Affine),
    /// The convex hull of a child's resolved points.
    ConvexHull(&'a Node<D>),
    /// A child grown or shrunk by an offset.
    Offset(&'a Node<D>, &'a OffsetParams),
    /// A cross-section cut from a 3D child (only produced for `Node<Dim2>`).
    Projection(&'a Node<Dim3>, ProjectionMode),
    /// A solid swept from a 2D child (only produced for `Node<Dim3>`).
    Extrusion(&'a Node<Dim2>, &'a ExtrusionMode),
    /// A handle to a concrete result materialized in the evaluation cache.
    Materialized(&'a CacheKey),
    /// A handle to kernel-opaque raw input.
    Raw(&'a CacheKey),
    /// A subtree tagged with an original-ID for material tracking.
    Tagged(&'a Node<D>, OriginalIdKey),
}

impl<D: Dim> Node<D> {
    fn from_kind(kind: NodeKind<D>) -> Self {
        Self { kind: Arc::new(kind), debug_label: None }
    }

    /// The canonical empty node — identity for union, absorbing for
    /// intersection.
    pub fn empty() -> Self {
        Self::from_kind(NodeKind::Empty)
    }

    /// True if this node is the canonical empty node.
    pub fn is_empty(&self) -> bool {
        matches!(*self.kind, NodeKind::Empty)
    }

    /// Attach a diagnostic label (Cadova's debug `name`/comment tag).
    /// Never participates in equality, hashing, or canonicalization.
    pub fn with_debug_label(mut self, label: impl Into<Arc<str>>) -> Self {
        self.debug_label = Some(label.into());
        self
    }

    /// The diagnostic label, if any.
    pub fn debug_label(&self) -> Option<&str> {
        self.debug_label.as_deref()
    }

    fn shape(shape: D::Shape) -> Self {
        Self::from_kind(NodeKind::Shape(shape))
    }

    /// Combine `children` with `kind`, applying the canonicalization
    /// invariants: empty operands are pruned from unions, a difference
    /// with an empty base is empty, an intersection containing an empty
    /// operand is empty, and a boolean with one surviving child collapses
    /// to that child.
    pub fn boolean(kind: BooleanKind, children: Vec<Node<D>>) -> Self {
        match kind {
            BooleanKind::Union => {
                let surviving: Vec<Node<D>> = children.into_iter().filter(|c| !c.is_empty()).collect();
                match surviving.len() {
                    0 => Self::empty(),
                    1 => surviving.into_iter().next().unwrap(),
                    _ => Self::from_kind(NodeKind::Boolean(kind, surviving)),
                }
            }
            BooleanKind::Difference => {
                let mut iter = children.into_iter();
                let Some(base) = iter.next() else { return Self::empty() };
                if base.is_empty() {
                    return Self::empty();
                }
                let subtrahends: Vec<Node<D>> = iter.filter(|c| !c.is_empty()).collect();
                if subtrahends.is_empty() {
                    return base;
                }
                let mut all = vec![base];
                all.extend(subtrahends);
                Self::from_kind(NodeKind::Boolean(kind, all))
            }
            BooleanKind::Intersection => {
                if children.is_empty() || children.iter().any(Node::is_empty) {
                    return Self::empty();
                }
                match children.len() {
                    1 => children.into_iter().next().unwrap(),
                    _ => Self::from_kind(NodeKind::Boolean(kind, children)),
                }
            }
        }
    }

    /// Union of two nodes.
    pub fn union(a: Self, b: Self) -> Self {
        Self::boolean(BooleanKind::Union, vec![a, b])
    }

    /// `a` minus `b`.
    pub fn difference(a: Self, b: Self) -> Self {
        Self::boolean(BooleanKind::Difference, vec![a, b])
    }

    /// Overlap of `a` and `b`.
    pub fn intersection(a: Self, b: Self) -> Self {
        Self::boolean(BooleanKind::Intersection, vec![a, b])
    }

    /// Apply an affine transform, folding into an existing `Transform`
    /// wrapper rather than nesting.
    pub fn transform(self, t: D::Affine) -> Self {
        if self.is_empty() {
            return self;
        }
        match &*self.kind {
            NodeKind::Transform(child, existing) => {
                let composed = existing.compose(&t);
                Self::from_kind(NodeKind::Transform(child.clone(), composed))
            }
            _ => Self::from_kind(NodeKind::Transform(self, t)),
        }
    }

    /// Convex hull of this node's resolved point set.
    pub fn convex_hull(self) -> Self {
        if self.is_empty() {
            return self;
        }
        Self::from_kind(NodeKind::ConvexHull(self))
    }

    /// A handle to a concrete result already materialized in the
    /// evaluation cache under `key`.
    pub fn materialized(key: CacheKey) -> Self {
        Self::from_kind(NodeKind::Materialized(key))
    }

    /// A handle to kernel-opaque raw input stored under `key`.
    pub fn raw(key: CacheKey) -> Self {
        Self::from_kind(NodeKind::Raw(key))
    }

    /// Tag this subtree with an original-ID for material tracking
    /// through CSG.
    pub fn tagged(self, key: OriginalIdKey) -> Self {
        Self::from_kind(NodeKind::Tagged(self, key))
    }

    /// A read-only view of this node's structure, for recursive
    /// evaluators outside this crate.
    pub fn view(&self) -> NodeView<'_, D> {
        match &*self.kind {
            NodeKind::Empty => NodeView::Empty,
            NodeKind::Shape(shape) => NodeView::Shape(shape),
            NodeKind::Boolean(kind, children) => NodeView::Boolean(*kind, children),
            NodeKind::Transform(child, t) => NodeView::Transform(child, t),
            NodeKind::ConvexHull(child) => NodeView::ConvexHull(child),
            NodeKind::Offset(child, params) => NodeView::Offset(child, params),
            NodeKind::Projection(child, mode) => NodeView::Projection(child, *mode),
            NodeKind::Extrusion(child, mode) => NodeView::Extrusion(child, mode),
            NodeKind::Materialized(key) => NodeView::Materialized(key),
            NodeKind::Raw(key) => NodeView::Raw(key),
            NodeKind::Tagged(child, key) => NodeView::Tagged(child, *key),
        }
    }
}

impl Node<Dim2> {
    /// An axis-aligned rectangle with corner at the origin. Non-positive
    /// dimensions collapse to `Empty`.
    pub fn rectangle(width: f64, height: f64) -> Self {
        if width <= 0.0 || height <= 0.0 {
            return Self::empty();
        }
        Self::shape(Shape2D::Rectangle { width: Quantized::new(width), height: Quantized::new(height) })
    }

    /// A regular polygon approximating a circle.
    pub fn circle(radius: f64, segments: u32) -> Self {
        if radius <= 0.0 {
            return Self::empty();
        }
        Self::shape(Shape2D::Circle { radius: Quantized::new(radius), segments })
    }

    /// An explicit point-loop polygon with the given fill rule.
    pub fn polygon(points: Vec<(f64, f64)>, fill_rule: FillRule) -> Self {
        if points.len() < 3 {
            return Self::empty();
        }
        let points = points.into_iter().map(|(x, y)| QVec2::new(x, y)).collect();
        Self::shape(Shape2D::Polygon { points, fill_rule })
    }

    /// A primitive that is the convex hull of a raw point set (distinct
    /// from the [`Node::convex_hull`] operator, which hulls an existing
    /// node's resolved points).
    pub fn convex_hull_points(points: Vec<(f64, f64)>) -> Self {
        if points.len() < 3 {
            return Self::empty();
        }
        Self::shape(Shape2D::ConvexHullPoints(points.into_iter().map(|(x, y)| QVec2::new(x, y)).collect()))
    }

    /// Grow or shrink the boundary by `amount`.
    pub fn offset(self, amount: f64, join: OffsetJoin, miter_limit: f64, segments: u32) -> Self {
        if self.is_empty() {
            return self;
        }
        let params = OffsetParams { amount: Quantized::new(amount), join, miter_limit: Quantized::new(miter_limit.max(2.0)), segments };
        Self::from_kind(NodeKind::Offset(self, params))
    }

    /// A cross-section cut from a 3D solid (full silhouette or a single
    /// `z` slice).
    pub fn projection(child: Node<Dim3>, mode: ProjectionMode) -> Self {
        if child.is_empty() {
            return Self::empty();
        }
        Self::from_kind(NodeKind::Projection(child, mode))
    }
}

impl Node<Dim3> {
    /// An axis-aligned box with corner at the origin. Non-positive
    /// dimensions collapse to `Empty`.
    pub fn cuboid(size_x: f64, size_y: f64, size_z: f64) -> Self {
        if size_x <= 0.0 || size_y <= 0.0 || size_z <= 0.0 {
            return Self::empty();
        }
        Self::shape(Shape3D::Cuboid(QVec3::new(size_x, size_y, size_z)))
    }

    /// A sphere centered at the origin.
    pub fn sphere(radius: f64, segments: u32) -> Self {
        if radius <= 0.0 {
            return Self::empty();
        }
        Self::shape(Shape3D::Sphere { radius: Quantized::new(radius), segments })
    }

    /// A cylinder (or frustum, if the radii differ) along Z.
    pub fn cylinder(bottom_radius: f64, top_radius: f64, height: f64, segments: u32) -> Self {
        if height <= 0.0 || (bottom_radius <= 0.0 && top_radius <= 0.0) {
            return Self::empty();
        }
        Self::shape(Shape3D::Cylinder {
            bottom_radius: Quantized::new(bottom_radius),
            top_radius: Quantized::new(top_radius),
            height: Quantized::new(height),
            segments,
        })
    }

    /// A primitive that is the convex hull of a raw 3D point set.
    pub fn convex_hull_points(points: Vec<(f64, f64, f64)>) -> Self {
        if points.len() < 4 {
            return Self::empty();
        }
        Self::shape(Shape3D::ConvexHullPoints(points.into_iter().map(|(x, y, z)| QVec3::new(x, y, z)).collect()))
    }

    /// A mesh built from explicit vertex positions and triangle indices.
    pub fn mesh(vertices: Vec<(f64, f64, f64)>, faces: Vec<[u32; 3]>) -> Self {
        if vertices.is_empty() || faces.is_empty() {
            return Self::empty();
        }
        let vertices = vertices.into_iter().map(|(x, y, z)| QVec3::new(x, y, z)).collect();
        Self::shape(Shape3D::Mesh { vertices, faces })
    }

    /// Sweep a 2D cross-section into a solid.
    pub fn extrusion(child: Node<Dim2>, mode: ExtrusionMode) -> Self {
        if child.is_empty() {
            return Self::empty();
        }
        Self::from_kind(NodeKind::Extrusion(child, mode))
    }
}

/// The outcome of lowering a declarative geometry value: the IR node it
/// produced plus the auxiliary metadata ([`ResultElements`]) that bubbled
/// up from its children.
#[derive(Debug, Clone)]
pub struct BuildResult<D: Dim> {
    /// The lowered IR node.
    pub node: Node<D>,
    /// Metadata accumulated during the build.
    pub elements: ResultElements,
}

impl<D: Dim> BuildResult<D> {
    /// A build result with no metadata.
    pub fn bare(node: Node<D>) -> Self {
        Self { node, elements: ResultElements::default() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_prunes_empty_children() {
        let a = Node::<Dim3>::cuboid(1.0, 1.0, 1.0);
        let b = Node::<Dim3>::empty();
        let result = Node::union(a.clone(), b);
        assert_eq!(result, a);
    }

    #[test]
    fn difference_with_empty_subtrahend_is_positive() {
        let a = Node::<Dim3>::cuboid(1.0, 1.0, 1.0);
        let result = Node::difference(a.clone(), Node::empty());
        assert_eq!(result, a);
    }

    #[test]
    fn difference_with_empty_base_is_empty() {
        let b = Node::<Dim3>::cuboid(1.0, 1.0, 1.0);
        let result = Node::difference(Node::empty(), b);
        assert!(result.is_empty());
    }

    #[test]
    fn intersection_with_any_empty_child_is_empty() {
        let a = Node::<Dim3>::cuboid(1.0, 1.0, 1.0);
        let result = Node::intersection(a, Node::empty());
        assert!(result.is_empty());
    }

    #[test]
    fn single_surviving_child_collapses() {
        let a = Node::<Dim3>::cuboid(1.0, 1.0, 1.0);
        let result = Node::boolean(BooleanKind::Union, vec![Node::empty(), a.clone(), Node::empty()]);
        assert_eq!(result, a);
    }

    #[test]
    fn nested_transforms_fold_into_one() {
        let a = Node::<Dim3>::cuboid(1.0, 1.0, 1.0);
        let t1 = Affine3::translation(1.0, 0.0, 0.0);
        let t2 = Affine3::translation(0.0, 1.0, 0.0);
        let once = a.clone().transform(t1.clone()).transform(t2.clone());
        let direct = a.transform(t1.compose(&t2));
        assert_eq!(once, direct);
    }

    #[test]
    fn non_positive_dimensions_collapse_to_empty() {
        assert!(Node::<Dim2>::rectangle(0.0, 5.0).is_empty());
        assert!(Node::<Dim3>::cuboid(-1.0, 1.0, 1.0).is_empty());
        assert!(Node::<Dim2>::circle(0.0, 32).is_empty());
    }

    #[test]
    fn equal_after_folding_are_hash_equal() {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::Hasher;

        let a = Node::boolean(BooleanKind::Union, vec![Node::<Dim3>::cuboid(1.0, 1.0, 1.0), Node::empty()]);
        let b = Node::<Dim3>::cuboid(1.0, 1.0, 1.0);
        assert_eq!(a, b);

        let mut ha = DefaultHasher::new();
        let mut hb = DefaultHasher::new();
        a.hash(&mut ha);
        b.hash(&mut hb);
        assert_eq!(ha.finish(), hb.finish());
    }

    #[test]
    fn debug_label_does_not_affect_equality() {
        let a = Node::<Dim3>::cuboid(1.0, 1.0, 1.0);
        let labeled = a.clone().with_debug_label("base plate");
        assert_eq!(a, labeled);
    }
}
