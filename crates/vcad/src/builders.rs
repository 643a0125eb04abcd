//! Internal node-lowering templates (§4.2). A handful of these compose to
//! cover almost all user-facing wrapper geometry; each is pure, threads
//! `environment`/`context` through, and returns a `BuildResult<D>`.

use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;
use vcad_ir::{BooleanKind, BuildResult, CacheKey, Dim, Node, OriginalIdKey, ResultElements};

use crate::context::EvaluationContext;
use crate::error::GeometryError;
use crate::geometry::Geometry;
use crate::Environment;

/// Emits `Node::Shape(primitive)` with no result elements. The leaves of
/// every declarative tree bottom out here.
pub struct PrimitiveShape<D: Dim> {
    node: Node<D>,
}

impl<D: Dim> PrimitiveShape<D> {
    /// Wrap an already-lowered primitive node.
    pub fn new(node: Node<D>) -> Self {
        Self { node }
    }
}

impl<D: Dim> Geometry<D> for PrimitiveShape<D> {
    fn build<'a>(&'a self, _env: &'a Environment, _ctx: &'a EvaluationContext) -> BoxFuture<'a, Result<BuildResult<D>, GeometryError>> {
        Box::pin(async move { Ok(BuildResult::bare(self.node.clone())) })
    }
}

/// Builds `child` under `env.applying_transform(t)`, wraps the resulting
/// node in `Transform(child, t)`.
///
/// Part-catalog entries in the child's elements are transformed
/// alongside the node itself, since a part pulled out of a transformed
/// subtree should still appear where the transform put it.
pub struct TransformBuilder<D: Dim, G: Geometry<D>> {
    child: G,
    t: D::Affine,
}

impl<D: Dim, G: Geometry<D>> TransformBuilder<D, G> {
    /// Wrap `child`, to be built under the affine transform `t`.
    pub fn new(child: G, t: D::Affine) -> Self {
        Self { child, t }
    }
}

impl<D: Dim, G: Geometry<D>> Geometry<D> for TransformBuilder<D, G>
where
    D::Affine: Clone,
{
    fn build<'a>(&'a self, env: &'a Environment, ctx: &'a EvaluationContext) -> BoxFuture<'a, Result<BuildResult<D>, GeometryError>> {
        Box::pin(async move {
            let child_env = D::thread_environment(env, &self.t);
            let result = self.child.build(&child_env, ctx).await?;
            Ok(BuildResult { node: result.node.transform(self.t.clone()), elements: result.elements })
        })
    }
}

/// Builds every child independently (concurrently, via
/// `futures::future::try_join_all`), feeds their nodes into
/// `Node::boolean(kind, ..)`, and combines their elements via
/// `ResultElements::combine(kind)`. For `Difference`, children 2..N build
/// under a flipped `operation = subtraction` environment.
pub struct Composite<D: Dim> {
    kind: BooleanKind,
    children: Vec<Box<dyn Geometry<D>>>,
}

impl<D: Dim> Composite<D> {
    /// A boolean combination of `children`, combined in IR order.
    pub fn new(kind: BooleanKind, children: Vec<Box<dyn Geometry<D>>>) -> Self {
        Self { kind, children }
    }
}

impl<D: Dim> Geometry<D> for Composite<D> {
    fn build<'a>(&'a self, env: &'a Environment, ctx: &'a EvaluationContext) -> BoxFuture<'a, Result<BuildResult<D>, GeometryError>> {
        Box::pin(async move {
            let subtrahend_env = env.flipped_for_subtraction();
            let futures_iter = self.children.iter().enumerate().map(|(i, child)| {
                let env = if i > 0 && self.kind == BooleanKind::Difference { &subtrahend_env } else { env };
                child.build(env, ctx)
            });
            let results = futures::future::try_join_all(futures_iter).await?;
            let (nodes, elements): (Vec<Node<D>>, Vec<ResultElements>) = results.into_iter().map(|r| (r.node, r.elements)).unzip();
            Ok(BuildResult { node: Node::boolean(self.kind, nodes), elements: ResultElements::combine(self.kind, elements) })
        })
    }
}

/// A generic wrapper around a lowered child node: applies a pure
/// node-to-node function (`ConvexHull`, `Offset`, `Projection`,
/// `Extrusion`) without touching the child's result elements.
pub struct NodeTransformer<D: Dim, G: Geometry<D>, F> {
    child: G,
    f: F,
    _marker: std::marker::PhantomData<D>,
}

impl<D: Dim, G: Geometry<D>, F> NodeTransformer<D, G, F>
where
    F: Fn(Node<D>) -> Node<D> + Send + Sync,
{
    /// Wrap `child`, applying `f` to its lowered node.
    pub fn new(child: G, f: F) -> Self {
        Self { child, f, _marker: std::marker::PhantomData }
    }
}

impl<D: Dim, G: Geometry<D>, F> Geometry<D> for NodeTransformer<D, G, F>
where
    F: Fn(Node<D>) -> Node<D> + Send + Sync,
{
    fn build<'a>(&'a self, env: &'a Environment, ctx: &'a EvaluationContext) -> BoxFuture<'a, Result<BuildResult<D>, GeometryError>> {
        Box::pin(async move {
            let result = self.child.build(env, ctx).await?;
            Ok(BuildResult { node: (self.f)(result.node), elements: result.elements })
        })
    }
}

/// Runs `child`'s build, then rewrites its elements via a pure function —
/// `withResult`/`modifyingResult`/`mergingResultElements` in library code.
pub struct ResultModifier<D: Dim, G: Geometry<D>, F> {
    child: G,
    f: F,
    _marker: std::marker::PhantomData<D>,
}

impl<D: Dim, G: Geometry<D>, F> ResultModifier<D, G, F>
where
    F: Fn(ResultElements) -> ResultElements + Send + Sync,
{
    /// Wrap `child`, rewriting its elements with `f` after it builds.
    pub fn new(child: G, f: F) -> Self {
        Self { child, f, _marker: std::marker::PhantomData }
    }
}

impl<D: Dim, G: Geometry<D>, F> Geometry<D> for ResultModifier<D, G, F>
where
    F: Fn(ResultElements) -> ResultElements + Send + Sync,
{
    fn build<'a>(&'a self, env: &'a Environment, ctx: &'a EvaluationContext) -> BoxFuture<'a, Result<BuildResult<D>, GeometryError>> {
        Box::pin(async move {
            let result = self.child.build(env, ctx).await?;
            Ok(BuildResult { node: result.node, elements: (self.f)(result.elements) })
        })
    }
}

/// Builds `child`, then lets the caller synthesize a *new* geometry from
/// its elements and rebuilds that as the final result — the mechanism
/// behind `measuring { }`/`separated { }` once the caller has read
/// concrete measurements out of the elements.
pub struct ResultReader<D: Dim, G: Geometry<D>, F> {
    child: G,
    f: F,
    _marker: std::marker::PhantomData<D>,
}

impl<D: Dim, G: Geometry<D>, F, Next> ResultReader<D, G, F>
where
    F: Fn(ResultElements) -> Next + Send + Sync,
    Next: Geometry<D>,
{
    /// Wrap `child`, synthesizing the final geometry from its elements
    /// via `f`.
    pub fn new(child: G, f: F) -> Self {
        Self { child, f, _marker: std::marker::PhantomData }
    }
}

impl<D: Dim, G: Geometry<D>, F, Next> Geometry<D> for ResultReader<D, G, F>
where
    F: Fn(ResultElements) -> Next + Send + Sync,
    Next: Geometry<D>,
{
    fn build<'a>(&'a self, env: &'a Environment, ctx: &'a EvaluationContext) -> BoxFuture<'a, Result<BuildResult<D>, GeometryError>> {
        Box::pin(async move {
            let result = self.child.build(env, ctx).await?;
            let next = (self.f)(result.elements);
            next.build(env, ctx).await
        })
    }
}

/// The principal mechanism for inserting kernel-computed results into the
/// IR. Routes `factory` through the context's per-key `OnceCell` (§4.2
/// invariant: at most once per key per context, even under concurrent
/// demand — the same mechanism `evaluate_3d` uses for node dedup) and
/// returns a handle to whatever ends up stored there.
pub async fn cached_node_3d<F, Fut>(key: CacheKey, ctx: &EvaluationContext, factory: F) -> Result<BuildResult<vcad_ir::Dim3>, GeometryError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<crate::concrete::ConcreteResult<vcad_kernel::ManifoldImpl>, GeometryError>>,
{
    ctx.materialize_or_init_3d(key.clone(), factory).await?;
    Ok(BuildResult::bare(Node::materialized(key)))
}

/// The 2D counterpart of [`cached_node_3d`].
pub async fn cached_node_2d<F, Fut>(key: CacheKey, ctx: &EvaluationContext, factory: F) -> Result<BuildResult<vcad_ir::Dim2>, GeometryError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<crate::concrete::ConcreteResult<vcad_kernel::CrossSectionImpl>, GeometryError>>,
{
    ctx.materialize_or_init_2d(key.clone(), factory).await?;
    Ok(BuildResult::bare(Node::materialized(key)))
}

/// Lowers a `.material(assignment)` wrapper: tags `child`'s node with a
/// fresh original-ID and records the assignment in the result's
/// `MaterialRecord` (§4.4).
pub struct MaterialTag<G: Geometry<vcad_ir::Dim3>> {
    child: G,
    key: OriginalIdKey,
    assignment: vcad_ir::MaterialAssignment,
}

impl<G: Geometry<vcad_ir::Dim3>> MaterialTag<G> {
    /// Tag `child` with `assignment` under a freshly allocated key.
    pub fn new(child: G, key: OriginalIdKey, assignment: vcad_ir::MaterialAssignment) -> Self {
        Self { child, key, assignment }
    }
}

impl<G: Geometry<vcad_ir::Dim3>> Geometry<vcad_ir::Dim3> for MaterialTag<G> {
    fn build<'a>(&'a self, env: &'a Environment, ctx: &'a EvaluationContext) -> BoxFuture<'a, Result<BuildResult<vcad_ir::Dim3>, GeometryError>> {
        Box::pin(async move {
            let result = self.child.build(env, ctx).await?;
            let mut elements = result.elements;
            elements.material_record.insert(self.key, self.assignment.clone());
            Ok(BuildResult { node: result.node.tagged(self.key), elements })
        })
    }
}

/// Lowers `.inPart(name, semantic)`: moves the child's node into the
/// part catalog under `part` and replaces the visible node with `Empty`
/// (§4.6).
pub struct InPart<G: Geometry<vcad_ir::Dim3>> {
    child: G,
    part: vcad_ir::Part,
}

impl<G: Geometry<vcad_ir::Dim3>> InPart<G> {
    /// Move `child` into the catalog under `part`.
    pub fn new(child: G, part: vcad_ir::Part) -> Self {
        Self { child, part }
    }
}

impl<G: Geometry<vcad_ir::Dim3>> Geometry<vcad_ir::Dim3> for InPart<G> {
    fn build<'a>(&'a self, env: &'a Environment, ctx: &'a EvaluationContext) -> BoxFuture<'a, Result<BuildResult<vcad_ir::Dim3>, GeometryError>> {
        Box::pin(async move {
            let result = self.child.build(env, ctx).await?;
            let elements = result.elements.with_part(self.part.clone(), result.node);
            Ok(BuildResult { node: Node::empty(), elements })
        })
    }
}

/// Lowers `modifyingPart(semantic, name)`: builds `child`, then rebuilds
/// the named part's geometry (if present in the catalog) through `f`,
/// leaving every other part and the main node untouched.
pub struct ModifyingPart<G: Geometry<vcad_ir::Dim3>, F> {
    child: G,
    part: vcad_ir::Part,
    f: F,
}

impl<G: Geometry<vcad_ir::Dim3>, F> ModifyingPart<G, F>
where
    F: Fn(Node<vcad_ir::Dim3>) -> Node<vcad_ir::Dim3> + Send + Sync,
{
    /// Rebuild `part`'s catalog entry in `child`'s result through `f`.
    pub fn new(child: G, part: vcad_ir::Part, f: F) -> Self {
        Self { child, part, f }
    }
}

impl<G: Geometry<vcad_ir::Dim3>, F> Geometry<vcad_ir::Dim3> for ModifyingPart<G, F>
where
    F: Fn(Node<vcad_ir::Dim3>) -> Node<vcad_ir::Dim3> + Send + Sync,
{
    fn build<'a>(&'a self, env: &'a Environment, ctx: &'a EvaluationContext) -> BoxFuture<'a, Result<BuildResult<vcad_ir::Dim3>, GeometryError>> {
        Box::pin(async move {
            let result = self.child.build(env, ctx).await?;
            let mut elements = result.elements;
            if let Some(existing) = elements.part_catalog.remove(&self.part) {
                elements.part_catalog.insert(self.part.clone(), (self.f)(existing));
            }
            Ok(BuildResult { node: result.node, elements })
        })
    }
}

/// Lowers `removingPart(semantic, name)`: builds `child`, then drops the
/// named part from the catalog entirely.
pub struct RemovingPart<G: Geometry<vcad_ir::Dim3>> {
    child: G,
    part: vcad_ir::Part,
}

impl<G: Geometry<vcad_ir::Dim3>> RemovingPart<G> {
    /// Drop `part` from `child`'s result catalog.
    pub fn new(child: G, part: vcad_ir::Part) -> Self {
        Self { child, part }
    }
}

impl<G: Geometry<vcad_ir::Dim3>> Geometry<vcad_ir::Dim3> for RemovingPart<G> {
    fn build<'a>(&'a self, env: &'a Environment, ctx: &'a EvaluationContext) -> BoxFuture<'a, Result<BuildResult<vcad_ir::Dim3>, GeometryError>> {
        Box::pin(async move {
            let result = self.child.build(env, ctx).await?;
            let mut elements = result.elements;
            elements.part_catalog.remove(&self.part);
            Ok(BuildResult { node: result.node, elements })
        })
    }
}

/// Boxes a `'static` geometry value as a trait object, for use as a
/// [`Composite`] child alongside geometry of a different concrete type.
pub fn boxed<D: Dim, G: Geometry<D> + 'static>(g: G) -> Box<dyn Geometry<D>> {
    Box::new(g)
}

/// An `Arc`-shared geometry value, cheap to reuse as multiple composite
/// children (structural sharing the cache then recovers at evaluation).
pub type Shared<D, G> = Arc<G>;

impl<D: Dim, G: Geometry<D> + ?Sized> Geometry<D> for Arc<G> {
    fn build<'a>(&'a self, env: &'a Environment, ctx: &'a EvaluationContext) -> BoxFuture<'a, Result<BuildResult<D>, GeometryError>> {
        (**self).build(env, ctx)
    }
}
