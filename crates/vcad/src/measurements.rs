//! Read-only derivations on a concretely evaluated result (§4.5): bounding
//! box, area/volume, bounding-box diagonal, emptiness, and (3D only)
//! connected-component decomposition.
//!
//! `measuring { }` and `separated { }` are the only place user code
//! observes concrete kernel output during a build — both evaluate the
//! child through the context, hand the caller a snapshot of measurements,
//! and rebuild the final geometry from whatever the caller's closure
//! returns. Deterministic for a fixed input, but not referentially
//! transparent in `(self, environment)` alone the way every other
//! combinator is.

use futures::future::BoxFuture;
use vcad_ir::{BuildResult, CacheKey, Dim2, Dim3, Node};
use vcad_kernel::{Manifold, ManifoldImpl};
use vcad_kernel_geom::{Bounds2, Bounds3};

use crate::builders::cached_node_3d;
use crate::concrete::ConcreteResult;
use crate::context::{EvaluationContext, IdAllocator};
use crate::error::GeometryError;
use crate::geometry::Geometry;
use crate::Environment;

/// Measurements exposed to a `measuring { }` closure over a 2D child.
#[derive(Debug, Clone)]
pub struct Measurements2D {
    /// Axis-aligned bounds, `None` if the child is empty.
    pub bounds: Option<Bounds2>,
    /// Total enclosed area.
    pub area: f64,
    /// Length of the bounding box's diagonal, `0.0` if empty.
    pub diagonal: f64,
    /// True if the child evaluated to nothing.
    pub is_empty: bool,
}

/// Measurements exposed to a `measuring { }` closure over a 3D child.
#[derive(Debug, Clone)]
pub struct Measurements3D {
    /// Axis-aligned bounds, `None` if the child is empty.
    pub bounds: Option<Bounds3>,
    /// Enclosed volume.
    pub volume: f64,
    /// Total surface area.
    pub surface_area: f64,
    /// Length of the bounding box's diagonal, `0.0` if empty.
    pub diagonal: f64,
    /// True if the child evaluated to nothing.
    pub is_empty: bool,
}

fn measurements_2d(primitive: &vcad_kernel::CrossSectionImpl, is_empty: bool) -> Measurements2D {
    use vcad_kernel::CrossSection;
    let bounds = (!is_empty).then(|| primitive.bounds());
    let area = primitive.0.area();
    let diagonal = bounds.map(|b| (b.max - b.min).norm()).unwrap_or(0.0);
    Measurements2D { diagonal, bounds, area, is_empty }
}

fn measurements_3d(primitive: &ManifoldImpl, is_empty: bool) -> Measurements3D {
    let mesh = primitive.mesh();
    let bounds = (!is_empty).then(|| mesh.bounds());
    Measurements3D {
        diagonal: bounds.map(Bounds3::diagonal).unwrap_or(0.0),
        bounds,
        volume: mesh.signed_volume().abs(),
        surface_area: mesh.surface_area(),
        is_empty,
    }
}

/// Lowers `measuring { child, measurements in f }` for a 2D child: builds
/// `child`, evaluates it concretely through the context, and rebuilds from
/// whatever `f` returns given the measurements.
pub struct Measuring2D<G: Geometry<Dim2>, F> {
    child: G,
    f: F,
}

impl<G: Geometry<Dim2>, F, Next> Measuring2D<G, F>
where
    F: Fn(Measurements2D) -> Next + Send + Sync,
    Next: Geometry<Dim2>,
{
    /// Wrap `child`, synthesizing the final geometry from its measurements.
    pub fn new(child: G, f: F) -> Self {
        Self { child, f }
    }
}

impl<G: Geometry<Dim2>, F, Next> Geometry<Dim2> for Measuring2D<G, F>
where
    F: Fn(Measurements2D) -> Next + Send + Sync,
    Next: Geometry<Dim2>,
{
    fn build<'a>(&'a self, env: &'a Environment, ctx: &'a EvaluationContext) -> BoxFuture<'a, Result<BuildResult<Dim2>, GeometryError>> {
        Box::pin(async move {
            let result = self.child.build(env, ctx).await?;
            let concrete = ctx.evaluate_2d(&result.node).await?;
            let measurements = measurements_2d(&concrete.primitive, result.node.is_empty());
            (self.f)(measurements).build(env, ctx).await
        })
    }
}

/// The 3D counterpart of [`Measuring2D`].
pub struct Measuring3D<G: Geometry<Dim3>, F> {
    child: G,
    f: F,
}

impl<G: Geometry<Dim3>, F, Next> Measuring3D<G, F>
where
    F: Fn(Measurements3D) -> Next + Send + Sync,
    Next: Geometry<Dim3>,
{
    /// Wrap `child`, synthesizing the final geometry from its measurements.
    pub fn new(child: G, f: F) -> Self {
        Self { child, f }
    }
}

impl<G: Geometry<Dim3>, F, Next> Geometry<Dim3> for Measuring3D<G, F>
where
    F: Fn(Measurements3D) -> Next + Send + Sync,
    Next: Geometry<Dim3>,
{
    fn build<'a>(&'a self, env: &'a Environment, ctx: &'a EvaluationContext) -> BoxFuture<'a, Result<BuildResult<Dim3>, GeometryError>> {
        Box::pin(async move {
            let result = self.child.build(env, ctx).await?;
            let concrete = ctx.evaluate_3d(&result.node).await?;
            let measurements = measurements_3d(&concrete.primitive, result.node.is_empty());
            (self.f)(measurements).build(env, ctx).await
        })
    }
}

/// Lowers `separated { child, components in f }`: evaluates `child`,
/// splits it into one node per connected component (each materialized
/// under a fresh key allocated from `ids`), and lets `f` rebuild the
/// final geometry from the per-component node list.
pub struct Separated<G: Geometry<Dim3>, F> {
    child: G,
    f: F,
    ids: std::sync::Arc<IdAllocator>,
}

impl<G: Geometry<Dim3>, F, Next> Separated<G, F>
where
    F: Fn(Vec<Node<Dim3>>) -> Next + Send + Sync,
    Next: Geometry<Dim3>,
{
    /// Wrap `child`, synthesizing the final geometry from its decomposed
    /// connected components. Component cache keys are drawn from `ids`,
    /// shared so repeated `separated { }` calls in the same project don't
    /// collide.
    pub fn new(child: G, f: F, ids: std::sync::Arc<IdAllocator>) -> Self {
        Self { child, f, ids }
    }
}

impl<G: Geometry<Dim3>, F, Next> Geometry<Dim3> for Separated<G, F>
where
    F: Fn(Vec<Node<Dim3>>) -> Next + Send + Sync,
    Next: Geometry<Dim3>,
{
    fn build<'a>(&'a self, env: &'a Environment, ctx: &'a EvaluationContext) -> BoxFuture<'a, Result<BuildResult<Dim3>, GeometryError>> {
        Box::pin(async move {
            let result = self.child.build(env, ctx).await?;
            let concrete = ctx.evaluate_3d(&result.node).await?;
            let mut nodes = Vec::new();
            for component in concrete.primitive.connected_components() {
                let key: CacheKey = format!("component:{}", self.ids.next());
                let component_result = ConcreteResult::bare(component);
                let built = cached_node_3d(key, ctx, || async { Ok(component_result) }).await?;
                nodes.push(built.node);
            }
            (self.f)(nodes).build(env, ctx).await
        })
    }
}
