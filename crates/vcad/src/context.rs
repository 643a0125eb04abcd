//! The evaluation cache: the single shared mutable resource in the
//! pipeline, deduplicating concrete evaluation of IR nodes and of
//! key-materialized factories across concurrent demand.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use nalgebra::{Matrix3, Matrix4};
use tokio::sync::OnceCell;
use vcad_ir::{Affine2, Affine3, BooleanKind, CacheKey, Dim2, Dim3, ExtrusionMode, Node, NodeView, OffsetJoin, OriginalIdKey, ProjectionMode, Shape2D, Shape3D};
use vcad_kernel::vcad_kernel_math::{Point2, Point3, Transform, Transform2, Vec2, Vec3};
use vcad_kernel::{CrossSection, CrossSectionImpl, Manifold, ManifoldImpl};

use crate::concrete::ConcreteResult;
use crate::error::GeometryError;

type Shared2D = Arc<OnceCell<ConcreteResult<CrossSectionImpl>>>;
type Shared3D = Arc<OnceCell<ConcreteResult<ManifoldImpl>>>;

/// Owns the two per-dimensionality evaluation caches (§4.3) plus the
/// key-materialized result stores that back [`CachedNode`](crate::builders::cached_node).
///
/// Cloning an `EvaluationContext` is cheap and shares the same caches —
/// it is an `Arc`-of-`Mutex`es handle, matching the "one context per
/// `Project`, shared across every `Model`" usage in §6.4.
#[derive(Clone, Default)]
pub struct EvaluationContext {
    cache_2d: Arc<Mutex<HashMap<Node<Dim2>, Shared2D>>>,
    cache_3d: Arc<Mutex<HashMap<Node<Dim3>, Shared3D>>>,
    materialized_2d: Arc<Mutex<HashMap<CacheKey, Shared2D>>>,
    materialized_3d: Arc<Mutex<HashMap<CacheKey, Shared3D>>>,
}

fn transform2_from_affine(a: &Affine2) -> Transform2 {
    let v = a.values();
    Transform2 { matrix: Matrix3::new(v[0], v[1], v[2], v[3], v[4], v[5], v[6], v[7], v[8]) }
}

fn transform3_from_affine(a: &Affine3) -> Transform {
    let v = a.values();
    #[rustfmt::skip]
    let matrix = Matrix4::new(
        v[0], v[1], v[2], v[3],
        v[4], v[5], v[6], v[7],
        v[8], v[9], v[10], v[11],
        v[12], v[13], v[14], v[15],
    );
    Transform { matrix }
}

impl EvaluationContext {
    /// A fresh context with empty caches.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the 2D result materialized under `key`, running `factory`
    /// to produce it if this is the first demand. Concurrent callers
    /// sharing `key` race to clone the same `Arc<OnceCell>` under the
    /// lock, then all await `OnceCell::get_or_try_init` on it — so the
    /// factory runs at most once per key, not just once per stored result
    /// (§4.2's `CachedNode` invariant, Scenario S5).
    pub async fn materialize_or_init_2d<F, Fut>(&self, key: CacheKey, factory: F) -> Result<ConcreteResult<CrossSectionImpl>, GeometryError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<ConcreteResult<CrossSectionImpl>, GeometryError>>,
    {
        let cell = self.materialized_2d.lock().unwrap().entry(key).or_insert_with(|| Arc::new(OnceCell::new())).clone();
        cell.get_or_try_init(factory).await.map(|r| r.clone())
    }

    /// The 3D counterpart of [`Self::materialize_or_init_2d`].
    pub async fn materialize_or_init_3d<F, Fut>(&self, key: CacheKey, factory: F) -> Result<ConcreteResult<ManifoldImpl>, GeometryError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<ConcreteResult<ManifoldImpl>, GeometryError>>,
    {
        let cell = self.materialized_3d.lock().unwrap().entry(key).or_insert_with(|| Arc::new(OnceCell::new())).clone();
        cell.get_or_try_init(factory).await.map(|r| r.clone())
    }

    /// Evaluate a 2D node to its concrete cross-section, deduplicating
    /// concurrent demand for the same node.
    pub async fn evaluate_2d(&self, node: &Node<Dim2>) -> Result<ConcreteResult<CrossSectionImpl>, GeometryError> {
        if node.is_empty() {
            return Ok(ConcreteResult::bare(CrossSectionImpl::default()));
        }
        let cell = {
            let mut guard = self.cache_2d.lock().unwrap();
            guard.entry(node.clone()).or_insert_with(|| Arc::new(OnceCell::new())).clone()
        };
        cell.get_or_try_init(|| self.compute_2d(node)).await.map(|r| r.clone())
    }

    /// The 3D counterpart of [`Self::evaluate_2d`].
    pub async fn evaluate_3d(&self, node: &Node<Dim3>) -> Result<ConcreteResult<ManifoldImpl>, GeometryError> {
        if node.is_empty() {
            return Ok(ConcreteResult::bare(ManifoldImpl::default()));
        }
        let cell = {
            let mut guard = self.cache_3d.lock().unwrap();
            guard.entry(node.clone()).or_insert_with(|| Arc::new(OnceCell::new())).clone()
        };
        cell.get_or_try_init(|| self.compute_3d(node)).await.map(|r| r.clone())
    }

    fn compute_2d<'a>(&'a self, node: &'a Node<Dim2>) -> futures::future::BoxFuture<'a, Result<ConcreteResult<CrossSectionImpl>, GeometryError>> {
        Box::pin(async move {
            match node.view() {
                NodeView::Empty => Ok(ConcreteResult::bare(CrossSectionImpl::default())),
                NodeView::Shape(shape) => Ok(ConcreteResult::bare(self.build_shape_2d(shape))),
                NodeView::Boolean(kind, children) => {
                    let evaluated = futures::future::try_join_all(children.iter().map(|c| self.evaluate_2d(c))).await?;
                    Ok(fold_2d(kind, evaluated))
                }
                NodeView::Transform(child, t) => {
                    let mut r = self.evaluate_2d(child).await?;
                    r.primitive = r.primitive.transform(&transform2_from_affine(t));
                    Ok(r)
                }
                NodeView::ConvexHull(child) => {
                    let mut r = self.evaluate_2d(child).await?;
                    r.primitive = r.primitive.convex_hull();
                    Ok(r)
                }
                NodeView::Offset(child, params) => {
                    let mut r = self.evaluate_2d(child).await?;
                    if !matches!(params.join, OffsetJoin::Round) {
                        tracing::warn!("offset join style {:?} not distinguished by the kernel, rendering as round", params.join);
                    }
                    r.primitive = r.primitive.offset(params.amount.value(), params.segments);
                    Ok(r)
                }
                NodeView::Projection(child3, mode) => {
                    let solid = self.evaluate_3d(child3).await?;
                    let primitive = match mode {
                        ProjectionMode::Full => solid.primitive.project(),
                        ProjectionMode::Slice(z) => solid.primitive.slice(z.value()),
                    };
                    Ok(ConcreteResult { primitive, original_ids: solid.original_ids })
                }
                NodeView::Extrusion(..) => unreachable!("Extrusion only appears in Node<Dim3>"),
                NodeView::Materialized(key) | NodeView::Raw(key) => self.lookup_materialized_2d(key).await,
                NodeView::Tagged(child, key) => {
                    let mut r = self.evaluate_2d(child).await?;
                    r.original_ids.insert(key);
                    Ok(r)
                }
            }
        })
    }

    fn compute_3d<'a>(&'a self, node: &'a Node<Dim3>) -> futures::future::BoxFuture<'a, Result<ConcreteResult<ManifoldImpl>, GeometryError>> {
        Box::pin(async move {
            match node.view() {
                NodeView::Empty => Ok(ConcreteResult::bare(ManifoldImpl::default())),
                NodeView::Shape(shape) => self.build_shape_3d(shape).map(ConcreteResult::bare),
                NodeView::Boolean(kind, children) => {
                    let evaluated = futures::future::try_join_all(children.iter().map(|c| self.evaluate_3d(c))).await?;
                    Ok(fold_3d(kind, evaluated))
                }
                NodeView::Transform(child, t) => {
                    let mut r = self.evaluate_3d(child).await?;
                    r.primitive = r.primitive.transform(&transform3_from_affine(t));
                    Ok(r)
                }
                NodeView::ConvexHull(child) => {
                    let mut r = self.evaluate_3d(child).await?;
                    r.primitive = r.primitive.convex_hull();
                    Ok(r)
                }
                NodeView::Offset(..) => unreachable!("Offset only appears in Node<Dim2>"),
                NodeView::Projection(..) => unreachable!("Projection only appears in Node<Dim2>"),
                NodeView::Extrusion(child2, mode) => {
                    let cross = self.evaluate_2d(child2).await?;
                    let primitive = match mode {
                        ExtrusionMode::Linear { height, twist_degrees, divisions: _, top_scale } => {
                            let (sx, sy) = top_scale.xy();
                            ManifoldImpl::extrude_linear(&cross.primitive, height.value(), twist_degrees.value(), Vec2::new(sx, sy))
                        }
                        ExtrusionMode::Rotational { angle_degrees, segments } => ManifoldImpl::revolve(&cross.primitive, angle_degrees.value(), *segments),
                    };
                    Ok(ConcreteResult { primitive, original_ids: cross.original_ids })
                }
                NodeView::Materialized(key) | NodeView::Raw(key) => self.lookup_materialized_3d(key).await,
                NodeView::Tagged(child, key) => {
                    let r = self.evaluate_3d(child).await?;
                    let mut mesh = r.primitive.mesh().clone();
                    for tri in &mut mesh.triangles {
                        tri.original_id = Some(key);
                    }
                    let mut original_ids = r.original_ids;
                    original_ids.insert(key);
                    Ok(ConcreteResult { primitive: ManifoldImpl(mesh), original_ids })
                }
            }
        })
    }

    async fn lookup_materialized_2d(&self, key: &CacheKey) -> Result<ConcreteResult<CrossSectionImpl>, GeometryError> {
        let cell = self.materialized_2d.lock().unwrap().get(key).cloned();
        match cell {
            Some(cell) => cell.get().cloned().ok_or_else(|| GeometryError::KernelInternal(format!("materialized key {key:?} not yet populated"))),
            None => Err(GeometryError::KernelInternal(format!("unknown materialized key {key:?}"))),
        }
    }

    async fn lookup_materialized_3d(&self, key: &CacheKey) -> Result<ConcreteResult<ManifoldImpl>, GeometryError> {
        let cell = self.materialized_3d.lock().unwrap().get(key).cloned();
        match cell {
            Some(cell) => cell.get().cloned().ok_or_else(|| GeometryError::KernelInternal(format!("materialized key {key:?} not yet populated"))),
            None => Err(GeometryError::KernelInternal(format!("unknown materialized key {key:?}"))),
        }
    }

    fn build_shape_2d(&self, shape: &Shape2D) -> CrossSectionImpl {
        match shape {
            Shape2D::Rectangle { width, height } => CrossSectionImpl::square(Vec2::new(width.value(), height.value())),
            Shape2D::Circle { radius, segments } => CrossSectionImpl::circle(radius.value(), *segments),
            Shape2D::Polygon { points, fill_rule } => {
                if !matches!(fill_rule, vcad_ir::FillRule::NonZero) {
                    tracing::warn!("fill rule {:?} not distinguished by the kernel, using non-zero winding", fill_rule);
                }
                let points = points.iter().map(|p| Point2::new(p.xy().0, p.xy().1)).collect();
                CrossSectionImpl::polygon(points)
            }
            Shape2D::ConvexHullPoints(points) => {
                let points = points.iter().map(|p| Point2::new(p.xy().0, p.xy().1)).collect();
                CrossSectionImpl::polygon(points).convex_hull()
            }
        }
    }

    fn build_shape_3d(&self, shape: &Shape3D) -> Result<ManifoldImpl, GeometryError> {
        Ok(match shape {
            Shape3D::Cuboid(size) => {
                let (x, y, z) = size.xyz();
                ManifoldImpl::cuboid(Vec3::new(x, y, z))
            }
            Shape3D::Sphere { radius, segments } => ManifoldImpl::sphere(radius.value(), *segments),
            Shape3D::Cylinder { bottom_radius, top_radius, height, segments } => {
                ManifoldImpl::cylinder(bottom_radius.value(), top_radius.value(), height.value(), *segments)
            }
            Shape3D::ConvexHullPoints(points) => {
                let vertices = points.iter().map(|p| { let (x, y, z) = p.xyz(); Point3::new(x, y, z) }).collect();
                ManifoldImpl(vcad_kernel::vcad_kernel_geom::Mesh3 { vertices, triangles: Vec::new() }).convex_hull()
            }
            Shape3D::Mesh { vertices, faces } => {
                let vertices = vertices.iter().map(|p| { let (x, y, z) = p.xyz(); Point3::new(x, y, z) }).collect();
                ManifoldImpl::from_mesh(vertices, faces.clone())?
            }
        })
    }
}

fn fold_2d(kind: BooleanKind, mut results: Vec<ConcreteResult<CrossSectionImpl>>) -> ConcreteResult<CrossSectionImpl> {
    let mut iter = results.drain(..);
    let Some(mut acc) = iter.next() else { return ConcreteResult::bare(CrossSectionImpl::default()) };
    for next in iter {
        acc.primitive = match kind {
            BooleanKind::Union => acc.primitive.union(&next.primitive),
            BooleanKind::Difference => acc.primitive.difference(&next.primitive),
            BooleanKind::Intersection => acc.primitive.intersection(&next.primitive),
        };
        acc.original_ids.extend(next.original_ids);
    }
    acc
}

fn fold_3d(kind: BooleanKind, mut results: Vec<ConcreteResult<ManifoldImpl>>) -> ConcreteResult<ManifoldImpl> {
    let mut iter = results.drain(..);
    let Some(mut acc) = iter.next() else { return ConcreteResult::bare(ManifoldImpl::default()) };
    for next in iter {
        acc.primitive = match kind {
            BooleanKind::Union => acc.primitive.union(&next.primitive),
            BooleanKind::Difference => acc.primitive.difference(&next.primitive),
            BooleanKind::Intersection => acc.primitive.intersection(&next.primitive),
        };
        acc.original_ids.extend(next.original_ids);
    }
    acc
}

/// Allocates fresh, process-wide-unique [`OriginalIdKey`]s for `.material(..)`
/// tagging (§4.4) and for `CachedNode` cache keys that don't have a more
/// natural one.
#[derive(Debug, Default)]
pub struct IdAllocator(std::sync::atomic::AtomicU64);

impl IdAllocator {
    /// A fresh allocator starting at 1 (0 is reserved as "no ID").
    pub fn new() -> Self {
        Self(std::sync::atomic::AtomicU64::new(1))
    }

    /// Allocate the next ID.
    pub fn next(&self) -> OriginalIdKey {
        self.0.fetch_add(1, std::sync::atomic::Ordering::Relaxed)
    }
}
