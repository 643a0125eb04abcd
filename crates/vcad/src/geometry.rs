//! The declarative geometry abstraction: any value that can build itself
//! into an IR node plus its auxiliary metadata, given an environment and
//! an evaluation context.

use futures::future::BoxFuture;
use vcad_ir::{BuildResult, Dim};

use crate::error::GeometryError;
use crate::EvaluationContext;
use crate::Environment;

/// A value whose build is referentially transparent in `(self, environment)`
/// once the context's caches are populated — no `Geometry` implementation
/// holds mutable state of its own.
///
/// `build` returns a boxed future rather than being a native `async fn`
/// in the trait: the core never needs `dyn Geometry` across an await
/// point for the dimension-homogeneous combinators in [`crate::builders`],
/// but composite operators that accept heterogeneous children (anything
/// implementing `Geometry<D>`) do need object safety, and a boxed future
/// is the standard way to get it without pulling in `async-trait`.
pub trait Geometry<D: Dim>: Send + Sync {
    /// Build this value's `BuildResult`, recursing through `context` for
    /// any concrete evaluation it needs along the way.
    fn build<'a>(&'a self, env: &'a Environment, context: &'a EvaluationContext) -> BoxFuture<'a, Result<BuildResult<D>, GeometryError>>;
}

impl<D: Dim> Geometry<D> for BuildResult<D> {
    fn build<'a>(&'a self, _env: &'a Environment, _context: &'a EvaluationContext) -> BoxFuture<'a, Result<BuildResult<D>, GeometryError>> {
        Box::pin(async move { Ok(self.clone()) })
    }
}
