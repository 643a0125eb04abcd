#![warn(missing_docs)]

//! vcad — declarative, compositional CAD in Rust.
//!
//! Geometry is built, not mutated: every value implementing [`Geometry`]
//! lowers itself to an immutable IR node plus auxiliary metadata
//! ([`vcad_ir::ResultElements`]) given an [`Environment`] and an
//! [`EvaluationContext`]. The context memoizes concrete kernel evaluation
//! so structurally-identical subtrees, however they were reached, are
//! computed exactly once.
//!
//! # Example
//!
//! ```rust,no_run
//! use vcad::{EvaluationContext, Environment, Geometry};
//! use vcad::builders::{Composite, PrimitiveShape, TransformBuilder};
//! use vcad_ir::{BooleanKind, Node, Dim3};
//!
//! # async fn run() -> Result<(), vcad::GeometryError> {
//! let cube = PrimitiveShape::<Dim3>::new(Node::cuboid(20.0, 10.0, 5.0));
//! let hole = TransformBuilder::new(
//!     PrimitiveShape::<Dim3>::new(Node::cylinder(3.0, 3.0, 10.0, 32)),
//!     vcad_ir::Affine3::translation(10.0, 5.0, -2.5),
//! );
//! let cut = Composite::<Dim3>::new(BooleanKind::Difference, vec![Box::new(cube), Box::new(hole)]);
//!
//! let ctx = EvaluationContext::new();
//! let env = Environment::default();
//! let result = cut.build(&env, &ctx).await?;
//! let concrete = ctx.evaluate_3d(&result.node).await?;
//! let _ = concrete.primitive.mesh().num_triangles();
//! # Ok(())
//! # }
//! ```

mod concrete;
mod context;
mod geometry;

pub mod builders;
pub mod export;
pub mod measurements;
pub mod project;

pub use concrete::ConcreteResult;
pub use context::{EvaluationContext, IdAllocator};
pub use error::{ExportError, GeometryError};
pub use geometry::Geometry;
pub use project::{Model, ModelContent, ModelOutput, Project};
pub use vcad_ir::Environment;

mod error;
