//! `Project`/`Model`: the pure, directory-shaped entry point a CLI or
//! build script drives (§6.4). Neither type runs anything by itself —
//! `Project::build` walks its models, evaluating each against one shared
//! [`EvaluationContext`] so an `Import` reused across models is only read
//! and evaluated once (scenario S5).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use vcad_ir::{BuildResult, Dim2, Dim3};

use crate::context::{EvaluationContext, IdAllocator};
use crate::error::GeometryError;
use crate::geometry::Geometry;
use crate::Environment;

tokio::task_local! {
    /// The project root directory, for free functions (import factories)
    /// that need to resolve a relative path without threading it through
    /// every combinator. Scoped for the duration of one `Project::build`;
    /// nothing outside that call may read it.
    static CURRENT_PROJECT_ROOT: PathBuf;
}

/// Resolve `path` against the currently building project's root, if one
/// is bound. Falls back to treating `path` as already-absolute/relative
/// to the process's working directory when called outside a `Project`
/// build (e.g. unit tests constructing an `Import` directly).
pub fn resolve_project_path(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    CURRENT_PROJECT_ROOT.try_with(|root| root.join(path)).unwrap_or_else(|_| path.to_path_buf())
}

/// A named model's declared content: a 3D solid or a 2D sketch. Export
/// format is picked from this tag (3MF/STL for `Solid`, SVG for `Sketch`).
pub enum ModelContent {
    /// A 3D geometry tree, exported as a manufacturable/visual mesh.
    Solid(Box<dyn Geometry<Dim3>>),
    /// A 2D geometry tree, exported as a flat profile.
    Sketch(Box<dyn Geometry<Dim2>>),
}

/// One named, independently exportable model within a [`Project`].
pub struct Model {
    /// File-stem-safe name, used for the exported file and diagnostics.
    pub name: String,
    /// What to build.
    pub content: ModelContent,
}

impl Model {
    /// A model whose content is a 3D solid.
    pub fn solid(name: impl Into<String>, content: impl Geometry<Dim3> + 'static) -> Self {
        Self { name: name.into(), content: ModelContent::Solid(Box::new(content)) }
    }

    /// A model whose content is a 2D sketch.
    pub fn sketch(name: impl Into<String>, content: impl Geometry<Dim2> + 'static) -> Self {
        Self { name: name.into(), content: ModelContent::Sketch(Box::new(content)) }
    }
}

/// The outcome of building one [`Model`].
pub enum ModelOutput {
    /// A built 3D solid.
    Solid(BuildResult<Dim3>),
    /// A built 2D sketch.
    Sketch(BuildResult<Dim2>),
}

/// A directory of declared models, built against one shared evaluation
/// context and a common base environment.
pub struct Project {
    /// The project's root directory; relative `Import` paths resolve here.
    pub root: PathBuf,
    /// The base environment every model builds under.
    pub options: Environment,
    /// The models to build.
    pub models: Vec<Model>,
    context: EvaluationContext,
    ids: Arc<IdAllocator>,
}

impl Project {
    /// A project rooted at `root`, with `models` built under `options`.
    pub fn new(root: impl Into<PathBuf>, options: Environment, models: Vec<Model>) -> Self {
        Self { root: root.into(), options, models, context: EvaluationContext::new(), ids: Arc::new(IdAllocator::new()) }
    }

    /// The evaluation context shared by every model in this project.
    pub fn context(&self) -> &EvaluationContext {
        &self.context
    }

    /// The original-ID allocator shared by every model in this project.
    pub fn ids(&self) -> &Arc<IdAllocator> {
        &self.ids
    }

    /// Build every model. A model whose build fails is logged and
    /// excluded from the result rather than aborting the rest of the
    /// project (§6.4).
    pub async fn build(&self) -> Vec<(String, ModelOutput)> {
        let models = &self.models;
        let context = &self.context;
        let options = &self.options;
        let outputs = CURRENT_PROJECT_ROOT
            .scope(self.root.clone(), async move {
                let builds = models.iter().map(|model| async move {
                    let result = match &model.content {
                        ModelContent::Solid(g) => g.build(options, context).await.map(ModelOutput::Solid),
                        ModelContent::Sketch(g) => g.build(options, context).await.map(ModelOutput::Sketch),
                    };
                    (model.name.clone(), result)
                });
                futures::future::join_all(builds).await
            })
            .await;

        outputs
            .into_iter()
            .filter_map(|(name, result)| match result {
                Ok(output) => Some((name, output)),
                Err(err) => {
                    tracing::error!(model = %name, error = %err, "model build failed, skipping");
                    None
                }
            })
            .collect()
    }
}
