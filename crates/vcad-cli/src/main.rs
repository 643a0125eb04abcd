//! Thin `clap` driver over the `vcad` library (§6.4): reads a `vcad.toml`
//! project manifest, builds every declared model against one shared
//! `EvaluationContext`, and writes export files. Per-model build failures
//! are logged and skipped rather than aborting the whole project.

mod manifest;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use vcad::export;
use vcad::project::ModelOutput;
use vcad::{Environment, Project};
use vcad_kernel::Manifold;

#[derive(Parser)]
#[command(name = "vcad", about = "Build and export vcad projects")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build every model in a project directory and report the outcome.
    Build {
        /// Directory containing `vcad.toml`.
        project_dir: PathBuf,
    },
    /// Build a project and write each model's export files to a directory.
    Export {
        /// Directory containing `vcad.toml`.
        project_dir: PathBuf,
        /// Directory export files are written to (created if missing).
        out_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let cli = Cli::parse();
    match cli.command {
        Command::Build { project_dir } => build(&project_dir).await?,
        Command::Export { project_dir, out_dir } => {
            let project = load_project(&project_dir)?;
            let outputs = project.build().await;
            std::fs::create_dir_all(&out_dir)?;
            for (name, output) in outputs {
                if let Err(err) = export_model(&name, &output, project.context(), &out_dir).await {
                    tracing::error!(model = %name, error = %err, "export failed, skipping");
                }
            }
        }
    }
    Ok(())
}

async fn build(project_dir: &Path) -> anyhow::Result<()> {
    let project = load_project(project_dir)?;
    let total = project.models.len();
    let outputs = project.build().await;
    for (name, output) in &outputs {
        match output {
            ModelOutput::Solid(result) => {
                let concrete = project.context().evaluate_3d(&result.node).await?;
                println!("{name}: solid, {} triangles", concrete.primitive.mesh().num_triangles());
            }
            ModelOutput::Sketch(result) => {
                let concrete = project.context().evaluate_2d(&result.node).await?;
                println!("{name}: sketch, {} contours", concrete.primitive.0.contours.len());
            }
        }
    }
    println!("{}/{total} models built", outputs.len());
    Ok(())
}

fn load_project(project_dir: &Path) -> anyhow::Result<Project> {
    let manifest_path = project_dir.join("vcad.toml");
    let text = std::fs::read_to_string(&manifest_path).map_err(|e| anyhow::anyhow!("reading {}: {e}", manifest_path.display()))?;
    let manifest: manifest::Manifest = toml::from_str(&text)?;
    let models = manifest::resolve(&manifest)?;
    Ok(Project::new(project_dir.to_path_buf(), Environment::default(), models))
}

async fn export_model(name: &str, output: &ModelOutput, ctx: &vcad::EvaluationContext, out_dir: &Path) -> anyhow::Result<()> {
    match output {
        ModelOutput::Solid(result) => {
            let objects = export::collect_objects(&result.node, &result.elements, ctx).await?;

            let mut threemf = std::fs::File::create(out_dir.join(format!("{name}.3mf")))?;
            export::threemf::write(&objects, &mut threemf)?;

            let mut stl = std::fs::File::create(out_dir.join(format!("{name}.stl")))?;
            export::stl::write(&objects, &mut stl)?;
        }
        ModelOutput::Sketch(result) => {
            let concrete = ctx.evaluate_2d(&result.node).await?;
            let mut svg = std::fs::File::create(out_dir.join(format!("{name}.svg")))?;
            export::svg::write(&concrete.primitive, &mut svg)?;
        }
    }
    Ok(())
}
