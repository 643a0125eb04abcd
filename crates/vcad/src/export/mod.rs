//! Export surface (§6.3): maps a built, concretely evaluated result onto
//! on-disk file formats. Exporters only ever see the finished part list,
//! material record, and metadata — never the IR.

pub mod stl;
pub mod svg;
pub mod threemf;

use vcad_ir::{Dim3, MaterialAssignment, Node, ResultElements};
use vcad_kernel::Manifold;
use vcad_kernel_geom::Mesh3;

use crate::context::EvaluationContext;
use crate::error::GeometryError;

/// One exportable named object: a part's name plus its concrete mesh and
/// the resolved material for each contiguous triangle run.
pub struct ExportObject {
    /// The part's catalog name (empty for the unnamed main part).
    pub name: String,
    /// The concrete mesh.
    pub mesh: Mesh3,
    /// `(material, run_length)` pairs covering every triangle in order;
    /// `None` where no original-ID is tagged, falling back to the part's
    /// default appearance at export time.
    pub material_runs: Vec<(Option<MaterialAssignment>, usize)>,
}

/// Walks a built result's main node and part catalog, evaluates each
/// concretely through `ctx`, and resolves per-triangle materials from
/// `elements.material_record` by original-ID run (§6.3, §4.4).
pub async fn collect_objects(main: &Node<Dim3>, elements: &ResultElements, ctx: &EvaluationContext) -> Result<Vec<ExportObject>, GeometryError> {
    let mut objects = Vec::new();
    if !main.is_empty() {
        objects.push(resolve_object(String::new(), main, elements, ctx).await?);
    }
    for (part, node) in &elements.part_catalog {
        objects.push(resolve_object(part.name.clone(), node, elements, ctx).await?);
    }
    Ok(objects)
}

async fn resolve_object(name: String, node: &Node<Dim3>, elements: &ResultElements, ctx: &EvaluationContext) -> Result<ExportObject, GeometryError> {
    let concrete = ctx.evaluate_3d(node).await?;
    let material_runs = concrete
        .primitive
        .original_id_runs()
        .into_iter()
        .map(|(id, len)| (id.and_then(|id| elements.material_record.get(&id).cloned()), len))
        .collect();
    Ok(ExportObject { name, mesh: concrete.primitive.mesh().clone(), material_runs })
}
