//! 3MF export: a zip package containing `3D/3dmodel.model`, one `<object>`
//! per part with a `<basematerials>` group for every distinct material
//! seen across the objects (§6.3). Units are fixed to millimeters.

use std::io::{Cursor, Write};

use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::Writer as XmlWriter;
use vcad_ir::MaterialAssignment;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use super::ExportObject;
use crate::error::ExportError;

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="model" ContentType="application/vnd.ms-package.3dmanufacturing-3dmodel+xml"/>
</Types>
"#;

const RELS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Target="/3D/3dmodel.model" Id="rel0" Type="http://schemas.microsoft.com/3dmanufacturing/2013/01/3dmodel"/>
</Relationships>
"#;

/// Write `objects` as a 3MF package to `w`.
pub fn write<W: Write + std::io::Seek>(objects: &[ExportObject], w: W) -> Result<(), ExportError> {
    if objects.iter().all(|o| o.mesh.is_empty()) {
        return Err(ExportError::EmptyGeometry);
    }

    let materials = distinct_materials(objects);
    let model_xml = build_model_xml(objects, &materials)?;

    let mut zip = ZipWriter::new(w);
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    zip.start_file("[Content_Types].xml", options)?;
    zip.write_all(CONTENT_TYPES.as_bytes())?;

    zip.start_file("_rels/.rels", options)?;
    zip.write_all(RELS.as_bytes())?;

    zip.start_file("3D/3dmodel.model", options)?;
    zip.write_all(&model_xml)?;

    zip.finish()?;
    Ok(())
}

fn distinct_materials(objects: &[ExportObject]) -> Vec<MaterialAssignment> {
    let mut seen = Vec::new();
    for object in objects {
        for (material, _) in &object.material_runs {
            if let Some(m) = material {
                if !seen.iter().any(|existing: &MaterialAssignment| existing.name == m.name) {
                    seen.push(m.clone());
                }
            }
        }
    }
    seen
}

fn material_index(materials: &[MaterialAssignment], assignment: Option<&MaterialAssignment>) -> Option<usize> {
    let assignment = assignment?;
    materials.iter().position(|m| m.name == assignment.name)
}

fn build_model_xml(objects: &[ExportObject], materials: &[MaterialAssignment]) -> Result<Vec<u8>, ExportError> {
    let mut writer = XmlWriter::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

    writer.write_event(Event::Decl(quick_xml::events::BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut model = BytesStart::new("model");
    model.push_attribute(("unit", "millimeter"));
    model.push_attribute(("xml:lang", "en-US"));
    model.push_attribute(("xmlns", "http://schemas.microsoft.com/3dmanufacturing/core/2015/02"));
    model.push_attribute(("xmlns:m", "http://schemas.microsoft.com/3dmanufacturing/material/2015/02"));
    writer.write_event(Event::Start(model))?;

    writer.write_event(Event::Start(BytesStart::new("resources")))?;

    if !materials.is_empty() {
        let mut group = BytesStart::new("basematerials");
        group.push_attribute(("id", "1"));
        writer.write_event(Event::Start(group))?;
        for material in materials {
            let mut base = BytesStart::new("base");
            base.push_attribute(("name", material.name.as_str()));
            base.push_attribute(("displaycolor", hex_color(material.color).as_str()));
            writer.write_event(Event::Empty(base))?;
        }
        writer.write_event(Event::End(BytesEnd::new("basematerials")))?;
    }

    for (object_id, object) in objects.iter().enumerate() {
        if object.mesh.is_empty() {
            continue;
        }
        let id = (object_id + 2).to_string();
        let mut obj = BytesStart::new("object");
        obj.push_attribute(("id", id.as_str()));
        obj.push_attribute(("type", "model"));
        if !object.name.is_empty() {
            obj.push_attribute(("name", object.name.as_str()));
        }
        writer.write_event(Event::Start(obj))?;

        writer.write_event(Event::Start(BytesStart::new("mesh")))?;
        writer.write_event(Event::Start(BytesStart::new("vertices")))?;
        for v in &object.mesh.vertices {
            let mut vertex = BytesStart::new("vertex");
            vertex.push_attribute(("x", v.x.to_string().as_str()));
            vertex.push_attribute(("y", v.y.to_string().as_str()));
            vertex.push_attribute(("z", v.z.to_string().as_str()));
            writer.write_event(Event::Empty(vertex))?;
        }
        writer.write_event(Event::End(BytesEnd::new("vertices")))?;

        writer.write_event(Event::Start(BytesStart::new("triangles")))?;
        let mut triangle_index = 0usize;
        for (material, run_length) in &object.material_runs {
            let pindex = material_index(materials, material.as_ref());
            for _ in 0..*run_length {
                let tri = &object.mesh.triangles[triangle_index];
                let mut triangle = BytesStart::new("triangle");
                triangle.push_attribute(("v1", tri.indices[0].to_string().as_str()));
                triangle.push_attribute(("v2", tri.indices[1].to_string().as_str()));
                triangle.push_attribute(("v3", tri.indices[2].to_string().as_str()));
                if let Some(pindex) = pindex {
                    triangle.push_attribute(("pid", "1"));
                    triangle.push_attribute(("p1", pindex.to_string().as_str()));
                }
                writer.write_event(Event::Empty(triangle))?;
                triangle_index += 1;
            }
        }
        writer.write_event(Event::End(BytesEnd::new("triangles")))?;
        writer.write_event(Event::End(BytesEnd::new("mesh")))?;
        writer.write_event(Event::End(BytesEnd::new("object")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("resources")))?;

    writer.write_event(Event::Start(BytesStart::new("build")))?;
    for (object_id, object) in objects.iter().enumerate() {
        if object.mesh.is_empty() {
            continue;
        }
        let mut item = BytesStart::new("item");
        item.push_attribute(("objectid", (object_id + 2).to_string().as_str()));
        writer.write_event(Event::Empty(item))?;
    }
    writer.write_event(Event::End(BytesEnd::new("build")))?;

    writer.write_event(Event::End(BytesEnd::new("model")))?;

    Ok(writer.into_inner().into_inner())
}

fn hex_color(rgb: [f64; 3]) -> String {
    let byte = |c: f64| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
    format!("#{:02X}{:02X}{:02X}FF", byte(rgb[0]), byte(rgb[1]), byte(rgb[2]))
}

impl From<quick_xml::Error> for ExportError {
    fn from(e: quick_xml::Error) -> Self {
        ExportError::Serialization(e.to_string())
    }
}

impl From<zip::result::ZipError> for ExportError {
    fn from(e: zip::result::ZipError) -> Self {
        ExportError::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vcad_kernel::{Manifold, ManifoldImpl};
    use vcad_kernel_math::Vec3;

    #[test]
    fn cube_package_contains_model_part() {
        let mesh = ManifoldImpl::cuboid(Vec3::new(1.0, 1.0, 1.0)).mesh().clone();
        let objects = vec![ExportObject { name: "main".into(), mesh, material_runs: vec![(None, 12)] }];
        let mut buf = Cursor::new(Vec::new());
        write(&objects, &mut buf).unwrap();
        let bytes = buf.into_inner();
        assert!(bytes.starts_with(b"PK"));
    }
}
