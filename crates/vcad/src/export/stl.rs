//! Binary STL export: every object's mesh merged into one, with no
//! material or part information (the format carries neither).

use std::io::{self, Write};

use vcad_kernel_geom::Mesh3;

use super::ExportObject;
use crate::error::ExportError;

/// Write `objects`, merged into a single mesh, as binary STL to `w`.
pub fn write<W: Write>(objects: &[ExportObject], w: &mut W) -> Result<(), ExportError> {
    let mut merged = Mesh3::new();
    for object in objects {
        merged.merge(&object.mesh);
    }
    if merged.is_empty() {
        return Err(ExportError::EmptyGeometry);
    }

    let mut header = [0u8; 80];
    let banner = b"vcad binary STL export";
    header[..banner.len()].copy_from_slice(banner);
    w.write_all(&header)?;
    w.write_all(&(merged.num_triangles() as u32).to_le_bytes())?;

    for tri in &merged.triangles {
        let [a, b, c] = merged.triangle_points(tri);
        let normal = (b - a).cross(&(c - a)).normalize();
        write_vec3(w, normal.x, normal.y, normal.z)?;
        write_vec3(w, a.x, a.y, a.z)?;
        write_vec3(w, b.x, b.y, b.z)?;
        write_vec3(w, c.x, c.y, c.z)?;
        w.write_all(&0u16.to_le_bytes())?;
    }
    Ok(())
}

fn write_vec3<W: Write>(w: &mut W, x: f64, y: f64, z: f64) -> io::Result<()> {
    w.write_all(&(x as f32).to_le_bytes())?;
    w.write_all(&(y as f32).to_le_bytes())?;
    w.write_all(&(z as f32).to_le_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::ExportObject;
    use vcad_kernel::{Manifold, ManifoldImpl};
    use vcad_kernel_math::Vec3;

    #[test]
    fn cube_writes_twelve_triangles() {
        let mesh = ManifoldImpl::cuboid(Vec3::new(1.0, 1.0, 1.0)).mesh().clone();
        let objects = vec![ExportObject { name: String::new(), mesh, material_runs: Vec::new() }];
        let mut buf = Vec::new();
        write(&objects, &mut buf).unwrap();
        let count = u32::from_le_bytes(buf[80..84].try_into().unwrap());
        assert_eq!(count, 12);
        assert_eq!(buf.len(), 84 + 12 * 50);
    }

    #[test]
    fn empty_mesh_is_an_error() {
        let mut buf = Vec::new();
        assert!(write(&[], &mut buf).is_err());
    }
}
