//! SVG export: a single path element covering every contour of a 2D
//! result, even-odd filled so holes render correctly regardless of
//! winding.

use std::io::Write;

use vcad_kernel::CrossSectionImpl;
use vcad_kernel_geom::Bounds2;

use crate::error::ExportError;

/// Write `cross_section` as a single-path SVG document to `w`.
pub fn write<W: Write>(cross_section: &CrossSectionImpl, w: &mut W) -> Result<(), ExportError> {
    if cross_section.0.is_empty() {
        return Err(ExportError::EmptyGeometry);
    }
    let bounds = cross_section.0.bounds();
    let Bounds2 { min, max } = bounds;
    let width = max.x - min.x;
    let height = max.y - min.y;

    let mut path = String::new();
    for contour in &cross_section.0.contours {
        if contour.is_empty() {
            continue;
        }
        path.push_str(&format!("M {:.6},{:.6} ", contour[0].x, contour[0].y));
        for p in &contour[1..] {
            path.push_str(&format!("L {:.6},{:.6} ", p.x, p.y));
        }
        path.push('Z');
        path.push(' ');
    }

    writeln!(
        w,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" viewBox=\"{} {} {} {}\" width=\"{width}mm\" height=\"{height}mm\">",
        min.x, min.y, width, height,
    )?;
    writeln!(w, "  <path d=\"{}\" fill-rule=\"evenodd\" />", path.trim_end())?;
    writeln!(w, "</svg>")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vcad_kernel::CrossSection;
    use vcad_kernel_math::Vec2;

    #[test]
    fn square_writes_one_closed_path() {
        let square = CrossSectionImpl::square(Vec2::new(10.0, 10.0));
        let mut buf = Vec::new();
        write(&square, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("<path"));
        assert!(text.contains('Z'));
    }

    #[test]
    fn empty_cross_section_is_an_error() {
        let mut buf = Vec::new();
        assert!(write(&CrossSectionImpl::default(), &mut buf).is_err());
    }
}
