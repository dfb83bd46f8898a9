//! SVG string assembly for traced curves

use crate::curve::{Curve, SegTag};
use crate::geometry::DPoint;

/// Format a coordinate with at most three decimals, eliding a trailing
/// `.000`
pub(crate) fn format_coord(value: f64) -> String {
    let s = format!("{value:.3}");
    match s.strip_suffix(".000") {
        Some(stripped) => stripped.to_string(),
        None => s,
    }
}

fn push_pair(out: &mut String, p: DPoint, scale: DPoint) {
    out.push_str(&format_coord(p.x * scale.x));
    out.push(',');
    out.push_str(&format_coord(p.y * scale.y));
}

/// Render one closed curve as `M`/`C`/`L` commands ending in `Z`
pub(crate) fn render_curve(curve: &Curve, scale: DPoint) -> String {
    let Some(start) = curve.start_point() else {
        return String::new();
    };

    let mut d = String::from("M ");
    push_pair(&mut d, start, scale);

    for segment in &curve.segments {
        match segment.tag {
            SegTag::Curve => {
                d.push_str(" C ");
                push_pair(&mut d, segment.c[0], scale);
                d.push(' ');
                push_pair(&mut d, segment.c[1], scale);
                d.push(' ');
                push_pair(&mut d, segment.c[2], scale);
            }
            SegTag::Corner => {
                d.push_str(" L ");
                push_pair(&mut d, segment.c[1], scale);
                d.push_str(" L ");
                push_pair(&mut d, segment.c[2], scale);
            }
        }
    }
    d.push_str(" Z");
    d
}

/// Concatenate every curve into one `d` attribute
pub(crate) fn render_curves(curves: &[Curve], scale: DPoint) -> String {
    curves
        .iter()
        .filter(|c| !c.is_empty())
        .map(|c| render_curve(c, scale))
        .collect::<Vec<_>>()
        .join(" ")
}

/// A `<path>` element; holes rely on the even-odd fill rule
pub(crate) fn path_tag(d: &str, fill: Option<&str>, fill_opacity: Option<f64>) -> String {
    let mut tag = format!("<path d=\"{d}\" stroke=\"none\"");
    if let Some(fill) = fill {
        tag.push_str(&format!(" fill=\"{fill}\""));
    }
    if let Some(opacity) = fill_opacity {
        tag.push_str(&format!(" fill-opacity=\"{}\"", format_coord(opacity)));
    }
    tag.push_str(" fill-rule=\"evenodd\"/>");
    tag
}

/// Wrap body content in a `<symbol>` with a pixel-space view box
pub(crate) fn symbol(id: &str, width: u32, height: u32, body: &str) -> String {
    format!("<symbol viewBox=\"0 0 {width} {height}\" id=\"{id}\">{body}</symbol>")
}

/// A complete SVG document with an optional background rectangle
pub(crate) fn document(width: u32, height: u32, background: Option<&str>, body: &str) -> String {
    let background = background
        .map(|color| {
            format!("<rect x=\"0\" y=\"0\" width=\"100%\" height=\"100%\" fill=\"{color}\"/>\n\t")
        })
        .unwrap_or_default();
    format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" \
         viewBox=\"0 0 {width} {height}\" version=\"1.1\">\n\t{background}{body}\n</svg>"
    )
}
