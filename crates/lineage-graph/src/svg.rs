use crate::Vec2;
use crate::export::{PaintedEdge, PaintedNode, Scene};
use crate::style::{self, Color};
use lineage_core::EdgeKind;

const MARGIN: f32 = 20.0;
const CORNER_RADIUS: f32 = 8.0;
const LABEL_CHAR_WIDTH: f32 = 7.0;

/// Serializes the scene as a standalone SVG document, one unit per graph unit.
pub(crate) fn render(scene: &Scene<'_>) -> String {
    let min_x = scene.bounds.min.x - MARGIN;
    let min_y = scene.bounds.min.y - MARGIN;
    let width = scene.bounds.width() + MARGIN * 2.0;
    let height = scene.bounds.height() + MARGIN * 2.0;

    let mut svg = String::new();
    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{:.2}\" height=\"{:.2}\" viewBox=\"{:.2} {:.2} {:.2} {:.2}\" font-family=\"Arial, sans-serif\">",
        width, height, min_x, min_y, width, height
    ));

    svg.push_str("<defs>");
    svg.push_str(&format!(
        "<marker id=\"arrow\" viewBox=\"0 0 10 10\" refX=\"10\" refY=\"5\" markerWidth=\"6\" markerHeight=\"6\" orient=\"auto\"><path d=\"M 0 0 L 10 5 L 0 10 z\" fill=\"{}\"/></marker>",
        style::edge_style(EdgeKind::Lineage).color.to_hex()
    ));
    svg.push_str("</defs>");

    svg.push_str(&format!(
        "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" fill=\"{}\"/>",
        min_x,
        min_y,
        width,
        height,
        style::COLOR_BACKGROUND.to_hex()
    ));

    svg.push_str("<g class=\"edges\">");
    for edge in &scene.edges {
        svg.push_str(&edge_svg(edge));
    }
    svg.push_str("</g>");

    svg.push_str("<g class=\"edge-labels\">");
    for edge in &scene.edges {
        svg.push_str(&edge_label_svg(edge));
    }
    svg.push_str("</g>");

    svg.push_str("<g class=\"nodes\">");
    for node in &scene.nodes {
        svg.push_str(&node_svg(node));
    }
    svg.push_str("</g>");

    svg.push_str("</svg>");
    svg
}

fn edge_svg(painted: &PaintedEdge<'_>) -> String {
    let style = &painted.style;
    let mut attrs = format!(
        "d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{:.1}\"{}",
        points_to_path(&painted.edge.path),
        style.color.to_hex(),
        style.width,
        opacity_attr(painted.opacity)
    );
    if style.dashed {
        attrs.push_str(" stroke-dasharray=\"6 4\"");
    }
    if style.arrow_head {
        attrs.push_str(" marker-end=\"url(#arrow)\"");
    }
    format!(
        "<path data-key=\"{}\" {}/>",
        escape_xml(&painted.edge.key.0),
        attrs
    )
}

fn edge_label_svg(painted: &PaintedEdge<'_>) -> String {
    let label = &painted.edge.edge.relation_label;
    if label.is_empty() {
        return String::new();
    }
    let pos = painted.edge.label_position();
    let text_width = label.chars().count() as f32 * LABEL_CHAR_WIDTH;
    let box_w = text_width + 12.0;
    let box_h = style::EDGE_FONT_SIZE + 8.0;
    format!(
        "<g{}><rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"4\" fill=\"{}\" fill-opacity=\"0.95\" stroke=\"{}\"/>{}</g>",
        opacity_attr(painted.opacity),
        pos.x - box_w / 2.0,
        pos.y - box_h / 2.0,
        box_w,
        box_h,
        style::COLOR_BACKGROUND.to_hex(),
        style::COLOR_EDGE_LABEL_BORDER.to_hex(),
        text_svg(pos, label, style::EDGE_FONT_SIZE, style::COLOR_EDGE_LABEL, "500")
    )
}

fn node_svg(painted: &PaintedNode<'_>) -> String {
    let node = painted.node;
    let rect = node.rect();
    format!(
        "<g class=\"node {}\" data-id=\"{}\"{}><rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"{}\" ry=\"{}\" fill=\"{}\" stroke=\"{}\" stroke-width=\"{:.1}\"/>{}</g>",
        node.kind().label(),
        escape_xml(node.node.id.as_str()),
        opacity_attr(painted.opacity),
        rect.min.x,
        rect.min.y,
        rect.width(),
        rect.height(),
        CORNER_RADIUS,
        CORNER_RADIUS,
        painted.colors.fill.to_hex(),
        painted.border.to_hex(),
        painted.border_width,
        text_svg(
            node.center(),
            &node.node.display_name,
            style::NODE_FONT_SIZE,
            painted.colors.text,
            "600"
        )
    )
}

fn text_svg(pos: Vec2, text: &str, size: f32, color: Color, weight: &str) -> String {
    format!(
        "<text x=\"{:.2}\" y=\"{:.2}\" font-size=\"{}\" font-weight=\"{}\" fill=\"{}\" text-anchor=\"middle\" dominant-baseline=\"central\">{}</text>",
        pos.x,
        pos.y,
        size,
        weight,
        color.to_hex(),
        escape_xml(text)
    )
}

fn opacity_attr(opacity: f32) -> String {
    if opacity >= 1.0 {
        String::new()
    } else {
        format!(" opacity=\"{:.2}\"", opacity)
    }
}

fn points_to_path(points: &[Vec2]) -> String {
    if points.is_empty() {
        return String::new();
    }
    let mut d = String::new();
    d.push_str(&format!("M {:.2} {:.2}", points[0].x, points[0].y));
    for point in points.iter().skip(1) {
        d.push_str(&format!(" L {:.2} {:.2}", point.x, point.y));
    }
    d
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
