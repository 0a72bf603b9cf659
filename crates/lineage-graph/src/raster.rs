use crate::Vec2;
use crate::export::{ExportError, ExportOptions, PaintedEdge, PaintedNode, Scene};
use crate::style::{self, Color};
use fontdue::layout::{CoordinateSystem, Layout, LayoutSettings, TextStyle};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder, Rgba, RgbaImage};

const MAX_DIM: f32 = 12000.0;
const ARROW_SIZE: f32 = 10.0;
const DASH_LENGTH: i32 = 8;

pub(crate) fn render(scene: &Scene<'_>, options: &ExportOptions) -> RgbaImage {
    let width = scene.bounds.width().max(1.0);
    let height = scene.bounds.height().max(1.0);
    let scale = options
        .scale
        .max(0.1)
        .min(MAX_DIM / width)
        .min(MAX_DIM / height);
    let padding = options.padding.max(0.0);

    let img_width = (width * scale + padding * 2.0).ceil().max(1.0) as u32;
    let img_height = (height * scale + padding * 2.0).ceil().max(1.0) as u32;
    let background = style::COLOR_BACKGROUND;
    let mut canvas = Canvas {
        image: RgbaImage::from_pixel(
            img_width,
            img_height,
            Rgba([background.r, background.g, background.b, background.a]),
        ),
        origin: scene.bounds.min,
        scale,
        padding,
        font: load_export_font(options),
    };

    for edge in &scene.edges {
        canvas.draw_edge(edge);
    }
    for edge in &scene.edges {
        canvas.draw_edge_label(edge);
    }
    for node in &scene.nodes {
        canvas.draw_node(node);
    }

    canvas.image
}

pub(crate) fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, ExportError> {
    let mut bytes = Vec::new();
    PngEncoder::new(&mut bytes)
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            ExtendedColorType::Rgba8,
        )
        .map_err(|err| ExportError::Encode(err.to_string()))?;
    Ok(bytes)
}

pub(crate) fn encode_jpeg(image: &RgbaImage, quality: u8) -> Result<Vec<u8>, ExportError> {
    // JPEG has no alpha channel; the background is opaque so nothing is lost.
    let rgb = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100))
        .write_image(
            rgb.as_raw(),
            rgb.width(),
            rgb.height(),
            ExtendedColorType::Rgb8,
        )
        .map_err(|err| ExportError::Encode(err.to_string()))?;
    Ok(bytes)
}

fn load_export_font(options: &ExportOptions) -> Option<fontdue::Font> {
    let path = options
        .font_path
        .clone()
        .or_else(|| std::env::var_os("LINEAGE_FONT_PATH").map(Into::into))?;
    let bytes = match std::fs::read(&path) {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!("Could not read export font {}: {}", path.display(), err);
            return None;
        }
    };
    match fontdue::Font::from_bytes(bytes, fontdue::FontSettings::default()) {
        Ok(font) => Some(font),
        Err(err) => {
            tracing::warn!("Could not parse export font {}: {}", path.display(), err);
            None
        }
    }
}

struct Canvas {
    image: RgbaImage,
    origin: Vec2,
    scale: f32,
    padding: f32,
    font: Option<fontdue::Font>,
}

impl Canvas {
    fn map_pos(&self, pos: Vec2) -> (f32, f32) {
        (
            (pos.x - self.origin.x) * self.scale + self.padding,
            (pos.y - self.origin.y) * self.scale + self.padding,
        )
    }

    fn map_pos_i(&self, pos: Vec2) -> (i32, i32) {
        let (x, y) = self.map_pos(pos);
        (x.round() as i32, y.round() as i32)
    }

    fn thickness(&self, width: f32) -> i32 {
        ((width * self.scale).round() as i32).max(1)
    }

    fn draw_edge(&mut self, painted: &PaintedEdge<'_>) {
        let color = painted.style.color.with_opacity(painted.opacity);
        let thickness = self.thickness(painted.style.width);
        let dash = painted.style.dashed.then(|| DASH_LENGTH * thickness.max(1));

        let points: Vec<(i32, i32)> = painted
            .edge
            .path
            .iter()
            .map(|p| self.map_pos_i(*p))
            .collect();
        for w in points.windows(2) {
            draw_line(
                &mut self.image,
                w[0].0,
                w[0].1,
                w[1].0,
                w[1].1,
                color,
                thickness,
                dash,
            );
        }

        if painted.style.arrow_head
            && let [.., before, tip] = painted.edge.path.as_slice()
        {
            let (tx, ty) = self.map_pos(*tip);
            let (bx, by) = self.map_pos(*before);
            draw_arrow_head(
                &mut self.image,
                (bx, by),
                (tx, ty),
                ARROW_SIZE * self.scale,
                color,
            );
        }
    }

    fn draw_edge_label(&mut self, painted: &PaintedEdge<'_>) {
        let label = painted.edge.edge.relation_label.as_str();
        if label.is_empty() {
            return;
        }
        let size = style::EDGE_FONT_SIZE * self.scale;
        let Some(text_width) = measure_text_width(&self.font, label, size) else {
            return;
        };
        let (cx, cy) = self.map_pos(painted.edge.label_position());
        let pad = 4.0 * self.scale;
        let half_w = text_width / 2.0 + pad;
        let half_h = size / 2.0 + pad;
        let background = style::COLOR_BACKGROUND.with_opacity(0.95 * painted.opacity);
        let border = style::COLOR_EDGE_LABEL_BORDER.with_opacity(painted.opacity);
        let (x0, y0, x1, y1) = (
            (cx - half_w).round() as i32,
            (cy - half_h).round() as i32,
            (cx + half_w).round() as i32,
            (cy + half_h).round() as i32,
        );
        draw_rect_filled(&mut self.image, x0, y0, x1, y1, background);
        draw_rect_stroke(&mut self.image, x0, y0, x1, y1, border, 1);
        draw_text(
            &mut self.image,
            &self.font,
            label,
            size,
            cx - text_width / 2.0,
            cy,
            style::COLOR_EDGE_LABEL.with_opacity(painted.opacity),
        );
    }

    fn draw_node(&mut self, painted: &PaintedNode<'_>) {
        let rect = painted.node.rect();
        let (x0, y0) = self.map_pos_i(rect.min);
        let (mut x1, mut y1) = self.map_pos_i(rect.max);
        if x1 == x0 {
            x1 += 1;
        }
        if y1 == y0 {
            y1 += 1;
        }

        draw_rect_filled(
            &mut self.image,
            x0,
            y0,
            x1,
            y1,
            painted.colors.fill.with_opacity(painted.opacity),
        );
        let border_thickness = self.thickness(painted.border_width);
        draw_rect_stroke(
            &mut self.image,
            x0,
            y0,
            x1,
            y1,
            painted.border.with_opacity(painted.opacity),
            border_thickness,
        );

        let label = painted.node.node.display_name.as_str();
        let max_width = (x1 - x0) as f32 - 10.0 * self.scale;
        let size = fit_text_size(
            &self.font,
            label,
            style::NODE_FONT_SIZE * self.scale,
            max_width,
            8.0 * self.scale,
        );
        if let Some(text_width) = measure_text_width(&self.font, label, size) {
            let (cx, cy) = self.map_pos(painted.node.center());
            draw_text(
                &mut self.image,
                &self.font,
                label,
                size,
                cx - text_width / 2.0,
                cy,
                painted.colors.text.with_opacity(painted.opacity),
            );
        }
    }
}

fn measure_text_width(font: &Option<fontdue::Font>, text: &str, size: f32) -> Option<f32> {
    let font = font.as_ref()?;
    let mut layout = Layout::new(CoordinateSystem::PositiveYDown);
    layout.reset(&LayoutSettings::default());
    layout.append(&[font], &TextStyle::new(text, size, 0));
    let mut min_x = f32::INFINITY;
    let mut max_x = f32::NEG_INFINITY;
    for glyph in layout.glyphs() {
        min_x = min_x.min(glyph.x);
        max_x = max_x.max(glyph.x + glyph.width as f32);
    }
    if min_x.is_finite() && max_x.is_finite() {
        Some((max_x - min_x).max(0.0))
    } else {
        Some(0.0)
    }
}

fn fit_text_size(
    font: &Option<fontdue::Font>,
    text: &str,
    size: f32,
    max_width: f32,
    min_size: f32,
) -> f32 {
    if max_width <= 0.0 {
        return size;
    }
    let width = measure_text_width(font, text, size).unwrap_or(0.0);
    if width <= max_width || width <= 0.0 {
        return size;
    }
    (size * (max_width / width)).max(min_size)
}

fn draw_text(
    image: &mut RgbaImage,
    font: &Option<fontdue::Font>,
    text: &str,
    size: f32,
    x: f32,
    center_y: f32,
    color: Color,
) {
    let Some(font) = font.as_ref() else {
        return;
    };
    let mut layout = Layout::new(CoordinateSystem::PositiveYDown);
    let mut settings = LayoutSettings {
        x,
        ..LayoutSettings::default()
    };
    if let Some(metrics) = font.horizontal_line_metrics(size) {
        let baseline = center_y + (metrics.ascent + metrics.descent) * 0.5;
        settings.y = baseline - metrics.ascent;
    } else {
        settings.y = center_y - size * 0.5;
    }
    layout.reset(&settings);
    layout.append(&[font], &TextStyle::new(text, size, 0));

    for glyph in layout.glyphs() {
        if glyph.width == 0 || glyph.height == 0 {
            continue;
        }
        let (metrics, bitmap) = font.rasterize_indexed(glyph.key.glyph_index, glyph.key.px);
        let start_x = glyph.x.floor() as i32;
        let start_y = glyph.y.floor() as i32;
        for row in 0..metrics.height {
            for col in 0..metrics.width {
                let coverage = bitmap[row * metrics.width + col];
                if coverage == 0 {
                    continue;
                }
                blend_pixel(
                    image,
                    start_x + col as i32,
                    start_y + row as i32,
                    color,
                    coverage,
                );
            }
        }
    }
}

fn draw_rect_filled(
    image: &mut RgbaImage,
    min_x: i32,
    min_y: i32,
    max_x: i32,
    max_y: i32,
    color: Color,
) {
    for y in min_y..max_y {
        for x in min_x..max_x {
            blend_pixel(image, x, y, color, 255);
        }
    }
}

fn draw_rect_stroke(
    image: &mut RgbaImage,
    min_x: i32,
    min_y: i32,
    max_x: i32,
    max_y: i32,
    color: Color,
    thickness: i32,
) {
    let thickness = thickness.max(1).min((max_x - min_x).min(max_y - min_y) / 2).max(1);
    for offset in 0..thickness {
        let y_top = min_y + offset;
        let y_bottom = max_y - 1 - offset;
        for x in (min_x + offset)..(max_x - offset) {
            blend_pixel(image, x, y_top, color, 255);
            if y_bottom != y_top {
                blend_pixel(image, x, y_bottom, color, 255);
            }
        }
        let x_left = min_x + offset;
        let x_right = max_x - 1 - offset;
        for y in (min_y + offset + 1)..(max_y - offset - 1) {
            blend_pixel(image, x_left, y, color, 255);
            if x_right != x_left {
                blend_pixel(image, x_right, y, color, 255);
            }
        }
    }
}

/// Bresenham line. With `dash`, alternating runs of that many steps are skipped.
#[allow(clippy::too_many_arguments)]
fn draw_line(
    image: &mut RgbaImage,
    mut x0: i32,
    mut y0: i32,
    x1: i32,
    y1: i32,
    color: Color,
    thickness: i32,
    dash: Option<i32>,
) {
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    let mut step = 0;
    loop {
        let visible = dash.is_none_or(|len| (step / len.max(1)) % 2 == 0);
        if visible {
            draw_thick_point(image, x0, y0, color, thickness);
        }
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
        step += 1;
    }
}

fn draw_thick_point(image: &mut RgbaImage, x: i32, y: i32, color: Color, thickness: i32) {
    let radius = (thickness.max(1) - 1) / 2;
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            blend_pixel(image, x + dx, y + dy, color, 255);
        }
    }
}

fn draw_arrow_head(image: &mut RgbaImage, from: (f32, f32), tip: (f32, f32), size: f32, color: Color) {
    let (dx, dy) = (tip.0 - from.0, tip.1 - from.1);
    let len = (dx * dx + dy * dy).sqrt();
    if len == 0.0 {
        return;
    }
    let (ux, uy) = (dx / len, dy / len);
    let base = (tip.0 - ux * size, tip.1 - uy * size);
    let half = size * 0.5;
    let left = (base.0 - uy * half, base.1 + ux * half);
    let right = (base.0 + uy * half, base.1 - ux * half);
    fill_triangle(image, tip, left, right, color);
}

fn fill_triangle(image: &mut RgbaImage, a: (f32, f32), b: (f32, f32), c: (f32, f32), color: Color) {
    let min_x = a.0.min(b.0).min(c.0).floor() as i32;
    let max_x = a.0.max(b.0).max(c.0).ceil() as i32;
    let min_y = a.1.min(b.1).min(c.1).floor() as i32;
    let max_y = a.1.max(b.1).max(c.1).ceil() as i32;
    let edge = |p: (f32, f32), q: (f32, f32), r: (f32, f32)| {
        (q.0 - p.0) * (r.1 - p.1) - (q.1 - p.1) * (r.0 - p.0)
    };
    let area = edge(a, b, c);
    if area == 0.0 {
        return;
    }
    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let p = (x as f32 + 0.5, y as f32 + 0.5);
            let w0 = edge(b, c, p) / area;
            let w1 = edge(c, a, p) / area;
            let w2 = edge(a, b, p) / area;
            if w0 >= 0.0 && w1 >= 0.0 && w2 >= 0.0 {
                blend_pixel(image, x, y, color, 255);
            }
        }
    }
}

fn pixel(image: &RgbaImage, x: i32, y: i32) -> Option<Rgba<u8>> {
    if x < 0 || y < 0 || x >= image.width() as i32 || y >= image.height() as i32 {
        return None;
    }
    Some(*image.get_pixel(x as u32, y as u32))
}

fn blended(existing: Rgba<u8>, color: Color, coverage: u8) -> Rgba<u8> {
    let [r, g, b, a] = existing.0;
    let src_a = (color.a as f32 / 255.0) * (coverage as f32 / 255.0);
    let inv = 1.0 - src_a;
    let out_r = (color.r as f32 * src_a + r as f32 * inv).round() as u8;
    let out_g = (color.g as f32 * src_a + g as f32 * inv).round() as u8;
    let out_b = (color.b as f32 * src_a + b as f32 * inv).round() as u8;
    let out_a = ((color.a as f32 * src_a + a as f32 * inv).round() as u8).max(a);
    Rgba([out_r, out_g, out_b, out_a])
}

fn blend_pixel(image: &mut RgbaImage, x: i32, y: i32, color: Color, coverage: u8) {
    let Some(existing) = pixel(image, x, y) else {
        return;
    };
    image.put_pixel(x as u32, y as u32, blended(existing, color, coverage));
}
