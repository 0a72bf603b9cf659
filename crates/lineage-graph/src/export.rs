use crate::interaction::{EdgeVisual, HighlightState, NodeVisual};
use crate::layout::{RenderEdge, RenderModel, RenderNode};
use crate::style::{self, Color, EdgeStyle, NodeColors};
use crate::{Rect, raster, svg};
use lineage_core::NodeKind;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Png,
    Jpg,
    Svg,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 3] = [ExportFormat::Png, ExportFormat::Jpg, ExportFormat::Svg];

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Jpg => "jpg",
            ExportFormat::Svg => "svg",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Png => "image/png",
            ExportFormat::Jpg => "image/jpeg",
            ExportFormat::Svg => "image/svg+xml",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(ExportFormat::Png),
            "jpg" | "jpeg" => Ok(ExportFormat::Jpg),
            "svg" => Ok(ExportFormat::Svg),
            other => Err(ExportError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Raster and font settings for export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    /// Pixels per graph unit for PNG and JPG.
    pub scale: f32,
    /// JPEG quality, 1..=100.
    pub jpeg_quality: u8,
    /// Margin around the drawing, in output pixels.
    pub padding: f32,
    /// TTF/OTF used for raster labels. Falls back to `LINEAGE_FONT_PATH`.
    pub font_path: Option<PathBuf>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            scale: 2.0,
            jpeg_quality: 95,
            padding: 40.0,
            font_path: None,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExportError {
    #[error("there is no graph to export")]
    NothingToExport,
    #[error("failed to encode image: {0}")]
    Encode(String),
    #[error("unsupported export format: {0}")]
    UnsupportedFormat(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportedImage {
    pub format: ExportFormat,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
    pub suggested_file_name: String,
}

impl ExportedImage {
    /// Writes the image into `dir` under its suggested name.
    pub fn save_to(&self, dir: &Path) -> std::io::Result<PathBuf> {
        let path = dir.join(&self.suggested_file_name);
        std::fs::write(&path, &self.bytes)?;
        Ok(path)
    }
}

/// `lineage-graph-<unix millis>.<ext>`
pub fn suggested_file_name(format: ExportFormat) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    format!("lineage-graph-{}.{}", millis, format.extension())
}

/// Serializes the visible part of `model` with the current highlight applied.
pub fn export_image(
    model: &RenderModel,
    highlight: &HighlightState,
    hidden: &HashSet<NodeKind>,
    format: ExportFormat,
    options: &ExportOptions,
) -> Result<ExportedImage, ExportError> {
    let scene = Scene::build(model, highlight, hidden).ok_or(ExportError::NothingToExport)?;

    let bytes = match format {
        ExportFormat::Svg => svg::render(&scene).into_bytes(),
        ExportFormat::Png => raster::encode_png(&raster::render(&scene, options))?,
        ExportFormat::Jpg => {
            raster::encode_jpeg(&raster::render(&scene, options), options.jpeg_quality)?
        }
    };

    tracing::debug!(
        "Exported {} nodes and {} edges as {} ({} bytes)",
        scene.nodes.len(),
        scene.edges.len(),
        format,
        bytes.len()
    );

    Ok(ExportedImage {
        format,
        mime_type: format.mime_type(),
        bytes,
        suggested_file_name: suggested_file_name(format),
    })
}

/// A visible node with its resolved paint.
pub(crate) struct PaintedNode<'a> {
    pub node: &'a RenderNode,
    pub colors: NodeColors,
    pub border: Color,
    pub border_width: f32,
    pub opacity: f32,
}

pub(crate) struct PaintedEdge<'a> {
    pub edge: &'a RenderEdge,
    pub style: EdgeStyle,
    pub opacity: f32,
}

/// Everything an encoder draws, already culled and styled.
pub(crate) struct Scene<'a> {
    pub bounds: Rect,
    pub nodes: Vec<PaintedNode<'a>>,
    pub edges: Vec<PaintedEdge<'a>>,
}

impl<'a> Scene<'a> {
    pub(crate) fn build(
        model: &'a RenderModel,
        highlight: &HighlightState,
        hidden: &'a HashSet<NodeKind>,
    ) -> Option<Self> {
        if model.is_empty() {
            return None;
        }
        let bounds = model.visible_bounds(hidden)?;

        let nodes = model
            .visible_nodes(hidden)
            .map(|node| {
                let colors = style::node_colors(node.kind(), node.node.is_focal);
                let visual = highlight.visual(&node.node.id);
                let (border, border_width) = match visual {
                    NodeVisual::Selected => {
                        (style::COLOR_SELECTED_BORDER, style::SELECTED_BORDER_WIDTH)
                    }
                    NodeVisual::Highlighted
                        if highlight.active_node() == Some(&node.node.id) =>
                    {
                        (style::COLOR_HIGHLIGHT_BORDER, style::BORDER_WIDTH)
                    }
                    _ => (colors.border, style::BORDER_WIDTH),
                };
                let opacity = match visual {
                    NodeVisual::Dimmed => style::DIMMED_OPACITY,
                    _ => 1.0,
                };
                PaintedNode {
                    node,
                    colors,
                    border,
                    border_width,
                    opacity,
                }
            })
            .collect();

        let edges = model
            .visible_edges(hidden)
            .map(|edge| {
                let opacity = match highlight.edge_visual(&edge.key) {
                    EdgeVisual::Dimmed => style::DIMMED_OPACITY,
                    _ => 1.0,
                };
                PaintedEdge {
                    edge,
                    style: style::edge_style(edge.edge.kind),
                    opacity,
                }
            })
            .collect();

        Some(Self {
            bounds,
            nodes,
            edges,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::LayeredLayouter;
    use lineage_core::{Edge, Graph, Node, NodeId};

    fn sample() -> (Graph, RenderModel) {
        let nodes = vec![
            Node::new("1", "orders", NodeKind::Table),
            Node::new("2", "orders_daily", NodeKind::Table),
            Node::new("3", "orders.amount", NodeKind::Column),
        ];
        let edges = vec![Edge::new("1", "2", "aggregate"), Edge::new("1", "3", "contains")];
        let graph = Graph::new(nodes, edges).unwrap();
        let model = LayeredLayouter::default().layout(&graph);
        (graph, model)
    }

    #[test]
    fn test_empty_model_is_nothing_to_export() {
        for format in ExportFormat::ALL {
            let err = export_image(
                &RenderModel::empty(),
                &HighlightState::new(),
                &HashSet::new(),
                format,
                &ExportOptions::default(),
            )
            .unwrap_err();
            assert_eq!(err, ExportError::NothingToExport);
        }
    }

    #[test]
    fn test_all_kinds_hidden_is_nothing_to_export() {
        let (_, model) = sample();
        let hidden = HashSet::from(NodeKind::ALL);
        let err = export_image(
            &model,
            &HighlightState::new(),
            &hidden,
            ExportFormat::Svg,
            &ExportOptions::default(),
        )
        .unwrap_err();
        assert_eq!(err, ExportError::NothingToExport);
    }

    #[test]
    fn test_png_export_has_signature_and_name() {
        let (_, model) = sample();
        let image = export_image(
            &model,
            &HighlightState::new(),
            &HashSet::new(),
            ExportFormat::Png,
            &ExportOptions::default(),
        )
        .unwrap();

        assert_eq!(&image.bytes[..8], b"\x89PNG\r\n\x1a\n");
        assert_eq!(image.mime_type, "image/png");
        assert!(image.suggested_file_name.starts_with("lineage-graph-"));
        assert!(image.suggested_file_name.ends_with(".png"));
    }

    #[test]
    fn test_jpg_export_has_jpeg_markers() {
        let (_, model) = sample();
        let image = export_image(
            &model,
            &HighlightState::new(),
            &HashSet::new(),
            ExportFormat::Jpg,
            &ExportOptions {
                scale: 1.0,
                ..ExportOptions::default()
            },
        )
        .unwrap();

        assert_eq!(&image.bytes[..2], &[0xFF, 0xD8]);
        assert!(image.suggested_file_name.ends_with(".jpg"));
    }

    #[test]
    fn test_dimmed_elements_carry_reduced_opacity() {
        let (graph, model) = sample();
        let mut highlight = HighlightState::new();
        highlight.hover(&graph, &NodeId::from("2"));
        let hidden = HashSet::new();

        let scene = Scene::build(&model, &highlight, &hidden).unwrap();
        let column = scene
            .nodes
            .iter()
            .find(|n| n.node.node.id.as_str() == "3")
            .unwrap();
        let hovered = scene
            .nodes
            .iter()
            .find(|n| n.node.node.id.as_str() == "2")
            .unwrap();
        assert_eq!(column.opacity, style::DIMMED_OPACITY);
        assert_eq!(hovered.opacity, 1.0);
        assert_eq!(hovered.border, style::COLOR_HIGHLIGHT_BORDER);
    }

    #[test]
    fn test_hidden_kind_is_culled_with_its_edges() {
        let (_, model) = sample();
        let hidden = HashSet::from([NodeKind::Column]);
        let scene = Scene::build(&model, &HighlightState::new(), &hidden).unwrap();
        assert_eq!(scene.nodes.len(), 2);
        assert_eq!(scene.edges.len(), 1);
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("JPEG".parse::<ExportFormat>().unwrap(), ExportFormat::Jpg);
        assert!("gif".parse::<ExportFormat>().is_err());
    }
}
