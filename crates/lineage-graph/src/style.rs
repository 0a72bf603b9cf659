//! Lineage Graph Style
//!
//! Colors for table and column nodes, lineage and containment edges, and the
//! opacity used for elements outside the current highlight.

use lineage_core::{EdgeKind, NodeKind};

/// RGBA color representation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn to_tuple(&self) -> (u8, u8, u8, u8) {
        (self.r, self.g, self.b, self.a)
    }

    pub fn darken(&self, factor: f32) -> Self {
        Self {
            r: ((self.r as f32) * (1.0 - factor)) as u8,
            g: ((self.g as f32) * (1.0 - factor)) as u8,
            b: ((self.b as f32) * (1.0 - factor)) as u8,
            a: self.a,
        }
    }

    pub fn lighten(&self, factor: f32) -> Self {
        Self {
            r: ((self.r as f32) + (255.0 - self.r as f32) * factor) as u8,
            g: ((self.g as f32) + (255.0 - self.g as f32) * factor) as u8,
            b: ((self.b as f32) + (255.0 - self.b as f32) * factor) as u8,
            a: self.a,
        }
    }

    /// Same color with its alpha multiplied by `opacity`.
    pub fn with_opacity(&self, opacity: f32) -> Self {
        Self {
            a: ((self.a as f32) * opacity.clamp(0.0, 1.0)).round() as u8,
            ..*self
        }
    }

    /// `#rrggbb`, ignoring alpha.
    pub fn to_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeColors {
    pub fill: Color,
    pub border: Color,
    pub text: Color,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeStyle {
    pub color: Color,
    pub width: f32,
    pub dashed: bool,
    pub arrow_head: bool,
}

// ============================================================================
// Color Constants
// ============================================================================

// Tables (blue)
pub const COLOR_TABLE_FILL: Color = Color::rgb(0x3B, 0x82, 0xF6);
pub const COLOR_TABLE_BORDER: Color = Color::rgb(0x1E, 0x40, 0xAF);

// Columns (green)
pub const COLOR_COLUMN_FILL: Color = Color::rgb(0x10, 0xB9, 0x81);
pub const COLOR_COLUMN_BORDER: Color = Color::rgb(0x04, 0x78, 0x57);

// Requested entity (amber)
pub const COLOR_FOCAL_FILL: Color = Color::rgb(0xF5, 0x9E, 0x0B);
pub const COLOR_FOCAL_BORDER: Color = Color::rgb(0xB4, 0x53, 0x09);

pub const COLOR_NODE_TEXT: Color = Color::rgb(255, 255, 255);

// Edges
pub const COLOR_LINEAGE_EDGE: Color = Color::rgb(0x3B, 0x82, 0xF6);
pub const COLOR_CONTAINMENT_EDGE: Color = Color::rgb(0x94, 0xA3, 0xB8);
pub const COLOR_EDGE_LABEL: Color = Color::rgb(0x47, 0x55, 0x69);
pub const COLOR_EDGE_LABEL_BORDER: Color = Color::rgb(0xCB, 0xD5, 0xE1);

// Interaction
pub const COLOR_HIGHLIGHT_BORDER: Color = Color::rgb(0xF5, 0x9E, 0x0B);
pub const COLOR_SELECTED_BORDER: Color = Color::rgb(0x1E, 0x40, 0xAF);

pub const COLOR_BACKGROUND: Color = Color::rgb(255, 255, 255);

/// Opacity of nodes and edges outside the hovered neighbourhood.
pub const DIMMED_OPACITY: f32 = 0.3;

pub const BORDER_WIDTH: f32 = 3.0;
pub const SELECTED_BORDER_WIDTH: f32 = 5.0;
pub const NODE_FONT_SIZE: f32 = 14.0;
pub const EDGE_FONT_SIZE: f32 = 12.0;

pub fn node_colors(kind: NodeKind, is_focal: bool) -> NodeColors {
    if is_focal {
        return NodeColors {
            fill: COLOR_FOCAL_FILL,
            border: COLOR_FOCAL_BORDER,
            text: COLOR_NODE_TEXT,
        };
    }
    match kind {
        NodeKind::Table => NodeColors {
            fill: COLOR_TABLE_FILL,
            border: COLOR_TABLE_BORDER,
            text: COLOR_NODE_TEXT,
        },
        NodeKind::Column => NodeColors {
            fill: COLOR_COLUMN_FILL,
            border: COLOR_COLUMN_BORDER,
            text: COLOR_NODE_TEXT,
        },
    }
}

pub fn edge_style(kind: EdgeKind) -> EdgeStyle {
    match kind {
        EdgeKind::Lineage => EdgeStyle {
            color: COLOR_LINEAGE_EDGE,
            width: 3.0,
            dashed: false,
            arrow_head: true,
        },
        EdgeKind::Containment => EdgeStyle {
            color: COLOR_CONTAINMENT_EDGE,
            width: 2.0,
            dashed: true,
            arrow_head: false,
        },
    }
}
