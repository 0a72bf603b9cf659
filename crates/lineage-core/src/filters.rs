use crate::{ModelError, NodeKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Granularity of a lineage view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewLevel {
    Table,
    Column,
}

impl ViewLevel {
    pub const ALL: [ViewLevel; 2] = [ViewLevel::Table, ViewLevel::Column];

    /// Kind of entity a view of this level is centred on.
    pub fn entity_kind(&self) -> NodeKind {
        match self {
            ViewLevel::Table => NodeKind::Table,
            ViewLevel::Column => NodeKind::Column,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ViewLevel::Table => "table",
            ViewLevel::Column => "column",
        }
    }
}

impl fmt::Display for ViewLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ViewLevel {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "table" => Ok(ViewLevel::Table),
            "column" | "field" => Ok(ViewLevel::Column),
            other => Err(ModelError::InvalidLevel(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Upstream,
    Downstream,
    #[default]
    Both,
}

impl Direction {
    pub fn as_query(&self) -> &'static str {
        match self {
            Direction::Upstream => "upstream",
            Direction::Downstream => "downstream",
            Direction::Both => "both",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_query())
    }
}

impl FromStr for Direction {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" | "upstream" => Ok(Direction::Upstream),
            "down" | "downstream" => Ok(Direction::Downstream),
            "both" => Ok(Direction::Both),
            other => Err(ModelError::InvalidDirection(other.to_string())),
        }
    }
}

/// Traversal controls sent with every graph request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphFilters {
    pub depth: u8,
    pub direction: Direction,
    pub include_upstream_dependencies: bool,
    pub include_container_nodes: bool,
}

impl GraphFilters {
    pub const MIN_DEPTH: u8 = 1;
    pub const MAX_DEPTH: u8 = 5;

    pub fn clamp_depth(depth: u8) -> u8 {
        depth.clamp(Self::MIN_DEPTH, Self::MAX_DEPTH)
    }

    /// Applies the set fields of `patch`. Returns whether anything changed.
    pub fn apply(&mut self, patch: &FilterPatch) -> bool {
        let before = *self;
        if let Some(depth) = patch.depth {
            self.depth = Self::clamp_depth(depth);
        }
        if let Some(direction) = patch.direction {
            self.direction = direction;
        }
        if let Some(include) = patch.include_upstream_dependencies {
            self.include_upstream_dependencies = include;
        }
        if let Some(include) = patch.include_container_nodes {
            self.include_container_nodes = include;
        }
        before != *self
    }
}

impl Default for GraphFilters {
    fn default() -> Self {
        Self {
            depth: 2,
            direction: Direction::Both,
            include_upstream_dependencies: false,
            include_container_nodes: true,
        }
    }
}

/// Partial update of [`GraphFilters`]; `None` fields are left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FilterPatch {
    pub depth: Option<u8>,
    pub direction: Option<Direction>,
    pub include_upstream_dependencies: Option<bool>,
    pub include_container_nodes: Option<bool>,
}

impl FilterPatch {
    pub fn depth(depth: u8) -> Self {
        Self {
            depth: Some(depth),
            ..Self::default()
        }
    }

    pub fn direction(direction: Direction) -> Self {
        Self {
            direction: Some(direction),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
