use lineage_core::{Entity, NodeId, NodeKind};
use serde::{Deserialize, Serialize};

/// An id as the backend sends it: usually an integer, occasionally a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawId {
    Int(i64),
    Text(String),
}

impl From<&RawId> for NodeId {
    fn from(value: &RawId) -> Self {
        match value {
            RawId::Int(id) => NodeId::from(*id),
            RawId::Text(id) => NodeId::new(id.trim()),
        }
    }
}

impl From<RawId> for NodeId {
    fn from(value: RawId) -> Self {
        NodeId::from(&value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawNode {
    pub id: RawId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default, rename = "type")]
    pub node_type: Option<String>,
    #[serde(default)]
    pub schema_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub sample_value: Option<String>,
    #[serde(default)]
    pub data_source: Option<String>,
    #[serde(default)]
    pub data_source_type: Option<String>,
}

impl RawNode {
    pub fn new(id: RawId, name: &str, node_type: &str) -> Self {
        Self {
            id,
            name: Some(name.to_string()),
            label: None,
            node_type: Some(node_type.to_string()),
            schema_name: None,
            description: None,
            sample_value: None,
            data_source: None,
            data_source_type: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEdge {
    #[serde(default)]
    pub id: Option<RawId>,
    pub source: RawId,
    pub target: RawId,
    #[serde(default, rename = "type")]
    pub edge_type: Option<String>,
    #[serde(default)]
    pub relation_type: Option<String>,
}

impl RawEdge {
    pub fn new(source: RawId, target: RawId, relation_type: Option<&str>) -> Self {
        Self {
            id: None,
            source,
            target,
            edge_type: None,
            relation_type: relation_type.map(str::to_string),
        }
    }
}

/// Graph payload of `GET /lineages/graph/{kind}/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackendGraphPayload {
    #[serde(default)]
    pub nodes: Vec<RawNode>,
    #[serde(default)]
    pub edges: Vec<RawEdge>,
}

/// The graph endpoint answers either with the payload itself or wrapped in
/// `{ "data": ... }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum GraphEnvelope {
    Wrapped { data: BackendGraphPayload },
    Bare(BackendGraphPayload),
}

impl GraphEnvelope {
    pub fn into_payload(self) -> BackendGraphPayload {
        match self {
            GraphEnvelope::Wrapped { data } => data,
            GraphEnvelope::Bare(payload) => payload,
        }
    }
}

/// List endpoints answer with a raw array, `{ "data": [...] }` or
/// `{ "items": [...] }` depending on the route.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum EntityList<T> {
    Raw(Vec<T>),
    Data { data: Vec<T> },
    Items { items: Vec<T> },
}

impl<T> EntityList<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            EntityList::Raw(items) => items,
            EntityList::Data { data } => data,
            EntityList::Items { items } => items,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSummaryDto {
    pub id: RawId,
    pub name: String,
    #[serde(default)]
    pub schema_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl From<TableSummaryDto> for Entity {
    fn from(dto: TableSummaryDto) -> Self {
        let mut entity = Entity::new(dto.id, dto.name, NodeKind::Table);
        entity.schema_name = dto.schema_name;
        entity.description = dto.description;
        entity
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRefDto {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSummaryDto {
    pub id: RawId,
    pub name: String,
    #[serde(default)]
    pub data_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub table_name: Option<String>,
    #[serde(default)]
    pub table: Option<TableRefDto>,
}

impl From<ColumnSummaryDto> for Entity {
    fn from(dto: ColumnSummaryDto) -> Self {
        let mut entity = Entity::new(dto.id, dto.name, NodeKind::Column);
        entity.table_name = dto.table_name.or(dto.table.map(|t| t.name));
        entity.data_type = dto.data_type;
        entity.description = dto.description;
        entity
    }
}
