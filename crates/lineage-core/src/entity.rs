use crate::{NodeId, NodeKind};
use serde::{Deserialize, Serialize};

/// A searchable table or column, as returned by entity autocomplete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub id: NodeId,
    pub name: String,
    pub kind: NodeKind,
    #[serde(default)]
    pub schema_name: Option<String>,
    /// Owning table, for columns.
    #[serde(default)]
    pub table_name: Option<String>,
    #[serde(default)]
    pub data_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Entity {
    pub fn new(id: impl Into<NodeId>, name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            schema_name: None,
            table_name: None,
            data_type: None,
            description: None,
        }
    }

    /// Label shown in the search box once the entity is chosen.
    pub fn label(&self) -> String {
        match (&self.table_name, &self.data_type) {
            (Some(table), Some(data_type)) => format!("{table}.{} ({data_type})", self.name),
            (Some(table), None) => format!("{table}.{}", self.name),
            (None, _) => match &self.schema_name {
                Some(schema) => format!("{} ({schema})", self.name),
                None => self.name.clone(),
            },
        }
    }
}

/// The entity a view is centred on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedEntity {
    pub id: NodeId,
    pub label: String,
}

impl From<&Entity> for SelectedEntity {
    fn from(entity: &Entity) -> Self {
        Self {
            id: entity.id.clone(),
            label: entity.label(),
        }
    }
}
