use crate::dto::{BackendGraphPayload, ColumnSummaryDto, EntityList, GraphEnvelope, TableSummaryDto};
use crate::errors::ApiError;
use async_trait::async_trait;
use lineage_core::{Direction, Entity, GraphFilters, NodeId, NodeKind};
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Query parameters of a lineage graph request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphQuery {
    pub depth: u8,
    pub direction: Direction,
    pub include_upstream_dependencies: bool,
    pub include_container_nodes: bool,
}

impl From<&GraphFilters> for GraphQuery {
    fn from(filters: &GraphFilters) -> Self {
        Self {
            depth: GraphFilters::clamp_depth(filters.depth),
            direction: filters.direction,
            include_upstream_dependencies: filters.include_upstream_dependencies,
            include_container_nodes: filters.include_container_nodes,
        }
    }
}

impl GraphQuery {
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("depth", self.depth.to_string()),
            ("direction", self.direction.as_query().to_string()),
            (
                "include_upstream_dependencies",
                self.include_upstream_dependencies.to_string(),
            ),
            (
                "include_container_nodes",
                self.include_container_nodes.to_string(),
            ),
        ]
    }
}

/// Source of lineage graphs and entity search results.
#[async_trait]
pub trait LineageApi: Send + Sync {
    async fn fetch_lineage_graph(
        &self,
        kind: NodeKind,
        entity_id: &NodeId,
        query: &GraphQuery,
    ) -> Result<BackendGraphPayload, ApiError>;

    async fn search_entities(
        &self,
        kind: NodeKind,
        partial_name: &str,
    ) -> Result<Vec<Entity>, ApiError>;
}

/// `LineageApi` over the catalog's REST backend.
pub struct HttpLineageApi {
    http: Client,
    base_url: String,
    search_limit: usize,
}

impl HttpLineageApi {
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        search_limit: usize,
    ) -> Result<Self, ApiError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://"))
            || Url::parse(&base_url).is_err()
        {
            return Err(ApiError::InvalidUrl(base_url));
        }
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Http(e.to_string()))?;
        Ok(Self {
            http,
            base_url,
            search_limit,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Graph endpoint for one entity. The id is percent-encoded as a single
    /// path segment.
    pub fn graph_url(&self, kind: NodeKind, entity_id: &NodeId) -> Result<Url, ApiError> {
        self.endpoint(&["lineages", "graph", kind.label(), entity_id.as_str()])
    }

    pub fn search_url(&self, kind: NodeKind) -> Result<Url, ApiError> {
        self.endpoint(&[match kind {
            NodeKind::Table => "tables",
            NodeKind::Column => "columns",
        }])
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let invalid = || ApiError::InvalidUrl(self.base_url.clone());
        let mut url = Url::parse(&self.base_url).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        tracing::debug!("GET {} {:?}", url, query);

        let response = self
            .http
            .get(url)
            .query(query)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::status(
                status.as_u16(),
                body.chars().take(200).collect::<String>(),
            ));
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl LineageApi for HttpLineageApi {
    async fn fetch_lineage_graph(
        &self,
        kind: NodeKind,
        entity_id: &NodeId,
        query: &GraphQuery,
    ) -> Result<BackendGraphPayload, ApiError> {
        let envelope: GraphEnvelope = self
            .get(self.graph_url(kind, entity_id)?, &query.to_query_pairs())
            .await?;
        Ok(envelope.into_payload())
    }

    async fn search_entities(
        &self,
        kind: NodeKind,
        partial_name: &str,
    ) -> Result<Vec<Entity>, ApiError> {
        let query = [
            ("keyword", partial_name.to_string()),
            ("limit", self.search_limit.to_string()),
        ];
        let url = self.search_url(kind)?;
        let entities = match kind {
            NodeKind::Table => self
                .get::<EntityList<TableSummaryDto>>(url, &query)
                .await?
                .into_vec()
                .into_iter()
                .map(Entity::from)
                .collect(),
            NodeKind::Column => self
                .get::<EntityList<ColumnSummaryDto>>(url, &query)
                .await?
                .into_vec()
                .into_iter()
                .map(Entity::from)
                .collect(),
        };
        Ok(entities)
    }
}
