mod client;
mod dto;
mod errors;

pub use client::{GraphQuery, HttpLineageApi, LineageApi};
pub use dto::{
    BackendGraphPayload, ColumnSummaryDto, EntityList, GraphEnvelope, RawEdge, RawId, RawNode,
    TableRefDto, TableSummaryDto,
};
pub use errors::ApiError;
