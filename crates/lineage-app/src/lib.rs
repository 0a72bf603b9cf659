//! Stateful side of the lineage explorer: per-level view state, the async
//! query controller and the facade a host embeds.

pub mod controller;
pub mod explorer;
pub mod settings;
pub mod store;

pub use controller::{ControllerError, QueryController};
pub use explorer::LineageExplorer;
pub use settings::{ApiSettings, ExplorerSettings, NotificationSettings, SearchSettings};
pub use store::{ViewState, ViewStateStore};
