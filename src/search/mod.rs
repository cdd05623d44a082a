//! Programme metadata search over the channel catalogue.

pub mod query;
pub mod task;

use thiserror::Error;

pub use query::{Comparison, Field, Query};
pub use task::{
    Catalog, Channel, Programme, SearchCompleted, SearchManager, SearchRequest,
    SEARCH_STATUS_ABORTED, SEARCH_STATUS_COMPLETED,
};

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("invalid query: {0}")]
    InvalidQuery(#[from] serde_json::Error),

    #[error("{field:?} needs an integer value, got {value:?}")]
    NotANumber { field: Field, value: String },

    #[error("and/or needs at least one operand")]
    EmptyOperands,

    #[error("search {0} is already running")]
    AlreadyRunning(i32),

    #[error("failed to spawn search worker: {0}")]
    Spawn(std::io::Error),
}
