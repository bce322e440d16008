//! Typed error handling for request contexts
//!
//! Every failure surfaced by a [`Context`](crate::context::Context), its
//! bound entity APIs or its GraphQL facade is a [`ContextError`]. Callers
//! can match on the variant instead of inspecting messages.
//!
//! # Example
//!
//! ```rust,ignore
//! match context.query("Post")?.find_one(json!({ "id": id }), "id title").await {
//!     Ok(post) => println!("{post:?}"),
//!     Err(ContextError::GraphQL(err)) => eprintln!("rejected: {}", err.error().message),
//!     Err(e) => return Err(e),
//! }
//! ```

use async_graphql::ServerError;
use thiserror::Error;

use crate::assets::AssetType;

/// The main error type for context operations
#[derive(Debug, Error)]
pub enum ContextError {
    /// An entity key with no binding was requested through `db` or `query`
    #[error("unknown entity `{0}`")]
    UnknownEntity(String),

    /// The operation is turned off in the entity's GraphQL configuration
    #[error("`{operation}` is disabled for entity `{entity}`")]
    OperationDisabled {
        entity: String,
        operation: &'static str,
    },

    /// Execution reported at least one GraphQL error
    #[error(transparent)]
    GraphQL(#[from] GraphQLExecutionError),

    /// The session strategy failed while resolving a session
    #[error(transparent)]
    SessionResolution(anyhow::Error),

    /// No storage of the requested asset type is configured under this name
    #[error("unknown {asset_type} storage `{storage}`")]
    UnknownStorage {
        asset_type: AssetType,
        storage: String,
    },

    /// A bound API was used after its owning context was dropped
    #[error("context was released before the operation ran")]
    ContextReleased,

    /// The expected top-level result field is missing or has the wrong shape
    #[error("unexpected response shape for `{field}`")]
    UnexpectedResponse { field: &'static str },

    /// GraphQL variables were not a JSON object
    #[error("graphql variables must be a JSON object, got {found}")]
    InvalidVariables { found: &'static str },

    /// The entity map or schemas handed to the factory are inconsistent
    #[error("invalid context setup: {0}")]
    InvalidSetup(String),

    /// Converting execution data to JSON failed
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failure raised by `run` when execution reports errors
///
/// Carries the first error of the result's error list; the remaining
/// errors are only counted.
#[derive(Debug, Clone, Error)]
#[error("{}", .error.message)]
pub struct GraphQLExecutionError {
    error: ServerError,
    additional_errors: usize,
}

impl GraphQLExecutionError {
    /// Build from the error list of an execution result
    ///
    /// Returns `None` when the list is empty.
    pub fn from_errors(errors: Vec<ServerError>) -> Option<Self> {
        let additional_errors = errors.len().saturating_sub(1);
        errors.into_iter().next().map(|error| Self {
            error,
            additional_errors,
        })
    }

    /// The first reported error
    pub fn error(&self) -> &ServerError {
        &self.error
    }

    /// Number of errors reported after the first one
    pub fn additional_errors(&self) -> usize {
        self.additional_errors
    }

    pub fn into_error(self) -> ServerError {
        self.error
    }
}
