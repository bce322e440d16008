//! # This-Context
//!
//! Request-scoped API contexts for a content backend served over GraphQL.
//!
//! ## Features
//!
//! - **Pre-built Bindings**: database and query APIs are built once per entity and privilege level
//! - **Cheap Contexts**: a request context only binds cached factories to itself
//! - **Privilege Levels**: `sudo()` switches to a schema that bypasses access control
//! - **Session Resolution**: pluggable strategy run when a context is bound to a request
//! - **GraphQL Facade**: `raw` / `run` execution with the context as request data
//! - **Configuration-Based**: asset storages and experimental flags loaded from YAML
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use this_context::prelude::*;
//!
//! let factory = ContextFactory::new(ContextSetup {
//!     config: ContextConfig::from_yaml_file("config/context.yaml")?
//!         .with_session_strategy(Arc::new(CookieSession::default())),
//!     entities: entity_map([
//!         EntityDefinition::new("Post").with_fields(["id", "title", "published"]),
//!         EntityDefinition::new("Category").with_operations(OperationFlags::read_only()),
//!     ]),
//!     schemas: SchemaPair::new(schema, sudo_schema),
//!     storage_client: Arc::new(pool),
//! })?;
//!
//! // Per request
//! let context = factory.root().with_request(Transport::new(parts)).await?;
//! let posts = context
//!     .query("Post")?
//!     .find_many(FindManyArgs::new().take(10), "id title")
//!     .await?;
//!
//! // Background work bypassing access control
//! let total = factory.root().sudo().db("Post")?.count(json!({})).await?;
//! ```

pub mod assets;
pub mod binding;
pub mod config;
pub mod context;
pub mod core;
pub mod entities;
pub mod graphql;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core ===
    pub use crate::core::{
        error::{ContextError, GraphQLExecutionError},
        privilege::Privilege,
        session::{Session, SessionStrategy},
        transport::{ResponseHeaders, Transport},
    };

    // === Context ===
    pub use crate::context::{
        Context, ContextFactory, ContextSetup, Experimental, StorageClient, create_context,
    };

    // === Bindings ===
    pub use crate::binding::{
        BindingCache, DEFAULT_SELECTION, DbApi, FindManyArgs, Operation, QueryApi, UpdateArgs,
    };

    // === GraphQL ===
    pub use crate::graphql::{ExecutionResult, GraphQLApi, GraphQLQuery, SchemaPair};

    // === Entities ===
    pub use crate::entities::{
        EntityDefinition, EntityMap, GraphQLNames, OperationFlags, entity_map,
    };

    // === Config & Assets ===
    pub use crate::assets::{AssetType, FilesContext, ImagesContext, StorageConfig};
    pub use crate::config::{ContextConfig, ContextSettings, ExperimentalConfig};

    // === External dependencies ===
    pub use anyhow::Result;
    pub use async_trait::async_trait;
    pub use serde::{Deserialize, Serialize};
    pub use serde_json::{Value, json};
    pub use std::sync::Arc;
}
