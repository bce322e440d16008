//! Entity definitions consumed by the binding cache
//!
//! An [`EntityDefinition`] is what the schema compiler knows about one
//! modeled content type. The context core only needs its key, its GraphQL
//! names, the fields the database API selects, and which operations are
//! exposed.

pub mod names;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

pub use names::{GraphQLNames, pluralize};

/// Every entity definition known to a factory, keyed by entity key
pub type EntityMap = BTreeMap<String, Arc<EntityDefinition>>;

/// Which operation groups are exposed for an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationFlags {
    pub query: bool,
    pub create: bool,
    pub update: bool,
    pub delete: bool,
}

impl Default for OperationFlags {
    fn default() -> Self {
        Self {
            query: true,
            create: true,
            update: true,
            delete: true,
        }
    }
}

impl OperationFlags {
    /// Only reads are exposed
    pub fn read_only() -> Self {
        Self {
            query: true,
            create: false,
            update: false,
            delete: false,
        }
    }
}

/// GraphQL metadata of an entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityGraphQL {
    pub names: GraphQLNames,
    #[serde(default)]
    pub enabled: OperationFlags,
}

/// Definition of one entity (a "list" in content-modelling terms)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDefinition {
    /// Entity key, also the GraphQL output type name (e.g. "Post")
    pub key: String,

    pub graphql: EntityGraphQL,

    /// Output fields selected by the database API
    pub fields: Vec<String>,
}

impl EntityDefinition {
    /// Definition with a derived plural, all operations enabled and `id`
    /// as the only selected field
    ///
    /// The plural comes from [`pluralize`], which knows no irregular nouns:
    /// `Person` becomes `Persons`. Use [`with_plural`](Self::with_plural)
    /// for those.
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        let plural = pluralize(&key);
        Self {
            graphql: EntityGraphQL {
                names: GraphQLNames::new(&key, &plural),
                enabled: OperationFlags::default(),
            },
            fields: vec!["id".to_string()],
            key,
        }
    }

    /// Override the plural used for list names
    pub fn with_plural(mut self, plural: &str) -> Self {
        self.graphql.names = GraphQLNames::new(&self.key, plural);
        self
    }

    /// Set the fields selected by the database API
    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_operations(mut self, enabled: OperationFlags) -> Self {
        self.graphql.enabled = enabled;
        self
    }

    pub fn names(&self) -> &GraphQLNames {
        &self.graphql.names
    }

    /// Selection set body used by the database API
    pub fn db_selection(&self) -> String {
        self.fields.join(" ")
    }
}

/// Collect definitions into an [`EntityMap`]
pub fn entity_map<I>(definitions: I) -> EntityMap
where
    I: IntoIterator<Item = EntityDefinition>,
{
    definitions
        .into_iter()
        .map(|def| (def.key.clone(), Arc::new(def)))
        .collect()
}
