//! Process-lifetime cache of entity API factories

use std::collections::BTreeMap;
use std::sync::Arc;

use super::{DbApiFactory, QueryApiFactory};
use crate::core::error::ContextError;
use crate::core::privilege::Privilege;
use crate::entities::{EntityDefinition, EntityMap};
use crate::graphql::SchemaPair;

/// Database and query factories of one entity at one privilege level
#[derive(Debug, Clone)]
pub struct EntityBindings {
    db: Arc<DbApiFactory>,
    query: Arc<QueryApiFactory>,
}

impl EntityBindings {
    fn build(entity: &Arc<EntityDefinition>, schemas: &SchemaPair, privilege: Privilege) -> Self {
        let schema = schemas.for_privilege(privilege);
        Self {
            db: Arc::new(DbApiFactory::new(entity.clone(), schema.clone())),
            query: Arc::new(QueryApiFactory::new(entity.clone(), schema.clone())),
        }
    }

    pub fn db(&self) -> &Arc<DbApiFactory> {
        &self.db
    }

    pub fn query(&self) -> &Arc<QueryApiFactory> {
        &self.query
    }
}

/// Factories for every (entity, privilege) pair
///
/// Built once from the entity map and both schemas, then only read.
/// Contexts bind these factories; they never build their own.
#[derive(Debug)]
pub struct BindingCache {
    levels: BTreeMap<Privilege, BTreeMap<String, EntityBindings>>,
}

impl BindingCache {
    pub fn build(entities: &EntityMap, schemas: &SchemaPair) -> Self {
        let levels = Privilege::ALL
            .into_iter()
            .map(|privilege| {
                let bindings = entities
                    .iter()
                    .map(|(key, entity)| {
                        (key.clone(), EntityBindings::build(entity, schemas, privilege))
                    })
                    .collect();
                (privilege, bindings)
            })
            .collect();

        tracing::info!(entities = entities.len(), "entity binding cache built");
        Self { levels }
    }

    /// Bindings of `key` at `privilege`
    ///
    /// An unknown key is a programming error and fails loudly.
    pub fn get(&self, key: &str, privilege: Privilege) -> Result<&EntityBindings, ContextError> {
        self.levels
            .get(&privilege)
            .and_then(|level| level.get(key))
            .ok_or_else(|| ContextError::UnknownEntity(key.to_string()))
    }

    /// Every entity's bindings at `privilege`, ordered by key
    pub fn entries(&self, privilege: Privilege) -> impl Iterator<Item = (&str, &EntityBindings)> {
        self.levels
            .get(&privilege)
            .into_iter()
            .flat_map(|level| level.iter().map(|(key, bindings)| (key.as_str(), bindings)))
    }

    /// Number of cached (entity, privilege) pairs
    pub fn len(&self) -> usize {
        self.levels.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
