//! Deprecated context surface kept for existing callers

use super::Context;
use crate::core::error::ContextError;
use crate::core::privilege::Privilege;
use crate::entities::GraphQLNames;

impl Context {
    /// Same context with normal privilege
    #[deprecated(note = "derive from a context that was never elevated instead")]
    pub fn exit_sudo(&self) -> Context {
        self.derive(
            self.inner.session.clone(),
            Privilege::Normal,
            self.inner.transport.clone(),
        )
    }

    /// GraphQL type and field names of entity `key`
    #[deprecated(note = "read the names from the entity definition")]
    pub fn gql_names(&self, key: &str) -> Result<&GraphQLNames, ContextError> {
        self.inner
            .state
            .entities
            .get(key)
            .map(|entity| entity.names())
            .ok_or_else(|| ContextError::UnknownEntity(key.to_string()))
    }
}
