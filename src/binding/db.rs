//! Database API: entity operations returning every selected field

use async_graphql::dynamic::Schema;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use super::{
    FindManyArgs, Operation, OperationBinding, UpdateArgs, data_variables, find_many_variables,
    into_count, into_item, into_items, into_optional_items, update_many_variables,
    update_one_variables, where_variables,
};
use crate::context::{Context, ContextRef};
use crate::core::error::ContextError;
use crate::entities::EntityDefinition;

/// Pre-built database API of one entity for one schema
///
/// Documents are rendered with the entity's full db selection when the
/// factory is built.
pub struct DbApiFactory {
    binding: OperationBinding,
    documents: Vec<String>,
}

impl DbApiFactory {
    pub fn new(entity: Arc<EntityDefinition>, schema: Arc<Schema>) -> Self {
        let binding = OperationBinding::new(entity, schema);
        let documents = binding.templates.render_all(&binding.entity.db_selection());
        Self { binding, documents }
    }

    pub fn entity(&self) -> &Arc<EntityDefinition> {
        &self.binding.entity
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.binding.schema
    }

    /// Rendered document of `op`
    pub fn document(&self, op: Operation) -> &str {
        &self.documents[op as usize]
    }

    /// Bind to a context; no work happens until an operation is invoked
    pub fn bind(self: &Arc<Self>, context: ContextRef) -> DbApi {
        DbApi {
            factory: Arc::clone(self),
            context,
        }
    }
}

impl fmt::Debug for DbApiFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbApiFactory")
            .field("entity", &self.binding.entity.key)
            .finish_non_exhaustive()
    }
}

/// Database API of one entity bound to one context
pub struct DbApi {
    factory: Arc<DbApiFactory>,
    context: ContextRef,
}

impl DbApi {
    pub fn factory(&self) -> &Arc<DbApiFactory> {
        &self.factory
    }

    /// The context this API is bound to
    pub fn context(&self) -> Result<Context, ContextError> {
        self.context.upgrade()
    }

    pub async fn find_one(&self, filter: Value) -> Result<Option<Value>, ContextError> {
        let item = self.run(Operation::FindOne, where_variables(filter)).await?;
        Ok(into_item(item))
    }

    /// `None` when the schema resolved the list to `null`
    pub async fn find_many(
        &self,
        args: FindManyArgs,
    ) -> Result<Option<Vec<Value>>, ContextError> {
        let items = self
            .run(Operation::FindMany, find_many_variables(&args)?)
            .await?;
        into_items(Operation::FindMany, items)
    }

    pub async fn count(&self, filter: Value) -> Result<Option<u64>, ContextError> {
        let count = self.run(Operation::Count, where_variables(filter)).await?;
        into_count(count)
    }

    pub async fn create_one(&self, data: Value) -> Result<Option<Value>, ContextError> {
        let item = self.run(Operation::CreateOne, data_variables(data)).await?;
        Ok(into_item(item))
    }

    pub async fn create_many(
        &self,
        data: Vec<Value>,
    ) -> Result<Option<Vec<Option<Value>>>, ContextError> {
        let items = self
            .run(Operation::CreateMany, data_variables(Value::Array(data)))
            .await?;
        into_optional_items(Operation::CreateMany, items)
    }

    pub async fn update_one(
        &self,
        filter: Value,
        data: Value,
    ) -> Result<Option<Value>, ContextError> {
        let item = self
            .run(Operation::UpdateOne, update_one_variables(filter, data))
            .await?;
        Ok(into_item(item))
    }

    pub async fn update_many(
        &self,
        updates: Vec<UpdateArgs>,
    ) -> Result<Option<Vec<Option<Value>>>, ContextError> {
        let items = self
            .run(Operation::UpdateMany, update_many_variables(&updates)?)
            .await?;
        into_optional_items(Operation::UpdateMany, items)
    }

    pub async fn delete_one(&self, filter: Value) -> Result<Option<Value>, ContextError> {
        let item = self.run(Operation::DeleteOne, where_variables(filter)).await?;
        Ok(into_item(item))
    }

    pub async fn delete_many(
        &self,
        filters: Vec<Value>,
    ) -> Result<Option<Vec<Option<Value>>>, ContextError> {
        let items = self
            .run(Operation::DeleteMany, where_variables(Value::Array(filters)))
            .await?;
        into_optional_items(Operation::DeleteMany, items)
    }

    async fn run(&self, op: Operation, variables: Value) -> Result<Value, ContextError> {
        let document = self.factory.document(op).to_string();
        self.factory
            .binding
            .execute(&self.context, op, document, variables)
            .await
    }
}

impl fmt::Debug for DbApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbApi")
            .field("entity", &self.factory.binding.entity.key)
            .finish_non_exhaustive()
    }
}
