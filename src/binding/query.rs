//! Query API: entity operations with a caller-chosen selection

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

/// Selection used when the caller has no preference
pub const DEFAULT_SELECTION: &str = "id";

/// Pre-built query API of one entity for one schema
pub struct QueryApiFactory {
    binding: OperationBinding,
}

impl QueryApiFactory {
    pub fn new(entity: Arc<EntityDefinition>, schema: Arc<Schema>) -> Self {
        Self {
            binding: OperationBinding::new(entity, schema),
        }
    }

    pub fn entity(&self) -> &Arc<EntityDefinition> {
        &self.binding.entity
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.binding.schema
    }

    pub fn template(&self, op: Operation) -> &super::OperationTemplate {
        self.binding.templates.get(op)
    }

    /// Bind to a context; no work happens until an operation is invoked
    pub fn bind(self: &Arc<Self>, context: ContextRef) -> QueryApi {
        QueryApi {
            factory: Arc::clone(self),
            context,
        }
    }
}

impl fmt::Debug for QueryApiFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryApiFactory")
            .field("entity", &self.binding.entity.key)
            .finish_non_exhaustive()
    }
}

/// Query API of one entity bound to one context
///
/// Every operation takes the GraphQL selection set body to return, for
/// example `"id title author { name }"`. List and count results are
/// `None` when the schema resolved them to `null`.
pub struct QueryApi {
    factory: Arc<QueryApiFactory>,
    context: ContextRef,
}

impl QueryApi {
    pub fn factory(&self) -> &Arc<QueryApiFactory> {
        &self.factory
    }

    /// The context this API is bound to
    pub fn context(&self) -> Result<Context, ContextError> {
        self.context.upgrade()
    }

    pub async fn find_one(
        &self,
        filter: Value,
        selection: &str,
    ) -> Result<Option<Value>, ContextError> {
        let item = self
            .run(Operation::FindOne, selection, where_variables(filter))
            .await?;
        Ok(into_item(item))
    }

    pub async fn find_many(
        &self,
        args: FindManyArgs,
        selection: &str,
    ) -> Result<Option<Vec<Value>>, ContextError> {
        let items = self
            .run(Operation::FindMany, selection, find_many_variables(&args)?)
            .await?;
        into_items(Operation::FindMany, items)
    }

    pub async fn count(&self, filter: Value) -> Result<Option<u64>, ContextError> {
        let count = self
            .run(Operation::Count, "", where_variables(filter))
            .await?;
        into_count(count)
    }

    pub async fn create_one(
        &self,
        data: Value,
        selection: &str,
    ) -> Result<Option<Value>, ContextError> {
        let item = self
            .run(Operation::CreateOne, selection, data_variables(data))
            .await?;
        Ok(into_item(item))
    }

    pub async fn create_many(
        &self,
        data: Vec<Value>,
        selection: &str,
    ) -> Result<Option<Vec<Option<Value>>>, ContextError> {
        let items = self
            .run(
                Operation::CreateMany,
                selection,
                data_variables(Value::Array(data)),
            )
            .await?;
        into_optional_items(Operation::CreateMany, items)
    }

    pub async fn update_one(
        &self,
        filter: Value,
        data: Value,
        selection: &str,
    ) -> Result<Option<Value>, ContextError> {
        let item = self
            .run(
                Operation::UpdateOne,
                selection,
                update_one_variables(filter, data),
            )
            .await?;
        Ok(into_item(item))
    }

    pub async fn update_many(
        &self,
        updates: Vec<UpdateArgs>,
        selection: &str,
    ) -> Result<Option<Vec<Option<Value>>>, ContextError> {
        let items = self
            .run(
                Operation::UpdateMany,
                selection,
                update_many_variables(&updates)?,
            )
            .await?;
        into_optional_items(Operation::UpdateMany, items)
    }

    pub async fn delete_one(
        &self,
        filter: Value,
        selection: &str,
    ) -> Result<Option<Value>, ContextError> {
        let item = self
            .run(Operation::DeleteOne, selection, where_variables(filter))
            .await?;
        Ok(into_item(item))
    }

    pub async fn delete_many(
        &self,
        filters: Vec<Value>,
        selection: &str,
    ) -> Result<Option<Vec<Option<Value>>>, ContextError> {
        let items = self
            .run(
                Operation::DeleteMany,
                selection,
                where_variables(Value::Array(filters)),
            )
            .await?;
        into_optional_items(Operation::DeleteMany, items)
    }

    async fn run(
        &self,
        op: Operation,
        selection: &str,
        variables: Value,
    ) -> Result<Value, ContextError> {
        let document = self.factory.binding.templates.get(op).render(selection);
        self.factory
            .binding
            .execute(&self.context, op, document, variables)
            .await
    }
}

impl fmt::Debug for QueryApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryApi")
            .field("entity", &self.factory.binding.entity.key)
            .finish_non_exhaustive()
    }
}
