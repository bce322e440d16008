//! Entity API binding
//!
//! For every entity and privilege level the [`BindingCache`] holds a
//! [`DbApiFactory`] and a [`QueryApiFactory`]. Factories close over the
//! entity definition, one compiled schema and the rendered operation
//! documents; they are built once. Binding a factory to a context is a
//! pair of pointer copies, which keeps context construction cheap.

pub mod cache;
pub mod db;
pub mod documents;
pub mod query;

pub use cache::{BindingCache, EntityBindings};
pub use db::{DbApi, DbApiFactory};
pub use documents::{Operation, OperationTemplate, OperationTemplates};
pub use query::{DEFAULT_SELECTION, QueryApi, QueryApiFactory};

use async_graphql::dynamic::Schema;
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::Arc;

use crate::context::ContextRef;
use crate::core::error::ContextError;
use crate::entities::EntityDefinition;
use crate::graphql;

/// Arguments of `find_many`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FindManyArgs {
    #[serde(rename = "where", skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub order_by: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub take: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<Value>,
}

impl FindManyArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Value) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn order_by(mut self, order: Value) -> Self {
        self.order_by.push(order);
        self
    }

    pub fn take(mut self, take: i64) -> Self {
        self.take = Some(take);
        self
    }

    pub fn skip(mut self, skip: i64) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn cursor(mut self, cursor: Value) -> Self {
        self.cursor = Some(cursor);
        self
    }
}

/// One entry of `update_many`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateArgs {
    #[serde(rename = "where")]
    pub filter: Value,
    pub data: Value,
}

impl UpdateArgs {
    pub fn new(filter: Value, data: Value) -> Self {
        Self { filter, data }
    }
}

/// State shared by both factories of one (entity, schema) pair
struct OperationBinding {
    entity: Arc<EntityDefinition>,
    schema: Arc<Schema>,
    templates: OperationTemplates,
}

impl OperationBinding {
    fn new(entity: Arc<EntityDefinition>, schema: Arc<Schema>) -> Self {
        let templates = OperationTemplates::new(entity.names());
        Self {
            entity,
            schema,
            templates,
        }
    }

    /// Execute `document` for `op` and return the aliased result field
    async fn execute(
        &self,
        context: &ContextRef,
        op: Operation,
        document: String,
        variables: Value,
    ) -> Result<Value, ContextError> {
        if !op.is_enabled(&self.entity.graphql.enabled) {
            return Err(ContextError::OperationDisabled {
                entity: self.entity.key.clone(),
                operation: op.name(),
            });
        }

        let context = context.upgrade()?;
        tracing::trace!(
            entity = %self.entity.key,
            operation = %op,
            context_id = %context.id(),
            "running entity operation"
        );

        let result = graphql::execute(&self.schema, context, document, Some(variables)).await?;
        let mut data = result.into_data()?;
        let field = op.result_field();
        data.get_mut(field)
            .map(Value::take)
            .ok_or(ContextError::UnexpectedResponse { field })
    }
}

fn where_variables(filter: Value) -> Value {
    json!({ "where": filter })
}

fn data_variables(data: Value) -> Value {
    json!({ "data": data })
}

fn find_many_variables(args: &FindManyArgs) -> Result<Value, ContextError> {
    Ok(serde_json::to_value(args)?)
}

fn update_one_variables(filter: Value, data: Value) -> Value {
    json!({ "where": filter, "data": data })
}

fn update_many_variables(updates: &[UpdateArgs]) -> Result<Value, ContextError> {
    Ok(json!({ "data": serde_json::to_value(updates)? }))
}

fn into_item(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        item => Some(item),
    }
}

/// List result of `op`; a `null` list stays distinguishable from `[]`
fn into_items(op: Operation, value: Value) -> Result<Option<Vec<Value>>, ContextError> {
    match value {
        Value::Null => Ok(None),
        Value::Array(items) => Ok(Some(items)),
        _ => Err(ContextError::UnexpectedResponse {
            field: op.result_field(),
        }),
    }
}

fn into_optional_items(
    op: Operation,
    value: Value,
) -> Result<Option<Vec<Option<Value>>>, ContextError> {
    let items = into_items(op, value)?;
    Ok(items.map(|items| items.into_iter().map(into_item).collect()))
}

fn into_count(value: Value) -> Result<Option<u64>, ContextError> {
    match value {
        Value::Null => Ok(None),
        value => value.as_u64().map(Some).ok_or(ContextError::UnexpectedResponse {
            field: Operation::Count.result_field(),
        }),
    }
}
