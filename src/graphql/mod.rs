//! GraphQL execution facade
//!
//! A [`GraphQLApi`] is bound to one compiled schema and one context. It
//! offers two ways to execute an operation:
//!
//! - [`GraphQLApi::raw`] returns the whole [`ExecutionResult`], errors
//!   included, for callers that want to inspect partial data;
//! - [`GraphQLApi::run`] fails with the first reported error and
//!   otherwise returns only the data.
//!
//! Both hand the owning context to the schema as request data, so
//! resolvers can reach it with `ctx.data::<Context>()`.

use async_graphql::dynamic::Schema;
use async_graphql::{Request, Response, ServerError, Variables};
use graphql_parser::query::Document;
use serde::Serialize;
use serde_json::Value;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use crate::context::{Context, ContextRef};
use crate::core::error::{ContextError, GraphQLExecutionError};
use crate::core::privilege::Privilege;

/// The two compiled schemas a factory executes against
#[derive(Clone)]
pub struct SchemaPair {
    normal: Arc<Schema>,
    elevated: Arc<Schema>,
}

impl SchemaPair {
    /// `normal` enforces access control, `elevated` bypasses it
    pub fn new(normal: Schema, elevated: Schema) -> Self {
        Self {
            normal: Arc::new(normal),
            elevated: Arc::new(elevated),
        }
    }

    pub fn for_privilege(&self, privilege: Privilege) -> &Arc<Schema> {
        match privilege {
            Privilege::Normal => &self.normal,
            Privilege::Elevated => &self.elevated,
        }
    }
}

impl fmt::Debug for SchemaPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaPair").finish_non_exhaustive()
    }
}

/// An operation to execute
///
/// Built from source text or from an already parsed document, which is
/// printed back to source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphQLQuery<'a>(Cow<'a, str>);

impl GraphQLQuery<'_> {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_source(self) -> String {
        self.0.into_owned()
    }
}

impl<'a> From<&'a str> for GraphQLQuery<'a> {
    fn from(source: &'a str) -> Self {
        GraphQLQuery(Cow::Borrowed(source))
    }
}

impl From<String> for GraphQLQuery<'_> {
    fn from(source: String) -> Self {
        GraphQLQuery(Cow::Owned(source))
    }
}

impl<'d> From<&Document<'d, String>> for GraphQLQuery<'static> {
    fn from(document: &Document<'d, String>) -> Self {
        GraphQLQuery(Cow::Owned(document.to_string()))
    }
}

/// Result of an execution: data plus every reported error
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    pub data: Value,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ServerError>,
}

impl ExecutionResult {
    fn from_response(response: Response) -> Result<Self, ContextError> {
        Ok(Self {
            data: response.data.into_json()?,
            errors: response.errors,
        })
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// Data when no error was reported, otherwise the first error
    pub fn into_data(self) -> Result<Value, GraphQLExecutionError> {
        match GraphQLExecutionError::from_errors(self.errors) {
            Some(err) => Err(err),
            None => Ok(self.data),
        }
    }
}

/// Execute `source` against `schema` with `context` as request data
///
/// This is the single execution path: the facade and every bound entity
/// operation go through it.
pub(crate) async fn execute(
    schema: &Schema,
    context: Context,
    source: String,
    variables: Option<Value>,
) -> Result<ExecutionResult, ContextError> {
    tracing::trace!(
        context_id = %context.id(),
        privilege = %context.privilege(),
        "executing graphql operation"
    );

    let mut request = Request::new(source).data(context);
    if let Some(variables) = into_variables(variables)? {
        request = request.variables(variables);
    }

    let response = schema.execute(request).await;
    ExecutionResult::from_response(response)
}

/// Variables of a request; `null` means none were given
fn into_variables(variables: Option<Value>) -> Result<Option<Variables>, ContextError> {
    let found = match variables {
        None | Some(Value::Null) => return Ok(None),
        Some(variables @ Value::Object(_)) => return Ok(Some(Variables::from_json(variables))),
        Some(Value::Bool(_)) => "a boolean",
        Some(Value::Number(_)) => "a number",
        Some(Value::String(_)) => "a string",
        Some(Value::Array(_)) => "an array",
    };
    Err(ContextError::InvalidVariables { found })
}

/// `raw` / `run` surface bound to one schema and one context
pub struct GraphQLApi {
    schema: Arc<Schema>,
    context: ContextRef,
}

impl GraphQLApi {
    pub(crate) fn new(schema: Arc<Schema>, context: ContextRef) -> Self {
        Self { schema, context }
    }

    /// The schema this facade executes against
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Execute and return the full result, errors included
    ///
    /// Only infrastructure failures are returned as `Err`; errors reported
    /// by the schema stay in [`ExecutionResult::errors`]. `variables` must
    /// be a JSON object or `null`, anything else is
    /// [`ContextError::InvalidVariables`].
    pub async fn raw<'q>(
        &self,
        query: impl Into<GraphQLQuery<'q>>,
        variables: Option<Value>,
    ) -> Result<ExecutionResult, ContextError> {
        let source = query.into().into_source();
        let context = self.context.upgrade()?;
        execute(&self.schema, context, source, variables).await
    }

    /// Execute and return only the data, failing on the first error
    pub async fn run<'q>(
        &self,
        query: impl Into<GraphQLQuery<'q>>,
        variables: Option<Value>,
    ) -> Result<Value, ContextError> {
        let result = self.raw(query, variables).await?;
        Ok(result.into_data()?)
    }
}

impl fmt::Debug for GraphQLApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphQLApi").finish_non_exhaustive()
    }
}
