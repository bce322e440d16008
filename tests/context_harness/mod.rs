//! Shared test harness for context integration tests
//!
//! Provides a `MemoryStore` used as the opaque storage client, a dynamic
//! schema builder over a `Post` entity and a read-only `Category` entity,
//! and session strategies.
//!
//! The normal schema enforces a small access-control rule set:
//! - unpublished posts are invisible to reads
//! - mutations require a session
//!
//! The elevated schema is the same schema without those rules.
//!
//! # Usage
//!
//! From any integration test file in `tests/`:
//! ```rust,ignore
//! mod context_harness;
//! use context_harness::*;
//! ```

#![allow(dead_code)]

use async_graphql::Value as GqlValue;
use async_graphql::dynamic::{
    Field, FieldFuture, InputObject, InputValue, Object, ResolverContext, Schema, TypeRef,
};
use serde_json::{Value, json};
use std::cmp::Ordering;
use std::sync::{Arc, Mutex, Once};
use uuid::Uuid;

use this_context::prelude::*;

// ---------------------------------------------------------------------------
// Tracing
// ---------------------------------------------------------------------------

static TRACING: Once = Once::new();

/// Install a `tracing` subscriber driven by `RUST_LOG`
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

// ---------------------------------------------------------------------------
// MemoryStore: the storage client
// ---------------------------------------------------------------------------

/// In-memory post table
#[derive(Debug, Default)]
pub struct MemoryStore {
    posts: Mutex<Vec<Value>>,
}

impl MemoryStore {
    pub fn with_posts(posts: impl IntoIterator<Item = Value>) -> Self {
        Self {
            posts: Mutex::new(posts.into_iter().collect()),
        }
    }

    pub fn len(&self) -> usize {
        self.posts.lock().unwrap().len()
    }

    pub fn get(&self, id: &str) -> Option<Value> {
        self.posts
            .lock()
            .unwrap()
            .iter()
            .find(|post| post["id"] == id)
            .cloned()
    }

    fn find(&self, filter: &Value, visible_only: bool) -> Option<Value> {
        self.posts
            .lock()
            .unwrap()
            .iter()
            .find(|post| matches(post, filter) && (!visible_only || is_visible(post)))
            .cloned()
    }

    fn list(&self, filter: &Value, visible_only: bool) -> Vec<Value> {
        self.posts
            .lock()
            .unwrap()
            .iter()
            .filter(|post| matches(post, filter) && (!visible_only || is_visible(post)))
            .cloned()
            .collect()
    }

    fn create(&self, data: Value) -> Value {
        let mut posts = self.posts.lock().unwrap();
        let mut post = json!({
            "id": format!("p{}", posts.len() + 1),
            "published": false,
            "authorId": null,
        });
        merge(&mut post, data);
        posts.push(post.clone());
        post
    }

    fn update(&self, filter: &Value, data: Value) -> Option<Value> {
        let mut posts = self.posts.lock().unwrap();
        let post = posts.iter_mut().find(|post| matches(post, filter))?;
        merge(post, data);
        Some(post.clone())
    }

    fn delete(&self, filter: &Value) -> Option<Value> {
        let mut posts = self.posts.lock().unwrap();
        let index = posts.iter().position(|post| matches(post, filter))?;
        Some(posts.remove(index))
    }
}

/// Posts used by most tests: two published, one draft
pub fn sample_store() -> MemoryStore {
    MemoryStore::with_posts([
        json!({ "id": "p1", "title": "Hello", "published": true, "authorId": "ada" }),
        json!({ "id": "p2", "title": "Draft", "published": false, "authorId": "ada" }),
        json!({ "id": "p3", "title": "Again", "published": true, "authorId": "grace" }),
    ])
}

fn matches(post: &Value, filter: &Value) -> bool {
    match filter.as_object() {
        Some(filter) => filter
            .iter()
            .filter(|(_, expected)| !expected.is_null())
            .all(|(key, expected)| &post[key] == expected),
        None => true,
    }
}

fn is_visible(post: &Value) -> bool {
    post["published"] == true
}

fn merge(post: &mut Value, data: Value) {
    if let (Some(post), Value::Object(data)) = (post.as_object_mut(), data) {
        for (key, value) in data {
            if !value.is_null() {
                post.insert(key, value);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// The `Post` entity as the factory sees it
pub fn post_entity() -> EntityDefinition {
    EntityDefinition::new("Post").with_fields(["id", "title", "published"])
}

/// A read-only entity without any storage behind it
pub fn category_entity() -> EntityDefinition {
    EntityDefinition::new("Category").with_operations(OperationFlags::read_only())
}

pub fn entities() -> EntityMap {
    entity_map([post_entity(), category_entity()])
}

/// Normal and elevated schemas
pub fn schemas() -> SchemaPair {
    SchemaPair::new(build_schema(true), build_schema(false))
}

/// Build the test schema, with or without access control
pub fn build_schema(access_control: bool) -> Schema {
    let post = Object::new("Post")
        .field(post_field("id", TypeRef::named_nn(TypeRef::ID)))
        .field(post_field("title", TypeRef::named_nn(TypeRef::STRING)))
        .field(post_field("published", TypeRef::named_nn(TypeRef::BOOLEAN)))
        .field(post_field("authorId", TypeRef::named(TypeRef::STRING)));

    let category = Object::new("Category").field(Field::new(
        "id",
        TypeRef::named_nn(TypeRef::ID),
        |_| FieldFuture::new(async { Ok(None::<GqlValue>) }),
    ));

    let where_unique = InputObject::new("PostWhereUniqueInput")
        .field(InputValue::new("id", TypeRef::named(TypeRef::ID)));
    let where_input = InputObject::new("PostWhereInput")
        .field(InputValue::new("published", TypeRef::named(TypeRef::BOOLEAN)))
        .field(InputValue::new("authorId", TypeRef::named(TypeRef::STRING)));
    let order_by = InputObject::new("PostOrderByInput")
        .field(InputValue::new("title", TypeRef::named(TypeRef::STRING)));
    let create_input = InputObject::new("PostCreateInput")
        .field(InputValue::new("id", TypeRef::named(TypeRef::ID)))
        .field(InputValue::new("title", TypeRef::named_nn(TypeRef::STRING)))
        .field(InputValue::new("published", TypeRef::named(TypeRef::BOOLEAN)))
        .field(InputValue::new("authorId", TypeRef::named(TypeRef::STRING)));
    let update_input = InputObject::new("PostUpdateInput")
        .field(InputValue::new("title", TypeRef::named(TypeRef::STRING)))
        .field(InputValue::new("published", TypeRef::named(TypeRef::BOOLEAN)));
    let update_args = InputObject::new("PostUpdateArgs")
        .field(InputValue::new("where", TypeRef::named_nn("PostWhereUniqueInput")))
        .field(InputValue::new("data", TypeRef::named_nn("PostUpdateInput")));

    let query = Object::new("Query")
        .field(
            Field::new("post", TypeRef::named("Post"), move |ctx| {
                FieldFuture::new(async move {
                    let store = store(&ctx)?;
                    let filter = arg(&ctx, "where")?;
                    let visible_only = access_control && !is_sudo(&ctx)?;
                    to_gql(store.find(&filter, visible_only))
                })
            })
            .argument(InputValue::new("where", TypeRef::named_nn("PostWhereUniqueInput"))),
        )
        .field(
            Field::new("posts", TypeRef::named_nn_list("Post"), move |ctx| {
                FieldFuture::new(async move {
                    let store = store(&ctx)?;
                    let visible_only = access_control && !is_sudo(&ctx)?;
                    let mut posts = store.list(&arg(&ctx, "where")?, visible_only);
                    sort(&mut posts, &arg(&ctx, "orderBy")?);
                    let posts = paginate(
                        posts,
                        &arg(&ctx, "cursor")?,
                        arg(&ctx, "skip")?.as_u64(),
                        arg(&ctx, "take")?.as_u64(),
                    );
                    to_gql_list(posts)
                })
            })
            .argument(InputValue::new("where", TypeRef::named("PostWhereInput")))
            .argument(InputValue::new("orderBy", TypeRef::named_nn_list("PostOrderByInput")))
            .argument(InputValue::new("take", TypeRef::named(TypeRef::INT)))
            .argument(InputValue::new("skip", TypeRef::named(TypeRef::INT)))
            .argument(InputValue::new("cursor", TypeRef::named("PostWhereUniqueInput"))),
        )
        .field(
            Field::new("postsCount", TypeRef::named_nn(TypeRef::INT), move |ctx| {
                FieldFuture::new(async move {
                    let store = store(&ctx)?;
                    let visible_only = access_control && !is_sudo(&ctx)?;
                    let count = store.list(&arg(&ctx, "where")?, visible_only).len();
                    Ok(Some(GqlValue::Number((count as u64).into())))
                })
            })
            .argument(InputValue::new("where", TypeRef::named("PostWhereInput"))),
        )
        .field(
            Field::new("category", TypeRef::named("Category"), |_| {
                FieldFuture::new(async { Ok(None::<GqlValue>) })
            })
            .argument(InputValue::new("where", TypeRef::named_nn("CategoryWhereUniqueInput"))),
        )
        .field(Field::new("viewer", TypeRef::named(TypeRef::STRING), |ctx| {
            FieldFuture::new(async move {
                let context = ctx.data::<Context>()?;
                let name = context
                    .session()
                    .and_then(|session| session["name"].as_str())
                    .map(|name| GqlValue::String(name.to_string()));
                Ok(name)
            })
        }))
        .field(Field::new("privilege", TypeRef::named_nn(TypeRef::STRING), |ctx| {
            FieldFuture::new(async move {
                let context = ctx.data::<Context>()?;
                Ok(Some(GqlValue::String(context.privilege().to_string())))
            })
        }))
        .field(Field::new("boom", TypeRef::named(TypeRef::STRING), |_| {
            FieldFuture::new(async { Err::<Option<GqlValue>, _>("boom exploded".into()) })
        }))
        .field(Field::new("visibleCount", TypeRef::named_nn(TypeRef::INT), |ctx| {
            FieldFuture::new(async move {
                // Re-enter the executing context's query API
                let context = ctx.data::<Context>()?;
                let count = context.query("Post")?.count(json!({})).await?;
                Ok(count.map(|count| GqlValue::Number(count.into())))
            })
        }));

    let mutation = Object::new("Mutation")
        .field(
            Field::new("createPost", TypeRef::named("Post"), move |ctx| {
                FieldFuture::new(async move {
                    authorize(&ctx, access_control)?;
                    to_gql(Some(store(&ctx)?.create(arg(&ctx, "data")?)))
                })
            })
            .argument(InputValue::new("data", TypeRef::named_nn("PostCreateInput"))),
        )
        .field(
            Field::new("createPosts", TypeRef::named_list("Post"), move |ctx| {
                FieldFuture::new(async move {
                    authorize(&ctx, access_control)?;
                    let store = store(&ctx)?;
                    let created = items(arg(&ctx, "data")?)
                        .into_iter()
                        .map(|data| store.create(data))
                        .collect();
                    to_gql_list(created)
                })
            })
            .argument(InputValue::new("data", TypeRef::named_nn_list_nn("PostCreateInput"))),
        )
        .field(
            Field::new("updatePost", TypeRef::named("Post"), move |ctx| {
                FieldFuture::new(async move {
                    authorize(&ctx, access_control)?;
                    let updated = store(&ctx)?.update(&arg(&ctx, "where")?, arg(&ctx, "data")?);
                    to_gql(updated)
                })
            })
            .argument(InputValue::new("where", TypeRef::named_nn("PostWhereUniqueInput")))
            .argument(InputValue::new("data", TypeRef::named_nn("PostUpdateInput"))),
        )
        .field(
            Field::new("updatePosts", TypeRef::named_list("Post"), move |ctx| {
                FieldFuture::new(async move {
                    authorize(&ctx, access_control)?;
                    let store = store(&ctx)?;
                    let updated = items(arg(&ctx, "data")?)
                        .into_iter()
                        .map(|mut entry| store.update(&entry["where"].take(), entry["data"].take()))
                        .map(|post| post.unwrap_or(Value::Null))
                        .collect();
                    to_gql_list(updated)
                })
            })
            .argument(InputValue::new("data", TypeRef::named_nn_list_nn("PostUpdateArgs"))),
        )
        .field(
            Field::new("deletePost", TypeRef::named("Post"), move |ctx| {
                FieldFuture::new(async move {
                    authorize(&ctx, access_control)?;
                    to_gql(store(&ctx)?.delete(&arg(&ctx, "where")?))
                })
            })
            .argument(InputValue::new("where", TypeRef::named_nn("PostWhereUniqueInput"))),
        )
        .field(
            Field::new("deletePosts", TypeRef::named_list("Post"), move |ctx| {
                FieldFuture::new(async move {
                    authorize(&ctx, access_control)?;
                    let store = store(&ctx)?;
                    let deleted = items(arg(&ctx, "where")?)
                        .iter()
                        .map(|filter| store.delete(filter).unwrap_or(Value::Null))
                        .collect();
                    to_gql_list(deleted)
                })
            })
            .argument(InputValue::new("where", TypeRef::named_nn_list_nn("PostWhereUniqueInput"))),
        );

    let category_where = InputObject::new("CategoryWhereUniqueInput")
        .field(InputValue::new("id", TypeRef::named(TypeRef::ID)));

    Schema::build("Query", Some("Mutation"), None)
        .register(post)
        .register(category)
        .register(where_unique)
        .register(where_input)
        .register(order_by)
        .register(create_input)
        .register(update_input)
        .register(update_args)
        .register(category_where)
        .register(query)
        .register(mutation)
        .finish()
        .expect("test schema should build")
}

/// Schema whose nullable `posts` list and `postsCount` always resolve to `null`
pub fn null_results_schema() -> Schema {
    let post = Object::new("Post")
        .field(post_field("id", TypeRef::named_nn(TypeRef::ID)))
        .field(post_field("title", TypeRef::named_nn(TypeRef::STRING)))
        .field(post_field("published", TypeRef::named_nn(TypeRef::BOOLEAN)));

    let where_unique = InputObject::new("PostWhereUniqueInput")
        .field(InputValue::new("id", TypeRef::named(TypeRef::ID)));
    let where_input = InputObject::new("PostWhereInput")
        .field(InputValue::new("published", TypeRef::named(TypeRef::BOOLEAN)));
    let order_by = InputObject::new("PostOrderByInput")
        .field(InputValue::new("title", TypeRef::named(TypeRef::STRING)));

    let query = Object::new("Query")
        .field(
            Field::new("posts", TypeRef::named_list("Post"), |_| {
                FieldFuture::new(async { Ok(None::<GqlValue>) })
            })
            .argument(InputValue::new("where", TypeRef::named("PostWhereInput")))
            .argument(InputValue::new("orderBy", TypeRef::named_nn_list("PostOrderByInput")))
            .argument(InputValue::new("take", TypeRef::named(TypeRef::INT)))
            .argument(InputValue::new("skip", TypeRef::named(TypeRef::INT)))
            .argument(InputValue::new("cursor", TypeRef::named("PostWhereUniqueInput"))),
        )
        .field(
            Field::new("postsCount", TypeRef::named(TypeRef::INT), |_| {
                FieldFuture::new(async { Ok(None::<GqlValue>) })
            })
            .argument(InputValue::new("where", TypeRef::named("PostWhereInput"))),
        );

    Schema::build("Query", None, None)
        .register(post)
        .register(where_unique)
        .register(where_input)
        .register(order_by)
        .register(query)
        .finish()
        .expect("null results schema should build")
}

fn post_field(name: &'static str, ty: TypeRef) -> Field {
    Field::new(name, ty, move |ctx| {
        FieldFuture::new(async move {
            let value = match ctx.parent_value.as_value() {
                Some(GqlValue::Object(fields)) => fields.get(name).cloned(),
                _ => None,
            };
            Ok(value.filter(|value| *value != GqlValue::Null))
        })
    })
}

fn store(ctx: &ResolverContext<'_>) -> async_graphql::Result<Arc<MemoryStore>> {
    let context = ctx.data::<Context>()?;
    Ok(context
        .storage::<MemoryStore>()
        .ok_or("storage client is not a MemoryStore")?)
}

fn is_sudo(ctx: &ResolverContext<'_>) -> async_graphql::Result<bool> {
    Ok(ctx.data::<Context>()?.is_sudo())
}

fn authorize(ctx: &ResolverContext<'_>, access_control: bool) -> async_graphql::Result<()> {
    let context = ctx.data::<Context>()?;
    if access_control && !context.is_sudo() && !context.has_session() {
        return Err("not authenticated".into());
    }
    Ok(())
}

fn arg(ctx: &ResolverContext<'_>, name: &str) -> async_graphql::Result<Value> {
    match ctx.args.get(name) {
        Some(value) => Ok(value.as_value().clone().into_json()?),
        None => Ok(Value::Null),
    }
}

fn items(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        _ => Vec::new(),
    }
}

fn sort(posts: &mut [Value], order_by: &Value) {
    let Some((key, direction)) = order_by
        .as_array()
        .and_then(|order| order.first())
        .and_then(Value::as_object)
        .and_then(|order| order.iter().next())
    else {
        return;
    };
    let descending = direction == "desc";
    posts.sort_by(|a, b| {
        let ordering = a[key]
            .as_str()
            .partial_cmp(&b[key].as_str())
            .unwrap_or(Ordering::Equal);
        if descending { ordering.reverse() } else { ordering }
    });
}

fn paginate(posts: Vec<Value>, cursor: &Value, skip: Option<u64>, take: Option<u64>) -> Vec<Value> {
    let start = match cursor.get("id") {
        Some(id) => posts
            .iter()
            .position(|post| &post["id"] == id)
            .unwrap_or(posts.len()),
        None => 0,
    };
    let skip = skip.unwrap_or(0) as usize;
    let take = take.map(|take| take as usize).unwrap_or(usize::MAX);
    posts.into_iter().skip(start + skip).take(take).collect()
}

fn to_gql(post: Option<Value>) -> async_graphql::Result<Option<GqlValue>> {
    match post {
        Some(post) => Ok(Some(GqlValue::from_json(post)?)),
        None => Ok(None),
    }
}

fn to_gql_list(posts: Vec<Value>) -> async_graphql::Result<Option<GqlValue>> {
    Ok(Some(GqlValue::from_json(Value::Array(posts))?))
}

// ---------------------------------------------------------------------------
// Factories
// ---------------------------------------------------------------------------

/// Factory over `entities()`, `schemas()` and `store` with `config`
pub fn factory_with(config: ContextConfig, store: MemoryStore) -> ContextFactory {
    init_tracing();
    ContextFactory::new(ContextSetup {
        config,
        entities: entities(),
        schemas: schemas(),
        storage_client: Arc::new(store),
    })
    .expect("factory should build")
}

/// Factory over the sample store with default configuration
pub fn factory() -> ContextFactory {
    factory_with(ContextConfig::default(), sample_store())
}

/// Factory over `post_entity()` and `null_results_schema()`, with no storage
pub fn null_results_factory() -> ContextFactory {
    init_tracing();
    ContextFactory::new(ContextSetup {
        config: ContextConfig::default(),
        entities: entity_map([post_entity()]),
        schemas: SchemaPair::new(null_results_schema(), null_results_schema()),
        storage_client: Arc::new(()),
    })
    .expect("factory should build")
}

/// A transport carrying the given request headers
pub fn transport(headers: &[(&str, &str)]) -> Transport {
    let mut builder = axum::http::Request::builder().uri("/api/graphql");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    Transport::from_request(builder.body(()).expect("request should build"))
}

// ---------------------------------------------------------------------------
// Session strategies
// ---------------------------------------------------------------------------

/// What a strategy saw when it was called
#[derive(Debug, Clone)]
pub struct StrategyCall {
    pub context_id: Uuid,
    pub privilege: Privilege,
    pub session: Option<Session>,
    pub transport: Option<Transport>,
}

/// Resolves `{ "name": <x-user header> }`, recording every call
#[derive(Debug, Default)]
pub struct HeaderSession {
    pub calls: Mutex<Vec<StrategyCall>>,
}

impl HeaderSession {
    pub fn calls(&self) -> Vec<StrategyCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SessionStrategy for HeaderSession {
    async fn get(&self, context: &Context) -> Result<Option<Session>> {
        self.calls.lock().unwrap().push(StrategyCall {
            context_id: context.id(),
            privilege: context.privilege(),
            session: context.session().cloned(),
            transport: context.transport().cloned(),
        });

        let name = context
            .transport()
            .and_then(|transport| transport.header("x-user"));
        Ok(name.map(|name| json!({ "name": name })))
    }
}

/// Always fails
#[derive(Debug, Default)]
pub struct ExpiredSession;

#[async_trait]
impl SessionStrategy for ExpiredSession {
    async fn get(&self, _context: &Context) -> Result<Option<Session>> {
        Err(anyhow::anyhow!("session token expired"))
    }
}

/// Resolves the session by querying through the provisional context
#[derive(Debug, Default)]
pub struct QueryingSession;

#[async_trait]
impl SessionStrategy for QueryingSession {
    async fn get(&self, context: &Context) -> Result<Option<Session>> {
        let data = context.graphql().run("{ privilege }", None).await?;
        let published = context.sudo().db("Post")?.count(json!({ "published": true })).await?;
        Ok(Some(json!({
            "name": "service",
            "privilege": data["privilege"],
            "published": published,
        })))
    }
}
