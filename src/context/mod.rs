//! Request-scoped contexts
//!
//! A [`ContextFactory`] is created once per process from the global setup:
//! configuration, entity definitions, the two compiled schemas and the
//! storage client. It builds the [`BindingCache`] and hands out cheap
//! [`Context`] values.
//!
//! A context exposes, for every entity, a database API and a query API,
//! plus a GraphQL facade, all bound to the schema of its privilege level.
//! Contexts are immutable; `sudo`, `with_session` and `with_request`
//! derive new ones.
//!
//! # Self-reference
//!
//! Entity operations and the facade execute GraphQL with the owning
//! context as request data, and resolvers may reach back into that
//! context's `db` / `query` maps. Each context is therefore allocated with
//! [`Arc::new_cyclic`]: the facade and every bound API receive a weak
//! reference to the record before it exists, and the record is complete,
//! maps included, the moment it is published. Nothing is filled in later.
//!
//! # Example
//!
//! ```rust,ignore
//! let factory = ContextFactory::new(ContextSetup {
//!     config,
//!     entities,
//!     schemas: SchemaPair::new(schema, sudo_schema),
//!     storage_client: Arc::new(pool),
//! })?;
//!
//! let context = factory.root().with_request(transport).await?;
//! let posts = context.query("Post")?.find_many(FindManyArgs::new().take(10), "id title").await?;
//! let everything = context.sudo().db("Post")?.count(json!({})).await?;
//! ```

mod compat;

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Weak};
use uuid::Uuid;

use crate::assets::{FilesContext, ImagesContext};
use crate::binding::{BindingCache, DbApi, QueryApi};
use crate::config::ContextConfig;
use crate::core::error::ContextError;
use crate::core::privilege::Privilege;
use crate::core::session::{self, Session, SessionStrategy};
use crate::core::transport::Transport;
use crate::entities::EntityMap;
use crate::graphql::{GraphQLApi, SchemaPair};

/// Opaque storage/ORM client handle, passed through untouched
pub type StorageClient = Arc<dyn Any + Send + Sync>;

/// Everything a factory is built from
pub struct ContextSetup {
    pub config: ContextConfig,
    pub entities: EntityMap,
    pub schemas: SchemaPair,
    pub storage_client: StorageClient,
}

/// Unstable context surface, present only when enabled in configuration
#[derive(Debug, Clone)]
pub struct Experimental {
    /// The entity definitions the factory was built from
    pub initialised_lists: Arc<EntityMap>,
}

/// Process-lifetime state shared by every context of a factory
struct FactoryState {
    config: ContextConfig,
    entities: Arc<EntityMap>,
    schemas: SchemaPair,
    bindings: BindingCache,
    storage_client: StorageClient,
    images: Arc<ImagesContext>,
    files: Arc<FilesContext>,
    experimental: Option<Experimental>,
}

/// Creates root contexts over pre-built entity bindings
#[derive(Clone)]
pub struct ContextFactory {
    state: Arc<FactoryState>,
}

impl ContextFactory {
    /// Build the binding cache and asset sub-contexts
    pub fn new(setup: ContextSetup) -> Result<Self, ContextError> {
        let ContextSetup {
            config,
            entities,
            schemas,
            storage_client,
        } = setup;

        if let Some((key, entity)) = entities.iter().find(|(key, entity)| **key != entity.key) {
            return Err(ContextError::InvalidSetup(format!(
                "entity registered as `{key}` is defined as `{}`",
                entity.key
            )));
        }

        let entities = Arc::new(entities);
        let bindings = BindingCache::build(&entities, &schemas);
        let images = Arc::new(ImagesContext::from_settings(&config.settings));
        let files = Arc::new(FilesContext::from_settings(&config.settings));
        let experimental = config
            .settings
            .experimental
            .context_initialised_lists
            .then(|| Experimental {
                initialised_lists: entities.clone(),
            });

        tracing::info!(
            entities = entities.len(),
            session_strategy = config.session.is_some(),
            experimental = experimental.is_some(),
            "context factory initialised"
        );

        Ok(Self {
            state: Arc::new(FactoryState {
                config,
                entities,
                schemas,
                bindings,
                storage_client,
                images,
                files,
                experimental,
            }),
        })
    }

    /// Fresh context: no session, normal privilege, no transport
    pub fn root(&self) -> Context {
        construct(&self.state, None, Privilege::Normal, None)
    }

    pub fn binding_cache(&self) -> &BindingCache {
        &self.state.bindings
    }

    pub fn entities(&self) -> &EntityMap {
        &self.state.entities
    }

    pub fn schemas(&self) -> &SchemaPair {
        &self.state.schemas
    }
}

impl fmt::Debug for ContextFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextFactory")
            .field("entities", &self.state.entities.keys().collect::<Vec<_>>())
            .field("config", &self.state.config)
            .finish_non_exhaustive()
    }
}

/// Build a factory from `setup` and return its root context
pub fn create_context(setup: ContextSetup) -> Result<Context, ContextError> {
    Ok(ContextFactory::new(setup)?.root())
}

/// Build one context
///
/// The single constructor behind the root and every derivation; the three
/// axes a context varies on are its explicit parameters.
fn construct(
    state: &Arc<FactoryState>,
    session: Option<Session>,
    privilege: Privilege,
    transport: Option<Transport>,
) -> Context {
    let session = session::normalize(session);
    let schema = state.schemas.for_privilege(privilege).clone();

    let inner = Arc::new_cyclic(|this: &Weak<ContextInner>| {
        let this = ContextRef(this.clone());

        let mut db = BTreeMap::new();
        let mut query = BTreeMap::new();
        for (key, bindings) in state.bindings.entries(privilege) {
            db.insert(key.to_string(), bindings.db().bind(this.clone()));
            query.insert(key.to_string(), bindings.query().bind(this.clone()));
        }

        ContextInner {
            id: Uuid::new_v4(),
            state: state.clone(),
            privilege,
            session,
            transport,
            graphql: GraphQLApi::new(schema, this),
            db,
            query,
        }
    });

    tracing::debug!(
        context_id = %inner.id,
        privilege = %inner.privilege,
        session = inner.session.is_some(),
        transport = inner.transport.is_some(),
        "context constructed"
    );

    Context { inner }
}

struct ContextInner {
    id: Uuid,
    state: Arc<FactoryState>,
    privilege: Privilege,
    session: Option<Session>,
    transport: Option<Transport>,
    graphql: GraphQLApi,
    db: BTreeMap<String, DbApi>,
    query: BTreeMap<String, QueryApi>,
}

/// Weak reference from bound APIs back to their context
#[derive(Clone)]
pub struct ContextRef(Weak<ContextInner>);

impl ContextRef {
    /// The referenced context, if it is still alive
    pub fn upgrade(&self) -> Result<Context, ContextError> {
        self.0
            .upgrade()
            .map(|inner| Context { inner })
            .ok_or(ContextError::ContextReleased)
    }
}

impl fmt::Debug for ContextRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ContextRef")
            .field(&self.0.upgrade().map(|inner| inner.id))
            .finish()
    }
}

/// Request-scoped API surface
///
/// Cloning shares the same context. Entity APIs borrowed from a context
/// are bound to that exact instance.
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

impl Context {
    /// Identifier used in log fields
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn privilege(&self) -> Privilege {
        self.inner.privilege
    }

    pub fn is_sudo(&self) -> bool {
        self.inner.privilege.is_elevated()
    }

    pub fn session(&self) -> Option<&Session> {
        self.inner.session.as_ref()
    }

    pub fn has_session(&self) -> bool {
        self.inner.session.is_some()
    }

    pub fn transport(&self) -> Option<&Transport> {
        self.inner.transport.as_ref()
    }

    /// Database API of `key`
    pub fn db(&self, key: &str) -> Result<&DbApi, ContextError> {
        self.inner
            .db
            .get(key)
            .ok_or_else(|| ContextError::UnknownEntity(key.to_string()))
    }

    /// Query API of `key`
    pub fn query(&self, key: &str) -> Result<&QueryApi, ContextError> {
        self.inner
            .query
            .get(key)
            .ok_or_else(|| ContextError::UnknownEntity(key.to_string()))
    }

    /// Keys of every bound entity
    pub fn entity_keys(&self) -> impl Iterator<Item = &str> {
        self.inner.db.keys().map(String::as_str)
    }

    pub fn graphql(&self) -> &GraphQLApi {
        &self.inner.graphql
    }

    pub fn storage_client(&self) -> &StorageClient {
        &self.inner.state.storage_client
    }

    /// The storage client as its concrete type
    pub fn storage<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.inner.state.storage_client.clone().downcast::<T>().ok()
    }

    pub fn images(&self) -> &Arc<ImagesContext> {
        &self.inner.state.images
    }

    pub fn files(&self) -> &Arc<FilesContext> {
        &self.inner.state.files
    }

    pub fn session_strategy(&self) -> Option<&Arc<dyn SessionStrategy>> {
        self.inner.state.config.session.as_ref()
    }

    pub fn experimental(&self) -> Option<&Experimental> {
        self.inner.state.experimental.as_ref()
    }

    /// Names of the fields this context carries
    ///
    /// `session` and `experimental` are listed only when present.
    pub fn keys(&self) -> Vec<&'static str> {
        let mut keys = vec![
            "db",
            "query",
            "graphql",
            "storage_client",
            "sudo",
            "exit_sudo",
            "transport",
            "session_strategy",
        ];
        if self.inner.session.is_some() {
            keys.push("session");
        }
        keys.extend(["with_request", "with_session", "images", "files", "gql_names"]);
        if self.inner.state.experimental.is_some() {
            keys.push("experimental");
        }
        keys
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.keys().contains(&key)
    }

    /// Same context with elevated privilege
    pub fn sudo(&self) -> Context {
        self.derive(
            self.inner.session.clone(),
            Privilege::Elevated,
            self.inner.transport.clone(),
        )
    }

    /// Same privilege and transport with `session` (or none)
    pub fn with_session(&self, session: Option<Session>) -> Context {
        self.derive(session, self.inner.privilege, self.inner.transport.clone())
    }

    /// Rebind to another transport and resolve its session
    ///
    /// The session strategy runs on a provisional context that carries the
    /// new transport and the current session. Its answer becomes the
    /// session of the returned context; with no strategy configured the
    /// result has no session. Strategy failures are returned unchanged.
    pub async fn with_request(&self, transport: Transport) -> Result<Context, ContextError> {
        let provisional = self.derive(
            self.inner.session.clone(),
            self.inner.privilege,
            Some(transport),
        );

        let session = match self.session_strategy() {
            Some(strategy) => strategy
                .get(&provisional)
                .await
                .map_err(ContextError::SessionResolution)?,
            None => None,
        };

        Ok(provisional.with_session(session))
    }

    /// Whether both handles point at the same context
    pub fn ptr_eq(&self, other: &Context) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn derive(
        &self,
        session: Option<Session>,
        privilege: Privilege,
        transport: Option<Transport>,
    ) -> Context {
        let derived = construct(&self.inner.state, session, privilege, transport);
        tracing::debug!(
            parent = %self.inner.id,
            context_id = %derived.inner.id,
            "context derived"
        );
        derived
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Context");
        s.field("id", &self.inner.id)
            .field("privilege", &self.inner.privilege);
        if let Some(session) = &self.inner.session {
            s.field("session", session);
        }
        s.field("transport", &self.inner.transport)
            .field("entities", &self.inner.db.keys().collect::<Vec<_>>());
        if let Some(experimental) = &self.inner.state.experimental {
            s.field("experimental", &experimental.initialised_lists.len());
        }
        s.finish_non_exhaustive()
    }
}
