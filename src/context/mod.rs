//! The read-only bundle a template is compiled against.

pub mod catalog;

pub use catalog::{Catalog, CatalogEntry, CatalogHit, CatalogIndex, ParamSpec, ParamType};

use crate::document::Policies;
use crate::error::ContextError;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

/// The user a workflow is compiled for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub provider: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `connection_id → connection`, in the order the connection store listed them.
pub type Connections = IndexMap<String, Connection>;

/// Catalog, user, connections, answers and policy defaults for one compile.
///
/// Built through [`CompileContext::builder`], which indexes the catalog once so
/// every lookup during compilation is a hash probe.
#[derive(Debug, Clone)]
pub struct CompileContext {
    catalog: Catalog,
    index: CatalogIndex,
    pub user: Option<UserInfo>,
    pub connections: Connections,
    pub answers: Map<String, Value>,
    pub defaults: Policies,
}

impl CompileContext {
    pub fn builder(catalog: Catalog) -> ContextBuilder {
        ContextBuilder::new(catalog)
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn index(&self) -> &CatalogIndex {
        &self.index
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user.as_ref().and_then(|u| u.id.as_deref())
    }

    /// Picks the connection for `provider`.
    ///
    /// The hinted connection wins when its provider matches; otherwise the first
    /// connection of that provider is used.
    pub fn resolve_connection(&self, provider: &str, hint: Option<&str>) -> Option<&str> {
        if let Some(hint) = hint {
            if let Some((id, _)) = self
                .connections
                .get_key_value(hint)
                .filter(|(_, c)| c.provider == provider)
            {
                return Some(id.as_str());
            }
        }
        self.connections
            .iter()
            .find(|(_, c)| c.provider == provider)
            .map(|(id, _)| id.as_str())
    }
}

pub struct ContextBuilder {
    catalog: Catalog,
    user: Option<UserInfo>,
    connections: Connections,
    answers: Map<String, Value>,
    defaults: Policies,
}

impl ContextBuilder {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            user: None,
            connections: Connections::new(),
            answers: Map::new(),
            defaults: Policies::default(),
        }
    }

    pub fn user(mut self, user: UserInfo) -> Self {
        self.user = Some(user);
        self
    }

    pub fn connections(mut self, connections: Connections) -> Self {
        self.connections = connections;
        self
    }

    pub fn answers(mut self, answers: Map<String, Value>) -> Self {
        self.answers = answers;
        self
    }

    pub fn defaults(mut self, defaults: Policies) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn build(self) -> CompileContext {
        let index = CatalogIndex::build(&self.catalog);
        CompileContext {
            catalog: self.catalog,
            index,
            user: self.user,
            connections: self.connections,
            answers: self.answers,
            defaults: self.defaults,
        }
    }
}

/// Reads one JSON input file of a host (catalog, user, connections, answers, defaults).
pub fn load_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, ContextError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| ContextError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| ContextError::Json {
        path: path.display().to_string(),
        source,
    })
}
