use crate::document::Policies;
use ahash::AHashMap;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The provider → toolkit → {triggers, actions} registry supplied by the catalog service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub providers: IndexMap<String, Provider>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Provider {
    #[serde(default)]
    pub toolkits: IndexMap<String, Toolkit>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Toolkit {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default)]
    pub triggers: Vec<CatalogEntry>,
    #[serde(default)]
    pub actions: Vec<CatalogEntry>,
}

/// A trigger or action definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(rename = "paramSpec", alias = "param_spec", default)]
    pub param_spec: IndexMap<String, ParamSpec>,
    #[serde(default)]
    pub policy: Policies,
    #[serde(default)]
    pub supported_delivery: Vec<String>,
}

impl CatalogEntry {
    /// The slug when present, otherwise the id.
    pub fn display_slug(&self) -> &str {
        if self.slug.is_empty() { &self.id } else { &self.slug }
    }

    pub fn supports_delivery(&self, delivery: &str) -> bool {
        self.supported_delivery.iter().any(|d| d == delivery)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
    #[default]
    #[serde(other)]
    Any,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    #[serde(rename = "type", default)]
    pub param_type: ParamType,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A resolved catalog entry together with where it was found.
#[derive(Debug, Clone)]
pub struct CatalogHit {
    pub provider: String,
    pub toolkit_slug: String,
    pub toolkit_icon: Option<String>,
    pub entry: CatalogEntry,
}

/// `(toolkit_slug, id-or-slug) → entry` lookup tables, built once per context.
///
/// When several entries answer to the same reference, the first in document
/// order wins, exactly as a front-to-back scan of the catalog would.
#[derive(Debug, Clone, Default)]
pub struct CatalogIndex {
    hits: Vec<CatalogHit>,
    triggers: AHashMap<String, AHashMap<String, usize>>,
    actions: AHashMap<String, AHashMap<String, usize>>,
}

impl CatalogIndex {
    pub fn build(catalog: &Catalog) -> Self {
        let mut index = Self::default();
        for (provider, definition) in &catalog.providers {
            for (toolkit_slug, toolkit) in &definition.toolkits {
                for entry in &toolkit.triggers {
                    let slot = index.push_hit(provider, toolkit_slug, toolkit, entry);
                    Self::insert_refs(&mut index.triggers, toolkit_slug, entry, slot);
                }
                for entry in &toolkit.actions {
                    let slot = index.push_hit(provider, toolkit_slug, toolkit, entry);
                    Self::insert_refs(&mut index.actions, toolkit_slug, entry, slot);
                }
            }
        }
        tracing::debug!(
            entries = index.hits.len(),
            toolkits = index.triggers.len().max(index.actions.len()),
            "catalog index built"
        );
        index
    }

    pub fn trigger(&self, toolkit_slug: &str, reference: &str) -> Option<&CatalogHit> {
        Self::lookup(&self.triggers, toolkit_slug, reference).map(|slot| &self.hits[slot])
    }

    pub fn action(&self, toolkit_slug: &str, reference: &str) -> Option<&CatalogHit> {
        Self::lookup(&self.actions, toolkit_slug, reference).map(|slot| &self.hits[slot])
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    fn push_hit(
        &mut self,
        provider: &str,
        toolkit_slug: &str,
        toolkit: &Toolkit,
        entry: &CatalogEntry,
    ) -> usize {
        self.hits.push(CatalogHit {
            provider: provider.to_string(),
            toolkit_slug: toolkit_slug.to_string(),
            toolkit_icon: toolkit.icon.clone(),
            entry: entry.clone(),
        });
        self.hits.len() - 1
    }

    fn insert_refs(
        table: &mut AHashMap<String, AHashMap<String, usize>>,
        toolkit_slug: &str,
        entry: &CatalogEntry,
        slot: usize,
    ) {
        let refs = table.entry(toolkit_slug.to_string()).or_default();
        for reference in [&entry.id, &entry.slug] {
            if !reference.is_empty() {
                refs.entry(reference.clone()).or_insert(slot);
            }
        }
    }

    fn lookup(
        table: &AHashMap<String, AHashMap<String, usize>>,
        toolkit_slug: &str,
        reference: &str,
    ) -> Option<usize> {
        table.get(toolkit_slug)?.get(reference).copied()
    }
}
