//! The entity catalog: the directory's channel list.
//!
//! The catalog is hand-curated (names, URLs, tags); the engine only writes
//! back the latest observed count and icon so the directory page can render
//! cards without touching the history snapshot. The stable entity id is the
//! channel id embedded in the URL path.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ingest::Observation;
use crate::store::write_json_atomic;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse catalog {path}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub entities: Vec<Entity>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscribers: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl Entity {
    /// The stable entity id parsed from this entry's URL, if any.
    #[must_use]
    pub fn entity_id(&self) -> Option<String> {
        parse_entity_id(&self.url)
    }
}

impl Catalog {
    /// Read the catalog at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] if the file cannot be read or parsed. A
    /// missing catalog is an error here — callers that can run without one
    /// degrade explicitly.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let raw = fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| CatalogError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Persist the catalog at `path` with the deterministic artifact writer.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or file I/O fails.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        write_json_atomic(path, self)
    }

    /// Entity ids to look up, deduplicated, in catalog order.
    #[must_use]
    pub fn unique_ids(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        self.entities
            .iter()
            .filter_map(Entity::entity_id)
            .filter(|id| seen.insert(id.clone()))
            .collect()
    }

    /// Write observed counts and icons back onto catalog entries.
    ///
    /// Returns how many entries actually changed. Entities absent from
    /// `observations` keep their current fields.
    pub fn apply_observations(&mut self, observations: &BTreeMap<String, Observation>) -> usize {
        let mut updated = 0;
        for entity in &mut self.entities {
            let Some(id) = entity.entity_id() else {
                continue;
            };
            let Some(observation) = observations.get(&id) else {
                continue;
            };

            let mut changed = false;
            if entity.subscribers != Some(observation.value) {
                entity.subscribers = Some(observation.value);
                changed = true;
            }
            if observation.icon.is_some() && entity.icon != observation.icon {
                entity.icon.clone_from(&observation.icon);
                changed = true;
            }
            if changed {
                updated += 1;
            }
        }
        updated
    }
}

/// Extract the channel id from a URL like
/// `https://example.com/channel/UCabc123`. Returns `None` when the path has
/// no `channel` segment or nothing follows it.
#[must_use]
pub fn parse_entity_id(url: &str) -> Option<String> {
    let without_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    let path = without_scheme.split_once('/').map(|(_, path)| path)?;
    let path = path
        .split_once(['?', '#'])
        .map_or(path, |(path, _)| path);

    let mut segments = path.split('/').filter(|s| !s.is_empty());
    while let Some(segment) = segments.next() {
        if segment == "channel" {
            return segments.next().map(str::to_string);
        }
    }
    None
}
