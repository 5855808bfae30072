use dashmap::DashMap;
use poise::serenity_prelude::GuildId;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{BotError, Result};

/// Logical tables of the store, each keyed by guild id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Verification,
    VerificationLogs,
    VerificationAttempts,
}

impl Collection {
    pub const ALL: [Collection; 3] = [
        Collection::Verification,
        Collection::VerificationLogs,
        Collection::VerificationAttempts,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Verification => "verification",
            Collection::VerificationLogs => "verification_logs",
            Collection::VerificationAttempts => "verification_attempts",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == name)
    }
}

/// On-disk layout: collection name -> guild id -> document
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreSnapshot {
    version: u32,
    collections: BTreeMap<String, BTreeMap<String, Value>>,
}

/// Keyed document store shared by all managers.
///
/// Documents live in memory; when a path is set, [`DocumentStore::persist`]
/// writes a full snapshot to disk atomically.
pub struct DocumentStore {
    docs: DashMap<(Collection, GuildId), Value>,
    path: Option<PathBuf>,
    save_lock: tokio::sync::Mutex<()>,
}

impl DocumentStore {
    /// Store that never touches disk
    pub fn in_memory() -> Self {
        Self {
            docs: DashMap::new(),
            path: None,
            save_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Load a snapshot from `path`, or start empty if the file does not exist
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let path_str = path.display().to_string();
        let store = Self {
            docs: DashMap::new(),
            path: Some(path.clone()),
            save_lock: tokio::sync::Mutex::new(()),
        };

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(store),
            Err(e) => {
                return Err(BotError::StateLoad {
                    path: path_str,
                    source: e,
                })
            }
        };

        let snapshot: StoreSnapshot =
            serde_json::from_str(&content).map_err(|e| BotError::ConfigParse {
                path: path_str.clone(),
                source: e,
            })?;

        for (name, documents) in snapshot.collections {
            let Some(collection) = Collection::from_name(&name) else {
                warn!("Skipping unknown collection '{}' in {}", name, path_str);
                continue;
            };
            for (guild, doc) in documents {
                match guild.parse::<u64>() {
                    Ok(id) if id != 0 => {
                        store.docs.insert((collection, GuildId::new(id)), doc);
                    }
                    _ => warn!("Skipping invalid guild key '{}' in {}", guild, name),
                }
            }
        }

        debug!("Loaded {} documents from {}", store.docs.len(), path_str);
        Ok(store)
    }

    /// Get a raw document
    pub fn get(&self, collection: Collection, guild_id: GuildId) -> Option<Value> {
        self.docs
            .get(&(collection, guild_id))
            .map(|doc| doc.value().clone())
            .filter(|doc| !doc.is_null())
    }

    /// Replace a document, returning the previous one
    pub fn set(&self, collection: Collection, guild_id: GuildId, doc: Value) -> Option<Value> {
        self.docs
            .insert((collection, guild_id), doc)
            .filter(|doc| !doc.is_null())
    }

    /// Remove a document; returns whether one existed
    pub fn delete(&self, collection: Collection, guild_id: GuildId) -> bool {
        self.docs
            .remove(&(collection, guild_id))
            .map(|(_, doc)| !doc.is_null())
            .unwrap_or(false)
    }

    /// Get a document deserialized into `T`
    pub fn get_as<T: DeserializeOwned>(
        &self,
        collection: Collection,
        guild_id: GuildId,
    ) -> Result<Option<T>> {
        self.get(collection, guild_id)
            .map(serde_json::from_value)
            .transpose()
            .map_err(Into::into)
    }

    /// Serialize `doc` and store it
    pub fn set_as<T: Serialize>(&self, collection: Collection, guild_id: GuildId, doc: &T) -> Result<()> {
        self.set(collection, guild_id, serde_json::to_value(doc)?);
        Ok(())
    }

    /// Atomic read-modify-write of one document.
    ///
    /// The shard lock for the key is held while `f` runs, so concurrent
    /// modifications of the same guild's document are serialized. `f` must
    /// not block. A missing document is passed to `f` as `T::default()`.
    pub fn modify<T, R, F>(&self, collection: Collection, guild_id: GuildId, f: F) -> Result<R>
    where
        T: Serialize + DeserializeOwned + Default,
        F: FnOnce(&mut T) -> R,
    {
        let mut slot = self.docs.entry((collection, guild_id)).or_insert(Value::Null);
        let mut doc: T = if slot.is_null() {
            T::default()
        } else {
            serde_json::from_value(slot.value().clone())?
        };
        let out = f(&mut doc);
        *slot = serde_json::to_value(&doc)?;
        Ok(out)
    }

    /// Number of non-empty documents
    pub fn len(&self) -> usize {
        self.docs.iter().filter(|e| !e.value().is_null()).count()
    }

    /// Write a snapshot to disk (no-op for in-memory stores)
    pub async fn persist(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let _guard = self.save_lock.lock().await;

        let mut snapshot = StoreSnapshot {
            version: 1,
            collections: BTreeMap::new(),
        };
        for entry in self.docs.iter() {
            let (collection, guild_id) = entry.key();
            if entry.value().is_null() {
                continue;
            }
            snapshot
                .collections
                .entry(collection.as_str().to_string())
                .or_default()
                .insert(guild_id.to_string(), entry.value().clone());
        }

        let content = serde_json::to_string_pretty(&snapshot)?;
        let path_str = path.display().to_string();

        // Write to temp file first, then rename for atomicity
        let temp_path = format!("{}.tmp", path_str);
        tokio::fs::write(&temp_path, &content)
            .await
            .map_err(|e| BotError::StateSave {
                path: path_str.clone(),
                source: e,
            })?;
        tokio::fs::rename(&temp_path, path)
            .await
            .map_err(|e| BotError::StateSave {
                path: path_str,
                source: e,
            })?;

        Ok(())
    }
}

/// Shared document store type
pub type SharedDocumentStore = Arc<DocumentStore>;

pub fn create_shared_document_store(store: DocumentStore) -> SharedDocumentStore {
    Arc::new(store)
}
