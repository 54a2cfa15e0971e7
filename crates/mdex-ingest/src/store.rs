//! Disk writer and reader for the `data/` tree
//!
//! Layout:
//!
//! ```text
//! data/meta/<kind>_ids.json     discovered ID lists
//! data/raw-<kind>/<id>.json     verbatim payloads
//! data/<kind>/<id>.json         normalized projections
//! data/monster/<id>.json        joined monster records
//! data/mapping/type_map.json    optional type label overrides
//! ```
//!
//! Each record owns a distinct path, so concurrent writers never contend.
//! Records are written to a sibling temp file and renamed into place, so
//! readers never observe a half-written `<id>.json`.

use crate::error::{IngestError, Result};
use crate::resource::{Namespace, ResourceKind};
use mdex_common::EntityId;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

const META_DIR: &str = "meta";
const MAPPING_DIR: &str = "mapping";

/// Handle on the data root
#[derive(Debug, Clone)]
pub struct DataStore {
    root: PathBuf,
}

impl DataStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DataStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ids_path(&self, kind: ResourceKind) -> PathBuf {
        self.root.join(META_DIR).join(kind.ids_file())
    }

    pub fn mapping_path(&self, file: &str) -> PathBuf {
        self.root.join(MAPPING_DIR).join(file)
    }

    pub fn namespace_dir(&self, namespace: Namespace) -> PathBuf {
        self.root.join(namespace.dir_name())
    }

    pub fn record_path(&self, namespace: Namespace, id: EntityId) -> PathBuf {
        self.namespace_dir(namespace).join(format!("{id}.json"))
    }

    /// Persist a discovered ID list
    pub async fn write_ids(&self, kind: ResourceKind, ids: &[EntityId]) -> Result<PathBuf> {
        let path = self.ids_path(kind);
        write_json_file(&path, ids).await?;
        Ok(path)
    }

    /// Load a discovered ID list. A missing file is a [`IngestError::MissingInput`].
    pub async fn read_ids(&self, kind: ResourceKind) -> Result<Vec<EntityId>> {
        read_json_file(&self.ids_path(kind)).await
    }

    /// Write one record as `<namespace>/<id>.json`, replacing any previous file
    pub async fn write_record<T>(
        &self,
        namespace: Namespace,
        id: EntityId,
        record: &T,
    ) -> Result<PathBuf>
    where
        T: Serialize + ?Sized,
    {
        let path = self.record_path(namespace, id);
        write_json_file(&path, record).await?;
        Ok(path)
    }

    pub async fn read_record<T: DeserializeOwned>(
        &self,
        namespace: Namespace,
        id: EntityId,
    ) -> Result<T> {
        read_json_file(&self.record_path(namespace, id)).await
    }

    /// Read `data/mapping/<file>`, or `None` when it does not exist
    pub async fn read_mapping<T: DeserializeOwned>(&self, file: &str) -> Result<Option<T>> {
        match read_json_file(&self.mapping_path(file)).await {
            Ok(value) => Ok(Some(value)),
            Err(IngestError::MissingInput { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// IDs of every `<id>.json` in a namespace, ascending. A missing directory is empty.
    pub async fn list_record_ids(&self, namespace: Namespace) -> Result<Vec<EntityId>> {
        let dir = self.namespace_dir(namespace);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(IngestError::io(dir, e)),
        };

        let mut ids = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| IngestError::io(&dir, e))?
        {
            let name = entry.file_name();
            let Some(stem) = name.to_str().and_then(|n| n.strip_suffix(".json")) else {
                continue;
            };
            if let Ok(id) = stem.parse::<EntityId>() {
                ids.push(id);
            }
        }

        ids.sort_unstable();
        Ok(ids)
    }

    /// Number of records in a namespace
    pub async fn count_records(&self, namespace: Namespace) -> Result<usize> {
        Ok(self.list_record_ids(namespace).await?.len())
    }
}

async fn write_json_file<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let body = serde_json::to_vec_pretty(value)?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| IngestError::io(parent, e))?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, &body)
        .await
        .map_err(|e| IngestError::io(&tmp, e))?;

    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(IngestError::io(path, e));
    }

    Ok(())
}

async fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(IngestError::MissingInput {
                path: path.to_path_buf(),
            })
        }
        Err(e) => return Err(IngestError::io(path, e)),
    };

    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_creates_directories_and_pretty_prints() {
        let dir = TempDir::new().unwrap();
        let store = DataStore::new(dir.path().join("data"));

        let path = store
            .write_record(Namespace::Raw(ResourceKind::Pokemon), 25, &json!({"id": 25}))
            .await
            .unwrap();

        assert_eq!(path, dir.path().join("data/raw-pokemon/25.json"));
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "{\n  \"id\": 25\n}");
        assert!(!dir.path().join("data/raw-pokemon/25.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_rewrite_overwrites() {
        let dir = TempDir::new().unwrap();
        let store = DataStore::new(dir.path());
        let ns = Namespace::Normalized(ResourceKind::Species);

        store.write_record(ns, 1, &json!({"id": 1, "name": "old"})).await.unwrap();
        store.write_record(ns, 1, &json!({"id": 1, "name": "new"})).await.unwrap();

        let value: serde_json::Value = store.read_record(ns, 1).await.unwrap();
        assert_eq!(value["name"], "new");
        assert_eq!(store.count_records(ns).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_ids_round_trip_and_missing_list() {
        let dir = TempDir::new().unwrap();
        let store = DataStore::new(dir.path());

        let err = store.read_ids(ResourceKind::Form).await.unwrap_err();
        assert!(matches!(err, IngestError::MissingInput { .. }));

        store.write_ids(ResourceKind::Form, &[10001, 1, 2]).await.unwrap();
        assert_eq!(store.read_ids(ResourceKind::Form).await.unwrap(), vec![10001, 1, 2]);
        assert!(dir.path().join("meta/form_ids.json").exists());
    }

    #[tokio::test]
    async fn test_list_record_ids_ignores_other_files() {
        let dir = TempDir::new().unwrap();
        let store = DataStore::new(dir.path());
        let ns = Namespace::Monster;

        for id in [10, 2, 33] {
            store.write_record(ns, id, &json!({"id": id})).await.unwrap();
        }
        std::fs::write(dir.path().join("monster/notes.txt"), "x").unwrap();
        std::fs::write(dir.path().join("monster/index.json"), "{}").unwrap();

        assert_eq!(store.list_record_ids(ns).await.unwrap(), vec![2, 10, 33]);
        let empty = store
            .list_record_ids(Namespace::Raw(ResourceKind::Form))
            .await
            .unwrap();
        assert!(empty.is_empty());
    }
}
