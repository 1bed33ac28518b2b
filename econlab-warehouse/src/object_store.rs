//! Remote warehouse: processed files uploaded to an object store.
//!
//! Each run writes to its own versioned prefix `{prefix}/{run_id}/`, so
//! earlier uploads are never overwritten. Files are uploaded independently and
//! reported one by one.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use econlab_core::config::{ObjectStoreConfig, PipelineConfig};
use serde::Serialize;

use crate::error::WarehouseError;
use crate::processed::ProcessedFiles;

/// Layout of run ids: UTC, second resolution.
pub const RUN_ID_FORMAT: &str = "%Y%m%dT%H%M%SZ";

pub const SOURCE_TAG: &str = "world_bank";
pub const MANIFEST_FILE: &str = "manifest.json";

/// Object metadata (tags) attached to every upload.
pub type Metadata = BTreeMap<String, String>;

/// Minimal put-object boundary. Cloud SDKs plug in behind this trait.
pub trait ObjectStore: Send + Sync {
    /// Bucket or container name, used to build object URLs.
    fn bucket(&self) -> &str;

    fn put_object(&self, key: &str, body: &[u8], metadata: &Metadata) -> Result<(), WarehouseError>;
}

/// Filesystem-backed store: `{root}/{bucket}/{key}` plus a
/// `{key}.meta.json` sidecar holding the metadata.
pub struct FsObjectStore {
    root: PathBuf,
    bucket: String,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>, bucket: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            bucket: bucket.into(),
        }
    }

    /// Where an object's body lives on disk.
    pub fn object_path(&self, key: &str) -> PathBuf {
        self.root.join(&self.bucket).join(key)
    }

    fn meta_path(&self, key: &str) -> PathBuf {
        self.root.join(&self.bucket).join(format!("{key}.meta.json"))
    }
}

fn validate_key(key: &str) -> Result<(), WarehouseError> {
    let bad = key.is_empty()
        || key.starts_with('/')
        || key.split('/').any(|part| part.is_empty() || part == "." || part == "..");
    if bad {
        return Err(WarehouseError::ObjectStore {
            key: key.to_string(),
            message: "invalid object key".into(),
        });
    }
    Ok(())
}

impl ObjectStore for FsObjectStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn put_object(&self, key: &str, body: &[u8], metadata: &Metadata) -> Result<(), WarehouseError> {
        validate_key(key)?;
        let path = self.object_path(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| WarehouseError::io(parent, e))?;
        }
        let meta = serde_json::to_vec_pretty(metadata).map_err(|e| WarehouseError::ObjectStore {
            key: key.to_string(),
            message: e.to_string(),
        })?;

        fs::write(&path, body).map_err(|e| WarehouseError::io(&path, e))?;
        let meta_path = self.meta_path(key);
        fs::write(&meta_path, meta).map_err(|e| WarehouseError::io(&meta_path, e))?;
        Ok(())
    }
}

/// One file that made it into the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedObject {
    pub key: String,
    pub bytes: usize,
    pub content_hash: String,
}

/// Per-file upload result.
#[derive(Debug)]
pub struct UploadOutcome {
    pub file: PathBuf,
    pub key: String,
    pub result: Result<UploadedObject, WarehouseError>,
}

#[derive(Debug)]
pub struct UploadReport {
    pub run_id: String,
    pub uploads: Vec<UploadOutcome>,
    /// Manifest key, when one was written.
    pub manifest: Option<String>,
}

impl UploadReport {
    pub fn succeeded(&self) -> usize {
        self.uploads.iter().filter(|u| u.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.uploads.len() - self.succeeded()
    }
}

#[derive(Serialize)]
struct Manifest {
    entries: Vec<ManifestEntry>,
}

#[derive(Serialize)]
struct ManifestEntry {
    url: String,
    mandatory: bool,
}

pub struct ObjectStoreWarehouse<S: ObjectStore> {
    store: S,
    prefix: String,
    country: String,
    write_manifest: bool,
}

impl ObjectStoreWarehouse<FsObjectStore> {
    /// Filesystem-backed warehouse from `[warehouse.object_store]`.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, WarehouseError> {
        let settings: &ObjectStoreConfig = config.warehouse.object_store.as_ref().ok_or_else(|| {
            WarehouseError::Config("backend = \"object_store\" requires [warehouse.object_store]".into())
        })?;
        Ok(Self::new(
            FsObjectStore::new(&settings.root, &settings.bucket),
            &settings.prefix,
            &config.source.country_code,
            settings.write_manifest,
        ))
    }
}

impl<S: ObjectStore> ObjectStoreWarehouse<S> {
    pub fn new(store: S, prefix: &str, country: &str, write_manifest: bool) -> Self {
        Self {
            store,
            prefix: prefix.trim_matches('/').to_string(),
            country: country.to_string(),
            write_manifest,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn run_id(at: DateTime<Utc>) -> String {
        at.format(RUN_ID_FORMAT).to_string()
    }

    /// `{prefix}/{run_id}/{file_name}`.
    pub fn object_key(&self, run_id: &str, file_name: &str) -> String {
        if self.prefix.is_empty() {
            format!("{run_id}/{file_name}")
        } else {
            format!("{}/{run_id}/{file_name}", self.prefix)
        }
    }

    fn metadata(&self, run_id: &str, content_type: &str, content_hash: &str) -> Metadata {
        Metadata::from([
            ("source".to_string(), SOURCE_TAG.to_string()),
            ("country".to_string(), self.country.clone()),
            ("run_id".to_string(), run_id.to_string()),
            ("content_type".to_string(), content_type.to_string()),
            ("content_hash".to_string(), content_hash.to_string()),
        ])
    }

    fn upload_file(&self, path: &Path, key: &str, run_id: &str) -> Result<UploadedObject, WarehouseError> {
        if !path.exists() {
            return Err(WarehouseError::MissingInput(path.to_path_buf()));
        }
        let body = fs::read(path).map_err(|e| WarehouseError::io(path, e))?;
        let content_hash = blake3::hash(&body).to_hex().to_string();
        let metadata = self.metadata(run_id, "text/csv", &content_hash);
        self.store.put_object(key, &body, &metadata)?;
        Ok(UploadedObject {
            key: key.to_string(),
            bytes: body.len(),
            content_hash,
        })
    }

    /// Upload every processed file under `run_id`. Never fails as a whole:
    /// each file carries its own result.
    pub fn upload_at(&self, files: &ProcessedFiles, run_id: &str) -> UploadReport {
        let mut uploads = Vec::new();
        for path in files.all() {
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let key = self.object_key(run_id, &file_name);
            let result = self.upload_file(path, &key, run_id);
            match &result {
                Ok(obj) => tracing::info!(key = %obj.key, bytes = obj.bytes, "uploaded"),
                Err(e) => tracing::warn!(key = %key, error = %e, "upload failed"),
            }
            uploads.push(UploadOutcome {
                file: path.to_path_buf(),
                key,
                result,
            });
        }

        let mut report = UploadReport {
            run_id: run_id.to_string(),
            uploads,
            manifest: None,
        };
        if self.write_manifest && report.succeeded() > 0 {
            match self.put_manifest(&report) {
                Ok(key) => report.manifest = Some(key),
                Err(e) => tracing::warn!(error = %e, "manifest upload failed"),
            }
        }
        report
    }

    fn put_manifest(&self, report: &UploadReport) -> Result<String, WarehouseError> {
        let manifest = Manifest {
            entries: report
                .uploads
                .iter()
                .filter_map(|u| u.result.as_ref().ok())
                .map(|obj| ManifestEntry {
                    url: format!("s3://{}/{}", self.store.bucket(), obj.key),
                    mandatory: true,
                })
                .collect(),
        };
        let key = self.object_key(&report.run_id, MANIFEST_FILE);
        let body = serde_json::to_vec_pretty(&manifest).map_err(|e| WarehouseError::ObjectStore {
            key: key.clone(),
            message: e.to_string(),
        })?;
        let hash = blake3::hash(&body).to_hex().to_string();
        let metadata = self.metadata(&report.run_id, "application/json", &hash);
        self.store.put_object(&key, &body, &metadata)?;
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn run_id_is_utc_compact() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(ObjectStoreWarehouse::<FsObjectStore>::run_id(at), "20240309T140507Z");
    }

    #[test]
    fn keys_are_versioned_by_run() {
        let wh = ObjectStoreWarehouse::new(FsObjectStore::new("/tmp", "b"), "/processed-data/", "BGD", false);
        assert_eq!(
            wh.object_key("20240309T140507Z", "indicator_summary.csv"),
            "processed-data/20240309T140507Z/indicator_summary.csv"
        );
    }

    #[test]
    fn rejects_traversal_keys() {
        assert!(validate_key("a/../b").is_err());
        assert!(validate_key("/abs").is_err());
        assert!(validate_key("a//b").is_err());
        assert!(validate_key("processed-data/run/file.csv").is_ok());
    }

    #[test]
    fn fs_store_writes_body_and_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(dir.path(), "econ-bucket");
        let metadata = Metadata::from([("country".to_string(), "BGD".to_string())]);

        store.put_object("p/r/file.csv", b"a,b\n", &metadata).unwrap();

        assert_eq!(fs::read(store.object_path("p/r/file.csv")).unwrap(), b"a,b\n");
        let sidecar = dir.path().join("econ-bucket/p/r/file.csv.meta.json");
        let back: Metadata = serde_json::from_slice(&fs::read(sidecar).unwrap()).unwrap();
        assert_eq!(back["country"], "BGD");
    }
}
