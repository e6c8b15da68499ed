//! Model artifact store
//!
//! Loads the configured artifact, or trains the synthetic fallback and
//! persists it. A lock file next to the artifact serializes bootstrap
//! across processes; the artifact and its `.hash` sidecar are written via
//! temp file + rename so readers never observe a partial file.

use crate::config::{FallbackConfig, ServiceConfig};
use crate::errors::{Result, ServiceError};
use fs2::FileExt;
use snpath_core::gbdt::Model;
use snpath_trainer::train_fallback;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{info, warn};

/// How the served model was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelOrigin {
    /// Read from the configured artifact
    Loaded,
    /// Fallback trained at startup
    Trained { persisted: bool },
    /// Supplied by the caller, never read from or written to disk
    InMemory,
}

/// A validated model with its content hash
#[derive(Debug, Clone)]
pub struct LoadedModel {
    pub model: Model,
    pub hash: String,
    pub origin: ModelOrigin,
}

/// Exclusive advisory lock held for the duration of a bootstrap
struct StoreLock {
    path: PathBuf,
    file: File,
}

impl StoreLock {
    /// Blocks until the lock is free
    fn acquire(path: &Path) -> Result<Self> {
        if let Some(parent) = non_empty_parent(path) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(path)?;

        file.lock_exclusive().map_err(|err| {
            ServiceError::Io(format!("Failed to lock {}: {err}", path.display()))
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Err(err) = self.file.unlock() {
            warn!("Failed to release {}: {}", self.path.display(), err);
        }
    }
}

/// Load-or-train access to the model artifact
#[derive(Debug, Clone)]
pub struct ModelStore {
    path: PathBuf,
    verify_hash: bool,
    fallback: FallbackConfig,
}

impl ModelStore {
    pub fn new(config: &ServiceConfig) -> Self {
        Self {
            path: config.model.path.clone(),
            verify_hash: config.model.verify_hash,
            fallback: config.fallback.clone(),
        }
    }

    pub fn model_path(&self) -> &Path {
        &self.path
    }

    /// `.hash` sidecar next to the artifact
    pub fn hash_path(&self) -> PathBuf {
        self.path.with_extension("hash")
    }

    pub fn lock_path(&self) -> PathBuf {
        self.path.with_extension("lock")
    }

    /// Load the artifact if present, otherwise train and persist the fallback.
    ///
    /// A present but corrupt or mismatching artifact is an error and is
    /// left untouched.
    pub fn load_or_bootstrap(&self) -> Result<LoadedModel> {
        let _lock = match StoreLock::acquire(&self.lock_path()) {
            Ok(lock) => Some(lock),
            Err(err) => {
                warn!("Proceeding without model store lock: {}", err);
                None
            }
        };

        if self.path.exists() {
            return self.load_existing();
        }

        warn!(
            "No model artifact at {}, training fallback model ({} samples, seed {})",
            self.path.display(),
            self.fallback.samples,
            self.fallback.seed
        );
        self.bootstrap()
    }

    /// Load and verify the artifact; never trains
    pub fn load_existing(&self) -> Result<LoadedModel> {
        let model = Model::load_json(&self.path).map_err(|err| {
            ServiceError::model_unavailable(format!(
                "failed to load {}: {err}",
                self.path.display()
            ))
        })?;
        let hash = model
            .hash_hex()
            .map_err(|err| ServiceError::model_unavailable(err.to_string()))?;

        if self.verify_hash {
            self.verify_sidecar(&hash)?;
        }

        info!(
            "Loaded model from {} ({} trees, hash {})",
            self.path.display(),
            model.num_trees(),
            hash
        );

        Ok(LoadedModel {
            model,
            hash,
            origin: ModelOrigin::Loaded,
        })
    }

    fn verify_sidecar(&self, hash: &str) -> Result<()> {
        let hash_path = self.hash_path();
        let expected = match fs::read_to_string(&hash_path) {
            Ok(content) => content.trim().to_string(),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(err) => {
                return Err(ServiceError::model_unavailable(format!(
                    "failed to read {}: {err}",
                    hash_path.display()
                )))
            }
        };

        if expected != hash {
            return Err(ServiceError::model_unavailable(format!(
                "hash mismatch for {}: sidecar {expected}, computed {hash}",
                self.path.display()
            )));
        }

        Ok(())
    }

    fn bootstrap(&self) -> Result<LoadedModel> {
        let model = train_fallback(
            self.fallback.samples,
            self.fallback.seed,
            self.fallback.gbdt_config(),
        )?;
        let hash = model
            .hash_hex()
            .map_err(|err| ServiceError::model_unavailable(err.to_string()))?;
        info!("Trained fallback model ({} trees, hash {})", model.num_trees(), hash);

        let persisted = match self.persist(&model, &hash) {
            Ok(()) => {
                info!("Persisted model to {}", self.path.display());
                true
            }
            Err(err) => {
                warn!("Failed to persist fallback model, serving from memory: {}", err);
                false
            }
        };

        Ok(LoadedModel {
            model,
            hash,
            origin: ModelOrigin::Trained { persisted },
        })
    }

    /// Write the hash sidecar first, then the artifact, each atomically
    fn persist(&self, model: &Model, hash: &str) -> Result<()> {
        let json = model
            .to_canonical_json()
            .map_err(|err| ServiceError::Io(format!("serialize model: {err}")))?;

        write_atomic(&self.hash_path(), hash.as_bytes())?;
        write_atomic(&self.path, json.as_bytes())
    }
}

fn non_empty_parent(path: &Path) -> Option<&Path> {
    path.parent().filter(|p| !p.as_os_str().is_empty())
}

fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let parent = non_empty_parent(path).unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)
        .map_err(|e| ServiceError::Io(format!("create dir {}: {e}", parent.display())))?;

    let mut temp = NamedTempFile::new_in(parent)
        .map_err(|e| ServiceError::Io(format!("create temp file in {}: {e}", parent.display())))?;
    temp.write_all(contents)
        .map_err(|e| ServiceError::Io(format!("write temp file in {}: {e}", parent.display())))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| ServiceError::Io(format!("sync temp file in {}: {e}", parent.display())))?;

    temp.persist(path).map_err(|e| {
        ServiceError::Io(format!("persist {} failed: {}", path.display(), e.error))
    })?;

    Ok(())
}
