//! Signed audit bundles.
//!
//! The signature is the hex SHA-256 of the compact JSON serialization of
//! `{generated_at, records}`. Struct fields serialize in declaration order and
//! record metadata uses a `BTreeMap`, so the serialization is canonical.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use {
    async_trait::async_trait,
    serde::{Deserialize, Serialize},
    serde_json::Value,
    sha2::{Digest, Sha256},
    tokio_util::sync::CancellationToken,
    tracing::{info, warn},
};

use crate::{
    error::{Error, Result},
    storage,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub category: String,
    pub decision: String,
    pub actor: String,
    pub timestamp: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
}

impl AuditRecord {
    pub fn new(
        category: impl Into<String>,
        decision: impl Into<String>,
        actor: impl Into<String>,
    ) -> Self {
        Self {
            category: category.into(),
            decision: decision.into(),
            actor: actor.into(),
            timestamp: aios_common::time::now_rfc3339(),
            metadata: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditBundle {
    pub generated_at: String,
    pub records: Vec<AuditRecord>,
    pub signature: String,
}

#[derive(Serialize)]
struct SignedPayload<'a> {
    generated_at: &'a str,
    records: &'a [AuditRecord],
}

fn sign(generated_at: &str, records: &[AuditRecord]) -> String {
    let payload = SignedPayload {
        generated_at,
        records,
    };
    // String keys only, so serialization cannot fail.
    let bytes = serde_json::to_vec(&payload).unwrap_or_default();
    format!("{:x}", Sha256::digest(&bytes))
}

#[must_use]
pub fn build_bundle(records: Vec<AuditRecord>) -> AuditBundle {
    build_bundle_at(aios_common::time::now_rfc3339(), records)
}

#[must_use]
pub fn build_bundle_at(generated_at: String, records: Vec<AuditRecord>) -> AuditBundle {
    let signature = sign(&generated_at, &records);
    AuditBundle {
        generated_at,
        records,
        signature,
    }
}

pub fn verify_bundle(bundle: &AuditBundle) -> Result<()> {
    let computed = sign(&bundle.generated_at, &bundle.records);
    if computed != bundle.signature {
        warn!(stored = %bundle.signature, %computed, "audit bundle signature mismatch");
        return Err(Error::Integrity {
            stored: bundle.signature.clone(),
            computed,
        });
    }
    Ok(())
}

#[async_trait]
pub trait AuditBundleStore: Send + Sync {
    /// Persist a bundle and return where it was written.
    async fn write(&self, bundle: &AuditBundle, cancel: &CancellationToken) -> Result<PathBuf>;

    /// Load a bundle by file name (`audit-….json`) or path. Does not verify.
    async fn load(&self, name: &str, cancel: &CancellationToken) -> Result<AuditBundle>;
}

/// Pretty-printed bundles under `<workspace>/audit/`.
#[derive(Debug, Clone)]
pub struct FileAuditBundleStore {
    dir: PathBuf,
}

impl FileAuditBundleStore {
    pub fn new(workspace_dir: &Path) -> Self {
        Self {
            dir: workspace_dir.join("audit"),
        }
    }

    fn resolve(&self, name: &str) -> PathBuf {
        let candidate = Path::new(name);
        if candidate.components().count() > 1 || candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.dir.join(candidate)
        }
    }
}

#[async_trait]
impl AuditBundleStore for FileAuditBundleStore {
    async fn write(&self, bundle: &AuditBundle, cancel: &CancellationToken) -> Result<PathBuf> {
        aios_common::ensure_active(cancel)?;
        let digest_prefix = bundle.signature.get(..8).unwrap_or(&bundle.signature);
        let path = self.dir.join(format!(
            "audit-{}-{digest_prefix}.json",
            aios_common::time::compact_timestamp()
        ));
        storage::write_json(&path, bundle).await?;
        info!(path = %path.display(), records = bundle.records.len(), "wrote audit bundle");
        Ok(path)
    }

    async fn load(&self, name: &str, cancel: &CancellationToken) -> Result<AuditBundle> {
        aios_common::ensure_active(cancel)?;
        let path = self.resolve(name);
        storage::read_json(&path).await?.ok_or_else(|| {
            Error::Io {
                action: "read",
                path,
                source: std::io::ErrorKind::NotFound.into(),
            }
        })
    }
}
