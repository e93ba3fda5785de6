//! Service manifest files used by the operator CLI.
//!
//! ```toml
//! namespace = "default"
//! name = "web"
//!
//! [annotations]
//! "service.beta.kubernetes.io/cce-load-balancer-allocate-vip" = "true"
//!
//! [[listeners]]
//! protocol = "TCP"
//! listener_port = 80
//! backend_port = 30080
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::identity::{ServiceIdentityHints, ServiceRef};
use crate::listener::ListenerSpec;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse manifest: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to write manifest: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// A service's identity, annotations and desired listeners.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceManifest {
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    #[serde(default)]
    pub listeners: Vec<ListenerSpec>,
}

impl ServiceManifest {
    pub fn parse(content: &str) -> Result<Self, ManifestError> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn service(&self) -> ServiceRef {
        ServiceRef::new(&self.namespace, &self.name)
            .with_hints(ServiceIdentityHints::from_annotations(&self.annotations))
    }
}

/// Merge `hints` into the `[annotations]` table of a manifest document.
///
/// Other keys and sections are kept as they are.
pub fn write_hints(content: &str, hints: &ServiceIdentityHints) -> Result<String, ManifestError> {
    let mut doc: toml::Table = toml::from_str(content)?;

    let mut annotations: BTreeMap<String, String> = match doc.remove("annotations") {
        Some(value) => value.try_into()?,
        None => BTreeMap::new(),
    };
    hints.write_annotations(&mut annotations);

    let table = annotations
        .into_iter()
        .map(|(k, v)| (k, toml::Value::String(v)))
        .collect::<toml::Table>();
    doc.insert("annotations".to_string(), toml::Value::Table(table));

    Ok(toml::to_string(&doc)?)
}

/// Persist `hints` into the manifest at `path`.
pub fn save_hints(path: &Path, hints: &ServiceIdentityHints) -> Result<(), ManifestError> {
    let content = std::fs::read_to_string(path)?;
    let updated = write_hints(&content, hints)?;
    std::fs::write(path, updated)?;
    Ok(())
}
