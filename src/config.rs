//! Configuration and credential storage
//!
//! The UI layer owns provider selection and secrets; this module defines
//! the collaborator interface it implements plus a JSON-file-backed store
//! usable out of the box.

use crate::error::{RigError, RigResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

/// Connection details for the display cluster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub secret: String,
    pub node_count: usize,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 22,
            username: String::new(),
            secret: String::new(),
            node_count: 0,
        }
    }
}

impl ClusterConfig {
    /// All fields required before a session may be opened
    pub fn is_complete(&self) -> bool {
        !self.host.is_empty()
            && self.port != 0
            && !self.username.is_empty()
            && !self.secret.is_empty()
            && self.node_count > 0
    }
}

/// Credential/config collaborator interface consumed by the pipeline
pub trait CredentialStore: Send + Sync {
    fn get(&self, provider_id: &str) -> Option<String>;
    fn set(&mut self, provider_id: &str, secret: &str) -> RigResult<()>;
    fn get_active_provider(&self) -> Option<String>;
    fn set_active_provider(&mut self, provider_id: &str) -> RigResult<()>;
    fn load_cluster_config(&self) -> Option<ClusterConfig>;
    fn save_cluster_config(&mut self, config: &ClusterConfig) -> RigResult<()>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreData {
    secrets: HashMap<String, String>,
    active_provider: Option<String>,
    cluster: Option<ClusterConfig>,
}

/// JSON-file-backed store under the platform config directory
pub struct FileStore {
    path: PathBuf,
    data: StoreData,
}

impl FileStore {
    /// Open (or create) the default store at `<config dir>/rigvoice/store.json`
    pub fn open_default() -> RigResult<Self> {
        let dir = dirs::config_dir()
            .ok_or_else(|| RigError::Config("no config directory on this platform".into()))?
            .join("rigvoice");
        Self::open(dir.join("store.json"))
    }

    pub fn open(path: PathBuf) -> RigResult<Self> {
        let data = match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoreData::default(),
            Err(e) => return Err(e.into()),
        };
        debug!("Opened credential store at {}", path.display());
        Ok(Self { path, data })
    }

    fn persist(&self) -> RigResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(&self.data)?)?;
        Ok(())
    }
}

impl CredentialStore for FileStore {
    fn get(&self, provider_id: &str) -> Option<String> {
        self.data.secrets.get(provider_id).cloned()
    }

    fn set(&mut self, provider_id: &str, secret: &str) -> RigResult<()> {
        self.data
            .secrets
            .insert(provider_id.to_string(), secret.to_string());
        self.persist()
    }

    fn get_active_provider(&self) -> Option<String> {
        self.data.active_provider.clone()
    }

    fn set_active_provider(&mut self, provider_id: &str) -> RigResult<()> {
        self.data.active_provider = Some(provider_id.to_string());
        self.persist()
    }

    fn load_cluster_config(&self) -> Option<ClusterConfig> {
        self.data.cluster.clone()
    }

    fn save_cluster_config(&mut self, config: &ClusterConfig) -> RigResult<()> {
        self.data.cluster = Some(config.clone());
        self.persist()
    }
}
