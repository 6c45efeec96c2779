use crate::cli::Cli;
use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
use serde::Deserialize;
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::net::IpAddr;
use std::net::Ipv4Addr;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;
use tindex_core::LedgerSpec;
use tindex_core::default_ledger_specs;
use tindex_sync::UpdateSemantics;

/// Settings of the indexer process
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexerConfig {
    /// Debug logging
    #[serde(default)]
    pub develmode: bool,

    /// Load the manifest snapshot before serving
    #[serde(default = "default_true")]
    pub sync_on_startup: bool,

    /// Namespace to index; all namespaces when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    #[serde(default = "default_interface")]
    pub interface: IpAddr,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory of display-name maps
    #[serde(default = "default_conf_dir")]
    pub conf_dir: PathBuf,

    /// Directory of template manifests
    #[serde(default = "default_source_dir")]
    pub source_dir: PathBuf,

    #[serde(default)]
    pub update_semantics: UpdateSemantics,

    /// Ledgers to register, keyed by query name
    #[serde(default = "default_ledger_specs")]
    pub ledgers: Vec<LedgerSpec>,
}

fn default_true() -> bool {
    true
}

fn default_interface() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}

fn default_conf_dir() -> PathBuf {
    PathBuf::from("/etc/template-index")
}

fn default_source_dir() -> PathBuf {
    PathBuf::from("/var/lib/template-index/templates")
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            develmode: false,
            sync_on_startup: default_true(),
            namespace: None,
            interface: default_interface(),
            port: default_port(),
            conf_dir: default_conf_dir(),
            source_dir: default_source_dir(),
            update_semantics: UpdateSemantics::default(),
            ledgers: default_ledger_specs(),
        }
    }
}

impl IndexerConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("failed to parse config {}", path.display()))
    }

    /// File settings (when `--config` is given), overridden by flags,
    /// validated.
    pub fn resolve(cli: &Cli) -> Result<Self> {
        let mut config = match &cli.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply_cli(cli);
        config.validate()?;
        Ok(config)
    }

    pub fn apply_cli(&mut self, cli: &Cli) {
        if cli.develmode {
            self.develmode = true;
        }
        if cli.skip_sync {
            self.sync_on_startup = false;
        }
        if let Some(namespace) = &cli.namespace {
            self.namespace = Some(namespace.clone());
        }
        if let Some(interface) = cli.interface {
            self.interface = interface;
        }
        if let Some(port) = cli.port {
            self.port = port;
        }
        if let Some(conf_dir) = &cli.confdir {
            self.conf_dir = conf_dir.clone();
        }
        if let Some(source) = &cli.source {
            self.source_dir = source.clone();
        }
        if let Some(semantics) = cli.update_semantics {
            self.update_semantics = semantics;
        }
        // An empty namespace selects every namespace.
        self.namespace = self.namespace.take().filter(|ns| !ns.is_empty());
    }

    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            bail!("port must be between 1 and 65535");
        }
        let mut names = HashSet::new();
        for ledger in &self.ledgers {
            if ledger.name.is_empty() || ledger.label.is_empty() {
                bail!("ledger entries need a non-empty name and label: {ledger:?}");
            }
            if !names.insert(ledger.name.as_str()) {
                bail!("ledger {} is configured twice", ledger.name);
            }
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.interface, self.port)
    }
}
