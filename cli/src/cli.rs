use clap::Parser;
use std::net::IpAddr;
use std::path::PathBuf;
use tindex_sync::UpdateSemantics;

/// Serves facet summaries and descriptions of VM templates over HTTP.
///
/// Flags override the values read from `--config`.
#[derive(Debug, Parser)]
#[command(name = "template-indexer", version)]
pub struct Cli {
    /// TOML configuration file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable development mode (debug logging)
    #[arg(short = 'D', long)]
    pub develmode: bool,

    /// Skip the initial sync with the template source
    #[arg(short = 's', long)]
    pub skip_sync: bool,

    /// Only index templates from this namespace (empty means all)
    #[arg(short = 'N', long, value_name = "NAMESPACE")]
    pub namespace: Option<String>,

    /// Interface to listen on
    #[arg(short = 'I', long, value_name = "ADDR")]
    pub interface: Option<IpAddr>,

    /// Port to listen on
    #[arg(short = 'p', long)]
    pub port: Option<u16>,

    /// Directory holding the display-name maps, one file per ledger
    #[arg(short = 'C', long, value_name = "DIR")]
    pub confdir: Option<PathBuf>,

    /// Directory of template manifests to index and watch
    #[arg(short = 'S', long, value_name = "DIR")]
    pub source: Option<PathBuf>,

    /// How change notifications are applied: `replace` or `toggle`
    #[arg(long, value_name = "MODE")]
    pub update_semantics: Option<UpdateSemantics>,
}
