use tracing_subscriber::EnvFilter;

const DEVEL_DIRECTIVES: &str = "debug";
const DEFAULT_DIRECTIVES: &str = "info";

/// `RUST_LOG` when set and non-empty, else the level implied by the mode.
fn filter_directives(develmode: bool, rust_log: Option<String>) -> String {
    match rust_log {
        Some(directives) if !directives.trim().is_empty() => directives,
        _ if develmode => DEVEL_DIRECTIVES.to_string(),
        _ => DEFAULT_DIRECTIVES.to_string(),
    }
}

/// Installs the stderr subscriber. Later calls are no-ops.
pub fn init(develmode: bool) {
    let directives = filter_directives(develmode, std::env::var("RUST_LOG").ok());
    let filter = EnvFilter::try_new(&directives).unwrap_or_else(|err| {
        eprintln!("ignoring invalid log filter {directives:?}: {err}");
        EnvFilter::new(if develmode {
            DEVEL_DIRECTIVES
        } else {
            DEFAULT_DIRECTIVES
        })
    });

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(develmode)
        .try_init();
}
