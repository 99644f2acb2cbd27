use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Log directives for `alertdeck` itself; `RUST_LOG` applies when unset.
const ALERTDECK_LOG_ENV: &str = "ALERTDECK_LOG";

pub(crate) fn init_tracing() {
    let directives = std::env::var(ALERTDECK_LOG_ENV).ok();
    // Logs go to stderr so `--json` output on stdout stays parseable.
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(directives.as_deref()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn log_filter(directives: Option<&str>) -> EnvFilter {
    let builder = EnvFilter::builder().with_default_directive(LevelFilter::WARN.into());
    match directives.map(str::trim).filter(|value| !value.is_empty()) {
        Some(directives) => builder.parse_lossy(directives),
        None => builder.from_env_lossy(),
    }
}
