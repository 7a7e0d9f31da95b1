use tracing::Level;

fn parse_level(name: &str) -> Level {
    match name.to_lowercase().as_str() {
        "error" => Level::ERROR,
        "warn" | "warning" => Level::WARN,
        "debug" => Level::DEBUG,
        "trace" => Level::TRACE,
        _ => Level::INFO,
    }
}

/// Install the fmt subscriber for broker and worker logs.
///
/// Output goes to stderr, tagged with the worker thread name
/// (`<consumer>@<topic>`), leaving stdout to delivery records. Unknown level
/// names fall back to `info`. A second call is ignored.
pub fn init(level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_max_level(parse_level(level))
        .with_target(false)
        .with_thread_names(true)
        .with_writer(std::io::stderr)
        .try_init();
}
