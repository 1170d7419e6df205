use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global tracing subscriber: human-readable console output plus
/// a daily-rotated JSON log file under `logs/`.
pub fn init_logging() {
    let _ = std::fs::create_dir_all("logs");

    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily("logs", "chemdata.log"));

    let filter = EnvFilter::from_default_env().add_directive("chemdata=info".parse().unwrap());

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().with_writer(file_writer))
        .with(fmt::layer().compact().with_writer(std::io::stdout))
        .init();

    // Dropping the guard would stop the background writer and lose buffered
    // log lines at exit; the subscriber is global, so leak it.
    std::mem::forget(guard);
}
