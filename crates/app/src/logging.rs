use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::state::AppState;

fn env_filter(level: LevelFilter) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy()
}

/// Initialize logging and the panic handler.
///
/// Logs go to stderr so command output on stdout stays clean. Once the
/// state directory exists its config picks the level and may add a
/// daily rolling file. Returns guards that must be kept alive for the
/// duration of the program.
pub fn init_logging(state: Option<&AppState>) -> Vec<WorkerGuard> {
    let mut guards = Vec::new();

    let level = state
        .and_then(|s| s.config.log_level.parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::WARN);

    let (stderr_writer, stderr_guard) = tracing_appender::non_blocking(std::io::stderr());
    guards.push(stderr_guard);
    let stderr_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(stderr_writer)
        .with_filter(env_filter(level));

    match state.filter(|s| s.config.log_to_file) {
        Some(state) => {
            if let Err(e) = std::fs::create_dir_all(&state.log_dir) {
                eprintln!(
                    "Warning: Failed to create log directory {:?}: {}",
                    state.log_dir, e
                );
            }
            let file_appender = tracing_appender::rolling::daily(&state.log_dir, "bedrock.log");
            let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);
            guards.push(file_guard);

            let file_layer = tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_filter(env_filter(level));

            tracing_subscriber::registry()
                .with(stderr_layer)
                .with(file_layer)
                .init();
        }
        None => tracing_subscriber::registry().with(stderr_layer).init(),
    }

    register_panic_logger();
    guards
}

/// Registers a panic hook that logs panics using the `tracing` crate
fn register_panic_logger() {
    std::panic::set_hook(Box::new(|panic| match panic.location() {
        Some(loc) => {
            tracing::error!(
                message = %panic,
                panic.file = loc.file(),
                panic.line = loc.line(),
                panic.column = loc.column(),
            );
        }
        None => tracing::error!(message = %panic),
    }));
}
