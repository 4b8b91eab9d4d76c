use once_cell::sync::OnceCell;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static FILE_GUARD: OnceCell<WorkerGuard> = OnceCell::new();

/// Initialise logging. The default level is `info`; `debug` switches to
/// `debug` and lets `RUST_LOG` override the level.
///
/// When `log_file` is given, events are also written to that file through a
/// non-blocking writer whose guard lives for the rest of the process.
pub fn init(debug: bool, log_file: Option<PathBuf>) {
    // Without debug logging `RUST_LOG` is ignored so a stray variable in the
    // user's environment cannot turn on verbose output.
    let level = if debug { "debug" } else { "info" };
    let filter = || {
        if debug {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
        } else {
            EnvFilter::new(level)
        }
    };

    let file_layer = log_file.and_then(|path| {
        let dir = path.parent().map(PathBuf::from).unwrap_or_default();
        let name = path.file_name()?.to_owned();
        if !dir.as_os_str().is_empty() {
            if let Err(err) = std::fs::create_dir_all(&dir) {
                eprintln!("failed to create log directory {}: {err}", dir.display());
                return None;
            }
        }
        let appender = tracing_appender::rolling::never(dir, name);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        Some(
            fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(filter()),
        )
    });

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_filter(filter()))
        .with(file_layer)
        .try_init();
}

/// Default log file location: `<data dir>/present_pen/present_pen.log`.
pub fn default_log_path() -> Option<PathBuf> {
    dirs_next::data_local_dir().map(|dir| dir.join("present_pen").join("present_pen.log"))
}
