//! Tracing setup: console layer (pretty or JSON) plus an optional rolling file.

use std::path::Path;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

use crate::cli::FILE_GUARD;

/// Install the global subscriber. `RUST_LOG` overrides `console_level`.
///
/// With `[logging] file` set, JSON lines also go to that file, rotated per
/// `[logging] rotation` and filtered by `[logging] level`.
pub fn init_tracing(json: bool, console_level: &str, logging: &lcr_config::Logging) {
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(console_level));
    let console = if json {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(false)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .boxed()
    }
    .with_filter(console_filter);

    let file = logging.file.as_deref().map(|path| {
        let path = Path::new(path);
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let name = path
            .file_name()
            .map_or_else(|| "lcrchar.log".into(), ToOwned::to_owned);
        let appender = match logging.rotation.as_deref() {
            Some("daily") => tracing_appender::rolling::daily(dir, name),
            Some("hourly") => tracing_appender::rolling::hourly(dir, name),
            _ => tracing_appender::rolling::never(dir, name),
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        fmt::layer()
            .json()
            .with_writer(writer)
            .with_ansi(false)
            .with_filter(EnvFilter::new(logging.level.as_deref().unwrap_or("info")))
    });

    let _ = tracing_subscriber::registry()
        .with(console)
        .with(file)
        .try_init();
}
