//! Tracing bootstrap: console layer on stderr plus an optional JSON file sink.

use eyre::WrapErr;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, prelude::*};

use crate::cli::FILE_GUARD;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `level` when set. The file sink (if configured) always
/// writes JSON lines so it can be shipped as-is.
pub fn init(json: bool, level: &str, file: &bander_config::Logging) -> eyre::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => EnvFilter::try_new(level)
            .wrap_err_with(|| format!("invalid log level '{level}'"))?,
    };

    let mut layers: Vec<BoxedLayer> = Vec::with_capacity(2);
    layers.push(if json {
        fmt::layer().json().with_writer(std::io::stderr).boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .boxed()
    });
    if let Some(path) = &file.file {
        layers.push(file_layer(path, file.rotation.as_deref())?);
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .wrap_err("install tracing subscriber")
}

fn file_layer(path: &str, rotation: Option<&str>) -> eyre::Result<BoxedLayer> {
    let path = std::path::Path::new(path);
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => std::path::Path::new("."),
    };
    let name = path
        .file_name()
        .ok_or_else(|| eyre::eyre!("logging.file '{}' has no file name", path.display()))?;

    let appender = match rotation.unwrap_or("never") {
        "never" => tracing_appender::rolling::never(dir, name),
        "daily" => tracing_appender::rolling::daily(dir, name),
        "hourly" => tracing_appender::rolling::hourly(dir, name),
        other => eyre::bail!("logging.rotation must be never|daily|hourly, got '{other}'"),
    };
    let (writer, guard) = tracing_appender::non_blocking(appender);
    // Keep the worker alive for the whole process so buffered lines are flushed.
    let _ = FILE_GUARD.set(guard);
    Ok(fmt::layer()
        .json()
        .with_ansi(false)
        .with_writer(writer)
        .boxed())
}
