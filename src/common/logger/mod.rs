use std::{fs, path::Path};

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

pub mod formatter;
pub mod writer;

pub use formatter::*;
pub use writer::*;

use crate::configs::LoggingConfig;

/// Builds the filter directive string from the logging section.
///
/// `RUST_LOG` still wins when set; this is only the fallback.
pub fn filter_directives(logging: &LoggingConfig) -> String {
    let level = logging.level.as_deref().unwrap_or("info");
    match logging.filters.as_deref() {
        Some(filters) if !filters.is_empty() => format!("{level},hyper=warn,{filters}"),
        _ => format!("{level},hyper=warn"),
    }
}

pub fn init(logging: &LoggingConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(logging)));

    let stdout_layer = fmt::layer()
        .event_format(LineFormatter::new(true))
        .with_ansi(true);

    let file_layer = logging.file.as_ref().map(|file_config| {
        if let Some(parent) = Path::new(&file_config.path).parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                eprintln!("Failed to create log directory: {}", e);
            }
        }

        fmt::layer()
            .with_writer(CappedFileWriter::new(
                file_config.path.clone(),
                file_config.max_lines,
            ))
            .event_format(LineFormatter::new(false))
            .with_ansi(false)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directives_default_to_info() {
        let logging = LoggingConfig::default();
        assert_eq!(filter_directives(&logging), "info,hyper=warn");
    }

    #[test]
    fn directives_append_custom_filters() {
        let logging = LoggingConfig {
            level: Some("debug".into()),
            filters: Some("rustbeat::voice=trace".into()),
            file: None,
        };
        assert_eq!(
            filter_directives(&logging),
            "debug,hyper=warn,rustbeat::voice=trace"
        );
    }
}
