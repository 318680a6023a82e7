use crate::Environment;
use tracing::{debug, info};
use tracing_subscriber::{prelude::*, EnvFilter};

/// Install color-eyre with a project-standard configuration.
///
/// Call this early in main() before any fallible operations. Safe to call multiple times.
pub fn install_color_eyre() {
    let _ = color_eyre::config::HookBuilder::default()
        .display_location_section(true)
        .display_env_section(false)
        .install();
}

/// Build the log filter.
///
/// `RUST_LOG` wins when set. Otherwise `LOG_LEVEL` (e.g. `debug`) is used as the
/// global level, and finally an environment-dependent default.
fn build_filter(environment: &Environment) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = std::env::var("LOG_LEVEL").ok().filter(|l| !l.is_empty());
        match level {
            Some(level) => EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new("info")),
            None if environment.is_production() => EnvFilter::new("info,lettre=warn,h2=warn"),
            None => EnvFilter::new("debug,lettre=info,h2=info,hyper=info,tower=info"),
        }
    })
}

/// Initialize tracing with environment-aware configuration and error span capture.
///
/// - **Production** (`APP_ENV=production`): flattened JSON events for log aggregation.
/// - **Development** (default): pretty-printed, human-readable output.
///
/// Both variants include `tracing_error::ErrorLayer` so eyre reports carry span traces.
///
/// Safe to call multiple times: a second initialization is skipped (common in tests).
pub fn init_tracing(environment: &Environment) {
    let filter = build_filter(environment);

    let result = if environment.is_production() {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(false)
                    .flatten_event(true),
            )
            .with(tracing_error::ErrorLayer::default())
            .with(filter)
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_file(false)
                    .with_line_number(false)
                    .pretty(),
            )
            .with(tracing_error::ErrorLayer::default())
            .with(filter)
            .try_init()
    };

    match result {
        Ok(_) => {
            info!(environment = ?environment, "Tracing initialized");
        }
        Err(_) => {
            debug!("Tracing already initialized, skipping re-initialization");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_multiple_calls() {
        let env = Environment::Development;
        init_tracing(&env);
        init_tracing(&env);
    }

    #[test]
    fn test_init_tracing_production_with_log_level() {
        temp_env::with_vars([("RUST_LOG", None), ("LOG_LEVEL", Some("warn"))], || {
            init_tracing(&Environment::Production);
        });
    }

    #[test]
    fn test_invalid_log_level_falls_back() {
        temp_env::with_vars([("RUST_LOG", None), ("LOG_LEVEL", Some("=[bogus"))], || {
            let filter = build_filter(&Environment::Development);
            assert_eq!(filter.to_string(), "info");
        });
    }
}
