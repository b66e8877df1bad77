//! Log output for the command line. Logs go to stderr so that command
//! output on stdout stays clean for scripts.

use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Used when `RUST_LOG` is not set.
    pub default_level: Level,
    pub ansi_colors: bool,
    pub include_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            default_level: Level::INFO,
            ansi_colors: true,
            include_target: false,
        }
    }
}

impl LogConfig {
    pub fn verbose(verbose: bool) -> Self {
        if verbose {
            Self {
                default_level: Level::DEBUG,
                include_target: true,
                ..Self::default()
            }
        } else {
            Self::default()
        }
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.default_level.to_string().to_lowercase()))
    }
}

/// Installs the global subscriber. Returns `false` if one was already set.
pub fn init_logging(config: &LogConfig) -> bool {
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(config.ansi_colors)
        .with_target(config.include_target)
        .compact();

    tracing_subscriber::registry()
        .with(config.filter())
        .with(layer)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_levels() {
        assert_eq!(LogConfig::verbose(false).default_level, Level::INFO);
        assert_eq!(LogConfig::verbose(true).default_level, Level::DEBUG);
        assert!(LogConfig::verbose(true).include_target);
    }

    #[test]
    fn test_init_twice_is_harmless() {
        let config = LogConfig::default();
        init_logging(&config);
        assert!(!init_logging(&config));
    }
}
