// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
use std::sync::Once;

/// Logger configuration.
///
/// `env_filter` uses the `env_logger` filter syntax, for example
/// `"info"` or `"sharegl_core=trace,warn"`.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Explicit filter. Takes precedence over `RUST_LOG`.
    pub env_filter: Option<String>,
    /// ANSI coloring behavior.
    pub write_style: env_logger::WriteStyle,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            write_style: env_logger::WriteStyle::Auto,
        }
    }
}

impl LoggingConfig {
    /// A configuration with an explicit filter.
    pub fn with_filter(filter: impl Into<String>) -> Self {
        Self {
            env_filter: Some(filter.into()),
            ..Self::default()
        }
    }
}

static INIT: Once = Once::new();

/// Installs the global logger. Later calls are ignored.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();

        if let Some(filter) = config.env_filter {
            builder.parse_filters(&filter);
        } else if let Ok(filter) = std::env::var("RUST_LOG") {
            builder.parse_filters(&filter);
        } else {
            builder.filter_level(log::LevelFilter::Info);
        }

        builder.write_style(config.write_style);

        // Another logger may already be installed by the host application.
        if builder.try_init().is_err() {
            log::debug!("A global logger was already installed");
            return;
        }

        log::debug!("Logging initialized");
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_logging_is_idempotent() {
        init_logging(LoggingConfig::with_filter("debug"));
        init_logging(LoggingConfig::default());
        log::info!("still logging");
    }

    #[test]
    fn with_filter_keeps_default_style() {
        let config = LoggingConfig::with_filter("warn");
        assert_eq!(config.env_filter.as_deref(), Some("warn"));
        assert!(matches!(config.write_style, env_logger::WriteStyle::Auto));
    }
}
