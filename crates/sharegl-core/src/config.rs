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

//! Process-wide object-tracking policy.

use serde::{Deserialize, Serialize};

/// Environment variable enabling object tracking.
pub const TRACKING_ENV: &str = "SHAREGL_OBJECT_TRACKING";

/// Environment variable forcing object tracking even when nothing requires it.
pub const FORCE_TRACKING_ENV: &str = "SHAREGL_FORCE_OBJECT_TRACKING";

/// Decides whether share groups get a [`SharedObjectTracker`](crate::object::SharedObjectTracker).
///
/// `enabled` is set by whatever integration needs explicit server-object
/// bookkeeping (typically a compositor bridge). `force` turns tracking on
/// regardless. Both are read once at start-up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Tracking is required by the active integration.
    pub enabled: bool,
    /// Tracking is forced on.
    pub force: bool,
}

impl TrackingConfig {
    /// A configuration with tracking turned on.
    pub const fn enabled() -> Self {
        Self {
            enabled: true,
            force: false,
        }
    }

    /// A configuration with tracking turned off.
    pub const fn disabled() -> Self {
        Self {
            enabled: false,
            force: false,
        }
    }

    /// Returns `true` if share groups should track their objects.
    pub fn is_tracking_enabled(&self) -> bool {
        self.enabled || self.force
    }

    /// Reads the configuration from [`TRACKING_ENV`] and [`FORCE_TRACKING_ENV`].
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let flag = |key: &str| lookup(key).is_some_and(|value| parse_flag(&value));
        Self {
            enabled: flag(TRACKING_ENV),
            force: flag(FORCE_TRACKING_ENV),
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_is_disabled() {
        let config = TrackingConfig::default();
        assert!(!config.is_tracking_enabled());
        assert_eq!(config, TrackingConfig::disabled());
    }

    #[test]
    fn force_alone_enables_tracking() {
        let config = TrackingConfig {
            enabled: false,
            force: true,
        };
        assert!(config.is_tracking_enabled());
    }

    #[test]
    fn lookup_accepts_common_truthy_values() {
        let env: HashMap<&str, &str> = [(TRACKING_ENV, " Yes "), (FORCE_TRACKING_ENV, "0")]
            .into_iter()
            .collect();
        let config = TrackingConfig::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert!(config.enabled);
        assert!(!config.force);
    }

    #[test]
    fn deserializes_with_missing_fields() {
        let config: TrackingConfig = serde_json::from_str(r#"{ "force": true }"#).unwrap();
        assert_eq!(
            config,
            TrackingConfig {
                enabled: false,
                force: true
            }
        );
    }
}
