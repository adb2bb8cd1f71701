/*
 * Copyright 2024 ArpNetworking
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

//! Service configuration
//!
//! Loaded from a camelCase JSON file; every field has a default so an empty
//! object (or no file at all) yields a runnable service.

use crate::aggregation::window::{DEFAULT_PRECISION_MS, DEFAULT_VALIDITY_MS};
use crate::aggregation::Window;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceConfig {
    /// HTTP server bind address
    #[serde(default = "default_http_host")]
    pub http_host: IpAddr,

    /// HTTP server port
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Bucket and window sizing
    #[serde(default)]
    pub window: WindowConfig,

    /// Interval for sweeping stale buckets independently of writes
    #[serde(default, with = "duration_serde")]
    pub sweep_interval: Option<Duration>,
}

/// Bucket and window sizing
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowConfig {
    /// Bucket width in milliseconds
    #[serde(default = "default_precision_ms")]
    pub precision_ms: u64,

    /// Window length in milliseconds
    #[serde(default = "default_validity_ms")]
    pub validity_ms: u64,
}

impl ServiceConfig {
    /// Load configuration from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_json(&contents)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    /// Parse and validate configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).context("Failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Check semantic constraints serde cannot express
    pub fn validate(&self) -> Result<()> {
        self.window.window()?;
        if self.sweep_interval.is_some_and(|interval| interval.is_zero()) {
            bail!("sweepInterval must be greater than zero");
        }
        Ok(())
    }

    /// Address the HTTP server binds to
    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(self.http_host, self.http_port)
    }
}

impl WindowConfig {
    /// Build the aggregation window
    pub fn window(&self) -> Result<Window> {
        let precision_ms = i64::try_from(self.precision_ms).context("precisionMs is too large")?;
        let validity_ms = i64::try_from(self.validity_ms).context("validityMs is too large")?;
        Window::try_new(precision_ms, validity_ms).context("Invalid window configuration")
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            http_host: default_http_host(),
            http_port: default_http_port(),
            window: WindowConfig::default(),
            sweep_interval: None,
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            precision_ms: default_precision_ms(),
            validity_ms: default_validity_ms(),
        }
    }
}

// Default value functions
fn default_http_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_http_port() -> u16 {
    8080
}

fn default_precision_ms() -> u64 {
    DEFAULT_PRECISION_MS as u64
}

fn default_validity_ms() -> u64 {
    DEFAULT_VALIDITY_MS as u64
}

// ISO-8601 duration helpers (PT<seconds>S)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(duration) => {
                serializer.serialize_str(&format!("PT{}S", duration.as_secs_f64()))
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let Some(s) = Option::<String>::deserialize(deserializer)? else {
            return Ok(None);
        };

        let seconds = s
            .strip_prefix("PT")
            .and_then(|rest| rest.strip_suffix('S'))
            .ok_or_else(|| serde::de::Error::custom(format!("Invalid duration format: {}", s)))?;
        let seconds: f64 = seconds.parse().map_err(serde::de::Error::custom)?;

        Duration::try_from_secs_f64(seconds)
            .map(Some)
            .map_err(serde::de::Error::custom)
    }
}
