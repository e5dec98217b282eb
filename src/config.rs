// Copyright (C) 2026 vipr contributors
//
// Permission is hereby granted, free of charge, to any
// person obtaining a copy of this software and associated
// documentation files (the "Software"), to deal in the
// Software without restriction, including without
// limitation the rights to use, copy, modify, merge,
// publish, distribute, sublicense, and/or sell copies of
// the Software, and to permit persons to whom the Software
// is furnished to do so, subject to the following
// conditions:
//
// The above copyright notice and this permission notice
// shall be included in all copies or substantial portions
// of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF
// ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED
// TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A
// PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT
// SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY
// CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION
// OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR
// IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
// DEALINGS IN THE SOFTWARE.

use std::env;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Deserializer};

use super::error::*;
use super::task::{DEFAULT_POLL_INTERVAL, DEFAULT_TASK_TIMEOUT};
use super::transport::DEFAULT_PORT;

static ENV_HOSTNAME: &'static str = "VIPR_HOSTNAME";
static ENV_PORT: &'static str = "VIPR_PORT";
static ENV_USERNAME: &'static str = "VIPR_USERNAME";
static ENV_PASSWORD: &'static str = "VIPR_PASSWORD";
static ENV_TENANT: &'static str = "VIPR_TENANT";
static ENV_PROJECT: &'static str = "VIPR_PROJECT";
static ENV_VARRAY: &'static str = "VIPR_VARRAY";
static ENV_VERIFY_TLS: &'static str = "VIPR_VERIFY_TLS";
static ENV_TASK_TIMEOUT: &'static str = "VIPR_TASK_TIMEOUT";
static ENV_POLL_INTERVAL: &'static str = "VIPR_POLL_INTERVAL";

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_request_timeout() -> Duration {
    DEFAULT_REQUEST_TIMEOUT
}

fn default_task_timeout() -> Duration {
    DEFAULT_TASK_TIMEOUT
}

fn default_poll_interval() -> Duration {
    DEFAULT_POLL_INTERVAL
}

/// Timeouts are given in whole seconds.
fn secs_to_duration<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> ::std::result::Result<Duration, D::Error> {
    let secs: u64 = Deserialize::deserialize(deserializer)?;
    if secs == 0 {
        return Err(serde::de::Error::custom(
            "expecting a positive number of seconds",
        ));
    }
    Ok(Duration::from_secs(secs))
}

/// Where the controller is, who to log in as and where new volumes go.
#[derive(Deserialize, Clone)]
pub struct ViprConfig {
    pub hostname: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub username: String,
    /// Never logged.
    pub password: String,
    /// Empty for the root tenant of the logged in user.
    #[serde(default)]
    pub tenant: String,
    #[serde(default)]
    pub project: String,
    #[serde(default)]
    pub varray: String,
    #[serde(default)]
    pub verify_tls: bool,
    #[serde(default = "default_request_timeout")]
    #[serde(deserialize_with = "secs_to_duration")]
    pub request_timeout: Duration,
    #[serde(default = "default_task_timeout")]
    #[serde(deserialize_with = "secs_to_duration")]
    pub task_timeout: Duration,
    #[serde(default = "default_poll_interval")]
    #[serde(deserialize_with = "secs_to_duration")]
    pub poll_interval: Duration,
}

impl fmt::Debug for ViprConfig {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ViprConfig")
            .field("hostname", &self.hostname)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"********")
            .field("tenant", &self.tenant)
            .field("project", &self.project)
            .field("varray", &self.varray)
            .field("verify_tls", &self.verify_tls)
            .field("request_timeout", &self.request_timeout)
            .field("task_timeout", &self.task_timeout)
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}

impl ViprConfig {
    /// Config with defaults for everything but the controller address and
    /// credentials.
    pub fn new(hostname: &str, username: &str, password: &str) -> ViprConfig {
        ViprConfig {
            hostname: hostname.to_string(),
            port: DEFAULT_PORT,
            username: username.to_string(),
            password: password.to_string(),
            tenant: String::new(),
            project: String::new(),
            varray: String::new(),
            verify_tls: false,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            task_timeout: DEFAULT_TASK_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Read the configuration from `VIPR_*` environment variables.
    pub fn from_env() -> Result<ViprConfig> {
        ViprConfig::from_lookup(|k| env::var(k).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<ViprConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |k: &str| match lookup(k) {
            Some(ref v) if !v.is_empty() => Ok(v.to_string()),
            _ => Err(ViprError::InvalidArgument(format!(
                "Environment variable {} is not set",
                k
            ))),
        };
        let mut cfg = ViprConfig::new(
            &required(ENV_HOSTNAME)?,
            &required(ENV_USERNAME)?,
            &required(ENV_PASSWORD)?,
        );
        if let Some(p) = lookup(ENV_PORT) {
            cfg.port = p.parse::<u16>().map_err(|_| {
                ViprError::InvalidArgument(format!(
                    "Invalid {} '{}'",
                    ENV_PORT, p
                ))
            })?;
        }
        cfg.tenant = lookup(ENV_TENANT).unwrap_or_default();
        cfg.project = lookup(ENV_PROJECT).unwrap_or_default();
        cfg.varray = lookup(ENV_VARRAY).unwrap_or_default();
        cfg.verify_tls = lookup(ENV_VERIFY_TLS)
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        if let Some(t) = lookup(ENV_TASK_TIMEOUT) {
            cfg.task_timeout = parse_seconds(ENV_TASK_TIMEOUT, &t)?;
        }
        if let Some(t) = lookup(ENV_POLL_INTERVAL) {
            cfg.poll_interval = parse_seconds(ENV_POLL_INTERVAL, &t)?;
        }
        Ok(cfg)
    }

    /// `tenant/project` path used to resolve the project.
    pub fn project_path(&self) -> String {
        format!("{}/{}", self.tenant, self.project)
    }
}

fn parse_seconds(name: &str, val: &str) -> Result<Duration> {
    match val.parse::<u64>() {
        Ok(s) if s > 0 => Ok(Duration::from_secs(s)),
        _ => Err(ViprError::InvalidArgument(format!(
            "Invalid {} '{}', expecting a positive number of seconds",
            name, val
        ))),
    }
}
