//! Process configuration.
//!
//! Read once from the environment at startup:
//!
//! | Variable                  | Default                        |
//! |---------------------------|--------------------------------|
//! | `HIGHLANDER_RESOURCES`    | required, `group/version/Kind` list |
//! | `HIGHLANDER_WEBHOOK_PORT` | `9443`                         |
//! | `HIGHLANDER_HEALTH_PORT`  | `8080`                         |
//! | `HIGHLANDER_CERT_PATH`    | `/etc/webhook/certs/tls.crt`   |
//! | `HIGHLANDER_KEY_PATH`     | `/etc/webhook/certs/tls.key`   |

use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::gate::identity::ResourceIdentity;
use crate::gate::{WEBHOOK_CERT_PATH, WEBHOOK_KEY_PATH, WEBHOOK_PORT};
use crate::health::HEALTH_PORT;

pub const RESOURCES_ENV: &str = "HIGHLANDER_RESOURCES";
pub const WEBHOOK_PORT_ENV: &str = "HIGHLANDER_WEBHOOK_PORT";
pub const HEALTH_PORT_ENV: &str = "HIGHLANDER_HEALTH_PORT";
pub const CERT_PATH_ENV: &str = "HIGHLANDER_CERT_PATH";
pub const KEY_PATH_ENV: &str = "HIGHLANDER_KEY_PATH";

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Kinds to protect, one gate each
    pub resources: Vec<ResourceIdentity>,
    pub webhook_port: u16,
    pub health_port: u16,
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw = lookup(RESOURCES_ENV)
            .ok_or_else(|| Error::Config(format!("{} is not set", RESOURCES_ENV)))?;
        let resources = parse_resources(&raw)?;

        Ok(Self {
            resources,
            webhook_port: parse_port(&lookup, WEBHOOK_PORT_ENV, WEBHOOK_PORT)?,
            health_port: parse_port(&lookup, HEALTH_PORT_ENV, HEALTH_PORT)?,
            cert_path: lookup(CERT_PATH_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(WEBHOOK_CERT_PATH)),
            key_path: lookup(KEY_PATH_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(WEBHOOK_KEY_PATH)),
        })
    }
}

/// Parse a comma-separated list of identities, dropping duplicates.
pub fn parse_resources(raw: &str) -> Result<Vec<ResourceIdentity>> {
    let mut resources: Vec<ResourceIdentity> = Vec::new();
    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let identity: ResourceIdentity = entry.parse()?;
        if !resources.contains(&identity) {
            resources.push(identity);
        }
    }

    if resources.is_empty() {
        return Err(Error::Config(format!(
            "{} must name at least one group/version/Kind",
            RESOURCES_ENV
        )));
    }
    Ok(resources)
}

fn parse_port<F>(lookup: &F, key: &str, default: u16) -> Result<u16>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("{} must be a port number, got '{}'", key, value))),
        None => Ok(default),
    }
}
