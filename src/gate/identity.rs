//! Identity of the protected resource type.
//!
//! A [`ResourceIdentity`] is the (group, version, kind) triple a gate is bound
//! to. It is resolved once at startup, either statically from a typed
//! [`kube::Resource`] or by API discovery for kinds named in configuration,
//! and also determines the webhook route the gate is served under.

use std::fmt;
use std::str::FromStr;

use kube::Client;
use kube::Resource;
use kube::core::{ApiResource, GroupVersionKind};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Prefix shared by every gate route
pub const ROUTE_PREFIX: &str = "/highlander-";

/// The (group, version, kind) triple identifying a protected resource type.
///
/// The core API group is the empty string, so `v1/ConfigMap` has `group == ""`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceIdentity {
    pub group: String,
    pub version: String,
    pub kind: String,
}

impl ResourceIdentity {
    pub fn new(
        group: impl Into<String>,
        version: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            kind: kind.into(),
        }
    }

    /// Identity of a statically typed resource.
    pub fn of<K>() -> Self
    where
        K: Resource<DynamicType = ()>,
    {
        Self::new(K::group(&()), K::version(&()), K::kind(&()))
    }

    /// Whether an incoming request's kind is the one this identity names.
    ///
    /// Comparison is exact on all three fields.
    pub fn matches(&self, gvk: &GroupVersionKind) -> bool {
        self.group == gvk.group && self.version == gvk.version && self.kind == gvk.kind
    }

    /// Derive the webhook route for this identity.
    ///
    /// Dots in the group become dashes and the kind is lower-cased, e.g.
    /// `apps.example.io/v1/Widget` maps to `/highlander-apps-example-io-v1-widget`.
    pub fn route(&self) -> String {
        format!(
            "{}{}-{}-{}",
            ROUTE_PREFIX,
            self.group.replace('.', "-"),
            self.version,
            self.kind.to_lowercase()
        )
    }

    pub fn to_gvk(&self) -> GroupVersionKind {
        GroupVersionKind::gvk(&self.group, &self.version, &self.kind)
    }

    /// Best-effort `ApiResource` without talking to the cluster.
    ///
    /// The plural is guessed from the kind; prefer [`ResourceIdentity::discover`]
    /// for kinds with irregular plurals.
    pub fn guess_api_resource(&self) -> ApiResource {
        ApiResource::from_gvk(&self.to_gvk())
    }

    /// Resolve this identity against the cluster's discovery endpoints.
    ///
    /// Fails with [`Error::Lookup`] if the API server does not serve the kind.
    pub async fn discover(&self, client: &Client) -> Result<ApiResource> {
        match kube::discovery::pinned_kind(client, &self.to_gvk()).await {
            Ok((resource, _caps)) => Ok(resource),
            Err(kube::Error::Api(e)) if e.code == 404 => Err(Error::Lookup(format!(
                "{} is not served by the API server",
                self
            ))),
            Err(kube::Error::Discovery(e)) => Err(Error::Lookup(format!("{}: {}", self, e))),
            Err(e) => Err(Error::Discovery(e)),
        }
    }
}

impl From<GroupVersionKind> for ResourceIdentity {
    fn from(gvk: GroupVersionKind) -> Self {
        Self::new(gvk.group, gvk.version, gvk.kind)
    }
}

impl From<&ApiResource> for ResourceIdentity {
    fn from(resource: &ApiResource) -> Self {
        Self::new(&resource.group, &resource.version, &resource.kind)
    }
}

impl fmt::Display for ResourceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            write!(f, "{}/{}", self.version, self.kind)
        } else {
            write!(f, "{}/{}/{}", self.group, self.version, self.kind)
        }
    }
}

/// Parses `group/version/Kind`, or `version/Kind` for the core group.
impl FromStr for ResourceIdentity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.trim().split('/').map(str::trim).collect();
        let identity = match parts.as_slice() {
            [version, kind] => Self::new("", *version, *kind),
            [group, version, kind] => Self::new(*group, *version, *kind),
            _ => {
                return Err(Error::InvalidIdentity(format!(
                    "expected group/version/Kind, got '{}'",
                    s
                )));
            }
        };

        if identity.version.is_empty() || identity.kind.is_empty() {
            return Err(Error::InvalidIdentity(format!(
                "version and kind must not be empty in '{}'",
                s
            )));
        }

        Ok(identity)
    }
}
