use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Tenant key. Events missing it are dropped before dispatch.
pub const SITE_ID_KEY: &str = "page.site_id";

/// Session key used by the customer session processor.
pub const SESSION_UID_KEY: &str = "session.uid";

/// One tracking hit: an immutable flat mapping of dotted keys
/// (`page.product.id`, `session.uid`, ...) to string values. The wire format
/// implies no nesting; processors rebuild structure from the dots.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct TrackedEvent {
    #[serde(flatten)]
    params: HashMap<String, String>,
}

impl TrackedEvent {
    pub fn from_params(params: HashMap<String, String>) -> Self {
        Self { params }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// The tenant owning this hit, if any.
    pub fn site_id(&self) -> Option<&str> {
        self.get(SITE_ID_KEY)
    }

    pub fn session_uid(&self) -> Option<&str> {
        self.get(SESSION_UID_KEY)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }
}
