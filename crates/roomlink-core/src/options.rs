use serde::{Deserialize, Serialize};

/// Caller overrides for the session's room options. Unset fields keep
/// the defaults of [`SessionSettings`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionOptions {
    pub adaptive_stream: Option<bool>,
    pub dynacast: Option<bool>,
}

/// Effective session options handed to the session when it is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    pub adaptive_stream: bool,
    pub dynacast: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            adaptive_stream: true,
            dynacast: true,
        }
    }
}

impl SessionSettings {
    /// Defaults overlaid with the caller's overrides; the caller wins.
    pub fn merged(overrides: Option<&SessionOptions>) -> Self {
        let defaults = Self::default();
        let Some(o) = overrides else { return defaults };
        Self {
            adaptive_stream: o.adaptive_stream.unwrap_or(defaults.adaptive_stream),
            dynacast: o.dynacast.unwrap_or(defaults.dynacast),
        }
    }
}

/// Caller overrides for a single connect call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectOptions {
    pub auto_subscribe: Option<bool>,
    /// Join attempts made by the session before giving up.
    pub join_retries: Option<u32>,
}

/// Effective options for one connect call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectSettings {
    pub auto_subscribe: bool,
    /// `None` leaves the session's own default in place.
    pub join_retries: Option<u32>,
}

impl Default for ConnectSettings {
    fn default() -> Self {
        Self {
            auto_subscribe: true,
            join_retries: None,
        }
    }
}

impl ConnectSettings {
    pub fn merged(overrides: Option<&ConnectOptions>) -> Self {
        let defaults = Self::default();
        let Some(o) = overrides else { return defaults };
        Self {
            auto_subscribe: o.auto_subscribe.unwrap_or(defaults.auto_subscribe),
            join_retries: o.join_retries.or(defaults.join_retries),
        }
    }
}
