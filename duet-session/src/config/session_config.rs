use crate::error::{ConfigError, StartupError};
use crate::media::CaptureConstraints;
use crate::transport::TransportConfig;
use duet_core::utils::default_ice_servers;
use duet_core::{IceServerConfig, MemberId, RoomId};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_APP_ID: &str = "duet";
pub const DEFAULT_NEGOTIATION_TIMEOUT_MS: u64 = 30_000;

/// Everything a session needs before it starts.
///
/// Missing fields fall back to their defaults, so a config file only has to
/// name what it changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub app_id: String,
    /// `None` logs in anonymously.
    pub token: Option<String>,
    pub local_identity: MemberId,
    pub room: Option<RoomId>,
    pub ice_servers: Vec<IceServerConfig>,
    /// `None` disables the attempt deadline.
    pub negotiation_timeout_ms: Option<u64>,
    pub capture: CaptureConstraints,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            app_id: DEFAULT_APP_ID.to_owned(),
            token: None,
            local_identity: MemberId::generate(),
            room: None,
            ice_servers: default_ice_servers(),
            negotiation_timeout_ms: Some(DEFAULT_NEGOTIATION_TIMEOUT_MS),
            capture: CaptureConstraints::default(),
        }
    }
}

impl SessionConfig {
    pub fn new(room: impl Into<RoomId>) -> Self {
        Self {
            room: Some(room.into()),
            ..Default::default()
        }
    }

    pub fn with_identity(mut self, identity: impl Into<MemberId>) -> Self {
        self.local_identity = identity.into();
        self
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// The room to join; absent or blank is fatal.
    pub fn room(&self) -> Result<&RoomId, StartupError> {
        match &self.room {
            Some(room) if !room.as_str().trim().is_empty() => Ok(room),
            _ => Err(StartupError::MissingRoom),
        }
    }

    pub fn negotiation_timeout(&self) -> Option<Duration> {
        self.negotiation_timeout_ms.map(Duration::from_millis)
    }

    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig {
            ice_servers: self.ice_servers.clone(),
        }
    }
}
