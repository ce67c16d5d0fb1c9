use duet_core::IceServerConfig;
use duet_core::utils::default_ice_servers;
use webrtc::ice_transport::ice_server::RTCIceServer;

/// ICE configuration for the WebRTC backend.
#[derive(Clone, Debug)]
pub struct TransportConfig {
    pub ice_servers: Vec<IceServerConfig>,
}

impl TransportConfig {
    /// Host candidates only; enough for peers on one machine or LAN.
    pub fn host_only() -> Self {
        Self {
            ice_servers: Vec::new(),
        }
    }

    pub(crate) fn rtc_ice_servers(&self) -> Vec<RTCIceServer> {
        self.ice_servers
            .iter()
            .map(|server| RTCIceServer {
                urls: server.urls.clone(),
                username: server.username.clone().unwrap_or_default(),
                credential: server.credential.clone().unwrap_or_default(),
                ..Default::default()
            })
            .collect()
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            ice_servers: default_ice_servers(),
        }
    }
}
