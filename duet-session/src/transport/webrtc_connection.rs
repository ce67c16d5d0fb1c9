use crate::error::NegotiationError;
use crate::negotiation::AttemptId;
use crate::transport::{
    PathState, PeerConnection, PeerConnectionFactory, PeerContext, PeerEvent, TransportConfig,
};
use async_trait::async_trait;
use duet_core::{MemberId, PathCandidate, SdpKind, SessionDescription, TrackKind};
use std::sync::Arc;
use tracing::{debug, info, warn};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::track::track_local::TrackLocal;

/// Builds [`WebRtcConnection`]s on top of the `webrtc` crate.
#[derive(Clone, Default)]
pub struct WebRtcPeerFactory {
    config: TransportConfig,
}

impl WebRtcPeerFactory {
    pub fn new(config: TransportConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl PeerConnectionFactory for WebRtcPeerFactory {
    async fn create(&self, ctx: PeerContext) -> Result<Arc<dyn PeerConnection>, NegotiationError> {
        let connection = WebRtcConnection::new(ctx, &self.config)
            .await
            .map_err(|e| NegotiationError::PeerConnection(e.to_string()))?;
        Ok(Arc::new(connection))
    }
}

pub struct WebRtcConnection {
    attempt: AttemptId,
    member: MemberId,
    peer_connection: Arc<RTCPeerConnection>,
}

impl WebRtcConnection {
    /// Creates the connection, attaches the local tracks and forwards its
    /// callbacks into `ctx.events` tagged with the attempt.
    pub async fn new(ctx: PeerContext, config: &TransportConfig) -> Result<Self, webrtc::Error> {
        let PeerContext {
            attempt,
            member,
            media,
            events,
        } = ctx;

        let mut m = MediaEngine::default();
        m.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut m)?;

        let api = APIBuilder::new()
            .with_media_engine(m)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: config.rtc_ice_servers(),
            ..Default::default()
        };

        let peer_connection = Arc::new(api.new_peer_connection(rtc_config).await?);

        for track in media.tracks() {
            let sender = peer_connection
                .add_track(track.rtc_track() as Arc<dyn TrackLocal + Send + Sync>)
                .await?;
            // RTCP has to be read for interceptors (NACK, reports) to run.
            tokio::spawn(async move {
                let mut rtcp_buf = vec![0u8; 1500];
                while sender.read(&mut rtcp_buf).await.is_ok() {}
            });
        }

        let state_tx = events.clone();
        let uid_state = member.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |s: RTCPeerConnectionState| {
                let tx = state_tx.clone();
                let uid = uid_state.clone();

                Box::pin(async move {
                    info!("Peer connection to {} ({}) is {:?}", uid, attempt, s);
                    let _ = tx.send(PeerEvent::PathStateChanged(attempt, PathState::from(s)));
                })
            },
        ));

        let ice_tx = events.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let tx = ice_tx.clone();

            Box::pin(async move {
                let Some(candidate) = c else { return };
                let Ok(init) = candidate.to_json() else {
                    return;
                };
                let candidate = PathCandidate {
                    candidate: init.candidate,
                    sdp_mid: init.sdp_mid,
                    sdp_m_line_index: init.sdp_mline_index,
                    username_fragment: init.username_fragment,
                };
                let _ = tx.send(PeerEvent::CandidateDiscovered(attempt, candidate));
            })
        }));

        let track_tx = events;
        let uid_track = member.clone();
        peer_connection.on_track(Box::new(move |track, _receiver, _transceiver| {
            let tx = track_tx.clone();
            let uid = uid_track.clone();

            Box::pin(async move {
                let kind = match track.kind() {
                    RTPCodecType::Audio => TrackKind::Audio,
                    RTPCodecType::Video => TrackKind::Video,
                    _ => return,
                };
                debug!("Remote {} track from {} ({})", kind, uid, attempt);
                let _ = tx.send(PeerEvent::RemoteTrack(attempt, kind));

                // Rendering lives outside this crate; keep the receive buffers moving.
                tokio::spawn(async move {
                    let mut buf = vec![0u8; 1500];
                    while track.read(&mut buf).await.is_ok() {}
                });
            })
        }));

        Ok(Self {
            attempt,
            member,
            peer_connection,
        })
    }

    fn to_rtc(desc: SessionDescription) -> Result<RTCSessionDescription, NegotiationError> {
        let parsed = match desc.kind {
            SdpKind::Offer => RTCSessionDescription::offer(desc.sdp),
            SdpKind::Answer => RTCSessionDescription::answer(desc.sdp),
        };
        parsed.map_err(|e| NegotiationError::MalformedDescription(e.to_string()))
    }
}

#[async_trait]
impl PeerConnection for WebRtcConnection {
    async fn create_offer(&self) -> Result<SessionDescription, NegotiationError> {
        let offer = self
            .peer_connection
            .create_offer(None)
            .await
            .map_err(|e| NegotiationError::DescriptionFailed(e.to_string()))?;
        Ok(SessionDescription::offer(offer.sdp))
    }

    async fn create_answer(&self) -> Result<SessionDescription, NegotiationError> {
        let answer = self
            .peer_connection
            .create_answer(None)
            .await
            .map_err(|e| NegotiationError::DescriptionFailed(e.to_string()))?;
        Ok(SessionDescription::answer(answer.sdp))
    }

    async fn set_local_description(
        &self,
        desc: SessionDescription,
    ) -> Result<(), NegotiationError> {
        let desc = Self::to_rtc(desc)?;
        self.peer_connection
            .set_local_description(desc)
            .await
            .map_err(|e| NegotiationError::DescriptionFailed(e.to_string()))
    }

    async fn set_remote_description(
        &self,
        desc: SessionDescription,
    ) -> Result<(), NegotiationError> {
        let desc = Self::to_rtc(desc)?;
        self.peer_connection
            .set_remote_description(desc)
            .await
            .map_err(|e| NegotiationError::IncompatibleDescription(e.to_string()))
    }

    async fn add_candidate(&self, candidate: PathCandidate) -> Result<(), NegotiationError> {
        let init = RTCIceCandidateInit {
            candidate: candidate.candidate,
            sdp_mid: candidate.sdp_mid,
            sdp_mline_index: candidate.sdp_m_line_index,
            username_fragment: candidate.username_fragment,
        };
        self.peer_connection
            .add_ice_candidate(init)
            .await
            .map_err(|e| NegotiationError::CandidateRejected(e.to_string()))
    }

    async fn close(&self) -> Result<(), NegotiationError> {
        debug!("Closing peer connection to {} ({})", self.member, self.attempt);
        if let Err(e) = self.peer_connection.close().await {
            warn!(
                "Closing peer connection to {} ({}) failed: {}",
                self.member, self.attempt, e
            );
            return Err(NegotiationError::PeerConnection(e.to_string()));
        }
        Ok(())
    }
}
