use crate::error::CaptureError;
use crate::media::{CaptureConstraints, LocalMedia, LocalTrack, MediaCapture};
use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use webrtc::media::Sample;

/// A single Opus frame that decodes to 20 ms of silence.
const OPUS_SILENCE: [u8; 3] = [0xf8, 0xff, 0xfe];
const AUDIO_FRAME: Duration = Duration::from_millis(20);

/// Placeholder VP8 payload. Not a decodable picture; it keeps RTP flowing so
/// the remote side sees the track.
const VP8_PLACEHOLDER: [u8; 10] = [0x10, 0x02, 0x00, 0x9d, 0x01, 0x2a, 0x02, 0x00, 0x02, 0x00];
const VIDEO_FRAME: Duration = Duration::from_millis(100);

/// Capture stand-in for headless runs: an Opus track fed with silence and a
/// VP8 track fed with a placeholder frame, each only while its gate is open.
pub struct SyntheticCapture {
    stream_id: String,
    pumps: Mutex<Vec<JoinHandle<()>>>,
}

impl SyntheticCapture {
    pub fn new(stream_id: impl Into<String>) -> Self {
        Self {
            stream_id: stream_id.into(),
            pumps: Mutex::new(Vec::new()),
        }
    }

    fn spawn_pump(track: LocalTrack, payload: &'static [u8], frame: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let rtc = track.rtc_track();
            let mut ticker = tokio::time::interval(frame);
            loop {
                ticker.tick().await;
                if !track.is_enabled() {
                    continue;
                }
                let sample = Sample {
                    data: Bytes::from_static(payload),
                    duration: frame,
                    ..Default::default()
                };
                if let Err(e) = rtc.write_sample(&sample).await {
                    debug!("Synthetic {} write failed: {}", track.kind(), e);
                }
            }
        })
    }
}

impl Default for SyntheticCapture {
    fn default() -> Self {
        Self::new("duet-local")
    }
}

#[async_trait]
impl MediaCapture for SyntheticCapture {
    async fn acquire(&self, constraints: &CaptureConstraints) -> Result<LocalMedia, CaptureError> {
        let mut tracks = Vec::new();

        if constraints.audio {
            let audio = LocalTrack::opus(&self.stream_id);
            self.pumps.lock().await.push(Self::spawn_pump(
                audio.clone(),
                &OPUS_SILENCE,
                AUDIO_FRAME,
            ));
            tracks.push(audio);
        }

        if let Some(video) = constraints.video {
            debug!(
                "Synthetic video track at {}x{}",
                video.width.ideal, video.height.ideal
            );
            let video = LocalTrack::vp8(&self.stream_id);
            self.pumps.lock().await.push(Self::spawn_pump(
                video.clone(),
                &VP8_PLACEHOLDER,
                VIDEO_FRAME,
            ));
            tracks.push(video);
        }

        if tracks.is_empty() {
            return Err(CaptureError::Backend(
                "constraints request neither audio nor video".to_owned(),
            ));
        }

        info!("Synthetic capture acquired {} track(s)", tracks.len());
        Ok(LocalMedia::new(tracks))
    }

    async fn release(&self, media: &LocalMedia) {
        for track in media.tracks() {
            track.set_enabled(false);
        }
        for pump in self.pumps.lock().await.drain(..) {
            pump.abort();
        }
    }
}
