use crate::error::CaptureError;
use crate::media::LocalMedia;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionRange {
    pub min: u32,
    pub ideal: u32,
    pub max: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoConstraints {
    pub width: DimensionRange,
    pub height: DimensionRange,
}

impl Default for VideoConstraints {
    fn default() -> Self {
        Self {
            width: DimensionRange {
                min: 640,
                ideal: 1920,
                max: 1920,
            },
            height: DimensionRange {
                min: 480,
                ideal: 1080,
                max: 1080,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureConstraints {
    pub audio: bool,
    pub video: Option<VideoConstraints>,
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self {
            audio: true,
            video: Some(VideoConstraints::default()),
        }
    }
}

/// Source of local audio/video tracks (camera, microphone, or a stand-in).
#[async_trait]
pub trait MediaCapture: Send + Sync {
    async fn acquire(&self, constraints: &CaptureConstraints) -> Result<LocalMedia, CaptureError>;

    /// Stops feeding the tracks handed out by `acquire`.
    async fn release(&self, media: &LocalMedia);
}
