use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;
use tubely_core::AspectRatio;

use super::{parse_ffprobe_output, ProbeError};

/// Extracts structural metadata from a file resident on local disk.
#[async_trait]
pub trait MediaProbe: Send + Sync {
    async fn probe_aspect_ratio(&self, path: &Path) -> Result<AspectRatio, ProbeError>;
}

/// [`MediaProbe`] backed by the `ffprobe` executable.
#[derive(Debug, Clone)]
pub struct FfprobeProbe {
    ffprobe_path: String,
}

impl FfprobeProbe {
    pub fn new(ffprobe_path: impl Into<String>) -> Self {
        Self {
            ffprobe_path: ffprobe_path.into(),
        }
    }
}

impl Default for FfprobeProbe {
    fn default() -> Self {
        Self::new("ffprobe")
    }
}

#[async_trait]
impl MediaProbe for FfprobeProbe {
    #[tracing::instrument(skip(self), fields(
        process.executable.name = "ffprobe",
        process.executable.path = %self.ffprobe_path,
    ))]
    async fn probe_aspect_ratio(&self, path: &Path) -> Result<AspectRatio, ProbeError> {
        let start = std::time::Instant::now();

        let output = Command::new(&self.ffprobe_path)
            .args(["-v", "error", "-print_format", "json", "-show_streams"])
            .arg(path)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(ProbeError::Spawn)?;

        if !output.status.success() {
            return Err(ProbeError::NonZeroExit {
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let ratio = parse_ffprobe_output(&output.stdout)?;

        tracing::debug!(
            aspect_ratio = %ratio,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "ffprobe completed"
        );

        Ok(ratio)
    }
}
