//! Чтение длительности медиа через ffprobe
//!
//! ffprobe читает только заголовки и метаданные, для HTTP источников он
//! использует range-запросы, так что полная загрузка не нужна.
//! Проба никогда не возвращает ошибку: при любой проблеме отдается
//! значение по умолчанию для аудио или видео.

use std::ffi::OsStr;
use std::io::Write;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tokio::process::Command;

use crate::config::{AlignmentConfig, MediaConfig};
use crate::error::{DubError, Result};
use crate::media::{AudioBlob, MediaKind, MediaSource};

/// Сколько ждать ffprobe на одном ресурсе
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// Измеритель длительности медиа в секундах
#[async_trait]
pub trait DurationProbe: Send + Sync {
    /// Всегда возвращает неотрицательное число; при ошибке - значение по умолчанию
    async fn probe(&self, source: MediaSource<'_>, kind: MediaKind) -> f64;
}

/// Реализация на ffprobe
pub struct FfprobeDurationProbe {
    ffprobe: PathBuf,
    audio_fallback: f64,
    video_fallback: f64,
    timeout: Duration,
}

impl FfprobeDurationProbe {
    pub fn new(media: &MediaConfig, alignment: &AlignmentConfig) -> Self {
        Self {
            ffprobe: media.ffprobe(),
            audio_fallback: alignment.audio_fallback_secs,
            video_fallback: alignment.video_fallback_secs,
            timeout: PROBE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn measure(&self, source: MediaSource<'_>) -> Result<f64> {
        match source {
            MediaSource::Url(url) => self.read_duration(OsStr::new(url)).await,
            MediaSource::Blob(blob) => {
                // Временный файл живет только на время чтения и удаляется при любом исходе
                let spooled = spool_blob(blob)?;
                self.read_duration(spooled.path().as_os_str()).await
            }
        }
    }

    async fn read_duration(&self, target: &OsStr) -> Result<f64> {
        let mut cmd = Command::new(&self.ffprobe);
        cmd.args([
            "-v", "error",
            "-show_entries", "format=duration",
            "-of", "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(target)
        .stdin(Stdio::null())
        .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| DubError::Timeout(format!("ffprobe did not answer within {:?}", self.timeout)))??;

        if !output.status.success() {
            return Err(DubError::AudioProcessing(format!(
                "FFprobe command failed with status: {}",
                output.status
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_duration_output(&stdout).ok_or_else(|| {
            DubError::AudioProcessing(format!("Failed to parse media duration: {}", stdout.trim()))
        })
    }
}

#[async_trait]
impl DurationProbe for FfprobeDurationProbe {
    async fn probe(&self, source: MediaSource<'_>, kind: MediaKind) -> f64 {
        let measured = match self.measure(source).await {
            Ok(duration) => Some(duration),
            Err(e) => {
                log::warn!("Duration detection failed for {:?} source, using fallback: {}", kind, e);
                None
            }
        };
        resolve_duration(measured, kind, self.audio_fallback, self.video_fallback)
    }
}

/// Выбрать измеренное значение или значение по умолчанию.
///
/// Нулевая, отрицательная и нечисловая длительность считаются неизвестной.
pub fn resolve_duration(measured: Option<f64>, kind: MediaKind, audio_fallback: f64, video_fallback: f64) -> f64 {
    let fallback = match kind {
        MediaKind::Audio => audio_fallback,
        MediaKind::Video => video_fallback,
    };
    match measured {
        Some(duration) if duration.is_finite() && duration > 0.0 => duration,
        _ => fallback.max(0.0),
    }
}

/// Разобрать вывод `ffprobe -show_entries format=duration`
pub fn parse_duration_output(stdout: &str) -> Option<f64> {
    stdout
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .and_then(|line| line.parse::<f64>().ok())
}

fn spool_blob(blob: &AudioBlob) -> Result<NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix("probe_")
        .suffix(&format!(".{}", blob.extension()))
        .tempfile()?;
    file.as_file_mut().write_all(&blob.bytes)?;
    file.as_file_mut().flush()?;
    Ok(file)
}
