//! Извлечение аудиодорожки из видео
//!
//! Две реализации: локальный ffmpeg и внешний HTTP сервис с тем же
//! контрактом `{video_url}` -> `{audio_base64, content_type}`.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::Client;
use serde::Deserialize;
use tokio::process::Command;

use crate::config::MediaConfig;
use crate::error::{DubError, Result};
use crate::media::ExtractedAudio;

/// Извлекает аудио из видео по ссылке
#[async_trait]
pub trait AudioExtractor: Send + Sync {
    async fn extract(&self, video_url: &str) -> Result<ExtractedAudio>;
}

/// Извлечение через ffmpeg в mp3
pub struct FfmpegAudioExtractor {
    ffmpeg: PathBuf,
    timeout: Duration,
}

impl FfmpegAudioExtractor {
    pub fn new(media: &MediaConfig) -> Self {
        Self {
            ffmpeg: media.ffmpeg(),
            timeout: media.extraction_timeout,
        }
    }
}

#[async_trait]
impl AudioExtractor for FfmpegAudioExtractor {
    async fn extract(&self, video_url: &str) -> Result<ExtractedAudio> {
        let video_url = video_url.trim();
        if video_url.is_empty() {
            return Err(DubError::InvalidInput("video_url is required".to_string()));
        }
        // ffmpeg принял бы такую строку за опцию
        if video_url.starts_with('-') {
            return Err(DubError::InvalidInput(format!("Refusing suspicious video url: {}", video_url)));
        }

        // Файл удаляется при выходе из функции, в том числе по ошибке или таймауту
        let output_file = tempfile::Builder::new()
            .prefix("audio_")
            .suffix(".mp3")
            .tempfile()?;
        let output_path = output_file.path().to_path_buf();

        log::info!("[Extract] Extracting audio from: {}", video_url);

        let mut cmd = Command::new(&self.ffmpeg);
        cmd.args(["-i", video_url])
            .args(["-vn", "-acodec", "libmp3lame", "-q:a", "2", "-y"])
            .arg(&output_path)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| DubError::Timeout(format!("ffmpeg timeout after {:?}", self.timeout)))??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail: Vec<&str> = stderr.lines().rev().take(5).collect();
            log::error!("[Extract] Error: {}", tail.into_iter().rev().collect::<Vec<_>>().join(" | "));
            return Err(DubError::AudioProcessing(format!(
                "Failed to extract audio (ffmpeg exited with {})",
                output.status
            )));
        }

        let audio_data = tokio::fs::read(&output_path).await?;
        drop(output_file);

        if audio_data.is_empty() {
            return Err(DubError::AudioProcessing("ffmpeg produced an empty audio track".to_string()));
        }

        log::info!("[Extract] Audio extracted successfully, size: {} bytes", audio_data.len());

        Ok(ExtractedAudio {
            audio_base64: STANDARD.encode(&audio_data),
            content_type: "audio/mpeg".to_string(),
        })
    }
}

/// Извлечение через внешний сервис
pub struct RemoteAudioExtractor {
    client: Client,
    endpoint: String,
}

impl RemoteAudioExtractor {
    pub fn new(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[derive(Deserialize)]
struct ExtractErrorBody {
    error: String,
}

#[async_trait]
impl AudioExtractor for RemoteAudioExtractor {
    async fn extract(&self, video_url: &str) -> Result<ExtractedAudio> {
        if video_url.trim().is_empty() {
            return Err(DubError::InvalidInput("video_url is required".to_string()));
        }

        let response = self
            .client
            .post(&self.endpoint)
            .json(&serde_json::json!({ "video_url": video_url }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ExtractErrorBody>(&body)
                .map(|b| b.error)
                .unwrap_or(body);
            return Err(DubError::Api {
                provider: "extractor",
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json::<ExtractedAudio>().await?)
    }
}
