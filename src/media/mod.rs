//! Модуль для работы с медиа
//!
//! Извлечение аудио из видео, чтение длительности, проверка внешних
//! инструментов и ссылок на референсные видео.

pub mod extract;
pub mod probe;
pub mod tools;
pub mod validate;

use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{DubError, Result};

pub use extract::{AudioExtractor, FfmpegAudioExtractor, RemoteAudioExtractor};
pub use probe::{DurationProbe, FfprobeDurationProbe};
pub use tools::{check_media_tools, ExternalTool};
pub use validate::validate_reference_video_url;

/// Аудио в памяти вместе с типом содержимого
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioBlob {
    pub bytes: Bytes,
    pub content_type: String,
}

impl AudioBlob {
    pub fn new(bytes: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: content_type.into(),
        }
    }

    /// Декодировать base64; пробелы и переносы строк игнорируются
    pub fn from_base64(data: &str, content_type: impl Into<String>) -> Result<Self> {
        let compact: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        let bytes = STANDARD.decode(compact.as_bytes())?;
        if bytes.is_empty() {
            return Err(DubError::Decode("audio payload is empty".to_string()));
        }
        Ok(Self::new(bytes, content_type))
    }

    /// Прочитать аудиофайл; тип содержимого определяется по расширению
    pub async fn from_file(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        if bytes.is_empty() {
            return Err(DubError::InvalidInput(format!("Audio file is empty: {}", path.display())));
        }
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        Ok(Self::new(bytes, content_type_for_extension(&extension)))
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Расширение файла по типу содержимого
    pub fn extension(&self) -> &'static str {
        let essence = self
            .content_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "audio/mpeg" | "audio/mp3" => "mp3",
            "audio/wav" | "audio/x-wav" | "audio/wave" => "wav",
            "audio/ogg" => "ogg",
            "audio/webm" => "webm",
            "audio/mp4" | "audio/aac" => "m4a",
            "audio/flac" => "flac",
            _ => "bin",
        }
    }
}

fn content_type_for_extension(extension: &str) -> &'static str {
    match extension {
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" | "oga" => "audio/ogg",
        "webm" => "audio/webm",
        "m4a" | "aac" => "audio/mp4",
        "flac" => "audio/flac",
        _ => "application/octet-stream",
    }
}

/// Аудиодорожка, извлеченная из видео, в транспортном виде
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedAudio {
    pub audio_base64: String,
    pub content_type: String,
}

impl ExtractedAudio {
    pub fn decode(&self) -> Result<AudioBlob> {
        AudioBlob::from_base64(&self.audio_base64, self.content_type.clone())
    }
}

/// Что измерять: удаленный ресурс или аудио в памяти
#[derive(Debug, Clone, Copy)]
pub enum MediaSource<'a> {
    Url(&'a str),
    Blob(&'a AudioBlob),
}

/// Тип ресурса определяет значение по умолчанию при ошибке чтения
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Audio,
    Video,
}
