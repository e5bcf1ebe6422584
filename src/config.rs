//! Модуль конфигурации библиотеки motiondub
//!
//! Все значения читаются из переменных окружения (с подхватом `.env`),
//! у каждого есть значение по умолчанию, кроме ключей провайдеров.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DubError, Result};

/// Адрес API Kling по умолчанию
pub const DEFAULT_KLING_API_BASE: &str = "https://api-singapore.klingai.com";
/// Адрес API ElevenLabs по умолчанию
pub const DEFAULT_ELEVENLABS_API_BASE: &str = "https://api.elevenlabs.io";

/// Запас по длительности, вычитаемый из минимальной длительности аудио/видео (секунды)
pub const DEFAULT_SAFETY_MARGIN_SECS: f64 = 0.2;
/// Длительность аудио, если ее не удалось определить
pub const AUDIO_FALLBACK_SECS: f64 = 0.0;
/// Длительность видео, если ее не удалось определить
pub const VIDEO_FALLBACK_SECS: f64 = 5.0;

/// Ограничение на извлечение аудио из видео
pub const DEFAULT_EXTRACTION_TIMEOUT: Duration = Duration::from_secs(60);
/// Таймаут HTTP запросов к провайдерам
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(60);
/// Пауза перед обновлением списка задач после отправки
pub const DEFAULT_REFRESH_DELAY: Duration = Duration::from_millis(2000);
/// Размер страницы при запросе списков задач
pub const DEFAULT_TASK_PAGE_SIZE: u32 = 30;

/// Настройки Kling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KlingConfig {
    pub api_base: String,
    pub access_key: String,
    #[serde(default, skip_serializing)]
    pub secret_key: String,
    /// Размер страницы для списков motion и lip-sync задач
    pub task_page_size: u32,
}

impl Default for KlingConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_KLING_API_BASE.to_string(),
            access_key: String::new(),
            secret_key: String::new(),
            task_page_size: DEFAULT_TASK_PAGE_SIZE,
        }
    }
}

/// Настройки ElevenLabs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElevenLabsConfig {
    pub api_base: String,
    #[serde(default, skip_serializing)]
    pub api_key: String,
    /// Голос по умолчанию для переозвучки
    pub default_voice_id: String,
}

impl Default for ElevenLabsConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_ELEVENLABS_API_BASE.to_string(),
            api_key: String::new(),
            default_voice_id: String::new(),
        }
    }
}

/// Параметры выравнивания длительности и громкости для lip-sync
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AlignmentConfig {
    /// Запас в секундах, вычитаемый из min(аудио, видео)
    pub safety_margin_secs: f64,
    /// Длительность аудио при ошибке чтения метаданных
    pub audio_fallback_secs: f64,
    /// Длительность видео при ошибке чтения метаданных
    pub video_fallback_secs: f64,
    /// Громкость оригинальной дорожки (0.0 - полностью заменить)
    pub original_audio_volume: f32,
    /// Громкость новой дорожки
    pub sound_volume: f32,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            safety_margin_secs: DEFAULT_SAFETY_MARGIN_SECS,
            audio_fallback_secs: AUDIO_FALLBACK_SECS,
            video_fallback_secs: VIDEO_FALLBACK_SECS,
            original_audio_volume: 0.0,
            sound_volume: 1.0,
        }
    }
}

/// Настройки работы с медиа
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Путь к ffmpeg, если не в PATH
    pub ffmpeg_path: Option<PathBuf>,
    /// Путь к ffprobe, если не в PATH
    pub ffprobe_path: Option<PathBuf>,
    /// Внешний сервис извлечения аудио; локальный ffmpeg, если не задан
    pub extract_audio_endpoint: Option<String>,
    #[serde(with = "duration_secs")]
    pub extraction_timeout: Duration,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            ffprobe_path: None,
            extract_audio_endpoint: None,
            extraction_timeout: DEFAULT_EXTRACTION_TIMEOUT,
        }
    }
}

impl MediaConfig {
    pub fn ffmpeg(&self) -> PathBuf {
        self.ffmpeg_path.clone().unwrap_or_else(|| PathBuf::from("ffmpeg"))
    }

    pub fn ffprobe(&self) -> PathBuf {
        self.ffprobe_path.clone().unwrap_or_else(|| PathBuf::from("ffprobe"))
    }
}

/// Референсное видео для генерации движения
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VideoSource {
    pub label: String,
    pub url: String,
}

/// Конфигурация библиотеки
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DubConfig {
    pub kling: KlingConfig,
    pub elevenlabs: ElevenLabsConfig,
    pub alignment: AlignmentConfig,
    pub media: MediaConfig,
    pub video_sources: Vec<VideoSource>,
    #[serde(with = "duration_secs")]
    pub http_timeout: Duration,
    #[serde(with = "duration_secs")]
    pub refresh_delay: Duration,
}

impl Default for DubConfig {
    fn default() -> Self {
        Self {
            kling: KlingConfig::default(),
            elevenlabs: ElevenLabsConfig::default(),
            alignment: AlignmentConfig::default(),
            media: MediaConfig::default(),
            video_sources: Vec::new(),
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            refresh_delay: DEFAULT_REFRESH_DELAY,
        }
    }
}

impl DubConfig {
    /// Загрузить конфигурацию из окружения, предварительно подхватив `.env`
    pub fn from_env() -> Result<Self> {
        match dotenvy::dotenv() {
            Ok(path) => log::info!("Loaded environment from {}", path.display()),
            Err(_) => log::debug!("No .env file found, using process environment"),
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Собрать конфигурацию из произвольного источника переменных
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let kling = KlingConfig {
            api_base: get("KLING_API_BASE").unwrap_or(defaults.kling.api_base),
            access_key: get("KLING_ACCESS_KEY").unwrap_or_default(),
            secret_key: get("KLING_SECRET_KEY").unwrap_or_default(),
            task_page_size: parse_var("TASK_PAGE_SIZE", get("TASK_PAGE_SIZE"))?
                .unwrap_or(DEFAULT_TASK_PAGE_SIZE),
        };

        let elevenlabs = ElevenLabsConfig {
            api_base: get("ELEVENLABS_API_BASE").unwrap_or(defaults.elevenlabs.api_base),
            api_key: get("ELEVENLABS_API_KEY").unwrap_or_default(),
            default_voice_id: get("ELEVENLABS_VOICE_ID").unwrap_or_default(),
        };

        let alignment = AlignmentConfig {
            safety_margin_secs: parse_var("SYNC_SAFETY_MARGIN_SECS", get("SYNC_SAFETY_MARGIN_SECS"))?
                .unwrap_or(DEFAULT_SAFETY_MARGIN_SECS),
            audio_fallback_secs: parse_var("AUDIO_FALLBACK_SECS", get("AUDIO_FALLBACK_SECS"))?
                .unwrap_or(AUDIO_FALLBACK_SECS),
            video_fallback_secs: parse_var("VIDEO_FALLBACK_SECS", get("VIDEO_FALLBACK_SECS"))?
                .unwrap_or(VIDEO_FALLBACK_SECS),
            ..AlignmentConfig::default()
        };
        if alignment.safety_margin_secs < 0.0 {
            return Err(DubError::Configuration(
                "SYNC_SAFETY_MARGIN_SECS must not be negative".to_string(),
            ));
        }

        let media = MediaConfig {
            ffmpeg_path: get("FFMPEG_PATH").map(PathBuf::from),
            ffprobe_path: get("FFPROBE_PATH").map(PathBuf::from),
            extract_audio_endpoint: get("EXTRACT_AUDIO_ENDPOINT"),
            extraction_timeout: parse_var("EXTRACTION_TIMEOUT_SECS", get("EXTRACTION_TIMEOUT_SECS"))?
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_EXTRACTION_TIMEOUT),
        };

        Ok(Self {
            kling,
            elevenlabs,
            alignment,
            media,
            video_sources: parse_video_sources(get("VIDEO_SOURCES").as_deref().unwrap_or("")),
            http_timeout: parse_var("HTTP_TIMEOUT_SECS", get("HTTP_TIMEOUT_SECS"))?
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_HTTP_TIMEOUT),
            refresh_delay: parse_var("REFRESH_DELAY_MS", get("REFRESH_DELAY_MS"))?
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_REFRESH_DELAY),
        })
    }

    /// Часть конфигурации, которую можно показывать клиенту
    pub fn client_view(&self) -> ClientConfig {
        ClientConfig {
            voice_id: self.elevenlabs.default_voice_id.clone(),
            video_sources: self.video_sources.clone(),
        }
    }
}

/// Публичная часть конфигурации (без ключей)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    pub voice_id: String,
    pub video_sources: Vec<VideoSource>,
}

/// Разобрать список видео в формате `имя::URL,имя::URL`.
///
/// Записи без разделителя `::` пропускаются.
pub fn parse_video_sources(raw: &str) -> Vec<VideoSource> {
    raw.split(',')
        .map(str::trim)
        .filter_map(|entry| entry.split_once("::"))
        .map(|(label, url)| VideoSource {
            label: label.trim().to_string(),
            url: url.trim().to_string(),
        })
        .collect()
}

fn parse_var<T: FromStr>(key: &str, value: Option<String>) -> Result<Option<T>> {
    match value {
        None => Ok(None),
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| DubError::Configuration(format!("{} has an invalid value: {}", key, raw))),
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
