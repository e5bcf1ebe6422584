//! Модуль обработки ошибок библиотеки motiondub
//!
//! Здесь два уровня ошибок: [`DubError`] для транспортного и инфраструктурного
//! уровня, и [`DubFailure`] для итогового результата пайплайна переозвучки,
//! который показывается пользователю как строка статуса.

use thiserror::Error;

/// Ошибки библиотеки motiondub
#[derive(Debug, Error)]
pub enum DubError {
    /// Ошибка HTTP запроса
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Ошибка ввода-вывода
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Ошибка сериализации/десериализации JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Провайдер вернул ошибку
    #[error("{provider} API error (status {status}): {message}")]
    Api {
        provider: &'static str,
        status: u16,
        message: String,
    },

    /// Ошибка конфигурации
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Ошибка подписи токена
    #[error("Auth error: {0}")]
    Auth(String),

    /// Ошибка декодирования base64
    #[error("Decode error: {0}")]
    Decode(String),

    /// Ошибка обработки аудио
    #[error("Audio processing error: {0}")]
    AudioProcessing(String),

    /// Ошибка обработки видео
    #[error("Video processing error: {0}")]
    VideoProcessing(String),

    /// Неверные входные данные
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Превышено время ожидания
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Другая ошибка
    #[error("Other error: {0}")]
    Other(String),
}

impl From<&str> for DubError {
    fn from(s: &str) -> Self {
        DubError::Other(s.to_string())
    }
}

impl From<String> for DubError {
    fn from(s: String) -> Self {
        DubError::Other(s)
    }
}

impl From<base64::DecodeError> for DubError {
    fn from(err: base64::DecodeError) -> Self {
        DubError::Decode(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for DubError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        DubError::Auth(err.to_string())
    }
}

/// Тип Result для библиотеки motiondub
pub type Result<T> = std::result::Result<T, DubError>;

/// Причина, по которой запуск переозвучки завершился неудачей.
///
/// `Display` выдает готовую для пользователя строку.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DubFailure {
    #[error("no target voice selected")]
    MissingVoice,

    #[error("missing video url")]
    MissingVideoUrl,

    #[error("audio extraction failed")]
    AudioExtraction,

    #[error("voice conversion failed")]
    VoiceConversion,

    #[error("face identification failed")]
    FaceIdentification,

    #[error("no face detected")]
    NoFaceDetected,

    #[error("synced duration is not positive")]
    DegenerateDuration,

    #[error("submission failed")]
    Submission,
}

impl DubFailure {
    /// Ошибка во входных данных или результатах, а не сбой провайдера
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::MissingVoice | Self::MissingVideoUrl | Self::NoFaceDetected | Self::DegenerateDuration
        )
    }
}
