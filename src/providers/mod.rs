//! Адаптеры внешних провайдеров
//!
//! Пайплайн работает только с трейтами из этого модуля; реальные HTTP
//! клиенты Kling и ElevenLabs лишь одна из реализаций.

pub mod auth;
pub mod elevenlabs;
pub mod kling;

use async_trait::async_trait;

use crate::error::Result;
use crate::media::AudioBlob;
use crate::models::{FaceIdentification, LipSyncJobHandle, LipSyncJobRequest, RawTask, TaskOrigin, Voice};

pub use auth::KlingCredentials;
pub use elevenlabs::ElevenLabsClient;
pub use kling::{KlingClient, KlingTaskFeed};

/// Один список задач провайдера
#[async_trait]
pub trait TaskSource: Send + Sync {
    /// Какой меткой помечать задачи из этого списка
    fn origin(&self) -> TaskOrigin;

    /// Ответ уже приведен к единой последовательности
    async fn list_tasks(&self) -> Result<Vec<RawTask>>;
}

/// Конвертация аудио в целевой голос
#[async_trait]
pub trait VoiceConverter: Send + Sync {
    async fn convert(&self, voice_id: &str, audio: &AudioBlob) -> Result<AudioBlob>;
}

/// Поиск лиц в видео
#[async_trait]
pub trait FaceIdentifier: Send + Sync {
    async fn identify(&self, video_url: &str) -> Result<FaceIdentification>;
}

/// Отправка lip-sync задачи
#[async_trait]
pub trait LipSyncSubmitter: Send + Sync {
    async fn submit(&self, request: &LipSyncJobRequest) -> Result<LipSyncJobHandle>;
}

/// Реестр зарегистрированных голосов
#[async_trait]
pub trait VoiceRegistry: Send + Sync {
    async fn list_voices(&self) -> Result<Vec<Voice>>;
}
