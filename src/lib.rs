//! Основной файл библиотеки motiondub
//!
//! Генерация видео по портрету и референсному движению, клонирование голоса
//! и переозвучка готовых видео с синхронизацией губ.

pub mod aggregator;
pub mod config;
pub mod error;
pub mod lipsync;
pub mod logger;
pub mod media;
pub mod models;
pub mod motion;
pub mod notification;
pub mod progress;
pub mod providers;
pub mod voice;

use std::path::Path;
use std::sync::Arc;

use crate::aggregator::TaskAggregator;
use crate::config::DubConfig;
use crate::error::Result;
use crate::lipsync::{DubOutcome, DubRequest, LipSyncOrchestrator};
use crate::media::{
    AudioBlob, AudioExtractor, ExternalTool, FfmpegAudioExtractor, FfprobeDurationProbe, RemoteAudioExtractor,
};
use crate::models::{MotionRequest, MotionTaskHandle, Task, TaskOrigin, Voice};
use crate::progress::{DefaultStatusReporter, StatusObserver, StatusReporter};
use crate::providers::{ElevenLabsClient, KlingClient, KlingTaskFeed};

pub use crate::error::{DubError, DubFailure};

/// Основная структура для работы с библиотекой
pub struct MotionDub {
    config: DubConfig,
    kling: Arc<KlingClient>,
    elevenlabs: Arc<ElevenLabsClient>,
    aggregator: TaskAggregator,
    orchestrator: LipSyncOrchestrator,
    reporter: Arc<dyn StatusReporter>,
}

impl MotionDub {
    /// Создать экземпляр с синхронной рассылкой статусов
    pub fn new(config: DubConfig) -> Result<Self> {
        Self::with_reporter(config, Arc::new(DefaultStatusReporter::new()))
    }

    pub fn with_reporter(config: DubConfig, reporter: Arc<dyn StatusReporter>) -> Result<Self> {
        let kling = Arc::new(KlingClient::new(&config.kling, config.http_timeout)?);
        let elevenlabs = Arc::new(ElevenLabsClient::new(&config.elevenlabs, config.http_timeout)?);

        let aggregator = TaskAggregator::new(
            Arc::new(KlingTaskFeed::new(kling.clone(), TaskOrigin::Motion)),
            Arc::new(KlingTaskFeed::new(kling.clone(), TaskOrigin::LipSync)),
        );

        let extractor: Arc<dyn AudioExtractor> = match &config.media.extract_audio_endpoint {
            Some(endpoint) => {
                log::info!("Using remote audio extraction at {}", endpoint);
                let client = reqwest::Client::builder()
                    .timeout(config.media.extraction_timeout)
                    .build()?;
                Arc::new(RemoteAudioExtractor::new(client, endpoint.clone()))
            }
            None => Arc::new(FfmpegAudioExtractor::new(&config.media)),
        };
        let probe = Arc::new(FfprobeDurationProbe::new(&config.media, &config.alignment));

        let orchestrator = LipSyncOrchestrator::new(
            extractor,
            elevenlabs.clone(),
            probe,
            kling.clone(),
            kling.clone(),
        )
        .with_alignment(config.alignment)
        .with_extraction_timeout(config.media.extraction_timeout);

        Ok(Self {
            config,
            kling,
            elevenlabs,
            aggregator,
            orchestrator,
            reporter,
        })
    }

    pub fn config(&self) -> &DubConfig {
        &self.config
    }

    /// Добавить наблюдателя статуса переозвучки
    pub fn add_observer(&self, observer: Box<dyn StatusObserver>) -> usize {
        self.reporter.add_observer(observer)
    }

    pub async fn list_tasks(&self) -> Vec<Task> {
        self.aggregator.list().await
    }

    /// Список задач после паузы из настроек
    pub async fn refresh_tasks(&self) -> Vec<Task> {
        self.aggregator.list_after(self.config.refresh_delay).await
    }

    pub async fn voices(&self) -> Vec<Voice> {
        voice::voices_or_empty(self.elevenlabs.as_ref()).await
    }

    /// Голос для переозвучки; реестр запрашивается только если других вариантов нет
    pub async fn target_voice(&self, explicit: Option<&str>) -> Option<String> {
        let configured = &self.config.elevenlabs.default_voice_id;
        if let Some(voice) = voice::resolve_target_voice(explicit, configured, &[]) {
            return Some(voice);
        }
        voice::resolve_target_voice(None, "", &self.voices().await)
    }

    pub async fn dub(&self, request: &DubRequest) -> DubOutcome {
        self.orchestrator.run(request, self.reporter.as_ref()).await
    }

    /// Переозвучить задачу из списка; у задачи без видео запуск сразу завершается ошибкой
    pub async fn dub_task(&self, task: &Task, voice_id: Option<String>) -> DubOutcome {
        let video_url = if task.can_redub() { task.video_url().unwrap_or("") } else { "" };
        self.dub(&DubRequest::new(task.id.clone(), video_url, voice_id)).await
    }

    pub async fn generate(&self, request: &MotionRequest) -> Result<MotionTaskHandle> {
        self.kling.create_motion_task(request).await
    }

    pub async fn motion_task(&self, task_id: &str) -> Result<Task> {
        let raw = self.kling.get_motion_task(task_id).await?;
        Ok(Task::from_raw(raw, TaskOrigin::Motion))
    }

    /// Зарегистрировать клонированный голос по образцу из файла
    pub async fn clone_voice(&self, name: &str, sample: &Path, remove_background_noise: bool) -> Result<String> {
        let sample = AudioBlob::from_file(sample).await?;
        self.elevenlabs.add_voice(name, &sample, remove_background_noise).await
    }

    pub async fn speak(&self, voice_id: &str, text: &str) -> Result<AudioBlob> {
        self.elevenlabs.text_to_speech(voice_id, text).await
    }

    pub async fn check_tools(&self) -> Vec<ExternalTool> {
        media::check_media_tools(&self.config.media).await
    }
}
