//! Поддельные внешние сервисы для тестов пайплайна и сводного списка

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use crate::error::{DubError, Result};
use crate::lipsync::LipSyncOrchestrator;
use crate::media::{AudioBlob, AudioExtractor, DurationProbe, ExtractedAudio, MediaKind, MediaSource};
use crate::models::{FaceIdentification, LipSyncJobHandle, LipSyncJobRequest, RawTask, TaskOrigin};
use crate::providers::{FaceIdentifier, LipSyncSubmitter, TaskSource, VoiceConverter};

pub struct FakeExtractor {
    payload: Option<ExtractedAudio>,
    delay: Option<Duration>,
    pub calls: AtomicUsize,
}

impl FakeExtractor {
    pub fn returning(audio_base64: &str) -> Self {
        Self {
            payload: Some(ExtractedAudio {
                audio_base64: audio_base64.to_string(),
                content_type: "audio/mpeg".to_string(),
            }),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            payload: None,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn stalled(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::returning("AAAA")
        }
    }
}

#[async_trait]
impl AudioExtractor for FakeExtractor {
    async fn extract(&self, _video_url: &str) -> Result<ExtractedAudio> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.payload
            .clone()
            .ok_or_else(|| DubError::AudioProcessing("Failed to extract audio".into()))
    }
}

pub struct FakeConverter {
    output: Option<AudioBlob>,
    pub voices: Mutex<Vec<String>>,
    pub inputs: Mutex<Vec<AudioBlob>>,
}

impl FakeConverter {
    pub fn returning(bytes: &[u8]) -> Self {
        Self {
            output: Some(AudioBlob::new(bytes.to_vec(), "audio/wav")),
            voices: Mutex::new(Vec::new()),
            inputs: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            output: None,
            voices: Mutex::new(Vec::new()),
            inputs: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl VoiceConverter for FakeConverter {
    async fn convert(&self, voice_id: &str, audio: &AudioBlob) -> Result<AudioBlob> {
        self.voices.lock().unwrap().push(voice_id.to_string());
        self.inputs.lock().unwrap().push(audio.clone());
        self.output.clone().ok_or_else(|| DubError::Api {
            provider: "ElevenLabs",
            status: 400,
            message: "voice not found".into(),
        })
    }
}

/// Возвращает заданные длительности и запоминает, что измерялось
pub struct FakeProbe {
    audio_secs: f64,
    video_secs: f64,
    pub probed: Mutex<Vec<(MediaKind, Option<String>)>>,
}

impl FakeProbe {
    pub fn new(audio_secs: f64, video_secs: f64) -> Self {
        Self {
            audio_secs,
            video_secs,
            probed: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl DurationProbe for FakeProbe {
    async fn probe(&self, source: MediaSource<'_>, kind: MediaKind) -> f64 {
        let url = match source {
            MediaSource::Url(url) => Some(url.to_string()),
            MediaSource::Blob(_) => None,
        };
        self.probed.lock().unwrap().push((kind, url));
        match kind {
            MediaKind::Audio => self.audio_secs,
            MediaKind::Video => self.video_secs,
        }
    }
}

pub struct FakeFaces {
    result: Option<FaceIdentification>,
    pub urls: Mutex<Vec<String>>,
}

impl FakeFaces {
    pub fn with_faces(session_id: &str, faces: &[&str]) -> Self {
        Self {
            result: Some(FaceIdentification {
                session_id: session_id.to_string(),
                faces: faces.iter().map(|f| f.to_string()).collect(),
            }),
            urls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            result: None,
            urls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl FaceIdentifier for FakeFaces {
    async fn identify(&self, video_url: &str) -> Result<FaceIdentification> {
        self.urls.lock().unwrap().push(video_url.to_string());
        self.result.clone().ok_or_else(|| DubError::Api {
            provider: "Kling",
            status: 500,
            message: "identify failed".into(),
        })
    }
}

pub struct FakeSubmitter {
    fail: bool,
    pub submitted: Mutex<Vec<LipSyncJobRequest>>,
}

impl FakeSubmitter {
    pub fn accepting() -> Self {
        Self {
            fail: false,
            submitted: Mutex::new(Vec::new()),
        }
    }

    pub fn rejecting() -> Self {
        Self {
            fail: true,
            submitted: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl LipSyncSubmitter for FakeSubmitter {
    async fn submit(&self, request: &LipSyncJobRequest) -> Result<LipSyncJobHandle> {
        let mut submitted = self.submitted.lock().unwrap();
        submitted.push(request.clone());
        if self.fail {
            return Err(DubError::Api {
                provider: "Kling",
                status: 400,
                message: "session expired".into(),
            });
        }
        Ok(LipSyncJobHandle {
            task_id: format!("job-{}", submitted.len()),
            task_status: "submitted".into(),
        })
    }
}

/// Набор поддельных сервисов, доступных тесту после запуска
pub struct Harness {
    pub extractor: Arc<FakeExtractor>,
    pub converter: Arc<FakeConverter>,
    pub probe: Arc<FakeProbe>,
    pub faces: Arc<FakeFaces>,
    pub submitter: Arc<FakeSubmitter>,
}

impl Harness {
    /// Все сервисы отвечают успешно: 5 секунд аудио и видео, одно лицо
    pub fn happy() -> Self {
        Self {
            extractor: Arc::new(FakeExtractor::returning("bXAzLWJ5dGVz")),
            converter: Arc::new(FakeConverter::returning(b"wav-bytes")),
            probe: Arc::new(FakeProbe::new(5.0, 5.0)),
            faces: Arc::new(FakeFaces::with_faces("s1", &["f1"])),
            submitter: Arc::new(FakeSubmitter::accepting()),
        }
    }

    pub fn orchestrator(&self) -> LipSyncOrchestrator {
        LipSyncOrchestrator::new(
            self.extractor.clone(),
            self.converter.clone(),
            self.probe.clone(),
            self.faces.clone(),
            self.submitter.clone(),
        )
    }

    pub fn network_calls(&self) -> usize {
        self.extractor.calls.load(Ordering::SeqCst)
            + self.converter.voices.lock().unwrap().len()
            + self.faces.urls.lock().unwrap().len()
            + self.submitter.submitted.lock().unwrap().len()
    }
}

pub struct FakeTaskSource {
    origin: TaskOrigin,
    tasks: Option<Vec<RawTask>>,
    delay: Duration,
}

impl FakeTaskSource {
    pub fn with_tasks(origin: TaskOrigin, tasks: Vec<RawTask>) -> Self {
        Self {
            origin,
            tasks: Some(tasks),
            delay: Duration::ZERO,
        }
    }

    pub fn failing(origin: TaskOrigin) -> Self {
        Self {
            origin,
            tasks: None,
            delay: Duration::ZERO,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl TaskSource for FakeTaskSource {
    fn origin(&self) -> TaskOrigin {
        self.origin
    }

    async fn list_tasks(&self) -> Result<Vec<RawTask>> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.tasks.clone().ok_or_else(|| DubError::Api {
            provider: "Kling",
            status: 503,
            message: "unavailable".into(),
        })
    }
}

pub fn raw_task(id: &str, created_at_ms: i64) -> RawTask {
    RawTask {
        task_id: id.to_string(),
        task_status: "succeed".to_string(),
        task_status_msg: None,
        created_at: Utc.timestamp_millis_opt(created_at_ms).unwrap(),
        task_result: None,
    }
}
