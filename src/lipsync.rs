//! Пайплайн переозвучки с синхронизацией губ
//!
//! Один запуск проходит этапы строго по порядку:
//! извлечение аудио -> конвертация голоса -> анализ лица -> отправка задачи.
//! Любая ошибка этапа превращается в [`DubFailure`] на границе запуска;
//! все рабочие данные живут только внутри одного вызова [`LipSyncOrchestrator::run`].

use std::sync::Arc;
use std::time::Duration;

use crate::config::{AlignmentConfig, DEFAULT_EXTRACTION_TIMEOUT};
use crate::error::{DubError, DubFailure};
use crate::media::{AudioExtractor, DurationProbe, MediaKind, MediaSource};
use crate::models::{LipSyncJobHandle, LipSyncJobRequest};
use crate::progress::{DubStage, DubTracker, StatusReporter};
use crate::providers::{FaceIdentifier, LipSyncSubmitter, VoiceConverter};

/// Что переозвучить и каким голосом
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DubRequest {
    /// Только для привязки статусов к задаче
    pub task_id: String,
    pub video_url: String,
    pub voice_id: Option<String>,
}

impl DubRequest {
    pub fn new(task_id: impl Into<String>, video_url: impl Into<String>, voice_id: Option<String>) -> Self {
        Self {
            task_id: task_id.into(),
            video_url: video_url.into(),
            voice_id,
        }
    }
}

/// Итог запуска
#[derive(Debug, Clone, PartialEq)]
pub enum DubOutcome {
    Succeeded { job: LipSyncJobHandle, sound_end_time: u64 },
    Failed { failure: DubFailure },
}

impl DubOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }

    pub fn failure(&self) -> Option<&DubFailure> {
        match self {
            Self::Failed { failure } => Some(failure),
            Self::Succeeded { .. } => None,
        }
    }
}

/// Длительность синхронизации в миллисекундах.
///
/// `floor((min(audio, video) - margin) * 1000)`; `None`, если результат
/// не положителен.
pub fn safe_duration_ms(audio_secs: f64, video_secs: f64, margin_secs: f64) -> Option<u64> {
    let shortest = audio_secs.min(video_secs);
    let millis = ((shortest - margin_secs) * 1000.0).floor();
    if millis.is_finite() && millis > 0.0 {
        Some(millis as u64)
    } else {
        None
    }
}

pub struct LipSyncOrchestrator {
    extractor: Arc<dyn AudioExtractor>,
    converter: Arc<dyn VoiceConverter>,
    probe: Arc<dyn DurationProbe>,
    faces: Arc<dyn FaceIdentifier>,
    submitter: Arc<dyn LipSyncSubmitter>,
    alignment: AlignmentConfig,
    extraction_timeout: Duration,
}

impl LipSyncOrchestrator {
    pub fn new(
        extractor: Arc<dyn AudioExtractor>,
        converter: Arc<dyn VoiceConverter>,
        probe: Arc<dyn DurationProbe>,
        faces: Arc<dyn FaceIdentifier>,
        submitter: Arc<dyn LipSyncSubmitter>,
    ) -> Self {
        Self {
            extractor,
            converter,
            probe,
            faces,
            submitter,
            alignment: AlignmentConfig::default(),
            extraction_timeout: DEFAULT_EXTRACTION_TIMEOUT,
        }
    }

    pub fn with_alignment(mut self, alignment: AlignmentConfig) -> Self {
        self.alignment = alignment;
        self
    }

    pub fn with_extraction_timeout(mut self, timeout: Duration) -> Self {
        self.extraction_timeout = timeout;
        self
    }

    /// Выполнить один запуск. Никогда не возвращает ошибку: итог в [`DubOutcome`].
    pub async fn run(&self, request: &DubRequest, reporter: &dyn StatusReporter) -> DubOutcome {
        let mut tracker = DubTracker::new(reporter, request.task_id.clone());
        match self.execute(request, &mut tracker).await {
            Ok((job, sound_end_time)) => {
                tracker.succeed();
                DubOutcome::Succeeded { job, sound_end_time }
            }
            Err(failure) => {
                tracker.fail(&failure);
                DubOutcome::Failed { failure }
            }
        }
    }

    async fn execute(
        &self,
        request: &DubRequest,
        tracker: &mut DubTracker<'_>,
    ) -> Result<(LipSyncJobHandle, u64), DubFailure> {
        // Проверки до первого сетевого вызова
        let voice_id = request
            .voice_id
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or(DubFailure::MissingVoice)?;
        let video_url = request.video_url.trim();
        if video_url.is_empty() {
            return Err(DubFailure::MissingVideoUrl);
        }

        tracker.enter(DubStage::ExtractingAudio);
        let extracted = tokio::time::timeout(self.extraction_timeout, self.extractor.extract(video_url))
            .await
            .unwrap_or_else(|_| {
                Err(DubError::Timeout(format!(
                    "audio extraction did not finish within {:?}",
                    self.extraction_timeout
                )))
            })
            .map_err(|e| stage_error(&request.task_id, DubFailure::AudioExtraction, e))?;
        let original = extracted
            .decode()
            .map_err(|e| stage_error(&request.task_id, DubFailure::AudioExtraction, e))?;

        tracker.enter(DubStage::ConvertingVoice);
        let converted = self
            .converter
            .convert(voice_id, &original)
            .await
            .map_err(|e| stage_error(&request.task_id, DubFailure::VoiceConversion, e))?;
        drop(original);
        let audio_data = converted.to_base64();

        tracker.enter(DubStage::AnalyzingFace);
        let (audio_secs, video_secs, identification) = tokio::join!(
            self.probe.probe(MediaSource::Blob(&converted), MediaKind::Audio),
            self.probe.probe(MediaSource::Url(video_url), MediaKind::Video),
            self.faces.identify(video_url),
        );
        let identification =
            identification.map_err(|e| stage_error(&request.task_id, DubFailure::FaceIdentification, e))?;
        let face_id = identification.first_face().ok_or_else(|| {
            log::error!("[{}] session {} has no faces", request.task_id, identification.session_id);
            DubFailure::NoFaceDetected
        })?;

        let sound_end_time = safe_duration_ms(audio_secs, video_secs, self.alignment.safety_margin_secs)
            .ok_or_else(|| {
                log::error!(
                    "[{}] audio {:.3}s, video {:.3}s, margin {:.3}s leave nothing to sync",
                    request.task_id,
                    audio_secs,
                    video_secs,
                    self.alignment.safety_margin_secs
                );
                DubFailure::DegenerateDuration
            })?;
        log::debug!(
            "[{}] audio {:.3}s, video {:.3}s -> sound_end_time {} ms",
            request.task_id,
            audio_secs,
            video_secs,
            sound_end_time
        );

        tracker.enter(DubStage::Submitting);
        let job_request = LipSyncJobRequest::new(&identification.session_id, face_id, audio_data, sound_end_time)
            .with_volumes(self.alignment.original_audio_volume, self.alignment.sound_volume);
        let job = self
            .submitter
            .submit(&job_request)
            .await
            .map_err(|e| stage_error(&request.task_id, DubFailure::Submission, e))?;

        Ok((job, sound_end_time))
    }
}

fn stage_error(task_id: &str, failure: DubFailure, cause: DubError) -> DubFailure {
    log::error!("[{}] {}: {}", task_id, failure, cause);
    failure
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_duration_uses_shorter_track() {
        assert_eq!(safe_duration_ms(10.5, 9.8, 0.2), Some(9600));
        assert_eq!(safe_duration_ms(5.0, 5.0, 0.2), Some(4800));
        assert_eq!(safe_duration_ms(3.0, 12.0, 0.5), Some(2500));
    }

    #[test]
    fn test_safe_duration_rejects_degenerate_windows() {
        assert_eq!(safe_duration_ms(0.1, 5.0, 0.2), None);
        assert_eq!(safe_duration_ms(0.2, 5.0, 0.2), None);
        assert_eq!(safe_duration_ms(0.0, 5.0, 0.2), None);
        assert_eq!(safe_duration_ms(f64::INFINITY, f64::INFINITY, 0.2), None);
    }

    #[test]
    fn test_outcome_helpers() {
        let failed = DubOutcome::Failed { failure: DubFailure::Submission };
        assert!(!failed.is_success());
        assert_eq!(failed.failure(), Some(&DubFailure::Submission));
    }
}
