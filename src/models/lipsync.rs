use serde::{Deserialize, Serialize};

/// Результат поиска лиц в видео.
///
/// `session_id` действителен ограниченное время и только для того видео,
/// по которому он получен.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceIdentification {
    pub session_id: String,
    /// Найденные лица в порядке, заданном провайдером
    pub faces: Vec<String>,
}

impl FaceIdentification {
    /// По соглашению берется первое найденное лицо
    pub fn first_face(&self) -> Option<&str> {
        self.faces.first().map(String::as_str)
    }
}

/// Заявка на создание lip-sync задачи
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LipSyncJobRequest {
    pub session_id: String,
    pub face_id: String,
    /// Аудио в целевом голосе, base64
    pub audio_data: String,
    pub sound_start_time: u64,
    pub sound_insert_time: u64,
    /// Конец звука в миллисекундах, не больше min(аудио, видео)
    pub sound_end_time: u64,
    pub original_audio_volume: f32,
    pub sound_volume: f32,
}

impl LipSyncJobRequest {
    pub fn new(session_id: impl Into<String>, face_id: impl Into<String>, audio_data: String, duration_ms: u64) -> Self {
        Self {
            session_id: session_id.into(),
            face_id: face_id.into(),
            audio_data,
            sound_start_time: 0,
            sound_insert_time: 0,
            sound_end_time: duration_ms,
            original_audio_volume: 0.0,
            sound_volume: 1.0,
        }
    }

    pub fn with_volumes(mut self, original_audio_volume: f32, sound_volume: f32) -> Self {
        self.original_audio_volume = original_audio_volume;
        self.sound_volume = sound_volume;
        self
    }
}

/// Созданная lip-sync задача
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LipSyncJobHandle {
    pub task_id: String,
    #[serde(default)]
    pub task_status: String,
}
