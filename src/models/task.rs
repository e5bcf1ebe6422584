//! Задачи провайдера генерации видео
//!
//! Провайдер отдает списки задач в двух формах: голым массивом или объектом
//! с полем `tasks`. Обе формы приводятся к `Vec<RawTask>` сразу при получении.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Источник задачи, проставляется при слиянии списков
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskOrigin {
    /// Генерация видео по портрету и референсному движению
    Motion,
    /// Переозвучка с синхронизацией губ
    #[serde(rename = "lipsync")]
    LipSync,
}

impl TaskOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Motion => "motion",
            Self::LipSync => "lipsync",
        }
    }
}

impl std::fmt::Display for TaskOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Альтернативное видео в результате задачи
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoEntry {
    #[serde(default)]
    pub id: Option<String>,
    pub url: String,
    #[serde(default)]
    pub duration: Option<String>,
}

/// Результат задачи; отсутствует, пока задача выполняется
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub videos: Vec<VideoEntry>,
}

impl TaskResult {
    /// Основное видео, иначе первое из альтернативных
    pub fn primary_video_url(&self) -> Option<&str> {
        self.video_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .or_else(|| self.videos.first().map(|v| v.url.as_str()).filter(|url| !url.is_empty()))
    }
}

/// Запись задачи в том виде, в каком ее отдает провайдер
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTask {
    pub task_id: String,
    #[serde(default)]
    pub task_status: String,
    #[serde(default)]
    pub task_status_msg: Option<String>,
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub task_result: Option<TaskResult>,
}

/// Ответ провайдера со списком задач в любой из допустимых форм
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TaskListPayload {
    Bare(Vec<RawTask>),
    Wrapped {
        #[serde(default)]
        tasks: Vec<RawTask>,
    },
}

impl TaskListPayload {
    pub fn into_tasks(self) -> Vec<RawTask> {
        match self {
            Self::Bare(tasks) => tasks,
            Self::Wrapped { tasks } => tasks,
        }
    }
}

/// Задача со штампом источника
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub status: String,
    pub status_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub origin: TaskOrigin,
    pub result: Option<TaskResult>,
}

impl Task {
    pub fn from_raw(raw: RawTask, origin: TaskOrigin) -> Self {
        Self {
            id: raw.task_id,
            status: raw.task_status,
            status_message: raw.task_status_msg,
            created_at: raw.created_at,
            origin,
            result: raw.task_result,
        }
    }

    /// Статус в нижнем регистре, для отображения
    pub fn display_status(&self) -> String {
        self.status.to_lowercase()
    }

    pub fn video_url(&self) -> Option<&str> {
        self.result.as_ref().and_then(TaskResult::primary_video_url)
    }

    /// Переозвучивать можно только готовые motion-задачи с видео
    pub fn can_redub(&self) -> bool {
        self.origin == TaskOrigin::Motion && self.video_url().is_some()
    }
}

/// Провайдер присылает время создания в миллисекундах, но принимаем и RFC 3339.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Timestamp {
        Millis(i64),
        Float(f64),
        Text(String),
        Missing(()),
    }

    let parsed = match Timestamp::deserialize(deserializer)? {
        Timestamp::Millis(ms) => Utc.timestamp_millis_opt(ms).single(),
        Timestamp::Float(ms) => Utc.timestamp_millis_opt(ms as i64).single(),
        Timestamp::Text(text) => DateTime::parse_from_rfc3339(&text)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| text.parse::<i64>().ok().and_then(|ms| Utc.timestamp_millis_opt(ms).single())),
        Timestamp::Missing(()) => None,
    };
    Ok(parsed.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payload_accepts_bare_array() {
        let payload: TaskListPayload = serde_json::from_value(json!([
            {"task_id": "1", "task_status": "succeed", "created_at": 1_700_000_000_000i64}
        ]))
        .unwrap();
        let tasks = payload.into_tasks();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].created_at.timestamp_millis(), 1_700_000_000_000);
    }

    #[test]
    fn test_payload_accepts_wrapped_object() {
        let payload: TaskListPayload = serde_json::from_value(json!({
            "tasks": [{"task_id": "a", "task_status": "processing", "created_at": "2024-05-01T10:00:00Z"}]
        }))
        .unwrap();
        let tasks = payload.into_tasks();
        assert_eq!(tasks[0].task_id, "a");
        assert_eq!(tasks[0].created_at.to_rfc3339(), "2024-05-01T10:00:00+00:00");
    }

    #[test]
    fn test_wrapped_object_without_tasks_is_empty() {
        let payload: TaskListPayload = serde_json::from_value(json!({"total": 0})).unwrap();
        assert!(payload.into_tasks().is_empty());
    }

    #[test]
    fn test_missing_timestamp_sorts_as_oldest() {
        let raw: RawTask = serde_json::from_value(json!({"task_id": "x"})).unwrap();
        assert_eq!(raw.created_at, DateTime::<Utc>::default());
        assert!(raw.task_result.is_none());
    }

    #[test]
    fn test_video_url_prefers_primary_then_first_alternative() {
        let mut task = Task::from_raw(
            serde_json::from_value(json!({
                "task_id": "t",
                "task_status": "SUCCEED",
                "created_at": 0,
                "task_result": {"videos": [{"id": "v1", "url": "https://cdn/v1.mp4"}, {"url": "https://cdn/v2.mp4"}]}
            }))
            .unwrap(),
            TaskOrigin::Motion,
        );
        assert_eq!(task.video_url(), Some("https://cdn/v1.mp4"));
        assert_eq!(task.display_status(), "succeed");
        assert!(task.can_redub());

        task.result.as_mut().unwrap().video_url = Some("https://cdn/main.mp4".into());
        assert_eq!(task.video_url(), Some("https://cdn/main.mp4"));

        task.origin = TaskOrigin::LipSync;
        assert!(!task.can_redub());
    }

    #[test]
    fn test_processing_task_has_no_video() {
        let task = Task::from_raw(
            serde_json::from_value(json!({"task_id": "p", "task_status": "processing", "created_at": 5})).unwrap(),
            TaskOrigin::Motion,
        );
        assert_eq!(task.video_url(), None);
        assert!(!task.can_redub());
    }

    #[test]
    fn test_origin_serializes_as_lowercase_tag() {
        assert_eq!(serde_json::to_value(TaskOrigin::LipSync).unwrap(), json!("lipsync"));
        assert_eq!(serde_json::to_value(TaskOrigin::Motion).unwrap(), json!("motion"));
    }
}
