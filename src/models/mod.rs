// Domain models module
// Contains core data structures shared by the providers and the pipeline

pub mod lipsync;
pub mod motion;
pub mod task;

use serde::{Deserialize, Serialize};

pub use lipsync::{FaceIdentification, LipSyncJobHandle, LipSyncJobRequest};
pub use motion::{CharacterOrientation, ImageInput, MotionMode, MotionRequest, MotionTaskHandle};
pub use task::{RawTask, Task, TaskListPayload, TaskOrigin, TaskResult, VideoEntry};

/// Зарегистрированный голос
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voice {
    pub voice_id: String,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
}
