//! Клиент API Kling
//!
//! Все ответы приходят в конверте `{code, message, request_id, data}`;
//! ненулевой `code` считается ошибкой даже при HTTP 200.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::KlingConfig;
use crate::error::{DubError, Result};
use crate::models::{
    FaceIdentification, LipSyncJobHandle, LipSyncJobRequest, MotionRequest, MotionTaskHandle, RawTask,
    TaskListPayload, TaskOrigin,
};
use crate::providers::auth::KlingCredentials;
use crate::providers::{FaceIdentifier, LipSyncSubmitter, TaskSource};

const PROVIDER: &str = "Kling";
const MOTION_PATH: &str = "/v1/videos/motion-control";
const LIP_SYNC_PATH: &str = "/v1/videos/advanced-lip-sync";
const IDENTIFY_FACE_PATH: &str = "/v1/videos/identify-face";

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    request_id: Option<String>,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct FaceData {
    face_id: String,
}

#[derive(Debug, Deserialize)]
struct IdentifyFaceData {
    session_id: String,
    #[serde(default)]
    face_data: Vec<FaceData>,
}

#[derive(Debug, Serialize)]
struct FaceChoice<'a> {
    face_id: &'a str,
    sound_file: &'a str,
    sound_start_time: u64,
    sound_insert_time: u64,
    sound_end_time: u64,
    original_audio_volume: f32,
    sound_volume: f32,
}

#[derive(Debug, Serialize)]
struct LipSyncWireBody<'a> {
    session_id: &'a str,
    face_choose: Vec<FaceChoice<'a>>,
}

impl<'a> From<&'a LipSyncJobRequest> for LipSyncWireBody<'a> {
    fn from(request: &'a LipSyncJobRequest) -> Self {
        Self {
            session_id: &request.session_id,
            face_choose: vec![FaceChoice {
                face_id: &request.face_id,
                sound_file: &request.audio_data,
                sound_start_time: request.sound_start_time,
                sound_insert_time: request.sound_insert_time,
                sound_end_time: request.sound_end_time,
                original_audio_volume: request.original_audio_volume,
                sound_volume: request.sound_volume,
            }],
        }
    }
}

/// HTTP клиент Kling
pub struct KlingClient {
    client: Client,
    base_url: String,
    credentials: KlingCredentials,
    page_size: u32,
}

impl KlingClient {
    pub fn new(config: &KlingConfig, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: config.api_base.trim_end_matches('/').to_string(),
            credentials: KlingCredentials::from_config(config),
            page_size: config.task_page_size,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Подписать, отправить и распаковать конверт
    async fn call<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<Option<T>> {
        let token = self.credentials.generate_token()?;
        let response = request.bearer_auth(token).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<Envelope<serde_json::Value>>(&body)
                .ok()
                .map(|e| e.message)
                .filter(|m| !m.is_empty())
                .unwrap_or(body);
            log::error!("Kling request failed with status {}: {}", status, message);
            return Err(DubError::Api {
                provider: PROVIDER,
                status: status.as_u16(),
                message,
            });
        }

        let envelope: Envelope<T> = serde_json::from_str(&body)?;
        if envelope.code != 0 {
            log::error!(
                "Kling returned code {} (request {}): {}",
                envelope.code,
                envelope.request_id.as_deref().unwrap_or("-"),
                envelope.message
            );
            return Err(DubError::Api {
                provider: PROVIDER,
                status: status.as_u16(),
                message: format!("code {}: {}", envelope.code, envelope.message),
            });
        }
        Ok(envelope.data)
    }

    async fn call_required<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        self.call(request).await?.ok_or_else(|| DubError::Api {
            provider: PROVIDER,
            status: 200,
            message: "response carries no data".to_string(),
        })
    }

    async fn list(&self, path: &str) -> Result<Vec<RawTask>> {
        let page_size = self.page_size.to_string();
        let request = self
            .client
            .get(self.url(path))
            .query(&[("pageNum", "1"), ("pageSize", page_size.as_str())]);
        let payload: Option<TaskListPayload> = self.call(request).await?;
        Ok(payload.map(TaskListPayload::into_tasks).unwrap_or_default())
    }

    pub async fn list_motion_tasks(&self) -> Result<Vec<RawTask>> {
        self.list(MOTION_PATH).await
    }

    pub async fn list_lip_sync_tasks(&self) -> Result<Vec<RawTask>> {
        self.list(LIP_SYNC_PATH).await
    }

    pub async fn get_motion_task(&self, task_id: &str) -> Result<RawTask> {
        let request = self.client.get(self.url(&format!("{}/{}", MOTION_PATH, task_id)));
        self.call_required(request).await
    }

    pub async fn create_motion_task(&self, request: &MotionRequest) -> Result<MotionTaskHandle> {
        log::info!(
            "Creating motion task (orientation {:?}, mode {:?})",
            request.character_orientation,
            request.mode
        );
        let builder = self.client.post(self.url(MOTION_PATH)).json(&request.to_wire());
        self.call_required(builder).await
    }

    pub async fn identify_face(&self, video_url: &str) -> Result<FaceIdentification> {
        let builder = self
            .client
            .post(self.url(IDENTIFY_FACE_PATH))
            .json(&serde_json::json!({ "video_url": video_url }));
        let data: IdentifyFaceData = self.call_required(builder).await?;
        Ok(FaceIdentification {
            session_id: data.session_id,
            faces: data.face_data.into_iter().map(|f| f.face_id).collect(),
        })
    }

    pub async fn create_lip_sync_task(&self, request: &LipSyncJobRequest) -> Result<LipSyncJobHandle> {
        log::info!(
            "Creating lip-sync task for face {} (sound_end_time {} ms)",
            request.face_id,
            request.sound_end_time
        );
        let builder = self
            .client
            .post(self.url(LIP_SYNC_PATH))
            .json(&LipSyncWireBody::from(request));
        self.call_required(builder).await
    }
}

#[async_trait]
impl FaceIdentifier for KlingClient {
    async fn identify(&self, video_url: &str) -> Result<FaceIdentification> {
        self.identify_face(video_url).await
    }
}

#[async_trait]
impl LipSyncSubmitter for KlingClient {
    async fn submit(&self, request: &LipSyncJobRequest) -> Result<LipSyncJobHandle> {
        self.create_lip_sync_task(request).await
    }
}

/// Один из двух списков задач Kling как [`TaskSource`]
pub struct KlingTaskFeed {
    client: Arc<KlingClient>,
    origin: TaskOrigin,
}

impl KlingTaskFeed {
    pub fn new(client: Arc<KlingClient>, origin: TaskOrigin) -> Self {
        Self { client, origin }
    }
}

#[async_trait]
impl TaskSource for KlingTaskFeed {
    fn origin(&self) -> TaskOrigin {
        self.origin
    }

    async fn list_tasks(&self) -> Result<Vec<RawTask>> {
        match self.origin {
            TaskOrigin::Motion => self.client.list_motion_tasks().await,
            TaskOrigin::LipSync => self.client.list_lip_sync_tasks().await,
        }
    }
}
