//! Клиент API ElevenLabs
//!
//! Список голосов, конвертация речи в другой голос, синтез речи и
//! клонирование голоса по образцу.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;

use crate::config::ElevenLabsConfig;
use crate::error::{DubError, Result};
use crate::media::AudioBlob;
use crate::models::Voice;
use crate::providers::{VoiceConverter, VoiceRegistry};

const PROVIDER: &str = "ElevenLabs";
const STS_MODEL: &str = "eleven_multilingual_sts_v2";
const TTS_MODEL: &str = "eleven_multilingual_v2";

/// Параметры голоса, одинаковые для конвертации и синтеза
fn voice_settings() -> serde_json::Value {
    serde_json::json!({ "stability": 0.5, "similarity_boost": 0.75 })
}

#[derive(Debug, Deserialize)]
struct VoicesResponse {
    #[serde(default)]
    voices: Vec<Voice>,
}

#[derive(Debug, Deserialize)]
struct AddVoiceResponse {
    voice_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorDetail {
    Message { message: String },
    Text(String),
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: ErrorDetail,
}

/// HTTP клиент ElevenLabs
pub struct ElevenLabsClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl ElevenLabsClient {
    pub fn new(config: &ElevenLabsConfig, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: config.api_base.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        if self.api_key.is_empty() {
            return Err(DubError::Configuration("ELEVENLABS_API_KEY is required".to_string()));
        }
        let response = request.header("xi-api-key", &self.api_key).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<ErrorBody>(&body) {
            Ok(ErrorBody { detail: ErrorDetail::Message { message } }) => message,
            Ok(ErrorBody { detail: ErrorDetail::Text(text) }) => text,
            Err(_) => body,
        };
        log::error!("ElevenLabs request failed with status {}: {}", status, message);
        Err(DubError::Api {
            provider: PROVIDER,
            status: status.as_u16(),
            message,
        })
    }

    /// Ответ с аудио; тип берется из заголовка, по умолчанию mp3
    async fn audio_from(response: Response) -> Result<AudioBlob> {
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("audio/mpeg")
            .to_string();
        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(DubError::AudioProcessing("provider returned empty audio".to_string()));
        }
        Ok(AudioBlob::new(bytes, content_type))
    }

    fn audio_part(audio: &AudioBlob, stem: &str) -> Result<Part> {
        Ok(Part::bytes(audio.bytes.to_vec())
            .file_name(format!("{}.{}", stem, audio.extension()))
            .mime_str(&audio.content_type)?)
    }

    pub async fn list_voices(&self) -> Result<Vec<Voice>> {
        let response = self.send(self.client.get(self.url("/v1/voices"))).await?;
        let voices: VoicesResponse = response.json().await?;
        log::debug!("Fetched {} voices", voices.voices.len());
        Ok(voices.voices)
    }

    /// Speech-to-speech: переложить запись на голос `voice_id`
    pub async fn speech_to_speech(&self, voice_id: &str, audio: &AudioBlob) -> Result<AudioBlob> {
        log::info!("Converting {} bytes of audio to voice {}", audio.len(), voice_id);
        let form = Form::new()
            .part("audio", Self::audio_part(audio, "audio")?)
            .text("model_id", STS_MODEL)
            .text("remove_background_noise", "true")
            .text("voice_settings", voice_settings().to_string());
        let request = self
            .client
            .post(self.url(&format!("/v1/speech-to-speech/{}", voice_id)))
            .multipart(form);
        Self::audio_from(self.send(request).await?).await
    }

    pub async fn text_to_speech(&self, voice_id: &str, text: &str) -> Result<AudioBlob> {
        if text.trim().is_empty() {
            return Err(DubError::InvalidInput("text must not be empty".to_string()));
        }
        let request = self
            .client
            .post(self.url(&format!("/v1/text-to-speech/{}", voice_id)))
            .json(&serde_json::json!({
                "text": text,
                "model_id": TTS_MODEL,
                "voice_settings": voice_settings(),
            }));
        Self::audio_from(self.send(request).await?).await
    }

    /// Клонировать голос по образцу, вернуть идентификатор нового голоса
    pub async fn add_voice(&self, name: &str, sample: &AudioBlob, remove_background_noise: bool) -> Result<String> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DubError::InvalidInput("voice name must not be empty".to_string()));
        }
        if sample.is_empty() {
            return Err(DubError::InvalidInput("voice sample is empty".to_string()));
        }
        let form = Form::new()
            .text("name", name.to_string())
            .part("files", Self::audio_part(sample, "sample")?)
            .text("remove_background_noise", remove_background_noise.to_string());
        let request = self.client.post(self.url("/v1/voices/add")).multipart(form);
        let created: AddVoiceResponse = self.send(request).await?.json().await?;
        log::info!("Registered voice '{}' as {}", name, created.voice_id);
        Ok(created.voice_id)
    }
}

#[async_trait]
impl VoiceConverter for ElevenLabsClient {
    async fn convert(&self, voice_id: &str, audio: &AudioBlob) -> Result<AudioBlob> {
        self.speech_to_speech(voice_id, audio).await
    }
}

#[async_trait]
impl VoiceRegistry for ElevenLabsClient {
    async fn list_voices(&self) -> Result<Vec<Voice>> {
        ElevenLabsClient::list_voices(self).await
    }
}
