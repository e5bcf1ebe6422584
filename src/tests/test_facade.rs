//! Сборка всей библиотеки поверх mockito вместо реальных провайдеров

use std::time::Duration;

use mockito::{Matcher, Server, ServerGuard};
use serde_json::json;

use crate::config::DubConfig;
use crate::error::DubFailure;
use crate::models::{Task, TaskOrigin};
use crate::notification::MemoryStatusObserver;
use crate::MotionDub;

fn config(kling: &ServerGuard, eleven: &ServerGuard) -> DubConfig {
    let mut config = DubConfig::default();
    config.kling.api_base = kling.url();
    config.kling.access_key = "ak".into();
    config.kling.secret_key = "sk".into();
    config.elevenlabs.api_base = eleven.url();
    config.elevenlabs.api_key = "xi".into();
    config.http_timeout = Duration::from_secs(5);
    config.refresh_delay = Duration::from_millis(10);
    config
}

fn processing_task() -> Task {
    Task::from_raw(
        serde_json::from_value(json!({"task_id": "p1", "task_status": "processing", "created_at": 1})).unwrap(),
        TaskOrigin::Motion,
    )
}

#[tokio::test]
async fn lists_tasks_from_both_endpoints() {
    let mut kling = Server::new_async().await;
    let eleven = Server::new_async().await;
    let _motion = kling
        .mock("GET", "/v1/videos/motion-control")
        .match_query(Matcher::Any)
        .with_body(json!({"code": 0, "data": [{"task_id": "m1", "task_status": "succeed", "created_at": 100}]}).to_string())
        .create_async()
        .await;
    let _lipsync = kling
        .mock("GET", "/v1/videos/advanced-lip-sync")
        .match_query(Matcher::Any)
        .with_status(502)
        .create_async()
        .await;

    let app = MotionDub::new(config(&kling, &eleven)).unwrap();
    let tasks = app.refresh_tasks().await;
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].id, "m1");
    assert_eq!(tasks[0].origin, TaskOrigin::Motion);
}

#[tokio::test]
async fn task_without_video_cannot_be_dubbed() {
    let kling = Server::new_async().await;
    let eleven = Server::new_async().await;
    let app = MotionDub::new(config(&kling, &eleven)).unwrap();
    let memory = MemoryStatusObserver::new();
    app.add_observer(Box::new(memory.clone()));

    let outcome = app.dub_task(&processing_task(), Some("v".into())).await;
    assert_eq!(outcome.failure(), Some(&DubFailure::MissingVideoUrl));
    assert_eq!(memory.last_message().as_deref(), Some("error: missing video url"));
}

#[tokio::test]
async fn configured_voice_wins_over_registry() {
    let kling = Server::new_async().await;
    let mut eleven = Server::new_async().await;
    let voices = eleven
        .mock("GET", "/v1/voices")
        .with_body(json!({"voices": [{"voice_id": "first", "name": "First"}]}).to_string())
        .expect(1)
        .create_async()
        .await;

    let mut cfg = config(&kling, &eleven);
    cfg.elevenlabs.default_voice_id = "cfg-voice".into();
    let app = MotionDub::new(cfg).unwrap();
    assert_eq!(app.target_voice(Some("explicit")).await.as_deref(), Some("explicit"));
    assert_eq!(app.target_voice(None).await.as_deref(), Some("cfg-voice"));

    let app = MotionDub::new(config(&kling, &eleven)).unwrap();
    assert_eq!(app.target_voice(None).await.as_deref(), Some("first"));
    voices.assert_async().await;
}

#[tokio::test]
async fn unmeasurable_audio_never_reaches_submission() {
    let mut kling = Server::new_async().await;
    let mut eleven = Server::new_async().await;
    let mut extractor = Server::new_async().await;

    let _extract = extractor
        .mock("POST", "/api/extract-audio")
        .with_body(json!({"audio_base64": "bm90LWFuLW1wMw==", "content_type": "audio/mpeg"}).to_string())
        .create_async()
        .await;
    let _convert = eleven
        .mock("POST", "/v1/speech-to-speech/v1")
        .with_header("content-type", "audio/mpeg")
        .with_body(b"not audio either".as_slice())
        .create_async()
        .await;
    let identify = kling
        .mock("POST", "/v1/videos/identify-face")
        .with_body(json!({"code": 0, "data": {"session_id": "s1", "face_data": [{"face_id": "f1"}]}}).to_string())
        .expect(1)
        .create_async()
        .await;
    let submit = kling
        .mock("POST", "/v1/videos/advanced-lip-sync")
        .expect(0)
        .create_async()
        .await;

    let mut cfg = config(&kling, &eleven);
    cfg.media.extract_audio_endpoint = Some(format!("{}/api/extract-audio", extractor.url()));
    let app = MotionDub::new(cfg).unwrap();
    let memory = MemoryStatusObserver::new();
    app.add_observer(Box::new(memory.clone()));

    let task = Task::from_raw(
        serde_json::from_value(json!({
            "task_id": "m1",
            "task_status": "succeed",
            "created_at": 1,
            "task_result": {"videos": [{"url": "http://127.0.0.1:9/unreachable.mp4"}]}
        }))
        .unwrap(),
        TaskOrigin::Motion,
    );
    let outcome = app.dub_task(&task, Some("v1".into())).await;

    assert_eq!(outcome.failure(), Some(&DubFailure::DegenerateDuration));
    assert_eq!(memory.last_message().as_deref(), Some("error: synced duration is not positive"));
    identify.assert_async().await;
    submit.assert_async().await;
}
