//! Подготовка заявки на генерацию видео по портрету

use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::{DubError, Result};
use crate::media::validate_reference_video_url;
use crate::models::{CharacterOrientation, ImageInput, MotionMode, MotionRequest};

/// Портрет из локального файла отправляется как base64 без префикса data URL
pub async fn image_from_file(path: &Path) -> Result<ImageInput> {
    let data = tokio::fs::read(path).await?;
    if data.is_empty() {
        return Err(DubError::InvalidInput(format!("Image file is empty: {}", path.display())));
    }
    log::debug!("Loaded portrait {} ({} bytes)", path.display(), data.len());
    Ok(ImageInput::Base64(STANDARD.encode(&data)))
}

/// Ссылка остается ссылкой, все остальное читается как путь к файлу
pub async fn image_from_arg(arg: &str) -> Result<ImageInput> {
    let arg = arg.trim();
    if arg.starts_with("http://") || arg.starts_with("https://") {
        Ok(ImageInput::Url(arg.to_string()))
    } else {
        image_from_file(Path::new(arg)).await
    }
}

/// Собрать и проверить заявку
pub fn build_motion_request(
    image: Option<ImageInput>,
    video_url: &str,
    orientation: CharacterOrientation,
    mode: MotionMode,
    prompt: Option<&str>,
) -> Result<MotionRequest> {
    let image = image.ok_or_else(|| DubError::InvalidInput("A portrait image is required".to_string()))?;
    validate_reference_video_url(video_url)?;

    let mut request = MotionRequest::new(image, video_url.trim());
    request.character_orientation = orientation;
    request.mode = mode;
    if let Some(prompt) = prompt {
        request = request.with_prompt(prompt);
    }
    Ok(request)
}
