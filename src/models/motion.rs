use serde::{Deserialize, Serialize};

/// С какой стороны брать ориентацию персонажа
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CharacterOrientation {
    #[default]
    Image,
    Video,
}

/// Режим генерации
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MotionMode {
    #[default]
    Std,
    Pro,
}

/// Портрет: ссылка или содержимое файла в base64
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageInput {
    Url(String),
    Base64(String),
}

impl ImageInput {
    pub fn as_wire(&self) -> &str {
        match self {
            Self::Url(url) => url,
            Self::Base64(data) => data,
        }
    }
}

/// Заявка на генерацию видео по портрету и референсному движению
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MotionRequest {
    pub image: ImageInput,
    pub video_url: String,
    pub character_orientation: CharacterOrientation,
    pub mode: MotionMode,
    pub prompt: Option<String>,
}

impl MotionRequest {
    pub fn new(image: ImageInput, video_url: impl Into<String>) -> Self {
        Self {
            image,
            video_url: video_url.into(),
            character_orientation: CharacterOrientation::default(),
            mode: MotionMode::default(),
            prompt: None,
        }
    }

    /// Пустая подсказка не отправляется
    pub fn with_prompt(mut self, prompt: &str) -> Self {
        let trimmed = prompt.trim();
        self.prompt = (!trimmed.is_empty()).then(|| trimmed.to_string());
        self
    }

    pub fn to_wire(&self) -> MotionWireBody<'_> {
        MotionWireBody {
            image_url: self.image.as_wire(),
            video_url: &self.video_url,
            character_orientation: self.character_orientation,
            mode: self.mode,
            prompt: self.prompt.as_deref(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MotionWireBody<'a> {
    pub image_url: &'a str,
    pub video_url: &'a str,
    pub character_orientation: CharacterOrientation,
    pub mode: MotionMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<&'a str>,
}

/// Созданная задача генерации
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionTaskHandle {
    pub task_id: String,
    #[serde(default)]
    pub task_status: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_blank_prompt_is_omitted() {
        let request = MotionRequest::new(ImageInput::Url("https://img/a.png".into()), "https://v/b.mp4")
            .with_prompt("   ");
        assert_eq!(
            serde_json::to_value(request.to_wire()).unwrap(),
            json!({
                "image_url": "https://img/a.png",
                "video_url": "https://v/b.mp4",
                "character_orientation": "image",
                "mode": "std"
            })
        );
    }

    #[test]
    fn test_prompt_is_trimmed() {
        let mut request = MotionRequest::new(ImageInput::Base64("aGVsbG8=".into()), "https://v/b.mp4")
            .with_prompt("  wave hello ");
        request.mode = MotionMode::Pro;
        let wire = serde_json::to_value(request.to_wire()).unwrap();
        assert_eq!(wire["prompt"], "wave hello");
        assert_eq!(wire["image_url"], "aGVsbG8=");
        assert_eq!(wire["mode"], "pro");
    }
}
