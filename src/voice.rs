use crate::models::Voice;
use crate::providers::VoiceRegistry;

/// Список голосов; при ошибке провайдера пустой список
pub async fn voices_or_empty(registry: &dyn VoiceRegistry) -> Vec<Voice> {
    match registry.list_voices().await {
        Ok(voices) => voices,
        Err(e) => {
            log::warn!("Failed to load voices: {}", e);
            Vec::new()
        }
    }
}

/// Выбрать целевой голос: явный, затем голос из настроек, затем первый зарегистрированный
pub fn resolve_target_voice(explicit: Option<&str>, configured: &str, voices: &[Voice]) -> Option<String> {
    let non_blank = |v: &str| {
        let v = v.trim();
        (!v.is_empty()).then(|| v.to_string())
    };
    explicit
        .and_then(non_blank)
        .or_else(|| non_blank(configured))
        .or_else(|| voices.first().and_then(|v| non_blank(&v.voice_id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DubError, Result};
    use async_trait::async_trait;

    fn voice(id: &str) -> Voice {
        Voice {
            voice_id: id.to_string(),
            name: format!("Voice {}", id),
            category: None,
        }
    }

    #[test]
    fn test_resolution_order() {
        let voices = vec![voice("first"), voice("second")];
        assert_eq!(resolve_target_voice(Some("explicit"), "cfg", &voices).as_deref(), Some("explicit"));
        assert_eq!(resolve_target_voice(Some("  "), "cfg", &voices).as_deref(), Some("cfg"));
        assert_eq!(resolve_target_voice(None, "", &voices).as_deref(), Some("first"));
        assert_eq!(resolve_target_voice(None, " ", &[]), None);
    }

    struct BrokenRegistry;

    #[async_trait]
    impl VoiceRegistry for BrokenRegistry {
        async fn list_voices(&self) -> Result<Vec<Voice>> {
            Err(DubError::Other("connection reset".into()))
        }
    }

    #[tokio::test]
    async fn test_registry_failure_yields_empty_list() {
        assert!(voices_or_empty(&BrokenRegistry).await.is_empty());
    }
}
