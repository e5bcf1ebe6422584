use reqwest::Url;

use crate::error::{DubError, Result};

const VIDEO_EXTENSIONS: [&str; 2] = [".mp4", ".mov"];
const SHARE_LINK_DOMAINS: [&str; 4] = ["youtube.com", "youtu.be", "drive.google.com", "dropbox.com"];

/// Референсное видео должно быть прямой ссылкой на .mp4/.mov файл
pub fn validate_reference_video_url(url: &str) -> Result<()> {
    let parsed = Url::parse(url.trim())
        .map_err(|_| DubError::InvalidInput(format!("Not a valid URL: {}", url)))?;

    let path = parsed.path().to_ascii_lowercase();
    if !VIDEO_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
        return Err(DubError::InvalidInput(
            "Video URL must be a direct link to an .mp4 or .mov file".to_string(),
        ));
    }

    let host = parsed.host_str().unwrap_or("").to_ascii_lowercase();
    if SHARE_LINK_DOMAINS.iter().any(|domain| host.contains(domain)) {
        return Err(DubError::InvalidInput(
            "Use a directly downloadable URL instead of a share link".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_links_are_accepted() {
        assert!(validate_reference_video_url("https://cdn.example.com/clips/dance.MP4").is_ok());
        assert!(validate_reference_video_url("https://cdn.example.com/a.mov?token=1").is_ok());
    }

    #[test]
    fn test_non_video_paths_are_rejected() {
        let err = validate_reference_video_url("https://cdn.example.com/page.html").unwrap_err();
        assert!(err.to_string().contains(".mp4"));
    }

    #[test]
    fn test_share_links_are_rejected() {
        let err = validate_reference_video_url("https://www.dropbox.com/s/abc/clip.mp4").unwrap_err();
        assert!(err.to_string().contains("share link"));
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(matches!(validate_reference_video_url("not a url"), Err(DubError::InvalidInput(_))));
    }
}
