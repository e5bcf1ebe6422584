use std::path::{Path, PathBuf};
use std::process::Stdio;

use log::{debug, info};
use regex::Regex;
use semver::Version;
use tokio::process::Command;

use crate::config::MediaConfig;

/// Minimal ffmpeg/ffprobe version the extraction flags were tested with
pub const MIN_FFMPEG_VERSION: Version = Version::new(4, 0, 0);

/// State of one external tool
#[derive(Debug, Clone)]
pub struct ExternalTool {
    pub name: String,
    pub path: Option<PathBuf>,
    pub version: Option<Version>,
    pub min_version: Version,
}

impl ExternalTool {
    pub fn is_ready(&self) -> bool {
        self.path.is_some() && self.version.as_ref().is_some_and(|v| *v >= self.min_version)
    }
}

/// Locate ffmpeg and ffprobe and read their versions
pub async fn check_media_tools(media: &MediaConfig) -> Vec<ExternalTool> {
    let mut tools = Vec::new();
    for (name, configured) in [("ffmpeg", media.ffmpeg()), ("ffprobe", media.ffprobe())] {
        let path = locate(&configured);
        let version = match &path {
            Some(path) => read_version(name, path).await,
            None => None,
        };
        match (&path, &version) {
            (Some(path), Some(version)) => info!("Found {} {} at {}", name, version, path.display()),
            (Some(path), None) => info!("Found {} at {}, version unknown", name, path.display()),
            _ => info!("{} not found in PATH", name),
        }
        tools.push(ExternalTool {
            name: name.to_string(),
            path,
            version,
            min_version: MIN_FFMPEG_VERSION,
        });
    }
    tools
}

fn locate(configured: &Path) -> Option<PathBuf> {
    if configured.components().count() > 1 {
        return configured.exists().then(|| configured.to_path_buf());
    }
    which::which(configured).ok()
}

async fn read_version(name: &str, path: &Path) -> Option<Version> {
    let output = Command::new(path)
        .arg("-version")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .ok()?;
    if !output.status.success() {
        return None;
    }
    parse_tool_version(name, &String::from_utf8_lossy(&output.stdout))
}

/// Parse the first line of `ffmpeg -version` / `ffprobe -version`
pub fn parse_tool_version(name: &str, output: &str) -> Option<Version> {
    let re = Regex::new(&format!(r"{} version n?(\d+)\.(\d+)(?:\.(\d+))?", regex::escape(name))).ok()?;
    let caps = re.captures(output)?;
    let part = |i: usize| caps.get(i).map_or(Some(0), |m| m.as_str().parse::<u64>().ok());
    let version = Version::new(part(1)?, part(2)?, part(3)?);
    debug!("Parsed {} version: {}", name, version);
    Some(version)
}
