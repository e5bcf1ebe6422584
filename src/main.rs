use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use futures::future::join_all;

use motiondub::config::DubConfig;
use motiondub::lipsync::DubOutcome;
use motiondub::models::{CharacterOrientation, MotionMode, Task};
use motiondub::notification::ConsoleStatusObserver;
use motiondub::{logger, motion, MotionDub};

#[derive(Parser)]
#[command(name = "motiondub", version, about = "Portrait animation and lip-sync re-dubbing")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Показать публичную часть конфигурации
    Config,
    /// Проверить ffmpeg и ffprobe
    Doctor,
    /// Список задач, от новых к старым
    Tasks,
    /// Зарегистрированные голоса
    Voices,
    /// Сгенерировать видео по портрету и референсному движению
    Generate {
        /// Ссылка на портрет или путь к файлу
        #[arg(long)]
        image: String,
        /// Прямая ссылка на .mp4/.mov
        #[arg(long)]
        video: String,
        #[arg(long, value_enum, default_value_t = Orientation::Image)]
        orientation: Orientation,
        #[arg(long, value_enum, default_value_t = Mode::Std)]
        mode: Mode,
        #[arg(long)]
        prompt: Option<String>,
    },
    /// Клонировать голос по образцу
    CloneVoice {
        #[arg(long)]
        name: String,
        #[arg(long)]
        sample: PathBuf,
        /// Не удалять фоновый шум из образца
        #[arg(long)]
        keep_noise: bool,
    },
    /// Синтезировать речь в файл
    Speak {
        #[arg(long)]
        text: String,
        #[arg(long)]
        out: PathBuf,
        #[arg(long)]
        voice: Option<String>,
    },
    /// Переозвучить готовые видео
    Dub {
        #[arg(required = true)]
        task_ids: Vec<String>,
        #[arg(long)]
        voice: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Orientation {
    Image,
    Video,
}

impl From<Orientation> for CharacterOrientation {
    fn from(value: Orientation) -> Self {
        match value {
            Orientation::Image => CharacterOrientation::Image,
            Orientation::Video => CharacterOrientation::Video,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    Std,
    Pro,
}

impl From<Mode> for MotionMode {
    fn from(value: Mode) -> Self {
        match value {
            Mode::Std => MotionMode::Std,
            Mode::Pro => MotionMode::Pro,
        }
    }
}

fn main() -> Result<()> {
    logger::init_logger();
    let cli = Cli::parse();

    // Однопоточный рантайм: все запуски кооперативно делят один поток
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    runtime.block_on(run(cli))
}

async fn run(cli: Cli) -> Result<()> {
    let config = DubConfig::from_env().context("Failed to load configuration")?;
    let app = MotionDub::new(config)?;

    match cli.command {
        Command::Config => {
            println!("{}", serde_json::to_string_pretty(&app.config().client_view())?);
        }
        Command::Doctor => {
            let mut ready = true;
            for tool in app.check_tools().await {
                let version = tool.version.as_ref().map(|v| v.to_string()).unwrap_or_else(|| "-".into());
                let path = tool.path.as_ref().map(|p| p.display().to_string()).unwrap_or_else(|| "not found".into());
                let mark = if tool.is_ready() { "ok" } else { "missing" };
                println!("{:<8} {:<8} {:<10} {}", tool.name, mark, version, path);
                ready &= tool.is_ready();
            }
            if !ready {
                bail!("ffmpeg {} or newer is required", motiondub::media::tools::MIN_FFMPEG_VERSION);
            }
        }
        Command::Tasks => print_tasks(&app.list_tasks().await),
        Command::Voices => {
            let voices = app.voices().await;
            if voices.is_empty() {
                println!("No voices found");
            }
            for voice in voices {
                println!("{:<24} {} {}", voice.voice_id, voice.name, voice.category.unwrap_or_default());
            }
        }
        Command::Generate { image, video, orientation, mode, prompt } => {
            let image = motion::image_from_arg(&image).await?;
            let request =
                motion::build_motion_request(Some(image), &video, orientation.into(), mode.into(), prompt.as_deref())?;
            let handle = app.generate(&request).await?;
            println!("Motion task created: {} ({})", handle.task_id, handle.task_status);
        }
        Command::CloneVoice { name, sample, keep_noise } => {
            let voice_id = app.clone_voice(&name, &sample, !keep_noise).await?;
            println!("Voice registered: {}", voice_id);
        }
        Command::Speak { text, out, voice } => {
            let voice_id = app
                .target_voice(voice.as_deref())
                .await
                .context("no target voice selected")?;
            let audio = app.speak(&voice_id, &text).await?;
            tokio::fs::write(&out, &audio.bytes)
                .await
                .with_context(|| format!("Failed to write {}", out.display()))?;
            println!("Saved {} bytes to {}", audio.len(), out.display());
        }
        Command::Dub { task_ids, voice } => dub(&app, task_ids, voice).await?,
    }
    Ok(())
}

async fn dub(app: &MotionDub, task_ids: Vec<String>, voice: Option<String>) -> Result<()> {
    let tasks = app.list_tasks().await;
    let voice_id = app.target_voice(voice.as_deref()).await;

    let prefix = if task_ids.len() > 1 { Some("> ") } else { None };
    app.add_observer(Box::new(match prefix {
        Some(p) => ConsoleStatusObserver::with_prefix(p),
        None => ConsoleStatusObserver::new(),
    }));

    let runs = task_ids.iter().map(|id| {
        let task = tasks.iter().find(|t| &t.id == id).cloned().unwrap_or_else(|| missing_task(id));
        let voice_id = voice_id.clone();
        async move { app.dub_task(&task, voice_id).await }
    });
    let outcomes = join_all(runs).await;

    let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
    if succeeded > 0 {
        print_tasks(&app.refresh_tasks().await);
    }
    if succeeded < outcomes.len() {
        let failed: Vec<String> = task_ids
            .iter()
            .zip(&outcomes)
            .filter_map(|(id, outcome)| match outcome {
                DubOutcome::Failed { failure } => Some(format!("{}: {}", id, failure)),
                DubOutcome::Succeeded { .. } => None,
            })
            .collect();
        bail!("{} of {} runs failed ({})", failed.len(), outcomes.len(), failed.join("; "));
    }
    Ok(())
}

/// Задача, которой нет в списке, переозвучивается как задача без видео
fn missing_task(id: &str) -> Task {
    log::warn!("Task {} not found in the task list", id);
    Task {
        id: id.to_string(),
        status: "unknown".to_string(),
        status_message: None,
        created_at: Default::default(),
        origin: motiondub::models::TaskOrigin::Motion,
        result: None,
    }
}

fn print_tasks(tasks: &[Task]) {
    if tasks.is_empty() {
        println!("No tasks");
        return;
    }
    for task in tasks {
        println!(
            "{:<8} {:<36} {:<12} {:<20} {}",
            task.origin,
            task.id,
            task.display_status(),
            task.created_at.format("%Y-%m-%d %H:%M:%S"),
            task.video_url().unwrap_or("")
        );
    }
}
