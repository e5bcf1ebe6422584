//! Модуль для отслеживания состояния переозвучки
//!
//! Оркестратор не знает, кто показывает статус: он сообщает о каждом
//! переходе наблюдателям через [`StatusReporter`], а UI, CLI или лог
//! подписываются на эти уведомления.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::error::DubFailure;

/// Строка статуса при успешном завершении
pub const SUCCESS_MESSAGE: &str = "Success! Check the task list.";

/// Этапы пайплайна переозвучки
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DubStage {
    ExtractingAudio,
    ConvertingVoice,
    AnalyzingFace,
    Submitting,
}

impl DubStage {
    pub const ALL: [DubStage; 4] = [
        Self::ExtractingAudio,
        Self::ConvertingVoice,
        Self::AnalyzingFace,
        Self::Submitting,
    ];

    /// Строка статуса, показываемая пользователю при входе в этап
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExtractingAudio => "Extracting audio from video...",
            Self::ConvertingVoice => "Converting to selected voice...",
            Self::AnalyzingFace => "Analyzing face...",
            Self::Submitting => "Submitting lip-sync job...",
        }
    }

    /// Весовой коэффициент этапа (в процентах от всего запуска)
    pub fn weight(&self) -> f32 {
        match self {
            Self::ExtractingAudio => 30.0,
            Self::ConvertingVoice => 40.0,
            Self::AnalyzingFace => 20.0,
            Self::Submitting => 10.0,
        }
    }

    /// Прогресс, накопленный до начала этапа
    fn progress_before(&self) -> f32 {
        Self::ALL.iter().take_while(|s| *s != self).map(DubStage::weight).sum()
    }
}

/// Состояние одного запуска переозвучки
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum DubState {
    Idle,
    ExtractingAudio,
    ConvertingVoice,
    AnalyzingFace,
    Submitting,
    Succeeded,
    Failed(String),
}

impl DubState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed(_))
    }

    /// Переходы только вперед; `Failed` достижим из любого нетерминального состояния
    pub fn can_advance_to(&self, next: &DubState) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            Self::Failed(_) => true,
            Self::Idle => false,
            _ => next.rank() > self.rank(),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::ExtractingAudio => 1,
            Self::ConvertingVoice => 2,
            Self::AnalyzingFace => 3,
            Self::Submitting => 4,
            Self::Succeeded => 5,
            Self::Failed(_) => 6,
        }
    }
}

impl From<DubStage> for DubState {
    fn from(stage: DubStage) -> Self {
        match stage {
            DubStage::ExtractingAudio => Self::ExtractingAudio,
            DubStage::ConvertingVoice => Self::ConvertingVoice,
            DubStage::AnalyzingFace => Self::AnalyzingFace,
            DubStage::Submitting => Self::Submitting,
        }
    }
}

/// Обновление статуса, отправляемое наблюдателям
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdate {
    /// Задача, для которой запущена переозвучка
    pub task_id: String,
    /// Идентификатор запуска, различает параллельные запуски
    pub run_id: Uuid,
    pub state: DubState,
    /// Готовая для показа строка, заменяет предыдущую
    pub message: String,
    /// Общий процент выполнения (0.0 - 100.0)
    pub total_progress: f32,
}

/// Трейт для наблюдателя, получающего уведомления о статусе
pub trait StatusObserver: Send + Sync {
    fn on_status_update(&self, update: StatusUpdate);
}

/// Трейт для объекта, рассылающего уведомления о статусе
pub trait StatusReporter: Send + Sync {
    /// Добавить наблюдателя, вернуть его идентификатор
    fn add_observer(&self, observer: Box<dyn StatusObserver>) -> usize;

    /// Удалить наблюдателя по идентификатору
    fn remove_observer(&self, id: usize) -> Option<Box<dyn StatusObserver>>;

    fn notify(&self, update: StatusUpdate);
}

/// Рассылка наблюдателям синхронно, в том же потоке
pub struct DefaultStatusReporter {
    observers: RwLock<HashMap<usize, Box<dyn StatusObserver>>>,
    next_id: AtomicUsize,
}

impl DefaultStatusReporter {
    pub fn new() -> Self {
        Self {
            observers: RwLock::new(HashMap::new()),
            next_id: AtomicUsize::new(0),
        }
    }

    pub fn with_observer(observer: Box<dyn StatusObserver>) -> Self {
        let reporter = Self::new();
        reporter.add_observer(observer);
        reporter
    }

    pub fn observer_count(&self) -> usize {
        self.observers.read().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl Default for DefaultStatusReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusReporter for DefaultStatusReporter {
    fn add_observer(&self, observer: Box<dyn StatusObserver>) -> usize {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.observers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, observer);
        id
    }

    fn remove_observer(&self, id: usize) -> Option<Box<dyn StatusObserver>> {
        self.observers.write().unwrap_or_else(|e| e.into_inner()).remove(&id)
    }

    fn notify(&self, update: StatusUpdate) {
        let observers = self.observers.read().unwrap_or_else(|e| e.into_inner());
        for observer in observers.values() {
            observer.on_status_update(update.clone());
        }
    }
}

/// Репортер на `tokio::sync::broadcast`: каждый подписчик получает свою копию
pub struct BroadcastStatusReporter {
    tx: broadcast::Sender<StatusUpdate>,
    inner: Arc<DefaultStatusReporter>,
}

impl BroadcastStatusReporter {
    pub fn new(capacity: usize) -> (Self, broadcast::Receiver<StatusUpdate>) {
        let (tx, rx) = broadcast::channel(capacity.max(1));
        let reporter = Self {
            tx,
            inner: Arc::new(DefaultStatusReporter::new()),
        };
        (reporter, rx)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StatusUpdate> {
        self.tx.subscribe()
    }

    /// Запустить фоновую доставку обновлений зарегистрированным наблюдателям
    pub fn start_handler(&self) -> tokio::task::JoinHandle<()> {
        let mut rx = self.tx.subscribe();
        let inner = self.inner.clone();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(update) => inner.notify(update),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        log::warn!("Status handler lagged, {} updates skipped", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}

impl StatusReporter for BroadcastStatusReporter {
    fn add_observer(&self, observer: Box<dyn StatusObserver>) -> usize {
        self.inner.add_observer(observer)
    }

    fn remove_observer(&self, id: usize) -> Option<Box<dyn StatusObserver>> {
        self.inner.remove_observer(id)
    }

    fn notify(&self, update: StatusUpdate) {
        // Ошибка означает только отсутствие подписчиков
        if self.tx.send(update).is_err() {
            log::debug!("No status subscribers");
        }
    }
}

/// Состояние одного запуска; у каждого запуска свой трекер
pub struct DubTracker<'a> {
    reporter: &'a dyn StatusReporter,
    task_id: String,
    run_id: Uuid,
    state: DubState,
    progress: f32,
}

impl<'a> DubTracker<'a> {
    pub fn new(reporter: &'a dyn StatusReporter, task_id: impl Into<String>) -> Self {
        Self {
            reporter,
            task_id: task_id.into(),
            run_id: Uuid::new_v4(),
            state: DubState::Idle,
            progress: 0.0,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn state(&self) -> &DubState {
        &self.state
    }

    /// Войти в этап и сообщить об этом до начала работы этапа
    pub fn enter(&mut self, stage: DubStage) {
        self.progress = stage.progress_before();
        log::info!("[{}] {}", self.task_id, stage.as_str());
        self.transition(stage.into(), stage.as_str().to_string());
    }

    pub fn succeed(&mut self) {
        self.progress = 100.0;
        log::info!("[{}] lip-sync job submitted", self.task_id);
        self.transition(DubState::Succeeded, SUCCESS_MESSAGE.to_string());
    }

    pub fn fail(&mut self, failure: &DubFailure) {
        let reason = failure.to_string();
        self.transition(DubState::Failed(reason.clone()), format!("error: {}", reason));
    }

    fn transition(&mut self, next: DubState, message: String) {
        if !self.state.can_advance_to(&next) {
            log::warn!("[{}] ignoring transition {:?} -> {:?}", self.task_id, self.state, next);
            return;
        }
        self.state = next;
        self.reporter.notify(StatusUpdate {
            task_id: self.task_id.clone(),
            run_id: self.run_id,
            state: self.state.clone(),
            message,
            total_progress: self.progress.clamp(0.0, 100.0),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct TestObserver {
        updates: Arc<Mutex<Vec<StatusUpdate>>>,
    }

    impl TestObserver {
        fn new() -> (Self, Arc<Mutex<Vec<StatusUpdate>>>) {
            let updates = Arc::new(Mutex::new(Vec::new()));
            (Self { updates: updates.clone() }, updates)
        }
    }

    impl StatusObserver for TestObserver {
        fn on_status_update(&self, update: StatusUpdate) {
            self.updates.lock().unwrap().push(update);
        }
    }

    #[test]
    fn test_stage_weights_cover_whole_run() {
        let total: f32 = DubStage::ALL.iter().map(DubStage::weight).sum();
        assert_eq!(total, 100.0);
        assert_eq!(DubStage::ExtractingAudio.progress_before(), 0.0);
        assert_eq!(DubStage::Submitting.progress_before(), 90.0);
    }

    #[test]
    fn test_tracker_reports_each_transition() {
        let reporter = DefaultStatusReporter::new();
        let (observer, updates) = TestObserver::new();
        reporter.add_observer(Box::new(observer));

        let mut tracker = DubTracker::new(&reporter, "task-1");
        for stage in DubStage::ALL {
            tracker.enter(stage);
        }
        tracker.succeed();

        let updates = updates.lock().unwrap();
        let messages: Vec<&str> = updates.iter().map(|u| u.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "Extracting audio from video...",
                "Converting to selected voice...",
                "Analyzing face...",
                "Submitting lip-sync job...",
                "Success! Check the task list.",
            ]
        );
        assert!(updates.iter().all(|u| u.task_id == "task-1" && u.run_id == tracker.run_id()));
        assert_eq!(updates.last().unwrap().total_progress, 100.0);
    }

    #[test]
    fn test_terminal_state_is_final() {
        let reporter = DefaultStatusReporter::new();
        let (observer, updates) = TestObserver::new();
        reporter.add_observer(Box::new(observer));

        let mut tracker = DubTracker::new(&reporter, "t");
        tracker.enter(DubStage::ExtractingAudio);
        tracker.fail(&DubFailure::AudioExtraction);
        tracker.enter(DubStage::ConvertingVoice);
        tracker.succeed();

        let updates = updates.lock().unwrap();
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[1].message, "error: audio extraction failed");
        assert_eq!(tracker.state(), &DubState::Failed("audio extraction failed".into()));
    }

    #[test]
    fn test_failure_from_idle_is_allowed() {
        let reporter = DefaultStatusReporter::new();
        let mut tracker = DubTracker::new(&reporter, "t");
        tracker.fail(&DubFailure::MissingVoice);
        assert!(tracker.state().is_terminal());
    }

    #[test]
    fn test_remove_observer() {
        let reporter = DefaultStatusReporter::new();
        let (observer, updates) = TestObserver::new();
        let id = reporter.add_observer(Box::new(observer));
        assert_eq!(reporter.observer_count(), 1);
        assert!(reporter.remove_observer(id).is_some());

        DubTracker::new(&reporter, "t").enter(DubStage::ExtractingAudio);
        assert!(updates.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_broadcast_reporter_delivers_to_subscribers() {
        let (reporter, mut rx) = BroadcastStatusReporter::new(16);
        let mut tracker = DubTracker::new(&reporter, "t");
        tracker.enter(DubStage::ExtractingAudio);
        tracker.fail(&DubFailure::NoFaceDetected);

        assert_eq!(rx.recv().await.unwrap().state, DubState::ExtractingAudio);
        let last = rx.recv().await.unwrap();
        assert_eq!(last.message, "error: no face detected");
    }
}
