//! Сводный список задач
//!
//! Оба списка запрашиваются параллельно; сбой одного источника дает
//! пустой вклад, а не ошибку всего вызова.

use std::sync::Arc;
use std::time::Duration;

use crate::models::{RawTask, Task, TaskOrigin};
use crate::providers::TaskSource;

pub struct TaskAggregator {
    motion: Arc<dyn TaskSource>,
    lip_sync: Arc<dyn TaskSource>,
}

impl TaskAggregator {
    pub fn new(motion: Arc<dyn TaskSource>, lip_sync: Arc<dyn TaskSource>) -> Self {
        Self { motion, lip_sync }
    }

    /// Все задачи, от новых к старым. Никогда не возвращает ошибку.
    pub async fn list(&self) -> Vec<Task> {
        let (motion, lip_sync) = tokio::join!(
            fetch_settled(self.motion.as_ref()),
            fetch_settled(self.lip_sync.as_ref())
        );
        merge_tasks(vec![motion, lip_sync])
    }

    /// Список после паузы: провайдеру нужно время, чтобы новая задача появилась в выдаче
    pub async fn list_after(&self, delay: Duration) -> Vec<Task> {
        tokio::time::sleep(delay).await;
        self.list().await
    }
}

async fn fetch_settled(source: &dyn TaskSource) -> (TaskOrigin, Vec<RawTask>) {
    let origin = source.origin();
    match source.list_tasks().await {
        Ok(tasks) => {
            log::debug!("Fetched {} {} tasks", tasks.len(), origin);
            (origin, tasks)
        }
        Err(e) => {
            log::warn!("Failed to fetch {} tasks, continuing without them: {}", origin, e);
            (origin, Vec::new())
        }
    }
}

/// Пометить источником, склеить пачки в порядке аргументов и отсортировать.
///
/// Сортировка устойчивая: при равном времени создания сохраняется порядок
/// провайдера и порядок пачек.
pub fn merge_tasks(batches: Vec<(TaskOrigin, Vec<RawTask>)>) -> Vec<Task> {
    let mut merged: Vec<Task> = batches
        .into_iter()
        .flat_map(|(origin, raw)| raw.into_iter().map(move |task| Task::from_raw(task, origin)))
        .collect();
    merged.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    merged
}
