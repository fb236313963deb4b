use anyhow::{Context, Result};
use log::{debug, error};

use crate::cache::Cache;
use crate::clockify::ClockifyRepository;
use crate::messages::Message;
use crate::time_entry::{Project, Task, TimeEntry};

/// キャッシュを優先してプロジェクト一覧を取得する。
///
/// キャッシュミスの場合はAPIから取得し、結果をキャッシュに保存する。
pub async fn read_projects<R: ClockifyRepository + ?Sized>(
    repository: &R,
    cache: &Cache,
    workspace_id: &str,
) -> Result<Vec<Project>> {
    if let Some(projects) = cache.projects() {
        debug!("Using {} cached projects", projects.len());
        return Ok(projects);
    }

    let projects = repository
        .read_projects(workspace_id)
        .await
        .context("Failed to retrieve projects")?;
    cache.set_projects(projects.clone());

    Ok(projects)
}

/// キャッシュを優先してプロジェクトのタスク一覧を取得する。
pub async fn read_tasks<R: ClockifyRepository + ?Sized>(
    repository: &R,
    cache: &Cache,
    workspace_id: &str,
    project_id: &str,
) -> Result<Vec<Task>> {
    if let Some(tasks) = cache.tasks(project_id) {
        debug!("Using {} cached tasks for project {}", tasks.len(), project_id);
        return Ok(tasks);
    }

    let tasks = repository
        .read_tasks(workspace_id, project_id)
        .await
        .context("Failed to retrieve tasks")?;
    cache.set_tasks(project_id, tasks.clone());

    Ok(tasks)
}

/// キャッシュを優先して直近のtime entryを取得する。
pub async fn read_entries<R: ClockifyRepository + ?Sized>(
    repository: &R,
    cache: &Cache,
    workspace_id: &str,
    user_id: &str,
) -> Result<Vec<TimeEntry>> {
    if let Some(entries) = cache.entries() {
        debug!("Using {} cached time entries", entries.len());
        return Ok(entries);
    }

    let entries = repository
        .read_time_entries(workspace_id, user_id)
        .await
        .context("Failed to retrieve time entries")?;
    cache.set_entries(entries.clone());

    Ok(entries)
}

/// プロジェクト一覧を取得し、結果をメッセージとして返す。
pub async fn fetch_projects<R: ClockifyRepository + ?Sized>(
    repository: &R,
    cache: &Cache,
    workspace_id: &str,
) -> Message {
    match read_projects(repository, cache, workspace_id).await {
        Ok(projects) => Message::ProjectsLoaded(projects),
        Err(err) => {
            error!("{:#}", err);
            Message::Error(format!("{:#}", err))
        }
    }
}

/// タスク一覧を取得し、取得対象のプロジェクトIDを付けたメッセージとして返す。
pub async fn fetch_tasks<R: ClockifyRepository + ?Sized>(
    repository: &R,
    cache: &Cache,
    workspace_id: &str,
    project_id: &str,
) -> Message {
    match read_tasks(repository, cache, workspace_id, project_id).await {
        Ok(tasks) => Message::TasksLoaded {
            project_id: project_id.to_string(),
            tasks,
        },
        Err(err) => {
            error!("{:#}", err);
            Message::TasksFailed {
                project_id: project_id.to_string(),
                error: format!("{:#}", err),
            }
        }
    }
}

/// 直近のtime entryを取得し、結果をメッセージとして返す。
pub async fn fetch_entries<R: ClockifyRepository + ?Sized>(
    repository: &R,
    cache: &Cache,
    workspace_id: &str,
    user_id: &str,
) -> Message {
    match read_entries(repository, cache, workspace_id, user_id).await {
        Ok(entries) => Message::EntriesLoaded(entries),
        Err(err) => {
            error!("{:#}", err);
            Message::Error(format!("{:#}", err))
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use super::{fetch_entries, fetch_projects, fetch_tasks};
    use crate::cache::Cache;
    use crate::clockify::MockClockifyRepository;
    use crate::messages::Message;
    use crate::time_entry::{Project, Task, TimeEntry};

    fn project(id: &str) -> Project {
        Project {
            id: id.to_string(),
            name: id.to_uppercase(),
            ..Default::default()
        }
    }

    fn task(id: &str) -> Task {
        Task {
            id: id.to_string(),
            name: id.to_uppercase(),
        }
    }

    /// キャッシュミスの場合はAPIから取得し、2回目はキャッシュから返すことを確認する。
    #[tokio::test]
    async fn test_fetch_projects_reads_through_cache() {
        let cache = Cache::new();
        let mut repository = MockClockifyRepository::new();
        repository
            .expect_read_projects()
            .withf(|workspace_id| workspace_id == "ws1")
            .times(1)
            .returning(|_| Ok(vec![project("p1"), project("p2")]));

        let first = fetch_projects(&repository, &cache, "ws1").await;
        let second = fetch_projects(&repository, &cache, "ws1").await;

        assert!(matches!(first, Message::ProjectsLoaded(ref projects) if projects.len() == 2));
        assert!(matches!(second, Message::ProjectsLoaded(ref projects) if projects.len() == 2));
        assert_eq!(cache.projects().unwrap().len(), 2);
    }

    /// 空の結果はキャッシュされず、次回も取得し直すことを確認する。
    #[tokio::test]
    async fn test_fetch_tasks_empty_result_is_refetched() {
        let cache = Cache::new();
        let mut repository = MockClockifyRepository::new();
        repository
            .expect_read_tasks()
            .withf(|_, project_id| project_id == "p1")
            .times(2)
            .returning(|_, _| Ok(vec![]));

        fetch_tasks(&repository, &cache, "ws1", "p1").await;
        let message = fetch_tasks(&repository, &cache, "ws1", "p1").await;

        match message {
            Message::TasksLoaded { project_id, tasks } => {
                assert_eq!(project_id, "p1");
                assert!(tasks.is_empty());
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_tasks_uses_cached_tasks() {
        let cache = Cache::new();
        cache.set_tasks("p1", vec![task("t1")]);
        let mut repository = MockClockifyRepository::new();
        repository.expect_read_tasks().times(0);

        let message = fetch_tasks(&repository, &cache, "ws1", "p1").await;

        assert!(matches!(message, Message::TasksLoaded { ref tasks, .. } if tasks[0].id == "t1"));
    }

    #[tokio::test]
    async fn test_fetch_tasks_error_keeps_project_id() {
        let cache = Cache::new();
        let mut repository = MockClockifyRepository::new();
        repository
            .expect_read_tasks()
            .returning(|_, _| Err(anyhow!("connection refused")));

        let message = fetch_tasks(&repository, &cache, "ws1", "p9").await;

        match message {
            Message::TasksFailed { project_id, error } => {
                assert_eq!(project_id, "p9");
                assert!(error.contains("connection refused"));
            }
            other => panic!("unexpected message: {:?}", other),
        }
        assert!(cache.tasks("p9").is_none());
    }

    #[tokio::test]
    async fn test_fetch_entries_error() {
        let cache = Cache::new();
        let mut repository = MockClockifyRepository::new();
        repository
            .expect_read_time_entries()
            .returning(|_, _| Err(anyhow!("timeout")));

        let message = fetch_entries(&repository, &cache, "ws1", "u1").await;

        assert!(matches!(message, Message::Error(ref error) if error.contains("timeout")));
    }

    #[tokio::test]
    async fn test_fetch_entries_stores_result() {
        let cache = Cache::new();
        let mut repository = MockClockifyRepository::new();
        repository
            .expect_read_time_entries()
            .withf(|workspace_id, user_id| workspace_id == "ws1" && user_id == "u1")
            .times(1)
            .returning(|_, _| {
                Ok(vec![TimeEntry {
                    id: "e1".to_string(),
                    ..Default::default()
                }])
            });

        let message = fetch_entries(&repository, &cache, "ws1", "u1").await;

        assert!(matches!(message, Message::EntriesLoaded(ref entries) if entries.len() == 1));
        assert_eq!(cache.entries().unwrap()[0].id, "e1");
    }
}
