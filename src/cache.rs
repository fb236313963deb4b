use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Duration, Utc};
use log::{debug, warn};

use crate::datetime;
use crate::time_entry::{Project, Task, TimeEntry};

/// キャッシュの有効期間(秒)。
pub const TTL_SECONDS: i64 = 120;

/// キャッシュされた一覧と、その保存時刻。
#[derive(Clone, Debug)]
struct Cached<T> {
    data: Vec<T>,
    cached_at: DateTime<Utc>,
}

impl<T: Clone> Cached<T> {
    fn new(data: Vec<T>) -> Self {
        Self {
            data,
            cached_at: datetime::now(),
        }
    }

    /// 有効期間内かつ空でない場合のみ新鮮とみなす。
    ///
    /// 空の一覧は一時的な取得結果の可能性があるため、常にキャッシュミスとして扱う。
    fn fresh(&self, ttl: Duration) -> Option<Vec<T>> {
        if self.data.is_empty() || datetime::now() - self.cached_at >= ttl {
            return None;
        }
        Some(self.data.clone())
    }

    fn touch(&mut self) {
        self.cached_at = datetime::now();
    }
}

#[derive(Debug, Default)]
struct Store {
    entries: Option<Cached<TimeEntry>>,
    projects: Option<Cached<Project>>,
    tasks: HashMap<String, Cached<Task>>,
}

/// time entry、プロジェクト、プロジェクトごとのタスクを保持する短命なキャッシュ。
///
/// アプリケーションの起動時に1つだけ生成し、`Arc`で共有する。
/// 読み取りは一覧全体を複製して返すため、更新途中の状態が見えることはない。
///
/// # Examples
///
/// ```
/// let cache = Cache::new();
/// cache.set_entries(entries);
/// let cached = cache.entries();
/// ```
#[derive(Debug)]
pub struct Cache {
    ttl: Duration,
    store: RwLock<Store>,
}

impl Default for Cache {
    fn default() -> Self {
        Self::new()
    }
}

impl Cache {
    /// 既定の有効期間(2分)で新しい`Cache`を返す。
    pub fn new() -> Self {
        Self::with_ttl(Duration::seconds(TTL_SECONDS))
    }

    /// 有効期間を指定して新しい`Cache`を返す。
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            store: RwLock::new(Store::default()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Store> {
        self.store.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Store> {
        self.store.write().unwrap_or_else(PoisonError::into_inner)
    }

    // ---- time entries ----

    /// キャッシュされたtime entryを返す。期限切れまたは空の場合は`None`。
    pub fn entries(&self) -> Option<Vec<TimeEntry>> {
        self.read()
            .entries
            .as_ref()
            .and_then(|cached| cached.fresh(self.ttl))
    }

    pub fn set_entries(&self, entries: Vec<TimeEntry>) {
        debug!("Caching {} time entries", entries.len());
        self.write().entries = Some(Cached::new(entries));
    }

    /// time entryを一覧の先頭に追加する。
    ///
    /// 一覧がまだキャッシュされていない場合は何もしない。
    /// 次回の読み取りでサーバーから取得され、追加したentryも含まれるため。
    pub fn add_entry(&self, entry: TimeEntry) {
        let mut store = self.write();
        match store.entries.as_mut() {
            Some(cached) => {
                cached.data.insert(0, entry);
                cached.touch();
            }
            None => debug!("No cached entries, skip adding entry {}", entry.id),
        }
    }

    /// 同じ`id`を持つ最初のtime entryをその位置で置き換える。
    ///
    /// 置き換えた場合は`true`を返す。見つからない場合は一覧を変更せずに`false`を返す。
    pub fn update_entry(&self, entry: TimeEntry) -> bool {
        let mut store = self.write();
        let Some(cached) = store.entries.as_mut() else {
            return false;
        };
        match cached.data.iter_mut().find(|candidate| candidate.id == entry.id) {
            Some(slot) => {
                *slot = entry;
                cached.touch();
                true
            }
            None => {
                warn!("Entry {} is not cached, nothing to update", entry.id);
                false
            }
        }
    }

    /// 同じ`id`を持つ最初のtime entryを取り除く。残りの順序は維持する。
    ///
    /// 取り除いた場合は`true`を返す。
    pub fn remove_entry(&self, id: &str) -> bool {
        let mut store = self.write();
        let Some(cached) = store.entries.as_mut() else {
            return false;
        };
        match cached.data.iter().position(|entry| entry.id == id) {
            Some(index) => {
                cached.data.remove(index);
                cached.touch();
                true
            }
            None => {
                warn!("Entry {} is not cached, nothing to remove", id);
                false
            }
        }
    }

    pub fn invalidate_entries(&self) {
        self.write().entries = None;
    }

    // ---- projects ----

    pub fn projects(&self) -> Option<Vec<Project>> {
        self.read()
            .projects
            .as_ref()
            .and_then(|cached| cached.fresh(self.ttl))
    }

    pub fn set_projects(&self, projects: Vec<Project>) {
        debug!("Caching {} projects", projects.len());
        self.write().projects = Some(Cached::new(projects));
    }

    pub fn invalidate_projects(&self) {
        self.write().projects = None;
    }

    // ---- tasks ----

    /// 指定したプロジェクトのタスクを返す。プロジェクトごとに有効期間を判定する。
    pub fn tasks(&self, project_id: &str) -> Option<Vec<Task>> {
        self.read()
            .tasks
            .get(project_id)
            .and_then(|cached| cached.fresh(self.ttl))
    }

    pub fn set_tasks(&self, project_id: &str, tasks: Vec<Task>) {
        debug!("Caching {} tasks for project {}", tasks.len(), project_id);
        self.write()
            .tasks
            .insert(project_id.to_string(), Cached::new(tasks));
    }

    pub fn invalidate_tasks(&self, project_id: &str) {
        self.write().tasks.remove(project_id);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use chrono::{DateTime, Duration, TimeZone, Utc};

    use super::{Cache, TTL_SECONDS};
    use crate::datetime::mock_datetime;
    use crate::time_entry::{Project, Task, TimeEntry};

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap()
    }

    fn entry(id: &str, description: &str) -> TimeEntry {
        TimeEntry {
            id: id.to_string(),
            description: description.to_string(),
            ..Default::default()
        }
    }

    fn ids(entries: &[TimeEntry]) -> Vec<&str> {
        entries.iter().map(|entry| entry.id.as_str()).collect()
    }

    fn task(id: &str) -> Task {
        Task {
            id: id.to_string(),
            name: format!("Task {}", id),
        }
    }

    #[test]
    fn test_empty_cache_is_miss() {
        let cache = Cache::new();

        assert!(cache.entries().is_none());
        assert!(cache.projects().is_none());
        assert!(cache.tasks("p1").is_none());
    }

    /// 保存から有効期間の直前までは取得でき、有効期間ちょうどで期限切れになることを確認する。
    #[test]
    fn test_freshness_window() {
        mock_datetime::set_mock_time(base_time());
        let cache = Cache::new();
        cache.set_entries(vec![entry("1", "first")]);

        assert_eq!(cache.entries().map(|e| e.len()), Some(1));

        mock_datetime::set_mock_time(base_time() + Duration::seconds(TTL_SECONDS - 1));
        assert!(cache.entries().is_some());

        mock_datetime::set_mock_time(base_time() + Duration::seconds(TTL_SECONDS));
        assert!(cache.entries().is_none());

        mock_datetime::set_mock_time(base_time() + Duration::seconds(TTL_SECONDS * 10));
        assert!(cache.entries().is_none());
        mock_datetime::clear_mock_time();
    }

    /// 空の一覧は経過時間に関わらずキャッシュミスになることを確認する。
    #[test]
    fn test_empty_list_is_miss() {
        mock_datetime::set_mock_time(base_time());
        let cache = Cache::new();
        cache.set_entries(vec![]);
        cache.set_projects(vec![]);
        cache.set_tasks("p1", vec![]);

        assert!(cache.entries().is_none());
        assert!(cache.projects().is_none());
        assert!(cache.tasks("p1").is_none());
        mock_datetime::clear_mock_time();
    }

    /// 期限切れの読み取りはデータを消さず、再保存で再び取得できることを確認する。
    #[test]
    fn test_stale_read_does_not_evict() {
        mock_datetime::set_mock_time(base_time());
        let cache = Cache::new();
        cache.set_entries(vec![entry("1", "first")]);

        mock_datetime::advance(Duration::seconds(TTL_SECONDS));
        assert!(cache.entries().is_none());

        // add_entryは古い一覧に対して行われ、保存時刻を更新する
        cache.add_entry(entry("2", "second"));
        assert_eq!(ids(&cache.entries().unwrap()), vec!["2", "1"]);
        mock_datetime::clear_mock_time();
    }

    #[test]
    fn test_add_entry_prepends() {
        let cache = Cache::new();
        cache.set_entries(vec![entry("1", "first"), entry("2", "second")]);

        cache.add_entry(entry("3", "new"));

        assert_eq!(ids(&cache.entries().unwrap()), vec!["3", "1", "2"]);
    }

    #[test]
    fn test_add_entry_without_cached_list_is_ignored() {
        let cache = Cache::new();

        cache.add_entry(entry("3", "new"));

        assert!(cache.entries().is_none());
    }

    /// mutationで保存時刻が更新されることを確認する。
    #[test]
    fn test_mutation_refreshes_cached_at() {
        mock_datetime::set_mock_time(base_time());
        let cache = Cache::new();
        cache.set_entries(vec![entry("1", "first"), entry("2", "second")]);

        mock_datetime::advance(Duration::seconds(TTL_SECONDS - 10));
        assert!(cache.update_entry(entry("1", "changed")));

        mock_datetime::advance(Duration::seconds(30));
        assert!(cache.entries().is_some());
        mock_datetime::clear_mock_time();
    }

    #[test]
    fn test_update_entry_in_place() {
        let cache = Cache::new();
        cache.set_entries(vec![
            entry("1", "first"),
            entry("2", "second"),
            entry("3", "third"),
        ]);

        assert!(cache.update_entry(entry("2", "updated")));

        let entries = cache.entries().unwrap();
        assert_eq!(ids(&entries), vec!["1", "2", "3"]);
        assert_eq!(entries[1].description, "updated");
        assert_eq!(entries[0].description, "first");
    }

    #[test]
    fn test_update_entry_unknown_id() {
        let cache = Cache::new();
        cache.set_entries(vec![entry("1", "first")]);

        assert!(!cache.update_entry(entry("9", "ghost")));
        assert_eq!(cache.entries().unwrap(), vec![entry("1", "first")]);
    }

    #[test]
    fn test_remove_entry_keeps_order() {
        let cache = Cache::new();
        cache.set_entries(vec![
            entry("1", "first"),
            entry("2", "second"),
            entry("3", "third"),
        ]);

        assert!(cache.remove_entry("2"));
        assert_eq!(ids(&cache.entries().unwrap()), vec!["1", "3"]);

        assert!(!cache.remove_entry("2"));
        assert_eq!(cache.entries().unwrap().len(), 2);
    }

    /// 最後の1件を削除すると空の一覧になり、キャッシュミスになることを確認する。
    #[test]
    fn test_remove_last_entry_is_miss() {
        let cache = Cache::new();
        cache.set_entries(vec![entry("1", "first")]);

        assert!(cache.remove_entry("1"));
        assert!(cache.entries().is_none());
    }

    #[test]
    fn test_invalidate_entries() {
        let cache = Cache::new();
        cache.set_entries(vec![entry("1", "first")]);

        cache.invalidate_entries();

        assert!(cache.entries().is_none());
        assert!(!cache.update_entry(entry("1", "changed")));
    }

    #[test]
    fn test_projects() {
        let cache = Cache::new();
        let project = |id: &str| Project {
            id: id.to_string(),
            name: format!("Project {}", id),
            ..Default::default()
        };
        cache.set_projects(vec![project("p1"), project("p2")]);

        let projects = cache.projects().unwrap();
        assert_eq!(projects.len(), 2);
        assert_eq!(projects[1].id, "p2");

        cache.invalidate_projects();
        assert!(cache.projects().is_none());
    }

    /// プロジェクトごとのタスクは独立して期限切れ・無効化されることを確認する。
    #[test]
    fn test_tasks_are_keyed_per_project() {
        mock_datetime::set_mock_time(base_time());
        let cache = Cache::new();
        cache.set_tasks("p1", vec![task("t1")]);

        mock_datetime::advance(Duration::seconds(TTL_SECONDS / 2));
        cache.set_tasks("p2", vec![task("t2"), task("t3")]);
        cache.set_tasks("p3", vec![task("t4")]);

        mock_datetime::advance(Duration::seconds(TTL_SECONDS / 2));
        assert!(cache.tasks("p1").is_none());
        assert_eq!(cache.tasks("p2").map(|t| t.len()), Some(2));

        cache.invalidate_tasks("p3");
        assert!(cache.tasks("p3").is_none());
        assert!(cache.tasks("p2").is_some());
        mock_datetime::clear_mock_time();
    }

    /// 複数スレッドからの同時アクセスで、読み取りが常に一貫した一覧を返すことを確認する。
    #[test]
    fn test_concurrent_access() {
        let cache = Arc::new(Cache::new());
        cache.set_entries(vec![entry("seed-a", "a"), entry("seed-b", "b")]);

        let writer = {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                for i in 0..100 {
                    let id = format!("w{}", i);
                    cache.set_entries(vec![entry(&id, "x"), entry(&id, "y")]);
                }
            })
        };
        let reader = {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                for _ in 0..100 {
                    if let Some(entries) = cache.entries() {
                        assert_eq!(entries.len(), 2);
                        assert_eq!(entries[0].id, entries[1].id.replace("seed-b", "seed-a"));
                    }
                }
            })
        };

        writer.join().unwrap();
        reader.join().unwrap();
    }
}
