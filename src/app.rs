use std::sync::Arc;

use anyhow::Context;
use chrono::Local;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use log::{debug, error, info};

use crate::cache::Cache;
use crate::clockify::ClockifyRepository;
use crate::config::Config;
use crate::fetch;
use crate::messages::Message;
use crate::submission::{into_message, Submission, SubmissionGateway};
use crate::time_entry::{Project, TimeEntry};
use crate::wizard::{Wizard, WizardCommand, WizardEvent};

/// `App`がイベントループに依頼する処理。
#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    FetchProjects,
    FetchEntries,
    FetchTasks { project_id: String },
    Submit(Submission),
    DeleteEntry { entry_id: String },
    Quit,
}

/// time entry一覧と、作成・編集ウィザードのモーダルを管理する。
pub struct App {
    config: Config,
    cache: Arc<Cache>,
    projects: Vec<Project>,
    entries: Vec<TimeEntry>,
    cursor: usize,
    loading: bool,
    status: Option<String>,
    wizard: Option<Wizard>,
    /// 削除の確認中のtime entryのID。
    pending_delete: Option<String>,
    /// ウィザードだけを表示するモード。ウィザードを閉じると終了する。
    standalone: bool,
}

impl App {
    /// 新しい`App`を返す。
    ///
    /// # Arguments
    ///
    /// * `config` - 接続先のワークスペースとユーザー
    /// * `cache` - 取得結果を共有するキャッシュ
    pub fn new(config: Config, cache: Arc<Cache>) -> Self {
        Self {
            config,
            cache,
            projects: vec![],
            entries: vec![],
            cursor: 0,
            loading: true,
            status: None,
            wizard: None,
            pending_delete: None,
            standalone: false,
        }
    }

    /// 起動直後からウィザードを表示し、閉じると終了する`App`を返す。
    pub fn standalone(config: Config, cache: Arc<Cache>) -> Self {
        let wizard = Wizard::new(&config.workspace_id, vec![]);
        let mut app = Self::new(config, cache);
        app.wizard = Some(wizard);
        app.standalone = true;
        app
    }

    /// 起動時に実行する処理。
    pub fn init(&self) -> Vec<Effect> {
        if self.standalone {
            vec![Effect::FetchProjects]
        } else {
            vec![Effect::FetchProjects, Effect::FetchEntries]
        }
    }

    pub fn entries(&self) -> &[TimeEntry] {
        &self.entries
    }

    pub fn wizard(&self) -> Option<&Wizard> {
        self.wizard.as_ref()
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// メッセージを処理し、実行する処理を返す。
    pub fn update(&mut self, message: Message) -> Vec<Effect> {
        match message {
            Message::Key(key) => self.handle_key(key),
            Message::Resize(width, height) => {
                debug!("Terminal resized to {}x{}", width, height);
                vec![]
            }
            Message::ProjectsLoaded(projects) => {
                info!("{} projects loaded", projects.len());
                self.projects = projects;
                if let Some(wizard) = self.wizard.take() {
                    self.wizard = Some(wizard.set_projects(self.projects.clone()));
                }
                vec![]
            }
            Message::TasksLoaded { project_id, tasks } => {
                self.update_wizard(WizardEvent::TasksLoaded { project_id, tasks })
            }
            Message::TasksFailed { project_id, error } => {
                self.update_wizard(WizardEvent::TasksFailed { project_id, error })
            }
            Message::EntriesLoaded(entries) => {
                self.entries = entries;
                self.cursor = self.cursor.min(self.entries.len().saturating_sub(1));
                self.loading = false;
                vec![]
            }
            Message::EntrySaved(entry) => {
                self.cache.add_entry(entry.clone());
                self.status = Some("Time entry created.".to_string());
                let mut effects = self.update_wizard(WizardEvent::Submitted(entry));
                effects.push(Effect::FetchEntries);
                effects
            }
            Message::EntryUpdated(entry) => {
                self.cache.update_entry(entry.clone());
                self.status = Some("Time entry updated.".to_string());
                let mut effects = self.update_wizard(WizardEvent::Submitted(entry));
                effects.push(Effect::FetchEntries);
                effects
            }
            Message::EntryDeleted(entry_id) => {
                self.cache.remove_entry(&entry_id);
                self.status = Some("Time entry deleted.".to_string());
                vec![Effect::FetchEntries]
            }
            Message::SubmitFailed(error) => {
                error!("Failed to submit time entry: {}", error);
                self.update_wizard(WizardEvent::SubmitFailed(error))
            }
            Message::Error(error) => {
                self.loading = false;
                self.status = Some(format!("Error: {}", error));
                vec![]
            }
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Vec<Effect> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return vec![Effect::Quit];
        }
        if self.wizard.is_some() {
            return self.update_wizard(WizardEvent::Key(key));
        }
        if let Some(entry_id) = self.pending_delete.take() {
            if key.code == KeyCode::Char('y') {
                info!("Deleting time entry {}", entry_id);
                self.status = Some("Deleting...".to_string());
                return vec![Effect::DeleteEntry { entry_id }];
            }
            self.status = None;
            return vec![];
        }

        match key.code {
            KeyCode::Char('q') => vec![Effect::Quit],
            KeyCode::Char('n') => {
                self.status = None;
                self.wizard = Some(Wizard::new(
                    &self.config.workspace_id,
                    self.projects.clone(),
                ));
                vec![]
            }
            KeyCode::Char('e') => {
                if let Some(entry) = self.entries.get(self.cursor) {
                    self.status = None;
                    self.wizard = Some(Wizard::edit(
                        &self.config.workspace_id,
                        self.projects.clone(),
                        entry.clone(),
                    ));
                }
                vec![]
            }
            KeyCode::Char('d') => {
                if let Some(entry) = self.entries.get(self.cursor) {
                    self.pending_delete = Some(entry.id.clone());
                    self.status = Some(format!("Delete \"{}\"? (y/n)", entry.description));
                }
                vec![]
            }
            KeyCode::Char('r') => {
                self.cache.invalidate_entries();
                self.loading = true;
                self.status = None;
                if self.projects.is_empty() {
                    self.cache.invalidate_projects();
                    vec![Effect::FetchProjects, Effect::FetchEntries]
                } else {
                    vec![Effect::FetchEntries]
                }
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.cursor = self.cursor.saturating_sub(1);
                vec![]
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.cursor + 1 < self.entries.len() {
                    self.cursor += 1;
                }
                vec![]
            }
            _ => vec![],
        }
    }

    /// ウィザードにイベントを渡し、ウィザードが返した処理を`Effect`に変換する。
    fn update_wizard(&mut self, event: WizardEvent) -> Vec<Effect> {
        let Some(wizard) = self.wizard.take() else {
            debug!("No wizard open, ignore {:?}", event);
            return vec![];
        };
        let (wizard, commands) = wizard.update(event);
        self.wizard = Some(wizard);

        let mut effects = vec![];
        for command in commands {
            match command {
                WizardCommand::FetchProjects => {
                    self.cache.invalidate_projects();
                    self.status = None;
                    effects.push(Effect::FetchProjects)
                }
                WizardCommand::FetchTasks { project_id } => {
                    effects.push(Effect::FetchTasks { project_id })
                }
                WizardCommand::Submit(submission) => effects.push(Effect::Submit(submission)),
                WizardCommand::Close => effects.extend(self.close_modal()),
            }
        }
        effects
    }

    fn close_modal(&mut self) -> Vec<Effect> {
        self.wizard = None;
        if self.standalone {
            vec![Effect::Quit]
        } else {
            vec![]
        }
    }

    /// 現在の画面を行ごとの文字列として返す。
    pub fn view(&self) -> Vec<String> {
        if let Some(wizard) = &self.wizard {
            let mut lines = wizard.view();
            if let Some(status) = &self.status {
                lines.push(String::new());
                lines.push(status.clone());
            }
            return lines;
        }

        let mut lines = vec![
            format!("Time Entries ({})", self.config.workspace_name),
            String::new(),
        ];
        if self.loading {
            lines.push("Loading entries...".to_string());
        } else if self.entries.is_empty() {
            lines.push("No time entries.".to_string());
        }
        for (index, entry) in self.entries.iter().enumerate() {
            let prefix = if index == self.cursor { "❯" } else { " " };
            lines.push(format!("{} {}", prefix, self.format_entry(entry)));
        }

        lines.push(String::new());
        if let Some(status) = &self.status {
            lines.push(status.clone());
        }
        lines.push("n: new  e: edit  d: delete  r: refresh  q: quit".to_string());
        lines
    }

    fn format_entry(&self, entry: &TimeEntry) -> String {
        let start = entry.time_interval.start.with_timezone(&Local);
        let end = entry.time_interval.end.map_or_else(
            || "now".to_string(),
            |end| end.with_timezone(&Local).format("%H:%M").to_string(),
        );
        let project = entry
            .project_id
            .as_deref()
            .and_then(|id| self.projects.iter().find(|project| project.id == id))
            .map_or_else(String::new, |project| format!("  [{}]", project.name));
        format!(
            "{} {}-{}  {}{}",
            start.format("%Y-%m-%d"),
            start.format("%H:%M"),
            end,
            entry.description,
            project
        )
    }
}

/// `Effect`を実行し、結果をメッセージとして返す。
///
/// イベントループから別タスクで実行できるよう、共有する値はすべて`Arc`で保持する。
pub struct EffectRunner<R: ClockifyRepository + ?Sized> {
    repository: Arc<R>,
    cache: Arc<Cache>,
    workspace_id: String,
    user_id: String,
}

impl<R: ClockifyRepository + ?Sized> Clone for EffectRunner<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            cache: Arc::clone(&self.cache),
            workspace_id: self.workspace_id.clone(),
            user_id: self.user_id.clone(),
        }
    }
}

impl<R: ClockifyRepository + ?Sized> EffectRunner<R> {
    /// 新しい`EffectRunner`を返す。
    pub fn new(repository: Arc<R>, cache: Arc<Cache>, config: &Config) -> Self {
        Self {
            repository,
            cache,
            workspace_id: config.workspace_id.clone(),
            user_id: config.user_id.clone(),
        }
    }

    /// `Effect`を実行する。`Effect::Quit`はイベントループで扱うため`None`を返す。
    pub async fn run(&self, effect: Effect) -> Option<Message> {
        let repository = self.repository.as_ref();
        let message = match effect {
            Effect::FetchProjects => {
                fetch::fetch_projects(repository, &self.cache, &self.workspace_id).await
            }
            Effect::FetchEntries => {
                fetch::fetch_entries(repository, &self.cache, &self.workspace_id, &self.user_id)
                    .await
            }
            Effect::FetchTasks { project_id } => {
                fetch::fetch_tasks(repository, &self.cache, &self.workspace_id, &project_id).await
            }
            Effect::Submit(submission) => {
                let result = SubmissionGateway::new(repository)
                    .submit(&submission)
                    .await;
                into_message(submission.editing, result)
            }
            Effect::DeleteEntry { entry_id } => {
                match repository
                    .delete_time_entry(&self.workspace_id, &entry_id)
                    .await
                    .with_context(|| format!("Failed to delete time entry {}", entry_id))
                {
                    Ok(()) => Message::EntryDeleted(entry_id),
                    Err(err) => {
                        error!("{:#}", err);
                        Message::Error(format!("{:#}", err))
                    }
                }
            }
            Effect::Quit => return None,
        };

        Some(message)
    }
}
