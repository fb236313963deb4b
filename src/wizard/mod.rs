//! time entryを作成・編集するための複数画面のウィザード。
//!
//! 日付、説明、プロジェクト、タスク、時刻、確認、完了の順に画面を進める。
//! 状態遷移は`Wizard::update`で行い、古い状態とイベントから新しい状態を作る。
//! 通信は行わず、必要な処理は`WizardCommand`として呼び出し側に返す。

mod step;
mod text_input;
mod view;

use chrono::{DateTime, Days, Local};
use crossterm::event::{KeyCode, KeyEvent};
use log::{debug, info};

use crate::datetime;
use crate::submission::Submission;
use crate::time_entry::{Project, Task, TimeEntry};
use crate::validation::validate;

pub use step::{ProjectSelect, Step, TimeField};
#[cfg(test)]
pub use step::StepKind;
pub use text_input::TextInput;

/// 説明欄の最大文字数。
const DESCRIPTION_LIMIT: usize = 100;
/// 時刻欄の最大文字数。"12:00 PM"が入る長さ。
const TIME_LIMIT: usize = 8;

/// タスク一覧の読み込み状態。取得対象のプロジェクトIDを保持する。
#[derive(Clone, Debug, PartialEq)]
pub enum TaskList {
    NotLoaded,
    Loading { project_id: String },
    Ready { project_id: String, tasks: Vec<Task> },
    Failed { project_id: String, error: String },
}

impl TaskList {
    /// 読み込み済みのタスク一覧。「タスクなし」の選択肢を含む。
    pub fn ready(&self) -> Option<&[Task]> {
        match self {
            TaskList::Ready { tasks, .. } => Some(tasks),
            _ => None,
        }
    }

    /// 指定したプロジェクトについて、取得中または取得済みかどうか。
    fn covers(&self, id: &str) -> bool {
        match self {
            TaskList::Loading { project_id } | TaskList::Ready { project_id, .. } => {
                project_id == id
            }
            _ => false,
        }
    }
}

/// 画面をまたいで保持する入力内容。
#[derive(Clone, Debug, PartialEq)]
pub struct Draft {
    pub date: DateTime<Local>,
    pub description: TextInput,
    pub start: TextInput,
    pub end: TextInput,
    pub project: Option<Project>,
    /// `None`は「タスクなし」を表す。
    pub task: Option<Task>,
    pub tasks: TaskList,
}

impl Draft {
    fn new() -> Self {
        Self {
            date: datetime::local_now(),
            description: TextInput::with_limit(DESCRIPTION_LIMIT),
            start: TextInput::with_limit(TIME_LIMIT),
            end: TextInput::with_limit(TIME_LIMIT),
            project: None,
            task: None,
            tasks: TaskList::NotLoaded,
        }
    }
}

/// ウィザードが受け取るイベント。
#[derive(Clone, Debug)]
pub enum WizardEvent {
    Key(KeyEvent),
    TasksLoaded { project_id: String, tasks: Vec<Task> },
    TasksFailed { project_id: String, error: String },
    Submitted(TimeEntry),
    SubmitFailed(String),
}

/// ウィザードが呼び出し側に依頼する処理。
#[derive(Clone, Debug, PartialEq)]
pub enum WizardCommand {
    FetchProjects,
    FetchTasks { project_id: String },
    Submit(Submission),
    Close,
}

/// time entryの作成・編集ウィザード。
#[derive(Clone, Debug, PartialEq)]
pub struct Wizard {
    workspace_id: String,
    projects: Vec<Project>,
    /// 編集中のtime entry。`Some`の場合は編集モード。
    original: Option<TimeEntry>,
    draft: Draft,
    step: Step,
}

impl Wizard {
    /// 新規作成用のウィザードを返す。日付は今日になる。
    ///
    /// # Arguments
    ///
    /// * `workspace_id` - time entryを作成するワークスペース
    /// * `projects` - 選択肢となる読み込み済みのプロジェクト
    pub fn new(workspace_id: &str, projects: Vec<Project>) -> Self {
        Self {
            workspace_id: workspace_id.to_string(),
            projects,
            original: None,
            draft: Draft::new(),
            step: Step::DateSelect,
        }
    }

    /// 既存のtime entryを編集するウィザードを返す。
    ///
    /// 日付、説明、時刻(Localタイムゾーン)を入力済みにし、プロジェクトはIDが最初に一致したものを選択する。
    /// 一致するプロジェクトが無い場合は未選択のままにする。
    pub fn edit(workspace_id: &str, projects: Vec<Project>, entry: TimeEntry) -> Self {
        let mut wizard = Self::new(workspace_id, projects);

        let start = entry.time_interval.start.with_timezone(&Local);
        wizard.draft.date = start;
        wizard.draft.description = wizard.draft.description.with_value(&entry.description);
        wizard.draft.start = wizard.draft.start.with_value(&format_clock(&start));
        if let Some(end) = entry.time_interval.end {
            let end = end.with_timezone(&Local);
            wizard.draft.end = wizard.draft.end.with_value(&format_clock(&end));
        }

        wizard.draft.project = entry.project_id.as_deref().and_then(|project_id| {
            wizard
                .projects
                .iter()
                .find(|project| project.id == project_id)
                .cloned()
        });
        if wizard.draft.project.is_none() {
            debug!("Project of entry {} is not loaded", entry.id);
        }
        // タスク名は一覧の読み込み後に解決する
        wizard.draft.task = entry
            .task_id
            .clone()
            .filter(|id| !id.is_empty())
            .map(|id| Task {
                id,
                name: String::new(),
            });
        wizard.original = Some(entry);

        wizard
    }

    /// 入力内容を破棄し、同じワークスペースとプロジェクト一覧で新しいウィザードを返す。
    pub fn reset(self) -> Self {
        Self::new(&self.workspace_id, self.projects)
    }

    /// 選択肢となるプロジェクト一覧を差し替える。
    ///
    /// ウィザードを開いた後にプロジェクトの読み込みが完了した場合に利用する。
    pub fn set_projects(mut self, projects: Vec<Project>) -> Self {
        self.projects = projects;
        if let Step::ProjectSelect(select) = &mut self.step {
            let len = select.filter(&self.projects).len();
            select.cursor = select.cursor.min(len.saturating_sub(1));
        }
        self
    }

    pub fn step(&self) -> &Step {
        &self.step
    }

    #[cfg(test)]
    pub fn step_kind(&self) -> StepKind {
        self.step.kind()
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn is_editing(&self) -> bool {
        self.original.is_some()
    }

    pub fn original(&self) -> Option<&TimeEntry> {
        self.original.as_ref()
    }

    /// イベントを処理し、新しい状態と呼び出し側で実行する処理を返す。
    pub fn update(self, event: WizardEvent) -> (Self, Vec<WizardCommand>) {
        match event {
            WizardEvent::Key(key) => self.handle_key(key),
            WizardEvent::TasksLoaded { project_id, tasks } => {
                (self.tasks_loaded(&project_id, tasks), vec![])
            }
            WizardEvent::TasksFailed { project_id, error } => {
                (self.tasks_failed(&project_id, error), vec![])
            }
            WizardEvent::Submitted(entry) => (self.submitted(entry), vec![]),
            WizardEvent::SubmitFailed(error) => (self.submit_failed(error), vec![]),
        }
    }

    fn handle_key(self, key: KeyEvent) -> (Self, Vec<WizardCommand>) {
        match key.code {
            KeyCode::Esc => {
                info!("Entry wizard cancelled");
                (self.reset(), vec![WizardCommand::Close])
            }
            KeyCode::Tab => self.next(),
            KeyCode::BackTab => (self.previous(), vec![]),
            KeyCode::Enter => self.confirm_step(),
            KeyCode::Char('r') if self.can_reload_projects() => {
                info!("Reloading projects");
                (self, vec![WizardCommand::FetchProjects])
            }
            code => (self.edit_step(code), vec![]),
        }
    }

    /// 次の画面に進む。
    fn next(mut self) -> (Self, Vec<WizardCommand>) {
        if self.step.captures_navigation() {
            return (self, vec![]);
        }

        match self.step {
            Step::DateSelect => self.step = Step::DescriptionInput,
            Step::DescriptionInput => self.step = self.project_select(),
            Step::ProjectSelect(_) => {
                let Some(project_id) = self.draft.project.as_ref().map(|p| p.id.clone()) else {
                    debug!("No project selected, stay on project select");
                    return (self, vec![]);
                };
                let commands = if self.draft.tasks.covers(&project_id) {
                    vec![]
                } else {
                    self.draft.tasks = TaskList::Loading {
                        project_id: project_id.clone(),
                    };
                    vec![WizardCommand::FetchTasks { project_id }]
                };
                self.step = self.task_select();
                return (self, commands);
            }
            Step::TaskSelect { .. } => {
                if self.draft.tasks.ready().is_some() {
                    self.step = Step::time_input();
                }
            }
            Step::TimeInput { focus, errors } => {
                self.step = Step::TimeInput {
                    focus: focus.toggle(),
                    errors,
                };
            }
            Step::Confirm { .. } | Step::Complete { .. } => {}
        }

        (self, vec![])
    }

    /// 前の画面に戻る。送信中と完了後は戻れない。
    fn previous(mut self) -> Self {
        if self.step.captures_navigation() {
            return self;
        }

        self.step = match self.step {
            Step::DateSelect => Step::DateSelect,
            Step::DescriptionInput => Step::DateSelect,
            Step::ProjectSelect(_) => Step::DescriptionInput,
            Step::TaskSelect { .. } => self.project_select(),
            Step::TimeInput { .. } => self.task_select(),
            Step::Confirm {
                submitting: false, ..
            } => Step::time_input(),
            step @ (Step::Confirm { .. } | Step::Complete { .. }) => step,
        };

        self
    }

    /// Enterキーで現在の画面を確定する。
    fn confirm_step(mut self) -> (Self, Vec<WizardCommand>) {
        match self.step {
            Step::DateSelect => self.step = Step::DescriptionInput,
            Step::DescriptionInput => self.step = self.project_select(),
            Step::ProjectSelect(mut select) => {
                if select.searching {
                    select.searching = false;
                    select.cursor = 0;
                    self.step = Step::ProjectSelect(select);
                    return (self, vec![]);
                }
                let chosen = select.filter(&self.projects).get(select.cursor).cloned().cloned();
                let Some(project) = chosen else {
                    self.step = Step::ProjectSelect(select);
                    return (self, vec![]);
                };

                info!("Project {} selected", project.id);
                let project_id = project.id.clone();
                self.draft.project = Some(project);
                self.draft.task = None;
                self.draft.tasks = TaskList::Loading {
                    project_id: project_id.clone(),
                };
                self.step = Step::TaskSelect { cursor: 0 };
                return (self, vec![WizardCommand::FetchTasks { project_id }]);
            }
            Step::TaskSelect { cursor } => {
                if let Some(tasks) = self.draft.tasks.ready() {
                    self.draft.task = tasks.get(cursor).filter(|task| !task.is_none()).cloned();
                    self.step = Step::time_input();
                }
            }
            Step::TimeInput { focus, .. } => {
                let errors = validate(
                    self.draft.start.value(),
                    self.draft.end.value(),
                    &self.draft.date,
                );
                if errors.is_empty() {
                    self.step = Step::confirm();
                } else {
                    debug!("Time input is invalid: {:?}", errors);
                    self.step = Step::TimeInput { focus, errors };
                }
            }
            Step::Confirm {
                submitting: false, ..
            } => match self.submission() {
                Some(submission) => {
                    info!("Submitting time entry (editing: {})", submission.editing);
                    self.step = Step::Confirm {
                        submitting: true,
                        error: None,
                    };
                    return (self, vec![WizardCommand::Submit(submission)]);
                }
                None => {
                    self.step = Step::Confirm {
                        submitting: false,
                        error: Some("Select a project before submitting.".to_string()),
                    };
                }
            },
            Step::Confirm { .. } => {}
            Step::Complete { .. } => return (self, vec![WizardCommand::Close]),
        }

        (self, vec![])
    }

    /// 画面遷移以外のキー入力を処理する。
    fn edit_step(mut self, code: KeyCode) -> Self {
        match &mut self.step {
            Step::DateSelect => {
                let date = self.draft.date;
                self.draft.date = match code {
                    KeyCode::Left | KeyCode::Char('h') => {
                        date.checked_sub_days(Days::new(1)).unwrap_or(date)
                    }
                    KeyCode::Right | KeyCode::Char('l') => {
                        date.checked_add_days(Days::new(1)).unwrap_or(date)
                    }
                    KeyCode::Char('t') => datetime::local_now(),
                    _ => date,
                };
            }
            Step::DescriptionInput => {
                edit_text(&mut self.draft.description, code);
            }
            Step::ProjectSelect(select) => {
                let len = select.filter(&self.projects).len();
                match code {
                    KeyCode::Char('/') => select.searching = !select.searching,
                    KeyCode::Up => select.cursor = select.cursor.saturating_sub(1),
                    KeyCode::Down => {
                        if select.cursor + 1 < len {
                            select.cursor += 1;
                        }
                    }
                    code if select.searching => {
                        if edit_text(&mut select.search, code) {
                            select.cursor = 0;
                        }
                    }
                    KeyCode::Char('k') => select.cursor = select.cursor.saturating_sub(1),
                    KeyCode::Char('j') => {
                        if select.cursor + 1 < len {
                            select.cursor += 1;
                        }
                    }
                    _ => {}
                }
            }
            Step::TaskSelect { cursor } => {
                let len = self.draft.tasks.ready().map_or(0, |tasks| tasks.len());
                match code {
                    KeyCode::Up | KeyCode::Char('k') => *cursor = cursor.saturating_sub(1),
                    KeyCode::Down | KeyCode::Char('j') => {
                        if *cursor + 1 < len {
                            *cursor += 1;
                        }
                    }
                    _ => {}
                }
            }
            Step::TimeInput { focus, .. } => match focus {
                TimeField::Start => {
                    edit_text(&mut self.draft.start, code);
                }
                TimeField::End => {
                    edit_text(&mut self.draft.end, code);
                }
            },
            Step::Confirm { .. } | Step::Complete { .. } => {}
        }

        self
    }

    fn tasks_loaded(mut self, project_id: &str, mut tasks: Vec<Task>) -> Self {
        if !self.is_current_project(project_id) {
            debug!("Discard tasks of project {}, no longer selected", project_id);
            return self;
        }

        tasks.push(Task::none());
        // 編集中のtime entryのタスクを一覧から解決する
        let selected = self.draft.task.as_ref().and_then(|selected| {
            tasks
                .iter()
                .position(|task| task.id == selected.id)
                .map(|index| (index, tasks[index].clone()))
        });
        if let Some((index, task)) = selected {
            self.draft.task = Some(task);
            if let Step::TaskSelect { cursor } = &mut self.step {
                *cursor = index;
            }
        } else {
            // 一覧に無いタスク(アーカイブ済みなど)は「タスクなし」として扱う
            if let Some(missing) = self.draft.task.take() {
                debug!("Task {} is not in the task list, select no task", missing.id);
            }
            if let Step::TaskSelect { cursor } = &mut self.step {
                // 編集中でタスクが無いentryは「タスクなし」を選択した状態にする
                *cursor = if self.original.is_some() {
                    tasks.len() - 1
                } else {
                    (*cursor).min(tasks.len() - 1)
                };
            }
        }

        self.draft.tasks = TaskList::Ready {
            project_id: project_id.to_string(),
            tasks,
        };
        self
    }

    fn tasks_failed(mut self, project_id: &str, error: String) -> Self {
        if !self.is_current_project(project_id) {
            return self;
        }
        self.draft.tasks = TaskList::Failed {
            project_id: project_id.to_string(),
            error,
        };
        self
    }

    fn submitted(mut self, entry: TimeEntry) -> Self {
        if let Step::Confirm {
            submitting: true, ..
        } = self.step
        {
            info!("Time entry {} saved", entry.id);
            self.step = Step::Complete { entry };
        }
        self
    }

    fn submit_failed(mut self, error: String) -> Self {
        if let Step::Confirm {
            submitting: true, ..
        } = self.step
        {
            self.step = Step::Confirm {
                submitting: false,
                error: Some(error),
            };
        }
        self
    }

    /// プロジェクトを読み込めていない場合、プロジェクト選択画面で再取得できる。
    fn can_reload_projects(&self) -> bool {
        self.projects.is_empty()
            && matches!(&self.step, Step::ProjectSelect(select) if !select.searching)
    }

    fn is_current_project(&self, project_id: &str) -> bool {
        self.draft
            .project
            .as_ref()
            .is_some_and(|project| project.id == project_id)
    }

    fn project_select(&self) -> Step {
        Step::ProjectSelect(ProjectSelect::new(
            &self.projects,
            self.draft.project.as_ref(),
        ))
    }

    fn task_select(&self) -> Step {
        let cursor = match (&self.draft.tasks, &self.draft.task) {
            (TaskList::Ready { tasks, .. }, Some(selected)) => tasks
                .iter()
                .position(|task| task.id == selected.id)
                .unwrap_or(0),
            (TaskList::Ready { tasks, .. }, None) => tasks.len().saturating_sub(1),
            _ => 0,
        };
        Step::TaskSelect { cursor }
    }

    fn submission(&self) -> Option<Submission> {
        let project = self.draft.project.as_ref()?;
        Some(Submission {
            editing: self.is_editing(),
            workspace_id: self.workspace_id.clone(),
            entry_id: self.original.as_ref().map(|entry| entry.id.clone()),
            project_id: project.id.clone(),
            task_id: self.draft.task.as_ref().map(|task| task.id.clone()),
            description: self.draft.description.value().to_string(),
            start_text: self.draft.start.value().to_string(),
            end_text: self.draft.end.value().to_string(),
            date: self.draft.date,
        })
    }
}

/// 文字入力とバックスペースを入力欄に反映する。内容が変わった場合は`true`を返す。
fn edit_text(input: &mut TextInput, code: KeyCode) -> bool {
    match code {
        KeyCode::Char(c) => input.insert(c),
        KeyCode::Backspace => input.backspace(),
        _ => false,
    }
}

/// 時刻を"9:05 AM"の形式で表示する。
fn format_clock(time: &DateTime<Local>) -> String {
    time.format("%-I:%M %p").to_string()
}
