use crossterm::event::KeyEvent;

use crate::time_entry::{Project, Task, TimeEntry};

/// イベントループで処理するメッセージ。
///
/// 入力イベントと、バックグラウンドで実行した取得・送信の結果をまとめて扱う。
#[derive(Clone, Debug)]
pub enum Message {
    // 入力
    Key(KeyEvent),
    Resize(u16, u16),

    // データ取得
    ProjectsLoaded(Vec<Project>),
    TasksLoaded { project_id: String, tasks: Vec<Task> },
    TasksFailed { project_id: String, error: String },
    EntriesLoaded(Vec<TimeEntry>),

    // time entry
    EntrySaved(TimeEntry),
    EntryUpdated(TimeEntry),
    EntryDeleted(String),
    SubmitFailed(String),

    Error(String),
}
