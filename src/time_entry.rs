use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// time entryの開始・終了時刻。
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeInterval {
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration: Option<String>,
}

/// Clockifyのtime entry。
///
/// 値として扱い、編集は同じ`id`を持つ新しい値で置き換える。
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeEntry {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub task_id: Option<String>,
    pub time_interval: TimeInterval,
    #[serde(default)]
    pub workspace_id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub billable: bool,
    #[serde(default)]
    pub tag_ids: Option<Vec<String>>,
}

/// time entryの作成・更新時に送信するリクエストボディ。
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeEntryRequest {
    pub start: String,
    pub end: String,
    pub project_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    pub description: String,
}

/// Clockifyのプロジェクト。
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub workspace_id: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub billable: bool,
    #[serde(default)]
    pub archived: bool,
}

impl Project {
    /// 一覧表示用の名前を返す。クライアントがあれば括弧書きで付与する。
    pub fn display_name(&self) -> String {
        match self.client_name.as_deref() {
            Some(client) if !client.is_empty() => format!("{} ({})", self.name, client),
            _ => self.name.clone(),
        }
    }
}

/// プロジェクトに属するタスク。
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Task {
    pub id: String,
    pub name: String,
}

impl Task {
    /// 「タスクなし」を表す選択肢。
    pub fn none() -> Self {
        Self {
            id: String::new(),
            name: "No Task".to_string(),
        }
    }

    pub fn is_none(&self) -> bool {
        self.id.is_empty()
    }
}

/// `GET /user`のレスポンス。
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub default_workspace: String,
    #[serde(default)]
    pub active_workspace: String,
}

/// `GET /workspaces`のレスポンスの要素。
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct Workspace {
    pub id: String,
    pub name: String,
}
