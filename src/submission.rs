use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local, SecondsFormat};
use log::info;

use crate::clockify::ClockifyRepository;
use crate::messages::Message;
use crate::time_entry::{TimeEntry, TimeEntryRequest};
use crate::time_parser::parse_time;

/// ウィザードで入力された、送信前のtime entry。
#[derive(Clone, Debug, PartialEq)]
pub struct Submission {
    pub editing: bool,
    pub workspace_id: String,
    pub entry_id: Option<String>,
    pub project_id: String,
    pub task_id: Option<String>,
    pub description: String,
    pub start_text: String,
    pub end_text: String,
    pub date: DateTime<Local>,
}

impl Submission {
    /// 時刻の文字列をパースし、送信するリクエストボディを作成する。
    pub fn to_request(&self) -> Result<TimeEntryRequest> {
        let start = parse_time(&self.start_text, &self.date)
            .with_context(|| format!("Failed to parse start time: {:?}", self.start_text))?;
        let end = parse_time(&self.end_text, &self.date)
            .with_context(|| format!("Failed to parse end time: {:?}", self.end_text))?;

        Ok(TimeEntryRequest {
            start: start.to_rfc3339_opts(SecondsFormat::Secs, false),
            end: end.to_rfc3339_opts(SecondsFormat::Secs, false),
            project_id: self.project_id.clone(),
            task_id: self.task_id.clone().filter(|id| !id.is_empty()),
            description: self.description.clone(),
        })
    }
}

/// ウィザードの入力をtime entryの作成・更新リクエストとして送信する。
///
/// キャッシュには触れない。結果をキャッシュに反映するのは呼び出し側の責務とする。
pub struct SubmissionGateway<'a, R: ClockifyRepository + ?Sized> {
    repository: &'a R,
}

impl<'a, R: ClockifyRepository + ?Sized> SubmissionGateway<'a, R> {
    /// 新しい`SubmissionGateway`を返す。
    ///
    /// # Arguments
    /// * `repository` - Clockify APIと通信するためのリポジトリ
    pub fn new(repository: &'a R) -> Self {
        Self { repository }
    }

    /// time entryを送信し、サーバーが返したtime entryを返す。
    ///
    /// `editing`が`true`の場合は`entry_id`のtime entryを更新し、それ以外は新規作成する。
    pub async fn submit(&self, submission: &Submission) -> Result<TimeEntry> {
        let request = submission.to_request()?;

        let entry = if submission.editing {
            let Some(entry_id) = submission.entry_id.as_deref() else {
                bail!("Cannot update a time entry without an id");
            };
            self.repository
                .update_time_entry(&submission.workspace_id, entry_id, &request)
                .await
                .context("Failed to submit time entry update")?
        } else {
            self.repository
                .create_time_entry(&submission.workspace_id, &request)
                .await
                .context("Failed to submit new time entry")?
        };
        info!("Time entry {} submitted successfully.", entry.id);

        Ok(entry)
    }
}

/// 送信結果をイベントループのメッセージに変換する。
pub fn into_message(editing: bool, result: Result<TimeEntry>) -> Message {
    match result {
        Ok(entry) if editing => Message::EntryUpdated(entry),
        Ok(entry) => Message::EntrySaved(entry),
        Err(err) => Message::SubmitFailed(format!("{:#}", err)),
    }
}
