use std::io::Write;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};

use crate::time_entry::{Project, TimeEntry};

/// Consoleにtime entryを表示するためのtrait。
pub trait ConsolePresenter {
    /// time entryを表示する。
    ///
    /// # Arguments
    ///
    /// * `time_entries` - 表示するtime entry
    fn show_time_entries(&mut self, time_entries: &[TimeEntry]) -> Result<()>;
}

/// time entryを日付ごとのMarkdownのlist形式で表示する。
pub struct ConsoleMarkdownList<'a, W: Write> {
    writer: &'a mut W,
    projects: &'a [Project],
}

impl<'a, W: Write> ConsoleMarkdownList<'a, W> {
    /// 新しい`ConsoleMarkdownList`を返す。
    ///
    /// # Arguments
    ///
    /// * `writer` - 出力先
    /// * `projects` - プロジェクト名の表示に利用するプロジェクト一覧
    pub fn new(writer: &'a mut W, projects: &'a [Project]) -> Self {
        Self { writer, projects }
    }

    fn project_name(&self, entry: &TimeEntry) -> Option<&str> {
        let project_id = entry.project_id.as_deref()?;
        self.projects
            .iter()
            .find(|project| project.id == project_id)
            .map(|project| project.name.as_str())
    }
}

impl<'a, W: Write> ConsolePresenter for ConsoleMarkdownList<'a, W> {
    // 開始時刻の順に並べ、Localタイムゾーンの日付が変わるごとに見出しを出力する。
    fn show_time_entries(&mut self, time_entries: &[TimeEntry]) -> Result<()> {
        let mut sorted_entries = time_entries.to_vec();
        sorted_entries.sort_by_key(|entry| entry.time_interval.start);

        let mut current_date: Option<NaiveDate> = None;
        for entry in sorted_entries {
            let start = entry.time_interval.start.with_timezone(&Local);
            if current_date != Some(start.date_naive()) {
                if current_date.is_some() {
                    writeln!(self.writer).context("Failed to write separator")?;
                }
                writeln!(self.writer, "## {}", start.format("%Y-%m-%d"))
                    .context("Failed to write date heading")?;
                current_date = Some(start.date_naive());
            }

            let end_str = entry
                .time_interval
                .end
                .map(|end| end.with_timezone(&Local).format("%H:%M").to_string())
                .unwrap_or_else(|| "now".to_string());
            let project = self
                .project_name(&entry)
                .map(|name| format!(" [{}]", name))
                .unwrap_or_default();
            writeln!(
                self.writer,
                "- {} ~ {}: {}{}",
                start.format("%H:%M"),
                end_str,
                entry.description,
                project
            )
            .with_context(|| format!("Failed to write time entry: {}", entry.id))?;
        }

        Ok(())
    }
}
