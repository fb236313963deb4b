use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use log::info;

use crate::cache::Cache;
use crate::clockify::ClockifyRepository;
use crate::config::Config;
use crate::fetch;
use crate::time_entry::TimeEntry;

/// `list`サブコマンドの引数。
#[derive(Debug, clap::Args)]
pub struct ListArgs {
    #[clap(
        short = 'd',
        long = "date",
        help = "Shows only entries started on the date in the format YYYY-MM-DD",
        parse(try_from_str = parse_date),
    )]
    date: Option<NaiveDate>,
}

/// 直近のtime entryを取得する`list`サブコマンド。
pub struct ListCommand<'a, T: ClockifyRepository + ?Sized> {
    repository: &'a T,
    cache: &'a Cache,
}

impl<'a, T: ClockifyRepository + ?Sized> ListCommand<'a, T> {
    /// 新しい`ListCommand`を返す。
    ///
    /// # Arguments
    /// * `repository` - Clockify APIと通信するためのリポジトリ
    /// * `cache` - 取得結果を保持するキャッシュ
    pub fn new(repository: &'a T, cache: &'a Cache) -> Self {
        Self { repository, cache }
    }

    /// `list`サブコマンドの処理を行う。
    ///
    /// 日付が指定された場合は、Localタイムゾーンでその日に開始したtime entryだけを返す。
    pub async fn run(&self, config: &Config, args: ListArgs) -> Result<Vec<TimeEntry>> {
        let entries = fetch::read_entries(
            self.repository,
            self.cache,
            &config.workspace_id,
            &config.user_id,
        )
        .await
        .context("Failed to list time entries")?;

        let entries: Vec<TimeEntry> = match args.date {
            Some(date) => entries
                .into_iter()
                .filter(|entry| entry.time_interval.start.with_timezone(&Local).date_naive() == date)
                .collect(),
            None => entries,
        };
        info!("{} time entries listed.", entries.len());

        Ok(entries)
    }
}

/// 日付をパースする。
fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("Failed to parse date: {}", s))
}
