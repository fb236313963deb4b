use chrono::{DateTime, TimeZone};

use crate::time_parser::parse_time;

pub const START_EMPTY: &str = "Start time cannot be empty.";
pub const END_EMPTY: &str = "End time cannot be empty.";
pub const START_INVALID: &str = "Invalid start time format. Use HH:MM or 9a/2:30p.";
pub const END_INVALID: &str = "Invalid end time format. Use HH:MM or 9a/2:30p.";
pub const END_NOT_AFTER_START: &str = "End time must be after start time.";

/// 時刻入力欄ごとのエラー。`None`はエラー無しを表す。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TimeErrors {
    pub start: Option<String>,
    pub end: Option<String>,
}

impl TimeErrors {
    pub fn is_empty(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

/// 開始・終了時刻の入力を検証する。
///
/// 毎回すべての規則を評価し直すため、前回のエラーが残ることはない。
///
/// # Arguments
///
/// * `start_text` - 開始時刻の文字列
/// * `end_text` - 終了時刻の文字列
/// * `date` - time entryの日付
pub fn validate<Tz: TimeZone>(start_text: &str, end_text: &str, date: &DateTime<Tz>) -> TimeErrors {
    let mut errors = TimeErrors::default();

    let start = if start_text.trim().is_empty() {
        errors.start = Some(START_EMPTY.to_string());
        None
    } else {
        match parse_time(start_text, date) {
            Ok(start) => Some(start),
            Err(_) => {
                errors.start = Some(START_INVALID.to_string());
                None
            }
        }
    };

    let end = if end_text.trim().is_empty() {
        errors.end = Some(END_EMPTY.to_string());
        None
    } else {
        match parse_time(end_text, date) {
            Ok(end) => Some(end),
            Err(_) => {
                errors.end = Some(END_INVALID.to_string());
                None
            }
        }
    };

    if let (Some(start), Some(end)) = (start, end) {
        if end <= start {
            errors.end = Some(END_NOT_AFTER_START.to_string());
        }
    }

    errors
}
