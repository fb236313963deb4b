use chrono::{DateTime, Local, Utc};

#[cfg(not(test))]
/// 現在のUTC時間を取得する。
///
/// キャッシュの鮮度判定とウィザードの「今日」の基準に利用する。
pub fn now() -> DateTime<Utc> {
    Utc::now()
}


#[cfg(test)]
pub use mock_datetime::now;

/// Localタイムゾーンでの現在時刻を取得する。
pub fn local_now() -> DateTime<Local> {
    now().with_timezone(&Local)
}
