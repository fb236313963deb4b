use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveTime, TimeZone};

/// 午前・午後の指定。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Meridiem {
    Am,
    Pm,
}

/// "9a"、"2:30p"、"14:30"のような短い時刻表記を日時に変換する。
///
/// 日付とタイムゾーンは`reference`から取り、`reference`の時刻部分は無視する。
/// am/pmの指定が無い場合は24時間表記として扱う。
///
/// # Arguments
///
/// * `text` - 時刻の文字列
/// * `reference` - 日付とタイムゾーンの基準となる日時
///
/// # Errors
///
/// 空文字列、数値として解釈できない、または範囲外の時刻はエラーとする。
/// 失敗時に0時の日時を返すことはない。
pub fn parse_time<Tz: TimeZone>(text: &str, reference: &DateTime<Tz>) -> Result<DateTime<Tz>> {
    let normalized: String = text
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    if normalized.is_empty() {
        bail!("Time must not be empty");
    }

    let (clock, meridiem) = split_meridiem(&normalized);
    let (hour_text, minute_text) = match clock.split_once(':') {
        Some((hour, minute)) => (hour, Some(minute)),
        None => (clock, None),
    };

    let hour = parse_component(hour_text)
        .with_context(|| format!("Invalid hour in time: {:?}", text))?;
    let minute = match minute_text {
        Some(minute) => parse_component(minute)
            .with_context(|| format!("Invalid minute in time: {:?}", text))?,
        None => 0,
    };

    let hour = match meridiem {
        Some(_) if hour > 12 => bail!("Hour out of range for 12-hour time: {:?}", text),
        Some(Meridiem::Pm) if hour == 0 => bail!("Hour out of range for 12-hour time: {:?}", text),
        Some(Meridiem::Pm) if hour != 12 => hour + 12,
        Some(Meridiem::Am) if hour == 12 => 0,
        _ => hour,
    };

    let time = NaiveTime::from_hms_opt(hour, minute, 0)
        .with_context(|| format!("Time out of range: {:?}", text))?;
    let naive = reference.date_naive().and_time(time);

    reference
        .timezone()
        .from_local_datetime(&naive)
        .earliest()
        .with_context(|| format!("Time does not exist in the local time zone: {:?}", text))
}

/// 末尾のam/pm表記を取り除き、時刻部分と午前・午後の指定に分ける。
fn split_meridiem(text: &str) -> (&str, Option<Meridiem>) {
    for (suffix, meridiem) in [
        ("am", Meridiem::Am),
        ("pm", Meridiem::Pm),
        ("a", Meridiem::Am),
        ("p", Meridiem::Pm),
    ] {
        if let Some(clock) = text.strip_suffix(suffix) {
            return (clock, Some(meridiem));
        }
    }
    (text, None)
}

/// 時・分の数値部分をパースする。数字以外を含む場合はエラーとする。
fn parse_component(text: &str) -> Result<u32> {
    if text.is_empty() || !text.chars().all(|c| c.is_ascii_digit()) {
        bail!("Not a number: {:?}", text);
    }
    text.parse::<u32>()
        .with_context(|| format!("Failed to parse number: {:?}", text))
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, FixedOffset, TimeZone, Timelike, Utc};
    use rstest::rstest;

    use super::parse_time;

    /// 基準日時。時刻部分が結果に影響しないことを確認するため、0時以外にしている。
    fn reference() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 17, 42, 13).unwrap()
    }

    /// 正常系のテスト。
    #[rstest]
    #[case::am_short("9a", 9, 0)]
    #[case::am_with_minute("9:30a", 9, 30)]
    #[case::noon("12p", 12, 0)]
    #[case::midnight("12a", 0, 0)]
    #[case::pm("2p", 14, 0)]
    #[case::pm_with_minute("2:30p", 14, 30)]
    #[case::last_minute("11:59p", 23, 59)]
    #[case::after_midnight("12:01a", 0, 1)]
    #[case::twenty_four_zero("00:00", 0, 0)]
    #[case::twenty_four("14:30", 14, 30)]
    #[case::hour_only("9", 9, 0)]
    #[case::noon_twenty_four("12:30", 12, 30)]
    #[case::long_suffix("9:15 AM", 9, 15)]
    #[case::spaces(" 5 : 05 pm ", 17, 5)]
    #[case::upper("3P", 15, 0)]
    fn test_parse_time(#[case] input: &str, #[case] hour: u32, #[case] minute: u32) {
        let parsed = parse_time(input, &reference()).unwrap();

        assert_eq!(parsed.date_naive(), reference().date_naive());
        assert_eq!(parsed.hour(), hour);
        assert_eq!(parsed.minute(), minute);
        assert_eq!(parsed.second(), 0);
    }

    /// 異常系のテスト。
    #[rstest]
    #[case::empty("")]
    #[case::blank("   ")]
    #[case::letters("abc")]
    #[case::only_suffix("pm")]
    #[case::hour_out_of_range("24:00")]
    #[case::minute_out_of_range("9:60")]
    #[case::pm_out_of_range("13p")]
    #[case::zero_pm("0p")]
    #[case::negative("-1")]
    #[case::missing_minute("9:")]
    #[case::garbage_minute("9:3x")]
    fn test_parse_time_error(#[case] input: &str) {
        assert!(parse_time(input, &reference()).is_err());
    }

    /// 基準日時のタイムゾーンが維持されることを確認する。
    #[test]
    fn test_parse_time_keeps_time_zone() {
        let tokyo = FixedOffset::east_opt(9 * 3600).unwrap();
        let reference = tokyo.with_ymd_and_hms(2024, 1, 15, 23, 30, 0).unwrap();

        let parsed = parse_time("9a", &reference).unwrap();

        assert_eq!(parsed.offset(), reference.offset());
        assert_eq!(parsed.to_rfc3339(), "2024-01-15T09:00:00+09:00");
    }
}
