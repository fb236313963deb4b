use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use log::LevelFilter;

const LOG_FILE: &str = "clocktui.log";

/// ログファイルのパス。
pub fn log_path() -> Result<PathBuf> {
    let dir = dirs::data_local_dir().context("Failed to find data directory")?;
    Ok(dir.join("clocktui").join(LOG_FILE))
}

/// ログの出力先を設定する。
///
/// 画面をrawモードで使うため、標準出力ではなくファイルに出力する。
///
/// # Arguments
///
/// * `verbose` - `true`の場合はdebugレベルまで出力する
pub fn init(verbose: bool) -> Result<PathBuf> {
    let path = log_path()?;
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;
    }

    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z"),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(LevelFilter::Warn)
        .level_for("clocktui", level)
        .chain(fern::log_file(&path).with_context(|| {
            format!("Failed to open log file: {}", path.display())
        })?)
        .apply()
        .context("Failed to initialize logger")?;

    Ok(path)
}
