use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// 設定ファイルを置くディレクトリ名。
const APP_DIR: &str = "clocktui";
const CONFIG_FILE: &str = "config.json";

const ENV_API_KEY: &str = "CLOCKIFY_API_KEY";
const ENV_WORKSPACE_ID: &str = "CLOCKIFY_WORKSPACE_ID";
const ENV_USER_ID: &str = "CLOCKIFY_USER_ID";

/// Clockify APIに接続するための設定。
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub workspace_id: String,
    #[serde(default)]
    pub workspace_name: String,
}

impl Config {
    /// 設定ファイルのパス。
    pub fn path() -> Result<PathBuf> {
        let dir = dirs::config_dir().context("Failed to find config directory")?;
        Ok(dir.join(APP_DIR).join(CONFIG_FILE))
    }

    /// 設定ファイルを読み込み、環境変数の値で上書きする。
    pub fn load() -> Result<Self> {
        let config = Self::load_from(&Self::path()?)?;
        Ok(config.with_overrides(|key| env::var(key).ok()))
    }

    /// 指定したパスの設定ファイルを読み込む。ファイルが無い場合は空の設定を返す。
    ///
    /// # Arguments
    ///
    /// * `path` - 設定ファイルのパス
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("Config file {} does not exist", path.display());
            return Ok(Self::default());
        }

        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_json::from_str(&data)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// 値が設定されている項目を上書きする。
    ///
    /// # Arguments
    ///
    /// * `lookup` - 環境変数名から値を返す関数
    pub fn with_overrides<F: Fn(&str) -> Option<String>>(mut self, lookup: F) -> Self {
        let targets = [
            (ENV_API_KEY, &mut self.api_key),
            (ENV_WORKSPACE_ID, &mut self.workspace_id),
            (ENV_USER_ID, &mut self.user_id),
        ];
        for (key, field) in targets {
            if let Some(value) = lookup(key).filter(|value| !value.is_empty()) {
                debug!("{} is overridden by environment variable", key);
                *field = value;
            }
        }
        self
    }

    /// APIの呼び出しに必要な項目がそろっていることを確認する。
    pub fn ensure_complete(&self) -> Result<()> {
        let missing: Vec<&str> = [
            ("api_key", &self.api_key),
            ("user_id", &self.user_id),
            ("workspace_id", &self.workspace_id),
        ]
        .iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(name, _)| *name)
        .collect();

        if !missing.is_empty() {
            bail!(
                "Missing configuration: {}. Run `clocktui init --api-key <KEY>` first",
                missing.join(", ")
            );
        }
        Ok(())
    }

    /// 既定のパスに設定を保存する。
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    /// 指定したパスに設定を保存する。ディレクトリが無い場合は作成する。
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        }
        let data = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, data)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        info!("Config saved to {}", path.display());

        Ok(())
    }
}
