use anyhow::{bail, Context, Result};
use log::info;

use crate::clockify::ClockifyRepository;
use crate::config::Config;

/// `init`サブコマンドの引数。
#[derive(Debug, clap::Args)]
pub struct InitArgs {
    #[clap(long = "api-key", help = "Sets the Clockify API key")]
    pub api_key: String,

    #[clap(
        long = "workspace-id",
        help = "Sets the workspace to use, defaults to the user's default workspace"
    )]
    pub workspace_id: Option<String>,
}

/// APIキーからユーザーとワークスペースを調べ、設定を作成する`init`サブコマンド。
pub struct InitCommand<'a, T: ClockifyRepository + ?Sized> {
    repository: &'a T,
}

impl<'a, T: ClockifyRepository + ?Sized> InitCommand<'a, T> {
    /// 新しい`InitCommand`を返す。
    ///
    /// # Arguments
    /// * `repository` - `args.api_key`で認証するリポジトリ
    pub fn new(repository: &'a T) -> Self {
        Self { repository }
    }

    /// `init`サブコマンドの処理を行う。設定の保存は呼び出し側で行う。
    pub async fn run(&self, args: InitArgs) -> Result<Config> {
        let user = self
            .repository
            .read_user()
            .await
            .context("Failed to verify API key")?;
        info!("Signed in as {}", user.name);

        // 引数、既定のワークスペース、最後に使ったワークスペースの順に使う
        let workspace_id = [
            args.workspace_id.unwrap_or_default(),
            user.default_workspace,
            user.active_workspace,
        ]
        .into_iter()
        .find(|id| !id.is_empty());
        let Some(workspace_id) = workspace_id else {
            bail!("No workspace found for user {}, specify --workspace-id", user.id);
        };

        let workspaces = self
            .repository
            .read_workspaces()
            .await
            .context("Failed to retrieve workspaces")?;
        let Some(workspace) = workspaces.into_iter().find(|w| w.id == workspace_id) else {
            bail!("Workspace {} is not available for user {}", workspace_id, user.id);
        };

        Ok(Config {
            api_key: args.api_key,
            user_id: user.id,
            workspace_id: workspace.id,
            workspace_name: workspace.name,
        })
    }
}
