use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, info};
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;

use crate::time_entry::{Project, Task, TimeEntry, TimeEntryRequest, User, Workspace};

/// Clockify APIの既定のURL。
pub const API_URL: &str = "https://api.clockify.me/api/v1";

/// 直近のtime entryを取得する件数。
const ENTRIES_PAGE_SIZE: &str = "30";
const PROJECTS_PAGE_SIZE: &str = "1000";
const TASKS_PAGE_SIZE: &str = "100";

/// Clockify APIとやりとりするためのtrait。
///
/// テストではモックに差し替える。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClockifyRepository: Send + Sync {
    /// APIキーに紐づくユーザーを取得する。
    async fn read_user(&self) -> Result<User>;

    /// ユーザーが所属するワークスペースを取得する。
    async fn read_workspaces(&self) -> Result<Vec<Workspace>>;

    /// ユーザーの直近のtime entryを新しい順に取得する。
    async fn read_time_entries(&self, workspace_id: &str, user_id: &str) -> Result<Vec<TimeEntry>>;

    /// アーカイブされていないプロジェクトを取得する。
    async fn read_projects(&self, workspace_id: &str) -> Result<Vec<Project>>;

    /// プロジェクトの有効なタスクを取得する。
    async fn read_tasks(&self, workspace_id: &str, project_id: &str) -> Result<Vec<Task>>;

    async fn create_time_entry(
        &self,
        workspace_id: &str,
        request: &TimeEntryRequest,
    ) -> Result<TimeEntry>;

    async fn update_time_entry(
        &self,
        workspace_id: &str,
        entry_id: &str,
        request: &TimeEntryRequest,
    ) -> Result<TimeEntry>;

    async fn delete_time_entry(&self, workspace_id: &str, entry_id: &str) -> Result<()>;
}

/// Clockify APIと通信するためのクライアント。
///
/// # Examples
///
/// ```
/// let client = ClockifyClient::new(&config.api_key);
/// let projects = client.read_projects(&config.workspace_id).await.unwrap();
/// ```
pub struct ClockifyClient {
    client: Client,
    api_url: String,
    api_key: String,
}

impl ClockifyClient {
    /// 新しい`ClockifyClient`を返す。
    pub fn new(api_key: &str) -> Self {
        Self::with_api_url(api_key, API_URL)
    }

    /// 接続先のURLを指定して新しい`ClockifyClient`を返す。
    pub fn with_api_url(api_key: &str, api_url: &str) -> Self {
        Self {
            client: Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    fn request(&self, method: Method, endpoint: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.api_url, endpoint))
            .header("X-Api-Key", &self.api_key)
    }

    /// リクエストを送信し、2xx以外のステータスはレスポンスボディを含むエラーとして返す。
    async fn send(&self, builder: RequestBuilder) -> Result<reqwest::Response> {
        let response = builder
            .send()
            .await
            .with_context(|| format!("Failed to send request to Clockify API at {}", self.api_url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("API error (status {}): {}", status.as_u16(), body);
        }

        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        self.send(builder)
            .await?
            .json::<T>()
            .await
            .context("Failed to deserialize response")
    }
}

#[async_trait]
impl ClockifyRepository for ClockifyClient {
    async fn read_user(&self) -> Result<User> {
        self.send_json(self.request(Method::GET, "/user"))
            .await
            .context("Failed to read user info")
    }

    async fn read_workspaces(&self) -> Result<Vec<Workspace>> {
        self.send_json(self.request(Method::GET, "/workspaces"))
            .await
            .context("Failed to read workspaces")
    }

    async fn read_time_entries(&self, workspace_id: &str, user_id: &str) -> Result<Vec<TimeEntry>> {
        let endpoint = format!("/workspaces/{}/user/{}/time-entries", workspace_id, user_id);
        let entries: Vec<TimeEntry> = self
            .send_json(
                self.request(Method::GET, &endpoint)
                    .query(&[("page-size", ENTRIES_PAGE_SIZE)]),
            )
            .await
            .context("Failed to read time entries")?;
        info!("length of time entries: {}", entries.len());

        Ok(entries)
    }

    async fn read_projects(&self, workspace_id: &str) -> Result<Vec<Project>> {
        let endpoint = format!("/workspaces/{}/projects", workspace_id);
        let projects: Vec<Project> = self
            .send_json(
                self.request(Method::GET, &endpoint)
                    .query(&[("page-size", PROJECTS_PAGE_SIZE), ("archived", "false")]),
            )
            .await
            .context("Failed to read projects")?;
        info!("length of projects: {}", projects.len());

        Ok(projects)
    }

    async fn read_tasks(&self, workspace_id: &str, project_id: &str) -> Result<Vec<Task>> {
        debug!("Fetching tasks for project {}", project_id);
        let endpoint = format!("/workspaces/{}/projects/{}/tasks", workspace_id, project_id);
        self.send_json(
            self.request(Method::GET, &endpoint)
                .query(&[("page-size", TASKS_PAGE_SIZE), ("is-active", "true")]),
        )
        .await
        .with_context(|| format!("Failed to read tasks for project {}", project_id))
    }

    async fn create_time_entry(
        &self,
        workspace_id: &str,
        request: &TimeEntryRequest,
    ) -> Result<TimeEntry> {
        let endpoint = format!("/workspaces/{}/time-entries", workspace_id);
        self.send_json(self.request(Method::POST, &endpoint).json(request))
            .await
            .context("Failed to create time entry")
    }

    async fn update_time_entry(
        &self,
        workspace_id: &str,
        entry_id: &str,
        request: &TimeEntryRequest,
    ) -> Result<TimeEntry> {
        let endpoint = format!("/workspaces/{}/time-entries/{}", workspace_id, entry_id);
        self.send_json(self.request(Method::PUT, &endpoint).json(request))
            .await
            .with_context(|| format!("Failed to update time entry {}", entry_id))
    }

    async fn delete_time_entry(&self, workspace_id: &str, entry_id: &str) -> Result<()> {
        let endpoint = format!("/workspaces/{}/time-entries/{}", workspace_id, entry_id);
        self.send(self.request(Method::DELETE, &endpoint))
            .await
            .with_context(|| format!("Failed to delete time entry {}", entry_id))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use mockito::Matcher;
    use serde_json::json;

    use super::{ClockifyClient, ClockifyRepository};
    use crate::time_entry::TimeEntryRequest;

    fn entry_body(id: &str) -> serde_json::Value {
        json!({
            "id": id,
            "description": "Client call",
            "projectId": "p1",
            "timeInterval": {
                "start": "2024-01-15T09:00:00Z",
                "end": "2024-01-15T10:00:00Z"
            },
            "workspaceId": "ws1",
            "userId": "u1",
            "billable": false
        })
    }

    fn request() -> TimeEntryRequest {
        TimeEntryRequest {
            start: "2024-01-15T09:00:00+00:00".to_string(),
            end: "2024-01-15T10:00:00+00:00".to_string(),
            project_id: "p1".to_string(),
            task_id: None,
            description: "Client call".to_string(),
        }
    }

    #[tokio::test]
    async fn test_read_projects() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/workspaces/ws1/projects")
            .match_header("x-api-key", "secret")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("page-size".into(), "1000".into()),
                Matcher::UrlEncoded("archived".into(), "false".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!([
                    {"id": "p1", "name": "Acme", "clientName": "Acme Corp"},
                    {"id": "p2", "name": "Internal"}
                ])
                .to_string(),
            )
            .create_async()
            .await;

        let client = ClockifyClient::with_api_url("secret", &server.url());
        let projects = client.read_projects("ws1").await.unwrap();

        mock.assert_async().await;
        assert_eq!(projects.len(), 2);
        assert_eq!(projects[0].client_name.as_deref(), Some("Acme Corp"));
        assert_eq!(projects[1].client_name, None);
    }

    #[tokio::test]
    async fn test_read_time_entries() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/workspaces/ws1/user/u1/time-entries")
            .match_query(Matcher::UrlEncoded("page-size".into(), "30".into()))
            .with_status(200)
            .with_body(json!([entry_body("e1"), entry_body("e2")]).to_string())
            .create_async()
            .await;

        let client = ClockifyClient::with_api_url("secret", &server.url());
        let entries = client.read_time_entries("ws1", "u1").await.unwrap();

        mock.assert_async().await;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].id, "e2");
    }

    #[tokio::test]
    async fn test_create_time_entry_sends_request_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/workspaces/ws1/time-entries")
            .match_body(Matcher::Json(json!({
                "start": "2024-01-15T09:00:00+00:00",
                "end": "2024-01-15T10:00:00+00:00",
                "projectId": "p1",
                "description": "Client call"
            })))
            .with_status(201)
            .with_body(entry_body("new-id").to_string())
            .create_async()
            .await;

        let client = ClockifyClient::with_api_url("secret", &server.url());
        let entry = client.create_time_entry("ws1", &request()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(entry.id, "new-id");
    }

    #[tokio::test]
    async fn test_update_time_entry_uses_put() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PUT", "/workspaces/ws1/time-entries/e1")
            .with_status(200)
            .with_body(entry_body("e1").to_string())
            .create_async()
            .await;

        let client = ClockifyClient::with_api_url("secret", &server.url());
        let entry = client
            .update_time_entry("ws1", "e1", &request())
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(entry.id, "e1");
    }

    /// 2xx以外のステータスはステータスとボディを含むエラーになることを確認する。
    #[tokio::test]
    async fn test_error_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("DELETE", "/workspaces/ws1/time-entries/e1")
            .with_status(404)
            .with_body("Entry not found")
            .create_async()
            .await;

        let client = ClockifyClient::with_api_url("secret", &server.url());
        let err = client.delete_time_entry("ws1", "e1").await.unwrap_err();

        let message = format!("{:#}", err);
        assert!(message.contains("status 404"), "{}", message);
        assert!(message.contains("Entry not found"), "{}", message);
    }

    #[tokio::test]
    async fn test_read_user_and_workspaces() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/user")
            .match_header("x-api-key", "secret")
            .with_status(200)
            .with_body(
                json!({"id": "u1", "name": "Jane", "defaultWorkspace": "ws1", "activeWorkspace": "ws2"})
                    .to_string(),
            )
            .create_async()
            .await;
        server
            .mock("GET", "/workspaces")
            .with_status(200)
            .with_body(json!([{"id": "ws1", "name": "My Workspace"}]).to_string())
            .create_async()
            .await;

        let client = ClockifyClient::with_api_url("secret", &server.url());
        let user = client.read_user().await.unwrap();
        let workspaces = client.read_workspaces().await.unwrap();

        assert_eq!(user.id, "u1");
        assert_eq!(user.default_workspace, "ws1");
        assert_eq!(workspaces[0].name, "My Workspace");
    }

    #[tokio::test]
    async fn test_invalid_json_is_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/user")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let client = ClockifyClient::with_api_url("secret", &server.url());

        assert!(client.read_user().await.is_err());
    }
}
