//! Task and turn endpoints, including turn-log upload and streaming.

use futures::{Stream, StreamExt};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};

use crate::client::{
    Client, RequestParts, TENANT_ID_REQUIRED, require, workstreams::TASK_ID_REQUIRED,
};
use crate::error::{Error, decode_error};
use crate::patch::{Patch, request_fields};
use crate::types::{LogRecord, Page, Task, Turn};

#[derive(Debug, Clone, Default, Serialize)]
pub struct CreateTaskRequest {
    #[serde(skip)]
    pub tenant_id: String,
    #[serde(skip)]
    pub task_id: String,
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "WorkstreamID", skip_serializing_if = "Option::is_none")]
    pub workstream_id: Option<String>,
    #[serde(rename = "Private")]
    pub private: bool,
    #[serde(rename = "RunnerID", skip_serializing_if = "Option::is_none")]
    pub runner_id: Option<String>,
}

request_fields!(CreateTaskRequest {
    "TenantID" => tenant_id (required),
    "TaskID" => task_id (required),
    "Title" => title (required),
    "WorkstreamID" => workstream_id (optional),
    "Private" => private (required),
    "RunnerID" => runner_id (optional),
});

#[derive(Debug, Clone, Default)]
pub struct GetTaskRequest {
    pub tenant_id: String,
    pub task_id: String,
    pub include_deleted: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateTaskRequest {
    #[serde(skip)]
    pub tenant_id: String,
    #[serde(skip)]
    pub task_id: String,
    #[serde(skip)]
    pub version: u64,
    #[serde(rename = "Title", skip_serializing_if = "Patch::is_absent")]
    pub title: Patch<String>,
    #[serde(rename = "State", skip_serializing_if = "Patch::is_absent")]
    pub state: Patch<String>,
}

request_fields!(UpdateTaskRequest {
    "TenantID" => tenant_id (required),
    "TaskID" => task_id (required),
    "Title" => title (patch),
    "State" => state (patch),
});

#[derive(Debug, Clone, Default)]
pub struct DeleteTaskRequest {
    pub tenant_id: String,
    pub task_id: String,
    pub version: u64,
}

#[derive(Debug, Clone, Default)]
pub struct ListTasksRequest {
    pub tenant_id: String,
    pub max_results: Option<u64>,
    pub token: Option<String>,
    pub include_deleted: bool,
}

/// Turn creation is compare-and-swap on the task version.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CreateTurnRequest {
    #[serde(skip)]
    pub tenant_id: String,
    #[serde(skip)]
    pub task_id: String,
    #[serde(skip)]
    pub turn_index: u64,
    #[serde(rename = "EnvironmentID", skip_serializing_if = "Option::is_none")]
    pub environment_id: Option<String>,
    #[serde(skip)]
    pub version: u64,
}

request_fields!(CreateTurnRequest {
    "TenantID" => tenant_id (required),
    "TaskID" => task_id (required),
    "TurnIndex" => turn_index (required),
    "EnvironmentID" => environment_id (optional),
});

#[derive(Debug, Clone, Default)]
pub struct GetTurnRequest {
    pub tenant_id: String,
    pub task_id: String,
    pub turn_index: u64,
}

#[derive(Debug, Clone, Default)]
pub struct ListTurnsRequest {
    pub tenant_id: String,
    pub task_id: String,
    pub max_results: Option<u64>,
    pub token: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct GetLastTurnRequest {
    pub tenant_id: String,
    pub task_id: String,
}

#[derive(Debug, Clone, Default)]
pub struct CancelTurnRequest {
    pub tenant_id: String,
    pub task_id: String,
    pub turn_index: u64,
}

/// Upload envelope for one contiguous batch of turn logs.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AppendTurnLogsRequest {
    #[serde(skip)]
    pub tenant_id: String,
    #[serde(skip)]
    pub task_id: String,
    #[serde(skip)]
    pub turn_index: u64,
    #[serde(rename = "Version")]
    pub version: u64,
    #[serde(rename = "Index")]
    pub index: u64,
    #[serde(rename = "Logs")]
    pub logs: Vec<LogRecord>,
}

request_fields!(AppendTurnLogsRequest {
    "TenantID" => tenant_id (required),
    "TaskID" => task_id (required),
    "TurnIndex" => turn_index (required),
    "Version" => version (required),
    "Index" => index (required),
    "Logs" => logs (required),
});

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct AppendTurnLogsResponse {
    #[serde(rename = "Version")]
    pub version: u64,
}

#[derive(Debug, Clone, Default)]
pub struct StreamTurnLogsRequest {
    pub tenant_id: String,
    pub task_id: String,
    pub turn_index: u64,
    /// Resumes the server-sent-event stream after this event.
    pub last_event_id: Option<u64>,
}

/// Outcome of a log-stream request. The server answers `204` when the turn
/// has produced no logs yet.
#[derive(Debug)]
pub enum TurnLogStream {
    Events(EventStream),
    NoContent,
}

/// Raw `text/event-stream` bytes from the server. No SSE framing is applied;
/// the caller parses events.
#[derive(Debug)]
pub struct EventStream {
    response: reqwest::Response,
}

impl EventStream {
    /// Next chunk of stream bytes, `None` at end of stream.
    pub async fn chunk(&mut self) -> Result<Option<bytes::Bytes>, Error> {
        Ok(self.response.chunk().await?)
    }

    pub fn into_stream(self) -> impl Stream<Item = Result<Vec<u8>, Error>> {
        self.response
            .bytes_stream()
            .map(|chunk| match chunk {
                Ok(bytes) => Ok(bytes.to_vec()),
                Err(err) => Err(Error::from(err)),
            })
    }
}

impl Client {
    fn task_url(&self, tenant_id: &str, task_id: &str) -> crate::paths::UrlBuilder {
        self.url()
            .push("tenants")
            .push(tenant_id)
            .push("tasks")
            .push(task_id)
    }

    fn turn_url(&self, tenant_id: &str, task_id: &str, turn_index: u64) -> crate::paths::UrlBuilder {
        self.task_url(tenant_id, task_id)
            .push("turns")
            .push(&turn_index.to_string())
    }

    fn create_task_request(&self, req: &CreateTaskRequest) -> Result<reqwest::Request, Error> {
        require(&req.tenant_id, TENANT_ID_REQUIRED)?;
        require(&req.task_id, TASK_ID_REQUIRED)?;
        if req.private && req.runner_id.as_deref().unwrap_or("").trim().is_empty() {
            return Err(Error::validation("runner id is required when private is true"));
        }
        let url = self.task_url(&req.tenant_id, &req.task_id).finish();
        let parts = RequestParts::new(Method::PUT, url).json(req)?;
        self.build_request(parts)
    }

    pub async fn create_task(&self, req: &CreateTaskRequest) -> Result<Task, Error> {
        let request = self.create_task_request(req)?;
        self.expect_json(request, StatusCode::CREATED).await
    }

    fn get_task_request(&self, req: &GetTaskRequest) -> Result<reqwest::Request, Error> {
        require(&req.tenant_id, TENANT_ID_REQUIRED)?;
        require(&req.task_id, TASK_ID_REQUIRED)?;
        let url = self
            .task_url(&req.tenant_id, &req.task_id)
            .query_flag("includeDeleted", req.include_deleted)
            .finish();
        self.build_request(RequestParts::new(Method::GET, url))
    }

    pub async fn get_task(&self, req: &GetTaskRequest) -> Result<Task, Error> {
        let request = self.get_task_request(req)?;
        self.expect_json(request, StatusCode::OK).await
    }

    fn update_task_request(&self, req: &UpdateTaskRequest) -> Result<reqwest::Request, Error> {
        require(&req.tenant_id, TENANT_ID_REQUIRED)?;
        require(&req.task_id, TASK_ID_REQUIRED)?;
        let url = self.task_url(&req.tenant_id, &req.task_id).finish();
        let parts = RequestParts::new(Method::PATCH, url)
            .json(req)?
            .if_match(req.version);
        self.build_request(parts)
    }

    pub async fn update_task(&self, req: &UpdateTaskRequest) -> Result<Task, Error> {
        let request = self.update_task_request(req)?;
        self.expect_json(request, StatusCode::OK).await
    }

    fn delete_task_request(&self, req: &DeleteTaskRequest) -> Result<reqwest::Request, Error> {
        require(&req.tenant_id, TENANT_ID_REQUIRED)?;
        require(&req.task_id, TASK_ID_REQUIRED)?;
        let url = self.task_url(&req.tenant_id, &req.task_id).finish();
        let parts = RequestParts::new(Method::DELETE, url).if_match(req.version);
        self.build_request(parts)
    }

    pub async fn delete_task(&self, req: &DeleteTaskRequest) -> Result<(), Error> {
        let request = self.delete_task_request(req)?;
        self.expect_no_content(request).await
    }

    fn list_tasks_request(&self, req: &ListTasksRequest) -> Result<reqwest::Request, Error> {
        require(&req.tenant_id, TENANT_ID_REQUIRED)?;
        let url = self
            .url()
            .push("tenants")
            .push(&req.tenant_id)
            .push("tasks")
            .query_u64_opt("maxResults", req.max_results)
            .query_opt("token", req.token.as_deref())
            .query_flag("includeDeleted", req.include_deleted)
            .finish();
        self.build_request(RequestParts::new(Method::GET, url))
    }

    pub async fn list_tasks(&self, req: &ListTasksRequest) -> Result<Page<Task>, Error> {
        let request = self.list_tasks_request(req)?;
        self.expect_json(request, StatusCode::OK).await
    }

    fn create_turn_request(&self, req: &CreateTurnRequest) -> Result<reqwest::Request, Error> {
        require(&req.tenant_id, TENANT_ID_REQUIRED)?;
        require(&req.task_id, TASK_ID_REQUIRED)?;
        let url = self
            .turn_url(&req.tenant_id, &req.task_id, req.turn_index)
            .finish();
        let parts = RequestParts::new(Method::PUT, url)
            .json(req)?
            .if_match(req.version);
        self.build_request(parts)
    }

    pub async fn create_turn(&self, req: &CreateTurnRequest) -> Result<Turn, Error> {
        let request = self.create_turn_request(req)?;
        self.expect_json(request, StatusCode::CREATED).await
    }

    fn get_turn_request(&self, req: &GetTurnRequest) -> Result<reqwest::Request, Error> {
        require(&req.tenant_id, TENANT_ID_REQUIRED)?;
        require(&req.task_id, TASK_ID_REQUIRED)?;
        let url = self
            .turn_url(&req.tenant_id, &req.task_id, req.turn_index)
            .finish();
        self.build_request(RequestParts::new(Method::GET, url))
    }

    pub async fn get_turn(&self, req: &GetTurnRequest) -> Result<Turn, Error> {
        let request = self.get_turn_request(req)?;
        self.expect_json(request, StatusCode::OK).await
    }

    fn list_turns_request(&self, req: &ListTurnsRequest) -> Result<reqwest::Request, Error> {
        require(&req.tenant_id, TENANT_ID_REQUIRED)?;
        require(&req.task_id, TASK_ID_REQUIRED)?;
        let url = self
            .task_url(&req.tenant_id, &req.task_id)
            .push("turns")
            .query_u64_opt("maxResults", req.max_results)
            .query_opt("token", req.token.as_deref())
            .finish();
        self.build_request(RequestParts::new(Method::GET, url))
    }

    pub async fn list_turns(&self, req: &ListTurnsRequest) -> Result<Page<Turn>, Error> {
        let request = self.list_turns_request(req)?;
        self.expect_json(request, StatusCode::OK).await
    }

    fn get_last_turn_request(&self, req: &GetLastTurnRequest) -> Result<reqwest::Request, Error> {
        require(&req.tenant_id, TENANT_ID_REQUIRED)?;
        require(&req.task_id, TASK_ID_REQUIRED)?;
        let url = self
            .task_url(&req.tenant_id, &req.task_id)
            .push("turns")
            .push("last")
            .finish();
        self.build_request(RequestParts::new(Method::GET, url))
    }

    /// Latest turn by `TurnIndex`, `404` if the task has none.
    pub async fn get_last_turn(&self, req: &GetLastTurnRequest) -> Result<Turn, Error> {
        let request = self.get_last_turn_request(req)?;
        self.expect_json(request, StatusCode::OK).await
    }

    fn cancel_turn_request(&self, req: &CancelTurnRequest) -> Result<reqwest::Request, Error> {
        require(&req.tenant_id, TENANT_ID_REQUIRED)?;
        require(&req.task_id, TASK_ID_REQUIRED)?;
        let url = self
            .turn_url(&req.tenant_id, &req.task_id, req.turn_index)
            .push("cancel")
            .finish();
        self.build_request(RequestParts::new(Method::POST, url))
    }

    pub async fn cancel_turn(&self, req: &CancelTurnRequest) -> Result<Turn, Error> {
        let request = self.cancel_turn_request(req)?;
        self.expect_json(request, StatusCode::OK).await
    }

    fn append_turn_logs_request(
        &self,
        req: &AppendTurnLogsRequest,
    ) -> Result<reqwest::Request, Error> {
        require(&req.tenant_id, TENANT_ID_REQUIRED)?;
        require(&req.task_id, TASK_ID_REQUIRED)?;
        let url = self
            .turn_url(&req.tenant_id, &req.task_id, req.turn_index)
            .push("logs")
            .finish();
        let parts = RequestParts::new(Method::POST, url).json(req)?;
        self.build_request(parts)
    }

    /// Uploads one contiguous log batch, returning the new turn version.
    pub async fn append_turn_logs(
        &self,
        req: &AppendTurnLogsRequest,
    ) -> Result<AppendTurnLogsResponse, Error> {
        let request = self.append_turn_logs_request(req)?;
        self.expect_json(request, StatusCode::OK).await
    }

    fn stream_turn_logs_request(
        &self,
        req: &StreamTurnLogsRequest,
    ) -> Result<reqwest::Request, Error> {
        require(&req.tenant_id, TENANT_ID_REQUIRED)?;
        require(&req.task_id, TASK_ID_REQUIRED)?;
        let url = self
            .turn_url(&req.tenant_id, &req.task_id, req.turn_index)
            .push("logs")
            .finish();
        let parts = RequestParts::new(Method::GET, url).last_event_id(req.last_event_id);
        self.build_request(parts)
    }

    /// Opens the server-sent-event log stream. `200` hands back the raw byte
    /// stream; `204` means no logs exist yet.
    pub async fn stream_turn_logs(
        &self,
        req: &StreamTurnLogsRequest,
    ) -> Result<TurnLogStream, Error> {
        let request = self.stream_turn_logs_request(req)?;
        let response = self.execute(request).await?;
        match response.status() {
            StatusCode::OK => Ok(TurnLogStream::Events(EventStream { response })),
            StatusCode::NO_CONTENT => Ok(TurnLogStream::NoContent),
            status => {
                let bytes = response.bytes().await?;
                Err(decode_error(status, &bytes))
            }
        }
    }
}
