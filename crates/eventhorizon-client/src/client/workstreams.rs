//! Workstream endpoints, including task grouping operations.

use reqwest::{Method, StatusCode};
use serde::Serialize;

use crate::client::{Client, RequestParts, TENANT_ID_REQUIRED, require};
use crate::error::Error;
use crate::patch::{Patch, request_fields};
use crate::types::{Page, Task, Workstream};

pub(crate) const WORKSTREAM_ID_REQUIRED: &str = "workstream id is required";
pub(crate) const TASK_ID_REQUIRED: &str = "task id is required";

#[derive(Debug, Clone, Default, Serialize)]
pub struct CreateWorkstreamRequest {
    #[serde(skip)]
    pub tenant_id: String,
    #[serde(skip)]
    pub workstream_id: String,
    #[serde(rename = "Name")]
    pub name: String,
}

request_fields!(CreateWorkstreamRequest {
    "TenantID" => tenant_id (required),
    "WorkstreamID" => workstream_id (required),
    "Name" => name (required),
});

#[derive(Debug, Clone, Default)]
pub struct GetWorkstreamRequest {
    pub tenant_id: String,
    pub workstream_id: String,
    pub include_deleted: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateWorkstreamRequest {
    #[serde(skip)]
    pub tenant_id: String,
    #[serde(skip)]
    pub workstream_id: String,
    #[serde(skip)]
    pub version: u64,
    #[serde(rename = "Name", skip_serializing_if = "Patch::is_absent")]
    pub name: Patch<String>,
}

request_fields!(UpdateWorkstreamRequest {
    "TenantID" => tenant_id (required),
    "WorkstreamID" => workstream_id (required),
    "Name" => name (patch),
});

#[derive(Debug, Clone, Default)]
pub struct DeleteWorkstreamRequest {
    pub tenant_id: String,
    pub workstream_id: String,
    pub version: u64,
}

#[derive(Debug, Clone, Default)]
pub struct ListWorkstreamsRequest {
    pub tenant_id: String,
    pub max_results: Option<u64>,
    pub token: Option<String>,
    pub include_deleted: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ListWorkstreamTasksRequest {
    pub tenant_id: String,
    pub workstream_id: String,
    pub max_results: Option<u64>,
    pub token: Option<String>,
    pub include_deleted: bool,
}

/// Moves an existing task into the named workstream.
#[derive(Debug, Clone, Default)]
pub struct MoveTaskRequest {
    pub tenant_id: String,
    pub workstream_id: String,
    pub task_id: String,
}

impl Client {
    fn workstream_url(&self, tenant_id: &str, workstream_id: &str) -> crate::paths::UrlBuilder {
        self.url()
            .push("tenants")
            .push(tenant_id)
            .push("workstreams")
            .push(workstream_id)
    }

    fn create_workstream_request(
        &self,
        req: &CreateWorkstreamRequest,
    ) -> Result<reqwest::Request, Error> {
        require(&req.tenant_id, TENANT_ID_REQUIRED)?;
        require(&req.workstream_id, WORKSTREAM_ID_REQUIRED)?;
        let url = self
            .workstream_url(&req.tenant_id, &req.workstream_id)
            .finish();
        let parts = RequestParts::new(Method::PUT, url).json(req)?;
        self.build_request(parts)
    }

    pub async fn create_workstream(
        &self,
        req: &CreateWorkstreamRequest,
    ) -> Result<Workstream, Error> {
        let request = self.create_workstream_request(req)?;
        self.expect_json(request, StatusCode::CREATED).await
    }

    fn get_workstream_request(
        &self,
        req: &GetWorkstreamRequest,
    ) -> Result<reqwest::Request, Error> {
        require(&req.tenant_id, TENANT_ID_REQUIRED)?;
        require(&req.workstream_id, WORKSTREAM_ID_REQUIRED)?;
        let url = self
            .workstream_url(&req.tenant_id, &req.workstream_id)
            .query_flag("includeDeleted", req.include_deleted)
            .finish();
        self.build_request(RequestParts::new(Method::GET, url))
    }

    pub async fn get_workstream(&self, req: &GetWorkstreamRequest) -> Result<Workstream, Error> {
        let request = self.get_workstream_request(req)?;
        self.expect_json(request, StatusCode::OK).await
    }

    fn update_workstream_request(
        &self,
        req: &UpdateWorkstreamRequest,
    ) -> Result<reqwest::Request, Error> {
        require(&req.tenant_id, TENANT_ID_REQUIRED)?;
        require(&req.workstream_id, WORKSTREAM_ID_REQUIRED)?;
        let url = self
            .workstream_url(&req.tenant_id, &req.workstream_id)
            .finish();
        let parts = RequestParts::new(Method::PATCH, url)
            .json(req)?
            .if_match(req.version);
        self.build_request(parts)
    }

    pub async fn update_workstream(
        &self,
        req: &UpdateWorkstreamRequest,
    ) -> Result<Workstream, Error> {
        let request = self.update_workstream_request(req)?;
        self.expect_json(request, StatusCode::OK).await
    }

    fn delete_workstream_request(
        &self,
        req: &DeleteWorkstreamRequest,
    ) -> Result<reqwest::Request, Error> {
        require(&req.tenant_id, TENANT_ID_REQUIRED)?;
        require(&req.workstream_id, WORKSTREAM_ID_REQUIRED)?;
        let url = self
            .workstream_url(&req.tenant_id, &req.workstream_id)
            .finish();
        let parts = RequestParts::new(Method::DELETE, url).if_match(req.version);
        self.build_request(parts)
    }

    pub async fn delete_workstream(&self, req: &DeleteWorkstreamRequest) -> Result<(), Error> {
        let request = self.delete_workstream_request(req)?;
        self.expect_no_content(request).await
    }

    fn list_workstreams_request(
        &self,
        req: &ListWorkstreamsRequest,
    ) -> Result<reqwest::Request, Error> {
        require(&req.tenant_id, TENANT_ID_REQUIRED)?;
        let url = self
            .url()
            .push("tenants")
            .push(&req.tenant_id)
            .push("workstreams")
            .query_u64_opt("maxResults", req.max_results)
            .query_opt("token", req.token.as_deref())
            .query_flag("includeDeleted", req.include_deleted)
            .finish();
        self.build_request(RequestParts::new(Method::GET, url))
    }

    pub async fn list_workstreams(
        &self,
        req: &ListWorkstreamsRequest,
    ) -> Result<Page<Workstream>, Error> {
        let request = self.list_workstreams_request(req)?;
        self.expect_json(request, StatusCode::OK).await
    }

    fn list_workstream_tasks_request(
        &self,
        req: &ListWorkstreamTasksRequest,
    ) -> Result<reqwest::Request, Error> {
        require(&req.tenant_id, TENANT_ID_REQUIRED)?;
        require(&req.workstream_id, WORKSTREAM_ID_REQUIRED)?;
        let url = self
            .workstream_url(&req.tenant_id, &req.workstream_id)
            .push("tasks")
            .query_u64_opt("maxResults", req.max_results)
            .query_opt("token", req.token.as_deref())
            .query_flag("includeDeleted", req.include_deleted)
            .finish();
        self.build_request(RequestParts::new(Method::GET, url))
    }

    pub async fn list_workstream_tasks(
        &self,
        req: &ListWorkstreamTasksRequest,
    ) -> Result<Page<Task>, Error> {
        let request = self.list_workstream_tasks_request(req)?;
        self.expect_json(request, StatusCode::OK).await
    }

    fn move_task_request(&self, req: &MoveTaskRequest) -> Result<reqwest::Request, Error> {
        require(&req.tenant_id, TENANT_ID_REQUIRED)?;
        require(&req.workstream_id, WORKSTREAM_ID_REQUIRED)?;
        require(&req.task_id, TASK_ID_REQUIRED)?;
        let url = self
            .workstream_url(&req.tenant_id, &req.workstream_id)
            .push("tasks")
            .push(&req.task_id)
            .push("move")
            .finish();
        self.build_request(RequestParts::new(Method::POST, url))
    }

    /// Named action; the server rewrites the task's workstream membership and
    /// returns the updated task.
    pub async fn move_task(&self, req: &MoveTaskRequest) -> Result<Task, Error> {
        let request = self.move_task_request(req)?;
        self.expect_json(request, StatusCode::OK).await
    }
}
