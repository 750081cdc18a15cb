//! Runner, runner-queue, queue-message, and runner-token endpoints.

use chrono::{DateTime, Utc};
use reqwest::{Method, StatusCode};
use serde::Serialize;

use crate::client::{
    Client, QUEUE_ID_REQUIRED, RUNNER_ID_REQUIRED, RequestParts, TENANT_ID_REQUIRED, require,
};
use crate::error::Error;
use crate::patch::{Patch, request_fields};
use crate::types::{Page, Runner, RunnerQueue, RunnerTokenMetadata};

pub(crate) const TOKEN_ID_REQUIRED: &str = "token id is required";

#[derive(Debug, Clone, Default, Serialize)]
pub struct CreateRunnerRequest {
    #[serde(skip)]
    pub tenant_id: String,
    #[serde(skip)]
    pub runner_id: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Private")]
    pub private: bool,
}

request_fields!(CreateRunnerRequest {
    "TenantID" => tenant_id (required),
    "RunnerID" => runner_id (required),
    "Name" => name (required),
    "Private" => private (required),
});

#[derive(Debug, Clone, Default)]
pub struct GetRunnerRequest {
    pub tenant_id: String,
    pub runner_id: String,
    pub include_deleted: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateRunnerRequest {
    #[serde(skip)]
    pub tenant_id: String,
    #[serde(skip)]
    pub runner_id: String,
    #[serde(skip)]
    pub version: u64,
    #[serde(rename = "Name", skip_serializing_if = "Patch::is_absent")]
    pub name: Patch<String>,
    #[serde(rename = "Private", skip_serializing_if = "Patch::is_absent")]
    pub private: Patch<bool>,
}

request_fields!(UpdateRunnerRequest {
    "TenantID" => tenant_id (required),
    "RunnerID" => runner_id (required),
    "Name" => name (patch),
    "Private" => private (patch),
});

#[derive(Debug, Clone, Default)]
pub struct DeleteRunnerRequest {
    pub tenant_id: String,
    pub runner_id: String,
    pub version: u64,
}

#[derive(Debug, Clone, Default)]
pub struct ListRunnersRequest {
    pub tenant_id: String,
    pub max_results: Option<u64>,
    pub token: Option<String>,
    pub include_deleted: bool,
}

/// Queue registration is compare-and-swap on the runner version.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RegisterRunnerQueueRequest {
    #[serde(skip)]
    pub tenant_id: String,
    #[serde(skip)]
    pub runner_id: String,
    #[serde(skip)]
    pub queue_id: String,
    #[serde(rename = "PublicKey")]
    pub public_key: String,
    #[serde(skip)]
    pub version: u64,
}

request_fields!(RegisterRunnerQueueRequest {
    "TenantID" => tenant_id (required),
    "RunnerID" => runner_id (required),
    "QueueID" => queue_id (required),
    "PublicKey" => public_key (required),
});

#[derive(Debug, Clone, Default)]
pub struct GetRunnerQueueRequest {
    pub tenant_id: String,
    pub runner_id: String,
    pub queue_id: String,
    pub include_deleted: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateRunnerQueueRequest {
    #[serde(skip)]
    pub tenant_id: String,
    #[serde(skip)]
    pub runner_id: String,
    #[serde(skip)]
    pub queue_id: String,
    #[serde(skip)]
    pub version: u64,
    #[serde(rename = "Healthy", skip_serializing_if = "Patch::is_absent")]
    pub healthy: Patch<bool>,
    #[serde(rename = "Draining", skip_serializing_if = "Patch::is_absent")]
    pub draining: Patch<bool>,
}

request_fields!(UpdateRunnerQueueRequest {
    "TenantID" => tenant_id (required),
    "RunnerID" => runner_id (required),
    "QueueID" => queue_id (required),
    "Healthy" => healthy (patch),
    "Draining" => draining (patch),
});

#[derive(Debug, Clone, Default)]
pub struct DeleteRunnerQueueRequest {
    pub tenant_id: String,
    pub runner_id: String,
    pub queue_id: String,
    pub version: u64,
}

/// Cross-tenant queue listing for service operators. Filtering by runner
/// requires the tenant filter too.
#[derive(Debug, Clone, Default)]
pub struct ListRunnerQueuesRequest {
    pub tenant_id: Option<String>,
    pub runner_id: Option<String>,
    pub min_queue_id: Option<String>,
    pub max_queue_id: Option<String>,
    pub max_results: Option<u64>,
    pub token: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RespondRunnerMessageRequest {
    #[serde(skip)]
    pub tenant_id: String,
    #[serde(skip)]
    pub runner_id: String,
    #[serde(skip)]
    pub queue_id: String,
    #[serde(skip)]
    pub message_id: String,
    #[serde(rename = "Payload")]
    pub payload: serde_json::Value,
}

request_fields!(RespondRunnerMessageRequest {
    "TenantID" => tenant_id (required),
    "RunnerID" => runner_id (required),
    "QueueID" => queue_id (required),
    "MessageID" => message_id (required),
    "Payload" => payload (required),
});

#[derive(Debug, Clone, Default, Serialize)]
pub struct CreateRunnerTokenRequest {
    #[serde(skip)]
    pub tenant_id: String,
    #[serde(skip)]
    pub runner_id: String,
    #[serde(rename = "ExpiresAt", skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

request_fields!(CreateRunnerTokenRequest {
    "TenantID" => tenant_id (required),
    "RunnerID" => runner_id (required),
    "ExpiresAt" => expires_at (optional),
});

#[derive(Debug, Clone, Default)]
pub struct ListRunnerTokensRequest {
    pub tenant_id: String,
    pub runner_id: String,
    pub max_results: Option<u64>,
    pub token: Option<String>,
    pub include_deleted: bool,
}

/// Revocation is a named action, distinct from soft-delete.
#[derive(Debug, Clone, Default)]
pub struct RevokeRunnerTokenRequest {
    pub tenant_id: String,
    pub runner_id: String,
    pub token_id: String,
}

#[derive(Debug, Clone, Default)]
pub struct DeleteRunnerTokenRequest {
    pub tenant_id: String,
    pub runner_id: String,
    pub token_id: String,
    pub version: u64,
}

impl Client {
    fn runner_url(&self, tenant_id: &str, runner_id: &str) -> crate::paths::UrlBuilder {
        self.url()
            .push("tenants")
            .push(tenant_id)
            .push("runners")
            .push(runner_id)
    }

    fn create_runner_request(&self, req: &CreateRunnerRequest) -> Result<reqwest::Request, Error> {
        require(&req.tenant_id, TENANT_ID_REQUIRED)?;
        require(&req.runner_id, RUNNER_ID_REQUIRED)?;
        let url = self.runner_url(&req.tenant_id, &req.runner_id).finish();
        let parts = RequestParts::new(Method::PUT, url).json(req)?;
        self.build_request(parts)
    }

    pub async fn create_runner(&self, req: &CreateRunnerRequest) -> Result<Runner, Error> {
        let request = self.create_runner_request(req)?;
        self.expect_json(request, StatusCode::CREATED).await
    }

    fn get_runner_request(&self, req: &GetRunnerRequest) -> Result<reqwest::Request, Error> {
        require(&req.tenant_id, TENANT_ID_REQUIRED)?;
        require(&req.runner_id, RUNNER_ID_REQUIRED)?;
        let url = self
            .runner_url(&req.tenant_id, &req.runner_id)
            .query_flag("includeDeleted", req.include_deleted)
            .finish();
        self.build_request(RequestParts::new(Method::GET, url))
    }

    pub async fn get_runner(&self, req: &GetRunnerRequest) -> Result<Runner, Error> {
        let request = self.get_runner_request(req)?;
        self.expect_json(request, StatusCode::OK).await
    }

    fn update_runner_request(&self, req: &UpdateRunnerRequest) -> Result<reqwest::Request, Error> {
        require(&req.tenant_id, TENANT_ID_REQUIRED)?;
        require(&req.runner_id, RUNNER_ID_REQUIRED)?;
        let url = self.runner_url(&req.tenant_id, &req.runner_id).finish();
        let parts = RequestParts::new(Method::PATCH, url)
            .json(req)?
            .if_match(req.version);
        self.build_request(parts)
    }

    pub async fn update_runner(&self, req: &UpdateRunnerRequest) -> Result<Runner, Error> {
        let request = self.update_runner_request(req)?;
        self.expect_json(request, StatusCode::OK).await
    }

    fn delete_runner_request(&self, req: &DeleteRunnerRequest) -> Result<reqwest::Request, Error> {
        require(&req.tenant_id, TENANT_ID_REQUIRED)?;
        require(&req.runner_id, RUNNER_ID_REQUIRED)?;
        let url = self.runner_url(&req.tenant_id, &req.runner_id).finish();
        let parts = RequestParts::new(Method::DELETE, url).if_match(req.version);
        self.build_request(parts)
    }

    pub async fn delete_runner(&self, req: &DeleteRunnerRequest) -> Result<(), Error> {
        let request = self.delete_runner_request(req)?;
        self.expect_no_content(request).await
    }

    fn list_runners_request(&self, req: &ListRunnersRequest) -> Result<reqwest::Request, Error> {
        require(&req.tenant_id, TENANT_ID_REQUIRED)?;
        let url = self
            .url()
            .push("tenants")
            .push(&req.tenant_id)
            .push("runners")
            .query_u64_opt("maxResults", req.max_results)
            .query_opt("token", req.token.as_deref())
            .query_flag("includeDeleted", req.include_deleted)
            .finish();
        self.build_request(RequestParts::new(Method::GET, url))
    }

    pub async fn list_runners(&self, req: &ListRunnersRequest) -> Result<Page<Runner>, Error> {
        let request = self.list_runners_request(req)?;
        self.expect_json(request, StatusCode::OK).await
    }

    fn register_runner_queue_request(
        &self,
        req: &RegisterRunnerQueueRequest,
    ) -> Result<reqwest::Request, Error> {
        require(&req.tenant_id, TENANT_ID_REQUIRED)?;
        require(&req.runner_id, RUNNER_ID_REQUIRED)?;
        require(&req.queue_id, QUEUE_ID_REQUIRED)?;
        require(&req.public_key, "public key is required")?;
        let url = self
            .runner_url(&req.tenant_id, &req.runner_id)
            .push("queues")
            .push(&req.queue_id)
            .finish();
        let parts = RequestParts::new(Method::PUT, url)
            .json(req)?
            .if_match(req.version);
        self.build_request(parts)
    }

    pub async fn register_runner_queue(
        &self,
        req: &RegisterRunnerQueueRequest,
    ) -> Result<RunnerQueue, Error> {
        let request = self.register_runner_queue_request(req)?;
        self.expect_json(request, StatusCode::CREATED).await
    }

    fn get_runner_queue_request(
        &self,
        req: &GetRunnerQueueRequest,
    ) -> Result<reqwest::Request, Error> {
        require(&req.tenant_id, TENANT_ID_REQUIRED)?;
        require(&req.runner_id, RUNNER_ID_REQUIRED)?;
        require(&req.queue_id, QUEUE_ID_REQUIRED)?;
        let url = self
            .runner_url(&req.tenant_id, &req.runner_id)
            .push("queues")
            .push(&req.queue_id)
            .query_flag("includeDeleted", req.include_deleted)
            .finish();
        self.build_request(RequestParts::new(Method::GET, url))
    }

    pub async fn get_runner_queue(
        &self,
        req: &GetRunnerQueueRequest,
    ) -> Result<RunnerQueue, Error> {
        let request = self.get_runner_queue_request(req)?;
        self.expect_json(request, StatusCode::OK).await
    }

    fn update_runner_queue_request(
        &self,
        req: &UpdateRunnerQueueRequest,
    ) -> Result<reqwest::Request, Error> {
        require(&req.tenant_id, TENANT_ID_REQUIRED)?;
        require(&req.runner_id, RUNNER_ID_REQUIRED)?;
        require(&req.queue_id, QUEUE_ID_REQUIRED)?;
        let url = self
            .runner_url(&req.tenant_id, &req.runner_id)
            .push("queues")
            .push(&req.queue_id)
            .finish();
        let parts = RequestParts::new(Method::PATCH, url)
            .json(req)?
            .if_match(req.version);
        self.build_request(parts)
    }

    pub async fn update_runner_queue(
        &self,
        req: &UpdateRunnerQueueRequest,
    ) -> Result<RunnerQueue, Error> {
        let request = self.update_runner_queue_request(req)?;
        self.expect_json(request, StatusCode::OK).await
    }

    fn delete_runner_queue_request(
        &self,
        req: &DeleteRunnerQueueRequest,
    ) -> Result<reqwest::Request, Error> {
        require(&req.tenant_id, TENANT_ID_REQUIRED)?;
        require(&req.runner_id, RUNNER_ID_REQUIRED)?;
        require(&req.queue_id, QUEUE_ID_REQUIRED)?;
        let url = self
            .runner_url(&req.tenant_id, &req.runner_id)
            .push("queues")
            .push(&req.queue_id)
            .finish();
        let parts = RequestParts::new(Method::DELETE, url).if_match(req.version);
        self.build_request(parts)
    }

    pub async fn delete_runner_queue(&self, req: &DeleteRunnerQueueRequest) -> Result<(), Error> {
        let request = self.delete_runner_queue_request(req)?;
        self.expect_no_content(request).await
    }

    fn list_runner_queues_request(
        &self,
        req: &ListRunnerQueuesRequest,
    ) -> Result<reqwest::Request, Error> {
        if req.runner_id.is_some() && req.tenant_id.is_none() {
            return Err(Error::validation(
                "tenant id is required when runner id is set",
            ));
        }
        let url = self
            .url()
            .push("runner-queues")
            .query_opt("tenantID", req.tenant_id.as_deref())
            .query_opt("runnerID", req.runner_id.as_deref())
            .query_opt("minQueueID", req.min_queue_id.as_deref())
            .query_opt("maxQueueID", req.max_queue_id.as_deref())
            .query_u64_opt("maxResults", req.max_results)
            .query_opt("token", req.token.as_deref())
            .finish();
        self.build_request(RequestParts::new(Method::GET, url))
    }

    pub async fn list_runner_queues(
        &self,
        req: &ListRunnerQueuesRequest,
    ) -> Result<Page<RunnerQueue>, Error> {
        let request = self.list_runner_queues_request(req)?;
        self.expect_json(request, StatusCode::OK).await
    }

    fn respond_runner_message_request(
        &self,
        req: &RespondRunnerMessageRequest,
    ) -> Result<reqwest::Request, Error> {
        require(&req.tenant_id, TENANT_ID_REQUIRED)?;
        require(&req.runner_id, RUNNER_ID_REQUIRED)?;
        require(&req.queue_id, QUEUE_ID_REQUIRED)?;
        require(&req.message_id, "message id is required")?;
        let url = self
            .runner_url(&req.tenant_id, &req.runner_id)
            .push("queues")
            .push(&req.queue_id)
            .push("messages")
            .push(&req.message_id)
            .push("response")
            .finish();
        let parts = RequestParts::new(Method::PUT, url).json(req)?;
        self.build_request(parts)
    }

    /// Posts the response for one queue message, consuming it.
    pub async fn respond_runner_message(
        &self,
        req: &RespondRunnerMessageRequest,
    ) -> Result<(), Error> {
        let request = self.respond_runner_message_request(req)?;
        self.expect_no_content(request).await
    }

    fn create_runner_token_request(
        &self,
        req: &CreateRunnerTokenRequest,
    ) -> Result<reqwest::Request, Error> {
        require(&req.tenant_id, TENANT_ID_REQUIRED)?;
        require(&req.runner_id, RUNNER_ID_REQUIRED)?;
        let url = self
            .runner_url(&req.tenant_id, &req.runner_id)
            .push("tokens")
            .finish();
        let parts = RequestParts::new(Method::POST, url).json(req)?;
        self.build_request(parts)
    }

    pub async fn create_runner_token(
        &self,
        req: &CreateRunnerTokenRequest,
    ) -> Result<RunnerTokenMetadata, Error> {
        let request = self.create_runner_token_request(req)?;
        self.expect_json(request, StatusCode::CREATED).await
    }

    fn list_runner_tokens_request(
        &self,
        req: &ListRunnerTokensRequest,
    ) -> Result<reqwest::Request, Error> {
        require(&req.tenant_id, TENANT_ID_REQUIRED)?;
        require(&req.runner_id, RUNNER_ID_REQUIRED)?;
        let url = self
            .runner_url(&req.tenant_id, &req.runner_id)
            .push("tokens")
            .query_u64_opt("maxResults", req.max_results)
            .query_opt("token", req.token.as_deref())
            .query_flag("includeDeleted", req.include_deleted)
            .finish();
        self.build_request(RequestParts::new(Method::GET, url))
    }

    pub async fn list_runner_tokens(
        &self,
        req: &ListRunnerTokensRequest,
    ) -> Result<Page<RunnerTokenMetadata>, Error> {
        let request = self.list_runner_tokens_request(req)?;
        self.expect_json(request, StatusCode::OK).await
    }

    fn revoke_runner_token_request(
        &self,
        req: &RevokeRunnerTokenRequest,
    ) -> Result<reqwest::Request, Error> {
        require(&req.tenant_id, TENANT_ID_REQUIRED)?;
        require(&req.runner_id, RUNNER_ID_REQUIRED)?;
        require(&req.token_id, TOKEN_ID_REQUIRED)?;
        let url = self
            .runner_url(&req.tenant_id, &req.runner_id)
            .push("tokens")
            .push(&req.token_id)
            .push("revoke")
            .finish();
        self.build_request(RequestParts::new(Method::POST, url))
    }

    /// Revokes the credential without deleting its metadata.
    pub async fn revoke_runner_token(
        &self,
        req: &RevokeRunnerTokenRequest,
    ) -> Result<RunnerTokenMetadata, Error> {
        let request = self.revoke_runner_token_request(req)?;
        self.expect_json(request, StatusCode::OK).await
    }

    fn delete_runner_token_request(
        &self,
        req: &DeleteRunnerTokenRequest,
    ) -> Result<reqwest::Request, Error> {
        require(&req.tenant_id, TENANT_ID_REQUIRED)?;
        require(&req.runner_id, RUNNER_ID_REQUIRED)?;
        require(&req.token_id, TOKEN_ID_REQUIRED)?;
        let url = self
            .runner_url(&req.tenant_id, &req.runner_id)
            .push("tokens")
            .push(&req.token_id)
            .finish();
        let parts = RequestParts::new(Method::DELETE, url).if_match(req.version);
        self.build_request(parts)
    }

    pub async fn delete_runner_token(&self, req: &DeleteRunnerTokenRequest) -> Result<(), Error> {
        let request = self.delete_runner_token_request(req)?;
        self.expect_no_content(request).await
    }
}
