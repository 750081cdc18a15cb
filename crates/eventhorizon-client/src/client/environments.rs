//! Environment endpoints.

use reqwest::{Method, StatusCode};
use serde::Serialize;

use crate::client::{Client, RequestParts, TENANT_ID_REQUIRED, require};
use crate::error::Error;
use crate::patch::{Patch, request_fields};
use crate::types::{Environment, Page};

pub(crate) const ENVIRONMENT_ID_REQUIRED: &str = "environment id is required";

/// Create body; unset runner/connection slots serialize as the `"default"`
/// sentinel on the returned entity, not in this request.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CreateEnvironmentRequest {
    #[serde(skip)]
    pub tenant_id: String,
    #[serde(skip)]
    pub environment_id: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "RunnerId", skip_serializing_if = "Patch::is_absent")]
    pub runner_id: Patch<String>,
    #[serde(
        rename = "GithubConnectionId",
        skip_serializing_if = "Patch::is_absent"
    )]
    pub github_connection_id: Patch<String>,
    #[serde(rename = "RepoUrl", skip_serializing_if = "Option::is_none")]
    pub repo_url: Option<String>,
    #[serde(rename = "Branch", skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

request_fields!(CreateEnvironmentRequest {
    "TenantID" => tenant_id (required),
    "EnvironmentID" => environment_id (required),
    "Name" => name (required),
    "RunnerId" => runner_id (patch),
    "GithubConnectionId" => github_connection_id (patch),
    "RepoUrl" => repo_url (optional),
    "Branch" => branch (optional),
});

#[derive(Debug, Clone, Default)]
pub struct GetEnvironmentRequest {
    pub tenant_id: String,
    pub environment_id: String,
    pub include_deleted: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateEnvironmentRequest {
    #[serde(skip)]
    pub tenant_id: String,
    #[serde(skip)]
    pub environment_id: String,
    #[serde(skip)]
    pub version: u64,
    #[serde(rename = "Name", skip_serializing_if = "Patch::is_absent")]
    pub name: Patch<String>,
    #[serde(rename = "RunnerId", skip_serializing_if = "Patch::is_absent")]
    pub runner_id: Patch<String>,
    #[serde(
        rename = "GithubConnectionId",
        skip_serializing_if = "Patch::is_absent"
    )]
    pub github_connection_id: Patch<String>,
    #[serde(rename = "RepoUrl", skip_serializing_if = "Patch::is_absent")]
    pub repo_url: Patch<String>,
    #[serde(rename = "Branch", skip_serializing_if = "Patch::is_absent")]
    pub branch: Patch<String>,
}

request_fields!(UpdateEnvironmentRequest {
    "TenantID" => tenant_id (required),
    "EnvironmentID" => environment_id (required),
    "Name" => name (patch),
    "RunnerId" => runner_id (patch),
    "GithubConnectionId" => github_connection_id (patch),
    "RepoUrl" => repo_url (patch),
    "Branch" => branch (patch),
});

#[derive(Debug, Clone, Default)]
pub struct DeleteEnvironmentRequest {
    pub tenant_id: String,
    pub environment_id: String,
    pub version: u64,
}

#[derive(Debug, Clone, Default)]
pub struct ListEnvironmentsRequest {
    pub tenant_id: String,
    pub max_results: Option<u64>,
    pub token: Option<String>,
    pub include_deleted: bool,
}

impl Client {
    fn create_environment_request(
        &self,
        req: &CreateEnvironmentRequest,
    ) -> Result<reqwest::Request, Error> {
        require(&req.tenant_id, TENANT_ID_REQUIRED)?;
        require(&req.environment_id, ENVIRONMENT_ID_REQUIRED)?;
        let url = self
            .url()
            .push("tenants")
            .push(&req.tenant_id)
            .push("environments")
            .push(&req.environment_id)
            .finish();
        let parts = RequestParts::new(Method::PUT, url).json(req)?;
        self.build_request(parts)
    }

    pub async fn create_environment(
        &self,
        req: &CreateEnvironmentRequest,
    ) -> Result<Environment, Error> {
        let request = self.create_environment_request(req)?;
        self.expect_json(request, StatusCode::CREATED).await
    }

    fn get_environment_request(
        &self,
        req: &GetEnvironmentRequest,
    ) -> Result<reqwest::Request, Error> {
        require(&req.tenant_id, TENANT_ID_REQUIRED)?;
        require(&req.environment_id, ENVIRONMENT_ID_REQUIRED)?;
        let url = self
            .url()
            .push("tenants")
            .push(&req.tenant_id)
            .push("environments")
            .push(&req.environment_id)
            .query_flag("includeDeleted", req.include_deleted)
            .finish();
        self.build_request(RequestParts::new(Method::GET, url))
    }

    pub async fn get_environment(
        &self,
        req: &GetEnvironmentRequest,
    ) -> Result<Environment, Error> {
        let request = self.get_environment_request(req)?;
        self.expect_json(request, StatusCode::OK).await
    }

    fn update_environment_request(
        &self,
        req: &UpdateEnvironmentRequest,
    ) -> Result<reqwest::Request, Error> {
        require(&req.tenant_id, TENANT_ID_REQUIRED)?;
        require(&req.environment_id, ENVIRONMENT_ID_REQUIRED)?;
        let url = self
            .url()
            .push("tenants")
            .push(&req.tenant_id)
            .push("environments")
            .push(&req.environment_id)
            .finish();
        let parts = RequestParts::new(Method::PATCH, url)
            .json(req)?
            .if_match(req.version);
        self.build_request(parts)
    }

    pub async fn update_environment(
        &self,
        req: &UpdateEnvironmentRequest,
    ) -> Result<Environment, Error> {
        let request = self.update_environment_request(req)?;
        self.expect_json(request, StatusCode::OK).await
    }

    fn delete_environment_request(
        &self,
        req: &DeleteEnvironmentRequest,
    ) -> Result<reqwest::Request, Error> {
        require(&req.tenant_id, TENANT_ID_REQUIRED)?;
        require(&req.environment_id, ENVIRONMENT_ID_REQUIRED)?;
        let url = self
            .url()
            .push("tenants")
            .push(&req.tenant_id)
            .push("environments")
            .push(&req.environment_id)
            .finish();
        let parts = RequestParts::new(Method::DELETE, url).if_match(req.version);
        self.build_request(parts)
    }

    pub async fn delete_environment(
        &self,
        req: &DeleteEnvironmentRequest,
    ) -> Result<(), Error> {
        let request = self.delete_environment_request(req)?;
        self.expect_no_content(request).await
    }

    fn list_environments_request(
        &self,
        req: &ListEnvironmentsRequest,
    ) -> Result<reqwest::Request, Error> {
        require(&req.tenant_id, TENANT_ID_REQUIRED)?;
        let url = self
            .url()
            .push("tenants")
            .push(&req.tenant_id)
            .push("environments")
            .query_u64_opt("maxResults", req.max_results)
            .query_opt("token", req.token.as_deref())
            .query_flag("includeDeleted", req.include_deleted)
            .finish();
        self.build_request(RequestParts::new(Method::GET, url))
    }

    pub async fn list_environments(
        &self,
        req: &ListEnvironmentsRequest,
    ) -> Result<Page<Environment>, Error> {
        let request = self.list_environments_request(req)?;
        self.expect_json(request, StatusCode::OK).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::client::tests::{body_string, test_client};
    use reqwest::header::IF_MATCH;

    #[test]
    fn create_environment_escapes_both_ids() {
        let client = test_client();
        let req = CreateEnvironmentRequest {
            tenant_id: "foo/../../bar".to_string(),
            environment_id: "env/../../id".to_string(),
            name: "env".to_string(),
            ..Default::default()
        };
        let request = client.create_environment_request(&req).unwrap();
        assert_eq!(request.method(), Method::PUT);
        assert_eq!(
            request.url().as_str(),
            "https://api.eventhorizon.example/v1/tenants/foo%2F..%2F..%2Fbar/environments/env%2F..%2F..%2Fid"
        );
        let body = body_string(&request);
        assert!(body.contains(r#""Name":"env""#));
        // Escaped IDs occupy exactly one segment each.
        let segments: Vec<&str> = request
            .url()
            .path()
            .split('/')
            .filter(|segment| !segment.is_empty())
            .collect();
        assert_eq!(segments.len(), 5);
    }

    #[test]
    fn validation_order_is_tenant_then_environment() {
        let client = test_client();
        let err = client
            .create_environment_request(&CreateEnvironmentRequest::default())
            .unwrap_err();
        assert_eq!(err.to_string(), "tenant id is required");

        let err = client
            .create_environment_request(&CreateEnvironmentRequest {
                tenant_id: "t1".to_string(),
                ..Default::default()
            })
            .unwrap_err();
        assert_eq!(err.to_string(), "environment id is required");
    }

    #[test]
    fn get_environment_opts_into_deleted() {
        let client = test_client();
        let req = GetEnvironmentRequest {
            tenant_id: "t1".to_string(),
            environment_id: "e1".to_string(),
            include_deleted: true,
        };
        let request = client.get_environment_request(&req).unwrap();
        assert_eq!(
            request.url().as_str(),
            "https://api.eventhorizon.example/v1/tenants/t1/environments/e1?includeDeleted=true"
        );
    }

    #[test]
    fn update_environment_patch_body_and_if_match() {
        let client = test_client();
        let req = UpdateEnvironmentRequest {
            tenant_id: "t1".to_string(),
            environment_id: "e1".to_string(),
            version: 5,
            runner_id: Patch::Value("r9".to_string()),
            branch: Patch::Null,
            ..Default::default()
        };
        let request = client.update_environment_request(&req).unwrap();
        assert_eq!(request.method(), Method::PATCH);
        assert_eq!(request.headers()[IF_MATCH], "5");
        assert_eq!(body_string(&request), r#"{"RunnerId":"r9","Branch":null}"#);
    }

    #[test]
    fn delete_environment_is_a_cas_delete() {
        let client = test_client();
        let req = DeleteEnvironmentRequest {
            tenant_id: "t1".to_string(),
            environment_id: "e1".to_string(),
            version: 9,
        };
        let request = client.delete_environment_request(&req).unwrap();
        assert_eq!(request.method(), Method::DELETE);
        assert_eq!(request.headers()[IF_MATCH], "9");
    }
}
