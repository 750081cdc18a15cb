//! GitHub connection endpoints.

use reqwest::{Method, StatusCode};
use serde::Serialize;

use crate::client::{Client, RequestParts, TENANT_ID_REQUIRED, require};
use crate::error::Error;
use crate::patch::{Patch, request_fields};
use crate::types::{GithubConnection, Page};

pub(crate) const CONNECTION_ID_REQUIRED: &str = "connection id is required";

#[derive(Debug, Clone, Default, Serialize)]
pub struct CreateGithubConnectionRequest {
    #[serde(skip)]
    pub tenant_id: String,
    #[serde(skip)]
    pub connection_id: String,
    #[serde(rename = "InstallationID")]
    pub installation_id: i64,
    #[serde(rename = "Org")]
    pub org: String,
}

request_fields!(CreateGithubConnectionRequest {
    "TenantID" => tenant_id (required),
    "ConnectionID" => connection_id (required),
    "InstallationID" => installation_id (required),
    "Org" => org (required),
});

#[derive(Debug, Clone, Default)]
pub struct GetGithubConnectionRequest {
    pub tenant_id: String,
    pub connection_id: String,
    pub include_deleted: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateGithubConnectionRequest {
    #[serde(skip)]
    pub tenant_id: String,
    #[serde(skip)]
    pub connection_id: String,
    #[serde(skip)]
    pub version: u64,
    #[serde(rename = "InstallationID", skip_serializing_if = "Patch::is_absent")]
    pub installation_id: Patch<i64>,
    #[serde(rename = "Org", skip_serializing_if = "Patch::is_absent")]
    pub org: Patch<String>,
}

request_fields!(UpdateGithubConnectionRequest {
    "TenantID" => tenant_id (required),
    "ConnectionID" => connection_id (required),
    "InstallationID" => installation_id (patch),
    "Org" => org (patch),
});

#[derive(Debug, Clone, Default)]
pub struct DeleteGithubConnectionRequest {
    pub tenant_id: String,
    pub connection_id: String,
    pub version: u64,
}

#[derive(Debug, Clone, Default)]
pub struct ListGithubConnectionsRequest {
    pub tenant_id: String,
    pub max_results: Option<u64>,
    pub token: Option<String>,
    pub include_deleted: bool,
}

impl Client {
    fn connection_url(&self, tenant_id: &str, connection_id: &str) -> crate::paths::UrlBuilder {
        self.url()
            .push("tenants")
            .push(tenant_id)
            .push("github-connections")
            .push(connection_id)
    }

    fn create_github_connection_request(
        &self,
        req: &CreateGithubConnectionRequest,
    ) -> Result<reqwest::Request, Error> {
        require(&req.tenant_id, TENANT_ID_REQUIRED)?;
        require(&req.connection_id, CONNECTION_ID_REQUIRED)?;
        let url = self
            .connection_url(&req.tenant_id, &req.connection_id)
            .finish();
        let parts = RequestParts::new(Method::PUT, url).json(req)?;
        self.build_request(parts)
    }

    pub async fn create_github_connection(
        &self,
        req: &CreateGithubConnectionRequest,
    ) -> Result<GithubConnection, Error> {
        let request = self.create_github_connection_request(req)?;
        self.expect_json(request, StatusCode::CREATED).await
    }

    fn get_github_connection_request(
        &self,
        req: &GetGithubConnectionRequest,
    ) -> Result<reqwest::Request, Error> {
        require(&req.tenant_id, TENANT_ID_REQUIRED)?;
        require(&req.connection_id, CONNECTION_ID_REQUIRED)?;
        let url = self
            .connection_url(&req.tenant_id, &req.connection_id)
            .query_flag("includeDeleted", req.include_deleted)
            .finish();
        self.build_request(RequestParts::new(Method::GET, url))
    }

    pub async fn get_github_connection(
        &self,
        req: &GetGithubConnectionRequest,
    ) -> Result<GithubConnection, Error> {
        let request = self.get_github_connection_request(req)?;
        self.expect_json(request, StatusCode::OK).await
    }

    fn update_github_connection_request(
        &self,
        req: &UpdateGithubConnectionRequest,
    ) -> Result<reqwest::Request, Error> {
        require(&req.tenant_id, TENANT_ID_REQUIRED)?;
        require(&req.connection_id, CONNECTION_ID_REQUIRED)?;
        let url = self
            .connection_url(&req.tenant_id, &req.connection_id)
            .finish();
        let parts = RequestParts::new(Method::PATCH, url)
            .json(req)?
            .if_match(req.version);
        self.build_request(parts)
    }

    pub async fn update_github_connection(
        &self,
        req: &UpdateGithubConnectionRequest,
    ) -> Result<GithubConnection, Error> {
        let request = self.update_github_connection_request(req)?;
        self.expect_json(request, StatusCode::OK).await
    }

    fn delete_github_connection_request(
        &self,
        req: &DeleteGithubConnectionRequest,
    ) -> Result<reqwest::Request, Error> {
        require(&req.tenant_id, TENANT_ID_REQUIRED)?;
        require(&req.connection_id, CONNECTION_ID_REQUIRED)?;
        let url = self
            .connection_url(&req.tenant_id, &req.connection_id)
            .finish();
        let parts = RequestParts::new(Method::DELETE, url).if_match(req.version);
        self.build_request(parts)
    }

    pub async fn delete_github_connection(
        &self,
        req: &DeleteGithubConnectionRequest,
    ) -> Result<(), Error> {
        let request = self.delete_github_connection_request(req)?;
        self.expect_no_content(request).await
    }

    fn list_github_connections_request(
        &self,
        req: &ListGithubConnectionsRequest,
    ) -> Result<reqwest::Request, Error> {
        require(&req.tenant_id, TENANT_ID_REQUIRED)?;
        let url = self
            .url()
            .push("tenants")
            .push(&req.tenant_id)
            .push("github-connections")
            .query_u64_opt("maxResults", req.max_results)
            .query_opt("token", req.token.as_deref())
            .query_flag("includeDeleted", req.include_deleted)
            .finish();
        self.build_request(RequestParts::new(Method::GET, url))
    }

    pub async fn list_github_connections(
        &self,
        req: &ListGithubConnectionsRequest,
    ) -> Result<Page<GithubConnection>, Error> {
        let request = self.list_github_connections_request(req)?;
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
    fn create_connection_body_and_path() {
        let client = test_client();
        let req = CreateGithubConnectionRequest {
            tenant_id: "t1".to_string(),
            connection_id: "gh-1".to_string(),
            installation_id: 4242,
            org: "event-horizon".to_string(),
        };
        let request = client.create_github_connection_request(&req).unwrap();
        assert_eq!(request.method(), Method::PUT);
        assert_eq!(
            request.url().as_str(),
            "https://api.eventhorizon.example/v1/tenants/t1/github-connections/gh-1"
        );
        assert_eq!(
            body_string(&request),
            r#"{"InstallationID":4242,"Org":"event-horizon"}"#
        );
    }

    #[test]
    fn validation_order_is_tenant_then_connection() {
        let client = test_client();
        let err = client
            .get_github_connection_request(&GetGithubConnectionRequest::default())
            .unwrap_err();
        assert_eq!(err.to_string(), "tenant id is required");

        let err = client
            .get_github_connection_request(&GetGithubConnectionRequest {
                tenant_id: "t1".to_string(),
                ..Default::default()
            })
            .unwrap_err();
        assert_eq!(err.to_string(), "connection id is required");
    }

    #[test]
    fn update_connection_is_cas_patch() {
        let client = test_client();
        let req = UpdateGithubConnectionRequest {
            tenant_id: "t1".to_string(),
            connection_id: "gh-1".to_string(),
            version: 3,
            installation_id: Patch::Value(999),
            org: Patch::Absent,
        };
        let request = client.update_github_connection_request(&req).unwrap();
        assert_eq!(request.headers()[IF_MATCH], "3");
        assert_eq!(body_string(&request), r#"{"InstallationID":999}"#);
    }
}
