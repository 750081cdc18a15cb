//! Tenant endpoints.

use reqwest::{Method, StatusCode};
use serde::Serialize;

use crate::client::{Client, RequestParts, TENANT_ID_REQUIRED, require};
use crate::error::Error;
use crate::patch::{Patch, request_fields};
use crate::types::{FeatureFlags, Page, Tenant};

/// Idempotent create-by-ID. The tenant ID travels in the path only.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CreateTenantRequest {
    #[serde(skip)]
    pub tenant_id: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "ShortNames", skip_serializing_if = "Vec::is_empty")]
    pub short_names: Vec<String>,
    #[serde(
        rename = "DefaultRunnerID",
        skip_serializing_if = "Patch::is_absent"
    )]
    pub default_runner_id: Patch<String>,
    #[serde(
        rename = "DefaultGithubConnectionID",
        skip_serializing_if = "Patch::is_absent"
    )]
    pub default_github_connection_id: Patch<String>,
    #[serde(skip)]
    pub feature_flags: FeatureFlags,
}

request_fields!(CreateTenantRequest {
    "TenantID" => tenant_id (required),
    "Name" => name (required),
    "ShortNames" => short_names (required),
    "DefaultRunnerID" => default_runner_id (patch),
    "DefaultGithubConnectionID" => default_github_connection_id (patch),
});

#[derive(Debug, Clone, Default)]
pub struct GetTenantRequest {
    pub tenant_id: String,
    pub include_deleted: bool,
}

/// PATCH semantics: absent fields are left unchanged; an empty-string value
/// clears fields the server accepts clearing (e.g. the default connection).
/// `version` travels in `If-Match`, never in the body.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateTenantRequest {
    #[serde(skip)]
    pub tenant_id: String,
    #[serde(skip)]
    pub version: u64,
    #[serde(rename = "Name", skip_serializing_if = "Patch::is_absent")]
    pub name: Patch<String>,
    #[serde(
        rename = "DefaultRunnerID",
        skip_serializing_if = "Patch::is_absent"
    )]
    pub default_runner_id: Patch<String>,
    #[serde(
        rename = "DefaultGithubConnectionID",
        skip_serializing_if = "Patch::is_absent"
    )]
    pub default_github_connection_id: Patch<String>,
    #[serde(skip)]
    pub feature_flags: FeatureFlags,
}

request_fields!(UpdateTenantRequest {
    "TenantID" => tenant_id (required),
    "Name" => name (patch),
    "DefaultRunnerID" => default_runner_id (patch),
    "DefaultGithubConnectionID" => default_github_connection_id (patch),
});

#[derive(Debug, Clone, Default)]
pub struct DeleteTenantRequest {
    pub tenant_id: String,
    pub version: u64,
}

#[derive(Debug, Clone, Default)]
pub struct ListTenantsRequest {
    pub max_results: Option<u64>,
    pub token: Option<String>,
    pub include_deleted: bool,
}

/// Short names are registered with compare-and-swap on the tenant version.
#[derive(Debug, Clone, Default)]
pub struct TenantShortNameRequest {
    pub tenant_id: String,
    pub short_name: String,
    pub version: u64,
}

impl Client {
    fn create_tenant_request(
        &self,
        req: &CreateTenantRequest,
    ) -> Result<reqwest::Request, Error> {
        require(&req.tenant_id, TENANT_ID_REQUIRED)?;
        let url = self.url().push("tenants").push(&req.tenant_id).finish();
        let parts = RequestParts::new(Method::PUT, url)
            .json(req)?
            .feature_flags(&req.feature_flags);
        self.build_request(parts)
    }

    pub async fn create_tenant(&self, req: &CreateTenantRequest) -> Result<Tenant, Error> {
        let request = self.create_tenant_request(req)?;
        self.expect_json(request, StatusCode::CREATED).await
    }

    fn get_tenant_request(&self, req: &GetTenantRequest) -> Result<reqwest::Request, Error> {
        require(&req.tenant_id, TENANT_ID_REQUIRED)?;
        let url = self
            .url()
            .push("tenants")
            .push(&req.tenant_id)
            .query_flag("includeDeleted", req.include_deleted)
            .finish();
        self.build_request(RequestParts::new(Method::GET, url))
    }

    pub async fn get_tenant(&self, req: &GetTenantRequest) -> Result<Tenant, Error> {
        let request = self.get_tenant_request(req)?;
        self.expect_json(request, StatusCode::OK).await
    }

    fn update_tenant_request(
        &self,
        req: &UpdateTenantRequest,
    ) -> Result<reqwest::Request, Error> {
        require(&req.tenant_id, TENANT_ID_REQUIRED)?;
        let url = self.url().push("tenants").push(&req.tenant_id).finish();
        let parts = RequestParts::new(Method::PATCH, url)
            .json(req)?
            .if_match(req.version)
            .feature_flags(&req.feature_flags);
        self.build_request(parts)
    }

    pub async fn update_tenant(&self, req: &UpdateTenantRequest) -> Result<Tenant, Error> {
        let request = self.update_tenant_request(req)?;
        self.expect_json(request, StatusCode::OK).await
    }

    fn delete_tenant_request(
        &self,
        req: &DeleteTenantRequest,
    ) -> Result<reqwest::Request, Error> {
        require(&req.tenant_id, TENANT_ID_REQUIRED)?;
        let url = self.url().push("tenants").push(&req.tenant_id).finish();
        let parts = RequestParts::new(Method::DELETE, url).if_match(req.version);
        self.build_request(parts)
    }

    /// Soft delete; the tenant stays readable with `include_deleted`.
    pub async fn delete_tenant(&self, req: &DeleteTenantRequest) -> Result<(), Error> {
        let request = self.delete_tenant_request(req)?;
        self.expect_no_content(request).await
    }

    fn list_tenants_request(&self, req: &ListTenantsRequest) -> Result<reqwest::Request, Error> {
        let url = self
            .url()
            .push("tenants")
            .query_u64_opt("maxResults", req.max_results)
            .query_opt("token", req.token.as_deref())
            .query_flag("includeDeleted", req.include_deleted)
            .finish();
        self.build_request(RequestParts::new(Method::GET, url))
    }

    pub async fn list_tenants(&self, req: &ListTenantsRequest) -> Result<Page<Tenant>, Error> {
        let request = self.list_tenants_request(req)?;
        self.expect_json(request, StatusCode::OK).await
    }

    fn add_tenant_short_name_request(
        &self,
        req: &TenantShortNameRequest,
    ) -> Result<reqwest::Request, Error> {
        require(&req.tenant_id, TENANT_ID_REQUIRED)?;
        require(&req.short_name, "short name is required")?;
        let url = self
            .url()
            .push("tenants")
            .push(&req.tenant_id)
            .push("short-names")
            .push(&req.short_name)
            .finish();
        let parts = RequestParts::new(Method::PUT, url).if_match(req.version);
        self.build_request(parts)
    }

    pub async fn add_tenant_short_name(
        &self,
        req: &TenantShortNameRequest,
    ) -> Result<Tenant, Error> {
        let request = self.add_tenant_short_name_request(req)?;
        self.expect_json(request, StatusCode::CREATED).await
    }

    fn remove_tenant_short_name_request(
        &self,
        req: &TenantShortNameRequest,
    ) -> Result<reqwest::Request, Error> {
        require(&req.tenant_id, TENANT_ID_REQUIRED)?;
        require(&req.short_name, "short name is required")?;
        let url = self
            .url()
            .push("tenants")
            .push(&req.tenant_id)
            .push("short-names")
            .push(&req.short_name)
            .finish();
        let parts = RequestParts::new(Method::DELETE, url).if_match(req.version);
        self.build_request(parts)
    }

    pub async fn remove_tenant_short_name(
        &self,
        req: &TenantShortNameRequest,
    ) -> Result<Tenant, Error> {
        let request = self.remove_tenant_short_name_request(req)?;
        self.expect_json(request, StatusCode::OK).await
    }
}
