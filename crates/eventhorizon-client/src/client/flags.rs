//! Feature-flag definition endpoints.

use reqwest::{Method, StatusCode};
use serde::Serialize;

use crate::client::{Client, RequestParts, require};
use crate::error::Error;
use crate::patch::{Patch, request_fields};
use crate::types::{FeatureFlag, Page};

pub(crate) const FLAG_NAME_REQUIRED: &str = "flag name is required";

#[derive(Debug, Clone, Default, Serialize)]
pub struct CreateFeatureFlagRequest {
    #[serde(skip)]
    pub name: String,
    #[serde(rename = "Enabled")]
    pub enabled: bool,
    #[serde(rename = "Description", skip_serializing_if = "String::is_empty")]
    pub description: String,
}

request_fields!(CreateFeatureFlagRequest {
    "Name" => name (required),
    "Enabled" => enabled (required),
    "Description" => description (required),
});

#[derive(Debug, Clone, Default)]
pub struct GetFeatureFlagRequest {
    pub name: String,
    pub include_deleted: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateFeatureFlagRequest {
    #[serde(skip)]
    pub name: String,
    #[serde(skip)]
    pub version: u64,
    #[serde(rename = "Enabled", skip_serializing_if = "Patch::is_absent")]
    pub enabled: Patch<bool>,
    #[serde(rename = "Description", skip_serializing_if = "Patch::is_absent")]
    pub description: Patch<String>,
}

request_fields!(UpdateFeatureFlagRequest {
    "Name" => name (required),
    "Enabled" => enabled (patch),
    "Description" => description (patch),
});

#[derive(Debug, Clone, Default)]
pub struct DeleteFeatureFlagRequest {
    pub name: String,
    pub version: u64,
}

#[derive(Debug, Clone, Default)]
pub struct ListFeatureFlagsRequest {
    pub max_results: Option<u64>,
    pub token: Option<String>,
    pub include_deleted: bool,
}

impl Client {
    fn create_feature_flag_request(
        &self,
        req: &CreateFeatureFlagRequest,
    ) -> Result<reqwest::Request, Error> {
        require(&req.name, FLAG_NAME_REQUIRED)?;
        let url = self.url().push("feature-flags").push(&req.name).finish();
        let parts = RequestParts::new(Method::PUT, url).json(req)?;
        self.build_request(parts)
    }

    pub async fn create_feature_flag(
        &self,
        req: &CreateFeatureFlagRequest,
    ) -> Result<FeatureFlag, Error> {
        let request = self.create_feature_flag_request(req)?;
        self.expect_json(request, StatusCode::CREATED).await
    }

    fn get_feature_flag_request(
        &self,
        req: &GetFeatureFlagRequest,
    ) -> Result<reqwest::Request, Error> {
        require(&req.name, FLAG_NAME_REQUIRED)?;
        let url = self
            .url()
            .push("feature-flags")
            .push(&req.name)
            .query_flag("includeDeleted", req.include_deleted)
            .finish();
        self.build_request(RequestParts::new(Method::GET, url))
    }

    pub async fn get_feature_flag(
        &self,
        req: &GetFeatureFlagRequest,
    ) -> Result<FeatureFlag, Error> {
        let request = self.get_feature_flag_request(req)?;
        self.expect_json(request, StatusCode::OK).await
    }

    fn update_feature_flag_request(
        &self,
        req: &UpdateFeatureFlagRequest,
    ) -> Result<reqwest::Request, Error> {
        require(&req.name, FLAG_NAME_REQUIRED)?;
        let url = self.url().push("feature-flags").push(&req.name).finish();
        let parts = RequestParts::new(Method::PATCH, url)
            .json(req)?
            .if_match(req.version);
        self.build_request(parts)
    }

    pub async fn update_feature_flag(
        &self,
        req: &UpdateFeatureFlagRequest,
    ) -> Result<FeatureFlag, Error> {
        let request = self.update_feature_flag_request(req)?;
        self.expect_json(request, StatusCode::OK).await
    }

    fn delete_feature_flag_request(
        &self,
        req: &DeleteFeatureFlagRequest,
    ) -> Result<reqwest::Request, Error> {
        require(&req.name, FLAG_NAME_REQUIRED)?;
        let url = self.url().push("feature-flags").push(&req.name).finish();
        let parts = RequestParts::new(Method::DELETE, url).if_match(req.version);
        self.build_request(parts)
    }

    pub async fn delete_feature_flag(&self, req: &DeleteFeatureFlagRequest) -> Result<(), Error> {
        let request = self.delete_feature_flag_request(req)?;
        self.expect_no_content(request).await
    }

    fn list_feature_flags_request(
        &self,
        req: &ListFeatureFlagsRequest,
    ) -> Result<reqwest::Request, Error> {
        let url = self
            .url()
            .push("feature-flags")
            .query_u64_opt("maxResults", req.max_results)
            .query_opt("token", req.token.as_deref())
            .query_flag("includeDeleted", req.include_deleted)
            .finish();
        self.build_request(RequestParts::new(Method::GET, url))
    }

    pub async fn list_feature_flags(
        &self,
        req: &ListFeatureFlagsRequest,
    ) -> Result<Page<FeatureFlag>, Error> {
        let request = self.list_feature_flags_request(req)?;
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
    fn flag_name_is_escaped_in_the_path() {
        let client = test_client();
        let req = CreateFeatureFlagRequest {
            name: "fast/turns".to_string(),
            enabled: true,
            description: String::new(),
        };
        let request = client.create_feature_flag_request(&req).unwrap();
        assert_eq!(request.method(), Method::PUT);
        assert_eq!(
            request.url().as_str(),
            "https://api.eventhorizon.example/v1/feature-flags/fast%2Fturns"
        );
        assert_eq!(body_string(&request), r#"{"Enabled":true}"#);
    }

    #[test]
    fn flag_name_is_required() {
        let client = test_client();
        let err = client
            .get_feature_flag_request(&GetFeatureFlagRequest::default())
            .unwrap_err();
        assert_eq!(err.to_string(), "flag name is required");
    }

    #[test]
    fn update_toggles_with_cas() {
        let client = test_client();
        let req = UpdateFeatureFlagRequest {
            name: "fast-turns".to_string(),
            version: 2,
            enabled: Patch::Value(false),
            description: Patch::Absent,
        };
        let request = client.update_feature_flag_request(&req).unwrap();
        assert_eq!(request.method(), Method::PATCH);
        assert_eq!(request.headers()[IF_MATCH], "2");
        assert_eq!(body_string(&request), r#"{"Enabled":false}"#);
    }

    #[test]
    fn listing_has_no_required_identifiers() {
        let client = test_client();
        let request = client
            .list_feature_flags_request(&ListFeatureFlagsRequest::default())
            .unwrap();
        assert_eq!(
            request.url().as_str(),
            "https://api.eventhorizon.example/v1/feature-flags"
        );
    }
}
