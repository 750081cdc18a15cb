//! Authorization policy endpoints.

use reqwest::{Method, StatusCode};
use serde::Serialize;

use crate::client::{Client, RequestParts, require};
use crate::error::Error;
use crate::patch::{Patch, request_fields};
use crate::policy::{Effect, Policy};
use crate::types::Page;

pub(crate) const POLICY_ID_REQUIRED: &str = "policy id is required";

/// The policy document is sent as-is; the server compiles its own bit
/// vectors from the list form.
#[derive(Debug, Clone, Serialize)]
pub struct PutPolicyRequest {
    #[serde(skip)]
    pub policy_id: String,
    #[serde(flatten)]
    pub policy: Policy,
}

request_fields!(PutPolicyRequest {
    "PolicyID" => policy_id (required),
    "Policy" => policy (required),
});

#[derive(Debug, Clone, Default)]
pub struct GetPolicyRequest {
    pub policy_id: String,
    pub include_deleted: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdatePolicyRequest {
    #[serde(skip)]
    pub policy_id: String,
    #[serde(skip)]
    pub version: u64,
    #[serde(rename = "Effect", skip_serializing_if = "Patch::is_absent")]
    pub effect: Patch<Effect>,
    #[serde(rename = "Actions", skip_serializing_if = "Patch::is_absent")]
    pub actions: Patch<Vec<String>>,
    #[serde(rename = "DelegatedActions", skip_serializing_if = "Patch::is_absent")]
    pub delegated_actions: Patch<Vec<String>>,
    #[serde(rename = "Constraints", skip_serializing_if = "Patch::is_absent")]
    pub constraints: Patch<serde_json::Value>,
}

request_fields!(UpdatePolicyRequest {
    "PolicyID" => policy_id (required),
    "Effect" => effect (patch),
    "Actions" => actions (patch),
    "DelegatedActions" => delegated_actions (patch),
    "Constraints" => constraints (patch),
});

#[derive(Debug, Clone, Default)]
pub struct DeletePolicyRequest {
    pub policy_id: String,
    pub version: u64,
}

#[derive(Debug, Clone, Default)]
pub struct ListPoliciesRequest {
    /// Restricts the listing to policies scoped to one tenant.
    pub tenant_id: Option<String>,
    pub max_results: Option<u64>,
    pub token: Option<String>,
    pub include_deleted: bool,
}

impl Client {
    fn put_policy_request(&self, req: &PutPolicyRequest) -> Result<reqwest::Request, Error> {
        require(&req.policy_id, POLICY_ID_REQUIRED)?;
        let url = self.url().push("policies").push(&req.policy_id).finish();
        let parts = RequestParts::new(Method::PUT, url).json(&req.policy)?;
        self.build_request(parts)
    }

    pub async fn put_policy(&self, req: &PutPolicyRequest) -> Result<Policy, Error> {
        let request = self.put_policy_request(req)?;
        self.expect_json(request, StatusCode::CREATED).await
    }

    fn get_policy_request(&self, req: &GetPolicyRequest) -> Result<reqwest::Request, Error> {
        require(&req.policy_id, POLICY_ID_REQUIRED)?;
        let url = self
            .url()
            .push("policies")
            .push(&req.policy_id)
            .query_flag("includeDeleted", req.include_deleted)
            .finish();
        self.build_request(RequestParts::new(Method::GET, url))
    }

    pub async fn get_policy(&self, req: &GetPolicyRequest) -> Result<Policy, Error> {
        let request = self.get_policy_request(req)?;
        self.expect_json(request, StatusCode::OK).await
    }

    fn update_policy_request(&self, req: &UpdatePolicyRequest) -> Result<reqwest::Request, Error> {
        require(&req.policy_id, POLICY_ID_REQUIRED)?;
        let url = self.url().push("policies").push(&req.policy_id).finish();
        let parts = RequestParts::new(Method::PATCH, url)
            .json(req)?
            .if_match(req.version);
        self.build_request(parts)
    }

    pub async fn update_policy(&self, req: &UpdatePolicyRequest) -> Result<Policy, Error> {
        let request = self.update_policy_request(req)?;
        self.expect_json(request, StatusCode::OK).await
    }

    fn delete_policy_request(&self, req: &DeletePolicyRequest) -> Result<reqwest::Request, Error> {
        require(&req.policy_id, POLICY_ID_REQUIRED)?;
        let url = self.url().push("policies").push(&req.policy_id).finish();
        let parts = RequestParts::new(Method::DELETE, url).if_match(req.version);
        self.build_request(parts)
    }

    pub async fn delete_policy(&self, req: &DeletePolicyRequest) -> Result<(), Error> {
        let request = self.delete_policy_request(req)?;
        self.expect_no_content(request).await
    }

    fn list_policies_request(&self, req: &ListPoliciesRequest) -> Result<reqwest::Request, Error> {
        let url = self
            .url()
            .push("policies")
            .query_opt("tenantID", req.tenant_id.as_deref())
            .query_u64_opt("maxResults", req.max_results)
            .query_opt("token", req.token.as_deref())
            .query_flag("includeDeleted", req.include_deleted)
            .finish();
        self.build_request(RequestParts::new(Method::GET, url))
    }

    pub async fn list_policies(&self, req: &ListPoliciesRequest) -> Result<Page<Policy>, Error> {
        let request = self.list_policies_request(req)?;
        self.expect_json(request, StatusCode::OK).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::client::tests::{body_string, test_client};
    use crate::policy::{Effect, PolicyPrincipal};
    use reqwest::header::IF_MATCH;

    fn sample_policy() -> Policy {
        Policy {
            policy_id: "p1".to_string(),
            effect: Effect::Allow,
            tenant: Some("t1".to_string()),
            principal: PolicyPrincipal {
                principal_id: "user-1".to_string(),
                token_types: vec!["User".to_string()],
                token_type_bits: 0,
            },
            actions: vec!["GetTenant".to_string()],
            delegated_actions: Vec::new(),
            delegated_principal: None,
            constraints: serde_json::Value::Null,
            version: 0,
            created_at: None,
            updated_at: None,
            deleted_at: None,
            action_bits: crate::bits::Bits128::ZERO,
            delegated_action_bits: crate::bits::Bits128::ZERO,
        }
    }

    #[test]
    fn put_policy_sends_the_list_form() {
        let client = test_client();
        let req = PutPolicyRequest {
            policy_id: "p1".to_string(),
            policy: sample_policy(),
        };
        let request = client.put_policy_request(&req).unwrap();
        assert_eq!(request.method(), Method::PUT);
        assert_eq!(
            request.url().as_str(),
            "https://api.eventhorizon.example/v1/policies/p1"
        );
        let body: serde_json::Value = serde_json::from_str(&body_string(&request)).unwrap();
        assert_eq!(body["Actions"], serde_json::json!(["GetTenant"]));
        // Compiled vectors never cross the wire.
        assert!(body.get("action_bits").is_none());
        assert!(body.get("token_type_bits").is_none());
    }

    #[test]
    fn policy_id_is_required() {
        let client = test_client();
        let err = client
            .get_policy_request(&GetPolicyRequest::default())
            .unwrap_err();
        assert_eq!(err.to_string(), "policy id is required");
    }

    #[test]
    fn update_policy_is_cas_patch() {
        let client = test_client();
        let req = UpdatePolicyRequest {
            policy_id: "p1".to_string(),
            version: 3,
            effect: Patch::Value(Effect::Deny),
            actions: Patch::Value(vec!["*".to_string()]),
            ..Default::default()
        };
        let request = client.update_policy_request(&req).unwrap();
        assert_eq!(request.method(), Method::PATCH);
        assert_eq!(request.headers()[IF_MATCH], "3");
        assert_eq!(
            body_string(&request),
            r#"{"Effect":"Deny","Actions":["*"]}"#
        );
    }

    #[test]
    fn delete_policy_is_a_cas_delete() {
        let client = test_client();
        let req = DeletePolicyRequest {
            policy_id: "p/1".to_string(),
            version: 6,
        };
        let request = client.delete_policy_request(&req).unwrap();
        assert_eq!(
            request.url().as_str(),
            "https://api.eventhorizon.example/v1/policies/p%2F1"
        );
        assert_eq!(request.headers()[IF_MATCH], "6");
    }

    #[test]
    fn listing_filters_by_tenant() {
        let client = test_client();
        let req = ListPoliciesRequest {
            tenant_id: Some("t1".to_string()),
            max_results: Some(50),
            ..Default::default()
        };
        let request = client.list_policies_request(&req).unwrap();
        assert_eq!(
            request.url().as_str(),
            "https://api.eventhorizon.example/v1/policies?tenantID=t1&maxResults=50"
        );
    }
}
