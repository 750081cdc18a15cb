//! Error taxonomy and response decoding.
//!
//! Local validation failures never reach the network. Non-2xx responses are
//! decoded into [`Error::Service`], except `409 Conflict` which carries the
//! server's authoritative current entity as a closed polymorphic variant.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::policy::Policy;
use crate::types::{
    Environment, GithubConnection, Runner, RunnerQueue, RunnerTokenMetadata, Task, Tenant, Turn,
    Workstream,
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Rejected locally before any HTTP call.
    #[error("{message}")]
    Validation { message: String },

    /// Decoded from a non-2xx, non-409 response.
    #[error("service error {response_code} ({error_type}): {message}")]
    Service {
        response_code: u16,
        message: String,
        error_type: String,
    },

    /// Decoded from `409 Conflict`; `current` is the server's current
    /// version of the contested entity.
    #[error("conflict ({error_type}): {message}")]
    Conflict {
        response_code: u16,
        message: String,
        error_type: String,
        current: CurrentObject,
    },

    /// Propagated from the underlying transport, undecoded.
    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    /// A response body did not parse as the expected shape.
    #[error("decode failed: {message}")]
    Decode { message: String },

    /// The client's cancellation token fired while the call was in flight.
    #[error("request cancelled")]
    Cancelled,
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation {
            message: message.into(),
        }
    }

    pub fn decode(message: impl ToString) -> Self {
        Error::Decode {
            message: message.to_string(),
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict { .. })
    }
}

/// Discriminator naming each entity variant that may appear in a conflict's
/// `Current` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectType {
    Tenant,
    Environment,
    Runner,
    RunnerQueue,
    RunnerToken,
    GithubConnection,
    Workstream,
    Task,
    Turn,
    Policy,
}

/// The polymorphic current object embedded in a conflict payload. Decoding
/// is strict: an unknown `ObjectType` tag is a decode failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "ObjectType")]
pub enum CurrentObject {
    Tenant(Tenant),
    Environment(Environment),
    Runner(Runner),
    RunnerQueue(RunnerQueue),
    RunnerToken(RunnerTokenMetadata),
    GithubConnection(GithubConnection),
    Workstream(Workstream),
    Task(Task),
    Turn(Turn),
    Policy(Policy),
}

impl CurrentObject {
    pub fn object_type(&self) -> ObjectType {
        match self {
            CurrentObject::Tenant(_) => ObjectType::Tenant,
            CurrentObject::Environment(_) => ObjectType::Environment,
            CurrentObject::Runner(_) => ObjectType::Runner,
            CurrentObject::RunnerQueue(_) => ObjectType::RunnerQueue,
            CurrentObject::RunnerToken(_) => ObjectType::RunnerToken,
            CurrentObject::GithubConnection(_) => ObjectType::GithubConnection,
            CurrentObject::Workstream(_) => ObjectType::Workstream,
            CurrentObject::Task(_) => ObjectType::Task,
            CurrentObject::Turn(_) => ObjectType::Turn,
            CurrentObject::Policy(_) => ObjectType::Policy,
        }
    }

    pub fn as_tenant(&self) -> Option<&Tenant> {
        match self {
            CurrentObject::Tenant(tenant) => Some(tenant),
            _ => None,
        }
    }

    pub fn as_environment(&self) -> Option<&Environment> {
        match self {
            CurrentObject::Environment(environment) => Some(environment),
            _ => None,
        }
    }

    pub fn as_runner(&self) -> Option<&Runner> {
        match self {
            CurrentObject::Runner(runner) => Some(runner),
            _ => None,
        }
    }

    pub fn as_runner_queue(&self) -> Option<&RunnerQueue> {
        match self {
            CurrentObject::RunnerQueue(queue) => Some(queue),
            _ => None,
        }
    }

    pub fn as_runner_token(&self) -> Option<&RunnerTokenMetadata> {
        match self {
            CurrentObject::RunnerToken(token) => Some(token),
            _ => None,
        }
    }

    pub fn as_github_connection(&self) -> Option<&GithubConnection> {
        match self {
            CurrentObject::GithubConnection(connection) => Some(connection),
            _ => None,
        }
    }

    pub fn as_workstream(&self) -> Option<&Workstream> {
        match self {
            CurrentObject::Workstream(workstream) => Some(workstream),
            _ => None,
        }
    }

    pub fn as_task(&self) -> Option<&Task> {
        match self {
            CurrentObject::Task(task) => Some(task),
            _ => None,
        }
    }

    pub fn as_turn(&self) -> Option<&Turn> {
        match self {
            CurrentObject::Turn(turn) => Some(turn),
            _ => None,
        }
    }

    pub fn as_policy(&self) -> Option<&Policy> {
        match self {
            CurrentObject::Policy(policy) => Some(policy),
            _ => None,
        }
    }
}

#[derive(Deserialize)]
struct ServiceErrorBody {
    #[serde(rename = "ResponseCode", default)]
    response_code: u16,
    #[serde(rename = "Message", default)]
    message: String,
    #[serde(rename = "ErrorType", default)]
    error_type: String,
}

#[derive(Deserialize)]
struct ConflictErrorBody {
    #[serde(rename = "ResponseCode", default)]
    response_code: u16,
    #[serde(rename = "Message", default)]
    message: String,
    #[serde(rename = "ErrorType", default)]
    error_type: String,
    #[serde(rename = "Current")]
    current: CurrentObject,
}

/// Decodes a non-2xx response body into the typed error. A malformed
/// conflict payload is a decode failure; a malformed service payload
/// degrades to a [`Error::Service`] carrying the raw body as message.
pub fn decode_error(status: StatusCode, body: &[u8]) -> Error {
    if status == StatusCode::CONFLICT {
        return match serde_json::from_slice::<ConflictErrorBody>(body) {
            Ok(decoded) => Error::Conflict {
                response_code: if decoded.response_code == 0 {
                    status.as_u16()
                } else {
                    decoded.response_code
                },
                message: decoded.message,
                error_type: decoded.error_type,
                current: decoded.current,
            },
            Err(error) => Error::decode(error),
        };
    }

    match serde_json::from_slice::<ServiceErrorBody>(body) {
        Ok(decoded) => Error::Service {
            response_code: if decoded.response_code == 0 {
                status.as_u16()
            } else {
                decoded.response_code
            },
            message: decoded.message,
            error_type: decoded.error_type,
        },
        Err(_) => Error::Service {
            response_code: status.as_u16(),
            message: String::from_utf8_lossy(body).trim().to_string(),
            error_type: String::new(),
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::types::DEFAULT_ID;

    #[test]
    fn service_error_decodes_typed_payload() {
        let body = br#"{"ResponseCode":400,"Message":"bad input","ErrorType":"Validation"}"#;
        let error = decode_error(StatusCode::BAD_REQUEST, body);
        match error {
            Error::Service {
                response_code,
                message,
                error_type,
            } => {
                assert_eq!(response_code, 400);
                assert_eq!(message, "bad input");
                assert_eq!(error_type, "Validation");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn unparseable_service_body_degrades_to_raw_message() {
        let error = decode_error(StatusCode::FORBIDDEN, b"access denied\n");
        match error {
            Error::Service {
                response_code,
                message,
                error_type,
            } => {
                assert_eq!(response_code, 403);
                assert_eq!(message, "access denied");
                assert!(error_type.is_empty());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn conflict_decodes_current_tenant() {
        let body = br#"{"ResponseCode":409,"Message":"exists","ErrorType":"Conflict","Current":{"ObjectType":"Tenant","TenantID":"abc"}}"#;
        let error = decode_error(StatusCode::CONFLICT, body);
        match error {
            Error::Conflict {
                response_code,
                message,
                error_type,
                current,
            } => {
                assert_eq!(response_code, 409);
                assert_eq!(message, "exists");
                assert_eq!(error_type, "Conflict");
                assert_eq!(current.object_type(), ObjectType::Tenant);
                assert_eq!(current.as_tenant().unwrap().tenant_id, "abc");
                assert!(current.as_environment().is_none());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn conflict_with_unknown_object_type_is_a_decode_failure() {
        let body = br#"{"ResponseCode":409,"Message":"exists","ErrorType":"Conflict","Current":{"ObjectType":"Comet","CometID":"x"}}"#;
        let error = decode_error(StatusCode::CONFLICT, body);
        assert!(matches!(error, Error::Decode { .. }));
    }

    #[test]
    fn conflict_without_current_is_a_decode_failure() {
        let body = br#"{"ResponseCode":409,"Message":"exists","ErrorType":"Conflict"}"#;
        let error = decode_error(StatusCode::CONFLICT, body);
        assert!(matches!(error, Error::Decode { .. }));
    }

    #[test]
    fn embedded_environment_is_normalized() {
        let body = br#"{"ResponseCode":409,"Message":"exists","ErrorType":"Conflict","Current":{"ObjectType":"Environment","TenantID":"t1","EnvironmentID":"e1","RunnerId":null}}"#;
        let error = decode_error(StatusCode::CONFLICT, body);
        match error {
            Error::Conflict { current, .. } => {
                let environment = current.as_environment().unwrap();
                assert_eq!(environment.runner_id, DEFAULT_ID);
                assert_eq!(environment.github_connection_id, DEFAULT_ID);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn conflict_current_round_trips() {
        let current = CurrentObject::Task(Task {
            tenant_id: "t1".to_string(),
            task_id: "task-9".to_string(),
            workstream_id: None,
            title: "title".to_string(),
            state: "running".to_string(),
            version: 4,
            created_at: None,
            updated_at: None,
            deleted_at: None,
        });
        let json = serde_json::to_value(&current).unwrap();
        assert_eq!(json["ObjectType"], "Task");
        let back: CurrentObject = serde_json::from_value(json).unwrap();
        assert_eq!(back, current);
    }
}
