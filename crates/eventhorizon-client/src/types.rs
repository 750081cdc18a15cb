//! Entity schemas for the control-plane API.
//!
//! Wire names are PascalCase with Go-style ID casing (`TenantID`), so every
//! field carries an explicit rename. All mutable entities are versioned for
//! optimistic concurrency; soft-deleted entities carry `DeletedAt`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::Error;

/// Sentinel serialized in place of an unset `RunnerId`/`GithubConnectionId`
/// on an [`Environment`].
pub const DEFAULT_ID: &str = "default";

/// Per-request feature-flag overrides, sent as a compact JSON object in the
/// `X-EventHorizon-FeatureFlags` header. A `BTreeMap` keeps the header
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureFlags(pub BTreeMap<String, bool>);

impl FeatureFlags {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn set(mut self, name: impl Into<String>, enabled: bool) -> Self {
        self.0.insert(name.into(), enabled);
        self
    }

    /// Compact JSON header encoding, e.g. `{"fast-turns":true}`.
    pub fn header_value(&self) -> Result<String, Error> {
        serde_json::to_string(&self.0).map_err(Error::decode)
    }
}

/// Paginated list envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(rename = "Items", default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(rename = "NextToken", default, skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tenant {
    #[serde(rename = "TenantID")]
    pub tenant_id: String,
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "ShortNames", default, skip_serializing_if = "Vec::is_empty")]
    pub short_names: Vec<String>,
    #[serde(
        rename = "DefaultRunnerID",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub default_runner_id: Option<String>,
    #[serde(
        rename = "DefaultGithubConnectionID",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub default_github_connection_id: Option<String>,
    #[serde(rename = "Version", default)]
    pub version: u64,
    #[serde(rename = "CreatedAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "UpdatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(rename = "DeletedAt", default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// A declarative execution-context definition.
///
/// `runner_id` and `github_connection_id` are logically nullable but never
/// unset in memory: absent or `null` input normalizes to `"default"`, and
/// the sentinel serializes back as the literal string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    #[serde(rename = "TenantID")]
    pub tenant_id: String,
    #[serde(rename = "EnvironmentID")]
    pub environment_id: String,
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(
        rename = "RunnerId",
        default = "default_id",
        deserialize_with = "normalize_default_id"
    )]
    pub runner_id: String,
    #[serde(
        rename = "GithubConnectionId",
        default = "default_id",
        deserialize_with = "normalize_default_id"
    )]
    pub github_connection_id: String,
    #[serde(rename = "RepoUrl", default, skip_serializing_if = "Option::is_none")]
    pub repo_url: Option<String>,
    #[serde(rename = "Branch", default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(rename = "Version", default)]
    pub version: u64,
    #[serde(rename = "CreatedAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "UpdatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(rename = "DeletedAt", default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

fn default_id() -> String {
    DEFAULT_ID.to_string()
}

fn normalize_default_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(default_id))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Runner {
    #[serde(rename = "TenantID")]
    pub tenant_id: String,
    #[serde(rename = "RunnerID")]
    pub runner_id: String,
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "Private", default)]
    pub private: bool,
    #[serde(rename = "Version", default)]
    pub version: u64,
    #[serde(rename = "CreatedAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "UpdatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(rename = "DeletedAt", default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// A named message queue owned by a runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunnerQueue {
    #[serde(rename = "TenantID")]
    pub tenant_id: String,
    #[serde(rename = "RunnerID")]
    pub runner_id: String,
    #[serde(rename = "QueueID")]
    pub queue_id: String,
    #[serde(rename = "PublicKey", default)]
    pub public_key: String,
    #[serde(rename = "Healthy", default)]
    pub healthy: bool,
    #[serde(rename = "Draining", default)]
    pub draining: bool,
    #[serde(
        rename = "LastHeartbeatAt",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub last_heartbeat_at: Option<DateTime<Utc>>,
    #[serde(rename = "Version", default)]
    pub version: u64,
    #[serde(rename = "CreatedAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "UpdatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(rename = "DeletedAt", default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Metadata for a runner credential. Revocation is its own lifecycle step,
/// distinct from soft-delete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunnerTokenMetadata {
    #[serde(rename = "TenantID")]
    pub tenant_id: String,
    #[serde(rename = "RunnerID")]
    pub runner_id: String,
    #[serde(rename = "TokenID")]
    pub token_id: String,
    #[serde(rename = "SignatureHash", default)]
    pub signature_hash: String,
    #[serde(rename = "CreatedAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "ExpiresAt", default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(rename = "RevokedAt", default, skip_serializing_if = "Option::is_none")]
    pub revoked_at: Option<DateTime<Utc>>,
    #[serde(rename = "Version", default)]
    pub version: u64,
    #[serde(rename = "DeletedAt", default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GithubConnection {
    #[serde(rename = "TenantID")]
    pub tenant_id: String,
    #[serde(rename = "ConnectionID")]
    pub connection_id: String,
    #[serde(rename = "InstallationID", default)]
    pub installation_id: i64,
    #[serde(rename = "Org", default)]
    pub org: String,
    #[serde(rename = "Version", default)]
    pub version: u64,
    #[serde(rename = "CreatedAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "UpdatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(rename = "DeletedAt", default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Service-wide feature flag definition. Per-request overrides travel in the
/// `X-EventHorizon-FeatureFlags` header instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureFlag {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Enabled", default)]
    pub enabled: bool,
    #[serde(rename = "Description", default)]
    pub description: String,
    #[serde(rename = "Version", default)]
    pub version: u64,
    #[serde(rename = "CreatedAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "UpdatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(rename = "DeletedAt", default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workstream {
    #[serde(rename = "TenantID")]
    pub tenant_id: String,
    #[serde(rename = "WorkstreamID")]
    pub workstream_id: String,
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "Version", default)]
    pub version: u64,
    #[serde(rename = "CreatedAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "UpdatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(rename = "DeletedAt", default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    #[serde(rename = "TenantID")]
    pub tenant_id: String,
    #[serde(rename = "TaskID")]
    pub task_id: String,
    #[serde(
        rename = "WorkstreamID",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub workstream_id: Option<String>,
    #[serde(rename = "Title", default)]
    pub title: String,
    #[serde(rename = "State", default)]
    pub state: String,
    #[serde(rename = "Version", default)]
    pub version: u64,
    #[serde(rename = "CreatedAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "UpdatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(rename = "DeletedAt", default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// One attempt at a task. `turn_index` increases monotonically per task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    #[serde(rename = "TenantID")]
    pub tenant_id: String,
    #[serde(rename = "TaskID")]
    pub task_id: String,
    #[serde(rename = "TurnIndex")]
    pub turn_index: u64,
    #[serde(rename = "State", default)]
    pub state: String,
    #[serde(
        rename = "EnvironmentID",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub environment_id: Option<String>,
    #[serde(rename = "Version", default)]
    pub version: u64,
    #[serde(rename = "CreatedAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "UpdatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(rename = "DeletedAt", default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// A single timestamped log line produced during a turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    #[serde(rename = "Timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "Message")]
    pub message: String,
}

impl Default for LogRecord {
    fn default() -> Self {
        Self {
            timestamp: DateTime::UNIX_EPOCH,
            message: String::new(),
        }
    }
}

impl LogRecord {
    pub fn new(timestamp: DateTime<Utc>, message: impl Into<String>) -> Self {
        Self {
            timestamp,
            message: message.into(),
        }
    }
}
