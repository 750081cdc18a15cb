//! Authorization policy data model.
//!
//! Policies carry their actions and principal token types as string lists on
//! the wire. On deserialization each list is compiled into a fixed-width bit
//! vector (128-bit for actions, 64-bit for token types) for fast matching on
//! the server side; the compiled form is transient and never serialized.
//!
//! Bit indexes are assigned by declaration order and are part of the wire
//! contract: new actions are appended, never reordered.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::bits::Bits128;

/// Wildcard list entry: compiles to an all-ones vector.
pub const WILDCARD: &str = "*";

macro_rules! closed_enum {
    ($(#[$meta:meta])* $name:ident { $( $variant:ident ),* $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $( $variant ),*
        }

        impl $name {
            /// Every variant in declaration (= bit index) order.
            pub const ALL: &'static [$name] = &[$( $name::$variant ),*];

            pub fn as_str(self) -> &'static str {
                match self {
                    $( $name::$variant => stringify!($variant) ),*
                }
            }

            pub fn parse(name: &str) -> Option<$name> {
                match name {
                    $( stringify!($variant) => Some($name::$variant), )*
                    _ => None,
                }
            }

            /// Stable bit index assigned by declaration order.
            pub fn bit_index(self) -> u32 {
                self as u32
            }
        }
    };
}

closed_enum!(
    /// Every operation the control plane authorizes. Declaration order is
    /// the wire bit assignment: the first 64 variants occupy the low word,
    /// the rest the high word.
    Action {
        CreateTenant,
        GetTenant,
        UpdateTenant,
        DeleteTenant,
        ListTenants,
        CreateEnvironment,
        GetEnvironment,
        UpdateEnvironment,
        DeleteEnvironment,
        ListEnvironments,
        CreateRunner,
        GetRunner,
        UpdateRunner,
        DeleteRunner,
        ListRunners,
        RegisterRunnerQueue,
        GetRunnerQueue,
        UpdateRunnerQueue,
        DeleteRunnerQueue,
        ListRunnerQueues,
        SendRunnerMessage,
        ReceiveRunnerMessages,
        RespondRunnerMessage,
        DeleteRunnerMessage,
        CreateRunnerToken,
        GetRunnerToken,
        ListRunnerTokens,
        RevokeRunnerToken,
        DeleteRunnerToken,
        CreateGithubConnection,
        GetGithubConnection,
        UpdateGithubConnection,
        DeleteGithubConnection,
        ListGithubConnections,
        CreateWorkstream,
        GetWorkstream,
        UpdateWorkstream,
        DeleteWorkstream,
        ListWorkstreams,
        MoveWorkstreamTask,
        CreateTask,
        GetTask,
        UpdateTask,
        DeleteTask,
        ListTasks,
        CreateTurn,
        GetTurn,
        UpdateTurn,
        ListTurns,
        GetLastTurn,
        AppendTurnLogs,
        StreamTurnLogs,
        ListTurnLogs,
        CreatePolicy,
        GetPolicy,
        UpdatePolicy,
        DeletePolicy,
        ListPolicies,
        CreateFeatureFlag,
        GetFeatureFlag,
        UpdateFeatureFlag,
        DeleteFeatureFlag,
        ListFeatureFlags,
        AddTenantShortName,
        RemoveTenantShortName,
        GetTenantByShortName,
        ListWorkstreamTasks,
        CancelTurn,
    }
);

// Bit assignment beyond 128 actions is undefined; appending past the limit
// must fail loudly at compile time.
const _: () = assert!(Action::ALL.len() <= 128);

closed_enum!(
    /// Principal token types, compiled into a 64-bit vector.
    TokenType {
        User,
        Runner,
        Service,
    }
);

/// Compiles an action list into its 128-bit vector. `"*"` yields all-ones;
/// unknown names are ignored so older clients keep working against newer
/// servers.
pub fn compile_actions<S: AsRef<str>>(actions: &[S]) -> Bits128 {
    let mut bits = Bits128::ZERO;
    for action in actions {
        let action = action.as_ref();
        if action == WILDCARD {
            return Bits128::ALL;
        }
        if let Some(known) = Action::parse(action) {
            bits.set(known.bit_index());
        }
    }
    bits
}

/// Reverses [`compile_actions`]. A fully-set vector decodes to `["*"]` and
/// nothing else; otherwise bits are walked low-to-high, emitting each known
/// enumerant.
pub fn decode_actions(bits: Bits128) -> Vec<String> {
    if bits.is_all_ones() {
        return vec![WILDCARD.to_string()];
    }
    let mut actions = Vec::new();
    for index in 0..128 {
        if bits.is_set(index)
            && let Some(action) = Action::ALL.get(index as usize)
        {
            actions.push(action.as_str().to_string());
        }
    }
    actions
}

/// Compiles a token-type list into its 64-bit vector; same wildcard and
/// unknown-name rules as [`compile_actions`].
pub fn compile_token_types<S: AsRef<str>>(token_types: &[S]) -> u64 {
    let mut bits = 0u64;
    for token_type in token_types {
        let token_type = token_type.as_ref();
        if token_type == WILDCARD {
            return u64::MAX;
        }
        if let Some(known) = TokenType::parse(token_type) {
            bits |= 1 << known.bit_index();
        }
    }
    bits
}

/// Reverses [`compile_token_types`].
pub fn decode_token_types(bits: u64) -> Vec<String> {
    if bits == u64::MAX {
        return vec![WILDCARD.to_string()];
    }
    let mut token_types = Vec::new();
    for index in 0..64u32 {
        if bits & (1 << index) != 0
            && let Some(token_type) = TokenType::ALL.get(index as usize)
        {
            token_types.push(token_type.as_str().to_string());
        }
    }
    token_types
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    Allow,
    Deny,
}

/// A typed principal plus the token types it may present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "PolicyPrincipalWire")]
pub struct PolicyPrincipal {
    #[serde(rename = "PrincipalID")]
    pub principal_id: String,
    #[serde(rename = "TokenTypes")]
    pub token_types: Vec<String>,
    /// Compiled from `token_types` on deserialization; never serialized.
    #[serde(skip_serializing)]
    pub token_type_bits: u64,
}

#[derive(Deserialize)]
struct PolicyPrincipalWire {
    #[serde(rename = "PrincipalID")]
    principal_id: String,
    #[serde(rename = "TokenTypes", default)]
    token_types: Vec<String>,
}

impl From<PolicyPrincipalWire> for PolicyPrincipal {
    fn from(wire: PolicyPrincipalWire) -> Self {
        let token_type_bits = compile_token_types(&wire.token_types);
        Self {
            principal_id: wire.principal_id,
            token_types: wire.token_types,
            token_type_bits,
        }
    }
}

impl PolicyPrincipal {
    pub fn new(principal_id: impl Into<String>, token_types: &[TokenType]) -> Self {
        let token_types: Vec<String> = token_types
            .iter()
            .map(|token_type| token_type.as_str().to_string())
            .collect();
        let token_type_bits = compile_token_types(&token_types);
        Self {
            principal_id: principal_id.into(),
            token_types,
            token_type_bits,
        }
    }
}

/// An authorization policy. `actions` and `delegated_actions` keep the wire
/// list form; the `*_bits` fields hold the compiled vectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "PolicyWire")]
pub struct Policy {
    #[serde(rename = "PolicyID")]
    pub policy_id: String,
    #[serde(rename = "Effect")]
    pub effect: Effect,
    #[serde(rename = "Tenant", skip_serializing_if = "Option::is_none")]
    pub tenant: Option<String>,
    #[serde(rename = "Principal")]
    pub principal: PolicyPrincipal,
    #[serde(rename = "Actions")]
    pub actions: Vec<String>,
    #[serde(rename = "DelegatedActions")]
    pub delegated_actions: Vec<String>,
    #[serde(rename = "DelegatedPrincipal", skip_serializing_if = "Option::is_none")]
    pub delegated_principal: Option<PolicyPrincipal>,
    #[serde(rename = "Constraints", skip_serializing_if = "serde_json::Value::is_null")]
    pub constraints: serde_json::Value,
    #[serde(rename = "Version")]
    pub version: u64,
    #[serde(rename = "CreatedAt", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "UpdatedAt", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(rename = "DeletedAt", skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing)]
    pub action_bits: Bits128,
    #[serde(skip_serializing)]
    pub delegated_action_bits: Bits128,
}

#[derive(Deserialize)]
struct PolicyWire {
    #[serde(rename = "PolicyID")]
    policy_id: String,
    #[serde(rename = "Effect")]
    effect: Effect,
    #[serde(rename = "Tenant", default)]
    tenant: Option<String>,
    #[serde(rename = "Principal")]
    principal: PolicyPrincipal,
    #[serde(rename = "Actions", default)]
    actions: Vec<String>,
    #[serde(rename = "DelegatedActions", default)]
    delegated_actions: Vec<String>,
    #[serde(rename = "DelegatedPrincipal", default)]
    delegated_principal: Option<PolicyPrincipal>,
    #[serde(rename = "Constraints", default)]
    constraints: serde_json::Value,
    #[serde(rename = "Version", default)]
    version: u64,
    #[serde(rename = "CreatedAt", default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(rename = "UpdatedAt", default)]
    updated_at: Option<DateTime<Utc>>,
    #[serde(rename = "DeletedAt", default)]
    deleted_at: Option<DateTime<Utc>>,
}

impl From<PolicyWire> for Policy {
    fn from(wire: PolicyWire) -> Self {
        let action_bits = compile_actions(&wire.actions);
        let delegated_action_bits = compile_actions(&wire.delegated_actions);
        Self {
            policy_id: wire.policy_id,
            effect: wire.effect,
            tenant: wire.tenant,
            principal: wire.principal,
            actions: wire.actions,
            delegated_actions: wire.delegated_actions,
            delegated_principal: wire.delegated_principal,
            constraints: wire.constraints,
            version: wire.version,
            created_at: wire.created_at,
            updated_at: wire.updated_at,
            deleted_at: wire.deleted_at,
            action_bits,
            delegated_action_bits,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn bit_indexes_follow_declaration_order() {
        assert_eq!(Action::CreateTenant.bit_index(), 0);
        assert_eq!(Action::GetTenant.bit_index(), 1);
        assert_eq!(Action::UpdateTenant.bit_index(), 2);
        // Past 64 actions the assignment spills into the high word.
        assert!(Action::ALL.len() > 64);
        assert_eq!(Action::AddTenantShortName.bit_index(), 63);
        assert_eq!(Action::RemoveTenantShortName.bit_index(), 64);
        let bits = compile_actions(&["RemoveTenantShortName"]);
        assert_eq!(bits.lo, 0);
        assert_eq!(bits.hi, 1);
    }

    #[test]
    fn compile_then_decode_preserves_declaration_order() {
        let actions = vec!["GetTenant".to_string(), "UpdateTask".to_string()];
        let bits = compile_actions(&actions);
        assert_eq!(decode_actions(bits), actions);

        // Input order does not matter; output is declaration order.
        let reversed = vec!["UpdateTask".to_string(), "GetTenant".to_string()];
        assert_eq!(decode_actions(compile_actions(&reversed)), actions);
    }

    #[test]
    fn wildcard_compiles_to_all_ones_and_back() {
        let bits = compile_actions(&[WILDCARD]);
        assert!(bits.is_all_ones());
        assert_eq!(decode_actions(bits), vec![WILDCARD.to_string()]);

        // Wildcard mixed with named actions still saturates.
        let bits = compile_actions(&["GetTenant", WILDCARD]);
        assert!(bits.is_all_ones());

        assert_eq!(compile_token_types(&[WILDCARD]), u64::MAX);
        assert_eq!(decode_token_types(u64::MAX), vec![WILDCARD.to_string()]);
    }

    #[test]
    fn unknown_names_are_ignored() {
        let bits = compile_actions(&["GetTenant", "LaunchMissiles"]);
        assert_eq!(decode_actions(bits), vec!["GetTenant".to_string()]);
        assert_eq!(compile_token_types(&["Hologram"]), 0);
    }

    #[test]
    fn compile_decode_compile_is_idempotent() {
        let inputs: Vec<Vec<String>> = vec![
            vec![],
            vec!["GetTenant".into()],
            vec!["UpdateTask".into(), "GetTenant".into(), "CancelTurn".into()],
            vec![WILDCARD.into()],
        ];
        for input in inputs {
            let compiled = compile_actions(&input);
            assert_eq!(compile_actions(&decode_actions(compiled)), compiled);
        }
        for bits in [0u64, 0b101, u64::MAX] {
            let names = decode_token_types(bits);
            assert_eq!(compile_token_types(&names), bits);
        }
    }

    #[test]
    fn decode_skips_bits_without_entries() {
        // A newer server may set bits this client has no enumerant for.
        let mut bits = compile_actions(&["GetTenant"]);
        bits.set(120);
        assert_eq!(decode_actions(bits), vec!["GetTenant".to_string()]);
    }

    #[test]
    fn policy_deserialization_compiles_transient_bits() {
        let json = r#"{
            "PolicyID": "p-1",
            "Effect": "Allow",
            "Tenant": "tenant-1",
            "Principal": {"PrincipalID": "user/alice", "TokenTypes": ["User", "Service"]},
            "Actions": ["GetTenant", "UpdateTask"],
            "DelegatedActions": ["*"],
            "Version": 2
        }"#;
        let policy: Policy = serde_json::from_str(json).unwrap();
        assert_eq!(policy.effect, Effect::Allow);
        assert_eq!(
            policy.action_bits,
            compile_actions(&["GetTenant", "UpdateTask"])
        );
        assert!(policy.delegated_action_bits.is_all_ones());
        assert_eq!(policy.principal.token_type_bits, 0b101);

        // Serialization uses the list form and drops the compiled vectors.
        let value = serde_json::to_value(&policy).unwrap();
        assert_eq!(value["Actions"], serde_json::json!(["GetTenant", "UpdateTask"]));
        assert!(value.get("action_bits").is_none());
        assert!(value.get("token_type_bits").is_none());
        assert!(value["Principal"].get("token_type_bits").is_none());
    }

    #[test]
    fn principal_constructor_compiles_bits() {
        let principal = PolicyPrincipal::new("runner/r1", &[TokenType::Runner]);
        assert_eq!(principal.token_types, vec!["Runner".to_string()]);
        assert_eq!(principal.token_type_bits, 0b10);
    }
}
