//! Three-state request fields for PATCH semantics.
//!
//! A [`Patch`] field distinguishes "leave unchanged" (absent from the JSON
//! body), "explicitly clear" (JSON `null`), and "set to this value". Request
//! types expose every field through [`RequestFields`] so harnesses can
//! inspect exactly what a request would send.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An update-request field that is absent, explicitly null, or set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Patch<T> {
    /// Field is omitted from the body; the server leaves it unchanged.
    #[default]
    Absent,
    /// Field serializes as JSON `null`.
    Null,
    /// Field serializes as its value.
    Value(T),
}

impl<T> Patch<T> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Patch::Absent)
    }

    /// The set value, if any. `Null` and `Absent` both report `None`.
    pub fn value(&self) -> Option<&T> {
        match self {
            Patch::Value(value) => Some(value),
            _ => None,
        }
    }
}

impl<T> From<Option<T>> for Patch<T> {
    /// `Some` maps to `Value`, `None` to an explicit `Null`. Use the
    /// `Default` (`Absent`) to leave a field out entirely.
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Patch::Value(value),
            None => Patch::Null,
        }
    }
}

impl<T: Serialize> Serialize for Patch<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            // Absent fields are skipped by the containing struct via
            // `skip_serializing_if`; reaching here still emits null.
            Patch::Absent | Patch::Null => serializer.serialize_none(),
            Patch::Value(value) => value.serialize(serializer),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(value) => Patch::Value(value),
            None => Patch::Null,
        })
    }
}

/// Field-lookup surface implemented by every request type.
///
/// `field` returns `Some(json value)` when the named field would be present
/// in the serialized request (explicit null included) and `None` when the
/// field is absent or unknown; `field_names` enumerates every field the
/// request has.
pub trait RequestFields {
    fn field_names(&self) -> &'static [&'static str];
    fn field(&self, name: &str) -> Option<serde_json::Value>;
}

/// Converts one request field into its introspection value.
pub trait FieldValue {
    fn field_value(&self) -> Option<serde_json::Value>;
}

impl<T: Serialize> FieldValue for Patch<T> {
    fn field_value(&self) -> Option<serde_json::Value> {
        match self {
            Patch::Absent => None,
            Patch::Null => Some(serde_json::Value::Null),
            Patch::Value(value) => serde_json::to_value(value).ok(),
        }
    }
}

/// Marker wrapper used by the `request_fields!` macro for required fields.
pub fn required_field<T: Serialize>(value: &T) -> Option<serde_json::Value> {
    serde_json::to_value(value).ok()
}

/// Optional (`Option`) fields report `None` when unset.
pub fn optional_field<T: Serialize>(value: &Option<T>) -> Option<serde_json::Value> {
    value
        .as_ref()
        .and_then(|value| serde_json::to_value(value).ok())
}

/// Deserializes `Option<T>` where a missing field and `null` both yield
/// `None`; used by response types paired with `#[serde(default)]`.
pub fn null_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Option::<T>::deserialize(deserializer)
}

/// Implements [`RequestFields`] for a request type. Each field is tagged
/// `required`, `optional` (an `Option`), or `patch` (a [`Patch`]).
macro_rules! request_fields {
    ($ty:ty { $( $name:literal => $field:ident ($kind:ident) ),* $(,)? }) => {
        impl $crate::patch::RequestFields for $ty {
            fn field_names(&self) -> &'static [&'static str] {
                &[$($name),*]
            }

            fn field(&self, name: &str) -> Option<serde_json::Value> {
                match name {
                    $( $name => $crate::patch::request_fields!(@get self, $field, $kind), )*
                    _ => None,
                }
            }
        }
    };
    (@get $self:ident, $field:ident, required) => {
        $crate::patch::required_field(&$self.$field)
    };
    (@get $self:ident, $field:ident, optional) => {
        $crate::patch::optional_field(&$self.$field)
    };
    (@get $self:ident, $field:ident, patch) => {
        $crate::patch::FieldValue::field_value(&$self.$field)
    };
}

pub(crate) use request_fields;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    struct Update {
        #[serde(rename = "Name")]
        name: String,
        #[serde(
            rename = "RunnerID",
            default,
            skip_serializing_if = "Patch::is_absent"
        )]
        runner_id: Patch<String>,
        #[serde(
            rename = "GithubConnectionID",
            default,
            skip_serializing_if = "Patch::is_absent"
        )]
        github_connection_id: Patch<String>,
    }

    request_fields!(Update {
        "Name" => name (required),
        "RunnerID" => runner_id (patch),
        "GithubConnectionID" => github_connection_id (patch),
    });

    #[test]
    fn absent_fields_are_omitted() {
        let update = Update {
            name: "env".to_string(),
            runner_id: Patch::Absent,
            github_connection_id: Patch::Absent,
        };
        let json = serde_json::to_string(&update).unwrap();
        assert_eq!(json, r#"{"Name":"env"}"#);
    }

    #[test]
    fn null_serializes_as_null_and_value_as_value() {
        let update = Update {
            name: "env".to_string(),
            runner_id: Patch::Value("runner-123".to_string()),
            github_connection_id: Patch::Null,
        };
        let json = serde_json::to_string(&update).unwrap();
        assert_eq!(
            json,
            r#"{"Name":"env","RunnerID":"runner-123","GithubConnectionID":null}"#
        );
    }

    #[test]
    fn deserialize_distinguishes_missing_from_null() {
        let update: Update =
            serde_json::from_str(r#"{"Name":"env","GithubConnectionID":null}"#).unwrap();
        assert_eq!(update.runner_id, Patch::Absent);
        assert_eq!(update.github_connection_id, Patch::Null);
    }

    #[test]
    fn explicit_clear_by_empty_string() {
        let update = Update {
            name: "env".to_string(),
            runner_id: Patch::Absent,
            github_connection_id: Patch::Value(String::new()),
        };
        let json = serde_json::to_string(&update).unwrap();
        assert_eq!(json, r#"{"Name":"env","GithubConnectionID":""}"#);
    }

    #[test]
    fn field_lookup_covers_every_field() {
        let update = Update {
            name: "env".to_string(),
            runner_id: Patch::Value("runner-123".to_string()),
            github_connection_id: Patch::Absent,
        };
        assert_eq!(
            update.field_names(),
            &["Name", "RunnerID", "GithubConnectionID"]
        );
        assert_eq!(update.field("Name"), Some(serde_json::json!("env")));
        assert_eq!(
            update.field("RunnerID"),
            Some(serde_json::json!("runner-123"))
        );
        assert_eq!(update.field("GithubConnectionID"), None);
        assert_eq!(update.field("Nope"), None);
    }

    #[test]
    fn null_field_reports_present_null() {
        let update = Update {
            name: "env".to_string(),
            runner_id: Patch::Null,
            github_connection_id: Patch::Absent,
        };
        assert_eq!(update.field("RunnerID"), Some(serde_json::Value::Null));
    }
}
