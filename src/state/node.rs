//! Graph vertex and edge types
use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An opaque account identifier
///
/// Account IDs are strings of ASCII decimal digits. They are compared by exact
/// string equality and never normalized, so `"012"` and `"12"` are different nodes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NodeId(String);

impl NodeId {
    /// Parses and validates a node ID
    ///
    /// # Returns
    ///
    /// * `Ok(NodeId)` - The value is a non-empty string of decimal digits
    /// * `Err(ConfigError::InvalidNodeId)` - Anything else
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ConfigError::InvalidNodeId(value.to_string()));
        }
        Ok(Self(value.to_string()))
    }

    /// Returns the ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for NodeId {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for NodeId {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<NodeId> for String {
    fn from(id: NodeId) -> Self {
        id.0
    }
}

/// Direction of the relationship expanded for each node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeDirection {
    /// Accounts the node follows
    Following,

    /// Accounts that follow the node
    Followers,
}

impl EdgeDirection {
    /// All directions, in a stable order
    pub const ALL: [EdgeDirection; 2] = [EdgeDirection::Following, EdgeDirection::Followers];

    /// Returns the API path segment for this direction
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Following => "following",
            Self::Followers => "followers",
        }
    }
}

impl fmt::Display for EdgeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EdgeDirection {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "following" => Ok(Self::Following),
            "followers" => Ok(Self::Followers),
            other => Err(ConfigError::InvalidDirection(other.to_string())),
        }
    }
}

/// One neighbor user object as returned by the provider API
///
/// Only `id` is interpreted; every other field is carried through verbatim so
/// the stored edge-set stays a faithful copy of the API response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: NodeId,

    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl UserRecord {
    /// Creates a record carrying only an ID
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            fields: serde_json::Map::new(),
        }
    }

    /// Looks up a top-level string field
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(|v| v.as_str())
    }

    /// Looks up an integer inside the `public_metrics` object
    pub fn metric(&self, key: &str) -> Option<i64> {
        self.fields
            .get("public_metrics")
            .and_then(|m| m.get(key))
            .and_then(|v| v.as_i64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_node_id_accepts_digits() {
        assert_eq!(NodeId::parse("783214").unwrap().as_str(), "783214");
        assert!(NodeId::parse("0").is_ok());
    }

    #[test]
    fn test_node_id_rejects_non_digits() {
        assert!(matches!(NodeId::parse(""), Err(ConfigError::InvalidNodeId(_))));
        assert!(NodeId::parse("12a").is_err());
        assert!(NodeId::parse("-12").is_err());
        assert!(NodeId::parse(" 12").is_err());
        assert!(NodeId::parse("１２").is_err());
    }

    #[test]
    fn test_edge_direction_parse() {
        assert_eq!(
            "following".parse::<EdgeDirection>().unwrap(),
            EdgeDirection::Following
        );
        assert_eq!(
            "followers".parse::<EdgeDirection>().unwrap(),
            EdgeDirection::Followers
        );
        assert!(matches!(
            "friends".parse::<EdgeDirection>(),
            Err(ConfigError::InvalidDirection(_))
        ));
        assert_eq!(EdgeDirection::Followers.to_string(), "followers");
    }

    #[test]
    fn test_user_record_preserves_fields() {
        let value = json!({
            "id": "42",
            "username": "gull",
            "public_metrics": {"followers_count": 7}
        });
        let record: UserRecord = serde_json::from_value(value.clone()).unwrap();

        assert_eq!(record.id.as_str(), "42");
        assert_eq!(record.str_field("username"), Some("gull"));
        assert_eq!(record.metric("followers_count"), Some(7));
        assert_eq!(serde_json::to_value(&record).unwrap(), value);
    }

    #[test]
    fn test_user_record_rejects_bad_id() {
        let result: Result<UserRecord, _> = serde_json::from_value(json!({"id": "abc"}));
        assert!(result.is_err());

        let result: Result<UserRecord, _> = serde_json::from_value(json!({"name": "no id"}));
        assert!(result.is_err());
    }
}
