use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};

/// `AWS::IAM::Role` properties, limited to the fields rules consume.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IamRoleProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assume_role_policy_document: Option<PolicyDocument>,
}

/// An IAM policy document with its statements normalized to a list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub statement: Vec<Statement>,
}

/// A policy statement. `Action` and `Condition` are kept untyped; the rules
/// only inspect effect and principals, and filters receive the statement as
/// plain data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Statement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effect: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal: Option<Principal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<serde_json::Value>,
}

impl Statement {
    pub fn allows(&self) -> bool {
        self.effect.as_deref() == Some("Allow")
    }

    /// True when the statement carries a non-empty `Condition` block.
    pub fn has_condition(&self) -> bool {
        match &self.condition {
            Some(serde_json::Value::Object(entries)) => !entries.is_empty(),
            Some(serde_json::Value::Null) | None => false,
            Some(_) => true,
        }
    }

    /// Every principal in the statement, flattened across principal kinds.
    pub fn principals(&self) -> Vec<&str> {
        match &self.principal {
            Some(p) => p.principal_list(),
            None => Vec::new(),
        }
    }
}

/// A statement principal: the bare wildcard string, or a mapping of
/// principal kind (`AWS`, `Service`, `Federated`, ...) to one or more
/// principal strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Principal {
    Wildcard(String),
    Scoped(BTreeMap<String, StringOrList>),
}

impl Principal {
    pub fn principal_list(&self) -> Vec<&str> {
        match self {
            Principal::Wildcard(s) => vec![s.as_str()],
            Principal::Scoped(kinds) => kinds
                .values()
                .flat_map(|entry| match entry {
                    StringOrList::One(s) => std::slice::from_ref(s),
                    StringOrList::Many(items) => items.as_slice(),
                })
                .map(String::as_str)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StringOrList {
    One(String),
    Many(Vec<String>),
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<Statement>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(Statement),
        Many(Vec<Statement>),
    }
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(statement) => vec![statement],
        OneOrMany::Many(statements) => statements,
    })
}

/// A bare 12-digit account id.
pub static ACCOUNT_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{12}$").expect("valid regex"));

/// IAM principal ARN; captures the account id, which may be empty.
pub static IAM_ARN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^arn:aws:iam::(\d*):.*$").expect("valid regex"));

/// STS principal ARN; captures the account id, which may be empty.
pub static STS_ARN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^arn:aws:sts::(\d*):.*$").expect("valid regex"));

/// The whole-world principal: `*`, or an ARN whose account is `*`.
pub static FULL_WILDCARD_PRINCIPAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\*|arn:aws:iam::\*:.*)$").expect("valid regex"));

/// A principal delegating to an entire account: its root, a bare account
/// id, or a starred name within the account.
pub static PARTIAL_WILDCARD_PRINCIPAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(arn:aws:iam::\d{12}:(\*|root|[\w-]*\*)|\d{12})$").expect("valid regex")
});

/// Extract the account id a principal belongs to, from either a bare
/// account id or an IAM/STS ARN.
pub fn account_id_from_principal(principal: &str) -> Option<&str> {
    if ACCOUNT_ID.is_match(principal) {
        return Some(principal);
    }
    IAM_ARN
        .captures(principal)
        .or_else(|| STS_ARN.captures(principal))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}
