//! The resolved template model.
//!
//! Input templates have already been through parameter and intrinsic
//! resolution upstream; this module only types the resulting object graph.
//! Resource types the rules know about get typed properties; everything
//! else is preserved untouched so unknown resources never reject a
//! template.

mod iam;
mod security_group;

pub use iam::{
    account_id_from_principal, IamRoleProperties, PolicyDocument, Principal, Statement,
    StringOrList, ACCOUNT_ID, FULL_WILDCARD_PRINCIPAL, IAM_ARN, PARTIAL_WILDCARD_PRINCIPAL,
    STS_ARN,
};
pub use security_group::{
    cidr_open_to_world, SecurityGroupIngressProperties, SecurityGroupProperties,
};

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};

/// A template after upstream resolution, keyed by logical id. Iteration
/// order is the sorted logical-id order, which keeps findings
/// deterministic.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResolvedTemplate {
    #[serde(rename = "Resources", default)]
    pub resources: BTreeMap<String, Resource>,
}

/// One resource, dispatched on its CloudFormation type tag.
#[derive(Debug, Clone)]
pub enum Resource {
    SecurityGroup(SecurityGroupProperties),
    SecurityGroupIngress(SecurityGroupIngressProperties),
    IamRole(IamRoleProperties),
    Other {
        type_name: String,
        properties: serde_json::Value,
    },
}

impl Resource {
    pub fn type_name(&self) -> &str {
        match self {
            Self::SecurityGroup(_) => "AWS::EC2::SecurityGroup",
            Self::SecurityGroupIngress(_) => "AWS::EC2::SecurityGroupIngress",
            Self::IamRole(_) => "AWS::IAM::Role",
            Self::Other { type_name, .. } => type_name,
        }
    }
}

impl<'de> Deserialize<'de> for Resource {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct RawResource {
            #[serde(rename = "Type")]
            type_name: String,
            #[serde(rename = "Properties", default = "empty_object")]
            properties: serde_json::Value,
        }

        fn empty_object() -> serde_json::Value {
            serde_json::Value::Object(serde_json::Map::new())
        }

        let raw = RawResource::deserialize(deserializer)?;
        let resource = match raw.type_name.as_str() {
            "AWS::EC2::SecurityGroup" => Resource::SecurityGroup(
                serde_json::from_value(raw.properties).map_err(serde::de::Error::custom)?,
            ),
            "AWS::EC2::SecurityGroupIngress" => Resource::SecurityGroupIngress(
                serde_json::from_value(raw.properties).map_err(serde::de::Error::custom)?,
            ),
            "AWS::IAM::Role" => Resource::IamRole(
                serde_json::from_value(raw.properties).map_err(serde::de::Error::custom)?,
            ),
            _ => Resource::Other {
                type_name: raw.type_name,
                properties: raw.properties,
            },
        };
        Ok(resource)
    }
}

impl ResolvedTemplate {
    /// Ingress entries across inline security groups and standalone
    /// ingress resources, with the logical id that owns each entry.
    pub fn ingress_entries(&self) -> Vec<(&str, &SecurityGroupIngressProperties)> {
        let mut entries = Vec::new();
        for (logical_id, resource) in &self.resources {
            match resource {
                Resource::SecurityGroup(props) => {
                    for ingress in &props.security_group_ingress {
                        entries.push((logical_id.as_str(), ingress));
                    }
                }
                Resource::SecurityGroupIngress(props) => {
                    entries.push((logical_id.as_str(), props));
                }
                _ => {}
            }
        }
        entries
    }

    /// IAM roles with their logical ids.
    pub fn iam_roles(&self) -> impl Iterator<Item = (&str, &IamRoleProperties)> {
        self.resources
            .iter()
            .filter_map(|(logical_id, resource)| match resource {
                Resource::IamRole(props) => Some((logical_id.as_str(), props)),
                _ => None,
            })
    }
}
