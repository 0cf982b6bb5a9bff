use tracing::warn;

use crate::config::Config;
use crate::error::Result;
use crate::expr::Value;
use crate::rules::{Finding, RiskLevel, Rule, RuleGranularity, RuleMetadata, RuleMode};
use crate::template::{cidr_open_to_world, ResolvedTemplate};

const RULE_ID: &str = "SecurityGroupOpenToWorld";

/// Flags security-group ingress entries whose CIDR reaches public
/// addresses, across inline ingress lists and standalone ingress
/// resources.
///
/// Filters see `logical_id`, `ingress_ip`, and the full entry as
/// `ingress_obj`.
pub struct SecurityGroupOpenToWorld;

impl Rule for SecurityGroupOpenToWorld {
    fn metadata(&self) -> RuleMetadata {
        RuleMetadata {
            id: RULE_ID.into(),
            description: "Security group ingress is open to public IP ranges".into(),
            default_mode: RuleMode::Blocking,
            default_risk: RiskLevel::High,
            granularity: RuleGranularity::Resource,
        }
    }

    fn run(&self, template: &ResolvedTemplate, _config: &Config) -> Result<Vec<Finding>> {
        let mut findings = Vec::new();
        for (logical_id, ingress) in template.ingress_entries() {
            let Some(cidr) = ingress.cidr() else {
                continue;
            };
            match cidr_open_to_world(cidr) {
                Some(true) => {}
                Some(false) => continue,
                None => {
                    warn!(resource = %logical_id, cidr = %cidr, "unparseable CIDR, skipping");
                    continue;
                }
            }
            let reason = format!(
                "Port(s) {} open to public IPs: ({}) in security group '{}'",
                ingress.port_range_wording(),
                cidr,
                logical_id
            );
            findings.push(
                Finding::new(RULE_ID, reason)
                    .with_resource(logical_id)
                    .with_context("logical_id", Value::from(logical_id))
                    .with_context("ingress_ip", Value::from(cidr))
                    .with_context("ingress_obj", Value::from(serde_json::to_value(ingress)?)),
            );
        }
        Ok(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn template(value: serde_json::Value) -> ResolvedTemplate {
        serde_json::from_value(value).unwrap()
    }

    fn run(template_value: serde_json::Value) -> Vec<Finding> {
        SecurityGroupOpenToWorld
            .run(&template(template_value), &Config::default())
            .unwrap()
    }

    #[test]
    fn public_ingress_is_reported_for_both_shapes() {
        let findings = run(json!({
            "Resources": {
                "securityGroupIngress1": {
                    "Type": "AWS::EC2::SecurityGroupIngress",
                    "Properties": {
                        "CidrIp": "11.0.0.0/8",
                        "FromPort": 46,
                        "ToPort": 46,
                        "IpProtocol": "tcp",
                        "GroupId": "sg-12341234"
                    }
                },
                "securityGroupIngress2": {
                    "Type": "AWS::EC2::SecurityGroupIngress",
                    "Properties": {
                        "CidrIpv6": "::/0",
                        "FromPort": 46,
                        "ToPort": 46,
                        "IpProtocol": "tcp",
                        "GroupId": "sg-12341234"
                    }
                }
            }
        }));

        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].rule_id, RULE_ID);
        assert_eq!(
            findings[0].reason,
            "Port(s) 46 open to public IPs: (11.0.0.0/8) in security group 'securityGroupIngress1'"
        );
        assert_eq!(
            findings[1].reason,
            "Port(s) 46 open to public IPs: (::/0) in security group 'securityGroupIngress2'"
        );
    }

    #[test]
    fn finding_context_exposes_the_ingress_entry() {
        let findings = run(json!({
            "Resources": {
                "sg": {
                    "Type": "AWS::EC2::SecurityGroup",
                    "Properties": {
                        "SecurityGroupIngress": [
                            {"CidrIp": "11.0.0.0/8", "FromPort": 46, "ToPort": 46, "IpProtocol": "tcp"}
                        ]
                    }
                }
            }
        }));

        assert_eq!(findings.len(), 1);
        let ctx = &findings[0].context;
        assert_eq!(ctx.get_path("ingress_ip"), Value::from("11.0.0.0/8"));
        assert_eq!(ctx.get_path("ingress_obj.FromPort"), Value::Int(46));
        assert_eq!(ctx.get_path("ingress_obj.IpProtocol"), Value::from("tcp"));
        assert_eq!(ctx.get_path("logical_id"), Value::from("sg"));
    }

    #[test]
    fn private_ranges_are_not_reported() {
        let findings = run(json!({
            "Resources": {
                "sg": {
                    "Type": "AWS::EC2::SecurityGroup",
                    "Properties": {
                        "SecurityGroupIngress": [
                            {"CidrIp": "10.0.0.0/8", "FromPort": 22, "ToPort": 22, "IpProtocol": "tcp"},
                            {"CidrIp": "192.168.0.0/16", "FromPort": 22, "ToPort": 22, "IpProtocol": "tcp"}
                        ]
                    }
                }
            }
        }));
        assert!(findings.is_empty());
    }

    #[test]
    fn entries_without_a_cidr_are_skipped() {
        let findings = run(json!({
            "Resources": {
                "bySgReference": {
                    "Type": "AWS::EC2::SecurityGroupIngress",
                    "Properties": {
                        "SourceSecurityGroupId": "sg-99999999",
                        "FromPort": 22,
                        "ToPort": 22,
                        "IpProtocol": "tcp"
                    }
                }
            }
        }));
        assert!(findings.is_empty());
    }

    #[test]
    fn port_ranges_are_worded_as_a_span() {
        let findings = run(json!({
            "Resources": {
                "wide": {
                    "Type": "AWS::EC2::SecurityGroupIngress",
                    "Properties": {"CidrIp": "0.0.0.0/0", "FromPort": 46, "ToPort": 50, "IpProtocol": "tcp"}
                }
            }
        }));
        assert_eq!(
            findings[0].reason,
            "Port(s) 46-50 open to public IPs: (0.0.0.0/0) in security group 'wide'"
        );
    }
}
