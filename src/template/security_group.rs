use ipnetwork::IpNetwork;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// `AWS::EC2::SecurityGroup` properties, limited to the fields rules
/// consume.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SecurityGroupProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_description: Option<String>,
    #[serde(default)]
    pub security_group_ingress: Vec<SecurityGroupIngressProperties>,
}

/// One ingress grant, either inline in a security group or from a
/// standalone `AWS::EC2::SecurityGroupIngress` resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SecurityGroupIngressProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cidr_ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cidr_ipv6: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_port: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_port: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_protocol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
}

impl SecurityGroupIngressProperties {
    /// The CIDR this entry grants access to, v4 or v6.
    pub fn cidr(&self) -> Option<&str> {
        self.cidr_ip.as_deref().or(self.cidr_ipv6.as_deref())
    }

    /// Port range wording for finding reasons: `46`, `46-50`, or `all`
    /// when the entry does not restrict ports.
    pub fn port_range_wording(&self) -> String {
        match (self.from_port, self.to_port) {
            (Some(from), Some(to)) if from == to => from.to_string(),
            (Some(from), Some(to)) => format!("{from}-{to}"),
            _ => "all".into(),
        }
    }
}

static PRIVATE_BLOCKS: Lazy<Vec<IpNetwork>> = Lazy::new(|| {
    [
        "10.0.0.0/8",
        "172.16.0.0/12",
        "192.168.0.0/16",
        "127.0.0.0/8",
        "169.254.0.0/16",
        "fc00::/7",
        "fe80::/10",
        "::1/128",
    ]
    .iter()
    .map(|cidr| cidr.parse().expect("valid CIDR literal"))
    .collect()
});

/// True when the CIDR reaches addresses outside the private, loopback, and
/// link-local ranges. `None` when the string is not a parseable CIDR.
pub fn cidr_open_to_world(cidr: &str) -> Option<bool> {
    let network: IpNetwork = cidr.parse().ok()?;
    let private = PRIVATE_BLOCKS
        .iter()
        .any(|block| block.contains(network.network()) && block.prefix() <= network.prefix());
    Some(!private)
}
