mod cross_account_trust;
mod security_group_open_to_world;
mod wildcard_principal;

use super::Rule;

pub use cross_account_trust::CrossAccountTrust;
pub use security_group_open_to_world::SecurityGroupOpenToWorld;
pub use wildcard_principal::IamWildcardPrincipal;

/// All built-in rules, in default evaluation order.
pub fn all_rules() -> Vec<Box<dyn Rule>> {
    vec![
        Box::new(SecurityGroupOpenToWorld),
        Box::new(CrossAccountTrust),
        Box::new(IamWildcardPrincipal),
    ]
}

/// Look up one built-in rule by id.
pub fn rule_by_id(id: &str) -> Option<Box<dyn Rule>> {
    all_rules().into_iter().find(|rule| rule.metadata().id == id)
}
