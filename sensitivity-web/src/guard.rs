//! Same-structure guard for mutating views.

use log::warn;

use sensitivity_core::{Actor, SensitiveArea};

/// Message attached to a denied request.
pub const ACCESS_DENIED: &str = "Access denied";

/// Outcome of a guard check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The handler may run.
    Allow,
    /// The handler must not run; the caller is sent back to the record.
    Deny,
}

impl Decision {
    /// Whether the handler may run.
    pub const fn is_allowed(self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Allow the request only when `actor` belongs to the `owner` structure.
pub fn same_structure_required(actor: &Actor, owner: u64) -> Decision {
    if actor.same_structure(owner) {
        Decision::Allow
    } else {
        Decision::Deny
    }
}

/// Guard `area` for `actor`, logging denials.
pub(crate) fn check_area(actor: &Actor, area: &SensitiveArea) -> Decision {
    let decision = same_structure_required(actor, area.structure);
    if !decision.is_allowed() {
        warn!(
            "denied change to sensitive area {} owned by structure {}",
            area.id, area.structure
        );
    }
    decision
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use sensitivity_core::User;

    #[rstest]
    #[case(Actor::Anonymous, Decision::Deny)]
    #[case(Actor::from(User::new(1, "ranger", 7)), Decision::Allow)]
    #[case(Actor::from(User::new(2, "visitor", 8)), Decision::Deny)]
    fn only_members_of_the_owning_structure_pass(
        #[case] actor: Actor,
        #[case] expected: Decision,
    ) {
        assert_eq!(same_structure_required(&actor, 7), expected);
    }
}
