use model::entities::user_role::Role;

use crate::error::{Result, ServiceError};

/// True when the granted role set contains the wanted role.
pub fn has_role(roles: &[Role], wanted: Role) -> bool {
    roles.contains(&wanted)
}

/// Fail with `Forbidden` unless the granted role set contains the wanted
/// role. Callers decide separately whether there is a principal at all.
pub fn require_role(roles: &[Role], wanted: Role) -> Result<()> {
    if has_role(roles, wanted) {
        Ok(())
    } else {
        Err(ServiceError::Forbidden(format!(
            "requires {}",
            wanted.tag()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_checks_are_membership_tests() {
        let roles = vec![Role::User];
        assert!(has_role(&roles, Role::User));
        assert!(!has_role(&roles, Role::Admin));

        let both = vec![Role::User, Role::Admin];
        assert!(has_role(&both, Role::Admin));
    }

    #[test]
    fn require_role_refuses_missing_grants() {
        assert!(require_role(&[Role::User, Role::Admin], Role::Admin).is_ok());

        let err = require_role(&[Role::User], Role::Admin).unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        let err = require_role(&[], Role::User).unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }
}
