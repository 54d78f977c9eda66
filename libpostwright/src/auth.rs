//! Boundary authorization
//!
//! One predicate, applied once where transport input enters the system.
//! Core operations never re-check identity.

use tracing::debug;

use crate::types::UserId;

#[derive(Debug, Clone, Copy)]
pub struct Authorizer {
    allowed: UserId,
}

impl Authorizer {
    pub fn new(allowed: UserId) -> Self {
        Self { allowed }
    }

    /// Whether this identity may drive the system. Unauthorized traffic is
    /// dropped silently at the boundary, matching a single-operator bot.
    pub fn is_authorized(&self, user: UserId) -> bool {
        let ok = user == self.allowed;
        if !ok {
            debug!(%user, "dropping input from unauthorized identity");
        }
        ok
    }

    pub fn allowed(&self) -> UserId {
        self.allowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorized_operator_passes() {
        let auth = Authorizer::new(UserId(1));
        assert!(auth.is_authorized(UserId(1)));
    }

    #[test]
    fn test_other_identities_rejected() {
        let auth = Authorizer::new(UserId(1));
        assert!(!auth.is_authorized(UserId(2)));
        assert!(!auth.is_authorized(UserId(0)));
    }
}
