//! Self-or-read-only authorization policy.
//!
//! Reads and registration are open to anyone and never pass through here.
//! Mutations require the resolved actor to be the target account itself.

use crate::db::Account;
use crate::services::account_service::AccountError;

/// Authorize a mutating operation on `target`.
///
/// A missing or unresolved actor fails the same way as a foreign one: both
/// surface as [`AccountError::Forbidden`] (403, not 401), matching the
/// forbidden-vs-unauthorized split this API exposes.
pub fn authorize_mutation(actor: Option<&Account>, target: &Account) -> Result<(), AccountError> {
    match actor {
        Some(acting) if acting.id == target.id => Ok(()),
        _ => Err(AccountError::Forbidden),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(id: i32) -> Account {
        Account {
            id,
            public_id: format!("00000000-0000-4000-8000-{id:012}"),
            username: format!("user{id}"),
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
            is_staff: false,
            is_superuser: false,
            is_active: true,
            is_removed: false,
            created_at: "2026-03-01T00:00:00+00:00".to_string(),
        }
    }

    #[test]
    fn self_mutation_is_allowed() {
        let target = account(1);
        assert!(authorize_mutation(Some(&account(1)), &target).is_ok());
    }

    #[test]
    fn foreign_actor_is_forbidden() {
        let target = account(1);
        let result = authorize_mutation(Some(&account(2)), &target);
        assert!(matches!(result, Err(AccountError::Forbidden)));
    }

    #[test]
    fn anonymous_actor_is_forbidden() {
        let target = account(1);
        let result = authorize_mutation(None, &target);
        assert!(matches!(result, Err(AccountError::Forbidden)));
    }
}
