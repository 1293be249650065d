use crate::{LedgerError, LedgerResult};
use contrail_shared::Address;
use std::collections::HashSet;

/// Holds the admin role and the two-step handoff state.
///
/// A candidate records consent first; only then can the current admin
/// finalize the transfer to them.
#[derive(Debug, Clone)]
pub struct AdminSuccession {
    admin: Address,
    consenting: HashSet<Address>,
}

impl AdminSuccession {
    pub fn new(admin: Address) -> Self {
        Self {
            admin,
            consenting: HashSet::new(),
        }
    }

    pub fn admin(&self) -> Address {
        self.admin
    }

    pub fn is_admin(&self, caller: Address) -> bool {
        !caller.is_zero() && caller == self.admin
    }

    /// Capability check run at the boundary of every privileged operation
    pub fn ensure_admin(&self, caller: Address) -> LedgerResult<()> {
        if self.is_admin(caller) {
            Ok(())
        } else {
            Err(LedgerError::Unauthorized(format!("{} is not the admin", caller)))
        }
    }

    pub fn has_consented(&self, candidate: Address) -> bool {
        self.consenting.contains(&candidate)
    }

    /// Record the caller's consent to become admin.
    pub fn accept_new_admin_role(&mut self, caller: Address) -> LedgerResult<()> {
        if caller.is_zero() {
            return Err(LedgerError::InvalidArgument(
                "zero address cannot accept the admin role".to_string(),
            ));
        }
        self.consenting.insert(caller);
        Ok(())
    }

    /// Revoke previously recorded consent. Revoking without consent is a no-op.
    pub fn cancel_new_admin_role(&mut self, caller: Address) {
        self.consenting.remove(&caller);
    }

    /// Finalize the handoff. Requires the candidate's recorded consent.
    pub fn change_admin(&mut self, caller: Address, candidate: Address) -> LedgerResult<Address> {
        self.ensure_admin(caller)?;

        if candidate.is_zero() {
            return Err(LedgerError::InvalidArgument("candidate is the zero address".to_string()));
        }
        if candidate == self.admin {
            return Err(LedgerError::InvalidArgument(format!("{} is already the admin", candidate)));
        }
        if !self.has_consented(candidate) {
            return Err(LedgerError::InvariantViolation(format!(
                "{} has not accepted the admin role",
                candidate
            )));
        }

        self.consenting.remove(&candidate);
        let previous = std::mem::replace(&mut self.admin, candidate);
        Ok(previous)
    }
}
