//! Authorization guards
//!
//! Two restrictions protect the engine:
//!
//! 1. **Owner-only mutation**: parameter setters and transaction-list edits
//!    require the configured owner identity.
//! 2. **Top-level initiator**: the cycle entry point must be triggered from
//!    outside any other unit of execution in the same atomic batch. This
//!    prevents bracketing the rebase inside one atomic multi-step
//!    transaction to arbitrage the supply change before it becomes
//!    externally observable.
//!
//! The top-level property is carried explicitly on [`CallerContext`]: the
//! embedding entry point knows where the invocation originated and passes
//! that flag down rather than the engine rediscovering it.

use thiserror::Error;

/// Identity of an account or component, by convention a short stable name
/// (e.g. `"ops"`, `"orchestrator"`, `"pool_notifier"`).
pub type AccountId = String;

/// Errors from authorization checks
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("caller {caller} is not the owner")]
    NotOwner { caller: AccountId },

    #[error("caller {caller} is not the configured orchestrator")]
    CallerNotOrchestrator { caller: AccountId },

    #[error("indirect call rejected: the cycle must be triggered by a top-level initiator")]
    IndirectCallRejected,
}

/// Who is invoking an operation, and from where
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerContext {
    caller: AccountId,
    top_level: bool,
}

impl CallerContext {
    /// Context for a direct external initiator (top-level)
    pub fn external(caller: impl Into<AccountId>) -> Self {
        Self {
            caller: caller.into(),
            top_level: true,
        }
    }

    /// Context for a call made from within another executing unit
    pub fn internal(caller: impl Into<AccountId>) -> Self {
        Self {
            caller: caller.into(),
            top_level: false,
        }
    }

    pub fn caller(&self) -> &str {
        &self.caller
    }

    pub fn is_top_level(&self) -> bool {
        self.top_level
    }
}

/// Require that the context is a top-level initiator
pub fn require_top_level(ctx: &CallerContext) -> Result<(), AuthError> {
    if !ctx.top_level {
        return Err(AuthError::IndirectCallRejected);
    }
    Ok(())
}

/// Restricts privileged mutation to a single owner identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerGuard {
    owner: AccountId,
}

impl OwnerGuard {
    pub fn new(owner: impl Into<AccountId>) -> Self {
        Self {
            owner: owner.into(),
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Fail unless the context's caller is the owner
    pub fn require_owner(&self, ctx: &CallerContext) -> Result<(), AuthError> {
        if ctx.caller != self.owner {
            return Err(AuthError::NotOwner {
                caller: ctx.caller.clone(),
            });
        }
        Ok(())
    }

    /// Hand ownership to a new identity (owner-only)
    pub fn transfer_ownership(
        &mut self,
        ctx: &CallerContext,
        new_owner: impl Into<AccountId>,
    ) -> Result<(), AuthError> {
        self.require_owner(ctx)?;
        self.owner = new_owner.into();
        Ok(())
    }
}
