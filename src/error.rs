use crate::locator::Locator;
use thiserror::Error;

/// Errors reported by `Group` and `Membership` operations.
///
/// `CapacityExceeded` and `Busy` are ordinary runtime conditions.
/// `UseAfterRevoke` and `ContractViolation` signal misuse and are
/// routed through the group's `ViolationPolicy` before being returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GroupError {
    /// The group is bounded and already holds `capacity` participants.
    /// Nothing was inserted.
    #[error("group is full ({capacity} participants)")]
    CapacityExceeded { capacity: usize },

    /// The backing store is borrowed by a `Participants` view or a
    /// participant reference in a way that conflicts with the call.
    #[error("group is borrowed by an active view or participant reference")]
    Busy,

    /// The membership has already been revoked.
    #[error("membership was already revoked")]
    UseAfterRevoke,

    #[error("group contract violated: {0}")]
    ContractViolation(#[from] Violation),
}

/// Ways a caller can break the group/membership contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("membership {locator} was issued by a different group")]
    ForeignMembership { locator: Locator },

    #[error("locator {locator} does not refer to a present participant")]
    StaleLocator { locator: Locator },

    /// Only reachable by leaking a membership, e.g. with `std::mem::forget`.
    #[error("group dropped with {outstanding} participants still present")]
    OutstandingMemberships { outstanding: usize },
}
