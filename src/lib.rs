//! A collection whose participants stay present exactly as long as
//! the membership handles issued for them are alive.
//!
//! [`Group::issue`] inserts a participant and returns a [`Membership`].
//! Dropping the membership, or revoking it explicitly, removes the
//! participant again, exactly once, however the owning scope ends.
//!
//! ```
//! use membership_group::Group;
//!
//! let g = Group::new();
//!
//! let m1 = g.issue(1).unwrap();
//! let m2 = g.issue(2).unwrap();
//! let m3 = g.issue(3).unwrap();
//! assert_eq!(vec![1, 2, 3], g.to_vec().unwrap());
//!
//! drop(m2);
//! assert_eq!(vec![1, 3], g.to_vec().unwrap());
//!
//! drop(m1);
//! assert_eq!(vec![3], g.to_vec().unwrap());
//! # drop(m3);
//! ```
//!
//! Internally, the group keeps its participants in a `Vec` of slots
//! linked in issuance order. A membership holds the slot index plus
//! the generation the slot was filled in, so removing one participant
//! never disturbs the others and a stale index can never reach a
//! participant that later reused the slot. Vacated slots go onto a
//! free list that is consumed before the `Vec` grows.
//!
//! A membership borrows its group, so the group cannot be dropped while
//! any membership is alive. Misuse that the compiler cannot catch
//! (revoking twice, revoking through the wrong group, leaking a handle)
//! is handled according to the group's [`ViolationPolicy`].

mod config;
mod error;
mod group;
mod locator;
mod membership;
mod participants;
mod roster;

pub use crate::config::{Capacity, GroupConfig, Insertion, ViolationPolicy};
pub use crate::error::{GroupError, Violation};
pub use crate::group::Group;
pub use crate::locator::Locator;
pub use crate::membership::{Membership, Revocation};
pub use crate::participants::{Iter, Participants};
