use crate::error::{GroupError, Violation};
use crate::group::Group;
use crate::locator::Locator;
use std::cell::{Ref, RefMut};
use std::fmt;

/// Proof that a participant is present in a `Group`. It is
/// constructed only by [`Group::issue`] and removes its participant
/// from the group exactly once: when it is revoked explicitly, or when
/// it goes out of scope, whichever comes first. Early returns, `?`
/// propagation and unwinding all count as going out of scope.
///
/// A membership borrows its group, so the compiler rejects any program
/// in which the group could be dropped first. It can be moved but
/// never cloned; a move hands the single obligation to revoke over to
/// the new owner.
///
/// [`Group::issue`]: struct.Group.html#method.issue
pub struct Membership<'g, T> {
    group: &'g Group<T>,
    // `None` once revoked.
    locator: Option<Locator>,
}

/// The outcome of an explicit revocation.
#[derive(Debug, PartialEq, Eq)]
pub enum Revocation<T> {
    /// The participant was removed and handed back.
    Removed(T),
    /// The group was being iterated, so removal was queued. The
    /// participant is already hidden from new views and no longer
    /// counted by `len`; it is dropped once the group is free.
    Deferred,
}

impl<T> Revocation<T> {
    pub fn into_value(self) -> Option<T> {
        match self {
            Revocation::Removed(value) => Some(value),
            Revocation::Deferred => None,
        }
    }
}

impl<'g, T> Membership<'g, T> {
    pub(crate) fn new(group: &'g Group<T>, locator: Locator) -> Self {
        Self {
            group,
            locator: Some(locator),
        }
    }

    /// The group that issued this membership.
    ///
    /// # Examples
    ///
    /// ```
    /// use membership_group::Group;
    ///
    /// let g = Group::new();
    /// let m = g.issue(1).unwrap();
    ///
    /// assert_eq!(1, m.group().len());
    /// ```
    pub fn group(&self) -> &'g Group<T> {
        self.group
    }

    /// The locator of the participant, or `None` once revoked.
    ///
    /// # Examples
    ///
    /// ```
    /// use membership_group::Group;
    ///
    /// let g = Group::new();
    /// let mut a = g.issue(1).unwrap();
    /// let b = g.issue(2).unwrap();
    ///
    /// assert!(a.locator().is_some());
    /// assert_ne!(a.locator(), b.locator());
    ///
    /// g.revoke(&mut a).unwrap();
    /// assert_eq!(None, a.locator());
    /// ```
    pub fn locator(&self) -> Option<Locator> {
        self.locator
    }

    /// True once the membership has been revoked through
    /// [`Group::revoke`].
    ///
    /// # Examples
    ///
    /// ```
    /// use membership_group::Group;
    ///
    /// let g = Group::new();
    /// let mut m = g.issue(1).unwrap();
    /// assert!(!m.is_revoked());
    ///
    /// g.revoke(&mut m).unwrap();
    /// assert!(m.is_revoked());
    /// ```
    ///
    /// [`Group::revoke`]: struct.Group.html#method.revoke
    pub fn is_revoked(&self) -> bool {
        self.locator.is_none()
    }

    /// Borrow the participant.
    ///
    /// # Examples
    ///
    /// ```
    /// use membership_group::Group;
    ///
    /// let g = Group::new();
    /// let m = g.issue(String::from("alice")).unwrap();
    ///
    /// assert_eq!("alice", m.get().unwrap().as_str());
    /// ```
    pub fn get(&self) -> Result<Ref<'_, T>, GroupError> {
        let locator = self.live_locator()?;
        let roster = self.group.roster().try_borrow().map_err(|_| GroupError::Busy)?;

        Ref::filter_map(roster, |r| r.get(&locator))
            .map_err(|_| self.group.fault(Violation::StaleLocator { locator }.into()))
    }

    /// Mutably borrow the participant. Fails with `Busy` while a
    /// `Participants` view or another participant reference is alive.
    ///
    /// # Examples
    ///
    /// ```
    /// use membership_group::Group;
    ///
    /// let g = Group::new();
    /// let mut m = g.issue(10).unwrap();
    ///
    /// *m.get_mut().unwrap() += 5;
    ///
    /// assert_eq!(vec![15], g.to_vec().unwrap());
    /// ```
    pub fn get_mut(&mut self) -> Result<RefMut<'_, T>, GroupError> {
        let locator = self.live_locator()?;
        let roster = self
            .group
            .roster()
            .try_borrow_mut()
            .map_err(|_| GroupError::Busy)?;

        RefMut::filter_map(roster, |r| r.get_mut(&locator))
            .map_err(|_| self.group.fault(Violation::StaleLocator { locator }.into()))
    }

    /// Revoke the membership now instead of at the end of its scope.
    /// Fails with `UseAfterRevoke` if [`Group::revoke`] already revoked
    /// it.
    ///
    /// # Examples
    ///
    /// ```
    /// use membership_group::{Group, Revocation};
    ///
    /// let g = Group::new();
    /// let m = g.issue(10).unwrap();
    ///
    /// assert_eq!(Ok(Revocation::Removed(10)), m.revoke());
    /// assert!(g.is_empty());
    /// ```
    ///
    /// [`Group::revoke`]: struct.Group.html#method.revoke
    pub fn revoke(mut self) -> Result<Revocation<T>, GroupError> {
        let locator = self.take_locator()?;
        self.group.release(locator)
    }

    /// Moves the locator out, leaving the membership revoked.
    pub(crate) fn take_locator(&mut self) -> Result<Locator, GroupError> {
        match self.locator.take() {
            Some(l) => Ok(l),
            None => Err(self.group.fault(GroupError::UseAfterRevoke)),
        }
    }

    fn live_locator(&self) -> Result<Locator, GroupError> {
        match self.locator {
            Some(l) => Ok(l),
            None => Err(self.group.fault(GroupError::UseAfterRevoke)),
        }
    }
}

impl<'g, T> Drop for Membership<'g, T> {
    fn drop(&mut self) {
        // Already revoked explicitly: nothing left to remove.
        if let Some(locator) = self.locator.take() {
            let _ = self.group.release(locator);
        }
    }
}

impl<'g, T> fmt::Debug for Membership<'g, T> {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("Membership")
            .field("locator", &self.locator)
            .finish()
    }
}
