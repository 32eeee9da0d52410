use crate::config::{Capacity, GroupConfig, Insertion, ViolationPolicy};
use crate::error::{GroupError, Violation};
use crate::locator::Locator;
use crate::membership::{Membership, Revocation};
use crate::participants::Participants;
use crate::roster::Roster;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::{mem, ptr, thread};
use tracing::{debug, error, trace};

/// A collection whose participants are present exactly as long as the
/// [`Membership`] handles issued for them are alive.
///
/// The group is the only thing that ever mutates its storage.
/// Memberships ask it to remove their participant when they are
/// revoked or dropped. Iteration follows issuance order (or the order
/// implied by [`Insertion::Front`]).
///
/// A `Group` is not `Sync`: its storage is guarded by `RefCell`, so
/// sharing one across threads requires wrapping the whole group in
/// external synchronisation.
///
/// [`Membership`]: struct.Membership.html
/// [`Insertion::Front`]: enum.Insertion.html#variant.Front
pub struct Group<T> {
    roster: RefCell<Roster<T>>,
    // Locators revoked while the roster was borrowed.
    deferred: RefCell<Vec<Locator>>,
    // Participants whose memberships are still live.
    live: Cell<usize>,
    config: GroupConfig,
}

impl<T> Default for Group<T> {
    fn default() -> Self {
        Group::new()
    }
}

impl<T> fmt::Debug for Group<T>
where
    T: fmt::Debug,
{
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.iter() {
            Ok(participants) => fmt.debug_list().entries(participants.iter()).finish(),
            Err(_) => fmt.write_str("[<borrowed>]"),
        }
    }
}

impl<T> Group<T> {
    /// Creates an empty, unbounded `Group`. No allocations are
    /// performed until participants are issued.
    ///
    /// # Examples
    ///
    /// ```
    /// use membership_group::Group;
    ///
    /// let group: Group<u32> = Group::new();
    /// assert!(group.is_empty());
    /// ```
    pub fn new() -> Group<T> {
        Group::with_config(GroupConfig::default())
    }

    /// Creates a `Group` that holds at most `capacity` participants.
    ///
    /// # Examples
    ///
    /// ```
    /// use membership_group::{Group, GroupError};
    ///
    /// let g = Group::bounded(1);
    /// let _m = g.issue(1).unwrap();
    ///
    /// assert_eq!(
    ///     Err(GroupError::CapacityExceeded { capacity: 1 }),
    ///     g.issue(2).map(|_| ())
    /// );
    /// assert_eq!(vec![1], g.to_vec().unwrap());
    /// ```
    pub fn bounded(capacity: usize) -> Group<T> {
        Group::with_config(GroupConfig::new().bounded(capacity))
    }

    /// Creates a `Group` from explicit options.
    ///
    /// # Examples
    ///
    /// ```
    /// use membership_group::{Group, GroupConfig, Insertion};
    ///
    /// let g = Group::with_config(GroupConfig::new().insertion(Insertion::Front));
    /// let _a = g.issue(1).unwrap();
    /// let _b = g.issue(2).unwrap();
    ///
    /// assert_eq!(vec![2, 1], g.to_vec().unwrap());
    /// ```
    pub fn with_config(config: GroupConfig) -> Group<T> {
        let roster = match config.capacity {
            Capacity::Bounded(capacity) => Roster::with_capacity(capacity),
            Capacity::Unbounded => Roster::new(),
        };

        Group {
            roster: RefCell::new(roster),
            deferred: RefCell::new(Vec::new()),
            live: Cell::new(0),
            config,
        }
    }

    /// The options the group was created with.
    ///
    /// # Examples
    ///
    /// ```
    /// use membership_group::{Capacity, Group};
    ///
    /// let g: Group<u8> = Group::bounded(4);
    /// assert_eq!(Capacity::Bounded(4), g.config().capacity);
    /// ```
    pub fn config(&self) -> &GroupConfig {
        &self.config
    }

    /// The number of participants whose memberships are live.
    ///
    /// # Examples
    ///
    /// ```
    /// use membership_group::Group;
    ///
    /// let g = Group::new();
    /// let a = g.issue('a').unwrap();
    /// let b = g.issue('b').unwrap();
    /// assert_eq!(2, g.len());
    ///
    /// drop(a);
    /// assert_eq!(1, g.len());
    /// # drop(b);
    /// ```
    pub fn len(&self) -> usize {
        self.live.get()
    }

    /// True when no membership is live.
    ///
    /// # Examples
    ///
    /// ```
    /// use membership_group::Group;
    ///
    /// let g = Group::new();
    /// assert!(g.is_empty());
    ///
    /// let m = g.issue(1).unwrap();
    /// assert!(!g.is_empty());
    ///
    /// drop(m);
    /// assert!(g.is_empty());
    /// ```
    pub fn is_empty(&self) -> bool {
        0 == self.live.get()
    }

    /// How many more participants a bounded group accepts. `None` for
    /// an unbounded group.
    ///
    /// This is headroom under the bound only. While a `Participants`
    /// view or a participant reference is alive, `issue` still fails
    /// with `Busy` even if headroom remains.
    ///
    /// # Examples
    ///
    /// ```
    /// use membership_group::{Group, GroupError};
    ///
    /// let g = Group::bounded(2);
    /// let _m = g.issue(1).unwrap();
    /// assert_eq!(Some(1), g.remaining());
    ///
    /// let view = g.iter().unwrap();
    /// assert_eq!(Some(1), g.remaining());
    /// assert_eq!(Err(GroupError::Busy), g.issue(2).map(|_| ()));
    /// drop(view);
    ///
    /// let _n = g.issue(2).unwrap();
    /// assert_eq!(Some(0), g.remaining());
    ///
    /// let unbounded: Group<u8> = Group::new();
    /// assert_eq!(None, unbounded.remaining());
    /// ```
    pub fn remaining(&self) -> Option<usize> {
        match self.config.capacity {
            Capacity::Bounded(capacity) => Some(capacity.saturating_sub(self.live.get())),
            Capacity::Unbounded => None,
        }
    }

    /// Insert `value` and return the membership that keeps it present.
    ///
    /// Fails with `CapacityExceeded` when a bounded group is full and
    /// with `Busy` while a participant is mutably borrowed. In both
    /// cases nothing is inserted and `value` is dropped.
    ///
    /// # Examples
    ///
    /// ```
    /// use membership_group::Group;
    ///
    /// let g = Group::new();
    /// let m = g.issue(10).unwrap();
    /// assert_eq!(vec![10], g.to_vec().unwrap());
    ///
    /// drop(m);
    /// assert!(g.to_vec().unwrap().is_empty());
    /// ```
    pub fn issue(&self, value: T) -> Result<Membership<'_, T>, GroupError> {
        self.flush_deferred();

        if let Capacity::Bounded(capacity) = self.config.capacity {
            if self.live.get() >= capacity {
                debug!(capacity, "group full, membership refused");
                return Err(GroupError::CapacityExceeded { capacity });
            }
        }

        let locator = {
            let mut roster = self.roster.try_borrow_mut().map_err(|_| GroupError::Busy)?;
            match self.config.insertion {
                Insertion::Back => roster.push_back(value),
                Insertion::Front => roster.push_front(value),
            }
        };
        self.live.set(self.live.get() + 1);

        trace!(%locator, live = self.live.get(), "membership issued");
        Ok(Membership::new(self, locator))
    }

    /// Revoke `membership` now. The handle stays in scope but is left
    /// revoked, so dropping it later does nothing.
    ///
    /// Handing over a membership issued by another group is a
    /// `ForeignMembership` violation and leaves the membership alone.
    /// Revoking twice is `UseAfterRevoke`.
    ///
    /// # Examples
    ///
    /// ```
    /// use membership_group::{Group, Revocation};
    ///
    /// let g = Group::new();
    /// let mut m = g.issue(10).unwrap();
    ///
    /// assert_eq!(Ok(Revocation::Removed(10)), g.revoke(&mut m));
    /// assert!(m.is_revoked());
    /// assert!(g.is_empty());
    /// ```
    pub fn revoke(
        &self,
        membership: &mut Membership<'_, T>,
    ) -> Result<Revocation<T>, GroupError> {
        if !ptr::eq(self, membership.group()) {
            let err = match membership.locator() {
                Some(locator) => Violation::ForeignMembership { locator }.into(),
                None => GroupError::UseAfterRevoke,
            };
            return Err(self.fault(err));
        }

        let locator = membership.take_locator()?;
        self.release(locator)
    }

    /// A view over the present participants in issuance order. While
    /// the view is alive, revocations are queued rather than applied,
    /// and `issue` fails with `Busy`.
    ///
    /// # Examples
    ///
    /// ```
    /// use membership_group::Group;
    ///
    /// let g = Group::new();
    /// let _a = g.issue(1).unwrap();
    /// let _b = g.issue(2).unwrap();
    ///
    /// let view = g.iter().unwrap();
    ///
    /// let v: Vec<&i32> = view.iter().collect();
    /// assert_eq!(vec![&1, &2], v);
    ///
    /// let v: Vec<&i32> = view.iter().rev().collect();
    /// assert_eq!(vec![&2, &1], v);
    /// ```
    pub fn iter(&self) -> Result<Participants<'_, T>, GroupError> {
        self.flush_deferred();

        let roster = self.roster.try_borrow().map_err(|_| GroupError::Busy)?;
        let hidden = self
            .deferred
            .try_borrow()
            .map(|d| d.clone())
            .unwrap_or_default();

        Ok(Participants::new(self, roster, hidden))
    }

    /// Clones the present participants, in iteration order, into a `Vec`.
    ///
    /// # Examples
    ///
    /// ```
    /// use membership_group::Group;
    ///
    /// let g = Group::new();
    /// let _a = g.issue("a").unwrap();
    /// let b = g.issue("b").unwrap();
    /// let _c = g.issue("c").unwrap();
    ///
    /// drop(b);
    /// assert_eq!(vec!["a", "c"], g.to_vec().unwrap());
    /// ```
    pub fn to_vec(&self) -> Result<Vec<T>, GroupError>
    where
        T: Clone,
    {
        Ok(self.iter()?.iter().cloned().collect())
    }

    /// Issue `value` for the duration of `f`. The membership is revoked
    /// when `f` returns, however it returns, including by unwinding.
    ///
    /// # Examples
    ///
    /// ```
    /// use membership_group::Group;
    ///
    /// let g = Group::new();
    /// let seen = g.scoped(7, |_| g.to_vec().unwrap()).unwrap();
    ///
    /// assert_eq!(vec![7], seen);
    /// assert!(g.is_empty());
    /// ```
    pub fn scoped<R, F>(&self, value: T, f: F) -> Result<R, GroupError>
    where
        F: FnOnce(&mut Membership<'_, T>) -> R,
    {
        let mut membership = self.issue(value)?;
        Ok(f(&mut membership))
    }

    pub(crate) fn roster(&self) -> &RefCell<Roster<T>> {
        &self.roster
    }

    /// Removes the participant at `locator`, or queues the removal if
    /// the roster is currently borrowed.
    pub(crate) fn release(&self, locator: Locator) -> Result<Revocation<T>, GroupError> {
        let removed = match self.roster.try_borrow_mut() {
            Ok(mut roster) => roster.remove(&locator),
            Err(_) => {
                self.deferred.borrow_mut().push(locator);
                self.live.set(self.live.get() - 1);
                debug!(%locator, "group borrowed, revocation deferred");
                return Ok(Revocation::Deferred);
            }
        };

        match removed {
            Some(value) => {
                self.live.set(self.live.get() - 1);
                trace!(%locator, live = self.live.get(), "membership revoked");
                self.flush_deferred();
                Ok(Revocation::Removed(value))
            }
            None => Err(self.fault(Violation::StaleLocator { locator }.into())),
        }
    }

    /// Applies queued revocations if the roster can be borrowed.
    pub(crate) fn flush_deferred(&self) {
        let mut roster = match self.roster.try_borrow_mut() {
            Ok(roster) => roster,
            Err(_) => return,
        };
        let pending = match self.deferred.try_borrow_mut() {
            Ok(mut deferred) if !deferred.is_empty() => mem::take(&mut *deferred),
            _ => return,
        };

        let mut removed = Vec::with_capacity(pending.len());
        let mut stale = Vec::new();
        for locator in pending {
            match roster.remove(&locator) {
                Some(value) => removed.push(value),
                None => stale.push(locator),
            }
        }
        drop(roster);

        trace!(count = removed.len(), "deferred revocations applied");
        // Participants are dropped outside the borrow so their own
        // destructors may use the group.
        drop(removed);

        for locator in stale {
            self.fault(Violation::StaleLocator { locator }.into());
        }
    }

    /// Reports misuse according to the configured `ViolationPolicy` and
    /// hands the error back for callers that return it.
    pub(crate) fn fault(&self, err: GroupError) -> GroupError {
        match self.config.violations {
            // A second panic while unwinding would abort the process.
            ViolationPolicy::Panic if !thread::panicking() => panic!("{}", err),
            _ => {
                error!(%err, "group misuse");
                err
            }
        }
    }
}

impl<T> Drop for Group<T> {
    fn drop(&mut self) {
        // Exclusive access: a leaked view's borrow flag does not matter here.
        let roster = self.roster.get_mut();
        let mut stale = Vec::new();
        for locator in mem::take(self.deferred.get_mut()) {
            if roster.remove(&locator).is_none() {
                stale.push(locator);
            }
        }
        let outstanding = roster.len();

        for locator in stale {
            self.fault(Violation::StaleLocator { locator }.into());
        }
        if outstanding > 0 {
            self.fault(Violation::OutstandingMemberships { outstanding }.into());
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::rc::Rc;

    fn logging<T>() -> Group<T> {
        Group::with_config(GroupConfig::new().violations(ViolationPolicy::Log))
    }

    #[test]
    fn issue_appends_in_order() {
        let g = Group::new();
        let _a = g.issue(1u8).unwrap();
        let _b = g.issue(2u8).unwrap();
        let _c = g.issue(3u8).unwrap();

        assert_eq!(vec![1, 2, 3], g.to_vec().unwrap());
        assert_eq!(3, g.len());
    }

    #[test]
    fn front_insertion_prepends() {
        let g = Group::with_config(GroupConfig::new().insertion(Insertion::Front));
        let _a = g.issue(1u8).unwrap();
        let _b = g.issue(2u8).unwrap();

        assert_eq!(vec![2, 1], g.to_vec().unwrap());
    }

    #[test]
    fn bounded_group_refuses_when_full_and_recovers() {
        let g = Group::bounded(2);
        let a = g.issue(1u8).unwrap();
        let _b = g.issue(2u8).unwrap();

        assert_eq!(Some(0), g.remaining());
        assert_eq!(
            Err(GroupError::CapacityExceeded { capacity: 2 }),
            g.issue(3u8).map(|_| ())
        );
        assert_eq!(vec![1, 2], g.to_vec().unwrap());

        drop(a);
        assert_eq!(Some(1), g.remaining());
        let _c = g.issue(3u8).unwrap();
        assert_eq!(vec![2, 3], g.to_vec().unwrap());
    }

    #[test]
    fn zero_capacity_refuses_everything() {
        let g: Group<u8> = Group::bounded(0);
        assert_eq!(
            Err(GroupError::CapacityExceeded { capacity: 0 }),
            g.issue(1).map(|_| ())
        );
        assert!(g.is_empty());
    }

    #[test]
    fn unbounded_has_no_remaining() {
        let g: Group<u8> = Group::new();
        assert_eq!(None, g.remaining());
    }

    #[test]
    fn foreign_membership_is_rejected_and_left_alone() {
        let g = logging();
        let h = logging();
        let mut m = h.issue(1u8).unwrap();

        let locator = m.locator().unwrap();
        assert_eq!(
            Err(GroupError::ContractViolation(Violation::ForeignMembership {
                locator
            })),
            g.revoke(&mut m)
        );
        assert!(!m.is_revoked());
        assert_eq!(vec![1], h.to_vec().unwrap());

        drop(m);
        assert!(h.is_empty());
    }

    #[test]
    #[should_panic(expected = "was issued by a different group")]
    fn foreign_membership_panics_under_panic_policy() {
        let g = Group::with_config(GroupConfig::new().violations(ViolationPolicy::Panic));
        let h = Group::new();
        let mut m = h.issue(1u8).unwrap();

        let _ = g.revoke(&mut m);
    }

    #[test]
    fn double_revoke_through_group_is_reported() {
        let g = logging();
        let mut m = g.issue(1u8).unwrap();

        assert_eq!(Ok(Revocation::Removed(1)), g.revoke(&mut m));
        assert_eq!(Err(GroupError::UseAfterRevoke), g.revoke(&mut m));
        assert!(g.is_empty());
    }

    #[test]
    fn drop_during_iteration_is_deferred() {
        let g = Group::new();
        let a = g.issue(1u8).unwrap();
        let b = g.issue(2u8).unwrap();

        let view = g.iter().unwrap();
        drop(a);
        assert_eq!(1, g.len());
        assert_eq!(Err(GroupError::Busy), g.issue(3u8).map(|_| ()));

        // A second view still sees the roster but hides the revoked one.
        let again = g.iter().unwrap();
        assert_eq!(vec![&2], again.iter().collect::<Vec<_>>());
        drop(again);
        drop(view);

        assert_eq!(vec![2], g.to_vec().unwrap());
        assert_eq!(Ok(Revocation::Removed(2)), b.revoke());
    }

    #[test]
    fn explicit_revoke_during_iteration_is_deferred() {
        let g = Group::new();
        let a = g.issue(1u8).unwrap();

        let view = g.iter().unwrap();
        assert_eq!(Ok(Revocation::Deferred), a.revoke());
        drop(view);

        assert!(g.is_empty());
        assert!(g.to_vec().unwrap().is_empty());
    }

    #[test]
    fn leaked_membership_does_not_panic_under_log_policy() {
        let g = logging();
        mem::forget(g.issue(1u8).unwrap());
        assert_eq!(1, g.len());
        drop(g);
    }

    #[test]
    #[should_panic(expected = "group dropped with 1 participants still present")]
    fn leaked_membership_panics_under_panic_policy() {
        let g = Group::with_config(GroupConfig::new().violations(ViolationPolicy::Panic));
        mem::forget(g.issue(1u8).unwrap());
        drop(g);
    }

    #[test]
    fn scoped_revokes_on_return() {
        let g = Group::new();
        let n = g.scoped(5u8, |m| *m.get().unwrap()).unwrap();

        assert_eq!(5, n);
        assert!(g.is_empty());
    }

    #[test]
    fn debug_lists_participants() {
        let g = Group::new();
        let _a = g.issue(1u8).unwrap();
        let _b = g.issue(2u8).unwrap();

        assert_eq!("[1, 2]", format!("{:?}", g));
    }

    struct Counted(Rc<Cell<usize>>);

    impl Drop for Counted {
        fn drop(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn deferred_revocation_drops_participant_once() {
        let drops = Rc::new(Cell::new(0));
        let g = Group::new();
        let a = g.issue(Counted(drops.clone())).unwrap();
        let b = g.issue(Counted(Rc::new(Cell::new(0)))).unwrap();

        let r = b.get().unwrap();
        drop(a);
        assert_eq!(0, drops.get());
        assert_eq!(1, g.len());
        drop(r);

        // The next group operation applies the queue.
        assert_eq!(1, g.iter().unwrap().len());
        assert_eq!(1, drops.get());

        drop(b);
        drop(g);
        assert_eq!(1, drops.get());
    }

    #[test]
    fn deferred_revocation_under_view_drops_once() {
        let drops = Rc::new(Cell::new(0));
        let g = Group::new();
        let a = g.issue(Counted(drops.clone())).unwrap();

        let view = g.iter().unwrap();
        assert!(matches!(a.revoke(), Ok(Revocation::Deferred)));
        assert_eq!(0, drops.get());
        drop(view);

        assert_eq!(1, drops.get());
        drop(g);
        assert_eq!(1, drops.get());
    }

    #[test]
    fn leaked_view_does_not_count_revoked_participant_as_outstanding() {
        let drops = Rc::new(Cell::new(0));
        let g = Group::with_config(GroupConfig::new().violations(ViolationPolicy::Panic));
        let a = g.issue(Counted(drops.clone())).unwrap();

        mem::forget(g.iter().unwrap());
        drop(a);
        assert_eq!(0, drops.get());

        drop(g);
        assert_eq!(1, drops.get());
    }

    #[test]
    fn remaining_ignores_active_views() {
        let g = Group::bounded(2);
        let _a = g.issue(1u8).unwrap();

        let view = g.iter().unwrap();
        assert_eq!(Some(1), g.remaining());
        assert_eq!(Err(GroupError::Busy), g.issue(2u8).map(|_| ()));
        drop(view);

        assert!(g.issue(2u8).is_ok());
    }
}
