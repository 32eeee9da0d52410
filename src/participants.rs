use crate::group::Group;
use crate::locator::Locator;
use crate::roster::Roster;
use std::cell::Ref;

/// A read-only view over the participants of a `Group`. It is
/// constructed from the [`iter`] method on `Group`.
///
/// The view reflects the group as it was when the view was created.
/// Memberships revoked while it is alive are queued and applied when
/// the view is dropped.
///
/// [`iter`]: struct.Group.html#method.iter
pub struct Participants<'g, T> {
    group: &'g Group<T>,
    // Released in `drop` before the queued revocations are applied.
    roster: Option<Ref<'g, Roster<T>>>,
    // Locators revoked but not yet removed from the roster.
    hidden: Vec<Locator>,
}

impl<'g, T> Participants<'g, T> {
    pub(crate) fn new(
        group: &'g Group<T>,
        roster: Ref<'g, Roster<T>>,
        hidden: Vec<Locator>,
    ) -> Self {
        Self {
            group,
            roster: Some(roster),
            hidden,
        }
    }

    /// Iterate the participants in issuance order. The iterator is
    /// double ended; `.rev()` walks from the most recent participant.
    pub fn iter(&self) -> Iter<'_, T> {
        let roster = self.roster();
        Iter {
            roster,
            hidden: &self.hidden,
            front: roster.front(),
            back: roster.back(),
            remaining: roster.len(),
        }
    }

    /// The number of participants the view yields.
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
    /// assert_eq!(2, g.iter().unwrap().len());
    /// ```
    pub fn len(&self) -> usize {
        self.roster().len() - self.hidden.len()
    }

    /// # Examples
    ///
    /// ```
    /// use membership_group::Group;
    ///
    /// let g: Group<u8> = Group::new();
    /// assert!(g.iter().unwrap().is_empty());
    /// ```
    pub fn is_empty(&self) -> bool {
        0 == self.len()
    }

    fn roster(&self) -> &Roster<T> {
        self.roster
            .as_ref()
            .expect("roster is held until the view is dropped")
    }
}

impl<'g, T> Drop for Participants<'g, T> {
    fn drop(&mut self) {
        self.roster.take();
        self.group.flush_deferred();
    }
}

impl<'p, 'g, T> IntoIterator for &'p Participants<'g, T> {
    type Item = &'p T;
    type IntoIter = Iter<'p, T>;

    fn into_iter(self) -> Iter<'p, T> {
        self.iter()
    }
}

/// An iterator over a `Participants` view. It is constructed from the
/// [`iter`] method on `Participants`.
///
/// [`iter`]: struct.Participants.html#method.iter
pub struct Iter<'p, T> {
    roster: &'p Roster<T>,
    hidden: &'p [Locator],
    front: usize,
    back: usize,
    // Linked slots not yet visited from either end.
    remaining: usize,
}

impl<'p, T> Iterator for Iter<'p, T> {
    type Item = &'p T;

    fn next(&mut self) -> Option<Self::Item> {
        while 0 != self.remaining {
            debug_assert_ne!(usize::MAX, self.front);
            let (locator, o) = self.roster.entry(self.front);
            self.front = o.next;
            self.remaining -= 1;

            if !self.hidden.contains(&locator) {
                return Some(&o.value);
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining))
    }
}

impl<'p, T> DoubleEndedIterator for Iter<'p, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        while 0 != self.remaining {
            debug_assert_ne!(usize::MAX, self.back);
            let (locator, o) = self.roster.entry(self.back);
            self.back = o.prev;
            self.remaining -= 1;

            if !self.hidden.contains(&locator) {
                return Some(&o.value);
            }
        }
        None
    }
}

#[cfg(test)]
mod test {
    use crate::group::Group;

    #[test]
    fn filter_can_find_participants() {
        let g = Group::new();
        let _a = g.issue(10u8).unwrap();
        let _b = g.issue(11u8).unwrap();
        let _c = g.issue(12u8).unwrap();

        let view = g.iter().unwrap();
        assert_eq!(Some(&10), view.iter().find(|i| **i == 10));
        assert_eq!(Some(&12), view.iter().find(|i| **i == 12));
        assert_eq!(None, view.iter().find(|i| **i == 13));
    }

    #[test]
    fn both_ends_meet_without_overlap() {
        let g = Group::new();
        let _ms: Vec<_> = (1u8..=5).map(|i| g.issue(i).unwrap()).collect();

        let view = g.iter().unwrap();
        let mut it = view.iter();

        assert_eq!(Some(&1), it.next());
        assert_eq!(Some(&5), it.next_back());
        assert_eq!(Some(&2), it.next());
        assert_eq!(Some(&4), it.next_back());
        assert_eq!(Some(&3), it.next());
        assert_eq!(None, it.next_back());
        assert_eq!(None, it.next());
    }

    #[test]
    fn view_is_restartable() {
        let g = Group::new();
        let a = g.issue(1u8).unwrap();
        let _b = g.issue(2u8).unwrap();

        let first: Vec<u8> = g.iter().unwrap().iter().cloned().collect();
        drop(a);
        let second: Vec<u8> = g.iter().unwrap().iter().cloned().collect();

        assert_eq!(vec![1, 2], first);
        assert_eq!(vec![2], second);
    }

    #[test]
    fn revoked_while_viewed_is_hidden_from_later_views() {
        let g = Group::new();
        let a = g.issue(1u8).unwrap();
        let _b = g.issue(2u8).unwrap();
        let _c = g.issue(3u8).unwrap();

        let outer = g.iter().unwrap();
        drop(a);

        let inner = g.iter().unwrap();
        assert_eq!(2, inner.len());
        assert_eq!(vec![&2, &3], (&inner).into_iter().collect::<Vec<_>>());
        assert_eq!(vec![&3, &2], inner.iter().rev().collect::<Vec<_>>());

        // The older view keeps its snapshot.
        assert_eq!(3, outer.len());
        drop(inner);
        drop(outer);

        assert_eq!(vec![2, 3], g.to_vec().unwrap());
    }

    #[test]
    fn dropping_view_applies_queued_revocations() {
        let g = Group::new();
        let a = g.issue(1u8).unwrap();

        let view = g.iter().unwrap();
        drop(a);
        assert!(!view.is_empty());
        drop(view);

        assert!(g.iter().unwrap().is_empty());
    }
}
