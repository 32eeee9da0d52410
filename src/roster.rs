use crate::locator::Locator;
use std::mem;

/// A participant's slot while it is linked into the roster.
pub(crate) struct Node<T> {
    pub(crate) prev: usize,
    pub(crate) next: usize,
    generation: u64,
    pub(crate) value: T,
}

enum Slot<T> {
    // Links the free list.
    Vacant { next: usize },
    Occupied(Node<T>),
}

/// Backing store of a `Group`. Participants live in a `Vec` of slots
/// threaded into a doubly linked list in issuance order. Removed slots
/// go onto a free list and are reused before the `Vec` grows, each
/// time under a fresh generation.
pub(crate) struct Roster<T> {
    // Index of the first vacant slot. MAX when there is none.
    vacant: usize,
    // Index of the first participant. MAX when the roster is empty.
    front: usize,
    // Index of the last participant. MAX when the roster is empty.
    back: usize,
    next_generation: u64,
    len_occupied: usize,
    slots: Vec<Slot<T>>,
}

impl<T> Roster<T> {
    pub(crate) fn new() -> Roster<T> {
        Roster::with_capacity(0)
    }

    /// Preallocates room for `capacity` participants. Nothing is put
    /// on the free list until a slot is actually vacated.
    pub(crate) fn with_capacity(capacity: usize) -> Roster<T> {
        Roster {
            vacant: usize::MAX,
            front: usize::MAX,
            back: usize::MAX,
            next_generation: 0,
            len_occupied: 0,
            slots: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len_occupied
    }

    pub(crate) fn front(&self) -> usize {
        self.front
    }

    pub(crate) fn back(&self) -> usize {
        self.back
    }

    pub(crate) fn push_back(&mut self, value: T) -> Locator {
        let locator = self.allocate(self.back, usize::MAX, value);

        match self.back {
            usize::MAX => self.front = locator.ix,
            back => self.node_mut(back).next = locator.ix,
        }
        self.back = locator.ix;

        locator
    }

    pub(crate) fn push_front(&mut self, value: T) -> Locator {
        let locator = self.allocate(usize::MAX, self.front, value);

        match self.front {
            usize::MAX => self.back = locator.ix,
            front => self.node_mut(front).prev = locator.ix,
        }
        self.front = locator.ix;

        locator
    }

    pub(crate) fn get(&self, locator: &Locator) -> Option<&T> {
        self.node(locator).map(|n| &n.value)
    }

    pub(crate) fn get_mut(&mut self, locator: &Locator) -> Option<&mut T> {
        match self.slots.get_mut(locator.ix) {
            Some(Slot::Occupied(n)) if n.generation == locator.generation => Some(&mut n.value),
            _ => None,
        }
    }

    /// Unlinks and returns the participant `locator` refers to. Returns
    /// `None` if the slot is vacant or was refilled under a different
    /// generation; nothing is touched in that case.
    pub(crate) fn remove(&mut self, locator: &Locator) -> Option<T> {
        let (prev, next) = self.node(locator).map(|n| (n.prev, n.next))?;
        let ix = locator.ix;

        let vacated = mem::replace(&mut self.slots[ix], Slot::Vacant { next: self.vacant });
        self.vacant = ix;
        self.len_occupied -= 1;

        if usize::MAX == prev {
            debug_assert_eq!(self.front, ix);
            self.front = next;
        } else {
            self.node_mut(prev).next = next;
        }

        if usize::MAX == next {
            debug_assert_eq!(self.back, ix);
            self.back = prev;
        } else {
            self.node_mut(next).prev = prev;
        }

        match vacated {
            Slot::Occupied(n) => Some(n.value),
            Slot::Vacant { .. } => unreachable!("checked occupied above"),
        }
    }

    /// The locator and node of the linked slot at `ix`. Only valid for
    /// indices reached by following the list.
    pub(crate) fn entry(&self, ix: usize) -> (Locator, &Node<T>) {
        match &self.slots[ix] {
            Slot::Occupied(n) => {
                let locator = Locator {
                    ix,
                    generation: n.generation,
                };
                (locator, n)
            }
            Slot::Vacant { .. } => unreachable!("linked slot {} is vacant", ix),
        }
    }

    fn node(&self, locator: &Locator) -> Option<&Node<T>> {
        match self.slots.get(locator.ix) {
            Some(Slot::Occupied(n)) if n.generation == locator.generation => Some(n),
            _ => None,
        }
    }

    fn node_mut(&mut self, ix: usize) -> &mut Node<T> {
        match &mut self.slots[ix] {
            Slot::Occupied(n) => n,
            Slot::Vacant { .. } => unreachable!("linked slot {} is vacant", ix),
        }
    }

    fn allocate(&mut self, prev: usize, next: usize, value: T) -> Locator {
        // Overflowing a u64 generation needs ten billion issues a second
        // for roughly 58 years. Past that point a stale locator could
        // revoke an unrelated participant, so fail loudly instead.
        let generation = self.next_generation;
        self.next_generation = self
            .next_generation
            .checked_add(1)
            .expect("generation counter overflowed");

        let node = Slot::Occupied(Node {
            prev,
            next,
            generation,
            value,
        });

        let ix = match self.vacant {
            usize::MAX => {
                self.slots.push(node);
                self.slots.len() - 1
            }
            ix => {
                self.vacant = match self.slots[ix] {
                    Slot::Vacant { next } => next,
                    Slot::Occupied(_) => unreachable!("free list slot {} is occupied", ix),
                };
                self.slots[ix] = node;
                ix
            }
        };
        self.len_occupied += 1;

        Locator { ix, generation }
    }
}
