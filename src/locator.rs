use std::fmt;

/// Identifies the slot a participant occupies inside a `Group`. It
/// pairs the slot index with the generation the slot was filled in,
/// so a locator whose participant has been revoked can never refer to
/// a newer participant that came to inhabit the same slot.
///
/// Locators can only be produced by the group itself. They are
/// exposed for diagnostics (see [`Membership::locator`]) and carry no
/// authority on their own.
///
/// [`Membership::locator`]: struct.Membership.html#method.locator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Locator {
    pub(crate) ix: usize,
    pub(crate) generation: u64,
}

impl fmt::Display for Locator {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "#{}@{}", self.ix, self.generation)
    }
}
