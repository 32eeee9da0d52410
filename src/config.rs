/// How many participants a group may hold at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capacity {
    Unbounded,
    /// `issue` fails with `CapacityExceeded` once this many
    /// participants are present.
    Bounded(usize),
}

impl Default for Capacity {
    fn default() -> Self {
        Capacity::Unbounded
    }
}

/// Where `issue` places a new participant in the iteration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insertion {
    Back,
    Front,
}

impl Default for Insertion {
    fn default() -> Self {
        Insertion::Back
    }
}

/// What a group does when it detects misuse: a double revocation, a
/// handle presented to the wrong group, a stale locator, or being
/// dropped while participants are still present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationPolicy {
    /// Panic with the violation as the message.
    Panic,
    /// Emit a `tracing` error event and treat the call as a no-op that
    /// returns the error.
    Log,
}

impl Default for ViolationPolicy {
    /// `Panic` when built with debug assertions, `Log` otherwise.
    fn default() -> Self {
        if cfg!(debug_assertions) {
            ViolationPolicy::Panic
        } else {
            ViolationPolicy::Log
        }
    }
}

/// Construction options for a `Group`.
///
/// # Examples
///
/// ```
/// use membership_group::{Capacity, Group, GroupConfig, Insertion, ViolationPolicy};
///
/// let config = GroupConfig::new()
///     .bounded(8)
///     .insertion(Insertion::Front)
///     .violations(ViolationPolicy::Log);
///
/// let group: Group<u32> = Group::with_config(config);
/// assert_eq!(Capacity::Bounded(8), group.config().capacity);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupConfig {
    pub capacity: Capacity,
    pub insertion: Insertion,
    pub violations: ViolationPolicy,
}

impl GroupConfig {
    /// The default options: unbounded, appending, and the build's
    /// default `ViolationPolicy`.
    ///
    /// # Examples
    ///
    /// ```
    /// use membership_group::{Capacity, GroupConfig, Insertion};
    ///
    /// let c = GroupConfig::new();
    /// assert_eq!(Capacity::Unbounded, c.capacity);
    /// assert_eq!(Insertion::Back, c.insertion);
    /// ```
    pub fn new() -> GroupConfig {
        GroupConfig::default()
    }

    /// # Examples
    ///
    /// ```
    /// use membership_group::{Capacity, GroupConfig};
    ///
    /// let c = GroupConfig::new().capacity(Capacity::Bounded(3));
    /// assert_eq!(Capacity::Bounded(3), c.capacity);
    /// ```
    pub fn capacity(mut self, capacity: Capacity) -> GroupConfig {
        self.capacity = capacity;
        self
    }

    /// Shorthand for `capacity(Capacity::Bounded(capacity))`.
    ///
    /// # Examples
    ///
    /// ```
    /// use membership_group::{Capacity, GroupConfig};
    ///
    /// assert_eq!(
    ///     GroupConfig::new().capacity(Capacity::Bounded(2)),
    ///     GroupConfig::new().bounded(2)
    /// );
    /// ```
    pub fn bounded(self, capacity: usize) -> GroupConfig {
        self.capacity(Capacity::Bounded(capacity))
    }

    /// # Examples
    ///
    /// ```
    /// use membership_group::{GroupConfig, Insertion};
    ///
    /// let c = GroupConfig::new().insertion(Insertion::Front);
    /// assert_eq!(Insertion::Front, c.insertion);
    /// ```
    pub fn insertion(mut self, insertion: Insertion) -> GroupConfig {
        self.insertion = insertion;
        self
    }

    /// # Examples
    ///
    /// ```
    /// use membership_group::{GroupConfig, ViolationPolicy};
    ///
    /// let c = GroupConfig::new().violations(ViolationPolicy::Log);
    /// assert_eq!(ViolationPolicy::Log, c.violations);
    /// ```
    pub fn violations(mut self, violations: ViolationPolicy) -> GroupConfig {
        self.violations = violations;
        self
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults_are_unbounded_and_append() {
        let c = GroupConfig::new();
        assert_eq!(Capacity::Unbounded, c.capacity);
        assert_eq!(Insertion::Back, c.insertion);
    }

    #[test]
    fn debug_builds_panic_on_violation() {
        if cfg!(debug_assertions) {
            assert_eq!(ViolationPolicy::Panic, ViolationPolicy::default());
        } else {
            assert_eq!(ViolationPolicy::Log, ViolationPolicy::default());
        }
    }

    #[test]
    fn builder_overrides_fields() {
        let c = GroupConfig::new()
            .bounded(2)
            .insertion(Insertion::Front)
            .violations(ViolationPolicy::Log);

        assert_eq!(Capacity::Bounded(2), c.capacity);
        assert_eq!(Insertion::Front, c.insertion);
        assert_eq!(ViolationPolicy::Log, c.violations);
    }
}
