//! Build-cycle revisions.

/// A monotonically increasing build-cycle counter.
///
/// Each cached value remembers the revision it last changed at; a dependent
/// computation is current when it was verified at or after the latest
/// `changed_at` of all its inputs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Revision(u64);

impl Revision {
    /// The revision before any build cycle has run.
    pub const ZERO: Revision = Revision(0);

    /// The next revision.
    #[must_use]
    pub fn next(self) -> Revision {
        Revision(self.0 + 1)
    }
}

impl std::fmt::Display for Revision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "r{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering() {
        let r0 = Revision::ZERO;
        let r1 = r0.next();
        assert!(r1 > r0);
        assert_eq!(r1, Revision::ZERO.next());
    }
}
