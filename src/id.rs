use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_STATE_SET_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_PROGRAM_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a [`crate::StateSet`] instance.
///
/// Two state sets with identical contents still get different ids; the
/// state graph keys its children on this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateSetId(pub u64);

impl StateSetId {
    pub(crate) fn next() -> Self {
        Self(NEXT_STATE_SET_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for StateSetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a linked shader [`crate::Program`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramId(pub u64);

impl ProgramId {
    pub(crate) fn next() -> Self {
        Self(NEXT_PROGRAM_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ProgramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Caller-chosen handle for a piece of geometry, echoed back in every
/// [`crate::DrawCall`] issued for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GeometryId(pub u64);

impl fmt::Display for GeometryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::{ProgramId, StateSetId};

    #[test]
    fn generated_ids_are_unique() {
        let first = StateSetId::next();
        let second = StateSetId::next();
        assert_ne!(first, second);
        assert!(second > first);

        assert_ne!(ProgramId::next(), ProgramId::next());
    }
}
