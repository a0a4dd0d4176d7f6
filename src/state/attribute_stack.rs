use smallvec::SmallVec;

use crate::state_set::{AttributeType, Priority, StateAttribute};

/// Per-attribute-type view of the pushed state sets plus the value the
/// device currently holds for that type.
#[derive(Debug)]
pub(super) struct AttributeStack {
    entries: SmallVec<[(StateAttribute, Priority); 4]>,
    default: Option<StateAttribute>,
    applied: Option<StateAttribute>,
}

impl AttributeStack {
    pub(super) fn with_default(attribute_type: AttributeType) -> Self {
        let default = StateAttribute::default_for(attribute_type);
        Self {
            entries: SmallVec::new(),
            applied: default.clone(),
            default,
        }
    }

    /// Pushes a value. An `Override` on top is carried forward instead,
    /// unless the new value is `Protected`.
    pub(super) fn push(&mut self, attribute: &StateAttribute, priority: Priority) {
        let entry = match self.entries.last() {
            Some((top, Priority::Override)) if priority != Priority::Protected => {
                (top.clone(), Priority::Override)
            }
            _ => (attribute.clone(), priority),
        };
        self.entries.push(entry);
    }

    pub(super) fn pop(&mut self) {
        self.entries.pop();
    }

    pub(super) fn clear_entries(&mut self) {
        self.entries.clear();
    }

    #[cfg(test)]
    pub(super) fn depth(&self) -> usize {
        self.entries.len()
    }

    /// Value the device should hold once `local` is applied on top of the
    /// stack. Falls back to the type's default; `None` only for types
    /// without one.
    pub(super) fn resolve<'a>(
        &'a self,
        local: Option<(&'a StateAttribute, Priority)>,
    ) -> Option<&'a StateAttribute> {
        match (self.entries.last(), local) {
            (Some((top, Priority::Override)), Some((_, priority)))
                if priority != Priority::Protected =>
            {
                Some(top)
            }
            (_, Some((attribute, _))) => Some(attribute),
            (Some((top, _)), None) => Some(top),
            (None, None) => self.default.as_ref(),
        }
    }

    pub(super) fn applied(&self) -> Option<&StateAttribute> {
        self.applied.as_ref()
    }

    pub(super) fn set_applied(&mut self, attribute: Option<StateAttribute>) {
        self.applied = attribute;
    }
}
