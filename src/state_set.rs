use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;

use crate::id::StateSetId;
use crate::program::Program;

/// Discriminant of a [`StateAttribute`]. A state set holds at most one
/// attribute per type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AttributeType {
    Program = 0,
    Blend = 1,
    DepthTest = 2,
    DepthWrite = 3,
    CullFace = 4,
    FrontFace = 5,
    ColorWrites = 6,
}

impl AttributeType {
    pub const COUNT: usize = 7;

    pub const ALL: [AttributeType; Self::COUNT] = [
        AttributeType::Program,
        AttributeType::Blend,
        AttributeType::DepthTest,
        AttributeType::DepthWrite,
        AttributeType::CullFace,
        AttributeType::FrontFace,
        AttributeType::ColorWrites,
    ];

    #[inline]
    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

/// One device-state override.
#[derive(Debug, Clone, PartialEq)]
pub enum StateAttribute {
    Program(Arc<Program>),
    /// `None` disables blending.
    Blend(Option<wgpu::BlendState>),
    /// `None` disables the depth test.
    DepthTest(Option<wgpu::CompareFunction>),
    DepthWrite(bool),
    /// `None` disables face culling.
    CullFace(Option<wgpu::Face>),
    FrontFace(wgpu::FrontFace),
    ColorWrites(wgpu::ColorWrites),
}

impl StateAttribute {
    pub fn attribute_type(&self) -> AttributeType {
        match self {
            StateAttribute::Program(_) => AttributeType::Program,
            StateAttribute::Blend(_) => AttributeType::Blend,
            StateAttribute::DepthTest(_) => AttributeType::DepthTest,
            StateAttribute::DepthWrite(_) => AttributeType::DepthWrite,
            StateAttribute::CullFace(_) => AttributeType::CullFace,
            StateAttribute::FrontFace(_) => AttributeType::FrontFace,
            StateAttribute::ColorWrites(_) => AttributeType::ColorWrites,
        }
    }

    /// Value the device holds when nothing overrides `attribute_type`.
    ///
    /// Programs have no default: once bound, a program stays bound until
    /// another one replaces it.
    pub fn default_for(attribute_type: AttributeType) -> Option<StateAttribute> {
        match attribute_type {
            AttributeType::Program => None,
            AttributeType::Blend => Some(StateAttribute::Blend(None)),
            AttributeType::DepthTest => {
                Some(StateAttribute::DepthTest(Some(wgpu::CompareFunction::Less)))
            }
            AttributeType::DepthWrite => Some(StateAttribute::DepthWrite(true)),
            AttributeType::CullFace => Some(StateAttribute::CullFace(Some(wgpu::Face::Back))),
            AttributeType::FrontFace => Some(StateAttribute::FrontFace(wgpu::FrontFace::Ccw)),
            AttributeType::ColorWrites => Some(StateAttribute::ColorWrites(wgpu::ColorWrites::ALL)),
        }
    }
}

/// How an attribute combines with the same attribute type set elsewhere in
/// the hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Priority {
    /// Descendants replace this value.
    #[default]
    Normal,
    /// This value wins over descendants unless they are `Protected`.
    Override,
    /// This value ignores an ancestor's `Override`.
    Protected,
}

/// Which render bin a leaf lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderingHint {
    /// Inherit the hint of the enclosing state sets.
    #[default]
    Default,
    Opaque,
    Transparent,
}

/// An ordered collection of attribute overrides attached at one point of the
/// scene hierarchy.
///
/// Identity matters: the state graph creates one node per distinct state set
/// instance, so a state set is deliberately not `Clone`. Share it behind an
/// [`Arc`] and do not mutate it once it has been attached to a frame.
pub struct StateSet {
    id: StateSetId,
    attributes: SmallVec<[(StateAttribute, Priority); 4]>,
    rendering_hint: RenderingHint,
}

impl StateSet {
    pub fn new() -> Self {
        Self {
            id: StateSetId::next(),
            attributes: SmallVec::new(),
            rendering_hint: RenderingHint::Default,
        }
    }

    pub fn id(&self) -> StateSetId {
        self.id
    }

    pub fn set_attribute(&mut self, attribute: StateAttribute) {
        self.set_attribute_with_priority(attribute, Priority::Normal);
    }

    /// Sets an attribute, replacing an existing attribute of the same type in
    /// place so the original ordering is kept.
    pub fn set_attribute_with_priority(&mut self, attribute: StateAttribute, priority: Priority) {
        let attribute_type = attribute.attribute_type();
        match self
            .attributes
            .iter_mut()
            .find(|(existing, _)| existing.attribute_type() == attribute_type)
        {
            Some(slot) => *slot = (attribute, priority),
            None => self.attributes.push((attribute, priority)),
        }
    }

    pub fn remove_attribute(&mut self, attribute_type: AttributeType) -> Option<StateAttribute> {
        let position = self
            .attributes
            .iter()
            .position(|(existing, _)| existing.attribute_type() == attribute_type)?;
        Some(self.attributes.remove(position).0)
    }

    pub fn with_attribute(mut self, attribute: StateAttribute) -> Self {
        self.set_attribute(attribute);
        self
    }

    pub fn with_attribute_and_priority(
        mut self,
        attribute: StateAttribute,
        priority: Priority,
    ) -> Self {
        self.set_attribute_with_priority(attribute, priority);
        self
    }

    pub fn set_rendering_hint(&mut self, hint: RenderingHint) {
        self.rendering_hint = hint;
    }

    pub fn with_rendering_hint(mut self, hint: RenderingHint) -> Self {
        self.rendering_hint = hint;
        self
    }

    pub fn rendering_hint(&self) -> RenderingHint {
        self.rendering_hint
    }

    pub fn attribute(&self, attribute_type: AttributeType) -> Option<(&StateAttribute, Priority)> {
        self.attributes
            .iter()
            .find(|(existing, _)| existing.attribute_type() == attribute_type)
            .map(|(attribute, priority)| (attribute, *priority))
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&StateAttribute, Priority)> {
        self.attributes
            .iter()
            .map(|(attribute, priority)| (attribute, *priority))
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

impl Default for StateSet {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StateSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateSet")
            .field("id", &self.id)
            .field("attributes", &self.attributes)
            .field("rendering_hint", &self.rendering_hint)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{AttributeType, Priority, StateAttribute, StateSet};

    #[test]
    fn setting_same_type_replaces_in_place() {
        let mut state_set = StateSet::new()
            .with_attribute(StateAttribute::DepthWrite(false))
            .with_attribute(StateAttribute::Blend(None));

        state_set.set_attribute_with_priority(
            StateAttribute::DepthWrite(true),
            Priority::Override,
        );

        let types: Vec<_> = state_set
            .attributes()
            .map(|(attribute, _)| attribute.attribute_type())
            .collect();
        assert_eq!(types, vec![AttributeType::DepthWrite, AttributeType::Blend]);
        assert_eq!(
            state_set.attribute(AttributeType::DepthWrite),
            Some((&StateAttribute::DepthWrite(true), Priority::Override))
        );
    }

    #[test]
    fn equal_contents_do_not_share_identity() {
        let first = StateSet::new().with_attribute(StateAttribute::Blend(None));
        let second = StateSet::new().with_attribute(StateAttribute::Blend(None));
        assert_ne!(first.id(), second.id());
    }

    #[test]
    fn remove_attribute_returns_previous_value() {
        let mut state_set = StateSet::new().with_attribute(StateAttribute::DepthWrite(false));
        assert_eq!(
            state_set.remove_attribute(AttributeType::DepthWrite),
            Some(StateAttribute::DepthWrite(false))
        );
        assert!(state_set.is_empty());
        assert_eq!(state_set.remove_attribute(AttributeType::DepthWrite), None);
    }

    #[test]
    fn every_type_but_program_has_a_default() {
        for attribute_type in AttributeType::ALL {
            let default = StateAttribute::default_for(attribute_type);
            match attribute_type {
                AttributeType::Program => assert!(default.is_none()),
                _ => assert_eq!(
                    default.map(|attribute| attribute.attribute_type()),
                    Some(attribute_type)
                ),
            }
        }
    }
}
