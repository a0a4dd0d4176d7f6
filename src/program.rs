use std::fmt;
use std::sync::Arc;

use ahash::{HashMap, HashMapExt};

use crate::id::ProgramId;

/// Device-side slot of a uniform inside one linked program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub u32);

/// A linked shader program as seen by the draw path.
///
/// Only the uniform table matters here: the state tracker looks matrices up
/// by name once per program and caches the resulting slots. Programs are
/// compared by identity, never by the contents of their uniform tables.
pub struct Program {
    id: ProgramId,
    label: Option<Arc<str>>,
    uniforms: HashMap<Arc<str>, UniformLocation>,
}

impl Program {
    pub fn new(label: Option<&str>) -> Self {
        Self {
            id: ProgramId::next(),
            label: label.map(Arc::from),
            uniforms: HashMap::new(),
        }
    }

    /// Declares a uniform. Redeclaring a name replaces its slot.
    pub fn with_uniform(mut self, name: &str, location: UniformLocation) -> Self {
        self.uniforms.insert(Arc::from(name), location);
        self
    }

    pub fn id(&self) -> ProgramId {
        self.id
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn uniform_location(&self, name: &str) -> Option<UniformLocation> {
        self.uniforms.get(name).copied()
    }

    pub fn uniform_count(&self) -> usize {
        self.uniforms.len()
    }
}

impl PartialEq for Program {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Program {}

impl fmt::Debug for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Program")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("uniforms", &self.uniforms.len())
            .finish()
    }
}

/// Names the state tracker uses to find the matrix uniforms of a program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformNames {
    pub model: Arc<str>,
    pub view: Arc<str>,
    pub projection: Arc<str>,
    pub model_view: Arc<str>,
    pub normal: Arc<str>,
}

impl Default for UniformNames {
    fn default() -> Self {
        Self {
            model: Arc::from("uModelMatrix"),
            view: Arc::from("uViewMatrix"),
            projection: Arc::from("uProjectionMatrix"),
            model_view: Arc::from("uModelViewMatrix"),
            normal: Arc::from("uModelViewNormalMatrix"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Program, UniformLocation};

    #[test]
    fn uniform_lookup_by_name() {
        let program = Program::new(Some("lit"))
            .with_uniform("uModelMatrix", UniformLocation(3))
            .with_uniform("uViewMatrix", UniformLocation(4));

        assert_eq!(
            program.uniform_location("uModelMatrix"),
            Some(UniformLocation(3))
        );
        assert_eq!(program.uniform_location("uProjectionMatrix"), None);
        assert_eq!(program.uniform_count(), 2);
        assert_eq!(program.label(), Some("lit"));
    }

    #[test]
    fn programs_compare_by_identity() {
        let first = Program::new(None).with_uniform("a", UniformLocation(0));
        let second = Program::new(None).with_uniform("a", UniformLocation(0));
        assert_ne!(first, second);
        assert_eq!(first, first);
    }
}
