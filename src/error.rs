use thiserror::Error;

/// Structural violations detected while building or drawing a frame.
///
/// Every variant points at a bug in whoever populated the state graph or
/// drove the state tracker; none of them are retried. A frame that returns
/// one of these is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DrawError {
    #[error("state graph node {0} does not exist")]
    MissingNode(usize),
    #[error("render leaf {leaf} points at state graph node {node}, which does not exist")]
    MissingLeafOwner { leaf: usize, node: usize },
    #[error("ancestor walk from state graph node {0} did not reach the root")]
    AncestorCycle(usize),
    #[error("state set stack underflow")]
    StackUnderflow,
    #[error("state set stack index {index} is out of bounds (stack size {len})")]
    StackIndexOutOfBounds { index: usize, len: usize },
}
