//! Error types of the net model and of the analyses.

use thiserror::Error;

use crate::net::NodeKind;

/// Structural validation failure, reported while a net is being built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetError {
    #[error("node id {0:?} is already used")]
    DuplicateId(String),
    #[error("arc references unknown node {0:?}")]
    UnknownNode(String),
    #[error("arc {from:?} -> {to:?} connects two nodes of kind {kind}")]
    SameKind {
        from: String,
        to: String,
        kind: NodeKind,
    },
    #[error("arc {from:?} -> {to:?} has zero weight")]
    ZeroWeight { from: String, to: String },
    #[error("place {place:?} has {tokens} initial tokens, at most 1 is supported")]
    InitialTokens { place: String, tokens: u32 },
}

/// Analysis failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("invalid net: {0}")]
    Net(#[from] NetError),
    #[error("state limit of {limit} markings exceeded")]
    StateLimit { limit: usize },
    #[error("no fixed point after {limit} iterations")]
    IterationLimit { limit: usize },
    #[error("net is not 1-safe: transition {transition:?} puts a second token on place {place:?}")]
    Unsafe { transition: String, place: String },
    #[error("transition {0:?} is not enabled under the supplied marking")]
    NotEnabled(String),
    #[error("transition index {0} is out of bounds")]
    UnknownTransition(usize),
    #[error("marking has {actual} entries, the net has {expected} places")]
    MarkingLength { expected: usize, actual: usize },
    #[error("got {actual} weights for {expected} places")]
    WeightLength { expected: usize, actual: usize },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_messages() {
        let err = Error::from(NetError::DuplicateId("p1".to_string()));
        assert_eq!(err.to_string(), "invalid net: node id \"p1\" is already used");

        let err = NetError::SameKind {
            from: "p1".to_string(),
            to: "p2".to_string(),
            kind: NodeKind::Place,
        };
        assert_eq!(err.to_string(), "arc \"p1\" -> \"p2\" connects two nodes of kind place");

        let err = Error::StateLimit { limit: 10 };
        assert_eq!(err.to_string(), "state limit of 10 markings exceeded");
    }
}
