//! Fatal instrumentation errors
//!
//! Soft outcomes (file ignored by directive, file already instrumented) are
//! not errors; they are reported through the pass status.

use crate::location::Location;
use crate::node::NodeKind;

#[derive(Debug, thiserror::Error)]
pub enum InstrumentError {
    /// A counter had to be placed before a statement that is not part of any
    /// statement list
    #[error("unable to insert counter for node type {kind}{}", at(.location))]
    UnsupportedNode {
        kind: NodeKind,
        location: Option<Location>,
    },

    #[error("switch case visited without a branch registered on its switch{}", at(.location))]
    MissingSwitchBranch { location: Option<Location> },

    #[error("unknown branch index {index}")]
    UnknownBranch { index: usize },

    #[error("coverage map for {path} is frozen")]
    Frozen { path: String },

    #[error("failed to serialize coverage data: {0}")]
    Serialize(#[from] serde_json::Error),
}

fn at(location: &Option<Location>) -> String {
    match location {
        Some(loc) => format!(" at {loc}"),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::Position;

    #[test]
    fn test_messages_carry_kind_and_location() {
        let err = InstrumentError::UnsupportedNode {
            kind: NodeKind::Return,
            location: Some(Location::new(Position::new(3, 4), Position::new(3, 10))),
        };
        assert_eq!(
            err.to_string(),
            "unable to insert counter for node type ReturnStatement at 3:4"
        );

        let err = InstrumentError::MissingSwitchBranch { location: None };
        assert_eq!(
            err.to_string(),
            "switch case visited without a branch registered on its switch"
        );
    }
}
