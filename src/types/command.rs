//! Command responses

use serde::{Deserialize, Serialize};

/// Successful resolution of a command request.
///
/// The server answers in one of two shapes: a 4-byte status code, or a text
/// payload of any other length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandOutcome {
    /// Status code zero
    Success,
    /// Non-zero status code
    Error { code: i32 },
    /// Text response
    Text(String),
}

impl CommandOutcome {
    pub fn from_status(code: i32) -> Self {
        if code == 0 { CommandOutcome::Success } else { CommandOutcome::Error { code } }
    }

    /// `true` for a zero status code or any text response.
    pub fn is_success(&self) -> bool {
        !matches!(self, CommandOutcome::Error { .. })
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            CommandOutcome::Text(text) => Some(text),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_map_to_outcomes() {
        assert_eq!(CommandOutcome::from_status(0), CommandOutcome::Success);
        assert_eq!(CommandOutcome::from_status(1), CommandOutcome::Error { code: 1 });
        assert!(CommandOutcome::from_status(0).is_success());
        assert!(!CommandOutcome::from_status(3).is_success());
        assert!(CommandOutcome::Text("ok".into()).is_success());
        assert_eq!(CommandOutcome::Text("ok".into()).text(), Some("ok"));
    }
}
