//! The inbox cursor advancement rule.
//!
//! The cursor (the swarm's "last hash") only ever moves to a value the
//! inbox transport itself returned, and only when that value is non-empty
//! and different from the current one. An equal value means "nothing new";
//! an empty value means the transport had no position to report. Neither
//! advances the cursor, so subscribers never see a repeat of the value
//! they already hold.

use petrel_types::PollCursor;

/// Tracks the current inbox read position and decides when it advances.
///
/// The poll loop is the only writer. It asks [`should_advance`] first so
/// the cursor-update event can be published before the position moves,
/// then commits with [`advance`].
///
/// [`should_advance`]: CursorState::should_advance
/// [`advance`]: CursorState::advance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorState {
    current: PollCursor,
}

impl CursorState {
    /// Create a tracker starting at the given position.
    ///
    /// Pass the persisted cursor when resuming, [`PollCursor::empty`] for
    /// a fresh identity.
    pub fn new(initial: PollCursor) -> Self {
        Self { current: initial }
    }

    /// The current read position.
    pub fn current(&self) -> &PollCursor {
        &self.current
    }

    /// Whether a cursor returned by the transport advances the position.
    pub fn should_advance(&self, returned: &PollCursor) -> bool {
        !returned.is_empty() && *returned != self.current
    }

    /// Commit a new position.
    pub fn advance(&mut self, to: PollCursor) {
        self.current = to;
    }

    /// Consume the tracker, yielding the final position.
    pub fn into_inner(self) -> PollCursor {
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Run a sequence of returned cursors through the rule the way the
    /// poll loop does, collecting the values that would be published.
    fn published(initial: &str, returned: &[&str]) -> Vec<String> {
        let mut state = CursorState::new(PollCursor::new(initial));
        let mut out = Vec::new();
        for value in returned {
            let cursor = PollCursor::new(*value);
            if state.should_advance(&cursor) {
                out.push(cursor.as_str().to_string());
                state.advance(cursor);
            }
        }
        out
    }

    #[test]
    fn fresh_state_advances_on_first_value() {
        let state = CursorState::new(PollCursor::empty());
        assert!(state.should_advance(&PollCursor::new("h1")));
    }

    #[test]
    fn equal_value_does_not_advance() {
        let state = CursorState::new(PollCursor::new("h1"));
        assert!(!state.should_advance(&PollCursor::new("h1")));
    }

    #[test]
    fn empty_value_does_not_advance() {
        let state = CursorState::new(PollCursor::new("h1"));
        assert!(!state.should_advance(&PollCursor::empty()));
    }

    #[test]
    fn distinct_values_publish_in_order() {
        assert_eq!(published("", &["h1", "h2", "h3"]), vec!["h1", "h2", "h3"]);
    }

    #[test]
    fn repeats_of_current_are_silent() {
        assert_eq!(published("", &["h1", "h1", "h1", "h2", "h2"]), vec!["h1", "h2"]);
    }

    #[test]
    fn revisited_value_publishes_again() {
        // Only repeats of the immediately prior value are suppressed; a
        // server that swings back to an older hash is a real change.
        assert_eq!(published("", &["h1", "h2", "h1"]), vec!["h1", "h2", "h1"]);
    }

    #[test]
    fn empty_values_never_publish() {
        assert_eq!(published("", &["", "h1", "", "h2", ""]), vec!["h1", "h2"]);
    }

    #[test]
    fn resumed_state_skips_persisted_value() {
        assert_eq!(published("h5", &["h5", "h6"]), vec!["h6"]);
    }

    #[test]
    fn into_inner_yields_final_position() {
        let mut state = CursorState::new(PollCursor::empty());
        state.advance(PollCursor::new("h9"));
        assert_eq!(state.into_inner(), PollCursor::new("h9"));
    }
}
