/// Observed broadcast state of a streamer, either persisted (last tick) or
/// fresh (this tick's fetch).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveState {
    Offline,
    Live,
}

impl LiveState {
    pub fn from_flag(is_live: bool) -> Self {
        if is_live {
            LiveState::Live
        } else {
            LiveState::Offline
        }
    }
}

/// The decision table of the reconciliation engine: previous state vs.
/// current state. Steady states are re-entered every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Offline before, offline now. Nothing to do.
    None,
    /// Went live: send a fresh notification card, snapshot the session.
    WentLive,
    /// Still live: refresh the card's metadata fields in place.
    StillLive,
    /// Went offline: rewrite the card into a session summary, clear the
    /// snapshot.
    WentOffline,
}

impl Transition {
    pub fn between(previous: LiveState, current: LiveState) -> Self {
        match (previous, current) {
            (LiveState::Offline, LiveState::Offline) => Transition::None,
            (LiveState::Offline, LiveState::Live) => Transition::WentLive,
            (LiveState::Live, LiveState::Live) => Transition::StillLive,
            (LiveState::Live, LiveState::Offline) => Transition::WentOffline,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_table_covers_all_four_cases() {
        assert_eq!(
            Transition::between(LiveState::Offline, LiveState::Offline),
            Transition::None
        );
        assert_eq!(
            Transition::between(LiveState::Offline, LiveState::Live),
            Transition::WentLive
        );
        assert_eq!(
            Transition::between(LiveState::Live, LiveState::Live),
            Transition::StillLive
        );
        assert_eq!(
            Transition::between(LiveState::Live, LiveState::Offline),
            Transition::WentOffline
        );
    }

    #[test]
    fn live_state_from_flag() {
        assert_eq!(LiveState::from_flag(true), LiveState::Live);
        assert_eq!(LiveState::from_flag(false), LiveState::Offline);
    }
}
