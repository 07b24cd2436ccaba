//! Best-of series aggregation.
//!
//! A parent match with child games never carries user-entered scores; its
//! scores are projections of the games each side has won, and its result
//! appears once a side reaches the win threshold.

use crate::model::{series_win_threshold, Match, MatchGame, SlotSide, Status};

/// Outcome of a series given its games so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Decision {
    /// More games are needed.
    Pending,
    /// The side reached the threshold (or holds the majority once every
    /// game has been played).
    Won(SlotSide),
    /// Every game was played and neither side holds a majority.
    Drawn,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct SeriesOutcome {
    pub wins1: u32,
    pub wins2: u32,
    pub decision: Decision,
    pub any_completed: bool,
    /// Whether any game has been started (scored, completed or forfeited).
    pub any_started: bool,
}

pub(crate) fn evaluate(parent: &Match, games: &[MatchGame]) -> SeriesOutcome {
    let id1 = parent.opponent1.participant_id();
    let id2 = parent.opponent2.participant_id();
    let mut wins1 = 0u32;
    let mut wins2 = 0u32;
    let mut any_completed = false;
    let mut any_started = false;
    let mut all_played = true;
    for game in games {
        if game.opponent1.has_outcome() || game.opponent2.has_outcome() {
            any_started = true;
        }
        match game.status {
            Status::Completed => {
                any_completed = true;
                match game.winner_id() {
                    Some(winner) if Some(winner) == id1 => wins1 += 1,
                    Some(winner) if Some(winner) == id2 => wins2 += 1,
                    _ => {}
                }
            }
            // Archived games were cut short by an earlier decision.
            Status::Archived => {}
            _ => all_played = false,
        }
    }
    let threshold = series_win_threshold(parent.child_count);
    let decision = if wins1 >= threshold {
        Decision::Won(SlotSide::One)
    } else if wins2 >= threshold {
        Decision::Won(SlotSide::Two)
    } else if all_played && any_completed {
        match wins1.cmp(&wins2) {
            std::cmp::Ordering::Greater => Decision::Won(SlotSide::One),
            std::cmp::Ordering::Less => Decision::Won(SlotSide::Two),
            std::cmp::Ordering::Equal => Decision::Drawn,
        }
    } else {
        Decision::Pending
    };
    SeriesOutcome {
        wins1,
        wins2,
        decision,
        any_completed,
        any_started,
    }
}
