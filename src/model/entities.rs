//! Persisted entities: tournaments, stages, groups, rounds, matches and games.

use serde::{Deserialize, Serialize};

use super::settings::StageSettings;
use super::settings::StageType;

/// Tournament ID type
pub type TournamentId = i64;
/// Stage ID type
pub type StageId = i64;
/// Group ID type
pub type GroupId = i64;
/// Round ID type
pub type RoundId = i64;
/// Match ID type
pub type MatchId = i64;
/// Match game ID type
pub type MatchGameId = i64;
/// Participant ID type
pub type ParticipantId = i64;

/// Opaque grouping of stages and participants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tournament {
    pub id: TournamentId,
    pub name: String,
}

/// A registered participant. Participants belong to the tournament and
/// survive stage deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub tournament_id: TournamentId,
    pub name: String,
}

/// A tournament phase with a single bracket structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    pub id: StageId,
    pub tournament_id: TournamentId,
    pub name: String,
    pub stage_type: StageType,
    /// 1-based position of the stage within its tournament.
    pub number: u32,
    pub settings: StageSettings,
}

/// Subdivision of a stage.
///
/// The meaning of `number` depends on the stage type: round-robin pools are
/// numbered `1..=group_count`; in single elimination `1` is the main bracket
/// and `2` the consolation final; in double elimination `1` is the winner
/// bracket, `2` the loser bracket and `3` the grand final.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub stage_id: StageId,
    pub number: u32,
}

/// A set of concurrently-playable matches within a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    pub id: RoundId,
    pub stage_id: StageId,
    pub group_id: GroupId,
    pub number: u32,
}

/// Lifecycle status of a match or match game, ordered by progress.
///
/// The engine only ever moves a match forward through this order; going
/// backwards requires an explicit reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// At least one opponent is unknown and cannot be determined yet.
    Locked,
    /// One opponent is determined, the other is still pending upstream.
    Waiting,
    /// Both opponents are determined and no score has been recorded.
    Ready,
    /// A score has been recorded but no result yet.
    Running,
    /// A result has been recorded (or the match was decided by a BYE).
    Completed,
    /// The match is frozen and rejects further updates.
    Archived,
}

/// Outcome recorded for one side of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SideResult {
    Win,
    Draw,
    Loss,
}

/// A concrete participant occupying one side of a match, with any outcome
/// recorded for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Side {
    pub id: ParticipantId,
    /// Source position this side was filled from: the seed position for
    /// entrant slots, or the feeding match number for propagated slots.
    #[serde(default)]
    pub position: Option<u32>,
    #[serde(default)]
    pub score: Option<u32>,
    #[serde(default)]
    pub result: Option<SideResult>,
    #[serde(default)]
    pub forfeit: bool,
}

impl Side {
    /// A side holding a participant with no outcome yet.
    pub fn new(id: ParticipantId) -> Self {
        Side {
            id,
            position: None,
            score: None,
            result: None,
            forfeit: false,
        }
    }

    /// Attach the source position this side was filled from.
    pub fn at_position(mut self, position: u32) -> Self {
        self.position = Some(position);
        self
    }

    /// Whether any outcome (score, result or forfeit) has been recorded.
    pub fn has_outcome(&self) -> bool {
        self.score.is_some() || self.result.is_some() || self.forfeit
    }
}

/// One side of a match: a BYE, a placeholder for a future participant, or a
/// concrete participant.
///
/// Modeling the three cases as a sum type keeps "missing opponent" and
/// "opponent not yet known" impossible to confuse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Slot {
    /// Absent opponent; the other side advances automatically.
    Bye,
    /// The participant that will arrive from the given source position.
    Position { position: u32 },
    /// A concrete participant.
    Entry(Side),
}

impl Slot {
    pub fn entry(id: ParticipantId) -> Self {
        Slot::Entry(Side::new(id))
    }

    pub fn is_bye(&self) -> bool {
        matches!(self, Slot::Bye)
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Slot::Position { .. })
    }

    pub fn participant_id(&self) -> Option<ParticipantId> {
        match self {
            Slot::Entry(side) => Some(side.id),
            _ => None,
        }
    }

    pub fn as_side(&self) -> Option<&Side> {
        match self {
            Slot::Entry(side) => Some(side),
            _ => None,
        }
    }

    pub fn as_side_mut(&mut self) -> Option<&mut Side> {
        match self {
            Slot::Entry(side) => Some(side),
            _ => None,
        }
    }

    /// Source position of a placeholder or of a filled entry that recorded one.
    pub fn position(&self) -> Option<u32> {
        match self {
            Slot::Position { position } => Some(*position),
            Slot::Entry(side) => side.position,
            Slot::Bye => None,
        }
    }

    /// Whether any outcome has been recorded on this side.
    pub fn has_outcome(&self) -> bool {
        self.as_side().is_some_and(Side::has_outcome)
    }
}

/// Identifies one of the two sides of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotSide {
    One,
    Two,
}

impl SlotSide {
    pub fn other(self) -> SlotSide {
        match self {
            SlotSide::One => SlotSide::Two,
            SlotSide::Two => SlotSide::One,
        }
    }
}

/// A two-sided contest. May aggregate `child_count` child games into a
/// best-of series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub stage_id: StageId,
    pub group_id: GroupId,
    pub round_id: RoundId,
    /// 1-based position within the round.
    pub number: u32,
    pub child_count: u32,
    pub status: Status,
    pub opponent1: Slot,
    pub opponent2: Slot,
}

impl Match {
    pub fn slot(&self, side: SlotSide) -> &Slot {
        match side {
            SlotSide::One => &self.opponent1,
            SlotSide::Two => &self.opponent2,
        }
    }

    pub fn slot_mut(&mut self, side: SlotSide) -> &mut Slot {
        match side {
            SlotSide::One => &mut self.opponent1,
            SlotSide::Two => &mut self.opponent2,
        }
    }

    /// The side holding the winning participant, if the match is decided.
    ///
    /// Forfeits dominate recorded results: a side that forfeited loses even
    /// if scores were also recorded. A double forfeit, a draw or a
    /// double-BYE decides the match without a winner.
    pub fn winner_side(&self) -> Option<SlotSide> {
        winner_side_of(&self.opponent1, &self.opponent2)
    }

    pub fn winner_id(&self) -> Option<ParticipantId> {
        self.winner_side()
            .and_then(|side| self.slot(side).participant_id())
    }

    pub fn loser_id(&self) -> Option<ParticipantId> {
        self.winner_side()
            .and_then(|side| self.slot(side.other()).participant_id())
    }
}

/// A sub-match of a best-of series. Game slots mirror the parent's sides
/// and resolve together with them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchGame {
    pub id: MatchGameId,
    pub parent_id: MatchId,
    /// 1-based position within the series.
    pub number: u32,
    pub status: Status,
    pub opponent1: Slot,
    pub opponent2: Slot,
}

impl MatchGame {
    pub fn slot(&self, side: SlotSide) -> &Slot {
        match side {
            SlotSide::One => &self.opponent1,
            SlotSide::Two => &self.opponent2,
        }
    }

    pub fn slot_mut(&mut self, side: SlotSide) -> &mut Slot {
        match side {
            SlotSide::One => &mut self.opponent1,
            SlotSide::Two => &mut self.opponent2,
        }
    }

    pub fn winner_side(&self) -> Option<SlotSide> {
        winner_side_of(&self.opponent1, &self.opponent2)
    }

    pub fn winner_id(&self) -> Option<ParticipantId> {
        self.winner_side().and_then(|side| match side {
            SlotSide::One => self.opponent1.participant_id(),
            SlotSide::Two => self.opponent2.participant_id(),
        })
    }
}

/// Winner of a two-slot contest. Forfeits dominate recorded results.
pub(crate) fn winner_side_of(opponent1: &Slot, opponent2: &Slot) -> Option<SlotSide> {
    let forfeit1 = opponent1.as_side().is_some_and(|s| s.forfeit);
    let forfeit2 = opponent2.as_side().is_some_and(|s| s.forfeit);
    match (forfeit1, forfeit2) {
        (true, true) => return None,
        (true, false) if opponent2.as_side().is_some() => return Some(SlotSide::Two),
        (false, true) if opponent1.as_side().is_some() => return Some(SlotSide::One),
        _ => {}
    }
    if opponent1.as_side().and_then(|s| s.result) == Some(SideResult::Win) {
        return Some(SlotSide::One);
    }
    if opponent2.as_side().and_then(|s| s.result) == Some(SideResult::Win) {
        return Some(SlotSide::Two);
    }
    None
}

/// Number of game wins needed to take a best-of series.
pub fn series_win_threshold(child_count: u32) -> u32 {
    (child_count + 2) / 2
}

/// Derive a match status from the shape of its two slots.
///
/// Recorded outcomes dominate: any result or forfeit means `Completed`, any
/// score alone means `Running`. A BYE against a known participant (or a
/// second BYE) also completes the match. Otherwise the status reflects how
/// many sides are determined.
pub fn derive_status(opponent1: &Slot, opponent2: &Slot) -> Status {
    if opponent1.has_outcome() || opponent2.has_outcome() {
        let has_result = opponent1.as_side().is_some_and(|s| s.result.is_some() || s.forfeit)
            || opponent2.as_side().is_some_and(|s| s.result.is_some() || s.forfeit);
        if has_result {
            return Status::Completed;
        }
        return Status::Running;
    }
    match (opponent1, opponent2) {
        (Slot::Bye, Slot::Bye) => Status::Completed,
        (Slot::Bye, Slot::Entry(_)) | (Slot::Entry(_), Slot::Bye) => Status::Completed,
        (Slot::Entry(_), Slot::Entry(_)) => Status::Ready,
        (Slot::Position { .. }, Slot::Position { .. }) => Status::Locked,
        _ => Status::Waiting,
    }
}
