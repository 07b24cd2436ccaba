//! Stage configuration: types, seeding methods and option bags.

use serde::{Deserialize, Serialize};

use super::entities::{
    Group, Match, MatchGame, Participant, ParticipantId, Round, Stage, StageId, Tournament,
    TournamentId,
};

/// Bracket structure of a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageType {
    RoundRobin,
    SingleElimination,
    DoubleElimination,
}

/// Deterministic permutation applied to the seeded participant list.
///
/// The `Groups*` methods distribute participants across round-robin groups;
/// the rest reorder an elimination field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeedOrdering {
    #[serde(rename = "natural")]
    Natural,
    #[serde(rename = "reverse")]
    Reverse,
    #[serde(rename = "half_shift")]
    HalfShift,
    #[serde(rename = "reverse_half_shift")]
    ReverseHalfShift,
    #[serde(rename = "pair_flip")]
    PairFlip,
    #[serde(rename = "inner_outer")]
    InnerOuter,
    #[serde(rename = "groups.effort_balanced")]
    GroupsEffortBalanced,
    #[serde(rename = "groups.snake")]
    GroupsSnake,
    #[serde(rename = "groups.bracket_optimized")]
    GroupsBracketOptimized,
}

/// Grand-final variant of a double elimination stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrandFinal {
    /// No grand final; the winner-bracket champion wins the stage.
    #[default]
    None,
    /// One match between the two bracket champions.
    Simple,
    /// Two matches; the second is played only if the loser-bracket champion
    /// takes the first.
    Double,
}

/// Single or double round-robin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundRobinMode {
    #[default]
    Simple,
    Double,
}

/// Option bag accepted at stage creation.
///
/// Keys that do not apply to the stage type are rejected when set to a
/// non-default value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageSettings {
    /// Bracket size; the seeding is padded to this with BYEs.
    pub size: Option<u32>,
    /// Ordering applied to the seeded list before pairing.
    pub seed_ordering: Option<SeedOrdering>,
    /// Spread BYEs across round 1 instead of packing them at the end.
    pub balance_byes: bool,
    /// Add a 3rd-place match (single elimination).
    pub consolation_final: bool,
    /// Seed the field directly into what is conceptually the second
    /// winner-bracket round (double elimination).
    pub skip_first_round: bool,
    /// Grand-final variant (double elimination).
    pub grand_final: GrandFinal,
    /// Number of round-robin groups.
    pub group_count: Option<u32>,
    /// Single or double round-robin.
    pub round_robin_mode: RoundRobinMode,
    /// Child games per match; `0` disables best-of series.
    pub matches_child_count: u32,
    /// Explicit position permutations overriding the ordering method, one
    /// per entrant round.
    pub manual_ordering: Option<Vec<Vec<u32>>>,
}

/// Input for stage creation.
///
/// `seeding` lists participant names in seed order, `None` marking a BYE.
/// Omitting it creates the stage with position placeholders to be resolved
/// through the seeding operations later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateStageInput {
    pub tournament_id: TournamentId,
    pub name: String,
    pub stage_type: StageType,
    #[serde(default)]
    pub seeding: Option<Vec<Option<String>>>,
    #[serde(default)]
    pub settings: StageSettings,
}

/// Partial update for one side of a match or game.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SideUpdate {
    /// When given, must match the participant currently occupying the slot.
    pub id: Option<ParticipantId>,
    pub score: Option<u32>,
    pub result: Option<super::entities::SideResult>,
    pub forfeit: Option<bool>,
}

/// Input for a match update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchUpdate {
    pub id: super::entities::MatchId,
    #[serde(default)]
    pub opponent1: Option<SideUpdate>,
    #[serde(default)]
    pub opponent2: Option<SideUpdate>,
}

/// Input for a match-game update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchGameUpdate {
    pub id: super::entities::MatchGameId,
    #[serde(default)]
    pub opponent1: Option<SideUpdate>,
    #[serde(default)]
    pub opponent2: Option<SideUpdate>,
}

/// Everything persisted for one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageData {
    pub stage: Stage,
    pub groups: Vec<Group>,
    pub rounds: Vec<Round>,
    pub matches: Vec<Match>,
    pub match_games: Vec<MatchGame>,
    pub participants: Vec<Participant>,
}

/// Everything persisted for one tournament.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentData {
    pub tournament: Tournament,
    pub participants: Vec<Participant>,
    pub stages: Vec<StageData>,
}

/// Positional identity of a match within its stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchLocation {
    pub stage_id: StageId,
    pub group_number: u32,
    pub round_number: u32,
    pub match_number: u32,
}

/// One row of the final standings of a stage.
///
/// Ranks start at 1 and may be shared by participants eliminated in the
/// same round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalStanding {
    pub participant_id: ParticipantId,
    pub name: String,
    pub rank: u32,
}
