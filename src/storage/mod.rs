//! Storage abstraction for testability and backend independence.
//!
//! The manager talks to persistence exclusively through the [`Storage`]
//! trait: plain CRUD over the entity tables, with ids assigned by the
//! backend on insert. Backend failures are surfaced as [`StorageError`]
//! without any backend-specific shape leaking through.

use async_trait::async_trait;

use crate::errors::{StorageError, StorageResult};
use crate::model::{
    Group, GroupId, Match, MatchGame, MatchGameId, MatchId, Participant, ParticipantId, Round,
    RoundId, Slot, Stage, StageId, StageSettings, StageType, Status, Tournament, TournamentId,
};

pub mod memory;

pub use memory::MemoryStorage;

/// Insert shape for a tournament.
#[derive(Debug, Clone)]
pub struct NewTournament {
    pub name: String,
}

/// Insert shape for a participant.
#[derive(Debug, Clone)]
pub struct NewParticipant {
    pub tournament_id: TournamentId,
    pub name: String,
}

/// Insert shape for a stage.
#[derive(Debug, Clone)]
pub struct NewStage {
    pub tournament_id: TournamentId,
    pub name: String,
    pub stage_type: StageType,
    pub number: u32,
    pub settings: StageSettings,
}

/// Insert shape for a group.
#[derive(Debug, Clone)]
pub struct NewGroup {
    pub stage_id: StageId,
    pub number: u32,
}

/// Insert shape for a round.
#[derive(Debug, Clone)]
pub struct NewRound {
    pub stage_id: StageId,
    pub group_id: GroupId,
    pub number: u32,
}

/// Insert shape for a match.
#[derive(Debug, Clone)]
pub struct NewMatch {
    pub stage_id: StageId,
    pub group_id: GroupId,
    pub round_id: RoundId,
    pub number: u32,
    pub child_count: u32,
    pub status: Status,
    pub opponent1: Slot,
    pub opponent2: Slot,
}

/// Insert shape for a match game.
#[derive(Debug, Clone)]
pub struct NewMatchGame {
    pub parent_id: MatchId,
    pub number: u32,
    pub status: Status,
    pub opponent1: Slot,
    pub opponent2: Slot,
}

/// CRUD over the bracket tables.
///
/// List-returning selects must order by id so that generation order is
/// stable across backends. Every mutation either completes or fails
/// synchronously from the caller's perspective.
#[async_trait]
pub trait Storage: Send + Sync {
    // Tournaments

    async fn insert_tournament(&self, input: NewTournament) -> StorageResult<TournamentId>;
    async fn select_tournament(&self, id: TournamentId) -> StorageResult<Option<Tournament>>;
    async fn delete_tournament(&self, id: TournamentId) -> StorageResult<bool>;

    // Participants

    async fn insert_participant(&self, input: NewParticipant) -> StorageResult<ParticipantId>;
    async fn select_participant(&self, id: ParticipantId) -> StorageResult<Option<Participant>>;
    async fn select_participants(
        &self,
        tournament_id: TournamentId,
    ) -> StorageResult<Vec<Participant>>;
    async fn delete_participants(&self, tournament_id: TournamentId) -> StorageResult<bool>;

    // Stages

    async fn insert_stage(&self, input: NewStage) -> StorageResult<StageId>;
    async fn select_stage(&self, id: StageId) -> StorageResult<Option<Stage>>;
    async fn select_stages(&self, tournament_id: TournamentId) -> StorageResult<Vec<Stage>>;
    async fn update_stage(&self, stage: &Stage) -> StorageResult<bool>;
    async fn delete_stage(&self, id: StageId) -> StorageResult<bool>;

    // Groups

    async fn insert_group(&self, input: NewGroup) -> StorageResult<GroupId>;
    async fn select_groups(&self, stage_id: StageId) -> StorageResult<Vec<Group>>;
    async fn delete_groups(&self, stage_id: StageId) -> StorageResult<bool>;

    // Rounds

    async fn insert_round(&self, input: NewRound) -> StorageResult<RoundId>;
    async fn select_rounds(&self, stage_id: StageId) -> StorageResult<Vec<Round>>;
    async fn delete_rounds(&self, stage_id: StageId) -> StorageResult<bool>;

    // Matches

    async fn insert_match(&self, input: NewMatch) -> StorageResult<MatchId>;
    async fn select_match(&self, id: MatchId) -> StorageResult<Option<Match>>;
    async fn select_matches(&self, stage_id: StageId) -> StorageResult<Vec<Match>>;
    async fn update_match(&self, match_: &Match) -> StorageResult<bool>;
    async fn delete_match(&self, id: MatchId) -> StorageResult<bool>;
    async fn delete_matches(&self, stage_id: StageId) -> StorageResult<bool>;

    // Match games

    async fn insert_match_game(&self, input: NewMatchGame) -> StorageResult<MatchGameId>;
    async fn select_match_game(&self, id: MatchGameId) -> StorageResult<Option<MatchGame>>;
    async fn select_match_games(&self, parent_id: MatchId) -> StorageResult<Vec<MatchGame>>;
    async fn update_match_game(&self, game: &MatchGame) -> StorageResult<bool>;
    async fn delete_match_games(&self, parent_id: MatchId) -> StorageResult<bool>;
}

impl StorageError {
    /// Convenience constructor for backends.
    pub fn new(message: impl Into<String>) -> Self {
        StorageError(message.into())
    }
}
