//! Data model: persisted entities, stage settings and operation inputs.

pub mod entities;
pub mod settings;

pub use entities::{
    derive_status, series_win_threshold, Group, GroupId, Match, MatchGame, MatchGameId, MatchId,
    Participant, ParticipantId, Round, RoundId, Side, SideResult, Slot, SlotSide, Stage, StageId,
    Status, Tournament, TournamentId,
};
pub use settings::{
    CreateStageInput, FinalStanding, GrandFinal, MatchGameUpdate, MatchLocation, MatchUpdate,
    RoundRobinMode, SeedOrdering, SideUpdate, StageData, StageSettings, StageType, TournamentData,
};
