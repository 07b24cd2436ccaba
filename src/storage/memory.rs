//! In-memory storage backend.
//!
//! Backs the test suites and doubles as a ready-made backend for consumers
//! that do not need persistence. Tables are `BTreeMap`s so iteration (and
//! therefore select order) follows insertion ids deterministically.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::errors::{StorageError, StorageResult};
use crate::model::{
    Group, GroupId, Match, MatchGame, MatchGameId, MatchId, Participant, ParticipantId, Round,
    RoundId, Stage, StageId, Tournament, TournamentId,
};

use super::{
    NewGroup, NewMatch, NewMatchGame, NewParticipant, NewRound, NewStage, NewTournament, Storage,
};

#[derive(Debug, Default)]
struct Tables {
    next_id: i64,
    tournaments: BTreeMap<TournamentId, Tournament>,
    participants: BTreeMap<ParticipantId, Participant>,
    stages: BTreeMap<StageId, Stage>,
    groups: BTreeMap<GroupId, Group>,
    rounds: BTreeMap<RoundId, Round>,
    matches: BTreeMap<MatchId, Match>,
    match_games: BTreeMap<MatchGameId, MatchGame>,
}

impl Tables {
    fn assign_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// A [`Storage`] implementation holding everything in process memory.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    tables: Mutex<Tables>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        MemoryStorage::default()
    }

    fn lock(&self) -> StorageResult<std::sync::MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| StorageError::new("storage lock poisoned"))
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn insert_tournament(&self, input: NewTournament) -> StorageResult<TournamentId> {
        let mut tables = self.lock()?;
        let id = tables.assign_id();
        tables.tournaments.insert(
            id,
            Tournament {
                id,
                name: input.name,
            },
        );
        Ok(id)
    }

    async fn select_tournament(&self, id: TournamentId) -> StorageResult<Option<Tournament>> {
        Ok(self.lock()?.tournaments.get(&id).cloned())
    }

    async fn delete_tournament(&self, id: TournamentId) -> StorageResult<bool> {
        Ok(self.lock()?.tournaments.remove(&id).is_some())
    }

    async fn insert_participant(&self, input: NewParticipant) -> StorageResult<ParticipantId> {
        let mut tables = self.lock()?;
        let id = tables.assign_id();
        tables.participants.insert(
            id,
            Participant {
                id,
                tournament_id: input.tournament_id,
                name: input.name,
            },
        );
        Ok(id)
    }

    async fn select_participant(&self, id: ParticipantId) -> StorageResult<Option<Participant>> {
        Ok(self.lock()?.participants.get(&id).cloned())
    }

    async fn select_participants(
        &self,
        tournament_id: TournamentId,
    ) -> StorageResult<Vec<Participant>> {
        Ok(self
            .lock()?
            .participants
            .values()
            .filter(|p| p.tournament_id == tournament_id)
            .cloned()
            .collect())
    }

    async fn delete_participants(&self, tournament_id: TournamentId) -> StorageResult<bool> {
        let mut tables = self.lock()?;
        let before = tables.participants.len();
        tables
            .participants
            .retain(|_, p| p.tournament_id != tournament_id);
        Ok(tables.participants.len() < before)
    }

    async fn insert_stage(&self, input: NewStage) -> StorageResult<StageId> {
        let mut tables = self.lock()?;
        let id = tables.assign_id();
        tables.stages.insert(
            id,
            Stage {
                id,
                tournament_id: input.tournament_id,
                name: input.name,
                stage_type: input.stage_type,
                number: input.number,
                settings: input.settings,
            },
        );
        Ok(id)
    }

    async fn select_stage(&self, id: StageId) -> StorageResult<Option<Stage>> {
        Ok(self.lock()?.stages.get(&id).cloned())
    }

    async fn select_stages(&self, tournament_id: TournamentId) -> StorageResult<Vec<Stage>> {
        Ok(self
            .lock()?
            .stages
            .values()
            .filter(|s| s.tournament_id == tournament_id)
            .cloned()
            .collect())
    }

    async fn update_stage(&self, stage: &Stage) -> StorageResult<bool> {
        let mut tables = self.lock()?;
        match tables.stages.get_mut(&stage.id) {
            Some(stored) => {
                *stored = stage.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_stage(&self, id: StageId) -> StorageResult<bool> {
        Ok(self.lock()?.stages.remove(&id).is_some())
    }

    async fn insert_group(&self, input: NewGroup) -> StorageResult<GroupId> {
        let mut tables = self.lock()?;
        let id = tables.assign_id();
        tables.groups.insert(
            id,
            Group {
                id,
                stage_id: input.stage_id,
                number: input.number,
            },
        );
        Ok(id)
    }

    async fn select_groups(&self, stage_id: StageId) -> StorageResult<Vec<Group>> {
        Ok(self
            .lock()?
            .groups
            .values()
            .filter(|g| g.stage_id == stage_id)
            .cloned()
            .collect())
    }

    async fn delete_groups(&self, stage_id: StageId) -> StorageResult<bool> {
        let mut tables = self.lock()?;
        let before = tables.groups.len();
        tables.groups.retain(|_, g| g.stage_id != stage_id);
        Ok(tables.groups.len() < before)
    }

    async fn insert_round(&self, input: NewRound) -> StorageResult<RoundId> {
        let mut tables = self.lock()?;
        let id = tables.assign_id();
        tables.rounds.insert(
            id,
            Round {
                id,
                stage_id: input.stage_id,
                group_id: input.group_id,
                number: input.number,
            },
        );
        Ok(id)
    }

    async fn select_rounds(&self, stage_id: StageId) -> StorageResult<Vec<Round>> {
        Ok(self
            .lock()?
            .rounds
            .values()
            .filter(|r| r.stage_id == stage_id)
            .cloned()
            .collect())
    }

    async fn delete_rounds(&self, stage_id: StageId) -> StorageResult<bool> {
        let mut tables = self.lock()?;
        let before = tables.rounds.len();
        tables.rounds.retain(|_, r| r.stage_id != stage_id);
        Ok(tables.rounds.len() < before)
    }

    async fn insert_match(&self, input: NewMatch) -> StorageResult<MatchId> {
        let mut tables = self.lock()?;
        let id = tables.assign_id();
        tables.matches.insert(
            id,
            Match {
                id,
                stage_id: input.stage_id,
                group_id: input.group_id,
                round_id: input.round_id,
                number: input.number,
                child_count: input.child_count,
                status: input.status,
                opponent1: input.opponent1,
                opponent2: input.opponent2,
            },
        );
        Ok(id)
    }

    async fn select_match(&self, id: MatchId) -> StorageResult<Option<Match>> {
        Ok(self.lock()?.matches.get(&id).cloned())
    }

    async fn select_matches(&self, stage_id: StageId) -> StorageResult<Vec<Match>> {
        Ok(self
            .lock()?
            .matches
            .values()
            .filter(|m| m.stage_id == stage_id)
            .cloned()
            .collect())
    }

    async fn update_match(&self, match_: &Match) -> StorageResult<bool> {
        let mut tables = self.lock()?;
        match tables.matches.get_mut(&match_.id) {
            Some(stored) => {
                *stored = match_.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_match(&self, id: MatchId) -> StorageResult<bool> {
        Ok(self.lock()?.matches.remove(&id).is_some())
    }

    async fn delete_matches(&self, stage_id: StageId) -> StorageResult<bool> {
        let mut tables = self.lock()?;
        let before = tables.matches.len();
        tables.matches.retain(|_, m| m.stage_id != stage_id);
        Ok(tables.matches.len() < before)
    }

    async fn insert_match_game(&self, input: NewMatchGame) -> StorageResult<MatchGameId> {
        let mut tables = self.lock()?;
        let id = tables.assign_id();
        tables.match_games.insert(
            id,
            MatchGame {
                id,
                parent_id: input.parent_id,
                number: input.number,
                status: input.status,
                opponent1: input.opponent1,
                opponent2: input.opponent2,
            },
        );
        Ok(id)
    }

    async fn select_match_game(&self, id: MatchGameId) -> StorageResult<Option<MatchGame>> {
        Ok(self.lock()?.match_games.get(&id).cloned())
    }

    async fn select_match_games(&self, parent_id: MatchId) -> StorageResult<Vec<MatchGame>> {
        Ok(self
            .lock()?
            .match_games
            .values()
            .filter(|g| g.parent_id == parent_id)
            .cloned()
            .collect())
    }

    async fn update_match_game(&self, game: &MatchGame) -> StorageResult<bool> {
        let mut tables = self.lock()?;
        match tables.match_games.get_mut(&game.id) {
            Some(stored) => {
                *stored = game.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_match_games(&self, parent_id: MatchId) -> StorageResult<bool> {
        let mut tables = self.lock()?;
        let before = tables.match_games.len();
        tables.match_games.retain(|_, g| g.parent_id != parent_id);
        Ok(tables.match_games.len() < before)
    }
}
