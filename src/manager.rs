//! The bracket manager: every public operation over one storage handle.

use std::sync::Arc;

use log::info;

use crate::errors::{Error, Result};
use crate::graph::{self, Location, Role, GROUP_MAIN};
use crate::model::{
    CreateStageInput, FinalStanding, Match, MatchGame, MatchGameId, MatchGameUpdate, MatchId,
    MatchLocation, MatchUpdate, Participant, ParticipantId, Stage, StageData, StageId, StageType,
    Status, TournamentData, TournamentId,
};
use crate::progression::engine::ProgressionEngine;
use crate::stage::creator::{self, StageCreator};
use crate::stage::{standings, StageState};
use crate::storage::{NewTournament, Storage};

/// Manages the full lifecycle of tournament brackets over a storage
/// backend: stage generation, match updates with winner/loser propagation,
/// best-of series, standings and navigation queries.
///
/// Operations are sequential transactions from the caller's point of view;
/// the only suspension points are the storage calls themselves. If several
/// managers share one backend, external locking is the caller's concern.
#[derive(Clone)]
pub struct BracketManager {
    storage: Arc<dyn Storage>,
}

impl BracketManager {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        BracketManager { storage }
    }

    fn engine(&self) -> ProgressionEngine<'_> {
        ProgressionEngine::new(self.storage.as_ref())
    }

    // Creation

    /// Create an empty tournament grouping.
    pub async fn create_tournament(&self, name: &str) -> Result<TournamentId> {
        let id = self
            .storage
            .insert_tournament(NewTournament {
                name: name.to_string(),
            })
            .await?;
        info!("created tournament {id} ({name})");
        Ok(id)
    }

    /// Generate a stage: groups, rounds and the full match graph, with BYE
    /// auto-advance already applied.
    pub async fn create_stage(&self, input: CreateStageInput) -> Result<Stage> {
        let stage = StageCreator::new(self.storage.as_ref()).create(input).await?;
        self.engine().advance_byes(stage.id).await?;
        Ok(stage)
    }

    // Updates

    /// Record a score/result update on a match and propagate it.
    pub async fn update_match(&self, update: MatchUpdate) -> Result<()> {
        self.engine().update_match(update).await
    }

    /// Record a score/result update on a best-of game and re-aggregate its
    /// series.
    pub async fn update_match_game(&self, update: MatchGameUpdate) -> Result<()> {
        self.engine().update_match_game(update).await
    }

    /// Replace a stage's seeding. Rejected once results exist.
    pub async fn update_seeding(
        &self,
        stage_id: StageId,
        seeding: &[Option<String>],
    ) -> Result<()> {
        let stage = self.require_stage(stage_id).await?;
        let ids =
            creator::resolve_participant_names(self.storage.as_ref(), stage.tournament_id, seeding)
                .await?;
        self.engine().apply_seeding(stage_id, Some(ids)).await
    }

    /// Resolve a placeholder-seeded stage from the tournament's registered
    /// participants, in registration order; unfilled positions become BYEs.
    pub async fn confirm_seeding(&self, stage_id: StageId) -> Result<()> {
        let stage = self.require_stage(stage_id).await?;
        let size = stage
            .settings
            .size
            .ok_or_else(|| Error::InvalidInput("stage has no recorded size".into()))?;
        let ids: Vec<Option<ParticipantId>> = self
            .storage
            .select_participants(stage.tournament_id)
            .await?
            .into_iter()
            .take(size as usize)
            .map(|p| Some(p.id))
            .collect();
        self.engine().apply_seeding(stage_id, Some(ids)).await
    }

    // Queries

    /// Everything persisted for one stage.
    pub async fn get_stage_data(&self, stage_id: StageId) -> Result<StageData> {
        let state = StageState::load(self.storage.as_ref(), stage_id).await?;
        let participants = self
            .storage
            .select_participants(state.stage.tournament_id)
            .await?;
        let mut match_games = Vec::new();
        for m in &state.matches {
            if m.child_count > 0 {
                match_games.extend(self.storage.select_match_games(m.id).await?);
            }
        }
        Ok(StageData {
            stage: state.stage,
            groups: state.groups,
            rounds: state.rounds,
            matches: state.matches,
            match_games,
            participants,
        })
    }

    /// Everything persisted for one tournament.
    pub async fn get_tournament_data(&self, tournament_id: TournamentId) -> Result<TournamentData> {
        let tournament = self
            .storage
            .select_tournament(tournament_id)
            .await?
            .ok_or(Error::not_found("tournament", tournament_id))?;
        let participants = self.storage.select_participants(tournament_id).await?;
        let mut stages = self.storage.select_stages(tournament_id).await?;
        stages.sort_by_key(|s| s.number);
        let mut stage_data = Vec::with_capacity(stages.len());
        for stage in stages {
            stage_data.push(self.get_stage_data(stage.id).await?);
        }
        Ok(TournamentData {
            tournament,
            participants,
            stages: stage_data,
        })
    }

    /// The stage's seeding in seed order, `None` marking a BYE or an
    /// unassigned position.
    pub async fn get_seeding(&self, stage_id: StageId) -> Result<Vec<Option<Participant>>> {
        let state = StageState::load(self.storage.as_ref(), stage_id).await?;
        let size = state.stage.settings.size.unwrap_or(0) as usize;
        let participants: std::collections::HashMap<ParticipantId, Participant> = self
            .storage
            .select_participants(state.stage.tournament_id)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();
        let mut out: Vec<Option<Participant>> = vec![None; size];
        for m in self.entrant_matches(&state) {
            for slot in [&m.opponent1, &m.opponent2] {
                if let Some(side) = slot.as_side() {
                    let assigned = side
                        .position
                        .and_then(|position| out.get_mut(position as usize - 1));
                    if let Some(assigned) = assigned {
                        *assigned = participants.get(&side.id).cloned();
                    }
                }
            }
        }
        Ok(out)
    }

    /// Final standings of a finished stage.
    pub async fn get_final_standings(&self, stage_id: StageId) -> Result<Vec<FinalStanding>> {
        let state = StageState::load(self.storage.as_ref(), stage_id).await?;
        let participants = self
            .storage
            .select_participants(state.stage.tournament_id)
            .await?;
        standings::final_standings(&state, &participants)
    }

    /// The currently playable matches of a stage.
    pub async fn get_current_matches(&self, stage_id: StageId) -> Result<Vec<Match>> {
        let state = StageState::load(self.storage.as_ref(), stage_id).await?;
        let mut playable: Vec<(Location, Match)> = state
            .matches
            .iter()
            .enumerate()
            .filter(|(_, m)| matches!(m.status, Status::Ready | Status::Running))
            .map(|(index, m)| (state.location(index), m.clone()))
            .collect();
        playable.sort_by_key(|(loc, _)| (loc.group, loc.round, loc.number));
        Ok(playable.into_iter().map(|(_, m)| m).collect())
    }

    /// Child games of a best-of match, in series order.
    pub async fn get_match_games(&self, match_id: MatchId) -> Result<Vec<MatchGame>> {
        self.storage
            .select_match(match_id)
            .await?
            .ok_or(Error::not_found("match", match_id))?;
        let mut games = self.storage.select_match_games(match_id).await?;
        games.sort_by_key(|g| g.number);
        Ok(games)
    }

    // Finders

    /// Look a match up by its position within a stage.
    pub async fn find_match(
        &self,
        stage_id: StageId,
        group_number: u32,
        round_number: u32,
        match_number: u32,
    ) -> Result<Match> {
        let state = StageState::load(self.storage.as_ref(), stage_id).await?;
        let index = state
            .index_at(Location {
                group: group_number,
                round: round_number,
                number: match_number,
            })
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "match at group {group_number} round {round_number} number {match_number}"
                ))
            })?;
        Ok(state.matches[index].clone())
    }

    /// Positional identity of a match.
    pub async fn find_match_location(&self, match_id: MatchId) -> Result<MatchLocation> {
        let (state, index) = self.locate(match_id).await?;
        Ok(state.match_location(index))
    }

    /// Downstream matches; with a participant, only those the participant
    /// reaches given the recorded outcome.
    pub async fn find_next_matches(
        &self,
        match_id: MatchId,
        participant: Option<ParticipantId>,
    ) -> Result<Vec<Match>> {
        let (state, index) = self.locate(match_id).await?;
        let m = &state.matches[index];
        let role_filter = match participant {
            None => None,
            Some(participant) => {
                self.require_participant_in(m, participant)?;
                if m.status >= Status::Completed {
                    if m.winner_id() == Some(participant) {
                        Some(Role::Winner)
                    } else if m.loser_id() == Some(participant) {
                        Some(Role::Loser)
                    } else {
                        // Eliminated without a destination (draw or double
                        // forfeit).
                        return Ok(Vec::new());
                    }
                } else {
                    None
                }
            }
        };
        let ctx = state.ctx();
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for succ in graph::successors(&ctx, state.location(index)) {
            if let Some(role) = role_filter {
                if succ.role != role {
                    continue;
                }
            }
            let Some(dest) = state.index_at(Location {
                group: succ.group,
                round: succ.round,
                number: succ.number,
            }) else {
                continue;
            };
            if seen.insert(dest) {
                out.push(state.matches[dest].clone());
            }
        }
        Ok(out)
    }

    /// Upstream matches; with a participant, only those the participant
    /// actually came through.
    pub async fn find_previous_matches(
        &self,
        match_id: MatchId,
        participant: Option<ParticipantId>,
    ) -> Result<Vec<Match>> {
        let (state, index) = self.locate(match_id).await?;
        if let Some(participant) = participant {
            self.require_participant_in(&state.matches[index], participant)?;
        }
        let ctx = state.ctx();
        let mut out = Vec::new();
        for pred in graph::predecessors(&ctx, state.location(index)) {
            let Some(source) = state.index_at(pred) else {
                continue;
            };
            let m = &state.matches[source];
            if let Some(participant) = participant {
                let held = m.opponent1.participant_id() == Some(participant)
                    || m.opponent2.participant_id() == Some(participant);
                if !held {
                    continue;
                }
            }
            out.push(m.clone());
        }
        Ok(out)
    }

    // Resets

    /// Clear a match's recorded outcome; downstream matches must not have
    /// results of their own.
    pub async fn reset_match_results(&self, match_id: MatchId) -> Result<()> {
        self.engine().reset_match_results(match_id).await
    }

    /// Clear a game's recorded outcome and reopen its series.
    pub async fn reset_match_game_results(&self, game_id: MatchGameId) -> Result<()> {
        self.engine().reset_match_game_results(game_id).await
    }

    /// Return a stage to placeholder seeding. Rejected once results exist.
    pub async fn reset_seeding(&self, stage_id: StageId) -> Result<()> {
        self.require_stage(stage_id).await?;
        self.engine().apply_seeding(stage_id, None).await
    }

    // Deletion

    /// Delete a match and its child games.
    pub async fn delete_match(&self, match_id: MatchId) -> Result<()> {
        self.storage
            .select_match(match_id)
            .await?
            .ok_or(Error::not_found("match", match_id))?;
        self.storage.delete_match_games(match_id).await?;
        self.storage.delete_match(match_id).await?;
        Ok(())
    }

    /// Delete a stage and everything under it. Participants survive.
    pub async fn delete_stage(&self, stage_id: StageId) -> Result<()> {
        self.require_stage(stage_id).await?;
        for m in self.storage.select_matches(stage_id).await? {
            if m.child_count > 0 {
                self.storage.delete_match_games(m.id).await?;
            }
        }
        self.storage.delete_matches(stage_id).await?;
        self.storage.delete_rounds(stage_id).await?;
        self.storage.delete_groups(stage_id).await?;
        self.storage.delete_stage(stage_id).await?;
        info!("deleted stage {stage_id}");
        Ok(())
    }

    /// Delete a tournament, its stages and its participants.
    pub async fn delete_tournament(&self, tournament_id: TournamentId) -> Result<()> {
        self.storage
            .select_tournament(tournament_id)
            .await?
            .ok_or(Error::not_found("tournament", tournament_id))?;
        for stage in self.storage.select_stages(tournament_id).await? {
            self.delete_stage(stage.id).await?;
        }
        self.storage.delete_participants(tournament_id).await?;
        self.storage.delete_tournament(tournament_id).await?;
        info!("deleted tournament {tournament_id}");
        Ok(())
    }

    // Helpers

    async fn require_stage(&self, stage_id: StageId) -> Result<Stage> {
        self.storage
            .select_stage(stage_id)
            .await?
            .ok_or(Error::not_found("stage", stage_id))
    }

    async fn locate(&self, match_id: MatchId) -> Result<(StageState, usize)> {
        let stored = self
            .storage
            .select_match(match_id)
            .await?
            .ok_or(Error::not_found("match", match_id))?;
        let state = StageState::load(self.storage.as_ref(), stored.stage_id).await?;
        let index = state
            .index_of(match_id)
            .ok_or(Error::not_found("match", match_id))?;
        Ok((state, index))
    }

    fn require_participant_in(&self, m: &Match, participant: ParticipantId) -> Result<()> {
        let held = m.opponent1.participant_id() == Some(participant)
            || m.opponent2.participant_id() == Some(participant);
        if held {
            Ok(())
        } else {
            Err(Error::InvalidOpponent(format!(
                "participant {participant} does not play in match {}",
                m.id
            )))
        }
    }

    /// The matches whose slots carry the original seed positions.
    fn entrant_matches<'a>(&self, state: &'a StageState) -> Vec<&'a Match> {
        match state.stage.stage_type {
            StageType::RoundRobin => state.matches.iter().collect(),
            _ => state.matches_in(GROUP_MAIN, 1),
        }
    }
}
