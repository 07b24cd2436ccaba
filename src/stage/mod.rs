//! Stage lifecycle: creation, loaded stage state and standings.

pub(crate) mod creator;
pub(crate) mod standings;

use std::collections::HashMap;

use crate::errors::{Error, Result};
use crate::graph::{GraphContext, Location};
use crate::model::{Group, Match, MatchId, MatchLocation, Round, RoundId, Stage, StageId};
use crate::storage::Storage;

/// A stage and its match graph loaded into memory.
///
/// Mutations are staged on the in-memory matches and tracked in a dirty
/// list, so the engine can write successors before the triggering match
/// and a partial failure leaves a re-convergeable state.
pub(crate) struct StageState {
    pub stage: Stage,
    pub groups: Vec<Group>,
    pub rounds: Vec<Round>,
    pub matches: Vec<Match>,
    round_positions: HashMap<RoundId, (u32, u32)>,
    by_location: HashMap<(u32, u32, u32), usize>,
    by_id: HashMap<MatchId, usize>,
    dirty: Vec<usize>,
}

impl StageState {
    pub async fn load(storage: &dyn Storage, stage_id: StageId) -> Result<Self> {
        let stage = storage
            .select_stage(stage_id)
            .await?
            .ok_or(Error::not_found("stage", stage_id))?;
        let groups = storage.select_groups(stage_id).await?;
        let rounds = storage.select_rounds(stage_id).await?;
        let matches = storage.select_matches(stage_id).await?;
        Ok(StageState::assemble(stage, groups, rounds, matches))
    }

    fn assemble(stage: Stage, groups: Vec<Group>, rounds: Vec<Round>, matches: Vec<Match>) -> Self {
        let group_numbers: HashMap<_, _> = groups.iter().map(|g| (g.id, g.number)).collect();
        let round_positions: HashMap<_, _> = rounds
            .iter()
            .map(|r| {
                let group = group_numbers.get(&r.group_id).copied().unwrap_or(0);
                (r.id, (group, r.number))
            })
            .collect();
        let mut by_location = HashMap::new();
        let mut by_id = HashMap::new();
        for (index, m) in matches.iter().enumerate() {
            if let Some(&(group, round)) = round_positions.get(&m.round_id) {
                by_location.insert((group, round, m.number), index);
            }
            by_id.insert(m.id, index);
        }
        StageState {
            stage,
            groups,
            rounds,
            matches,
            round_positions,
            by_location,
            by_id,
            dirty: Vec::new(),
        }
    }

    pub fn ctx(&self) -> GraphContext {
        GraphContext::from_stage(&self.stage)
    }

    /// Positional identity of the match at `index`.
    pub fn location(&self, index: usize) -> Location {
        let m = &self.matches[index];
        let (group, round) = self
            .round_positions
            .get(&m.round_id)
            .copied()
            .unwrap_or((0, 0));
        Location {
            group,
            round,
            number: m.number,
        }
    }

    pub fn match_location(&self, index: usize) -> MatchLocation {
        let loc = self.location(index);
        MatchLocation {
            stage_id: self.stage.id,
            group_number: loc.group,
            round_number: loc.round,
            match_number: loc.number,
        }
    }

    pub fn index_of(&self, id: MatchId) -> Option<usize> {
        self.by_id.get(&id).copied()
    }

    pub fn index_at(&self, loc: Location) -> Option<usize> {
        self.by_location
            .get(&(loc.group, loc.round, loc.number))
            .copied()
    }

    pub fn mark_dirty(&mut self, index: usize) {
        if !self.dirty.contains(&index) {
            self.dirty.push(index);
        }
    }

    /// Matches of one round, ordered by match number.
    pub fn matches_in(&self, group: u32, round: u32) -> Vec<&Match> {
        let mut found: Vec<(u32, &Match)> = self
            .matches
            .iter()
            .enumerate()
            .filter_map(|(index, m)| {
                let loc = self.location(index);
                (loc.group == group && loc.round == round).then_some((m.number, m))
            })
            .collect();
        found.sort_by_key(|(number, _)| *number);
        found.into_iter().map(|(_, m)| m).collect()
    }

    /// Matches of one group, ordered by round then match number.
    pub fn matches_in_group(&self, group: u32) -> Vec<&Match> {
        let mut found: Vec<(u32, u32, &Match)> = self
            .matches
            .iter()
            .enumerate()
            .filter_map(|(index, m)| {
                let loc = self.location(index);
                (loc.group == group).then_some((loc.round, m.number, m))
            })
            .collect();
        found.sort_by_key(|(round, number, _)| (*round, *number));
        found.into_iter().map(|(_, _, m)| m).collect()
    }

    pub fn dirty_indices(&self) -> &[usize] {
        &self.dirty
    }

    pub fn clear_dirty(&mut self) {
        self.dirty.clear();
    }
}
