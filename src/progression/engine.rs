//! The match progression engine.
//!
//! Every update goes through the same pipeline: validate against the stored
//! match, merge the partial input, canonicalize results, then propagate
//! completion transitions through the derived match graph. Mutations are
//! staged in memory and flushed with successors written before the updated
//! match, so repeating an interrupted update converges to the same state.

use std::collections::{HashSet, VecDeque};

use log::debug;

use crate::errors::{Error, Result};
use crate::graph::{self, Location, Role, GROUP_FINAL};
use crate::model::{
    derive_status, series_win_threshold, GrandFinal, Match, MatchGame, MatchGameId,
    MatchGameUpdate, MatchId, MatchUpdate, ParticipantId, Side, SideResult, SideUpdate, Slot,
    SlotSide, StageId, StageType, Status,
};
use crate::stage::creator;
use crate::stage::StageState;
use crate::storage::Storage;

use super::series::{self, Decision};

pub(crate) struct ProgressionEngine<'a> {
    storage: &'a dyn Storage,
}

impl<'a> ProgressionEngine<'a> {
    pub fn new(storage: &'a dyn Storage) -> Self {
        ProgressionEngine { storage }
    }

    /// Apply a partial update to a match and propagate the consequences.
    pub async fn update_match(&self, update: MatchUpdate) -> Result<()> {
        let stored = self
            .storage
            .select_match(update.id)
            .await?
            .ok_or(Error::not_found("match", update.id))?;
        let mut state = StageState::load(self.storage, stored.stage_id).await?;
        let index = state
            .index_of(update.id)
            .ok_or(Error::not_found("match", update.id))?;
        let current = state.matches[index].clone();
        if current.status == Status::Archived {
            return Err(Error::InvalidTransition(format!(
                "match {} is archived",
                update.id
            )));
        }
        if current.child_count > 0 {
            validate_series_scores(&current, &update)?;
            if has_outcome_update(&update) {
                return Err(Error::UseMatchGameUpdate(update.id));
            }
            // Only identity fields were supplied; check them and leave the
            // stored state untouched.
            merge_match(&current, update.opponent1, update.opponent2)?;
            return Ok(());
        }
        let merged = merge_match(&current, update.opponent1, update.opponent2)?;
        let canonical = canonicalize(state.stage.stage_type, merged)?;
        self.apply(&mut state, index, canonical).await
    }

    /// Clear a match's recorded outcome, restoring placeholders downstream.
    pub async fn reset_match_results(&self, id: MatchId) -> Result<()> {
        let stored = self
            .storage
            .select_match(id)
            .await?
            .ok_or(Error::not_found("match", id))?;
        let mut state = StageState::load(self.storage, stored.stage_id).await?;
        let index = state.index_of(id).ok_or(Error::not_found("match", id))?;
        let current = state.matches[index].clone();
        if current.status == Status::Archived {
            return Err(Error::InvalidTransition(format!("match {id} is archived")));
        }
        if current.opponent1.is_bye() || current.opponent2.is_bye() {
            return Err(Error::InvalidTransition(format!(
                "match {id} was decided by a BYE and cannot be reset"
            )));
        }
        let mut cleared = current;
        clear_outcomes(&mut cleared.opponent1);
        clear_outcomes(&mut cleared.opponent2);
        cleared.status = derive_status(&cleared.opponent1, &cleared.opponent2);
        self.apply(&mut state, index, cleared).await
    }

    /// Apply a partial update to a match game and re-aggregate its series.
    pub async fn update_match_game(&self, update: MatchGameUpdate) -> Result<()> {
        let game = self
            .storage
            .select_match_game(update.id)
            .await?
            .ok_or(Error::not_found("match game", update.id))?;
        if game.status == Status::Archived {
            return Err(Error::InvalidTransition(format!(
                "match game {} is archived",
                update.id
            )));
        }
        let mut updated = game.clone();
        merge_slots(
            &mut updated.opponent1,
            &mut updated.opponent2,
            update.opponent1,
            update.opponent2,
            updated.id,
        )?;
        self.finish_game_update(game, updated).await
    }

    /// Clear a game's recorded outcome and re-aggregate its series.
    pub async fn reset_match_game_results(&self, id: MatchGameId) -> Result<()> {
        let game = self
            .storage
            .select_match_game(id)
            .await?
            .ok_or(Error::not_found("match game", id))?;
        if game.status == Status::Archived {
            return Err(Error::InvalidTransition(format!(
                "match game {id} is archived"
            )));
        }
        let mut cleared = game.clone();
        clear_outcomes(&mut cleared.opponent1);
        clear_outcomes(&mut cleared.opponent2);
        self.finish_game_update(game, cleared).await
    }

    async fn finish_game_update(&self, original: MatchGame, mut updated: MatchGame) -> Result<()> {
        let parent = self
            .storage
            .select_match(original.parent_id)
            .await?
            .ok_or(Error::not_found("match", original.parent_id))?;
        let mut state = StageState::load(self.storage, parent.stage_id).await?;
        let parent_index = state
            .index_of(parent.id)
            .ok_or(Error::not_found("match", parent.id))?;
        if parent.status == Status::Archived {
            return Err(Error::InvalidTransition(format!(
                "match {} is archived",
                parent.id
            )));
        }
        canonicalize_pair(
            state.stage.stage_type,
            &mut updated.opponent1,
            &mut updated.opponent2,
        )?;
        updated.status = derive_status(&updated.opponent1, &updated.opponent2);

        // Refuse before writing anything if undoing this game would reopen a
        // series whose successors already have results.
        let mut games = self.storage.select_match_games(parent.id).await?;
        if let Some(stored) = games.iter_mut().find(|g| g.id == updated.id) {
            *stored = updated.clone();
        }
        let outcome = series::evaluate(&parent, &games);
        let winner_after = match outcome.decision {
            Decision::Won(side) => parent.slot(side).participant_id(),
            _ => None,
        };
        if parent.status == Status::Completed && winner_after != parent.winner_id() {
            self.ensure_resettable(&state, parent_index)?;
        }

        self.storage.update_match_game(&updated).await?;
        self.aggregate(&mut state, parent_index, games).await
    }

    /// Re-derive a series parent from its games, then propagate.
    async fn aggregate(
        &self,
        state: &mut StageState,
        parent_index: usize,
        games: Vec<MatchGame>,
    ) -> Result<()> {
        let parent = state.matches[parent_index].clone();
        let outcome = series::evaluate(&parent, &games);
        let mut updated = parent.clone();
        for slot in [&mut updated.opponent1, &mut updated.opponent2] {
            if let Some(side) = slot.as_side_mut() {
                side.result = None;
                side.score = None;
            }
        }
        if outcome.any_completed {
            if let Some(side) = updated.opponent1.as_side_mut() {
                side.score = Some(outcome.wins1);
            }
            if let Some(side) = updated.opponent2.as_side_mut() {
                side.score = Some(outcome.wins2);
            }
        }
        match outcome.decision {
            Decision::Won(winner) => {
                if let Some(side) = updated.slot_mut(winner).as_side_mut() {
                    side.result = Some(SideResult::Win);
                }
                if let Some(side) = updated.slot_mut(winner.other()).as_side_mut() {
                    side.result = Some(SideResult::Loss);
                }
            }
            Decision::Drawn => {
                for slot in [&mut updated.opponent1, &mut updated.opponent2] {
                    if let Some(side) = slot.as_side_mut() {
                        side.result = Some(SideResult::Draw);
                    }
                }
            }
            Decision::Pending => {}
        }
        updated.status = match outcome.decision {
            Decision::Pending if outcome.any_started => Status::Running,
            Decision::Pending => derive_status(&updated.opponent1, &updated.opponent2),
            _ => Status::Completed,
        };

        // Archive games cut short by the decision; restore them if it was
        // undone.
        let decided = !matches!(outcome.decision, Decision::Pending);
        for game in &games {
            let desired = if decided {
                (game.status < Status::Completed).then_some(Status::Archived)
            } else {
                (game.status == Status::Archived).then_some(Status::Ready)
            };
            if let Some(status) = desired {
                let mut reopened = game.clone();
                reopened.status = status;
                self.storage.update_match_game(&reopened).await?;
            }
        }
        self.apply(state, parent_index, updated).await
    }

    /// Stamp and propagate BYE-decided matches across a freshly generated or
    /// reseeded stage.
    pub async fn advance_byes(&self, stage_id: StageId) -> Result<()> {
        let mut state = StageState::load(self.storage, stage_id).await?;
        let mut to_wire = Vec::new();
        for index in 0..state.matches.len() {
            let m = &mut state.matches[index];
            if m.status == Status::Completed
                && !m.opponent1.has_outcome()
                && !m.opponent2.has_outcome()
            {
                if stamp_bye_win(m) {
                    state.mark_dirty(index);
                }
                to_wire.push(index);
            }
        }
        for index in to_wire {
            self.wire(&mut state, index);
        }
        self.flush(&mut state, None).await
    }

    /// Rewrite a stage's slot assignments from a new seeding (or back to
    /// placeholders), then re-run BYE advancement.
    pub async fn apply_seeding(
        &self,
        stage_id: StageId,
        seeding: Option<Vec<Option<ParticipantId>>>,
    ) -> Result<()> {
        let mut state = StageState::load(self.storage, stage_id).await?;
        for m in &state.matches {
            let contested =
                m.opponent1.as_side().is_some() && m.opponent2.as_side().is_some();
            if contested && (m.opponent1.has_outcome() || m.opponent2.has_outcome()) {
                return Err(Error::InvalidTransition(
                    "the seeding is locked once results exist".into(),
                ));
            }
        }
        let settings = state.stage.settings.clone();
        let size = settings
            .size
            .ok_or_else(|| Error::InvalidInput("stage has no recorded size".into()))?;
        let seeding = match seeding {
            Some(mut list) => {
                if list.len() as u32 > size {
                    return Err(Error::InvalidInput(
                        "the seeding has more entries than the stage has slots".into(),
                    ));
                }
                list.resize(size as usize, None);
                Some(list)
            }
            None => None,
        };

        let layout = match state.stage.stage_type {
            StageType::RoundRobin => {
                let group_count = settings.group_count.unwrap_or(1);
                let field =
                    creator::round_robin_field(seeding.as_deref(), size, &settings, group_count)?;
                creator::round_robin_layout(&field, group_count, settings.round_robin_mode)
            }
            _ => {
                let field = creator::elimination_field(seeding.as_deref(), size, &settings)?;
                creator::elimination_layout(&state.ctx(), &field)
            }
        };
        for gen in layout {
            let Some(index) = state.index_at(gen.location) else {
                continue;
            };
            let m = &mut state.matches[index];
            if m.opponent1 != gen.opponent1 || m.opponent2 != gen.opponent2 {
                m.opponent1 = gen.opponent1;
                m.opponent2 = gen.opponent2;
            }
            let status = derive_status(&m.opponent1, &m.opponent2);
            if m.status != status {
                m.status = status;
            }
            state.mark_dirty(index);
        }
        self.flush(&mut state, None).await?;
        self.advance_byes(stage_id).await
    }

    /// Stage the new value of a match and propagate completion transitions.
    async fn apply(&self, state: &mut StageState, index: usize, new_match: Match) -> Result<()> {
        let old = state.matches[index].clone();
        let was_completed = old.status == Status::Completed;
        let now_completed = new_match.status == Status::Completed;
        let outcome_changed =
            old.winner_id() != new_match.winner_id() || old.loser_id() != new_match.loser_id();
        let needs_unwire = was_completed && (!now_completed || outcome_changed);
        if needs_unwire {
            self.ensure_resettable(state, index)?;
        }
        if old != new_match {
            debug!(
                "match {}: {:?} -> {:?}",
                new_match.id, old.status, new_match.status
            );
            state.matches[index] = new_match;
            state.mark_dirty(index);
        }
        if needs_unwire {
            self.unwire(state, index);
        }
        if now_completed && (!was_completed || outcome_changed) {
            self.wire(state, index);
        }
        self.flush(state, Some(index)).await
    }

    /// Refuse when any real (non-BYE) downstream match already has results.
    fn ensure_resettable(&self, state: &StageState, index: usize) -> Result<()> {
        let ctx = state.ctx();
        let mut queue = VecDeque::from([index]);
        let mut visited = HashSet::new();
        while let Some(i) = queue.pop_front() {
            if !visited.insert(i) {
                continue;
            }
            let loc = state.location(i);
            for succ in graph::successors(&ctx, loc) {
                let Some(dest_index) = state.index_at(Location {
                    group: succ.group,
                    round: succ.round,
                    number: succ.number,
                }) else {
                    continue;
                };
                let dest = &state.matches[dest_index];
                if dest.opponent1.is_bye() || dest.opponent2.is_bye() {
                    // BYE-decided matches are products of propagation and
                    // unwind with it.
                    if dest.status == Status::Completed {
                        queue.push_back(dest_index);
                    }
                    continue;
                }
                if dest.opponent1.has_outcome() || dest.opponent2.has_outcome() {
                    return Err(Error::CannotResetDownstreamCompleted(dest.id));
                }
            }
        }
        Ok(())
    }

    /// Push a completed match's participants into its successors.
    fn wire(&self, state: &mut StageState, index: usize) {
        let ctx = state.ctx();
        let mut queue = VecDeque::from([index]);
        while let Some(i) = queue.pop_front() {
            if state.matches[i].status != Status::Completed {
                continue;
            }
            let loc = state.location(i);
            let source = state.matches[i].clone();
            let winner = source.winner_side();

            if ctx.stage_type == StageType::DoubleElimination
                && ctx.grand_final == GrandFinal::Double
                && loc.group == GROUP_FINAL
                && loc.round == 1
            {
                self.decide_second_final(state, &source, winner);
                continue;
            }

            for succ in graph::successors(&ctx, loc) {
                let Some(dest_index) = state.index_at(Location {
                    group: succ.group,
                    round: succ.round,
                    number: succ.number,
                }) else {
                    continue;
                };
                let value = match (succ.role, winner) {
                    (Role::Winner, Some(side)) => advancing_slot(source.slot(side), loc.number),
                    (Role::Loser, Some(side)) => {
                        advancing_slot(source.slot(side.other()), loc.number)
                    }
                    // No winner: a double BYE, a double forfeit or a draw
                    // sends a BYE both ways.
                    (_, None) => Slot::Bye,
                };
                let dest = &mut state.matches[dest_index];
                if *dest.slot(succ.side) == value {
                    continue;
                }
                *dest.slot_mut(succ.side) = value;
                dest.status = derive_status(&dest.opponent1, &dest.opponent2);
                if dest.status == Status::Completed
                    && !dest.opponent1.has_outcome()
                    && !dest.opponent2.has_outcome()
                {
                    stamp_bye_win(dest);
                }
                let dest_completed = dest.status == Status::Completed;
                state.mark_dirty(dest_index);
                if dest_completed {
                    queue.push_back(dest_index);
                }
            }
        }
    }

    /// Outcome of the first grand final decides the second: a winner-bracket
    /// champion ends the stage (the second final stays as an archived
    /// sentinel), a loser-bracket champion forces the bracket reset.
    fn decide_second_final(
        &self,
        state: &mut StageState,
        first_final: &Match,
        winner: Option<SlotSide>,
    ) {
        let Some(second_index) = state.index_at(Location {
            group: GROUP_FINAL,
            round: 2,
            number: 1,
        }) else {
            return;
        };
        let (opponent1, opponent2, status) = if winner == Some(SlotSide::Two) {
            (
                advancing_slot(&first_final.opponent1, 1),
                advancing_slot(&first_final.opponent2, 1),
                Status::Ready,
            )
        } else {
            (Slot::Bye, Slot::Bye, Status::Archived)
        };
        let dest = &mut state.matches[second_index];
        if dest.opponent1 == opponent1 && dest.opponent2 == opponent2 && dest.status == status {
            return;
        }
        dest.opponent1 = opponent1;
        dest.opponent2 = opponent2;
        dest.status = status;
        state.mark_dirty(second_index);
    }

    /// Remove a no-longer-completed match's participants from its
    /// successors, restoring their placeholders.
    fn unwire(&self, state: &mut StageState, index: usize) {
        let ctx = state.ctx();
        let mut queue = VecDeque::from([index]);
        while let Some(i) = queue.pop_front() {
            let loc = state.location(i);
            for succ in graph::successors(&ctx, loc) {
                let Some(dest_index) = state.index_at(Location {
                    group: succ.group,
                    round: succ.round,
                    number: succ.number,
                }) else {
                    continue;
                };
                let restored = Slot::Position {
                    position: loc.number,
                };
                let dest = &mut state.matches[dest_index];
                if *dest.slot(succ.side) == restored {
                    continue;
                }
                let was_completed = dest.status == Status::Completed;
                *dest.slot_mut(succ.side) = restored;
                clear_outcomes(&mut dest.opponent1);
                clear_outcomes(&mut dest.opponent2);
                dest.status = derive_status(&dest.opponent1, &dest.opponent2);
                state.mark_dirty(dest_index);
                if was_completed {
                    queue.push_back(dest_index);
                }
            }
        }
    }

    /// Write dirty matches, successors before the triggering match, syncing
    /// child games along the way.
    async fn flush(&self, state: &mut StageState, trigger: Option<usize>) -> Result<()> {
        let order: Vec<usize> = state
            .dirty_indices()
            .iter()
            .copied()
            .filter(|&i| Some(i) != trigger)
            .chain(trigger.into_iter().filter(|i| state.dirty_indices().contains(i)))
            .collect();
        for index in order {
            let m = state.matches[index].clone();
            if m.child_count > 0 {
                self.sync_games(&m).await?;
            }
            self.storage.update_match(&m).await?;
        }
        state.clear_dirty();
        Ok(())
    }

    /// Mirror a parent's participants and lifecycle into its child games.
    ///
    /// A parent at or before `Ready` implies a virgin series, so game
    /// outcomes are cleared; running and decided series are managed by
    /// aggregation and left alone, except that a BYE-decided parent archives
    /// its games.
    async fn sync_games(&self, parent: &Match) -> Result<()> {
        let games = self.storage.select_match_games(parent.id).await?;
        for game in games {
            let mut updated = game.clone();
            for side in [SlotSide::One, SlotSide::Two] {
                *updated.slot_mut(side) = sync_game_slot(parent.slot(side), game.slot(side));
            }
            match parent.status {
                Status::Locked | Status::Waiting => {
                    clear_outcomes(&mut updated.opponent1);
                    clear_outcomes(&mut updated.opponent2);
                    updated.status = Status::Locked;
                }
                Status::Ready => {
                    clear_outcomes(&mut updated.opponent1);
                    clear_outcomes(&mut updated.opponent2);
                    updated.status = Status::Ready;
                }
                Status::Running => {}
                Status::Completed | Status::Archived => {
                    if parent.opponent1.is_bye() || parent.opponent2.is_bye() {
                        updated.status = Status::Archived;
                    }
                }
            }
            if updated != game {
                self.storage.update_match_game(&updated).await?;
            }
        }
        Ok(())
    }
}

/// Whether the update carries scores, results or forfeits.
fn has_outcome_update(update: &MatchUpdate) -> bool {
    [update.opponent1, update.opponent2]
        .into_iter()
        .flatten()
        .any(|side| side.score.is_some() || side.result.is_some() || side.forfeit.is_some())
}

/// Scores on a best-of parent may never exceed the win threshold.
fn validate_series_scores(current: &Match, update: &MatchUpdate) -> Result<()> {
    let threshold = series_win_threshold(current.child_count);
    for side in [update.opponent1, update.opponent2].into_iter().flatten() {
        if let Some(score) = side.score {
            if score > threshold {
                return Err(Error::InvalidScore(format!(
                    "score {score} exceeds the best-of-{} threshold of {threshold}",
                    current.child_count
                )));
            }
        }
    }
    Ok(())
}

fn merge_match(
    current: &Match,
    opponent1: Option<SideUpdate>,
    opponent2: Option<SideUpdate>,
) -> Result<Match> {
    let mut updated = current.clone();
    merge_slots(
        &mut updated.opponent1,
        &mut updated.opponent2,
        opponent1,
        opponent2,
        current.id,
    )?;
    Ok(updated)
}

fn merge_slots(
    slot1: &mut Slot,
    slot2: &mut Slot,
    update1: Option<SideUpdate>,
    update2: Option<SideUpdate>,
    id: i64,
) -> Result<()> {
    merge_side(slot1, update1, id, 1)?;
    merge_side(slot2, update2, id, 2)?;
    Ok(())
}

fn merge_side(slot: &mut Slot, update: Option<SideUpdate>, id: i64, side_number: u8) -> Result<()> {
    let Some(update) = update else {
        return Ok(());
    };
    let Some(side) = slot.as_side_mut() else {
        if update == SideUpdate::default() {
            return Ok(());
        }
        return Err(Error::InvalidOpponent(format!(
            "no participant occupies side {side_number} of {id}"
        )));
    };
    if let Some(expected) = update.id {
        if expected != side.id {
            return Err(Error::InvalidOpponent(format!(
                "participant {expected} does not occupy side {side_number} of {id}"
            )));
        }
    }
    if let Some(score) = update.score {
        side.score = Some(score);
    }
    if let Some(result) = update.result {
        side.result = Some(result);
    }
    if let Some(forfeit) = update.forfeit {
        side.forfeit = forfeit;
    }
    Ok(())
}

/// Validate result coherence, fill in implied results and derive the status.
fn canonicalize(stage_type: StageType, mut m: Match) -> Result<Match> {
    canonicalize_pair(stage_type, &mut m.opponent1, &mut m.opponent2)?;
    m.status = derive_status(&m.opponent1, &m.opponent2);
    Ok(m)
}

fn canonicalize_pair(stage_type: StageType, slot1: &mut Slot, slot2: &mut Slot) -> Result<()> {
    if (slot1.is_pending() || slot2.is_pending()) && (slot1.has_outcome() || slot2.has_outcome()) {
        return Err(Error::InvalidTransition(
            "both opponents must be determined before an outcome is recorded".into(),
        ));
    }
    let result1 = slot1.as_side().and_then(|s| s.result);
    let result2 = slot2.as_side().and_then(|s| s.result);
    let forfeit1 = slot1.as_side().is_some_and(|s| s.forfeit);
    let forfeit2 = slot2.as_side().is_some_and(|s| s.forfeit);

    match (result1, result2) {
        (Some(SideResult::Win), Some(SideResult::Win)) => {
            return Err(Error::InvalidResult("both sides declare a win".into()))
        }
        (Some(SideResult::Loss), Some(SideResult::Loss)) => {
            return Err(Error::InvalidResult("both sides declare a loss".into()))
        }
        (Some(SideResult::Draw), Some(other)) | (Some(other), Some(SideResult::Draw))
            if other != SideResult::Draw =>
        {
            return Err(Error::InvalidResult(
                "a draw must be declared on both sides".into(),
            ))
        }
        _ => {}
    }
    if (result1 == Some(SideResult::Draw) || result2 == Some(SideResult::Draw))
        && stage_type != StageType::RoundRobin
    {
        return Err(Error::InvalidResult(
            "draws are not allowed in elimination matches".into(),
        ));
    }
    if (forfeit1 && result1 == Some(SideResult::Win))
        || (forfeit2 && result2 == Some(SideResult::Win))
    {
        return Err(Error::InvalidResult(
            "a forfeiting side cannot declare a win".into(),
        ));
    }

    // A forfeit concedes the match to the other side.
    if forfeit1 && !forfeit2 {
        if let Some(side) = slot2.as_side_mut() {
            if side.result.is_none() {
                side.result = Some(SideResult::Win);
            }
        }
    }
    if forfeit2 && !forfeit1 {
        if let Some(side) = slot1.as_side_mut() {
            if side.result.is_none() {
                side.result = Some(SideResult::Win);
            }
        }
    }
    // One declared result implies the other.
    let result1 = slot1.as_side().and_then(|s| s.result);
    let result2 = slot2.as_side().and_then(|s| s.result);
    let implied = |result: SideResult| match result {
        SideResult::Win => SideResult::Loss,
        SideResult::Loss => SideResult::Win,
        SideResult::Draw => SideResult::Draw,
    };
    match (result1, result2) {
        (Some(result), None) => {
            if let Some(side) = slot2.as_side_mut() {
                if !side.forfeit {
                    side.result = Some(implied(result));
                }
            }
        }
        (None, Some(result)) => {
            if let Some(side) = slot1.as_side_mut() {
                if !side.forfeit {
                    side.result = Some(implied(result));
                }
            }
        }
        _ => {}
    }

    // With results settled, recorded scores must agree with them.
    let result1 = slot1.as_side().and_then(|s| s.result);
    let result2 = slot2.as_side().and_then(|s| s.result);
    let score1 = slot1.as_side().and_then(|s| s.score);
    let score2 = slot2.as_side().and_then(|s| s.score);
    if let (Some(score1), Some(score2)) = (score1, score2) {
        if !forfeit1 && !forfeit2 {
            let contradicted = (result1 == Some(SideResult::Win) && score1 < score2)
                || (result2 == Some(SideResult::Win) && score2 < score1);
            if contradicted {
                return Err(Error::InvalidResult(
                    "the declared winner contradicts the scores".into(),
                ));
            }
            let drawn = result1 == Some(SideResult::Draw) || result2 == Some(SideResult::Draw);
            if drawn && score1 != score2 {
                return Err(Error::InvalidResult("a draw contradicts the scores".into()));
            }
        }
    }
    Ok(())
}

fn clear_outcomes(slot: &mut Slot) {
    if let Some(side) = slot.as_side_mut() {
        side.score = None;
        side.result = None;
        side.forfeit = false;
    }
}

/// The slot value a participant carries into a successor match.
fn advancing_slot(source: &Slot, feeder_number: u32) -> Slot {
    match source {
        Slot::Entry(side) => Slot::Entry(Side::new(side.id).at_position(feeder_number)),
        _ => Slot::Bye,
    }
}

/// Record the lone participant of a BYE-decided match as its winner.
fn stamp_bye_win(m: &mut Match) -> bool {
    if m.opponent2.is_bye() {
        if let Some(side) = m.opponent1.as_side_mut() {
            if side.result.is_none() {
                side.result = Some(SideResult::Win);
                return true;
            }
        }
    } else if m.opponent1.is_bye() {
        if let Some(side) = m.opponent2.as_side_mut() {
            if side.result.is_none() {
                side.result = Some(SideResult::Win);
                return true;
            }
        }
    }
    false
}

fn sync_game_slot(parent: &Slot, game: &Slot) -> Slot {
    match parent {
        Slot::Bye => Slot::Bye,
        Slot::Position { position } => Slot::Position {
            position: *position,
        },
        Slot::Entry(parent_side) => match game {
            Slot::Entry(game_side) if game_side.id == parent_side.id => game.clone(),
            _ => Slot::entry(parent_side.id),
        },
    }
}
