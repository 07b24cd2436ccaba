//! Final standings computation.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::errors::{Error, Result};
use crate::graph::{Location, GROUP_FINAL, GROUP_MAIN, GROUP_SECONDARY};
use crate::model::{
    FinalStanding, GrandFinal, Match, Participant, ParticipantId, SideResult, SlotSide, StageType,
    Status,
};

use super::StageState;

pub(crate) fn final_standings(
    state: &StageState,
    participants: &[Participant],
) -> Result<Vec<FinalStanding>> {
    let names: HashMap<ParticipantId, &str> = participants
        .iter()
        .map(|p| (p.id, p.name.as_str()))
        .collect();
    match state.stage.stage_type {
        StageType::SingleElimination => single_elimination(state, &names),
        StageType::DoubleElimination => double_elimination(state, &names),
        StageType::RoundRobin => round_robin(state, &names),
    }
}

fn standing(
    names: &HashMap<ParticipantId, &str>,
    id: ParticipantId,
    rank: u32,
) -> FinalStanding {
    FinalStanding {
        participant_id: id,
        name: names.get(&id).copied().unwrap_or_default().to_string(),
        rank,
    }
}

fn decided_match<'a>(state: &'a StageState, loc: Location, what: &str) -> Result<&'a Match> {
    let index = state
        .index_at(loc)
        .ok_or_else(|| Error::InvalidInput(format!("the stage has no {what}")))?;
    let m = &state.matches[index];
    if m.status < Status::Completed {
        return Err(Error::InvalidTransition(format!("the {what} is not finished")));
    }
    Ok(m)
}

/// Ranking by round of elimination; the consolation final fills 3rd and 4th.
fn single_elimination(
    state: &StageState,
    names: &HashMap<ParticipantId, &str>,
) -> Result<Vec<FinalStanding>> {
    let ctx = state.ctx();
    let rounds = ctx.main_round_count();
    let final_match = decided_match(
        state,
        Location {
            group: GROUP_MAIN,
            round: rounds,
            number: 1,
        },
        "final",
    )?;
    let mut out = Vec::new();
    if let Some(winner) = final_match.winner_id() {
        out.push(standing(names, winner, 1));
    }
    if let Some(loser) = final_match.loser_id() {
        out.push(standing(names, loser, 2));
    }
    let consolation_round = if ctx.consolation_final && rounds >= 2 {
        let consolation = decided_match(
            state,
            Location {
                group: GROUP_SECONDARY,
                round: 1,
                number: 1,
            },
            "consolation final",
        )?;
        if let Some(winner) = consolation.winner_id() {
            out.push(standing(names, winner, 3));
        }
        if let Some(loser) = consolation.loser_id() {
            out.push(standing(names, loser, 4));
        }
        Some(rounds - 1)
    } else {
        None
    };
    for round in (1..rounds).rev() {
        if Some(round) == consolation_round {
            continue;
        }
        let rank = (ctx.bracket_size >> round) + 1;
        for m in state.matches_in(GROUP_MAIN, round) {
            if let Some(loser) = m.loser_id() {
                out.push(standing(names, loser, rank));
            }
        }
    }
    Ok(out)
}

/// Grand-final placement first, then loser-bracket elimination order with
/// the winner-bracket round of origin as tie-breaker.
fn double_elimination(
    state: &StageState,
    names: &HashMap<ParticipantId, &str>,
) -> Result<Vec<FinalStanding>> {
    let ctx = state.ctx();
    let main_rounds = ctx.main_round_count();
    let loser_rounds = ctx.loser_round_count();
    let mut out = Vec::new();

    let top_two = match ctx.grand_final {
        GrandFinal::None => {
            let wb_final = decided_match(
                state,
                Location {
                    group: GROUP_MAIN,
                    round: main_rounds,
                    number: 1,
                },
                "winner bracket final",
            )?;
            let lb_final = decided_match(
                state,
                Location {
                    group: GROUP_SECONDARY,
                    round: loser_rounds,
                    number: 1,
                },
                "loser bracket final",
            )?;
            (wb_final.winner_id(), lb_final.winner_id())
        }
        GrandFinal::Simple => {
            let grand_final = decided_match(
                state,
                Location {
                    group: GROUP_FINAL,
                    round: 1,
                    number: 1,
                },
                "grand final",
            )?;
            (grand_final.winner_id(), grand_final.loser_id())
        }
        GrandFinal::Double => {
            let first = decided_match(
                state,
                Location {
                    group: GROUP_FINAL,
                    round: 1,
                    number: 1,
                },
                "grand final",
            )?;
            if first.winner_side() == Some(SlotSide::Two) {
                let second = decided_match(
                    state,
                    Location {
                        group: GROUP_FINAL,
                        round: 2,
                        number: 1,
                    },
                    "grand final reset",
                )?;
                (second.winner_id(), second.loser_id())
            } else {
                (first.winner_id(), first.loser_id())
            }
        }
    };
    if let Some(champion) = top_two.0 {
        out.push(standing(names, champion, 1));
    }
    if let Some(runner_up) = top_two.1 {
        out.push(standing(names, runner_up, 2));
    }

    let origins = winner_bracket_origins(state);
    let mut rank = 3;
    for round in (1..=loser_rounds).rev() {
        let mut bucket: Vec<ParticipantId> = state
            .matches_in(GROUP_SECONDARY, round)
            .into_iter()
            .filter_map(Match::loser_id)
            .collect();
        bucket.sort_by_key(|p| std::cmp::Reverse(origins.get(p).copied().unwrap_or(0)));
        let count = bucket.len() as u32;
        for participant in bucket {
            out.push(standing(names, participant, rank));
        }
        rank += count;
    }
    Ok(out)
}

/// Deepest winner-bracket round each participant appeared in.
fn winner_bracket_origins(state: &StageState) -> HashMap<ParticipantId, u32> {
    let ctx = state.ctx();
    let mut origins = HashMap::new();
    for round in 1..=ctx.main_round_count() {
        for m in state.matches_in(GROUP_MAIN, round) {
            for id in [m.opponent1.participant_id(), m.opponent2.participant_id()]
                .into_iter()
                .flatten()
            {
                let entry = origins.entry(id).or_insert(round);
                *entry = (*entry).max(round);
            }
        }
    }
    origins
}

#[derive(Debug)]
struct Tally {
    id: ParticipantId,
    wins: u32,
    draws: u32,
    losses: u32,
    score_for: i64,
    score_against: i64,
    seed: u32,
}

impl Tally {
    fn new(id: ParticipantId) -> Self {
        Tally {
            id,
            wins: 0,
            draws: 0,
            losses: 0,
            score_for: 0,
            score_against: 0,
            seed: u32::MAX,
        }
    }

    fn record(&self) -> (u32, u32, u32) {
        (self.wins, self.draws, self.losses)
    }

    fn difference(&self) -> i64 {
        self.score_for - self.score_against
    }
}

/// Per-group ranking by (wins, draws, losses), with head-to-head, score
/// difference and seed order as deterministic tie-breakers.
fn round_robin(
    state: &StageState,
    names: &HashMap<ParticipantId, &str>,
) -> Result<Vec<FinalStanding>> {
    for m in &state.matches {
        let contested = m.opponent1.as_side().is_some() && m.opponent2.as_side().is_some();
        if contested && m.status < Status::Completed {
            return Err(Error::InvalidTransition(
                "the round robin is not finished".into(),
            ));
        }
    }
    let mut group_numbers: Vec<u32> = state.groups.iter().map(|g| g.number).collect();
    group_numbers.sort_unstable();
    let mut out = Vec::new();
    for group in group_numbers {
        let matches = state.matches_in_group(group);
        let mut tallies: BTreeMap<ParticipantId, Tally> = BTreeMap::new();
        let mut beaten: HashSet<(ParticipantId, ParticipantId)> = HashSet::new();
        for m in &matches {
            for slot in [&m.opponent1, &m.opponent2] {
                if let Some(side) = slot.as_side() {
                    let tally = tallies.entry(side.id).or_insert_with(|| Tally::new(side.id));
                    if let Some(position) = side.position {
                        tally.seed = tally.seed.min(position);
                    }
                }
            }
            if m.status < Status::Completed {
                continue;
            }
            if let Some(winner) = m.winner_id() {
                if let Some(t) = tallies.get_mut(&winner) {
                    t.wins += 1;
                }
                if let Some(loser) = m.loser_id() {
                    if let Some(t) = tallies.get_mut(&loser) {
                        t.losses += 1;
                    }
                    beaten.insert((winner, loser));
                }
            } else {
                let drawn = m.opponent1.as_side().and_then(|s| s.result)
                    == Some(SideResult::Draw)
                    && m.opponent2.as_side().and_then(|s| s.result) == Some(SideResult::Draw);
                if drawn {
                    for slot in [&m.opponent1, &m.opponent2] {
                        if let Some(side) = slot.as_side() {
                            if let Some(t) = tallies.get_mut(&side.id) {
                                t.draws += 1;
                            }
                        }
                    }
                }
            }
            if let (Some(side1), Some(side2)) = (m.opponent1.as_side(), m.opponent2.as_side()) {
                if let (Some(score1), Some(score2)) = (side1.score, side2.score) {
                    if let Some(t) = tallies.get_mut(&side1.id) {
                        t.score_for += i64::from(score1);
                        t.score_against += i64::from(score2);
                    }
                    if let Some(t) = tallies.get_mut(&side2.id) {
                        t.score_for += i64::from(score2);
                        t.score_against += i64::from(score1);
                    }
                }
            }
        }

        let mut ordered: Vec<Tally> = tallies.into_values().collect();
        ordered.sort_by(|a, b| {
            b.wins
                .cmp(&a.wins)
                .then(b.draws.cmp(&a.draws))
                .then(a.losses.cmp(&b.losses))
                .then(b.difference().cmp(&a.difference()))
                .then(a.seed.cmp(&b.seed))
        });
        // Head-to-head applies only when exactly two share a record and one
        // beat the other without a return loss.
        let mut start = 0;
        while start < ordered.len() {
            let mut end = start + 1;
            while end < ordered.len() && ordered[end].record() == ordered[start].record() {
                end += 1;
            }
            if end - start == 2 {
                let first = ordered[start].id;
                let second = ordered[start + 1].id;
                if beaten.contains(&(second, first)) && !beaten.contains(&(first, second)) {
                    ordered.swap(start, start + 1);
                }
            }
            start = end;
        }
        for (position, tally) in ordered.iter().enumerate() {
            out.push(standing(names, tally.id, position as u32 + 1));
        }
    }
    Ok(out)
}
