//! Match graph navigation.
//!
//! Successor and predecessor relations are never persisted; they are
//! recomputed on demand from a match's positional identity (group, round and
//! match numbers), so the graph cannot drift out of sync with the bracket
//! layout.

use crate::model::{GrandFinal, SlotSide, Stage, StageType};

/// Winner bracket / main bracket group number.
pub const GROUP_MAIN: u32 = 1;
/// Loser bracket (double elim) or consolation final (single elim).
pub const GROUP_SECONDARY: u32 = 2;
/// Grand final group (double elim).
pub const GROUP_FINAL: u32 = 3;

/// Role a participant takes when moving to a successor match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Winner,
    Loser,
}

/// Positional identity of a match within its stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub group: u32,
    pub round: u32,
    pub number: u32,
}

/// A downstream destination: which match, which side, and who goes there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuccessorRef {
    pub group: u32,
    pub round: u32,
    pub number: u32,
    pub side: SlotSide,
    pub role: Role,
}

/// The shape parameters the graph is derived from.
#[derive(Debug, Clone)]
pub struct GraphContext {
    pub stage_type: StageType,
    /// Padded bracket size (power of two) for elimination stages.
    pub bracket_size: u32,
    pub consolation_final: bool,
    pub grand_final: GrandFinal,
    pub skip_first_round: bool,
    /// Explicit position permutations per entrant round, overriding the
    /// default assignments. Index 0 covers the initial field and is not
    /// consulted here; subsequent entries cover loser-bracket entrant
    /// rounds in bracket order.
    pub manual_ordering: Option<Vec<Vec<u32>>>,
}

impl GraphContext {
    pub fn from_stage(stage: &Stage) -> Self {
        GraphContext {
            stage_type: stage.stage_type,
            bracket_size: stage.settings.size.unwrap_or(0),
            consolation_final: stage.settings.consolation_final,
            grand_final: stage.settings.grand_final,
            skip_first_round: stage.settings.skip_first_round,
            manual_ordering: stage.settings.manual_ordering.clone(),
        }
    }

    /// Manual permutation for a loser-bracket entrant round, if configured.
    fn manual_perm(&self, loser_round: u32) -> Option<&[u32]> {
        let orderings = self.manual_ordering.as_ref()?;
        let index = if self.skip_first_round {
            (loser_round / 2) as usize
        } else if loser_round == 1 {
            1
        } else {
            (loser_round / 2 + 1) as usize
        };
        orderings
            .get(index)
            .filter(|list| !list.is_empty())
            .map(Vec::as_slice)
    }

    /// Rounds in the main (winner) bracket.
    pub fn main_round_count(&self) -> u32 {
        if self.bracket_size < 2 {
            return 0;
        }
        self.bracket_size.trailing_zeros()
    }

    /// Rounds in the loser bracket.
    ///
    /// With a skipped first round the loser bracket keeps the shape of the
    /// conceptual double-size bracket, so two extra scaffolding rounds exist.
    pub fn loser_round_count(&self) -> u32 {
        let k = self.main_round_count();
        if self.skip_first_round {
            2 * k
        } else {
            2 * (k.saturating_sub(1))
        }
    }

    /// Matches in the given loser-bracket round.
    pub fn loser_round_match_count(&self, round: u32) -> u32 {
        let half = round.div_ceil(2);
        if self.skip_first_round {
            self.bracket_size >> half
        } else {
            self.bracket_size >> (half + 1)
        }
    }

    /// Which winner-bracket round drops its losers into loser-bracket round
    /// `2 * half`.
    fn minor_source_round(&self, half: u32) -> u32 {
        if self.skip_first_round {
            half
        } else {
            half + 1
        }
    }
}

/// Side of a successor slot fed by match `number` of a paired round.
fn pair_side(number: u32) -> SlotSide {
    if number % 2 == 1 {
        SlotSide::One
    } else {
        SlotSide::Two
    }
}

/// Loser-bracket minor-round assignment.
///
/// The direction alternates every even round so that a winner-bracket loser
/// does not immediately face the opponent it just eliminated.
fn minor_assignment(half: u32, count: u32, number: u32) -> u32 {
    if half % 2 == 1 {
        count + 1 - number
    } else {
        number
    }
}

/// Downstream destinations of a match.
pub fn successors(ctx: &GraphContext, loc: Location) -> Vec<SuccessorRef> {
    match ctx.stage_type {
        StageType::RoundRobin => Vec::new(),
        StageType::SingleElimination => single_elim_successors(ctx, loc),
        StageType::DoubleElimination => double_elim_successors(ctx, loc),
    }
}

fn single_elim_successors(ctx: &GraphContext, loc: Location) -> Vec<SuccessorRef> {
    let rounds = ctx.main_round_count();
    let mut out = Vec::new();
    if loc.group != GROUP_MAIN {
        return out;
    }
    if loc.round < rounds {
        out.push(SuccessorRef {
            group: GROUP_MAIN,
            round: loc.round + 1,
            number: loc.number.div_ceil(2),
            side: pair_side(loc.number),
            role: Role::Winner,
        });
    }
    if ctx.consolation_final && rounds >= 2 && loc.round == rounds - 1 {
        out.push(SuccessorRef {
            group: GROUP_SECONDARY,
            round: 1,
            number: 1,
            side: pair_side(loc.number),
            role: Role::Loser,
        });
    }
    out
}

fn double_elim_successors(ctx: &GraphContext, loc: Location) -> Vec<SuccessorRef> {
    let k = ctx.main_round_count();
    let l = ctx.loser_round_count();
    let mut out = Vec::new();
    match loc.group {
        GROUP_MAIN => {
            if loc.round < k {
                out.push(SuccessorRef {
                    group: GROUP_MAIN,
                    round: loc.round + 1,
                    number: loc.number.div_ceil(2),
                    side: pair_side(loc.number),
                    role: Role::Winner,
                });
            } else if ctx.grand_final != GrandFinal::None {
                out.push(SuccessorRef {
                    group: GROUP_FINAL,
                    round: 1,
                    number: 1,
                    side: SlotSide::One,
                    role: Role::Winner,
                });
            }
            if !ctx.skip_first_round && loc.round == 1 {
                let (number, side) = match ctx.manual_perm(1) {
                    Some(perm) => {
                        let slot = perm.iter().position(|&m| m == loc.number).unwrap_or(0);
                        (
                            slot as u32 / 2 + 1,
                            if slot % 2 == 0 {
                                SlotSide::One
                            } else {
                                SlotSide::Two
                            },
                        )
                    }
                    None => (loc.number.div_ceil(2), pair_side(loc.number)),
                };
                out.push(SuccessorRef {
                    group: GROUP_SECONDARY,
                    round: 1,
                    number,
                    side,
                    role: Role::Loser,
                });
            } else {
                let half = if ctx.skip_first_round {
                    loc.round
                } else {
                    loc.round - 1
                };
                let target = 2 * half;
                if target <= l {
                    let count = ctx.loser_round_match_count(target);
                    let number = match ctx.manual_perm(target) {
                        Some(perm) => {
                            perm.iter().position(|&m| m == loc.number).unwrap_or(0) as u32 + 1
                        }
                        None => minor_assignment(half, count, loc.number),
                    };
                    out.push(SuccessorRef {
                        group: GROUP_SECONDARY,
                        round: target,
                        number,
                        side: SlotSide::Two,
                        role: Role::Loser,
                    });
                }
            }
        }
        GROUP_SECONDARY => {
            if loc.round == l {
                if ctx.grand_final != GrandFinal::None {
                    out.push(SuccessorRef {
                        group: GROUP_FINAL,
                        round: 1,
                        number: 1,
                        side: SlotSide::Two,
                        role: Role::Winner,
                    });
                }
            } else if loc.round % 2 == 1 {
                out.push(SuccessorRef {
                    group: GROUP_SECONDARY,
                    round: loc.round + 1,
                    number: loc.number,
                    side: SlotSide::One,
                    role: Role::Winner,
                });
            } else {
                out.push(SuccessorRef {
                    group: GROUP_SECONDARY,
                    round: loc.round + 1,
                    number: loc.number.div_ceil(2),
                    side: pair_side(loc.number),
                    role: Role::Winner,
                });
            }
        }
        GROUP_FINAL => {
            if loc.round == 1 && ctx.grand_final == GrandFinal::Double {
                out.push(SuccessorRef {
                    group: GROUP_FINAL,
                    round: 2,
                    number: 1,
                    side: SlotSide::One,
                    role: Role::Loser,
                });
                out.push(SuccessorRef {
                    group: GROUP_FINAL,
                    round: 2,
                    number: 1,
                    side: SlotSide::Two,
                    role: Role::Winner,
                });
            }
        }
        _ => {}
    }
    out
}

/// Upstream feeding positions of a match.
pub fn predecessors(ctx: &GraphContext, loc: Location) -> Vec<Location> {
    match ctx.stage_type {
        StageType::RoundRobin => Vec::new(),
        StageType::SingleElimination => single_elim_predecessors(ctx, loc),
        StageType::DoubleElimination => double_elim_predecessors(ctx, loc),
    }
}

fn paired_predecessors(group: u32, round: u32, number: u32) -> Vec<Location> {
    vec![
        Location {
            group,
            round,
            number: 2 * number - 1,
        },
        Location {
            group,
            round,
            number: 2 * number,
        },
    ]
}

fn single_elim_predecessors(ctx: &GraphContext, loc: Location) -> Vec<Location> {
    let rounds = ctx.main_round_count();
    match loc.group {
        GROUP_MAIN if loc.round > 1 => paired_predecessors(GROUP_MAIN, loc.round - 1, loc.number),
        GROUP_SECONDARY if rounds >= 2 => vec![
            Location {
                group: GROUP_MAIN,
                round: rounds - 1,
                number: 1,
            },
            Location {
                group: GROUP_MAIN,
                round: rounds - 1,
                number: 2,
            },
        ],
        _ => Vec::new(),
    }
}

fn double_elim_predecessors(ctx: &GraphContext, loc: Location) -> Vec<Location> {
    let k = ctx.main_round_count();
    let l = ctx.loser_round_count();
    match loc.group {
        GROUP_MAIN if loc.round > 1 => paired_predecessors(GROUP_MAIN, loc.round - 1, loc.number),
        GROUP_SECONDARY => {
            if loc.round == 1 {
                if ctx.skip_first_round {
                    Vec::new()
                } else if let Some(perm) = ctx.manual_perm(1) {
                    let base = (loc.number as usize - 1) * 2;
                    perm.iter()
                        .skip(base)
                        .take(2)
                        .map(|&m| Location {
                            group: GROUP_MAIN,
                            round: 1,
                            number: m,
                        })
                        .collect()
                } else {
                    paired_predecessors(GROUP_MAIN, 1, loc.number)
                }
            } else if loc.round % 2 == 0 {
                let half = loc.round / 2;
                let count = ctx.loser_round_match_count(loc.round);
                let minor_number = match ctx.manual_perm(loc.round) {
                    Some(perm) => perm
                        .get(loc.number as usize - 1)
                        .copied()
                        .unwrap_or_else(|| minor_assignment(half, count, loc.number)),
                    None => minor_assignment(half, count, loc.number),
                };
                vec![
                    Location {
                        group: GROUP_SECONDARY,
                        round: loc.round - 1,
                        number: loc.number,
                    },
                    Location {
                        group: GROUP_MAIN,
                        round: ctx.minor_source_round(half),
                        number: minor_number,
                    },
                ]
            } else {
                paired_predecessors(GROUP_SECONDARY, loc.round - 1, loc.number)
            }
        }
        GROUP_FINAL => {
            if loc.round == 1 {
                vec![
                    Location {
                        group: GROUP_MAIN,
                        round: k,
                        number: 1,
                    },
                    Location {
                        group: GROUP_SECONDARY,
                        round: l,
                        number: 1,
                    },
                ]
            } else {
                vec![Location {
                    group: GROUP_FINAL,
                    round: 1,
                    number: 1,
                }]
            }
        }
        _ => Vec::new(),
    }
}
