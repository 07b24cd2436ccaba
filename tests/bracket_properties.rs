//! Structural invariants checked exhaustively over bracket sizes and
//! seeding methods.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use bracket_manager::graph::{self, GraphContext, Location, Role, GROUP_SECONDARY};
use bracket_manager::model::{
    CreateStageInput, GrandFinal, MatchUpdate, SeedOrdering, SideResult, SideUpdate, StageSettings,
    StageType, Status,
};
use bracket_manager::{BracketManager, MemoryStorage};

const ELIMINATION_ORDERINGS: [SeedOrdering; 6] = [
    SeedOrdering::Natural,
    SeedOrdering::Reverse,
    SeedOrdering::HalfShift,
    SeedOrdering::ReverseHalfShift,
    SeedOrdering::PairFlip,
    SeedOrdering::InnerOuter,
];

fn manager() -> BracketManager {
    BracketManager::new(Arc::new(MemoryStorage::new()))
}

fn names(n: u32) -> Vec<Option<String>> {
    (1..=n).map(|i| Some(format!("team {i}"))).collect()
}

fn win(match_id: i64, winner_first_side: bool) -> MatchUpdate {
    let winner = SideUpdate {
        result: Some(SideResult::Win),
        ..SideUpdate::default()
    };
    MatchUpdate {
        id: match_id,
        opponent1: winner_first_side.then_some(winner),
        opponent2: (!winner_first_side).then_some(winner),
    }
}

#[tokio::test]
async fn single_elimination_round_sizes_hold_for_every_ordering() {
    for size in [4u32, 8, 16, 32] {
        for ordering in ELIMINATION_ORDERINGS {
            let manager = manager();
            let tournament_id = manager.create_tournament("Cup").await.unwrap();
            let stage = manager
                .create_stage(CreateStageInput {
                    tournament_id,
                    name: format!("{size} teams"),
                    stage_type: StageType::SingleElimination,
                    seeding: Some(names(size)),
                    settings: StageSettings {
                        seed_ordering: Some(ordering),
                        ..StageSettings::default()
                    },
                })
                .await
                .unwrap();
            let data = manager.get_stage_data(stage.id).await.unwrap();
            assert_eq!(
                data.matches.len() as u32,
                size - 1,
                "size {size}, {ordering:?}"
            );
            let rounds = size.trailing_zeros();
            for round in 1..=rounds {
                let round_id = data
                    .rounds
                    .iter()
                    .find(|r| r.number == round)
                    .unwrap()
                    .id;
                let count = data
                    .matches
                    .iter()
                    .filter(|m| m.round_id == round_id)
                    .count() as u32;
                assert_eq!(count, size >> round, "round {round} of {size}");
            }
            // Every participant appears exactly once in round 1.
            let round1_id = data.rounds.iter().find(|r| r.number == 1).unwrap().id;
            let mut seen = HashSet::new();
            for m in data.matches.iter().filter(|m| m.round_id == round1_id) {
                for slot in [&m.opponent1, &m.opponent2] {
                    if let Some(id) = slot.participant_id() {
                        assert!(seen.insert(id), "participant seeded twice");
                    }
                }
            }
            assert_eq!(seen.len() as u32, size);
        }
    }
}

#[tokio::test]
async fn double_elimination_match_totals_hold() {
    for size in [4u32, 8, 16, 32] {
        let manager = manager();
        let tournament_id = manager.create_tournament("Cup").await.unwrap();
        let stage = manager
            .create_stage(CreateStageInput {
                tournament_id,
                name: "Playoffs".into(),
                stage_type: StageType::DoubleElimination,
                seeding: Some(names(size)),
                settings: StageSettings {
                    grand_final: GrandFinal::Simple,
                    ..StageSettings::default()
                },
            })
            .await
            .unwrap();
        let data = manager.get_stage_data(stage.id).await.unwrap();
        // (P - 1) winner matches, (P - 2) loser matches, one grand final.
        assert_eq!(data.matches.len() as u32, 2 * size - 2, "size {size}");
    }
}

/// Walk the loser-bracket winner chain until the given round.
fn chase_winners(ctx: &GraphContext, mut round: u32, mut number: u32, target: u32) -> u32 {
    while round < target {
        let step = graph::successors(
            ctx,
            Location {
                group: GROUP_SECONDARY,
                round,
                number,
            },
        )
        .into_iter()
        .find(|s| s.role == Role::Winner && s.group == GROUP_SECONDARY)
        .expect("loser bracket chain ended early");
        round = step.round;
        number = step.number;
    }
    number
}

/// A winner-bracket loser must not be fed the opponent it beat in the
/// previous winner-bracket round, wherever the bracket is wide enough to
/// avoid it.
#[tokio::test]
async fn loser_drops_avoid_prior_round_rematches() {
    for size in [8u32, 16, 32, 64] {
        let ctx = GraphContext {
            stage_type: StageType::DoubleElimination,
            bracket_size: size,
            consolation_final: false,
            grand_final: GrandFinal::Simple,
            skip_first_round: false,
            manual_ordering: None,
        };
        let rounds = ctx.main_round_count();
        for wb_round in 2..=rounds {
            for number in 1..=(size >> wb_round) {
                let drop = graph::successors(
                    &ctx,
                    Location {
                        group: graph::GROUP_MAIN,
                        round: wb_round,
                        number,
                    },
                )
                .into_iter()
                .find(|s| s.role == Role::Loser)
                .expect("winner-bracket match has no loser destination");
                if ctx.loser_round_match_count(drop.round) < 2 {
                    // A single match cannot avoid anything.
                    continue;
                }
                // The opponents this loser beat in the previous winner round
                // came from the two matches feeding this one.
                for beaten in [2 * number - 1, 2 * number] {
                    let beaten_drop = graph::successors(
                        &ctx,
                        Location {
                            group: graph::GROUP_MAIN,
                            round: wb_round - 1,
                            number: beaten,
                        },
                    )
                    .into_iter()
                    .find(|s| s.role == Role::Loser)
                    .expect("no loser destination");
                    let arrival =
                        chase_winners(&ctx, beaten_drop.round, beaten_drop.number, drop.round);
                    assert_ne!(
                        arrival, drop.number,
                        "size {size}: loser of winner round {wb_round} match {number} \
                         can immediately face the opponent beaten in round {}",
                        wb_round - 1
                    );
                }
            }
        }
    }
}

/// Favorites-advance playthroughs never produce a rematch before the grand
/// final. (Upset-heavy outcomes can still force one in single-match loser
/// rounds, which no layout can avoid.)
#[tokio::test]
async fn favorite_playthroughs_have_no_rematch_before_the_grand_final() {
    for size in [8u32, 16, 32] {
        let manager = manager();
        let tournament_id = manager.create_tournament("Cup").await.unwrap();
        let stage = manager
            .create_stage(CreateStageInput {
                tournament_id,
                name: "Playoffs".into(),
                stage_type: StageType::DoubleElimination,
                seeding: Some(names(size)),
                settings: StageSettings {
                    grand_final: GrandFinal::Simple,
                    ..StageSettings::default()
                },
            })
            .await
            .unwrap();

        // Play every match as it becomes ready.
        loop {
            let playable = manager.get_current_matches(stage.id).await.unwrap();
            if playable.is_empty() {
                break;
            }
            for m in playable {
                manager.update_match(win(m.id, true)).await.unwrap();
            }
        }

        let data = manager.get_stage_data(stage.id).await.unwrap();
        let final_group = data.groups.iter().find(|g| g.number == 3).unwrap().id;
        let mut met: HashMap<(i64, i64), u32> = HashMap::new();
        for m in data.matches.iter().filter(|m| m.group_id != final_group) {
            if let (Some(a), Some(b)) =
                (m.opponent1.participant_id(), m.opponent2.participant_id())
            {
                *met.entry((a.min(b), a.max(b))).or_default() += 1;
            }
        }
        for (pair, count) in met {
            assert_eq!(
                count, 1,
                "size {size}: pair {pair:?} met {count} times before the grand final"
            );
        }
    }
}

#[tokio::test]
async fn statuses_only_move_forward_without_resets() {
    let manager = manager();
    let tournament_id = manager.create_tournament("Cup").await.unwrap();
    let stage = manager
        .create_stage(CreateStageInput {
            tournament_id,
            name: "Main".into(),
            stage_type: StageType::SingleElimination,
            seeding: Some(names(8)),
            settings: StageSettings::default(),
        })
        .await
        .unwrap();

    let mut last_seen: HashMap<i64, Status> = HashMap::new();
    loop {
        let data = manager.get_stage_data(stage.id).await.unwrap();
        for m in &data.matches {
            if let Some(previous) = last_seen.insert(m.id, m.status) {
                assert!(
                    m.status >= previous,
                    "match {} went backwards: {previous:?} -> {:?}",
                    m.id,
                    m.status
                );
            }
        }
        let playable = manager.get_current_matches(stage.id).await.unwrap();
        let Some(next) = playable.first() else {
            break;
        };
        manager.update_match(win(next.id, true)).await.unwrap();
    }
}

#[tokio::test]
async fn double_byes_propagate_byes_not_winners() {
    let manager = manager();
    let tournament_id = manager.create_tournament("Cup").await.unwrap();
    let stage = manager
        .create_stage(CreateStageInput {
            tournament_id,
            name: "Main".into(),
            stage_type: StageType::SingleElimination,
            seeding: Some(vec![Some("A".into()), None, None, None]),
            settings: StageSettings::default(),
        })
        .await
        .unwrap();
    let data = manager.get_stage_data(stage.id).await.unwrap();

    // The all-BYE opener completes with no winner; the final completes with
    // the lone participant against the propagated BYE.
    for m in &data.matches {
        assert_eq!(m.status, Status::Completed);
        if let Some(winner) = m.winner_side() {
            assert!(!m.slot(winner).is_bye());
        }
    }
    let standings = manager.get_final_standings(stage.id).await.unwrap();
    assert_eq!(standings.len(), 1);
    assert_eq!(standings[0].name, "A");
    assert_eq!(standings[0].rank, 1);
}

#[tokio::test]
async fn round_robin_pairings_are_exact() {
    for (participants, groups) in [(6u32, 1u32), (7, 1), (8, 2), (12, 3)] {
        let manager = manager();
        let tournament_id = manager.create_tournament("League").await.unwrap();
        let stage = manager
            .create_stage(CreateStageInput {
                tournament_id,
                name: "Groups".into(),
                stage_type: StageType::RoundRobin,
                seeding: Some(names(participants)),
                settings: StageSettings {
                    group_count: Some(groups),
                    ..StageSettings::default()
                },
            })
            .await
            .unwrap();
        let data = manager.get_stage_data(stage.id).await.unwrap();

        for group in &data.groups {
            let mut members = HashSet::new();
            let mut met = HashSet::new();
            for m in data.matches.iter().filter(|m| m.group_id == group.id) {
                let a = m.opponent1.participant_id().unwrap();
                let b = m.opponent2.participant_id().unwrap();
                members.insert(a);
                members.insert(b);
                assert!(
                    met.insert((a.min(b), a.max(b))),
                    "{participants} in {groups} groups: pair met twice"
                );
            }
            let n = members.len();
            assert_eq!(
                met.len(),
                n * (n - 1) / 2,
                "{participants} participants in {groups} groups"
            );
        }
    }
}
