//! Integration tests for single elimination stages: generation, BYE
//! handling, progression to the final and standings.

use std::sync::Arc;

use bracket_manager::model::{
    CreateStageInput, MatchUpdate, ParticipantId, SideResult, SideUpdate, Slot, Stage, StageData,
    StageSettings, StageType, Status,
};
use bracket_manager::{BracketManager, MemoryStorage};

fn manager() -> BracketManager {
    BracketManager::new(Arc::new(MemoryStorage::new()))
}

async fn create_stage(
    manager: &BracketManager,
    names: &[&str],
    settings: StageSettings,
) -> Stage {
    let tournament_id = manager.create_tournament("Cup").await.unwrap();
    manager
        .create_stage(CreateStageInput {
            tournament_id,
            name: "Main".into(),
            stage_type: StageType::SingleElimination,
            seeding: Some(names.iter().map(|n| Some(n.to_string())).collect()),
            settings,
        })
        .await
        .unwrap()
}

fn id_of(data: &StageData, name: &str) -> ParticipantId {
    data.participants
        .iter()
        .find(|p| p.name == name)
        .unwrap_or_else(|| panic!("no participant named {name}"))
        .id
}

fn names_of(data: &StageData, m: &bracket_manager::model::Match) -> (String, String) {
    let name = |slot: &Slot| {
        slot.participant_id()
            .and_then(|id| data.participants.iter().find(|p| p.id == id))
            .map(|p| p.name.clone())
            .unwrap_or_default()
    };
    (name(&m.opponent1), name(&m.opponent2))
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
async fn four_teams_flow_to_the_final() {
    let manager = manager();
    let stage = create_stage(&manager, &["A", "B", "C", "D"], StageSettings::default()).await;
    let data = manager.get_stage_data(stage.id).await.unwrap();

    assert_eq!(data.matches.len(), 3);
    assert_eq!(data.rounds.len(), 2);
    // Ranked seeding: 1 meets 4, 2 meets 3.
    assert_eq!(names_of(&data, &data.matches[0]), ("A".into(), "D".into()));
    assert_eq!(names_of(&data, &data.matches[1]), ("B".into(), "C".into()));
    assert_eq!(data.matches[0].status, Status::Ready);
    assert_eq!(data.matches[2].status, Status::Locked);

    manager.update_match(win(data.matches[0].id, true)).await.unwrap();
    manager.update_match(win(data.matches[1].id, true)).await.unwrap();

    let final_match = manager.find_match(stage.id, 1, 2, 1).await.unwrap();
    assert_eq!(final_match.status, Status::Ready);
    let data = manager.get_stage_data(stage.id).await.unwrap();
    assert_eq!(final_match.opponent1.participant_id(), Some(id_of(&data, "A")));
    assert_eq!(final_match.opponent2.participant_id(), Some(id_of(&data, "B")));
}

#[tokio::test]
async fn three_teams_get_one_bye() {
    let manager = manager();
    let stage = create_stage(&manager, &["A", "B", "C"], StageSettings::default()).await;
    let data = manager.get_stage_data(stage.id).await.unwrap();

    assert_eq!(data.matches.len(), 3);
    let bye_match = &data.matches[0];
    assert_eq!(bye_match.status, Status::Completed);
    assert_eq!(bye_match.winner_id(), Some(id_of(&data, "A")));
    assert!(bye_match.opponent2.is_bye());

    let contested = &data.matches[1];
    assert_eq!(names_of(&data, contested), ("B".into(), "C".into()));
    assert_eq!(contested.status, Status::Ready);

    // The final already holds A and awaits the other semifinal.
    let final_match = &data.matches[2];
    assert_eq!(final_match.status, Status::Waiting);
    assert_eq!(final_match.opponent1.participant_id(), Some(id_of(&data, "A")));
    assert!(final_match.opponent2.is_pending());
}

#[tokio::test]
async fn byes_never_win_a_match() {
    let manager = manager();
    let stage = create_stage(&manager, &["A", "B", "C", "D", "E"], StageSettings::default()).await;
    let data = manager.get_stage_data(stage.id).await.unwrap();
    for m in &data.matches {
        if m.status >= Status::Completed {
            if let Some(winner) = m.winner_side() {
                assert!(!m.slot(winner).is_bye(), "a BYE won match {}", m.id);
            }
        }
    }
}

#[tokio::test]
async fn balanced_byes_spread_over_the_first_round() {
    let manager = manager();
    let settings = StageSettings {
        size: Some(8),
        seed_ordering: Some(bracket_manager::model::SeedOrdering::Natural),
        balance_byes: true,
        ..StageSettings::default()
    };
    let stage = create_stage(&manager, &["A", "B", "C", "D", "E", "F"], settings).await;
    let data = manager.get_stage_data(stage.id).await.unwrap();

    let round1: Vec<_> = data.matches.iter().take(4).collect();
    let bye_matches = round1
        .iter()
        .filter(|m| m.opponent1.is_bye() || m.opponent2.is_bye())
        .count();
    assert_eq!(bye_matches, 2);
    // No double-BYE pairings.
    assert!(round1
        .iter()
        .all(|m| !(m.opponent1.is_bye() && m.opponent2.is_bye())));
    // Both BYE winners advanced, making the first semifinal ready.
    let semifinal = manager.find_match(stage.id, 1, 2, 1).await.unwrap();
    assert_eq!(semifinal.status, Status::Ready);
}

#[tokio::test]
async fn consolation_final_ranks_third_and_fourth() {
    let manager = manager();
    let settings = StageSettings {
        consolation_final: true,
        ..StageSettings::default()
    };
    let stage = create_stage(&manager, &["A", "B", "C", "D"], settings).await;
    let data = manager.get_stage_data(stage.id).await.unwrap();
    assert_eq!(data.groups.len(), 2);
    assert_eq!(data.matches.len(), 4);

    // A and B win their semifinals, then the final; C wins the consolation.
    manager.update_match(win(data.matches[0].id, true)).await.unwrap();
    manager.update_match(win(data.matches[1].id, true)).await.unwrap();
    let final_match = manager.find_match(stage.id, 1, 2, 1).await.unwrap();
    let consolation = manager.find_match(stage.id, 2, 1, 1).await.unwrap();
    assert_eq!(consolation.status, Status::Ready);
    manager.update_match(win(final_match.id, true)).await.unwrap();
    manager.update_match(win(consolation.id, false)).await.unwrap();

    let standings = manager.get_final_standings(stage.id).await.unwrap();
    let ranked: Vec<(String, u32)> = standings.iter().map(|s| (s.name.clone(), s.rank)).collect();
    assert_eq!(
        ranked,
        vec![
            ("A".to_string(), 1),
            ("B".to_string(), 2),
            ("C".to_string(), 3),
            ("D".to_string(), 4),
        ]
    );
}

#[tokio::test]
async fn standings_rank_by_round_of_elimination() {
    let manager = manager();
    let names = ["A", "B", "C", "D", "E", "F", "G", "H"];
    let stage = create_stage(&manager, &names, StageSettings::default()).await;

    // The first listed side wins every match.
    for round in 1..=3 {
        for number in 1..=(8 >> round) {
            let m = manager.find_match(stage.id, 1, round, number).await.unwrap();
            manager.update_match(win(m.id, true)).await.unwrap();
        }
    }
    let standings = manager.get_final_standings(stage.id).await.unwrap();
    assert_eq!(standings[0].rank, 1);
    assert_eq!(standings[1].rank, 2);
    let ranks: Vec<u32> = standings.iter().map(|s| s.rank).collect();
    assert_eq!(ranks, vec![1, 2, 3, 3, 5, 5, 5, 5]);
    assert_eq!(standings[0].name, "A");
}

#[tokio::test]
async fn stage_is_numbered_within_its_tournament() {
    let manager = manager();
    let tournament_id = manager.create_tournament("Cup").await.unwrap();
    for expected in 1..=2 {
        let stage = manager
            .create_stage(CreateStageInput {
                tournament_id,
                name: format!("Stage {expected}"),
                stage_type: StageType::SingleElimination,
                seeding: Some(vec![Some("A".into()), Some("B".into())]),
                settings: StageSettings::default(),
            })
            .await
            .unwrap();
        assert_eq!(stage.number, expected);
    }
}

#[tokio::test]
async fn deleting_a_stage_keeps_participants() {
    let manager = manager();
    let stage = create_stage(&manager, &["A", "B", "C", "D"], StageSettings::default()).await;
    let tournament_id = stage.tournament_id;
    manager.delete_stage(stage.id).await.unwrap();
    assert!(manager.get_stage_data(stage.id).await.is_err());
    let data = manager.get_tournament_data(tournament_id).await.unwrap();
    assert_eq!(data.participants.len(), 4);
    assert!(data.stages.is_empty());

    manager.delete_tournament(tournament_id).await.unwrap();
    assert!(manager.get_tournament_data(tournament_id).await.is_err());
}
