//! Integration tests for the progression engine: validation, forfeits,
//! best-of series, resets and idempotence.

use std::sync::Arc;

use bracket_manager::model::{
    CreateStageInput, MatchGameUpdate, MatchUpdate, SideResult, SideUpdate, Stage, StageSettings,
    StageType, Status,
};
use bracket_manager::{BracketManager, Error, MemoryStorage};

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

fn game_win(game_id: i64, winner_first_side: bool) -> MatchGameUpdate {
    let winner = SideUpdate {
        result: Some(SideResult::Win),
        ..SideUpdate::default()
    };
    MatchGameUpdate {
        id: game_id,
        opponent1: winner_first_side.then_some(winner),
        opponent2: (!winner_first_side).then_some(winner),
    }
}

#[tokio::test]
async fn best_of_three_completes_the_parent_and_archives_the_tail() {
    let manager = manager();
    let settings = StageSettings {
        matches_child_count: 3,
        ..StageSettings::default()
    };
    let stage = create_stage(&manager, &["A", "B"], settings).await;
    let data = manager.get_stage_data(stage.id).await.unwrap();
    let parent = &data.matches[0];
    let games = manager.get_match_games(parent.id).await.unwrap();
    assert_eq!(games.len(), 3);
    assert!(games.iter().all(|g| g.status == Status::Ready));

    manager.update_match_game(game_win(games[0].id, true)).await.unwrap();
    let parent_now = manager.find_match(stage.id, 1, 1, 1).await.unwrap();
    assert_eq!(parent_now.status, Status::Running);
    assert_eq!(parent_now.opponent1.as_side().unwrap().score, Some(1));

    manager.update_match_game(game_win(games[1].id, true)).await.unwrap();
    let parent_now = manager.find_match(stage.id, 1, 1, 1).await.unwrap();
    assert_eq!(parent_now.status, Status::Completed);
    assert_eq!(parent_now.winner_id(), data.matches[0].opponent1.participant_id());
    assert_eq!(parent_now.opponent1.as_side().unwrap().score, Some(2));
    assert_eq!(parent_now.opponent2.as_side().unwrap().score, Some(0));

    let games = manager.get_match_games(parent.id).await.unwrap();
    assert_eq!(games[2].status, Status::Archived);
}

#[tokio::test]
async fn best_of_parents_reject_direct_score_updates() {
    let manager = manager();
    let settings = StageSettings {
        matches_child_count: 3,
        ..StageSettings::default()
    };
    let stage = create_stage(&manager, &["A", "B"], settings).await;
    let parent = manager.find_match(stage.id, 1, 1, 1).await.unwrap();

    let err = manager
        .update_match(MatchUpdate {
            id: parent.id,
            opponent1: Some(SideUpdate {
                score: Some(1),
                ..SideUpdate::default()
            }),
            opponent2: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UseMatchGameUpdate(_)));

    // A score beyond the win threshold is a score error, not a redirect.
    let err = manager
        .update_match(MatchUpdate {
            id: parent.id,
            opponent1: Some(SideUpdate {
                score: Some(5),
                ..SideUpdate::default()
            }),
            opponent2: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidScore(_)));
}

#[tokio::test]
async fn resetting_a_game_reopens_the_series() {
    let manager = manager();
    let settings = StageSettings {
        matches_child_count: 3,
        ..StageSettings::default()
    };
    let stage = create_stage(&manager, &["A", "B"], settings).await;
    let parent = manager.find_match(stage.id, 1, 1, 1).await.unwrap();
    let games = manager.get_match_games(parent.id).await.unwrap();
    manager.update_match_game(game_win(games[0].id, true)).await.unwrap();
    manager.update_match_game(game_win(games[1].id, true)).await.unwrap();

    manager.reset_match_game_results(games[1].id).await.unwrap();
    let parent_now = manager.find_match(stage.id, 1, 1, 1).await.unwrap();
    assert_eq!(parent_now.status, Status::Running);
    assert_eq!(parent_now.winner_id(), None);
    let games = manager.get_match_games(parent.id).await.unwrap();
    assert_eq!(games[1].status, Status::Ready);
    assert_eq!(games[2].status, Status::Ready);
}

#[tokio::test]
async fn reset_refuses_when_downstream_has_results() {
    let manager = manager();
    let stage = create_stage(&manager, &["A", "B", "C", "D"], StageSettings::default()).await;
    let data = manager.get_stage_data(stage.id).await.unwrap();
    manager.update_match(win(data.matches[0].id, true)).await.unwrap();
    manager.update_match(win(data.matches[1].id, true)).await.unwrap();
    let final_match = manager.find_match(stage.id, 1, 2, 1).await.unwrap();
    manager.update_match(win(final_match.id, true)).await.unwrap();

    let before = manager.get_stage_data(stage.id).await.unwrap();
    let err = manager
        .reset_match_results(data.matches[0].id)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::CannotResetDownstreamCompleted(id) if id == final_match.id));
    // The refusal mutates nothing.
    let after = manager.get_stage_data(stage.id).await.unwrap();
    assert_eq!(before, after);

    // Resetting the final first unblocks the semifinal reset.
    manager.reset_match_results(final_match.id).await.unwrap();
    manager.reset_match_results(data.matches[0].id).await.unwrap();
    let final_match = manager.find_match(stage.id, 1, 2, 1).await.unwrap();
    assert_eq!(final_match.status, Status::Waiting);
    assert!(final_match.opponent1.is_pending());
}

#[tokio::test]
async fn reset_then_reapply_restores_the_stage_byte_for_byte() {
    let manager = manager();
    let stage = create_stage(&manager, &["A", "B", "C", "D"], StageSettings::default()).await;
    let data = manager.get_stage_data(stage.id).await.unwrap();
    let update = MatchUpdate {
        id: data.matches[0].id,
        opponent1: Some(SideUpdate {
            score: Some(2),
            result: Some(SideResult::Win),
            ..SideUpdate::default()
        }),
        opponent2: Some(SideUpdate {
            score: Some(1),
            ..SideUpdate::default()
        }),
    };
    manager.update_match(update).await.unwrap();
    let recorded = manager.get_stage_data(stage.id).await.unwrap();

    manager.reset_match_results(data.matches[0].id).await.unwrap();
    let cleared = manager.get_stage_data(stage.id).await.unwrap();
    assert_eq!(cleared.matches[0].status, Status::Ready);
    assert_ne!(recorded, cleared);

    manager.update_match(update).await.unwrap();
    let reapplied = manager.get_stage_data(stage.id).await.unwrap();
    assert_eq!(recorded, reapplied);
}

#[tokio::test]
async fn repeating_an_update_is_idempotent() {
    let manager = manager();
    let stage = create_stage(&manager, &["A", "B", "C", "D"], StageSettings::default()).await;
    let data = manager.get_stage_data(stage.id).await.unwrap();
    let update = win(data.matches[0].id, true);

    manager.update_match(update).await.unwrap();
    let once = manager.get_stage_data(stage.id).await.unwrap();
    manager.update_match(update).await.unwrap();
    let twice = manager.get_stage_data(stage.id).await.unwrap();
    assert_eq!(once, twice);
}

#[tokio::test]
async fn forfeit_concedes_and_keeps_the_score_for_display() {
    let manager = manager();
    let stage = create_stage(&manager, &["A", "B", "C", "D"], StageSettings::default()).await;
    let data = manager.get_stage_data(stage.id).await.unwrap();
    manager
        .update_match(MatchUpdate {
            id: data.matches[0].id,
            opponent1: Some(SideUpdate {
                score: Some(1),
                forfeit: Some(true),
                ..SideUpdate::default()
            }),
            opponent2: Some(SideUpdate {
                score: Some(1),
                ..SideUpdate::default()
            }),
        })
        .await
        .unwrap();
    let m = manager.find_match(stage.id, 1, 1, 1).await.unwrap();
    assert_eq!(m.status, Status::Completed);
    assert_eq!(m.winner_id(), m.opponent2.participant_id());
    assert_eq!(m.opponent1.as_side().unwrap().score, Some(1));

    // The opponent advanced to the final.
    let final_match = manager.find_match(stage.id, 1, 2, 1).await.unwrap();
    assert_eq!(
        final_match.opponent1.participant_id(),
        m.opponent2.participant_id()
    );
}

#[tokio::test]
async fn validation_rejects_malformed_updates() {
    let manager = manager();
    let stage = create_stage(&manager, &["A", "B", "C", "D"], StageSettings::default()).await;
    let data = manager.get_stage_data(stage.id).await.unwrap();
    let m = &data.matches[0];

    // Wrong participant on the slot.
    let err = manager
        .update_match(MatchUpdate {
            id: m.id,
            opponent1: Some(SideUpdate {
                id: Some(9999),
                score: Some(1),
                ..SideUpdate::default()
            }),
            opponent2: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidOpponent(_)));

    // Two declared winners.
    let winner = SideUpdate {
        result: Some(SideResult::Win),
        ..SideUpdate::default()
    };
    let err = manager
        .update_match(MatchUpdate {
            id: m.id,
            opponent1: Some(winner),
            opponent2: Some(winner),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidResult(_)));

    // Draws are not a thing in elimination.
    let draw = SideUpdate {
        result: Some(SideResult::Draw),
        ..SideUpdate::default()
    };
    let err = manager
        .update_match(MatchUpdate {
            id: m.id,
            opponent1: Some(draw),
            opponent2: Some(draw),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidResult(_)));

    // Locked matches reject outcomes.
    let final_match = manager.find_match(stage.id, 1, 2, 1).await.unwrap();
    let err = manager
        .update_match(win(final_match.id, true))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidOpponent(_) | Error::InvalidTransition(_)));

    // Unknown match id.
    let err = manager.update_match(win(123456, true)).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn even_best_of_is_rejected_for_elimination() {
    let manager = manager();
    let tournament_id = manager.create_tournament("Cup").await.unwrap();
    let err = manager
        .create_stage(CreateStageInput {
            tournament_id,
            name: "Main".into(),
            stage_type: StageType::SingleElimination,
            seeding: Some(vec![Some("A".into()), Some("B".into())]),
            settings: StageSettings {
                matches_child_count: 2,
                ..StageSettings::default()
            },
        })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
}

#[tokio::test]
async fn navigation_follows_a_participant_through_the_bracket() {
    let manager = manager();
    let stage = create_stage(&manager, &["A", "B", "C", "D"], StageSettings::default()).await;
    let data = manager.get_stage_data(stage.id).await.unwrap();
    let opener = &data.matches[0];
    let winner_id = opener.opponent1.participant_id().unwrap();
    let loser_id = opener.opponent2.participant_id().unwrap();
    manager.update_match(win(opener.id, true)).await.unwrap();

    let next = manager
        .find_next_matches(opener.id, Some(winner_id))
        .await
        .unwrap();
    assert_eq!(next.len(), 1);
    let final_match = manager.find_match(stage.id, 1, 2, 1).await.unwrap();
    assert_eq!(next[0].id, final_match.id);
    // The loser goes nowhere in single elimination.
    let next = manager
        .find_next_matches(opener.id, Some(loser_id))
        .await
        .unwrap();
    assert!(next.is_empty());

    let previous = manager
        .find_previous_matches(final_match.id, Some(winner_id))
        .await
        .unwrap();
    assert_eq!(previous.len(), 1);
    assert_eq!(previous[0].id, opener.id);

    let location = manager.find_match_location(final_match.id).await.unwrap();
    assert_eq!(
        (location.group_number, location.round_number, location.match_number),
        (1, 2, 1)
    );

    let current = manager.get_current_matches(stage.id).await.unwrap();
    // Only the second opener remains playable.
    assert_eq!(current.len(), 1);
    assert_eq!(current[0].id, data.matches[1].id);
}
