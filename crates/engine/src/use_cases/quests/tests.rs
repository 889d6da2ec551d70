//! Quest scheduler scenarios over the in-memory store.

use std::sync::Arc;

use archipelago_domain::{CrewMemberId, QuestStatus};
use chrono::Duration;

use super::*;
use crate::infrastructure::ports::{ProgressionRepo, QuestRepo};
use crate::test_fixtures::{crew, island, quest, TestEngine};

fn crew_list(ids: &[&str]) -> Vec<CrewMemberId> {
    ids.iter().map(|id| crew(id)).collect()
}

fn violation(err: QuestError) -> PreconditionViolation {
    match err {
        QuestError::Precondition(v) => v,
        QuestError::Repo(e) => panic!("expected precondition violation, got {e}"),
    }
}

#[tokio::test]
async fn start_records_active_instance() {
    let engine = TestEngine::new();
    let u = engine.new_user("sailor").await;

    let view = engine
        .app
        .use_cases
        .quests
        .start
        .execute(&u, &quest("dock_cleanup"), crew_list(&["captain"]))
        .await
        .unwrap();

    assert_eq!(view.quest.started_at, crate::test_fixtures::epoch());
    assert_eq!(
        view.status,
        QuestStatus::Active {
            ready_at: crate::test_fixtures::epoch() + Duration::hours(2),
            remaining_seconds: 2 * 3600,
        }
    );
    assert_eq!(engine.store.active_for_user(&u).await.unwrap().len(), 1);
}

#[tokio::test]
async fn start_rejects_malformed_requests() {
    let engine = TestEngine::new();
    let u = engine.new_user("sailor").await;
    let start = &engine.app.use_cases.quests.start;

    let err = start
        .execute(&u, &quest("treasure_hunt"), crew_list(&["captain"]))
        .await
        .unwrap_err();
    assert_eq!(
        violation(err),
        PreconditionViolation::UnknownQuest(quest("treasure_hunt"))
    );

    let err = start
        .execute(&u, &quest("dock_cleanup"), crew_list(&[]))
        .await
        .unwrap_err();
    assert!(matches!(
        violation(err),
        PreconditionViolation::WrongCompanionCount {
            required: 1,
            supplied: 0,
            ..
        }
    ));

    let err = start
        .execute(&u, &quest("chart_reef"), crew_list(&["captain", "captain"]))
        .await
        .unwrap_err();
    assert_eq!(
        violation(err),
        PreconditionViolation::DuplicateCompanion(crew("captain"))
    );

    let err = start
        .execute(&u, &quest("chart_reef"), crew_list(&["captain", "diver"]))
        .await
        .unwrap_err();
    assert!(matches!(
        violation(err),
        PreconditionViolation::RequiredCompanionMissing { .. }
    ));

    assert!(engine.store.active_for_user(&u).await.unwrap().is_empty());
}

#[tokio::test]
async fn start_requires_unlocked_island_and_crew() {
    let engine = TestEngine::new();
    let u = engine.new_user("sailor").await;
    let start = &engine.app.use_cases.quests.start;

    let err = start
        .execute(&u, &quest("chart_reef"), crew_list(&["captain", "navigator"]))
        .await
        .unwrap_err();
    assert_eq!(
        violation(err),
        PreconditionViolation::IslandLocked {
            quest: quest("chart_reef"),
            island: island("reef"),
        }
    );

    let err = start
        .execute(&u, &quest("dock_cleanup"), crew_list(&["navigator"]))
        .await
        .unwrap_err();
    assert_eq!(
        violation(err),
        PreconditionViolation::CompanionLocked(crew("navigator"))
    );

    assert!(engine.store.active_for_user(&u).await.unwrap().is_empty());
}

#[tokio::test]
async fn busy_companion_cannot_be_assigned_twice() {
    let engine = TestEngine::new();
    let u = engine.new_user("sailor").await;
    let start = &engine.app.use_cases.quests.start;

    start
        .execute(&u, &quest("dock_cleanup"), crew_list(&["captain"]))
        .await
        .unwrap();

    let err = start
        .execute(&u, &quest("net_fishing"), crew_list(&["captain"]))
        .await
        .unwrap_err();
    assert!(err.is_precondition_violation());
    assert_eq!(
        violation(err),
        PreconditionViolation::CompanionBusy(crew("captain"))
    );
    assert_eq!(engine.store.active_for_user(&u).await.unwrap().len(), 1);

    // Another user's captain is unaffected
    let other = engine.new_user("other").await;
    start
        .execute(&other, &quest("net_fishing"), crew_list(&["captain"]))
        .await
        .unwrap();
}

#[tokio::test]
async fn same_template_cannot_run_twice_at_once() {
    let engine = TestEngine::new();
    let u = engine.new_user("sailor").await;
    engine
        .store
        .insert_crew_unlock(&archipelago_domain::CrewUnlock {
            user_id: u.clone(),
            crew_member_id: crew("navigator"),
            unlocked_at: crate::test_fixtures::epoch(),
        })
        .await
        .unwrap();
    let start = &engine.app.use_cases.quests.start;

    start
        .execute(&u, &quest("net_fishing"), crew_list(&["captain"]))
        .await
        .unwrap();
    let err = start
        .execute(&u, &quest("net_fishing"), crew_list(&["navigator"]))
        .await
        .unwrap_err();
    assert_eq!(
        violation(err),
        PreconditionViolation::QuestAlreadyActive(quest("net_fishing"))
    );
}

#[tokio::test]
async fn status_is_a_pure_function_of_elapsed_time() {
    let engine = TestEngine::new();
    let u = engine.new_user("sailor").await;
    let quests = &engine.app.use_cases.quests;

    let started = quests
        .start
        .execute(&u, &quest("dock_cleanup"), crew_list(&["captain"]))
        .await
        .unwrap();
    let id = started.quest.id;

    engine
        .clock
        .advance(Duration::hours(2) - Duration::milliseconds(1));
    for _ in 0..3 {
        let view = quests.status.get(&u, id).await.unwrap();
        assert_eq!(
            view.status,
            QuestStatus::Active {
                ready_at: started.status.ready_at(),
                remaining_seconds: 1,
            }
        );
    }

    let err = quests.collect.execute(&u, id).await.unwrap_err();
    assert!(matches!(
        violation(err),
        PreconditionViolation::NotYetDue { .. }
    ));
    assert!(engine.store.history_for_user(&u).await.unwrap().is_empty());
    assert_eq!(engine.store.balance(&u).await.unwrap().amount(), 0);

    engine.clock.advance(Duration::milliseconds(1));
    for _ in 0..3 {
        let view = quests.status.get(&u, id).await.unwrap();
        assert!(view.status.is_ready());
    }
}

#[tokio::test]
async fn collecting_clears_island_and_unlocks_next_in_chain() {
    let engine = TestEngine::new();
    let u = engine.new_user("sailor").await;
    let quests = &engine.app.use_cases.quests;

    let started = quests
        .start
        .execute(&u, &quest("dock_cleanup"), crew_list(&["captain"]))
        .await
        .unwrap();
    engine.clock.advance(Duration::hours(3));

    let collected = quests.collect.execute(&u, started.quest.id).await.unwrap();
    assert_eq!(collected.history.reward.amount(), 100);
    assert_eq!(collected.history.completed_at, started.status.ready_at());
    assert_eq!(collected.balance.amount(), 100);
    assert_eq!(collected.cleared_island, Some(island("harbor")));
    assert_eq!(collected.unlocked_islands, vec![island("reef")]);
    assert_eq!(collected.unlocked_crew, vec![crew("navigator")]);

    let ledger = &engine.store;
    assert!(ledger.is_island_unlocked(&u, &island("reef")).await.unwrap());
    assert!(!ledger.is_island_unlocked(&u, &island("volcano")).await.unwrap());
    assert!(ledger.is_crew_unlocked(&u, &crew("navigator")).await.unwrap());
    assert!(ledger.active_for_user(&u).await.unwrap().is_empty());
}

#[tokio::test]
async fn non_repeatable_is_blocked_after_collect_but_repeatable_is_not() {
    let engine = TestEngine::new();
    let u = engine.new_user("sailor").await;
    let quests = &engine.app.use_cases.quests;

    for template in ["dock_cleanup", "net_fishing"] {
        let started = quests
            .start
            .execute(&u, &quest(template), crew_list(&["captain"]))
            .await
            .unwrap();
        engine.clock.advance(Duration::hours(2));
        quests.collect.execute(&u, started.quest.id).await.unwrap();
    }

    let err = quests
        .start
        .execute(&u, &quest("dock_cleanup"), crew_list(&["captain"]))
        .await
        .unwrap_err();
    assert_eq!(
        violation(err),
        PreconditionViolation::NonRepeatableAlreadyCompleted(quest("dock_cleanup"))
    );

    quests
        .start
        .execute(&u, &quest("net_fishing"), crew_list(&["captain"]))
        .await
        .unwrap();
}

#[tokio::test]
async fn retired_instance_cannot_be_collected_again() {
    let engine = TestEngine::new();
    let u = engine.new_user("sailor").await;
    let quests = &engine.app.use_cases.quests;

    let started = quests
        .start
        .execute(&u, &quest("net_fishing"), crew_list(&["captain"]))
        .await
        .unwrap();
    engine.clock.advance(Duration::hours(1));
    quests.collect.execute(&u, started.quest.id).await.unwrap();

    let err = quests
        .collect
        .execute(&u, started.quest.id)
        .await
        .unwrap_err();
    assert_eq!(
        violation(err),
        PreconditionViolation::InstanceNotActive(started.quest.id)
    );
    assert_eq!(engine.store.history_for_user(&u).await.unwrap().len(), 1);
}

#[tokio::test]
async fn other_users_cannot_collect_an_instance() {
    let engine = TestEngine::new();
    let owner = engine.new_user("owner").await;
    let thief = engine.new_user("thief").await;
    let quests = &engine.app.use_cases.quests;

    let started = quests
        .start
        .execute(&owner, &quest("net_fishing"), crew_list(&["captain"]))
        .await
        .unwrap();
    engine.clock.advance(Duration::hours(1));

    let err = quests
        .collect
        .execute(&thief, started.quest.id)
        .await
        .unwrap_err();
    assert!(matches!(
        violation(err),
        PreconditionViolation::InstanceNotActive(_)
    ));
    quests.collect.execute(&owner, started.quest.id).await.unwrap();
}

#[tokio::test]
async fn island_reward_is_granted_once() {
    let engine = TestEngine::new();
    let u = engine.new_user("sailor").await;
    let quests = &engine.app.use_cases.quests;

    // Clear harbor, then the reef via chart_reef
    let dock = quests
        .start
        .execute(&u, &quest("dock_cleanup"), crew_list(&["captain"]))
        .await
        .unwrap();
    engine.clock.advance(Duration::hours(2));
    quests.collect.execute(&u, dock.quest.id).await.unwrap();

    let chart = quests
        .start
        .execute(&u, &quest("chart_reef"), crew_list(&["navigator", "captain"]))
        .await
        .unwrap();
    engine.clock.advance(Duration::hours(4));
    let collected = quests.collect.execute(&u, chart.quest.id).await.unwrap();
    assert_eq!(collected.cleared_island, Some(island("reef")));
    // 100 (dock) + 300 (chart) + 250 (reef clearance)
    assert_eq!(collected.balance.amount(), 650);
    assert_eq!(collected.unlocked_islands, vec![island("volcano")]);

    // Repeatable reef quest never re-grants the clearance reward
    let pearls = quests
        .start
        .execute(&u, &quest("pearl_diving"), crew_list(&["navigator"]))
        .await
        .unwrap();
    engine.clock.advance(Duration::hours(1));
    let again = quests.collect.execute(&u, pearls.quest.id).await.unwrap();
    assert_eq!(again.cleared_island, None);
    assert_eq!(again.balance.amount(), 670);
    assert_eq!(engine.store.clearances(&u).await.unwrap().len(), 2);
}

#[tokio::test]
async fn last_island_grants_crew_without_successor() {
    let engine = TestEngine::new();
    let u = engine.new_user("sailor").await;
    let quests = &engine.app.use_cases.quests;

    for (template, hours, crew_ids) in [
        ("dock_cleanup", 2, &["captain"][..]),
        ("chart_reef", 4, &["captain", "navigator"][..]),
        ("ember_watch", 3, &["captain"][..]),
    ] {
        let started = quests
            .start
            .execute(&u, &quest(template), crew_list(crew_ids))
            .await
            .unwrap();
        engine.clock.advance(Duration::hours(hours));
        let collected = quests.collect.execute(&u, started.quest.id).await.unwrap();
        assert!(collected.cleared_island.is_some());
        if template == "ember_watch" {
            assert!(collected.unlocked_islands.is_empty());
            assert_eq!(collected.unlocked_crew, vec![crew("diver")]);
        }
    }
}

#[tokio::test]
async fn never_cleared_policy_keeps_chain_closed() {
    let engine = TestEngine::with_policy(Arc::new(NeverCleared));
    let u = engine.new_user("sailor").await;
    let quests = &engine.app.use_cases.quests;

    let started = quests
        .start
        .execute(&u, &quest("dock_cleanup"), crew_list(&["captain"]))
        .await
        .unwrap();
    engine.clock.advance(Duration::hours(2));
    let collected = quests.collect.execute(&u, started.quest.id).await.unwrap();

    assert_eq!(collected.cleared_island, None);
    assert!(!engine
        .store
        .is_island_unlocked(&u, &island("reef"))
        .await
        .unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_starts_for_one_companion_yield_one_instance() {
    for _ in 0..20 {
        let engine = TestEngine::new();
        let u = engine.new_user("sailor").await;

        let spawn_start = |template: &'static str| {
            let app = engine.app.clone();
            let u = u.clone();
            tokio::spawn(async move {
                app.use_cases
                    .quests
                    .start
                    .execute(&u, &quest(template), crew_list(&["captain"]))
                    .await
            })
        };
        let a = spawn_start("dock_cleanup");
        let b = spawn_start("net_fishing");
        let results = [a.await.unwrap(), b.await.unwrap()];

        let successes = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1);
        let failure = results.into_iter().find_map(|r| r.err()).unwrap();
        assert_eq!(
            violation(failure),
            PreconditionViolation::CompanionBusy(crew("captain"))
        );
        assert_eq!(engine.store.active_for_user(&u).await.unwrap().len(), 1);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_collects_yield_one_history_and_one_reward() {
    let engine = TestEngine::new();
    let u = engine.new_user("sailor").await;
    let started = engine
        .app
        .use_cases
        .quests
        .start
        .execute(&u, &quest("dock_cleanup"), crew_list(&["captain"]))
        .await
        .unwrap();
    engine.clock.advance(Duration::hours(2));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let app = engine.app.clone();
            let u = u.clone();
            let id = started.quest.id;
            tokio::spawn(async move { app.use_cases.quests.collect.execute(&u, id).await })
        })
        .collect();

    let mut successes = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            successes += 1;
        }
    }

    assert_eq!(successes, 1);
    assert_eq!(engine.store.history_for_user(&u).await.unwrap().len(), 1);
    assert_eq!(engine.store.balance(&u).await.unwrap().amount(), 100);
}
