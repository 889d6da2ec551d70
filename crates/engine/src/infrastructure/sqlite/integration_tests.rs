//! SQLite adapter tests against a temporary database file.

use archipelago_domain::{
    ActiveQuest, CrewMemberId, CrewUnlock, Currency, IslandId, IslandUnlock, QuestHistoryRecord,
    QuestTemplateId, Reward, UserId, CURRENCY_CAP,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use tempfile::TempDir;

use super::SqliteStore;
use crate::infrastructure::ports::{
    AccountRepo, CatalogMarker, CatalogRepo, ClearanceGrant, CollectionCommit, ProgressionRepo,
    QuestRepo,
};
use crate::test_fixtures::archipelago_document;

async fn open_store() -> (SqliteStore, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("archipelago.db");
    let store = SqliteStore::new(path.to_str().unwrap()).await.unwrap();
    (store, dir)
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

fn user(id: &str) -> UserId {
    UserId::new(id).unwrap()
}

fn island(id: &str) -> IslandId {
    IslandId::new(id).unwrap()
}

fn crew(id: &str) -> CrewMemberId {
    CrewMemberId::new(id).unwrap()
}

fn active(user_id: &str, template: &str, crew_ids: &[&str]) -> ActiveQuest {
    ActiveQuest::new(
        user(user_id),
        QuestTemplateId::new(template).unwrap(),
        crew_ids.iter().map(|c| crew(c)).collect(),
        t0(),
    )
}

fn history_for(quest: &ActiveQuest, reward: u64, collected_after_hours: i64) -> QuestHistoryRecord {
    QuestHistoryRecord {
        instance_id: quest.id,
        user_id: quest.user_id.clone(),
        template_id: quest.template_id.clone(),
        crew: quest.crew.clone(),
        started_at: quest.started_at,
        completed_at: quest.started_at + Duration::hours(1),
        collected_at: quest.started_at + Duration::hours(collected_after_hours),
        reward: Currency::new(reward),
    }
}

#[tokio::test]
async fn schema_bootstrap_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("archipelago.db");
    let path = path.to_str().unwrap();

    let store = SqliteStore::new(path).await.unwrap();
    store.register(&user("u1"), t0()).await.unwrap();
    drop(store);

    let reopened = SqliteStore::new(path).await.unwrap();
    assert_eq!(reopened.list_active().await.unwrap(), vec![user("u1")]);
}

#[tokio::test]
async fn unlock_inserts_are_idempotent() {
    let (store, _dir) = open_store().await;
    let unlock = IslandUnlock {
        user_id: user("u1"),
        island_id: island("harbor"),
        unlocked_at: t0(),
    };

    assert!(store.insert_island_unlock(&unlock).await.unwrap());
    assert!(!store.insert_island_unlock(&unlock).await.unwrap());
    assert!(store
        .is_island_unlocked(&user("u1"), &island("harbor"))
        .await
        .unwrap());
    assert!(!store
        .is_island_unlocked(&user("u2"), &island("harbor"))
        .await
        .unwrap());

    let stored = store.island_unlocks(&user("u1")).await.unwrap();
    assert_eq!(stored, vec![unlock]);

    let crew_unlock = CrewUnlock {
        user_id: user("u1"),
        crew_member_id: crew("captain"),
        unlocked_at: t0(),
    };
    assert!(store.insert_crew_unlock(&crew_unlock).await.unwrap());
    assert!(!store.insert_crew_unlock(&crew_unlock).await.unwrap());
    assert_eq!(store.crew_unlocks(&user("u1")).await.unwrap().len(), 1);
}

#[tokio::test]
async fn currency_saturates_at_cap() {
    let (store, _dir) = open_store().await;
    let u = user("whale");

    assert_eq!(store.balance(&u).await.unwrap(), Currency::ZERO);
    store
        .add_currency(&u, Currency::new(CURRENCY_CAP - 10))
        .await
        .unwrap();
    let balance = store.add_currency(&u, Currency::new(25)).await.unwrap();
    assert_eq!(balance.amount(), CURRENCY_CAP);

    let balance = store.add_currency(&u, Currency::MAX).await.unwrap();
    assert_eq!(balance.amount(), CURRENCY_CAP);
    assert_eq!(store.balance(&u).await.unwrap().amount(), CURRENCY_CAP);
}

#[tokio::test]
async fn database_rejects_busy_crew_and_duplicate_template() {
    let (store, _dir) = open_store().await;
    store
        .insert_active(&active("u1", "fish", &["captain"]))
        .await
        .unwrap();

    let busy = store
        .insert_active(&active("u1", "scout", &["navigator", "captain"]))
        .await
        .unwrap_err();
    assert!(busy.is_constraint_violation());

    let duplicate = store
        .insert_active(&active("u1", "fish", &["navigator"]))
        .await
        .unwrap_err();
    assert!(duplicate.is_constraint_violation());

    // The failed transaction left no partial crew assignment behind
    store
        .insert_active(&active("u1", "scout", &["navigator"]))
        .await
        .unwrap();
    assert_eq!(store.active_for_user(&user("u1")).await.unwrap().len(), 2);
}

#[tokio::test]
async fn active_quest_round_trips() {
    let (store, _dir) = open_store().await;
    let quest = active("u1", "chart_reef", &["captain", "navigator"]);
    store.insert_active(&quest).await.unwrap();

    let loaded = store
        .get_active(&user("u1"), quest.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loaded, quest);
    assert!(store.get_active(&user("u2"), quest.id).await.unwrap().is_none());
}

#[tokio::test]
async fn active_template_ids_are_distinct_across_users() {
    let (store, _dir) = open_store().await;
    assert!(store.active_template_ids().await.unwrap().is_empty());

    store.insert_active(&active("u1", "net_fishing", &["captain"])).await.unwrap();
    store.insert_active(&active("u2", "net_fishing", &["captain"])).await.unwrap();
    store.insert_active(&active("u2", "chart_reef", &["navigator"])).await.unwrap();

    assert_eq!(
        store.active_template_ids().await.unwrap(),
        vec![
            QuestTemplateId::new("chart_reef").unwrap(),
            QuestTemplateId::new("net_fishing").unwrap(),
        ]
    );
}

#[tokio::test]
async fn commit_collection_applies_everything_once() {
    let (store, _dir) = open_store().await;
    let quest = active("u1", "dock_cleanup", &["captain"]);
    store.insert_active(&quest).await.unwrap();

    let commit = CollectionCommit {
        history: history_for(&quest, 100, 3),
        clearance: Some(ClearanceGrant {
            island_id: island("harbor"),
            reward: Reward::crew_member(crew("navigator")),
            next_island: Some(island("reef")),
        }),
    };

    let applied = store.commit_collection(&commit).await.unwrap();
    assert_eq!(applied.balance, Currency::new(100));
    assert!(applied.island_cleared);
    assert_eq!(applied.unlocked_islands, vec![island("reef")]);
    assert_eq!(applied.unlocked_crew, vec![crew("navigator")]);

    let again = store.commit_collection(&commit).await.unwrap_err();
    assert!(again.is_not_found());

    assert_eq!(store.balance(&user("u1")).await.unwrap(), Currency::new(100));
    assert_eq!(store.history_for_user(&user("u1")).await.unwrap().len(), 1);
    assert!(store.active_for_user(&user("u1")).await.unwrap().is_empty());
    assert!(store
        .has_history(&user("u1"), &QuestTemplateId::new("dock_cleanup").unwrap())
        .await
        .unwrap());

    // Captain is free again
    store
        .insert_active(&active("u1", "net_fishing", &["captain"]))
        .await
        .unwrap();
}

#[tokio::test]
async fn currency_clearance_reward_is_granted_once() {
    let (store, _dir) = open_store().await;
    let grant = ClearanceGrant {
        island_id: island("volcano"),
        reward: Reward::currency(500),
        next_island: None,
    };

    let first = active("u1", "ember_watch", &["captain"]);
    store.insert_active(&first).await.unwrap();
    let applied = store
        .commit_collection(&CollectionCommit {
            history: history_for(&first, 10, 2),
            clearance: Some(grant.clone()),
        })
        .await
        .unwrap();
    assert!(applied.island_cleared);
    assert_eq!(applied.balance, Currency::new(510));

    let second = active("u1", "ember_watch", &["captain"]);
    store.insert_active(&second).await.unwrap();
    let applied = store
        .commit_collection(&CollectionCommit {
            history: history_for(&second, 10, 4),
            clearance: Some(grant),
        })
        .await
        .unwrap();
    assert!(!applied.island_cleared);
    assert_eq!(applied.balance, Currency::new(520));
    assert_eq!(store.clearances(&user("u1")).await.unwrap().len(), 1);
}

#[tokio::test]
async fn history_is_newest_first() {
    let (store, _dir) = open_store().await;
    for (template, hours) in [("a", 2), ("b", 5), ("c", 3)] {
        let quest = active("u1", template, &["captain"]);
        store.insert_active(&quest).await.unwrap();
        store
            .commit_collection(&CollectionCommit {
                history: history_for(&quest, 1, hours),
                clearance: None,
            })
            .await
            .unwrap();
    }

    let order: Vec<String> = store
        .history_for_user(&user("u1"))
        .await
        .unwrap()
        .into_iter()
        .map(|h| h.template_id.to_string())
        .collect();
    assert_eq!(order, vec!["b", "c", "a"]);
}

#[tokio::test]
async fn catalog_replace_and_load() {
    let (store, _dir) = open_store().await;
    assert!(store.marker().await.unwrap().is_none());
    assert!(store.load().await.unwrap().is_none());

    let document = archipelago_document();
    let marker = CatalogMarker {
        version: document.version,
        checksum: "abc123".into(),
        loaded_at: t0(),
    };
    store.replace(&document, &marker).await.unwrap();

    assert_eq!(store.marker().await.unwrap(), Some(marker));
    assert_eq!(store.load().await.unwrap(), Some(document.clone()));

    let mut smaller = document;
    smaller.version += 1;
    smaller.quests.truncate(1);
    let marker = CatalogMarker {
        version: smaller.version,
        checksum: "def456".into(),
        loaded_at: t0() + Duration::days(1),
    };
    store.replace(&smaller, &marker).await.unwrap();
    assert_eq!(store.load().await.unwrap(), Some(smaller));
}

#[tokio::test]
async fn accounts_register_and_deactivate() {
    let (store, _dir) = open_store().await;
    assert!(store.register(&user("b"), t0()).await.unwrap());
    assert!(store
        .register(&user("a"), t0() + Duration::seconds(1))
        .await
        .unwrap());
    assert!(!store.register(&user("b"), t0()).await.unwrap());
    assert_eq!(store.list_active().await.unwrap(), vec![user("b"), user("a")]);

    store.deactivate(&user("b")).await.unwrap();
    assert_eq!(store.list_active().await.unwrap(), vec![user("a")]);
    assert!(store
        .deactivate(&user("nobody"))
        .await
        .unwrap_err()
        .is_not_found());

    store.register(&user("b"), t0()).await.unwrap();
    assert_eq!(store.list_active().await.unwrap(), vec![user("b"), user("a")]);
}
