use chrono::{Duration, TimeZone, Utc};
use stockroom::config::{BootstrapConfig, SecurityConfig};
use stockroom::db::{ItemQuery, StockStore, UsersStore, is_unique_violation};
use stockroom::models::{Direction, ItemInput, MovementInput, Role, StockFilter};
use stockroom::services::{SeaOrmUserService, UserService};

fn temp_url(kind: &str) -> String {
    let path = std::env::temp_dir()
        .join(format!("stockroom-{kind}-{}.db", uuid::Uuid::new_v4()));
    format!("sqlite:{}", path.display())
}

fn fast_security() -> SecurityConfig {
    SecurityConfig {
        argon2_memory_cost_kib: 1024,
        argon2_time_cost: 1,
        ..SecurityConfig::default()
    }
}

fn item(finis: &str, full: &str, quantity: i32) -> ItemInput {
    ItemInput {
        finis_code: finis.to_string(),
        full_code: full.to_string(),
        description: format!("{full} description"),
        quantity,
    }
}

fn movement(direction: Direction, qty: i32, day: u32, note: Option<&str>) -> MovementInput {
    MovementInput {
        direction,
        qty,
        occurred_at: Utc.with_ymd_and_hms(2025, 1, day, 10, 0, 0).unwrap(),
        note: note.map(ToString::to_string),
    }
}

async fn can_log_in(
    store: &UsersStore,
    username: &str,
    password: &str,
    security: &SecurityConfig,
) -> bool {
    store
        .verify_credentials(username, password, security)
        .await
        .unwrap()
        .is_some()
}

#[tokio::test]
async fn test_users_store_credentials_and_uniqueness() {
    let store = UsersStore::new(&temp_url("users")).await.unwrap();
    let security = fast_security();

    let user = store
        .create_user("paula", "correct horse", Role::User, &security)
        .await
        .unwrap();
    assert_eq!(store.count_users().await.unwrap(), 1);

    assert!(can_log_in(&store, "paula", "correct horse", &security).await);
    assert!(!can_log_in(&store, "paula", "wrong", &security).await);
    assert!(!can_log_in(&store, "nobody", "correct horse", &security).await);

    let err = store
        .create_user("paula", "another one", Role::Admin, &security)
        .await
        .unwrap_err();
    assert!(is_unique_violation(&err));
    assert_eq!(store.count_users().await.unwrap(), 1);

    assert!(store.set_locked(user.id, true).await.unwrap());
    assert!(store.get_user(user.id).await.unwrap().unwrap().locked);

    assert!(store.set_password(user.id, "new secret", &security).await.unwrap());
    assert!(can_log_in(&store, "paula", "new secret", &security).await);

    let names = store.username_map().await.unwrap();
    assert_eq!(names.get(&user.id).map(String::as_str), Some("paula"));

    assert!(store.delete_user(user.id).await.unwrap());
    assert!(!store.delete_user(user.id).await.unwrap());
}

#[tokio::test]
async fn test_unknown_username_costs_a_hash() {
    let store = UsersStore::new(&temp_url("users")).await.unwrap();
    store
        .create_user("paula", "correct horse", Role::User, &fast_security())
        .await
        .unwrap();

    let unusable = SecurityConfig {
        argon2_memory_cost_kib: 1,
        ..fast_security()
    };

    // stored hashes carry their own params
    assert!(!can_log_in(&store, "paula", "wrong", &unusable).await);

    // a missing account hashes with the configured params
    let err = store
        .verify_credentials("nobody", "wrong", &unusable)
        .await
        .unwrap_err();
    assert!(format!("{err:#}").contains("Argon2"));
}

#[tokio::test]
async fn test_item_list_filters_and_search() {
    let store = StockStore::new(&temp_url("stock")).await.unwrap();

    store.create_item(&item("F-10", "F-10-A", 1), 1).await.unwrap();
    store.create_item(&item("F-20", "F-20-A", 2), 1).await.unwrap();
    store.create_item(&item("G-30", "G-30-A", 3), 2).await.unwrap();

    let all = store
        .list_items(&ItemQuery {
            limit: 500,
            ..ItemQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(all.len(), 3);

    let own = store
        .list_items(&ItemQuery {
            owner: Some(2),
            limit: 500,
            ..ItemQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(own.len(), 1);
    assert_eq!(own[0].full_code, "G-30-A");

    // search is case-insensitive and covers the description
    let found = store
        .list_items(&ItemQuery {
            search: Some("f-20-a desc".to_string()),
            limit: 500,
            ..ItemQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(found.len(), 1);

    let capped = store
        .list_items(&ItemQuery {
            limit: 2,
            ..ItemQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(capped.len(), 2);
}

#[tokio::test]
async fn test_update_keeps_creation_audit() {
    let store = StockStore::new(&temp_url("stock")).await.unwrap();

    let created = store.create_item(&item("F-1", "F-1-A", 1), 5).await.unwrap();
    let updated = store
        .update_item(created.id, &item("F-1", "F-1-B", 4), 6)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(updated.created_by_id, 5);
    assert_eq!(updated.created_at, created.created_at);
    assert_eq!(updated.updated_by_id, Some(6));
    assert_eq!(updated.full_code, "F-1-B");

    assert!(store.update_item(9999, &item("x", "y", 0), 6).await.unwrap().is_none());
}

#[tokio::test]
async fn test_movements_adjust_quantity_and_feed_stats() {
    let store = StockStore::new(&temp_url("stock")).await.unwrap();

    let bolt = store.create_item(&item("B", "B-1", 0), 1).await.unwrap();
    let nut = store.create_item(&item("N", "N-1", 0), 1).await.unwrap();

    let (_, bolt_after) = store
        .record_movement(bolt.id, &movement(Direction::In, 10, 1, Some("initial")), 1)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(bolt_after.quantity, 10);
    assert_eq!(bolt_after.updated_by_id, Some(1));

    store
        .record_movement(bolt.id, &movement(Direction::Out, 4, 5, None), 2)
        .await
        .unwrap();
    store
        .record_movement(nut.id, &movement(Direction::In, 7, 6, None), 2)
        .await
        .unwrap();
    let (_, bolt_after) = store
        .record_movement(bolt.id, &movement(Direction::Out, 50, 8, None), 2)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(bolt_after.quantity, 0);

    assert!(
        store
            .record_movement(9999, &movement(Direction::In, 1, 1, None), 1)
            .await
            .unwrap()
            .is_none()
    );

    let day = |d: u32| Utc.with_ymd_and_hms(2025, 1, d, 0, 0, 0).unwrap();

    // everything before Jan 5 is the first IN of 10
    assert_eq!(store.net_before(day(5), None, None).await.unwrap(), 10);
    assert_eq!(store.net_before(day(7), None, None).await.unwrap(), 13);
    assert_eq!(store.net_before(day(7), Some("N"), None).await.unwrap(), 7);
    assert_eq!(store.net_before(day(7), None, Some(2)).await.unwrap(), 3);

    let rows = store
        .movements_in_range(day(5), day(7), None, None)
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].full_code, "B-1");
    assert_eq!(rows[0].direction, Direction::Out);
    assert_eq!(rows[1].finis_code, "N");

    let rows = store
        .movements_in_range(day(1), day(1) + Duration::days(31), Some("B"), Some(2))
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);

    assert_eq!(store.current_stock(None, None).await.unwrap(), 7);
    assert_eq!(store.current_stock(Some("B"), None).await.unwrap(), 0);
    assert_eq!(store.current_stock(None, Some(2)).await.unwrap(), 7);

    let history = store.item_movements(bolt.id, 2).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].qty, 50);
}

#[tokio::test]
async fn test_grouped_totals() {
    let store = StockStore::new(&temp_url("stock")).await.unwrap();

    store.create_item(&item("A", "A-1", 1), 1).await.unwrap();
    store.create_item(&item("A", "A-2", 2), 2).await.unwrap();
    store.create_item(&item("A", "A-3", 3), 2).await.unwrap();
    store.create_item(&item("C", "C-1", 10), 1).await.unwrap();

    let filter = StockFilter::default();

    let mut by_code = store.totals_by_code(&filter).await.unwrap();
    by_code.sort_by(|a, b| a.finis_code.cmp(&b.finis_code));
    assert_eq!(by_code.len(), 2);
    assert_eq!((by_code[0].item_count, by_code[0].quantity), (3, 6));
    assert_eq!((by_code[1].item_count, by_code[1].quantity), (1, 10));

    let mut by_user = store.totals_by_user(&filter).await.unwrap();
    by_user.sort_by_key(|u| u.user_id);
    assert_eq!((by_user[0].user_id, by_user[0].item_count, by_user[0].quantity), (1, 2, 11));
    assert_eq!((by_user[1].user_id, by_user[1].item_count, by_user[1].quantity), (2, 2, 5));

    let pairs = store.totals_by_code_and_user(&filter).await.unwrap();
    assert_eq!(pairs.len(), 3);

    let user_two = StockFilter {
        code: None,
        user_id: Some(2),
    };
    let rows = store.find_items(&user_two).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|i| i.created_by_id == 2));
}

#[tokio::test]
async fn test_concurrent_movements_are_all_applied() {
    let store = StockStore::new(&temp_url("stock")).await.unwrap();
    let bolt_id = store.create_item(&item("B", "B-1", 0), 1).await.unwrap().id;

    let handles: Vec<_> = (0..20)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .record_movement(bolt_id, &movement(Direction::In, 1, 2, None), 1)
                    .await
            })
        })
        .collect();
    for handle in handles {
        assert!(handle.await.unwrap().unwrap().is_some());
    }

    let bolt_now = store.get_item(bolt_id).await.unwrap().unwrap();
    assert_eq!(bolt_now.quantity, 20);
    assert_eq!(store.item_movements(bolt_id, 100).await.unwrap().len(), 20);

    let handles: Vec<_> = (0..25)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .record_movement(bolt_id, &movement(Direction::Out, 1, 3, None), 2)
                    .await
            })
        })
        .collect();
    for handle in handles {
        assert!(handle.await.unwrap().unwrap().is_some());
    }

    let bolt_now = store.get_item(bolt_id).await.unwrap().unwrap();
    assert_eq!(bolt_now.quantity, 0);
    assert_eq!(bolt_now.updated_by_id, Some(2));
    assert_eq!(store.item_movements(bolt_id, 100).await.unwrap().len(), 45);
}

async fn user_service() -> (UsersStore, SeaOrmUserService) {
    let store = UsersStore::new(&temp_url("users")).await.unwrap();
    let service = SeaOrmUserService::new(store.clone(), fast_security());
    (store, service)
}

#[tokio::test]
async fn test_bootstrap_creates_development_admin() {
    let (store, service) = user_service().await;

    let admin = service
        .bootstrap_admin(&BootstrapConfig::default())
        .await
        .unwrap()
        .expect("an empty users table gets an admin");
    assert_eq!(admin.username, "admin");
    assert_eq!(admin.role, Role::Admin);
    assert!(!admin.locked);
    assert!(can_log_in(&store, "admin", "admin", &fast_security()).await);

    // a second start finds the account and leaves it alone
    assert!(service.bootstrap_admin(&BootstrapConfig::default()).await.unwrap().is_none());
    assert_eq!(store.count_users().await.unwrap(), 1);
}

#[tokio::test]
async fn test_bootstrap_uses_configured_credentials() {
    let (store, service) = user_service().await;
    let bootstrap = BootstrapConfig {
        admin_user: Some("  chief ".to_string()),
        admin_pass: Some("s3cret-pass".to_string()),
        create_default_admin: true,
    };

    let admin = service.bootstrap_admin(&bootstrap).await.unwrap().unwrap();
    assert_eq!(admin.username, "chief");
    assert_eq!(admin.role, Role::Admin);
    assert!(can_log_in(&store, "chief", "s3cret-pass", &fast_security()).await);
    assert!(store.get_user_by_username("admin").await.unwrap().is_none());
}

#[tokio::test]
async fn test_bootstrap_disabled_creates_nobody() {
    let (store, service) = user_service().await;
    let bootstrap = BootstrapConfig {
        create_default_admin: false,
        ..BootstrapConfig::default()
    };

    assert!(service.bootstrap_admin(&bootstrap).await.unwrap().is_none());
    assert_eq!(store.count_users().await.unwrap(), 0);
}

#[tokio::test]
async fn test_bootstrap_skipped_when_users_exist() {
    let (store, service) = user_service().await;
    store
        .create_user("paula", "correct horse", Role::User, &fast_security())
        .await
        .unwrap();

    let bootstrap = BootstrapConfig {
        admin_user: Some("chief".to_string()),
        admin_pass: Some("s3cret-pass".to_string()),
        create_default_admin: true,
    };
    assert!(service.bootstrap_admin(&bootstrap).await.unwrap().is_none());
    assert_eq!(store.count_users().await.unwrap(), 1);
    assert!(store.get_user_by_username("chief").await.unwrap().is_none());
}
