//! API key limits against a live Postgres.
//!
//! Runs only when `DATABASE_URL` points at a reachable database; the schema
//! is brought up to date first.

use purse_core::access::{self, AccessError, MAX_ACTIVE_KEYS};
use purse_core::entities::users::NewUser;
use purse_core::framework::DatabaseProcessor;
use purse_core::store::{LedgerStore, PgLedgerStore};
use purse_sdk::objects::Capability;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

async fn database() -> Option<PgPool> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let pool = match PgPoolOptions::new().max_connections(16).connect(&url).await {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("skipping: cannot connect to DATABASE_URL: {e}");
            return None;
        }
    };
    sqlx::migrate!("../migrations").run(&pool).await.unwrap();
    Some(pool)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_issuance_respects_active_key_limit() {
    let Some(pool) = database().await else {
        return;
    };
    let store = PgLedgerStore::new(pool.clone());
    let (user, _) = store
        .provision_user(NewUser {
            email: format!("{}@keys.example", uuid::Uuid::new_v4()),
            name: "Key Limit".into(),
        })
        .await
        .unwrap();

    let processor = DatabaseProcessor { pool };
    let attempts = 8;
    let handles: Vec<_> = (0..attempts)
        .map(|i| {
            let processor = processor.clone();
            let user_id = user.id;
            tokio::spawn(async move {
                access::issue_key(&processor, user_id, &format!("ci-{i}"), &[Capability::Read], "1D")
                    .await
            })
        })
        .collect();

    let mut issued = 0;
    let mut refused = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => issued += 1,
            Err(AccessError::TooManyActiveKeys) => refused += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!(issued, MAX_ACTIVE_KEYS);
    assert_eq!(refused, attempts - MAX_ACTIVE_KEYS);

    let keys = access::list_keys(&processor, user.id).await.unwrap();
    assert_eq!(keys.len() as i64, MAX_ACTIVE_KEYS);
}
