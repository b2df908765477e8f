//! Database-backed workflow tests: the pending -> approved/rejected
//! state machine and the admin cap, run against the database named by
//! DATABASE_URL. Skipped (early return) when no database is reachable.

use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use rapmap_api::database::models::request::{STATUS_APPROVED, STATUS_REJECTED};
use rapmap_api::database::models::user::{ROLE_ADMIN, ROLE_USER};
use rapmap_api::services::geocoding::{Geocode, GeocodeError, GeoPoint};
use rapmap_api::services::moderation::{ModerationError, ModerationService, NewRequest};
use rapmap_api::services::policy::{AuthorizationPolicy, PolicyError};

/// These tests share one database, so they run one at a time.
fn db_lock() -> MutexGuard<'static, ()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    match LOCK.get_or_init(|| Mutex::new(())).lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

async fn test_pool() -> Option<PgPool> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await
        .ok()?;
    sqlx::migrate!("./migrations").run(&pool).await.ok()?;
    Some(pool)
}

struct FixedGeocoder;

#[async_trait]
impl Geocode for FixedGeocoder {
    async fn geocode(&self, _query: &str) -> Result<Vec<GeoPoint>, GeocodeError> {
        Ok(vec![GeoPoint {
            lat: 38.5816,
            lng: -121.4944,
        }])
    }
}

fn policy(pool: &PgPool) -> AuthorizationPolicy {
    AuthorizationPolicy::with_pool(pool.clone(), "primary@rapmap.test".to_string(), 3)
}

fn moderation(pool: &PgPool) -> ModerationService {
    ModerationService::with_parts(pool.clone(), policy(pool), Arc::new(FixedGeocoder))
}

async fn seed_user(pool: &PgPool, role: &str) -> String {
    let subject = format!("test-subject-{}", Uuid::new_v4());
    sqlx::query("INSERT INTO users (external_id, email, role) VALUES ($1, $2, $3)")
        .bind(&subject)
        .bind(format!("{}@rapmap.test", &subject))
        .bind(role)
        .execute(pool)
        .await
        .expect("seed user");
    subject
}

fn submission(name: &str) -> NewRequest {
    NewRequest {
        name: name.to_string(),
        city: "Sacramento".to_string(),
        state: "CA".to_string(),
        country: "USA".to_string(),
        category: "Rapper".to_string(),
        bio: "Test bio".to_string(),
        image_url: "https://images.rapmap.test/cover.jpg".to_string(),
        ..Default::default()
    }
}

async fn cleanup(pool: &PgPool, name: &str, subjects: &[&str]) {
    let _ = sqlx::query("DELETE FROM rappers WHERE lower(name) = lower($1)")
        .bind(name)
        .execute(pool)
        .await;
    let _ = sqlx::query("DELETE FROM musician_requests WHERE lower(name) = lower($1)")
        .bind(name)
        .execute(pool)
        .await;
    for subject in subjects {
        let _ = sqlx::query("DELETE FROM users WHERE external_id = $1")
            .bind(subject)
            .execute(pool)
            .await;
    }
}

async fn directory_count(pool: &PgPool, name: &str) -> i64 {
    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM rappers WHERE lower(name) = lower($1)")
            .bind(name)
            .fetch_one(pool)
            .await
            .expect("count directory rows");
    count
}

#[tokio::test]
async fn approve_happens_exactly_once() {
    let _guard = db_lock();
    let Some(pool) = test_pool().await else {
        eprintln!("DATABASE_URL not reachable, skipping");
        return;
    };

    let name = format!("MC Approve {}", Uuid::new_v4());
    let admin = seed_user(&pool, ROLE_ADMIN).await;
    let service = moderation(&pool);

    let request = service
        .submit(submission(&name), "")
        .await
        .expect("submit pending request");

    let entry = service
        .approve(request.id, &admin)
        .await
        .expect("first approve succeeds");
    assert_eq!(entry.name, name);
    assert_eq!(directory_count(&pool, &name).await, 1);

    // The request is approved now; a second approve must refuse and
    // must not write a second directory entry.
    let err = service.approve(request.id, &admin).await.unwrap_err();
    assert!(matches!(err, ModerationError::InvalidState(_)), "{err}");
    assert_eq!(directory_count(&pool, &name).await, 1);

    cleanup(&pool, &name, &[&admin]).await;
}

#[tokio::test]
async fn settled_requests_refuse_further_transitions() {
    let _guard = db_lock();
    let Some(pool) = test_pool().await else {
        eprintln!("DATABASE_URL not reachable, skipping");
        return;
    };

    let name = format!("MC Reject {}", Uuid::new_v4());
    let admin = seed_user(&pool, ROLE_ADMIN).await;
    let service = moderation(&pool);

    let request = service
        .submit(submission(&name), "")
        .await
        .expect("submit pending request");

    let rejected = service
        .reject(request.id, &admin, Some("Not enough detail".to_string()))
        .await
        .expect("first reject succeeds");
    assert_eq!(rejected.status, STATUS_REJECTED);
    assert_eq!(rejected.rejection_reason.as_deref(), Some("Not enough detail"));

    let err = service.reject(request.id, &admin, None).await.unwrap_err();
    assert!(matches!(err, ModerationError::InvalidState(_)), "{err}");

    // A rejected request cannot be approved and nothing reaches the
    // directory.
    let err = service.approve(request.id, &admin).await.unwrap_err();
    assert!(matches!(err, ModerationError::InvalidState(_)), "{err}");
    assert_eq!(directory_count(&pool, &name).await, 0);
    assert_ne!(rejected.status, STATUS_APPROVED);

    cleanup(&pool, &name, &[&admin]).await;
}

#[tokio::test]
async fn duplicate_pending_name_is_refused() {
    let _guard = db_lock();
    let Some(pool) = test_pool().await else {
        eprintln!("DATABASE_URL not reachable, skipping");
        return;
    };

    let name = format!("MC Duplicate {}", Uuid::new_v4());
    let service = moderation(&pool);

    service
        .submit(submission(&name), "")
        .await
        .expect("first submission lands pending");

    // Same name, different case: still a duplicate.
    let err = service
        .submit(submission(&name.to_uppercase()), "")
        .await
        .unwrap_err();
    assert!(matches!(err, ModerationError::Duplicate(_)), "{err}");

    cleanup(&pool, &name, &[]).await;
}

#[tokio::test]
async fn admin_cap_blocks_promotion_past_limit() {
    let _guard = db_lock();
    let Some(pool) = test_pool().await else {
        eprintln!("DATABASE_URL not reachable, skipping");
        return;
    };

    let acting = seed_user(&pool, ROLE_ADMIN).await;
    let candidate = seed_user(&pool, ROLE_USER).await;

    // The cap counts every admin in the table, so anchor it to the
    // current population: at the exact count, promotion must refuse.
    let (admins,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM users WHERE role = $1")
            .bind(ROLE_ADMIN)
            .fetch_one(&pool)
            .await
            .expect("count admins");

    let capped =
        AuthorizationPolicy::with_pool(pool.clone(), "primary@rapmap.test".to_string(), admins);
    let (candidate_id,): (Uuid,) =
        sqlx::query_as("SELECT id FROM users WHERE external_id = $1")
            .bind(&candidate)
            .fetch_one(&pool)
            .await
            .expect("candidate id");

    let err = capped
        .set_role(candidate_id, ROLE_ADMIN, &acting)
        .await
        .unwrap_err();
    assert!(matches!(err, PolicyError::LimitExceeded(_)), "{err}");

    // One more seat makes the same promotion legal.
    let roomy =
        AuthorizationPolicy::with_pool(pool.clone(), "primary@rapmap.test".to_string(), admins + 1);
    let promoted = roomy
        .set_role(candidate_id, ROLE_ADMIN, &acting)
        .await
        .expect("promotion under the cap succeeds");
    assert_eq!(promoted.role, ROLE_ADMIN);

    cleanup(&pool, "", &[&acting, &candidate]).await;
}
