//! Database-backed flows. Skipped unless `DATABASE_URL` points at a Postgres instance.

use std::env;

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use trudify_backend::{
    config::Config,
    domain::{locale::Locale, review_gate::BlockLevel},
    dto::{
        application_dto::CreateApplicationPayload, review_dto::CreateReviewPayload,
        task_dto::{CreateTaskPayload, TaskListQuery},
    },
    error::Error,
    services::translation_service::TranslationService,
    AppState,
};

fn test_config(database_url: String) -> Config {
    Config {
        server_address: "127.0.0.1:0".into(),
        database_url,
        jwt_secret: "test_secret_key".into(),
        jwt_ttl_hours: 1,
        webapp_url: "http://localhost:3000".into(),
        api_public_url: "http://localhost:8000".into(),
        public_rps: 1000,
        api_rps: 1000,
        telegram_bot_token: "123456:test-token".into(),
        telegram_bot_username: "TrudifyTestBot".into(),
        telegram_webhook_secret: None,
        resend_api_key: None,
        email_from: "Trudify <test@trudify.com>".into(),
        deepl_api_key: None,
        deepl_api_url: "http://127.0.0.1:1/v2/translate".into(),
        deepl_monthly_char_limit: 0,
        review_publish_delay_hours: 0,
    }
}

async fn setup() -> Option<(AppState, PgPool)> {
    dotenvy::dotenv().ok();
    let Ok(database_url) = env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping");
        return None;
    };
    let pool = PgPool::connect(&database_url).await.expect("connect");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("migrations");
    let config = test_config(database_url);
    let state = AppState::new(pool.clone(), reqwest::Client::new(), &config);
    Some((state, pool))
}

async fn create_user(pool: &PgPool, name: &str, role: &str) -> Uuid {
    sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO users (email, full_name, role_hint) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(format!("{}-{}@example.com", name.to_lowercase(), Uuid::new_v4()))
    .bind(name)
    .bind(role)
    .fetch_one(pool)
    .await
    .expect("insert user")
}

fn task_payload(title: &str) -> CreateTaskPayload {
    CreateTaskPayload {
        title: title.into(),
        description: "Needs to be done by the end of the week, tools provided.".into(),
        category: "repairs".into(),
        subcategory: None,
        budget_min: Some(Decimal::new(50, 0)),
        budget_max: Some(Decimal::new(120, 0)),
        city: "Sofia".into(),
        deadline: None,
        images: vec![],
    }
}

fn offer(price: i64) -> CreateApplicationPayload {
    CreateApplicationPayload {
        proposed_price: Decimal::new(price, 0),
        message: Some("Can start tomorrow".into()),
    }
}

#[tokio::test]
async fn full_task_lifecycle() {
    let Some((state, pool)) = setup().await else {
        return;
    };
    let customer = create_user(&pool, "Customer", "customer").await;
    let pro_a = create_user(&pool, "ProA", "professional").await;
    let pro_b = create_user(&pool, "ProB", "professional").await;

    let task = state
        .task_service
        .create(customer, task_payload("Fix the kitchen sink"), Locale::Bg)
        .await
        .unwrap();
    assert_eq!(task.status, "open");

    let own = state.application_service.apply(task.id, customer, offer(80)).await;
    assert!(matches!(own, Err(Error::Domain { code: "own_task", .. })));

    let app_a = state.application_service.apply(task.id, pro_a, offer(80)).await.unwrap();
    let app_b = state.application_service.apply(task.id, pro_b, offer(90)).await.unwrap();

    let duplicate = state.application_service.apply(task.id, pro_a, offer(70)).await;
    assert!(matches!(duplicate, Err(Error::Conflict(_))));

    let forbidden = state.application_service.accept(app_a.id, pro_b).await;
    assert!(matches!(forbidden, Err(Error::Forbidden(_))));

    let accepted = state.application_service.accept(app_a.id, customer).await.unwrap();
    assert_eq!(accepted.status, "accepted");

    let other = sqlx::query_scalar::<_, String>("SELECT status FROM applications WHERE id = $1")
        .bind(app_b.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(other, "rejected");

    let task = state.task_service.get(task.id).await.unwrap();
    assert_eq!(task.status, "in_progress");
    assert_eq!(task.professional_id, Some(pro_a));

    let second_accept = state.application_service.accept(app_b.id, customer).await;
    assert!(matches!(
        second_accept,
        Err(Error::Domain { code: "invalid_transition", .. })
    ));

    let late = state.application_service.apply(task.id, pro_b, offer(60)).await;
    assert!(matches!(late, Err(Error::Domain { code: "invalid_transition", .. })));

    let task = state.task_service.mark_complete(task.id, pro_a).await.unwrap();
    assert_eq!(task.status, "pending_customer_confirmation");

    let wrong_side = state.task_service.confirm_completion(task.id, pro_a).await;
    assert!(matches!(wrong_side, Err(Error::Domain { code: "forbidden_actor", .. })));

    let task = state
        .task_service
        .confirm_completion(task.id, customer)
        .await
        .unwrap();
    assert_eq!(task.status, "completed");
    assert!(task.completed_at.is_some());

    let gate = state.review_service.gate(customer).await.unwrap();
    assert_eq!(gate.pending_count, 1);
    assert_eq!(gate.block_level, BlockLevel::SoftBlock);

    let review = CreateReviewPayload {
        task_id: task.id,
        rating: 5,
        comment: Some("Quick and tidy".into()),
    };
    state.review_service.create(customer, review.clone()).await.unwrap();
    let again = state.review_service.create(customer, review).await;
    assert!(matches!(again, Err(Error::Domain { code: "already_reviewed", .. })));

    let (rating, total) = sqlx::query_as::<_, (Option<f64>, i32)>(
        "SELECT average_rating, total_reviews FROM users WHERE id = $1",
    )
    .bind(pro_a)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(rating, Some(5.0));
    assert_eq!(total, 1);

    let gate = state.review_service.gate(customer).await.unwrap();
    assert_eq!(gate.block_level, BlockLevel::None);

    let cancel_completed = state.task_service.cancel(task.id, customer, None).await;
    assert!(matches!(
        cancel_completed,
        Err(Error::Domain { code: "invalid_transition", .. })
    ));
}

#[tokio::test]
async fn three_unreviewed_tasks_block_creation() {
    let Some((state, pool)) = setup().await else {
        return;
    };
    let customer = create_user(&pool, "Busy", "customer").await;
    let pro = create_user(&pool, "Pro", "professional").await;

    for i in 0..3 {
        sqlx::query(
            r#"
            INSERT INTO tasks (customer_id, professional_id, title, description, category, city, status, completed_at)
            VALUES ($1, $2, $3, 'Finished work waiting for a review', 'cleaning', 'Plovdiv', 'completed', NOW())
            "#,
        )
        .bind(customer)
        .bind(pro)
        .bind(format!("Done task {}", i))
        .execute(&pool)
        .await
        .unwrap();
    }

    let gate = state.review_service.gate(customer).await.unwrap();
    assert_eq!(gate.block_level, BlockLevel::HardBlock);
    assert!(!gate.can_create);
    assert_eq!(gate.pending_tasks.len(), 3);

    let blocked = state
        .task_service
        .create(customer, task_payload("One more task"), Locale::En)
        .await;
    assert!(matches!(blocked, Err(Error::Domain { code: "review_hard_block", .. })));
}

#[tokio::test]
async fn cancel_closes_applications_and_reopen_clears_assignment() {
    let Some((state, pool)) = setup().await else {
        return;
    };
    let customer = create_user(&pool, "Host", "customer").await;
    let pro = create_user(&pool, "Worker", "professional").await;
    let waiting = create_user(&pool, "Waiting", "professional").await;

    let task = state
        .task_service
        .create(customer, task_payload("Assemble wardrobe"), Locale::Ru)
        .await
        .unwrap();
    let chosen = state.application_service.apply(task.id, pro, offer(100)).await.unwrap();
    state.application_service.accept(chosen.id, customer).await.unwrap();

    let removed = state
        .task_service
        .remove_professional(task.id, customer, Some("No show".into()))
        .await
        .unwrap();
    assert_eq!(removed.status, "open");
    assert_eq!(removed.professional_id, None);

    let pending = state.application_service.apply(task.id, waiting, offer(95)).await.unwrap();
    let cancelled = state
        .task_service
        .cancel(task.id, customer, Some("Changed plans".into()))
        .await
        .unwrap();
    assert_eq!(cancelled.status, "cancelled");
    assert_eq!(cancelled.cancellation_reason.as_deref(), Some("Changed plans"));

    let status = sqlx::query_scalar::<_, String>("SELECT status FROM applications WHERE id = $1")
        .bind(pending.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(status, "rejected");

    let reopened = state.task_service.reopen(task.id, customer).await.unwrap();
    assert_eq!(reopened.status, "open");
    assert_eq!(reopened.cancellation_reason, None);
}

#[tokio::test]
async fn deletion_is_blocked_by_active_work() {
    let Some((state, pool)) = setup().await else {
        return;
    };
    let customer = create_user(&pool, "Leaving", "customer").await;
    state
        .task_service
        .create(customer, task_payload("Paint the fence"), Locale::Bg)
        .await
        .unwrap();

    let preflight = state.user_service.deletion_preflight(customer).await.unwrap();
    assert!(!preflight.can_delete);
    assert_eq!(preflight.blockers.len(), 1);

    let result = state.user_service.soft_delete(customer).await;
    assert!(matches!(result, Err(Error::Domain { code: "deletion_blocked", .. })));

    let idle = create_user(&pool, "Idle", "customer").await;
    state.user_service.soft_delete(idle).await.unwrap();
    let user = state.user_service.get(idle).await.unwrap();
    assert!(user.is_deleted());
    assert_eq!(user.email, None);
}

#[tokio::test]
async fn deleted_accounts_cannot_post_or_apply() {
    let Some((state, pool)) = setup().await else {
        return;
    };
    let customer = create_user(&pool, "Owner", "customer").await;
    let task = state
        .task_service
        .create(customer, task_payload("Mount a shelf"), Locale::En)
        .await
        .unwrap();

    let gone = create_user(&pool, "Gone", "professional").await;
    state.user_service.soft_delete(gone).await.unwrap();

    let created = state
        .task_service
        .create(gone, task_payload("Posted after deletion"), Locale::En)
        .await;
    assert!(matches!(created, Err(Error::Unauthorized(_))));

    let applied = state.application_service.apply(task.id, gone, offer(40)).await;
    assert!(matches!(applied, Err(Error::Unauthorized(_))));

    let asked = state.question_service.ask(task.id, gone, "Is parking available?").await;
    assert!(matches!(asked, Err(Error::Unauthorized(_))));

    let applications = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM applications WHERE task_id = $1")
        .bind(task.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(applications, 0);
}

#[tokio::test]
async fn concurrent_accepts_pick_one_professional() {
    let Some((state, pool)) = setup().await else {
        return;
    };
    let customer = create_user(&pool, "Chooser", "customer").await;
    let pro_a = create_user(&pool, "FastA", "professional").await;
    let pro_b = create_user(&pool, "FastB", "professional").await;

    let task = state
        .task_service
        .create(customer, task_payload("Replace door lock"), Locale::En)
        .await
        .unwrap();
    let app_a = state.application_service.apply(task.id, pro_a, offer(60)).await.unwrap();
    let app_b = state.application_service.apply(task.id, pro_b, offer(65)).await.unwrap();

    let (first, second) = tokio::join!(
        state.application_service.accept(app_a.id, customer),
        state.application_service.accept(app_b.id, customer),
    );
    assert_eq!(
        [first.is_ok(), second.is_ok()].iter().filter(|ok| **ok).count(),
        1
    );
    let loser = if first.is_ok() { second } else { first };
    assert!(matches!(
        loser,
        Err(Error::Domain { code: "invalid_transition", .. }) | Err(Error::Conflict(_))
    ));

    let accepted = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM applications WHERE task_id = $1 AND status = 'accepted'",
    )
    .bind(task.id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(accepted, 1);

    let task = state.task_service.get(task.id).await.unwrap();
    assert_eq!(task.status, "in_progress");
    assert!(task.professional_id == Some(pro_a) || task.professional_id == Some(pro_b));
}

#[tokio::test]
async fn stale_translation_is_not_stored() {
    let Some((_state, pool)) = setup().await else {
        return;
    };
    let customer = create_user(&pool, "Editor", "customer").await;
    let task_id = sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO tasks (customer_id, title, description, source_language, category, city)
        VALUES ($1, 'Clean windows', 'Two rooms, second floor', 'en', 'cleaning', 'Varna')
        RETURNING id
        "#,
    )
    .bind(customer)
    .fetch_one(&pool)
    .await
    .unwrap();
    sqlx::query("UPDATE tasks SET title = 'Clean windows and balcony' WHERE id = $1")
        .bind(task_id)
        .execute(&pool)
        .await
        .unwrap();

    let translations = TranslationService::new(
        pool.clone(),
        reqwest::Client::new(),
        None,
        "http://127.0.0.1:1/v2/translate".into(),
        0,
    );

    let stored = translations
        .store_translation(
            task_id,
            "Clean windows",
            "Two rooms, second floor",
            "Почистване на прозорци",
            "Две стаи, втори етаж",
        )
        .await
        .unwrap();
    assert!(!stored);
    let title_bg = sqlx::query_scalar::<_, Option<String>>("SELECT title_bg FROM tasks WHERE id = $1")
        .bind(task_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(title_bg, None);

    let stored = translations
        .store_translation(
            task_id,
            "Clean windows and balcony",
            "Two rooms, second floor",
            "Почистване на прозорци и балкон",
            "Две стаи, втори етаж",
        )
        .await
        .unwrap();
    assert!(stored);
}

#[tokio::test]
async fn search_treats_wildcards_literally() {
    let Some((state, pool)) = setup().await else {
        return;
    };
    let customer = create_user(&pool, "Seller", "customer").await;
    let tag = Uuid::new_v4().simple().to_string();
    for title in [format!("Paint {} 50% of the wall", tag), format!("Paint {} 500 bricks", tag)] {
        sqlx::query(
            r#"
            INSERT INTO tasks (customer_id, title, description, category, city)
            VALUES ($1, $2, 'Paint job in the city centre', 'repairs', 'Sofia')
            "#,
        )
        .bind(customer)
        .bind(title)
        .execute(&pool)
        .await
        .unwrap();
    }

    let found = state
        .task_service
        .list_open(TaskListQuery {
            search: Some(format!("{} 50%", tag)),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(found.total, 1);
    assert!(found.items[0].title.contains("50%"));
}
