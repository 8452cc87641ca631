use scholar_stream::{
    error::AppError,
    models::{
        ApplicationFilter, CreateScholarshipRequest, NewApplication, NewReview, NewScholarship,
        NewUser, PaidTransition, PaymentStatus, Role, ScholarshipQuery, ScholarshipSearch,
        ScholarshipSort, UpdateReviewRequest, UserFilter,
    },
    repository::{InMemoryRepository, PostgresRepository, Repository},
};
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

fn new_user(email: &str) -> NewUser {
    NewUser {
        email: email.to_string(),
        name: Some("Test User".to_string()),
        photo_url: None,
    }
}

fn new_scholarship(name: &str, fees: f64) -> NewScholarship {
    NewScholarship {
        request: CreateScholarshipRequest {
            name: name.to_string(),
            university: "Test University".to_string(),
            country: "Canada".to_string(),
            degree: "Bachelor".to_string(),
            application_fees: fees,
            ..CreateScholarshipRequest::default()
        },
        posted_by: "admin@scholar.test".to_string(),
    }
}

fn new_application(scholarship_id: Uuid, email: &str) -> NewApplication {
    NewApplication {
        scholarship_id,
        user_email: email.to_string(),
        user_name: None,
        scholarship_name: "Test".to_string(),
        university_name: "Test University".to_string(),
        degree: "Bachelor".to_string(),
        application_fees: 25.0,
        service_charge: 5.0,
    }
}

fn new_review(application_id: Uuid, scholarship_id: Uuid, email: &str) -> NewReview {
    NewReview {
        application_id,
        scholarship_id,
        scholarship_name: "Test".to_string(),
        university_name: "Test University".to_string(),
        user_email: email.to_string(),
        user_name: None,
        user_image: None,
        rating: 4,
        comment: "Helpful staff".to_string(),
    }
}

/// Behaviour every `Repository` must share, run against the given store. Emails are
/// suffixed so the Postgres run can reuse a database.
async fn exercise_repository(repo: &dyn Repository) {
    let tag = Uuid::new_v4().simple().to_string();
    let email = format!("ana-{}@scholar.test", tag);

    // Users: unique email, student by default.
    let user = repo.create_user(new_user(&email)).await.unwrap().unwrap();
    assert_eq!(user.role, Role::Student);
    assert!(repo.create_user(new_user(&email)).await.unwrap().is_none());
    assert!(repo.create_user(new_user(&email.to_uppercase())).await.unwrap().is_none());
    let by_email = repo.find_user_by_email(&email.to_uppercase()).await.unwrap().unwrap();
    assert_eq!(by_email.id, user.id);
    let promoted = repo.set_user_role(user.id, Role::Moderator).await.unwrap().unwrap();
    assert_eq!(promoted.role, Role::Moderator);
    let found = repo
        .list_users(&UserFilter {
            role: Some(Role::Moderator),
            search: Some(tag.clone()),
        })
        .await
        .unwrap();
    assert_eq!(found.len(), 1);

    // Scholarships.
    let scholarship = repo
        .create_scholarship(new_scholarship(&format!("Fund {}", tag), 25.0))
        .await
        .unwrap();
    let (page, total) = repo
        .search_scholarships(&ScholarshipSearch::from(ScholarshipQuery {
            search: Some(tag.clone()),
            sort: Some(ScholarshipSort::FeeLow),
            ..ScholarshipQuery::default()
        }))
        .await
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(page[0].id, scholarship.id);

    // Applications: the paid transition happens once.
    let application = repo
        .create_application(new_application(scholarship.id, &email))
        .await
        .unwrap();
    assert_eq!(application.payment_status, PaymentStatus::Unpaid);

    let txn = format!("pi_{}", tag);
    match repo.mark_application_paid(application.id, &txn).await.unwrap() {
        Some(PaidTransition::Applied(paid)) => {
            assert_eq!(paid.payment_status, PaymentStatus::Paid);
            assert!(paid.paid_at.is_some());
        }
        other => panic!("expected the first call to apply, got {:?}", other),
    }
    match repo.mark_application_paid(application.id, &txn).await.unwrap() {
        Some(PaidTransition::AlreadyPaid(paid)) => {
            assert_eq!(paid.transaction_id.as_deref(), Some(txn.as_str()))
        }
        other => panic!("expected already paid, got {:?}", other),
    }
    assert!(
        repo.mark_application_paid(Uuid::new_v4(), "pi_unknown")
            .await
            .unwrap()
            .is_none()
    );

    // The same transaction cannot be recorded on a second application.
    let other = repo
        .create_application(new_application(scholarship.id, &email))
        .await
        .unwrap();
    let reused = repo.mark_application_paid(other.id, &txn).await;
    assert!(matches!(reused, Err(AppError::Conflict(_))));

    let by_txn = repo.find_application_by_transaction(&txn).await.unwrap().unwrap();
    assert_eq!(by_txn.id, application.id);

    let mine = repo
        .list_applications(&ApplicationFilter {
            user_email: Some(email.clone()),
            payment_status: Some(PaymentStatus::Paid),
            ..ApplicationFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(mine.len(), 1);

    // Reviews: one per application.
    let review = repo
        .create_review(new_review(application.id, scholarship.id, &email))
        .await
        .unwrap()
        .unwrap();
    assert!(
        repo.create_review(new_review(application.id, scholarship.id, &email))
            .await
            .unwrap()
            .is_none()
    );
    let edited = repo
        .update_review(
            review.id,
            UpdateReviewRequest {
                rating: Some(2),
                comment: None,
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(edited.rating, 2);
    assert_eq!(edited.comment, "Helpful staff");

    // Deletes.
    assert!(repo.delete_review(review.id).await.unwrap());
    assert!(!repo.delete_review(review.id).await.unwrap());
    assert!(repo.delete_application(other.id).await.unwrap());
    assert!(repo.delete_scholarship(scholarship.id).await.unwrap());
    assert!(repo.delete_user(user.id).await.unwrap());
}

#[tokio::test]
async fn test_in_memory_repository_semantics() {
    let repo = InMemoryRepository::new();
    exercise_repository(&repo).await;
}

#[tokio::test]
async fn test_in_memory_stats() {
    let repo = InMemoryRepository::new();
    repo.create_user(new_user("a@scholar.test")).await.unwrap();
    let scholarship = repo.create_scholarship(new_scholarship("A", 25.0)).await.unwrap();
    let paid = repo
        .create_application(new_application(scholarship.id, "a@scholar.test"))
        .await
        .unwrap();
    repo.create_application(new_application(scholarship.id, "a@scholar.test"))
        .await
        .unwrap();
    repo.mark_application_paid(paid.id, "pi_stats").await.unwrap();

    let stats = repo.get_stats().await.unwrap();
    assert_eq!(stats.total_users, 1);
    assert_eq!(stats.total_scholarships, 1);
    assert_eq!(stats.total_applications, 2);
    assert_eq!(stats.pending_applications, 2);
    assert_eq!(stats.total_reviews, 0);
    assert_eq!(stats.fees_collected, 30.0);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL pointing at a disposable Postgres database"]
async fn test_postgres_repository_semantics() {
    dotenv::dotenv().ok();
    let db_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await
        .expect("Failed to connect to Postgres in tests");
    sqlx::migrate!("./migrations").run(&pool).await.expect("migrations failed");

    let repo = PostgresRepository::new(pool);
    exercise_repository(&repo).await;
}
