mod common;

use common::{bearer, seed_scholarship, seed_user, spawn_app};
use reqwest::StatusCode;
use scholar_stream::{
    models::{AdminDashboardStats, Role, RoleResponse, Scholarship, ScholarshipPage, User},
    repository::Repository,
};
use serde_json::{Value, json};

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app().await;
    let response = app.client.get(app.url("/health")).send().await.expect("req fail");
    assert!(response.status().is_success());
    assert_eq!(response.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = spawn_app().await;
    let response = app
        .client
        .get(app.url("/api-docs/openapi.json"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let doc: Value = response.json().await.unwrap();
    assert!(doc["paths"]["/payment-success"].is_object());
}

#[tokio::test]
async fn test_request_id_is_propagated() {
    let app = spawn_app().await;
    let response = app.client.get(app.url("/health")).send().await.unwrap();
    assert!(response.headers().contains_key("x-request-id"));
}

// --- Users ---

#[tokio::test]
async fn test_create_user_then_duplicate_reports_exists() {
    let app = spawn_app().await;
    let body = json!({ "email": "ana@scholar.test", "name": "Ana", "photoURL": "https://img/ana.png" });

    let first = app.client.post(app.url("/users")).json(&body).send().await.unwrap();
    assert_eq!(first.status(), StatusCode::CREATED);
    let user: User = first.json().await.unwrap();
    assert_eq!(user.role, Role::Student);
    assert_eq!(user.photo_url.as_deref(), Some("https://img/ana.png"));

    let second = app.client.post(app.url("/users")).json(&body).send().await.unwrap();
    assert_eq!(second.status(), StatusCode::OK);
    let message: Value = second.json().await.unwrap();
    assert_eq!(message["message"], "user exists");

    let stored = app.repo.list_users(&Default::default()).await.unwrap();
    assert_eq!(stored.len(), 1, "the duplicate must not be inserted");
}

#[tokio::test]
async fn test_create_user_ignores_client_role() {
    let app = spawn_app().await;
    let response = app
        .client
        .post(app.url("/users"))
        .json(&json!({ "email": "sneaky@scholar.test", "role": "admin" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let user: User = response.json().await.unwrap();
    assert_eq!(user.role, Role::Student);
}

#[tokio::test]
async fn test_create_user_rejects_invalid_email() {
    let app = spawn_app().await;
    let response = app
        .client
        .post(app.url("/users"))
        .json(&json!({ "email": "   " }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_emails_are_case_insensitive() {
    let app = spawn_app().await;

    let first = app
        .client
        .post(app.url("/users"))
        .json(&json!({ "email": "  Ana@Scholar.Test " }))
        .send()
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::CREATED);
    let user: User = first.json().await.unwrap();
    assert_eq!(user.email, "ana@scholar.test");

    let second = app
        .client
        .post(app.url("/users"))
        .json(&json!({ "email": "ana@scholar.test" }))
        .send()
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(app.repo.list_users(&Default::default()).await.unwrap().len(), 1);

    // An admin registered with mixed case still passes the role gate with the
    // provider's lowercase email.
    seed_user(&app.repo, "Boss@Scholar.Test", Role::Admin).await;
    let listed = app
        .client
        .get(app.url("/users"))
        .header("Authorization", bearer("boss@scholar.test"))
        .send()
        .await
        .unwrap();
    assert_eq!(listed.status(), StatusCode::OK);

    let role = app
        .client
        .get(app.url("/users/BOSS@scholar.test/role"))
        .header("Authorization", bearer("ana@scholar.test"))
        .send()
        .await
        .unwrap();
    assert_eq!(role.status(), StatusCode::OK);
    let body: Value = role.json().await.unwrap();
    assert_eq!(body["role"], "admin");
}

#[tokio::test]
async fn test_get_user_role_requires_token() {
    let app = spawn_app().await;
    seed_user(&app.repo, "mod@scholar.test", Role::Moderator).await;

    let anonymous = app
        .client
        .get(app.url("/users/mod@scholar.test/role"))
        .send()
        .await
        .unwrap();
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);
    let body: Value = anonymous.json().await.unwrap();
    assert_eq!(body["message"], "unauthorized access");

    let response = app
        .client
        .get(app.url("/users/mod@scholar.test/role"))
        .header("Authorization", bearer("mod@scholar.test"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let role: RoleResponse = response.json().await.unwrap();
    assert_eq!(role.role, Role::Moderator);
}

#[tokio::test]
async fn test_role_gated_route_returns_401_then_403() {
    let app = spawn_app().await;
    seed_user(&app.repo, "student@scholar.test", Role::Student).await;

    let no_token = app.client.get(app.url("/users")).send().await.unwrap();
    assert_eq!(no_token.status(), StatusCode::UNAUTHORIZED);

    let bad_token = app
        .client
        .get(app.url("/users"))
        .header("Authorization", "Bearer not-a-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(bad_token.status(), StatusCode::UNAUTHORIZED);

    let wrong_role = app
        .client
        .get(app.url("/users"))
        .header("Authorization", bearer("student@scholar.test"))
        .send()
        .await
        .unwrap();
    assert_eq!(wrong_role.status(), StatusCode::FORBIDDEN);
    let body: Value = wrong_role.json().await.unwrap();
    assert_eq!(body["message"], "forbidden access");
}

#[tokio::test]
async fn test_admin_lists_and_filters_users() {
    let app = spawn_app().await;
    seed_user(&app.repo, "admin@scholar.test", Role::Admin).await;
    seed_user(&app.repo, "mod@scholar.test", Role::Moderator).await;
    seed_user(&app.repo, "student@scholar.test", Role::Student).await;

    let all: Vec<User> = app
        .client
        .get(app.url("/users"))
        .header("Authorization", bearer("admin@scholar.test"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(all.len(), 3);

    let moderators: Vec<User> = app
        .client
        .get(app.url("/users?role=moderator"))
        .header("Authorization", bearer("admin@scholar.test"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(moderators.len(), 1);
    assert_eq!(moderators[0].email, "mod@scholar.test");
}

#[tokio::test]
async fn test_admin_changes_role_but_not_their_own() {
    let app = spawn_app().await;
    let admin = seed_user(&app.repo, "admin@scholar.test", Role::Admin).await;
    let student = seed_user(&app.repo, "student@scholar.test", Role::Student).await;

    let promoted = app
        .client
        .patch(app.url(&format!("/users/{}/role", student.id)))
        .header("Authorization", bearer("admin@scholar.test"))
        .json(&json!({ "role": "moderator" }))
        .send()
        .await
        .unwrap();
    assert_eq!(promoted.status(), StatusCode::OK);
    let user: User = promoted.json().await.unwrap();
    assert_eq!(user.role, Role::Moderator);

    let own = app
        .client
        .patch(app.url(&format!("/users/{}/role", admin.id)))
        .header("Authorization", bearer("admin@scholar.test"))
        .json(&json!({ "role": "student" }))
        .send()
        .await
        .unwrap();
    assert_eq!(own.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_admin_deletes_user() {
    let app = spawn_app().await;
    seed_user(&app.repo, "admin@scholar.test", Role::Admin).await;
    let student = seed_user(&app.repo, "student@scholar.test", Role::Student).await;

    let response = app
        .client
        .delete(app.url(&format!("/users/{}", student.id)))
        .header("Authorization", bearer("admin@scholar.test"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let again = app
        .client
        .delete(app.url(&format!("/users/{}", student.id)))
        .header("Authorization", bearer("admin@scholar.test"))
        .send()
        .await
        .unwrap();
    assert_eq!(again.status(), StatusCode::NOT_FOUND);
}

// --- Scholarships ---

#[tokio::test]
async fn test_scholarship_lifecycle() {
    let app = spawn_app().await;
    seed_user(&app.repo, "admin@scholar.test", Role::Admin).await;

    let created = app
        .client
        .post(app.url("/scholarships"))
        .header("Authorization", bearer("admin@scholar.test"))
        .json(&json!({
            "name": "Global Excellence", "university": "TU Munich", "country": "Germany",
            "degree": "Masters", "applicationFees": 40.0, "serviceCharge": 5.0
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(created.status(), StatusCode::CREATED);
    let scholarship: Scholarship = created.json().await.unwrap();
    assert_eq!(scholarship.posted_by, "admin@scholar.test");

    let fetched: Scholarship = app
        .client
        .get(app.url(&format!("/scholarship/{}", scholarship.id)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetched.name, "Global Excellence");

    let updated = app
        .client
        .patch(app.url(&format!("/scholarships/{}", scholarship.id)))
        .header("Authorization", bearer("admin@scholar.test"))
        .json(&json!({ "applicationFees": 25.0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(updated.status(), StatusCode::OK);
    let updated: Scholarship = updated.json().await.unwrap();
    assert_eq!(updated.application_fees, 25.0);
    assert_eq!(updated.university, "TU Munich");

    let deleted = app
        .client
        .delete(app.url(&format!("/scholarships/{}", scholarship.id)))
        .header("Authorization", bearer("admin@scholar.test"))
        .send()
        .await
        .unwrap();
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    let gone = app
        .client
        .get(app.url(&format!("/scholarship/{}", scholarship.id)))
        .send()
        .await
        .unwrap();
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_scholarships_newest_first() {
    let app = spawn_app().await;
    seed_scholarship(&app.repo, "Older", 10.0).await;
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    seed_scholarship(&app.repo, "Newer", 20.0).await;

    let list: Vec<Scholarship> = app
        .client
        .get(app.url("/scholarships"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let names: Vec<&str> = list.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Newer", "Older"]);
}

#[tokio::test]
async fn test_create_scholarship_validates_payload() {
    let app = spawn_app().await;
    seed_user(&app.repo, "admin@scholar.test", Role::Admin).await;

    let response = app
        .client
        .post(app.url("/scholarships"))
        .header("Authorization", bearer("admin@scholar.test"))
        .json(&json!({
            "name": "Negative", "university": "U", "country": "C",
            "degree": "Bachelor", "applicationFees": -1.0
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_moderator_cannot_create_scholarship() {
    let app = spawn_app().await;
    seed_user(&app.repo, "mod@scholar.test", Role::Moderator).await;

    let response = app
        .client
        .post(app.url("/scholarships"))
        .header("Authorization", bearer("mod@scholar.test"))
        .json(&json!({
            "name": "X", "university": "U", "country": "C",
            "degree": "Bachelor", "applicationFees": 1.0
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_malformed_id_is_rejected() {
    let app = spawn_app().await;
    let response = app
        .client
        .get(app.url("/scholarship/not-a-uuid"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

async fn search(app: &common::TestApp, query: &str) -> ScholarshipPage {
    app.client
        .get(app.url(&format!("/scholarships/search{}", query)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_search_sorting() {
    let app = spawn_app().await;
    for (name, fee) in [("Alpha", 30.0), ("Beta", 10.0), ("Gamma", 50.0), ("Delta", 20.0)] {
        seed_scholarship(&app.repo, name, fee).await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    let low = search(&app, "?sort=feeLow").await;
    let fees: Vec<f64> = low.scholarships.iter().map(|s| s.application_fees).collect();
    assert!(fees.windows(2).all(|w| w[0] <= w[1]), "feeLow: {:?}", fees);

    let high = search(&app, "?sort=feeHigh").await;
    let fees: Vec<f64> = high.scholarships.iter().map(|s| s.application_fees).collect();
    assert!(fees.windows(2).all(|w| w[0] >= w[1]), "feeHigh: {:?}", fees);

    let recent = search(&app, "").await;
    let names: Vec<&str> = recent.scholarships.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Delta", "Gamma", "Beta", "Alpha"]);
    assert_eq!(recent.total, 4);
}

#[tokio::test]
async fn test_created_scholarship_with_lowest_fee_comes_first() {
    let app = spawn_app().await;
    seed_user(&app.repo, "admin@scholar.test", Role::Admin).await;
    seed_scholarship(&app.repo, "Pricey", 120.0).await;
    seed_scholarship(&app.repo, "Middle", 75.0).await;

    let created = app
        .client
        .post(app.url("/scholarships"))
        .header("Authorization", bearer("admin@scholar.test"))
        .json(&json!({
            "name": "X", "university": "U", "country": "C",
            "degree": "Bachelor", "applicationFees": 50
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(created.status(), StatusCode::CREATED);

    let page = search(&app, "?sort=feeLow&limit=1").await;
    assert_eq!(page.scholarships.len(), 1);
    assert_eq!(page.scholarships[0].name, "X");
    assert_eq!(page.total, 3);
    assert_eq!(page.limit, 1);
}

#[tokio::test]
async fn test_search_filters_and_pagination() {
    let app = spawn_app().await;
    for i in 0..12 {
        seed_scholarship(&app.repo, &format!("Fund {}", i), i as f64).await;
    }
    seed_scholarship(&app.repo, "Oxford Medicine", 99.0).await;

    let text = search(&app, "?search=oxford").await;
    assert_eq!(text.total, 1);
    assert_eq!(text.scholarships[0].name, "Oxford Medicine");

    let country = search(&app, "?country=germany&limit=100").await;
    assert_eq!(country.total, 13);

    let none = search(&app, "?country=Japan").await;
    assert_eq!(none.total, 0);
    assert!(none.scholarships.is_empty());

    let second = search(&app, "?sort=feeLow&page=2&limit=5").await;
    assert_eq!(second.page, 2);
    let fees: Vec<f64> = second.scholarships.iter().map(|s| s.application_fees).collect();
    assert_eq!(fees, vec![5.0, 6.0, 7.0, 8.0, 9.0]);

    let clamped = search(&app, "?page=0&limit=1000").await;
    assert_eq!(clamped.page, 1);
    assert_eq!(clamped.limit, 100);
}

// --- Dashboard ---

#[tokio::test]
async fn test_admin_stats() {
    let app = spawn_app().await;
    seed_user(&app.repo, "admin@scholar.test", Role::Admin).await;
    seed_user(&app.repo, "mod@scholar.test", Role::Moderator).await;
    seed_scholarship(&app.repo, "Alpha", 30.0).await;

    let forbidden = app
        .client
        .get(app.url("/admin/stats"))
        .header("Authorization", bearer("mod@scholar.test"))
        .send()
        .await
        .unwrap();
    assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

    let stats: AdminDashboardStats = app
        .client
        .get(app.url("/admin/stats"))
        .header("Authorization", bearer("admin@scholar.test"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats.total_users, 2);
    assert_eq!(stats.total_scholarships, 1);
    assert_eq!(stats.total_applications, 0);
    assert_eq!(stats.fees_collected, 0.0);
}
