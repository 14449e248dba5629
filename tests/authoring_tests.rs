// tests/authoring_tests.rs

use quizhub::{config::Config, routes, state::AppState, utils::hash::hash_password};
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;

/// Helper function to spawn the app on a random port for testing.
/// Uses an in-memory SQLite database; a single connection keeps the
/// memory database alive and shared for the whole test.
async fn spawn_app() -> (String, SqlitePool) {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory SQLite database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let config = Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        admin_username: None,
        admin_password: None,
    };

    let state = AppState {
        pool: pool.clone(),
        config,
    };

    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (address, pool)
}

async fn seed_user(pool: &SqlitePool, username: &str, password: &str, role: &str) {
    let hashed = hash_password(password).unwrap();
    sqlx::query("INSERT INTO users (username, password, role) VALUES (?, ?, ?)")
        .bind(username)
        .bind(hashed)
        .bind(role)
        .execute(pool)
        .await
        .unwrap();
}

async fn login(client: &reqwest::Client, address: &str, username: &str, password: &str) -> String {
    let response = client
        .post(format!("{}/api/auth/login", address))
        .json(&serde_json::json!({ "username": username, "password": password }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    body["token"].as_str().unwrap().to_string()
}

/// Builds a valid exam payload with the given order numbers,
/// one question per order number, 3 choices each (first correct).
fn exam_payload(title: &str, order_nums: &[i64]) -> serde_json::Value {
    let questions: Vec<serde_json::Value> = order_nums
        .iter()
        .map(|order_num| {
            serde_json::json!({
                "text": format!("Question {}", order_num),
                "order_num": order_num,
                "choices": [
                    { "text": "A", "is_correct": true },
                    { "text": "B", "is_correct": false },
                    { "text": "C", "is_correct": false },
                ],
            })
        })
        .collect();

    serde_json::json!({ "title": title, "questions": questions })
}

async fn create_exam(
    client: &reqwest::Client,
    address: &str,
    token: &str,
    payload: &serde_json::Value,
) -> reqwest::Response {
    client
        .post(format!("{}/api/admin/exams", address))
        .bearer_auth(token)
        .json(payload)
        .send()
        .await
        .expect("Failed to execute request")
}

#[tokio::test]
async fn admin_creates_a_valid_exam() {
    let (address, pool) = spawn_app().await;
    seed_user(&pool, "admin", "adminpass", "admin").await;
    let client = reqwest::Client::new();
    let token = login(&client, &address, "admin", "adminpass").await;

    let response = create_exam(&client, &address, &token, &exam_payload("rust", &[1, 2, 3])).await;
    assert_eq!(response.status().as_u16(), 201);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["uuid"].as_str().is_some());

    // Catalog now lists it.
    let response = client
        .get(format!("{}/api/exams", address))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn authoring_rejects_gap_in_order_numbers() {
    let (address, pool) = spawn_app().await;
    seed_user(&pool, "admin", "adminpass", "admin").await;
    let client = reqwest::Client::new();
    let token = login(&client, &address, "admin", "adminpass").await;

    let response = create_exam(&client, &address, &token, &exam_payload("rust", &[1, 2, 4])).await;
    assert_eq!(response.status().as_u16(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("contiguous"));
}

#[tokio::test]
async fn authoring_rejects_numbering_not_starting_at_1() {
    let (address, pool) = spawn_app().await;
    seed_user(&pool, "admin", "adminpass", "admin").await;
    let client = reqwest::Client::new();
    let token = login(&client, &address, "admin", "adminpass").await;

    let response = create_exam(&client, &address, &token, &exam_payload("rust", &[2, 3, 4])).await;
    assert_eq!(response.status().as_u16(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("start at 1"));
}

#[tokio::test]
async fn authoring_rejects_too_few_questions() {
    let (address, pool) = spawn_app().await;
    seed_user(&pool, "admin", "adminpass", "admin").await;
    let client = reqwest::Client::new();
    let token = login(&client, &address, "admin", "adminpass").await;

    let response = create_exam(&client, &address, &token, &exam_payload("rust", &[1, 2])).await;
    assert_eq!(response.status().as_u16(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("range"));
}

#[tokio::test]
async fn authoring_rejects_all_choices_correct() {
    let (address, pool) = spawn_app().await;
    seed_user(&pool, "admin", "adminpass", "admin").await;
    let client = reqwest::Client::new();
    let token = login(&client, &address, "admin", "adminpass").await;

    let mut payload = exam_payload("rust", &[1, 2, 3]);
    payload["questions"][1]["choices"] = serde_json::json!([
        { "text": "A", "is_correct": true },
        { "text": "B", "is_correct": true },
    ]);

    let response = create_exam(&client, &address, &token, &payload).await;
    assert_eq!(response.status().as_u16(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    let error = body["error"].as_str().unwrap();
    assert!(error.contains("Question 2"));
    assert!(error.contains("Not all"));
}

#[tokio::test]
async fn authoring_rejects_no_correct_choice() {
    let (address, pool) = spawn_app().await;
    seed_user(&pool, "admin", "adminpass", "admin").await;
    let client = reqwest::Client::new();
    let token = login(&client, &address, "admin", "adminpass").await;

    let mut payload = exam_payload("rust", &[1, 2, 3]);
    payload["questions"][0]["choices"] = serde_json::json!([
        { "text": "A", "is_correct": false },
        { "text": "B", "is_correct": false },
    ]);

    let response = create_exam(&client, &address, &token, &payload).await;
    assert_eq!(response.status().as_u16(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("At least one"));
}

#[tokio::test]
async fn authoring_requires_admin_role() {
    let (address, pool) = spawn_app().await;
    seed_user(&pool, "alice", "password123", "user").await;
    let client = reqwest::Client::new();
    let token = login(&client, &address, "alice", "password123").await;

    let response = create_exam(&client, &address, &token, &exam_payload("rust", &[1, 2, 3])).await;
    assert_eq!(response.status().as_u16(), 403);
}

#[tokio::test]
async fn deleting_an_exam_removes_the_whole_tree() {
    let (address, pool) = spawn_app().await;
    seed_user(&pool, "admin", "adminpass", "admin").await;
    let client = reqwest::Client::new();
    let token = login(&client, &address, "admin", "adminpass").await;

    let response = create_exam(&client, &address, &token, &exam_payload("rust", &[1, 2, 3])).await;
    let body: serde_json::Value = response.json().await.unwrap();
    let exam_uuid = body["uuid"].as_str().unwrap().to_string();

    let response = client
        .delete(format!("{}/api/admin/exams/{}", address, exam_uuid))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let questions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM questions")
        .fetch_one(&pool)
        .await
        .unwrap();
    let choices: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM choices")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(questions, 0);
    assert_eq!(choices, 0);

    let response = client
        .get(format!("{}/api/exams/{}", address, exam_uuid))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn deleting_a_result_requires_view_statistics() {
    let (address, pool) = spawn_app().await;
    seed_user(&pool, "admin", "adminpass", "admin").await;
    seed_user(&pool, "alice", "password123", "user").await;
    let client = reqwest::Client::new();

    let admin_token = login(&client, &address, "admin", "adminpass").await;
    let response = create_exam(
        &client,
        &address,
        &admin_token,
        &exam_payload("rust", &[1, 2, 3]),
    )
    .await;
    let body: serde_json::Value = response.json().await.unwrap();
    let exam_uuid = body["uuid"].as_str().unwrap().to_string();

    let alice_token = login(&client, &address, "alice", "password123").await;
    let response = client
        .post(format!("{}/api/exams/{}/results", address, exam_uuid))
        .bearer_auth(&alice_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);
    let body: serde_json::Value = response.json().await.unwrap();
    let result_uuid = body["result_uuid"].as_str().unwrap().to_string();

    // The owner cannot delete without the capability.
    let response = client
        .delete(format!(
            "{}/api/exams/{}/results/{}",
            address, exam_uuid, result_uuid
        ))
        .bearer_auth(&alice_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);

    // An administrator can.
    let response = client
        .delete(format!(
            "{}/api/exams/{}/results/{}",
            address, exam_uuid, result_uuid
        ))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
}
