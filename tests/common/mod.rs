use std::net::SocketAddr;

use reqwest::Client;
use serde_json::{Value, json};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use todo_tracker::config::Config;
use todo_tracker::state::SharedState;

pub const PASSWORD: &str = "Test@1234";

/// A running test server instance with a dedicated test database.
pub struct TestApp {
    pub addr: SocketAddr,
    pub pool: PgPool,
    pub state: SharedState,
    pub client: Client,
    pub db_name: String,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// POST without authentication, returning the envelope.
    pub async fn post(&self, path: &str, body: &Value) -> Value {
        self.client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("post request failed")
            .json()
            .await
            .expect("response is not JSON")
    }

    pub async fn register(&self, email: &str, mobile: &str) -> Value {
        self.post(
            "/users/register",
            &json!({
                "emailId": email,
                "password": PASSWORD,
                "firstname": "Test",
                "lastname": "User",
                "mobile": mobile,
            }),
        )
        .await
    }

    pub async fn login(&self, email: &str, password: &str) -> Value {
        self.post(
            "/users/login",
            &json!({ "emailId": email, "password": password }),
        )
        .await
    }

    /// Register and log in a fresh user, returning the access token.
    pub async fn signup(&self, email: &str, mobile: &str) -> String {
        let body = self.register(email, mobile).await;
        assert_eq!(body["status"], 1, "register failed: {body}");
        let body = self.login(email, PASSWORD).await;
        assert_eq!(body["status"], 1, "login failed: {body}");
        body["data"]["accessToken"].as_str().unwrap().to_string()
    }

    pub async fn user_id(&self, email: &str) -> Uuid {
        sqlx::query_scalar("SELECT id FROM users WHERE email = $1")
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .expect("user lookup failed")
    }

    pub async fn get_auth(&self, path: &str, token: &str) -> Value {
        self.client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("get request failed")
            .json()
            .await
            .expect("response is not JSON")
    }

    pub async fn post_auth(&self, path: &str, token: &str, body: &Value) -> Value {
        self.client
            .post(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("post request failed")
            .json()
            .await
            .expect("response is not JSON")
    }

    pub async fn put_auth(&self, path: &str, token: &str, body: &Value) -> Value {
        self.client
            .put(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("put request failed")
            .json()
            .await
            .expect("response is not JSON")
    }

    pub async fn delete_auth(&self, path: &str, token: &str, body: &Value) -> Value {
        self.client
            .delete(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("delete request failed")
            .json()
            .await
            .expect("response is not JSON")
    }

    /// Create a todo expiring `minutes` from now, return its id.
    pub async fn create_todo(&self, token: &str, name: &str, minutes: i64) -> String {
        let expiration = chrono::Utc::now() + chrono::Duration::minutes(minutes);
        let body = self
            .post_auth(
                "/todos/addUpdateTodo",
                token,
                &json!({ "todoName": name, "expirationTime": expiration }),
            )
            .await;
        assert_eq!(body["status"], 1, "create todo failed: {body}");
        body["data"]["todo"]["id"].as_str().unwrap().to_string()
    }

    /// Move a todo's expiration into the past without touching its status.
    pub async fn backdate_todo(&self, id: &str) {
        sqlx::query("UPDATE todos SET expiration_time = now() - interval '1 minute' WHERE id = $1")
            .bind(Uuid::parse_str(id).unwrap())
            .execute(&self.pool)
            .await
            .expect("backdate failed");
    }

    /// Pull every notification's next attempt into the past.
    pub async fn make_notifications_due(&self) {
        sqlx::query("UPDATE notifications SET next_attempt_at = now() - interval '1 second'")
            .execute(&self.pool)
            .await
            .expect("make due failed");
    }

    pub async fn list(&self, token: &str, filters: Value) -> Value {
        let mut body = json!({ "page": 1, "pagesize": 50 });
        if let (Some(body), Some(filters)) = (body.as_object_mut(), filters.as_object()) {
            body.extend(filters.clone());
        }
        let resp = self.post_auth("/todos/list", token, &body).await;
        assert_eq!(resp["status"], 1, "list failed: {resp}");
        resp["data"]["todosList"].clone()
    }
}

/// Spawn a test app with a fresh temporary database.
pub async fn spawn_app() -> TestApp {
    let _ = dotenvy::dotenv();

    let base_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");

    let db_name = format!("todo_test_{}", Uuid::now_v7().simple());

    let admin_url = base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/postgres"))
        .unwrap_or_else(|| base_url.clone());

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url)
        .await
        .expect("Failed to connect to postgres for test DB creation");

    sqlx::query(&format!("CREATE DATABASE \"{db_name}\""))
        .execute(&admin_pool)
        .await
        .expect("Failed to create test database");

    admin_pool.close().await;

    let test_url = base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/{db_name}"))
        .unwrap_or_else(|| base_url.clone());

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&test_url)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations on test database");

    let config = Config {
        database_url: test_url,
        jwt_secret: "test-jwt-secret-that-is-long-enough".to_string(),
        host: "127.0.0.1".parse().unwrap(),
        port: 0,
        max_body_size: 1_048_576,
        log_level: "warn".to_string(),
        session_ttl_minutes: 60,
        reset_token_ttl_minutes: 60,
        sweep_interval_secs: 60,
        notify_poll_secs: 1,
        notify_max_attempts: 3,
        smtp: None,
    };

    let (app, state) = todo_tracker::build_app(pool.clone(), config);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server failed");
    });

    TestApp {
        addr,
        pool,
        state,
        client: Client::new(),
        db_name,
    }
}

/// Drop the test database after tests complete.
pub async fn cleanup(app: TestApp) {
    let db_name = app.db_name.clone();
    app.pool.close().await;
    drop(app.state);

    let base_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");
    let admin_url = base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/postgres"))
        .unwrap_or_else(|| base_url.clone());

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url)
        .await
        .expect("Failed to connect for cleanup");

    let _ = sqlx::query(&format!("DROP DATABASE IF EXISTS \"{db_name}\" WITH (FORCE)"))
        .execute(&admin_pool)
        .await;

    admin_pool.close().await;
}
