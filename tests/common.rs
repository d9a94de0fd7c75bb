use jsonwebtoken::{EncodingKey, Header, encode};
use parentline_server::api::{self, MgmtState, ServiceContainer};
use parentline_server::config::{
    AuthConfig, Config, LogFormat, MessagingConfig, RateLimitConfig, RealtimeConfig, ServerConfig, TelemetryConfig,
};
use parentline_server::domain::auth::Claims;
use parentline_server::domain::user::Role;
use parentline_server::services::conversation_service::ConversationService;
use parentline_server::services::directory::ParticipantDirectory;
use parentline_server::services::fanout::{Fanout, LocalFanout};
use parentline_server::services::health_service::HealthService;
use parentline_server::services::message_service::MessageService;
use parentline_server::storage;
use parentline_server::storage::message_repo::MessageRepository;
use parentline_server::storage::student_repo::StudentRepository;
use parentline_server::storage::user_repo::UserRepository;
use sqlx::PgPool;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::Once;
use tokio::sync::watch;
use uuid::Uuid;

static INIT: Once = Once::new();

pub fn setup_tracing() {
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "warn".into())
            .add_directive("parentline_server=debug".parse().unwrap())
            .add_directive("sqlx=warn".parse().unwrap())
            .add_directive("tower=warn".parse().unwrap())
            .add_directive("hyper=warn".parse().unwrap())
            .add_directive("reqwest=warn".parse().unwrap())
            .add_directive("tungstenite=warn".parse().unwrap());

        tracing_subscriber::fmt().with_env_filter(filter).init();
    });
}

#[allow(dead_code)]
pub fn get_test_config(database_url: String) -> Config {
    Config {
        database_url,
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0, // 0 means let OS choose
            mgmt_port: 0,
            shutdown_timeout_secs: 2,
        },
        auth: AuthConfig { jwt_secret: "test_secret".to_string() },
        rate_limit: RateLimitConfig { per_second: 10000, burst: 10000 },
        messaging: MessagingConfig { max_content_len: 1000, max_attachments: 5 },
        realtime: RealtimeConfig { channel_capacity: 16, gc_interval_secs: 60 },
        telemetry: TelemetryConfig { otlp_endpoint: None, log_format: LogFormat::Text },
    }
}

#[allow(dead_code)]
pub struct TestApp {
    pub server_url: String,
    pub ws_url: String,
    pub mgmt_url: String,
    pub pool: PgPool,
    pub client: reqwest::Client,
    jwt_secret: String,
    // Keeps the shutdown channel open for the lifetime of the app.
    _shutdown_tx: watch::Sender<bool>,
}

#[allow(dead_code)]
impl TestApp {
    /// Spawns the app against the database named by `DATABASE_URL`, or returns
    /// `None` when no database is configured so the test can be skipped.
    pub async fn try_spawn() -> Option<Self> {
        setup_tracing();
        let Ok(database_url) = std::env::var("DATABASE_URL") else {
            eprintln!("DATABASE_URL not set; skipping database-backed test");
            return None;
        };
        Some(Self::spawn_with_config(get_test_config(database_url)).await)
    }

    pub async fn spawn_with_config(config: Config) -> Self {
        let pool = storage::init_pool(&config.database_url).await.expect("Failed to connect to DB. Is Postgres running?");
        storage::run_migrations(&pool).await.expect("Failed to run migrations");

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let message_repo = MessageRepository::new();
        let user_repo = UserRepository::new();
        let student_repo = StudentRepository::new();
        let directory = ParticipantDirectory::new(pool.clone(), user_repo, student_repo);
        let fanout: Arc<dyn Fanout> = Arc::new(LocalFanout::new(
            config.realtime.channel_capacity,
            config.realtime.gc_interval_secs,
            shutdown_rx.clone(),
        ));
        let message_service = MessageService::new(
            pool.clone(),
            message_repo,
            user_repo,
            student_repo,
            directory,
            Arc::clone(&fanout),
            config.messaging.clone(),
        );
        let conversation_service = ConversationService::new(pool.clone(), message_repo, user_repo, student_repo);
        let health_service = HealthService::new(pool.clone());

        let jwt_secret = config.auth.jwt_secret.clone();
        let services = ServiceContainer { message_service, conversation_service, fanout };
        let app = api::app_router(config, services, shutdown_rx);
        let mgmt_app = api::mgmt_router(MgmtState { health_service });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Failed to read listener address");
        tokio::spawn(async move {
            axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await.unwrap();
        });

        let mgmt_listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("Failed to bind mgmt listener");
        let mgmt_addr = mgmt_listener.local_addr().expect("Failed to read mgmt listener address");
        tokio::spawn(async move {
            axum::serve(mgmt_listener, mgmt_app.into_make_service_with_connect_info::<SocketAddr>()).await.unwrap();
        });

        Self {
            server_url: format!("http://{addr}/v1"),
            ws_url: format!("ws://{addr}/v1/chat/gateway"),
            mgmt_url: format!("http://{mgmt_addr}"),
            pool,
            client: reqwest::Client::new(),
            jwt_secret,
            _shutdown_tx: shutdown_tx,
        }
    }

    pub fn token_for(&self, user_id: Uuid, role: Role) -> String {
        let claims = Claims::new(user_id, role, 10_000_000_000);
        encode(&Header::default(), &claims, &EncodingKey::from_secret(self.jwt_secret.as_bytes()))
            .expect("Failed to mint test token")
    }

    pub async fn insert_user(&self, name: &str, role: Role, available: bool) -> Uuid {
        let id = Uuid::new_v4();
        sqlx::query("INSERT INTO users (id, name, email, role, is_available) VALUES ($1, $2, $3, $4, $5)")
            .bind(id)
            .bind(name)
            .bind(format!("{id}@test.example"))
            .bind(role.as_str())
            .bind(available)
            .execute(&self.pool)
            .await
            .expect("Failed to insert test user");
        id
    }

    pub async fn insert_student(&self, name: &str, parent_id: Uuid, teacher_id: Uuid) -> Uuid {
        let id = Uuid::new_v4();
        sqlx::query("INSERT INTO students (id, name, class_level, parent_id, teacher_id) VALUES ($1, $2, $3, $4, $5)")
            .bind(id)
            .bind(name)
            .bind("Grade 4")
            .bind(parent_id)
            .bind(teacher_id)
            .execute(&self.pool)
            .await
            .expect("Failed to insert test student");
        id
    }

    pub async fn send_message(
        &self,
        token: &str,
        receiver_id: Uuid,
        content: &str,
        student_id: Option<Uuid>,
    ) -> reqwest::Response {
        let mut body = serde_json::json!({
            "receiverId": receiver_id.to_string(),
            "content": content,
        });
        if let Some(student_id) = student_id {
            body["studentId"] = serde_json::Value::String(student_id.to_string());
        }

        self.client
            .post(format!("{}/messages", self.server_url))
            .header("Authorization", format!("Bearer {token}"))
            .json(&body)
            .send()
            .await
            .expect("Failed to send request")
    }

    pub async fn get_messages(&self, token: &str, scope_id: Option<Uuid>) -> reqwest::Response {
        let url = match scope_id {
            Some(id) => format!("{}/messages/{id}", self.server_url),
            None => format!("{}/messages", self.server_url),
        };

        self.client
            .get(url)
            .header("Authorization", format!("Bearer {token}"))
            .send()
            .await
            .expect("Failed to send request")
    }

    pub async fn get_conversations(&self, token: &str) -> reqwest::Response {
        self.client
            .get(format!("{}/messages/conversations", self.server_url))
            .header("Authorization", format!("Bearer {token}"))
            .send()
            .await
            .expect("Failed to send request")
    }

    pub async fn start_chat(&self, token: &str, recipient_id: Uuid, content: &str) -> reqwest::Response {
        self.client
            .post(format!("{}/chat/start", self.server_url))
            .header("Authorization", format!("Bearer {token}"))
            .json(&serde_json::json!({
                "recipientId": recipient_id.to_string(),
                "content": content,
            }))
            .send()
            .await
            .expect("Failed to send request")
    }
}
