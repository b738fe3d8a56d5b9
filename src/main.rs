use axum::http::{header, HeaderValue, Method};
use axum::Router;
use pairup::{chat, chat::registry::RoomRegistry, db, feed, requests, users, AppState};
use sqlx::sqlite::SqlitePoolOptions;
use tower_http::cors::CorsLayer;
use tower_sessions::{cookie::SameSite, Expiry, MemoryStore, SessionManagerLayer};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(false)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::hours(8)));

    let db_pool = SqlitePoolOptions::new()
        .max_connections(16)
        .connect(dotenv::var("DATABASE_URL").unwrap().as_str())
        .await
        .unwrap();
    db::init(&db_pool).await.unwrap();

    let cors = match dotenv::var("FRONTEND_URL") {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin.parse::<HeaderValue>().unwrap())
            .allow_methods([Method::GET, Method::POST, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE])
            .allow_credentials(true),
        Err(_) => CorsLayer::new(),
    };

    let app_state = AppState {
        db_pool,
        rooms: RoomRegistry::default(),
    };

    let app = Router::new()
        .merge(requests::router())
        .merge(users::router())
        .merge(feed::router())
        .merge(chat::router())
        .with_state(app_state)
        .layer(session_layer)
        .layer(cors);

    let addr = dotenv::var("BIND_ADDR").unwrap_or("0.0.0.0:8080".to_owned());
    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    tracing::info!("listening on {addr}");
    axum::serve(listener, app).await.unwrap();
}
