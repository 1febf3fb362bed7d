//! Demo data seeder. `cargo run --bin seed` provisions three users,
//! one conversation, and a short message history, and prints a bearer
//! token per user for manual testing. `--clear` wipes conversations
//! and messages (users stay).

use chat_service::{config, db, error::AppError, middleware::auth};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    chat_service::logging::init_tracing();
    let cfg = config::Config::from_env()?;
    let db = db::init_pool(&cfg.database_url)
        .await
        .map_err(|e| AppError::StartServer(format!("db: {e}")))?;
    db::MIGRATOR
        .run(&db)
        .await
        .map_err(|e| AppError::StartServer(format!("migrations: {e}")))?;

    if std::env::args().any(|a| a == "--clear") {
        clear(&db).await?;
        tracing::info!("cleared conversations and messages");
        return Ok(());
    }

    seed(&db, &cfg.jwt_secret).await
}

async fn upsert_user(db: &Pool<Postgres>, email: &str, name: &str) -> Result<Uuid, AppError> {
    let id: Uuid = sqlx::query_scalar(
        "INSERT INTO users (id, email, name) VALUES ($1, $2, $3) \
         ON CONFLICT (email) DO UPDATE SET name = EXCLUDED.name \
         RETURNING id",
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(name)
    .fetch_one(db)
    .await?;
    Ok(id)
}

async fn seed(db: &Pool<Postgres>, jwt_secret: &str) -> Result<(), AppError> {
    let alice = upsert_user(db, "alice@example.com", "Alice").await?;
    let bob = upsert_user(db, "bob@example.com", "Bob").await?;
    let carol = upsert_user(db, "carol@example.com", "Carol").await?;

    let conversation_id = Uuid::new_v4();
    sqlx::query("INSERT INTO conversations (id, title, author_id) VALUES ($1, $2, $3)")
        .bind(conversation_id)
        .bind("Weekend plans")
        .bind(alice)
        .execute(db)
        .await?;
    for user in [alice, bob, carol] {
        sqlx::query(
            "INSERT INTO conversation_participants (conversation_id, user_id) \
             VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(conversation_id)
        .bind(user)
        .execute(db)
        .await?;
    }

    let history = [
        (alice, "Anyone around on Saturday?"),
        (bob, "I am, after noon."),
        (carol, "Works for me too."),
    ];
    for (sender, content) in history {
        sqlx::query(
            "INSERT INTO messages (id, conversation_id, sender_id, content) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(Uuid::new_v4())
        .bind(conversation_id)
        .bind(sender)
        .bind(content)
        .execute(db)
        .await?;
    }

    tracing::info!(%conversation_id, "seeded demo conversation");
    for (name, id) in [("alice", alice), ("bob", bob), ("carol", carol)] {
        let token = auth::issue_token(jwt_secret, id, chrono::Duration::days(7))?;
        println!("{name} ({id}): {token}");
    }
    Ok(())
}

async fn clear(db: &Pool<Postgres>) -> Result<(), AppError> {
    // Participant links and messages cascade with their conversation.
    sqlx::query("DELETE FROM conversations").execute(db).await?;
    Ok(())
}
