use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::info;

/// Open (or create) the database file and size the pool.
pub async fn open_pool(path: &str, max_connections: u32) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    info!("Database opened: {}", path);
    Ok(pool)
}

/// Create all tables for a brand-new database.  Idempotent.
pub async fn init_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // Accounts.  `status = 1` is active, anything else is disabled.
    // Timestamps are unix seconds; birthday stays TEXT (YYYY-MM-DD) since
    // it is a calendar date, not an instant.
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS users (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            account       TEXT    NOT NULL UNIQUE,
            password_hash TEXT    NOT NULL,
            nickname      TEXT    NOT NULL DEFAULT '',
            avatar_url    TEXT    NOT NULL DEFAULT '',
            sex           INTEGER NOT NULL DEFAULT 0,
            birthday      TEXT,
            remark        TEXT    NOT NULL DEFAULT '',
            app_channel   TEXT    NOT NULL DEFAULT '',
            app_version   TEXT    NOT NULL DEFAULT '',
            os_type       TEXT    NOT NULL DEFAULT '',
            os_version    TEXT    NOT NULL DEFAULT '',
            status        INTEGER NOT NULL DEFAULT 1,
            created_at    INTEGER NOT NULL,
            updated_at    INTEGER NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    // SMS verification codes.  One row per sent code; `status = 1` marks a
    // consumed code.  `business` scopes a code to the flow that requested
    // it (register / reset_password / change_account).
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS verify_codes (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            app_name    TEXT    NOT NULL,
            phone       TEXT    NOT NULL,
            business    TEXT    NOT NULL,
            code        TEXT    NOT NULL,
            business_id TEXT    NOT NULL DEFAULT '',
            status      INTEGER NOT NULL DEFAULT 0,
            created_at  INTEGER NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_users_account ON users(account)")
        .execute(pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_verify_codes_lookup
         ON verify_codes(app_name, phone, business)",
    )
    .execute(pool)
    .await?;

    info!("Database schema ready");
    Ok(())
}
