use chrono::{Datelike, Local, NaiveDate};
use serde_json::{json, Value};
use sqlx::SqlitePool;

use crate::database::utils::get_timestamp;

/// Account status value for a usable account.  Anything else is disabled.
pub const STATUS_ACTIVE: i64 = 1;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub account: String,
    pub password_hash: String,
    pub nickname: String,
    pub avatar_url: String,
    pub sex: i64,
    pub birthday: Option<String>,
    pub remark: String,
    pub app_channel: String,
    pub app_version: String,
    pub os_type: String,
    pub os_version: String,
    pub status: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl User {
    pub fn is_active(&self) -> bool {
        self.status == STATUS_ACTIVE
    }

    /// Age in full years, 0 when no (or an unparseable) birthday is stored.
    pub fn age(&self) -> i32 {
        let Some(birthday) = self
            .birthday
            .as_deref()
            .and_then(|b| NaiveDate::parse_from_str(b, "%Y-%m-%d").ok())
        else {
            return 0;
        };

        let today = Local::now().date_naive();
        let mut age = today.year() - birthday.year();
        if (today.month(), today.day()) < (birthday.month(), birthday.day()) {
            age -= 1;
        }
        age.max(0)
    }

    /// The payload every login-producing endpoint returns (register, login,
    /// reset_password).
    pub fn login_info(&self, token: &str) -> Value {
        json!({
            "user_id": self.id,
            "account": self.account,
            "nickname": self.nickname,
            "avatar_url": self.avatar_url,
            "sex": self.sex,
            "birthday": self.birthday.as_deref().unwrap_or(""),
            "age": self.age(),
            "token": token,
        })
    }
}

pub async fn get_by_id(pool: &SqlitePool, id: i64) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn get_by_account(pool: &SqlitePool, account: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE account = ?")
        .bind(account)
        .fetch_optional(pool)
        .await
}

/// Insert a new account and return the stored row.
pub async fn create(
    pool: &SqlitePool,
    account: &str,
    password_hash: &str,
) -> Result<User, sqlx::Error> {
    let now = get_timestamp();
    sqlx::query_as::<_, User>(
        "INSERT INTO users (account, password_hash, created_at, updated_at)
         VALUES (?, ?, ?, ?)
         RETURNING *",
    )
    .bind(account)
    .bind(password_hash)
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await
}

pub async fn update_password(
    pool: &SqlitePool,
    id: i64,
    password_hash: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
        .bind(password_hash)
        .bind(get_timestamp())
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn update_account(
    pool: &SqlitePool,
    id: i64,
    new_account: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET account = ?, updated_at = ? WHERE id = ?")
        .bind(new_account)
        .bind(get_timestamp())
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Record the client environment reported at login.
pub async fn update_client_info(
    pool: &SqlitePool,
    id: i64,
    app_channel: &str,
    app_version: &str,
    os_type: &str,
    os_version: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE users
         SET app_channel = ?, app_version = ?, os_type = ?, os_version = ?, updated_at = ?
         WHERE id = ?",
    )
    .bind(app_channel)
    .bind(app_version)
    .bind(os_type)
    .bind(os_version)
    .bind(get_timestamp())
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Keep the stored app/os versions current; cheap piggyback on profile reads.
pub async fn update_versions(
    pool: &SqlitePool,
    id: i64,
    app_version: &str,
    os_version: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET app_version = ?, os_version = ?, updated_at = ? WHERE id = ?")
        .bind(app_version)
        .bind(os_version)
        .bind(get_timestamp())
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Partial profile update: `None` fields keep their stored value.
pub async fn update_profile(
    pool: &SqlitePool,
    id: i64,
    nickname: Option<&str>,
    sex: Option<i64>,
    birthday: Option<&str>,
    remark: Option<&str>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE users
         SET nickname = COALESCE(?, nickname),
             sex      = COALESCE(?, sex),
             birthday = COALESCE(?, birthday),
             remark   = COALESCE(?, remark),
             updated_at = ?
         WHERE id = ?",
    )
    .bind(nickname)
    .bind(sex)
    .bind(birthday)
    .bind(remark)
    .bind(get_timestamp())
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}
