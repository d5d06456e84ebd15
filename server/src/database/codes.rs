use sqlx::SqlitePool;

use crate::database::utils::get_timestamp;

/// A sent SMS verification code.  `status = 0` until consumed.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VerifyCode {
    pub id: i64,
    pub app_name: String,
    pub phone: String,
    pub business: String,
    pub code: String,
    pub business_id: String,
    pub status: i64,
    pub created_at: i64,
}

pub async fn insert(
    pool: &SqlitePool,
    app_name: &str,
    phone: &str,
    business: &str,
    code: &str,
    business_id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO verify_codes (app_name, phone, business, code, business_id, created_at)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(app_name)
    .bind(phone)
    .bind(business)
    .bind(code)
    .bind(business_id)
    .bind(get_timestamp())
    .execute(pool)
    .await?;
    Ok(())
}

/// Most recently sent code for this phone + flow, used or not.
pub async fn latest(
    pool: &SqlitePool,
    app_name: &str,
    phone: &str,
    business: &str,
) -> Result<Option<VerifyCode>, sqlx::Error> {
    sqlx::query_as::<_, VerifyCode>(
        "SELECT * FROM verify_codes
         WHERE app_name = ? AND phone = ? AND business = ?
         ORDER BY id DESC LIMIT 1",
    )
    .bind(app_name)
    .bind(phone)
    .bind(business)
    .fetch_optional(pool)
    .await
}

/// Codes sent since `since` (unix seconds) for this phone + flow.
pub async fn count_since(
    pool: &SqlitePool,
    app_name: &str,
    phone: &str,
    business: &str,
    since: i64,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM verify_codes
         WHERE app_name = ? AND phone = ? AND business = ? AND created_at > ?",
    )
    .bind(app_name)
    .bind(phone)
    .bind(business)
    .bind(since)
    .fetch_one(pool)
    .await
}

/// Look up an unconsumed code matching what the client typed.
pub async fn find_unused(
    pool: &SqlitePool,
    app_name: &str,
    phone: &str,
    business: &str,
    code: &str,
) -> Result<Option<VerifyCode>, sqlx::Error> {
    sqlx::query_as::<_, VerifyCode>(
        "SELECT * FROM verify_codes
         WHERE app_name = ? AND phone = ? AND business = ? AND code = ? AND status = 0
         ORDER BY id DESC LIMIT 1",
    )
    .bind(app_name)
    .bind(phone)
    .bind(business)
    .bind(code)
    .fetch_optional(pool)
    .await
}

/// Consume a code.  One-shot: a used code never validates again.
pub async fn mark_used(pool: &SqlitePool, id: i64) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE verify_codes SET status = 1 WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::create::{init_schema, open_pool};

    async fn test_pool() -> SqlitePool {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("codes_test.db");
        std::mem::forget(dir);
        let pool = open_pool(path.to_str().unwrap(), 2).await.unwrap();
        init_schema(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn latest_returns_newest_row() {
        let pool = test_pool().await;
        insert(&pool, "app", "15800881234", "register", "111111", "")
            .await
            .unwrap();
        insert(&pool, "app", "15800881234", "register", "222222", "")
            .await
            .unwrap();

        let last = latest(&pool, "app", "15800881234", "register")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(last.code, "222222");
    }

    #[tokio::test]
    async fn count_is_scoped_to_phone_and_business() {
        let pool = test_pool().await;
        insert(&pool, "app", "15800881234", "register", "111111", "")
            .await
            .unwrap();
        insert(&pool, "app", "15800881234", "reset_password", "222222", "")
            .await
            .unwrap();
        insert(&pool, "app", "15800889999", "register", "333333", "")
            .await
            .unwrap();

        let n = count_since(&pool, "app", "15800881234", "register", 0)
            .await
            .unwrap();
        assert_eq!(n, 1);
    }

    #[tokio::test]
    async fn used_code_no_longer_matches() {
        let pool = test_pool().await;
        insert(&pool, "app", "15800881234", "register", "111111", "")
            .await
            .unwrap();

        let code = find_unused(&pool, "app", "15800881234", "register", "111111")
            .await
            .unwrap()
            .unwrap();
        mark_used(&pool, code.id).await.unwrap();

        assert!(
            find_unused(&pool, "app", "15800881234", "register", "111111")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn wrong_business_does_not_match() {
        let pool = test_pool().await;
        insert(&pool, "app", "15800881234", "register", "111111", "")
            .await
            .unwrap();
        assert!(
            find_unused(&pool, "app", "15800881234", "reset_password", "111111")
                .await
                .unwrap()
                .is_none()
        );
    }
}
