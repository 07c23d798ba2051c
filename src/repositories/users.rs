use sqlx::PgPool;

use crate::db::models::User;

const COLUMNS: &str = "id, username, extra_time_minutes, is_active, created_at";

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

#[cfg(test)]
pub(crate) struct CreateUser<'a> {
    pub(crate) id: &'a str,
    pub(crate) username: &'a str,
    pub(crate) extra_time_minutes: i32,
    pub(crate) is_active: bool,
    pub(crate) created_at: time::PrimitiveDateTime,
}

#[cfg(test)]
pub(crate) async fn create(pool: &PgPool, user: CreateUser<'_>) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (id, username, extra_time_minutes, is_active, created_at)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING {COLUMNS}"
    ))
    .bind(user.id)
    .bind(user.username)
    .bind(user.extra_time_minutes)
    .bind(user.is_active)
    .bind(user.created_at)
    .fetch_one(pool)
    .await
}

#[cfg(test)]
pub(crate) async fn update_extra_time(
    pool: &PgPool,
    id: &str,
    extra_time_minutes: i32,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET extra_time_minutes = $1 WHERE id = $2")
        .bind(extra_time_minutes)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}
