use sqlx::PgPool;

use crate::db::models::Subject;

pub(crate) async fn list_all(pool: &PgPool) -> Result<Vec<Subject>, sqlx::Error> {
    sqlx::query_as::<_, Subject>("SELECT id, name FROM subjects ORDER BY name, id")
        .fetch_all(pool)
        .await
}

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<Subject>, sqlx::Error> {
    sqlx::query_as::<_, Subject>("SELECT id, name FROM subjects WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await
}

#[cfg(test)]
pub(crate) async fn create(pool: &PgPool, id: &str, name: &str) -> Result<Subject, sqlx::Error> {
    sqlx::query_as::<_, Subject>("INSERT INTO subjects (id, name) VALUES ($1, $2) RETURNING id, name")
        .bind(id)
        .bind(name)
        .fetch_one(pool)
        .await
}
