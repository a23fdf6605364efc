//! Queries over the `users` table.
//!
//! Placeholders are `?` so the same statements run on MySQL and SQLite.
use records::{NewUser, User, user::UnknownGender};
use sqlx::{AnyPool, Row, any::AnyRow};
use tracing::instrument;

use crate::error::AppError;

const SELECT_ALL: &str =
    "SELECT id, firstname, lastname, age, gender, interests, description FROM users ORDER BY id";

const SELECT_ONE: &str =
    "SELECT id, firstname, lastname, age, gender, interests, description FROM users WHERE id = ?";

const INSERT: &str = "INSERT INTO users (firstname, lastname, age, gender, interests, description) VALUES (?, ?, ?, ?, ?, ?)";

const UPDATE: &str = "UPDATE users SET firstname = ?, lastname = ?, age = ?, gender = ?, interests = ?, description = ? WHERE id = ?";

const DELETE: &str = "DELETE FROM users WHERE id = ?";

const COUNT: &str = "SELECT COUNT(*) AS total FROM users";

#[instrument(skip(pool))]
pub async fn list_users(pool: &AnyPool) -> Result<Vec<User>, AppError> {
    let rows = sqlx::query(SELECT_ALL).fetch_all(pool).await?;

    rows.iter().map(row_to_user).collect()
}

#[instrument(skip(pool))]
pub async fn get_user(pool: &AnyPool, id: i64) -> Result<User, AppError> {
    let row = sqlx::query(SELECT_ONE)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound)?;

    row_to_user(&row)
}

#[instrument(skip(pool, user))]
pub async fn insert_user(pool: &AnyPool, user: &NewUser) -> Result<i64, AppError> {
    let result = sqlx::query(INSERT)
        .bind(&user.firstname)
        .bind(&user.lastname)
        .bind(user.age)
        .bind(user.gender.as_str())
        .bind(&user.interests)
        .bind(&user.description)
        .execute(pool)
        .await?;

    result
        .last_insert_id()
        .ok_or_else(|| AppError::MalformedRow("insert returned no id".to_string()))
}

#[instrument(skip(pool, user))]
pub async fn update_user(pool: &AnyPool, id: i64, user: &NewUser) -> Result<(), AppError> {
    let result = sqlx::query(UPDATE)
        .bind(&user.firstname)
        .bind(&user.lastname)
        .bind(user.age)
        .bind(user.gender.as_str())
        .bind(&user.interests)
        .bind(&user.description)
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    Ok(())
}

#[instrument(skip(pool))]
pub async fn delete_user(pool: &AnyPool, id: i64) -> Result<(), AppError> {
    let result = sqlx::query(DELETE).bind(id).execute(pool).await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    Ok(())
}

pub async fn count_users(pool: &AnyPool) -> Result<i64, AppError> {
    let row = sqlx::query(COUNT).fetch_one(pool).await?;

    Ok(row.try_get("total")?)
}

fn row_to_user(row: &AnyRow) -> Result<User, AppError> {
    let gender: String = row.try_get("gender")?;

    Ok(User {
        id: row.try_get("id")?,
        firstname: row.try_get("firstname")?,
        lastname: row.try_get("lastname")?,
        age: row.try_get("age")?,
        gender: gender
            .parse()
            .map_err(|e: UnknownGender| AppError::MalformedRow(e.to_string()))?,
        interests: row.try_get("interests")?,
        description: row.try_get("description")?,
    })
}
