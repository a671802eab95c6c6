use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection};
use std::collections::HashMap;

use super::{associations, push_id_list, ID_CHUNK};
use crate::error::AppResult;
use crate::models::{
    current_time_millis, to_datetime, AssocType, Gender, User, UserId, UserSummary,
};

pub struct NewUser<'a> {
    pub id: UserId,
    pub username: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
}

/// Profile fields; `None` leaves the stored value untouched.
#[derive(Debug, Default, Clone)]
pub struct ProfileUpdate {
    pub bio: Option<String>,
    pub gender: Option<Gender>,
    pub is_private: Option<bool>,
    pub profile_picture: Option<String>,
}

const USER_COLUMNS: &str =
    "id, username, email, password_hash, bio, profile_picture, gender, is_private, time_created";

pub async fn insert(conn: &mut SqliteConnection, user: NewUser<'_>) -> AppResult<()> {
    let now = current_time_millis();
    sqlx::query(
        "INSERT INTO users (id, username, email, password_hash, time_created, time_updated) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(user.id)
    .bind(user.username)
    .bind(user.email)
    .bind(user.password_hash)
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Loads the user document together with its four id lists.
pub async fn get(conn: &mut SqliteConnection, id: UserId) -> AppResult<Option<User>> {
    let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    match row {
        Some(row) => Ok(Some(hydrate(conn, &row).await?)),
        None => Ok(None),
    }
}

pub async fn find_by_email(conn: &mut SqliteConnection, email: &str) -> AppResult<Option<User>> {
    let row = sqlx::query(&format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS))
        .bind(email)
        .fetch_optional(&mut *conn)
        .await?;

    match row {
        Some(row) => Ok(Some(hydrate(conn, &row).await?)),
        None => Ok(None),
    }
}

pub async fn exists(conn: &mut SqliteConnection, id: UserId) -> AppResult<bool> {
    let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(found.is_some())
}

pub async fn email_taken(conn: &mut SqliteConnection, email: &str) -> AppResult<bool> {
    let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(found.is_some())
}

pub async fn username_taken(conn: &mut SqliteConnection, username: &str) -> AppResult<bool> {
    let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM users WHERE username = ?")
        .bind(username)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(found.is_some())
}

pub async fn update_profile(
    conn: &mut SqliteConnection,
    id: UserId,
    update: &ProfileUpdate,
) -> AppResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE users SET
            bio = COALESCE(?, bio),
            gender = COALESCE(?, gender),
            is_private = COALESCE(?, is_private),
            profile_picture = COALESCE(?, profile_picture),
            time_updated = ?
        WHERE id = ?
        "#,
    )
    .bind(update.bio.as_deref())
    .bind(update.gender.map(|g| g.as_str()))
    .bind(update.is_private.map(i64::from))
    .bind(update.profile_picture.as_deref())
    .bind(current_time_millis())
    .bind(id)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn delete(conn: &mut SqliteConnection, id: UserId) -> AppResult<bool> {
    let result = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Summaries for `ids`, in the order given. Ids with no document are skipped.
pub async fn summaries(conn: &mut SqliteConnection, ids: &[UserId]) -> AppResult<Vec<UserSummary>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let mut by_id: HashMap<UserId, UserSummary> = HashMap::with_capacity(ids.len());
    for chunk in ids.chunks(ID_CHUNK) {
        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT id, username, profile_picture, bio FROM users WHERE id IN (",
        );
        push_id_list(&mut qb, chunk);
        qb.push(")");

        for row in qb.build().fetch_all(&mut *conn).await? {
            let summary = summary_from_row(&row);
            by_id.insert(summary.id, summary);
        }
    }

    Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
}

pub async fn summary(conn: &mut SqliteConnection, id: UserId) -> AppResult<Option<UserSummary>> {
    Ok(summaries(conn, &[id]).await?.into_iter().next())
}

/// Users other than `exclude`, oldest accounts first.
pub async fn others(
    conn: &mut SqliteConnection,
    exclude: UserId,
    limit: i64,
) -> AppResult<Vec<UserSummary>> {
    let rows = sqlx::query(
        "SELECT id, username, profile_picture, bio FROM users WHERE id != ? ORDER BY time_created, id LIMIT ?",
    )
    .bind(exclude)
    .bind(limit)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows.iter().map(summary_from_row).collect())
}

/// Case-insensitive substring match on username, sorted by username.
pub async fn search(
    conn: &mut SqliteConnection,
    query: &str,
    exclude: UserId,
    limit: i64,
) -> AppResult<Vec<UserSummary>> {
    let pattern = format!("%{}%", escape_like(&query.to_lowercase()));
    let rows = sqlx::query(
        r#"
        SELECT id, username, profile_picture, bio FROM users
        WHERE id != ? AND lower(username) LIKE ? ESCAPE '\'
        ORDER BY username
        LIMIT ?
        "#,
    )
    .bind(exclude)
    .bind(pattern)
    .bind(limit)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows.iter().map(summary_from_row).collect())
}

fn escape_like(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

fn summary_from_row(row: &SqliteRow) -> UserSummary {
    UserSummary {
        id: row.get("id"),
        username: row.get("username"),
        profile_picture: row.get("profile_picture"),
        bio: row.get("bio"),
    }
}

async fn hydrate(conn: &mut SqliteConnection, row: &SqliteRow) -> AppResult<User> {
    let id: UserId = row.get("id");
    let gender: Option<String> = row.get("gender");
    Ok(User {
        id,
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        bio: row.get("bio"),
        profile_picture: row.get("profile_picture"),
        gender: gender.as_deref().and_then(Gender::parse),
        is_private: row.get::<i64, _>("is_private") != 0,
        created_at: to_datetime(row.get("time_created")),
        posts: associations::list(conn, id, AssocType::Posts).await?,
        bookmarks: associations::list(conn, id, AssocType::Bookmarks).await?,
        followers: associations::list(conn, id, AssocType::Followers).await?,
        following: associations::list(conn, id, AssocType::Following).await?,
    })
}
