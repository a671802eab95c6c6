use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection};

use super::{associations, delete_by_ids, push_id_list, ID_CHUNK};
use crate::error::AppResult;
use crate::models::{current_time_millis, to_datetime, AssocType, Post, PostId, UserId};

const POST_COLUMNS: &str = "id, author_id, image, caption, time_created";

pub async fn insert(
    conn: &mut SqliteConnection,
    id: PostId,
    author: UserId,
    image: &str,
    caption: &str,
) -> AppResult<()> {
    sqlx::query("INSERT INTO posts (id, author_id, image, caption, time_created) VALUES (?, ?, ?, ?, ?)")
        .bind(id)
        .bind(author)
        .bind(image)
        .bind(caption)
        .bind(current_time_millis())
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn get(conn: &mut SqliteConnection, id: PostId) -> AppResult<Option<Post>> {
    let row = sqlx::query(&format!("SELECT {} FROM posts WHERE id = ?", POST_COLUMNS))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    match row {
        Some(row) => Ok(Some(hydrate(conn, &row).await?)),
        None => Ok(None),
    }
}

pub async fn author_of(conn: &mut SqliteConnection, id: PostId) -> AppResult<Option<UserId>> {
    let author = sqlx::query_scalar("SELECT author_id FROM posts WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(author)
}

pub async fn ids_by_author(conn: &mut SqliteConnection, author: UserId) -> AppResult<Vec<PostId>> {
    let ids = sqlx::query_scalar("SELECT id FROM posts WHERE author_id = ?")
        .bind(author)
        .fetch_all(&mut *conn)
        .await?;
    Ok(ids)
}

/// Posts by `author`, newest first.
pub async fn by_author(conn: &mut SqliteConnection, author: UserId) -> AppResult<Vec<Post>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM posts WHERE author_id = ? ORDER BY time_created DESC, id DESC",
        POST_COLUMNS
    ))
    .bind(author)
    .fetch_all(&mut *conn)
    .await?;
    hydrate_all(conn, &rows).await
}

/// Posts visible to `viewer`, newest first: their own, every public account's,
/// and those of accounts they follow.
pub async fn visible_to(conn: &mut SqliteConnection, viewer: UserId) -> AppResult<Vec<Post>> {
    let rows = sqlx::query(&format!(
        r#"
        SELECT {} FROM posts
        WHERE author_id = ?
           OR author_id IN (SELECT id FROM users WHERE is_private = 0)
           OR author_id IN (SELECT id2 FROM associations WHERE id1 = ? AND atype = ?)
        ORDER BY time_created DESC, id DESC
        "#,
        POST_COLUMNS
    ))
    .bind(viewer)
    .bind(viewer)
    .bind(AssocType::Following.as_str())
    .fetch_all(&mut *conn)
    .await?;
    hydrate_all(conn, &rows).await
}

/// Posts in `ids`, newest first. Missing ids are skipped.
pub async fn by_ids(conn: &mut SqliteConnection, ids: &[PostId]) -> AppResult<Vec<Post>> {
    let mut posts = Vec::with_capacity(ids.len());
    for chunk in ids.chunks(ID_CHUNK) {
        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM posts WHERE id IN (", POST_COLUMNS));
        push_id_list(&mut qb, chunk);
        qb.push(")");

        let rows = qb.build().fetch_all(&mut *conn).await?;
        posts.extend(hydrate_all(conn, &rows).await?);
    }
    posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    Ok(posts)
}

pub async fn delete_many(conn: &mut SqliteConnection, ids: &[PostId]) -> AppResult<u64> {
    delete_by_ids(conn, "posts", ids).await
}

async fn hydrate_all(conn: &mut SqliteConnection, rows: &[SqliteRow]) -> AppResult<Vec<Post>> {
    let mut posts = Vec::with_capacity(rows.len());
    for row in rows {
        posts.push(hydrate(conn, row).await?);
    }
    Ok(posts)
}

async fn hydrate(conn: &mut SqliteConnection, row: &SqliteRow) -> AppResult<Post> {
    let id: PostId = row.get("id");
    Ok(Post {
        id,
        author: row.get("author_id"),
        image: row.get("image"),
        caption: row.get("caption"),
        likes: associations::list(conn, id, AssocType::Likes).await?,
        comments: associations::list(conn, id, AssocType::Comments).await?,
        created_at: to_datetime(row.get("time_created")),
    })
}
