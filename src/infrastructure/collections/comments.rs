use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection};
use std::collections::{BTreeSet, HashMap};

use super::{delete_by_ids, push_id_list, ID_CHUNK};
use crate::error::AppResult;
use crate::models::{current_time_millis, to_datetime, Comment, CommentId, PostId, UserId};

pub async fn insert(
    conn: &mut SqliteConnection,
    id: CommentId,
    text: &str,
    author: UserId,
    post: PostId,
) -> AppResult<Comment> {
    let now = current_time_millis();
    sqlx::query("INSERT INTO comments (id, text, author_id, post_id, time_created) VALUES (?, ?, ?, ?, ?)")
        .bind(id)
        .bind(text)
        .bind(author)
        .bind(post)
        .bind(now)
        .execute(&mut *conn)
        .await?;

    Ok(Comment {
        id,
        text: text.to_string(),
        author,
        post,
        created_at: to_datetime(now),
    })
}

/// Comments attached to `post`, in creation order.
pub async fn by_post(conn: &mut SqliteConnection, post: PostId) -> AppResult<Vec<Comment>> {
    let rows = sqlx::query(
        "SELECT id, text, author_id, post_id, time_created FROM comments WHERE post_id = ? ORDER BY time_created, id",
    )
    .bind(post)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows.iter().map(from_row).collect())
}

/// Comments with the given ids, in the order given.
pub async fn by_ids(conn: &mut SqliteConnection, ids: &[CommentId]) -> AppResult<Vec<Comment>> {
    let mut found = Vec::with_capacity(ids.len());
    for chunk in ids.chunks(ID_CHUNK) {
        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT id, text, author_id, post_id, time_created FROM comments WHERE id IN (",
        );
        push_id_list(&mut qb, chunk);
        qb.push(")");
        let rows = qb.build().fetch_all(&mut *conn).await?;
        found.extend(rows.iter().map(from_row));
    }

    let position: HashMap<CommentId, usize> = ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();
    found.sort_by_key(|c| position.get(&c.id).copied());
    Ok(found)
}

/// Every comment written by `author` or attached to one of `posts`.
pub async fn ids_by_author_or_posts(
    conn: &mut SqliteConnection,
    author: UserId,
    posts: &[PostId],
) -> AppResult<Vec<CommentId>> {
    let written: Vec<CommentId> = sqlx::query_scalar("SELECT id FROM comments WHERE author_id = ?")
        .bind(author)
        .fetch_all(&mut *conn)
        .await?;
    let mut ids: BTreeSet<CommentId> = written.into_iter().collect();

    for chunk in posts.chunks(ID_CHUNK) {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT id FROM comments WHERE post_id IN (");
        push_id_list(&mut qb, chunk);
        qb.push(")");
        ids.extend(qb.build_query_scalar::<CommentId>().fetch_all(&mut *conn).await?);
    }
    Ok(ids.into_iter().collect())
}

pub async fn ids_by_post(conn: &mut SqliteConnection, post: PostId) -> AppResult<Vec<CommentId>> {
    let ids = sqlx::query_scalar("SELECT id FROM comments WHERE post_id = ?")
        .bind(post)
        .fetch_all(&mut *conn)
        .await?;
    Ok(ids)
}

pub async fn delete_many(conn: &mut SqliteConnection, ids: &[CommentId]) -> AppResult<u64> {
    delete_by_ids(conn, "comments", ids).await
}

fn from_row(row: &SqliteRow) -> Comment {
    Comment {
        id: row.get("id"),
        text: row.get("text"),
        author: row.get("author_id"),
        post: row.get("post_id"),
        created_at: to_datetime(row.get("time_created")),
    }
}
