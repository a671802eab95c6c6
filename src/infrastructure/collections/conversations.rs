use sqlx::SqliteConnection;

use super::{associations, delete_by_ids};
use crate::error::AppResult;
use crate::models::{current_time_millis, AssocType, ConversationId, UserId};

/// The conversation whose participants are exactly this unordered pair.
pub async fn find_between(
    conn: &mut SqliteConnection,
    a: UserId,
    b: UserId,
) -> AppResult<Option<ConversationId>> {
    let id = sqlx::query_scalar(
        r#"
        SELECT c.id FROM conversations c
        JOIN associations pa ON pa.id1 = c.id AND pa.atype = 'participants' AND pa.id2 = ?
        JOIN associations pb ON pb.id1 = c.id AND pb.atype = 'participants' AND pb.id2 = ?
        ORDER BY c.time_created
        LIMIT 1
        "#,
    )
    .bind(a)
    .bind(b)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(id)
}

pub async fn insert(
    conn: &mut SqliteConnection,
    id: ConversationId,
    participants: [UserId; 2],
) -> AppResult<()> {
    sqlx::query("INSERT INTO conversations (id, time_created) VALUES (?, ?)")
        .bind(id)
        .bind(current_time_millis())
        .execute(&mut *conn)
        .await?;
    for participant in participants {
        associations::add(conn, id, AssocType::Participants, participant).await?;
    }
    Ok(())
}

pub async fn ids_with_participant(
    conn: &mut SqliteConnection,
    user: UserId,
) -> AppResult<Vec<ConversationId>> {
    associations::owners_of(conn, AssocType::Participants, user).await
}

pub async fn delete_many(conn: &mut SqliteConnection, ids: &[ConversationId]) -> AppResult<u64> {
    delete_by_ids(conn, "conversations", ids).await
}
