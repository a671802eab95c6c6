use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use super::delete_by_ids;
use crate::error::AppResult;
use crate::models::{current_time_millis, to_datetime, AssocType, ConversationId, Message, MessageId, UserId};

pub async fn insert(
    conn: &mut SqliteConnection,
    id: MessageId,
    sender: UserId,
    receiver: UserId,
    text: &str,
) -> AppResult<Message> {
    let now = current_time_millis();
    sqlx::query("INSERT INTO messages (id, sender_id, receiver_id, message, time_created) VALUES (?, ?, ?, ?, ?)")
        .bind(id)
        .bind(sender)
        .bind(receiver)
        .bind(text)
        .bind(now)
        .execute(&mut *conn)
        .await?;

    Ok(Message {
        id,
        sender_id: sender,
        receiver_id: receiver,
        message: text.to_string(),
        created_at: to_datetime(now),
    })
}

/// Messages listed on the conversation, in send order.
pub async fn in_conversation(
    conn: &mut SqliteConnection,
    conversation: ConversationId,
) -> AppResult<Vec<Message>> {
    let rows = sqlx::query(
        r#"
        SELECT m.id, m.sender_id, m.receiver_id, m.message, m.time_created
        FROM associations a
        JOIN messages m ON m.id = a.id2
        WHERE a.id1 = ? AND a.atype = ?
        ORDER BY a.position
        "#,
    )
    .bind(conversation)
    .bind(AssocType::Messages.as_str())
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows.iter().map(from_row).collect())
}

/// Every message `user` sent or received.
pub async fn ids_by_party(conn: &mut SqliteConnection, user: UserId) -> AppResult<Vec<MessageId>> {
    let ids = sqlx::query_scalar("SELECT id FROM messages WHERE sender_id = ? OR receiver_id = ?")
        .bind(user)
        .bind(user)
        .fetch_all(&mut *conn)
        .await?;
    Ok(ids)
}

pub async fn delete_many(conn: &mut SqliteConnection, ids: &[MessageId]) -> AppResult<u64> {
    delete_by_ids(conn, "messages", ids).await
}

fn from_row(row: &SqliteRow) -> Message {
    Message {
        id: row.get("id"),
        sender_id: row.get("sender_id"),
        receiver_id: row.get("receiver_id"),
        message: row.get("message"),
        created_at: to_datetime(row.get("time_created")),
    }
}
