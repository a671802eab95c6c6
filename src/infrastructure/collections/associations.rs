// Association rows - the id lists hanging off users, posts and conversations
// Each call is a single statement, so it is atomic on its own and composes inside a transaction

use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection};

use super::{push_id_list, ID_CHUNK};
use crate::error::AppResult;
use crate::models::{current_time_millis, AssocType, ObjectId};

/// Set-add. Returns false when `id2` was already in the list.
pub async fn add(
    conn: &mut SqliteConnection,
    id1: ObjectId,
    atype: AssocType,
    id2: ObjectId,
) -> AppResult<bool> {
    let result = sqlx::query(
        "INSERT OR IGNORE INTO associations (id1, atype, id2, time_created) VALUES (?, ?, ?, ?)",
    )
    .bind(id1)
    .bind(atype.as_str())
    .bind(id2)
    .bind(current_time_millis())
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Pull. Returns false when `id2` was not in the list.
pub async fn remove(
    conn: &mut SqliteConnection,
    id1: ObjectId,
    atype: AssocType,
    id2: ObjectId,
) -> AppResult<bool> {
    let result = sqlx::query("DELETE FROM associations WHERE id1 = ? AND atype = ? AND id2 = ?")
        .bind(id1)
        .bind(atype.as_str())
        .bind(id2)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn exists(
    conn: &mut SqliteConnection,
    id1: ObjectId,
    atype: AssocType,
    id2: ObjectId,
) -> AppResult<bool> {
    let found: Option<i64> = sqlx::query_scalar(
        "SELECT 1 FROM associations WHERE id1 = ? AND atype = ? AND id2 = ?",
    )
    .bind(id1)
    .bind(atype.as_str())
    .bind(id2)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(found.is_some())
}

/// The list in insertion order.
pub async fn list(
    conn: &mut SqliteConnection,
    id1: ObjectId,
    atype: AssocType,
) -> AppResult<Vec<ObjectId>> {
    let rows = sqlx::query("SELECT id2 FROM associations WHERE id1 = ? AND atype = ? ORDER BY position")
        .bind(id1)
        .bind(atype.as_str())
        .fetch_all(&mut *conn)
        .await?;
    Ok(rows.into_iter().map(|row| row.get::<i64, _>("id2")).collect())
}

/// Every list owner of this type that contains `id2`.
pub async fn owners_of(
    conn: &mut SqliteConnection,
    atype: AssocType,
    id2: ObjectId,
) -> AppResult<Vec<ObjectId>> {
    let rows = sqlx::query("SELECT id1 FROM associations WHERE atype = ? AND id2 = ? ORDER BY position")
        .bind(atype.as_str())
        .bind(id2)
        .fetch_all(&mut *conn)
        .await?;
    Ok(rows.into_iter().map(|row| row.get::<i64, _>("id1")).collect())
}

/// Pull every id in `targets` out of every list of this type.
pub async fn remove_all_everywhere(
    conn: &mut SqliteConnection,
    atype: AssocType,
    targets: &[ObjectId],
) -> AppResult<u64> {
    let mut removed = 0;
    for chunk in targets.chunks(ID_CHUNK) {
        let mut qb = QueryBuilder::<Sqlite>::new("DELETE FROM associations WHERE atype = ");
        qb.push_bind(atype.as_str());
        qb.push(" AND id2 IN (");
        push_id_list(&mut qb, chunk);
        qb.push(")");
        removed += qb.build().execute(&mut *conn).await?.rows_affected();
    }
    Ok(removed)
}

/// Drop every row that names one of `ids` on either side, so a deleted
/// document leaves no list behind and appears in no other list.
pub async fn delete_touching(conn: &mut SqliteConnection, ids: &[ObjectId]) -> AppResult<u64> {
    let mut removed = 0;
    for chunk in ids.chunks(ID_CHUNK) {
        let mut qb = QueryBuilder::<Sqlite>::new("DELETE FROM associations WHERE id1 IN (");
        push_id_list(&mut qb, chunk);
        qb.push(") OR id2 IN (");
        push_id_list(&mut qb, chunk);
        qb.push(")");
        removed += qb.build().execute(&mut *conn).await?.rows_affected();
    }
    Ok(removed)
}
