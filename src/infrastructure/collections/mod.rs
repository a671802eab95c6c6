// Typed collection queries over a borrowed connection
// Callers pick the connection: a pooled one for reads, a StoreTransaction for anything that writes

pub mod associations;
pub mod comments;
pub mod conversations;
pub mod messages;
pub mod posts;
pub mod users;

use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::error::AppResult;
use crate::models::ObjectId;

/// Ids bound per statement. SQLite caps the number of host parameters, so
/// id lists of any length are split into chunks of this size.
pub(crate) const ID_CHUNK: usize = 500;

pub(crate) fn push_id_list(qb: &mut QueryBuilder<'_, Sqlite>, ids: &[ObjectId]) {
    let mut separated = qb.separated(",");
    for id in ids {
        separated.push_bind(*id);
    }
}

/// `DELETE FROM <table> WHERE id IN (...)`, chunked.
pub(crate) async fn delete_by_ids(
    conn: &mut SqliteConnection,
    table: &'static str,
    ids: &[ObjectId],
) -> AppResult<u64> {
    let mut deleted = 0;
    for chunk in ids.chunks(ID_CHUNK) {
        let mut qb = QueryBuilder::<Sqlite>::new(format!("DELETE FROM {} WHERE id IN (", table));
        push_id_list(&mut qb, chunk);
        qb.push(")");
        deleted += qb.build().execute(&mut *conn).await?.rows_affected();
    }
    Ok(deleted)
}
