use std::any::Any;

use diesel::SqliteConnection;
use log::error;
use tokio::sync::{mpsc, oneshot};

use super::DbPool;
use crate::errors::{Result, StorageError};

type Job<T> = Box<dyn FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static>;
type ErasedJob = Job<Box<dyn Any + Send + 'static>>;
type Reply = oneshot::Sender<Result<Box<dyn Any + Send + 'static>>>;

/// Handle for sending jobs to the writer actor.
///
/// SQLite allows one writer at a time; every insert/update/delete in this
/// crate goes through a single connection owned by the actor so concurrent
/// requests queue instead of failing with `SQLITE_BUSY`.
#[derive(Clone)]
pub struct WriteHandle {
    tx: mpsc::Sender<(ErasedJob, Reply)>,
}

impl WriteHandle {
    /// Runs `job` inside an immediate transaction on the writer connection.
    pub async fn exec<F, T>(&self, job: F) -> Result<T>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (ret_tx, ret_rx) = oneshot::channel();

        self.tx
            .send((
                Box::new(move |c| job(c).map(|v| Box::new(v) as Box<dyn Any + Send>)),
                ret_tx,
            ))
            .await
            .map_err(|_| StorageError::WriterUnavailable("writer actor stopped".to_string()))?;

        let boxed = ret_rx.await.map_err(|_| {
            StorageError::WriterUnavailable("writer actor dropped the reply".to_string())
        })??;

        boxed
            .downcast::<T>()
            .map(|v| *v)
            .map_err(|_| StorageError::WriterUnavailable("unexpected job result type".to_string()))
    }
}

/// Spawns the single-writer task. It owns one pooled connection for its
/// lifetime and stops when every [`WriteHandle`] has been dropped.
pub fn spawn_writer(pool: DbPool) -> WriteHandle {
    let (tx, mut rx) = mpsc::channel::<(ErasedJob, Reply)>(1024);

    tokio::spawn(async move {
        let mut conn = match pool.get() {
            Ok(conn) => conn,
            Err(e) => {
                error!("Writer actor could not acquire a connection: {}", e);
                while let Some((_, reply_tx)) = rx.recv().await {
                    let _ = reply_tx.send(Err(StorageError::WriterUnavailable(e.to_string())));
                }
                return;
            }
        };

        while let Some((job, reply_tx)) = rx.recv().await {
            let result = conn.immediate_transaction::<_, StorageError, _>(|c| job(c));
            // The caller may have given up waiting.
            let _ = reply_tx.send(result);
        }
    });

    WriteHandle { tx }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use diesel::RunQueryDsl;

    #[tokio::test]
    async fn test_exec_returns_job_value() {
        let (_dir, pool) = test_pool();
        let writer = spawn_writer((*pool).clone());

        let value = writer.exec(|_conn| Ok(42_u32)).await.unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn test_failed_job_rolls_back() {
        let (_dir, pool) = test_pool();
        let writer = spawn_writer((*pool).clone());

        let result: Result<()> = writer
            .exec(|conn| {
                diesel::sql_query(
                    "INSERT INTO validation_logs (postal_code, is_valid, processing_time_ms, from_cache, logged_at) \
                     VALUES ('75001', 1, 1, 0, '2026-01-01T00:00:00Z')",
                )
                .execute(conn)?;
                Err(StorageError::SerializationError("boom".to_string()))
            })
            .await;
        assert!(result.is_err());

        let count: i64 = writer
            .exec(|conn| {
                use crate::schema::validation_logs::dsl::*;
                use diesel::prelude::*;
                Ok(validation_logs.count().get_result(conn)?)
            })
            .await
            .unwrap();
        assert_eq!(count, 0);
    }
}
