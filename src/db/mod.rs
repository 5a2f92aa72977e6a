pub mod db_models;

use crate::config::CONFIG;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use diesel_async::pooled_connection::deadpool::{Object, Pool};
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::AsyncPgConnection;
use diesel_async::RunQueryDsl as _;
use diesel_async::SimpleAsyncConnection as _;
use serde::Serialize;
use tracing::*;

/// Handle on the persistence layer. Cheap to clone; a clone may carry a
/// request deadline that every call checks before touching the pool.
#[derive(Clone)]
pub struct DbClient {
    db: Pool<AsyncPgConnection>,
    deadline: Option<DateTime<Utc>>,
}

impl DbClient {
    pub async fn new() -> Result<DbClient> {
        let schema_name = CONFIG.pg_schema.clone();
        info!("Using schema: {}", schema_name);
        let database_url = format!(
            "{}?options=-c%20search_path%3D{}",
            CONFIG.database_url, schema_name
        );
        let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);
        let db = Pool::builder(manager)
            .max_size(CONFIG.pool_size)
            .build()
            .map_err(|e| Error::Pool(e.to_string()))?;
        let db = DbClient { db, deadline: None };
        db.create_schema(&schema_name).await?;
        info!("Successfully connected to database");
        Ok(db)
    }

    async fn create_schema(&self, schema_name: &str) -> Result<()> {
        let sql =
            include_str!("../../nova4x_schema.sql.template").replace("___SCHEMA___", schema_name);
        let mut conn = self.conn().await?;
        conn.batch_execute(&sql).await.map_err(Error::from_db)
    }

    /// Attach a request deadline to this handle. Calls made through the
    /// returned handle fail with a cancellation error once it has passed.
    pub fn with_deadline(&self, deadline: DateTime<Utc>) -> DbClient {
        DbClient {
            db: self.db.clone(),
            deadline: Some(deadline),
        }
    }

    pub fn check_deadline(&self) -> Result<()> {
        match self.deadline {
            Some(deadline) if Utc::now() > deadline => Err(Error::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    pub async fn conn(&self) -> Result<Object<AsyncPgConnection>> {
        self.check_deadline()?;
        self.db
            .get()
            .await
            .map_err(|e| Error::Pool(e.to_string()))
    }
}

/// Invoke a named server-side routine with a single jsonb payload. The
/// payload type implements the wire contract by serializing exactly the
/// fields the routine expects. Duplicate-key and foreign-key failures come
/// back as their classified variants.
pub async fn execute<T>(conn: &mut AsyncPgConnection, script: &str, payload: &T) -> Result<()>
where
    T: Serialize + ?Sized,
{
    debug!("db execute: {}", script);
    let payload = serde_json::to_value(payload).map_err(|_| Error::InvalidUpdateData)?;
    diesel::sql_query(format!("SELECT {}($1)", script))
        .bind::<diesel::sql_types::Jsonb, _>(payload)
        .execute(conn)
        .await
        .map_err(Error::from_db)?;
    Ok(())
}
