//! SQLite job store.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Row};
use tokio_rusqlite::Connection;
use tracing::debug;
use uuid::Uuid;

use cronhook_protocols::{
    ApiKey, ExecutionRecord, ExecutionStatus, JobDefinition, JobPatch, JobRepository, JobStore,
    NewJob, StoreError, WebhookRecord,
};

use crate::schema::init_schema;

const JOB_COLUMNS: &str = "id, name, trigger_url, api_key, schedule, start_date, is_active, \
                           last_run, next_run, created_at, updated_at";

/// SQLite-based job store.
pub struct SqliteJobStore {
    conn: Connection,
}

impl SqliteJobStore {
    /// Create a new in-memory database.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().await.map_err(unavailable)?;
        Self::init(conn).await
    }

    /// Open or create a file-backed database, creating parent directories.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                StoreError::Unavailable(format!("create {}: {}", parent.display(), e))
            })?;
        }
        debug!(path = %path.display(), "Opening SQLite job store");
        let conn = Connection::open(path).await.map_err(unavailable)?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.call(|conn| Ok(init_schema(conn)?))
            .await
            .map_err(unavailable)?;
        Ok(Self { conn })
    }

    /// Run a single-row UPDATE on `jobs`, mapping "no rows" to NotFound.
    async fn update_one(
        &self,
        id: &str,
        sql: &'static str,
        value: Option<i64>,
    ) -> Result<(), StoreError> {
        let id = id.to_string();
        let key = id.clone();
        let changed = self
            .conn
            .call(move |conn| Ok(conn.execute(sql, params![value, key])?))
            .await
            .map_err(unavailable)?;
        if changed == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }
}

#[async_trait]
impl JobStore for SqliteJobStore {
    async fn find_active_eligible(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<JobDefinition>, StoreError> {
        let cutoff = to_millis(now);
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM jobs WHERE is_active = 1 AND start_date <= ?1 \
                     ORDER BY created_at, id",
                    JOB_COLUMNS
                ))?;
                let jobs = stmt
                    .query_map([cutoff], job_from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(jobs)
            })
            .await
            .map_err(unavailable)
    }

    async fn get_by_id(&self, id: &str) -> Result<JobDefinition, StoreError> {
        let key = id.to_string();
        self.conn
            .call(move |conn| Ok(select_job(conn, &key)?))
            .await
            .map_err(unavailable)?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn set_active(&self, id: &str, active: bool) -> Result<(), StoreError> {
        self.update_one(
            id,
            "UPDATE jobs SET is_active = ?1 WHERE id = ?2",
            Some(i64::from(active)),
        )
        .await
    }

    async fn disarm(&self, id: &str, updated_at: DateTime<Utc>) -> Result<bool, StoreError> {
        let key = id.to_string();
        let stamp = to_millis(updated_at);
        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let current: Option<i64> = tx
                    .query_row("SELECT updated_at FROM jobs WHERE id = ?1", [&key], |row| {
                        row.get(0)
                    })
                    .optional()?;
                let disarmed = match current {
                    None => None,
                    Some(at) if at != stamp => Some(false),
                    Some(_) => {
                        tx.execute(
                            "UPDATE jobs SET is_active = 0, next_run = NULL WHERE id = ?1",
                            [&key],
                        )?;
                        Some(true)
                    }
                };
                tx.commit()?;
                Ok(disarmed)
            })
            .await
            .map_err(unavailable)?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn set_next_run(
        &self,
        id: &str,
        next_run: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        self.update_one(
            id,
            "UPDATE jobs SET next_run = ?1 WHERE id = ?2",
            next_run.map(to_millis),
        )
        .await
    }

    async fn set_last_run(&self, id: &str, last_run: DateTime<Utc>) -> Result<(), StoreError> {
        self.update_one(
            id,
            "UPDATE jobs SET last_run = ?1 WHERE id = ?2",
            Some(to_millis(last_run)),
        )
        .await
    }

    async fn append_execution_record(&self, record: ExecutionRecord) -> Result<(), StoreError> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO execution_records (id, job_id, status, response, triggered_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        record.id,
                        record.job_id,
                        record.status.as_str(),
                        record.response,
                        to_millis(record.triggered_at)
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(unavailable)
    }

    async fn append_webhook_record(&self, record: WebhookRecord) -> Result<(), StoreError> {
        let data = serde_json::to_string(&record.data)?;
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO webhook_records (id, job_id, data, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        record.id,
                        record.job_id,
                        data,
                        to_millis(record.created_at),
                        to_millis(record.updated_at)
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(unavailable)
    }
}

#[async_trait]
impl JobRepository for SqliteJobStore {
    async fn insert_job(&self, job: NewJob) -> Result<JobDefinition, StoreError> {
        let definition = job.into_definition(Uuid::new_v4().to_string(), now_millis());
        let row = definition.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    &format!(
                        "INSERT INTO jobs ({}) \
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                        JOB_COLUMNS
                    ),
                    params![
                        row.id,
                        row.name,
                        row.trigger_url,
                        row.api_key.expose(),
                        row.schedule,
                        to_millis(row.start_date),
                        row.is_active,
                        row.last_run.map(to_millis),
                        row.next_run.map(to_millis),
                        to_millis(row.created_at),
                        to_millis(row.updated_at)
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(unavailable)?;
        debug!(job_id = %definition.id, "Inserted job");
        Ok(definition)
    }

    async fn list_jobs(&self) -> Result<Vec<JobDefinition>, StoreError> {
        self.conn
            .call(|conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM jobs ORDER BY created_at, id",
                    JOB_COLUMNS
                ))?;
                let jobs = stmt
                    .query_map([], job_from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(jobs)
            })
            .await
            .map_err(unavailable)
    }

    async fn update_job(&self, id: &str, patch: JobPatch) -> Result<JobDefinition, StoreError> {
        let key = id.to_string();
        let now = now_millis();
        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let Some(mut job) = select_job(&tx, &key)? else {
                    return Ok(None);
                };
                patch.apply(&mut job, now);
                tx.execute(
                    "UPDATE jobs SET name = ?1, trigger_url = ?2, api_key = ?3, schedule = ?4,
                     start_date = ?5, is_active = ?6, updated_at = ?7 WHERE id = ?8",
                    params![
                        job.name,
                        job.trigger_url,
                        job.api_key.expose(),
                        job.schedule,
                        to_millis(job.start_date),
                        job.is_active,
                        to_millis(job.updated_at),
                        job.id
                    ],
                )?;
                tx.commit()?;
                Ok(Some(job))
            })
            .await
            .map_err(unavailable)?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn delete_job(&self, id: &str) -> Result<JobDefinition, StoreError> {
        let key = id.to_string();
        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let job = select_job(&tx, &key)?;
                if job.is_some() {
                    tx.execute("DELETE FROM jobs WHERE id = ?1", [&key])?;
                }
                tx.commit()?;
                Ok(job)
            })
            .await
            .map_err(unavailable)?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn list_execution_records(
        &self,
        job_id: &str,
    ) -> Result<Vec<ExecutionRecord>, StoreError> {
        let job_id = job_id.to_string();
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, job_id, status, response, triggered_at FROM execution_records
                     WHERE job_id = ?1 ORDER BY triggered_at DESC, rowid DESC",
                )?;
                let records = stmt
                    .query_map([&job_id], execution_from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(records)
            })
            .await
            .map_err(unavailable)
    }

    async fn list_webhook_records(&self) -> Result<Vec<WebhookRecord>, StoreError> {
        self.conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, job_id, data, created_at, updated_at FROM webhook_records
                     ORDER BY created_at DESC, rowid DESC",
                )?;
                let records = stmt
                    .query_map([], webhook_from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(records)
            })
            .await
            .map_err(unavailable)
    }
}

fn unavailable(e: tokio_rusqlite::Error) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

/// The current instant at the precision rows are stored with.
fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}

fn conversion_error(idx: usize, ty: Type, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, ty, message.into())
}

fn millis_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let millis: i64 = row.get(idx)?;
    DateTime::from_timestamp_millis(millis).ok_or_else(|| {
        conversion_error(idx, Type::Integer, format!("timestamp out of range: {}", millis))
    })
}

fn optional_millis_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    match row.get::<_, Option<i64>>(idx)? {
        Some(_) => millis_at(row, idx).map(Some),
        None => Ok(None),
    }
}

fn select_job(conn: &rusqlite::Connection, id: &str) -> rusqlite::Result<Option<JobDefinition>> {
    conn.query_row(
        &format!("SELECT {} FROM jobs WHERE id = ?1", JOB_COLUMNS),
        [id],
        job_from_row,
    )
    .optional()
}

fn job_from_row(row: &Row<'_>) -> rusqlite::Result<JobDefinition> {
    Ok(JobDefinition {
        id: row.get(0)?,
        name: row.get(1)?,
        trigger_url: row.get(2)?,
        api_key: ApiKey::new(row.get::<_, String>(3)?),
        schedule: row.get(4)?,
        start_date: millis_at(row, 5)?,
        is_active: row.get(6)?,
        last_run: optional_millis_at(row, 7)?,
        next_run: optional_millis_at(row, 8)?,
        created_at: millis_at(row, 9)?,
        updated_at: millis_at(row, 10)?,
    })
}

fn execution_from_row(row: &Row<'_>) -> rusqlite::Result<ExecutionRecord> {
    let status: String = row.get(2)?;
    let status = ExecutionStatus::parse(&status)
        .ok_or_else(|| conversion_error(2, Type::Text, format!("unknown status: {}", status)))?;
    Ok(ExecutionRecord {
        id: row.get(0)?,
        job_id: row.get(1)?,
        status,
        response: row.get(3)?,
        triggered_at: millis_at(row, 4)?,
    })
}

fn webhook_from_row(row: &Row<'_>) -> rusqlite::Result<WebhookRecord> {
    let data: String = row.get(2)?;
    let data = serde_json::from_str(&data)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?;
    Ok(WebhookRecord {
        id: row.get(0)?,
        job_id: row.get(1)?,
        data,
        created_at: millis_at(row, 3)?,
        updated_at: millis_at(row, 4)?,
    })
}

#[cfg(test)]
#[path = "sqlite_tests.rs"]
mod tests;
