// PostgreSQL-backed identity, item and ledger storage

use crate::core::errors::AccessError;
use crate::core::models::{
    AuditRecord, Compartment, Item, ItemStatus, NewAuditRecord, RecordId, UserProfile,
};
use crate::store::{IdentityStore, ItemStore, Ledger};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::error;
use uuid::Uuid;

/// Database row for an item
#[derive(FromRow)]
struct FileRow {
    id: String,
    user_id: String,
    filename: String,
    row_position: i32,
    column_position: i32,
    shelf_number: Option<i32>,
    status: String,
    accessed_at: Option<DateTime<Utc>>,
}

#[derive(FromRow)]
struct UserRow {
    user_id: String,
    name: String,
    department: Option<String>,
}

impl From<UserRow> for UserProfile {
    fn from(row: UserRow) -> Self {
        UserProfile {
            id: row.user_id,
            name: row.name,
            department: row.department,
        }
    }
}

/// Database row for an audit record, joined with its user and file
#[derive(FromRow)]
struct AccessLogRow {
    id: Uuid,
    user_id: String,
    file_id: Option<String>,
    access_type: String,
    row_position: i32,
    column_position: i32,
    shelf_number: Option<i32>,
    success: bool,
    notes: String,
    timestamp: DateTime<Utc>,
    user_name: Option<String>,
    department: Option<String>,
    filename: Option<String>,
}

fn to_u32(value: i32, column: &str) -> Result<u32, AccessError> {
    u32::try_from(value)
        .map_err(|_| AccessError::PersistenceError(format!("Negative {} value {}", column, value)))
}

fn to_i32(value: u32) -> Result<i32, AccessError> {
    i32::try_from(value)
        .map_err(|_| AccessError::InvalidInput(format!("Coordinate {} out of range", value)))
}

impl TryFrom<FileRow> for Item {
    type Error = AccessError;

    fn try_from(row: FileRow) -> Result<Self, Self::Error> {
        Ok(Item {
            id: row.id,
            owner: row.user_id,
            name: row.filename,
            compartment: Compartment {
                row: to_u32(row.row_position, "row_position")?,
                column: to_u32(row.column_position, "column_position")?,
                shelf: row.shelf_number.map(|s| to_u32(s, "shelf_number")).transpose()?,
            },
            status: row.status.parse()?,
            last_actuated_at: row.accessed_at,
        })
    }
}

impl TryFrom<AccessLogRow> for AuditRecord {
    type Error = AccessError;

    fn try_from(row: AccessLogRow) -> Result<Self, Self::Error> {
        let user = row.user_name.map(|name| UserProfile {
            id: row.user_id.clone(),
            name,
            department: row.department,
        });

        Ok(AuditRecord {
            id: RecordId::new(row.id),
            identity: row.user_id,
            item_id: row.file_id,
            action: row.access_type.parse()?,
            compartment: Compartment {
                row: to_u32(row.row_position, "row_position")?,
                column: to_u32(row.column_position, "column_position")?,
                shelf: row.shelf_number.map(|s| to_u32(s, "shelf_number")).transpose()?,
            },
            success: row.success,
            note: row.notes,
            recorded_at: row.timestamp,
            user,
            item_name: row.filename,
        })
    }
}

/// PostgreSQL store over the `users`, `files` and `access_logs` tables
pub struct PgStore {
    db_pool: PgPool,
}

impl PgStore {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, AccessError> {
        let db_pool = PgPool::connect(database_url).await.map_err(|e| {
            error!(error = %e, "Failed to connect to database");
            AccessError::PersistenceError(e.to_string())
        })?;
        Ok(Self::new(db_pool))
    }
}

#[async_trait]
impl IdentityStore for PgStore {
    async fn find(&self, identity: &str) -> Result<Option<UserProfile>, AccessError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT user_id, name, department FROM users WHERE user_id = $1",
        )
        .bind(identity)
        .fetch_optional(&self.db_pool)
        .await?;
        Ok(row.map(UserProfile::from))
    }
}

#[async_trait]
impl ItemStore for PgStore {
    async fn find_eligible(&self, identity: &str) -> Result<Vec<Item>, AccessError> {
        let rows = sqlx::query_as::<_, FileRow>(
            "SELECT id, user_id, filename, row_position, column_position, shelf_number, status, accessed_at
             FROM files
             WHERE user_id = $1 AND status IN ('AVAILABLE', 'RETRIEVED')
             ORDER BY id",
        )
        .bind(identity)
        .fetch_all(&self.db_pool)
        .await?;

        rows.into_iter().map(Item::try_from).collect()
    }

    async fn transition(&self, item_id: &str, status: ItemStatus) -> Result<Item, AccessError> {
        let row = sqlx::query_as::<_, FileRow>(
            "UPDATE files SET status = $2, accessed_at = NOW(), updated_at = NOW()
             WHERE id = $1
             RETURNING id, user_id, filename, row_position, column_position, shelf_number, status, accessed_at",
        )
        .bind(item_id)
        .bind(status.as_str())
        .fetch_optional(&self.db_pool)
        .await?
        .ok_or_else(|| AccessError::NotFound(format!("item {}", item_id)))?;

        Item::try_from(row)
    }
}

#[async_trait]
impl Ledger for PgStore {
    async fn append(&self, record: NewAuditRecord) -> Result<RecordId, AccessError> {
        let id = RecordId::generate();
        sqlx::query(
            "INSERT INTO access_logs
                (id, user_id, file_id, access_type, row_position, column_position, shelf_number, success, notes, timestamp)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NOW())",
        )
        .bind(id.as_uuid())
        .bind(&record.identity)
        .bind(&record.item_id)
        .bind(record.action.as_str())
        .bind(to_i32(record.compartment.row)?)
        .bind(to_i32(record.compartment.column)?)
        .bind(record.compartment.shelf.map(to_i32).transpose()?)
        .bind(record.success)
        .bind(&record.note)
        .execute(&self.db_pool)
        .await?;
        Ok(id)
    }

    async fn recent(&self, limit: usize, identity: Option<&str>) -> Result<Vec<AuditRecord>, AccessError> {
        let rows = sqlx::query_as::<_, AccessLogRow>(
            "SELECT l.id, l.user_id, l.file_id, l.access_type, l.row_position, l.column_position,
                    l.shelf_number, l.success, l.notes, l.timestamp,
                    u.name AS user_name, u.department, f.filename
             FROM access_logs l
             LEFT JOIN users u ON u.user_id = l.user_id
             LEFT JOIN files f ON f.id = l.file_id
             WHERE $1::TEXT IS NULL OR l.user_id = $1
             ORDER BY l.timestamp DESC
             LIMIT $2",
        )
        .bind(identity)
        .bind(limit as i64)
        .fetch_all(&self.db_pool)
        .await?;

        rows.into_iter().map(AuditRecord::try_from).collect()
    }

    async fn ping(&self) -> Result<(), AccessError> {
        sqlx::query("SELECT 1").execute(&self.db_pool).await?;
        Ok(())
    }
}
