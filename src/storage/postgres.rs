use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::config::DatabaseSettings;
use crate::domain::bid::{Bid, BidContent, Feedback};
use crate::domain::identity::{Employee, Membership};
use crate::domain::page::Page;
use crate::domain::tender::{ServiceType, Tender, TenderContent};
use crate::error::{ProcurementError, Result};
use crate::versioning::{EntityKind, MutationBatch, Snapshot, StagedWrite, VersionedWrite};

use super::{BidRepository, IdentityRepository, MutationStore, TenderRepository, VersionedRepository};

// ============================================================================
// Postgres Store
// ============================================================================
//
// Tables: employee, organization, organization_responsible, tenders,
// tender_versions, bids, bid_versions, bid_feedbacks.
//
// Enum columns are read as text and parsed in Rust; writes cast the bound
// text back to the Postgres enum type. A failed parse of a stored value is
// an integrity fault and surfaces as `Internal`.
//
// ============================================================================

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(settings: &DatabaseSettings) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .connect(&settings.connection_url())
            .await?;

        tracing::info!(
            host = %settings.host,
            port = settings.port,
            database = %settings.database,
            "✅ Connected to Postgres"
        );
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create enum types, tables and indexes if missing
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        tracing::info!("📋 Schema ready");
        Ok(())
    }
}

const SCHEMA: &str = include_str!("../../schema.sql");

fn limit_offset(page: Page) -> (i64, i64) {
    (i64::from(page.limit), i64::from(page.offset))
}

fn corrupt(err: ProcurementError, table: &str, id: Uuid) -> ProcurementError {
    tracing::error!(table = %table, id = %id, error = %err, "Stored row failed to parse");
    ProcurementError::Internal(format!("{} row {} is corrupt: {}", table, id, err))
}

// ============================================================================
// Row types
// ============================================================================

#[derive(Debug, FromRow)]
struct EmployeeRow {
    id: Uuid,
    username: String,
    first_name: Option<String>,
    last_name: Option<String>,
    created_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl From<EmployeeRow> for Employee {
    fn from(row: EmployeeRow) -> Self {
        Employee {
            id: row.id,
            username: row.username,
            first_name: row.first_name,
            last_name: row.last_name,
            created_at: row.created_at,
            deleted_at: row.deleted_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct MembershipRow {
    id: Uuid,
    organization_id: Uuid,
    employee_id: Uuid,
}

impl From<MembershipRow> for Membership {
    fn from(row: MembershipRow) -> Self {
        Membership {
            id: row.id,
            organization_id: row.organization_id,
            employee_id: row.employee_id,
        }
    }
}

#[derive(Debug, FromRow)]
struct TenderRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    service_type: Option<String>,
    status: String,
    employee_username: String,
    organization_id: Uuid,
    version: i64,
    created_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl TenderRow {
    fn into_tender(self) -> Result<Tender> {
        let id = self.id;
        let parse = || -> Result<Tender> {
            let service_type = self
                .service_type
                .as_deref()
                .ok_or_else(|| ProcurementError::invalid_enum("service type", ""))?
                .parse()?;
            Ok(Tender {
                id: self.id,
                name: self.name.clone(),
                description: self.description.clone().unwrap_or_default(),
                service_type,
                status: self.status.parse()?,
                organization_id: self.organization_id,
                creator_username: self.employee_username.clone(),
                version: self.version,
                created_at: self.created_at,
                deleted_at: self.deleted_at,
            })
        };
        parse().map_err(|e| corrupt(e, "tenders", id))
    }
}

#[derive(Debug, FromRow)]
struct TenderVersionRow {
    id: Uuid,
    tender_id: Uuid,
    name: String,
    description: Option<String>,
    service_type: Option<String>,
    status: String,
    employee_username: String,
    organization_id: Uuid,
    version: i64,
    created_at: DateTime<Utc>,
}

impl TenderVersionRow {
    fn into_snapshot(self) -> Result<Snapshot<TenderContent>> {
        let id = self.id;
        let parse = || -> Result<Snapshot<TenderContent>> {
            let service_type = self
                .service_type
                .as_deref()
                .ok_or_else(|| ProcurementError::invalid_enum("service type", ""))?
                .parse()?;
            Ok(Snapshot {
                snapshot_id: self.id,
                entity_id: self.tender_id,
                version: self.version,
                organization_id: self.organization_id,
                creator_username: self.employee_username.clone(),
                content: TenderContent {
                    name: self.name.clone(),
                    description: self.description.clone().unwrap_or_default(),
                    service_type,
                    status: self.status.parse()?,
                },
                created_at: self.created_at,
            })
        };
        parse().map_err(|e| corrupt(e, "tender_versions", id))
    }
}

#[derive(Debug, FromRow)]
struct BidRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    status: String,
    tender_id: Uuid,
    author_type: String,
    author_id: Option<Uuid>,
    employee_username: String,
    organization_id: Uuid,
    version: i64,
    created_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl BidRow {
    fn into_bid(self) -> Result<Bid> {
        let id = self.id;
        let parse = || -> Result<Bid> {
            Ok(Bid {
                id: self.id,
                name: self.name.clone(),
                description: self.description.clone().unwrap_or_default(),
                status: self.status.parse()?,
                tender_id: self.tender_id,
                author_type: self.author_type.parse()?,
                author_id: self
                    .author_id
                    .ok_or_else(|| ProcurementError::ActorNotFound(self.employee_username.clone()))?,
                organization_id: self.organization_id,
                creator_username: self.employee_username.clone(),
                version: self.version,
                created_at: self.created_at,
                deleted_at: self.deleted_at,
            })
        };
        parse().map_err(|e| corrupt(e, "bids", id))
    }
}

#[derive(Debug, FromRow)]
struct BidVersionRow {
    id: Uuid,
    bid_id: Uuid,
    name: String,
    description: Option<String>,
    status: String,
    tender_id: Uuid,
    author_type: String,
    employee_username: String,
    organization_id: Uuid,
    version: i64,
    created_at: DateTime<Utc>,
}

impl BidVersionRow {
    fn into_snapshot(self) -> Result<Snapshot<BidContent>> {
        let id = self.id;
        let parse = || -> Result<Snapshot<BidContent>> {
            Ok(Snapshot {
                snapshot_id: self.id,
                entity_id: self.bid_id,
                version: self.version,
                organization_id: self.organization_id,
                creator_username: self.employee_username.clone(),
                content: BidContent {
                    name: self.name.clone(),
                    description: self.description.clone().unwrap_or_default(),
                    status: self.status.parse()?,
                    tender_id: self.tender_id,
                    author_type: self.author_type.parse()?,
                },
                created_at: self.created_at,
            })
        };
        parse().map_err(|e| corrupt(e, "bid_versions", id))
    }
}

#[derive(Debug, FromRow)]
struct FeedbackRow {
    id: Uuid,
    bid_id: Uuid,
    feedback: String,
    employee_username: String,
    organization_id: Uuid,
    created_at: DateTime<Utc>,
}

impl From<FeedbackRow> for Feedback {
    fn from(row: FeedbackRow) -> Self {
        Feedback {
            id: row.id,
            bid_id: row.bid_id,
            text: row.feedback,
            creator_username: row.employee_username,
            organization_id: row.organization_id,
            created_at: row.created_at,
        }
    }
}

// ============================================================================
// Column lists
// ============================================================================

const EMPLOYEE_COLUMNS: &str = r#"
    id, username, first_name, last_name,
    COALESCE(created_at::timestamptz, now()) AS created_at, deleted_at
"#;

const TENDER_COLUMNS: &str = r#"
    id, name, description,
    service_type::text AS service_type, status::text AS status,
    employee_username, organization_id, version::bigint AS version,
    COALESCE(created_at, now()) AS created_at, deleted_at
"#;

const TENDER_VERSION_COLUMNS: &str = r#"
    id, tender_id, name, description,
    service_type::text AS service_type, status::text AS status,
    employee_username, organization_id, version::bigint AS version,
    COALESCE(created_at, now()) AS created_at
"#;

// author_id comes from the creator's employee row
const BID_SELECT: &str = r#"
    SELECT b.id, b.name, b.description, b.status::text AS status, b.tender_id,
           b.author_type::text AS author_type, e.id AS author_id,
           b.employee_username, b.organization_id, b.version::bigint AS version,
           COALESCE(b.created_at, now()) AS created_at, b.deleted_at
    FROM bids b
    LEFT JOIN employee e ON e.username = b.employee_username
"#;

const BID_VERSION_COLUMNS: &str = r#"
    id, bid_id, name, description, status::text AS status, tender_id,
    author_type::text AS author_type, employee_username, organization_id,
    version::bigint AS version, COALESCE(created_at, now()) AS created_at
"#;

// ============================================================================
// Identity
// ============================================================================

#[async_trait]
impl IdentityRepository for PgStore {
    async fn find_employee_by_username(&self, username: &str) -> Result<Option<Employee>> {
        let sql = format!("SELECT {} FROM employee WHERE username = $1 AND deleted_at IS NULL", EMPLOYEE_COLUMNS);
        let row: Option<EmployeeRow> = sqlx::query_as(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Employee::from))
    }

    async fn find_employee_by_id(&self, id: Uuid) -> Result<Option<Employee>> {
        let sql = format!("SELECT {} FROM employee WHERE id = $1 AND deleted_at IS NULL", EMPLOYEE_COLUMNS);
        let row: Option<EmployeeRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Employee::from))
    }

    async fn find_memberships(&self, employee_id: Uuid) -> Result<Vec<Membership>> {
        let rows: Vec<MembershipRow> = sqlx::query_as(
            r#"
            SELECT id, organization_id, user_id AS employee_id
            FROM organization_responsible
            WHERE user_id = $1
            "#,
        )
        .bind(employee_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Membership::from).collect())
    }

    async fn add_membership(&self, membership: Membership) -> Result<()> {
        // A unique index on user_id closes the race between the check and the insert
        let result = sqlx::query(
            r#"
            INSERT INTO organization_responsible (id, organization_id, user_id)
            SELECT $1, $2, $3
            WHERE NOT EXISTS (SELECT 1 FROM organization_responsible WHERE user_id = $3)
            "#,
        )
        .bind(membership.id)
        .bind(membership.organization_id)
        .bind(membership.employee_id)
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) if done.rows_affected() == 0 => {
                Err(ProcurementError::MembershipExists(membership.employee_id))
            }
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(ProcurementError::MembershipExists(membership.employee_id))
            }
            Err(e) => Err(e.into()),
        }
    }
}

// ============================================================================
// Tenders
// ============================================================================

#[async_trait]
impl VersionedRepository<Tender> for PgStore {
    async fn find_live(&self, id: Uuid) -> Result<Option<Tender>> {
        let sql = format!(
            "SELECT {} FROM tenders WHERE id = $1 AND deleted_at IS NULL",
            TENDER_COLUMNS
        );
        let row: Option<TenderRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(TenderRow::into_tender).transpose()
    }

    async fn find_snapshot(&self, id: Uuid, version: i64) -> Result<Option<Snapshot<TenderContent>>> {
        let sql = format!(
            "SELECT {} FROM tender_versions
             WHERE tender_id = $1 AND version = $2 AND deleted_at IS NULL",
            TENDER_VERSION_COLUMNS
        );
        let row: Option<TenderVersionRow> = sqlx::query_as(&sql)
            .bind(id)
            .bind(version)
            .fetch_optional(&self.pool)
            .await?;
        row.map(TenderVersionRow::into_snapshot).transpose()
    }

    async fn list_snapshots(&self, id: Uuid) -> Result<Vec<Snapshot<TenderContent>>> {
        let sql = format!(
            "SELECT {} FROM tender_versions
             WHERE tender_id = $1 AND deleted_at IS NULL
             ORDER BY version ASC",
            TENDER_VERSION_COLUMNS
        );
        let rows: Vec<TenderVersionRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(TenderVersionRow::into_snapshot).collect()
    }
}

#[async_trait]
impl TenderRepository for PgStore {
    async fn list_published(&self, service_types: &[ServiceType], page: Page) -> Result<Vec<Tender>> {
        let filter: Option<Vec<String>> = if service_types.is_empty() {
            None
        } else {
            Some(service_types.iter().map(|s| s.as_str().to_string()).collect())
        };
        let (limit, offset) = limit_offset(page);

        let sql = format!(
            "SELECT {} FROM tenders
             WHERE status = 'Published' AND deleted_at IS NULL
               AND ($1::text[] IS NULL OR service_type::text = ANY($1))
             ORDER BY name ASC, id ASC
             LIMIT $2 OFFSET $3",
            TENDER_COLUMNS
        );
        let rows: Vec<TenderRow> = sqlx::query_as(&sql)
            .bind(filter)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(TenderRow::into_tender).collect()
    }

    async fn list_by_creator(&self, username: &str, page: Page) -> Result<Vec<Tender>> {
        let (limit, offset) = limit_offset(page);
        let sql = format!(
            "SELECT {} FROM tenders
             WHERE employee_username = $1 AND deleted_at IS NULL
             ORDER BY name ASC, id ASC
             LIMIT $2 OFFSET $3",
            TENDER_COLUMNS
        );
        let rows: Vec<TenderRow> = sqlx::query_as(&sql)
            .bind(username)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(TenderRow::into_tender).collect()
    }
}

// ============================================================================
// Bids
// ============================================================================

#[async_trait]
impl VersionedRepository<Bid> for PgStore {
    async fn find_live(&self, id: Uuid) -> Result<Option<Bid>> {
        let sql = format!("{} WHERE b.id = $1 AND b.deleted_at IS NULL", BID_SELECT);
        let row: Option<BidRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(BidRow::into_bid).transpose()
    }

    async fn find_snapshot(&self, id: Uuid, version: i64) -> Result<Option<Snapshot<BidContent>>> {
        let sql = format!(
            "SELECT {} FROM bid_versions
             WHERE bid_id = $1 AND version = $2 AND deleted_at IS NULL",
            BID_VERSION_COLUMNS
        );
        let row: Option<BidVersionRow> = sqlx::query_as(&sql)
            .bind(id)
            .bind(version)
            .fetch_optional(&self.pool)
            .await?;
        row.map(BidVersionRow::into_snapshot).transpose()
    }

    async fn list_snapshots(&self, id: Uuid) -> Result<Vec<Snapshot<BidContent>>> {
        let sql = format!(
            "SELECT {} FROM bid_versions
             WHERE bid_id = $1 AND deleted_at IS NULL
             ORDER BY version ASC",
            BID_VERSION_COLUMNS
        );
        let rows: Vec<BidVersionRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(BidVersionRow::into_snapshot).collect()
    }
}

#[async_trait]
impl BidRepository for PgStore {
    async fn find_published(&self, id: Uuid) -> Result<Option<Bid>> {
        let sql = format!(
            "{} WHERE b.id = $1 AND b.status = 'Published' AND b.deleted_at IS NULL",
            BID_SELECT
        );
        let row: Option<BidRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(BidRow::into_bid).transpose()
    }

    async fn list_published_for_tender(&self, tender_id: Uuid, page: Page) -> Result<Vec<Bid>> {
        let (limit, offset) = limit_offset(page);
        let sql = format!(
            "{} WHERE b.tender_id = $1 AND b.status = 'Published' AND b.deleted_at IS NULL
             ORDER BY b.name ASC, b.id ASC
             LIMIT $2 OFFSET $3",
            BID_SELECT
        );
        let rows: Vec<BidRow> = sqlx::query_as(&sql)
            .bind(tender_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(BidRow::into_bid).collect()
    }

    async fn list_by_creator(&self, username: &str, page: Page) -> Result<Vec<Bid>> {
        let (limit, offset) = limit_offset(page);
        let sql = format!(
            "{} WHERE b.employee_username = $1 AND b.deleted_at IS NULL
             ORDER BY b.name ASC, b.id ASC
             LIMIT $2 OFFSET $3",
            BID_SELECT
        );
        let rows: Vec<BidRow> = sqlx::query_as(&sql)
            .bind(username)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(BidRow::into_bid).collect()
    }

    async fn list_feedback(&self, tender_id: Uuid, author_username: &str, page: Page) -> Result<Vec<Feedback>> {
        let (limit, offset) = limit_offset(page);
        let rows: Vec<FeedbackRow> = sqlx::query_as(
            r#"
            SELECT f.id, f.bid_id, f.feedback, f.employee_username, f.organization_id,
                   COALESCE(f.created_at, now()) AS created_at
            FROM bid_feedbacks f
            JOIN bids b ON b.id = f.bid_id
            WHERE b.tender_id = $1
              AND b.employee_username = $2
              AND b.deleted_at IS NULL
              AND f.deleted_at IS NULL
            ORDER BY f.created_at ASC, f.id ASC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(tender_id)
        .bind(author_username)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Feedback::from).collect())
    }
}

// ============================================================================
// Mutation batches
// ============================================================================

async fn current_version(
    tx: &mut Transaction<'_, Postgres>,
    table: &str,
    id: Uuid,
) -> Result<Option<i64>> {
    let sql = format!(
        "SELECT version::bigint FROM {} WHERE id = $1 AND deleted_at IS NULL",
        table
    );
    let version: Option<i64> = sqlx::query_scalar(&sql)
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(version)
}

/// A duplicate (entity id, version) history row means another writer got there first
fn snapshot_conflict(err: sqlx::Error, kind: EntityKind, id: Uuid, version: i64) -> ProcurementError {
    match err {
        sqlx::Error::Database(db) if db.is_unique_violation() => ProcurementError::Conflict {
            kind,
            id,
            expected: version - 1,
            actual: None,
        },
        other => other.into(),
    }
}

/// Turn a zero-row CAS update into `Conflict`
async fn ensure_swapped(
    tx: &mut Transaction<'_, Postgres>,
    rows_affected: u64,
    kind: EntityKind,
    table: &str,
    id: Uuid,
    expected: i64,
) -> Result<()> {
    if rows_affected == 1 {
        return Ok(());
    }
    let actual = current_version(tx, table, id).await?;
    Err(ProcurementError::Conflict {
        kind,
        id,
        expected,
        actual,
    })
}

async fn write_tender(tx: &mut Transaction<'_, Postgres>, write: &VersionedWrite<Tender>) -> Result<()> {
    let tender = &write.entity;

    match write.expected_version {
        None => {
            let inserted = sqlx::query(
                r#"
                INSERT INTO tenders (id, name, description, service_type, status,
                                     employee_username, organization_id, version,
                                     created_at, updated_at)
                VALUES ($1, $2, $3, $4::tender_service_type, $5::tender_status,
                        $6, $7, $8, $9, $9)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(tender.id)
            .bind(&tender.name)
            .bind(&tender.description)
            .bind(tender.service_type.as_str())
            .bind(tender.status.as_str())
            .bind(&tender.creator_username)
            .bind(tender.organization_id)
            .bind(tender.version)
            .bind(tender.created_at)
            .execute(&mut **tx)
            .await?;
            ensure_swapped(tx, inserted.rows_affected(), EntityKind::Tender, "tenders", tender.id, 0).await?;
        }
        Some(expected) => {
            let updated = sqlx::query(
                r#"
                UPDATE tenders
                SET name = $2, description = $3,
                    service_type = $4::tender_service_type, status = $5::tender_status,
                    version = $6, updated_at = now()
                WHERE id = $1 AND version = $7 AND deleted_at IS NULL
                "#,
            )
            .bind(tender.id)
            .bind(&tender.name)
            .bind(&tender.description)
            .bind(tender.service_type.as_str())
            .bind(tender.status.as_str())
            .bind(tender.version)
            .bind(expected)
            .execute(&mut **tx)
            .await?;
            ensure_swapped(tx, updated.rows_affected(), EntityKind::Tender, "tenders", tender.id, expected).await?;
        }
    }

    let snapshot = &write.snapshot;
    sqlx::query(
        r#"
        INSERT INTO tender_versions (id, tender_id, name, description, service_type, status,
                                     employee_username, organization_id, version,
                                     created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5::tender_service_type, $6::tender_status,
                $7, $8, $9, $10, $10)
        "#,
    )
    .bind(snapshot.snapshot_id)
    .bind(snapshot.entity_id)
    .bind(&snapshot.content.name)
    .bind(&snapshot.content.description)
    .bind(snapshot.content.service_type.as_str())
    .bind(snapshot.content.status.as_str())
    .bind(&snapshot.creator_username)
    .bind(snapshot.organization_id)
    .bind(snapshot.version)
    .bind(snapshot.created_at)
    .execute(&mut **tx)
    .await
    .map_err(|e| snapshot_conflict(e, EntityKind::Tender, snapshot.entity_id, snapshot.version))?;

    Ok(())
}

async fn write_bid(tx: &mut Transaction<'_, Postgres>, write: &VersionedWrite<Bid>) -> Result<()> {
    let bid = &write.entity;

    match write.expected_version {
        None => {
            let inserted = sqlx::query(
                r#"
                INSERT INTO bids (id, name, description, status, tender_id, author_type,
                                  employee_username, organization_id, version,
                                  created_at, updated_at)
                VALUES ($1, $2, $3, $4::bid_status, $5, $6::bid_author_type,
                        $7, $8, $9, $10, $10)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(bid.id)
            .bind(&bid.name)
            .bind(&bid.description)
            .bind(bid.status.as_str())
            .bind(bid.tender_id)
            .bind(bid.author_type.as_str())
            .bind(&bid.creator_username)
            .bind(bid.organization_id)
            .bind(bid.version)
            .bind(bid.created_at)
            .execute(&mut **tx)
            .await?;
            ensure_swapped(tx, inserted.rows_affected(), EntityKind::Bid, "bids", bid.id, 0).await?;
        }
        Some(expected) => {
            let updated = sqlx::query(
                r#"
                UPDATE bids
                SET name = $2, description = $3, status = $4::bid_status,
                    tender_id = $5, author_type = $6::bid_author_type,
                    version = $7, updated_at = now()
                WHERE id = $1 AND version = $8 AND deleted_at IS NULL
                "#,
            )
            .bind(bid.id)
            .bind(&bid.name)
            .bind(&bid.description)
            .bind(bid.status.as_str())
            .bind(bid.tender_id)
            .bind(bid.author_type.as_str())
            .bind(bid.version)
            .bind(expected)
            .execute(&mut **tx)
            .await?;
            ensure_swapped(tx, updated.rows_affected(), EntityKind::Bid, "bids", bid.id, expected).await?;
        }
    }

    let snapshot = &write.snapshot;
    sqlx::query(
        r#"
        INSERT INTO bid_versions (id, bid_id, name, description, status, tender_id, author_type,
                                  employee_username, organization_id, version,
                                  created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5::bid_status, $6, $7::bid_author_type,
                $8, $9, $10, $11, $11)
        "#,
    )
    .bind(snapshot.snapshot_id)
    .bind(snapshot.entity_id)
    .bind(&snapshot.content.name)
    .bind(&snapshot.content.description)
    .bind(snapshot.content.status.as_str())
    .bind(snapshot.content.tender_id)
    .bind(snapshot.content.author_type.as_str())
    .bind(&snapshot.creator_username)
    .bind(snapshot.organization_id)
    .bind(snapshot.version)
    .bind(snapshot.created_at)
    .execute(&mut **tx)
    .await
    .map_err(|e| snapshot_conflict(e, EntityKind::Bid, snapshot.entity_id, snapshot.version))?;

    Ok(())
}

async fn write_feedback(tx: &mut Transaction<'_, Postgres>, feedback: &Feedback) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO bid_feedbacks (id, feedback, bid_id, employee_username, organization_id,
                                   created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $6)
        "#,
    )
    .bind(feedback.id)
    .bind(&feedback.text)
    .bind(feedback.bid_id)
    .bind(&feedback.creator_username)
    .bind(feedback.organization_id)
    .bind(feedback.created_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[async_trait]
impl MutationStore for PgStore {
    async fn commit(&self, batch: MutationBatch) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        // Dropping `tx` on an early return rolls the transaction back
        for write in batch.writes() {
            match write {
                StagedWrite::Tender(w) => write_tender(&mut tx, w).await?,
                StagedWrite::Bid(w) => write_bid(&mut tx, w).await?,
                StagedWrite::Feedback(f) => write_feedback(&mut tx, f).await?,
            }
        }

        tx.commit().await?;
        tracing::debug!(writes = batch.len(), "Postgres transaction committed");
        Ok(())
    }
}
