//! PostgreSQL identity store.
//!
//! A newtype over a sqlx `PgPool`. All SQL is runtime-checked
//! (`sqlx::query`, not `sqlx::query!`) so building needs no live database.
//!
//! Reads the enrollment tables owned by the registration system:
//!
//! ```text
//! "Biometric"        (id, template bytea, finger text, ...)
//! "PeopleBiometrics" (person_id, biometric_id)
//! ```
//!
//! Writes only to `access_audit` (see `sql/access_audit.sql`).

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared_types::{AuditRecord, FingerPosition, IdentityId, MatchCandidate, Template, TemplateId};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{debug, warn};

use crate::domain::{similarity, StoreError};
use crate::ports::outbound::IdentityStore;

/// DDL for the audit table, applied by [`PostgresIdentityStore::ensure_audit_table`].
pub const ACCESS_AUDIT_DDL: &str = include_str!("../../sql/access_audit.sql");

/// Rows fetched per round trip during a lookup.
pub const LOOKUP_PAGE_SIZE: i64 = 512;

/// Connection pool settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostgresConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    /// Hard bound on rows scored per lookup. Exceeding it fails the lookup.
    pub max_candidates: u32,
}

pub struct PostgresIdentityStore {
    pool: PgPool,
    max_candidates: u32,
}

impl PostgresIdentityStore {
    /// Builds the pool once; every transport task shares it.
    pub async fn connect(config: &PostgresConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(&config.database_url)
            .await
            .map_err(map_sqlx)?;
        debug!(
            max_connections = config.max_connections,
            "identity store pool connected"
        );
        Ok(Self::new(pool, config.max_candidates))
    }

    pub fn new(pool: PgPool, max_candidates: u32) -> Self {
        Self {
            pool,
            max_candidates,
        }
    }

    /// Creates `access_audit` if it does not exist.
    pub async fn ensure_audit_table(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(ACCESS_AUDIT_DDL)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(())
    }

    /// One keyset page of enrolled templates with the probe's length,
    /// strictly after `after` in `(template_id, identity_id)` order.
    async fn fetch_page(
        &self,
        template_len: usize,
        after: (i64, i64),
    ) -> Result<Vec<EnrolledRow>, StoreError> {
        let rows = sqlx::query_as::<_, (i64, i64, String, Vec<u8>)>(
            r#"
            SELECT pb.person_id::BIGINT, b.id::BIGINT, b.finger, b.template
            FROM "Biometric" b
            INNER JOIN "PeopleBiometrics" pb ON b.id = pb.biometric_id
            WHERE octet_length(b.template) = $1
              AND (b.id::BIGINT, pb.person_id::BIGINT) > ($2, $3)
            ORDER BY b.id, pb.person_id
            LIMIT $4
            "#,
        )
        .bind(template_len as i32)
        .bind(after.0)
        .bind(after.1)
        .bind(LOOKUP_PAGE_SIZE)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(rows
            .into_iter()
            .map(|(identity_id, template_id, finger, template)| EnrolledRow {
                identity_id,
                template_id,
                finger,
                template,
            })
            .collect())
    }
}

/// An enrolled template as read from the enrollment tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct EnrolledRow {
    pub identity_id: i64,
    pub template_id: i64,
    pub finger: String,
    pub template: Vec<u8>,
}

/// Scores every row `fetch` yields, page by page, until a short page.
///
/// Fails with [`StoreError::CandidateLimit`] instead of returning a
/// truncated candidate list.
pub(crate) async fn scan_enrolled<F, Fut>(
    probe: &Template,
    max_candidates: u32,
    page_size: i64,
    mut fetch: F,
) -> Result<Vec<MatchCandidate>, StoreError>
where
    F: FnMut((i64, i64)) -> Fut,
    Fut: Future<Output = Result<Vec<EnrolledRow>, StoreError>>,
{
    let mut candidates = Vec::new();
    let mut scanned: u64 = 0;
    let mut after = (i64::MIN, i64::MIN);

    loop {
        let page = fetch(after).await?;
        let full = page.len() as i64 >= page_size;
        let Some(last) = page.last().map(|row| (row.template_id, row.identity_id)) else {
            break;
        };

        scanned += page.len() as u64;
        if scanned > u64::from(max_candidates) {
            warn!(
                max_candidates,
                template_len = probe.len(),
                "enrolled templates exceed max_candidates, failing lookup"
            );
            return Err(StoreError::CandidateLimit {
                limit: max_candidates,
            });
        }

        for row in page {
            if let Some(candidate) = score_row(probe, row)? {
                candidates.push(candidate);
            }
        }
        if !full {
            break;
        }
        after = last;
    }

    debug!(scanned, candidates = candidates.len(), "enrolled templates scored");
    Ok(candidates)
}

fn score_row(probe: &Template, row: EnrolledRow) -> Result<Option<MatchCandidate>, StoreError> {
    let Ok(finger) = row.finger.parse::<FingerPosition>() else {
        // Registration data outside the closed finger set never matches.
        warn!(
            template_id = row.template_id,
            finger = %row.finger,
            "skipping enrolled template with unknown finger"
        );
        return Ok(None);
    };
    MatchCandidate::new(
        IdentityId(row.identity_id),
        TemplateId(row.template_id),
        similarity(probe.as_bytes(), &row.template),
        finger,
    )
    .map(Some)
    .map_err(|e| StoreError::InvalidRow(format!("template {}: {e}", row.template_id)))
}

#[async_trait]
impl IdentityStore for PostgresIdentityStore {
    async fn find_candidates(&self, template: &Template) -> Result<Vec<MatchCandidate>, StoreError> {
        // Only templates of the probe's length can score above zero.
        scan_enrolled(template, self.max_candidates, LOOKUP_PAGE_SIZE, |after| {
            self.fetch_page(template.len(), after)
        })
        .await
    }

    async fn append_audit(&self, record: &AuditRecord) -> Result<(), StoreError> {
        let decision = &record.decision;
        sqlx::query(
            r#"
            INSERT INTO access_audit
                (audit_id, unit_code, transport, claimed_finger, template_fingerprint,
                 granted, reason, identity_id, score_used, decided_at, recorded_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (audit_id) DO NOTHING
            "#,
        )
        .bind(record.audit_id.0)
        .bind(&record.unit_code)
        .bind(record.transport.as_str())
        .bind(record.claimed_finger.map(|f| f.as_str()))
        .bind(record.template_fingerprint.as_str())
        .bind(decision.granted())
        .bind(decision.reason().as_str())
        .bind(decision.identity_id().map(|id| id.0))
        .bind(decision.score_used())
        .bind(decision.decided_at())
        .bind(record.timestamp)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}

fn map_sqlx(e: sqlx::Error) -> StoreError {
    match e {
        sqlx::Error::PoolTimedOut => StoreError::Timeout(Duration::ZERO),
        sqlx::Error::Io(_) | sqlx::Error::PoolClosed | sqlx::Error::Tls(_) => {
            StoreError::Unavailable(e.to_string())
        }
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) | sqlx::Error::ColumnNotFound(_) => {
            StoreError::InvalidRow(e.to_string())
        }
        other => StoreError::Query(other.to_string()),
    }
}
