//! Record repository for `TB_NOTICIA_RASPADA`.

use std::collections::HashSet;

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use sha2::{Digest, Sha256};

use super::{now_timestamp, Database, DatabaseError};
use crate::lifecycle::{RecordStatus, STATUS_APPROVED};

/// A scraped news record.
#[derive(Debug, Clone, Serialize)]
pub struct ScrapedRecord {
    pub id: i64,
    pub link_id: String,
    pub url: String,
    pub source: Option<String>,
    /// Category full name, see [`crate::category::Category::full_name`].
    pub category: Option<String>,
    pub publication_date: Option<String>,
    /// `REG_NOTICIA`.
    pub registration: Option<String>,
    pub query: Option<String>,
    pub title: Option<String>,
    pub region: Option<String>,
    pub uf: Option<String>,
    pub status: RecordStatus,
    pub scraped_at: Option<String>,
    pub approved_at: Option<String>,
    pub transferred_at: Option<String>,
    pub body: Option<String>,
    pub original_link: Option<String>,
}

impl ScrapedRecord {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        let status: Option<String> = row.get("STATUS")?;
        Ok(Self {
            id: row.get("ID")?,
            link_id: row.get("LINK_ID")?,
            url: row.get("URL")?,
            source: row.get("FONTE")?,
            category: row.get("CATEGORIA")?,
            publication_date: row.get("DATA_PUBLICACAO")?,
            registration: row.get("REG_NOTICIA")?,
            query: row.get("QUERY")?,
            title: row.get("TITULO")?,
            region: row.get("REGIAO")?,
            uf: row.get("UF")?,
            status: RecordStatus::parse(status.as_deref().unwrap_or_default()),
            scraped_at: row.get("DT_RASPAGEM")?,
            approved_at: row.get("DT_APROVACAO")?,
            transferred_at: row.get("DT_TRANSFERENCIA")?,
            body: row.get("TEXTO_NOTICIA")?,
            original_link: row.get("LINK_ORIGINAL")?,
        })
    }
}

/// Fields accepted when ingesting a record.
#[derive(Debug, Clone, Default)]
pub struct NewRecord {
    pub url: String,
    pub source: Option<String>,
    pub category: Option<String>,
    pub publication_date: Option<String>,
    pub registration: Option<String>,
    pub query: Option<String>,
    pub title: Option<String>,
    pub region: Option<String>,
    pub uf: Option<String>,
    pub status: Option<String>,
    pub body: Option<String>,
    pub original_link: Option<String>,
}

/// Outcome of [`approve_many`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApprovalReport {
    pub updated: usize,
    pub updated_ids: Vec<i64>,
    pub not_found: Vec<i64>,
}

/// Stable identifier derived from the article URL: the sha-256 hex digest.
pub fn link_id_for(url: &str) -> String {
    let digest = Sha256::digest(url.trim().as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Inserts a record, stamping `DT_RASPAGEM`. Returns the new ID.
pub fn insert(db: &Database, record: &NewRecord) -> Result<i64, DatabaseError> {
    let link_id = link_id_for(&record.url);
    db.with_conn(|conn| {
        let result = conn.execute(
            "INSERT INTO TB_NOTICIA_RASPADA (LINK_ID, URL, FONTE, CATEGORIA, DATA_PUBLICACAO,
             REG_NOTICIA, QUERY, TITULO, REGIAO, UF, STATUS, DT_RASPAGEM, TEXTO_NOTICIA, LINK_ORIGINAL)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                link_id,
                record.url,
                record.source,
                record.category,
                record.publication_date,
                record.registration,
                record.query.as_deref().unwrap_or(""),
                record.title,
                record.region,
                record.uf,
                record.status,
                now_timestamp(),
                record.body,
                record.original_link,
            ],
        );
        match result {
            Ok(_) => Ok(conn.last_insert_rowid()),
            Err(e) => {
                let err = DatabaseError::Sqlite(e);
                if err.is_constraint_violation() {
                    Err(DatabaseError::Duplicate {
                        what: "record",
                        value: record.url.clone(),
                    })
                } else {
                    Err(err)
                }
            }
        }
    })
}

pub fn find_by_id(db: &Database, id: i64) -> Result<Option<ScrapedRecord>, DatabaseError> {
    db.with_conn(|conn| {
        Ok(conn
            .query_row(
                "SELECT * FROM TB_NOTICIA_RASPADA WHERE ID = ?1",
                params![id],
                ScrapedRecord::from_row,
            )
            .optional()?)
    })
}

pub fn find_by_registration(
    db: &Database,
    registration: &str,
) -> Result<Option<ScrapedRecord>, DatabaseError> {
    db.with_conn(|conn| {
        Ok(conn
            .query_row(
                "SELECT * FROM TB_NOTICIA_RASPADA WHERE REG_NOTICIA = ?1",
                params![registration],
                ScrapedRecord::from_row,
            )
            .optional()?)
    })
}

/// Approved records ordered by ID, optionally restricted by a `LIKE`
/// pattern over `REG_NOTICIA`.
pub fn find_approved(
    db: &Database,
    registration_like: Option<&str>,
) -> Result<Vec<ScrapedRecord>, DatabaseError> {
    db.with_conn(|conn| {
        let rows = match registration_like {
            Some(pattern) => {
                let mut stmt = conn.prepare(
                    "SELECT * FROM TB_NOTICIA_RASPADA
                     WHERE STATUS = ?1 AND REG_NOTICIA LIKE ?2
                     ORDER BY ID",
                )?;
                let rows = stmt
                    .query_map(params![STATUS_APPROVED, pattern], ScrapedRecord::from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
            None => {
                let mut stmt = conn.prepare(
                    "SELECT * FROM TB_NOTICIA_RASPADA WHERE STATUS = ?1 ORDER BY ID",
                )?;
                let rows = stmt
                    .query_map(params![STATUS_APPROVED], ScrapedRecord::from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
        };
        Ok(rows)
    })
}

/// Advances approved → transferred and stamps `DT_TRANSFERENCIA`.
/// Returns false when the record was not in the approved state.
pub fn mark_transferred(db: &Database, id: i64) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| advance(conn, id, RecordStatus::Transferred))
}

/// Advances transferred → published and restamps `DT_TRANSFERENCIA`.
/// Returns false when the record was not in the transferred state.
pub fn mark_published(db: &Database, id: i64) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| advance(conn, id, RecordStatus::Published))
}

fn advance(conn: &Connection, id: i64, next: RecordStatus) -> Result<bool, DatabaseError> {
    let current: Option<Option<String>> = conn
        .query_row(
            "SELECT STATUS FROM TB_NOTICIA_RASPADA WHERE ID = ?1",
            params![id],
            |row| row.get(0),
        )
        .optional()?;
    let Some(current) = current else {
        return Ok(false);
    };
    let current = RecordStatus::parse(current.as_deref().unwrap_or_default());
    if !current.can_advance_to(&next) {
        log::debug!("Record {} is {}, not advancing to {}", id, current, next);
        return Ok(false);
    }

    // The status guard keeps a concurrent writer from being overwritten.
    let changed = conn.execute(
        "UPDATE TB_NOTICIA_RASPADA SET STATUS = ?1, DT_TRANSFERENCIA = ?2
         WHERE ID = ?3 AND STATUS = ?4",
        params![next.as_str(), now_timestamp(), id, current.as_str()],
    )?;
    Ok(changed > 0)
}

/// Moves records into the approved state and stamps `DT_APROVACAO`.
/// Repeated ids count once, in first-seen order.
pub fn approve_many(db: &Database, ids: &[i64]) -> Result<ApprovalReport, DatabaseError> {
    let mut seen = HashSet::new();
    let ids: Vec<i64> = ids.iter().copied().filter(|id| seen.insert(*id)).collect();

    db.with_conn_mut(|conn| {
        let tx = conn.transaction()?;
        let now = now_timestamp();
        let mut report = ApprovalReport::default();

        for &id in &ids {
            let changed = tx.execute(
                "UPDATE TB_NOTICIA_RASPADA SET STATUS = ?1, DT_APROVACAO = ?2 WHERE ID = ?3",
                params![STATUS_APPROVED, now, id],
            )?;
            if changed > 0 {
                report.updated_ids.push(id);
            } else {
                report.not_found.push(id);
            }
        }

        tx.commit()?;
        report.updated = report.updated_ids.len();
        Ok(report)
    })
}
