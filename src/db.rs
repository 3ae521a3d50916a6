use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::debug;

use crate::error::StoreError;
use crate::record::{JobRecord, COLUMNS};

pub const TABLE: &str = "job_postings";

pub fn connect(path: &Path) -> Result<Connection> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    Ok(conn)
}

pub fn table_exists(conn: &Connection) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [TABLE],
        |r| r.get::<_, i64>(0),
    )
    .map(|n| n > 0)
}

pub fn create_table(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS job_postings (
            company          TEXT,
            company_url      TEXT,
            location         TEXT,
            job_link         TEXT PRIMARY KEY NOT NULL,
            job_title        TEXT,
            job_description  TEXT,
            employment_type  TEXT,
            job_flexibility  TEXT,
            mapped_title     TEXT,
            match_score      REAL,
            mean_salary      REAL,
            median_salary    REAL,
            p10_salary       REAL,
            p90_salary       REAL,
            sample_count     INTEGER,
            hard_skills      TEXT,
            soft_skills      TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_job_postings_flexibility ON job_postings(job_flexibility);
        ",
    )
}

// ── Upsert ──

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertReport {
    pub created_table: bool,
    pub deleted: usize,
    pub inserted: usize,
}

/// Replace every stored row whose `job_link` appears in `records`, then insert
/// the batch. Duplicate links inside the batch keep their last occurrence.
///
/// Delete and insert commit separately: if the insert fails after the delete
/// went through, the affected keys are missing until the batch is re-ingested
/// and the error is `StoreError::PartialUpsert`.
pub fn upsert_records(conn: &Connection, records: &[JobRecord]) -> Result<UpsertReport, StoreError> {
    let mut report = UpsertReport::default();
    if records.is_empty() {
        return Ok(report);
    }

    let last: HashMap<&str, usize> = records
        .iter()
        .enumerate()
        .map(|(i, r)| (r.job_link.as_str(), i))
        .collect();
    let batch: Vec<&JobRecord> = records
        .iter()
        .enumerate()
        .filter(|(i, r)| last.get(r.job_link.as_str()) == Some(i))
        .map(|(_, r)| r)
        .collect();
    if batch.len() < records.len() {
        debug!(dropped = records.len() - batch.len(), "duplicate links in batch");
    }

    if !table_exists(conn)? {
        create_table(conn)?;
        report.created_table = true;
    } else {
        report.deleted = delete_keys(conn, &batch)?;
    }

    match insert_rows(conn, &batch) {
        Ok(n) => report.inserted = n,
        Err(source) if report.deleted > 0 => {
            return Err(StoreError::PartialUpsert {
                keys: report.deleted,
                source,
            })
        }
        Err(e) => return Err(e.into()),
    }
    Ok(report)
}

fn delete_keys(conn: &Connection, batch: &[&JobRecord]) -> rusqlite::Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut count = 0;
    {
        let mut stmt = tx.prepare("DELETE FROM job_postings WHERE job_link = ?1")?;
        for r in batch {
            count += stmt.execute([&r.job_link])?;
        }
    }
    tx.commit()?;
    Ok(count)
}

fn insert_rows(conn: &Connection, batch: &[&JobRecord]) -> rusqlite::Result<usize> {
    let placeholders = (1..=COLUMNS.len())
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "INSERT INTO job_postings ({}) VALUES ({})",
        COLUMNS.join(", "),
        placeholders
    );

    let tx = conn.unchecked_transaction()?;
    let mut count = 0;
    {
        let mut stmt = tx.prepare(&sql)?;
        for r in batch {
            count += stmt.execute(rusqlite::params![
                r.company,
                r.company_url,
                r.location,
                r.job_link,
                r.job_title,
                r.job_description,
                r.employment_type,
                r.job_flexibility,
                r.mapped_title,
                r.match_score,
                r.mean_salary,
                r.median_salary,
                r.p10_salary,
                r.p90_salary,
                r.sample_count,
                r.hard_skills,
                r.soft_skills,
            ])?;
        }
    }
    tx.commit()?;
    Ok(count)
}

// ── Overview ──

pub struct OverviewRow {
    pub job_link: String,
    pub job_title: String,
    pub company: String,
    pub location: String,
    pub employment_type: String,
    pub job_flexibility: String,
    pub mapped_title: String,
    pub mean_salary: Option<f64>,
}

pub fn fetch_overview(
    conn: &Connection,
    flexibility: Option<&str>,
    employment_type: Option<&str>,
    limit: usize,
) -> Result<Vec<OverviewRow>> {
    if !table_exists(conn)? {
        return Ok(Vec::new());
    }

    let mut conditions = Vec::new();
    let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

    if let Some(f) = flexibility {
        conditions.push(format!("job_flexibility = ?{}", params.len() + 1));
        params.push(Box::new(f.to_string()));
    }
    if let Some(e) = employment_type {
        conditions.push(format!("employment_type = ?{}", params.len() + 1));
        params.push(Box::new(e.to_string()));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    };

    let sql = format!(
        "SELECT job_link, COALESCE(job_title,''), COALESCE(company,''), COALESCE(location,''),
                COALESCE(employment_type,''), COALESCE(job_flexibility,''),
                COALESCE(mapped_title,''), mean_salary
         FROM job_postings{}
         ORDER BY company, job_title, job_link
         LIMIT {}",
        where_clause, limit
    );

    let mut stmt = conn.prepare(&sql)?;
    let param_refs: Vec<&dyn rusqlite::types::ToSql> = params.iter().map(|p| p.as_ref()).collect();
    let rows = stmt
        .query_map(param_refs.as_slice(), |row| {
            Ok(OverviewRow {
                job_link: row.get(0)?,
                job_title: row.get(1)?,
                company: row.get(2)?,
                location: row.get(3)?,
                employment_type: row.get(4)?,
                job_flexibility: row.get(5)?,
                mapped_title: row.get(6)?,
                mean_salary: row.get(7)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── Stats ──

pub struct Stats {
    pub total: usize,
    /// Rows with a non-empty value, per column in contract order.
    pub completeness: Vec<(&'static str, usize)>,
    pub flexibility: Vec<(String, usize)>,
    pub employment_type: Vec<(String, usize)>,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    if !table_exists(conn)? {
        return Ok(Stats {
            total: 0,
            completeness: COLUMNS.iter().map(|c| (*c, 0)).collect(),
            flexibility: Vec::new(),
            employment_type: Vec::new(),
        });
    }

    let total: usize = conn.query_row("SELECT COUNT(*) FROM job_postings", [], |r| r.get(0))?;
    let completeness = COLUMNS
        .iter()
        .map(|col| {
            let sql = format!(
                "SELECT COUNT(*) FROM job_postings WHERE {col} IS NOT NULL AND {col} != ''"
            );
            let n: usize = conn.query_row(&sql, [], |r| r.get(0))?;
            Ok((*col, n))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Stats {
        total,
        completeness,
        flexibility: distribution(conn, "job_flexibility")?,
        employment_type: distribution(conn, "employment_type")?,
    })
}

fn distribution(conn: &Connection, column: &str) -> Result<Vec<(String, usize)>> {
    let sql = format!(
        "SELECT COALESCE({column}, '(none)'), COUNT(*) FROM job_postings
         GROUP BY 1 ORDER BY 2 DESC, 1"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn record(link: &str, title: &str) -> JobRecord {
        JobRecord {
            company: Some("Nile Freight".into()),
            location: Some("Cairo, Egypt".into()),
            job_link: link.into(),
            job_title: Some(title.into()),
            job_flexibility: Some("Hybrid".into()),
            employment_type: Some("Full-Time".into()),
            hard_skills: Some("SQL".into()),
            soft_skills: Some(String::new()),
            ..Default::default()
        }
    }

    fn count(conn: &Connection) -> usize {
        conn.query_row("SELECT COUNT(*) FROM job_postings", [], |r| r.get(0))
            .unwrap()
    }

    fn title_of(conn: &Connection, link: &str) -> Option<String> {
        conn.query_row(
            "SELECT job_title FROM job_postings WHERE job_link = ?1",
            [link],
            |r| r.get(0),
        )
        .unwrap()
    }

    #[test]
    fn first_batch_creates_table() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(!table_exists(&conn).unwrap());
        let report = upsert_records(&conn, &[record("a", "Analyst")]).unwrap();
        assert_eq!(
            report,
            UpsertReport {
                created_table: true,
                deleted: 0,
                inserted: 1
            }
        );
        assert!(table_exists(&conn).unwrap());
    }

    #[test]
    fn column_order_matches_contract() {
        let conn = Connection::open_in_memory().unwrap();
        create_table(&conn).unwrap();
        let stmt = conn.prepare("SELECT * FROM job_postings").unwrap();
        assert_eq!(stmt.column_names(), COLUMNS.to_vec());
    }

    #[test]
    fn same_batch_twice_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        let batch = vec![record("a", "Analyst"), record("b", "Engineer")];
        upsert_records(&conn, &batch).unwrap();

        let mut second = batch.clone();
        second[0].job_title = Some("Senior Analyst".into());
        let report = upsert_records(&conn, &second).unwrap();
        assert_eq!(report.deleted, 2);
        assert_eq!(report.inserted, 2);
        assert_eq!(count(&conn), 2);
        assert_eq!(title_of(&conn, "a").as_deref(), Some("Senior Analyst"));
    }

    #[test]
    fn rows_are_replaced_not_merged() {
        let conn = Connection::open_in_memory().unwrap();
        upsert_records(&conn, &[record("a", "Analyst"), record("keep", "Other")]).unwrap();

        let mut bare = record("a", "Analyst");
        bare.location = None;
        bare.hard_skills = None;
        upsert_records(&conn, &[bare]).unwrap();

        let location: Option<String> = conn
            .query_row("SELECT location FROM job_postings WHERE job_link = 'a'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(location, None);
        assert_eq!(count(&conn), 2);
    }

    #[test]
    fn duplicate_links_keep_last() {
        let conn = Connection::open_in_memory().unwrap();
        let report = upsert_records(
            &conn,
            &[record("a", "First"), record("b", "B"), record("a", "Last")],
        )
        .unwrap();
        assert_eq!(report.inserted, 2);
        assert_eq!(title_of(&conn, "a").as_deref(), Some("Last"));
    }

    #[test]
    fn failed_insert_after_delete_is_partial() {
        let conn = Connection::open_in_memory().unwrap();
        upsert_records(&conn, &[record("a", "Analyst")]).unwrap();
        conn.execute_batch(
            "CREATE TRIGGER reject_inserts BEFORE INSERT ON job_postings
             BEGIN SELECT RAISE(ABORT, 'insert rejected'); END;",
        )
        .unwrap();

        let err = upsert_records(&conn, &[record("a", "Analyst")]).unwrap_err();
        assert!(matches!(err, StoreError::PartialUpsert { keys: 1, .. }));
        assert_eq!(count(&conn), 0);

        let err = upsert_records(&conn, &[record("z", "New")]).unwrap_err();
        assert!(matches!(err, StoreError::Sqlite(_)));
    }

    #[test]
    fn stats_and_overview() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(get_stats(&conn).unwrap().total, 0);

        let mut remote = record("c", "Engineer");
        remote.job_flexibility = Some("Remote".into());
        remote.location = None;
        upsert_records(&conn, &[record("a", "Analyst"), record("b", "Analyst"), remote]).unwrap();

        let stats = get_stats(&conn).unwrap();
        assert_eq!(stats.total, 3);
        let filled = |col: &str| stats.completeness.iter().find(|(c, _)| *c == col).unwrap().1;
        assert_eq!(filled("location"), 2);
        assert_eq!(filled("job_link"), 3);
        assert_eq!(filled("soft_skills"), 0);
        assert_eq!(filled("mean_salary"), 0);
        assert_eq!(stats.flexibility[0], ("Hybrid".to_string(), 2));
        assert_eq!(stats.employment_type, vec![("Full-Time".to_string(), 3)]);

        let rows = fetch_overview(&conn, Some("Remote"), None, 50).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].job_link, "c");
        assert_eq!(rows[0].location, "");
        assert_eq!(fetch_overview(&conn, None, Some("Full-Time"), 2).unwrap().len(), 2);
    }
}
