//! Schema setup for the record store.
//!
//! The files under `sql/` are applied in order. `PRAGMA user_version`
//! counts the steps already applied, and each step commits together with
//! its bump.

use rusqlite::Connection;

use super::error::DatabaseError;

const STEPS: &[&str] = &[
    include_str!("sql/001_create_noticia_raspada.sql"),
    include_str!("sql/002_create_noticia_raspada_nome.sql"),
    include_str!("sql/003_create_auxiliar.sql"),
];

fn applied_steps(conn: &Connection) -> Result<u32, DatabaseError> {
    Ok(conn.query_row("PRAGMA user_version", [], |row| row.get(0))?)
}

pub fn apply(conn: &Connection) -> Result<(), DatabaseError> {
    let applied = applied_steps(conn)?;
    if applied as usize > STEPS.len() {
        return Err(DatabaseError::Schema {
            step: applied,
            reason: format!("database is ahead of this build, which knows {} steps", STEPS.len()),
        });
    }

    for (step, sql) in (1u32..).zip(STEPS).skip(applied as usize) {
        let failed = |e: rusqlite::Error| DatabaseError::Schema {
            step,
            reason: e.to_string(),
        };
        let tx = conn.unchecked_transaction().map_err(failed)?;
        tx.execute_batch(sql).map_err(failed)?;
        tx.pragma_update(None, "user_version", step).map_err(failed)?;
        tx.commit().map_err(failed)?;
        log::info!("Applied schema step {}", step);
    }
    Ok(())
}
