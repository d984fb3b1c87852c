//! Entity repository for `TB_NOTICIA_RASPADA_NOME`.

use rusqlite::{params, Row};
use serde::{Deserialize, Serialize};

use super::{Database, DatabaseError};

/// A named entity extracted from a record's text.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractedEntity {
    pub id: i64,
    pub record_id: i64,
    pub name: String,
    pub cpf: Option<String>,
    pub name_cpf: Option<String>,
    pub alias: Option<String>,
    pub sex: Option<String>,
    /// `F` for a natural person, `J` for a legal entity.
    pub person_type: Option<String>,
    pub age: Option<i64>,
    pub birthday: Option<String>,
    pub occupation: Option<String>,
    pub involvement: Option<String>,
    pub suspicion_type: Option<String>,
    /// Textual flag, `'1'` or `'0'`.
    pub public_figure: Option<String>,
    /// Textual flag, `'1'` or `'0'`.
    pub politically_exposed: Option<String>,
    pub operation: Option<String>,
}

impl ExtractedEntity {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("ID")?,
            record_id: row.get("NOTICIA_ID")?,
            name: row.get("NOME")?,
            cpf: row.get("CPF")?,
            name_cpf: row.get("NOME_CPF")?,
            alias: row.get("APELIDO")?,
            sex: row.get("SEXO")?,
            person_type: row.get("PESSOA")?,
            age: row.get("IDADE")?,
            birthday: row.get("ANIVERSARIO")?,
            occupation: row.get("ATIVIDADE")?,
            involvement: row.get("ENVOLVIMENTO")?,
            suspicion_type: row.get("TIPO_SUSPEITA")?,
            public_figure: row.get("FLG_PESSOA_PUBLICA")?,
            politically_exposed: row.get("INDICADOR_PPE")?,
            operation: row.get("OPERACAO")?,
        })
    }

    pub fn is_public_figure(&self) -> bool {
        flag_to_bool(self.public_figure.as_deref())
    }

    pub fn is_politically_exposed(&self) -> bool {
        flag_to_bool(self.politically_exposed.as_deref())
    }
}

/// Fields accepted when creating an entity.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewEntity {
    pub name: String,
    pub cpf: Option<String>,
    pub name_cpf: Option<String>,
    pub alias: Option<String>,
    pub sex: Option<String>,
    pub person_type: Option<String>,
    pub age: Option<i64>,
    pub birthday: Option<String>,
    pub occupation: Option<String>,
    pub involvement: Option<String>,
    pub suspicion_type: Option<String>,
    #[serde(default)]
    pub public_figure: bool,
    #[serde(default)]
    pub politically_exposed: bool,
    pub operation: Option<String>,
}

/// Partial update: only `Some` fields are written.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntityPatch {
    pub name: Option<String>,
    pub cpf: Option<String>,
    pub name_cpf: Option<String>,
    pub alias: Option<String>,
    pub sex: Option<String>,
    pub person_type: Option<String>,
    pub age: Option<i64>,
    pub birthday: Option<String>,
    pub occupation: Option<String>,
    pub involvement: Option<String>,
    pub suspicion_type: Option<String>,
    pub public_figure: Option<bool>,
    pub politically_exposed: Option<bool>,
    pub operation: Option<String>,
}

impl EntityPatch {
    fn assignments(&self) -> Vec<(&'static str, Box<dyn rusqlite::types::ToSql>)> {
        let mut out: Vec<(&'static str, Box<dyn rusqlite::types::ToSql>)> = Vec::new();
        let text_fields = [
            ("NOME", &self.name),
            ("CPF", &self.cpf),
            ("NOME_CPF", &self.name_cpf),
            ("APELIDO", &self.alias),
            ("SEXO", &self.sex),
            ("PESSOA", &self.person_type),
            ("ANIVERSARIO", &self.birthday),
            ("ATIVIDADE", &self.occupation),
            ("ENVOLVIMENTO", &self.involvement),
            ("TIPO_SUSPEITA", &self.suspicion_type),
            ("OPERACAO", &self.operation),
        ];
        for (column, value) in text_fields {
            if let Some(v) = value {
                out.push((column, Box::new(v.clone())));
            }
        }
        if let Some(age) = self.age {
            out.push(("IDADE", Box::new(age)));
        }
        if let Some(flag) = self.public_figure {
            out.push(("FLG_PESSOA_PUBLICA", Box::new(flag_from_bool(flag))));
        }
        if let Some(flag) = self.politically_exposed {
            out.push(("INDICADOR_PPE", Box::new(flag_from_bool(flag))));
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.assignments().is_empty()
    }
}

/// Outcome of [`update_many`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchUpdateReport {
    pub updated: usize,
    pub updated_ids: Vec<i64>,
    pub not_found: Vec<i64>,
    /// Entities that exist but belong to another record.
    pub wrong_record: Vec<i64>,
    /// Patches with no fields set.
    pub skipped: Vec<i64>,
}

pub fn flag_from_bool(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}

/// Interprets free text as a flag. Blank input gives `None`; unrecognised
/// non-blank text counts as set.
pub fn flag_from_text(value: &str) -> Option<&'static str> {
    let v = value.trim().to_lowercase();
    match v.as_str() {
        "" => None,
        "yes" | "sim" | "true" | "1" | "s" => Some("1"),
        "no" | "nao" | "não" | "false" | "0" | "n" => Some("0"),
        _ => Some("1"),
    }
}

pub fn flag_to_bool(flag: Option<&str>) -> bool {
    flag.map(str::trim) == Some("1")
}

pub fn find_by_record(db: &Database, record_id: i64) -> Result<Vec<ExtractedEntity>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt =
            conn.prepare("SELECT * FROM TB_NOTICIA_RASPADA_NOME WHERE NOTICIA_ID = ?1 ORDER BY ID")?;
        let rows = stmt
            .query_map(params![record_id], ExtractedEntity::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

pub fn find_by_id(db: &Database, id: i64) -> Result<Option<ExtractedEntity>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM TB_NOTICIA_RASPADA_NOME WHERE ID = ?1")?;
        let mut rows = stmt.query_map(params![id], ExtractedEntity::from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Inserts an entity for an existing record. Returns the new ID.
pub fn insert(db: &Database, record_id: i64, entity: &NewEntity) -> Result<i64, DatabaseError> {
    db.with_conn(|conn| {
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM TB_NOTICIA_RASPADA WHERE ID = ?1)",
            params![record_id],
            |r| r.get(0),
        )?;
        if !exists {
            return Err(DatabaseError::NotFound {
                what: "record",
                id: record_id,
            });
        }

        conn.execute(
            "INSERT INTO TB_NOTICIA_RASPADA_NOME (NOTICIA_ID, NOME, CPF, NOME_CPF, APELIDO, SEXO,
             PESSOA, IDADE, ANIVERSARIO, ATIVIDADE, ENVOLVIMENTO, TIPO_SUSPEITA,
             FLG_PESSOA_PUBLICA, INDICADOR_PPE, OPERACAO)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            params![
                record_id,
                entity.name,
                entity.cpf,
                entity.name_cpf,
                entity.alias,
                entity.sex,
                entity.person_type,
                entity.age,
                entity.birthday,
                entity.occupation,
                entity.involvement,
                entity.suspicion_type,
                flag_from_bool(entity.public_figure),
                flag_from_bool(entity.politically_exposed),
                entity.operation,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    })
}

/// Applies a partial update. Returns false when the entity does not exist.
pub fn apply_patch(db: &Database, id: i64, patch: &EntityPatch) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| apply_patch_with(conn, id, patch))
}

fn apply_patch_with(
    conn: &rusqlite::Connection,
    id: i64,
    patch: &EntityPatch,
) -> Result<bool, DatabaseError> {
    let assignments = patch.assignments();
    if assignments.is_empty() {
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM TB_NOTICIA_RASPADA_NOME WHERE ID = ?1)",
            params![id],
            |r| r.get(0),
        )?;
        return Ok(exists);
    }

    let set_clause: Vec<String> = assignments
        .iter()
        .enumerate()
        .map(|(i, (column, _))| format!("{} = ?{}", column, i + 1))
        .collect();
    let sql = format!(
        "UPDATE TB_NOTICIA_RASPADA_NOME SET {} WHERE ID = ?{}",
        set_clause.join(", "),
        assignments.len() + 1
    );

    let mut values: Vec<&dyn rusqlite::types::ToSql> =
        assignments.iter().map(|(_, v)| v.as_ref()).collect();
    values.push(&id);

    let changed = conn.execute(&sql, values.as_slice())?;
    Ok(changed > 0)
}

/// Applies several patches to entities of one record in a single
/// transaction.
pub fn update_many(
    db: &Database,
    record_id: i64,
    patches: &[(i64, EntityPatch)],
) -> Result<BatchUpdateReport, DatabaseError> {
    db.with_conn_mut(|conn| {
        let tx = conn.transaction()?;
        let mut report = BatchUpdateReport::default();

        for (id, patch) in patches {
            let owner: Option<i64> = tx
                .query_row(
                    "SELECT NOTICIA_ID FROM TB_NOTICIA_RASPADA_NOME WHERE ID = ?1",
                    params![id],
                    |r| r.get(0),
                )
                .map(Some)
                .or_else(|e| match e {
                    rusqlite::Error::QueryReturnedNoRows => Ok(None),
                    other => Err(other),
                })?;

            match owner {
                None => report.not_found.push(*id),
                Some(owner) if owner != record_id => report.wrong_record.push(*id),
                Some(_) if patch.is_empty() => report.skipped.push(*id),
                Some(_) => {
                    if apply_patch_with(&tx, *id, patch)? {
                        report.updated_ids.push(*id);
                    }
                }
            }
        }

        tx.commit()?;
        report.updated = report.updated_ids.len();
        Ok(report)
    })
}

pub fn delete(db: &Database, id: i64) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute("DELETE FROM TB_NOTICIA_RASPADA_NOME WHERE ID = ?1", params![id])?;
        if changed == 0 {
            return Err(DatabaseError::NotFound { what: "entity", id });
        }
        Ok(())
    })
}
