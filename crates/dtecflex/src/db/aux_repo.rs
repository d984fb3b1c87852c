//! Write side of the `Auxiliar` publish index.

use rusqlite::{params, Connection};
use serde::Serialize;

use super::{Database, DatabaseError};

/// One row of the publish index, a denormalized join of a record and one
/// of its entities.
///
/// Reserved columns (`DTEC`, court and related-company fields, mandate
/// dates) are not modelled and always written as NULL.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct AuxiliaryRow {
    pub name: String,
    pub cpf: Option<String>,
    pub name_cpf: Option<String>,
    pub alias: Option<String>,
    pub sex: Option<String>,
    pub person_type: Option<String>,
    pub age: Option<i64>,
    pub occupation: Option<String>,
    pub involvement: Option<String>,
    pub suspicion_type: String,
    pub operation: Option<String>,
    pub title: Option<String>,
    pub news_date: Option<String>,
    pub news_source: Option<String>,
    pub region: Option<String>,
    pub state: Option<String>,
    pub registration: Option<String>,
    pub public_figure: Option<String>,
    pub recorded_at: String,
    pub researched_at: String,
    pub information_type: String,
    pub birthday: Option<String>,
    pub media_citations: Option<String>,
    pub politically_exposed: Option<String>,
    pub news_link: Option<String>,
    pub updated_at: String,
}

const INSERT_SQL: &str = "INSERT INTO Auxiliar (
    NOME, CPF, NOME_CPF, APELIDO, DTEC, SEXO, PESSOA, IDADE, ATIVIDADE, ENVOLVIMENTO,
    TIPO_SUSPEITA, OPERACAO, TITULO, DATA_NOTICIA, FONTE_NOTICIA, REGIAO, ESTADO,
    REGISTRO_NOTICIA, FLG_PESSOA_PUBLICA, DATA_GRAVACAO, EXISTEM_PROCESSOS, ORIGEM_UF,
    TRIBUNAIS, LINKS_TRIBUNAIS, DATA_PESQUISA, TIPO_INFORMACAO, ANIVERSARIO,
    CITACOES_NA_MIDIA, INDICADOR_PPE, PEP_RELACIONADO, LINK_NOTICIA, DATA_ATUALIZACAO,
    ORGAO, EMPRESA_RELACIONADA, CNPJ_EMPRESA_RELACIONADA, RELACIONAMENTO,
    DATA_INICIO_MANDATO, DATA_FIM_MANDATO, DATA_CARENCIA
) VALUES (
    ?1, ?2, ?3, ?4, NULL, ?5, ?6, ?7, ?8, ?9,
    ?10, ?11, ?12, ?13, ?14, ?15, ?16,
    ?17, ?18, ?19, NULL, NULL,
    NULL, NULL, ?20, ?21, ?22,
    ?23, ?24, NULL, ?25, ?26,
    NULL, NULL, NULL, NULL,
    NULL, NULL, NULL
)";

/// Inserts one row on the given connection (or open transaction).
pub fn insert_with(conn: &Connection, row: &AuxiliaryRow) -> Result<(), DatabaseError> {
    let mut stmt = conn.prepare_cached(INSERT_SQL)?;
    stmt.execute(params![
        row.name,
        row.cpf,
        row.name_cpf,
        row.alias,
        row.sex,
        row.person_type,
        row.age,
        row.occupation,
        row.involvement,
        row.suspicion_type,
        row.operation,
        row.title,
        row.news_date,
        row.news_source,
        row.region,
        row.state,
        row.registration,
        row.public_figure,
        row.recorded_at,
        row.researched_at,
        row.information_type,
        row.birthday,
        row.media_citations,
        row.politically_exposed,
        row.news_link,
        row.updated_at,
    ])?;
    Ok(())
}

/// Number of index rows written for a registration identifier.
pub fn count_for_registration(db: &Database, registration: &str) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        Ok(conn.query_row(
            "SELECT COUNT(*) FROM Auxiliar WHERE REGISTRO_NOTICIA = ?1",
            params![registration],
            |r| r.get(0),
        )?)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str) -> AuxiliaryRow {
        AuxiliaryRow {
            name: name.to_string(),
            suspicion_type: "Crimes".to_string(),
            information_type: "DTECCRIM".to_string(),
            registration: Some("C20250904001".to_string()),
            recorded_at: "2025-09-04 10:00:00".to_string(),
            researched_at: "2025-09-04 10:00:00".to_string(),
            updated_at: "2025-09-04 10:00:00".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_insert_and_count() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            insert_with(conn, &row("Fulano"))?;
            insert_with(conn, &row("Beltrano"))
        })
        .unwrap();
        assert_eq!(count_for_registration(&db, "C20250904001").unwrap(), 2);
        assert_eq!(count_for_registration(&db, "C20250904002").unwrap(), 0);
    }

    #[test]
    fn test_reserved_columns_are_null() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| insert_with(conn, &row("Fulano"))).unwrap();
        let nulls: i64 = db
            .with_conn(|conn| {
                Ok(conn.query_row(
                    "SELECT COUNT(*) FROM Auxiliar WHERE DTEC IS NULL AND TRIBUNAIS IS NULL
                     AND EMPRESA_RELACIONADA IS NULL AND DATA_CARENCIA IS NULL",
                    [],
                    |r| r.get(0),
                )?)
            })
            .unwrap();
        assert_eq!(nulls, 1);
    }

    #[test]
    fn test_constraint_violation_is_detected() {
        let db = Database::open_in_memory().unwrap();
        let mut bad = row("Fulano");
        bad.cpf = Some("x".repeat(30));
        let err = db.with_conn(|conn| insert_with(conn, &bad)).unwrap_err();
        assert!(err.is_constraint_violation());
    }
}
