//! Parsing and storage of entity-extraction responses.
//!
//! The extraction service itself is opaque: it receives the article text and
//! answers with free text that should contain a JSON array of entities,
//! optionally inside a ```json fence.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::db::entity_repo::{self, flag_from_text, NewEntity};
use crate::db::{record_repo, Database};
use crate::error::ExtractionError;

/// Turns article text into the service's raw answer.
pub trait EntityExtractor: Send + Sync {
    fn extract(&self, article: &str) -> Result<String, ExtractionError>;
}

static RE_JSON_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```json\s*(\[\s*\{.*\}\s*\])\s*```").unwrap());

/// Entities found in a raw response.
///
/// Never fails: anything that is not a JSON array is logged and yields an
/// empty list. Entries without a `NOME` are dropped.
pub fn parse_extraction_response(raw: &str) -> Vec<NewEntity> {
    let raw = raw.trim();
    let payload = RE_JSON_FENCE
        .captures(raw)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(raw);

    if payload.is_empty() {
        log::warn!("Empty extraction response");
        return Vec::new();
    }

    let value: Value = match serde_json::from_str(payload) {
        Ok(v) => v,
        Err(e) => {
            log::warn!("Extraction response is not valid JSON: {}", e);
            return Vec::new();
        }
    };

    let Value::Array(items) = value else {
        log::warn!("Extraction response is not a JSON list");
        return Vec::new();
    };

    items
        .iter()
        .filter_map(Value::as_object)
        .filter_map(entity_from_object)
        .collect()
}

fn text(obj: &Map<String, Value>, field: &str) -> Option<String> {
    match obj.get(field)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn age(obj: &Map<String, Value>) -> Option<i64> {
    match obj.get("IDADE")? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn flag(obj: &Map<String, Value>, field: &str) -> bool {
    match obj.get(field) {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_i64() == Some(1),
        Some(Value::String(s)) => flag_from_text(s) == Some("1"),
        _ => false,
    }
}

fn entity_from_object(obj: &Map<String, Value>) -> Option<NewEntity> {
    let name = text(obj, "NOME")?;
    Some(NewEntity {
        name,
        cpf: text(obj, "CPF"),
        name_cpf: text(obj, "NOME_CPF"),
        alias: text(obj, "APELIDO"),
        sex: text(obj, "SEXO"),
        person_type: text(obj, "PESSOA"),
        age: age(obj),
        birthday: text(obj, "ANIVERSARIO"),
        occupation: text(obj, "ATIVIDADE"),
        involvement: text(obj, "ENVOLVIMENTO"),
        suspicion_type: text(obj, "TIPO_SUSPEITA"),
        public_figure: flag(obj, "FLG_PESSOA_PUBLICA"),
        politically_exposed: flag(obj, "INDICADOR_PPE"),
        operation: text(obj, "OPERACAO"),
    })
}

/// Runs the extractor over a record's text and stores what it finds.
/// Returns the new entity IDs.
pub fn extract_and_store(
    db: &Database,
    extractor: &dyn EntityExtractor,
    record_id: i64,
) -> Result<Vec<i64>, ExtractionError> {
    let record =
        record_repo::find_by_id(db, record_id)?.ok_or(ExtractionError::RecordNotFound(record_id))?;

    let body = record.body.as_deref().unwrap_or_default().trim();
    if body.is_empty() {
        log::info!("Record {} has no text to extract from", record_id);
        return Ok(Vec::new());
    }

    let raw = extractor.extract(&format!("<artigo>\n{}\n</artigo>", body))?;
    let entities = parse_extraction_response(&raw);

    let mut ids = Vec::with_capacity(entities.len());
    for entity in &entities {
        ids.push(entity_repo::insert(db, record_id, entity)?);
    }
    log::info!("Stored {} extracted entities for record {}", ids.len(), record_id);
    Ok(ids)
}
