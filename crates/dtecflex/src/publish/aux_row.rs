use crate::category::Category;
use crate::db::aux_repo::AuxiliaryRow;
use crate::db::entity_repo::ExtractedEntity;
use crate::db::record_repo::ScrapedRecord;

/// Projects a (record, entity) pair onto a publish index row.
///
/// Suspicion and information types come from the record's category, not
/// from the entity. `now` stamps the three audit dates.
pub fn build_row(
    record: &ScrapedRecord,
    entity: &ExtractedEntity,
    category: Category,
    now: &str,
) -> AuxiliaryRow {
    AuxiliaryRow {
        name: entity.name.clone(),
        cpf: entity.cpf.clone(),
        name_cpf: entity.name_cpf.clone(),
        alias: entity.alias.clone(),
        sex: entity.sex.clone(),
        person_type: entity.person_type.clone(),
        age: entity.age,
        occupation: entity.occupation.clone(),
        involvement: entity.involvement.clone(),
        suspicion_type: category.suspicion_type().to_string(),
        operation: entity.operation.clone(),
        title: record.title.clone(),
        news_date: record.publication_date.clone(),
        news_source: record.source.clone(),
        region: record.region.clone(),
        state: record.uf.clone(),
        registration: record.registration.clone(),
        public_figure: entity.public_figure.clone(),
        recorded_at: now.to_string(),
        researched_at: now.to_string(),
        information_type: category.information_type().to_string(),
        birthday: entity.birthday.clone(),
        media_citations: record.body.clone(),
        politically_exposed: entity.politically_exposed.clone(),
        news_link: Some(record.url.clone()),
        updated_at: now.to_string(),
    }
}
