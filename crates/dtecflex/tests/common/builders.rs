//! Builders for test records, entities and configs.

#![allow(dead_code)]

use dtecflex::config::{Config, InsertionMode, RemoteConfig};
use dtecflex::db::entity_repo::{self, NewEntity};
use dtecflex::db::record_repo::{self, NewRecord};
use dtecflex::db::Database;
use dtecflex::lifecycle::STATUS_APPROVED;

/// Builder for scraped records. Approved Crime records by default.
pub struct RecordBuilder {
    record: NewRecord,
}

impl RecordBuilder {
    pub fn new(registration: &str) -> Self {
        Self {
            record: NewRecord {
                url: format!("https://noticias.example/{}", registration),
                source: Some("G1".to_string()),
                category: Some("Crime".to_string()),
                registration: Some(registration.to_string()),
                title: Some("Operação deflagrada".to_string()),
                region: Some("Sudeste".to_string()),
                uf: Some("SP".to_string()),
                status: Some(STATUS_APPROVED.to_string()),
                body: Some("Texto da notícia".to_string()),
                publication_date: Some("2025-09-04".to_string()),
                ..Default::default()
            },
        }
    }

    pub fn category(mut self, category: &str) -> Self {
        self.record.category = Some(category.to_string());
        self
    }

    pub fn status(mut self, status: &str) -> Self {
        self.record.status = Some(status.to_string());
        self
    }

    pub fn insert(self, db: &Database) -> i64 {
        record_repo::insert(db, &self.record).expect("Failed to insert record")
    }
}

/// Builder for extracted entities.
pub struct EntityBuilder {
    entity: NewEntity,
}

impl EntityBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            entity: NewEntity {
                name: name.to_string(),
                sex: Some("M".to_string()),
                person_type: Some("F".to_string()),
                involvement: Some("Investigado".to_string()),
                ..Default::default()
            },
        }
    }

    pub fn cpf(mut self, cpf: &str) -> Self {
        self.entity.cpf = Some(cpf.to_string());
        self
    }

    pub fn age(mut self, age: i64) -> Self {
        self.entity.age = Some(age);
        self
    }

    pub fn insert(self, db: &Database, record_id: i64) -> i64 {
        entity_repo::insert(db, record_id, &self.entity).expect("Failed to insert entity")
    }
}

/// Builder for `Config` values pointing at local directories.
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new(media_base: &str, remote_base: &str) -> Self {
        let mut config = Config::with_defaults();
        config.media_base = media_base.to_string();
        config.remote_base = remote_base.to_string();
        config.remote = RemoteConfig::Local;
        config.publish.worker_count = 2;
        Self { config }
    }

    pub fn queued(mut self) -> Self {
        self.config.publish.mode = InsertionMode::Queued;
        self
    }

    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.publish.chunk_size = size;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
