use uuid::Uuid;

/// One queued insertion unit: publish a single transferred record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertTask {
    pub unit_id: String,
    pub record_id: i64,
}

impl InsertTask {
    pub fn new(record_id: i64) -> Self {
        Self {
            unit_id: Uuid::new_v4().to_string(),
            record_id,
        }
    }

    /// Key under which the unit is tracked in the job store.
    pub fn job_key(&self) -> String {
        format!("record:{}", self.record_id)
    }
}
