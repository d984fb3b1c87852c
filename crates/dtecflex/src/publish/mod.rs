//! Publishing a transferred record's entities to the auxiliary index.

pub mod aux_row;
pub mod inserter;

pub use aux_row::build_row;
pub use inserter::{BatchMode, BatchReport, EntityInserter, InsertOutcome, InsertReport, RowResult};
