pub mod audit;
pub mod grid;
pub mod relation;

use async_trait::async_trait;
use thiserror::Error;

pub use types::{
    Hall, SeatingConfig, SeatingOptions, SeatingParams, SeatingRequest, SeatingResult,
    StaffRecord, StudentRecord,
};

#[derive(Debug, Error)]
pub enum SeatingError {
    #[error("invalid config: {0}")]
    Validation(String),
    #[error("capacity exceeded: {0}")]
    Capacity(String),
    #[error("directory lookup failed: {0}")]
    Directory(#[from] anyhow::Error),
    #[error("hall {hall} was left with {missing} unfilled seats while later halls hold students")]
    EarlyHallUnderfilled { hall: String, missing: u32 },
}

pub fn validate(config: &SeatingConfig) -> Result<(), SeatingError> {
    let mut errors: Vec<String> = Vec::new();

    if config.classes.is_empty() {
        errors.push("classes is empty".into());
    }
    if config.total_students == 0 {
        errors.push("total_students must be positive".into());
    }
    if config.total_teachers == 0 {
        errors.push("total_teachers must be positive".into());
    }
    if config.halls.is_empty() {
        errors.push("halls is empty".into());
    }

    fn chk_unique<I: ToString>(name: &str, ids: impl Iterator<Item = I>, errors: &mut Vec<String>) {
        use std::collections::HashSet;
        let mut seen = HashSet::new();
        for id in ids {
            let s = id.to_string();
            if !seen.insert(s.clone()) {
                errors.push(format!("duplicate {name}: {s}"));
            }
        }
    }
    chk_unique(
        "hall name",
        config.halls.iter().map(|h| h.name.trim()),
        &mut errors,
    );

    for (i, hall) in config.halls.iter().enumerate() {
        if hall.name.trim().is_empty() {
            errors.push(format!("hall #{i} has an empty name"));
        }
        if hall.capacity == 0 {
            errors.push(format!("hall {} has zero capacity", hall.name));
        }
        if hall.rows == Some(0) {
            errors.push(format!("hall {} has zero rows", hall.name));
        }
    }

    if !errors.is_empty() {
        return Err(SeatingError::Validation(errors.join("; ")));
    }

    let capacity = config.total_capacity();
    if config.total_students > capacity {
        return Err(SeatingError::Capacity(format!(
            "{} students declared but halls seat only {capacity}",
            config.total_students
        )));
    }
    if (config.total_teachers as usize) < config.halls.len() {
        return Err(SeatingError::Capacity(format!(
            "{} teachers declared for {} halls; every hall needs a supervisor",
            config.total_teachers,
            config.halls.len()
        )));
    }

    Ok(())
}

/// Source of student and staff records, typically a school database.
#[async_trait]
pub trait Directory: Send + Sync + 'static {
    async fn find_students(&self, classes: &[String]) -> anyhow::Result<Vec<StudentRecord>>;
    async fn find_staff(&self, limit: usize) -> anyhow::Result<Vec<StaffRecord>>;
}

/// Destination for a finished arrangement (file, database, ...).
#[async_trait]
pub trait ArrangementSink: Send + Sync + 'static {
    async fn store(&self, result: &SeatingResult) -> anyhow::Result<()>;
}

#[async_trait]
pub trait Solver: Send + Sync + 'static {
    async fn solve(&self, request: SeatingRequest) -> Result<SeatingResult, SeatingError>;
}
