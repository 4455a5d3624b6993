//! Seed report DTOs

use serde::{Deserialize, Serialize};

/// What reconciliation did to a single job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobChange {
    Created,
    Updated,
    Unchanged,
}

/// Reconciliation outcome for one service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceOutcome {
    pub service: String,
    pub folders_created: Vec<String>,
    pub created: Vec<String>,
    pub updated: Vec<String>,
    pub unchanged: Vec<String>,
    /// Set when the service could not be reconciled
    pub error: Option<String>,
}

impl ServiceOutcome {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            ..Default::default()
        }
    }

    /// Records the change made to a job path
    pub fn record(&mut self, path: String, change: JobChange) {
        match change {
            JobChange::Created => self.created.push(path),
            JobChange::Updated => self.updated.push(path),
            JobChange::Unchanged => self.unchanged.push(path),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Per-service summary of a reconciliation run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeedReport {
    pub services: Vec<ServiceOutcome>,
}

impl SeedReport {
    pub fn created(&self) -> usize {
        self.services.iter().map(|s| s.created.len()).sum()
    }

    pub fn updated(&self) -> usize {
        self.services.iter().map(|s| s.updated.len()).sum()
    }

    pub fn unchanged(&self) -> usize {
        self.services.iter().map(|s| s.unchanged.len()).sum()
    }

    pub fn failed(&self) -> usize {
        self.services.iter().filter(|s| s.is_failed()).count()
    }

    pub fn outcome(&self, service: &str) -> Option<&ServiceOutcome> {
        self.services.iter().find(|s| s.service == service)
    }
}
