// vargate-core/src/domain/audit.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::query::AuditParam;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Success,
    Rejected,
    Failed,
    TimedOut,
}

impl AuditOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditOutcome::Success => "success",
            AuditOutcome::Rejected => "rejected",
            AuditOutcome::Failed => "failed",
            AuditOutcome::TimedOut => "timed_out",
        }
    }
}

/// One record per `execute` call, whatever the outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub statement: String,
    pub params: Vec<AuditParam>,
    pub row_count: usize,
    pub truncated: bool,
    pub execution_time_ms: f64,
    pub outcome: AuditOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Fields supplied by the executor; sequence and timestamp are stamped by the trail.
#[derive(Debug, Clone)]
pub struct AuditRecord {
    pub statement: String,
    pub params: Vec<AuditParam>,
    pub row_count: usize,
    pub truncated: bool,
    pub execution_time_ms: f64,
    pub outcome: AuditOutcome,
    pub reason: Option<String>,
}

/// Append-only log. Entries can be read and exported but never altered.
#[derive(Debug, Default, Clone)]
pub struct AuditTrail {
    entries: Vec<AuditEntry>,
}

impl AuditTrail {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, record: AuditRecord) -> &AuditEntry {
        let sequence = self.entries.len() as u64 + 1;
        self.entries.push(AuditEntry {
            sequence,
            timestamp: Utc::now(),
            statement: record.statement,
            params: record.params,
            row_count: record.row_count,
            truncated: record.truncated,
            execution_time_ms: record.execution_time_ms,
            outcome: record.outcome,
            reason: record.reason,
        });
        &self.entries[self.entries.len() - 1]
    }

    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count(&self, outcome: AuditOutcome) -> usize {
        self.entries.iter().filter(|e| e.outcome == outcome).count()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.entries)
    }
}

impl IntoIterator for AuditTrail {
    type Item = AuditEntry;
    type IntoIter = std::vec::IntoIter<AuditEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
