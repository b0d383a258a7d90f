use std::time::Instant;

/// Status of a step in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum StepStatus {
    /// Step executed successfully.
    Executed,
    /// Step was already recorded as completed and did not run.
    Skipped,
    /// Step failed during execution.
    Failed,
    /// Step was compensated successfully.
    Compensated,
    /// Step compensation failed.
    CompensationFailed,
}

/// Record of a step's visit during one saga run.
#[derive(Debug)]
pub struct StepRecord {
    /// Position of the step in the saga.
    pub index: usize,
    /// Name of the step.
    pub name: String,
    /// Current status.
    pub status: StepStatus,
    /// When the saga reached the step.
    pub started_at: Instant,
    /// When the step settled (execution, skip or compensation).
    pub completed_at: Option<Instant>,
    /// Description of compensation (if applicable).
    pub compensation_description: Option<String>,
    /// Outcome of the compensation pass for this step, if it reached it.
    ///
    /// `Compensated` or `CompensationFailed`. A step whose forward action
    /// failed keeps `status == Failed` and reports its rollback here.
    pub compensation: Option<StepStatus>,
}

/// Audit log tracking every step a saga run visited.
#[derive(Debug, Default)]
pub struct SagaAuditLog {
    records: Vec<StepRecord>,
}

impl SagaAuditLog {
    /// Create a new empty audit log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a step execution starting.
    pub(crate) fn record_start(&mut self, index: usize, name: &str) {
        self.records.push(StepRecord {
            index,
            name: name.to_string(),
            status: StepStatus::Executed,
            started_at: Instant::now(),
            completed_at: None,
            compensation_description: None,
            compensation: None,
        });
    }

    /// Record a step that a previous run already completed.
    pub(crate) fn record_skipped(&mut self, index: usize, name: &str) {
        let now = Instant::now();
        self.records.push(StepRecord {
            index,
            name: name.to_string(),
            status: StepStatus::Skipped,
            started_at: now,
            completed_at: Some(now),
            compensation_description: None,
            compensation: None,
        });
    }

    /// Mark the last step as failed.
    pub(crate) fn record_failure(&mut self) {
        if let Some(record) = self.records.last_mut() {
            record.status = StepStatus::Failed;
            record.completed_at = Some(Instant::now());
        }
    }

    /// Mark the last step as completed successfully.
    pub(crate) fn record_success(&mut self, compensation_description: String) {
        if let Some(record) = self.records.last_mut() {
            record.status = StepStatus::Executed;
            record.completed_at = Some(Instant::now());
            record.compensation_description = Some(compensation_description);
        }
    }

    /// Record that the step at `index` was compensated.
    pub(crate) fn record_compensated(&mut self, index: usize) {
        self.settle(index, StepStatus::Compensated);
    }

    /// Record that the step at `index` failed to compensate.
    pub(crate) fn record_compensation_failed(&mut self, index: usize) {
        self.settle(index, StepStatus::CompensationFailed);
    }

    fn settle(&mut self, index: usize, status: StepStatus) {
        if let Some(record) = self.records.iter_mut().find(|r| r.index == index) {
            if record.status != StepStatus::Failed {
                record.status = status;
            }
            record.compensation = Some(status);
            record.completed_at = Some(Instant::now());
        }
    }

    /// Get all records in the audit log.
    #[must_use]
    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    /// Get the record for the step at `index`, if the run reached it.
    #[must_use]
    pub fn record(&self, index: usize) -> Option<&StepRecord> {
        self.records.iter().find(|r| r.index == index)
    }

    /// Get a summary of the saga execution for display.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();
        for record in &self.records {
            let status = glyph(record.status);
            match (record.status, record.compensation) {
                (StepStatus::Failed, Some(compensation)) => {
                    lines.push(format!("{status} {} {}", record.name, glyph(compensation)));
                }
                _ => lines.push(format!("{status} {}", record.name)),
            }
        }
        lines.join("\n")
    }
}

fn glyph(status: StepStatus) -> &'static str {
    match status {
        StepStatus::Executed => "✓",
        StepStatus::Skipped => "↷",
        StepStatus::Failed => "✗",
        StepStatus::Compensated => "↩",
        StepStatus::CompensationFailed => "⚠",
    }
}
