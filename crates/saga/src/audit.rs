use std::time::Instant;

/// Whether a step belongs to the mandatory or best-effort phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Mandatory,
    BestEffort,
}

/// Status of a step in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum StepStatus {
    /// Step is running or executed successfully.
    Executed,
    /// Mandatory step failed during execution.
    Failed,
    /// Step was compensated successfully.
    Compensated,
    /// Step compensation failed.
    CompensationFailed,
    /// Best-effort step failed; the run was not affected.
    BestEffortFailed,
}

/// Record of a step's execution in the saga.
#[derive(Debug)]
pub struct StepRecord {
    /// Name of the step.
    pub name: String,
    /// Phase the step ran in.
    pub kind: StepKind,
    /// Current status.
    pub status: StepStatus,
    /// When the step started executing.
    pub started_at: Instant,
    /// When the step completed (execution or compensation).
    pub completed_at: Option<Instant>,
    /// Description of the registered compensation, if the step pushed one.
    pub compensation_description: Option<String>,
}

/// Audit log tracking all step executions in a saga run.
#[derive(Debug, Default)]
pub struct SagaAuditLog {
    records: Vec<StepRecord>,
}

impl SagaAuditLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_start(&mut self, name: &str, kind: StepKind) -> usize {
        self.records.push(StepRecord {
            name: name.to_string(),
            kind,
            status: StepStatus::Executed,
            started_at: Instant::now(),
            completed_at: None,
            compensation_description: None,
        });
        self.records.len() - 1
    }

    pub(crate) fn record_success(&mut self, index: usize, compensation_description: Option<String>) {
        if let Some(record) = self.records.get_mut(index) {
            record.status = StepStatus::Executed;
            record.completed_at = Some(Instant::now());
            record.compensation_description = compensation_description;
        }
    }

    pub(crate) fn record_failure(&mut self, index: usize) {
        self.set_status(index, StepStatus::Failed);
    }

    pub(crate) fn record_best_effort_failure(&mut self, index: usize) {
        self.set_status(index, StepStatus::BestEffortFailed);
    }

    pub(crate) fn record_compensated(&mut self, index: usize) {
        self.set_status(index, StepStatus::Compensated);
    }

    pub(crate) fn record_compensation_failed(&mut self, index: usize) {
        self.set_status(index, StepStatus::CompensationFailed);
    }

    fn set_status(&mut self, index: usize, status: StepStatus) {
        if let Some(record) = self.records.get_mut(index) {
            record.status = status;
            record.completed_at = Some(Instant::now());
        }
    }

    /// Get all records in the audit log.
    #[must_use]
    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    /// Names of steps with the given status, in execution order.
    #[must_use]
    pub fn steps_with_status(&self, status: StepStatus) -> Vec<&str> {
        self.records
            .iter()
            .filter(|r| r.status == status)
            .map(|r| r.name.as_str())
            .collect()
    }

    /// One line per step, for logs.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();
        for record in &self.records {
            let status = match record.status {
                StepStatus::Executed => "ok",
                StepStatus::Failed => "failed",
                StepStatus::Compensated => "compensated",
                StepStatus::CompensationFailed => "compensation_failed",
                StepStatus::BestEffortFailed => "skipped_on_error",
            };
            lines.push(format!("{} {status}", record.name));
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_audit_log_is_empty() {
        let log = SagaAuditLog::new();
        assert!(log.records().is_empty());
    }

    #[test]
    fn record_start_adds_step_with_executed_status() {
        let mut log = SagaAuditLog::new();
        let idx = log.record_start("create_tenant", StepKind::Mandatory);

        assert_eq!(idx, 0);
        assert_eq!(log.records()[0].name, "create_tenant");
        assert_eq!(log.records()[0].status, StepStatus::Executed);
        assert!(log.records()[0].completed_at.is_none());
    }

    #[test]
    fn record_success_keeps_compensation_description() {
        let mut log = SagaAuditLog::new();
        let idx = log.record_start("create_tenant", StepKind::Mandatory);
        log.record_success(idx, Some("delete tenant".to_string()));

        assert!(log.records()[0].completed_at.is_some());
        assert_eq!(
            log.records()[0].compensation_description.as_deref(),
            Some("delete tenant")
        );
    }

    #[test]
    fn statuses_are_tracked_by_index_not_name() {
        let mut log = SagaAuditLog::new();
        let a = log.record_start("same", StepKind::Mandatory);
        let b = log.record_start("same", StepKind::Mandatory);
        log.record_compensated(a);
        log.record_failure(b);

        assert_eq!(log.records()[0].status, StepStatus::Compensated);
        assert_eq!(log.records()[1].status, StepStatus::Failed);
    }

    #[test]
    fn summary_lists_every_step() {
        let mut log = SagaAuditLog::new();
        let a = log.record_start("create_tenant", StepKind::Mandatory);
        log.record_compensation_failed(a);
        let b = log.record_start("employee", StepKind::BestEffort);
        log.record_best_effort_failure(b);

        let summary = log.summary();
        assert!(summary.contains("create_tenant compensation_failed"));
        assert!(summary.contains("employee skipped_on_error"));
    }
}
