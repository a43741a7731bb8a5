use anyhow::{anyhow, Result};
use serde::Serialize;
use std::fmt;

/// Orchestrator states. `Escalated` is a side transition: it is recorded in
/// the trail but the machine resumes from the state it left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    AwaitingExtraction,
    Extracted,
    Filtered,
    Dispatching,
    NoneReady,
    Escalated,
    Completed,
}

impl WorkflowState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowState::AwaitingExtraction => "awaiting_extraction",
            WorkflowState::Extracted => "extracted",
            WorkflowState::Filtered => "filtered",
            WorkflowState::Dispatching => "dispatching",
            WorkflowState::NoneReady => "none_ready",
            WorkflowState::Escalated => "escalated",
            WorkflowState::Completed => "completed",
        }
    }

    fn can_advance_to(self, next: WorkflowState) -> bool {
        use WorkflowState::*;
        matches!(
            (self, next),
            (AwaitingExtraction, Extracted)
                | (AwaitingExtraction, Completed)
                | (Extracted, Filtered)
                | (Filtered, NoneReady)
                | (Filtered, Dispatching)
                | (NoneReady, Completed)
                | (Dispatching, Completed)
        )
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct StateMachine {
    current: WorkflowState,
    trail: Vec<WorkflowState>,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self {
            current: WorkflowState::AwaitingExtraction,
            trail: vec![WorkflowState::AwaitingExtraction],
        }
    }
}

impl StateMachine {
    pub fn current(&self) -> WorkflowState {
        self.current
    }

    pub fn advance(&mut self, next: WorkflowState) -> Result<()> {
        if !self.current.can_advance_to(next) {
            return Err(anyhow!(
                "invalid workflow transition {} -> {next}",
                self.current
            ));
        }
        tracing::debug!(from = %self.current, to = %next, "workflow transition");
        self.current = next;
        self.trail.push(next);
        Ok(())
    }

    /// Record an escalation without leaving the current state.
    pub fn escalated(&mut self) -> Result<()> {
        if self.current == WorkflowState::Completed {
            return Err(anyhow!("cannot escalate a completed workflow"));
        }
        tracing::debug!(from = %self.current, "workflow escalated");
        self.trail.push(WorkflowState::Escalated);
        Ok(())
    }

    pub fn into_trail(self) -> Vec<WorkflowState> {
        self.trail
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escalation_is_a_side_transition() {
        let mut machine = StateMachine::default();
        machine.escalated().expect("escalate while awaiting extraction");
        assert_eq!(machine.current(), WorkflowState::AwaitingExtraction);
        machine
            .advance(WorkflowState::Completed)
            .expect("complete after escalation");
        assert_eq!(
            machine.into_trail(),
            vec![
                WorkflowState::AwaitingExtraction,
                WorkflowState::Escalated,
                WorkflowState::Completed,
            ]
        );
    }

    #[test]
    fn dispatch_requires_filtering_first() {
        let mut machine = StateMachine::default();
        assert!(machine.advance(WorkflowState::Dispatching).is_err());
        machine.advance(WorkflowState::Extracted).expect("extract");
        assert!(machine.advance(WorkflowState::Dispatching).is_err());
    }

    #[test]
    fn completed_is_terminal() {
        let mut machine = StateMachine::default();
        machine.advance(WorkflowState::Completed).expect("complete");
        assert!(machine.advance(WorkflowState::Extracted).is_err());
        assert!(machine.escalated().is_err());
    }
}
