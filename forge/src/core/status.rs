//! Status transition rules for steps and projects.
//!
//! Both state machines are forward-only. The single sanctioned backward move
//! is `Failed -> InProgress` on projects, which re-triggering a project with
//! leftover pending steps relies on.

use crate::core::types::{ProjectStatus, StepStatus};

/// Whether a step may move from `from` to `to`.
pub fn step_transition_allowed(from: StepStatus, to: StepStatus) -> bool {
    use StepStatus as S;
    matches!(
        (from, to),
        (S::Pending, S::InProgress)
            | (S::Pending, S::Failed)
            | (S::InProgress, S::Completed)
            | (S::InProgress, S::Failed)
    )
}

/// Whether a project may move from `from` to `to`.
pub fn project_transition_allowed(from: ProjectStatus, to: ProjectStatus) -> bool {
    use ProjectStatus as P;
    matches!(
        (from, to),
        (P::Draft, P::InProgress)
            | (P::Draft, P::Failed)
            | (P::InProgress, P::Completed)
            | (P::InProgress, P::Failed)
            | (P::Completed, P::Success)
            // Re-trigger of a failed project with steps left to run.
            | (P::Failed, P::InProgress)
    )
}

/// Derive the terminal status of a run from the final statuses of the steps
/// it set out to execute.
///
/// `Completed` requires every step to have completed and at least one file to
/// have landed on disk. A run whose steps all "succeeded" without producing
/// any output is a failed run.
pub fn derive_run_status(statuses: &[StepStatus], files_written: u64) -> ProjectStatus {
    let all_completed = !statuses.is_empty()
        && statuses.iter().all(|s| *s == StepStatus::Completed);
    if all_completed && files_written > 0 {
        ProjectStatus::Completed
    } else {
        ProjectStatus::Failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_transitions_are_forward_only() {
        use StepStatus as S;
        assert!(step_transition_allowed(S::Pending, S::InProgress));
        assert!(step_transition_allowed(S::InProgress, S::Completed));
        assert!(step_transition_allowed(S::InProgress, S::Failed));
        assert!(step_transition_allowed(S::Pending, S::Failed));

        assert!(!step_transition_allowed(S::Completed, S::InProgress));
        assert!(!step_transition_allowed(S::Failed, S::Pending));
        assert!(!step_transition_allowed(S::Completed, S::Failed));
        assert!(!step_transition_allowed(S::InProgress, S::Pending));
    }

    #[test]
    fn project_transitions_follow_lifecycle() {
        use ProjectStatus as P;
        assert!(project_transition_allowed(P::Draft, P::InProgress));
        assert!(project_transition_allowed(P::InProgress, P::Completed));
        assert!(project_transition_allowed(P::InProgress, P::Failed));
        assert!(project_transition_allowed(P::Completed, P::Success));
        assert!(project_transition_allowed(P::Failed, P::InProgress));

        assert!(!project_transition_allowed(P::Success, P::InProgress));
        assert!(!project_transition_allowed(P::Completed, P::Failed));
        assert!(!project_transition_allowed(P::Draft, P::Completed));
        assert!(!project_transition_allowed(P::Draft, P::Success));
    }

    #[test]
    fn run_completes_only_when_all_steps_complete_and_files_exist() {
        use StepStatus as S;
        assert_eq!(
            derive_run_status(&[S::Completed, S::Completed], 3),
            ProjectStatus::Completed
        );
        assert_eq!(
            derive_run_status(&[S::Completed, S::Failed], 3),
            ProjectStatus::Failed
        );
        // All steps completed but nothing landed on disk.
        assert_eq!(
            derive_run_status(&[S::Completed, S::Completed], 0),
            ProjectStatus::Failed
        );
        // Steps left pending by a deadline break count against completion.
        assert_eq!(
            derive_run_status(&[S::Completed, S::Pending], 1),
            ProjectStatus::Failed
        );
        assert_eq!(derive_run_status(&[], 0), ProjectStatus::Failed);
    }
}
