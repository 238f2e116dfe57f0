use serde::Serialize;

use super::lifecycle::{allows, TaskAction, TaskStatus};

pub fn can_edit_task(status: TaskStatus) -> bool {
    allows(status, TaskAction::Edit)
}

pub fn can_apply_to_task(status: TaskStatus) -> bool {
    allows(status, TaskAction::Apply)
}

pub fn can_cancel_task(status: TaskStatus) -> bool {
    allows(status, TaskAction::Cancel)
}

pub fn can_ask_questions(status: TaskStatus) -> bool {
    allows(status, TaskAction::AskQuestion)
}

pub fn can_confirm_completion(status: TaskStatus) -> bool {
    allows(status, TaskAction::ConfirmCompletion)
}

pub fn can_reopen_task(status: TaskStatus) -> bool {
    allows(status, TaskAction::Reopen)
}

pub fn can_review_task(status: TaskStatus) -> bool {
    allows(status, TaskAction::Review)
}

/// Status-level permissions, shipped with task responses for the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TaskPermissions {
    pub can_edit: bool,
    pub can_apply: bool,
    pub can_cancel: bool,
    pub can_ask_questions: bool,
    pub can_confirm_completion: bool,
    pub can_reopen: bool,
    pub can_review: bool,
}

impl From<TaskStatus> for TaskPermissions {
    fn from(status: TaskStatus) -> Self {
        Self {
            can_edit: can_edit_task(status),
            can_apply: can_apply_to_task(status),
            can_cancel: can_cancel_task(status),
            can_ask_questions: can_ask_questions(status),
            can_confirm_completion: can_confirm_completion(status),
            can_reopen: can_reopen_task(status),
            can_review: can_review_task(status),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_tasks() {
        let p = TaskPermissions::from(TaskStatus::Open);
        assert!(p.can_edit && p.can_apply && p.can_cancel && p.can_ask_questions);
        assert!(!p.can_confirm_completion && !p.can_reopen && !p.can_review);
    }

    #[test]
    fn in_progress_tasks() {
        assert!(!can_edit_task(TaskStatus::InProgress));
        assert!(!can_apply_to_task(TaskStatus::InProgress));
        assert!(can_cancel_task(TaskStatus::InProgress));
        assert!(can_ask_questions(TaskStatus::InProgress));
    }

    #[test]
    fn confirmation_only_while_pending() {
        assert!(can_confirm_completion(TaskStatus::PendingCustomerConfirmation));
        assert!(can_confirm_completion(TaskStatus::PendingProfessionalConfirmation));
        assert!(!can_confirm_completion(TaskStatus::InProgress));
        assert!(!can_confirm_completion(TaskStatus::Completed));
    }

    #[test]
    fn terminal_states() {
        let completed = TaskPermissions::from(TaskStatus::Completed);
        assert_eq!(
            completed,
            TaskPermissions {
                can_edit: false,
                can_apply: false,
                can_cancel: false,
                can_ask_questions: false,
                can_confirm_completion: false,
                can_reopen: false,
                can_review: true,
            }
        );
        assert!(can_reopen_task(TaskStatus::Cancelled));
        assert!(!can_cancel_task(TaskStatus::Cancelled));
        assert!(!can_review_task(TaskStatus::Disputed));
    }
}
