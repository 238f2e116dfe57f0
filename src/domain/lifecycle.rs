//! Task and application lifecycle.
//!
//! [`transition`] is the only authority on whether a task may change state.
//! Services call it before every task mutation and persist the returned status.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Open,
    InProgress,
    PendingProfessionalConfirmation,
    PendingCustomerConfirmation,
    Completed,
    Cancelled,
    Disputed,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 7] = [
        TaskStatus::Open,
        TaskStatus::InProgress,
        TaskStatus::PendingProfessionalConfirmation,
        TaskStatus::PendingCustomerConfirmation,
        TaskStatus::Completed,
        TaskStatus::Cancelled,
        TaskStatus::Disputed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Open => "open",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::PendingProfessionalConfirmation => "pending_professional_confirmation",
            TaskStatus::PendingCustomerConfirmation => "pending_customer_confirmation",
            TaskStatus::Completed => "completed",
            TaskStatus::Cancelled => "cancelled",
            TaskStatus::Disputed => "disputed",
        }
    }

    /// Statuses in which a professional is working on the task.
    pub fn is_active_assignment(&self) -> bool {
        matches!(
            self,
            TaskStatus::InProgress
                | TaskStatus::PendingProfessionalConfirmation
                | TaskStatus::PendingCustomerConfirmation
                | TaskStatus::Disputed
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = LifecycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| LifecycleError::UnknownStatus(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    Accepted,
    Rejected,
    Withdrawn,
    RemovedByCustomer,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Withdrawn => "withdrawn",
            ApplicationStatus::RemovedByCustomer => "removed_by_customer",
        }
    }

    pub fn can_become(&self, next: ApplicationStatus) -> bool {
        use ApplicationStatus::*;
        matches!(
            (self, next),
            (Pending, Accepted)
                | (Pending, Rejected)
                | (Pending, Withdrawn)
                | (Accepted, RemovedByCustomer)
        )
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = LifecycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ApplicationStatus::Pending),
            "accepted" => Ok(ApplicationStatus::Accepted),
            "rejected" => Ok(ApplicationStatus::Rejected),
            "withdrawn" => Ok(ApplicationStatus::Withdrawn),
            "removed_by_customer" => Ok(ApplicationStatus::RemovedByCustomer),
            other => Err(LifecycleError::UnknownStatus(other.to_string())),
        }
    }
}

/// Who is acting on a task, relative to that task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Customer,
    Professional,
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Actor::Customer => f.write_str("customer"),
            Actor::Professional => f.write_str("professional"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskAction {
    Edit,
    Apply,
    AskQuestion,
    AcceptApplication,
    Cancel,
    MarkComplete,
    ConfirmCompletion,
    Dispute,
    RemoveProfessional,
    Reopen,
    Review,
}

impl fmt::Display for TaskAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskAction::Edit => "edit",
            TaskAction::Apply => "apply",
            TaskAction::AskQuestion => "ask_question",
            TaskAction::AcceptApplication => "accept_application",
            TaskAction::Cancel => "cancel",
            TaskAction::MarkComplete => "mark_complete",
            TaskAction::ConfirmCompletion => "confirm_completion",
            TaskAction::Dispute => "dispute",
            TaskAction::RemoveProfessional => "remove_professional",
            TaskAction::Reopen => "reopen",
            TaskAction::Review => "review",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    #[error("cannot {action} a task that is {status}")]
    InvalidTransition {
        status: TaskStatus,
        action: TaskAction,
    },
    #[error("a {actor} cannot {action} a task that is {status}")]
    WrongActor {
        status: TaskStatus,
        action: TaskAction,
        actor: Actor,
    },
    #[error("unknown status '{0}'")]
    UnknownStatus(String),
}

/// Who may perform `action` in `status`, and what the task becomes.
fn rule(status: TaskStatus, action: TaskAction) -> Option<(&'static [Actor], TaskStatus)> {
    use Actor::*;
    use TaskAction::*;
    use TaskStatus::*;

    const CUSTOMER: &[Actor] = &[Customer];
    const PROFESSIONAL: &[Actor] = &[Professional];
    const EITHER: &[Actor] = &[Customer, Professional];

    match (status, action) {
        (Open, Edit) => Some((CUSTOMER, Open)),
        (Open, Apply) => Some((PROFESSIONAL, Open)),
        (Open, AskQuestion) => Some((PROFESSIONAL, Open)),
        (Open, AcceptApplication) => Some((CUSTOMER, InProgress)),
        (Open, Cancel) => Some((CUSTOMER, Cancelled)),

        (InProgress, AskQuestion) => Some((PROFESSIONAL, InProgress)),
        (InProgress, Cancel) => Some((CUSTOMER, Cancelled)),
        (InProgress, RemoveProfessional) => Some((CUSTOMER, Open)),
        (InProgress, Dispute) => Some((EITHER, Disputed)),
        // MarkComplete lands in a different state per actor, see `transition`.
        (InProgress, MarkComplete) => Some((EITHER, PendingCustomerConfirmation)),

        (PendingCustomerConfirmation, ConfirmCompletion) => Some((CUSTOMER, Completed)),
        (PendingCustomerConfirmation, Dispute) => Some((CUSTOMER, Disputed)),
        (PendingProfessionalConfirmation, ConfirmCompletion) => Some((PROFESSIONAL, Completed)),
        (PendingProfessionalConfirmation, Dispute) => Some((PROFESSIONAL, Disputed)),

        (Cancelled, Reopen) => Some((CUSTOMER, Open)),
        (Completed, Review) => Some((CUSTOMER, Completed)),

        _ => None,
    }
}

/// Applies `action` by `actor` to a task in `status`.
pub fn transition(
    status: TaskStatus,
    action: TaskAction,
    actor: Actor,
) -> Result<TaskStatus, LifecycleError> {
    let (actors, next) =
        rule(status, action).ok_or(LifecycleError::InvalidTransition { status, action })?;

    if !actors.contains(&actor) {
        return Err(LifecycleError::WrongActor {
            status,
            action,
            actor,
        });
    }

    // The side that marks the work done waits for the other side to confirm.
    if action == TaskAction::MarkComplete && actor == Actor::Customer {
        return Ok(TaskStatus::PendingProfessionalConfirmation);
    }

    Ok(next)
}

/// Whether `action` is possible in `status` for anyone.
pub fn allows(status: TaskStatus, action: TaskAction) -> bool {
    rule(status, action).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use Actor::*;
    use TaskAction::*;
    use TaskStatus::*;

    #[rstest]
    #[case(Open, AcceptApplication, Customer, InProgress)]
    #[case(Open, Cancel, Customer, Cancelled)]
    #[case(Open, Edit, Customer, Open)]
    #[case(InProgress, MarkComplete, Professional, PendingCustomerConfirmation)]
    #[case(InProgress, MarkComplete, Customer, PendingProfessionalConfirmation)]
    #[case(InProgress, RemoveProfessional, Customer, Open)]
    #[case(InProgress, Dispute, Professional, Disputed)]
    #[case(PendingCustomerConfirmation, ConfirmCompletion, Customer, Completed)]
    #[case(PendingProfessionalConfirmation, ConfirmCompletion, Professional, Completed)]
    #[case(Cancelled, Reopen, Customer, Open)]
    fn allowed_transitions(
        #[case] from: TaskStatus,
        #[case] action: TaskAction,
        #[case] actor: Actor,
        #[case] to: TaskStatus,
    ) {
        assert_eq!(transition(from, action, actor), Ok(to));
    }

    #[rstest]
    #[case(InProgress, Apply)]
    #[case(Completed, Cancel)]
    #[case(Completed, Edit)]
    #[case(Cancelled, AcceptApplication)]
    #[case(Open, ConfirmCompletion)]
    #[case(Disputed, MarkComplete)]
    #[case(Open, Review)]
    fn rejected_transitions(#[case] from: TaskStatus, #[case] action: TaskAction) {
        for actor in [Customer, Professional] {
            assert_eq!(
                transition(from, action, actor),
                Err(LifecycleError::InvalidTransition {
                    status: from,
                    action
                })
            );
        }
    }

    #[test]
    fn professional_cannot_confirm_their_own_completion() {
        let err = transition(PendingCustomerConfirmation, ConfirmCompletion, Professional)
            .unwrap_err();
        assert!(matches!(err, LifecycleError::WrongActor { .. }));
    }

    #[test]
    fn customer_cannot_apply_to_tasks() {
        let err = transition(Open, Apply, Customer).unwrap_err();
        assert!(matches!(err, LifecycleError::WrongActor { .. }));
    }

    #[test]
    fn statuses_round_trip_through_strings() {
        for status in TaskStatus::ALL {
            assert_eq!(status.as_str().parse::<TaskStatus>(), Ok(status));
        }
        assert!("archived".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn application_status_moves() {
        use ApplicationStatus::*;
        assert!(Pending.can_become(Accepted));
        assert!(Accepted.can_become(RemovedByCustomer));
        assert!(!Rejected.can_become(Accepted));
        assert!(!Withdrawn.can_become(Pending));
        assert!(!Accepted.can_become(Withdrawn));
    }
}
