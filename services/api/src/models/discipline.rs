//! Discipline issue models and workflow state

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::models::Role;

/// Severity of a reported incident
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            other => Err(format!("Unknown severity: {}", other)),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Investigation state of an issue. Independent from the approval axis:
/// an approved issue can still be pending investigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    Pending,
    Investigating,
    Resolved,
    Dismissed,
}

impl IssueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueStatus::Pending => "pending",
            IssueStatus::Investigating => "investigating",
            IssueStatus::Resolved => "resolved",
            IssueStatus::Dismissed => "dismissed",
        }
    }
}

impl FromStr for IssueStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(IssueStatus::Pending),
            "investigating" => Ok(IssueStatus::Investigating),
            "resolved" => Ok(IssueStatus::Resolved),
            "dismissed" => Ok(IssueStatus::Dismissed),
            other => Err(format!("Unknown issue status: {}", other)),
        }
    }
}

impl fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Review state of an issue on the approval axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Rejected => "rejected",
        }
    }

    /// Initial review state for an issue created by the given role.
    /// Issues filed by a super admin skip the review queue.
    pub fn initial_for(creator: Role) -> Self {
        match creator {
            Role::SuperAdmin => ApprovalStatus::Approved,
            _ => ApprovalStatus::Pending,
        }
    }
}

impl FromStr for ApprovalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ApprovalStatus::Pending),
            "approved" => Ok(ApprovalStatus::Approved),
            "rejected" => Ok(ApprovalStatus::Rejected),
            other => Err(format!("Unknown approval status: {}", other)),
        }
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Discipline issue record
#[derive(Debug, Clone, Serialize)]
pub struct DisciplineIssue {
    pub id: Uuid,
    /// Trainee the issue is about
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub reported_by: Uuid,
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub status: IssueStatus,
    pub incident_date: NaiveDate,
    pub document_path: Option<String>,
    pub resolution_notes: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub approval_status: ApprovalStatus,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DisciplineIssue {
    /// Moves the issue to a new workflow status. `resolved_at` is stamped
    /// the first time the issue becomes resolved and cleared whenever it
    /// leaves that state.
    pub fn transition_status(&mut self, status: IssueStatus, now: DateTime<Utc>) {
        if status == IssueStatus::Resolved {
            if self.resolved_at.is_none() {
                self.resolved_at = Some(now);
            }
        } else {
            self.resolved_at = None;
        }
        self.status = status;
    }
}

/// Fields for inserting a new issue
#[derive(Debug, Clone)]
pub struct NewDisciplineIssue {
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub reported_by: Uuid,
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub incident_date: NaiveDate,
    pub document_path: Option<String>,
    pub approval_status: ApprovalStatus,
}

/// Query parameters for issue listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DisciplineIssueFilter {
    /// Course override, honoured for super admins only
    pub course_id: Option<Uuid>,
    /// Filter by the trainee the issue is about
    pub user_id: Option<Uuid>,
    pub status: Option<IssueStatus>,
    pub severity: Option<Severity>,
    pub approval_status: Option<ApprovalStatus>,
    /// Case-insensitive match against title and description
    pub search: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn issue() -> DisciplineIssue {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        DisciplineIssue {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            course_id: Uuid::new_v4(),
            reported_by: Uuid::new_v4(),
            title: "Late arrival".to_string(),
            description: "Arrived 40 minutes late to drill".to_string(),
            severity: Severity::Low,
            status: IssueStatus::Pending,
            incident_date: NaiveDate::from_ymd_opt(2024, 2, 28).unwrap(),
            document_path: None,
            resolution_notes: None,
            resolved_at: None,
            approval_status: ApprovalStatus::Pending,
            approved_by: None,
            approved_at: None,
            rejection_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn resolving_stamps_resolved_at_once() {
        let mut issue = issue();
        let first = Utc.with_ymd_and_hms(2024, 3, 2, 10, 0, 0).unwrap();
        let second = Utc.with_ymd_and_hms(2024, 3, 3, 10, 0, 0).unwrap();

        issue.transition_status(IssueStatus::Resolved, first);
        assert_eq!(issue.resolved_at, Some(first));

        // A second update that keeps the issue resolved must not re-stamp.
        issue.transition_status(IssueStatus::Resolved, second);
        assert_eq!(issue.resolved_at, Some(first));
    }

    #[test]
    fn leaving_resolved_clears_the_stamp() {
        let mut issue = issue();
        let first = Utc.with_ymd_and_hms(2024, 3, 2, 10, 0, 0).unwrap();
        let second = Utc.with_ymd_and_hms(2024, 3, 4, 10, 0, 0).unwrap();

        issue.transition_status(IssueStatus::Resolved, first);
        issue.transition_status(IssueStatus::Investigating, second);
        assert_eq!(issue.status, IssueStatus::Investigating);
        assert_eq!(issue.resolved_at, None);

        // Resolving again after a reopen gets a fresh stamp.
        issue.transition_status(IssueStatus::Resolved, second);
        assert_eq!(issue.resolved_at, Some(second));
    }

    #[test]
    fn super_admin_issues_skip_the_review_queue() {
        assert_eq!(
            ApprovalStatus::initial_for(Role::SuperAdmin),
            ApprovalStatus::Approved
        );
        assert_eq!(
            ApprovalStatus::initial_for(Role::Admin),
            ApprovalStatus::Pending
        );
    }

    #[test]
    fn workflow_states_use_snake_case_on_the_wire() {
        assert_eq!(
            serde_json::to_string(&ApprovalStatus::Pending).unwrap(),
            "\"pending\""
        );
        assert_eq!(
            serde_json::to_string(&IssueStatus::Investigating).unwrap(),
            "\"investigating\""
        );
        assert_eq!(serde_json::to_string(&Severity::High).unwrap(), "\"high\"");
    }
}
