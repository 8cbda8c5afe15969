//! The project record and its status model.
//!
//! A project moves through the approval workflow by status. The status
//! color is a derived display attribute, recomputed by transitions that
//! change how a project is tracking; it is never an input to a guard.

use chrono::{DateTime, NaiveDate, Utc};
use pmo_tracker_core::{ProjectId, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where a project stands in the approval workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    /// Being prepared by its manager; not yet submitted.
    Draft,
    /// Submitted and awaiting Sub PMO review.
    PendingSubPmoReview,
    /// Passed Sub PMO review and awaiting Main PMO approval.
    PendingMainPmoReview,
    /// Approved and in delivery.
    Active,
    /// Turned down by a reviewer; may be resubmitted.
    Rejected,
    /// Delivered.
    Completed,
}

impl ProjectStatus {
    /// All statuses, in workflow order.
    pub const ALL: [ProjectStatus; 6] = [
        Self::Draft,
        Self::PendingSubPmoReview,
        Self::PendingMainPmoReview,
        Self::Active,
        Self::Rejected,
        Self::Completed,
    ];

    /// Returns the stored name of this status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::PendingSubPmoReview => "pending_sub_pmo_review",
            Self::PendingMainPmoReview => "pending_main_pmo_review",
            Self::Active => "active",
            Self::Rejected => "rejected",
            Self::Completed => "completed",
        }
    }

    /// Returns a human-readable label.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::PendingSubPmoReview => "Pending Sub PMO review",
            Self::PendingMainPmoReview => "Pending Main PMO review",
            Self::Active => "Active",
            Self::Rejected => "Rejected",
            Self::Completed => "Completed",
        }
    }

    /// Returns true if no transition leaves this status.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Returns true while a reviewer still has to act.
    #[must_use]
    pub fn is_pending_review(&self) -> bool {
        matches!(self, Self::PendingSubPmoReview | Self::PendingMainPmoReview)
    }

    /// Returns true once the project has passed final approval.
    #[must_use]
    pub fn is_approved(&self) -> bool {
        matches!(self, Self::Active | Self::Completed)
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a stored status or color name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStatusError {
    /// What was being parsed.
    pub kind: &'static str,
    /// The value that failed to parse.
    pub value: String,
}

impl fmt::Display for ParseStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} '{}'", self.kind, self.value)
    }
}

impl std::error::Error for ParseStatusError {}

impl FromStr for ProjectStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseStatusError {
                kind: "project status",
                value: s.to_string(),
            })
    }
}

/// Traffic-light indicator shown next to a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusColor {
    Green,
    Yellow,
    Red,
    Blue,
}

impl StatusColor {
    /// Returns the stored name of this color.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Green => "green",
            Self::Yellow => "yellow",
            Self::Red => "red",
            Self::Blue => "blue",
        }
    }
}

impl fmt::Display for StatusColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatusColor {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "green" => Ok(Self::Green),
            "yellow" => Ok(Self::Yellow),
            "red" => Ok(Self::Red),
            "blue" => Ok(Self::Blue),
            _ => Err(ParseStatusError {
                kind: "status color",
                value: s.to_string(),
            }),
        }
    }
}

/// Percent complete below which a project is flagged yellow.
pub const ON_TRACK_THRESHOLD: u8 = 80;

/// Computes the status color of a project.
///
/// Rules are evaluated top to bottom; the first match wins:
/// 1. rejected projects are red
/// 2. projects past their end date are red
/// 3. projects under [`ON_TRACK_THRESHOLD`] percent complete are yellow
/// 4. active projects are green
/// 5. anything else is blue
#[must_use]
pub fn status_color(
    status: ProjectStatus,
    end_date: Option<NaiveDate>,
    percent_complete: u8,
    today: NaiveDate,
) -> StatusColor {
    if status == ProjectStatus::Rejected {
        return StatusColor::Red;
    }
    if end_date.is_some_and(|end| end < today) {
        return StatusColor::Red;
    }
    if percent_complete < ON_TRACK_THRESHOLD {
        return StatusColor::Yellow;
    }
    if status == ProjectStatus::Active {
        return StatusColor::Green;
    }
    StatusColor::Blue
}

/// A tracked project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Unique identifier.
    pub id: ProjectId,
    /// Project name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// The manager who owns the project.
    pub project_manager_id: UserId,
    /// Current workflow status.
    pub status: ProjectStatus,
    /// Derived display color.
    pub status_color: StatusColor,
    /// Delivery progress, 0 to 100.
    pub percent_complete: u8,
    /// Planned start date.
    pub start_date: Option<NaiveDate>,
    /// Planned end date.
    pub end_date: Option<NaiveDate>,
    /// When the project passed final approval.
    pub approved_date: Option<DateTime<Utc>>,
    /// Optimistic concurrency token, bumped by every save.
    pub version: i64,
    /// When created.
    pub created_at: DateTime<Utc>,
    /// When last updated.
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Creates a new draft project.
    #[must_use]
    pub fn new(name: impl Into<String>, project_manager_id: UserId) -> Self {
        let now = Utc::now();
        Self {
            id: ProjectId::new(),
            name: name.into(),
            description: None,
            project_manager_id,
            status: ProjectStatus::Draft,
            status_color: status_color(ProjectStatus::Draft, None, 0, now.date_naive()),
            percent_complete: 0,
            start_date: None,
            end_date: None,
            approved_date: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the planned schedule.
    #[must_use]
    pub fn with_schedule(mut self, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        self.start_date = Some(start_date);
        self.end_date = Some(end_date);
        self
    }

    /// Sets the recorded progress, clamped to 100.
    #[must_use]
    pub fn with_progress(mut self, percent_complete: u8) -> Self {
        self.percent_complete = percent_complete.min(100);
        self
    }

    /// Returns true if the given user manages this project.
    #[must_use]
    pub fn is_managed_by(&self, user_id: UserId) -> bool {
        self.project_manager_id == user_id
    }

    /// Recomputes the status color as of `today`.
    pub fn recompute_color(&mut self, today: NaiveDate) {
        self.status_color = status_color(self.status, self.end_date, self.percent_complete, today);
    }
}
