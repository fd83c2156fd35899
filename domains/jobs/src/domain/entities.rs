//! Job domain entities for Kelmah
//!
//! Jobs are posted by hirers and move through the job state machine;
//! applications are submitted by workers against open jobs.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use kelmah_common::{Error, Result};

use crate::domain::validation::{
    COVER_LETTER_MAX_LEN, COVER_LETTER_MIN_LEN, DESCRIPTION_MAX_LEN, DESCRIPTION_MIN_LEN,
    TITLE_MAX_LEN, TITLE_MIN_LEN,
};
use crate::domain::state::{
    ApplicationEvent, ApplicationState, ApplicationStateMachine, JobEvent, JobGuardContext,
    JobState, JobStateMachine,
};

/// Default currency for budgets
pub const DEFAULT_CURRENCY: &str = "GHS";

/// Maximum number of skills on a job
pub const MAX_SKILLS: usize = 20;

/// Job status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "job_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Draft,
    #[default]
    Open,
    InProgress,
    Completed,
    Cancelled,
}

impl JobStatus {
    /// Check if status is terminal (job has finished)
    pub fn is_terminal(&self) -> bool {
        self.to_state().is_terminal()
    }

    /// Convert to state machine state
    pub fn to_state(&self) -> JobState {
        match self {
            JobStatus::Draft => JobState::Draft,
            JobStatus::Open => JobState::Open,
            JobStatus::InProgress => JobState::InProgress,
            JobStatus::Completed => JobState::Completed,
            JobStatus::Cancelled => JobState::Cancelled,
        }
    }

    /// Create from state machine state
    pub fn from_state(state: JobState) -> Self {
        match state {
            JobState::Draft => JobStatus::Draft,
            JobState::Open => JobStatus::Open,
            JobState::InProgress => JobStatus::InProgress,
            JobState::Completed => JobStatus::Completed,
            JobState::Cancelled => JobStatus::Cancelled,
        }
    }

    /// Get valid next states from current state
    pub fn valid_transitions(&self) -> Vec<JobStatus> {
        self.to_state()
            .valid_transitions()
            .iter()
            .map(|s| JobStatus::from_state(*s))
            .collect()
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_state())
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "draft" => Ok(JobStatus::Draft),
            "open" => Ok(JobStatus::Open),
            "in_progress" => Ok(JobStatus::InProgress),
            "completed" => Ok(JobStatus::Completed),
            "cancelled" => Ok(JobStatus::Cancelled),
            other => Err(format!("Unknown job status: {}", other)),
        }
    }
}

/// Engagement type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "job_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    FullTime,
    PartTime,
    Contract,
    OneTime,
}

impl std::str::FromStr for JobType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "full_time" => Ok(JobType::FullTime),
            "part_time" => Ok(JobType::PartTime),
            "contract" => Ok(JobType::Contract),
            "one_time" => Ok(JobType::OneTime),
            other => Err(format!("Unknown job type: {}", other)),
        }
    }
}

/// Job entity
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Job {
    pub id: Uuid,
    pub hirer_id: Uuid,
    pub title: String,
    pub description: String,
    pub category: String,
    pub job_type: JobType,
    pub budget_min: Decimal,
    pub budget_max: Decimal,
    pub currency: String,
    pub location: Option<String>,
    pub skills: Vec<String>,
    pub deadline: Option<DateTime<Utc>>,
    pub status: JobStatus,
    pub worker_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated input for a new job
#[derive(Debug, Clone)]
pub struct NewJob {
    pub title: String,
    pub description: String,
    pub category: String,
    pub job_type: JobType,
    pub budget_min: Decimal,
    pub budget_max: Decimal,
    pub currency: Option<String>,
    pub location: Option<String>,
    pub skills: Vec<String>,
    pub deadline: Option<DateTime<Utc>>,
    pub publish: bool,
}

/// Partial update of an editable job
#[derive(Debug, Clone, Default)]
pub struct JobChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub job_type: Option<JobType>,
    pub budget_min: Option<Decimal>,
    pub budget_max: Option<Decimal>,
    pub currency: Option<String>,
    pub location: Option<String>,
    pub skills: Option<Vec<String>>,
    pub deadline: Option<DateTime<Utc>>,
}

impl Job {
    /// Create a new job with validation
    pub fn new(hirer_id: Uuid, input: NewJob) -> Result<Self> {
        let now = Utc::now();
        let status = if input.publish {
            JobStatus::Open
        } else {
            JobStatus::Draft
        };

        let job = Job {
            id: Uuid::new_v4(),
            hirer_id,
            title: input.title.trim().to_string(),
            description: input.description.trim().to_string(),
            category: input.category.trim().to_string(),
            job_type: input.job_type,
            budget_min: input.budget_min,
            budget_max: input.budget_max,
            currency: normalize_currency(input.currency.as_deref()),
            location: normalize_optional(input.location),
            skills: normalize_skills(input.skills),
            deadline: input.deadline,
            status,
            worker_id: None,
            created_at: now,
            updated_at: now,
        };

        job.validate()?;
        ensure_future_deadline(job.deadline, now)?;
        Ok(job)
    }

    /// Only drafts and open jobs can be edited or deleted
    pub fn is_editable(&self) -> bool {
        matches!(self.status, JobStatus::Draft | JobStatus::Open)
    }

    /// Whether `user_id` posted this job
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.hirer_id == user_id
    }

    /// Drafts are only visible to their hirer
    pub fn is_visible_to(&self, viewer: Option<Uuid>) -> bool {
        self.status != JobStatus::Draft || viewer.is_some_and(|id| self.is_owned_by(id))
    }

    /// Check if job is terminal
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Merge a partial update and re-check the job invariants. The job is
    /// left untouched when the result is invalid.
    pub fn apply_changes(&mut self, changes: JobChanges) -> Result<()> {
        if !self.is_editable() {
            return Err(Error::Conflict(format!(
                "Job is {} and can no longer be edited",
                self.status
            )));
        }

        let mut next = self.clone();
        if let Some(title) = changes.title {
            next.title = title.trim().to_string();
        }
        if let Some(description) = changes.description {
            next.description = description.trim().to_string();
        }
        if let Some(category) = changes.category {
            next.category = category.trim().to_string();
        }
        if let Some(job_type) = changes.job_type {
            next.job_type = job_type;
        }
        if let Some(min) = changes.budget_min {
            next.budget_min = min;
        }
        if let Some(max) = changes.budget_max {
            next.budget_max = max;
        }
        if let Some(currency) = changes.currency {
            next.currency = normalize_currency(Some(&currency));
        }
        if changes.location.is_some() {
            next.location = normalize_optional(changes.location);
        }
        if let Some(skills) = changes.skills {
            next.skills = normalize_skills(skills);
        }
        let now = Utc::now();
        if changes.deadline.is_some() {
            ensure_future_deadline(changes.deadline, now)?;
            next.deadline = changes.deadline;
        }

        next.validate()?;
        next.updated_at = now;
        *self = next;
        Ok(())
    }

    /// Invariants shared by creation and update. Text fields are checked
    /// after trimming.
    pub fn validate(&self) -> Result<()> {
        ensure_length("title", &self.title, TITLE_MIN_LEN, TITLE_MAX_LEN)?;
        ensure_length(
            "description",
            &self.description,
            DESCRIPTION_MIN_LEN,
            DESCRIPTION_MAX_LEN,
        )?;
        if self.category.is_empty() {
            return Err(Error::Validation("\"category\" is required".to_string()));
        }
        if self.budget_min < Decimal::ZERO || self.budget_max < Decimal::ZERO {
            return Err(Error::Validation(
                "\"budget\" values cannot be negative".to_string(),
            ));
        }
        if self.budget_min > self.budget_max {
            return Err(Error::Validation(
                "\"budget.min\" cannot be greater than \"budget.max\"".to_string(),
            ));
        }
        if self.skills.len() > MAX_SKILLS {
            return Err(Error::Validation(format!(
                "\"skills\" must contain at most {} items",
                MAX_SKILLS
            )));
        }
        Ok(())
    }

    /// Hire `worker_id`; the job moves to in progress
    pub fn hire(&mut self, worker_id: Uuid) -> Result<()> {
        let ctx = JobGuardContext { has_worker: true };
        let next = self.apply_transition(JobEvent::Hire, Some(&ctx))?;
        self.status = JobStatus::from_state(next);
        self.worker_id = Some(worker_id);
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Move to a requested status through the state machine.
    ///
    /// Reopening releases the hired worker.
    pub fn change_status(&mut self, target: JobStatus) -> Result<JobEvent> {
        let event = JobStateMachine::event_for_target(self.status.to_state(), target.to_state())
            .map_err(|e| e.into_error("job"))?;

        let ctx = JobGuardContext {
            has_worker: false,
        };
        let next = self.apply_transition(event, Some(&ctx))?;

        if event == JobEvent::Reopen {
            self.worker_id = None;
        }
        self.status = JobStatus::from_state(next);
        self.updated_at = Utc::now();
        Ok(event)
    }

    /// Apply a state transition using the state machine
    fn apply_transition(
        &self,
        event: JobEvent,
        context: Option<&JobGuardContext>,
    ) -> Result<JobState> {
        JobStateMachine::transition(self.status.to_state(), event, context)
            .map_err(|e| e.into_error("job"))
    }

    /// Check if a transition is valid without applying it
    pub fn can_transition(&self, event: JobEvent) -> bool {
        let ctx = JobGuardContext {
            has_worker: self.worker_id.is_some(),
        };
        JobStateMachine::can_transition(self.status.to_state(), event, Some(&ctx))
    }
}

fn ensure_length(field: &str, value: &str, min: u64, max: u64) -> Result<()> {
    let len = value.chars().count() as u64;
    if len < min || len > max {
        return Err(Error::Validation(format!(
            "\"{field}\" must be between {min} and {max} characters"
        )));
    }
    Ok(())
}

fn ensure_future_deadline(deadline: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Result<()> {
    if deadline.is_some_and(|deadline| deadline <= now) {
        return Err(Error::Validation(
            "\"deadline\" must be in the future".to_string(),
        ));
    }
    Ok(())
}

fn normalize_currency(currency: Option<&str>) -> String {
    currency
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_ascii_uppercase)
        .unwrap_or_else(|| DEFAULT_CURRENCY.to_string())
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Trim, drop blanks and de-duplicate (case-insensitive), keeping order
fn normalize_skills(skills: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    skills
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(s.to_lowercase()))
        .collect()
}

/// Application status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "application_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
    Withdrawn,
}

impl ApplicationStatus {
    pub fn to_state(&self) -> ApplicationState {
        match self {
            ApplicationStatus::Pending => ApplicationState::Pending,
            ApplicationStatus::Accepted => ApplicationState::Accepted,
            ApplicationStatus::Rejected => ApplicationState::Rejected,
            ApplicationStatus::Withdrawn => ApplicationState::Withdrawn,
        }
    }

    pub fn from_state(state: ApplicationState) -> Self {
        match state {
            ApplicationState::Pending => ApplicationStatus::Pending,
            ApplicationState::Accepted => ApplicationStatus::Accepted,
            ApplicationState::Rejected => ApplicationStatus::Rejected,
            ApplicationState::Withdrawn => ApplicationStatus::Withdrawn,
        }
    }

    /// Event that reaches this status from `pending`
    pub fn event(&self) -> Option<ApplicationEvent> {
        match self {
            ApplicationStatus::Pending => None,
            ApplicationStatus::Accepted => Some(ApplicationEvent::Accept),
            ApplicationStatus::Rejected => Some(ApplicationEvent::Reject),
            ApplicationStatus::Withdrawn => Some(ApplicationEvent::Withdraw),
        }
    }
}

impl std::str::FromStr for ApplicationStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ApplicationStatus::Pending),
            "accepted" => Ok(ApplicationStatus::Accepted),
            "rejected" => Ok(ApplicationStatus::Rejected),
            "withdrawn" => Ok(ApplicationStatus::Withdrawn),
            other => Err(format!("Unknown application status: {}", other)),
        }
    }
}

impl std::fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_state())
    }
}

/// Job application entity
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct JobApplication {
    pub id: Uuid,
    pub job_id: Uuid,
    pub worker_id: Uuid,
    pub cover_letter: String,
    pub proposed_rate: Option<Decimal>,
    pub estimated_duration: Option<String>,
    pub status: ApplicationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobApplication {
    pub fn new(
        job_id: Uuid,
        worker_id: Uuid,
        cover_letter: &str,
        proposed_rate: Option<Decimal>,
        estimated_duration: Option<String>,
    ) -> Result<Self> {
        if proposed_rate.is_some_and(|rate| rate < Decimal::ZERO) {
            return Err(Error::Validation(
                "\"proposed_rate\" cannot be negative".to_string(),
            ));
        }

        let cover_letter = cover_letter.trim();
        ensure_length(
            "cover_letter",
            cover_letter,
            COVER_LETTER_MIN_LEN,
            COVER_LETTER_MAX_LEN,
        )?;

        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            job_id,
            worker_id,
            cover_letter: cover_letter.to_string(),
            proposed_rate,
            estimated_duration: normalize_optional(estimated_duration),
            status: ApplicationStatus::Pending,
            created_at: now,
            updated_at: now,
        })
    }

    /// Apply an event through the application state machine
    pub fn apply(&mut self, event: ApplicationEvent) -> Result<()> {
        let next = ApplicationStateMachine::transition(self.status.to_state(), event)
            .map_err(|e| e.into_error("application"))?;
        self.status = ApplicationStatus::from_state(next);
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Ordering of the public job list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobSort {
    #[default]
    Newest,
    Oldest,
    BudgetHigh,
    BudgetLow,
}

impl std::str::FromStr for JobSort {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "newest" => Ok(JobSort::Newest),
            "oldest" => Ok(JobSort::Oldest),
            "budget_high" => Ok(JobSort::BudgetHigh),
            "budget_low" => Ok(JobSort::BudgetLow),
            other => Err(format!("Unknown sort order: {}", other)),
        }
    }
}

impl JobSort {
    /// `ORDER BY` clause; ties fall back to id for stable paging
    pub fn order_by(&self) -> &'static str {
        match self {
            JobSort::Newest => "created_at DESC, id",
            JobSort::Oldest => "created_at ASC, id",
            JobSort::BudgetHigh => "budget_max DESC, created_at DESC, id",
            JobSort::BudgetLow => "budget_min ASC, created_at DESC, id",
        }
    }
}

/// Search criteria for the public job list
#[derive(Debug, Clone, Default)]
pub struct JobSearch {
    pub search: Option<String>,
    pub category: Option<String>,
    pub job_type: Option<JobType>,
    pub location: Option<String>,
    pub min_budget: Option<Decimal>,
    pub max_budget: Option<Decimal>,
    pub skills: Vec<String>,
    pub status: JobStatus,
    pub sort: JobSort,
}
