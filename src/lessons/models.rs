use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Lesson status enum representing the lifecycle of a lesson
///
/// Any transition between these states is legal (statuses are
/// corrections of the historical record, not a forward-only workflow);
/// the billing engine settles the balance consequences of each change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LessonStatus {
    Planned,
    Completed,
    NoShow,
    Cancelled,
}

impl LessonStatus {
    /// Convert status to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            LessonStatus::Planned => "planned",
            LessonStatus::Completed => "completed",
            LessonStatus::NoShow => "no_show",
            LessonStatus::Cancelled => "cancelled",
        }
    }

    /// Parse status from string
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "planned" => Ok(LessonStatus::Planned),
            "completed" => Ok(LessonStatus::Completed),
            "no_show" => Ok(LessonStatus::NoShow),
            "cancelled" => Ok(LessonStatus::Cancelled),
            _ => Err(format!("Invalid lesson status: {}", s)),
        }
    }
}

impl Default for LessonStatus {
    fn default() -> Self {
        LessonStatus::Planned
    }
}

impl std::fmt::Display for LessonStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Domain model representing a lesson in the database
///
/// `price` is a snapshot frozen at scheduling time; the student's
/// default price never changes it retroactively. `series_id` is a
/// logical grouping tag for recurring weekly instances, not a foreign
/// key.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Lesson {
    pub id: Uuid,
    pub student_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub topic: Option<String>,
    pub status: LessonStatus,
    pub price: Decimal,
    pub series_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request DTO for scheduling a lesson (or a weekly series)
///
/// If `price` is omitted the student's current default price is frozen
/// onto each created lesson. If `repeat_until` is present, weekly
/// instances are created up to and including that date, all sharing a
/// fresh series id.
#[derive(Debug, Clone, Deserialize, Validate)]
#[validate(schema(function = "crate::validation::validate_lesson_window"))]
pub struct CreateLessonRequest {
    pub student_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub topic: Option<String>,
    #[validate(custom = "crate::validation::validate_non_negative_price")]
    pub price: Option<Decimal>,
    pub repeat_until: Option<DateTime<Utc>>,
}

/// Request DTO for a sparse lesson update
///
/// Only fields present in the payload are applied. Status and price
/// changes feed the billing engine with pre-update snapshots.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateLessonRequest {
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub topic: Option<String>,
    pub status: Option<LessonStatus>,
    #[validate(custom = "crate::validation::validate_non_negative_price")]
    pub price: Option<Decimal>,
}

impl UpdateLessonRequest {
    /// Apply the present fields onto an in-memory lesson
    pub fn apply_to(&self, lesson: &mut Lesson) {
        if let Some(start_time) = self.start_time {
            lesson.start_time = start_time;
        }
        if let Some(end_time) = self.end_time {
            lesson.end_time = end_time;
        }
        if let Some(ref topic) = self.topic {
            lesson.topic = Some(topic.clone());
        }
        if let Some(status) = self.status {
            lesson.status = status;
        }
        if let Some(price) = self.price {
            lesson.price = price;
        }
    }
}

/// Response DTO for a series update
#[derive(Debug, Serialize)]
pub struct SeriesUpdateResponse {
    /// Number of lessons modified, the anchor lesson included
    pub updated: u64,
}

/// A homework/material attachment tied to a lesson
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Homework {
    pub id: Uuid,
    pub lesson_id: Uuid,
    pub description: String,
    pub file_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Request DTO for attaching homework to a lesson
///
/// `files` carries metadata for already-transferred files; the upload
/// policy validates it and only the resulting relative paths are
/// stored.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateHomeworkRequest {
    #[validate(length(min = 1, message = "Description must not be empty"))]
    pub description: String,
    #[serde(default)]
    pub files: Vec<crate::uploads::FileMetadata>,
}
