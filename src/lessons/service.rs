use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::lessons::{
    BillingEngine, CreateHomeworkRequest, CreateLessonRequest, Homework, Lesson, LessonError,
    LessonsRepository, NewLesson, UpdateLessonRequest,
};
use crate::students::StudentsRepository;
use crate::uploads::{storage_path, UploadPolicy};

/// Time/topic propagation derived from a series patch
///
/// Start and end times propagate as deltas relative to the anchor
/// lesson, preserving each peer's offset within the series; topic is
/// an absolute overwrite. Status and price never propagate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesShift {
    pub start_delta: Option<Duration>,
    pub end_delta: Option<Duration>,
    pub topic: Option<String>,
}

impl SeriesShift {
    /// Derives the propagation from the incoming patch and the
    /// anchor's pre-update times.
    pub fn from_patch(
        patch: &UpdateLessonRequest,
        anchor_start: DateTime<Utc>,
        anchor_end: DateTime<Utc>,
    ) -> Self {
        Self {
            start_delta: patch.start_time.map(|new_start| new_start - anchor_start),
            end_delta: patch.end_time.map(|new_end| new_end - anchor_end),
            topic: patch.topic.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start_delta.is_none() && self.end_delta.is_none() && self.topic.is_none()
    }

    /// Applies the shift to one peer lesson in memory.
    pub fn apply_to(&self, lesson: &mut Lesson) {
        if let Some(delta) = self.start_delta {
            lesson.start_time += delta;
        }
        if let Some(delta) = self.end_delta {
            lesson.end_time += delta;
        }
        if let Some(ref topic) = self.topic {
            lesson.topic = Some(topic.clone());
        }
    }
}

/// Lesson lifecycle coordinator: scheduling, updates, and series
/// propagation, with billing settled on every status change.
#[derive(Clone)]
pub struct LessonService {
    pool: PgPool,
    repo: LessonsRepository,
    students_repo: StudentsRepository,
    upload_policy: UploadPolicy,
}

impl LessonService {
    pub fn new(pool: PgPool, repo: LessonsRepository, students_repo: StudentsRepository) -> Self {
        Self {
            pool,
            repo,
            students_repo,
            upload_policy: UploadPolicy::default(),
        }
    }

    /// Schedule a lesson, or a weekly series when `repeat_until` is set
    ///
    /// The price is frozen at creation: an omitted price takes the
    /// student's current default and never follows it afterwards.
    pub async fn create_lessons(
        &self,
        request: CreateLessonRequest,
    ) -> Result<Vec<Lesson>, LessonError> {
        let student = self
            .students_repo
            .find_by_id(request.student_id)
            .await?
            .ok_or(LessonError::StudentNotFound(request.student_id))?;

        let price = request.price.unwrap_or(student.default_price);
        let rows = build_occurrences(&request, price);
        let count = rows.len();

        let lessons = self.repo.create_many(rows).await?;

        tracing::info!(
            "Scheduled {} lesson(s) for student {} at price {}",
            count,
            student.id,
            price
        );
        Ok(lessons)
    }

    /// Update a single lesson, settling billing on status change
    ///
    /// Order matters: the pre-update status/price snapshot is captured
    /// first, then the patch is applied and persisted, then the billing
    /// engine runs with the snapshot — all in one transaction.
    pub async fn update_lesson(
        &self,
        lesson_id: Uuid,
        patch: UpdateLessonRequest,
    ) -> Result<Lesson, LessonError> {
        let mut tx = self.pool.begin().await?;

        let mut lesson = LessonsRepository::lock_by_id(&mut *tx, lesson_id)
            .await?
            .ok_or(LessonError::NotFound)?;

        let old_status = lesson.status;
        let old_price = lesson.price;

        patch.apply_to(&mut lesson);
        LessonsRepository::persist(&mut *tx, &lesson).await?;

        BillingEngine::apply_status_change(&mut *tx, &lesson, old_status, old_price).await?;

        tx.commit().await?;

        Ok(lesson)
    }

    /// Update a lesson and propagate time shifts/topic to the rest of
    /// its series
    ///
    /// The anchor receives full single-lesson semantics (including
    /// billing). Peers — planned lessons of the same series starting at
    /// or after the anchor's original start — are shifted by the same
    /// time delta and receive the topic verbatim. Status and price are
    /// never propagated, so peers trigger no billing.
    ///
    /// Returns the number of lessons modified, anchor included.
    pub async fn update_series(
        &self,
        lesson_id: Uuid,
        patch: UpdateLessonRequest,
    ) -> Result<u64, LessonError> {
        let mut tx = self.pool.begin().await?;

        let mut anchor = LessonsRepository::lock_by_id(&mut *tx, lesson_id)
            .await?
            .ok_or(LessonError::NotFound)?;
        let series_id = anchor.series_id.ok_or(LessonError::NotASeries)?;

        let original_start = anchor.start_time;
        let shift = SeriesShift::from_patch(&patch, anchor.start_time, anchor.end_time);

        let old_status = anchor.status;
        let old_price = anchor.price;

        patch.apply_to(&mut anchor);
        LessonsRepository::persist(&mut *tx, &anchor).await?;
        BillingEngine::apply_status_change(&mut *tx, &anchor, old_status, old_price).await?;

        let mut updated: u64 = 1;
        if !shift.is_empty() {
            let peers =
                LessonsRepository::lock_planned_peers(&mut *tx, series_id, anchor.id, original_start)
                    .await?;

            for mut peer in peers {
                shift.apply_to(&mut peer);
                LessonsRepository::persist(&mut *tx, &peer).await?;
                updated += 1;
            }
        }

        tx.commit().await?;

        tracing::info!(
            "Series {} update touched {} lesson(s)",
            series_id,
            updated
        );
        Ok(updated)
    }

    /// Fetch one lesson
    pub async fn get_lesson(&self, lesson_id: Uuid) -> Result<Lesson, LessonError> {
        self.repo
            .find_by_id(lesson_id)
            .await?
            .ok_or(LessonError::NotFound)
    }

    /// Lessons within a calendar window
    pub async fn list_window(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Lesson>, LessonError> {
        self.repo.find_in_window(start, end).await
    }

    /// Attach homework to a lesson
    ///
    /// File metadata is validated against the upload policy; only the
    /// resulting relative path strings are stored. File transfer itself
    /// never shares a transaction with billing or lesson state.
    pub async fn attach_homeworks(
        &self,
        lesson_id: Uuid,
        request: CreateHomeworkRequest,
    ) -> Result<Vec<Homework>, LessonError> {
        let lesson = self
            .repo
            .find_by_id(lesson_id)
            .await?
            .ok_or(LessonError::NotFound)?;

        let student = self
            .students_repo
            .find_by_id(lesson.student_id)
            .await?
            .ok_or(LessonError::StudentNotFound(lesson.student_id))?;

        self.upload_policy.validate_batch(&request.files)?;

        let mut homeworks = Vec::new();
        if request.files.is_empty() {
            let homework = self
                .repo
                .insert_homework(lesson_id, &request.description, None)
                .await?;
            homeworks.push(homework);
        } else {
            let lesson_date = lesson.start_time.date_naive();
            for file in &request.files {
                let path = storage_path(&student.slug, lesson_date, &file.filename);
                let homework = self
                    .repo
                    .insert_homework(lesson_id, &request.description, Some(&path))
                    .await?;
                homeworks.push(homework);
            }
        }

        Ok(homeworks)
    }

    /// List homework attachments for a lesson
    pub async fn list_homeworks(&self, lesson_id: Uuid) -> Result<Vec<Homework>, LessonError> {
        self.repo
            .find_by_id(lesson_id)
            .await?
            .ok_or(LessonError::NotFound)?;

        self.repo.find_homeworks(lesson_id).await
    }
}

/// Expands a create request into concrete occurrences
///
/// Without `repeat_until` this is a single lesson with no series tag.
/// With it, weekly instances are generated while the start stays on or
/// before the limit, all sharing a freshly minted series id.
fn build_occurrences(request: &CreateLessonRequest, price: rust_decimal::Decimal) -> Vec<NewLesson> {
    let series_id = request.repeat_until.map(|_| Uuid::new_v4());

    let mut rows = Vec::new();
    let mut start = request.start_time;
    let mut end = request.end_time;

    loop {
        rows.push(NewLesson {
            student_id: request.student_id,
            start_time: start,
            end_time: end,
            topic: request.topic.clone(),
            price,
            series_id,
        });

        let Some(repeat_until) = request.repeat_until else {
            break;
        };

        start += Duration::weeks(1);
        end += Duration::weeks(1);
        if start > repeat_until {
            break;
        }
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    use crate::lessons::LessonStatus;

    fn t(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, day, hour, 0, 0).unwrap()
    }

    fn planned_lesson(start: DateTime<Utc>, end: DateTime<Utc>) -> Lesson {
        Lesson {
            id: Uuid::new_v4(),
            student_id: Uuid::new_v4(),
            start_time: start,
            end_time: end,
            topic: None,
            status: LessonStatus::Planned,
            price: dec!(100),
            series_id: Some(Uuid::new_v4()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_series_shift_moves_peers_by_the_same_delta() {
        // Anchor moved one hour later; the peer keeps its weekly offset
        let patch = UpdateLessonRequest {
            start_time: Some(t(2, 15)),
            end_time: Some(t(2, 16)),
            ..Default::default()
        };
        let shift = SeriesShift::from_patch(&patch, t(2, 14), t(2, 15));

        assert_eq!(shift.start_delta, Some(Duration::hours(1)));
        assert_eq!(shift.end_delta, Some(Duration::hours(1)));

        let mut peer = planned_lesson(t(9, 14), t(9, 15));
        shift.apply_to(&mut peer);

        assert_eq!(peer.start_time, t(9, 15));
        assert_eq!(peer.end_time, t(9, 16));
    }

    #[test]
    fn test_series_shift_topic_is_absolute_overwrite() {
        let patch = UpdateLessonRequest {
            topic: Some("Quadratic equations".to_string()),
            ..Default::default()
        };
        let shift = SeriesShift::from_patch(&patch, t(2, 14), t(2, 15));

        assert_eq!(shift.start_delta, None);
        assert_eq!(shift.end_delta, None);

        let mut peer = planned_lesson(t(9, 14), t(9, 15));
        peer.topic = Some("Old topic".to_string());
        shift.apply_to(&mut peer);

        assert_eq!(peer.topic.as_deref(), Some("Quadratic equations"));
        assert_eq!(peer.start_time, t(9, 14));
    }

    #[test]
    fn test_series_shift_without_time_or_topic_is_empty() {
        // Status/price edits stay single-lesson; nothing propagates
        let patch = UpdateLessonRequest {
            status: Some(LessonStatus::Completed),
            price: Some(dec!(120)),
            ..Default::default()
        };
        let shift = SeriesShift::from_patch(&patch, t(2, 14), t(2, 15));

        assert!(shift.is_empty());
    }

    #[test]
    fn test_independent_start_and_end_deltas() {
        // Only the end moves: the lesson is extended, not shifted
        let patch = UpdateLessonRequest {
            end_time: Some(t(2, 16)),
            ..Default::default()
        };
        let shift = SeriesShift::from_patch(&patch, t(2, 14), t(2, 15));

        assert_eq!(shift.start_delta, None);
        assert_eq!(shift.end_delta, Some(Duration::hours(1)));
    }

    fn create_request(repeat_until: Option<DateTime<Utc>>) -> CreateLessonRequest {
        CreateLessonRequest {
            student_id: Uuid::new_v4(),
            start_time: t(2, 14),
            end_time: t(2, 15),
            topic: Some("Algebra".to_string()),
            price: None,
            repeat_until,
        }
    }

    #[test]
    fn test_single_occurrence_without_repeat() {
        let rows = build_occurrences(&create_request(None), dec!(100));

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].series_id, None);
        assert_eq!(rows[0].price, dec!(100));
    }

    #[test]
    fn test_weekly_occurrences_share_a_series_id() {
        // Sept 2 anchor, repeat until Sept 16 inclusive -> 3 instances
        let rows = build_occurrences(&create_request(Some(t(16, 14))), dec!(100));

        assert_eq!(rows.len(), 3);
        let series_id = rows[0].series_id.expect("series id must be set");
        assert!(rows.iter().all(|r| r.series_id == Some(series_id)));

        assert_eq!(rows[0].start_time, t(2, 14));
        assert_eq!(rows[1].start_time, t(9, 14));
        assert_eq!(rows[2].start_time, t(16, 14));
        assert_eq!(rows[2].end_time, t(16, 15));
    }

    #[test]
    fn test_repeat_until_before_next_week_yields_one_tagged_instance() {
        let rows = build_occurrences(&create_request(Some(t(3, 14))), dec!(100));

        assert_eq!(rows.len(), 1);
        assert!(rows[0].series_id.is_some());
    }
}
