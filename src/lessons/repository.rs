use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::lessons::{Homework, Lesson, LessonError, LessonStatus};

const LESSON_COLUMNS: &str =
    "id, student_id, start_time, end_time, topic, status, price, series_id, created_at, updated_at";

/// Parameters for inserting one lesson row
#[derive(Debug, Clone)]
pub struct NewLesson {
    pub student_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub topic: Option<String>,
    pub price: Decimal,
    pub series_id: Option<Uuid>,
}

/// Repository for lesson and homework rows
#[derive(Clone)]
pub struct LessonsRepository {
    pool: PgPool,
}

impl LessonsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a batch of lessons atomically (one row for a single
    /// lesson, several for a weekly series)
    pub async fn create_many(&self, rows: Vec<NewLesson>) -> Result<Vec<Lesson>, LessonError> {
        let mut tx = self.pool.begin().await?;

        let mut created = Vec::with_capacity(rows.len());
        for row in rows {
            let lesson = Self::insert(&mut *tx, row).await?;
            created.push(lesson);
        }

        tx.commit().await?;

        Ok(created)
    }

    /// Find a lesson by ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Lesson>, LessonError> {
        let lesson = sqlx::query_as::<_, Lesson>(&format!(
            "SELECT {LESSON_COLUMNS} FROM lessons WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(lesson)
    }

    /// Lessons whose start time falls inside the given calendar window
    pub async fn find_in_window(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Lesson>, LessonError> {
        let lessons = sqlx::query_as::<_, Lesson>(&format!(
            r#"
            SELECT {LESSON_COLUMNS}
            FROM lessons
            WHERE start_time >= $1 AND start_time <= $2
            ORDER BY start_time, id
            "#
        ))
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(lessons)
    }

    /// Homework attachments for a lesson
    pub async fn find_homeworks(&self, lesson_id: Uuid) -> Result<Vec<Homework>, LessonError> {
        let homeworks = sqlx::query_as::<_, Homework>(
            r#"
            SELECT id, lesson_id, description, file_path, created_at
            FROM homeworks
            WHERE lesson_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(lesson_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(homeworks)
    }

    /// Insert one homework attachment row
    pub async fn insert_homework(
        &self,
        lesson_id: Uuid,
        description: &str,
        file_path: Option<&str>,
    ) -> Result<Homework, LessonError> {
        let homework = sqlx::query_as::<_, Homework>(
            r#"
            INSERT INTO homeworks (lesson_id, description, file_path)
            VALUES ($1, $2, $3)
            RETURNING id, lesson_id, description, file_path, created_at
            "#,
        )
        .bind(lesson_id)
        .bind(description)
        .bind(file_path)
        .fetch_one(&self.pool)
        .await?;

        Ok(homework)
    }

    /// Insert one lesson row within an open transaction
    pub async fn insert(
        conn: &mut PgConnection,
        row: NewLesson,
    ) -> Result<Lesson, sqlx::Error> {
        sqlx::query_as::<_, Lesson>(&format!(
            r#"
            INSERT INTO lessons (student_id, start_time, end_time, topic, status, price, series_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {LESSON_COLUMNS}
            "#
        ))
        .bind(row.student_id)
        .bind(row.start_time)
        .bind(row.end_time)
        .bind(&row.topic)
        .bind(LessonStatus::Planned)
        .bind(row.price)
        .bind(row.series_id)
        .fetch_one(conn)
        .await
    }

    /// Lock a lesson row for update within an open transaction
    ///
    /// The caller captures the old status/price snapshot from the
    /// returned row before mutating it.
    pub async fn lock_by_id(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<Lesson>, sqlx::Error> {
        sqlx::query_as::<_, Lesson>(&format!(
            "SELECT {LESSON_COLUMNS} FROM lessons WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(conn)
        .await
    }

    /// Persist the mutable fields of an in-memory lesson
    pub async fn persist(conn: &mut PgConnection, lesson: &Lesson) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE lessons
            SET start_time = $1,
                end_time = $2,
                topic = $3,
                status = $4,
                price = $5,
                updated_at = NOW()
            WHERE id = $6
            "#,
        )
        .bind(lesson.start_time)
        .bind(lesson.end_time)
        .bind(&lesson.topic)
        .bind(lesson.status)
        .bind(lesson.price)
        .bind(lesson.id)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Planned lessons of a series at or after the anchor's original
    /// start time, excluding the anchor itself, locked for update
    ///
    /// Already-resolved lessons (completed, cancelled, no-show) are
    /// immutable to series edits.
    pub async fn lock_planned_peers(
        conn: &mut PgConnection,
        series_id: Uuid,
        anchor_id: Uuid,
        from: DateTime<Utc>,
    ) -> Result<Vec<Lesson>, sqlx::Error> {
        sqlx::query_as::<_, Lesson>(&format!(
            r#"
            SELECT {LESSON_COLUMNS}
            FROM lessons
            WHERE series_id = $1
              AND id != $2
              AND start_time >= $3
              AND status = $4
            ORDER BY start_time, id
            FOR UPDATE
            "#
        ))
        .bind(series_id)
        .bind(anchor_id)
        .bind(from)
        .bind(LessonStatus::Planned)
        .fetch_all(conn)
        .await
    }
}
