use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::payments::Payment;
use crate::slug::{first_free_slug, slugify};
use crate::students::{CreateStudentRequest, Student, Transaction, UpdateStudentRequest};

const STUDENT_COLUMNS: &str = "id, full_name, slug, parent_name, parent_contact, grade, \
     default_price, comment, balance, created_at, updated_at";

/// Repository for student rows and their audit trail
///
/// Returns plain sqlx errors; each domain converts them into its own
/// error type at the seam.
#[derive(Clone)]
pub struct StudentsRepository {
    pool: PgPool,
}

impl StudentsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Register a new student with a collision-free slug
    pub async fn create(&self, request: CreateStudentRequest) -> Result<Student, sqlx::Error> {
        let slug = self.unique_slug(&request.full_name).await?;

        let student = sqlx::query_as::<_, Student>(&format!(
            r#"
            INSERT INTO students (full_name, slug, parent_name, parent_contact, grade, default_price, comment)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {STUDENT_COLUMNS}
            "#,
        ))
        .bind(&request.full_name)
        .bind(&slug)
        .bind(&request.parent_name)
        .bind(&request.parent_contact)
        .bind(&request.grade)
        .bind(request.default_price.unwrap_or(Decimal::ZERO))
        .bind(&request.comment)
        .fetch_one(&self.pool)
        .await?;

        Ok(student)
    }

    /// List all students ordered by name
    pub async fn list(&self) -> Result<Vec<Student>, sqlx::Error> {
        sqlx::query_as::<_, Student>(&format!(
            "SELECT {STUDENT_COLUMNS} FROM students ORDER BY full_name, id"
        ))
        .fetch_all(&self.pool)
        .await
    }

    /// Find a student by ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Student>, sqlx::Error> {
        sqlx::query_as::<_, Student>(&format!(
            "SELECT {STUDENT_COLUMNS} FROM students WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Apply a sparse update, keeping existing values for omitted fields
    ///
    /// Returns None when the student does not exist. Balance is not
    /// touchable here; it moves only through the billing engine and the
    /// payment recorder.
    pub async fn update(
        &self,
        id: Uuid,
        request: UpdateStudentRequest,
    ) -> Result<Option<Student>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let Some(existing) = Self::lock_by_id(&mut *tx, id).await? else {
            return Ok(None);
        };

        let updated = sqlx::query_as::<_, Student>(&format!(
            r#"
            UPDATE students
            SET full_name = $1,
                parent_name = $2,
                parent_contact = $3,
                grade = $4,
                default_price = $5,
                comment = $6,
                updated_at = NOW()
            WHERE id = $7
            RETURNING {STUDENT_COLUMNS}
            "#,
        ))
        .bind(request.full_name.unwrap_or(existing.full_name))
        .bind(request.parent_name.or(existing.parent_name))
        .bind(request.parent_contact.or(existing.parent_contact))
        .bind(request.grade.or(existing.grade))
        .bind(request.default_price.unwrap_or(existing.default_price))
        .bind(request.comment.or(existing.comment))
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(updated))
    }

    /// Ledger entries for a student, newest first
    pub async fn transactions(&self, student_id: Uuid) -> Result<Vec<Transaction>, sqlx::Error> {
        sqlx::query_as::<_, Transaction>(
            r#"
            SELECT id, student_id, amount, comment, created_at
            FROM transactions
            WHERE student_id = $1
            ORDER BY created_at DESC, id
            "#,
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await
    }

    /// Payment events for a student, newest first
    pub async fn payments(&self, student_id: Uuid) -> Result<Vec<Payment>, sqlx::Error> {
        sqlx::query_as::<_, Payment>(
            r#"
            SELECT id, student_id, amount, comment, created_at
            FROM payments
            WHERE student_id = $1
            ORDER BY created_at DESC, id
            "#,
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await
    }

    /// Stored balance and ledger sum, read in one statement
    ///
    /// Payments are mirrored 1:1 into the ledger, so the sum alone
    /// reproduces a consistent balance. A single query sees one
    /// snapshot, so a billing commit cannot land between the two reads
    /// and fake a drift. Returns None when the student does not exist.
    pub async fn balance_snapshot(
        &self,
        student_id: Uuid,
    ) -> Result<Option<(Decimal, Decimal)>, sqlx::Error> {
        sqlx::query_as::<_, (Decimal, Decimal)>(
            r#"
            SELECT balance,
                   (SELECT COALESCE(SUM(amount), 0) FROM transactions WHERE student_id = $1)
            FROM students
            WHERE id = $1
            "#,
        )
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Lock a student row for update within an open transaction
    ///
    /// Serializes concurrent billing operations on the same student so
    /// balance snapshots cannot be lost.
    pub async fn lock_by_id(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<Student>, sqlx::Error> {
        sqlx::query_as::<_, Student>(&format!(
            "SELECT {STUDENT_COLUMNS} FROM students WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(conn)
        .await
    }

    /// Resolve slug collisions with a numeric suffix
    ///
    /// Fetches every slug that could collide (the base and all suffixed
    /// variants) and probes candidates against exact matches, so a
    /// pre-existing `anna-2` is skipped rather than re-issued.
    async fn unique_slug(&self, full_name: &str) -> Result<String, sqlx::Error> {
        let base = {
            let candidate = slugify(full_name);
            if candidate.is_empty() {
                "student".to_string()
            } else {
                candidate
            }
        };

        let taken: Vec<String> = sqlx::query_scalar(
            "SELECT slug FROM students WHERE slug = $1 OR slug LIKE $1 || '-%'",
        )
        .bind(&base)
        .fetch_all(&self.pool)
        .await?;

        Ok(first_free_slug(&base, &taken))
    }
}
