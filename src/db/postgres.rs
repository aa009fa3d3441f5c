//! PostgreSQL implementation of the persistence port.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::batch::model::BatchUpload;
use crate::store::{CertificateStore, StoreError};
use crate::student::model::{CertificateStatus, NewStudent, StudentRecord};

const SCHEMA: [&str; 4] = [
    r#"
    CREATE TABLE IF NOT EXISTS students (
        id UUID PRIMARY KEY,
        student_name VARCHAR(200) NOT NULL,
        roll_number VARCHAR(50) NOT NULL,
        branch VARCHAR(100) NOT NULL,
        college_name VARCHAR(200) NOT NULL,
        email VARCHAR(120) NOT NULL,
        phone_number VARCHAR(20),
        internship_name VARCHAR(200) NOT NULL,
        internship_start_date DATE NOT NULL,
        internship_end_date DATE NOT NULL,
        duration_weeks INTEGER,
        mentor_name VARCHAR(200),
        mentor_email VARCHAR(120),
        internship_location VARCHAR(200),
        company_name VARCHAR(200),
        performance_rating VARCHAR(50),
        skills_acquired TEXT,
        project_title VARCHAR(300),
        certificate_id VARCHAR(100) NOT NULL,
        date_of_issue DATE NOT NULL,
        remarks TEXT,
        certificate_status VARCHAR(20) NOT NULL DEFAULT 'PENDING',
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        CONSTRAINT students_roll_number_key UNIQUE (roll_number),
        CONSTRAINT students_certificate_id_key UNIQUE (certificate_id)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS students_certificate_status_idx ON students (certificate_status)",
    r#"
    CREATE TABLE IF NOT EXISTS batch_uploads (
        id UUID PRIMARY KEY,
        filename VARCHAR(255) NOT NULL,
        total_records INTEGER NOT NULL DEFAULT 0,
        processed_records INTEGER NOT NULL DEFAULT 0,
        successful_records INTEGER NOT NULL DEFAULT 0,
        failed_records INTEGER NOT NULL DEFAULT 0,
        status VARCHAR(30) NOT NULL DEFAULT 'pending',
        error_details TEXT,
        uploaded_by VARCHAR(100),
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS batch_uploads_created_at_idx ON batch_uploads (created_at DESC)",
];

const STUDENT_COLUMNS: &str = "id, student_name, roll_number, branch, college_name, email, \
    phone_number, internship_name, internship_start_date, internship_end_date, duration_weeks, \
    mentor_name, mentor_email, internship_location, company_name, performance_rating, \
    skills_acquired, project_title, certificate_id, date_of_issue, remarks, certificate_status, \
    created_at";

const BATCH_COLUMNS: &str = "id, filename, total_records, processed_records, successful_records, \
    failed_records, status, error_details, uploaded_by, created_at, updated_at";

#[derive(Clone)]
pub struct PgCertificateStore {
    pool: PgPool,
}

impl PgCertificateStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the tables if they do not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), sqlx::Error> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl CertificateStore for PgCertificateStore {
    async fn find_student_by_roll_number(
        &self,
        roll_number: &str,
    ) -> Result<Option<StudentRecord>, StoreError> {
        let sql = format!("SELECT {} FROM students WHERE roll_number = $1", STUDENT_COLUMNS);
        Ok(sqlx::query_as::<_, StudentRecord>(&sql)
            .bind(roll_number)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_student_by_certificate_id(
        &self,
        certificate_id: &str,
    ) -> Result<Option<StudentRecord>, StoreError> {
        let sql = format!("SELECT {} FROM students WHERE certificate_id = $1", STUDENT_COLUMNS);
        Ok(sqlx::query_as::<_, StudentRecord>(&sql)
            .bind(certificate_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn insert_students(
        &self,
        students: &[NewStudent],
    ) -> Result<Vec<StudentRecord>, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO students (
                id, student_name, roll_number, branch, college_name, email, phone_number,
                internship_name, internship_start_date, internship_end_date, duration_weeks,
                mentor_name, mentor_email, internship_location, company_name, performance_rating,
                skills_acquired, project_title, certificate_id, date_of_issue, remarks,
                certificate_status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17,
                    $18, $19, $20, $21, $22)
            RETURNING {}
            "#,
            STUDENT_COLUMNS
        );

        let mut tx = self.pool.begin().await?;
        let mut saved = Vec::with_capacity(students.len());
        for student in students {
            let record = sqlx::query_as::<_, StudentRecord>(&sql)
                .bind(Uuid::new_v4())
                .bind(&student.student_name)
                .bind(&student.roll_number)
                .bind(&student.branch)
                .bind(&student.college_name)
                .bind(&student.email)
                .bind(&student.phone_number)
                .bind(&student.internship_name)
                .bind(student.internship_start_date)
                .bind(student.internship_end_date)
                .bind(student.duration_weeks)
                .bind(&student.mentor_name)
                .bind(&student.mentor_email)
                .bind(&student.internship_location)
                .bind(&student.company_name)
                .bind(&student.performance_rating)
                .bind(&student.skills_acquired)
                .bind(&student.project_title)
                .bind(&student.certificate_id)
                .bind(student.date_of_issue)
                .bind(&student.remarks)
                .bind(student.certificate_status.as_str())
                .fetch_one(&mut *tx)
                .await?;
            saved.push(record);
        }
        // Dropping `tx` on an early return rolls the whole window back.
        tx.commit().await?;
        Ok(saved)
    }

    async fn update_certificate_status(
        &self,
        student_id: Uuid,
        status: CertificateStatus,
    ) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE students SET certificate_status = $1 WHERE id = $2")
            .bind(status.as_str())
            .bind(student_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("student {}", student_id)));
        }
        Ok(())
    }

    async fn count_students(&self) -> Result<i64, StoreError> {
        Ok(sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM students")
            .fetch_one(&self.pool)
            .await?)
    }

    async fn certificate_status_counts(
        &self,
    ) -> Result<Vec<(CertificateStatus, i64)>, StoreError> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            "SELECT certificate_status, COUNT(*) FROM students GROUP BY certificate_status ORDER BY certificate_status",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(status, count)| {
                status
                    .parse::<CertificateStatus>()
                    .map(|status| (status, count))
                    .map_err(|e| StoreError::Database(e.to_string()))
            })
            .collect()
    }

    async fn create_batch(&self, batch: &BatchUpload) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO batch_uploads (
                id, filename, total_records, processed_records, successful_records,
                failed_records, status, error_details, uploaded_by, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(batch.id)
        .bind(&batch.filename)
        .bind(batch.total_records)
        .bind(batch.processed_records)
        .bind(batch.successful_records)
        .bind(batch.failed_records)
        .bind(batch.status.as_str())
        .bind(&batch.error_details)
        .bind(&batch.uploaded_by)
        .bind(batch.created_at)
        .bind(batch.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn load_batch(&self, batch_id: Uuid) -> Result<Option<BatchUpload>, StoreError> {
        let sql = format!("SELECT {} FROM batch_uploads WHERE id = $1", BATCH_COLUMNS);
        Ok(sqlx::query_as::<_, BatchUpload>(&sql)
            .bind(batch_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn save_batch(&self, batch: &BatchUpload) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE batch_uploads
            SET total_records = $1, processed_records = $2, successful_records = $3,
                failed_records = $4, status = $5, error_details = $6, updated_at = $7
            WHERE id = $8
            "#,
        )
        .bind(batch.total_records)
        .bind(batch.processed_records)
        .bind(batch.successful_records)
        .bind(batch.failed_records)
        .bind(batch.status.as_str())
        .bind(&batch.error_details)
        .bind(batch.updated_at)
        .bind(batch.id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("batch {}", batch.id)));
        }
        Ok(())
    }
}
