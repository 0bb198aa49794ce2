use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::{HistoryEntry, SemesterRecord, Student, Subject, SubjectResult};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let students = vec![
        (
            Uuid::parse_str("7c9e4d26-5b1a-4e5f-9c3d-2f8b41e6a701")?,
            "2021115001",
            "Priya Raghavan",
            "CSE",
            "2021",
        ),
        (
            Uuid::parse_str("3f2b8d14-9c6e-47a2-b5d8-61a09e7c4f12")?,
            "2021115014",
            "Arun Chandran",
            "CSE",
            "2021",
        ),
        (
            Uuid::parse_str("b45a71c8-2d3f-4096-8e1b-97c054d2a6e3")?,
            "2021117032",
            "Meera Krishnan",
            "IT",
            "2021",
        ),
    ];

    for (id, register_no, full_name, department, regulation) in students {
        sqlx::query(
            r#"
            INSERT INTO academic_records.students (id, register_no, full_name, department, regulation)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (register_no) DO UPDATE
            SET full_name = EXCLUDED.full_name,
                department = EXCLUDED.department,
                regulation = EXCLUDED.regulation
            "#,
        )
        .bind(id)
        .bind(register_no)
        .bind(full_name)
        .bind(department)
        .bind(regulation)
        .execute(pool)
        .await?;
    }

    let subjects = vec![
        (3, "MA3354", "Discrete Mathematics", 4.0, "theory"),
        (3, "CS3351", "Digital Principles and Computer Organization", 4.0, "theory"),
        (3, "CS3352", "Foundations of Data Science", 3.0, "theory"),
        (3, "CS3301", "Data Structures", 3.0, "theory"),
        (3, "CS3391", "Object Oriented Programming", 3.0, "theory"),
        (3, "CS3311", "Data Structures Laboratory", 1.5, "laboratory"),
        (3, "CS3381", "Object Oriented Programming Laboratory", 1.5, "laboratory"),
        (3, "GE3361", "Professional Development", 1.0, "laboratory"),
        (4, "CS3452", "Theory of Computation", 3.0, "theory"),
        (4, "CS3491", "Artificial Intelligence and Machine Learning", 4.0, "theory"),
        (4, "CS3492", "Database Management Systems", 3.0, "theory"),
        (4, "CS3401", "Algorithms", 4.0, "theory"),
        (4, "CS3451", "Introduction to Operating Systems", 3.0, "theory"),
        (4, "GE3451", "Environmental Sciences and Sustainability", 2.0, "theory"),
    ];

    for (semester, code, name, credits, category) in subjects {
        sqlx::query(
            r#"
            INSERT INTO academic_records.subjects
            (id, regulation, department, semester, code, name, credits, category)
            VALUES ($1, '2021', 'CSE', $2, $3, $4, $5, $6)
            ON CONFLICT (regulation, department, semester, code) DO UPDATE
            SET name = EXCLUDED.name,
                credits = EXCLUDED.credits,
                category = EXCLUDED.category
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(semester)
        .bind(code)
        .bind(name)
        .bind(credits)
        .bind(category)
        .execute(pool)
        .await?;
    }

    Ok(())
}

pub async fn fetch_student(pool: &PgPool, register_no: &str) -> anyhow::Result<Student> {
    let row = sqlx::query(
        "SELECT id, register_no, full_name, department, regulation \
         FROM academic_records.students WHERE register_no = $1",
    )
    .bind(register_no)
    .fetch_optional(pool)
    .await?
    .with_context(|| format!("no student registered as {register_no}"))?;

    Ok(Student {
        id: row.get("id"),
        register_no: row.get("register_no"),
        full_name: row.get("full_name"),
        department: row.get("department"),
        regulation: row.get("regulation"),
    })
}

pub async fn fetch_subjects(
    pool: &PgPool,
    regulation: &str,
    department: &str,
    semester: i32,
) -> anyhow::Result<Vec<Subject>> {
    let rows = sqlx::query(
        "SELECT code, name, credits, category \
         FROM academic_records.subjects \
         WHERE regulation = $1 AND department = $2 AND semester = $3 \
         ORDER BY code",
    )
    .bind(regulation)
    .bind(department)
    .bind(semester)
    .fetch_all(pool)
    .await?;

    let mut subjects = Vec::new();
    for row in rows {
        subjects.push(Subject {
            code: row.get("code"),
            name: row.get("name"),
            credits: row.get("credits"),
            category: row.get("category"),
        });
    }

    Ok(subjects)
}

pub async fn import_subjects_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        regulation: String,
        department: String,
        semester: i32,
        code: String,
        name: String,
        credits: f64,
        category: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut imported = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        if row.semester < 1 {
            bail!("subject {}: semester {} must be 1 or above", row.code, row.semester);
        }
        if row.credits <= 0.0 {
            bail!("subject {}: credits {} must be positive", row.code, row.credits);
        }
        if row.code.trim().is_empty() {
            bail!("subject row with an empty code in {}", csv_path.display());
        }

        sqlx::query(
            r#"
            INSERT INTO academic_records.subjects
            (id, regulation, department, semester, code, name, credits, category)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (regulation, department, semester, code) DO UPDATE
            SET name = EXCLUDED.name,
                credits = EXCLUDED.credits,
                category = EXCLUDED.category
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(row.regulation.trim())
        .bind(row.department.trim())
        .bind(row.semester)
        .bind(row.code.trim())
        .bind(row.name.trim())
        .bind(row.credits)
        .bind(row.category.as_deref().unwrap_or("theory"))
        .execute(pool)
        .await?;

        imported += 1;
    }

    Ok(imported)
}

/// Stores one computed semester record with its per-subject grade rows.
/// Recomputing a semester replaces the previous record and all of its rows;
/// the history stays one row per (student, semester).
pub async fn store_semester_record(
    pool: &PgPool,
    student_id: Uuid,
    record: &SemesterRecord,
    results: &[SubjectResult],
) -> anyhow::Result<Uuid> {
    let mut tx = pool.begin().await?;

    let record_id = upsert_record(&mut tx, student_id, record).await?;

    sqlx::query("DELETE FROM academic_records.grade_entries WHERE record_id = $1")
        .bind(record_id)
        .execute(&mut *tx)
        .await?;

    for result in results {
        sqlx::query(
            r#"
            INSERT INTO academic_records.grade_entries
            (id, record_id, subject_code, subject_name, credits, grade)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(record_id)
        .bind(&result.code)
        .bind(&result.name)
        .bind(result.credits)
        .bind(result.grade.as_deref())
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(record_id)
}

/// Stores imported legacy records. These carry totals only, so any grade
/// rows left over from an earlier computation of the same semester are
/// cleared rather than kept stale.
pub async fn store_history_records(
    pool: &PgPool,
    student_id: Uuid,
    records: &[SemesterRecord],
) -> anyhow::Result<usize> {
    let mut tx = pool.begin().await?;

    for record in records {
        let record_id = upsert_record(&mut tx, student_id, record).await?;
        sqlx::query("DELETE FROM academic_records.grade_entries WHERE record_id = $1")
            .bind(record_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(records.len())
}

async fn upsert_record(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    student_id: Uuid,
    record: &SemesterRecord,
) -> anyhow::Result<Uuid> {
    let record_id: Uuid = sqlx::query(
        r#"
        INSERT INTO academic_records.semester_records
        (id, student_id, semester, gpa, total_credits, total_points, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, now())
        ON CONFLICT (student_id, semester) DO UPDATE
        SET gpa = EXCLUDED.gpa,
            total_credits = EXCLUDED.total_credits,
            total_points = EXCLUDED.total_points,
            created_at = now()
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(student_id)
    .bind(record.semester)
    .bind(record.gpa)
    .bind(record.total_credits)
    .bind(record.total_points)
    .fetch_one(&mut **tx)
    .await?
    .get("id");

    Ok(record_id)
}

pub async fn fetch_history(pool: &PgPool, student_id: Uuid) -> anyhow::Result<Vec<HistoryEntry>> {
    let rows = sqlx::query(
        "SELECT semester, gpa, total_credits, total_points, created_at \
         FROM academic_records.semester_records \
         WHERE student_id = $1 \
         ORDER BY semester",
    )
    .bind(student_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(history_entry).collect())
}

pub async fn fetch_records(
    pool: &PgPool,
    student_id: Uuid,
    semesters: &[i32],
) -> anyhow::Result<Vec<HistoryEntry>> {
    let rows = sqlx::query(
        "SELECT semester, gpa, total_credits, total_points, created_at \
         FROM academic_records.semester_records \
         WHERE student_id = $1 AND semester = ANY($2) \
         ORDER BY semester",
    )
    .bind(student_id)
    .bind(semesters)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(history_entry).collect())
}

fn history_entry(row: sqlx::postgres::PgRow) -> HistoryEntry {
    HistoryEntry {
        semester: row.get("semester"),
        gpa: row.get("gpa"),
        total_credits: row.get("total_credits"),
        total_points: row.get("total_points"),
        created_at: row.get::<DateTime<Utc>, _>("created_at"),
    }
}

pub async fn fetch_grade_entries(
    pool: &PgPool,
    student_id: Uuid,
    semester: i32,
) -> anyhow::Result<Vec<SubjectResult>> {
    let rows = sqlx::query(
        "SELECT ge.subject_code, ge.subject_name, ge.credits, ge.grade \
         FROM academic_records.grade_entries ge \
         JOIN academic_records.semester_records sr ON sr.id = ge.record_id \
         WHERE sr.student_id = $1 AND sr.semester = $2 \
         ORDER BY ge.subject_code",
    )
    .bind(student_id)
    .bind(semester)
    .fetch_all(pool)
    .await?;

    let mut results = Vec::new();
    for row in rows {
        results.push(SubjectResult {
            code: row.get("subject_code"),
            name: row.get("subject_name"),
            credits: row.get("credits"),
            grade: row.get::<Option<String>, _>("grade"),
        });
    }

    Ok(results)
}
