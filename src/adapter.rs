use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{bail, Context};
use serde::Deserialize;

use crate::models::{SemesterRecord, Subject, SubjectResult};

#[derive(Debug, Deserialize)]
struct GradeSheetRow {
    code: String,
    grade: Option<String>,
}

/// Legacy history export row. The deployed backend renamed these fields
/// across revisions, so every observed spelling is accepted here and
/// normalized before anything reaches the engine.
#[derive(Debug, Deserialize)]
struct HistoryExportRow {
    #[serde(alias = "Semester", alias = "sem")]
    semester: i32,
    #[serde(alias = "GPA", alias = "result", alias = "cgpa")]
    gpa: f64,
    #[serde(alias = "totalCredits", alias = "credits")]
    total_credits: f64,
    #[serde(alias = "totalPoints", alias = "points")]
    total_points: f64,
}

/// Reads a `code,grade` CSV and joins it against the catalog subjects for
/// the semester, producing one [`SubjectResult`] per catalog subject.
/// Catalog subjects missing from the sheet stay ungraded and are later
/// excluded by the engine; sheet rows naming unknown subjects are an error.
pub fn load_grade_sheet(subjects: &[Subject], csv_path: &Path) -> anyhow::Result<Vec<SubjectResult>> {
    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open grade sheet {}", csv_path.display()))?;

    let mut rows = Vec::new();
    for result in reader.deserialize::<GradeSheetRow>() {
        rows.push(result.with_context(|| format!("malformed row in {}", csv_path.display()))?);
    }

    attach_grades(subjects, rows)
}

fn attach_grades(subjects: &[Subject], rows: Vec<GradeSheetRow>) -> anyhow::Result<Vec<SubjectResult>> {
    for subject in subjects {
        if subject.credits <= 0.0 {
            bail!(
                "catalog subject {} carries non-positive credits {}",
                subject.code,
                subject.credits
            );
        }
    }

    let mut grades: std::collections::HashMap<String, Option<String>> =
        std::collections::HashMap::new();

    for row in rows {
        let code = row.code.trim().to_string();
        if code.is_empty() {
            bail!("grade sheet row with an empty subject code");
        }
        if !subjects.iter().any(|subject| subject.code == code) {
            bail!("subject {code} is not in the catalog for this semester");
        }
        if grades.insert(code.clone(), row.grade).is_some() {
            bail!("subject {code} appears twice in the grade sheet");
        }
    }

    Ok(subjects
        .iter()
        .map(|subject| SubjectResult {
            code: subject.code.clone(),
            name: subject.name.clone(),
            credits: subject.credits,
            grade: grades.get(&subject.code).cloned().flatten(),
        })
        .collect())
}

/// Reads a legacy history JSON export (an array of semester results) and
/// normalizes it into canonical records.
pub fn load_history_export(json_path: &Path) -> anyhow::Result<Vec<SemesterRecord>> {
    let file = File::open(json_path)
        .with_context(|| format!("failed to open history export {}", json_path.display()))?;
    let rows: Vec<HistoryExportRow> = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("malformed history export {}", json_path.display()))?;

    normalize_history_rows(rows)
}

fn normalize_history_rows(rows: Vec<HistoryExportRow>) -> anyhow::Result<Vec<SemesterRecord>> {
    let mut seen: std::collections::HashSet<i32> = std::collections::HashSet::new();
    let mut records = Vec::with_capacity(rows.len());

    for row in rows {
        if row.semester < 1 {
            bail!("history export names semester {}, expected 1 or above", row.semester);
        }
        if !seen.insert(row.semester) {
            bail!("history export lists semester {} twice", row.semester);
        }
        if row.total_credits <= 0.0 {
            bail!(
                "semester {}: total credits {} must be positive",
                row.semester,
                row.total_credits
            );
        }
        if row.total_points < 0.0 {
            bail!(
                "semester {}: total grade points {} must not be negative",
                row.semester,
                row.total_points
            );
        }
        if !(0.0..=10.0).contains(&row.gpa) {
            bail!("semester {}: GPA {} is outside the 0-10 scale", row.semester, row.gpa);
        }

        records.push(SemesterRecord {
            semester: row.semester,
            gpa: row.gpa,
            total_credits: row.total_credits,
            total_points: row.total_points,
        });
    }

    Ok(records)
}
