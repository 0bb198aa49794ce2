use std::fmt::Write;

use crate::models::{CgpaResult, Grade, HistoryEntry, SemesterRecord, Student, SubjectResult};

/// Formats one semester's grade sheet. GPA is rounded to two decimals here,
/// at the presentation boundary; credit and point totals are the engine's
/// values verbatim.
pub fn grade_sheet(student: &Student, record: &SemesterRecord, rows: &[SubjectResult]) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Semester {} Grade Sheet", record.semester);
    let _ = writeln!(
        output,
        "{} ({}), {} department, regulation {}",
        student.full_name, student.register_no, student.department, student.regulation
    );
    let _ = writeln!(output);

    if rows.is_empty() {
        let _ = writeln!(output, "No subject rows stored for this semester.");
    } else {
        let _ = writeln!(output, "| Code | Subject | Credits | Grade |");
        let _ = writeln!(output, "|------|---------|---------|-------|");
        for row in rows {
            let _ = writeln!(
                output,
                "| {} | {} | {} | {} |",
                row.code,
                row.name,
                row.credits,
                display_grade(row)
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "GPA: {:.2}", record.gpa);
    let _ = writeln!(output, "Total credits: {}", record.total_credits);
    let _ = writeln!(output, "Total grade points: {}", record.total_points);

    output
}

/// Formats the CGPA summary. The aggregation mode is always named so a
/// credit-weighted result cannot be mistaken for the plain-average fallback.
pub fn cgpa_summary(
    student: Option<&Student>,
    entries: &[HistoryEntry],
    result: &CgpaResult,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Cumulative Grade Point Average");
    if let Some(student) = student {
        let _ = writeln!(
            output,
            "{} ({}), {} department, regulation {}",
            student.full_name, student.register_no, student.department, student.regulation
        );
    }
    let _ = writeln!(output);

    if !entries.is_empty() {
        let _ = writeln!(output, "| Semester | GPA | Credits | Grade points | Computed |");
        let _ = writeln!(output, "|----------|-----|---------|--------------|----------|");
        for entry in entries {
            let _ = writeln!(
                output,
                "| {} | {:.2} | {} | {} | {} |",
                entry.semester,
                entry.gpa,
                entry.total_credits,
                entry.total_points,
                entry.created_at.format("%Y-%m-%d")
            );
        }
        let _ = writeln!(output);
    }

    let _ = writeln!(output, "CGPA: {:.2} ({})", result.cgpa, result.mode.label());
    if let (Some(credits), Some(points)) = (result.total_credits, result.total_points) {
        let _ = writeln!(output, "Total credits: {}", credits);
        let _ = writeln!(output, "Total grade points: {}", points);
    }
    let _ = writeln!(output, "Semesters counted: {}", result.semester_count);

    output
}

fn display_grade(row: &SubjectResult) -> &str {
    match row.grade.as_deref().map(str::trim) {
        None | Some("") => "-",
        Some(symbol) => Grade::from_symbol(symbol).map(Grade::symbol).unwrap_or(symbol),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpa;
    use crate::models::CgpaMode;
    use chrono::Utc;

    fn student() -> Student {
        Student {
            id: uuid::Uuid::new_v4(),
            register_no: "2021115001".to_string(),
            full_name: "Priya Raghavan".to_string(),
            department: "CSE".to_string(),
            regulation: "2021".to_string(),
        }
    }

    fn subject(code: &str, credits: f64, grade: Option<&str>) -> SubjectResult {
        SubjectResult {
            code: code.to_string(),
            name: format!("{code} test subject"),
            credits,
            grade: grade.map(str::to_string),
        }
    }

    #[test]
    fn grade_sheet_carries_engine_numbers_verbatim() {
        let rows = vec![
            subject("CS3301", 3.0, Some("O")),
            subject("CS3351", 4.0, Some("B")),
        ];
        let record = gpa::compute_gpa(3, &rows).unwrap();

        let sheet = grade_sheet(&student(), &record, &rows);

        assert!(sheet.contains("GPA: 7.71"));
        assert!(sheet.contains("Total credits: 7"));
        assert!(sheet.contains("Total grade points: 54"));
        assert!(sheet.contains("| CS3301 |"));
    }

    #[test]
    fn grade_sheet_canonicalizes_symbols_and_marks_ungraded() {
        let rows = vec![
            subject("CS3301", 3.0, Some("b+")),
            subject("CS3351", 4.0, None),
            subject("CS3352", 3.0, Some("O")),
        ];
        let record = gpa::compute_gpa(3, &rows).unwrap();

        let sheet = grade_sheet(&student(), &record, &rows);

        assert!(sheet.contains("| B+ |"));
        assert!(sheet.contains("| - |"));
    }

    #[test]
    fn cgpa_summary_names_the_weighted_mode() {
        let entries = vec![
            HistoryEntry {
                semester: 1,
                gpa: 9.0,
                total_credits: 20.0,
                total_points: 180.0,
                created_at: Utc::now(),
            },
            HistoryEntry {
                semester: 2,
                gpa: 9.0,
                total_credits: 18.0,
                total_points: 162.0,
                created_at: Utc::now(),
            },
        ];
        let records: Vec<_> = entries.iter().map(HistoryEntry::as_record).collect();
        let result = gpa::compute_cgpa(&records).unwrap();

        let summary = cgpa_summary(Some(&student()), &entries, &result);

        assert!(summary.contains("CGPA: 9.00 (credit-weighted)"));
        assert!(summary.contains("Total credits: 38"));
        assert!(summary.contains("Total grade points: 342"));
    }

    #[test]
    fn cgpa_summary_labels_the_fallback_and_omits_totals() {
        let result = gpa::compute_cgpa_from_gpas(&[8.0, 9.0]).unwrap();

        let summary = cgpa_summary(None, &[], &result);

        assert!(summary.contains("CGPA: 8.50 (average of semester GPAs)"));
        assert!(!summary.contains("Total credits"));
        assert_eq!(result.mode, CgpaMode::GpaAverage);
    }
}
