use thiserror::Error;

use crate::models::{CgpaMode, CgpaResult, Grade, SemesterRecord, SubjectResult};

/// Validation failures of the aggregation engine. Callers surface these
/// verbatim; the engine never retries and never partially succeeds.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GpaError {
    #[error("unrecognized grade '{symbol}' for subject {subject}")]
    InvalidGrade { subject: String, symbol: String },

    #[error("no graded subjects to average in semester {semester}")]
    NoGradedSubjects { semester: i32 },

    #[error("no semesters selected for CGPA aggregation")]
    NoSemestersSelected,
}

/// Credit-weighted GPA over one semester's subject results.
///
/// Entries with an unset or empty grade field, and entries graded with the
/// not-offered sentinel, are excluded from both sums: they do not count as
/// zero and do not block the rest. A symbol missing from the grade table
/// fails with [`GpaError::InvalidGrade`] naming the subject. If nothing is
/// left after filtering the call fails with [`GpaError::NoGradedSubjects`]
/// rather than dividing by zero.
///
/// The returned GPA is unrounded; display rounding to two decimals belongs
/// to the presentation boundary. Credits are assumed positive, which the
/// adapter boundary enforces before results reach this function.
pub fn compute_gpa(semester: i32, subjects: &[SubjectResult]) -> Result<SemesterRecord, GpaError> {
    let mut total_credits = 0.0;
    let mut total_points = 0.0;
    let mut counted = 0usize;

    for subject in subjects {
        let Some(symbol) = assigned_symbol(subject) else {
            continue;
        };

        let grade = Grade::from_symbol(symbol).ok_or_else(|| GpaError::InvalidGrade {
            subject: subject.code.clone(),
            symbol: symbol.to_string(),
        })?;

        let Some(points) = grade.points() else {
            continue;
        };

        total_credits += subject.credits;
        total_points += subject.credits * f64::from(points);
        counted += 1;
    }

    if counted == 0 {
        return Err(GpaError::NoGradedSubjects { semester });
    }

    Ok(SemesterRecord {
        semester,
        gpa: total_points / total_credits,
        total_credits,
        total_points,
    })
}

/// Point-weighted CGPA, the primary mode: sums each record's own credit and
/// point totals and divides once. Never aggregates the rounded display GPA,
/// so rounding error cannot compound across semesters. Callers supply
/// records for distinct semesters; an empty selection fails with
/// [`GpaError::NoSemestersSelected`].
pub fn compute_cgpa(records: &[SemesterRecord]) -> Result<CgpaResult, GpaError> {
    if records.is_empty() {
        return Err(GpaError::NoSemestersSelected);
    }

    let total_credits: f64 = records.iter().map(|record| record.total_credits).sum();
    let total_points: f64 = records.iter().map(|record| record.total_points).sum();

    Ok(CgpaResult {
        cgpa: total_points / total_credits,
        semester_count: records.len(),
        total_credits: Some(total_credits),
        total_points: Some(total_points),
        mode: CgpaMode::PointWeighted,
    })
}

/// Fallback CGPA for when only rounded per-semester GPAs survive (e.g.
/// values copied from a history display): an unweighted mean. Diverges from
/// the point-weighted mode whenever credit loads differ between semesters,
/// so results carry [`CgpaMode::GpaAverage`] and consumers must label it.
pub fn compute_cgpa_from_gpas(gpas: &[f64]) -> Result<CgpaResult, GpaError> {
    if gpas.is_empty() {
        return Err(GpaError::NoSemestersSelected);
    }

    Ok(CgpaResult {
        cgpa: gpas.iter().sum::<f64>() / gpas.len() as f64,
        semester_count: gpas.len(),
        total_credits: None,
        total_points: None,
        mode: CgpaMode::GpaAverage,
    })
}

fn assigned_symbol(subject: &SubjectResult) -> Option<&str> {
    subject
        .grade
        .as_deref()
        .map(str::trim)
        .filter(|symbol| !symbol.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subject(code: &str, credits: f64, grade: Option<&str>) -> SubjectResult {
        SubjectResult {
            code: code.to_string(),
            name: format!("{code} test subject"),
            credits,
            grade: grade.map(str::to_string),
        }
    }

    fn record(semester: i32, total_credits: f64, total_points: f64) -> SemesterRecord {
        SemesterRecord {
            semester,
            gpa: total_points / total_credits,
            total_credits,
            total_points,
        }
    }

    #[test]
    fn single_outstanding_subject_hits_the_ceiling() {
        let record = compute_gpa(1, &[subject("MA3151", 4.0, Some("O"))]).unwrap();

        assert_eq!(record.gpa, 10.0);
        assert_eq!(record.total_credits, 4.0);
        assert_eq!(record.total_points, 40.0);
    }

    #[test]
    fn gpa_weights_points_by_credits() {
        let subjects = vec![
            subject("CS3301", 3.0, Some("O")),
            subject("CS3351", 4.0, Some("B")),
        ];

        let record = compute_gpa(3, &subjects).unwrap();

        assert_eq!(record.total_points, 54.0);
        assert_eq!(record.total_credits, 7.0);
        assert_eq!(format!("{:.2}", record.gpa), "7.71");
    }

    #[test]
    fn gpa_stays_on_the_zero_to_ten_scale() {
        let mixed = vec![
            subject("CS3301", 4.0, Some("O")),
            subject("CS3351", 3.0, Some("U")),
            subject("CS3352", 2.0, Some("C")),
        ];
        let all_failed = vec![subject("CS3301", 4.0, Some("U"))];

        for subjects in [mixed, all_failed] {
            let record = compute_gpa(3, &subjects).unwrap();
            assert!(record.gpa >= 0.0 && record.gpa <= 10.0, "gpa {}", record.gpa);
        }
    }

    #[test]
    fn reordering_subjects_changes_nothing() {
        let forward = vec![
            subject("CS3301", 3.0, Some("A+")),
            subject("CS3351", 4.0, Some("B")),
            subject("CS3352", 1.5, Some("O")),
        ];
        let mut reversed = forward.clone();
        reversed.reverse();

        let a = compute_gpa(3, &forward).unwrap();
        let b = compute_gpa(3, &reversed).unwrap();

        assert_eq!(a.gpa.to_bits(), b.gpa.to_bits());
        assert_eq!(a.total_credits, b.total_credits);
        assert_eq!(a.total_points, b.total_points);
    }

    #[test]
    fn repeated_calls_are_bit_identical() {
        let subjects = vec![
            subject("CS3301", 3.0, Some("A")),
            subject("CS3351", 4.0, Some("B+")),
        ];

        let a = compute_gpa(3, &subjects).unwrap();
        let b = compute_gpa(3, &subjects).unwrap();

        assert_eq!(a.gpa.to_bits(), b.gpa.to_bits());
        assert_eq!(a, b);
    }

    #[test]
    fn ungraded_subjects_match_omitting_them() {
        let with_ungraded = vec![
            subject("CS3301", 3.0, Some("O")),
            subject("CS3351", 4.0, None),
            subject("CS3352", 2.0, Some("")),
            subject("CS3391", 2.0, Some("  ")),
        ];
        let omitted = vec![subject("CS3301", 3.0, Some("O"))];

        let a = compute_gpa(3, &with_ungraded).unwrap();
        let b = compute_gpa(3, &omitted).unwrap();

        assert_eq!(a, b);
    }

    #[test]
    fn not_offered_is_excluded_while_fail_counts_zero() {
        let with_sentinel = vec![
            subject("CS3301", 4.0, Some("NA")),
            subject("CS3351", 3.0, Some("O")),
        ];
        let with_fail = vec![
            subject("CS3301", 4.0, Some("U")),
            subject("CS3351", 3.0, Some("O")),
        ];

        let excluded = compute_gpa(3, &with_sentinel).unwrap();
        assert_eq!(excluded.total_credits, 3.0);
        assert_eq!(excluded.total_points, 30.0);
        assert_eq!(excluded.gpa, 10.0);

        let counted = compute_gpa(3, &with_fail).unwrap();
        assert_eq!(counted.total_credits, 7.0);
        assert_eq!(counted.total_points, 30.0);
        assert!(counted.gpa < excluded.gpa);
    }

    #[test]
    fn empty_input_is_rejected() {
        let err = compute_gpa(5, &[]).unwrap_err();
        assert_eq!(err, GpaError::NoGradedSubjects { semester: 5 });
    }

    #[test]
    fn fully_ungraded_input_is_rejected() {
        let subjects = vec![
            subject("CS3301", 3.0, None),
            subject("CS3351", 4.0, Some("")),
            subject("CS3352", 2.0, Some("NA")),
        ];

        let err = compute_gpa(3, &subjects).unwrap_err();
        assert_eq!(err, GpaError::NoGradedSubjects { semester: 3 });
    }

    #[test]
    fn unknown_symbol_names_the_subject() {
        let err = compute_gpa(3, &[subject("CS3301", 3.0, Some("X"))]).unwrap_err();

        assert_eq!(
            err,
            GpaError::InvalidGrade {
                subject: "CS3301".to_string(),
                symbol: "X".to_string(),
            }
        );
        assert!(err.to_string().contains("CS3301"));
    }

    #[test]
    fn cgpa_sums_stored_totals() {
        let records = vec![record(1, 20.0, 180.0), record(2, 18.0, 162.0)];

        let result = compute_cgpa(&records).unwrap();

        assert_eq!(result.cgpa, 9.0);
        assert_eq!(result.total_credits, Some(38.0));
        assert_eq!(result.total_points, Some(342.0));
        assert_eq!(result.semester_count, 2);
        assert_eq!(result.mode, CgpaMode::PointWeighted);
    }

    #[test]
    fn cgpa_over_no_semesters_is_rejected() {
        assert_eq!(compute_cgpa(&[]).unwrap_err(), GpaError::NoSemestersSelected);
        assert_eq!(
            compute_cgpa_from_gpas(&[]).unwrap_err(),
            GpaError::NoSemestersSelected
        );
    }

    #[test]
    fn fallback_averages_the_given_gpas() {
        let result = compute_cgpa_from_gpas(&[8.0, 9.0]).unwrap();

        assert_eq!(result.cgpa, 8.5);
        assert_eq!(result.semester_count, 2);
        assert_eq!(result.total_credits, None);
        assert_eq!(result.total_points, None);
        assert_eq!(result.mode, CgpaMode::GpaAverage);
    }

    #[test]
    fn modes_diverge_when_credit_loads_differ() {
        // Semester GPAs are 8.00 and 9.00 either way, but the credit loads
        // are 30 versus 10.
        let records = vec![record(1, 30.0, 240.0), record(2, 10.0, 90.0)];

        let weighted = compute_cgpa(&records).unwrap();
        let averaged = compute_cgpa_from_gpas(&[8.0, 9.0]).unwrap();

        assert_eq!(weighted.cgpa, 8.25);
        assert_eq!(averaged.cgpa, 8.5);
        assert_ne!(weighted.cgpa, averaged.cgpa);
    }

    #[test]
    fn cgpa_equals_one_flat_gpa_over_all_subjects() {
        let third = vec![
            subject("CS3301", 4.0, Some("O")),
            subject("CS3351", 3.0, Some("B+")),
            subject("CS3352", 3.0, Some("C")),
        ];
        let fourth = vec![
            subject("CS3401", 4.0, Some("A")),
            subject("CS3452", 3.0, Some("B")),
        ];

        let per_semester = vec![
            compute_gpa(3, &third).unwrap(),
            compute_gpa(4, &fourth).unwrap(),
        ];
        let aggregated = compute_cgpa(&per_semester).unwrap();

        let union: Vec<SubjectResult> = third.into_iter().chain(fourth).collect();
        let flat = compute_gpa(0, &union).unwrap();

        assert_eq!(aggregated.cgpa, flat.gpa);
        assert_eq!(aggregated.total_credits, Some(flat.total_credits));
        assert_eq!(aggregated.total_points, Some(flat.total_points));
    }
}
