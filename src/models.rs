use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Letter grades on the 0-10 point scale, plus the not-offered sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grade {
    O,
    APlus,
    A,
    BPlus,
    B,
    C,
    /// Fail/reappear ("U", older regulations wrote "RA"). Counts as zero
    /// points with its credits still in the denominator.
    U,
    /// "NA": subject not offered or no grade assigned. Excluded from both
    /// the credit and the point sums, never treated as zero.
    NotOffered,
}

impl Grade {
    /// Looks a symbol up in the static grade table. Trims and ignores case;
    /// anything not in the table is `None` and must be rejected by the
    /// caller, not coerced to zero.
    pub fn from_symbol(symbol: &str) -> Option<Grade> {
        match symbol.trim().to_ascii_uppercase().as_str() {
            "O" => Some(Grade::O),
            "A+" => Some(Grade::APlus),
            "A" => Some(Grade::A),
            "B+" => Some(Grade::BPlus),
            "B" => Some(Grade::B),
            "C" => Some(Grade::C),
            "U" | "RA" => Some(Grade::U),
            "NA" => Some(Grade::NotOffered),
            _ => None,
        }
    }

    /// Grade points for counted grades; `None` for the not-offered sentinel.
    pub fn points(self) -> Option<u8> {
        match self {
            Grade::O => Some(10),
            Grade::APlus => Some(9),
            Grade::A => Some(8),
            Grade::BPlus => Some(7),
            Grade::B => Some(6),
            Grade::C => Some(5),
            Grade::U => Some(0),
            Grade::NotOffered => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Grade::O => "O",
            Grade::APlus => "A+",
            Grade::A => "A",
            Grade::BPlus => "B+",
            Grade::B => "B",
            Grade::C => "C",
            Grade::U => "U",
            Grade::NotOffered => "NA",
        }
    }
}

/// One evaluated subject within a semester. The grade is kept as the raw
/// submitted symbol; the engine resolves it against the grade table so an
/// unknown symbol fails there with the subject named.
#[derive(Debug, Clone)]
pub struct SubjectResult {
    pub code: String,
    pub name: String,
    pub credits: f64,
    pub grade: Option<String>,
}

/// Output of one GPA computation. `gpa` keeps full precision; rounding to
/// two decimals happens only where values are displayed.
#[derive(Debug, Clone, PartialEq)]
pub struct SemesterRecord {
    pub semester: i32,
    pub gpa: f64,
    pub total_credits: f64,
    pub total_points: f64,
}

/// A stored semester record as listed by the history view.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub semester: i32,
    pub gpa: f64,
    pub total_credits: f64,
    pub total_points: f64,
    pub created_at: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn as_record(&self) -> SemesterRecord {
        SemesterRecord {
            semester: self.semester,
            gpa: self.gpa,
            total_credits: self.total_credits,
            total_points: self.total_points,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CgpaMode {
    /// Sums per-semester credit and point totals. The primary mode.
    PointWeighted,
    /// Plain mean of rounded semester GPAs, for when only those survive.
    GpaAverage,
}

impl CgpaMode {
    pub fn label(self) -> &'static str {
        match self {
            CgpaMode::PointWeighted => "credit-weighted",
            CgpaMode::GpaAverage => "average of semester GPAs",
        }
    }
}

/// CGPA over a selection of semesters. Totals are absent in
/// `CgpaMode::GpaAverage` because the fallback never sees them.
#[derive(Debug, Clone)]
pub struct CgpaResult {
    pub cgpa: f64,
    pub semester_count: usize,
    pub total_credits: Option<f64>,
    pub total_points: Option<f64>,
    pub mode: CgpaMode,
}

#[derive(Debug, Clone)]
pub struct Student {
    pub id: Uuid,
    pub register_no: String,
    pub full_name: String,
    pub department: String,
    pub regulation: String,
}

/// One catalog row for a (regulation, department, semester).
#[derive(Debug, Clone)]
pub struct Subject {
    pub code: String,
    pub name: String,
    pub credits: f64,
    pub category: String,
}
