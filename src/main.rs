use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{ArgGroup, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;

mod adapter;
mod db;
mod gpa;
mod models;
mod report;

#[derive(Parser)]
#[command(name = "gpa-aggregator")]
#[command(about = "GPA and CGPA aggregation over student semester records", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load a realistic students and subjects catalog
    Seed,
    /// Import a subjects catalog from a CSV file
    ImportSubjects {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Import semester results from a legacy history JSON export
    ImportHistory {
        #[arg(long)]
        register_no: String,
        #[arg(long)]
        json: PathBuf,
    },
    /// List catalog subjects for a regulation, department and semester
    Subjects {
        #[arg(long)]
        regulation: String,
        #[arg(long)]
        department: String,
        #[arg(long)]
        semester: i32,
    },
    /// Compute and store a semester GPA from a grade sheet CSV
    Gpa {
        #[arg(long)]
        register_no: String,
        #[arg(long)]
        semester: i32,
        #[arg(long)]
        grades: PathBuf,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Aggregate a CGPA across stored semesters, or average bare GPAs
    #[command(group(
        ArgGroup::new("source")
            .args(["semesters", "gpas"])
            .multiple(false)
    ))]
    Cgpa {
        #[arg(long, required_unless_present = "gpas")]
        register_no: Option<String>,
        #[arg(long, value_delimiter = ',')]
        semesters: Option<Vec<i32>>,
        #[arg(long, value_delimiter = ',', conflicts_with = "register_no")]
        gpas: Option<Vec<f64>>,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// List stored semester records
    History {
        #[arg(long)]
        register_no: String,
    },
    /// Write a markdown report for one semester or the whole history
    Report {
        #[arg(long)]
        register_no: String,
        #[arg(long)]
        semester: Option<i32>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to the records Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::ImportSubjects { csv } => {
            let imported = db::import_subjects_csv(&pool, &csv).await?;
            println!("Imported {imported} subjects from {}.", csv.display());
        }
        Commands::ImportHistory { register_no, json } => {
            let student = db::fetch_student(&pool, &register_no).await?;
            let records = adapter::load_history_export(&json)?;
            let imported = db::store_history_records(&pool, student.id, &records).await?;
            println!(
                "Imported {imported} semester records for {}.",
                student.register_no
            );
        }
        Commands::Subjects {
            regulation,
            department,
            semester,
        } => {
            let subjects = db::fetch_subjects(&pool, &regulation, &department, semester).await?;
            if subjects.is_empty() {
                println!("No subjects in the catalog for this selection.");
                return Ok(());
            }

            println!("Subjects for regulation {regulation}, {department}, semester {semester}:");
            for subject in &subjects {
                println!(
                    "- {} {} ({} credits, {})",
                    subject.code, subject.name, subject.credits, subject.category
                );
            }
        }
        Commands::Gpa {
            register_no,
            semester,
            grades,
            out,
        } => {
            let student = db::fetch_student(&pool, &register_no).await?;
            let subjects = db::fetch_subjects(
                &pool,
                &student.regulation,
                &student.department,
                semester,
            )
            .await?;
            if subjects.is_empty() {
                bail!(
                    "no catalog subjects for regulation {}, department {}, semester {}",
                    student.regulation,
                    student.department,
                    semester
                );
            }

            let results = adapter::load_grade_sheet(&subjects, &grades)?;
            let record = gpa::compute_gpa(semester, &results)?;
            db::store_semester_record(&pool, student.id, &record, &results).await?;

            println!(
                "Semester {} GPA for {}: {:.2} ({} credits, {} grade points).",
                record.semester,
                student.register_no,
                record.gpa,
                record.total_credits,
                record.total_points
            );

            if let Some(out) = out {
                let sheet = report::grade_sheet(&student, &record, &results);
                std::fs::write(&out, sheet)?;
                println!("Grade sheet written to {}.", out.display());
            }
        }
        Commands::Cgpa {
            register_no,
            semesters,
            gpas,
            out,
        } => {
            if let Some(gpas) = gpas {
                for value in &gpas {
                    if !(0.0..=10.0).contains(value) {
                        bail!("GPA {value} is outside the 0-10 scale");
                    }
                }

                let result = gpa::compute_cgpa_from_gpas(&gpas)?;
                println!(
                    "CGPA {:.2} across {} semesters ({}).",
                    result.cgpa,
                    result.semester_count,
                    result.mode.label()
                );

                if let Some(out) = out {
                    let summary = report::cgpa_summary(None, &[], &result);
                    std::fs::write(&out, summary)?;
                    println!("Summary written to {}.", out.display());
                }
                return Ok(());
            }

            let Some(register_no) = register_no else {
                bail!("--register-no is required unless --gpas is given");
            };
            let student = db::fetch_student(&pool, &register_no).await?;

            let entries = match &semesters {
                Some(selection) => {
                    let mut seen = std::collections::HashSet::new();
                    for semester in selection {
                        if !seen.insert(*semester) {
                            bail!("semester {semester} is selected twice");
                        }
                    }

                    let entries = db::fetch_records(&pool, student.id, selection).await?;
                    for semester in selection {
                        if !entries.iter().any(|entry| entry.semester == *semester) {
                            bail!("no stored record for semester {semester}; compute its GPA first");
                        }
                    }
                    entries
                }
                None => db::fetch_history(&pool, student.id).await?,
            };

            let records: Vec<_> = entries.iter().map(models::HistoryEntry::as_record).collect();
            let result = gpa::compute_cgpa(&records)?;

            match (result.total_credits, result.total_points) {
                (Some(credits), Some(points)) => println!(
                    "CGPA {:.2} across {} semesters ({} credits, {} grade points; {}).",
                    result.cgpa,
                    result.semester_count,
                    credits,
                    points,
                    result.mode.label()
                ),
                _ => println!(
                    "CGPA {:.2} across {} semesters ({}).",
                    result.cgpa,
                    result.semester_count,
                    result.mode.label()
                ),
            }

            if let Some(out) = out {
                let summary = report::cgpa_summary(Some(&student), &entries, &result);
                std::fs::write(&out, summary)?;
                println!("Summary written to {}.", out.display());
            }
        }
        Commands::History { register_no } => {
            let student = db::fetch_student(&pool, &register_no).await?;
            let entries = db::fetch_history(&pool, student.id).await?;

            if entries.is_empty() {
                println!("No semester records stored for {}.", student.register_no);
                return Ok(());
            }

            println!(
                "Semester records for {} ({}):",
                student.full_name, student.register_no
            );
            for entry in &entries {
                println!(
                    "- semester {}: GPA {:.2} ({} credits, {} grade points, computed {})",
                    entry.semester,
                    entry.gpa,
                    entry.total_credits,
                    entry.total_points,
                    entry.created_at.format("%Y-%m-%d")
                );
            }
        }
        Commands::Report {
            register_no,
            semester,
            out,
        } => {
            let student = db::fetch_student(&pool, &register_no).await?;

            let document = match semester {
                Some(semester) => {
                    let entries = db::fetch_records(&pool, student.id, &[semester]).await?;
                    let entry = entries
                        .first()
                        .with_context(|| format!("no stored record for semester {semester}"))?;
                    let rows = db::fetch_grade_entries(&pool, student.id, semester).await?;
                    report::grade_sheet(&student, &entry.as_record(), &rows)
                }
                None => {
                    let entries = db::fetch_history(&pool, student.id).await?;
                    let records: Vec<_> =
                        entries.iter().map(models::HistoryEntry::as_record).collect();
                    let result = gpa::compute_cgpa(&records)?;
                    report::cgpa_summary(Some(&student), &entries, &result)
                }
            };

            std::fs::write(&out, document)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
