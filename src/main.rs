use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use student_roster::config::{self, Settings};
use student_roster::models::{
    DirectoryFilter, Grade, PerformanceTier, StudentDraft, StudentPatch, StudentRecord,
    TIMESTAMP_FORMAT,
};
use student_roster::report;
use student_roster::StudentManager;

#[derive(Parser)]
#[command(name = "student-roster")]
#[command(about = "Student roster dashboard for Group Scholar", long_about = None)]
struct Cli {
    /// Load the roster from a CSV export instead of the sample roster
    #[arg(long, global = true, env = "ROSTER_CSV")]
    csv: Option<PathBuf>,
    /// Write the roster to this CSV once the command finishes
    #[arg(long, global = true)]
    save: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum StatusArg {
    Excellent,
    Good,
    Average,
    NeedsImprovement,
}

impl From<StatusArg> for PerformanceTier {
    fn from(value: StatusArg) -> Self {
        match value {
            StatusArg::Excellent => PerformanceTier::Excellent,
            StatusArg::Good => PerformanceTier::Good,
            StatusArg::Average => PerformanceTier::Average,
            StatusArg::NeedsImprovement => PerformanceTier::NeedsImprovement,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List students, optionally searched and filtered
    List {
        #[arg(long, default_value = "")]
        query: String,
        #[arg(long, value_enum)]
        status: Option<StatusArg>,
        #[arg(long)]
        grade: Option<Grade>,
        #[arg(long)]
        department: Option<String>,
    },
    /// Show one student with their activity log
    Show { id: String },
    /// Register a new student
    Add {
        #[arg(long)]
        name: String,
        #[arg(long, default_value_t = 18)]
        age: i32,
        #[arg(long)]
        email: String,
        #[arg(long)]
        course: String,
        #[arg(long, default_value_t = 75.0)]
        performance: f64,
        #[arg(long)]
        attendance: Option<f64>,
        #[arg(long, default_value = "B")]
        grade: Grade,
        #[arg(long, default_value = "")]
        phone: String,
        #[arg(long, default_value = "General")]
        department: String,
        #[arg(long)]
        enrolled: Option<NaiveDate>,
    },
    /// Update fields of an existing student
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        age: Option<i32>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        course: Option<String>,
        #[arg(long)]
        department: Option<String>,
        #[arg(long)]
        grade: Option<Grade>,
        #[arg(long)]
        performance: Option<f64>,
        #[arg(long)]
        attendance: Option<f64>,
    },
    /// Delete a student
    Delete { id: String },
    /// Delete several students at once
    BulkDelete {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Append an entry to a student's activity log
    Activity {
        id: String,
        #[arg(long)]
        kind: String,
        #[arg(long)]
        description: String,
    },
    /// Print dashboard statistics
    Stats {
        #[arg(long)]
        json: bool,
    },
    /// Print the performance analysis
    Analysis {
        #[arg(long)]
        json: bool,
    },
    /// List departments present in the roster
    Departments,
    /// Import students from a CSV file
    Import { file: PathBuf },
    /// Export the roster as CSV
    Export {
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Generate a markdown report
    Report {
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Check every stored record against the admission rules
    Check,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = config::load_settings().context("failed to load roster settings")?;
    init_tracing(&settings.log_filter);

    let mut manager = load_roster(&settings, cli.csv.as_deref())?;

    match cli.command {
        Commands::List {
            query,
            status,
            grade,
            department,
        } => {
            let filter = DirectoryFilter {
                tier: status.map(PerformanceTier::from),
                grade,
                department,
            };
            let students = manager.filter(&query, &filter);
            if students.is_empty() {
                println!("No student records found matching the current criteria.");
                return Ok(());
            }

            println!("Student records ({}):", students.len());
            for student in students {
                print_summary(student);
            }
        }
        Commands::Show { id } => {
            let student = manager.get(&id)?;
            print_details(student);
        }
        Commands::Add {
            name,
            age,
            email,
            course,
            performance,
            attendance,
            grade,
            phone,
            department,
            enrolled,
        } => {
            let draft = StudentDraft {
                name,
                age,
                grade,
                email,
                performance,
                attendance,
                phone,
                course,
                department,
                enrollment_date: enrolled,
            };
            let outcome = manager.register(&draft)?;
            println!("{}", outcome.message);
        }
        Commands::Update {
            id,
            name,
            age,
            email,
            phone,
            course,
            department,
            grade,
            performance,
            attendance,
        } => {
            let patch = StudentPatch {
                name,
                age,
                email,
                phone,
                course,
                department,
                grade,
                performance,
                attendance,
            };
            if patch.is_empty() {
                println!("Nothing to update.");
                return Ok(());
            }
            let outcome = manager.amend(&id, &patch)?;
            println!("{}", outcome.message);
        }
        Commands::Delete { id } => {
            let outcome = manager.delete(&id)?;
            println!("{}", outcome.message);
        }
        Commands::BulkDelete { ids } => {
            let outcome = manager.bulk_delete(&ids)?;
            println!("{}", outcome.message);
        }
        Commands::Activity {
            id,
            kind,
            description,
        } => {
            let outcome = manager.add_activity(&id, &kind, &description)?;
            println!("{} (#{} for {id}).", outcome.message, outcome.value);
        }
        Commands::Stats { json } => match manager.statistics() {
            None => println!("No student data available."),
            Some(stats) if json => println!("{}", serde_json::to_string_pretty(&stats)?),
            Some(stats) => {
                println!("Total students: {}", stats.total_students);
                println!("Average performance: {:.1}%", stats.average_performance);
                println!("Average attendance: {:.1}%", stats.average_attendance);
                println!("Average age: {:.1}", stats.average_age);
                println!("Performance trend: {:?}", stats.performance_trend);
                println!("Top performer: {}", stats.top_performer);
                println!("Most attended: {}", stats.most_attended);
                println!("Performance distribution:");
                for (tier, count) in &stats.status_distribution {
                    println!("- {}: {count}", report::performance_label(*tier));
                }
                println!("Grade distribution:");
                for (grade, count) in &stats.grade_distribution {
                    println!("- {}: {count}", report::grade_label(*grade));
                }
                println!("Attendance distribution:");
                for (tier, count) in &stats.attendance_distribution {
                    println!("- {}: {count}", report::attendance_label(*tier));
                }
                println!("Courses:");
                for (course, count) in &stats.course_distribution {
                    println!("- {course}: {count}");
                }
            }
        },
        Commands::Analysis { json } => match manager.performance_analysis() {
            None => println!("No student data available."),
            Some(analysis) if json => println!("{}", serde_json::to_string_pretty(&analysis)?),
            Some(analysis) => {
                println!("Highest performance: {:.1}", analysis.max_performance);
                println!("Lowest performance: {:.1}", analysis.min_performance);
                println!("Median performance: {:.1}", analysis.median_performance);
                println!("Pass rate: {:.1}%", analysis.pass_rate);
                println!("Excellence rate: {:.1}%", analysis.excellence_rate);
                println!("Average attendance: {:.1}%", analysis.avg_attendance);
                println!(
                    "Performance/attendance correlation: {:.3}",
                    analysis.correlation
                );
            }
        },
        Commands::Departments => {
            for department in manager.departments() {
                println!("{department}");
            }
        }
        Commands::Import { file } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let outcome = manager.import_csv(&content)?;
            println!("{} from {}.", outcome.message, file.display());
            for error in &outcome.value.errors {
                println!("- {error}");
            }
        }
        Commands::Export { out } => {
            let csv = manager.export_csv()?.value;
            match out {
                Some(path) => {
                    std::fs::write(&path, csv)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    println!("Roster exported to {}.", path.display());
                }
                None => print!("{csv}"),
            }
        }
        Commands::Report { out } => {
            let stats = manager.statistics();
            let analysis = manager.performance_analysis();
            let report = report::build_report(stats.as_ref(), analysis.as_ref(), manager.records());
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write report {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Check => {
            let issues = manager.integrity_check();
            if issues.is_empty() {
                println!("All data integrity checks passed.");
            } else {
                println!("Data integrity issues found:");
                for issue in issues {
                    println!("- {}: {}", issue.id, issue.errors.join(", "));
                }
            }
        }
    }

    if let Some(path) = cli.save {
        let csv = manager.export_csv()?.value;
        std::fs::write(&path, csv)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Roster saved to {}.", path.display());
    }

    Ok(())
}

fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Starts from a CSV (imported, so ids are reassigned in file order), the sample
/// roster, or an empty roster.
fn load_roster(settings: &Settings, csv: Option<&Path>) -> anyhow::Result<StudentManager> {
    let ttl = settings.cache_ttl();
    let Some(path) = csv else {
        return Ok(if settings.seed_sample_data {
            StudentManager::with_sample_data(ttl)
        } else {
            StudentManager::with_cache_ttl(ttl)
        });
    };

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read roster {}", path.display()))?;
    let mut manager = StudentManager::with_cache_ttl(ttl);
    manager
        .restore_csv(&content)
        .with_context(|| format!("failed to restore roster {}", path.display()))?;
    Ok(manager)
}

fn print_summary(student: &StudentRecord) {
    println!(
        "- {} {} <{}> | {} ({}) | grade {} | {:.1}% {} | attendance {:.1}% {}",
        student.id,
        student.name,
        student.email,
        student.course,
        student.department,
        student.grade,
        student.performance,
        report::performance_label(student.performance_tier()),
        student.attendance,
        report::attendance_label(student.attendance_tier()),
    );
}

fn print_details(student: &StudentRecord) {
    println!("{} ({})", student.name, student.id);
    println!("Age: {}", student.age);
    println!("Email: {}", student.email);
    println!("Phone: {}", student.phone);
    println!("Course: {} ({})", student.course, student.department);
    println!("Grade: {}", report::grade_label(student.grade));
    println!(
        "Performance: {:.1}% {}",
        student.performance,
        report::performance_label(student.performance_tier())
    );
    println!(
        "Attendance: {:.1}% {}",
        student.attendance,
        report::attendance_label(student.attendance_tier())
    );
    println!("Enrolled: {}", student.enrollment_date);
    println!(
        "Last updated: {}",
        student.last_updated.format(TIMESTAMP_FORMAT)
    );

    if student.activities.is_empty() {
        println!("No activity recorded.");
        return;
    }
    println!("Activities:");
    for activity in &student.activities {
        println!(
            "- #{} {} on {}: {}",
            activity.sequence_id,
            activity.kind,
            activity.timestamp.format(TIMESTAMP_FORMAT),
            activity.description
        );
    }
}
