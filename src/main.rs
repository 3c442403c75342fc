use std::path::PathBuf;

use anyhow::Context;
use clap::{ArgGroup, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tracing::info;

mod config;
mod dates;
mod db;
mod error;
mod grades;
mod models;
mod planner;
mod records;
mod report;
mod store;
mod telemetry;

use crate::dates::{Clock, SystemClock};
use crate::models::{Course, GradeCategory, Priority, DEFAULT_COURSE_COLOR};
use crate::planner::{AssignmentFilter, DashboardStats, GpaStanding, StatusFilter};
use crate::records::RecordSource;
use crate::store::NewAssignment;

#[derive(Parser)]
#[command(name = "academic-tracker")]
#[command(about = "Course, assignment and GPA tracker for Group Scholar students", long_about = None)]
struct Cli {
    /// Use a JSON fixture file as an in-memory record store instead of Postgres
    #[arg(long, global = true)]
    fixture: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load a realistic sample term
    Seed,
    /// Import assignments from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Show GPA, workload and completion at a glance
    Dashboard,
    /// Show course grades and GPA standing
    Grades,
    /// List assignments with optional filters
    Assignments {
        #[arg(long, value_enum, default_value_t = StatusFilter::All)]
        status: StatusFilter,
        #[arg(long)]
        course: Option<i64>,
        #[arg(long, value_enum, ignore_case = true)]
        priority: Option<Priority>,
        #[arg(long)]
        search: Option<String>,
    },
    /// List the next incomplete assignments
    Upcoming {
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },
    /// Show the weekly class schedule
    Schedule {
        /// Only today's classes
        #[arg(long)]
        today: bool,
    },
    /// Add a course with the default grade categories
    AddCourse {
        #[arg(long)]
        name: String,
        #[arg(long)]
        code: String,
        #[arg(long, default_value = "")]
        professor: String,
        #[arg(long, default_value_t = 3.0)]
        credits: f64,
        #[arg(long, default_value = DEFAULT_COURSE_COLOR)]
        color: String,
    },
    /// Record or clear the current grade of a course's grade category
    #[command(group(
        ArgGroup::new("value")
            .args(["grade", "clear"])
            .required(true)
            .multiple(false)
    ))]
    CategoryGrade {
        course: i64,
        category: String,
        #[arg(allow_negative_numbers = true)]
        grade: Option<f64>,
        #[arg(long)]
        clear: bool,
    },
    /// Add an assignment to a course
    AddAssignment {
        #[arg(long)]
        course: i64,
        #[arg(long)]
        title: String,
        /// ISO-8601 date or timestamp
        #[arg(long)]
        due: String,
        #[arg(long, value_enum, ignore_case = true, default_value_t = Priority::Medium)]
        priority: Priority,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Mark an assignment complete (or pending again with --undo)
    Complete {
        id: i64,
        #[arg(long)]
        undo: bool,
    },
    /// Record or clear an assignment grade
    #[command(group(
        ArgGroup::new("value")
            .args(["grade", "clear"])
            .required(true)
            .multiple(false)
    ))]
    GradeAssignment {
        id: i64,
        #[arg(allow_negative_numbers = true)]
        grade: Option<f64>,
        #[arg(long)]
        clear: bool,
    },
    /// Delete an assignment
    DeleteAssignment { id: i64 },
    /// Delete a course with its assignments and class meetings
    DeleteCourse { id: i64 },
    /// Generate a markdown report
    Report {
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = config::AppConfig::load()?;
    telemetry::init(&config)?;

    let clock = SystemClock {
        offset: config.utc_offset,
    };
    let now = clock.now();

    let mut source = match &cli.fixture {
        Some(path) => RecordSource::fixture(path)?,
        None => {
            let database_url = config
                .database_url
                .clone()
                .context("DATABASE_URL must be set unless --fixture is given")?;
            let pool = PgPoolOptions::new()
                .max_connections(config.max_connections)
                .connect(&database_url)
                .await
                .context("failed to connect to Postgres")?;
            RecordSource::Postgres {
                pool,
                offset: *now.offset(),
            }
        }
    };
    info!(backend = source.backend_name(), "Record source ready");

    match cli.command {
        Commands::InitDb => {
            source.init().await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            source.seed().await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let inserted = source.import_csv(&csv).await?;
            println!("Inserted {inserted} assignments from {}.", csv.display());
        }
        Commands::Dashboard => {
            let snapshot = source.snapshot().await?;
            let stats = DashboardStats::compute(&snapshot.courses, &snapshot.assignments, now);
            println!(
                "Current GPA: {} ({})",
                planner::format_gpa(stats.gpa),
                GpaStanding::from_gpa(stats.gpa).label()
            );
            println!("Active courses: {}", stats.total_courses);
            if stats.overdue > 0 {
                println!("Pending tasks: {} ({} overdue)", stats.pending, stats.overdue);
            } else {
                println!("Pending tasks: {} (on track)", stats.pending);
            }
            println!(
                "Completion rate: {}% ({}/{} done)",
                stats.completion_rate.round() as i64,
                stats.completed,
                stats.total_assignments
            );
        }
        Commands::Grades => {
            let snapshot = source.snapshot().await?;
            if snapshot.courses.is_empty() {
                println!("No grades available. Add courses to start tracking.");
                return Ok(());
            }
            let gpa = grades::gpa(&snapshot.courses);
            println!(
                "GPA {} - {} [{}] across {} credits",
                planner::format_gpa(gpa),
                GpaStanding::from_gpa(gpa).label(),
                planner::gpa_badge(gpa),
                planner::total_credits(&snapshot.courses)
            );
            for summary in planner::summarize_courses(&snapshot.courses, &snapshot.assignments) {
                println!(
                    "- {} ({}): {} {} [{}]",
                    summary.course.name,
                    summary.course.code,
                    planner::format_percent(summary.grade),
                    summary.letter.unwrap_or("No Grade"),
                    summary
                        .grade
                        .map(|g| grades::grade_color(g).as_str())
                        .unwrap_or("ungraded")
                );
            }
        }
        Commands::Assignments {
            status,
            course,
            priority,
            search,
        } => {
            let snapshot = source.snapshot().await?;
            let filter = AssignmentFilter {
                status,
                course_id: course,
                priority,
                search,
            };
            let matched =
                planner::filter_assignments(&snapshot.assignments, &snapshot.courses, &filter, now);
            if matched.is_empty() {
                println!("No assignments match these filters.");
                return Ok(());
            }
            for assignment in matched {
                let due = dates::format_date(&assignment.due_date, now.offset())?;
                let urgency = dates::due_date_urgency(&assignment.due_date, now)?;
                println!(
                    "[{}] #{} {} ({}) due {} - {} priority, {}",
                    if assignment.completed { "x" } else { " " },
                    assignment.id,
                    assignment.title,
                    planner::course_name(&snapshot.courses, assignment.course_id),
                    due,
                    assignment.priority,
                    urgency
                );
            }
        }
        Commands::Upcoming { limit } => {
            let snapshot = source.snapshot().await?;
            let upcoming = planner::upcoming(&snapshot.assignments, limit, now);
            if upcoming.is_empty() {
                println!("All caught up! No pending assignments.");
                return Ok(());
            }
            for assignment in upcoming {
                println!(
                    "- {} ({}) {} [{}]",
                    assignment.title,
                    planner::course_name(&snapshot.courses, assignment.course_id),
                    dates::date_label(&assignment.due_date, now)?,
                    dates::due_date_urgency(&assignment.due_date, now)?
                );
            }
        }
        Commands::Schedule { today } => {
            let snapshot = source.snapshot().await?;
            if today {
                let classes = planner::todays_classes(&snapshot.schedules, now)?;
                println!("Today's schedule ({}):", now.format("%A"));
                if classes.is_empty() {
                    println!("No classes today.");
                }
                for class in classes {
                    println!(
                        "- {} - {} {} ({})",
                        dates::format_time(&class.entry.start_time)?,
                        dates::format_time(&class.entry.end_time)?,
                        planner::course_name(&snapshot.courses, class.entry.course_id),
                        class.status.label()
                    );
                }
            } else {
                let slots: Vec<String> = planner::time_slots()
                    .iter()
                    .map(|slot| dates::format_time(slot))
                    .collect::<Result<_, _>>()?;
                if let (Some(first), Some(last)) = (slots.first(), slots.last()) {
                    println!("Teaching day: {first} to {last}");
                }
                for (day, entries) in planner::weekly_schedule(&snapshot.schedules)? {
                    println!("{day}:");
                    for entry in entries {
                        println!(
                            "  {} - {} {}{}",
                            dates::format_time(&entry.start_time)?,
                            dates::format_time(&entry.end_time)?,
                            planner::course_name(&snapshot.courses, entry.course_id),
                            entry
                                .location
                                .as_deref()
                                .map(|l| format!(" @ {l}"))
                                .unwrap_or_default()
                        );
                    }
                }
            }
        }
        Commands::AddCourse {
            name,
            code,
            professor,
            credits,
            color,
        } => {
            let created = source
                .create_course(Course {
                    id: 0,
                    name,
                    code,
                    professor,
                    credits,
                    color,
                    grade_categories: GradeCategory::defaults(),
                })
                .await?;
            println!("Created course #{} {} ({}).", created.id, created.name, created.code);
        }
        Commands::CategoryGrade {
            course,
            category,
            grade,
            clear,
        } => {
            let grade = if clear { None } else { grade };
            let updated = source.set_category_grade(course, &category, grade).await?;
            let current = grades::course_grade(&updated);
            println!(
                "{} is now {} {}.",
                updated.name,
                planner::format_percent(current),
                current.map(grades::letter_grade).unwrap_or("No Grade")
            );
        }
        Commands::AddAssignment {
            course,
            title,
            due,
            priority,
            description,
        } => {
            let created = source
                .create_assignment(NewAssignment {
                    course_id: course,
                    title,
                    description,
                    due_date: due,
                    priority,
                    grade: None,
                })
                .await?;
            println!(
                "Created assignment #{} due {}.",
                created.id,
                dates::date_label(&created.due_date, now)?
            );
        }
        Commands::Complete { id, undo } => {
            let updated = source.set_completed(id, !undo).await?;
            let state = if updated.completed { "completed" } else { "pending" };
            println!("Assignment #{} marked {state}.", updated.id);
        }
        Commands::GradeAssignment { id, grade, clear } => {
            let grade = if clear { None } else { grade };
            if let Some(value) = grade.filter(|g| !g.is_finite()) {
                anyhow::bail!(error::InvalidInput::NonFiniteNumber {
                    field: "grade",
                    value
                });
            }
            let updated = source.set_grade(id, grade).await?;
            println!(
                "Assignment #{} grade: {}",
                updated.id,
                planner::format_percent(updated.grade)
            );
        }
        Commands::DeleteAssignment { id } => {
            source.delete_assignment(id).await?;
            println!("Assignment #{id} deleted.");
        }
        Commands::DeleteCourse { id } => {
            source.delete_course(id).await?;
            println!("Course #{id} and its assignments deleted.");
        }
        Commands::Report { out } => {
            let snapshot = source.snapshot().await?;
            let report = report::build_report(&snapshot, now);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
