use std::fmt::Write;

use chrono::{DateTime, FixedOffset};

use crate::dates;
use crate::grades;
use crate::planner::{self, GpaStanding};
use crate::records::Snapshot;

pub fn build_report(snapshot: &Snapshot, now: DateTime<FixedOffset>) -> String {
    let gpa = grades::gpa(&snapshot.courses);
    let summaries = planner::summarize_courses(&snapshot.courses, &snapshot.assignments);

    let mut output = String::new();

    let _ = writeln!(output, "# Academic Progress Report");
    let _ = writeln!(output, "Generated {}", now.format("%b %d, %Y %-I:%M %p"));
    let _ = writeln!(output);
    let _ = writeln!(output, "## GPA Overview");
    let _ = writeln!(
        output,
        "- Current GPA: {} ({})",
        planner::format_gpa(gpa),
        GpaStanding::from_gpa(gpa).label()
    );
    let _ = writeln!(output, "- Total credits: {}", planner::total_credits(&snapshot.courses));
    let _ = writeln!(output, "- Courses: {}", snapshot.courses.len());

    let _ = writeln!(output);
    let _ = writeln!(output, "## Course Grades");

    if summaries.is_empty() {
        let _ = writeln!(output, "No courses recorded yet.");
    } else {
        for summary in &summaries {
            let course = summary.course;
            let _ = writeln!(
                output,
                "### {} ({}, {} credits): {} {}",
                course.name,
                course.code,
                course.credits,
                planner::format_percent(summary.grade),
                summary.letter.unwrap_or("No Grade")
            );
            for category in &course.grade_categories {
                let grade = match category.current_grade {
                    Some(value) => format!("{value}%"),
                    None => "Not graded".to_string(),
                };
                let _ = writeln!(output, "- {} ({}%): {}", category.name, category.weight, grade);
            }
            let _ = writeln!(
                output,
                "- Assignments: {} graded of {} total",
                summary.graded_count, summary.assignment_count
            );
            if let Some(average) = summary.graded_average {
                let _ = writeln!(output, "- Assignment average: {}", planner::format_percent(Some(average)));
            }
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Upcoming Assignments");

    let upcoming = planner::upcoming(&snapshot.assignments, 5, now);
    if upcoming.is_empty() {
        let _ = writeln!(output, "All caught up. No pending assignments.");
    } else {
        for assignment in upcoming {
            let label = dates::date_label(&assignment.due_date, now)
                .unwrap_or_else(|_| assignment.due_date.clone());
            let urgency = dates::due_date_urgency(&assignment.due_date, now)
                .map(|u| u.as_str())
                .unwrap_or("unknown");
            let _ = writeln!(
                output,
                "- {} ({}): due {} [{}, {} priority]",
                assignment.title,
                planner::course_name(&snapshot.courses, assignment.course_id),
                label,
                urgency,
                assignment.priority
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Today's Schedule");

    match planner::todays_classes(&snapshot.schedules, now) {
        Ok(classes) if classes.is_empty() => {
            let _ = writeln!(output, "No classes today.");
        }
        Ok(classes) => {
            for class in classes {
                let _ = writeln!(
                    output,
                    "- {} to {}: {}{} ({})",
                    class.start.format("%-I:%M %p"),
                    class.end.format("%-I:%M %p"),
                    planner::course_name(&snapshot.courses, class.entry.course_id),
                    class
                        .entry
                        .location
                        .as_deref()
                        .map(|l| format!(" @ {l}"))
                        .unwrap_or_default(),
                    class.status.label()
                );
            }
        }
        Err(err) => {
            let _ = writeln!(output, "Schedule unavailable: {err}");
        }
    }

    output
}
