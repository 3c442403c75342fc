//! Derived views over fetched records: dashboard figures, per-course grade
//! summaries, assignment filtering and the class schedule.

use std::cmp::Ordering;

use chrono::{DateTime, Datelike, FixedOffset, NaiveDateTime, NaiveTime, Weekday};

use crate::dates::{self, Urgency};
use crate::error::InvalidInput;
use crate::grades;
use crate::models::{Assignment, Course, Priority, ScheduleEntry};

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardStats {
    pub total_courses: usize,
    pub total_assignments: usize,
    pub completed: usize,
    pub pending: usize,
    pub overdue: usize,
    pub completion_rate: f64,
    pub gpa: f64,
}

impl DashboardStats {
    pub fn compute(courses: &[Course], assignments: &[Assignment], now: DateTime<FixedOffset>) -> Self {
        let completed = assignments.iter().filter(|a| a.completed).count();
        let overdue = assignments
            .iter()
            .filter(|a| !a.completed && is_overdue(a, now))
            .count();
        let completion_rate = if assignments.is_empty() {
            0.0
        } else {
            completed as f64 / assignments.len() as f64 * 100.0
        };

        Self {
            total_courses: courses.len(),
            total_assignments: assignments.len(),
            completed,
            pending: assignments.len() - completed,
            overdue,
            completion_rate,
            gpa: grades::gpa(courses),
        }
    }
}

/// An unparsable due date never counts as overdue.
fn is_overdue(assignment: &Assignment, now: DateTime<FixedOffset>) -> bool {
    matches!(
        dates::due_date_urgency(&assignment.due_date, now),
        Ok(Urgency::Overdue)
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpaStanding {
    Excellent,
    VeryGood,
    Good,
    Satisfactory,
    NeedsImprovement,
    Critical,
}

const STANDING_SCALE: [(f64, GpaStanding); 5] = [
    (3.7, GpaStanding::Excellent),
    (3.3, GpaStanding::VeryGood),
    (3.0, GpaStanding::Good),
    (2.7, GpaStanding::Satisfactory),
    (2.0, GpaStanding::NeedsImprovement),
];

const BADGE_SCALE: [(f64, &str); 3] = [(3.5, "success"), (3.0, "info"), (2.5, "warning")];

impl GpaStanding {
    pub fn from_gpa(gpa: f64) -> Self {
        grades::ladder(&STANDING_SCALE, GpaStanding::Critical, gpa)
    }

    pub fn label(&self) -> &'static str {
        match self {
            GpaStanding::Excellent => "Excellent",
            GpaStanding::VeryGood => "Very Good",
            GpaStanding::Good => "Good",
            GpaStanding::Satisfactory => "Satisfactory",
            GpaStanding::NeedsImprovement => "Needs Improvement",
            GpaStanding::Critical => "Critical",
        }
    }
}

/// Badge tone for a GPA; coarser than the standing tiers.
pub fn gpa_badge(gpa: f64) -> &'static str {
    grades::ladder(&BADGE_SCALE, "error", gpa)
}

pub fn format_gpa(gpa: f64) -> String {
    if gpa > 0.0 {
        format!("{gpa:.2}")
    } else {
        "N/A".to_string()
    }
}

pub fn format_percent(grade: Option<f64>) -> String {
    match grade {
        Some(value) => format!("{}%", value.round() as i64),
        None => "--%".to_string(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CourseSummary<'a> {
    pub course: &'a Course,
    pub grade: Option<f64>,
    pub letter: Option<&'static str>,
    pub assignment_count: usize,
    pub graded_count: usize,
    pub graded_average: Option<f64>,
}

pub fn summarize_courses<'a>(courses: &'a [Course], assignments: &[Assignment]) -> Vec<CourseSummary<'a>> {
    courses
        .iter()
        .map(|course| {
            let grade = grades::course_grade(course);
            let for_course: Vec<&Assignment> = assignments
                .iter()
                .filter(|a| a.course_id == course.id)
                .collect();
            let graded: Vec<f64> = for_course.iter().filter_map(|a| a.grade).collect();
            let graded_average = if graded.is_empty() {
                None
            } else {
                Some(graded.iter().sum::<f64>() / graded.len() as f64)
            };

            CourseSummary {
                course,
                grade,
                letter: grade.map(grades::letter_grade),
                assignment_count: for_course.len(),
                graded_count: graded.len(),
                graded_average,
            }
        })
        .collect()
}

/// Credits across every course, graded or not.
pub fn total_credits(courses: &[Course]) -> f64 {
    courses.iter().map(|c| c.credits).sum()
}

pub fn course_name(courses: &[Course], course_id: i64) -> &str {
    courses
        .iter()
        .find(|c| c.id == course_id)
        .map(|c| c.name.as_str())
        .unwrap_or("Unknown Course")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum StatusFilter {
    #[default]
    All,
    Pending,
    Completed,
    Overdue,
}

#[derive(Debug, Clone, Default)]
pub struct AssignmentFilter {
    pub status: StatusFilter,
    pub course_id: Option<i64>,
    pub priority: Option<Priority>,
    pub search: Option<String>,
}

impl AssignmentFilter {
    fn matches(&self, assignment: &Assignment, courses: &[Course], now: DateTime<FixedOffset>) -> bool {
        if let Some(term) = self.search.as_deref().filter(|t| !t.is_empty()) {
            let needle = term.to_lowercase();
            let hit = assignment.title.to_lowercase().contains(&needle)
                || assignment.description.to_lowercase().contains(&needle)
                || courses
                    .iter()
                    .find(|c| c.id == assignment.course_id)
                    .is_some_and(|c| c.name.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }

        let status_ok = match self.status {
            StatusFilter::All => true,
            StatusFilter::Pending => !assignment.completed,
            StatusFilter::Completed => assignment.completed,
            StatusFilter::Overdue => !assignment.completed && is_overdue(assignment, now),
        };
        if !status_ok {
            return false;
        }

        if self.course_id.is_some_and(|id| id != assignment.course_id) {
            return false;
        }

        self.priority.map_or(true, |p| p == assignment.priority)
    }
}

/// Applies the filter and orders by due date, then priority High first.
pub fn filter_assignments<'a>(
    assignments: &'a [Assignment],
    courses: &[Course],
    filter: &AssignmentFilter,
    now: DateTime<FixedOffset>,
) -> Vec<&'a Assignment> {
    let mut matched: Vec<&Assignment> = assignments
        .iter()
        .filter(|a| filter.matches(a, courses, now))
        .collect();
    matched.sort_by(|a, b| by_due_date(a, b, now).then_with(|| b.priority.cmp(&a.priority)));
    matched
}

/// Incomplete assignments, soonest first.
pub fn upcoming(assignments: &[Assignment], limit: usize, now: DateTime<FixedOffset>) -> Vec<&Assignment> {
    let mut pending: Vec<&Assignment> = assignments.iter().filter(|a| !a.completed).collect();
    pending.sort_by(|a, b| by_due_date(a, b, now));
    pending.truncate(limit);
    pending
}

fn by_due_date(a: &Assignment, b: &Assignment, now: DateTime<FixedOffset>) -> Ordering {
    let due = |assignment: &Assignment| -> Option<NaiveDateTime> {
        dates::parse_date(&assignment.due_date, now.offset()).ok()
    };
    // Unparsable dates sort last.
    match (due(a), due(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassStatus {
    InProgress,
    Upcoming,
    Finished,
}

impl ClassStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ClassStatus::InProgress => "In Progress",
            ClassStatus::Upcoming => "Upcoming",
            ClassStatus::Finished => "Finished",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledClass<'a> {
    pub entry: &'a ScheduleEntry,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub status: ClassStatus,
}

/// Classes meeting on now's weekday, ordered by start time.
pub fn todays_classes(
    entries: &[ScheduleEntry],
    now: DateTime<FixedOffset>,
) -> Result<Vec<ScheduledClass<'_>>, InvalidInput> {
    let today = now.weekday();
    let clock = now.time();
    let mut classes = Vec::new();

    for entry in entries {
        if entry.weekday()? != today {
            continue;
        }
        let start = dates::parse_time(&entry.start_time)?;
        let end = dates::parse_time(&entry.end_time)?;
        let status = if clock < start {
            ClassStatus::Upcoming
        } else if clock <= end {
            ClassStatus::InProgress
        } else {
            ClassStatus::Finished
        };
        classes.push(ScheduledClass {
            entry,
            start,
            end,
            status,
        });
    }

    classes.sort_by_key(|c| c.start);
    Ok(classes)
}

pub const WEEKDAYS: [Weekday; 5] = [Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri];

/// Monday through Friday columns, each ordered by start time.
pub fn weekly_schedule(
    entries: &[ScheduleEntry],
) -> Result<Vec<(Weekday, Vec<&ScheduleEntry>)>, InvalidInput> {
    let mut columns: Vec<(Weekday, Vec<(NaiveTime, &ScheduleEntry)>)> =
        WEEKDAYS.iter().map(|day| (*day, Vec::new())).collect();

    for entry in entries {
        let day = entry.weekday()?;
        let start = dates::parse_time(&entry.start_time)?;
        if let Some((_, column)) = columns.iter_mut().find(|(d, _)| *d == day) {
            column.push((start, entry));
        }
    }

    Ok(columns
        .into_iter()
        .map(|(day, mut column)| {
            column.sort_by_key(|(start, _)| *start);
            (day, column.into_iter().map(|(_, entry)| entry).collect())
        })
        .collect())
}

/// Hourly rows from 8 AM to 8 PM.
pub fn time_slots() -> Vec<String> {
    (8..=20).map(|hour| format!("{hour:02}:00")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GradeCategory, DEFAULT_COURSE_COLOR};

    fn now() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2026-10-12T10:30:00-04:00").unwrap()
    }

    fn course(id: i64, name: &str, credits: f64, grade: Option<f64>) -> Course {
        Course {
            id,
            name: name.to_string(),
            code: format!("C{id}"),
            professor: "Dr. Baptiste".to_string(),
            credits,
            color: DEFAULT_COURSE_COLOR.to_string(),
            grade_categories: vec![GradeCategory::new("Exams", 100.0, grade)],
        }
    }

    fn assignment(id: i64, course_id: i64, title: &str, due: &str, completed: bool) -> Assignment {
        Assignment {
            id,
            course_id,
            title: title.to_string(),
            description: String::new(),
            due_date: due.to_string(),
            priority: Priority::Medium,
            completed,
            grade: None,
        }
    }

    fn entry(id: i64, day: &str, start: &str, end: &str) -> ScheduleEntry {
        ScheduleEntry {
            id,
            course_id: 1,
            day_of_week: day.to_string(),
            start_time: start.to_string(),
            end_time: end.to_string(),
            location: Some("Hall B".to_string()),
        }
    }

    #[test]
    fn dashboard_counts_overdue_only_when_incomplete() {
        let courses = vec![course(1, "Biology", 3.0, Some(95.0))];
        let assignments = vec![
            assignment(1, 1, "Lab report", "2026-10-09", false),
            assignment(2, 1, "Quiz", "2026-10-10", true),
            assignment(3, 1, "Essay", "2026-10-20", false),
            assignment(4, 1, "Reading", "2026-10-12", true),
        ];
        let stats = DashboardStats::compute(&courses, &assignments, now());
        assert_eq!(stats.total_courses, 1);
        assert_eq!(stats.completed, 2);
        assert_eq!(stats.pending, 2);
        assert_eq!(stats.overdue, 1);
        assert_eq!(stats.completion_rate, 50.0);
        assert!((stats.gpa - 3.7).abs() < 1e-9);
    }

    #[test]
    fn dashboard_without_assignments_has_zero_completion() {
        let stats = DashboardStats::compute(&[], &[], now());
        assert_eq!(stats.completion_rate, 0.0);
        assert_eq!(stats.gpa, 0.0);
    }

    #[test]
    fn standing_tiers() {
        assert_eq!(GpaStanding::from_gpa(3.7), GpaStanding::Excellent);
        assert_eq!(GpaStanding::from_gpa(3.69), GpaStanding::VeryGood);
        assert_eq!(GpaStanding::from_gpa(2.0).label(), "Needs Improvement");
        assert_eq!(GpaStanding::from_gpa(1.99), GpaStanding::Critical);
        assert_eq!(gpa_badge(3.5), "success");
        assert_eq!(gpa_badge(2.4), "error");
    }

    #[test]
    fn display_helpers() {
        assert_eq!(format_gpa(0.0), "N/A");
        assert_eq!(format_gpa(3.456), "3.46");
        assert_eq!(format_percent(Some(86.5)), "87%");
        assert_eq!(format_percent(None), "--%");
    }

    #[test]
    fn course_summaries_average_graded_assignments() {
        let courses = vec![course(1, "Biology", 3.0, Some(88.0)), course(2, "History", 4.0, None)];
        let mut graded = assignment(1, 1, "Lab", "2026-10-01", true);
        graded.grade = Some(90.0);
        let mut graded_two = assignment(2, 1, "Quiz", "2026-10-02", true);
        graded_two.grade = Some(80.0);
        let assignments = vec![graded, graded_two, assignment(3, 1, "Essay", "2026-10-20", false)];

        let summaries = summarize_courses(&courses, &assignments);
        assert_eq!(summaries[0].letter, Some("B+"));
        assert_eq!(summaries[0].assignment_count, 3);
        assert_eq!(summaries[0].graded_count, 2);
        assert_eq!(summaries[0].graded_average, Some(85.0));
        assert_eq!(summaries[1].grade, None);
        assert_eq!(summaries[1].graded_average, None);
        assert_eq!(total_credits(&courses), 7.0);
    }

    #[test]
    fn upcoming_skips_completed_and_limits() {
        let assignments = vec![
            assignment(1, 1, "Late", "2026-10-30", false),
            assignment(2, 1, "Done", "2026-10-13", true),
            assignment(3, 1, "Soon", "2026-10-14", false),
            assignment(4, 1, "Sooner", "2026-10-13T08:00:00-04:00", false),
        ];
        let titles: Vec<&str> = upcoming(&assignments, 2, now())
            .iter()
            .map(|a| a.title.as_str())
            .collect();
        assert_eq!(titles, vec!["Sooner", "Soon"]);
    }

    #[test]
    fn filter_combines_criteria_and_sorts_by_priority_on_ties() {
        let courses = vec![course(1, "Biology", 3.0, None), course(2, "History", 3.0, None)];
        let mut high = assignment(1, 1, "Cell diagram", "2026-10-15", false);
        high.priority = Priority::High;
        let mut low = assignment(2, 1, "Microscope notes", "2026-10-15", false);
        low.priority = Priority::Low;
        let mut history = assignment(3, 2, "Essay draft", "2026-10-09", false);
        history.description = "Primary sources on biology history".to_string();
        let assignments = vec![low, high, history];

        let all = filter_assignments(&assignments, &courses, &AssignmentFilter::default(), now());
        let ids: Vec<i64> = all.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![3, 1, 2]);

        let search = AssignmentFilter {
            search: Some("BIOLOGY".to_string()),
            ..Default::default()
        };
        assert_eq!(filter_assignments(&assignments, &courses, &search, now()).len(), 3);

        let overdue = AssignmentFilter {
            status: StatusFilter::Overdue,
            ..Default::default()
        };
        let found = filter_assignments(&assignments, &courses, &overdue, now());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, 3);

        let scoped = AssignmentFilter {
            course_id: Some(1),
            priority: Some(Priority::Low),
            ..Default::default()
        };
        let found = filter_assignments(&assignments, &courses, &scoped, now());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, 2);
    }

    #[test]
    fn todays_classes_are_ordered_with_status() {
        let entries = vec![
            entry(1, "Monday", "13:00", "14:15"),
            entry(2, "Monday", "10:00", "11:00"),
            entry(3, "Tuesday", "09:00", "10:00"),
            entry(4, "Monday", "08:00", "09:15"),
        ];
        let classes = todays_classes(&entries, now()).unwrap();
        let summary: Vec<(i64, ClassStatus)> = classes.iter().map(|c| (c.entry.id, c.status)).collect();
        assert_eq!(
            summary,
            vec![
                (4, ClassStatus::Finished),
                (2, ClassStatus::InProgress),
                (1, ClassStatus::Upcoming),
            ]
        );
    }

    #[test]
    fn weekly_schedule_has_weekday_columns() {
        let entries = vec![
            entry(1, "Wednesday", "14:00", "15:00"),
            entry(2, "Wednesday", "09:00", "10:00"),
            entry(3, "Saturday", "09:00", "10:00"),
        ];
        let week = weekly_schedule(&entries).unwrap();
        assert_eq!(week.len(), 5);
        let (day, column) = &week[2];
        assert_eq!(*day, Weekday::Wed);
        assert_eq!(column.iter().map(|e| e.id).collect::<Vec<_>>(), vec![2, 1]);
        assert!(week.iter().all(|(_, column)| column.iter().all(|e| e.id != 3)));
    }

    #[test]
    fn bad_schedule_rows_surface_errors() {
        let entries = vec![entry(1, "Funday", "09:00", "10:00")];
        assert_eq!(
            weekly_schedule(&entries),
            Err(InvalidInput::Weekday("Funday".to_string()))
        );
    }

    #[test]
    fn time_slots_cover_the_teaching_day() {
        let slots = time_slots();
        assert_eq!(slots.first().map(String::as_str), Some("08:00"));
        assert_eq!(slots.last().map(String::as_str), Some("20:00"));
        assert_eq!(slots.len(), 13);
    }
}
