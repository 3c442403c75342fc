//! In-memory record store backed by a JSON fixture file, standing in for the
//! remote record service during demos and tests.

use std::path::Path;

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::models::{Assignment, Course, Priority, ScheduleEntry};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryStore {
    #[serde(default)]
    pub courses: Vec<Course>,
    #[serde(default)]
    pub assignments: Vec<Assignment>,
    #[serde(default)]
    pub schedules: Vec<ScheduleEntry>,
}

/// Fields supplied when creating an assignment; the store assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAssignment {
    pub course_id: i64,
    pub title: String,
    pub description: String,
    pub due_date: String,
    pub priority: Priority,
    pub grade: Option<f64>,
}

impl NewAssignment {
    pub fn into_assignment(self, id: i64) -> Assignment {
        Assignment {
            id,
            course_id: self.course_id,
            title: self.title,
            description: self.description,
            due_date: self.due_date,
            priority: self.priority,
            completed: false,
            grade: self.grade,
        }
    }
}

fn next_id<T>(records: &[T], id: impl Fn(&T) -> i64) -> i64 {
    records.iter().map(id).max().unwrap_or(0) + 1
}

impl MemoryStore {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read fixture {}", path.display()))?;
        let store: MemoryStore = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse fixture {}", path.display()))?;
        debug!(
            courses = store.courses.len(),
            assignments = store.assignments.len(),
            schedules = store.schedules.len(),
            path = %path.display(),
            "Fixture loaded"
        );
        Ok(store)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let raw = serde_json::to_string_pretty(self)?;
        std::fs::write(path, raw)
            .with_context(|| format!("failed to write fixture {}", path.display()))?;
        debug!(path = %path.display(), "Fixture saved");
        Ok(())
    }

    /// Sample term used by `seed` when no database is configured.
    pub fn sample() -> anyhow::Result<Self> {
        serde_json::from_str(SAMPLE_FIXTURE).context("embedded sample term is not valid JSON")
    }

    pub fn course(&self, id: i64) -> Option<&Course> {
        self.courses.iter().find(|c| c.id == id)
    }

    pub fn assignment(&self, id: i64) -> Option<&Assignment> {
        self.assignments.iter().find(|a| a.id == id)
    }

    pub fn create_course(&mut self, mut course: Course) -> anyhow::Result<&Course> {
        course.validate()?;
        course.id = next_id(&self.courses, |c| c.id);
        info!(id = course.id, name = %course.name, "Course created");
        self.courses.push(course);
        let index = self.courses.len() - 1;
        Ok(&self.courses[index])
    }

    /// Records a category grade on a course, re-validating before the write.
    pub fn set_category_grade(
        &mut self,
        course_id: i64,
        category: &str,
        grade: Option<f64>,
    ) -> anyhow::Result<&Course> {
        let slot = self
            .courses
            .iter_mut()
            .find(|c| c.id == course_id)
            .with_context(|| format!("course {course_id} does not exist"))?;
        let mut updated = slot.clone();
        updated.set_category_grade(category, grade)?;
        updated.validate()?;
        *slot = updated;
        Ok(slot)
    }

    pub fn create_assignment(&mut self, new: NewAssignment) -> anyhow::Result<&Assignment> {
        if self.course(new.course_id).is_none() {
            bail!("course {} does not exist", new.course_id);
        }
        let assignment = new.into_assignment(next_id(&self.assignments, |a| a.id));
        assignment.validate()?;
        info!(id = assignment.id, course_id = assignment.course_id, "Assignment created");
        self.assignments.push(assignment);
        let index = self.assignments.len() - 1;
        Ok(&self.assignments[index])
    }

    pub fn update_assignment(&mut self, updated: Assignment) -> anyhow::Result<&Assignment> {
        updated.validate()?;
        let slot = self
            .assignments
            .iter_mut()
            .find(|a| a.id == updated.id)
            .with_context(|| format!("assignment {} does not exist", updated.id))?;
        *slot = updated;
        Ok(slot)
    }

    pub fn set_completed(&mut self, id: i64, completed: bool) -> anyhow::Result<&Assignment> {
        let mut assignment = self
            .assignment(id)
            .cloned()
            .with_context(|| format!("assignment {id} does not exist"))?;
        assignment.completed = completed;
        self.update_assignment(assignment)
    }

    pub fn set_grade(&mut self, id: i64, grade: Option<f64>) -> anyhow::Result<&Assignment> {
        let mut assignment = self
            .assignment(id)
            .cloned()
            .with_context(|| format!("assignment {id} does not exist"))?;
        assignment.grade = grade;
        self.update_assignment(assignment)
    }

    pub fn delete_assignment(&mut self, id: i64) -> anyhow::Result<()> {
        let before = self.assignments.len();
        self.assignments.retain(|a| a.id != id);
        if self.assignments.len() == before {
            bail!("assignment {id} does not exist");
        }
        info!(id, "Assignment deleted");
        Ok(())
    }

    /// Removes a course along with its assignments and class meetings.
    pub fn delete_course(&mut self, id: i64) -> anyhow::Result<()> {
        let before = self.courses.len();
        self.courses.retain(|c| c.id != id);
        if self.courses.len() == before {
            bail!("course {id} does not exist");
        }
        self.assignments.retain(|a| a.course_id != id);
        self.schedules.retain(|s| s.course_id != id);
        info!(id, "Course deleted");
        Ok(())
    }

    /// All rows land or none do.
    pub fn import_csv(&mut self, csv_path: &Path) -> anyhow::Result<usize> {
        let rows = read_assignment_csv(csv_path)?;
        let mut staged = self.clone();
        for row in &rows {
            staged
                .create_assignment(row.assignment.clone())
                .with_context(|| format!("failed to import row {}", row.source_key))?;
        }
        *self = staged;
        Ok(rows.len())
    }
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    course_id: i64,
    title: String,
    #[serde(default)]
    description: String,
    due_date: String,
    #[serde(default)]
    priority: Option<Priority>,
    #[serde(default)]
    grade: Option<f64>,
    #[serde(default)]
    source_key: Option<String>,
}

/// One imported CSV row. `source_key` identifies the row across re-imports.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedAssignment {
    pub source_key: String,
    pub assignment: NewAssignment,
}

/// Reads `course_id,title,description,due_date,priority,grade[,source_key]`
/// rows. Rows without a `source_key` get one derived from course, due date
/// and title, so importing the same file twice yields the same keys.
pub fn read_assignment_csv(csv_path: &Path) -> anyhow::Result<Vec<ImportedAssignment>> {
    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut rows = Vec::new();

    for (line, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result.with_context(|| format!("invalid CSV row {}", line + 1))?;
        let source_key = row
            .source_key
            .filter(|key| !key.trim().is_empty())
            .unwrap_or_else(|| {
                format!("csv:{}:{}:{}", row.course_id, row.due_date.trim(), row.title.trim())
            });
        rows.push(ImportedAssignment {
            source_key,
            assignment: NewAssignment {
                course_id: row.course_id,
                title: row.title,
                description: row.description,
                due_date: row.due_date,
                priority: row.priority.unwrap_or_default(),
                grade: row.grade,
            },
        });
    }

    Ok(rows)
}

const SAMPLE_FIXTURE: &str = r##"{
  "courses": [
    {
      "Id": 1, "name": "Calculus II", "code": "MATH 1342", "professor": "Dr. Alvarez",
      "credits": 4, "color": "#5B3FF9",
      "gradeCategories": [
        {"name": "Assignments", "weight": 30, "currentGrade": 92},
        {"name": "Exams", "weight": 40, "currentGrade": 85},
        {"name": "Participation", "weight": 10, "currentGrade": 100},
        {"name": "Final Project", "weight": 20, "currentGrade": null}
      ]
    },
    {
      "Id": 2, "name": "Intro to Psychology", "code": "PSYC 1101", "professor": "Dr. Chen",
      "credits": 3, "color": "#10B981",
      "gradeCategories": [
        {"name": "Quizzes", "weight": 25, "currentGrade": 78},
        {"name": "Exams", "weight": 50, "currentGrade": 81},
        {"name": "Paper", "weight": 25, "currentGrade": null}
      ]
    },
    {
      "Id": 3, "name": "Data Structures", "code": "CS 2510", "professor": "Dr. Okonkwo",
      "credits": 4, "color": "#F59E0B",
      "gradeCategories": [
        {"name": "Labs", "weight": 40, "currentGrade": null},
        {"name": "Exams", "weight": 60, "currentGrade": null}
      ]
    }
  ],
  "assignments": [
    {"Id": 1, "courseId": 1, "title": "Problem Set 6", "description": "Series convergence", "dueDate": "2026-10-19T23:59:00", "priority": "High", "completed": false, "grade": null},
    {"Id": 2, "courseId": 2, "title": "Reading Response", "description": "Chapter 5 memory", "dueDate": "2026-10-14T17:00:00", "priority": "Medium", "completed": true, "grade": 88},
    {"Id": 3, "courseId": 3, "title": "Linked List Lab", "description": "Implement a doubly linked list", "dueDate": "2026-10-21T23:59:00", "priority": "Medium", "completed": false, "grade": null},
    {"Id": 4, "courseId": 2, "title": "Research Paper Outline", "description": "", "dueDate": "2026-11-02", "priority": "Low", "completed": false, "grade": null}
  ],
  "schedules": [
    {"Id": 1, "courseId": 1, "dayOfWeek": "Monday", "startTime": "09:00", "endTime": "10:15", "location": "Science Hall 204"},
    {"Id": 2, "courseId": 1, "dayOfWeek": "Wednesday", "startTime": "09:00", "endTime": "10:15", "location": "Science Hall 204"},
    {"Id": 3, "courseId": 2, "dayOfWeek": "Tuesday", "startTime": "13:30", "endTime": "14:45", "location": "Ell Hall 310"},
    {"Id": 4, "courseId": 3, "dayOfWeek": "Thursday", "startTime": "11:00", "endTime": "12:40", "location": null}
  ]
}"##;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn new_assignment(course_id: i64, title: &str) -> NewAssignment {
        NewAssignment {
            course_id,
            title: title.to_string(),
            description: String::new(),
            due_date: "2026-10-30".to_string(),
            priority: Priority::Medium,
            grade: None,
        }
    }

    #[test]
    fn sample_fixture_parses() {
        let store = MemoryStore::sample().unwrap();
        assert_eq!(store.courses.len(), 3);
        assert_eq!(store.assignments.len(), 4);
        assert_eq!(store.schedules.len(), 4);
        assert!(store.courses.iter().all(|c| c.validate().is_ok()));
    }

    #[test]
    fn ids_follow_the_current_maximum() {
        let mut store = MemoryStore::sample().unwrap();
        let created = store.create_assignment(new_assignment(1, "Quiz prep")).unwrap();
        assert_eq!(created.id, 5);
        assert!(!created.completed);
    }

    #[test]
    fn rejects_unknown_course_and_bad_dates() {
        let mut store = MemoryStore::sample().unwrap();
        assert!(store.create_assignment(new_assignment(99, "Orphan")).is_err());

        let mut bad = new_assignment(1, "Bad date");
        bad.due_date = "whenever".to_string();
        assert!(store.create_assignment(bad).is_err());
        assert_eq!(store.assignments.len(), 4);
    }

    #[test]
    fn toggles_completion_and_grades() {
        let mut store = MemoryStore::sample().unwrap();
        assert!(store.set_completed(1, true).unwrap().completed);
        assert_eq!(store.set_grade(1, Some(93.0)).unwrap().grade, Some(93.0));
        assert!(store.set_completed(42, true).is_err());
    }

    #[test]
    fn deleting_a_course_cascades() {
        let mut store = MemoryStore::sample().unwrap();
        store.delete_course(2).unwrap();
        assert!(store.assignments.iter().all(|a| a.course_id != 2));
        assert!(store.schedules.iter().all(|s| s.course_id != 2));
        assert!(store.delete_course(2).is_err());
    }

    #[test]
    fn creating_a_course_validates_weights() {
        let mut store = MemoryStore::default();
        let mut course = MemoryStore::sample().unwrap().courses[0].clone();
        course.grade_categories.pop();
        assert!(store.create_course(course.clone()).is_err());

        course.grade_categories = crate::models::GradeCategory::defaults();
        assert_eq!(store.create_course(course).unwrap().id, 1);
    }

    #[test]
    fn category_grades_move_the_course_grade() {
        let mut store = MemoryStore::sample().unwrap();
        let before = crate::grades::course_grade(store.course(3).unwrap());
        assert_eq!(before, None);

        let course = store.set_category_grade(3, "Labs", Some(88.0)).unwrap();
        let grade = crate::grades::course_grade(course).unwrap();
        assert!((grade - 88.0).abs() < 1e-9);
        assert!(store.set_category_grade(3, "Homework", Some(70.0)).is_err());
        assert!(store.set_category_grade(99, "Labs", Some(70.0)).is_err());
    }

    #[test]
    fn fixture_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("term.json");
        let mut store = MemoryStore::sample().unwrap();
        store.delete_assignment(4).unwrap();
        store.save(&path).unwrap();

        let reloaded = MemoryStore::load(&path).unwrap();
        assert_eq!(reloaded, store);
    }

    #[test]
    fn imports_assignments_from_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("assignments.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "course_id,title,description,due_date,priority,grade").unwrap();
        writeln!(file, "1,Midterm review,Sections 7-9,2026-10-22,High,").unwrap();
        writeln!(file, "3,Hash map lab,,2026-10-28T23:59:00,,95").unwrap();
        drop(file);

        let mut store = MemoryStore::sample().unwrap();
        let inserted = store.import_csv(&path).unwrap();
        assert_eq!(inserted, 2);
        let last = store.assignment(6).unwrap();
        assert_eq!(last.priority, Priority::Medium);
        assert_eq!(last.grade, Some(95.0));
        assert_eq!(store.assignment(5).unwrap().priority, Priority::High);
    }

    #[test]
    fn csv_rows_carry_stable_source_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("assignments.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "course_id,title,description,due_date,priority,grade,source_key").unwrap();
        writeln!(file, "1,Midterm review,,2026-10-22,High,,lms-4411").unwrap();
        writeln!(file, "3,Hash map lab,,2026-10-28,,,").unwrap();
        drop(file);

        let first = read_assignment_csv(&path).unwrap();
        assert_eq!(first[0].source_key, "lms-4411");
        assert_eq!(first[1].source_key, "csv:3:2026-10-28:Hash map lab");
        assert_eq!(read_assignment_csv(&path).unwrap(), first);
    }

    #[test]
    fn failed_import_leaves_the_store_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("assignments.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "course_id,title,description,due_date,priority,grade").unwrap();
        writeln!(file, "1,Midterm review,,2026-10-22,High,").unwrap();
        writeln!(file, "99,Orphan,,2026-10-23,Low,").unwrap();
        drop(file);

        let mut store = MemoryStore::sample().unwrap();
        let before = store.clone();
        assert!(store.import_csv(&path).is_err());
        assert_eq!(store, before);
    }

    #[test]
    fn missing_fixture_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(MemoryStore::load(&dir.path().join("absent.json")).is_err());
    }
}
