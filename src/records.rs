use std::path::{Path, PathBuf};

use chrono::FixedOffset;
use sqlx::PgPool;
use tracing::info;

use crate::db;
use crate::models::{Assignment, Course, ScheduleEntry};
use crate::store::{MemoryStore, NewAssignment};

/// Where course, assignment and schedule records come from. Commands talk to
/// this rather than to a specific backend.
pub enum RecordSource {
    Postgres { pool: PgPool, offset: FixedOffset },
    Fixture { path: PathBuf, store: MemoryStore },
}

/// Everything a view needs, fetched together.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub courses: Vec<Course>,
    pub assignments: Vec<Assignment>,
    pub schedules: Vec<ScheduleEntry>,
}

impl RecordSource {
    pub fn fixture(path: &Path) -> anyhow::Result<Self> {
        let store = if path.exists() {
            MemoryStore::load(path)?
        } else {
            info!(path = %path.display(), "Fixture not found, starting empty");
            MemoryStore::default()
        };
        Ok(Self::Fixture {
            path: path.to_path_buf(),
            store,
        })
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            RecordSource::Postgres { .. } => "postgres",
            RecordSource::Fixture { .. } => "fixture",
        }
    }

    pub async fn snapshot(&self) -> anyhow::Result<Snapshot> {
        match self {
            RecordSource::Postgres { pool, offset } => {
                let (courses, assignments, schedules) = tokio::try_join!(
                    db::fetch_courses(pool),
                    db::fetch_assignments(pool, offset),
                    db::fetch_schedules(pool),
                )?;
                Ok(Snapshot {
                    courses,
                    assignments,
                    schedules,
                })
            }
            RecordSource::Fixture { store, .. } => Ok(Snapshot {
                courses: store.courses.clone(),
                assignments: store.assignments.clone(),
                schedules: store.schedules.clone(),
            }),
        }
    }

    pub async fn init(&self) -> anyhow::Result<()> {
        match self {
            RecordSource::Postgres { pool, .. } => db::init_db(pool).await,
            RecordSource::Fixture { path, store } => store.save(path),
        }
    }

    pub async fn seed(&mut self) -> anyhow::Result<()> {
        match self {
            RecordSource::Postgres { pool, offset } => db::seed(pool, offset).await,
            RecordSource::Fixture { path, store } => {
                *store = MemoryStore::sample()?;
                store.save(path)
            }
        }
    }

    pub async fn import_csv(&mut self, csv_path: &Path) -> anyhow::Result<usize> {
        match self {
            RecordSource::Postgres { pool, offset } => db::import_csv(pool, csv_path, offset).await,
            RecordSource::Fixture { path, store } => {
                let inserted = store.import_csv(csv_path)?;
                store.save(path)?;
                Ok(inserted)
            }
        }
    }

    pub async fn create_course(&mut self, course: Course) -> anyhow::Result<Course> {
        match self {
            RecordSource::Postgres { pool, .. } => db::create_course(pool, &course).await,
            RecordSource::Fixture { path, store } => {
                let created = store.create_course(course)?.clone();
                store.save(path)?;
                Ok(created)
            }
        }
    }

    pub async fn set_category_grade(
        &mut self,
        course_id: i64,
        category: &str,
        grade: Option<f64>,
    ) -> anyhow::Result<Course> {
        match self {
            RecordSource::Postgres { pool, .. } => {
                let mut course = db::fetch_course(pool, course_id).await?;
                course.set_category_grade(category, grade)?;
                db::update_grade_categories(pool, &course).await
            }
            RecordSource::Fixture { path, store } => {
                let updated = store.set_category_grade(course_id, category, grade)?.clone();
                store.save(path)?;
                Ok(updated)
            }
        }
    }

    pub async fn create_assignment(&mut self, new: NewAssignment) -> anyhow::Result<Assignment> {
        match self {
            RecordSource::Postgres { pool, offset } => db::create_assignment(pool, new, offset).await,
            RecordSource::Fixture { path, store } => {
                let created = store.create_assignment(new)?.clone();
                store.save(path)?;
                Ok(created)
            }
        }
    }

    pub async fn set_completed(&mut self, id: i64, completed: bool) -> anyhow::Result<Assignment> {
        match self {
            RecordSource::Postgres { pool, offset } => db::set_completed(pool, id, completed, offset).await,
            RecordSource::Fixture { path, store } => {
                let updated = store.set_completed(id, completed)?.clone();
                store.save(path)?;
                Ok(updated)
            }
        }
    }

    pub async fn set_grade(&mut self, id: i64, grade: Option<f64>) -> anyhow::Result<Assignment> {
        match self {
            RecordSource::Postgres { pool, offset } => db::set_grade(pool, id, grade, offset).await,
            RecordSource::Fixture { path, store } => {
                let updated = store.set_grade(id, grade)?.clone();
                store.save(path)?;
                Ok(updated)
            }
        }
    }

    pub async fn delete_assignment(&mut self, id: i64) -> anyhow::Result<()> {
        match self {
            RecordSource::Postgres { pool, .. } => db::delete_assignment(pool, id).await,
            RecordSource::Fixture { path, store } => {
                store.delete_assignment(id)?;
                store.save(path)
            }
        }
    }

    pub async fn delete_course(&mut self, id: i64) -> anyhow::Result<()> {
        match self {
            RecordSource::Postgres { pool, .. } => db::delete_course(pool, id).await,
            RecordSource::Fixture { path, store } => {
                store.delete_course(id)?;
                store.save(path)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Priority;

    #[tokio::test]
    async fn fixture_mutations_persist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("term.json");

        let mut source = RecordSource::fixture(&path).unwrap();
        assert_eq!(source.backend_name(), "fixture");
        assert!(source.snapshot().await.unwrap().courses.is_empty());

        source.seed().await.unwrap();
        let created = source
            .create_assignment(NewAssignment {
                course_id: 2,
                title: "Case study".to_string(),
                description: String::new(),
                due_date: "2026-10-27".to_string(),
                priority: Priority::High,
                grade: None,
            })
            .await
            .unwrap();
        source.set_completed(created.id, true).await.unwrap();

        let reopened = RecordSource::fixture(&path).unwrap();
        let snapshot = reopened.snapshot().await.unwrap();
        assert_eq!(snapshot.courses.len(), 3);
        let stored = snapshot.assignments.iter().find(|a| a.id == created.id).unwrap();
        assert!(stored.completed);
    }

    #[tokio::test]
    async fn fixture_courses_start_with_default_categories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("term.json");
        let mut source = RecordSource::fixture(&path).unwrap();

        let course = source
            .create_course(Course {
                id: 0,
                name: "Microeconomics".to_string(),
                code: "ECON 1115".to_string(),
                professor: "Dr. Ferreira".to_string(),
                credits: 4.0,
                color: crate::models::DEFAULT_COURSE_COLOR.to_string(),
                grade_categories: crate::models::GradeCategory::defaults(),
            })
            .await
            .unwrap();
        assert_eq!(course.id, 1);

        let graded = source.set_category_grade(course.id, "Exams", Some(84.0)).await.unwrap();
        let grade = crate::grades::course_grade(&graded).unwrap();
        assert!((grade - 84.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn fixture_delete_course_cascades_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("term.json");
        let mut source = RecordSource::fixture(&path).unwrap();
        source.seed().await.unwrap();
        source.delete_course(1).await.unwrap();

        let snapshot = RecordSource::fixture(&path).unwrap().snapshot().await.unwrap();
        assert!(snapshot.assignments.iter().all(|a| a.course_id != 1));
        assert!(source.delete_assignment(1).await.is_err());
    }
}
