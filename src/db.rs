use std::collections::HashMap;

use anyhow::Context;
use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use tracing::{debug, info};

use crate::dates;
use crate::models::{Assignment, Course, GradeCategory, Priority, ScheduleEntry};
use crate::store::{self, MemoryStore, NewAssignment};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("Migrations applied");
    Ok(())
}

/// Converts an ISO-8601 due date, read as wall time at `offset`, to UTC.
fn due_timestamp(due_date: &str, offset: &FixedOffset) -> anyhow::Result<DateTime<Utc>> {
    let local = dates::parse_date(due_date, offset)?;
    let stamped = offset
        .from_local_datetime(&local)
        .single()
        .with_context(|| format!("ambiguous due date {due_date}"))?;
    Ok(stamped.with_timezone(&Utc))
}

pub async fn seed(pool: &PgPool, offset: &FixedOffset) -> anyhow::Result<()> {
    let sample = MemoryStore::sample()?;
    let mut course_ids: HashMap<i64, i64> = HashMap::new();

    for course in &sample.courses {
        let id: i64 = sqlx::query(
            r#"
            INSERT INTO academic_tracker.courses
            (name, code, professor, credits, color, grade_categories)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (code) DO UPDATE
            SET name = EXCLUDED.name,
                professor = EXCLUDED.professor,
                credits = EXCLUDED.credits,
                color = EXCLUDED.color,
                grade_categories = EXCLUDED.grade_categories
            RETURNING id
            "#,
        )
        .bind(&course.name)
        .bind(&course.code)
        .bind(&course.professor)
        .bind(course.credits)
        .bind(&course.color)
        .bind(Json(&course.grade_categories))
        .fetch_one(pool)
        .await?
        .try_get("id")?;
        course_ids.insert(course.id, id);
    }

    for assignment in &sample.assignments {
        let course_id = course_ids
            .get(&assignment.course_id)
            .copied()
            .context("seed assignment references an unknown course")?;

        sqlx::query(
            r#"
            INSERT INTO academic_tracker.assignments
            (course_id, title, description, due_date, priority, completed, grade, source_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(course_id)
        .bind(&assignment.title)
        .bind(&assignment.description)
        .bind(due_timestamp(&assignment.due_date, offset)?)
        .bind(assignment.priority.to_string())
        .bind(assignment.completed)
        .bind(assignment.grade)
        .bind(format!("seed-{:03}", assignment.id))
        .execute(pool)
        .await?;
    }

    for entry in &sample.schedules {
        let course_id = course_ids
            .get(&entry.course_id)
            .copied()
            .context("seed schedule references an unknown course")?;

        sqlx::query(
            r#"
            INSERT INTO academic_tracker.schedules
            (course_id, day_of_week, start_time, end_time, location)
            SELECT $1, $2, $3, $4, $5
            WHERE NOT EXISTS (
                SELECT 1 FROM academic_tracker.schedules
                WHERE course_id = $1 AND day_of_week = $2 AND start_time = $3
            )
            "#,
        )
        .bind(course_id)
        .bind(&entry.day_of_week)
        .bind(&entry.start_time)
        .bind(&entry.end_time)
        .bind(&entry.location)
        .execute(pool)
        .await?;
    }

    info!(
        courses = sample.courses.len(),
        assignments = sample.assignments.len(),
        schedules = sample.schedules.len(),
        "Seed data upserted"
    );
    Ok(())
}

pub async fn fetch_courses(pool: &PgPool) -> anyhow::Result<Vec<Course>> {
    let query = format!("SELECT {COURSE_COLUMNS} FROM academic_tracker.courses ORDER BY name ASC");
    let rows = sqlx::query(&query).fetch_all(pool).await?;

    let mut courses = Vec::with_capacity(rows.len());
    for row in &rows {
        courses.push(course_from_row(row)?);
    }

    debug!(count = courses.len(), "Fetched courses");
    Ok(courses)
}

fn course_from_row(row: &PgRow) -> anyhow::Result<Course> {
    let categories: Json<Vec<GradeCategory>> = row.try_get("grade_categories")?;
    Ok(Course {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        code: row.try_get("code")?,
        professor: row.try_get("professor")?,
        credits: row.try_get("credits")?,
        color: row.try_get("color")?,
        grade_categories: categories.0,
    })
}

const COURSE_COLUMNS: &str = "id, name, code, professor, credits, color, grade_categories";

pub async fn fetch_course(pool: &PgPool, id: i64) -> anyhow::Result<Course> {
    let query = format!("SELECT {COURSE_COLUMNS} FROM academic_tracker.courses WHERE id = $1");
    let row = sqlx::query(&query)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .with_context(|| format!("course {id} does not exist"))?;
    course_from_row(&row)
}

pub async fn create_course(pool: &PgPool, course: &Course) -> anyhow::Result<Course> {
    course.validate()?;
    let query = format!(
        r#"
        INSERT INTO academic_tracker.courses
        (name, code, professor, credits, color, grade_categories)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {COURSE_COLUMNS}
        "#
    );
    let row = sqlx::query(&query)
        .bind(&course.name)
        .bind(&course.code)
        .bind(&course.professor)
        .bind(course.credits)
        .bind(&course.color)
        .bind(Json(&course.grade_categories))
        .fetch_one(pool)
        .await
        .with_context(|| format!("failed to create course {}", course.code))?;

    let created = course_from_row(&row)?;
    info!(id = created.id, name = %created.name, "Course created");
    Ok(created)
}

pub async fn update_grade_categories(pool: &PgPool, course: &Course) -> anyhow::Result<Course> {
    course.validate()?;
    let query = format!(
        "UPDATE academic_tracker.courses SET grade_categories = $2 WHERE id = $1 \
         RETURNING {COURSE_COLUMNS}"
    );
    let row = sqlx::query(&query)
        .bind(course.id)
        .bind(Json(&course.grade_categories))
        .fetch_optional(pool)
        .await?
        .with_context(|| format!("course {} does not exist", course.id))?;
    course_from_row(&row)
}

fn assignment_from_row(row: &PgRow, offset: &FixedOffset) -> anyhow::Result<Assignment> {
    let due: DateTime<Utc> = row.try_get("due_date")?;
    let priority: String = row.try_get("priority")?;

    Ok(Assignment {
        id: row.try_get("id")?,
        course_id: row.try_get("course_id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        due_date: due.with_timezone(offset).to_rfc3339(),
        priority: priority.parse::<Priority>()?,
        completed: row.try_get("completed")?,
        grade: row.try_get("grade")?,
    })
}

const ASSIGNMENT_COLUMNS: &str =
    "id, course_id, title, description, due_date, priority, completed, grade";

pub async fn fetch_assignments(pool: &PgPool, offset: &FixedOffset) -> anyhow::Result<Vec<Assignment>> {
    let query = format!(
        "SELECT {ASSIGNMENT_COLUMNS} FROM academic_tracker.assignments ORDER BY due_date ASC"
    );
    let rows = sqlx::query(&query).fetch_all(pool).await?;

    let mut assignments = Vec::with_capacity(rows.len());
    for row in &rows {
        assignments.push(assignment_from_row(row, offset)?);
    }

    debug!(count = assignments.len(), "Fetched assignments");
    Ok(assignments)
}

pub async fn fetch_schedules(pool: &PgPool) -> anyhow::Result<Vec<ScheduleEntry>> {
    let rows = sqlx::query(
        "SELECT id, course_id, day_of_week, start_time, end_time, location \
         FROM academic_tracker.schedules ORDER BY day_of_week ASC, start_time ASC",
    )
    .fetch_all(pool)
    .await?;

    let mut entries = Vec::with_capacity(rows.len());
    for row in rows {
        entries.push(ScheduleEntry {
            id: row.try_get("id")?,
            course_id: row.try_get("course_id")?,
            day_of_week: row.try_get("day_of_week")?,
            start_time: row.try_get("start_time")?,
            end_time: row.try_get("end_time")?,
            location: row.try_get("location")?,
        });
    }

    Ok(entries)
}

pub async fn create_assignment(
    pool: &PgPool,
    new: NewAssignment,
    offset: &FixedOffset,
) -> anyhow::Result<Assignment> {
    new.clone().into_assignment(0).validate()?;
    let query = format!(
        r#"
        INSERT INTO academic_tracker.assignments
        (course_id, title, description, due_date, priority, grade)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {ASSIGNMENT_COLUMNS}
        "#
    );
    let row = sqlx::query(&query)
        .bind(new.course_id)
        .bind(&new.title)
        .bind(&new.description)
        .bind(due_timestamp(&new.due_date, offset)?)
        .bind(new.priority.to_string())
        .bind(new.grade)
        .fetch_one(pool)
        .await
        .with_context(|| format!("failed to create assignment for course {}", new.course_id))?;

    let assignment = assignment_from_row(&row, offset)?;
    info!(id = assignment.id, course_id = assignment.course_id, "Assignment created");
    Ok(assignment)
}

pub async fn set_completed(
    pool: &PgPool,
    id: i64,
    completed: bool,
    offset: &FixedOffset,
) -> anyhow::Result<Assignment> {
    let query = format!(
        "UPDATE academic_tracker.assignments SET completed = $2 WHERE id = $1 \
         RETURNING {ASSIGNMENT_COLUMNS}"
    );
    let row = sqlx::query(&query)
        .bind(id)
        .bind(completed)
        .fetch_optional(pool)
        .await?
        .with_context(|| format!("assignment {id} does not exist"))?;
    assignment_from_row(&row, offset)
}

pub async fn set_grade(
    pool: &PgPool,
    id: i64,
    grade: Option<f64>,
    offset: &FixedOffset,
) -> anyhow::Result<Assignment> {
    let query = format!(
        "UPDATE academic_tracker.assignments SET grade = $2 WHERE id = $1 \
         RETURNING {ASSIGNMENT_COLUMNS}"
    );
    let row = sqlx::query(&query)
        .bind(id)
        .bind(grade)
        .fetch_optional(pool)
        .await?
        .with_context(|| format!("assignment {id} does not exist"))?;
    assignment_from_row(&row, offset)
}

pub async fn delete_assignment(pool: &PgPool, id: i64) -> anyhow::Result<()> {
    let result = sqlx::query("DELETE FROM academic_tracker.assignments WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        anyhow::bail!("assignment {id} does not exist");
    }
    info!(id, "Assignment deleted");
    Ok(())
}

/// Assignments and schedule rows go with the course via ON DELETE CASCADE.
pub async fn delete_course(pool: &PgPool, id: i64) -> anyhow::Result<()> {
    let result = sqlx::query("DELETE FROM academic_tracker.courses WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        anyhow::bail!("course {id} does not exist");
    }
    info!(id, "Course deleted");
    Ok(())
}

pub async fn import_csv(
    pool: &PgPool,
    csv_path: &std::path::Path,
    offset: &FixedOffset,
) -> anyhow::Result<usize> {
    let rows = store::read_assignment_csv(csv_path)?;
    let mut tx = pool.begin().await?;
    let mut inserted = 0usize;

    for row in &rows {
        let new = &row.assignment;
        new.clone().into_assignment(0).validate()?;

        let result = sqlx::query(
            r#"
            INSERT INTO academic_tracker.assignments
            (course_id, title, description, due_date, priority, grade, source_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(new.course_id)
        .bind(&new.title)
        .bind(&new.description)
        .bind(due_timestamp(&new.due_date, offset)?)
        .bind(new.priority.to_string())
        .bind(new.grade)
        .bind(&row.source_key)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("failed to import row {}", row.source_key))?;

        if result.rows_affected() > 0 {
            inserted += 1;
        }
    }

    tx.commit().await?;
    info!(inserted, skipped = rows.len() - inserted, "CSV import committed");
    Ok(inserted)
}
