use crate::models::Course;

/// One rung of the grade scale: closed lower bound, letter and GPA points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradeBand {
    pub min: f64,
    pub letter: &'static str,
    pub points: f64,
}

const fn band(min: f64, letter: &'static str, points: f64) -> GradeBand {
    GradeBand { min, letter, points }
}

/// Letters and points share one table so the two scales cannot drift apart.
pub const GRADE_SCALE: [GradeBand; 11] = [
    band(97.0, "A+", 4.0),
    band(93.0, "A", 3.7),
    band(90.0, "A-", 3.3),
    band(87.0, "B+", 3.0),
    band(83.0, "B", 2.7),
    band(80.0, "B-", 2.3),
    band(77.0, "C+", 2.0),
    band(73.0, "C", 1.7),
    band(70.0, "C-", 1.3),
    band(67.0, "D+", 1.0),
    band(65.0, "D", 0.7),
];

pub const FAILING: GradeBand = band(f64::NEG_INFINITY, "F", 0.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradeColor {
    Success,
    Info,
    Accent,
    Warning,
    Error,
}

impl GradeColor {
    pub fn as_str(&self) -> &'static str {
        match self {
            GradeColor::Success => "success",
            GradeColor::Info => "info",
            GradeColor::Accent => "accent",
            GradeColor::Warning => "warning",
            GradeColor::Error => "error",
        }
    }
}

const COLOR_SCALE: [(f64, GradeColor); 4] = [
    (90.0, GradeColor::Success),
    (80.0, GradeColor::Info),
    (70.0, GradeColor::Accent),
    (60.0, GradeColor::Warning),
];

/// Walks a descending `(lower_bound, value)` ladder; the first bound the value
/// reaches wins, anything below every bound (including NaN) gets `floor`.
pub fn ladder<T: Copy>(rungs: &[(f64, T)], floor: T, value: f64) -> T {
    rungs
        .iter()
        .find(|(min, _)| value >= *min)
        .map(|(_, rung)| *rung)
        .unwrap_or(floor)
}

pub fn grade_band(grade: f64) -> GradeBand {
    let rungs = GRADE_SCALE.map(|b| (b.min, b));
    ladder(&rungs, FAILING, grade)
}

pub fn grade_points(grade: f64) -> f64 {
    grade_band(grade).points
}

pub fn letter_grade(grade: f64) -> &'static str {
    grade_band(grade).letter
}

pub fn grade_color(grade: f64) -> GradeColor {
    ladder(&COLOR_SCALE, GradeColor::Error, grade)
}

/// Current grade so far: the weighted average of graded categories only,
/// re-normalized against the graded weight. `None` when nothing is graded.
pub fn course_grade(course: &Course) -> Option<f64> {
    if course.grade_categories.is_empty() {
        return None;
    }

    let mut total_weight = 0.0;
    let mut weighted_score = 0.0;

    for category in &course.grade_categories {
        if let Some(grade) = category.current_grade {
            weighted_score += grade * category.weight / 100.0;
            total_weight += category.weight;
        }
    }

    if total_weight > 0.0 {
        Some(weighted_score / total_weight * 100.0)
    } else {
        None
    }
}

/// Credit-weighted GPA over courses that have a grade; ungraded courses are
/// left out of both sums rather than counted as zero.
pub fn gpa(courses: &[Course]) -> f64 {
    let mut total_points = 0.0;
    let mut total_credits = 0.0;

    for course in courses {
        if let Some(grade) = course_grade(course) {
            total_points += grade_points(grade) * course.credits;
            total_credits += course.credits;
        }
    }

    if total_credits > 0.0 {
        total_points / total_credits
    } else {
        0.0
    }
}
