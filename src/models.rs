use chrono::Weekday;
use serde::{Deserialize, Deserializer, Serialize};

use crate::dates;
use crate::error::InvalidInput;

pub const DEFAULT_COURSE_COLOR: &str = "#5B3FF9";

/// One weighted component of a course grade, e.g. "Exams" at 40%.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeCategory {
    pub name: String,
    pub weight: f64,
    #[serde(default)]
    pub current_grade: Option<f64>,
}

impl GradeCategory {
    pub fn new(name: &str, weight: f64, current_grade: Option<f64>) -> Self {
        Self {
            name: name.to_string(),
            weight,
            current_grade,
        }
    }

    /// Categories a freshly created course starts with.
    pub fn defaults() -> Vec<GradeCategory> {
        vec![
            GradeCategory::new("Assignments", 30.0, None),
            GradeCategory::new("Exams", 40.0, None),
            GradeCategory::new("Participation", 10.0, None),
            GradeCategory::new("Final Project", 20.0, None),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    #[serde(rename = "Id")]
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub professor: String,
    pub credits: f64,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default, deserialize_with = "categories_from_record")]
    pub grade_categories: Vec<GradeCategory>,
}

impl Course {
    pub fn weight_total(&self) -> f64 {
        self.grade_categories.iter().map(|c| c.weight).sum()
    }

    /// Records (or clears) the current grade of the named category.
    pub fn set_category_grade(&mut self, name: &str, grade: Option<f64>) -> Result<(), InvalidInput> {
        if let Some(value) = grade.filter(|g| !g.is_finite()) {
            return Err(InvalidInput::NonFiniteNumber {
                field: "currentGrade",
                value,
            });
        }
        let category = self
            .grade_categories
            .iter_mut()
            .find(|c| c.name.eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| InvalidInput::UnknownCategory(name.to_string()))?;
        category.current_grade = grade;
        Ok(())
    }

    /// Checks the constraints the course form enforces before a write.
    pub fn validate(&self) -> Result<(), InvalidInput> {
        if !self.credits.is_finite() {
            return Err(InvalidInput::NonFiniteNumber {
                field: "credits",
                value: self.credits,
            });
        }
        if self.credits <= 0.0 {
            return Err(InvalidInput::Credits(self.credits));
        }

        for category in &self.grade_categories {
            if !category.weight.is_finite() {
                return Err(InvalidInput::NonFiniteNumber {
                    field: "weight",
                    value: category.weight,
                });
            }
            if let Some(grade) = category.current_grade {
                if !grade.is_finite() {
                    return Err(InvalidInput::NonFiniteNumber {
                        field: "currentGrade",
                        value: grade,
                    });
                }
            }
        }

        let total = self.weight_total();
        if !self.grade_categories.is_empty() && (total - 100.0).abs() > 1e-9 {
            return Err(InvalidInput::WeightTotal(total));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize, clap::ValueEnum)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
        };
        f.write_str(label)
    }
}

impl std::str::FromStr for Priority {
    type Err = InvalidInput;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            _ => Err(InvalidInput::Priority(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    #[serde(rename = "Id")]
    pub id: i64,
    #[serde(alias = "courseId_c")]
    pub course_id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// ISO-8601 date or timestamp, parsed on demand.
    pub due_date: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub grade: Option<f64>,
}

impl Assignment {
    pub fn validate(&self) -> Result<(), InvalidInput> {
        dates::parse_date(&self.due_date, &dates::utc())?;
        if let Some(grade) = self.grade {
            if !grade.is_finite() {
                return Err(InvalidInput::NonFiniteNumber {
                    field: "grade",
                    value: grade,
                });
            }
        }
        Ok(())
    }
}

/// A recurring weekly class meeting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    #[serde(rename = "Id")]
    pub id: i64,
    #[serde(alias = "courseId_c")]
    pub course_id: i64,
    pub day_of_week: String,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub location: Option<String>,
}

impl ScheduleEntry {
    pub fn weekday(&self) -> Result<Weekday, InvalidInput> {
        self.day_of_week
            .trim()
            .parse::<Weekday>()
            .map_err(|_| InvalidInput::Weekday(self.day_of_week.clone()))
    }
}

fn default_color() -> String {
    DEFAULT_COURSE_COLOR.to_string()
}

/// The remote record API stores categories as a JSON-encoded string while the
/// mock store keeps a plain array; accept both.
fn categories_from_record<'de, D>(deserializer: D) -> Result<Vec<GradeCategory>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        List(Vec<GradeCategory>),
        Encoded(String),
        Missing(()),
    }

    match Raw::deserialize(deserializer)? {
        Raw::List(categories) => Ok(categories),
        Raw::Encoded(text) if text.trim().is_empty() => Ok(Vec::new()),
        Raw::Encoded(text) => serde_json::from_str(&text).map_err(serde::de::Error::custom),
        Raw::Missing(()) => Ok(Vec::new()),
    }
}
