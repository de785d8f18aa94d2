use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

use crate::grade::{self, Classification, Grade};

/// Input rejected before it reaches the grade engine or the store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("marks must be between 0 and 100, got {0}")]
    MarksOutOfRange(i64),

    #[error("credit hours must be between 1 and 6, got {0}")]
    CreditsOutOfRange(i64),

    #[error("{field} must not contain line breaks")]
    LineBreak { field: &'static str },

    #[error("subject name must not contain the \" | \" delimiter")]
    Delimiter,

    #[error("expected NAME:MARKS:CREDITS, got {0:?}")]
    Malformed(String),
}

pub fn validate_marks(marks: i64) -> Result<u8, ValidationError> {
    match u8::try_from(marks) {
        Ok(value) if value <= 100 => Ok(value),
        _ => Err(ValidationError::MarksOutOfRange(marks)),
    }
}

pub fn validate_credits(credits: i64) -> Result<u8, ValidationError> {
    match u8::try_from(credits) {
        Ok(value) if (1..=6).contains(&value) => Ok(value),
        _ => Err(ValidationError::CreditsOutOfRange(credits)),
    }
}

fn validate_text(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::Empty { field });
    }
    if value.contains(['\n', '\r']) {
        return Err(ValidationError::LineBreak { field });
    }
    Ok(value.to_string())
}

/// Checks a student name used as a lookup key.
pub fn validate_name(name: &str) -> Result<String, ValidationError> {
    validate_text("name", name)
}

/// One graded subject. The letter grade is fixed when the subject is built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Subject {
    name: String,
    marks: u8,
    credits: u8,
    grade: Grade,
}

impl Subject {
    pub fn new(name: &str, marks: i64, credits: i64) -> Result<Self, ValidationError> {
        let marks = validate_marks(marks)?;
        Self::from_stored(name, marks.into(), credits, grade::letter_for(marks))
    }

    /// Rebuilds a subject from persisted fields, keeping the stored grade.
    pub(crate) fn from_stored(
        name: &str,
        marks: i64,
        credits: i64,
        grade: Grade,
    ) -> Result<Self, ValidationError> {
        let name = validate_text("subject name", name)?;
        if name.contains(" | ") {
            return Err(ValidationError::Delimiter);
        }
        Ok(Self {
            name,
            marks: validate_marks(marks)?,
            credits: validate_credits(credits)?,
            grade,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn marks(&self) -> u8 {
        self.marks
    }

    pub fn credits(&self) -> u8 {
        self.credits
    }

    pub fn grade(&self) -> Grade {
        self.grade
    }

    pub fn points(&self) -> f64 {
        self.grade.points()
    }
}

/// Parses the `NAME:MARKS:CREDITS` form used on the command line.
impl FromStr for Subject {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let mut parts = value.rsplitn(3, ':');
        let (Some(credits), Some(marks), Some(name)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(ValidationError::Malformed(value.to_string()));
        };
        let marks = marks
            .trim()
            .parse::<i64>()
            .map_err(|_| ValidationError::Malformed(value.to_string()))?;
        let credits = credits
            .trim()
            .parse::<i64>()
            .map_err(|_| ValidationError::Malformed(value.to_string()))?;
        Subject::new(name, marks, credits)
    }
}

/// Validated name and semester label collected from the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentInfo {
    pub name: String,
    pub semester: String,
}

impl StudentInfo {
    pub fn new(name: &str, semester: &str) -> Result<Self, ValidationError> {
        Ok(Self {
            name: validate_text("name", name)?,
            semester: validate_text("semester", semester)?,
        })
    }
}

/// Result of running the grade engine over one semester's marks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Computation {
    pub gpa: f64,
    pub classification: Classification,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subjects: Option<Vec<Subject>>,
}

/// One student's semester as stored in a block. `subjects` is `None` for
/// summary blocks that only carry the GPA.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SemesterRecord {
    pub name: String,
    pub semester: String,
    pub gpa: f64,
    pub classification: Classification,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subjects: Option<Vec<Subject>>,
}

impl SemesterRecord {
    pub fn new(student: StudentInfo, computation: Computation) -> Self {
        Self {
            name: student.name,
            semester: student.semester,
            gpa: computation.gpa,
            classification: computation.classification,
            subjects: computation.subjects,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_computes_grade_once() {
        let subject = Subject::new("  Calculus ", 82, 3).unwrap();
        assert_eq!(subject.name(), "Calculus");
        assert_eq!(subject.grade(), Grade::AMinus);
        assert_eq!(subject.points(), 3.66);
    }

    #[test]
    fn subject_rejects_out_of_range_input() {
        assert_eq!(
            Subject::new("Physics", 101, 3),
            Err(ValidationError::MarksOutOfRange(101))
        );
        assert_eq!(
            Subject::new("Physics", -1, 3),
            Err(ValidationError::MarksOutOfRange(-1))
        );
        assert_eq!(
            Subject::new("Physics", 70, 0),
            Err(ValidationError::CreditsOutOfRange(0))
        );
        assert_eq!(
            Subject::new("Physics", 70, 7),
            Err(ValidationError::CreditsOutOfRange(7))
        );
        assert_eq!(
            Subject::new("  ", 70, 3),
            Err(ValidationError::Empty {
                field: "subject name"
            })
        );
    }

    #[test]
    fn subject_rejects_text_that_breaks_the_file_format() {
        assert_eq!(
            Subject::new("Lab | Theory", 70, 3),
            Err(ValidationError::Delimiter)
        );
        assert_eq!(
            StudentInfo::new("Ali\nSara", "Fall"),
            Err(ValidationError::LineBreak { field: "name" })
        );
    }

    #[test]
    fn subject_parses_command_line_form() {
        let subject: Subject = "Data Structures: Lab:91:4".parse().unwrap();
        assert_eq!(subject.name(), "Data Structures: Lab");
        assert_eq!(subject.marks(), 91);
        assert_eq!(subject.credits(), 4);

        assert!(matches!(
            "Physics:70".parse::<Subject>(),
            Err(ValidationError::Malformed(_))
        ));
        assert!(matches!(
            "Physics:seventy:3".parse::<Subject>(),
            Err(ValidationError::Malformed(_))
        ));
    }

    #[test]
    fn lookup_name_must_not_be_blank() {
        assert_eq!(validate_name("  Sara "), Ok("Sara".to_string()));
        assert_eq!(
            validate_name("   "),
            Err(ValidationError::Empty { field: "name" })
        );
    }

    #[test]
    fn student_info_trims_fields() {
        let info = StudentInfo::new(" Ali ", " Fall 2025 ").unwrap();
        assert_eq!(info.name, "Ali");
        assert_eq!(info.semester, "Fall 2025");
        assert_eq!(
            StudentInfo::new("Ali", ""),
            Err(ValidationError::Empty { field: "semester" })
        );
    }
}
