use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::models::{Subject, ValidationError};

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("row {row}: {source}")]
    Invalid {
        row: usize,
        #[source]
        source: ValidationError,
    },
}

#[derive(Debug, Deserialize)]
struct SubjectRow {
    subject: String,
    marks: i64,
    #[serde(default)]
    credits: Option<i64>,
}

/// Reads `subject,marks,credits` rows. A missing credits column or cell
/// counts as one credit hour.
pub fn read_subjects(path: &Path) -> Result<Vec<Subject>, ImportError> {
    read_subjects_from(csv::Reader::from_path(path)?)
}

pub fn read_subjects_from<R: Read>(mut reader: csv::Reader<R>) -> Result<Vec<Subject>, ImportError> {
    let mut subjects = Vec::new();

    for (index, result) in reader.deserialize::<SubjectRow>().enumerate() {
        let row = result?;
        let subject = Subject::new(&row.subject, row.marks, row.credits.unwrap_or(1))
            .map_err(|source| ImportError::Invalid {
                row: index + 1,
                source,
            })?;
        subjects.push(subject);
    }

    Ok(subjects)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grade::Grade;

    fn reader(text: &str) -> csv::Reader<&[u8]> {
        csv::Reader::from_reader(text.as_bytes())
    }

    #[test]
    fn reads_rows_in_order() {
        let subjects =
            read_subjects_from(reader("subject,marks,credits\nCalculus,90,3\nEnglish,62,\n")).unwrap();

        assert_eq!(subjects.len(), 2);
        assert_eq!(subjects[0].name(), "Calculus");
        assert_eq!(subjects[0].credits(), 3);
        assert_eq!(subjects[0].grade(), Grade::A);
        assert_eq!(subjects[1].credits(), 1);
        assert_eq!(subjects[1].grade(), Grade::C);
    }

    #[test]
    fn credits_column_is_optional() {
        let subjects = read_subjects_from(reader("subject,marks\nPhysics,71\n")).unwrap();
        assert_eq!(subjects[0].credits(), 1);
    }

    #[test]
    fn reports_invalid_row() {
        let err = read_subjects_from(reader("subject,marks,credits\nCalculus,90,3\nLab,120,1\n"))
            .unwrap_err();
        assert!(matches!(
            err,
            ImportError::Invalid {
                row: 2,
                source: ValidationError::MarksOutOfRange(120)
            }
        ));
    }

    #[test]
    fn reports_malformed_csv() {
        let err = read_subjects_from(reader("subject,marks\nCalculus,ninety\n")).unwrap_err();
        assert!(matches!(err, ImportError::Csv(_)));
    }
}
