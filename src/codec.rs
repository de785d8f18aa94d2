//! Block format for semester records. Decoding is positional: each line
//! must carry the expected prefix at its expected place.

use std::io::{self, BufRead, Lines};

use thiserror::Error;

use crate::grade::{format_gpa, Classification, Grade};
use crate::models::{SemesterRecord, StudentInfo, Subject, ValidationError};

pub const NAME_PREFIX: &str = "Name: ";
pub const SEMESTER_PREFIX: &str = "Semester: ";
pub const GPA_PREFIX: &str = "GPA: ";
pub const CLASSIFICATION_PREFIX: &str = "Classification: ";
pub const SUBJECTS_HEADER: &str = "Subjects:";
pub const SUBJECT_INDENT: &str = "  ";
pub const FIELD_DELIMITER: &str = " | ";
pub const MARKS_PREFIX: &str = "Marks: ";
pub const CREDITS_PREFIX: &str = "Credits: ";
pub const GRADE_PREFIX: &str = "Grade: ";
pub const TERMINATOR: &str = "------------------------";

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("line {line}: expected `{expected}`, found {found:?}")]
    UnexpectedLine {
        line: usize,
        expected: &'static str,
        found: String,
    },

    #[error("line {line}: invalid {field} {value:?}")]
    InvalidValue {
        line: usize,
        field: &'static str,
        value: String,
    },

    #[error("line {line}: {source}")]
    Invalid {
        line: usize,
        #[source]
        source: ValidationError,
    },

    #[error("line {line}: block ends without a terminator")]
    Truncated { line: usize },

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl CodecError {
    /// Shifts block-relative line numbers to file line numbers.
    fn offset(self, by: usize) -> Self {
        match self {
            CodecError::UnexpectedLine {
                line,
                expected,
                found,
            } => CodecError::UnexpectedLine {
                line: line + by,
                expected,
                found,
            },
            CodecError::InvalidValue { line, field, value } => CodecError::InvalidValue {
                line: line + by,
                field,
                value,
            },
            CodecError::Invalid { line, source } => CodecError::Invalid {
                line: line + by,
                source,
            },
            CodecError::Truncated { line } => CodecError::Truncated { line: line + by },
            other => other,
        }
    }
}

pub fn is_terminator(line: &str) -> bool {
    line.trim() == TERMINATOR
}

/// A `Name:` line at any indentation. Subject lines are excluded so a
/// subject called "Name: ..." never splits its block.
pub fn is_block_start(line: &str) -> bool {
    line.trim_start().starts_with(NAME_PREFIX)
        && !line.contains(&format!("{FIELD_DELIMITER}{MARKS_PREFIX}"))
}

pub fn encode(record: &SemesterRecord) -> String {
    let mut block = String::new();
    push_line(&mut block, NAME_PREFIX, &record.name);
    push_line(&mut block, SEMESTER_PREFIX, &record.semester);
    push_line(&mut block, GPA_PREFIX, &format_gpa(record.gpa));
    push_line(&mut block, CLASSIFICATION_PREFIX, record.classification.label());

    if let Some(subjects) = &record.subjects {
        push_line(&mut block, SUBJECTS_HEADER, "");
        for subject in subjects {
            let line = format!(
                "{SUBJECT_INDENT}{}{FIELD_DELIMITER}{MARKS_PREFIX}{}{FIELD_DELIMITER}{CREDITS_PREFIX}{}{FIELD_DELIMITER}{GRADE_PREFIX}{}",
                subject.name(),
                subject.marks(),
                subject.credits(),
                subject.grade(),
            );
            push_line(&mut block, &line, "");
        }
    }

    push_line(&mut block, TERMINATOR, "");
    block
}

fn push_line(block: &mut String, prefix: &str, value: &str) {
    block.push_str(prefix);
    block.push_str(value);
    block.push('\n');
}

/// Walks a block's lines with 1-based positions for error reporting.
struct Cursor<'a, S> {
    lines: &'a [S],
    pos: usize,
}

impl<'a, S: AsRef<str>> Cursor<'a, S> {
    fn next_line(&mut self) -> Result<(usize, &'a str), CodecError> {
        let line = self
            .lines
            .get(self.pos)
            .ok_or(CodecError::Truncated { line: self.pos + 1 })?;
        self.pos += 1;
        Ok((self.pos, line.as_ref().trim()))
    }

    fn field(&mut self, prefix: &'static str) -> Result<(usize, &'a str), CodecError> {
        let (line, text) = self.next_line()?;
        // Trimming eats the prefix's trailing space when the value is empty.
        let value = if text == prefix.trim_end() {
            Some("")
        } else {
            text.strip_prefix(prefix)
        };
        let value = value.ok_or_else(|| CodecError::UnexpectedLine {
            line,
            expected: prefix,
            found: text.to_string(),
        })?;
        Ok((line, value.trim()))
    }
}

/// Decodes one block, terminator line included.
pub fn decode<S: AsRef<str>>(lines: &[S]) -> Result<SemesterRecord, CodecError> {
    let mut cursor = Cursor { lines, pos: 0 };

    let (name_line, name) = cursor.field(NAME_PREFIX)?;
    let (semester_line, semester) = cursor.field(SEMESTER_PREFIX)?;
    let (gpa_line, gpa_text) = cursor.field(GPA_PREFIX)?;
    let (class_line, class_text) = cursor.field(CLASSIFICATION_PREFIX)?;

    let info = StudentInfo::new(name, semester).map_err(|source| CodecError::Invalid {
        line: if name.is_empty() {
            name_line
        } else {
            semester_line
        },
        source,
    })?;
    let gpa = gpa_text
        .parse::<f64>()
        .ok()
        .filter(|gpa| gpa.is_finite())
        .ok_or_else(|| CodecError::InvalidValue {
            line: gpa_line,
            field: "GPA",
            value: gpa_text.to_string(),
        })?;
    let classification =
        class_text
            .parse::<Classification>()
            .map_err(|_| CodecError::InvalidValue {
                line: class_line,
                field: "classification",
                value: class_text.to_string(),
            })?;

    let (line, text) = cursor.next_line()?;
    let subjects = if text == TERMINATOR {
        None
    } else if text == SUBJECTS_HEADER {
        let mut subjects = Vec::new();
        loop {
            let (line, text) = cursor.next_line()?;
            if text == TERMINATOR {
                break;
            }
            subjects.push(decode_subject(line, text)?);
        }
        Some(subjects)
    } else {
        return Err(CodecError::UnexpectedLine {
            line,
            expected: SUBJECTS_HEADER,
            found: text.to_string(),
        });
    };

    if let Some(extra) = lines.get(cursor.pos) {
        return Err(CodecError::UnexpectedLine {
            line: cursor.pos + 1,
            expected: "end of block",
            found: extra.as_ref().to_string(),
        });
    }

    Ok(SemesterRecord {
        name: info.name,
        semester: info.semester,
        gpa,
        classification,
        subjects,
    })
}

fn decode_subject(line: usize, text: &str) -> Result<Subject, CodecError> {
    let parts: Vec<&str> = text.split(FIELD_DELIMITER).collect();
    let &[name, marks, credits, grade] = parts.as_slice() else {
        return Err(CodecError::UnexpectedLine {
            line,
            expected: "NAME | Marks: M | Credits: C | Grade: G",
            found: text.to_string(),
        });
    };

    let number = |part: &str, prefix: &'static str, field: &'static str| {
        part.strip_prefix(prefix)
            .and_then(|value| value.trim().parse::<i64>().ok())
            .ok_or_else(|| CodecError::InvalidValue {
                line,
                field,
                value: part.to_string(),
            })
    };
    let marks = number(marks, MARKS_PREFIX, "marks")?;
    let credits = number(credits, CREDITS_PREFIX, "credits")?;
    let grade = grade
        .strip_prefix(GRADE_PREFIX)
        .and_then(|value| value.trim().parse::<Grade>().ok())
        .ok_or_else(|| CodecError::InvalidValue {
            line,
            field: "grade",
            value: grade.to_string(),
        })?;

    Subject::from_stored(name, marks, credits, grade)
        .map_err(|source| CodecError::Invalid { line, source })
}

/// Yields the first decode failure and then ends.
pub struct BlockReader<R> {
    lines: Lines<R>,
    line_no: usize,
    done: bool,
}

impl<R: BufRead> BlockReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
            done: false,
        }
    }

    fn read_block(&mut self) -> Result<Option<Vec<String>>, CodecError> {
        let mut block = Vec::new();
        for line in self.lines.by_ref() {
            let line = line?;
            self.line_no += 1;
            let end = is_terminator(&line);
            block.push(line);
            if end {
                return Ok(Some(block));
            }
        }
        if block.is_empty() {
            Ok(None)
        } else {
            Err(CodecError::Truncated {
                line: self.line_no + 1,
            })
        }
    }
}

impl<R: BufRead> Iterator for BlockReader<R> {
    type Item = Result<SemesterRecord, CodecError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let start = self.line_no;
        let result = match self.read_block() {
            Ok(Some(block)) => decode(&block).map_err(|err| err.offset(start)),
            Ok(None) => {
                self.done = true;
                return None;
            }
            Err(err) => Err(err),
        };
        if result.is_err() {
            self.done = true;
        }
        Some(result)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Ends at its terminator, or at the next block start when that is missing.
    Block(Vec<String>),
    Loose(String),
}

impl Segment {
    pub fn key_line(&self) -> Option<&str> {
        match self {
            Segment::Block(lines) => lines.first().map(String::as_str),
            Segment::Loose(_) => None,
        }
    }
}

/// Splits a store file into raw blocks without decoding them.
pub struct Segments<R> {
    lines: Lines<R>,
    pending: Option<String>,
}

impl<R: BufRead> Segments<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            pending: None,
        }
    }
}

impl<R: BufRead> Iterator for Segments<R> {
    type Item = io::Result<Segment>;

    fn next(&mut self) -> Option<Self::Item> {
        let first = match self.pending.take() {
            Some(line) => line,
            None => match self.lines.next()? {
                Ok(line) => line,
                Err(err) => return Some(Err(err)),
            },
        };
        if !is_block_start(&first) {
            return Some(Ok(Segment::Loose(first)));
        }

        let mut block = vec![first];
        for line in self.lines.by_ref() {
            let line = match line {
                Ok(line) => line,
                Err(err) => return Some(Err(err)),
            };
            if is_block_start(&line) {
                self.pending = Some(line);
                break;
            }
            let end = is_terminator(&line);
            block.push(line);
            if end {
                break;
            }
        }
        Some(Ok(Segment::Block(block)))
    }
}
