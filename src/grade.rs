use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::models::{Computation, Subject};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Grade {
    A,
    #[serde(rename = "A-")]
    AMinus,
    #[serde(rename = "B+")]
    BPlus,
    B,
    #[serde(rename = "B-")]
    BMinus,
    #[serde(rename = "C+")]
    CPlus,
    C,
    #[serde(rename = "C-")]
    CMinus,
    #[serde(rename = "D+")]
    DPlus,
    D,
    F,
}

impl Grade {
    pub const ALL: [Grade; 11] = [
        Grade::A,
        Grade::AMinus,
        Grade::BPlus,
        Grade::B,
        Grade::BMinus,
        Grade::CPlus,
        Grade::C,
        Grade::CMinus,
        Grade::DPlus,
        Grade::D,
        Grade::F,
    ];

    pub fn points(self) -> f64 {
        match self {
            Grade::A => 4.00,
            Grade::AMinus => 3.66,
            Grade::BPlus => 3.33,
            Grade::B => 3.00,
            Grade::BMinus => 2.66,
            Grade::CPlus => 2.33,
            Grade::C => 2.00,
            Grade::CMinus => 1.66,
            Grade::DPlus => 1.33,
            Grade::D => 1.00,
            Grade::F => 0.00,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Grade::A => "A",
            Grade::AMinus => "A-",
            Grade::BPlus => "B+",
            Grade::B => "B",
            Grade::BMinus => "B-",
            Grade::CPlus => "C+",
            Grade::C => "C",
            Grade::CMinus => "C-",
            Grade::DPlus => "D+",
            Grade::D => "D",
            Grade::F => "F",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Grade {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Grade::ALL
            .into_iter()
            .find(|grade| grade.symbol() == value)
            .ok_or_else(|| format!("unknown letter grade {value:?}"))
    }
}

/// Coarse GPA band, ordered best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Classification {
    Excellent,
    Good,
    Average,
    Probation,
    Fail,
}

impl Classification {
    pub const ALL: [Classification; 5] = [
        Classification::Excellent,
        Classification::Good,
        Classification::Average,
        Classification::Probation,
        Classification::Fail,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Classification::Excellent => "Excellent",
            Classification::Good => "Good",
            Classification::Average => "Average",
            Classification::Probation => "Probation",
            Classification::Fail => "Fail",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Classification {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Classification::ALL
            .into_iter()
            .find(|band| band.label() == value)
            .ok_or_else(|| format!("unknown classification {value:?}"))
    }
}

/// Marks are expected in 0..=100; anything above 100 lands in the top band.
pub fn letter_for(mark: u8) -> Grade {
    match mark {
        85..=u8::MAX => Grade::A,
        80..=84 => Grade::AMinus,
        75..=79 => Grade::BPlus,
        71..=74 => Grade::B,
        68..=70 => Grade::BMinus,
        63..=67 => Grade::CPlus,
        60..=62 => Grade::C,
        57..=59 => Grade::CMinus,
        54..=56 => Grade::DPlus,
        50..=53 => Grade::D,
        _ => Grade::F,
    }
}

pub fn points_for(mark: u8) -> f64 {
    letter_for(mark).points()
}

pub fn classify(gpa: f64) -> Classification {
    if gpa >= 3.66 {
        Classification::Excellent
    } else if gpa >= 3.00 {
        Classification::Good
    } else if gpa >= 2.00 {
        Classification::Average
    } else if gpa > 0.0 {
        Classification::Probation
    } else {
        Classification::Fail
    }
}

pub fn weighted_gpa(subjects: &[Subject]) -> f64 {
    let credits: u32 = subjects.iter().map(|s| u32::from(s.credits())).sum();
    if credits == 0 {
        return 0.0;
    }
    let weighted: f64 = subjects
        .iter()
        .map(|s| s.points() * f64::from(s.credits()))
        .sum();
    weighted / f64::from(credits)
}

pub fn simple_gpa(marks: &[u8]) -> f64 {
    if marks.is_empty() {
        return 0.0;
    }
    let total: f64 = marks.iter().map(|mark| points_for(*mark)).sum();
    total / marks.len() as f64
}

pub fn compute_simple(marks: &[u8]) -> Computation {
    let gpa = simple_gpa(marks);
    Computation {
        gpa,
        classification: classify(gpa),
        subjects: None,
    }
}

pub fn compute_weighted(subjects: Vec<Subject>) -> Computation {
    let gpa = weighted_gpa(&subjects);
    Computation {
        gpa,
        classification: classify(gpa),
        subjects: Some(subjects),
    }
}

/// Two-decimal GPA text. Rounds half-up on the shortest decimal form of the
/// value so stored files match those written by the legacy desktop tool.
pub fn format_gpa(gpa: f64) -> String {
    if !gpa.is_finite() || gpa < 0.0 {
        return format!("{gpa:.2}");
    }

    let repr = gpa.to_string();
    let (whole, frac) = repr.split_once('.').unwrap_or((repr.as_str(), ""));
    let mut digits = String::from(whole);
    digits.extend(frac.chars().chain(std::iter::repeat('0')).take(2));

    let Ok(mut hundredths) = digits.parse::<u64>() else {
        return format!("{gpa:.2}");
    };
    if frac.as_bytes().get(2).is_some_and(|digit| *digit >= b'5') {
        hundredths += 1;
    }

    format!("{}.{:02}", hundredths / 100, hundredths % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subject(marks: i64, credits: i64) -> Subject {
        Subject::new("Subject", marks, credits).unwrap()
    }

    #[test]
    fn top_band_covers_85_to_100() {
        for mark in 85..=100 {
            assert_eq!(points_for(mark), 4.00);
            assert_eq!(letter_for(mark), Grade::A);
        }
    }

    #[test]
    fn failing_band_covers_0_to_49() {
        for mark in 0..=49 {
            assert_eq!(points_for(mark), 0.00);
            assert_eq!(letter_for(mark), Grade::F);
        }
    }

    #[test]
    fn thresholds_use_inclusive_lower_bounds() {
        let expected = [
            (50, 1.00, "D"),
            (49, 0.00, "F"),
            (54, 1.33, "D+"),
            (57, 1.66, "C-"),
            (60, 2.00, "C"),
            (63, 2.33, "C+"),
            (68, 2.66, "B-"),
            (70, 2.66, "B-"),
            (71, 3.00, "B"),
            (75, 3.33, "B+"),
            (80, 3.66, "A-"),
            (84, 3.66, "A-"),
        ];
        for (mark, points, letter) in expected {
            assert_eq!(points_for(mark), points, "points for {mark}");
            assert_eq!(letter_for(mark).symbol(), letter, "letter for {mark}");
        }
    }

    #[test]
    fn classification_boundaries() {
        assert_eq!(classify(0.0), Classification::Fail);
        assert_eq!(classify(0.01), Classification::Probation);
        assert_eq!(classify(1.99), Classification::Probation);
        assert_eq!(classify(2.0), Classification::Average);
        assert_eq!(classify(3.0), Classification::Good);
        assert_eq!(classify(3.65), Classification::Good);
        assert_eq!(classify(3.66), Classification::Excellent);
        assert_eq!(classify(4.0), Classification::Excellent);
    }

    #[test]
    fn weighted_gpa_uses_credit_hours() {
        let subjects = vec![subject(90, 3), subject(60, 1)];
        assert!((weighted_gpa(&subjects) - 3.50).abs() < 1e-9);
    }

    #[test]
    fn weighted_gpa_without_credits_is_zero() {
        assert_eq!(weighted_gpa(&[]), 0.0);
    }

    #[test]
    fn simple_gpa_is_mean_of_points() {
        let gpa = simple_gpa(&[90, 80, 75]);
        assert!((gpa - (4.00 + 3.66 + 3.33) / 3.0).abs() < 1e-9);
        assert_eq!(simple_gpa(&[]), 0.0);
    }

    #[test]
    fn compute_weighted_keeps_subject_order() {
        let result = compute_weighted(vec![subject(40, 2), subject(88, 4)]);
        let grades: Vec<Grade> = result
            .subjects
            .as_deref()
            .unwrap()
            .iter()
            .map(|s| s.grade())
            .collect();
        assert_eq!(grades, vec![Grade::F, Grade::A]);
        assert_eq!(result.classification, Classification::Average);
    }

    #[test]
    fn labels_parse_back() {
        for grade in Grade::ALL {
            assert_eq!(grade.symbol().parse::<Grade>().unwrap(), grade);
        }
        for band in Classification::ALL {
            assert_eq!(band.label().parse::<Classification>().unwrap(), band);
        }
        assert!("E".parse::<Grade>().is_err());
        assert!("excellent".parse::<Classification>().is_err());
    }

    #[test]
    fn gpa_text_rounds_half_up() {
        assert_eq!(format_gpa(0.0), "0.00");
        assert_eq!(format_gpa(4.0), "4.00");
        assert_eq!(format_gpa(3.5), "3.50");
        assert_eq!(format_gpa(0.125), "0.13");
        assert_eq!(format_gpa(1.005), "1.01");
        assert_eq!(format_gpa((4.00 + 3.66 + 3.33) / 3.0), "3.66");
        assert_eq!(format_gpa(3.996), "4.00");
    }
}
