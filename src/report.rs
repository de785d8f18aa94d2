use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::grade::{format_gpa, Classification};
use crate::models::SemesterRecord;
use crate::stats::Summary;

pub fn top_students(records: &[SemesterRecord], limit: usize) -> Vec<&SemesterRecord> {
    let mut ranked: Vec<&SemesterRecord> = records.iter().collect();
    ranked.sort_by(|a, b| b.gpa.partial_cmp(&a.gpa).unwrap_or(std::cmp::Ordering::Equal));
    ranked.truncate(limit);
    ranked
}

pub fn build_report(
    generated_at: DateTime<Utc>,
    summary: &Summary,
    records: &[SemesterRecord],
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Semester GPA Report");
    let _ = writeln!(
        output,
        "Generated {} from {} records (average GPA {})",
        generated_at.format("%Y-%m-%d %H:%M UTC"),
        summary.count,
        format_gpa(summary.average_gpa)
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Classification Mix");

    if summary.count == 0 {
        let _ = writeln!(output, "No records found.");
    } else {
        for bucket in summary.buckets.iter().filter(|b| b.count > 0) {
            let _ = writeln!(
                output,
                "- {}: {} ({:.1}%)",
                bucket.classification, bucket.count, bucket.percent
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Highest GPAs");

    let top = top_students(records, 10);
    if top.is_empty() {
        let _ = writeln!(output, "No records found.");
    } else {
        for record in top {
            let _ = writeln!(
                output,
                "- {} ({}) GPA {} {}",
                record.name,
                record.semester,
                format_gpa(record.gpa),
                record.classification
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Students Needing Support");

    let flagged: Vec<&SemesterRecord> = records
        .iter()
        .filter(|r| {
            matches!(
                r.classification,
                Classification::Probation | Classification::Fail
            )
        })
        .collect();
    if flagged.is_empty() {
        let _ = writeln!(output, "No students on probation or failing.");
    } else {
        for record in flagged {
            let _ = writeln!(
                output,
                "- {} ({}): {} with GPA {}",
                record.name,
                record.semester,
                record.classification,
                format_gpa(record.gpa)
            );
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grade::compute_simple;
    use crate::models::StudentInfo;
    use crate::stats::summarize_records;
    use chrono::TimeZone;

    fn record(name: &str, marks: &[u8]) -> SemesterRecord {
        SemesterRecord::new(
            StudentInfo::new(name, "Fall").unwrap(),
            compute_simple(marks),
        )
    }

    #[test]
    fn ranks_by_gpa_descending() {
        let records = vec![record("Ali", &[60]), record("Sara", &[90]), record("Omar", &[75])];
        let names: Vec<&str> = top_students(&records, 2)
            .into_iter()
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(names, vec!["Sara", "Omar"]);
    }

    #[test]
    fn report_lists_mix_and_flagged_students() {
        let records = vec![record("Ali", &[90]), record("Sara", &[88]), record("Omar", &[30])];
        let summary = summarize_records(records.clone());
        let generated_at = Utc.with_ymd_and_hms(2026, 1, 15, 9, 30, 0).unwrap();

        let report = build_report(generated_at, &summary, &records);

        assert!(report.starts_with("# Semester GPA Report\n"));
        assert!(report.contains("Generated 2026-01-15 09:30 UTC from 3 records"));
        assert!(report.contains("- Excellent: 2 (66.7%)"));
        assert!(report.contains("- Fail: 1 (33.3%)"));
        assert!(!report.contains("- Good:"));
        assert!(report.contains("- Omar (Fall): Fail with GPA 0.00"));
    }

    #[test]
    fn empty_report_says_so() {
        let summary = summarize_records(Vec::new());
        let report = build_report(Utc::now(), &summary, &[]);
        assert!(report.contains("No records found."));
        assert!(report.contains("No students on probation or failing."));
    }
}
