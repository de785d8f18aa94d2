use serde::Serialize;

use crate::grade::Classification;
use crate::models::SemesterRecord;
use crate::store::RecordStore;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketShare {
    pub classification: Classification,
    pub count: usize,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub count: usize,
    pub average_gpa: f64,
    pub buckets: Vec<BucketShare>,
}

impl Summary {
    pub fn bucket(&self, classification: Classification) -> Option<&BucketShare> {
        self.buckets
            .iter()
            .find(|bucket| bucket.classification == classification)
    }
}

pub fn summarize(store: &RecordStore) -> Summary {
    summarize_records(store.list_all())
}

/// Buckets use the stored classification label rather than re-deriving it
/// from the GPA.
pub fn summarize_records<I>(records: I) -> Summary
where
    I: IntoIterator<Item = SemesterRecord>,
{
    let mut counts = [0usize; Classification::ALL.len()];
    let mut count = 0usize;
    let mut gpa_total = 0.0;

    for record in records {
        count += 1;
        gpa_total += record.gpa;
        if let Some(slot) = Classification::ALL
            .iter()
            .position(|band| *band == record.classification)
        {
            counts[slot] += 1;
        }
    }

    let buckets = Classification::ALL
        .into_iter()
        .zip(counts)
        .map(|(classification, bucket_count)| BucketShare {
            classification,
            count: bucket_count,
            percent: if count == 0 {
                0.0
            } else {
                share_percent(bucket_count, count)
            },
        })
        .collect();

    Summary {
        count,
        average_gpa: if count == 0 {
            0.0
        } else {
            gpa_total / count as f64
        },
        buckets,
    }
}

// Percent of `total` to one decimal place.
fn share_percent(part: usize, total: usize) -> f64 {
    (part as f64 * 1000.0 / total as f64).round() / 10.0
}
