//! School dataset loading.
//!
//! A dataset is a single JSON document holding periods, subjects, classes,
//! students, grades and teacher reports. It is validated on load so that
//! configuration mistakes (overlapping periods, out-of-range scores) are
//! reported here rather than surfacing halfway through an analysis.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::models::{Class, GradeRecord, GradingPolicy, Period, ReportNote, Student, Subject};

/// Everything the analyses read.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub periods: Vec<Period>,
    #[serde(default)]
    pub subjects: Vec<Subject>,
    #[serde(default)]
    pub classes: Vec<Class>,
    #[serde(default)]
    pub students: Vec<Student>,
    #[serde(default)]
    pub grades: Vec<GradeRecord>,
    #[serde(default)]
    pub reports: Vec<ReportNote>,
}

impl Dataset {
    /// Load and validate a dataset from a JSON file.
    pub fn load(path: &Path, policy: &GradingPolicy) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read dataset: {}", path.display()))?;

        let dataset = Self::from_json(&content)
            .with_context(|| format!("Failed to parse dataset: {}", path.display()))?;

        dataset
            .validate(policy)
            .with_context(|| format!("Invalid dataset: {}", path.display()))?;

        debug!(
            "Loaded dataset: {} classes, {} students, {} grades, {} periods",
            dataset.classes.len(),
            dataset.students.len(),
            dataset.grades.len(),
            dataset.periods.len()
        );

        Ok(dataset)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Check the invariants the analyses rely on.
    pub fn validate(&self, policy: &GradingPolicy) -> Result<()> {
        for period in &self.periods {
            if period.start_date > period.end_date {
                bail!("Period '{}' ends before it starts", period.name);
            }
        }

        for (i, a) in self.periods.iter().enumerate() {
            for b in &self.periods[i + 1..] {
                if a.overlaps(b) {
                    bail!("Periods overlap: {} and {}", a, b);
                }
            }
        }

        for grade in &self.grades {
            if !grade.score.is_finite() || grade.score < 0.0 || grade.score > policy.max_score {
                bail!(
                    "Score {} for student {} on {} is outside 0-{}",
                    grade.score,
                    grade.student_id,
                    grade.date,
                    policy.max_score
                );
            }
        }

        Ok(())
    }

    pub fn class(&self, id: u64) -> Option<&Class> {
        self.classes.iter().find(|c| c.id == id)
    }

    pub fn student(&self, id: u64) -> Option<&Student> {
        self.students.iter().find(|s| s.id == id)
    }

    pub fn period(&self, id: u64) -> Option<&Period> {
        self.periods.iter().find(|p| p.id == id)
    }

    /// Students enrolled in a class, in dataset order.
    pub fn roster(&self, class_id: u64) -> Vec<Student> {
        self.students
            .iter()
            .filter(|s| s.class_id == class_id)
            .cloned()
            .collect()
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::io::Write;

    #[test]
    fn test_fixture_is_valid() {
        let dataset = fixtures::school();
        assert!(dataset.validate(&GradingPolicy::default()).is_ok());
        assert_eq!(dataset.classes.len(), 3);
        assert_eq!(dataset.roster(10).len(), 3);
        assert_eq!(dataset.roster(12).len(), 0);
    }

    #[test]
    fn test_overlapping_periods_rejected() {
        let mut dataset = fixtures::school();
        dataset.periods.push(Period {
            id: 3,
            name: "Overlap".to_string(),
            start_date: NaiveDate::from_ymd_opt(2025, 4, 15).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 5, 15).unwrap(),
        });
        let err = dataset.validate(&GradingPolicy::default()).unwrap_err();
        assert!(err.to_string().contains("overlap"));
    }

    #[test]
    fn test_inverted_period_rejected() {
        let mut dataset = fixtures::school();
        dataset.periods[0].end_date = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        assert!(dataset.validate(&GradingPolicy::default()).is_err());
    }

    #[test]
    fn test_out_of_range_score_rejected() {
        let mut dataset = fixtures::school();
        dataset.grades[0].score = 101.0;
        assert!(dataset.validate(&GradingPolicy::default()).is_err());

        let ten_point = GradingPolicy {
            max_score: 10.0,
            pass_threshold: 6.0,
        };
        assert!(fixtures::school().validate(&ten_point).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(fixtures::SCHOOL_JSON.as_bytes()).unwrap();

        let dataset = Dataset::load(file.path(), &GradingPolicy::default()).unwrap();
        assert_eq!(dataset.student(1).map(|s| s.name.as_str()), Some("Ana Souza"));
        assert_eq!(dataset.period(2).map(|p| p.name.as_str()), Some("2nd Bimester"));
        assert!(dataset.class(99).is_none());
    }

    #[test]
    fn test_missing_sections_default_to_empty() {
        let dataset = Dataset::from_json("{}").unwrap();
        assert!(dataset.grades.is_empty());
        assert!(dataset.periods.is_empty());
    }
}
