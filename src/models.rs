//! Data models for the grade analyzer.
//!
//! This module contains the input records loaded from a school dataset,
//! the statistical aggregates computed from them, and the merged reports
//! that combine those aggregates with model-generated insights.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A grading period (e.g. a school bimester).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Period {
    pub id: u64,
    pub name: String,
    /// First day of the period (inclusive).
    pub start_date: NaiveDate,
    /// Last day of the period (inclusive).
    pub end_date: NaiveDate,
}

impl Period {
    /// Whether `date` falls inside `[start_date, end_date]`.
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date
    }

    /// Whether two periods share at least one day.
    pub fn overlaps(&self, other: &Period) -> bool {
        self.start_date <= other.end_date && other.start_date <= self.end_date
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} to {})", self.name, self.start_date, self.end_date)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub id: u64,
    pub name: String,
}

/// A class (group of students taught together).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Class {
    pub id: u64,
    pub name: String,
    /// Free-text description written by the teacher.
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: u64,
    pub name: String,
    /// Class the student is enrolled in.
    pub class_id: u64,
}

/// A single evaluation score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeRecord {
    pub student_id: u64,
    pub subject_id: u64,
    pub class_id: u64,
    /// Period the grade was assigned to, if recorded.
    #[serde(default)]
    pub period_id: Option<u64>,
    /// Date the evaluation took place.
    pub date: NaiveDate,
    /// Score on the 0-100 scale.
    pub score: f64,
}

/// A pedagogical report written by a teacher about one student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportNote {
    pub student_id: u64,
    #[serde(default)]
    pub period_id: Option<u64>,
    pub text: String,
}

/// Pass/fail policy on the grading scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradingPolicy {
    /// Highest valid score.
    pub max_score: f64,
    /// A student passes when their mean is at or above this value.
    pub pass_threshold: f64,
}

impl Default for GradingPolicy {
    fn default() -> Self {
        Self {
            max_score: 100.0,
            pass_threshold: 60.0,
        }
    }
}

impl GradingPolicy {
    pub fn is_passing(&self, mean: f64) -> bool {
        mean >= self.pass_threshold
    }
}

/// Descriptive statistics for one subject within a scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectAggregate {
    pub subject: String,
    pub mean: f64,
    pub median: f64,
    pub stddev: f64,
    pub max: f64,
    pub min: f64,
}

/// A student together with their mean score within a scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedStudent {
    pub student_id: u64,
    pub name: String,
    pub mean: f64,
}

/// Class-wide statistics over every individual grade in scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralStats {
    pub student_count: usize,
    pub evaluation_count: usize,
    pub mean: f64,
    pub median: f64,
    pub stddev: f64,
    pub pass_count: usize,
    pub fail_count: usize,
}

/// Full statistical context for one class in one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassAnalysis {
    pub class_id: u64,
    pub class_name: String,
    pub period_id: u64,
    pub period_name: String,
    pub general_stats: GeneralStats,
    pub subjects: Vec<SubjectAggregate>,
    pub top_student: Option<RankedStudent>,
    pub bottom_student: Option<RankedStudent>,
}

/// Mean score of a student within one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodMean {
    pub period: String,
    pub mean: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentOverallStats {
    pub mean: f64,
    pub best_subject: Option<String>,
    pub worst_subject: Option<String>,
    pub evaluation_count: usize,
}

/// A teacher report attached to the name of its period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledReport {
    pub period: String,
    pub text: String,
}

/// Full statistical context for one student across all periods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentAnalysis {
    pub student_id: u64,
    pub student_name: String,
    pub overall: StudentOverallStats,
    pub evolution: Vec<PeriodMean>,
    pub reports: Vec<CompiledReport>,
}

/// Enrollment size of a class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassHeadcount {
    pub class_id: u64,
    pub name: String,
    pub description: String,
    pub student_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterMetrics {
    pub total_classes: usize,
    pub total_students: usize,
    pub mean_students_per_class: f64,
    pub largest_class: Option<ClassHeadcount>,
    pub smallest_class: Option<ClassHeadcount>,
}

/// Enrollment overview across the teacher's classes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterAnalysis {
    pub metrics: RosterMetrics,
    pub classes: Vec<ClassHeadcount>,
}

/// Subject statistics merged with the model's commentary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectReport {
    #[serde(flatten)]
    pub stats: SubjectAggregate,
    pub insight: String,
    pub teaching_suggestion: String,
}

/// Persisted result of a class analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassReport {
    pub class_id: u64,
    pub class_name: String,
    pub period_id: u64,
    pub period_name: String,
    pub pedagogical_summary: String,
    pub general_stats: GeneralStats,
    pub subjects: Vec<SubjectReport>,
    pub top_student: Option<RankedStudent>,
    pub bottom_student: Option<RankedStudent>,
    pub attention_points: Vec<String>,
}

/// Free-text fields produced for a student analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentInsights {
    pub overall_summary: String,
    pub evolution_analysis: String,
    pub reports_analysis: String,
    pub strengths: Vec<String>,
    pub improvement_areas: Vec<String>,
}

/// Persisted result of a student analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentReport {
    pub statistics: StudentAnalysis,
    pub insights: StudentInsights,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassInsight {
    #[serde(flatten)]
    pub class: ClassHeadcount,
    pub insight: String,
}

/// Persisted result of the roster-level summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterReport {
    pub overall_summary: String,
    pub metrics: RosterMetrics,
    pub classes: Vec<ClassInsight>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn period(start: (i32, u32, u32), end: (i32, u32, u32)) -> Period {
        Period {
            id: 1,
            name: "1st Bimester".to_string(),
            start_date: NaiveDate::from_ymd_opt(start.0, start.1, start.2).unwrap(),
            end_date: NaiveDate::from_ymd_opt(end.0, end.1, end.2).unwrap(),
        }
    }

    #[test]
    fn test_period_contains_is_inclusive() {
        let p = period((2025, 2, 1), (2025, 4, 30));
        assert!(p.contains(NaiveDate::from_ymd_opt(2025, 2, 1).unwrap()));
        assert!(p.contains(NaiveDate::from_ymd_opt(2025, 4, 30).unwrap()));
        assert!(!p.contains(NaiveDate::from_ymd_opt(2025, 5, 1).unwrap()));
        assert!(!p.contains(NaiveDate::from_ymd_opt(2025, 1, 31).unwrap()));
    }

    #[test]
    fn test_period_overlap() {
        let first = period((2025, 2, 1), (2025, 4, 30));
        let touching = period((2025, 4, 30), (2025, 7, 31));
        let after = period((2025, 5, 1), (2025, 7, 31));
        assert!(first.overlaps(&touching));
        assert!(!first.overlaps(&after));
        assert!(!after.overlaps(&first));
    }

    #[test]
    fn test_grading_policy_threshold_is_inclusive() {
        let policy = GradingPolicy::default();
        assert!(policy.is_passing(60.0));
        assert!(!policy.is_passing(59.99));
    }

    #[test]
    fn test_subject_report_flattens_stats() {
        let report = SubjectReport {
            stats: SubjectAggregate {
                subject: "Math".to_string(),
                mean: 70.0,
                median: 70.0,
                stddev: 0.0,
                max: 70.0,
                min: 70.0,
            },
            insight: "Stable".to_string(),
            teaching_suggestion: "Keep going".to_string(),
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["subject"], "Math");
        assert_eq!(json["insight"], "Stable");
    }
}
