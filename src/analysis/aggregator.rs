//! Grade aggregation for class, student and roster scopes.
//!
//! This module turns flat grade records into the statistical contexts that
//! are shown to teachers and sent to the text-generation model. Grouping
//! preserves first-encounter order so the same input always produces the
//! same output.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use tracing::debug;

use super::stats::{self, round2};
use crate::error::InsightError;
use crate::models::{
    Class, ClassAnalysis, ClassHeadcount, CompiledReport, GeneralStats, GradeRecord,
    GradingPolicy, Period, PeriodMean, RankedStudent, ReportNote, RosterAnalysis, RosterMetrics,
    Student, StudentAnalysis, StudentOverallStats, Subject, SubjectAggregate,
};

/// Label for subjects missing from the dataset.
const UNKNOWN_SUBJECT: &str = "N/A";

/// Label for reports not attached to any period.
const GENERAL_PERIOD: &str = "General";

/// Group values by key, keeping keys in the order they first appear.
fn group_ordered<K, V, I>(items: I) -> Vec<(K, Vec<V>)>
where
    K: Eq + Hash + Clone,
    I: IntoIterator<Item = (K, V)>,
{
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<(K, Vec<V>)> = Vec::new();

    for (key, value) in items {
        match index.get(&key) {
            Some(&i) => groups[i].1.push(value),
            None => {
                index.insert(key.clone(), groups.len());
                groups.push((key, vec![value]));
            }
        }
    }

    groups
}

fn subject_names(subjects: &[Subject]) -> HashMap<u64, &str> {
    subjects.iter().map(|s| (s.id, s.name.as_str())).collect()
}

/// First configured period containing `date`.
pub fn period_for_date(periods: &[Period], date: chrono::NaiveDate) -> Result<&Period, InsightError> {
    periods
        .iter()
        .find(|p| p.contains(date))
        .ok_or(InsightError::MissingPeriod { date })
}

/// The most recently created period (highest id).
pub fn latest_period(periods: &[Period]) -> Result<&Period, InsightError> {
    periods
        .iter()
        .max_by_key(|p| p.id)
        .ok_or(InsightError::NoPeriodsConfigured)
}

/// Period of a grade: its recorded period if configured, else by date.
pub fn resolve_period<'a>(
    grade: &GradeRecord,
    periods: &'a [Period],
) -> Result<&'a Period, InsightError> {
    if let Some(period) = grade
        .period_id
        .and_then(|id| periods.iter().find(|p| p.id == id))
    {
        return Ok(period);
    }
    period_for_date(periods, grade.date)
}

/// Statistics for one subject. `scores` must not be empty.
pub fn subject_aggregate(subject: &str, scores: &[f64]) -> SubjectAggregate {
    SubjectAggregate {
        subject: subject.to_string(),
        mean: round2(stats::mean(scores)),
        median: round2(stats::median(scores)),
        stddev: stats::stddev_sample(scores),
        max: stats::max(scores),
        min: stats::min(scores),
    }
}

fn presented(student: RankedStudent) -> RankedStudent {
    RankedStudent {
        mean: round2(student.mean),
        ..student
    }
}

/// Build the statistical context for one class in one period.
///
/// Only grades of roster students dated inside the period count. Students
/// without grades stay in the ranking with a mean of 0.
pub fn build_class_analysis(
    class: &Class,
    period: &Period,
    roster: &[Student],
    grades: &[GradeRecord],
    subjects: &[Subject],
    policy: &GradingPolicy,
) -> Result<ClassAnalysis, InsightError> {
    let enrolled: HashSet<u64> = roster.iter().map(|s| s.id).collect();
    let in_scope: Vec<&GradeRecord> = grades
        .iter()
        .filter(|g| enrolled.contains(&g.student_id) && period.contains(g.date))
        .collect();

    debug!(
        "Class {} / {}: {} of {} grades in scope",
        class.name,
        period.name,
        in_scope.len(),
        grades.len()
    );

    if in_scope.is_empty() {
        return Err(InsightError::EmptyDataset {
            class: class.name.clone(),
            period: period.name.clone(),
        });
    }

    let names = subject_names(subjects);
    let by_subject = group_ordered(in_scope.iter().map(|g| {
        let name = names.get(&g.subject_id).copied().unwrap_or(UNKNOWN_SUBJECT);
        (name, g.score)
    }));
    let subject_stats: Vec<SubjectAggregate> = by_subject
        .iter()
        .map(|(name, scores)| subject_aggregate(name, scores))
        .collect();

    let student_means: Vec<RankedStudent> = roster
        .iter()
        .map(|student| {
            let scores: Vec<f64> = in_scope
                .iter()
                .filter(|g| g.student_id == student.id)
                .map(|g| g.score)
                .collect();
            RankedStudent {
                student_id: student.id,
                name: student.name.clone(),
                mean: stats::mean(&scores),
            }
        })
        .collect();

    let pass_count = student_means
        .iter()
        .filter(|s| policy.is_passing(s.mean))
        .count();

    let all_scores: Vec<f64> = in_scope.iter().map(|g| g.score).collect();
    let general_stats = GeneralStats {
        student_count: roster.len(),
        evaluation_count: all_scores.len(),
        mean: round2(stats::mean(&all_scores)),
        median: round2(stats::median(&all_scores)),
        stddev: stats::stddev_sample(&all_scores),
        pass_count,
        fail_count: student_means.len() - pass_count,
    };

    Ok(ClassAnalysis {
        class_id: class.id,
        class_name: class.name.clone(),
        period_id: period.id,
        period_name: period.name.clone(),
        general_stats,
        subjects: subject_stats,
        top_student: stats::best(&student_means, |s| s.mean).map(presented),
        bottom_student: stats::worst(&student_means, |s| s.mean).map(presented),
    })
}

/// Build the statistical context for one student across every period.
pub fn build_student_analysis(
    student: &Student,
    grades: &[GradeRecord],
    subjects: &[Subject],
    periods: &[Period],
    reports: &[ReportNote],
) -> Result<StudentAnalysis, InsightError> {
    let own: Vec<&GradeRecord> = grades
        .iter()
        .filter(|g| g.student_id == student.id)
        .collect();

    if own.is_empty() {
        return Err(InsightError::NoGrades {
            student: student.name.clone(),
        });
    }

    let mut by_period_input = Vec::with_capacity(own.len());
    for grade in &own {
        let period = resolve_period(grade, periods)?;
        by_period_input.push((period.name.as_str(), grade.score));
    }
    let evolution: Vec<PeriodMean> = group_ordered(by_period_input)
        .into_iter()
        .map(|(period, scores)| PeriodMean {
            period: period.to_string(),
            mean: round2(stats::mean(&scores)),
        })
        .collect();

    let names = subject_names(subjects);
    let subject_means: Vec<(String, f64)> = group_ordered(own.iter().map(|g| {
        let name = names.get(&g.subject_id).copied().unwrap_or(UNKNOWN_SUBJECT);
        (name, g.score)
    }))
    .into_iter()
    .map(|(name, scores)| (name.to_string(), stats::mean(&scores)))
    .collect();

    let best_subject = stats::best(&subject_means, |s| s.1).map(|s| s.0);
    let worst_subject = stats::rank_asc(&subject_means, |s| s.1)
        .into_iter()
        .next()
        .map(|s| s.0);

    let all_scores: Vec<f64> = own.iter().map(|g| g.score).collect();

    let compiled: Vec<CompiledReport> = reports
        .iter()
        .filter(|r| r.student_id == student.id)
        .map(|r| CompiledReport {
            period: r
                .period_id
                .and_then(|id| periods.iter().find(|p| p.id == id))
                .map(|p| p.name.clone())
                .unwrap_or_else(|| GENERAL_PERIOD.to_string()),
            text: r.text.clone(),
        })
        .collect();

    Ok(StudentAnalysis {
        student_id: student.id,
        student_name: student.name.clone(),
        overall: StudentOverallStats {
            mean: round2(stats::mean(&all_scores)),
            best_subject,
            worst_subject,
            evaluation_count: all_scores.len(),
        },
        evolution,
        reports: compiled,
    })
}

/// Enrollment overview over the first `limit` classes.
///
/// Fails with `NoClasses` when no class falls inside the limit.
pub fn build_roster_analysis(
    classes: &[Class],
    students: &[Student],
    limit: usize,
) -> Result<RosterAnalysis, InsightError> {
    let headcounts: Vec<ClassHeadcount> = classes
        .iter()
        .take(limit)
        .map(|class| ClassHeadcount {
            class_id: class.id,
            name: class.name.clone(),
            description: class.description.clone(),
            student_count: students.iter().filter(|s| s.class_id == class.id).count(),
        })
        .collect();

    if headcounts.is_empty() {
        return Err(InsightError::NoClasses);
    }

    let total_students: usize = headcounts.iter().map(|c| c.student_count).sum();
    let mean_students_per_class = round2(total_students as f64 / headcounts.len() as f64);

    let size = |c: &ClassHeadcount| c.student_count as f64;
    let largest_class = stats::best(&headcounts, size);
    let smallest_class = stats::rank_asc(&headcounts, size).into_iter().next();

    Ok(RosterAnalysis {
        metrics: RosterMetrics {
            total_classes: headcounts.len(),
            total_students,
            mean_students_per_class,
            largest_class,
            smallest_class,
        },
        classes: headcounts,
    })
}
