//! Markdown report generation.
//!
//! This module renders merged analyses (and bare class statistics) as
//! Markdown for the terminal or a file, plus a JSON rendering of any of them.

use crate::models::{
    ClassAnalysis, ClassReport, GeneralStats, RankedStudent, RosterMetrics, RosterReport,
    StudentReport, SubjectAggregate, SubjectReport,
};
use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;
use std::path::Path;

/// Generate the Markdown report for a class analysis.
pub fn generate_class_markdown(report: &ClassReport) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "# Class {} - {}\n\n",
        report.class_name, report.period_name
    ));

    output.push_str("## Pedagogical Summary\n\n");
    output.push_str(&report.pedagogical_summary);
    output.push_str("\n\n");

    output.push_str(&generate_general_stats_section(&report.general_stats));
    output.push_str(&generate_subject_insights_section(&report.subjects));
    output.push_str(&generate_highlights_section(
        report.top_student.as_ref(),
        report.bottom_student.as_ref(),
    ));
    output.push_str(&generate_list_section("Attention Points", &report.attention_points));

    output.push_str(&generate_footer());

    output
}

/// Generate a statistics-only Markdown report for a class.
pub fn generate_stats_markdown(analysis: &ClassAnalysis) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "# Class {} - {} (statistics)\n\n",
        analysis.class_name, analysis.period_name
    ));

    output.push_str(&generate_general_stats_section(&analysis.general_stats));

    output.push_str("## Subjects\n\n");
    output.push_str(&subject_table_header());
    for subject in &analysis.subjects {
        output.push_str(&subject_table_row(subject));
    }
    output.push('\n');

    output.push_str(&generate_highlights_section(
        analysis.top_student.as_ref(),
        analysis.bottom_student.as_ref(),
    ));

    output.push_str(&generate_footer());

    output
}

/// Generate the Markdown report for a student analysis.
pub fn generate_student_markdown(report: &StudentReport) -> String {
    let stats = &report.statistics;
    let insights = &report.insights;
    let mut output = String::new();

    output.push_str(&format!("# Student {}\n\n", stats.student_name));

    output.push_str("## Summary\n\n");
    output.push_str(&insights.overall_summary);
    output.push_str("\n\n");

    output.push_str("## Overall\n\n");
    output.push_str(&format!("- **Mean:** {:.2}\n", stats.overall.mean));
    output.push_str(&format!(
        "- **Evaluations:** {}\n",
        stats.overall.evaluation_count
    ));
    output.push_str(&format!(
        "- **Best subject:** {}\n",
        stats.overall.best_subject.as_deref().unwrap_or("-")
    ));
    output.push_str(&format!(
        "- **Worst subject:** {}\n\n",
        stats.overall.worst_subject.as_deref().unwrap_or("-")
    ));

    output.push_str("## Evolution\n\n");
    output.push_str("| Period | Mean |\n");
    output.push_str("|:---|:---:|\n");
    for point in &stats.evolution {
        output.push_str(&format!("| {} | {:.2} |\n", point.period, point.mean));
    }
    output.push('\n');
    output.push_str(&insights.evolution_analysis);
    output.push_str("\n\n");

    output.push_str("## Teacher Reports\n\n");
    if stats.reports.is_empty() {
        output.push_str("No reports recorded.\n\n");
    } else {
        for report in &stats.reports {
            output.push_str(&format!("- **{}:** {}\n", report.period, report.text));
        }
        output.push('\n');
    }
    output.push_str(&insights.reports_analysis);
    output.push_str("\n\n");

    output.push_str(&generate_list_section("Strengths", &insights.strengths));
    output.push_str(&generate_list_section(
        "Areas to Improve",
        &insights.improvement_areas,
    ));

    output.push_str(&generate_footer());

    output
}

/// Generate the Markdown report for the roster summary.
pub fn generate_roster_markdown(report: &RosterReport) -> String {
    let mut output = String::new();

    output.push_str("# Classes Overview\n\n");

    output.push_str("## Summary\n\n");
    output.push_str(&report.overall_summary);
    output.push_str("\n\n");

    output.push_str(&generate_roster_metrics_section(&report.metrics));

    output.push_str("## Classes\n\n");
    for class in &report.classes {
        output.push_str(&format!(
            "### {} ({} students)\n\n",
            class.class.name, class.class.student_count
        ));
        if !class.class.description.is_empty() {
            output.push_str(&format!("*{}*\n\n", class.class.description));
        }
        output.push_str(&format!("> {}\n\n", class.insight));
    }

    output.push_str(&generate_footer());

    output
}

fn generate_general_stats_section(stats: &GeneralStats) -> String {
    let mut section = String::new();

    section.push_str("## General Statistics\n\n");
    section.push_str("| Students | Evaluations | Mean | Median | Std Dev | Passing | Failing |\n");
    section.push_str("|:---:|:---:|:---:|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {} | {:.2} | {:.2} | {:.2} | {} | {} |\n\n",
        stats.student_count,
        stats.evaluation_count,
        stats.mean,
        stats.median,
        stats.stddev,
        stats.pass_count,
        stats.fail_count
    ));

    section
}

fn subject_table_header() -> String {
    "| Subject | Mean | Median | Std Dev | Max | Min |\n|:---|:---:|:---:|:---:|:---:|:---:|\n"
        .to_string()
}

fn subject_table_row(subject: &SubjectAggregate) -> String {
    format!(
        "| {} | {:.2} | {:.2} | {:.2} | {:.2} | {:.2} |\n",
        subject.subject, subject.mean, subject.median, subject.stddev, subject.max, subject.min
    )
}

fn generate_subject_insights_section(subjects: &[SubjectReport]) -> String {
    let mut section = String::new();

    section.push_str("## Subjects\n\n");
    section.push_str(&subject_table_header());
    for subject in subjects {
        section.push_str(&subject_table_row(&subject.stats));
    }
    section.push('\n');

    for subject in subjects {
        section.push_str(&format!("### {}\n\n", subject.stats.subject));
        section.push_str(&format!("{}\n\n", subject.insight));
        section.push_str(&format!(
            "> **Suggestion:** {}\n\n",
            subject.teaching_suggestion
        ));
    }

    section
}

fn generate_highlights_section(
    top: Option<&RankedStudent>,
    bottom: Option<&RankedStudent>,
) -> String {
    let mut section = String::new();

    section.push_str("## Highlights\n\n");
    match top {
        Some(s) => section.push_str(&format!("- **Top student:** {} ({:.2})\n", s.name, s.mean)),
        None => section.push_str("- **Top student:** -\n"),
    }
    match bottom {
        Some(s) => section.push_str(&format!(
            "- **Needs most support:** {} ({:.2})\n",
            s.name, s.mean
        )),
        None => section.push_str("- **Needs most support:** -\n"),
    }
    section.push('\n');

    section
}

fn generate_roster_metrics_section(metrics: &RosterMetrics) -> String {
    let mut section = String::new();

    section.push_str("## Metrics\n\n");
    section.push_str(&format!("- **Classes:** {}\n", metrics.total_classes));
    section.push_str(&format!("- **Students:** {}\n", metrics.total_students));
    section.push_str(&format!(
        "- **Students per class:** {:.2}\n",
        metrics.mean_students_per_class
    ));
    if let Some(ref largest) = metrics.largest_class {
        section.push_str(&format!(
            "- **Largest class:** {} ({})\n",
            largest.name, largest.student_count
        ));
    }
    if let Some(ref smallest) = metrics.smallest_class {
        section.push_str(&format!(
            "- **Smallest class:** {} ({})\n",
            smallest.name, smallest.student_count
        ));
    }
    section.push('\n');

    section
}

fn generate_list_section(title: &str, items: &[String]) -> String {
    let mut section = format!("## {}\n\n", title);

    if items.is_empty() {
        section.push_str("None noted.\n\n");
        return section;
    }

    for item in items {
        section.push_str(&format!("- {}\n", item));
    }
    section.push('\n');

    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str("*Report generated by ClassInsight*\n");

    footer
}

/// Generate a JSON report.
pub fn generate_json<T: Serialize>(report: &T) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Write rendered output to `path`, or to stdout when no path is given.
pub fn write_output(content: &str, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            let mut file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            file.write_all(content.as_bytes())?;
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(content.as_bytes())?;
            stdout.flush()?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{build_class_analysis, build_roster_analysis, build_student_analysis};
    use crate::dataset::fixtures;
    use crate::insight::normalizer::{
        merge_class, merge_roster, merge_student, ClassInsightReply, RosterInsightReply,
        StudentInsightReply, NO_CLASS_INSIGHT,
    };
    use crate::models::GradingPolicy;

    fn class_analysis() -> ClassAnalysis {
        let data = fixtures::school();
        build_class_analysis(
            data.class(10).unwrap(),
            data.period(1).unwrap(),
            &data.roster(10),
            &data.grades,
            &data.subjects,
            &GradingPolicy::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_generate_class_markdown() {
        let reply = ClassInsightReply {
            pedagogical_summary: Some("Solid start.".to_string()),
            attention_points: Some(vec!["Support Carla.".to_string()]),
            ..Default::default()
        };
        let markdown = generate_class_markdown(&merge_class(class_analysis(), reply));

        assert!(markdown.contains("# Class 5A - 1st Bimester"));
        assert!(markdown.contains("Solid start."));
        assert!(markdown.contains("| 3 | 6 | 65.00 | 65.00 | 18.71 | 2 | 1 |"));
        assert!(markdown.contains("| Mathematics | 63.33 | 60.00 | 25.17 | 90.00 | 40.00 |"));
        assert!(markdown.contains("- Support Carla."));
        assert!(markdown.contains("**Top student:** Ana Souza (80.00)"));
    }

    #[test]
    fn test_generate_stats_markdown_has_no_insights() {
        let markdown = generate_stats_markdown(&class_analysis());

        assert!(markdown.contains("(statistics)"));
        assert!(markdown.contains("| Portuguese | 66.67 | 70.00 | 15.28 | 80.00 | 50.00 |"));
        assert!(!markdown.contains("Suggestion"));
    }

    #[test]
    fn test_generate_student_markdown() {
        let data = fixtures::school();
        let analysis = build_student_analysis(
            data.student(1).unwrap(),
            &data.grades,
            &data.subjects,
            &data.periods,
            &data.reports,
        )
        .unwrap();
        let markdown =
            generate_student_markdown(&merge_student(analysis, StudentInsightReply::default()));

        assert!(markdown.contains("# Student Ana Souza"));
        assert!(markdown.contains("| 1st Bimester | 80.00 |"));
        assert!(markdown.contains("| 2nd Bimester | 100.00 |"));
        assert!(markdown.contains("- **General:** Helps classmates during group work."));
        assert!(markdown.contains("## Strengths\n\nNone noted."));
    }

    #[test]
    fn test_generate_roster_markdown() {
        let data = fixtures::school();
        let analysis = build_roster_analysis(&data.classes, &data.students, 5).unwrap();
        let markdown =
            generate_roster_markdown(&merge_roster(analysis, RosterInsightReply::default()));

        assert!(markdown.contains("- **Students per class:** 1.67"));
        assert!(markdown.contains("### 5A (3 students)"));
        assert!(markdown.contains("*Morning class, strong in reading*"));
        assert!(markdown.contains(&format!("> {}", NO_CLASS_INSIGHT)));
    }

    #[test]
    fn test_generate_json() {
        let json = generate_json(&class_analysis()).unwrap();

        assert!(json.contains("\"general_stats\""));
        assert!(json.contains("\"top_student\""));
    }

    #[test]
    fn test_write_output_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.md");

        write_output("# Title\n", Some(&path)).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# Title\n");
    }
}
