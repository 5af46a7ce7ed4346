//! Response normalization.
//!
//! Model replies are expected to hold one JSON object, sometimes wrapped in
//! a fenced code block. Replies are parsed into schemas whose fields are all
//! optional, then merged with the computed statistics. Every field the
//! model left out is filled with a placeholder so merged reports always
//! carry the full set of keys.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::error;

use crate::error::InsightError;
use crate::models::{
    ClassAnalysis, ClassInsight, ClassReport, RosterAnalysis, RosterReport, StudentAnalysis,
    StudentInsights, StudentReport, SubjectReport,
};

pub const NO_SUMMARY: &str = "No summary generated.";
pub const NO_SUBJECT_INSIGHT: &str = "No analysis generated.";
pub const NO_SUGGESTION: &str = "No suggestion generated.";
pub const NO_EVOLUTION: &str = "No evolution analysis generated.";
pub const NO_REPORTS_ANALYSIS: &str = "No report analysis generated.";
pub const NO_CLASS_INSIGHT: &str = "No insight generated.";

#[derive(Debug, Default, Deserialize)]
pub struct SubjectInsightReply {
    pub subject: Option<String>,
    pub insight: Option<String>,
    pub teaching_suggestion: Option<String>,
}

/// Reply schema for a class analysis.
#[derive(Debug, Default, Deserialize)]
pub struct ClassInsightReply {
    pub pedagogical_summary: Option<String>,
    pub subject_insights: Option<Vec<SubjectInsightReply>>,
    pub attention_points: Option<Vec<String>>,
}

/// Reply schema for a student analysis.
#[derive(Debug, Default, Deserialize)]
pub struct StudentInsightReply {
    pub overall_summary: Option<String>,
    pub evolution_analysis: Option<String>,
    pub reports_analysis: Option<String>,
    pub strengths: Option<Vec<String>>,
    pub improvement_areas: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ClassInsightEntry {
    /// Models echo ids as numbers or as strings.
    pub class_id: Option<Value>,
    pub insight: Option<String>,
}

impl ClassInsightEntry {
    fn matches(&self, id: u64) -> bool {
        match &self.class_id {
            Some(Value::Number(n)) => n.as_u64() == Some(id),
            Some(Value::String(s)) => s.trim().parse::<u64>().ok() == Some(id),
            _ => false,
        }
    }
}

/// Reply schema for the roster summary.
#[derive(Debug, Default, Deserialize)]
pub struct RosterInsightReply {
    pub overall_summary: Option<String>,
    pub class_insights: Option<Vec<ClassInsightEntry>>,
}

/// Trim the reply and drop a surrounding code fence, if any.
pub fn strip_code_fence(raw: &str) -> &str {
    let mut text = raw.trim();

    if let Some(rest) = text.strip_prefix("```") {
        // Skip the language tag on the opening line.
        let tag_len = rest
            .find(|c: char| !c.is_ascii_alphanumeric())
            .unwrap_or(rest.len());
        text = &rest[tag_len..];
    }
    if let Some(rest) = text.trim_end().strip_suffix("```") {
        text = rest;
    }

    text.trim()
}

/// Strictly parse a reply into a JSON object.
pub fn parse_json_reply(raw: &str) -> Result<Value, InsightError> {
    let cleaned = strip_code_fence(raw);

    let invalid = |reason: String| {
        error!("Model reply is not a valid JSON object: {}. Raw reply: {}", reason, raw);
        InsightError::InvalidInsightResponse {
            reason,
            raw: raw.to_string(),
        }
    };

    let value: Value = serde_json::from_str(cleaned).map_err(|e| invalid(e.to_string()))?;
    if !value.is_object() {
        return Err(invalid("expected a JSON object".to_string()));
    }
    Ok(value)
}

/// Parse a reply into one of the reply schemas.
pub fn parse_reply<T: DeserializeOwned>(raw: &str) -> Result<T, InsightError> {
    let value = parse_json_reply(raw)?;
    serde_json::from_value(value).map_err(|e| {
        error!("Model reply does not match the expected schema: {}. Raw reply: {}", e, raw);
        InsightError::InvalidInsightResponse {
            reason: e.to_string(),
            raw: raw.to_string(),
        }
    })
}

fn or_placeholder(value: Option<String>, placeholder: &str) -> String {
    match value {
        Some(text) if !text.trim().is_empty() => text,
        _ => placeholder.to_string(),
    }
}

/// Merge a class reply with the statistics it was generated from.
///
/// Subject insights are matched by subject name, case-insensitively.
pub fn merge_class(analysis: ClassAnalysis, reply: ClassInsightReply) -> ClassReport {
    let mut insights = reply.subject_insights.unwrap_or_default();

    let subjects = analysis
        .subjects
        .into_iter()
        .map(|stats| {
            let found = insights.iter().position(|i| {
                i.subject
                    .as_deref()
                    .is_some_and(|s| s.trim().eq_ignore_ascii_case(&stats.subject))
            });
            let entry = found.map(|i| insights.remove(i)).unwrap_or_default();
            SubjectReport {
                stats,
                insight: or_placeholder(entry.insight, NO_SUBJECT_INSIGHT),
                teaching_suggestion: or_placeholder(entry.teaching_suggestion, NO_SUGGESTION),
            }
        })
        .collect();

    ClassReport {
        class_id: analysis.class_id,
        class_name: analysis.class_name,
        period_id: analysis.period_id,
        period_name: analysis.period_name,
        pedagogical_summary: or_placeholder(reply.pedagogical_summary, NO_SUMMARY),
        general_stats: analysis.general_stats,
        subjects,
        top_student: analysis.top_student,
        bottom_student: analysis.bottom_student,
        attention_points: reply.attention_points.unwrap_or_default(),
    }
}

pub fn merge_student(analysis: StudentAnalysis, reply: StudentInsightReply) -> StudentReport {
    StudentReport {
        statistics: analysis,
        insights: StudentInsights {
            overall_summary: or_placeholder(reply.overall_summary, NO_SUMMARY),
            evolution_analysis: or_placeholder(reply.evolution_analysis, NO_EVOLUTION),
            reports_analysis: or_placeholder(reply.reports_analysis, NO_REPORTS_ANALYSIS),
            strengths: reply.strengths.unwrap_or_default(),
            improvement_areas: reply.improvement_areas.unwrap_or_default(),
        },
    }
}

pub fn merge_roster(analysis: RosterAnalysis, reply: RosterInsightReply) -> RosterReport {
    let insights = reply.class_insights.unwrap_or_default();
    let classes = analysis
        .classes
        .into_iter()
        .map(|class| {
            let insight = insights
                .iter()
                .find(|entry| entry.matches(class.class_id))
                .and_then(|entry| entry.insight.clone());
            ClassInsight {
                class,
                insight: or_placeholder(insight, NO_CLASS_INSIGHT),
            }
        })
        .collect();

    RosterReport {
        overall_summary: or_placeholder(reply.overall_summary, NO_SUMMARY),
        metrics: analysis.metrics,
        classes,
    }
}
