//! Prompt templates.
//!
//! Each scope has its own template: an instruction, the reply schema the
//! model must follow, and the analysis context as pretty-printed JSON.

use crate::error::InsightError;
use crate::models::{ClassAnalysis, GradingPolicy, RosterAnalysis, StudentAnalysis};

const CLASS_SCHEMA: &str = r#"{
  "pedagogical_summary": "A short interpretation of the class as a whole, naming strengths and what needs attention.",
  "subject_insights": [
    {
      "subject": "Subject name exactly as given",
      "insight": "What the numbers say about this subject. Comment on spread when the standard deviation is high and on possible causes when the mean is low.",
      "teaching_suggestion": "One concrete activity or teaching tip for this subject."
    }
  ],
  "attention_points": [
    "An observation about the student who struggles most, with an individual support idea.",
    "An observation about the class as a whole."
  ]
}"#;

const STUDENT_SCHEMA: &str = r#"{
  "overall_summary": "One paragraph combining the grades and the teacher reports into a profile of the student.",
  "evolution_analysis": "How the student's mean changed from period to period.",
  "reports_analysis": "Recurring themes in the teacher reports: behaviour, social and learning aspects.",
  "strengths": ["Two or three clear strengths taken from grades or reports."],
  "improvement_areas": ["Two or three areas to work on, each with a practical suggestion."]
}"#;

const ROSTER_SCHEMA: &str = r#"{
  "overall_summary": "A short, objective reading of the set of classes.",
  "class_insights": [
    {
      "class_id": 1,
      "insight": "Using the class description and size, one observation about this class, with a suggestion when relevant."
    }
  ]
}"#;

fn render(instruction: &str, schema: &str, heading: &str, context: &str) -> String {
    format!(
        "{instruction}\n\n\
         Reply ONLY with valid JSON in exactly this structure, with no text outside the JSON:\n\
         {schema}\n\n\
         {heading}:\n\
         ```json\n{context}\n```\n"
    )
}

/// Prompt for one class in one period.
pub fn class_prompt(analysis: &ClassAnalysis, policy: &GradingPolicy) -> Result<String, InsightError> {
    let context = serde_json::to_string_pretty(analysis)?;
    let instruction = format!(
        "You are helping a teacher understand how class {} did in {}. \
         Scores range from 0 to {}, and a student passes with a mean of at least {}. \
         Use the statistics below to write practical pedagogical insights.",
        analysis.class_name, analysis.period_name, policy.max_score, policy.pass_threshold
    );
    Ok(render(
        &instruction,
        CLASS_SCHEMA,
        "Class statistics",
        &context,
    ))
}

/// Prompt for one student across all periods.
pub fn student_prompt(analysis: &StudentAnalysis) -> Result<String, InsightError> {
    let context = serde_json::to_string_pretty(analysis)?;
    let instruction = format!(
        "You are writing a holistic development summary of the student {}. \
         Combine the grade evolution with the teacher reports below.",
        analysis.student_name
    );
    Ok(render(
        &instruction,
        STUDENT_SCHEMA,
        "Student data",
        &context,
    ))
}

/// Prompt for the enrollment overview.
pub fn roster_prompt(analysis: &RosterAnalysis) -> Result<String, InsightError> {
    let context = serde_json::to_string_pretty(analysis)?;
    let instruction = "You are reviewing a teacher's classes. \
                       Use each class description and its number of students to comment on the group.";
    Ok(render(
        instruction,
        ROSTER_SCHEMA,
        "Class overview",
        &context,
    ))
}

/// Reject prompts longer than `max` characters.
pub fn check_length(prompt: &str, max: usize) -> Result<(), InsightError> {
    let len = prompt.chars().count();
    if len > max {
        return Err(InsightError::PromptTooLarge { len, max });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{build_class_analysis, build_roster_analysis, build_student_analysis};
    use crate::dataset::fixtures;

    #[test]
    fn test_class_prompt_embeds_context_and_scale() {
        let data = fixtures::school();
        let class = data.class(10).unwrap();
        let period = data.period(1).unwrap();
        let policy = GradingPolicy::default();
        let analysis = build_class_analysis(
            class,
            period,
            &data.roster(10),
            &data.grades,
            &data.subjects,
            &policy,
        )
        .unwrap();

        let prompt = class_prompt(&analysis, &policy).unwrap();
        assert!(prompt.contains("class 5A did in 1st Bimester"));
        assert!(prompt.contains("at least 60"));
        assert!(prompt.contains("\"pedagogical_summary\""));
        assert!(prompt.contains("\"Mathematics\""));
        assert!(prompt.contains("Reply ONLY with valid JSON"));
    }

    #[test]
    fn test_student_prompt_includes_reports() {
        let data = fixtures::school();
        let student = data.student(1).unwrap();
        let analysis = build_student_analysis(
            student,
            &data.grades,
            &data.subjects,
            &data.periods,
            &data.reports,
        )
        .unwrap();

        let prompt = student_prompt(&analysis).unwrap();
        assert!(prompt.contains("Ana Souza"));
        assert!(prompt.contains("Helps classmates during group work."));
        assert!(prompt.contains("\"improvement_areas\""));
    }

    #[test]
    fn test_roster_prompt_uses_its_own_schema() {
        let data = fixtures::school();
        let analysis = build_roster_analysis(&data.classes, &data.students, 5).unwrap();

        let prompt = roster_prompt(&analysis).unwrap();
        assert!(prompt.contains("\"class_insights\""));
        assert!(prompt.contains("Morning class, strong in reading"));
        assert!(!prompt.contains("\"pedagogical_summary\""));
    }

    #[test]
    fn test_check_length() {
        assert!(check_length("short", 10).is_ok());
        assert!(check_length("exactly10!", 10).is_ok());
        match check_length("eleven char", 10) {
            Err(InsightError::PromptTooLarge { len, max }) => {
                assert_eq!(len, 11);
                assert_eq!(max, 10);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
