//! Analysis regeneration flow.
//!
//! For every scope (class and period, student, roster) a request either
//! returns the saved analysis or, on the first request and whenever a
//! regeneration is forced, runs the whole chain:
//!
//! aggregate -> prompt -> model -> parse -> merge -> upsert
//!
//! Nothing is written unless every step succeeds, so a failed run leaves the
//! previously saved analysis in place and returns it alongside the error.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{info, warn};

use crate::analysis::{build_class_analysis, build_roster_analysis, build_student_analysis};
use crate::config::Config;
use crate::dataset::Dataset;
use crate::error::InsightError;
use crate::insight::normalizer;
use crate::insight::prompt;
use crate::insight::TextGenerator;
use crate::models::{Class, ClassReport, GradingPolicy, Period, RosterReport, Student, StudentReport};
use crate::store::{AnalysisStore, Scope};

/// Outcome of a request for an analysis.
#[derive(Debug)]
pub enum Regeneration<T> {
    /// A saved analysis was returned without calling the model.
    Cached { report: T, saved_at: DateTime<Utc> },
    /// A new analysis was generated and saved.
    Generated(T),
    /// The model could not be reached. Retrying later may succeed.
    FailedTransient { error: InsightError, previous: Option<T> },
    /// The analysis cannot be produced from the current data or reply.
    FailedPermanent { error: InsightError, previous: Option<T> },
}

impl<T> Regeneration<T> {
    /// The analysis to show: the new one, the cached one, or the last saved one.
    pub fn report(&self) -> Option<&T> {
        match self {
            Regeneration::Cached { report, .. } | Regeneration::Generated(report) => Some(report),
            Regeneration::FailedTransient { previous, .. }
            | Regeneration::FailedPermanent { previous, .. } => previous.as_ref(),
        }
    }

    pub fn error(&self) -> Option<&InsightError> {
        match self {
            Regeneration::FailedTransient { error, .. }
            | Regeneration::FailedPermanent { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// Generates, saves and serves analyses for one store.
pub struct InsightService<G> {
    generator: G,
    store: AnalysisStore,
    policy: GradingPolicy,
    max_prompt_chars: usize,
    roster_limit: usize,
}

impl<G: TextGenerator> InsightService<G> {
    pub fn new(generator: G, store: AnalysisStore, config: &Config) -> Self {
        Self {
            generator,
            store,
            policy: GradingPolicy::from(&config.grading),
            max_prompt_chars: config.model.max_prompt_chars,
            roster_limit: config.roster.max_classes,
        }
    }

    /// Analysis of `class` in `period`.
    pub async fn class_report(
        &self,
        user_id: i64,
        dataset: &Dataset,
        class: &Class,
        period: &Period,
        force: bool,
    ) -> Result<Regeneration<ClassReport>, InsightError> {
        let scope = Scope::Class {
            class_id: class.id,
            period_id: period.id,
        };
        let policy = self.policy;

        self.run(
            scope,
            user_id,
            force,
            || {
                build_class_analysis(
                    class,
                    period,
                    &dataset.roster(class.id),
                    &dataset.grades,
                    &dataset.subjects,
                    &policy,
                )
            },
            |analysis| prompt::class_prompt(analysis, &policy),
            normalizer::merge_class,
        )
        .await
    }

    /// Analysis of `student` across every period.
    pub async fn student_report(
        &self,
        user_id: i64,
        dataset: &Dataset,
        student: &Student,
        force: bool,
    ) -> Result<Regeneration<StudentReport>, InsightError> {
        self.run(
            Scope::Student {
                student_id: student.id,
            },
            user_id,
            force,
            || {
                build_student_analysis(
                    student,
                    &dataset.grades,
                    &dataset.subjects,
                    &dataset.periods,
                    &dataset.reports,
                )
            },
            prompt::student_prompt,
            normalizer::merge_student,
        )
        .await
    }

    /// Enrollment overview of the first configured number of classes.
    pub async fn roster_report(
        &self,
        user_id: i64,
        dataset: &Dataset,
        force: bool,
    ) -> Result<Regeneration<RosterReport>, InsightError> {
        let limit = self.roster_limit;

        self.run(
            Scope::Roster,
            user_id,
            force,
            || build_roster_analysis(&dataset.classes, &dataset.students, limit),
            prompt::roster_prompt,
            normalizer::merge_roster,
        )
        .await
    }

    /// Serve the saved analysis or regenerate it.
    ///
    /// Only a failed read of the saved analysis is returned as `Err`; every
    /// other failure is reported through [`Regeneration`].
    async fn run<C, R, T, B, P, M>(
        &self,
        scope: Scope,
        user_id: i64,
        force: bool,
        build: B,
        make_prompt: P,
        merge: M,
    ) -> Result<Regeneration<T>, InsightError>
    where
        C: Serialize,
        R: DeserializeOwned,
        T: Serialize + DeserializeOwned,
        B: FnOnce() -> Result<C, InsightError>,
        P: FnOnce(&C) -> Result<String, InsightError>,
        M: FnOnce(C, R) -> T,
    {
        let saved = self.store.fetch::<T>(&scope, user_id)?;

        let previous = match (force, saved) {
            (false, Some(saved)) => {
                info!("Using saved analysis for {} from {}", scope, saved.updated_at);
                return Ok(Regeneration::Cached {
                    report: saved.payload,
                    saved_at: saved.updated_at,
                });
            }
            (_, saved) => saved.map(|s| s.payload),
        };

        info!("Generating analysis for {}", scope);

        match self
            .generate(&scope, user_id, build, make_prompt, merge)
            .await
        {
            Ok(report) => {
                info!("Saved new analysis for {}", scope);
                Ok(Regeneration::Generated(report))
            }
            Err(error) if error.is_transient() => {
                warn!("Analysis for {} failed, will keep the saved one: {}", scope, error);
                Ok(Regeneration::FailedTransient { error, previous })
            }
            Err(error) => {
                warn!("Analysis for {} cannot be generated: {}", scope, error);
                Ok(Regeneration::FailedPermanent { error, previous })
            }
        }
    }

    async fn generate<C, R, T, B, P, M>(
        &self,
        scope: &Scope,
        user_id: i64,
        build: B,
        make_prompt: P,
        merge: M,
    ) -> Result<T, InsightError>
    where
        C: Serialize,
        R: DeserializeOwned,
        T: Serialize,
        B: FnOnce() -> Result<C, InsightError>,
        P: FnOnce(&C) -> Result<String, InsightError>,
        M: FnOnce(C, R) -> T,
    {
        let context = build()?;
        let prompt = make_prompt(&context)?;
        prompt::check_length(&prompt, self.max_prompt_chars)?;

        let raw = self.generator.generate(&prompt).await?;
        let reply: R = normalizer::parse_reply(&raw)?;

        let source = serde_json::to_value(&context)?;
        let report = merge(context, reply);
        self.store.upsert(scope, user_id, &report, &source)?;

        Ok(report)
    }
}
