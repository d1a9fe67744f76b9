//! The fixed survey vocabulary.
//!
//! Every record that reaches the scaler or the model is a [`FeatureVector`]:
//! 20 values laid out in [`Feature::ALL`] order. The order is the one the
//! scaler was fitted with, so it is fixed here once instead of being carried
//! around as column names.
//!
//! Raw questionnaire answers are keyed by question id (`"q1"`..`"q20"`).
//! [`AnswerMapper`] converts them, and its [`MissingAnswerPolicy`] decides
//! what happens to unanswered questions.

use crate::error::{Result, StressError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Number of survey attributes.
pub const N_FEATURES: usize = 20;

/// One of the 20 survey attributes, in model input order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    AnxietyLevel,
    SelfEsteem,
    MentalHealthHistory,
    Depression,
    Headache,
    BloodPressure,
    SleepQuality,
    BreathingProblem,
    NoiseLevel,
    LivingConditions,
    Safety,
    BasicNeeds,
    AcademicPerformance,
    StudyLoad,
    TeacherStudentRelationship,
    FutureCareerConcerns,
    SocialSupport,
    PeerPressure,
    ExtracurricularActivities,
    Bullying,
}

/// Inclusive range a survey answer must fall in.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FeatureRange {
    pub min: f64,
    pub max: f64,
}

impl FeatureRange {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

impl Feature {
    /// All features in model input order.
    pub const ALL: [Feature; N_FEATURES] = [
        Feature::AnxietyLevel,
        Feature::SelfEsteem,
        Feature::MentalHealthHistory,
        Feature::Depression,
        Feature::Headache,
        Feature::BloodPressure,
        Feature::SleepQuality,
        Feature::BreathingProblem,
        Feature::NoiseLevel,
        Feature::LivingConditions,
        Feature::Safety,
        Feature::BasicNeeds,
        Feature::AcademicPerformance,
        Feature::StudyLoad,
        Feature::TeacherStudentRelationship,
        Feature::FutureCareerConcerns,
        Feature::SocialSupport,
        Feature::PeerPressure,
        Feature::ExtracurricularActivities,
        Feature::Bullying,
    ];

    /// Column name as it appears in the training CSV.
    pub fn name(self) -> &'static str {
        match self {
            Feature::AnxietyLevel => "anxiety_level",
            Feature::SelfEsteem => "self_esteem",
            Feature::MentalHealthHistory => "mental_health_history",
            Feature::Depression => "depression",
            Feature::Headache => "headache",
            Feature::BloodPressure => "blood_pressure",
            Feature::SleepQuality => "sleep_quality",
            Feature::BreathingProblem => "breathing_problem",
            Feature::NoiseLevel => "noise_level",
            Feature::LivingConditions => "living_conditions",
            Feature::Safety => "safety",
            Feature::BasicNeeds => "basic_needs",
            Feature::AcademicPerformance => "academic_performance",
            Feature::StudyLoad => "study_load",
            Feature::TeacherStudentRelationship => "teacher_student_relationship",
            Feature::FutureCareerConcerns => "future_career_concerns",
            Feature::SocialSupport => "social_support",
            Feature::PeerPressure => "peer_pressure",
            Feature::ExtracurricularActivities => "extracurricular_activities",
            Feature::Bullying => "bullying",
        }
    }

    pub fn from_name(name: &str) -> Option<Feature> {
        Feature::ALL.iter().copied().find(|f| f.name() == name)
    }

    /// Position of this feature in a [`FeatureVector`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// Questionnaire key (`"q1"`..`"q20"`) for this feature.
    pub fn question_id(self) -> String {
        format!("q{}", self.index() + 1)
    }

    pub fn range(self) -> FeatureRange {
        match self {
            Feature::AnxietyLevel | Feature::SelfEsteem | Feature::Depression => FeatureRange {
                min: 0.0,
                max: 30.0,
            },
            Feature::MentalHealthHistory => FeatureRange { min: 0.0, max: 1.0 },
            _ => FeatureRange { min: 0.0, max: 5.0 },
        }
    }

    /// Binary features only accept 0 or 1.
    pub fn is_binary(self) -> bool {
        matches!(self, Feature::MentalHealthHistory)
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One survey response: 20 values in [`Feature::ALL`] order.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector([f64; N_FEATURES]);

impl FeatureVector {
    pub fn new(values: [f64; N_FEATURES]) -> Self {
        Self(values)
    }

    pub fn zeros() -> Self {
        Self([0.0; N_FEATURES])
    }

    /// Build from a positional slice; the slice must hold exactly 20 values.
    pub fn from_slice(values: &[f64]) -> Result<Self> {
        let array: [f64; N_FEATURES] = values.try_into().map_err(|_| {
            StressError::schema(
                format!("{N_FEATURES} features"),
                format!("{} features", values.len()),
            )
        })?;
        Ok(Self(array))
    }

    /// Build from a record keyed by feature name.
    ///
    /// Every feature must be present and no other key may appear; missing
    /// values are never filled in here.
    pub fn from_named(record: &HashMap<String, f64>) -> Result<Self> {
        if let Some(unknown) = record.keys().find(|k| Feature::from_name(k).is_none()) {
            return Err(StressError::schema(
                "a known feature name",
                format!("unknown field `{unknown}`"),
            ));
        }
        let mut values = [0.0; N_FEATURES];
        for feature in Feature::ALL {
            values[feature.index()] = *record.get(feature.name()).ok_or_else(|| {
                StressError::schema(
                    format!("field `{}`", feature.name()),
                    "missing field".to_string(),
                )
            })?;
        }
        Ok(Self(values))
    }

    pub fn get(&self, feature: Feature) -> f64 {
        self.0[feature.index()]
    }

    pub fn set(&mut self, feature: Feature, value: f64) {
        self.0[feature.index()] = value;
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn to_named(&self) -> HashMap<String, f64> {
        Feature::ALL
            .iter()
            .map(|f| (f.name().to_string(), self.get(*f)))
            .collect()
    }

    /// Check every value against the declared survey ranges.
    pub fn validate_ranges(&self) -> Result<()> {
        for feature in Feature::ALL {
            let value = self.get(feature);
            let range = feature.range();
            let binary_ok = !feature.is_binary() || value == 0.0 || value == 1.0;
            if !value.is_finite() || !range.contains(value) || !binary_ok {
                return Err(StressError::FeatureOutOfRange {
                    feature: feature.name(),
                    value,
                    min: range.min,
                    max: range.max,
                });
            }
        }
        Ok(())
    }
}

impl From<[f64; N_FEATURES]> for FeatureVector {
    fn from(values: [f64; N_FEATURES]) -> Self {
        Self(values)
    }
}

/// What to do with a question that has no usable answer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingAnswerPolicy {
    /// Fail with [`StressError::SchemaMismatch`].
    #[default]
    Reject,
    /// Substitute 0 and report the feature in [`MappedAnswers::defaulted`].
    DefaultToZero,
}

/// Result of mapping raw questionnaire answers.
#[derive(Clone, Debug, PartialEq)]
pub struct MappedAnswers {
    pub vector: FeatureVector,
    /// Features whose answer was missing and replaced by 0.
    pub defaulted: Vec<Feature>,
}

/// Maps answers keyed by question id onto the feature vocabulary.
#[derive(Clone, Copy, Debug, Default)]
pub struct AnswerMapper {
    policy: MissingAnswerPolicy,
    validate: bool,
}

impl AnswerMapper {
    pub fn new(policy: MissingAnswerPolicy) -> Self {
        Self {
            policy,
            validate: false,
        }
    }

    /// Also reject answers outside the declared survey ranges.
    pub fn with_range_check(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    /// Keys must be question ids (`q1`..`q20`) under either policy; the
    /// policy only decides what happens to questions left unanswered.
    pub fn map(&self, answers: &HashMap<String, f64>) -> Result<MappedAnswers> {
        let known: Vec<String> = Feature::ALL.iter().map(|f| f.question_id()).collect();
        let mut unknown: Vec<&str> = answers
            .keys()
            .map(String::as_str)
            .filter(|k| !known.iter().any(|id| id == k))
            .collect();
        if !unknown.is_empty() {
            unknown.sort_unstable();
            return Err(StressError::schema(
                "question ids q1..q20",
                format!("unknown keys {}", unknown.join(", ")),
            ));
        }

        let mut vector = FeatureVector::zeros();
        let mut defaulted = Vec::new();

        for feature in Feature::ALL {
            let key = feature.question_id();
            match answers.get(&key).copied().filter(|v| v.is_finite()) {
                Some(value) => vector.set(feature, value),
                None => match self.policy {
                    MissingAnswerPolicy::Reject => {
                        return Err(StressError::schema(
                            format!("answer for {key} ({feature})"),
                            "missing or non-numeric answer".to_string(),
                        ));
                    }
                    MissingAnswerPolicy::DefaultToZero => defaulted.push(feature),
                },
            }
        }

        if !defaulted.is_empty() {
            let names: Vec<&str> = defaulted.iter().map(|f| f.name()).collect();
            tracing::warn!(
                defaulted = ?names,
                "questionnaire answers missing; substituted 0 before scaling"
            );
        }

        if self.validate {
            vector.validate_ranges()?;
        }

        Ok(MappedAnswers { vector, defaulted })
    }
}
