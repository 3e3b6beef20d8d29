//! Evaluation criteria
//!
//! The host rates groups against the host criteria; groups and teachers
//! rate groups against the member criteria. Every rating is a level from
//! `0` to [`LEVELS`], and a criterion contributes
//! `max_score / LEVELS * level` points.

use std::{collections::BTreeMap, fmt::Display};

use garde::Validate;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::constants::evaluation::{
    LEVELS, MAX_CRITERIA, MAX_CRITERION_SCORE, MAX_LABEL_LENGTH, MAX_LEVEL_LABELS,
};

use super::{Error, log::Source};

/// Identifier of a criterion within a setup
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Validate,
)]
#[serde(transparent)]
#[garde(transparent)]
pub struct CriterionId(#[garde(length(min = 1, max = 64))] String);

impl CriterionId {
    /// Creates a criterion id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl Display for CriterionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ratings for one target: criterion to level
pub type Ratings = BTreeMap<CriterionId, u8>;

/// A single scoring criterion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Criterion {
    /// Identifier referenced by ratings
    #[garde(dive)]
    pub id: CriterionId,
    /// Text shown to evaluators
    #[garde(length(max = MAX_LABEL_LENGTH))]
    #[serde(default)]
    pub label: String,
    /// Points awarded at the highest level
    #[garde(range(min = 0.0, max = MAX_CRITERION_SCORE))]
    pub max_score: f64,
}

impl Criterion {
    /// Creates a criterion
    pub fn new(id: impl Into<String>, label: impl Into<String>, max_score: f64) -> Self {
        Self {
            id: CriterionId::new(id),
            label: label.into(),
            max_score,
        }
    }

    /// Points for a rating level
    pub fn points(&self, level: u8) -> f64 {
        self.max_score / f64::from(LEVELS) * f64::from(level)
    }
}

/// A named rating level shown to evaluators
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct RatingLevel {
    /// Ordinal used in ratings
    #[garde(range(min = 1, max = LEVELS))]
    pub id: u8,
    /// Text shown to evaluators
    #[garde(length(max = MAX_LABEL_LENGTH))]
    pub label: String,
}

fn validate_unique(val: &[Criterion]) -> garde::Result {
    match val.iter().map(|c| &c.id).duplicates().next() {
        Some(id) => Err(garde::Error::new(format!("criterion {id} is listed twice"))),
        None => Ok(()),
    }
}

/// Criteria configuration for an evaluation round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationSetup {
    /// Criteria the host rates groups on
    #[garde(
        length(min = 1, max = MAX_CRITERIA),
        dive,
        custom(|v, _| validate_unique(v))
    )]
    pub host_criteria: Vec<Criterion>,
    /// Criteria groups and teachers rate groups on
    #[garde(length(max = MAX_CRITERIA), dive, custom(|v, _| validate_unique(v)))]
    #[serde(default)]
    pub member_criteria: Vec<Criterion>,
    /// Labels for the rating levels
    #[garde(length(max = MAX_LEVEL_LABELS), dive)]
    #[serde(default)]
    pub levels: Vec<RatingLevel>,
}

impl EvaluationSetup {
    /// Validates the setup
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSetup`] describing what is wrong.
    pub fn check(&self) -> Result<(), Error> {
        self.validate()
            .map_err(|report| Error::InvalidSetup(report.to_string()))
    }

    /// Criteria that apply to submissions from a source
    pub fn criteria_for(&self, source: Source) -> &[Criterion] {
        match source {
            Source::Host => &self.host_criteria,
            Source::Peer(_) | Source::Teacher(_) => &self.member_criteria,
        }
    }

    /// Checks every rating against the source's criteria and the level range
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownCriterion`] or [`Error::InvalidLevel`].
    pub fn check_ratings(&self, source: Source, ratings: &Ratings) -> Result<(), Error> {
        let criteria = self.criteria_for(source);
        for (id, level) in ratings {
            if !criteria.iter().any(|c| &c.id == id) {
                return Err(Error::UnknownCriterion(id.clone()));
            }
            if *level > LEVELS {
                return Err(Error::InvalidLevel(*level));
            }
        }
        Ok(())
    }

    /// Raw score of one set of ratings; unknown criteria count for nothing
    pub fn raw_score(&self, source: Source, ratings: &Ratings) -> f64 {
        let criteria = self.criteria_for(source);
        ratings
            .iter()
            .filter_map(|(id, level)| {
                criteria
                    .iter()
                    .find(|c| &c.id == id)
                    .map(|c| c.points(*level))
            })
            .sum()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::roster::SlotId;

    fn setup() -> EvaluationSetup {
        EvaluationSetup {
            host_criteria: vec![Criterion::new("presentation", "Presentation", 40.)],
            member_criteria: vec![
                Criterion::new("teamwork", "Teamwork", 12.),
                Criterion::new("content", "Content", 8.),
            ],
            levels: vec![],
        }
    }

    fn ratings(pairs: &[(&str, u8)]) -> Ratings {
        pairs
            .iter()
            .map(|(id, level)| (CriterionId::new(*id), *level))
            .collect()
    }

    #[test]
    fn test_criterion_points_are_linear() {
        let criterion = Criterion::new("c", "", 40.);
        assert_eq!(criterion.points(0), 0.);
        assert_eq!(criterion.points(1), 10.);
        assert_eq!(criterion.points(4), 40.);
    }

    #[test]
    fn test_raw_score_uses_source_criteria() {
        let setup = setup();
        assert_eq!(setup.raw_score(Source::Host, &ratings(&[("presentation", 4)])), 40.);
        assert_eq!(
            setup.raw_score(
                Source::Peer(SlotId::new(1)),
                &ratings(&[("teamwork", 2), ("content", 4)])
            ),
            14.
        );
        assert_eq!(
            setup.raw_score(Source::Host, &ratings(&[("teamwork", 4)])),
            0.
        );
    }

    #[test]
    fn test_check_ratings() {
        let setup = setup();
        assert!(setup.check_ratings(Source::Host, &ratings(&[("presentation", 4)])).is_ok());
        assert_eq!(
            setup.check_ratings(Source::Host, &ratings(&[("teamwork", 1)])),
            Err(Error::UnknownCriterion(CriterionId::new("teamwork")))
        );
        assert_eq!(
            setup.check_ratings(
                Source::Teacher(SlotId::new(7)),
                &ratings(&[("content", 5)])
            ),
            Err(Error::InvalidLevel(5))
        );
    }

    #[test]
    fn test_setup_validation() {
        assert!(setup().check().is_ok());

        let mut empty = setup();
        empty.host_criteria.clear();
        assert!(matches!(empty.check(), Err(Error::InvalidSetup(_))));

        let mut duplicate = setup();
        duplicate
            .member_criteria
            .push(Criterion::new("teamwork", "Again", 1.));
        assert!(duplicate.check().is_err());

        let mut too_much = setup();
        too_much.host_criteria[0].max_score = MAX_CRITERION_SCORE + 1.;
        assert!(too_much.check().is_err());
    }

    #[test]
    fn test_setup_deserializes_camel_case() {
        let setup: EvaluationSetup = serde_json::from_str(
            r#"{"hostCriteria":[{"id":"1","maxScore":40}],"memberCriteria":[{"id":"1","label":"x","maxScore":20}]}"#,
        )
        .unwrap();
        assert!(setup.check().is_ok());
        assert_eq!(setup.member_criteria[0].max_score, 20.);
    }
}
