use crate::convert::{descriptors_to_mat, matches_from_cv};
use crate::{FeatureError, Result};
use easymatch_core::{DescriptorKind, DescriptorMatrix, Matches};
use opencv::core::{DMatch, Vector};
use opencv::features2d::DescriptorMatcher;
use opencv::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Correspondence search strategy and distance metric.
///
/// Selectors match OpenCV's `DescriptorMatcher::MatcherType`.
///
/// | variant | search | metric | descriptors |
/// |---|---|---|---|
/// | `FlannBased` | approximate nearest neighbour | L2 | float |
/// | `BruteForce` | exhaustive | L2 | any |
/// | `BruteForceL1` | exhaustive | L1 | any |
/// | `BruteForceHamming` | exhaustive | Hamming | binary |
/// | `BruteForceHammingLut` | exhaustive | Hamming (lookup table) | binary |
/// | `BruteForceSl2` | exhaustive | squared L2 | any |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatcherMode {
    FlannBased = 1,
    BruteForce = 2,
    BruteForceL1 = 3,
    BruteForceHamming = 4,
    BruteForceHammingLut = 5,
    BruteForceSl2 = 6,
}

impl MatcherMode {
    pub const ALL: [MatcherMode; 6] = [
        MatcherMode::FlannBased,
        MatcherMode::BruteForce,
        MatcherMode::BruteForceL1,
        MatcherMode::BruteForceHamming,
        MatcherMode::BruteForceHammingLut,
        MatcherMode::BruteForceSl2,
    ];

    pub fn selector(&self) -> i32 {
        *self as i32
    }

    /// Name understood by `cv::DescriptorMatcher::create`.
    pub fn opencv_name(&self) -> &'static str {
        match self {
            MatcherMode::FlannBased => "FlannBased",
            MatcherMode::BruteForce => "BruteForce",
            MatcherMode::BruteForceL1 => "BruteForce-L1",
            MatcherMode::BruteForceHamming => "BruteForce-Hamming",
            MatcherMode::BruteForceHammingLut => "BruteForce-HammingLUT",
            MatcherMode::BruteForceSl2 => "BruteForce-SL2",
        }
    }

    pub fn supports(&self, kind: DescriptorKind) -> bool {
        match self {
            MatcherMode::BruteForceHamming | MatcherMode::BruteForceHammingLut => {
                kind == DescriptorKind::Binary
            }
            MatcherMode::FlannBased => kind == DescriptorKind::Float,
            MatcherMode::BruteForce | MatcherMode::BruteForceL1 | MatcherMode::BruteForceSl2 => {
                true
            }
        }
    }

    /// Rejects (mode, descriptor kind) pairs OpenCV cannot search.
    pub fn check(&self, kind: DescriptorKind) -> Result<()> {
        if self.supports(kind) {
            return Ok(());
        }
        tracing::error!(mode = %self, kind = %kind, "matcher mode cannot search these descriptors");
        Err(FeatureError::IncompatibleConfig(format!(
            "{self} matching does not support {kind} descriptors"
        )))
    }
}

impl fmt::Display for MatcherMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.opencv_name())
    }
}

impl TryFrom<i32> for MatcherMode {
    type Error = FeatureError;

    fn try_from(value: i32) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.selector() == value)
            .ok_or_else(|| {
                tracing::error!(selector = value, "unknown matcher mode");
                FeatureError::UnknownMatcher(format!("selector {value}"))
            })
    }
}

impl FromStr for MatcherMode {
    type Err = FeatureError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if let Ok(selector) = trimmed.parse::<i32>() {
            return Self::try_from(selector);
        }
        let key: String = trimmed
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "flannbased" | "flann" => Ok(MatcherMode::FlannBased),
            "bruteforce" | "bruteforcel2" => Ok(MatcherMode::BruteForce),
            "bruteforcel1" => Ok(MatcherMode::BruteForceL1),
            "bruteforcehamming" => Ok(MatcherMode::BruteForceHamming),
            "bruteforcehamminglut" => Ok(MatcherMode::BruteForceHammingLut),
            "bruteforcesl2" => Ok(MatcherMode::BruteForceSl2),
            _ => {
                tracing::error!(name = s, "unknown matcher mode");
                Err(FeatureError::UnknownMatcher(s.to_string()))
            }
        }
    }
}

/// Finds, for each query row, the best train row under the mode's metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Matcher {
    mode: MatcherMode,
    cross_check: bool,
}

impl Matcher {
    pub fn new(mode: MatcherMode) -> Self {
        Self {
            mode,
            cross_check: false,
        }
    }

    /// Keep only pairs that are also each other's best match in the
    /// train → query direction.
    pub fn with_cross_check(mut self) -> Self {
        self.cross_check = true;
        self
    }

    pub fn mode(&self) -> MatcherMode {
        self.mode
    }

    pub fn cross_check(&self) -> bool {
        self.cross_check
    }

    /// Validates the inputs, then runs the OpenCV matcher.
    ///
    /// Without cross-checking the result holds one entry per query row, in
    /// query order. Either side being empty gives an empty result.
    pub fn match_descriptors(
        &self,
        query: &DescriptorMatrix,
        train: &DescriptorMatrix,
    ) -> Result<Matches> {
        self.validate(query, train)?;
        if query.is_empty() || train.is_empty() {
            return Ok(Matches::new());
        }

        let query_mat = descriptors_to_mat(query)?;
        let train_mat = descriptors_to_mat(train)?;
        let matcher = DescriptorMatcher::create(self.mode.opencv_name())?;

        let mut forward = Vector::<DMatch>::new();
        matcher.train_match_def(&query_mat, &train_mat, &mut forward)?;
        let mut matches = matches_from_cv(&forward);

        if self.cross_check {
            let mut backward = Vector::<DMatch>::new();
            matcher.train_match_def(&train_mat, &query_mat, &mut backward)?;

            let mut best_query_for_train = vec![-1; train.rows()];
            for m in backward.iter() {
                if let Some(slot) = best_query_for_train.get_mut(m.query_idx as usize) {
                    *slot = m.train_idx;
                }
            }
            matches.matches.retain(|m| {
                best_query_for_train
                    .get(m.train_idx as usize)
                    .is_some_and(|&q| q == m.query_idx)
            });
        }

        tracing::debug!(
            mode = %self.mode,
            cross_check = self.cross_check,
            query = query.rows(),
            train = train.rows(),
            matches = matches.len(),
            "matched descriptors"
        );

        Ok(matches)
    }

    fn validate(&self, query: &DescriptorMatrix, train: &DescriptorMatrix) -> Result<()> {
        if query.kind() != train.kind() {
            tracing::error!(
                query = %query.kind(),
                train = %train.kind(),
                "query and train descriptors differ in kind"
            );
            return Err(FeatureError::IncompatibleConfig(format!(
                "cannot match {} query descriptors against {} train descriptors",
                query.kind(),
                train.kind()
            )));
        }
        self.mode.check(query.kind())?;
        if !query.is_empty() && !train.is_empty() && query.cols() != train.cols() {
            tracing::error!(
                query = query.cols(),
                train = train.cols(),
                "query and train descriptors differ in width"
            );
            return Err(FeatureError::MatchingError(format!(
                "descriptor widths differ: {} vs {}",
                query.cols(),
                train.cols()
            )));
        }
        Ok(())
    }
}

pub fn match_descriptors(
    query: &DescriptorMatrix,
    train: &DescriptorMatrix,
    mode: MatcherMode,
) -> Result<Matches> {
    Matcher::new(mode).match_descriptors(query, train)
}
