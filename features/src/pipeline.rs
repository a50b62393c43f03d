//! End-to-end comparison of two images.

use crate::detector::{DetectorAlgorithm, FeatureDetector};
use crate::extractor::{DescriptorAlgorithm, DescriptorExtractor};
use crate::matcher::{Matcher, MatcherMode};
use crate::outcome::{MatchOutcome, MatchPolicy};
use crate::render::render_matches;
use crate::{FeatureError, Result};
use easymatch_core::{Image, ThresholdConfig};
use serde::{Deserialize, Serialize};

/// A complete detect → describe → match → render configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchPipeline {
    pub detector: DetectorAlgorithm,
    pub descriptor: DescriptorAlgorithm,
    pub matcher: MatcherMode,
    pub threshold: ThresholdConfig,
    pub cross_check: bool,
    pub policy: MatchPolicy,
    /// Produce a side-by-side visualization in the outcome.
    pub render: bool,
}

impl Default for MatchPipeline {
    fn default() -> Self {
        Self {
            detector: DetectorAlgorithm::Orb,
            descriptor: DescriptorAlgorithm::Orb,
            matcher: MatcherMode::BruteForceHamming,
            threshold: ThresholdConfig::default(),
            cross_check: false,
            policy: MatchPolicy::accept_all(),
            render: true,
        }
    }
}

impl MatchPipeline {
    pub fn new(
        detector: DetectorAlgorithm,
        descriptor: DescriptorAlgorithm,
        matcher: MatcherMode,
    ) -> Self {
        Self {
            detector,
            descriptor,
            matcher,
            ..Self::default()
        }
    }

    pub fn with_threshold(mut self, threshold: ThresholdConfig) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_cross_check(mut self, cross_check: bool) -> Self {
        self.cross_check = cross_check;
        self
    }

    pub fn with_policy(mut self, policy: MatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_render(mut self, render: bool) -> Self {
        self.render = render;
        self
    }

    /// Checks that the chosen algorithms can work together, before any
    /// image is touched.
    pub fn validate(&self) -> Result<()> {
        if !self.descriptor.accepts(self.detector) {
            tracing::error!(
                detector = %self.detector,
                descriptor = %self.descriptor,
                "descriptor cannot describe these keypoints"
            );
            return Err(FeatureError::IncompatibleConfig(format!(
                "{} descriptors cannot be computed for {} keypoints",
                self.descriptor, self.detector
            )));
        }
        self.matcher.check(self.descriptor.kind())
    }

    /// Detection and description for a single image.
    pub fn describe(&self, image: &Image) -> Result<DescriptorExtractor> {
        let detector = FeatureDetector::detect(image, self.detector, self.threshold)?;
        DescriptorExtractor::extract(&detector, self.descriptor)
    }

    pub fn matcher(&self) -> Matcher {
        let matcher = Matcher::new(self.matcher);
        if self.cross_check {
            matcher.with_cross_check()
        } else {
            matcher
        }
    }

    /// Compares `source` against `target`.
    ///
    /// Both images are described concurrently on the rayon pool. The
    /// visualization is skipped when rendering is off or either image is
    /// empty.
    pub fn run(
        &self,
        source_id: u32,
        source: &Image,
        target_id: u32,
        target: &Image,
    ) -> Result<MatchOutcome> {
        self.validate()?;

        let (source_desc, target_desc) =
            rayon::join(|| self.describe(source), || self.describe(target));
        let (source_desc, target_desc) = (source_desc?, target_desc?);

        let matches = self
            .matcher()
            .match_descriptors(source_desc.descriptors(), target_desc.descriptors())?;

        let visualization = if self.render && !source.is_empty() && !target.is_empty() {
            Some(render_matches(&source_desc, &target_desc, &matches)?)
        } else {
            None
        };

        let mut outcome = MatchOutcome::new(
            source_id,
            source_desc,
            target_id,
            target_desc,
            matches,
            self.policy,
        );
        if let Some(image) = visualization {
            outcome = outcome.with_visualization(image);
        }

        tracing::debug!(
            source_id,
            target_id,
            matches = outcome.matches.len(),
            match_rate = outcome.match_rate,
            "pipeline finished"
        );

        Ok(outcome)
    }
}
