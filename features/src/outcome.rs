use crate::extractor::DescriptorExtractor;
use easymatch_core::{Image, Matches};
use serde::{Deserialize, Serialize};

/// Decides which correspondences count towards the match rate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchPolicy {
    /// Correspondences farther apart than this are not accepted.
    /// `None` accepts every correspondence.
    pub max_distance: Option<f32>,
}

impl MatchPolicy {
    pub fn accept_all() -> Self {
        Self { max_distance: None }
    }

    pub fn with_max_distance(max_distance: f32) -> Self {
        Self {
            max_distance: Some(max_distance),
        }
    }

    /// Keeps the accepted correspondences, in their original order.
    pub fn filter(&self, mut matches: Matches) -> Matches {
        if let Some(max) = self.max_distance {
            matches.filter_by_distance(max);
        }
        matches
    }

    pub fn accepted(&self, matches: &Matches) -> usize {
        self.filter(matches.clone()).len()
    }

    /// Accepted correspondences divided by source keypoints, in `[0, 1]`.
    ///
    /// Zero when there are no source keypoints or nothing is accepted; one
    /// when every source keypoint has an accepted correspondence.
    pub fn match_rate(&self, matches: &Matches, source_keypoints: usize) -> f32 {
        if source_keypoints == 0 {
            return 0.0;
        }
        let accepted = self.accepted(matches).min(source_keypoints);
        accepted as f32 / source_keypoints as f32
    }
}

/// Everything one source/target comparison produced.
#[derive(Debug, Clone)]
pub struct MatchOutcome {
    pub source_id: u32,
    pub source: DescriptorExtractor,
    pub target_id: u32,
    pub target: DescriptorExtractor,
    pub matches: Matches,
    pub policy: MatchPolicy,
    pub match_rate: f32,
    pub visualization: Option<Image>,
}

impl MatchOutcome {
    pub fn new(
        source_id: u32,
        source: DescriptorExtractor,
        target_id: u32,
        target: DescriptorExtractor,
        matches: Matches,
        policy: MatchPolicy,
    ) -> Self {
        let match_rate = policy.match_rate(&matches, source.keypoints().len());
        Self {
            source_id,
            source,
            target_id,
            target,
            matches,
            policy,
            match_rate,
            visualization: None,
        }
    }

    pub fn with_visualization(mut self, image: Image) -> Self {
        self.visualization = Some(image);
        self
    }

    pub fn accepted_matches(&self) -> Matches {
        self.policy.filter(self.matches.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use easymatch_core::FeatureMatch;

    fn matches(distances: &[f32]) -> Matches {
        distances
            .iter()
            .enumerate()
            .map(|(i, &d)| FeatureMatch::new(i as i32, i as i32, d))
            .collect()
    }

    #[test]
    fn rate_is_zero_without_accepted_matches() {
        let policy = MatchPolicy::with_max_distance(10.0);
        assert_eq!(policy.match_rate(&matches(&[40.0, 55.0]), 2), 0.0);
        assert_eq!(MatchPolicy::accept_all().match_rate(&Matches::new(), 5), 0.0);
    }

    #[test]
    fn rate_is_zero_without_source_keypoints() {
        assert_eq!(MatchPolicy::accept_all().match_rate(&Matches::new(), 0), 0.0);
    }

    #[test]
    fn identical_one_to_one_reaches_one() {
        let m = matches(&[0.0; 8]);
        assert_eq!(MatchPolicy::accept_all().match_rate(&m, 8), 1.0);
        assert_eq!(MatchPolicy::with_max_distance(0.0).match_rate(&m, 8), 1.0);
    }

    #[test]
    fn filter_keeps_order_and_boundary() {
        let m = matches(&[10.0, 30.0, 31.0, 90.0, 5.0]);
        let kept = MatchPolicy::with_max_distance(30.0).filter(m.clone());
        let idx: Vec<i32> = kept.iter().map(|m| m.query_idx).collect();
        assert_eq!(idx, vec![0, 1, 4]);
        assert_eq!(MatchPolicy::accept_all().filter(m.clone()), m);
    }

    #[test]
    fn partial_acceptance() {
        let policy = MatchPolicy::with_max_distance(30.0);
        let m = matches(&[10.0, 30.0, 31.0, 90.0]);
        assert_eq!(policy.accepted(&m), 2);
        assert_eq!(policy.match_rate(&m, 4), 0.5);
    }
}
