//! Descriptor computation for detected keypoints.

use crate::convert::{descriptors_from_mat, image_to_mat, keypoints_from_cv, keypoints_to_cv};
use crate::detector::{DetectorAlgorithm, FeatureDetector};
use crate::{FeatureError, Result};
use easymatch_core::{DescriptorKind, DescriptorMatrix, Image, KeyPoints};
use opencv::core::{KeyPoint as CvKeyPoint, Mat, Vector};
use opencv::features2d::{AKAZE, BRISK, ORB, SIFT};
use opencv::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

type ComputeFn = fn(&Mat, &mut Vector<CvKeyPoint>, &mut Mat) -> opencv::Result<()>;

/// Descriptor algorithms.
///
/// | variant | encoding | row type | row width |
/// |---|---|---|---|
/// | `Sift` | gradient orientation histogram | float | 128 |
/// | `Akaze` | modified local difference binary | binary | 61 bytes |
/// | `Orb` | rotation-invariant BRIEF | binary | 32 bytes |
/// | `Brisk` | rotation-invariant BRIEF-style sampling | binary | 64 bytes |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DescriptorAlgorithm {
    Sift,
    Akaze,
    Orb,
    Brisk,
}

impl DescriptorAlgorithm {
    pub const ALL: [DescriptorAlgorithm; 4] = [
        DescriptorAlgorithm::Sift,
        DescriptorAlgorithm::Akaze,
        DescriptorAlgorithm::Orb,
        DescriptorAlgorithm::Brisk,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            DescriptorAlgorithm::Sift => "sift",
            DescriptorAlgorithm::Akaze => "akaze",
            DescriptorAlgorithm::Orb => "orb",
            DescriptorAlgorithm::Brisk => "brisk",
        }
    }

    pub fn selector(&self) -> i32 {
        *self as i32
    }

    pub fn kind(&self) -> DescriptorKind {
        match self {
            DescriptorAlgorithm::Sift => DescriptorKind::Float,
            DescriptorAlgorithm::Akaze | DescriptorAlgorithm::Orb | DescriptorAlgorithm::Brisk => {
                DescriptorKind::Binary
            }
        }
    }

    /// Row width OpenCV produces with default parameters.
    pub fn row_width(&self) -> usize {
        match self {
            DescriptorAlgorithm::Sift => 128,
            DescriptorAlgorithm::Akaze => 61,
            DescriptorAlgorithm::Orb => 32,
            DescriptorAlgorithm::Brisk => 64,
        }
    }

    /// Whether keypoints from `detector` can be described by this algorithm.
    ///
    /// AKAZE descriptors index the AKAZE scale space through `class_id`, and
    /// ORB reads `octave` as a pyramid level, which SIFT packs with extra bits.
    pub fn accepts(&self, detector: DetectorAlgorithm) -> bool {
        match self {
            DescriptorAlgorithm::Akaze => detector == DetectorAlgorithm::Akaze,
            DescriptorAlgorithm::Orb => detector != DetectorAlgorithm::Sift,
            DescriptorAlgorithm::Sift | DescriptorAlgorithm::Brisk => true,
        }
    }

    fn compute_fn(self) -> ComputeFn {
        match self {
            DescriptorAlgorithm::Sift => compute_sift,
            DescriptorAlgorithm::Akaze => compute_akaze,
            DescriptorAlgorithm::Orb => compute_orb,
            DescriptorAlgorithm::Brisk => compute_brisk,
        }
    }
}

impl fmt::Display for DescriptorAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<i32> for DescriptorAlgorithm {
    type Error = FeatureError;

    fn try_from(value: i32) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|a| a.selector() == value)
            .ok_or_else(|| {
                tracing::error!(selector = value, "unknown descriptor algorithm");
                FeatureError::UnknownDescriptor(format!("selector {value}"))
            })
    }
}

impl FromStr for DescriptorAlgorithm {
    type Err = FeatureError;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim().to_ascii_lowercase();
        if let Ok(selector) = name.parse::<i32>() {
            return Self::try_from(selector);
        }
        match name.as_str() {
            "sift" => Ok(DescriptorAlgorithm::Sift),
            "akaze" => Ok(DescriptorAlgorithm::Akaze),
            "orb" => Ok(DescriptorAlgorithm::Orb),
            "brisk" => Ok(DescriptorAlgorithm::Brisk),
            _ => {
                tracing::error!(name = s, "unknown descriptor algorithm");
                Err(FeatureError::UnknownDescriptor(s.to_string()))
            }
        }
    }
}

fn compute_sift(
    image: &Mat,
    keypoints: &mut Vector<CvKeyPoint>,
    descriptors: &mut Mat,
) -> opencv::Result<()> {
    let mut extractor = SIFT::create_def()?;
    extractor.compute(image, keypoints, descriptors)
}

fn compute_akaze(
    image: &Mat,
    keypoints: &mut Vector<CvKeyPoint>,
    descriptors: &mut Mat,
) -> opencv::Result<()> {
    let mut extractor = AKAZE::create_def()?;
    extractor.compute(image, keypoints, descriptors)
}

fn compute_orb(
    image: &Mat,
    keypoints: &mut Vector<CvKeyPoint>,
    descriptors: &mut Mat,
) -> opencv::Result<()> {
    let mut extractor = ORB::create_def()?;
    extractor.compute(image, keypoints, descriptors)
}

fn compute_brisk(
    image: &Mat,
    keypoints: &mut Vector<CvKeyPoint>,
    descriptors: &mut Mat,
) -> opencv::Result<()> {
    let mut extractor = BRISK::create_def()?;
    extractor.compute(image, keypoints, descriptors)
}

/// Description stage result.
///
/// Row `i` of [`descriptors`](Self::descriptors) describes keypoint `i` of
/// [`keypoints`](Self::keypoints). OpenCV may drop keypoints it cannot
/// describe (too close to the border, for instance), so the stored keypoints
/// can be a subset of the detector's.
#[derive(Debug, Clone)]
pub struct DescriptorExtractor {
    image: Image,
    keypoints: KeyPoints,
    detector: DetectorAlgorithm,
    algorithm: DescriptorAlgorithm,
    descriptors: DescriptorMatrix,
}

impl DescriptorExtractor {
    pub fn extract(detector: &FeatureDetector, algorithm: DescriptorAlgorithm) -> Result<Self> {
        if !algorithm.accepts(detector.algorithm()) {
            tracing::error!(
                detector = %detector.algorithm(),
                descriptor = %algorithm,
                "descriptor cannot describe these keypoints"
            );
            return Err(FeatureError::IncompatibleConfig(format!(
                "{algorithm} descriptors cannot be computed for {} keypoints",
                detector.algorithm()
            )));
        }

        let input = detector.keypoints();
        let (keypoints, descriptors) = if input.is_empty() {
            (
                KeyPoints::new(),
                DescriptorMatrix::empty(algorithm.kind(), algorithm.row_width()),
            )
        } else {
            let mat = image_to_mat(detector.image())?;
            let mut cv_keypoints = keypoints_to_cv(&input.keypoints)?;
            let mut cv_descriptors = Mat::default();
            (algorithm.compute_fn())(&mat, &mut cv_keypoints, &mut cv_descriptors)?;
            (
                KeyPoints {
                    keypoints: keypoints_from_cv(&cv_keypoints),
                },
                descriptors_from_mat(&cv_descriptors, algorithm.kind(), algorithm.row_width())?,
            )
        };

        if descriptors.rows() != keypoints.len() {
            return Err(FeatureError::DescriptorError(format!(
                "{algorithm} returned {} rows for {} keypoints",
                descriptors.rows(),
                keypoints.len()
            )));
        }

        tracing::debug!(
            descriptor = %algorithm,
            detector = %detector.algorithm(),
            keypoints = keypoints.len(),
            dropped = input.len().saturating_sub(keypoints.len()),
            cols = descriptors.cols(),
            "computed descriptors"
        );

        Ok(Self {
            image: detector.image().clone(),
            keypoints,
            detector: detector.algorithm(),
            algorithm,
            descriptors,
        })
    }

    pub fn image(&self) -> &Image {
        &self.image
    }

    pub fn keypoints(&self) -> &KeyPoints {
        &self.keypoints
    }

    pub fn detector(&self) -> DetectorAlgorithm {
        self.detector
    }

    pub fn algorithm(&self) -> DescriptorAlgorithm {
        self.algorithm
    }

    pub fn descriptors(&self) -> &DescriptorMatrix {
        &self.descriptors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use easymatch_core::ThresholdConfig;

    #[test]
    fn kinds_follow_descriptor_family() {
        assert_eq!(DescriptorAlgorithm::Sift.kind(), DescriptorKind::Float);
        for algorithm in [
            DescriptorAlgorithm::Akaze,
            DescriptorAlgorithm::Orb,
            DescriptorAlgorithm::Brisk,
        ] {
            assert_eq!(algorithm.kind(), DescriptorKind::Binary);
        }
    }

    #[test]
    fn unknown_selectors_are_rejected() {
        assert!(matches!(
            DescriptorAlgorithm::try_from(4),
            Err(FeatureError::UnknownDescriptor(_))
        ));
        assert!(matches!(
            "freak".parse::<DescriptorAlgorithm>(),
            Err(FeatureError::UnknownDescriptor(_))
        ));
        assert_eq!("1".parse::<DescriptorAlgorithm>().unwrap(), DescriptorAlgorithm::Akaze);
    }

    #[test]
    fn akaze_descriptors_need_akaze_keypoints() {
        assert!(DescriptorAlgorithm::Akaze.accepts(DetectorAlgorithm::Akaze));
        assert!(!DescriptorAlgorithm::Akaze.accepts(DetectorAlgorithm::Orb));
        assert!(!DescriptorAlgorithm::Orb.accepts(DetectorAlgorithm::Sift));
        assert!(DescriptorAlgorithm::Sift.accepts(DetectorAlgorithm::Fast));

        let det = FeatureDetector::detect(
            &Image::empty(),
            DetectorAlgorithm::Fast,
            ThresholdConfig::default(),
        )
        .unwrap();
        let err = DescriptorExtractor::extract(&det, DescriptorAlgorithm::Akaze).unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn no_keypoints_gives_zero_row_matrix() {
        let det = FeatureDetector::detect(
            &Image::empty(),
            DetectorAlgorithm::Sift,
            ThresholdConfig::default(),
        )
        .unwrap();
        let ext = DescriptorExtractor::extract(&det, DescriptorAlgorithm::Sift).unwrap();
        assert_eq!(ext.descriptors().rows(), 0);
        assert_eq!(ext.descriptors().kind(), DescriptorKind::Float);
        assert_eq!(ext.descriptors().cols(), 128);
        assert!(ext.keypoints().is_empty());
    }
}
