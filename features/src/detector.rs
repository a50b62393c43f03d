//! Keypoint detection.
//!
//! Each [`DetectorAlgorithm`] maps to one OpenCV detector through
//! [`DetectorAlgorithm::detect_fn`]; supporting another detector means adding
//! a variant and one line in that table.

use crate::convert::{image_to_mat, keypoints_from_cv};
use crate::{FeatureError, Result};
use easymatch_core::{Image, KeyPoints, ThresholdConfig};
use opencv::core::{KeyPoint as CvKeyPoint, Mat, Vector};
use opencv::features2d::{AgastFeatureDetector, FastFeatureDetector, AKAZE, BRISK, ORB, SIFT};
use opencv::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

type DetectFn = fn(&Mat, &ThresholdConfig) -> opencv::Result<Vector<CvKeyPoint>>;

/// Keypoint detection algorithms.
///
/// | variant | kind | scale invariant | thresholds read |
/// |---|---|---|---|
/// | `Sift` | DoG blob | yes | none |
/// | `Akaze` | AOS-scheme corner | no | `akaze_threshold` |
/// | `Orb` | oriented FAST corner | no | `orb_fast_threshold`, `orb_edge_threshold` |
/// | `Brisk` | scale-invariant FAST corner | yes | `brisk_threshold` |
/// | `Fast` | FAST corner | no | `fast_threshold` |
/// | `Agast` | AGAST corner | no | `agast_threshold` |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectorAlgorithm {
    Sift,
    Akaze,
    Orb,
    Brisk,
    Fast,
    Agast,
}

impl DetectorAlgorithm {
    pub const ALL: [DetectorAlgorithm; 6] = [
        DetectorAlgorithm::Sift,
        DetectorAlgorithm::Akaze,
        DetectorAlgorithm::Orb,
        DetectorAlgorithm::Brisk,
        DetectorAlgorithm::Fast,
        DetectorAlgorithm::Agast,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            DetectorAlgorithm::Sift => "sift",
            DetectorAlgorithm::Akaze => "akaze",
            DetectorAlgorithm::Orb => "orb",
            DetectorAlgorithm::Brisk => "brisk",
            DetectorAlgorithm::Fast => "fast",
            DetectorAlgorithm::Agast => "agast",
        }
    }

    /// Integer selector, `0..=5` in declaration order.
    pub fn selector(&self) -> i32 {
        *self as i32
    }

    fn detect_fn(self) -> DetectFn {
        match self {
            DetectorAlgorithm::Sift => detect_sift,
            DetectorAlgorithm::Akaze => detect_akaze,
            DetectorAlgorithm::Orb => detect_orb,
            DetectorAlgorithm::Brisk => detect_brisk,
            DetectorAlgorithm::Fast => detect_fast,
            DetectorAlgorithm::Agast => detect_agast,
        }
    }
}

impl fmt::Display for DetectorAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<i32> for DetectorAlgorithm {
    type Error = FeatureError;

    fn try_from(value: i32) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|a| a.selector() == value)
            .ok_or_else(|| {
                tracing::error!(selector = value, "unknown detection algorithm");
                FeatureError::UnknownDetector(format!("selector {value}"))
            })
    }
}

impl FromStr for DetectorAlgorithm {
    type Err = FeatureError;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim().to_ascii_lowercase();
        if let Ok(selector) = name.parse::<i32>() {
            return Self::try_from(selector);
        }
        match name.as_str() {
            "sift" => Ok(DetectorAlgorithm::Sift),
            "akaze" => Ok(DetectorAlgorithm::Akaze),
            "orb" => Ok(DetectorAlgorithm::Orb),
            "brisk" => Ok(DetectorAlgorithm::Brisk),
            "fast" | "fastfeaturedetector" => Ok(DetectorAlgorithm::Fast),
            "agast" | "agastfeaturedetector" => Ok(DetectorAlgorithm::Agast),
            _ => {
                tracing::error!(name = s, "unknown detection algorithm");
                Err(FeatureError::UnknownDetector(s.to_string()))
            }
        }
    }
}

fn detect_sift(image: &Mat, _threshold: &ThresholdConfig) -> opencv::Result<Vector<CvKeyPoint>> {
    let mut detector = SIFT::create_def()?;
    let mut keypoints = Vector::new();
    detector.detect_def(image, &mut keypoints)?;
    Ok(keypoints)
}

fn detect_akaze(image: &Mat, threshold: &ThresholdConfig) -> opencv::Result<Vector<CvKeyPoint>> {
    let mut detector = AKAZE::create_def()?;
    detector.set_threshold(threshold.akaze_threshold)?;
    let mut keypoints = Vector::new();
    detector.detect_def(image, &mut keypoints)?;
    Ok(keypoints)
}

fn detect_orb(image: &Mat, threshold: &ThresholdConfig) -> opencv::Result<Vector<CvKeyPoint>> {
    let mut detector = ORB::create_def()?;
    detector.set_fast_threshold(threshold.orb_fast_threshold)?;
    detector.set_edge_threshold(threshold.orb_edge_threshold)?;
    let mut keypoints = Vector::new();
    detector.detect_def(image, &mut keypoints)?;
    Ok(keypoints)
}

fn detect_brisk(image: &Mat, threshold: &ThresholdConfig) -> opencv::Result<Vector<CvKeyPoint>> {
    let mut detector = BRISK::create_def()?;
    detector.set_threshold(threshold.brisk_threshold)?;
    let mut keypoints = Vector::new();
    detector.detect_def(image, &mut keypoints)?;
    Ok(keypoints)
}

fn detect_fast(image: &Mat, threshold: &ThresholdConfig) -> opencv::Result<Vector<CvKeyPoint>> {
    let mut detector = FastFeatureDetector::create_def()?;
    detector.set_threshold(threshold.fast_threshold)?;
    let mut keypoints = Vector::new();
    detector.detect_def(image, &mut keypoints)?;
    Ok(keypoints)
}

fn detect_agast(image: &Mat, threshold: &ThresholdConfig) -> opencv::Result<Vector<CvKeyPoint>> {
    let mut detector = AgastFeatureDetector::create_def()?;
    detector.set_threshold(threshold.agast_threshold)?;
    let mut keypoints = Vector::new();
    detector.detect_def(image, &mut keypoints)?;
    Ok(keypoints)
}

/// Detection stage result: the image, the algorithm and thresholds used, and
/// the keypoints found. Read-only once constructed.
#[derive(Debug, Clone)]
pub struct FeatureDetector {
    image: Image,
    algorithm: DetectorAlgorithm,
    threshold: ThresholdConfig,
    keypoints: KeyPoints,
}

impl FeatureDetector {
    /// Runs `algorithm` on `image` with the thresholds it reads from `threshold`.
    ///
    /// An empty image yields no keypoints without touching OpenCV.
    pub fn detect(
        image: &Image,
        algorithm: DetectorAlgorithm,
        threshold: ThresholdConfig,
    ) -> Result<Self> {
        let keypoints = if image.is_empty() {
            KeyPoints::new()
        } else {
            let mat = image_to_mat(image)?;
            let found = (algorithm.detect_fn())(&mat, &threshold)?;
            KeyPoints {
                keypoints: keypoints_from_cv(&found),
            }
        };

        tracing::debug!(
            algorithm = %algorithm,
            width = image.width(),
            height = image.height(),
            keypoints = keypoints.len(),
            "detected keypoints"
        );

        Ok(Self {
            image: image.clone(),
            algorithm,
            threshold,
            keypoints,
        })
    }

    pub fn image(&self) -> &Image {
        &self.image
    }

    pub fn algorithm(&self) -> DetectorAlgorithm {
        self.algorithm
    }

    pub fn threshold(&self) -> &ThresholdConfig {
        &self.threshold
    }

    pub fn keypoints(&self) -> &KeyPoints {
        &self.keypoints
    }
}

/// Detects keypoints without keeping the stage record around.
pub fn detect_keypoints(
    image: &Image,
    algorithm: DetectorAlgorithm,
    threshold: &ThresholdConfig,
) -> Result<KeyPoints> {
    FeatureDetector::detect(image, algorithm, *threshold).map(|d| d.keypoints)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selectors_follow_declaration_order() {
        for (idx, algorithm) in DetectorAlgorithm::ALL.iter().enumerate() {
            assert_eq!(algorithm.selector(), idx as i32);
            assert_eq!(DetectorAlgorithm::try_from(idx as i32).unwrap(), *algorithm);
        }
    }

    #[test]
    fn unknown_selector_is_a_config_error() {
        let err = DetectorAlgorithm::try_from(6).unwrap_err();
        assert!(matches!(err, FeatureError::UnknownDetector(_)));
        assert!(err.is_config_error());
        assert!(DetectorAlgorithm::try_from(-1).is_err());
    }

    #[test]
    fn parses_names_and_aliases() {
        assert_eq!("ORB".parse::<DetectorAlgorithm>().unwrap(), DetectorAlgorithm::Orb);
        assert_eq!(
            "FastFeatureDetector".parse::<DetectorAlgorithm>().unwrap(),
            DetectorAlgorithm::Fast
        );
        assert_eq!(" 5 ".parse::<DetectorAlgorithm>().unwrap(), DetectorAlgorithm::Agast);
        assert!(matches!(
            "surf".parse::<DetectorAlgorithm>(),
            Err(FeatureError::UnknownDetector(name)) if name == "surf"
        ));
    }

    #[test]
    fn display_round_trips_through_from_str() {
        for algorithm in DetectorAlgorithm::ALL {
            assert_eq!(algorithm.to_string().parse::<DetectorAlgorithm>().unwrap(), algorithm);
        }
    }

    #[test]
    fn empty_image_detects_nothing() {
        let det = FeatureDetector::detect(
            &Image::empty(),
            DetectorAlgorithm::Orb,
            ThresholdConfig::default(),
        )
        .unwrap();
        assert!(det.keypoints().is_empty());
        assert_eq!(det.algorithm(), DetectorAlgorithm::Orb);
    }
}
