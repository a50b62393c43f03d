use serde::{Deserialize, Serialize};

/// A salient image location: position, scale, orientation and response strength.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeyPoint {
    pub x: f64,
    pub y: f64,
    /// Diameter of the meaningful neighbourhood.
    pub size: f64,
    /// Orientation in degrees, `-1.0` when the detector does not assign one.
    pub angle: f64,
    pub response: f64,
    pub octave: i32,
    pub class_id: i32,
}

impl KeyPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            size: 1.0,
            angle: -1.0,
            response: 0.0,
            octave: 0,
            class_id: -1,
        }
    }

    pub fn with_size(mut self, size: f64) -> Self {
        self.size = size;
        self
    }

    pub fn with_angle(mut self, angle: f64) -> Self {
        self.angle = angle;
        self
    }

    pub fn with_response(mut self, response: f64) -> Self {
        self.response = response;
        self
    }

    pub fn with_octave(mut self, octave: i32) -> Self {
        self.octave = octave;
        self
    }

    pub fn with_class_id(mut self, class_id: i32) -> Self {
        self.class_id = class_id;
        self
    }
}

impl Default for KeyPoint {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

/// One correspondence between a query row and a train row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatch {
    pub query_idx: i32,
    pub train_idx: i32,
    pub distance: f32,
    pub img_idx: i32,
}

impl FeatureMatch {
    pub fn new(query_idx: i32, train_idx: i32, distance: f32) -> Self {
        Self {
            query_idx,
            train_idx,
            distance,
            img_idx: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Matches {
    pub matches: Vec<FeatureMatch>,
}

impl Matches {
    pub fn new() -> Self {
        Self {
            matches: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FeatureMatch> {
        self.matches.iter()
    }

    /// Drops correspondences farther apart than `max_distance`, keeping order.
    pub fn filter_by_distance(&mut self, max_distance: f32) {
        self.matches.retain(|m| m.distance <= max_distance);
    }
}

impl FromIterator<FeatureMatch> for Matches {
    fn from_iter<I: IntoIterator<Item = FeatureMatch>>(iter: I) -> Self {
        Self {
            matches: iter.into_iter().collect(),
        }
    }
}

/// Ordered keypoint sequence as produced by a detector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyPoints {
    pub keypoints: Vec<KeyPoint>,
}

impl KeyPoints {
    pub fn new() -> Self {
        Self {
            keypoints: Vec::new(),
        }
    }

    pub fn get(&self, idx: usize) -> Option<&KeyPoint> {
        self.keypoints.get(idx)
    }

    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &KeyPoint> {
        self.keypoints.iter()
    }
}

impl FromIterator<KeyPoint> for KeyPoints {
    fn from_iter<I: IntoIterator<Item = KeyPoint>>(iter: I) -> Self {
        Self {
            keypoints: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keypoint_builder_sets_fields() {
        let kp = KeyPoint::new(3.0, 4.0)
            .with_size(7.0)
            .with_angle(90.0)
            .with_response(0.5)
            .with_octave(2)
            .with_class_id(1);
        assert_eq!((kp.x, kp.y), (3.0, 4.0));
        assert_eq!(kp.size, 7.0);
        assert_eq!(kp.angle, 90.0);
        assert_eq!(kp.octave, 2);
        assert_eq!(kp.class_id, 1);
    }

    #[test]
    fn keypoint_default_has_no_orientation() {
        let kp = KeyPoint::default();
        assert_eq!(kp.angle, -1.0);
        assert_eq!(kp.class_id, -1);
    }

    #[test]
    fn matches_filter_by_distance_keeps_order() {
        let mut matches: Matches = vec![
            FeatureMatch::new(0, 4, 12.0),
            FeatureMatch::new(1, 2, 40.0),
            FeatureMatch::new(2, 0, 3.0),
        ]
        .into_iter()
        .collect();

        matches.filter_by_distance(12.0);
        let kept: Vec<i32> = matches.iter().map(|m| m.query_idx).collect();
        assert_eq!(kept, vec![0, 2]);
    }

    #[test]
    fn keypoints_collect_and_index() {
        let kps: KeyPoints = (0..3).map(|i| KeyPoint::new(i as f64, 0.0)).collect();
        assert_eq!(kps.len(), 3);
        assert_eq!(kps.get(2).map(|kp| kp.x), Some(2.0));
        assert!(kps.get(3).is_none());
    }
}
