//! Detector threshold configuration.
//!
//! Defaults live on the record itself so pipelines running with different
//! settings never interfere with each other.

use crate::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

pub const DEFAULT_AKAZE_THRESHOLD: f64 = 0.001;
pub const DEFAULT_ORB_FAST_THRESHOLD: i32 = 20;
pub const DEFAULT_ORB_EDGE_THRESHOLD: i32 = 31;
pub const DEFAULT_BRISK_THRESHOLD: i32 = 30;
pub const DEFAULT_FAST_THRESHOLD: i32 = 10;
pub const DEFAULT_AGAST_THRESHOLD: i32 = 10;

/// Per-family detector sensitivities.
///
/// Each detector reads only the fields that belong to it; SIFT reads none.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    /// AKAZE detector response threshold.
    pub akaze_threshold: f64,
    /// FAST threshold used inside ORB.
    pub orb_fast_threshold: i32,
    /// ORB border width in which no features are detected.
    pub orb_edge_threshold: i32,
    /// BRISK AGAST score threshold.
    pub brisk_threshold: i32,
    /// FAST intensity threshold.
    pub fast_threshold: i32,
    /// AGAST intensity threshold.
    pub agast_threshold: i32,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            akaze_threshold: DEFAULT_AKAZE_THRESHOLD,
            orb_fast_threshold: DEFAULT_ORB_FAST_THRESHOLD,
            orb_edge_threshold: DEFAULT_ORB_EDGE_THRESHOLD,
            brisk_threshold: DEFAULT_BRISK_THRESHOLD,
            fast_threshold: DEFAULT_FAST_THRESHOLD,
            agast_threshold: DEFAULT_AGAST_THRESHOLD,
        }
    }
}

impl ThresholdConfig {
    /// Defaults with any `EASYMATCH_*` environment overrides applied.
    pub fn from_env() -> Result<Self> {
        Self::default().with_env_overrides()
    }

    /// Overrides fields from the environment:
    ///
    /// - `EASYMATCH_AKAZE_THRESHOLD`
    /// - `EASYMATCH_ORB_FAST_THRESHOLD`
    /// - `EASYMATCH_ORB_EDGE_THRESHOLD`
    /// - `EASYMATCH_BRISK_THRESHOLD`
    /// - `EASYMATCH_FAST_THRESHOLD`
    /// - `EASYMATCH_AGAST_THRESHOLD`
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|key| match env::var(key) {
            Ok(v) => Ok(Some(v)),
            Err(env::VarError::NotPresent) => Ok(None),
            Err(e) => Err(CoreError::Config(format!("failed to read {key}: {e}"))),
        })
    }

    fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Result<Option<String>>,
    {
        override_field(&lookup, "EASYMATCH_AKAZE_THRESHOLD", &mut self.akaze_threshold)?;
        override_field(&lookup, "EASYMATCH_ORB_FAST_THRESHOLD", &mut self.orb_fast_threshold)?;
        override_field(&lookup, "EASYMATCH_ORB_EDGE_THRESHOLD", &mut self.orb_edge_threshold)?;
        override_field(&lookup, "EASYMATCH_BRISK_THRESHOLD", &mut self.brisk_threshold)?;
        override_field(&lookup, "EASYMATCH_FAST_THRESHOLD", &mut self.fast_threshold)?;
        override_field(&lookup, "EASYMATCH_AGAST_THRESHOLD", &mut self.agast_threshold)?;
        Ok(self)
    }
}

fn override_field<F, T>(lookup: &F, key: &str, field: &mut T) -> Result<()>
where
    F: Fn(&str) -> Result<Option<String>>,
    T: FromStr,
{
    let Some(raw) = lookup(key)? else {
        return Ok(());
    };
    *field = raw
        .trim()
        .parse()
        .map_err(|_| CoreError::Config(format!("{key} must be a number, got '{raw}'")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Result<Option<String>> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| Ok(map.get(key).cloned())
    }

    #[test]
    fn akaze_default_matches_single_precision_value() {
        assert_eq!(DEFAULT_AKAZE_THRESHOLD as f32, 0.001_000_000_047_497_45_f64 as f32);
    }

    #[test]
    fn defaults_match_documented_values() {
        let cfg = ThresholdConfig::default();
        assert_eq!(cfg.akaze_threshold, 0.001);
        assert_eq!(cfg.orb_fast_threshold, 20);
        assert_eq!(cfg.orb_edge_threshold, 31);
        assert_eq!(cfg.brisk_threshold, 30);
        assert_eq!(cfg.fast_threshold, 10);
        assert_eq!(cfg.agast_threshold, 10);
    }

    #[test]
    fn overrides_replace_only_present_keys() {
        let cfg = ThresholdConfig::default()
            .with_overrides(lookup_from(&[
                ("EASYMATCH_FAST_THRESHOLD", "25"),
                ("EASYMATCH_AKAZE_THRESHOLD", " 0.0005 "),
            ]))
            .unwrap();
        assert_eq!(cfg.fast_threshold, 25);
        assert_eq!(cfg.akaze_threshold, 0.0005);
        assert_eq!(cfg.orb_fast_threshold, DEFAULT_ORB_FAST_THRESHOLD);
    }

    #[test]
    fn unparsable_override_is_an_error() {
        let err = ThresholdConfig::default()
            .with_overrides(lookup_from(&[("EASYMATCH_BRISK_THRESHOLD", "high")]))
            .unwrap_err();
        assert!(matches!(err, CoreError::Config(msg) if msg.contains("EASYMATCH_BRISK_THRESHOLD")));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: ThresholdConfig =
            serde_json::from_str(r#"{ "orb_fast_threshold": 12, "orb_edge_threshold": 19 }"#)
                .unwrap();
        assert_eq!(cfg.orb_fast_threshold, 12);
        assert_eq!(cfg.orb_edge_threshold, 19);
        assert_eq!(cfg.agast_threshold, DEFAULT_AGAST_THRESHOLD);
    }
}
