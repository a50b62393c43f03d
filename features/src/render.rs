use crate::convert::{canvas_to_image, image_to_mat, keypoints_to_cv, matches_to_cv};
use crate::extractor::DescriptorExtractor;
use crate::{FeatureError, Result};
use easymatch_core::{CoreError, Image, Matches};
use opencv::core::Mat;
use opencv::features2d;

/// Draws source and target side by side with a line per correspondence.
pub fn render_matches(
    source: &DescriptorExtractor,
    target: &DescriptorExtractor,
    matches: &Matches,
) -> Result<Image> {
    if source.image().is_empty() || target.image().is_empty() {
        return Err(CoreError::InvalidBuffer("cannot render matches for an empty image".into()).into());
    }

    let source_len = source.keypoints().len();
    let target_len = target.keypoints().len();
    if let Some(bad) = matches.iter().find(|m| {
        m.query_idx < 0
            || m.train_idx < 0
            || m.query_idx as usize >= source_len
            || m.train_idx as usize >= target_len
    }) {
        return Err(FeatureError::MatchingError(format!(
            "match {} -> {} is outside {source_len} source / {target_len} target keypoints",
            bad.query_idx, bad.train_idx
        )));
    }

    let source_mat = image_to_mat(source.image())?;
    let target_mat = image_to_mat(target.image())?;
    let source_kps = keypoints_to_cv(&source.keypoints().keypoints)?;
    let target_kps = keypoints_to_cv(&target.keypoints().keypoints)?;
    let cv_matches = matches_to_cv(matches);

    let mut canvas = Mat::default();
    features2d::draw_matches_def(
        &source_mat,
        &source_kps,
        &target_mat,
        &target_kps,
        &cv_matches,
        &mut canvas,
    )?;

    let rendered = canvas_to_image(&canvas)?;
    tracing::debug!(
        width = rendered.width(),
        height = rendered.height(),
        matches = matches.len(),
        "rendered match visualization"
    );
    Ok(rendered)
}
