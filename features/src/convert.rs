//! Conversions between the core data model and OpenCV containers.

use crate::{FeatureError, Result};
use easymatch_core::{
    DescriptorKind, DescriptorMatrix, FeatureMatch, Image, KeyPoint, Matches, PixelLayout,
};
use opencv::core::{
    DMatch, KeyPoint as CvKeyPoint, Mat, Scalar, Vector, CV_32FC1, CV_8UC1, CV_8UC4,
};
use opencv::imgproc;
use opencv::prelude::*;

pub(crate) fn image_to_mat(image: &Image) -> Result<Mat> {
    let mut mat = Mat::new_rows_cols_with_default(
        image.height() as i32,
        image.width() as i32,
        CV_8UC4,
        Scalar::all(0.0),
    )?;
    mat.data_bytes_mut()?.copy_from_slice(image.as_raw());
    Ok(mat)
}

/// Reads a `draw_matches` canvas back into an RGBA image.
///
/// Our input mats are RGBA, which OpenCV treats as BGRA, so the channel
/// order survives drawing unchanged. Depending on the OpenCV version the
/// canvas has 3 or 4 channels; only a missing alpha channel is added back.
pub(crate) fn canvas_to_image(canvas: &Mat) -> Result<Image> {
    let mut rgba = match canvas.channels() {
        4 => canvas.try_clone()?,
        3 => {
            let mut out = Mat::default();
            imgproc::cvt_color_def(canvas, &mut out, imgproc::COLOR_BGR2BGRA)?;
            out
        }
        1 => {
            let mut out = Mat::default();
            imgproc::cvt_color_def(canvas, &mut out, imgproc::COLOR_GRAY2BGRA)?;
            out
        }
        n => {
            return Err(FeatureError::MatchingError(format!(
                "unexpected {n}-channel match canvas"
            )))
        }
    };
    if !rgba.is_continuous() {
        rgba = rgba.try_clone()?;
    }
    let image = Image::from_raw(
        rgba.cols() as u32,
        rgba.rows() as u32,
        PixelLayout::Rgba,
        rgba.data_bytes()?,
    )?;
    Ok(image)
}

pub(crate) fn keypoints_to_cv(keypoints: &[KeyPoint]) -> Result<Vector<CvKeyPoint>> {
    let mut out = Vector::<CvKeyPoint>::with_capacity(keypoints.len());
    for kp in keypoints {
        out.push(CvKeyPoint::new_coords(
            kp.x as f32,
            kp.y as f32,
            kp.size as f32,
            kp.angle as f32,
            kp.response as f32,
            kp.octave,
            kp.class_id,
        )?);
    }
    Ok(out)
}

pub(crate) fn keypoints_from_cv(keypoints: &Vector<CvKeyPoint>) -> Vec<KeyPoint> {
    keypoints
        .iter()
        .map(|kp| {
            let pt = kp.pt();
            KeyPoint::new(pt.x as f64, pt.y as f64)
                .with_size(kp.size() as f64)
                .with_angle(kp.angle() as f64)
                .with_response(kp.response() as f64)
                .with_octave(kp.octave())
                .with_class_id(kp.class_id())
        })
        .collect()
}

pub(crate) fn descriptors_to_mat(descriptors: &DescriptorMatrix) -> Result<Mat> {
    let rows = descriptors.rows() as i32;
    let cols = descriptors.cols() as i32;
    match descriptors.kind() {
        DescriptorKind::Binary => {
            let mut mat = Mat::new_rows_cols_with_default(rows, cols, CV_8UC1, Scalar::all(0.0))?;
            if let Some(data) = descriptors.as_binary() {
                mat.data_bytes_mut()?.copy_from_slice(data);
            }
            Ok(mat)
        }
        DescriptorKind::Float => {
            let mut mat =
                Mat::new_rows_cols_with_default(rows, cols, CV_32FC1, Scalar::all(0.0))?;
            if let Some(data) = descriptors.as_float() {
                mat.data_typed_mut::<f32>()?.copy_from_slice(data);
            }
            Ok(mat)
        }
    }
}

/// Converts a descriptor mat; an empty mat becomes a zero-row matrix of
/// `fallback_kind` so callers always get a typed result.
pub(crate) fn descriptors_from_mat(
    mat: &Mat,
    fallback_kind: DescriptorKind,
    fallback_cols: usize,
) -> Result<DescriptorMatrix> {
    if mat.empty() || mat.rows() == 0 {
        return Ok(DescriptorMatrix::empty(fallback_kind, fallback_cols));
    }

    let owned;
    let mat = if mat.is_continuous() {
        mat
    } else {
        owned = mat.try_clone()?;
        &owned
    };

    let rows = mat.rows() as usize;
    let cols = mat.cols() as usize;
    let typ = mat.typ();
    let descriptors = if typ == CV_8UC1 {
        DescriptorMatrix::binary(rows, cols, mat.data_typed::<u8>()?.to_vec())?
    } else if typ == CV_32FC1 {
        DescriptorMatrix::float(rows, cols, mat.data_typed::<f32>()?.to_vec())?
    } else {
        return Err(FeatureError::DescriptorError(format!(
            "unsupported descriptor mat type {typ}"
        )));
    };
    Ok(descriptors)
}

pub(crate) fn matches_to_cv(matches: &Matches) -> Vector<DMatch> {
    let mut out = Vector::<DMatch>::with_capacity(matches.len());
    for m in matches.iter() {
        out.push(DMatch {
            query_idx: m.query_idx,
            train_idx: m.train_idx,
            img_idx: m.img_idx,
            distance: m.distance,
        });
    }
    out
}

pub(crate) fn matches_from_cv(matches: &Vector<DMatch>) -> Matches {
    matches
        .iter()
        .map(|m| FeatureMatch::new(m.query_idx, m.train_idx, m.distance))
        .collect()
}
