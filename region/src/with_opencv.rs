//! Contour-based region detection.

use crate::common::*;
use bbox::Bbox;
use opencv::{core as core_cv, imgcodecs, imgproc, prelude::*, types::VectorOfVectorOfPoint};

// Canny recommends an upper:lower threshold ratio between 2:1 and 3:1.
const CANNY_LOW_THRESHOLD: f64 = 100.0;
const CANNY_RATIO: f64 = 2.5;

/// Edge map of a grayscale image: 3x3 box blur followed by Canny.
pub fn detect_edges(image: &core_cv::Mat) -> Result<core_cv::Mat> {
    let mut blurred = core_cv::Mat::default();
    imgproc::blur(
        image,
        &mut blurred,
        core_cv::Size::new(3, 3),
        core_cv::Point::new(-1, -1),
        core_cv::BORDER_DEFAULT,
    )?;

    let mut edges = core_cv::Mat::default();
    imgproc::canny(
        &blurred,
        &mut edges,
        CANNY_LOW_THRESHOLD,
        CANNY_LOW_THRESHOLD * CANNY_RATIO,
        3,
        false,
    )?;
    Ok(edges)
}

/// Bounding rectangles of the outermost edge contours. No ordering
/// guarantee; the result may be empty.
pub fn detect_regions(image: &core_cv::Mat) -> Result<Vec<Bbox<i64>>> {
    let edges = detect_edges(image)?;

    let mut contours = VectorOfVectorOfPoint::new();
    imgproc::find_contours(
        &edges,
        &mut contours,
        imgproc::RETR_EXTERNAL,
        imgproc::CHAIN_APPROX_SIMPLE,
        core_cv::Point::new(0, 0),
    )?;

    let bboxes: Vec<_> = contours
        .iter()
        .map(|contour| -> Result<_> {
            let rect = imgproc::bounding_rect(&contour)?;
            let bbox = Bbox::try_from_xywh([
                rect.x as i64,
                rect.y as i64,
                rect.width as i64,
                rect.height as i64,
            ])?;
            Ok(bbox)
        })
        .collect::<Result<_>>()?;
    Ok(bboxes)
}

/// Load an image as grayscale and detect its regions.
pub fn detect_regions_file(path: impl AsRef<std::path::Path>) -> Result<Vec<Bbox<i64>>> {
    let path = path.as_ref();
    let path_str = path
        .to_str()
        .ok_or_else(|| format_err!("non UTF-8 image path '{}'", path.display()))?;
    let image = imgcodecs::imread(path_str, imgcodecs::IMREAD_GRAYSCALE)?;
    ensure!(
        !image.empty()?,
        "failed to read image '{}'",
        path.display()
    );
    detect_regions(&image)
}
