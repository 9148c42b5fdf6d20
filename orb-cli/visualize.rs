use std::path::Path;

use image::{Rgb, RgbImage, imageops};
use imageproc::drawing::{draw_hollow_circle_mut, draw_line_segment_mut};
use orb_core::Keypoint;
use orb_match::MatchCandidate;

use crate::error::{OrbError, OrbResult};

const ACCEPTED: Rgb<u8> = Rgb([0, 255, 0]);
const REJECTED: Rgb<u8> = Rgb([255, 0, 0]);
const KEYPOINT_RADIUS: i32 = 4;

/// Query and candidate side by side, matched keypoints circled and joined.
///
/// Matches with a distance below `max_distance` are drawn green, the rest red.
/// Matches whose indices fall outside either keypoint list are ignored.
pub fn draw_matches(
    query: &RgbImage,
    query_kps: &[Keypoint],
    train: &RgbImage,
    train_kps: &[Keypoint],
    matches: &[MatchCandidate],
    max_distance: u32,
) -> RgbImage {
    let offset = query.width();
    let mut canvas = RgbImage::new(offset + train.width(), query.height().max(train.height()));
    imageops::replace(&mut canvas, query, 0, 0);
    imageops::replace(&mut canvas, train, i64::from(offset), 0);

    for m in matches {
        let (Some(q), Some(t)) = (query_kps.get(m.query_idx), train_kps.get(m.train_idx)) else {
            continue;
        };
        let color = if m.distance < max_distance { ACCEPTED } else { REJECTED };
        let start = (q.x, q.y);
        let end = (t.x + offset as f32, t.y);

        draw_hollow_circle_mut(&mut canvas, (start.0 as i32, start.1 as i32), KEYPOINT_RADIUS, color);
        draw_hollow_circle_mut(&mut canvas, (end.0 as i32, end.1 as i32), KEYPOINT_RADIUS, color);
        draw_line_segment_mut(&mut canvas, start, end, color);
    }

    canvas
}

/// Draw the matches and write the result, format chosen by file extension
pub fn save_matches(
    path: &Path,
    query: &RgbImage,
    query_kps: &[Keypoint],
    train: &RgbImage,
    train_kps: &[Keypoint],
    matches: &[MatchCandidate],
    max_distance: u32,
) -> OrbResult<()> {
    draw_matches(query, query_kps, train, train_kps, matches, max_distance)
        .save(path)
        .map_err(|source| OrbError::Encode {
            path: path.to_path_buf(),
            source,
        })
}
