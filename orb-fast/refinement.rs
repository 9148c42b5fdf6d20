use orb_core::Image;
use crate::types::ScoredKeypoint;
use std::cmp::Ordering;

/// Keypoint ranking, suppression and orientation
pub struct KeypointRefinement;

impl KeypointRefinement {
    /// Strongest-first ordering; equal responses keep their input order.
    fn by_response_desc(a: &ScoredKeypoint, b: &ScoredKeypoint) -> Ordering {
        b.response.total_cmp(&a.response)
    }

    /// Non-maximum suppression to reduce duplicate keypoints.
    ///
    /// Returns survivors strongest first.
    pub fn non_maximum_suppression(keypoints: &[ScoredKeypoint], min_distance: f32) -> Vec<ScoredKeypoint> {
        if keypoints.is_empty() {
            return Vec::new();
        }

        let mut sorted_keypoints = keypoints.to_vec();
        sorted_keypoints.sort_by(Self::by_response_desc);

        if min_distance <= 0.0 {
            return sorted_keypoints;
        }

        let mut suppressed: Vec<ScoredKeypoint> = Vec::new();
        let min_distance_sq = min_distance * min_distance;

        for candidate in sorted_keypoints {
            let is_local_max = suppressed.iter().all(|existing| {
                let dx = candidate.x as f32 - existing.x as f32;
                let dy = candidate.y as f32 - existing.y as f32;
                dx * dx + dy * dy >= min_distance_sq
            });

            if is_local_max {
                suppressed.push(candidate);
            }
        }

        suppressed
    }

    /// Keep the `n` strongest keypoints, strongest first
    pub fn retain_best(mut keypoints: Vec<ScoredKeypoint>, n: usize) -> Vec<ScoredKeypoint> {
        keypoints.sort_by(Self::by_response_desc);
        keypoints.truncate(n);
        keypoints
    }

    /// Orientation by intensity centroid over a circular patch of diameter `patch_size`.
    ///
    /// Patch pixels outside the image are ignored.
    pub fn compute_orientation(img: &Image, width: usize, height: usize, x: usize, y: usize, patch_size: usize) -> f32 {
        let half = (patch_size / 2) as i32;
        let radius_sq = half * half;
        let (cx, cy) = (x as i32, y as i32);
        let mut m10 = 0i64;
        let mut m01 = 0i64;

        for dy in -half..=half {
            let yy = cy + dy;
            if yy < 0 || yy >= height as i32 {
                continue;
            }
            for dx in -half..=half {
                if dx * dx + dy * dy > radius_sq {
                    continue;
                }
                let xx = cx + dx;
                if xx < 0 || xx >= width as i32 {
                    continue;
                }
                let val = img[yy as usize * width + xx as usize] as i64;
                m10 += dx as i64 * val;
                m01 += dy as i64 * val;
            }
        }

        if m10 == 0 && m01 == 0 {
            0.0
        } else {
            (m01 as f32).atan2(m10 as f32)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kp(x: usize, y: usize, response: f32) -> ScoredKeypoint {
        ScoredKeypoint { x, y, response }
    }

    #[test]
    fn test_nms_keeps_strongest() {
        let kps = vec![kp(10, 10, 1.0), kp(11, 10, 5.0), kp(30, 30, 2.0)];
        let kept = KeypointRefinement::non_maximum_suppression(&kps, 3.0);
        assert_eq!(kept, vec![kp(11, 10, 5.0), kp(30, 30, 2.0)]);
    }

    #[test]
    fn test_nms_minimum_distance() {
        let kps: Vec<_> = (0..20).map(|i| kp(i, i % 3, i as f32)).collect();
        let kept = KeypointRefinement::non_maximum_suppression(&kps, 5.0);
        for i in 0..kept.len() {
            for j in (i + 1)..kept.len() {
                let dx = kept[i].x as f32 - kept[j].x as f32;
                let dy = kept[i].y as f32 - kept[j].y as f32;
                assert!((dx * dx + dy * dy).sqrt() >= 5.0);
            }
        }
    }

    #[test]
    fn test_nms_empty() {
        assert!(KeypointRefinement::non_maximum_suppression(&[], 3.0).is_empty());
    }

    #[test]
    fn test_retain_best_ties_keep_input_order() {
        let kps = vec![kp(1, 0, 1.0), kp(2, 0, 3.0), kp(3, 0, 1.0), kp(4, 0, 1.0)];
        let best = KeypointRefinement::retain_best(kps, 3);
        assert_eq!(best, vec![kp(2, 0, 3.0), kp(1, 0, 1.0), kp(3, 0, 1.0)]);
    }

    #[test]
    fn test_orientation_points_to_bright_side() {
        let (w, h) = (41, 41);
        // Brightness increases to the right: centroid lies on +x, angle ~ 0
        let img: Image = (0..w * h).map(|i| ((i % w) * 6) as u8).collect();
        let angle = KeypointRefinement::compute_orientation(&img, w, h, 20, 20, 31);
        assert!(angle.abs() < 1e-3, "angle = {}", angle);

        // Brightness increases downwards: angle ~ +pi/2
        let img: Image = (0..w * h).map(|i| ((i / w) * 6) as u8).collect();
        let angle = KeypointRefinement::compute_orientation(&img, w, h, 20, 20, 31);
        assert!((angle - std::f32::consts::FRAC_PI_2).abs() < 1e-3, "angle = {}", angle);
    }

    #[test]
    fn test_orientation_uniform_is_zero() {
        let img = vec![0u8; 31 * 31];
        assert_eq!(KeypointRefinement::compute_orientation(&img, 31, 31, 15, 15, 31), 0.0);
    }
}
