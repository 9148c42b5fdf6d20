use orb_core::Image;
use crate::types::ScoredKeypoint;
use crate::utils::has_consecutive_bits;
use rayon::prelude::*;

/// Minimum contiguous arc for a FAST-9 corner
const FAST_ARC: usize = 9;

/// Harris detector free parameter
const HARRIS_K: f64 = 0.04;

/// Corner detection algorithms (FAST and Harris)
pub struct CornerDetector;

impl CornerDetector {
    /// FAST circle offsets for corner detection (Bresenham circle, radius 3)
    pub const FAST_OFFSETS: [(i32, i32); 16] = [
        (0, -3), (1, -3), (2, -2), (3, -1),
        (3, 0), (3, 1), (2, 2), (1, 3),
        (0, 3), (-1, 3), (-2, 2), (-3, 1),
        (-3, 0), (-3, -1), (-2, -2), (-1, -3),
    ];

    /// Detect FAST-9 corners on one level and score them with the Harris response.
    ///
    /// Pixels closer than `border` to any edge are not tested; `border` is
    /// raised to 3 if smaller. Output is in raster order.
    pub fn detect_corners(
        img: &Image,
        width: usize,
        height: usize,
        threshold: u8,
        border: usize,
    ) -> Vec<ScoredKeypoint> {
        let border = border.max(3);
        if width <= 2 * border || height <= 2 * border {
            return Vec::new();
        }

        (border..height - border)
            .into_par_iter()
            .flat_map_iter(|y| {
                let mut row = Vec::new();
                for x in border..width - border {
                    if Self::is_fast_corner(img, width, x, y, threshold) {
                        row.push(ScoredKeypoint {
                            x,
                            y,
                            response: Self::compute_harris_response(img, width, height, x, y),
                        });
                    }
                }
                row
            })
            .collect()
    }

    /// Segment test: at least 9 contiguous circle pixels all brighter than
    /// `p + threshold` or all darker than `p - threshold`
    pub fn is_fast_corner(img: &Image, width: usize, x: usize, y: usize, threshold: u8) -> bool {
        let center = img[y * width + x] as i32;
        let t = threshold as i32;
        let pixel = |i: usize| {
            let (dx, dy) = Self::FAST_OFFSETS[i];
            let px = (x as i32 + dx) as usize;
            let py = (y as i32 + dy) as usize;
            img[py * width + px] as i32
        };

        // Any 9-arc covers at least two of the four compass pixels
        let mut bright_compass = 0;
        let mut dark_compass = 0;
        for i in [0, 4, 8, 12] {
            let q = pixel(i);
            if q > center + t {
                bright_compass += 1;
            } else if q < center - t {
                dark_compass += 1;
            }
        }
        if bright_compass < 2 && dark_compass < 2 {
            return false;
        }

        let mut bright: u16 = 0;
        let mut dark: u16 = 0;
        for i in 0..16 {
            let q = pixel(i);
            if q > center + t {
                bright |= 1 << i;
            } else if q < center - t {
                dark |= 1 << i;
            }
        }

        has_consecutive_bits(bright, FAST_ARC) || has_consecutive_bits(dark, FAST_ARC)
    }

    /// Harris corner response `det(M) - k * trace(M)^2` over a 5x5 window
    pub fn compute_harris_response(img: &Image, width: usize, height: usize, x: usize, y: usize) -> f32 {
        if x < 3 || y < 3 || x + 3 >= width || y + 3 >= height {
            return 0.0;
        }

        let mut ixx = 0.0f64;
        let mut ixy = 0.0f64;
        let mut iyy = 0.0f64;

        for dy in -2i32..=2 {
            for dx in -2i32..=2 {
                let nx = (x as i32 + dx) as usize;
                let ny = (y as i32 + dy) as usize;
                let (gx, gy) = Self::compute_gradients(img, width, nx, ny);

                ixx += (gx * gx) as f64;
                ixy += (gx * gy) as f64;
                iyy += (gy * gy) as f64;
            }
        }

        let det = ixx * iyy - ixy * ixy;
        let trace = ixx + iyy;
        (det - HARRIS_K * trace * trace) as f32
    }

    /// Sobel gradients; caller guarantees a 1-pixel margin
    fn compute_gradients(img: &Image, width: usize, x: usize, y: usize) -> (f32, f32) {
        let at = |xx: usize, yy: usize| img[yy * width + xx] as f32;

        // Sobel X kernel: [-1, 0, 1; -2, 0, 2; -1, 0, 1]
        let gx = at(x + 1, y - 1) + 2.0 * at(x + 1, y) + at(x + 1, y + 1)
            - at(x - 1, y - 1) - 2.0 * at(x - 1, y) - at(x - 1, y + 1);

        // Sobel Y kernel: [-1, -2, -1; 0, 0, 0; 1, 2, 1]
        let gy = at(x - 1, y + 1) + 2.0 * at(x, y + 1) + at(x + 1, y + 1)
            - at(x - 1, y - 1) - 2.0 * at(x, y - 1) - at(x + 1, y - 1);

        (gx / 8.0, gy / 8.0)
    }
}
