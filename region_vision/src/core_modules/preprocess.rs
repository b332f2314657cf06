// THEORY:
// Preprocessing turns a decoded color frame into a clean binary mask: grayscale,
// optional blur, thresholding, then a morphological close/open to remove
// speckle and fill pinholes. Every step is a pure function of its input and
// the output mask only ever holds 0 (background) or 255 (foreground).

use image::{DynamicImage, GrayImage, Luma};
use imageproc::contrast::otsu_level;
use imageproc::distance_transform::Norm;
use imageproc::filter::{box_filter, gaussian_blur_f32};
use imageproc::morphology::{close, open};

const FOREGROUND: Luma<u8> = Luma([255]);
const BACKGROUND: Luma<u8> = Luma([0]);

/// How a grayscale frame is split into foreground and background.
#[derive(Debug, Clone, PartialEq)]
pub enum Binarization {
    /// Pixels brighter than `level` are foreground; reversed when `invert` is set.
    Fixed { level: u8, invert: bool },
    /// Like `Fixed`, with the level chosen by Otsu's method for each frame.
    Otsu { invert: bool },
    /// Pixels at or below their local mean minus `offset` are foreground.
    /// The mean is taken over a `(2 * block_radius + 1)` square window.
    Adaptive { block_radius: u32, offset: i16 },
}

impl Default for Binarization {
    fn default() -> Self {
        Binarization::Adaptive {
            block_radius: 5,
            offset: 2,
        }
    }
}

pub fn to_gray(frame: &DynamicImage) -> GrayImage {
    frame.to_luma8()
}

pub fn blur(gray: &GrayImage, sigma: f32) -> GrayImage {
    gaussian_blur_f32(gray, sigma)
}

pub fn binarize(gray: &GrayImage, method: &Binarization) -> GrayImage {
    match *method {
        Binarization::Fixed { level, invert } => threshold(gray, level, invert),
        Binarization::Otsu { invert } => threshold(gray, otsu_level(gray), invert),
        Binarization::Adaptive {
            block_radius,
            offset,
        } => {
            let means = box_filter(gray, block_radius, block_radius);
            GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
                let value = gray.get_pixel(x, y)[0] as i16;
                let mean = means.get_pixel(x, y)[0] as i16;
                if value <= mean - offset {
                    FOREGROUND
                } else {
                    BACKGROUND
                }
            })
        }
    }
}

/// Closes then opens the mask with a 3x3 square, filling one-pixel gaps and
/// removing one-pixel specks.
pub fn clean(mask: &GrayImage) -> GrayImage {
    let closed = close(mask, Norm::LInf, 1);
    open(&closed, Norm::LInf, 1)
}

fn threshold(gray: &GrayImage, level: u8, invert: bool) -> GrayImage {
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        if (gray.get_pixel(x, y)[0] > level) != invert {
            FOREGROUND
        } else {
            BACKGROUND
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dark_square_on_white() -> GrayImage {
        GrayImage::from_fn(40, 40, |x, y| {
            if (10..30).contains(&x) && (10..30).contains(&y) {
                Luma([20])
            } else {
                Luma([230])
            }
        })
    }

    fn count_foreground(mask: &GrayImage) -> usize {
        mask.pixels().filter(|p| p[0] != 0).count()
    }

    #[test]
    fn fixed_threshold_and_inversion() {
        let gray = dark_square_on_white();
        let bright = binarize(&gray, &Binarization::Fixed { level: 128, invert: false });
        let dark = binarize(&gray, &Binarization::Fixed { level: 128, invert: true });
        assert_eq!(count_foreground(&bright), 40 * 40 - 400);
        assert_eq!(count_foreground(&dark), 400);
        assert_eq!(dark.get_pixel(15, 15)[0], 255);
        assert_eq!(dark.get_pixel(5, 5)[0], 0);
    }

    #[test]
    fn otsu_separates_two_levels() {
        let gray = dark_square_on_white();
        let mask = binarize(&gray, &Binarization::Otsu { invert: true });
        assert_eq!(count_foreground(&mask), 400);
    }

    #[test]
    fn adaptive_marks_dark_side_of_edges() {
        let gray = dark_square_on_white();
        let mask = binarize(&gray, &Binarization::default());
        // Just inside the edge the local mean is pulled up by the white surround.
        assert_eq!(mask.get_pixel(10, 20)[0], 255);
        // Deep inside and far outside the window sees a flat level.
        assert_eq!(mask.get_pixel(20, 20)[0], 0);
        assert_eq!(mask.get_pixel(2, 2)[0], 0);
    }

    #[test]
    fn adaptive_level_itself_is_foreground() {
        // Centre mean over the 3x3 window: rows give 96, then (100 + 96 + 100) / 3 = 98.
        let mut gray = GrayImage::from_pixel(3, 3, Luma([100]));
        gray.put_pixel(1, 1, Luma([90]));
        let at_level = binarize(
            &gray,
            &Binarization::Adaptive {
                block_radius: 1,
                offset: 8,
            },
        );
        assert_eq!(at_level.get_pixel(1, 1)[0], 255);
        let past_level = binarize(
            &gray,
            &Binarization::Adaptive {
                block_radius: 1,
                offset: 9,
            },
        );
        assert_eq!(past_level.get_pixel(1, 1)[0], 0);

        // A flat frame sits exactly on its own mean.
        let flat = GrayImage::from_pixel(7, 7, Luma([100]));
        let zero_offset = Binarization::Adaptive {
            block_radius: 2,
            offset: 0,
        };
        assert_eq!(count_foreground(&binarize(&flat, &zero_offset)), 49);
        assert_eq!(count_foreground(&binarize(&flat, &Binarization::default())), 0);
    }

    #[test]
    fn clean_removes_specks_and_keeps_blocks() {
        let mut mask = GrayImage::new(40, 40);
        for y in 10..30 {
            for x in 10..30 {
                mask.put_pixel(x, y, FOREGROUND);
            }
        }
        mask.put_pixel(3, 3, FOREGROUND);
        // Pinhole inside the block.
        mask.put_pixel(20, 20, BACKGROUND);

        let cleaned = clean(&mask);
        assert_eq!(cleaned.get_pixel(3, 3)[0], 0);
        assert_eq!(cleaned.get_pixel(20, 20)[0], 255);
        assert_eq!(count_foreground(&cleaned), 400);
        assert!(cleaned.pixels().all(|p| p[0] == 0 || p[0] == 255));
    }
}
