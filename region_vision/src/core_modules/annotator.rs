// THEORY:
// The annotator renders the accepted regions of a frame onto a copy of the
// original image: bounding box, centroid marker, orientation axis and a three
// line caption. It only draws; which regions are accepted and what color each
// one wears is decided upstream by the pipeline and the tracker.
//
// Captions use DejaVu Sans Mono, compiled into the library, so every annotator
// can write text. A font file supplied at runtime replaces that face.

use crate::core_modules::region::{ColoredRegion, Region};
use ab_glyph::{FontArc, PxScale};
use image::RgbImage;
use imageproc::drawing::{
    draw_filled_circle_mut, draw_hollow_rect_mut, draw_line_segment_mut, draw_text_mut,
};
use imageproc::rect::Rect;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// DejaVu Sans Mono (Bitstream Vera license, see `assets/`).
const BUNDLED_FONT: &[u8] = include_bytes!("../../assets/DejaVuSansMono.ttf");

const CENTROID_RADIUS: i32 = 4;
const TEXT_SCALE: f32 = 14.0;
/// Vertical gap between the box top and the baseline of the first caption line.
const CAPTION_MARGIN: i32 = 5;
const CAPTION_LINE_SPACING: i32 = 15;

#[derive(Debug, Error)]
pub enum FontError {
    #[error("could not read font file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{0} is not a usable font")]
    Invalid(PathBuf),
}

/// Draws region descriptors onto frames.
pub struct Annotator {
    font: Option<FontArc>,
}

/// Captions in the bundled face.
impl Default for Annotator {
    fn default() -> Self {
        match FontArc::try_from_slice(BUNDLED_FONT) {
            Ok(font) => Self::new(font),
            Err(e) => {
                log::error!("Bundled caption font is unusable, captions disabled: {e}");
                Self { font: None }
            }
        }
    }
}

impl Annotator {
    pub fn new(font: FontArc) -> Self {
        Self { font: Some(font) }
    }

    /// Loads a TrueType or OpenType font to use for captions instead of the
    /// bundled one.
    pub fn from_font_file(path: impl AsRef<Path>) -> Result<Self, FontError> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|source| FontError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let font = FontArc::try_from_vec(data).map_err(|_| FontError::Invalid(path.to_path_buf()))?;
        Ok(Self::new(font))
    }

    /// Returns an annotated copy of `original`. The input is left untouched.
    pub fn annotate(&self, original: &RgbImage, accepted: &[ColoredRegion]) -> RgbImage {
        let mut output = original.clone();
        for colored in accepted {
            self.draw_region(&mut output, colored);
        }
        output
    }

    fn draw_region(&self, canvas: &mut RgbImage, colored: &ColoredRegion) {
        let region = &colored.region;
        let color = colored.color;
        let bbox = region.bounding_box;

        // --- Bounding box, two pixels thick ---
        let (x, y) = (bbox.x as i32, bbox.y as i32);
        draw_hollow_rect_mut(canvas, Rect::at(x, y).of_size(bbox.width, bbox.height), color);
        draw_hollow_rect_mut(
            canvas,
            Rect::at(x - 1, y - 1).of_size(bbox.width + 2, bbox.height + 2),
            color,
        );

        // --- Centroid ---
        let center = (region.centroid.x as i32, region.centroid.y as i32);
        draw_filled_circle_mut(canvas, center, CENTROID_RADIUS, color);

        // --- Caption ---
        if let Some(font) = &self.font {
            for (i, line) in caption_lines(region).iter().enumerate() {
                let baseline = y - CAPTION_MARGIN - CAPTION_LINE_SPACING * i as i32;
                let top = baseline - TEXT_SCALE as i32;
                draw_text_mut(canvas, color, x, top, PxScale::from(TEXT_SCALE), font, line);
            }
        }

        // --- Orientation axis ---
        let (start, end) = axis_segment(region);
        let normal = (
            -region.least_central_moment_axis.sin() as f32,
            region.least_central_moment_axis.cos() as f32,
        );
        draw_line_segment_mut(canvas, start, end, color);
        draw_line_segment_mut(
            canvas,
            (start.0 + normal.0, start.1 + normal.1),
            (end.0 + normal.0, end.1 + normal.1),
            color,
        );
    }
}

/// The three caption lines drawn above a region, top line last:
/// area, aspect ratio to two decimals, and fill as a whole percentage.
pub fn caption_lines(region: &Region) -> [String; 3] {
    [
        format!("Area: {}", region.area),
        format!("AR: {:.2}", region.aspect_ratio),
        format!("Filled: {}%", (region.percent_filled * 100.0) as u32),
    ]
}

/// End points of the orientation segment: centred on the centroid, along the
/// least-moment axis, half the smaller box side long in each direction.
pub fn axis_segment(region: &Region) -> ((f32, f32), (f32, f32)) {
    let bbox = region.bounding_box;
    let length = bbox.width.min(bbox.height) as f64 / 2.0;
    let angle = region.least_central_moment_axis;
    let (dx, dy) = (length * angle.cos(), length * angle.sin());
    let (cx, cy) = (region.centroid.x, region.centroid.y);
    (
        ((cx - dx) as f32, (cy - dy) as f32),
        ((cx + dx) as f32, (cy + dy) as f32),
    )
}
