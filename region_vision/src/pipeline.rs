// THEORY:
// The `pipeline` module runs the full per-frame stack: preprocessing, region
// extraction, acceptance, color assignment and annotation. It owns the tracker,
// which is the only state carried from one frame to the next.
//
// A frame is handled in two calls. `analyze` produces everything the caller needs
// to show the frame and decide whether to label it, without touching tracker
// state. `commit` then hands the frame's accepted regions to the tracker. The
// split leaves room for the caller's labeling decision between the two.

use crate::core_modules::annotator::Annotator;
use crate::core_modules::preprocess::{self, Binarization};
use crate::core_modules::region::{ColoredRegion, Region};
use crate::core_modules::region_extractor::region_extractor;
use crate::core_modules::tracker::RegionTracker;
use image::{DynamicImage, GrayImage, RgbImage};

/// Configuration for the RegionPipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Components with fewer pixels are discarded.
    pub min_region_size: u32,
    /// At most this many non-boundary regions are drawn and tracked per frame.
    pub max_regions: usize,
    pub binarization: Binarization,
    /// Gaussian blur applied before thresholding. `None` disables it.
    pub blur_sigma: Option<f32>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_region_size: 50,
            max_regions: 10,
            binarization: Binarization::default(),
            // Equivalent of a 5x5 kernel with automatic sigma.
            blur_sigma: Some(1.1),
        }
    }
}

/// Everything produced for one frame.
#[derive(Debug, Clone)]
pub struct FrameAnalysis {
    /// Every region that passed the size filter, largest first.
    pub regions: Vec<Region>,
    /// The drawn subset of `regions`, with the colors the tracker assigned.
    pub accepted: Vec<ColoredRegion>,
    /// The binary mask the regions were extracted from.
    pub mask: GrayImage,
    pub annotated: RgbImage,
}

pub struct RegionPipeline {
    config: PipelineConfig,
    annotator: Annotator,
    tracker: RegionTracker,
}

impl RegionPipeline {
    pub fn new(config: PipelineConfig, annotator: Annotator) -> Self {
        Self {
            config,
            annotator,
            tracker: RegionTracker::new(),
        }
    }

    pub fn tracker(&self) -> &RegionTracker {
        &self.tracker
    }

    /// Builds the binary mask for a decoded frame.
    pub fn mask(&self, frame: &DynamicImage) -> GrayImage {
        let gray = preprocess::to_gray(frame);
        let gray = match self.config.blur_sigma {
            Some(sigma) => preprocess::blur(&gray, sigma),
            None => gray,
        };
        let thresholded = preprocess::binarize(&gray, &self.config.binarization);
        preprocess::clean(&thresholded)
    }

    /// Processes one frame. Tracker state is read but not updated; call
    /// `commit` once the frame is done.
    pub fn analyze(&mut self, frame: &DynamicImage) -> FrameAnalysis {
        let mask = self.mask(frame);
        self.analyze_mask(&frame.to_rgb8(), mask)
    }

    /// Runs extraction, tracking and annotation on an already binarized mask.
    pub fn analyze_mask(&mut self, original: &RgbImage, mask: GrayImage) -> FrameAnalysis {
        let regions = region_extractor::extract_regions(&mask, self.config.min_region_size);
        let accepted = self.tracker.assign_colors(region_extractor::accepted_regions(
            &regions,
            self.config.max_regions,
        ));

        log::debug!(
            "{} regions extracted, {} accepted",
            regions.len(),
            accepted.len()
        );
        for colored in &accepted {
            let r = &colored.region;
            log::debug!(
                "region area={} centroid=({:.1}, {:.1}) ar={:.2} filled={:.2} axis={:.3} color={:?}",
                r.area,
                r.centroid.x,
                r.centroid.y,
                r.aspect_ratio,
                r.percent_filled,
                r.least_central_moment_axis,
                colored.color.0
            );
        }

        let annotated = self.annotator.annotate(original, &accepted);
        FrameAnalysis {
            regions,
            accepted,
            mask,
            annotated,
        }
    }

    /// Makes this frame's accepted regions the reference for the next frame.
    pub fn commit(&mut self, analysis: &FrameAnalysis) {
        self.tracker.commit(analysis.accepted.clone());
    }
}
