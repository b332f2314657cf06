// THEORY:
// The region extractor is the spatial grouping layer of the engine. It turns a
// binary mask into a list of `Region`s, each describing one connected component.
//
// Algorithm steps:
// 1.  **Labeling**: Every nonzero mask pixel is foreground. Foreground pixels are
//     grouped with 8-connectivity (diagonal neighbours join the same component),
//     using `imageproc`'s two-pass labeller.
// 2.  **Statistics**: A single raster pass over the label image accumulates the
//     area, bounding box and coordinate sums of each component.
// 3.  **Size Filter**: Components smaller than `min_region_size` are dropped
//     before any moment work is done.
// 4.  **Shape Descriptors**: Aspect ratio, fill ratio and boundary contact come
//     straight from the statistics. Orientation comes from the central moments of
//     the mask restricted to the component's bounding box, so other foreground
//     pixels that happen to fall inside the box take part in the estimate.
// 5.  **Ordering**: The surviving regions are sorted largest first. The
//     extractor is stateless and has no memory of previous frames.

use crate::core_modules::region::{BoundingBox, Point2, Region};

pub mod region_extractor {
    use super::*;
    use image::{GrayImage, Luma};
    use imageproc::region_labelling::{Connectivity, connected_components};
    use std::cmp::Ordering;

    /// Connectivity used to join foreground pixels into components.
    pub const CONNECTIVITY: Connectivity = Connectivity::Eight;

    /// Running statistics for one label.
    #[derive(Debug, Clone, Copy)]
    struct ComponentStats {
        area: u32,
        min_x: u32,
        min_y: u32,
        max_x: u32,
        max_y: u32,
        sum_x: f64,
        sum_y: f64,
    }

    impl Default for ComponentStats {
        fn default() -> Self {
            Self {
                area: 0,
                min_x: u32::MAX,
                min_y: u32::MAX,
                max_x: 0,
                max_y: 0,
                sum_x: 0.0,
                sum_y: 0.0,
            }
        }
    }

    impl ComponentStats {
        fn add(&mut self, x: u32, y: u32) {
            self.area += 1;
            self.min_x = self.min_x.min(x);
            self.min_y = self.min_y.min(y);
            self.max_x = self.max_x.max(x);
            self.max_y = self.max_y.max(y);
            self.sum_x += x as f64;
            self.sum_y += y as f64;
        }

        fn bounding_box(&self) -> BoundingBox {
            BoundingBox::new(
                self.min_x,
                self.min_y,
                self.max_x - self.min_x + 1,
                self.max_y - self.min_y + 1,
            )
        }
    }

    /// Extracts every connected foreground component with at least
    /// `min_region_size` pixels, sorted by area, largest first.
    pub fn extract_regions(mask: &GrayImage, min_region_size: u32) -> Vec<Region> {
        let (image_width, image_height) = mask.dimensions();

        // --- 1. Labeling ---
        // Collapse every nonzero value to one foreground level; the labeller only
        // joins neighbours of equal value.
        let binary = GrayImage::from_fn(image_width, image_height, |x, y| {
            if mask.get_pixel(x, y)[0] != 0 {
                Luma([255])
            } else {
                Luma([0])
            }
        });
        let labels = connected_components(&binary, CONNECTIVITY, Luma([0u8]));

        // --- 2. Statistics ---
        let mut stats: Vec<ComponentStats> = Vec::new();
        for (x, y, label) in labels.enumerate_pixels() {
            let label = label[0];
            if label == 0 {
                continue;
            }
            let index = (label - 1) as usize;
            if index >= stats.len() {
                stats.resize(index + 1, ComponentStats::default());
            }
            stats[index].add(x, y);
        }

        // --- 3 & 4. Size Filter and Shape Descriptors ---
        let mut regions: Vec<Region> = stats
            .iter()
            .filter(|s| s.area > 0 && s.area >= min_region_size)
            .map(|s| describe(&binary, s))
            .collect();

        // --- 5. Ordering ---
        sort_by_area(&mut regions);
        regions
    }

    fn describe(mask: &GrayImage, stats: &ComponentStats) -> Region {
        let (image_width, image_height) = mask.dimensions();
        let bounding_box = stats.bounding_box();
        let area = stats.area;

        let aspect_ratio = if bounding_box.height == 0 {
            f64::INFINITY
        } else {
            bounding_box.width as f64 / bounding_box.height as f64
        };
        let box_area = bounding_box.area();
        let percent_filled = if box_area == 0 {
            0.0
        } else {
            area as f64 / box_area as f64
        };

        Region {
            centroid: Point2::new(stats.sum_x / area as f64, stats.sum_y / area as f64),
            area,
            bounding_box,
            aspect_ratio,
            touches_boundary: bounding_box.touches_edge(image_width, image_height),
            percent_filled,
            least_central_moment_axis: least_central_moment_axis(mask, &bounding_box),
        }
    }

    /// Orientation of the axis of least second central moment of the mask pixels
    /// inside `bounding_box`, in radians.
    ///
    /// Returns `0.0` when the box holds no foreground pixel. For shapes whose
    /// second moments are equal in every direction (a square, a disc) the angle
    /// is undefined and the value carries no meaning.
    pub fn least_central_moment_axis(mask: &GrayImage, bounding_box: &BoundingBox) -> f64 {
        let (image_width, image_height) = mask.dimensions();
        let x_start = bounding_box.x.min(image_width);
        let y_start = bounding_box.y.min(image_height);
        let x_end = bounding_box.x.saturating_add(bounding_box.width).min(image_width);
        let y_end = bounding_box.y.saturating_add(bounding_box.height).min(image_height);

        let mut m00 = 0.0;
        let mut m10 = 0.0;
        let mut m01 = 0.0;
        let mut m20 = 0.0;
        let mut m02 = 0.0;
        let mut m11 = 0.0;

        // Box-local coordinates.
        for y in y_start..y_end {
            for x in x_start..x_end {
                if mask.get_pixel(x, y)[0] == 0 {
                    continue;
                }
                let fx = (x - x_start) as f64;
                let fy = (y - y_start) as f64;
                m00 += 1.0;
                m10 += fx;
                m01 += fy;
                m20 += fx * fx;
                m02 += fy * fy;
                m11 += fx * fy;
            }
        }

        if m00 == 0.0 {
            return 0.0;
        }

        let cx = m10 / m00;
        let cy = m01 / m00;
        let mu20 = m20 / m00 - cx * cx;
        let mu02 = m02 / m00 - cy * cy;
        let mu11 = m11 / m00 - cx * cy;

        0.5 * (2.0 * mu11).atan2(mu20 - mu02)
    }

    /// Sorts regions by area, largest first. Equal areas fall back to the
    /// top-left corner of the bounding box (row, then column).
    pub fn sort_by_area(regions: &mut [Region]) {
        regions.sort_by(|a, b| match b.area.cmp(&a.area) {
            Ordering::Equal => (a.bounding_box.y, a.bounding_box.x)
                .cmp(&(b.bounding_box.y, b.bounding_box.x)),
            other => other,
        });
    }

    /// The regions eligible for annotation and tracking: the first `max_regions`
    /// regions, in order, that do not touch the image boundary.
    pub fn accepted_regions(regions: &[Region], max_regions: usize) -> Vec<&Region> {
        regions
            .iter()
            .filter(|r| !r.touches_boundary)
            .take(max_regions)
            .collect()
    }
}
