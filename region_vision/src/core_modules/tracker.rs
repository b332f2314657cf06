// THEORY:
// The `tracker` module gives the engine its only notion of memory. It does not
// follow objects; it keeps the previous frame's accepted regions and lets a
// region in the current frame inherit the color of the nearest of them.
//
// Key architectural principles:
// 1.  **One-Frame Lookback**: The snapshot holds exactly one frame. There is no
//     motion model, no occlusion handling and no identifier beyond the color.
// 2.  **Snapshot Isolation**: Matching only ever reads the snapshot committed at
//     the end of the previous frame. Regions colored earlier in the current
//     frame are invisible until `commit` swaps the whole snapshot.
// 3.  **Greedy Matching**: Each region picks its nearest previous centroid within
//     `MAX_CENTROID_DISTANCE`, independently of the others. Two current regions
//     may therefore inherit the same color.
// 4.  **Reproducible Colors**: New colors come from a per-tracker ChaCha stream
//     seeded with a fixed constant, so identical frame sequences always produce
//     identical colors, and separate trackers never share state.

use crate::core_modules::region::{ColoredRegion, Region, RegionColor};
use image::Rgb;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Max distance (in pixels) between centroids for a region to inherit a color.
pub const MAX_CENTROID_DISTANCE: f64 = 50.0;
/// Seed of the color stream of a tracker built with `RegionTracker::new`.
pub const DEFAULT_COLOR_SEED: u64 = 12345;

/// Assigns persistent visual identities to regions across consecutive frames.
pub struct RegionTracker {
    /// Accepted regions of the previous frame, with the colors they were drawn in.
    previous_regions: Vec<ColoredRegion>,
    rng: ChaCha8Rng,
}

impl Default for RegionTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl RegionTracker {
    pub fn new() -> Self {
        Self::with_seed(DEFAULT_COLOR_SEED)
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            previous_regions: Vec::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Returns the color of the nearest previous region within
    /// `MAX_CENTROID_DISTANCE`, or a freshly generated color.
    ///
    /// On equal distances the region stored first wins.
    pub fn assign_color(&mut self, region: &Region) -> RegionColor {
        match self.nearest_previous(region) {
            Some(previous) => previous.color,
            None => self.generate_color(),
        }
    }

    /// Colors every region in order against the previous snapshot.
    pub fn assign_colors<'a, I>(&mut self, regions: I) -> Vec<ColoredRegion>
    where
        I: IntoIterator<Item = &'a Region>,
    {
        regions
            .into_iter()
            .map(|region| {
                let color = self.assign_color(region);
                ColoredRegion::new(region.clone(), color)
            })
            .collect()
    }

    /// Replaces the previous-frame snapshot. Called once per frame, after every
    /// color of that frame has been assigned.
    pub fn commit(&mut self, accepted: Vec<ColoredRegion>) {
        self.previous_regions = accepted;
    }

    pub fn previous_regions(&self) -> &[ColoredRegion] {
        &self.previous_regions
    }

    fn nearest_previous(&self, region: &Region) -> Option<&ColoredRegion> {
        let mut best_match_dist = MAX_CENTROID_DISTANCE;
        let mut best_match: Option<&ColoredRegion> = None;

        for previous in &self.previous_regions {
            let dist = region.centroid.distance(&previous.region.centroid);
            if dist < best_match_dist {
                best_match_dist = dist;
                best_match = Some(previous);
            }
        }

        best_match
    }

    fn generate_color(&mut self) -> RegionColor {
        Rgb([self.rng.random(), self.rng.random(), self.rng.random()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::region::{BoundingBox, Point2};

    fn region_at(x: f64, y: f64) -> Region {
        Region {
            centroid: Point2::new(x, y),
            area: 100,
            bounding_box: BoundingBox::new(x as u32 - 5, y as u32 - 5, 10, 10),
            aspect_ratio: 1.0,
            touches_boundary: false,
            percent_filled: 1.0,
            least_central_moment_axis: 0.0,
        }
    }

    #[test]
    fn nearby_region_keeps_its_color() {
        let mut tracker = RegionTracker::new();
        let first = tracker.assign_colors([&region_at(100.0, 100.0)]);
        tracker.commit(first.clone());

        let moved = region_at(120.0, 110.0);
        assert_eq!(tracker.assign_color(&moved), first[0].color);
    }

    #[test]
    fn distant_region_gets_a_new_color() {
        let mut tracker = RegionTracker::new();
        let first = tracker.assign_colors([&region_at(100.0, 100.0)]);
        tracker.commit(first.clone());

        // Exactly at the threshold is not a match.
        let far = region_at(150.0, 100.0);
        let mut expected = RegionTracker::new();
        expected.generate_color();
        assert_eq!(tracker.assign_color(&far), expected.generate_color());
    }

    #[test]
    fn nearest_previous_wins() {
        let mut tracker = RegionTracker::new();
        let previous = tracker.assign_colors([&region_at(100.0, 100.0), &region_at(130.0, 100.0)]);
        tracker.commit(previous.clone());

        assert_eq!(tracker.assign_color(&region_at(125.0, 100.0)), previous[1].color);
        assert_eq!(tracker.assign_color(&region_at(105.0, 100.0)), previous[0].color);
        // Equidistant: first stored wins.
        assert_eq!(tracker.assign_color(&region_at(115.0, 100.0)), previous[0].color);
    }

    #[test]
    fn duplicate_matches_are_allowed() {
        let mut tracker = RegionTracker::new();
        let previous = tracker.assign_colors([&region_at(100.0, 100.0)]);
        tracker.commit(previous.clone());

        let current = tracker.assign_colors([&region_at(90.0, 100.0), &region_at(110.0, 100.0)]);
        assert_eq!(current[0].color, previous[0].color);
        assert_eq!(current[1].color, previous[0].color);
    }

    #[test]
    fn matching_ignores_the_current_frame() {
        let mut tracker = RegionTracker::new();
        let current = tracker.assign_colors([&region_at(100.0, 100.0), &region_at(101.0, 100.0)]);
        // With no snapshot, both regions draw new colors even though they are close.
        assert!(tracker.previous_regions().is_empty());
        let mut reference = RegionTracker::new();
        assert_eq!(current[0].color, reference.generate_color());
        assert_eq!(current[1].color, reference.generate_color());
    }

    #[test]
    fn commit_replaces_the_snapshot() {
        let mut tracker = RegionTracker::new();
        let a = tracker.assign_colors([&region_at(100.0, 100.0)]);
        tracker.commit(a.clone());
        tracker.commit(Vec::new());
        assert!(tracker.previous_regions().is_empty());

        let b = tracker.assign_colors([&region_at(100.0, 100.0)]);
        let mut reference = RegionTracker::new();
        reference.generate_color();
        assert_eq!(b[0].color, reference.generate_color());
    }

    #[test]
    fn identical_sequences_give_identical_colors() {
        let frames = vec![
            vec![region_at(100.0, 100.0), region_at(300.0, 100.0)],
            vec![region_at(110.0, 100.0), region_at(500.0, 200.0)],
            vec![region_at(120.0, 105.0), region_at(505.0, 200.0), region_at(50.0, 50.0)],
        ];

        let run = |tracker: &mut RegionTracker| {
            let mut colors = Vec::new();
            for frame in &frames {
                let colored = tracker.assign_colors(frame);
                colors.extend(colored.iter().map(|c| c.color));
                tracker.commit(colored);
            }
            colors
        };

        let first = run(&mut RegionTracker::new());
        let second = run(&mut RegionTracker::new());
        assert_eq!(first, second);
        // The first region is followed through all three frames.
        assert_eq!(first[0], first[2]);
        assert_eq!(first[0], first[4]);
    }

    #[test]
    fn trackers_do_not_share_a_stream() {
        let mut a = RegionTracker::new();
        let mut b = RegionTracker::new();
        let ca = a.assign_color(&region_at(100.0, 100.0));
        a.assign_color(&region_at(200.0, 100.0));
        let cb = b.assign_color(&region_at(100.0, 100.0));
        assert_eq!(ca, cb);
    }
}
