// THEORY:
// A `Region` is the snapshot of one connected foreground component in one frame.
// It is a "dumb" data container in the same sense as a blob: it knows its own
// geometry and shape descriptors, but nothing about other frames.
//
// Key architectural principles:
// 1.  **Pure Value**: Every field is computed once by the extractor and never
//     changes afterwards. The descriptor carries no display state.
// 2.  **Color Lives Beside the Region**: The visual identity assigned by the
//     tracker is attached through `ColoredRegion`, a separate pairing, so the
//     descriptor itself stays comparable and reusable as a feature vector.

use image::Rgb;

/// The visual identity of a region across frames.
pub type RegionColor = Rgb<u8>;

/// A floating-point 2D coordinate in image pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance(&self, other: &Point2) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// An axis-aligned rectangle tightly enclosing a component, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// True if the box abuts any edge of an image of the given size.
    pub fn touches_edge(&self, image_width: u32, image_height: u32) -> bool {
        self.x == 0
            || self.y == 0
            || self.x + self.width >= image_width
            || self.y + self.height >= image_height
    }
}

/// One connected foreground component and its shape descriptors.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    /// First-moment center of the component's pixels.
    pub centroid: Point2,
    /// Number of pixels in the component.
    pub area: u32,
    pub bounding_box: BoundingBox,
    /// `width / height` of the bounding box.
    pub aspect_ratio: f64,
    /// Whether the bounding box touches any image edge.
    pub touches_boundary: bool,
    /// `area / (width * height)`. Not clamped.
    pub percent_filled: f64,
    /// Orientation, in radians, of the axis of least second central moment.
    pub least_central_moment_axis: f64,
}

/// A region paired with the color the tracker assigned to it for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ColoredRegion {
    pub region: Region,
    pub color: RegionColor,
}

impl ColoredRegion {
    pub fn new(region: Region, color: RegionColor) -> Self {
        Self { region, color }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_is_euclidean() {
        let a = Point2::new(0.0, 0.0);
        let b = Point2::new(3.0, 4.0);
        assert_eq!(a.distance(&b), 5.0);
        assert_eq!(b.distance(&a), 5.0);
    }

    #[test]
    fn box_touching_each_edge() {
        let (w, h) = (100, 80);
        assert!(BoundingBox::new(0, 10, 5, 5).touches_edge(w, h));
        assert!(BoundingBox::new(10, 0, 5, 5).touches_edge(w, h));
        assert!(BoundingBox::new(95, 10, 5, 5).touches_edge(w, h));
        assert!(BoundingBox::new(10, 75, 5, 5).touches_edge(w, h));
        assert!(!BoundingBox::new(1, 1, 98, 78).touches_edge(w, h));
    }
}
