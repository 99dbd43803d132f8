//! Spatial and logical descriptors of positions within a scope

use std::fmt;

/// Axis-aligned rectangle in scope coordinates (pixels, meters, ...)
///
/// Bounds are inclusive on every side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    /// Left edge
    pub x0: f64,
    /// Top edge
    pub y0: f64,
    /// Right edge
    pub x1: f64,
    /// Bottom edge
    pub y1: f64,
}

impl Region {
    /// Create a region, normalizing the corner order
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        }
    }

    /// Check if the region contains a point
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x0 && x <= self.x1 && y >= self.y0 && y <= self.y1
    }

    /// Euclidean distance from a point to the region (0 inside)
    pub fn distance_to(&self, x: f64, y: f64) -> f64 {
        let dx = (self.x0 - x).max(0.0).max(x - self.x1);
        let dy = (self.y0 - y).max(0.0).max(y - self.y1);
        (dx * dx + dy * dy).sqrt()
    }

    /// Check if two regions overlap or share an edge, within `tolerance`
    pub fn touches(&self, other: &Region, tolerance: f64) -> bool {
        self.x0 <= other.x1 + tolerance
            && other.x0 <= self.x1 + tolerance
            && self.y0 <= other.y1 + tolerance
            && other.y0 <= self.y1 + tolerance
    }

    /// Smallest region covering both
    pub fn union(&self, other: &Region) -> Region {
        Region {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }
}

/// The spatial or logical position a constraint element describes
///
/// `key` names the node in the scope's structural graph. `region` is set for
/// spatial domains (screens, rooms). `links` lists keys this position leads
/// to directly (routing entries, statute references).
#[derive(Debug, Clone, PartialEq)]
pub struct Descriptor {
    /// Node key, unique within a scope
    pub key: String,

    /// Spatial extent, if the position is spatial
    pub region: Option<Region>,

    /// Keys of positions directly reachable from this one
    pub links: Vec<String>,
}

impl Descriptor {
    /// Purely logical descriptor
    pub fn logical(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            region: None,
            links: Vec::new(),
        }
    }

    /// Spatial descriptor
    pub fn spatial(key: impl Into<String>, region: Region) -> Self {
        Self {
            key: key.into(),
            region: Some(region),
            links: Vec::new(),
        }
    }

    /// Builder-style link
    pub fn linked_to(mut self, key: impl Into<String>) -> Self {
        self.links.push(key.into());
        self
    }

    /// Fold another descriptor for the same key into this one
    ///
    /// Regions are unioned and links merged, so the result does not depend on
    /// the order elements were seen in.
    pub fn merge(&mut self, other: &Descriptor) {
        self.region = match (self.region, other.region) {
            (Some(a), Some(b)) => Some(a.union(&b)),
            (a, b) => a.or(b),
        };
        for link in &other.links {
            if !self.links.contains(link) {
                self.links.push(link.clone());
            }
        }
        self.links.sort();
    }
}

/// Where an observation points inside a scope
#[derive(Debug, Clone, PartialEq)]
pub enum Locator {
    /// A named position (node key)
    Label(String),
    /// A point in scope coordinates
    Point {
        /// Horizontal coordinate
        x: f64,
        /// Vertical coordinate
        y: f64,
    },
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Label(label) => write!(f, "{}", label),
            Locator::Point { x, y } => write!(f, "({}, {})", x, y),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_normalizes_corners() {
        let r = Region::new(10.0, 20.0, 0.0, 5.0);
        assert_eq!(r, Region::new(0.0, 5.0, 10.0, 20.0));
    }

    #[test]
    fn test_region_distance() {
        let r = Region::new(0.0, 0.0, 10.0, 10.0);
        assert_eq!(r.distance_to(5.0, 5.0), 0.0);
        assert_eq!(r.distance_to(13.0, 14.0), 5.0);
        assert_eq!(r.distance_to(-2.0, 5.0), 2.0);
    }

    #[test]
    fn test_region_touching() {
        let a = Region::new(0.0, 0.0, 10.0, 10.0);
        let b = Region::new(10.0, 0.0, 20.0, 10.0);
        let c = Region::new(10.5, 0.0, 20.0, 10.0);
        assert!(a.touches(&b, 0.0));
        assert!(!a.touches(&c, 0.0));
        assert!(a.touches(&c, 1.0));
    }

    #[test]
    fn test_descriptor_merge_is_order_independent() {
        let a = Descriptor::spatial("room", Region::new(0.0, 0.0, 1.0, 1.0)).linked_to("hall");
        let b = Descriptor::spatial("room", Region::new(2.0, 2.0, 3.0, 3.0)).linked_to("door");

        let mut ab = a.clone();
        ab.merge(&b);
        let mut ba = b.clone();
        ba.merge(&a);

        assert_eq!(ab, ba);
        assert_eq!(ab.region, Some(Region::new(0.0, 0.0, 3.0, 3.0)));
        assert_eq!(ab.links, vec!["door".to_string(), "hall".to_string()]);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: a point is at distance zero exactly when the region contains it
        #[test]
        fn test_distance_zero_iff_contained(
            x0 in -100.0f64..100.0, y0 in -100.0f64..100.0,
            w in 0.0f64..50.0, h in 0.0f64..50.0,
            px in -200.0f64..200.0, py in -200.0f64..200.0,
        ) {
            let region = Region::new(x0, y0, x0 + w, y0 + h);
            prop_assert_eq!(region.distance_to(px, py) == 0.0, region.contains(px, py));
        }

        /// Property: touching is symmetric
        #[test]
        fn test_touching_symmetric(
            ax in -50.0f64..50.0, ay in -50.0f64..50.0,
            bx in -50.0f64..50.0, by in -50.0f64..50.0,
            size in 0.0f64..20.0, tolerance in 0.0f64..2.0,
        ) {
            let a = Region::new(ax, ay, ax + size, ay + size);
            let b = Region::new(bx, by, bx + size, by + size);
            prop_assert_eq!(a.touches(&b, tolerance), b.touches(&a, tolerance));
        }
    }
}
