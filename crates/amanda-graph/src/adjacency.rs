//! Built-in adjacency functions

use amanda_domain::traits::Adjacency;
use amanda_domain::Descriptor;

/// Explicit links, or touching regions
///
/// Links are directed (a routing entry from `a` to `b` does not route back);
/// touching regions are adjacent in both directions.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardAdjacency {
    /// Gap still treated as touching
    pub tolerance: f64,
}

impl StandardAdjacency {
    /// Create with the given region tolerance
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }
}

impl Adjacency for StandardAdjacency {
    fn adjacent(&self, from: &Descriptor, to: &Descriptor) -> bool {
        if LinkAdjacency.adjacent(from, to) {
            return true;
        }
        match (&from.region, &to.region) {
            (Some(a), Some(b)) => a.touches(b, self.tolerance),
            _ => false,
        }
    }
}

/// Explicit links only
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkAdjacency;

impl Adjacency for LinkAdjacency {
    fn adjacent(&self, from: &Descriptor, to: &Descriptor) -> bool {
        from.links.iter().any(|link| link == &to.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use amanda_domain::Region;

    #[test]
    fn test_links_are_directed() {
        let a = Descriptor::logical("a").linked_to("b");
        let b = Descriptor::logical("b");
        assert!(LinkAdjacency.adjacent(&a, &b));
        assert!(!LinkAdjacency.adjacent(&b, &a));
    }

    #[test]
    fn test_touching_regions_are_adjacent() {
        let adjacency = StandardAdjacency::new(0.0);
        let top = Descriptor::spatial("button_1", Region::new(0.0, 0.0, 10.0, 10.0));
        let gap = Descriptor::spatial("gap_1", Region::new(0.0, 10.0, 10.0, 20.0));
        let far = Descriptor::spatial("button_2", Region::new(0.0, 30.0, 10.0, 40.0));

        assert!(adjacency.adjacent(&top, &gap));
        assert!(adjacency.adjacent(&gap, &top));
        assert!(!adjacency.adjacent(&top, &far));
    }

    #[test]
    fn test_regionless_descriptors_need_links() {
        let adjacency = StandardAdjacency::new(100.0);
        let a = Descriptor::logical("a");
        let b = Descriptor::spatial("b", Region::new(0.0, 0.0, 1.0, 1.0));
        assert!(!adjacency.adjacent(&a, &b));
    }
}
