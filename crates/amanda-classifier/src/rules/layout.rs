//! Touch-screen layouts

use amanda_domain::traits::{ClassificationRule, RuleMatch};
use amanda_domain::{Descriptor, Domain, ElementKind, Observation, Region};
use tracing::debug;

/// Button count accepted when none is configured
pub const DEFAULT_MAX_LAYOUT_BUTTONS: u32 = 256;

/// Splits a `layout` record into buttons and the gaps between them
///
/// Buttons form a column centered on the screen both ways:
/// `button_1..button_N` are Agency, `gap_1..gap_{N-1}` are Constraint.
/// Layouts with more than `max_buttons` buttons yield nothing.
#[derive(Debug, Clone, Copy)]
pub struct TouchLayoutRule {
    max_buttons: u32,
}

impl Default for TouchLayoutRule {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LAYOUT_BUTTONS)
    }
}

impl TouchLayoutRule {
    /// Create a rule accepting at most `max_buttons` buttons per layout
    pub fn new(max_buttons: u32) -> Self {
        Self { max_buttons }
    }

    /// Regions of every button and gap, top to bottom
    pub fn regions(
        screen_width: f64,
        screen_height: f64,
        button_count: u32,
        button_width: f64,
        button_height: f64,
        spacing: f64,
    ) -> Vec<(String, ElementKind, Region)> {
        let n = f64::from(button_count);
        let total_height = button_height * n + spacing * (n - 1.0).max(0.0);
        let start_y = (screen_height - total_height) / 2.0;
        let left = (screen_width - button_width) / 2.0;
        let right = left + button_width;

        let mut regions = Vec::new();
        for i in 0..button_count {
            let top = start_y + f64::from(i) * (button_height + spacing);
            let bottom = top + button_height;
            regions.push((
                format!("button_{}", i + 1),
                ElementKind::Agency,
                Region::new(left, top, right, bottom),
            ));
            if i + 1 < button_count {
                regions.push((
                    format!("gap_{}", i + 1),
                    ElementKind::Constraint,
                    Region::new(left, bottom, right, bottom + spacing),
                ));
            }
        }
        regions
    }
}

impl ClassificationRule for TouchLayoutRule {
    fn name(&self) -> &str {
        "layout.touch"
    }

    fn domain(&self) -> Domain {
        Domain::Digital
    }

    fn apply(&self, observation: &Observation) -> Vec<RuleMatch> {
        let payload = &observation.payload;
        if payload.kind() != Some("layout") {
            return Vec::new();
        }

        let dims = (
            payload.get_f64("screen_width"),
            payload.get_f64("screen_height"),
            payload.get_i64("button_count"),
            payload.get_f64("button_width"),
            payload.get_f64("button_height"),
            payload.get_f64("spacing_px"),
        );
        let (Some(width), Some(height), Some(count), Some(bw), Some(bh), Some(spacing)) = dims else {
            debug!(observation = %observation.id, "Layout record missing dimensions");
            return Vec::new();
        };
        let count = match u32::try_from(count) {
            Ok(count) if count <= self.max_buttons => count,
            _ => {
                debug!(
                    observation = %observation.id,
                    count,
                    max = self.max_buttons,
                    "Layout button count out of range"
                );
                return Vec::new();
            }
        };
        if bw <= 0.0 || bh <= 0.0 || spacing < 0.0 {
            debug!(observation = %observation.id, "Layout dimensions must be positive");
            return Vec::new();
        }

        let scope = observation.scope_ref();
        Self::regions(width, height, count, bw, bh, spacing)
            .into_iter()
            .map(|(key, kind, region)| RuleMatch {
                kind,
                scope_ref: scope.clone(),
                specificity: key.len(),
                descriptor: Descriptor::spatial(key, region),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use amanda_domain::observation::keys;
    use amanda_domain::{AttrValue, Payload, Timestamp};

    fn layout(count: i64) -> Observation {
        let payload = Payload::new()
            .with(keys::KIND, AttrValue::Text("layout".into()))
            .with("screen_width", AttrValue::Int(500))
            .with("screen_height", AttrValue::Int(800))
            .with("button_count", AttrValue::Int(count))
            .with("button_width", AttrValue::Int(200))
            .with("button_height", AttrValue::Int(50))
            .with("spacing_px", AttrValue::Int(100));
        Observation::new(Domain::Digital, "designer", Timestamp::from_millis(0), payload, "screen-1")
    }

    #[test]
    fn test_ten_buttons_nine_gaps() {
        let matches = TouchLayoutRule::default().apply(&layout(10));
        let buttons = matches.iter().filter(|m| m.kind == ElementKind::Agency).count();
        let gaps = matches.iter().filter(|m| m.kind == ElementKind::Constraint).count();
        assert_eq!((buttons, gaps), (10, 9));
    }

    #[test]
    fn test_column_is_centered() {
        let regions = TouchLayoutRule::regions(500.0, 800.0, 10, 200.0, 50.0, 100.0);
        let (key, _, first) = &regions[0];
        assert_eq!(key, "button_1");
        // 10 * 50 + 9 * 100 = 1400 tall, so the column starts 300 above the screen
        assert_eq!((first.x0, first.y0, first.x1, first.y1), (150.0, -300.0, 350.0, -250.0));

        let (key, kind, gap) = &regions[1];
        assert_eq!(key, "gap_1");
        assert_eq!(*kind, ElementKind::Constraint);
        assert_eq!((gap.y0, gap.y1), (-250.0, -150.0));

        let (_, _, second) = &regions[2];
        assert_eq!(second.y0, -150.0);
    }

    #[test]
    fn test_single_button_has_no_gap() {
        let matches = TouchLayoutRule::default().apply(&layout(1));
        assert_eq!(matches.len(), 1);
    }

    #[test]
    fn test_bad_layout_yields_nothing() {
        assert!(TouchLayoutRule::default().apply(&layout(-2)).is_empty());

        let mut missing = layout(3);
        missing.payload = Payload::new().with(keys::KIND, AttrValue::Text("layout".into()));
        assert!(TouchLayoutRule::default().apply(&missing).is_empty());
    }

    #[test]
    fn test_oversized_layout_yields_nothing() {
        assert!(TouchLayoutRule::default().apply(&layout(100_000)).is_empty());
        assert!(TouchLayoutRule::default().apply(&layout(i64::from(u32::MAX))).is_empty());

        let small = TouchLayoutRule::new(4);
        assert!(small.apply(&layout(5)).is_empty());
        assert_eq!(small.apply(&layout(4)).len(), 7);
    }
}
