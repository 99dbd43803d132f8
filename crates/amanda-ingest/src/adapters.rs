//! Source-specific adapters
//!
//! Each adapter turns one kind of collaborator output directly into
//! observations, skipping the generic record shape.

use amanda_domain::observation::keys;
use amanda_domain::{AttrValue, Domain, Observation, Payload, ScopeRef, Timestamp};
use tracing::debug;

use crate::config::IngestConfig;
use crate::types::{Touch, TouchLayout};

/// Payload attribute names of a `layout` observation
pub mod layout_keys {
    /// Screen width in pixels
    pub const SCREEN_WIDTH: &str = "screen_width";
    /// Screen height in pixels
    pub const SCREEN_HEIGHT: &str = "screen_height";
    /// Number of buttons
    pub const BUTTON_COUNT: &str = "button_count";
    /// Button width in pixels
    pub const BUTTON_WIDTH: &str = "button_width";
    /// Button height in pixels
    pub const BUTTON_HEIGHT: &str = "button_height";
    /// Gap between buttons in pixels
    pub const SPACING: &str = "spacing_px";
}

/// Payload attribute names of a `source_line` observation
pub mod source_keys {
    /// File the line was read from
    pub const FILE: &str = "file";
    /// 1-based line number
    pub const LINE: &str = "line";
    /// Raw line text
    pub const TEXT: &str = "text";
}

/// Describe a touch-screen layout as one digital observation
pub fn layout_observation(
    scope: &ScopeRef,
    subject_ref: &str,
    timestamp: Timestamp,
    layout: &TouchLayout,
) -> Observation {
    let payload = Payload::new()
        .with(keys::KIND, AttrValue::Text("layout".to_string()))
        .with(keys::SCOPE, AttrValue::Text(scope.to_string()))
        .with(layout_keys::SCREEN_WIDTH, AttrValue::Int(layout.screen_width.into()))
        .with(layout_keys::SCREEN_HEIGHT, AttrValue::Int(layout.screen_height.into()))
        .with(layout_keys::BUTTON_COUNT, AttrValue::Int(layout.button_count.into()))
        .with(layout_keys::BUTTON_WIDTH, AttrValue::Int(layout.button_width.into()))
        .with(layout_keys::BUTTON_HEIGHT, AttrValue::Int(layout.button_height.into()))
        .with(layout_keys::SPACING, AttrValue::Int(layout.spacing_px.into()));

    Observation::new(Domain::Digital, subject_ref, timestamp, payload, scope.as_str())
}

/// Turn raw touches into point-located digital observations
pub fn touch_observations(scope: &ScopeRef, subject_ref: &str, touches: &[Touch]) -> Vec<Observation> {
    touches
        .iter()
        .map(|touch| {
            let payload = Payload::new()
                .with(keys::KIND, AttrValue::Text("touch".to_string()))
                .with(keys::SCOPE, AttrValue::Text(scope.to_string()))
                .with(keys::X, AttrValue::Float(touch.x))
                .with(keys::Y, AttrValue::Float(touch.y))
                .with(keys::EVENT_FIRED, AttrValue::Bool(touch.event_fired));
            Observation::new(
                Domain::Digital,
                subject_ref,
                Timestamp::from_millis(touch.timestamp),
                payload,
                scope.as_str(),
            )
        })
        .collect()
}

/// Split source text into one `source_line` observation per line
///
/// Lines are labelled `file:line` so each becomes its own position within
/// the scope. Blank and over-long lines are skipped per the configuration.
pub fn source_line_observations(
    config: &IngestConfig,
    scope: &ScopeRef,
    file: &str,
    text: &str,
    timestamp: Timestamp,
) -> Vec<Observation> {
    let mut observations = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let line_no = idx + 1;
        if config.skip_blank_lines && line.trim().is_empty() {
            continue;
        }
        if line.chars().count() > config.max_line_length {
            debug!(file, line = line_no, "Skipping over-long source line");
            continue;
        }

        let payload = Payload::new()
            .with(keys::KIND, AttrValue::Text("source_line".to_string()))
            .with(keys::SCOPE, AttrValue::Text(scope.to_string()))
            .with(keys::DESCRIPTOR, AttrValue::Text(format!("{}:{}", file, line_no)))
            .with(source_keys::FILE, AttrValue::Text(file.to_string()))
            .with(source_keys::LINE, AttrValue::Int(line_no as i64))
            .with(source_keys::TEXT, AttrValue::Text(line.to_string()));

        observations.push(Observation::new(Domain::Digital, file, timestamp, payload, file));
    }
    observations
}

#[cfg(test)]
mod tests {
    use super::*;
    use amanda_domain::Locator;

    #[test]
    fn test_layout_observation() {
        let layout = TouchLayout {
            screen_width: 1080,
            screen_height: 1920,
            button_count: 10,
            button_width: 200,
            button_height: 50,
            spacing_px: 100,
        };
        let obs = layout_observation(&ScopeRef::from("screen-1"), "designer", Timestamp::from_millis(0), &layout);

        assert_eq!(obs.payload.kind(), Some("layout"));
        assert_eq!(obs.payload.get_i64(layout_keys::BUTTON_COUNT), Some(10));
        assert_eq!(obs.scope_ref(), ScopeRef::from("screen-1"));
        assert!(obs.payload.locator().is_none());
    }

    #[test]
    fn test_touches_are_points() {
        let touches = [
            Touch { timestamp: 5, x: 1.0, y: 2.0, event_fired: true },
            Touch { timestamp: 9, x: 3.0, y: 4.0, event_fired: false },
        ];
        let obs = touch_observations(&ScopeRef::from("screen-1"), "user-1", &touches);

        assert_eq!(obs.len(), 2);
        assert_eq!(obs[1].timestamp, Timestamp::from_millis(9));
        assert_eq!(obs[1].payload.locator(), Some(Locator::Point { x: 3.0, y: 4.0 }));
        assert_eq!(obs[1].payload.get_bool(keys::EVENT_FIRED), Some(false));
    }

    #[test]
    fn test_source_lines_skip_blank_and_long_lines() {
        let config = IngestConfig {
            max_line_length: 20,
            ..Default::default()
        };
        let text = "def run():\n\n    limit = 100\n    x = 'a very long line that exceeds the limit'\n";
        let obs = source_line_observations(&config, &ScopeRef::from("repo"), "main.py", text, Timestamp::from_millis(0));

        assert_eq!(obs.len(), 2);
        assert_eq!(obs[0].payload.get_str(keys::DESCRIPTOR), Some("main.py:1"));
        assert_eq!(obs[1].payload.get_i64(source_keys::LINE), Some(3));
        assert_eq!(obs[1].payload.get_str(source_keys::TEXT), Some("    limit = 100"));
    }

    #[test]
    fn test_source_lines_keep_blank_when_lenient() {
        let obs = source_line_observations(
            &IngestConfig::lenient(),
            &ScopeRef::from("repo"),
            "a.rs",
            "fn a() {}\n\n",
            Timestamp::from_millis(0),
        );
        assert_eq!(obs.len(), 2);
    }
}
