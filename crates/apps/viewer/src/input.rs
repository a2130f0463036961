use serde::{Deserialize, Serialize};

/// Pointer input in canvas pixels, origin top-left.
///
/// Events arrive already normalized: a mouse drag, a touch drag and a scripted
/// replay all produce the same sequence.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PointerEvent {
    PanStart { x: f64, y: f64 },
    PanMove { x: f64, y: f64 },
    PanEnd,
    /// Wheel input; positive `delta_y` zooms out.
    Zoom { x: f64, y: f64, delta_y: f64 },
    Resize { width: f64, height: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn events_parse_from_tagged_json() {
        let script = r#"[
            {"type": "pan_start", "x": 10, "y": 20},
            {"type": "pan_move", "x": 12.5, "y": 20},
            {"type": "pan_end"},
            {"type": "zoom", "x": 256, "y": 256, "delta_y": -100},
            {"type": "resize", "width": 800, "height": 600}
        ]"#;
        let events: Vec<PointerEvent> = serde_json::from_str(script).unwrap();
        assert_eq!(
            events,
            vec![
                PointerEvent::PanStart { x: 10.0, y: 20.0 },
                PointerEvent::PanMove { x: 12.5, y: 20.0 },
                PointerEvent::PanEnd,
                PointerEvent::Zoom {
                    x: 256.0,
                    y: 256.0,
                    delta_y: -100.0
                },
                PointerEvent::Resize {
                    width: 800.0,
                    height: 600.0
                },
            ]
        );
    }
}
