use std::collections::BTreeMap;

/// RGBA bytes per source layer name. Only listed layers are fetched and drawn.
pub type LayerColors = BTreeMap<String, [u8; 4]>;

/// Debug tile outlines are drawn in opaque red.
pub const OUTLINE_COLOR: [f32; 4] = [1.0, 0.0, 0.0, 1.0];

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LayerStyle {
    pub color: [f32; 4],
}

impl LayerStyle {
    pub const fn new(color: [f32; 4]) -> Self {
        Self { color }
    }

    pub fn from_rgba(rgba: [u8; 4]) -> Self {
        Self::new(rgba.map(|c| f32::from(c) / 255.0))
    }
}

impl Default for LayerStyle {
    fn default() -> Self {
        Self {
            color: [1.0, 1.0, 1.0, 1.0],
        }
    }
}

pub fn style_for(colors: &LayerColors, layer: &str) -> Option<LayerStyle> {
    colors.get(layer).copied().map(LayerStyle::from_rgba)
}

/// The stock palette: water areas only.
pub fn default_layer_colors() -> LayerColors {
    let mut colors = LayerColors::new();
    colors.insert("waterarea".to_string(), [190, 210, 255, 255]);
    colors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgba_bytes_normalize_to_unit_range() {
        let style = LayerStyle::from_rgba([255, 0, 51, 255]);
        assert_eq!(style.color, [1.0, 0.0, 0.2, 1.0]);
    }

    #[test]
    fn unknown_layers_have_no_style() {
        let colors = default_layer_colors();
        assert!(style_for(&colors, "waterarea").is_some());
        assert!(style_for(&colors, "building").is_none());
    }
}
