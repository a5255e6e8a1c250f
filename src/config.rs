//! Layout constants for the story card.
//!
//! Every offset, size and color used by the layout engine lives here so the
//! card can be re-tuned without touching the layout algorithm. All values are
//! in design units of the plan's canvas; the rasterizer maps them onto pixels.
//! JSON overrides may be partial, missing fields keep their defaults.

use crate::error::{CardError, Result};
use crate::utils::{Rgba, Size};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub canvas: CanvasSize,
    pub headline: HeadlineConfig,
    pub typography: Typography,
    pub glow: GlowConfig,
    pub card: CardConfig,
    pub dots: DotConfig,
    pub theme: Theme,
    pub empty_cards: EmptyCardsPolicy,
    /// Integer multiplier applied to the canvas for the download asset.
    pub export_scale: u32,
    pub export_file_name: String,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            canvas: CanvasSize::default(),
            headline: HeadlineConfig::default(),
            typography: Typography::default(),
            glow: GlowConfig::default(),
            card: CardConfig::default(),
            dots: DotConfig::default(),
            theme: Theme::default(),
            empty_cards: EmptyCardsPolicy::Omit,
            export_scale: 4,
            export_file_name: "meterboxd-stats.png".to_string(),
        }
    }
}

impl LayoutConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: LayoutConfig =
            serde_json::from_str(json).map_err(|e| CardError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| CardError::Config(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        let fail = |msg: &str| Err(CardError::Config(msg.to_string()));
        if self.canvas.width == 0 || self.canvas.height == 0 {
            return fail("canvas must have a non-zero area");
        }
        if self.export_scale == 0 {
            return fail("export_scale must be at least 1");
        }
        if self.export_file_name.trim().is_empty() {
            return fail("export_file_name must not be empty");
        }
        let tiers = &self.card.title_tiers;
        if tiers.large_max_chars >= tiers.medium_max_chars {
            return fail("title tier limits must be strictly increasing");
        }
        if self.card.max_title_lines == 0 {
            return fail("cards need at least one title line");
        }
        if self.card.width <= 2.0 * self.card.padding {
            return fail("card padding leaves no room for the title");
        }
        if self.dots.min_count > self.dots.max_count {
            return fail("dots.min_count exceeds dots.max_count");
        }
        if self.theme.background.is_empty() {
            return fail("background gradient needs at least one stop");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

impl Default for CanvasSize {
    // 9:16 story format
    fn default() -> Self {
        Self {
            width: 500,
            height: 888,
        }
    }
}

impl CanvasSize {
    pub fn size(&self) -> Size {
        Size::new(self.width as f32, self.height as f32)
    }
}

/// Baselines of the headline block, measured from the top of the canvas
/// unless the name says otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadlineConfig {
    pub brand_y: f32,
    pub lead_y: f32,
    pub magnitude_y: f32,
    pub emphasis_y: f32,
    pub subordinate_y: f32,
    pub tagline_y: f32,
    pub section_header_y: f32,
    /// Gap between the section header baseline and the top edge of the cards.
    pub cards_gap: f32,
    pub footer_lead_from_bottom: f32,
    pub footer_brand_from_bottom: f32,
}

impl Default for HeadlineConfig {
    fn default() -> Self {
        Self {
            brand_y: 80.0,
            lead_y: 160.0,
            magnitude_y: 280.0,
            emphasis_y: 340.0,
            subordinate_y: 380.0,
            tagline_y: 450.0,
            section_header_y: 530.0,
            cards_gap: 60.0,
            footer_lead_from_bottom: 60.0,
            footer_brand_from_bottom: 30.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Typography {
    pub brand: f32,
    pub lead: f32,
    pub magnitude: f32,
    pub emphasis: f32,
    pub subordinate: f32,
    pub tagline: f32,
    pub section_header: f32,
    pub footer: f32,
    pub card_rating: f32,
    pub card_label: f32,
    pub card_details: f32,
}

impl Default for Typography {
    fn default() -> Self {
        Self {
            brand: 40.0,
            lead: 26.0,
            magnitude: 120.0,
            emphasis: 36.0,
            subordinate: 28.0,
            tagline: 24.0,
            section_header: 24.0,
            footer: 20.0,
            card_rating: 28.0,
            card_label: 16.0,
            card_details: 14.0,
        }
    }
}

/// Blur radii of the glow effects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlowConfig {
    pub brand: f32,
    pub magnitude: f32,
    pub card_rating: f32,
}

impl Default for GlowConfig {
    fn default() -> Self {
        Self {
            brand: 10.0,
            magnitude: 25.0,
            card_rating: 12.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CardConfig {
    pub width: f32,
    pub height: f32,
    pub corner_radius: f32,
    pub border_width: f32,
    /// Horizontal padding on each side of the title block.
    pub padding: f32,
    /// Distance of each card's centre from the canvas centre when two cards are shown.
    pub pair_offset: f32,
    pub max_title_lines: usize,
    pub title_tiers: TitleTiers,
    /// Added to the font size to get the title line height.
    pub line_gap: f32,
    /// Rating readout baseline, below the card's vertical middle.
    pub rating_below_middle: f32,
    pub label_from_bottom: f32,
    pub details_from_bottom: f32,
    pub ellipsis: String,
}

impl Default for CardConfig {
    fn default() -> Self {
        Self {
            width: 200.0,
            height: 180.0,
            corner_radius: 12.0,
            border_width: 2.0,
            padding: 10.0,
            pair_offset: 110.0,
            max_title_lines: 3,
            title_tiers: TitleTiers::default(),
            line_gap: 2.0,
            rating_below_middle: 10.0,
            label_from_bottom: 45.0,
            details_from_bottom: 20.0,
            ellipsis: "...".to_string(),
        }
    }
}

impl CardConfig {
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Width available to a title line.
    pub fn title_budget(&self) -> f32 {
        self.width - 2.0 * self.padding
    }
}

/// Title font sizes chosen by character count of the raw title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TitleTiers {
    pub large_max_chars: usize,
    pub medium_max_chars: usize,
    pub large: f32,
    pub medium: f32,
    pub small: f32,
}

impl Default for TitleTiers {
    fn default() -> Self {
        Self {
            large_max_chars: 20,
            medium_max_chars: 35,
            large: 20.0,
            medium: 18.0,
            small: 16.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DotConfig {
    pub min_count: u32,
    pub max_count: u32,
    pub max_radius: f32,
}

impl Default for DotConfig {
    fn default() -> Self {
        Self {
            min_count: 40,
            max_count: 60,
            max_radius: 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorStop {
    pub offset: f32,
    pub color: Rgba,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Theme {
    pub background: Vec<ColorStop>,
    pub dot: Rgba,
    pub accent: Rgba,
    pub brand_glow: Rgba,
    pub text: Rgba,
    pub positive: Rgba,
    pub negative: Rgba,
    pub card_fill_start: Rgba,
    pub card_fill_end: Rgba,
    pub card_border: Rgba,
    pub card_label: Rgba,
    pub card_details: Rgba,
    pub footer: Rgba,
}

impl Default for Theme {
    fn default() -> Self {
        let accent = Rgba::rgb(0x40, 0xba, 0xf4);
        Self {
            background: vec![
                ColorStop {
                    offset: 0.0,
                    color: Rgba::rgb(0x1f, 0x25, 0x2c),
                },
                ColorStop {
                    offset: 0.5,
                    color: Rgba::rgb(0x14, 0x19, 0x1d),
                },
                ColorStop {
                    offset: 1.0,
                    color: Rgba::rgb(0x0f, 0x14, 0x19),
                },
            ],
            dot: accent.with_opacity(0.05),
            accent,
            brand_glow: accent.with_opacity(0.3),
            text: Rgba::WHITE,
            positive: Rgba::rgb(0x28, 0xa7, 0x45),
            negative: Rgba::rgb(0xfd, 0x7e, 0x14),
            card_fill_start: Rgba::rgb(0x2c, 0x3e, 0x50).with_opacity(0.9),
            card_fill_end: Rgba::rgb(0x34, 0x49, 0x5e).with_opacity(0.7),
            card_border: accent.with_opacity(0.3),
            card_label: Rgba::rgb(0xad, 0xb5, 0xbd),
            card_details: Rgba::rgb(0xe0, 0xe0, 0xe0),
            footer: Rgba::rgb(0x6c, 0x75, 0x7d),
        }
    }
}

/// What the layout engine does when neither movie list has an entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyCardsPolicy {
    /// Drop the card section (header included) and render the rest.
    #[default]
    Omit,
    /// Fail with `InvalidSnapshot`.
    Reject,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_override_keeps_defaults() {
        let config = LayoutConfig::from_json_str(
            r##"{ "card": { "height": 200.0 }, "theme": { "positive": "#00ff00" }, "empty_cards": "reject" }"##,
        )
        .unwrap();
        assert_eq!(config.card.height, 200.0);
        assert_eq!(config.card.width, 200.0);
        assert_eq!(config.theme.positive, Rgba::rgb(0, 0xff, 0));
        assert_eq!(config.theme.negative, Theme::default().negative);
        assert_eq!(config.empty_cards, EmptyCardsPolicy::Reject);
        assert_eq!(config.export_scale, 4);
    }

    #[test]
    fn rejects_inconsistent_tiers() {
        let err = LayoutConfig::from_json_str(
            r#"{ "card": { "title_tiers": { "large_max_chars": 40 } } }"#,
        )
        .unwrap_err();
        assert!(matches!(err, CardError::Config(_)));
    }

    #[test]
    fn rejects_zero_canvas() {
        let err = LayoutConfig::from_json_str(r#"{ "canvas": { "width": 0 } }"#).unwrap_err();
        assert!(matches!(err, CardError::Config(_)));
    }
}
