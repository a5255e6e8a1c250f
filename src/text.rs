//! Text measurement and glyph coverage.
//!
//! Layout only needs widths, so it depends on [`TextMeasure`]. The rasterizer
//! also needs glyph shapes and uses [`TextPainter`]. Two implementations:
//! [`FontLibrary`] backed by rusttype faces and [`FixedAdvance`], a
//! deterministic measurer with block glyphs used in tests and as a fallback
//! when no system font can be found.

use crate::error::{CardError, Result};
use crate::utils::Position;
use rusttype::{point, Font, Scale};
use tiny_skia::Mask;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontWeight {
    Regular,
    Bold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontStyle {
    Normal,
    Italic,
}

/// Font request. `size` is in design units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontSpec {
    pub size: f32,
    pub weight: FontWeight,
    pub style: FontStyle,
}

impl FontSpec {
    pub fn regular(size: f32) -> Self {
        Self {
            size,
            weight: FontWeight::Regular,
            style: FontStyle::Normal,
        }
    }

    pub fn bold(size: f32) -> Self {
        Self {
            weight: FontWeight::Bold,
            ..Self::regular(size)
        }
    }

    pub fn italic(self) -> Self {
        Self {
            style: FontStyle::Italic,
            ..self
        }
    }
}

pub trait TextMeasure {
    /// Advance width of `text` in design units. Empty text measures 0.
    fn measure(&self, text: &str, font: &FontSpec) -> f32;
}

pub trait TextPainter: TextMeasure + Send + Sync {
    /// Accumulates glyph coverage for `text` into `mask`. `origin` is the left
    /// end of the baseline in pixels, `scale` maps design units to pixels.
    fn paint_coverage(
        &self,
        text: &str,
        font: &FontSpec,
        origin: Position,
        scale: f32,
        mask: &mut Mask,
    );
}

// Coverage only ever grows so overlapping strikes don't double-darken.
fn accumulate(mask: &mut Mask, x: i32, y: i32, coverage: f32) {
    let (w, h) = (mask.width() as i32, mask.height() as i32);
    if x < 0 || y < 0 || x >= w || y >= h {
        return;
    }
    let idx = (y * w + x) as usize;
    let v = (coverage.clamp(0.0, 1.0) * 255.0).round() as u8;
    let data = mask.data_mut();
    data[idx] = data[idx].max(v);
}

/// Every character advances by a fixed fraction of the font size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedAdvance {
    pub regular_ratio: f32,
    pub bold_ratio: f32,
}

impl Default for FixedAdvance {
    fn default() -> Self {
        Self {
            regular_ratio: 0.5,
            bold_ratio: 0.55,
        }
    }
}

impl FixedAdvance {
    pub fn uniform(ratio: f32) -> Self {
        Self {
            regular_ratio: ratio,
            bold_ratio: ratio,
        }
    }

    pub fn advance(&self, font: &FontSpec) -> f32 {
        let ratio = match font.weight {
            FontWeight::Regular => self.regular_ratio,
            FontWeight::Bold => self.bold_ratio,
        };
        font.size * ratio
    }
}

impl TextMeasure for FixedAdvance {
    fn measure(&self, text: &str, font: &FontSpec) -> f32 {
        text.chars().count() as f32 * self.advance(font)
    }
}

impl TextPainter for FixedAdvance {
    fn paint_coverage(
        &self,
        text: &str,
        font: &FontSpec,
        origin: Position,
        scale: f32,
        mask: &mut Mask,
    ) {
        let advance = self.advance(font) * scale;
        let top = (origin.y - font.size * 0.7 * scale).floor() as i32;
        let bottom = origin.y.ceil() as i32;
        for (i, c) in text.chars().enumerate() {
            if c.is_whitespace() {
                continue;
            }
            let left = origin.x + i as f32 * advance + advance * 0.1;
            let right = left + advance * 0.8;
            for y in top..bottom {
                for x in left.floor() as i32..right.ceil() as i32 {
                    accumulate(mask, x, y, 1.0);
                }
            }
        }
    }
}

// Horizontal shift per pixel of height above the baseline for synthetic italics.
const ITALIC_SHEAR: f32 = 0.2;
// Extra stroke offset for synthetic bold, as a fraction of the pixel size.
const EMBOLDEN: f32 = 0.04;

/// rusttype faces for the card. Missing bold or italic faces are synthesised
/// from the regular face.
pub struct FontLibrary {
    regular: Font<'static>,
    bold: Option<Font<'static>>,
    italic: Option<Font<'static>>,
}

struct FaceChoice<'a> {
    font: &'a Font<'static>,
    embolden: bool,
    shear: bool,
}

impl FontLibrary {
    pub fn from_bytes(regular: Vec<u8>) -> Result<Self> {
        Ok(Self {
            regular: parse_font(regular, 0)?,
            bold: None,
            italic: None,
        })
    }

    pub fn with_bold(mut self, bytes: Vec<u8>) -> Result<Self> {
        self.bold = Some(parse_font(bytes, 0)?);
        Ok(self)
    }

    pub fn with_italic(mut self, bytes: Vec<u8>) -> Result<Self> {
        self.italic = Some(parse_font(bytes, 0)?);
        Ok(self)
    }

    /// Looks up sans-serif faces among the installed system fonts.
    #[cfg(feature = "system-fonts")]
    pub fn from_system() -> Result<Self> {
        use resvg::usvg::fontdb::{Database, Family, Query, Stretch, Style, Weight};

        let mut db = Database::new();
        db.load_system_fonts();
        log::debug!("font database holds {} faces", db.len());

        let families = [
            Family::Name("DejaVu Sans"),
            Family::Name("Liberation Sans"),
            Family::Name("Helvetica"),
            Family::Name("Arial"),
            Family::SansSerif,
        ];
        let load = |weight: Weight, style: Style| -> Option<Font<'static>> {
            let id = db.query(&Query {
                families: &families,
                weight,
                stretch: Stretch::Normal,
                style,
            })?;
            db.with_face_data(id, |data, index| {
                Font::try_from_vec_and_index(data.to_vec(), index)
            })
            .flatten()
        };

        let regular = load(Weight::NORMAL, Style::Normal)
            .or_else(|| {
                let id = db.faces().next()?.id;
                db.with_face_data(id, |data, index| {
                    Font::try_from_vec_and_index(data.to_vec(), index)
                })
                .flatten()
            })
            .ok_or_else(|| CardError::Font("no usable system font face".to_string()))?;

        Ok(Self {
            regular,
            bold: load(Weight::BOLD, Style::Normal),
            italic: load(Weight::NORMAL, Style::Italic),
        })
    }

    fn choose(&self, font: &FontSpec) -> FaceChoice<'_> {
        let wants_bold = font.weight == FontWeight::Bold;
        let wants_italic = font.style == FontStyle::Italic;
        match (wants_bold, wants_italic) {
            (true, _) => FaceChoice {
                font: self.bold.as_ref().unwrap_or(&self.regular),
                embolden: self.bold.is_none(),
                shear: wants_italic,
            },
            (false, true) => FaceChoice {
                font: self.italic.as_ref().unwrap_or(&self.regular),
                embolden: false,
                shear: self.italic.is_none(),
            },
            (false, false) => FaceChoice {
                font: &self.regular,
                embolden: false,
                shear: false,
            },
        }
    }
}

fn parse_font(bytes: Vec<u8>, index: u32) -> Result<Font<'static>> {
    Font::try_from_vec_and_index(bytes, index)
        .ok_or_else(|| CardError::Font("font data could not be parsed".to_string()))
}

impl TextMeasure for FontLibrary {
    fn measure(&self, text: &str, font: &FontSpec) -> f32 {
        if text.is_empty() {
            return 0.0;
        }
        let choice = self.choose(font);
        let width = choice
            .font
            .layout(text, Scale::uniform(font.size), point(0.0, 0.0))
            .last()
            .map(|g| g.position().x + g.unpositioned().h_metrics().advance_width)
            .unwrap_or(0.0);
        if choice.embolden {
            width + font.size * EMBOLDEN
        } else {
            width
        }
    }
}

impl TextPainter for FontLibrary {
    fn paint_coverage(
        &self,
        text: &str,
        font: &FontSpec,
        origin: Position,
        scale: f32,
        mask: &mut Mask,
    ) {
        let choice = self.choose(font);
        let px_size = font.size * scale;
        let shear = if choice.shear { ITALIC_SHEAR } else { 0.0 };
        let strikes: &[f32] = if choice.embolden {
            &[0.0, 1.0]
        } else {
            &[0.0]
        };
        let offset = (px_size * EMBOLDEN).max(1.0);

        for glyph in choice
            .font
            .layout(text, Scale::uniform(px_size), point(origin.x, origin.y))
        {
            let Some(bb) = glyph.pixel_bounding_box() else {
                continue;
            };
            for strike in strikes {
                glyph.draw(|x, y, v| {
                    let py = bb.min.y + y as i32;
                    let lift = origin.y - py as f32;
                    let px = bb.min.x as f32 + x as f32 + strike * offset + lift * shear;
                    accumulate(mask, px.round() as i32, py, v);
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_advance_measures_per_char() {
        let m = FixedAdvance::default();
        assert_eq!(m.measure("", &FontSpec::bold(20.0)), 0.0);
        assert!((m.measure("abcd", &FontSpec::regular(20.0)) - 40.0).abs() < 1e-4);
        assert!((m.measure("abcd", &FontSpec::bold(20.0)) - 44.0).abs() < 1e-4);
        // italics don't change the advance
        assert_eq!(
            m.measure("abcd", &FontSpec::regular(20.0).italic()),
            m.measure("abcd", &FontSpec::regular(20.0))
        );
    }

    #[test]
    fn block_glyphs_skip_whitespace() {
        let m = FixedAdvance::uniform(0.5);
        let mut mask = Mask::new(40, 20).unwrap();
        m.paint_coverage("a b", &FontSpec::regular(10.0), Position::new(0.0, 15.0), 1.0, &mut mask);
        let covered = |x: usize, y: usize| mask.data()[y * 40 + x] > 0;
        assert!(covered(2, 12));
        assert!(!covered(7, 12)); // the space
        assert!(covered(12, 12));
        assert!(!covered(2, 2)); // above the cap height
    }

    #[test]
    fn coverage_outside_mask_is_ignored() {
        let m = FixedAdvance::uniform(0.5);
        let mut mask = Mask::new(4, 4).unwrap();
        m.paint_coverage("wide text", &FontSpec::regular(40.0), Position::new(-10.0, 30.0), 1.0, &mut mask);
        // the first block is clipped to the mask's top-left corner
        assert_eq!(mask.data()[3 * 4], 255);
    }
}
