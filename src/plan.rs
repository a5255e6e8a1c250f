//! Resolution-independent description of a story card.
//!
//! A [`RenderPlan`] holds draw commands in design units of a fixed canvas. It
//! is built once per snapshot, never mutated, and can be rasterized at any
//! scale that keeps the canvas aspect ratio.

use crate::config::ColorStop;
use crate::text::FontSpec;
use crate::utils::{Position, Rectangle, Rgba, Size};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// The user rates higher than the public average.
    More,
    /// The user rates lower than, or exactly at, the public average.
    Less,
}

impl Direction {
    pub fn from_difference(diff: f64) -> Self {
        if diff > 0.0 {
            Direction::More
        } else {
            Direction::Less
        }
    }

    pub fn word(&self) -> &'static str {
        match self {
            Direction::More => "more",
            Direction::Less => "less",
        }
    }
}

/// Five-bucket critic classification of the average rating difference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tagline {
    Perfectionist,
    ToughCritic,
    SpotOn,
    Generous,
    ExtremeGenerous,
}

impl Tagline {
    /// `<= -1.0` perfectionist, `(-1.0, -0.2)` tough critic, `|d| <= 0.2`
    /// spot-on, `(0.2, 1.0)` generous, `>= 1.0` extreme generous.
    pub fn classify(diff: f64) -> Self {
        if diff <= -1.0 {
            Tagline::Perfectionist
        } else if diff < -0.2 {
            Tagline::ToughCritic
        } else if diff.abs() <= 0.2 {
            Tagline::SpotOn
        } else if diff < 1.0 {
            Tagline::Generous
        } else {
            Tagline::ExtremeGenerous
        }
    }

    pub fn text(&self) -> &'static str {
        match self {
            Tagline::Perfectionist => "perfectionist alert!",
            Tagline::ToughCritic => "wow! tough critic!",
            Tagline::SpotOn => "almost spot-on with the rest of us!",
            Tagline::Generous => "generosity level: high",
            Tagline::ExtremeGenerous => "Your favorite movie was whatever you saw last, wasn't it?",
        }
    }
}

/// Values derived from the average rating difference.
#[derive(Debug, Clone, PartialEq)]
pub struct Headline {
    pub direction: Direction,
    /// Unsigned magnitude with one decimal place.
    pub magnitude: String,
    pub color: Rgba,
    pub tagline: Tagline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardKind {
    /// From the overrated list: the user rated it lower than the public.
    Overrated,
    /// From the underrated list: the user rated it higher than the public.
    Underrated,
}

impl CardKind {
    pub fn label(&self) -> &'static str {
        match self {
            CardKind::Overrated => "You rated lower",
            CardKind::Underrated => "You rated higher",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleTier {
    Large,
    Medium,
    Small,
}

/// A laid-out headline movie card.
#[derive(Debug, Clone, PartialEq)]
pub struct MovieCard {
    pub kind: CardKind,
    pub bounds: Rectangle,
    pub tier: TitleTier,
    pub title_font: FontSpec,
    /// At most `max_title_lines` lines; the last ends in the ellipsis when truncated.
    pub title_lines: Vec<String>,
    pub truncated: bool,
    pub rating_text: String,
    pub rating_color: Rgba,
    pub details_text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Glow {
    pub color: Rgba,
    pub blur: f32,
}

/// A single centre-aligned line of text.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    /// Horizontal centre of the run and its baseline.
    pub anchor: Position,
    pub font: FontSpec,
    pub color: Rgba,
    pub glow: Option<Glow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoundedRect {
    pub rect: Rectangle,
    pub radius: f32,
    /// Linear gradient from the top-left to the bottom-right corner.
    pub fill: [Rgba; 2],
    pub stroke: Option<(Rgba, f32)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    /// Vertical gradient over the whole canvas.
    Background(Vec<ColorStop>),
    /// Cosmetic dots; positions come from the rasterizer's seeded stream.
    DotTexture {
        min_count: u32,
        max_count: u32,
        max_radius: f32,
        color: Rgba,
    },
    Text(TextRun),
    RoundedRect(RoundedRect),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderPlan {
    pub canvas: Size,
    pub headline: Headline,
    /// Empty when the snapshot has no movies; one centred card or a left/right pair otherwise.
    pub cards: Vec<MovieCard>,
    /// Back-to-front draw order.
    pub commands: Vec<DrawCommand>,
}

impl RenderPlan {
    pub fn canvas_width(&self) -> u32 {
        self.canvas.width.round() as u32
    }

    pub fn canvas_height(&self) -> u32 {
        self.canvas.height.round() as u32
    }

    pub fn text_runs(&self) -> impl Iterator<Item = &TextRun> {
        self.commands.iter().filter_map(|c| match c {
            DrawCommand::Text(run) => Some(run),
            _ => None,
        })
    }

    pub fn find_text(&self, text: &str) -> Option<&TextRun> {
        self.text_runs().find(|run| run.text == text)
    }
}
