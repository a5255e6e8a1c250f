use crate::config::{CardConfig, EmptyCardsPolicy, LayoutConfig, TitleTiers};
use crate::error::{CardError, Result};
use crate::plan::{
    CardKind, Direction, DrawCommand, Glow, Headline, MovieCard, RenderPlan, RoundedRect, Tagline,
    TextRun, TitleTier,
};
use crate::snapshot::{MovieRating, StatsSnapshot};
use crate::text::{FontSpec, TextMeasure};
use crate::utils::{Position, Rectangle, Rgba};
use log::{debug, warn};

/// Horizontal slot of a movie card on the canvas.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CardSlot {
    Left,
    Center,
    Right,
}

impl CardSlot {
    fn center_x(self, canvas_width: f32, pair_offset: f32) -> f32 {
        let mid = canvas_width / 2.0;
        match self {
            CardSlot::Left => mid - pair_offset,
            CardSlot::Center => mid,
            CardSlot::Right => mid + pair_offset,
        }
    }
}

/// Turns a snapshot into a [`RenderPlan`] without touching a drawing surface.
pub struct LayoutEngine<'a, M: TextMeasure + ?Sized> {
    config: &'a LayoutConfig,
    measure: &'a M,
}

impl<'a, M: TextMeasure + ?Sized> LayoutEngine<'a, M> {
    pub fn new(config: &'a LayoutConfig, measure: &'a M) -> Self {
        Self { config, measure }
    }

    pub fn layout(&self, snapshot: &StatsSnapshot) -> Result<RenderPlan> {
        let cfg = self.config;
        let canvas = cfg.canvas.size();
        let theme = &cfg.theme;
        let type_sizes = &cfg.typography;
        let mid = canvas.width / 2.0;
        let headline = headline(snapshot.average(), cfg);
        self.check_ellipsis_fits()?;

        let selected: Vec<(CardKind, &MovieRating)> = [
            snapshot
                .headline_overrated()
                .map(|m| (CardKind::Overrated, m)),
            snapshot
                .headline_underrated()
                .map(|m| (CardKind::Underrated, m)),
        ]
        .into_iter()
        .flatten()
        .collect();

        if !snapshot.has_movies() {
            match cfg.empty_cards {
                EmptyCardsPolicy::Reject => {
                    return Err(CardError::InvalidSnapshot(
                        "both movie lists are empty".to_string(),
                    ))
                }
                EmptyCardsPolicy::Omit => warn!("snapshot has no movies, omitting card section"),
            }
        }

        let slots: &[CardSlot] = match selected.len() {
            2 => &[CardSlot::Left, CardSlot::Right],
            _ => &[CardSlot::Center],
        };
        let cards_top = cfg.headline.section_header_y + cfg.headline.cards_gap;
        let cards: Vec<MovieCard> = selected
            .iter()
            .zip(slots)
            .map(|((kind, movie), slot)| {
                let center_x = slot.center_x(canvas.width, cfg.card.pair_offset);
                self.layout_card(movie, *kind, center_x, cards_top)
            })
            .collect();

        let run = |text: String, y: f32, font: FontSpec, color: Rgba| TextRun {
            text,
            anchor: Position::new(mid, y),
            font,
            color,
            glow: None,
        };

        let mut commands = vec![
            DrawCommand::Background(theme.background.clone()),
            DrawCommand::DotTexture {
                min_count: cfg.dots.min_count,
                max_count: cfg.dots.max_count,
                max_radius: cfg.dots.max_radius,
                color: theme.dot,
            },
            DrawCommand::Text(TextRun {
                glow: Some(Glow {
                    color: theme.brand_glow,
                    blur: cfg.glow.brand,
                }),
                ..run(
                    "Meterboxd".to_string(),
                    cfg.headline.brand_y,
                    FontSpec::bold(type_sizes.brand),
                    theme.accent,
                )
            }),
            DrawCommand::Text(run(
                "On average, you give movies".to_string(),
                cfg.headline.lead_y,
                FontSpec::regular(type_sizes.lead),
                theme.text,
            )),
            DrawCommand::Text(TextRun {
                glow: Some(Glow {
                    color: headline.color,
                    blur: cfg.glow.magnitude,
                }),
                ..run(
                    headline.magnitude.clone(),
                    cfg.headline.magnitude_y,
                    FontSpec::bold(type_sizes.magnitude),
                    headline.color,
                )
            }),
            DrawCommand::Text(run(
                format!("{} STARS", headline.direction.word().to_uppercase()),
                cfg.headline.emphasis_y,
                FontSpec::bold(type_sizes.emphasis),
                headline.color,
            )),
            DrawCommand::Text(run(
                "than other users".to_string(),
                cfg.headline.subordinate_y,
                FontSpec::regular(type_sizes.subordinate),
                theme.text,
            )),
            DrawCommand::Text(run(
                headline.tagline.text().to_string(),
                cfg.headline.tagline_y,
                FontSpec::regular(type_sizes.tagline).italic(),
                theme.accent,
            )),
        ];

        if !cards.is_empty() {
            commands.push(DrawCommand::Text(run(
                "Your Most Extreme Ratings:".to_string(),
                cfg.headline.section_header_y,
                FontSpec::bold(type_sizes.section_header),
                theme.text,
            )));
            for card in &cards {
                self.card_commands(card, &mut commands);
            }
        }

        commands.push(DrawCommand::Text(run(
            "Share your movie stats at".to_string(),
            canvas.height - cfg.headline.footer_lead_from_bottom,
            FontSpec::regular(type_sizes.footer),
            theme.footer,
        )));
        commands.push(DrawCommand::Text(run(
            "meterboxd.com".to_string(),
            canvas.height - cfg.headline.footer_brand_from_bottom,
            FontSpec::bold(type_sizes.footer),
            theme.accent,
        )));

        debug!(
            "laid out card: {} STARS {} ({:?}), {} movie card(s), {} commands",
            headline.direction.word(),
            headline.magnitude,
            headline.tagline,
            cards.len(),
            commands.len()
        );

        Ok(RenderPlan {
            canvas,
            headline,
            cards,
            commands,
        })
    }

    // A truncated title line always ends in the ellipsis, so the ellipsis
    // alone must fit the title width at every tier.
    fn check_ellipsis_fits(&self) -> Result<()> {
        let card = &self.config.card;
        let tiers = &card.title_tiers;
        let budget = card.title_budget();
        for size in [tiers.large, tiers.medium, tiers.small] {
            let width = self.measure.measure(&card.ellipsis, &FontSpec::bold(size));
            if width > budget {
                return Err(CardError::Config(format!(
                    "ellipsis `{}` is {width:.1} wide at size {size}, title width is only {budget:.1}",
                    card.ellipsis
                )));
            }
        }
        Ok(())
    }

    fn layout_card(
        &self,
        movie: &MovieRating,
        kind: CardKind,
        center_x: f32,
        top: f32,
    ) -> MovieCard {
        let card = &self.config.card;
        let theme = &self.config.theme;
        let tier = title_tier(&movie.title, &card.title_tiers);
        let title_font = FontSpec::bold(tier_size(tier, &card.title_tiers));
        let (title_lines, truncated) = wrap_title(&movie.title, &title_font, card, self.measure);
        debug!(
            "card {:?} `{}`: tier {:?}, {} line(s){}",
            kind,
            movie.title,
            tier,
            title_lines.len(),
            if truncated { ", truncated" } else { "" }
        );

        let diff = movie.difference();
        let sign = if diff > 0.0 { "+" } else { "" };
        MovieCard {
            kind,
            bounds: Rectangle::centered_at(center_x, top, card.size()),
            tier,
            title_font,
            title_lines,
            truncated,
            rating_text: format!("{sign}{}★", one_decimal(diff)),
            rating_color: match Direction::from_difference(diff) {
                Direction::More => theme.positive,
                Direction::Less => theme.negative,
            },
            details_text: format!(
                "You: {}★ | Avg: {}★",
                one_decimal(movie.user_rating),
                one_decimal(movie.public_rating)
            ),
        }
    }

    fn card_commands(&self, card: &MovieCard, out: &mut Vec<DrawCommand>) {
        let cfg = &self.config.card;
        let theme = &self.config.theme;
        let type_sizes = &self.config.typography;
        let b = card.bounds;
        let cx = b.center_x();

        out.push(DrawCommand::RoundedRect(RoundedRect {
            rect: b,
            radius: cfg.corner_radius,
            fill: [theme.card_fill_start, theme.card_fill_end],
            stroke: Some((theme.card_border, cfg.border_width)),
        }));

        // Title block is centred in the top third of the card.
        let line_height = card.title_font.size + cfg.line_gap;
        let block_height = card.title_lines.len() as f32 * line_height;
        let first_baseline = b.y + (b.height / 3.0 - block_height) / 2.0 + line_height;
        for (i, line) in card.title_lines.iter().enumerate() {
            out.push(DrawCommand::Text(TextRun {
                text: line.clone(),
                anchor: Position::new(cx, first_baseline + i as f32 * line_height),
                font: card.title_font,
                color: theme.text,
                glow: None,
            }));
        }

        out.push(DrawCommand::Text(TextRun {
            text: card.rating_text.clone(),
            anchor: Position::new(cx, b.y + b.height / 2.0 + cfg.rating_below_middle),
            font: FontSpec::bold(type_sizes.card_rating),
            color: card.rating_color,
            glow: Some(Glow {
                color: card.rating_color,
                blur: self.config.glow.card_rating,
            }),
        }));
        out.push(DrawCommand::Text(TextRun {
            text: card.kind.label().to_string(),
            anchor: Position::new(cx, b.bottom() - cfg.label_from_bottom),
            font: FontSpec::regular(type_sizes.card_label),
            color: theme.card_label,
            glow: None,
        }));
        out.push(DrawCommand::Text(TextRun {
            text: card.details_text.clone(),
            anchor: Position::new(cx, b.bottom() - cfg.details_from_bottom),
            font: FontSpec::regular(type_sizes.card_details),
            color: theme.card_details,
            glow: None,
        }));
    }
}

pub fn headline(average: f64, config: &LayoutConfig) -> Headline {
    let direction = Direction::from_difference(average);
    Headline {
        direction,
        magnitude: one_decimal(average.abs()),
        color: match direction {
            Direction::More => config.theme.positive,
            Direction::Less => config.theme.negative,
        },
        tagline: Tagline::classify(average),
    }
}

/// Formats `value` with one decimal, rounding exact ties away from zero
/// (0.25 -> "0.3", -1.25 -> "-1.3"). `{:.1}` alone rounds ties to even.
pub fn one_decimal(value: f64) -> String {
    // Only multiples of 0.25 with an odd quarter count sit exactly on a tie.
    let quarters = value * 4.0;
    if quarters.fract() == 0.0 && quarters.abs() % 2.0 == 1.0 {
        let tenths = (value.abs() * 10.0).ceil().copysign(value);
        return format!("{:.1}", tenths / 10.0);
    }
    format!("{value:.1}")
}

/// Tier from the character count of the raw, unwrapped title.
pub fn title_tier(title: &str, tiers: &TitleTiers) -> TitleTier {
    let chars = title.chars().count();
    if chars <= tiers.large_max_chars {
        TitleTier::Large
    } else if chars <= tiers.medium_max_chars {
        TitleTier::Medium
    } else {
        TitleTier::Small
    }
}

pub fn tier_size(tier: TitleTier, tiers: &TitleTiers) -> f32 {
    match tier {
        TitleTier::Large => tiers.large,
        TitleTier::Medium => tiers.medium,
        TitleTier::Small => tiers.small,
    }
}

/// Greedy word wrap. A word joins the current line while the joined line
/// measures strictly under `budget`; words wider than the budget still get a
/// line of their own and are never broken.
pub fn wrap_words<M: TextMeasure + ?Sized>(
    text: &str,
    font: &FontSpec,
    budget: f32,
    measure: &M,
) -> Vec<String> {
    let mut words = text.split(' ');
    let mut current = words.next().unwrap_or_default().to_string();
    let mut lines = Vec::new();
    for word in words {
        let candidate = format!("{current} {word}");
        if measure.measure(&candidate, font) < budget {
            current = candidate;
        } else {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        }
    }
    lines.push(current);
    lines
}

/// Drops trailing characters until `line` plus `ellipsis` fits `budget`.
pub fn truncate_with_ellipsis<M: TextMeasure + ?Sized>(
    line: &str,
    ellipsis: &str,
    font: &FontSpec,
    budget: f32,
    measure: &M,
) -> String {
    let mut kept = line.to_string();
    while !kept.is_empty() && measure.measure(&format!("{kept}{ellipsis}"), font) > budget {
        kept.pop();
    }
    kept.push_str(ellipsis);
    kept
}

/// Wraps a card title to at most `max_title_lines`, truncating the last
/// displayed line when the title overflows. Returns the lines and whether
/// truncation happened.
pub fn wrap_title<M: TextMeasure + ?Sized>(
    title: &str,
    font: &FontSpec,
    card: &CardConfig,
    measure: &M,
) -> (Vec<String>, bool) {
    let budget = card.title_budget();
    let mut lines = wrap_words(title, font, budget, measure);
    if lines.len() <= card.max_title_lines {
        return (lines, false);
    }
    lines.truncate(card.max_title_lines);
    if let Some(last) = lines.last_mut() {
        *last = truncate_with_ellipsis(last, &card.ellipsis, font, budget, measure);
    }
    (lines, true)
}
