use statcard::config::{CardConfig, EmptyCardsPolicy, LayoutConfig, Theme};
use statcard::layout::{title_tier, wrap_title, wrap_words, LayoutEngine};
use statcard::plan::{CardKind, Direction, DrawCommand, Tagline, TitleTier};
use statcard::text::{FixedAdvance, FontSpec, TextMeasure};
use statcard::{CardError, MovieRating, RenderPlan, StatsSnapshot};

fn plan_for(snapshot: &StatsSnapshot) -> RenderPlan {
    let config = LayoutConfig::default();
    let measure = FixedAdvance::default();
    LayoutEngine::new(&config, &measure)
        .layout(snapshot)
        .expect("layout")
}

fn with_average(avg: f64) -> StatsSnapshot {
    StatsSnapshot::new(
        avg,
        vec![MovieRating::new("Eraserhead", 2.0, 3.4)],
        vec![MovieRating::new("The Room", 4.0, 1.5)],
    )
}

#[test]
fn sign_and_color_agree() {
    let theme = Theme::default();
    for avg in [-3.0, -1.0, -0.2, -0.01, 0.0, 0.01, 0.2, 0.73, 1.0, 4.5] {
        let plan = plan_for(&with_average(avg));
        let h = &plan.headline;
        if avg > 0.0 {
            assert_eq!(h.direction, Direction::More, "avg {avg}");
            assert_eq!(h.color, theme.positive, "avg {avg}");
            assert!(plan.find_text("MORE STARS").is_some());
        } else {
            assert_eq!(h.direction, Direction::Less, "avg {avg}");
            assert_eq!(h.color, theme.negative, "avg {avg}");
            assert!(plan.find_text("LESS STARS").is_some());
        }
        assert!(!h.magnitude.starts_with('-'));
    }
}

#[test]
fn tagline_boundaries_are_exact() {
    let cases = [
        (-1.5, Tagline::Perfectionist),
        (-1.0, Tagline::Perfectionist),
        (-0.5, Tagline::ToughCritic),
        (-0.2, Tagline::SpotOn),
        (0.0, Tagline::SpotOn),
        (0.2, Tagline::SpotOn),
        (0.5, Tagline::Generous),
        (1.0, Tagline::ExtremeGenerous),
        (2.5, Tagline::ExtremeGenerous),
    ];
    for (avg, expected) in cases {
        let plan = plan_for(&with_average(avg));
        assert_eq!(plan.headline.tagline, expected, "avg {avg}");
        assert!(plan.find_text(expected.text()).is_some());
    }
}

#[test]
fn extreme_magnitude_is_not_an_error() {
    let plan = plan_for(&with_average(-12.345));
    assert_eq!(plan.headline.magnitude, "12.3");
    assert_eq!(plan.headline.tagline, Tagline::Perfectionist);
}

#[test]
fn short_title_wraps_to_itself() {
    let card = CardConfig::default();
    let measure = FixedAdvance::default();
    let font = FontSpec::bold(20.0);
    for title in ["The Room", "Eraserhead", "M"] {
        let lines = wrap_words(title, &font, card.title_budget(), &measure);
        assert_eq!(lines, vec![title.to_string()]);
        let (lines, truncated) = wrap_title(title, &font, &card, &measure);
        assert_eq!(lines, vec![title.to_string()]);
        assert!(!truncated);
    }
}

#[test]
fn long_title_truncates_to_three_lines() {
    let card = CardConfig::default();
    let measure = FixedAdvance::default();
    let title = "The Lord of the Rings The Fellowship of the Ring Extended Edition Remastered Collector Cut";
    let font = FontSpec::bold(16.0);
    let budget = card.title_budget();

    assert!(wrap_words(title, &font, budget, &measure).len() > 3);
    let (lines, truncated) = wrap_title(title, &font, &card, &measure);
    assert!(truncated);
    assert_eq!(lines.len(), 3);
    let last = lines.last().unwrap();
    assert!(last.ends_with("..."), "{last}");
    assert!(measure.measure(last, &font) <= budget);
}

#[test]
fn overlong_words_are_shortened_on_the_last_line_only() {
    let card = CardConfig::default();
    let measure = FixedAdvance::default();
    let font = FontSpec::bold(16.0);
    let word = "x".repeat(40);
    let title = [word.as_str(); 5].join(" ");
    let (lines, truncated) = wrap_title(&title, &font, &card, &measure);
    assert!(truncated);
    assert_eq!(lines[0], word);
    assert_eq!(lines[1], word);
    assert!(lines[2].ends_with("..."));
    assert!(measure.measure(&lines[2], &font) <= card.title_budget());
}

#[test]
fn title_tiers_switch_at_exact_lengths() {
    let tiers = CardConfig::default().title_tiers;
    let title = |n: usize| "a".repeat(n);
    assert_eq!(title_tier(&title(20), &tiers), TitleTier::Large);
    assert_eq!(title_tier(&title(21), &tiers), TitleTier::Medium);
    assert_eq!(title_tier(&title(35), &tiers), TitleTier::Medium);
    assert_eq!(title_tier(&title(36), &tiers), TitleTier::Small);
    // counted in characters, not bytes
    assert_eq!(title_tier(&"é".repeat(20), &tiers), TitleTier::Large);
}

#[test]
fn tier_is_chosen_before_wrapping() {
    // 21 chars wraps to two lines but stays in the medium tier
    let snapshot = StatsSnapshot::new(
        0.0,
        vec![MovieRating::new("Rear Window Rear Wind", 2.0, 4.0)],
        vec![],
    );
    let plan = plan_for(&snapshot);
    let card = &plan.cards[0];
    assert_eq!(card.tier, TitleTier::Medium);
    assert_eq!(card.title_font.size, 18.0);
}

#[test]
fn empty_lists_omit_the_card_section() {
    let plan = plan_for(&StatsSnapshot::new(0.4, vec![], vec![]));
    assert!(plan.cards.is_empty());
    assert!(!plan
        .commands
        .iter()
        .any(|c| matches!(c, DrawCommand::RoundedRect(_))));
    assert!(plan.find_text("Your Most Extreme Ratings:").is_none());
    assert!(plan.find_text("meterboxd.com").is_some());
}

#[test]
fn empty_lists_can_be_rejected() {
    let config = LayoutConfig {
        empty_cards: EmptyCardsPolicy::Reject,
        ..LayoutConfig::default()
    };
    let measure = FixedAdvance::default();
    let err = LayoutEngine::new(&config, &measure)
        .layout(&StatsSnapshot::default())
        .unwrap_err();
    assert!(matches!(err, CardError::InvalidSnapshot(_)));
}

#[test]
fn single_list_centers_its_card() {
    for snapshot in [
        StatsSnapshot::new(-0.5, vec![MovieRating::new("Jaws", 2.0, 4.0)], vec![]),
        StatsSnapshot::new(0.5, vec![], vec![MovieRating::new("Cats", 4.0, 1.5)]),
    ] {
        let plan = plan_for(&snapshot);
        assert_eq!(plan.cards.len(), 1);
        assert!((plan.cards[0].bounds.center_x() - 250.0).abs() < 1e-4);
    }
}

#[test]
fn headline_cards_come_from_the_front_of_each_list() {
    let snapshot = StatsSnapshot::new(
        -0.3,
        vec![
            MovieRating::new("Smaller Gap First", 3.0, 3.5),
            MovieRating::new("Bigger Gap Second", 1.0, 4.0),
        ],
        vec![],
    );
    let plan = plan_for(&snapshot);
    assert_eq!(plan.cards[0].title_lines.join(" "), "Smaller Gap First");
}

#[test]
fn end_to_end_scenario() {
    let snapshot = StatsSnapshot::from_json(
        r#"{"rating_stats": {
            "average_rating_difference": 0.73,
            "overrated_movies": [{"title": "Eraserhead", "user_rating": 2.0, "public_rating": 3.4}],
            "underrated_movies": [{"title": "The Room", "user_rating": 4.0, "public_rating": 1.5}]
        }}"#,
    )
    .unwrap();
    let plan = plan_for(&snapshot);
    let theme = Theme::default();

    assert_eq!(plan.headline.magnitude, "0.7");
    assert_eq!(plan.headline.direction.word(), "more");
    assert_eq!(plan.headline.tagline, Tagline::Generous);
    assert!(plan.find_text("0.7").is_some());

    assert_eq!(plan.cards.len(), 2);
    let (left, right) = (&plan.cards[0], &plan.cards[1]);
    assert_eq!(left.kind, CardKind::Overrated);
    assert_eq!(left.title_lines, vec!["Eraserhead"]);
    assert_eq!(left.rating_text, "-1.4★");
    assert_eq!(left.rating_color, theme.negative);
    assert_eq!(right.kind, CardKind::Underrated);
    assert_eq!(right.rating_text, "+2.5★");
    assert_eq!(right.rating_color, theme.positive);
    assert_eq!(right.details_text, "You: 4.0★ | Avg: 1.5★");

    // side by side, mirrored around the centre, same row
    assert!(left.bounds.right() <= right.bounds.x);
    assert!((left.bounds.center_x() + right.bounds.center_x() - 500.0).abs() < 1e-4);
    assert_eq!(left.bounds.y, right.bounds.y);

    let rating = plan.find_text("-1.4★").unwrap();
    assert_eq!(rating.glow.as_ref().unwrap().color, theme.negative);
    let rating = plan.find_text("+2.5★").unwrap();
    assert_eq!(rating.glow.as_ref().unwrap().color, theme.positive);
    assert!(plan.find_text("You rated lower").is_some());
    assert!(plan.find_text("You rated higher").is_some());
}

#[test]
fn draw_order_is_fixed() {
    let plan = plan_for(&with_average(0.73));
    assert!(matches!(plan.commands[0], DrawCommand::Background(_)));
    assert!(matches!(plan.commands[1], DrawCommand::DotTexture { .. }));
    let texts: Vec<&str> = plan.text_runs().map(|r| r.text.as_str()).collect();
    assert_eq!(
        &texts[..7],
        &[
            "Meterboxd",
            "On average, you give movies",
            "0.7",
            "MORE STARS",
            "than other users",
            "generosity level: high",
            "Your Most Extreme Ratings:",
        ]
    );
    assert_eq!(&texts[texts.len() - 2..], &["Share your movie stats at", "meterboxd.com"]);
    let brand = plan.find_text("Meterboxd").unwrap();
    assert!(brand.glow.is_some());
    assert_eq!(plan.find_text("generosity level: high").unwrap().font, FontSpec::regular(24.0).italic());
}

#[test]
fn title_block_sits_in_the_top_third() {
    let plan = plan_for(&with_average(0.73));
    let card = &plan.cards[0];
    let title = plan.find_text("Eraserhead").unwrap();
    assert!(title.anchor.y > card.bounds.y);
    assert!(title.anchor.y <= card.bounds.y + card.bounds.height / 3.0 + 1e-3);
    assert!((title.anchor.x - card.bounds.center_x()).abs() < 1e-4);
}

#[test]
fn readouts_round_half_away_from_zero() {
    let plan = plan_for(&StatsSnapshot::new(
        0.25,
        vec![],
        vec![MovieRating::new("Heat", 4.0, 3.75)],
    ));
    assert_eq!(plan.headline.magnitude, "0.3");
    assert!(plan.find_text("+0.3★").is_some());
    assert!(plan.find_text("You: 4.0★ | Avg: 3.8★").is_some());

    assert_eq!(plan_for(&with_average(1.25)).headline.magnitude, "1.3");
    assert_eq!(plan_for(&with_average(-2.25)).headline.magnitude, "2.3");
}

#[test]
fn ellipsis_wider_than_the_title_width_is_a_config_error() {
    let config = LayoutConfig {
        card: CardConfig {
            width: 30.0,
            padding: 10.0,
            ..CardConfig::default()
        },
        ..LayoutConfig::default()
    };
    // passes the structural checks, but "..." at size 16 bold is 26.4 wide
    assert!(config.validate().is_ok());
    let err = LayoutEngine::new(&config, &FixedAdvance::default())
        .layout(&with_average(0.5))
        .err()
        .expect("narrow card rejected");
    assert!(matches!(err, CardError::Config(_)), "{err}");
}
