//! Rasterizer: paints a [`RenderPlan`] onto a pixel surface.
//!
//! Every draw command is reissued at the requested scale, so a 4x export is a
//! vector re-render of the same composition rather than a stretched preview.

use crate::config::ColorStop;
use crate::effects::{box_blur, box_radius};
use crate::error::{CardError, Result};
use crate::export::CancelToken;
use crate::plan::{DrawCommand, RenderPlan, RoundedRect, TextRun};
use crate::rng::RngStream;
use crate::text::TextPainter;
use crate::utils::{Position, Rectangle, Rgba};
use log::{info, warn};
use tiny_skia::{
    FillRule, FilterQuality, GradientStop, LinearGradient, Mask, Paint, Path, PathBuilder, Pixmap,
    PixmapPaint, Point, Rect, SpreadMode, Stroke, Transform,
};

// Glow layers are painted at a reduced resolution and scaled back up.
const GLOW_DOWNSAMPLE: f32 = 2.0;

/// Resampling hint for scaled sub-draws (the glow layers).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RenderQuality {
    #[default]
    Preview,
    /// High quality smoothing for download assets.
    Export,
}

impl RenderQuality {
    fn filter(self) -> FilterQuality {
        match self {
            RenderQuality::Preview => FilterQuality::Bilinear,
            RenderQuality::Export => FilterQuality::Bicubic,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlacementKind {
    Background,
    Dot,
    Glow(String),
    Text(String),
    Card,
}

/// Where a primitive landed on the surface, in pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub kind: PlacementKind,
    pub bounds: Rectangle,
}

/// A painted bitmap. Owned by the caller; the rasterizer keeps nothing.
pub struct Surface {
    pixmap: Pixmap,
    scale: f32,
    placements: Vec<Placement>,
}

impl Surface {
    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    /// Pixels per design unit.
    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn placements(&self) -> &[Placement] {
        &self.placements
    }

    /// Placements mapped back into design units.
    pub fn normalized_placements(&self) -> Vec<Placement> {
        self.placements
            .iter()
            .map(|p| Placement {
                kind: p.kind.clone(),
                bounds: p.bounds * (1.0 / self.scale),
            })
            .collect()
    }

    /// Straight-alpha color of a pixel.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        let c = self.pixmap.pixel(x, y)?.demultiply();
        Some(Rgba::new(c.red(), c.green(), c.blue(), c.alpha()))
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }
}

pub struct Rasterizer<'a> {
    painter: &'a dyn TextPainter,
    quality: RenderQuality,
    cancel: Option<&'a CancelToken>,
}

impl<'a> Rasterizer<'a> {
    pub fn new(painter: &'a dyn TextPainter) -> Self {
        Self {
            painter,
            quality: RenderQuality::Preview,
            cancel: None,
        }
    }

    pub fn with_quality(mut self, quality: RenderQuality) -> Self {
        self.quality = quality;
        self
    }

    /// Checked between draw commands; a cancelled render returns `Cancelled`.
    pub fn with_cancel(mut self, token: &'a CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Paints `plan` onto a new `width` x `height` surface. The size must keep
    /// the plan's canvas aspect ratio exactly. `rng` only drives the dot texture.
    pub fn render(
        &self,
        plan: &RenderPlan,
        width: u32,
        height: u32,
        rng: &mut RngStream,
    ) -> Result<Surface> {
        if width == 0 || height == 0 {
            return Err(CardError::dimensions(width, height, "zero-area surface"));
        }
        let (cw, ch) = (plan.canvas_width() as u64, plan.canvas_height() as u64);
        if width as u64 * ch != height as u64 * cw {
            return Err(CardError::dimensions(
                width,
                height,
                format!("aspect ratio must match the {cw}x{ch} canvas"),
            ));
        }
        let pixmap = Pixmap::new(width, height)
            .ok_or_else(|| CardError::dimensions(width, height, "surface too large"))?;

        let mut frame = Frame {
            pixmap,
            scale: width as f32 / plan.canvas.width,
            placements: Vec::with_capacity(plan.commands.len() + 64),
            painter: self.painter,
            quality: self.quality,
        };

        for command in &plan.commands {
            if self.cancel.is_some_and(|t| t.is_cancelled()) {
                return Err(CardError::Cancelled);
            }
            match command {
                DrawCommand::Background(stops) => frame.background(stops),
                DrawCommand::DotTexture {
                    min_count,
                    max_count,
                    max_radius,
                    color,
                } => frame.dots(*min_count, *max_count, *max_radius, *color, rng),
                DrawCommand::Text(run) => frame.text(run),
                DrawCommand::RoundedRect(card) => frame.rounded_rect(card),
            }
        }

        info!(
            "rendered {}x{} surface at {:.2}x ({} placements)",
            width,
            height,
            frame.scale,
            frame.placements.len()
        );
        Ok(Surface {
            pixmap: frame.pixmap,
            scale: frame.scale,
            placements: frame.placements,
        })
    }
}

struct Frame<'a> {
    pixmap: Pixmap,
    scale: f32,
    placements: Vec<Placement>,
    painter: &'a dyn TextPainter,
    quality: RenderQuality,
}

fn solid(color: Rgba) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(color.to_skia());
    paint.anti_alias = true;
    paint
}

fn gradient(start: Point, end: Point, stops: &[ColorStop]) -> Paint<'static> {
    let skia_stops = stops
        .iter()
        .map(|s| GradientStop::new(s.offset, s.color.to_skia()))
        .collect();
    match LinearGradient::new(
        start,
        end,
        skia_stops,
        SpreadMode::Pad,
        Transform::identity(),
    ) {
        Some(shader) => Paint {
            shader,
            anti_alias: true,
            ..Paint::default()
        },
        // Degenerate gradients fall back to the first stop.
        None => solid(stops.first().map(|s| s.color).unwrap_or(Rgba::TRANSPARENT)),
    }
}

fn rounded_rect_path(rect: Rectangle, radius: f32) -> Option<Path> {
    let r = radius.min(rect.width / 2.0).min(rect.height / 2.0).max(0.0);
    let (l, t, rt, b) = (rect.x, rect.y, rect.right(), rect.bottom());
    let mut pb = PathBuilder::new();
    pb.move_to(l + r, t);
    pb.line_to(rt - r, t);
    pb.quad_to(rt, t, rt, t + r);
    pb.line_to(rt, b - r);
    pb.quad_to(rt, b, rt - r, b);
    pb.line_to(l + r, b);
    pb.quad_to(l, b, l, b - r);
    pb.line_to(l, t + r);
    pb.quad_to(l, t, l + r, t);
    pb.close();
    pb.finish()
}

impl Frame<'_> {
    fn place(&mut self, kind: PlacementKind, design_bounds: Rectangle) {
        self.placements.push(Placement {
            kind,
            bounds: design_bounds * self.scale,
        });
    }

    fn background(&mut self, stops: &[ColorStop]) {
        let (w, h) = (self.pixmap.width() as f32, self.pixmap.height() as f32);
        let paint = gradient(Point::from_xy(0.0, 0.0), Point::from_xy(0.0, h), stops);
        if let Some(rect) = Rect::from_xywh(0.0, 0.0, w, h) {
            self.pixmap
                .fill_rect(rect, &paint, Transform::identity(), None);
        }
        self.placements.push(Placement {
            kind: PlacementKind::Background,
            bounds: Rectangle::new(0.0, 0.0, w, h),
        });
    }

    // Positions are drawn in design units so the same seed lays out the same
    // texture at every scale.
    fn dots(
        &mut self,
        min_count: u32,
        max_count: u32,
        max_radius: f32,
        color: Rgba,
        rng: &mut RngStream,
    ) {
        let canvas_w = self.pixmap.width() as f32 / self.scale;
        let canvas_h = self.pixmap.height() as f32 / self.scale;
        let paint = solid(color);
        let count = rng.range_u32_inclusive(min_count, max_count);
        for _ in 0..count {
            let r = rng.range_f32(max_radius * 0.25, max_radius);
            let cx = rng.range_f32(r, (canvas_w - r).max(r));
            let cy = rng.range_f32(r, (canvas_h - r).max(r));
            let s = self.scale;
            if let Some(path) = PathBuilder::from_circle(cx * s, cy * s, r * s) {
                self.pixmap.fill_path(
                    &path,
                    &paint,
                    FillRule::Winding,
                    Transform::identity(),
                    None,
                );
            }
            self.place(
                PlacementKind::Dot,
                Rectangle::new(cx - r, cy - r, 2.0 * r, 2.0 * r),
            );
        }
    }

    fn text(&mut self, run: &TextRun) {
        let width = self.painter.measure(&run.text, &run.font);
        let left = run.anchor.x - width / 2.0;
        if let Some(glow) = &run.glow {
            self.glow(run, left, width, glow.color, glow.blur);
        }
        self.paint_run(run, left, width, run.color, self.scale, 0.0, None);
        self.place(
            PlacementKind::Text(run.text.clone()),
            Rectangle::new(left, run.anchor.y - run.font.size * 0.8, width, run.font.size),
        );
    }

    fn glow(&mut self, run: &TextRun, left: f32, width: f32, color: Rgba, blur: f32) {
        // Margin around the run, in design units, wide enough for the blur tail.
        let margin = blur * 1.5;
        let layer_scale = self.scale / GLOW_DOWNSAMPLE;
        let radius = box_radius(blur * layer_scale);
        self.paint_run(
            run,
            left,
            width,
            color,
            layer_scale,
            margin,
            Some(radius),
        );
        self.place(
            PlacementKind::Glow(run.text.clone()),
            Rectangle::new(
                left - margin,
                run.anchor.y - run.font.size * 1.2 - margin,
                width + 2.0 * margin,
                run.font.size * 1.6 + 2.0 * margin,
            ),
        );
    }

    /// Paints `run` into an offscreen layer at `layer_scale` px per design unit
    /// and composites it at the surface scale. With `blur` the layer is blurred
    /// first and resampled using the quality hint.
    #[allow(clippy::too_many_arguments)]
    fn paint_run(
        &mut self,
        run: &TextRun,
        left: f32,
        width: f32,
        color: Rgba,
        layer_scale: f32,
        margin: f32,
        blur: Option<usize>,
    ) {
        let size = run.font.size;
        // Room for ascenders, descenders, italic shear and synthetic bold.
        let bounds = Rectangle::new(
            left - size * 0.3 - margin,
            run.anchor.y - size * 1.2 - margin,
            width + size * 0.6 + 2.0 * margin,
            size * 1.6 + 2.0 * margin,
        );
        // Snap the layer origin to whole surface pixels.
        let origin_px = Position::new(
            (bounds.x * self.scale).floor(),
            (bounds.y * self.scale).floor(),
        );
        let to_layer = layer_scale / self.scale;
        let layer_w = ((bounds.width * layer_scale).ceil() as u32 + 2).max(1);
        let layer_h = ((bounds.height * layer_scale).ceil() as u32 + 2).max(1);

        let (Some(mut layer), Some(mut mask)) =
            (Pixmap::new(layer_w, layer_h), Mask::new(layer_w, layer_h))
        else {
            warn!("skipping text layer for `{}`: {}x{} layer", run.text, layer_w, layer_h);
            return;
        };

        let pen = Position::new(
            left * self.scale - origin_px.x,
            run.anchor.y * self.scale - origin_px.y,
        ) * to_layer;
        self.painter
            .paint_coverage(&run.text, &run.font, pen, layer_scale, &mut mask);
        if let Some(rect) = Rect::from_xywh(0.0, 0.0, layer_w as f32, layer_h as f32) {
            layer.fill_rect(rect, &solid(color), Transform::identity(), Some(&mask));
        }

        let paint = match blur {
            Some(radius) => {
                box_blur(&mut layer, radius);
                PixmapPaint {
                    quality: self.quality.filter(),
                    ..PixmapPaint::default()
                }
            }
            None => PixmapPaint::default(),
        };
        let up = 1.0 / to_layer;
        self.pixmap.draw_pixmap(
            0,
            0,
            layer.as_ref(),
            &paint,
            Transform::from_row(up, 0.0, 0.0, up, origin_px.x, origin_px.y),
            None,
        );
    }

    fn rounded_rect(&mut self, card: &RoundedRect) {
        let px = card.rect * self.scale;
        if let Some(path) = rounded_rect_path(px, card.radius * self.scale) {
            let stops = [
                ColorStop {
                    offset: 0.0,
                    color: card.fill[0],
                },
                ColorStop {
                    offset: 1.0,
                    color: card.fill[1],
                },
            ];
            let fill = gradient(
                Point::from_xy(px.x, px.y),
                Point::from_xy(px.right(), px.bottom()),
                &stops,
            );
            self.pixmap.fill_path(
                &path,
                &fill,
                FillRule::Winding,
                Transform::identity(),
                None,
            );
            if let Some((color, width)) = card.stroke {
                let stroke = Stroke {
                    width: width * self.scale,
                    ..Stroke::default()
                };
                self.pixmap.stroke_path(
                    &path,
                    &solid(color),
                    &stroke,
                    Transform::identity(),
                    None,
                );
            }
        }
        self.place(PlacementKind::Card, card.rect);
    }
}
