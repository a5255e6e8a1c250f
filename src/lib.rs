//! Story-card renderer for rating statistics.
//!
//! A [`StatsSnapshot`] is laid out once into an immutable [`RenderPlan`]
//! ([`layout::LayoutEngine`]) and then painted at any scale
//! ([`renderer::Rasterizer`]): 1x for the live preview, `export_scale` for
//! the downloadable PNG.

pub mod config;
pub mod effects;
pub mod error;
pub mod export;
pub mod layout;
pub mod plan;
pub mod renderer;
pub mod rng;
pub mod snapshot;
pub mod text;
pub mod utils;

pub use config::LayoutConfig;
pub use error::{CardError, Result};
pub use export::{CancelToken, DownloadAsset, ExportJob, ExportOptions, ExportOutcome};
pub use layout::LayoutEngine;
pub use plan::RenderPlan;
pub use renderer::{Rasterizer, RenderQuality, Surface};
pub use snapshot::{MovieRating, StatsSnapshot};
pub use text::{FixedAdvance, FontLibrary, TextMeasure, TextPainter};

use rng::RngService;
use std::path::PathBuf;
use std::sync::Arc;

/// Best available painter: system sans-serif faces, or block glyphs when none
/// can be loaded.
pub fn default_painter() -> Arc<dyn TextPainter> {
    system_painter().unwrap_or_else(|| Arc::new(FixedAdvance::default()) as Arc<dyn TextPainter>)
}

#[cfg(feature = "system-fonts")]
fn system_painter() -> Option<Arc<dyn TextPainter>> {
    match FontLibrary::from_system() {
        Ok(fonts) => Some(Arc::new(fonts)),
        Err(e) => {
            log::warn!("{e}; falling back to block glyphs");
            None
        }
    }
}

#[cfg(not(feature = "system-fonts"))]
fn system_painter() -> Option<Arc<dyn TextPainter>> {
    None
}

/// A laid-out card for one snapshot, ready for preview and export.
pub struct ShareCard {
    config: LayoutConfig,
    painter: Arc<dyn TextPainter>,
    plan: Arc<RenderPlan>,
}

impl ShareCard {
    pub fn new(
        snapshot: &StatsSnapshot,
        config: LayoutConfig,
        painter: Arc<dyn TextPainter>,
    ) -> Result<Self> {
        config.validate()?;
        let plan = LayoutEngine::new(&config, painter.as_ref()).layout(snapshot)?;
        Ok(Self {
            config,
            painter,
            plan: Arc::new(plan),
        })
    }

    pub fn plan(&self) -> &RenderPlan {
        &self.plan
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Renders the card at 1x for on-screen display.
    pub fn preview(&self, seed: u64) -> Result<Surface> {
        let mut rng = RngService::with_seed(seed).dot_texture();
        Rasterizer::new(self.painter.as_ref()).render(
            &self.plan,
            self.plan.canvas_width(),
            self.plan.canvas_height(),
            &mut rng,
        )
    }

    fn export_options(&self, seed: u64) -> ExportOptions {
        ExportOptions {
            scale: self.config.export_scale,
            file_name: self.config.export_file_name.clone(),
            seed,
        }
    }

    /// Re-renders the card at the export scale and encodes it as PNG.
    pub fn download_asset(&self, seed: u64) -> Result<DownloadAsset> {
        export::render_asset(
            &self.plan,
            self.painter.as_ref(),
            &self.export_options(seed),
            None,
        )
    }

    /// Runs the export on a worker thread, optionally publishing into `publish_dir`.
    pub fn spawn_export(&self, seed: u64, publish_dir: Option<PathBuf>) -> Result<ExportJob> {
        ExportJob::spawn(
            Arc::clone(&self.plan),
            Arc::clone(&self.painter),
            self.export_options(seed),
            publish_dir,
        )
    }
}
