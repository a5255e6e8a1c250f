//! Download asset export.
//!
//! The asset is a fresh render at `export_scale`, encoded as PNG in memory and
//! only then written out. Files land under a temporary name and are renamed
//! into place, so a cancelled or failed export never leaves a partial file
//! under the final name.

use crate::error::{CardError, Result};
use crate::plan::RenderPlan;
use crate::renderer::{Rasterizer, RenderQuality, Surface};
use crate::rng::RngService;
use crate::text::TextPainter;
use image::{ImageFormat, RgbaImage};
use log::{debug, info, warn};
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Shared cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    pub scale: u32,
    pub file_name: String,
    /// Seed of the cosmetic dot texture.
    pub seed: u64,
}

/// Encoded image offered for download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadAsset {
    pub file_name: String,
    pub width: u32,
    pub height: u32,
    pub bytes: Vec<u8>,
}

/// Lossless PNG of `surface` with every pixel fully opaque.
pub fn encode_png(surface: &Surface) -> Result<Vec<u8>> {
    let (width, height) = (surface.width(), surface.height());
    let mut rgba = Vec::with_capacity(width as usize * height as usize * 4);
    for px in surface.pixmap().pixels() {
        let c = px.demultiply();
        rgba.extend_from_slice(&[c.red(), c.green(), c.blue(), 0xff]);
    }
    let img = RgbaImage::from_raw(width, height, rgba)
        .ok_or_else(|| CardError::EncodingFailure("pixel buffer size mismatch".to_string()))?;
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png)
        .map_err(|e| CardError::EncodingFailure(e.to_string()))?;
    Ok(out.into_inner())
}

/// Re-renders `plan` at the export scale and encodes it. The surface is
/// dropped before returning.
pub fn render_asset(
    plan: &RenderPlan,
    painter: &dyn TextPainter,
    options: &ExportOptions,
    cancel: Option<&CancelToken>,
) -> Result<DownloadAsset> {
    let width = plan.canvas_width().checked_mul(options.scale);
    let height = plan.canvas_height().checked_mul(options.scale);
    let (Some(width), Some(height)) = (width, height) else {
        return Err(CardError::dimensions(
            u32::MAX,
            u32::MAX,
            format!("export scale {} overflows the surface size", options.scale),
        ));
    };

    let mut rng = RngService::with_seed(options.seed).dot_texture();
    let mut rasterizer = Rasterizer::new(painter).with_quality(RenderQuality::Export);
    if let Some(token) = cancel {
        rasterizer = rasterizer.with_cancel(token);
    }
    let surface = rasterizer.render(plan, width, height, &mut rng)?;
    let bytes = encode_png(&surface)?;
    drop(surface);

    if cancel.is_some_and(CancelToken::is_cancelled) {
        return Err(CardError::Cancelled);
    }
    info!(
        "encoded {} ({}x{}, {} bytes)",
        options.file_name,
        width,
        height,
        bytes.len()
    );
    Ok(DownloadAsset {
        file_name: options.file_name.clone(),
        width,
        height,
        bytes,
    })
}

/// Writes `asset` into `dir` under its file name, atomically.
pub fn publish(asset: &DownloadAsset, dir: &Path) -> Result<PathBuf> {
    let target = dir.join(&asset.file_name);
    let staging = dir.join(format!(
        ".{}.{}.partial",
        asset.file_name,
        std::process::id()
    ));
    let written = write_staged(&staging, &asset.bytes).and_then(|_| fs::rename(&staging, &target));
    if let Err(e) = written {
        if let Err(cleanup) = fs::remove_file(&staging) {
            debug!("no staging file to clean up at {}: {cleanup}", staging.display());
        }
        return Err(e.into());
    }
    info!("published {}", target.display());
    Ok(target)
}

fn write_staged(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

#[derive(Debug)]
pub struct ExportOutcome {
    pub asset: DownloadAsset,
    pub published: Option<PathBuf>,
}

/// Export running on a worker thread. Dropping the handle cancels the job;
/// the worker then stops at the next draw command and frees its surface.
pub struct ExportJob {
    cancel: CancelToken,
    handle: Option<JoinHandle<Result<ExportOutcome>>>,
}

impl ExportJob {
    pub fn spawn(
        plan: Arc<RenderPlan>,
        painter: Arc<dyn TextPainter>,
        options: ExportOptions,
        publish_dir: Option<PathBuf>,
    ) -> Result<Self> {
        let cancel = CancelToken::new();
        let token = cancel.clone();
        let handle = std::thread::Builder::new()
            .name("statcard-export".to_string())
            .spawn(move || {
                let asset = render_asset(&plan, painter.as_ref(), &options, Some(&token))?;
                let published = match publish_dir {
                    Some(dir) if !token.is_cancelled() => Some(publish(&asset, &dir)?),
                    Some(_) => return Err(CardError::Cancelled),
                    None => None,
                };
                Ok(ExportOutcome { asset, published })
            })?;
        Ok(Self {
            cancel,
            handle: Some(handle),
        })
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Blocks until the worker is done.
    pub fn wait(mut self) -> Result<ExportOutcome> {
        let handle = self
            .handle
            .take()
            .ok_or_else(|| CardError::EncodingFailure("export already collected".to_string()))?;
        handle
            .join()
            .map_err(|_| CardError::EncodingFailure("export worker panicked".to_string()))?
    }
}

impl Drop for ExportJob {
    fn drop(&mut self) {
        if let Some(handle) = &self.handle {
            if !handle.is_finished() {
                warn!("export job dropped before completion, cancelling");
            }
            self.cancel.cancel();
        }
    }
}
