//! PDF rasterisation: render selected pages to `DynamicImage` via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async contexts.
//! `tokio::task::spawn_blocking` moves the work onto a dedicated thread pool
//! thread designed for blocking operations, preventing the Tokio worker
//! threads from stalling during CPU-heavy rendering.
//!
//! ## DPI plus a pixel cap
//!
//! `dpi` sets the nominal render scale (PDF points are 1/72 in, so the
//! scale factor is `dpi / 72`). Page sizes vary wildly though: an A0 poster
//! at 150 DPI would produce a 12,000 × 17,000 px image, so
//! `max_rendered_pixels` caps the longest edge regardless of physical size,
//! keeping memory bounded and matching the image-size sweet spot for vision
//! models (around 1,024–2,048 px).

use crate::config::ConversionConfig;
use crate::error::StitchError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::{debug, info, warn};

/// Rasterise selected pages of a PDF into images.
///
/// This runs inside `spawn_blocking` since pdfium operations are CPU-bound.
///
/// # Returns
/// A vector of `(page_index_0based, DynamicImage)` tuples.
pub async fn render_pages(
    pdf_path: &Path,
    config: &ConversionConfig,
    page_indices: &[usize],
) -> Result<Vec<(usize, DynamicImage)>, StitchError> {
    let path = pdf_path.to_path_buf();
    let dpi = config.dpi;
    let max_pixels = config.max_rendered_pixels;
    let password = config.password.clone();
    let indices = page_indices.to_vec();

    tokio::task::spawn_blocking(move || {
        render_pages_blocking(&path, dpi, max_pixels, password.as_deref(), &indices)
    })
    .await
    .map_err(|e| StitchError::Internal(format!("Render task panicked: {}", e)))?
}

/// Count the pages of a PDF without rendering anything.
pub async fn page_count(pdf_path: &Path, password: Option<&str>) -> Result<usize, StitchError> {
    let path = pdf_path.to_path_buf();
    let pwd = password.map(|s| s.to_string());

    tokio::task::spawn_blocking(move || {
        let pdfium = Pdfium::default();
        let document = load_document(&pdfium, &path, pwd.as_deref())?;
        Ok(document.pages().len() as usize)
    })
    .await
    .map_err(|e| StitchError::Internal(format!("Page-count task panicked: {}", e)))?
}

fn load_document<'a>(
    pdfium: &'a Pdfium,
    pdf_path: &Path,
    password: Option<&'a str>,
) -> Result<PdfDocument<'a>, StitchError> {
    pdfium.load_pdf_from_file(pdf_path, password).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            if password.is_some() {
                StitchError::WrongPassword {
                    path: pdf_path.to_path_buf(),
                }
            } else {
                StitchError::PasswordRequired {
                    path: pdf_path.to_path_buf(),
                }
            }
        } else {
            StitchError::CorruptPdf {
                path: pdf_path.to_path_buf(),
                detail: err_str,
            }
        }
    })
}

/// Blocking implementation of page rendering.
fn render_pages_blocking(
    pdf_path: &Path,
    dpi: u32,
    max_pixels: u32,
    password: Option<&str>,
    page_indices: &[usize],
) -> Result<Vec<(usize, DynamicImage)>, StitchError> {
    let pdfium = Pdfium::default();
    let document = load_document(&pdfium, pdf_path, password)?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    info!("PDF loaded: {} pages", total_pages);

    let mut results = Vec::with_capacity(page_indices.len());

    for &idx in page_indices {
        if idx >= total_pages {
            warn!(
                "Skipping page {} (out of range, total={})",
                idx + 1,
                total_pages
            );
            continue;
        }

        let page = pages
            .get(idx as u16)
            .map_err(|e| StitchError::RasterisationFailed {
                page: idx + 1,
                detail: format!("{:?}", e),
            })?;

        // Per-page config: the DPI target depends on the page's physical
        // width, and mixed page sizes within one document are common.
        let render_config = PdfRenderConfig::new()
            .set_target_width(scaled_width(page.width().value, dpi, max_pixels))
            .set_maximum_width(max_pixels as i32)
            .set_maximum_height(max_pixels as i32);

        let bitmap = page.render_with_config(&render_config).map_err(|e| {
            StitchError::RasterisationFailed {
                page: idx + 1,
                detail: format!("{:?}", e),
            }
        })?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            idx + 1,
            image.width(),
            image.height()
        );

        results.push((idx, image));
    }

    Ok(results)
}

/// Target pixel width for a page: physical width in points scaled by the
/// DPI (points are 1/72 in), clamped to the configured pixel cap.
fn scaled_width(width_points: f32, dpi: u32, max_pixels: u32) -> i32 {
    let px = (width_points * dpi as f32 / 72.0).round() as u32;
    px.clamp(1, max_pixels) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dpi_scales_page_width_from_points() {
        // A4 portrait is 595 pt wide.
        assert_eq!(scaled_width(595.0, 150, 2000), 1240);
        assert_eq!(scaled_width(595.0, 72, 2000), 595);
    }

    #[test]
    fn pixel_cap_bounds_oversized_renders() {
        assert_eq!(scaled_width(595.0, 400, 2000), 2000);
        // A0 poster at default DPI still respects the cap.
        assert_eq!(scaled_width(2384.0, 150, 2000), 2000);
    }
}
