//! Glow support: separable box blur over premultiplied RGBA.

use tiny_skia::Pixmap;

// Three box passes approximate a gaussian closely enough for soft glows.
const PASSES: usize = 3;

/// Box radius, in pixels, approximating a canvas-style shadow blur of `blur` pixels
/// (the blur is roughly twice the gaussian sigma).
pub fn box_radius(blur: f32) -> usize {
    ((blur / 2.0).round() as usize).max(1)
}

/// Blurs `pixmap` in place. Pixels outside the pixmap count as transparent, so
/// content near the edge fades out instead of smearing.
pub fn box_blur(pixmap: &mut Pixmap, radius: usize) {
    let (w, h) = (pixmap.width() as usize, pixmap.height() as usize);
    if radius == 0 || w == 0 || h == 0 {
        return;
    }
    let mut scratch = vec![0u8; w * h * 4];
    for _ in 0..PASSES {
        {
            let data = pixmap.data();
            for y in 0..h {
                blur_line(data, &mut scratch, w, 4, y * w * 4, radius);
            }
        }
        let data = pixmap.data_mut();
        for x in 0..w {
            blur_line(&scratch, data, h, w * 4, x * 4, radius);
        }
    }
}

// Sliding-window average along one row or column. Averaging every channel
// with the same weights keeps premultiplied color <= alpha.
fn blur_line(src: &[u8], dst: &mut [u8], len: usize, stride: usize, offset: usize, r: usize) {
    let window = (2 * r + 1) as u32;
    for ch in 0..4 {
        let at = |i: usize| offset + i * stride + ch;
        let mut sum: u32 = (0..=r.min(len - 1)).map(|i| src[at(i)] as u32).sum();
        for i in 0..len {
            dst[at(i)] = ((sum + window / 2) / window) as u8;
            if i + r + 1 < len {
                sum += src[at(i + r + 1)] as u32;
            }
            if i >= r {
                sum -= src[at(i - r)] as u32;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiny_skia::{Color, Paint, Rect, Transform};

    #[test]
    fn blur_spreads_a_dot_and_keeps_premultiplied_invariant() {
        let mut pixmap = Pixmap::new(21, 21).unwrap();
        let mut paint = Paint::default();
        paint.set_color(Color::from_rgba8(255, 128, 0, 255));
        pixmap.fill_rect(
            Rect::from_xywh(9.0, 9.0, 3.0, 3.0).unwrap(),
            &paint,
            Transform::identity(),
            None,
        );
        box_blur(&mut pixmap, 2);

        let center = pixmap.pixel(10, 10).unwrap();
        let near = pixmap.pixel(10, 14).unwrap();
        let corner = pixmap.pixel(0, 0).unwrap();
        assert!(center.alpha() > near.alpha());
        assert!(near.alpha() > 0);
        assert_eq!(corner.alpha(), 0);
        for px in pixmap.pixels() {
            assert!(px.red() <= px.alpha() && px.green() <= px.alpha() && px.blue() <= px.alpha());
        }
    }

    #[test]
    fn radius_tracks_blur() {
        assert_eq!(box_radius(0.0), 1);
        assert_eq!(box_radius(10.0), 5);
        assert_eq!(box_radius(100.0), 50);
    }
}
