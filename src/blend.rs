use kurbo::Affine;

use crate::{
    config::BlendParams,
    core::FrameRgba,
    error::{PoseoverError, PoseoverResult},
    feather_cpu::feather_mask,
    warp_cpu::warp_rgba8,
};

// Color matching is skipped below this mean alpha: an almost-empty mask would
// be matched against a sample that is nearly all background.
const COLOR_MATCH_MIN_COVERAGE: f64 = 0.01;

const STD_EPSILON: f64 = 1e-6;

/// Merge a warped sprite onto a background frame.
///
/// Pipeline: warp (color + alpha) into background space, feather the alpha
/// mask, apply the alpha bias, optionally match the sprite's per-channel
/// statistics to the background, then blend `alpha*fg + (1-alpha)*bg` per
/// channel. The output has the background's dimensions and is fully opaque.
pub fn composite_frame(
    bg: &FrameRgba,
    fg: &FrameRgba,
    placement: Affine,
    blend: &BlendParams,
) -> PoseoverResult<FrameRgba> {
    if bg.width == 0 || bg.height == 0 {
        return Err(PoseoverError::validation(
            "composite background has zero dimension",
        ));
    }

    let warped = warp_rgba8(fg, placement, bg.width, bg.height)?;
    let pixels = bg.width as usize * bg.height as usize;

    let mut mask: Vec<u8> = warped.data.chunks_exact(4).map(|px| px[3]).collect();
    if blend.feather_px > 0 {
        mask = feather_mask(&mask, bg.width, bg.height, blend.feather_px)?;
    }

    let alpha: Vec<f64> = mask
        .iter()
        .map(|&a| (f64::from(a) / 255.0 * blend.alpha_bias).clamp(0.0, 1.0))
        .collect();

    let fg_rgba = if blend.color_match && mean(&alpha) > COLOR_MATCH_MIN_COVERAGE {
        match_color_stats(&warped.data, &bg.data, blend.color_match_strength)
    } else {
        warped.data.clone()
    };

    let mut out = FrameRgba::new(bg.width, bg.height);
    for i in 0..pixels {
        let a = alpha[i];
        let idx = i * 4;
        for c in 0..3 {
            let f = f64::from(fg_rgba[idx + c]);
            let b = f64::from(bg.data[idx + c]);
            out.data[idx + c] = (a * f + (1.0 - a) * b).round().clamp(0.0, 255.0) as u8;
        }
        out.data[idx + 3] = 255;
    }

    Ok(out)
}

/// Per-channel mean and standard deviation over the flattened pixel set of an
/// RGBA buffer (alpha channel excluded from the statistics).
pub(crate) fn channel_stats(rgba: &[u8]) -> ([f64; 3], [f64; 3]) {
    let n = (rgba.len() / 4).max(1) as f64;

    let mut mean = [0.0f64; 3];
    for px in rgba.chunks_exact(4) {
        for c in 0..3 {
            mean[c] += f64::from(px[c]);
        }
    }
    for c in 0..3 {
        mean[c] /= n;
    }

    let mut var = [0.0f64; 3];
    for px in rgba.chunks_exact(4) {
        for c in 0..3 {
            let d = f64::from(px[c]) - mean[c];
            var[c] += d * d;
        }
    }
    let mut std = [0.0f64; 3];
    for c in 0..3 {
        std[c] = (var[c] / n).sqrt() + STD_EPSILON;
    }

    (mean, std)
}

/// Shift `src`'s per-channel mean/std toward `reference`'s, blended by
/// `strength` (0 = unchanged, 1 = full match). A single global affine color
/// transform per channel, not per-pixel.
pub(crate) fn match_color_stats(src: &[u8], reference: &[u8], strength: f64) -> Vec<u8> {
    if strength <= 0.0 {
        return src.to_vec();
    }
    let (sm, ss) = channel_stats(src);
    let (rm, rs) = channel_stats(reference);

    let mut out = src.to_vec();
    for px in out.chunks_exact_mut(4) {
        for c in 0..3 {
            let v = f64::from(px[c]);
            let matched = (v - sm[c]) / ss[c] * rs[c] + rm[c];
            let blended = v * (1.0 - strength) + matched * strength;
            px[c] = blended.round().clamp(0.0, 255.0) as u8;
        }
    }
    out
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BlendParams;

    fn solid(width: u32, height: u32, rgba: [u8; 4]) -> FrameRgba {
        let mut f = FrameRgba::new(width, height);
        for px in f.data.chunks_exact_mut(4) {
            px.copy_from_slice(&rgba);
        }
        f
    }

    #[test]
    fn alpha_bias_zero_yields_background_unchanged() {
        let bg = solid(8, 6, [10, 120, 30, 255]);
        let fg = solid(8, 6, [250, 20, 20, 255]);
        let blend = BlendParams {
            alpha_bias: 0.0,
            ..BlendParams::default()
        };

        let out = composite_frame(&bg, &fg, Affine::IDENTITY, &blend).unwrap();
        for px in out.data.chunks_exact(4) {
            assert_eq!(px, &[10, 120, 30, 255]);
        }
    }

    #[test]
    fn opaque_sprite_reduces_to_plain_alpha_over() {
        let bg = solid(8, 8, [0, 0, 200, 255]);
        let mut fg = FrameRgba::new(8, 8);
        // Opaque 2x2 sprite patch at (2,2); rest fully transparent.
        for y in 2..4u32 {
            for x in 2..4u32 {
                let idx = (y as usize * 8 + x as usize) * 4;
                fg.data[idx..idx + 4].copy_from_slice(&[255, 40, 0, 255]);
            }
        }
        let blend = BlendParams {
            feather_px: 0,
            alpha_bias: 1.0,
            color_match: false,
            color_match_strength: 0.0,
        };

        let out = composite_frame(&bg, &fg, Affine::IDENTITY, &blend).unwrap();
        assert_eq!(out.pixel(2, 2), [255, 40, 0, 255]);
        assert_eq!(out.pixel(3, 3), [255, 40, 0, 255]);
        assert_eq!(out.pixel(0, 0), [0, 0, 200, 255]);
        assert_eq!(out.pixel(7, 7), [0, 0, 200, 255]);
    }

    #[test]
    fn color_match_skipped_on_near_empty_mask() {
        let bg = solid(16, 16, [200, 200, 200, 255]);
        let mut fg = FrameRgba::new(16, 16);
        // Single opaque pixel: coverage 1/256 < 1% threshold.
        fg.data[0..4].copy_from_slice(&[255, 0, 0, 255]);
        let blend = BlendParams {
            feather_px: 0,
            alpha_bias: 1.0,
            color_match: true,
            color_match_strength: 1.0,
        };

        let out = composite_frame(&bg, &fg, Affine::IDENTITY, &blend).unwrap();
        assert_eq!(out.pixel(0, 0), [255, 0, 0, 255]);
    }

    #[test]
    fn color_match_strength_zero_is_noop() {
        let src = vec![100u8, 50, 25, 255, 20, 80, 140, 255];
        let reference = vec![5u8, 5, 5, 255, 250, 250, 250, 255];
        assert_eq!(match_color_stats(&src, &reference, 0.0), src);
    }

    #[test]
    fn full_match_moves_mean_to_reference() {
        // Two-pixel src with distinct values per channel so std is non-zero.
        let src = vec![40u8, 40, 40, 255, 80, 80, 80, 255];
        let reference = vec![100u8, 100, 100, 255, 140, 140, 140, 255];
        let out = match_color_stats(&src, &reference, 1.0);
        let (om, _) = channel_stats(&out);
        for c in 0..3 {
            assert!((om[c] - 120.0).abs() < 1.0, "c={c} mean={}", om[c]);
        }
    }

    #[test]
    fn channel_stats_epsilon_guards_flat_images() {
        let flat = vec![7u8, 7, 7, 255].repeat(10);
        let (_, std) = channel_stats(&flat);
        for c in 0..3 {
            assert!(std[c] > 0.0);
        }
    }
}
