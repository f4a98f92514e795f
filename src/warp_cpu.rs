use kurbo::Affine;

use crate::{
    core::FrameRgba,
    error::{PoseoverError, PoseoverResult},
};

/// Warp `src` into a `dst_width x dst_height` canvas under the forward
/// `placement`, sampling bilinearly. Texels outside the source contribute
/// alpha 0, so the sprite fades out at its own edge instead of smearing the
/// border or leaking background through the color channels.
pub fn warp_rgba8(
    src: &FrameRgba,
    placement: Affine,
    dst_width: u32,
    dst_height: u32,
) -> PoseoverResult<FrameRgba> {
    if src.width == 0 || src.height == 0 {
        return Err(PoseoverError::validation("warp source has zero dimension"));
    }
    if placement.determinant().abs() < 1e-12 {
        return Err(PoseoverError::validation(
            "warp placement is not invertible (scale collapsed to zero)",
        ));
    }

    let inv = placement.inverse();
    let mut out = FrameRgba::new(dst_width, dst_height);

    for y in 0..dst_height {
        for x in 0..dst_width {
            let p = inv * kurbo::Point::new(f64::from(x), f64::from(y));
            let px = sample_bilinear(src, p.x, p.y);
            let idx = (y as usize * dst_width as usize + x as usize) * 4;
            out.data[idx..idx + 4].copy_from_slice(&px);
        }
    }

    Ok(out)
}

fn sample_bilinear(src: &FrameRgba, fx: f64, fy: f64) -> [u8; 4] {
    let x0 = fx.floor();
    let y0 = fy.floor();
    let dx = fx - x0;
    let dy = fy - y0;
    let x0 = x0 as i64;
    let y0 = y0 as i64;

    let w00 = (1.0 - dx) * (1.0 - dy);
    let w10 = dx * (1.0 - dy);
    let w01 = (1.0 - dx) * dy;
    let w11 = dx * dy;

    let t00 = texel(src, x0, y0);
    let t10 = texel(src, x0 + 1, y0);
    let t01 = texel(src, x0, y0 + 1);
    let t11 = texel(src, x0 + 1, y0 + 1);

    let mut out = [0u8; 4];
    for c in 0..4 {
        let v = f64::from(t00[c]) * w00
            + f64::from(t10[c]) * w10
            + f64::from(t01[c]) * w01
            + f64::from(t11[c]) * w11;
        out[c] = v.round().clamp(0.0, 255.0) as u8;
    }
    out
}

fn texel(src: &FrameRgba, x: i64, y: i64) -> [u8; 4] {
    if x < 0 || y < 0 || x >= i64::from(src.width) || y >= i64::from(src.height) {
        return [0, 0, 0, 0];
    }
    src.pixel(x as u32, y as u32)
}
