use kurbo::Affine;

use crate::{
    config::RuleParams,
    core::{AffinePlacement, Bbox, Canvas, Pose},
};

/// Transform-solving strategy. Closed set: new strategies are added as
/// variants, each with the same `solve` contract.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SolveMode {
    #[default]
    Rule,
}

/// Resolve a raw bbox field to pixel units. Values <= 1.0 are normalized and
/// scale by the canvas axis; values > 1.0 are already pixels.
pub fn norm_to_px(v: f64, size: u32) -> i64 {
    if v <= 1.0 {
        (v * f64::from(size)).round() as i64
    } else {
        v.round() as i64
    }
}

/// Compute a frame-local placement from the detection. Pure and stateless:
/// the result depends only on this record's bbox/pose.
pub fn solve(
    mode: SolveMode,
    bbox: Bbox,
    pose: Pose,
    canvas: Canvas,
    rule: &RuleParams,
) -> AffinePlacement {
    match mode {
        SolveMode::Rule => solve_rule(bbox, pose, canvas, rule),
    }
}

fn solve_rule(bbox: Bbox, pose: Pose, canvas: Canvas, r: &RuleParams) -> AffinePlacement {
    let x = norm_to_px(bbox.x, canvas.width) as f64;
    let y = norm_to_px(bbox.y, canvas.height) as f64;
    let w = norm_to_px(bbox.w, canvas.width) as f64;
    let h = norm_to_px(bbox.h, canvas.height) as f64;

    let cw = f64::from(canvas.width);
    let ch = f64::from(canvas.height);

    // The box's vertical extent is the sole scale signal; width jitter from
    // the detector does not affect sprite size.
    let scale = r.scale_base * (h / ch).powf(r.scale_per_bbox);

    // Yaw contributes at quarter strength: it maps better to perspective than
    // to in-plane rotation, so it is only a weak rotational cue.
    let rotation_deg = pose.roll * r.rot_gain_roll + pose.yaw * r.rot_gain_yaw * 0.25;

    let tx = (x + w * 0.5 - cw * 0.5) * r.transl_gain;
    let ty = (y + h * 0.5 - ch * 0.5) * r.transl_gain;

    AffinePlacement {
        scale,
        rotation_deg,
        translate: (tx, ty),
    }
}

/// Build the forward mapping from sprite space into canvas space.
///
/// Rotation and scale are anchored at the sprite's own center, then the whole
/// result is translated so the sprite's visual center lands on the canvas
/// center plus the placement offset. Positive rotation turns the sprite
/// counter-clockwise on screen (y-down raster coordinates), matching the
/// detector's roll convention.
pub fn affine_from_params(
    placement: &AffinePlacement,
    src_width: u32,
    src_height: u32,
    canvas: Canvas,
) -> Affine {
    let cx = f64::from(src_width) * 0.5;
    let cy = f64::from(src_height) * 0.5;
    let (tx, ty) = placement.translate;

    let about_center = Affine::translate((cx, cy))
        * Affine::rotate(-placement.rotation_deg.to_radians())
        * Affine::scale(placement.scale)
        * Affine::translate((-cx, -cy));

    let to_target = Affine::translate((
        f64::from(canvas.width) * 0.5 - cx + tx,
        f64::from(canvas.height) * 0.5 - cy + ty,
    ));

    to_target * about_center
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canvas() -> Canvas {
        Canvas {
            width: 1280,
            height: 720,
        }
    }

    #[test]
    fn norm_to_px_is_idempotent_once_pixel_valued() {
        for v in [0.0, 0.25, 0.5, 1.0, 1.5, 64.0, 719.0] {
            let once = norm_to_px(v, 720);
            let twice = norm_to_px(once as f64, 720);
            if once > 1 {
                assert_eq!(once, twice, "v={v}");
            }
        }
        assert_eq!(norm_to_px(0.5, 720), 360);
        assert_eq!(norm_to_px(360.0, 720), 360);
    }

    #[test]
    fn scale_is_monotonic_in_bbox_height() {
        let r = RuleParams::default();
        let mut prev = 0.0;
        for h in [0.1, 0.2, 0.4, 0.8, 1.0] {
            let p = solve(
                SolveMode::Rule,
                Bbox {
                    x: 0.4,
                    y: 0.3,
                    w: 0.2,
                    h,
                },
                Pose::default(),
                canvas(),
                &r,
            );
            assert!(p.scale >= prev, "h={h}");
            prev = p.scale;
        }
    }

    #[test]
    fn rotation_is_linear_in_roll_and_yaw() {
        let r = RuleParams {
            rot_gain_roll: 2.0,
            rot_gain_yaw: 4.0,
            ..RuleParams::default()
        };
        let solve_rot = |yaw: f64, roll: f64| {
            solve(
                SolveMode::Rule,
                Bbox::centered_default(),
                Pose {
                    yaw,
                    pitch: 0.0,
                    roll,
                },
                canvas(),
                &r,
            )
            .rotation_deg
        };

        assert!((solve_rot(0.0, 0.0)).abs() < 1e-12);
        assert!((solve_rot(0.0, 3.0) - 6.0).abs() < 1e-9);
        assert!((solve_rot(5.0, 0.0) - 5.0).abs() < 1e-9);
        assert!((solve_rot(5.0, 3.0) - 11.0).abs() < 1e-9);
        // Pitch is read but unused by the rule model.
        let with_pitch = solve(
            SolveMode::Rule,
            Bbox::centered_default(),
            Pose {
                yaw: 5.0,
                pitch: 45.0,
                roll: 3.0,
            },
            canvas(),
            &r,
        );
        assert!((with_pitch.rotation_deg - 11.0).abs() < 1e-9);
    }

    #[test]
    fn translation_is_zero_when_bbox_is_centered() {
        for gain in [0.5, 1.0, 3.0] {
            let r = RuleParams {
                transl_gain: gain,
                ..RuleParams::default()
            };
            let p = solve(
                SolveMode::Rule,
                Bbox {
                    x: 0.25,
                    y: 0.25,
                    w: 0.5,
                    h: 0.5,
                },
                Pose::default(),
                canvas(),
                &r,
            );
            assert!(p.translate.0.abs() < 1e-9, "gain={gain}");
            assert!(p.translate.1.abs() < 1e-9, "gain={gain}");
        }
    }

    #[test]
    fn affine_maps_sprite_center_to_canvas_center_plus_offset() {
        let placement = AffinePlacement {
            scale: 0.7,
            rotation_deg: 33.0,
            translate: (12.0, -8.0),
        };
        let m = affine_from_params(&placement, 240, 240, canvas());
        let mapped = m * kurbo::Point::new(120.0, 120.0);
        assert!((mapped.x - (640.0 + 12.0)).abs() < 1e-9);
        assert!((mapped.y - (360.0 - 8.0)).abs() < 1e-9);
    }

    #[test]
    fn affine_identity_when_placement_is_neutral() {
        let placement = AffinePlacement {
            scale: 1.0,
            rotation_deg: 0.0,
            translate: (0.0, 0.0),
        };
        // Sprite the size of the canvas, neutral placement: pixels map 1:1.
        let m = affine_from_params(&placement, 1280, 720, canvas());
        let p = m * kurbo::Point::new(17.0, 5.0);
        assert!((p.x - 17.0).abs() < 1e-9);
        assert!((p.y - 5.0).abs() < 1e-9);
    }
}
