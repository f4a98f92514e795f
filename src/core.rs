use crate::error::{PoseoverError, PoseoverResult};

/// Output frame geometry. Fixed for the whole run; normalized bbox fields are
/// projected into this space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

impl Canvas {
    pub fn validate(&self) -> PoseoverResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(PoseoverError::validation("canvas width/height must be > 0"));
        }
        Ok(())
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// Axis-aligned subject box from the detector. Each field is independently
/// either normalized (value <= 1.0, scaled by the canvas axis) or already in
/// pixels (value > 1.0). A box exactly 1.0 px wide is indistinguishable from a
/// full-canvas normalized one; the threshold rule is kept as-is for
/// compatibility with existing timelines.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Bbox {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Bbox {
    /// Fallback used when a timeline record carries no detection.
    pub fn centered_default() -> Self {
        Self {
            x: 0.4,
            y: 0.3,
            w: 0.2,
            h: 0.3,
        }
    }
}

/// Orientation angles in degrees. Pitch is carried but unused by the rule
/// solver.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Pose {
    pub yaw: f64,
    pub pitch: f64,
    pub roll: f64,
}

/// Solver output: how to map a sprite into canvas space for one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AffinePlacement {
    pub scale: f64,
    pub rotation_deg: f64,
    pub translate: (f64, f64),
}

/// Straight-alpha RGBA8 frame.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameRgba {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl FrameRgba {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0u8; width as usize * height as usize * 4],
        }
    }

    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> PoseoverResult<Self> {
        if data.len() != width as usize * height as usize * 4 {
            return Err(PoseoverError::validation(
                "frame data length must be width*height*4",
            ));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        [
            self.data[idx],
            self.data[idx + 1],
            self.data[idx + 2],
            self.data[idx + 3],
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canvas_validate_rejects_zero_dimensions() {
        assert!(
            Canvas {
                width: 0,
                height: 720
            }
            .validate()
            .is_err()
        );
        assert!(
            Canvas {
                width: 1280,
                height: 0
            }
            .validate()
            .is_err()
        );
        assert!(Canvas::default().validate().is_ok());
    }

    #[test]
    fn frame_from_raw_checks_length() {
        assert!(FrameRgba::from_raw(2, 2, vec![0u8; 16]).is_ok());
        assert!(FrameRgba::from_raw(2, 2, vec![0u8; 15]).is_err());
    }

    #[test]
    fn frame_pixel_indexing() {
        let mut f = FrameRgba::new(2, 2);
        f.data[4..8].copy_from_slice(&[1, 2, 3, 4]);
        assert_eq!(f.pixel(1, 0), [1, 2, 3, 4]);
        assert_eq!(f.pixel(0, 1), [0, 0, 0, 0]);
    }
}
