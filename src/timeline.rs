use std::path::Path;

use anyhow::Context as _;

use crate::{
    core::{Bbox, Pose},
    error::{PoseoverError, PoseoverResult},
};

/// One parsed timeline record. All documented defaults are applied at
/// ingestion, so downstream code never deals with missing fields. The
/// timestamp stays optional: synthesizing one needs the output frame rate,
/// which is the synchronizer's business.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PoseFrameRecord {
    pub t_ms: Option<i64>,
    pub bbox: Bbox,
    pub pose: Pose,
}

/// Ordered pose/bbox records driving the composite.
#[derive(Clone, Debug)]
pub struct PoseTimeline {
    records: Vec<PoseFrameRecord>,
}

#[derive(serde::Deserialize)]
struct RawRecord {
    t_ms: Option<i64>,
    bbox: Option<Bbox>,
    #[serde(default)]
    yaw: f64,
    #[serde(default)]
    pitch: f64,
    #[serde(default)]
    roll: f64,
}

// Both a bare record array and an object wrapping it under "frames" are valid
// timeline files.
#[derive(serde::Deserialize)]
#[serde(untagged)]
enum RawTimeline {
    Wrapped { frames: Vec<RawRecord> },
    Bare(Vec<RawRecord>),
}

impl PoseTimeline {
    pub fn from_json_str(text: &str) -> PoseoverResult<Self> {
        let raw: RawTimeline = serde_json::from_str(text)
            .map_err(|e| PoseoverError::config(format!("parse timeline JSON: {e}")))?;
        let raw_records = match raw {
            RawTimeline::Wrapped { frames } => frames,
            RawTimeline::Bare(records) => records,
        };

        let records = raw_records
            .into_iter()
            .map(|r| PoseFrameRecord {
                t_ms: r.t_ms,
                bbox: r.bbox.unwrap_or_else(Bbox::centered_default),
                pose: Pose {
                    yaw: r.yaw,
                    pitch: r.pitch,
                    roll: r.roll,
                },
            })
            .collect();

        Ok(Self { records })
    }

    pub fn load(path: &Path) -> PoseoverResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read timeline '{}'", path.display()))
            .map_err(|e| PoseoverError::resource(format!("{e:#}")))?;
        Self::from_json_str(&text)
    }

    pub fn records(&self) -> &[PoseFrameRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
