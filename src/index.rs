use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use anyhow::Context as _;

use crate::error::{PoseoverError, PoseoverResult};

/// Timestamp-to-sprite-path mapping, built once from a `t_ms,path` table and
/// read-only thereafter.
#[derive(Clone, Debug, Default)]
pub struct FrameIndexTable {
    map: BTreeMap<i64, PathBuf>,
}

impl FrameIndexTable {
    /// Load from a CSV-style table with a `t_ms,path` header. A path that does
    /// not exist is the valid "not supplied" signal and yields `Ok(None)`.
    /// Paths containing commas are not supported.
    pub fn load(path: &Path) -> PoseoverResult<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read frame index '{}'", path.display()))
            .map_err(|e| PoseoverError::resource(format!("{e:#}")))?;

        let mut lines = text.lines();
        let header = lines
            .next()
            .ok_or_else(|| PoseoverError::config("frame index is empty"))?;
        let columns: Vec<&str> = header.split(',').map(str::trim).collect();
        let t_col = columns.iter().position(|c| *c == "t_ms").ok_or_else(|| {
            PoseoverError::config("frame index is missing the 't_ms' column")
        })?;
        let path_col = columns.iter().position(|c| *c == "path").ok_or_else(|| {
            PoseoverError::config("frame index is missing the 'path' column")
        })?;

        let mut map = BTreeMap::new();
        for (line_no, line) in lines.enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            if fields.len() != columns.len() {
                return Err(PoseoverError::config(format!(
                    "frame index line {}: expected {} fields, got {}",
                    line_no + 2,
                    columns.len(),
                    fields.len()
                )));
            }
            let t_ms: i64 = fields[t_col].parse().map_err(|_| {
                PoseoverError::config(format!(
                    "frame index line {}: invalid t_ms '{}'",
                    line_no + 2,
                    fields[t_col]
                ))
            })?;
            map.insert(t_ms, PathBuf::from(fields[path_col]));
        }

        Ok(Some(Self { map }))
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (i64, PathBuf)>) -> Self {
        Self {
            map: entries.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Exact hit, otherwise the entry whose key is closest to `t_ms` by
    /// absolute difference. Magnitude ties resolve to the earlier timestamp,
    /// so repeated queries are deterministic.
    pub fn resolve(&self, t_ms: i64) -> Option<(i64, &Path)> {
        if let Some(p) = self.map.get(&t_ms) {
            return Some((t_ms, p.as_path()));
        }

        let below = self.map.range(..=t_ms).next_back();
        let above = self.map.range(t_ms..).next();
        match (below, above) {
            (None, None) => None,
            (Some((k, p)), None) | (None, Some((k, p))) => Some((*k, p.as_path())),
            (Some((kb, pb)), Some((ka, pa))) => {
                if (t_ms - kb).abs() <= (ka - t_ms).abs() {
                    Some((*kb, pb.as_path()))
                } else {
                    Some((*ka, pa.as_path()))
                }
            }
        }
    }
}
