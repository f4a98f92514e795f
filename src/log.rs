use std::{io::Write as _, path::Path};

use anyhow::Context as _;

use crate::error::{PoseoverError, PoseoverResult};

/// One row of the transform log; exactly one per emitted output frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LogRow {
    pub frame: u64,
    pub t_ms: i64,
    pub scale: f64,
    pub rot: f64,
    pub tx: f64,
    pub ty: f64,
}

/// Append-only accumulator, flushed to the log artifact at end of run.
#[derive(Debug, Default)]
pub struct TransformLog {
    rows: Vec<LogRow>,
}

impl TransformLog {
    pub fn push(&mut self, row: LogRow) {
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[LogRow] {
        &self.rows
    }

    pub fn write_csv(&self, path: &Path) -> PoseoverResult<()> {
        let file = std::fs::File::create(path)
            .with_context(|| format!("create log '{}'", path.display()))
            .map_err(|e| PoseoverError::resource(format!("{e:#}")))?;
        let mut w = std::io::BufWriter::new(file);

        self.write_to(&mut w)
            .and_then(|_| w.flush())
            .map_err(|e| PoseoverError::resource(format!("write log '{}': {e}", path.display())))
    }

    fn write_to(&self, w: &mut impl std::io::Write) -> std::io::Result<()> {
        writeln!(w, "frame,t_ms,scale,rot,tx,ty")?;
        for row in &self.rows {
            writeln!(
                w,
                "{},{},{},{},{},{}",
                row.frame, row.t_ms, row.scale, row.rot, row.tx, row.ty
            )?;
        }
        Ok(())
    }
}
