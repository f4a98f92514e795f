use crate::{
    config::SyncParams,
    core::FrameRgba,
    error::PoseoverResult,
    sources::{BackgroundSource, ForegroundSource},
    timeline::PoseFrameRecord,
};

/// Everything the compositor needs for one output frame.
pub struct FrameSelection {
    pub t_ms: i64,
    pub background: FrameRgba,
    pub foreground: FrameRgba,
}

/// Per-run orchestrator pairing each timeline record with a background frame
/// and a foreground sprite. Owns the background seek cursor and the
/// foreground consumption cursor; constructed per run, never shared.
pub struct FrameSynchronizer<B: BackgroundSource> {
    background: B,
    foreground: ForegroundSource,
    sync: SyncParams,
}

impl<B: BackgroundSource> FrameSynchronizer<B> {
    pub fn new(
        background: B,
        foreground: ForegroundSource,
        sync: SyncParams,
    ) -> PoseoverResult<Self> {
        sync.validate()?;
        Ok(Self {
            background,
            foreground,
            sync,
        })
    }

    /// The record's own timestamp, or one synthesized from the output frame
    /// rate when the record carries none.
    pub fn timestamp_for(&self, frame: u64, record: &PoseFrameRecord) -> i64 {
        record
            .t_ms
            .unwrap_or_else(|| ((frame as f64) * 1000.0 / f64::from(self.sync.demo_fps)).round() as i64)
    }

    /// Select the frame pair for output frame `frame`. `Ok(None)` means the
    /// background ran out, which ends the run successfully.
    pub fn select(
        &mut self,
        frame: u64,
        record: &PoseFrameRecord,
    ) -> PoseoverResult<Option<FrameSelection>> {
        let t_ms = self.timestamp_for(frame, record);

        if self.sync.strict_bg_sync {
            self.background.seek(self.bg_index_for(t_ms))?;
        }
        let Some(background) = self.background.next_frame()? else {
            return Ok(None);
        };

        let foreground = self.foreground.frame_for(t_ms)?;

        Ok(Some(FrameSelection {
            t_ms,
            background,
            foreground,
        }))
    }

    /// Advance consumption state for one record without decoding sprites.
    /// Used when rendering a single frame out of a longer timeline; in
    /// sequential mode the background frame still has to be read and
    /// discarded to keep the cursor honest.
    pub fn skip(&mut self, _frame: u64, _record: &PoseFrameRecord) -> PoseoverResult<bool> {
        if !self.sync.strict_bg_sync && self.background.next_frame()?.is_none() {
            return Ok(false);
        }
        self.foreground.skip();
        Ok(true)
    }

    fn bg_index_for(&self, t_ms: i64) -> u64 {
        let idx = ((t_ms - self.sync.bg_start_ms) as f64 * self.sync.bg_fps / 1000.0).round() as i64;
        idx.max(0) as u64
    }
}
