use std::{
    collections::{HashMap, VecDeque},
    path::{Path, PathBuf},
};

use crate::{
    core::{Canvas, FrameRgba},
    error::{PoseoverError, PoseoverResult},
    index::FrameIndexTable,
    media::{self, VideoSourceInfo},
};

const BG_CACHE_CAPACITY: usize = 64;
const BG_BATCH_FRAMES: u32 = 12;

/// Seekable background frame supply. The only mutable state is the read
/// cursor, owned by the implementation.
pub trait BackgroundSource {
    /// Position the cursor at an absolute frame index.
    fn seek(&mut self, frame_index: u64) -> PoseoverResult<()>;

    /// Read the frame at the cursor, resized to the canvas, and advance.
    /// `Ok(None)` means the stream is exhausted.
    fn next_frame(&mut self) -> PoseoverResult<Option<FrameRgba>>;
}

/// Background video read through system ffmpeg, with batch decode and a small
/// LRU so strict-sync seeks near the playhead stay cheap.
pub struct FfmpegBackground {
    info: VideoSourceInfo,
    canvas: Canvas,
    cursor: u64,
    cache: HashMap<u64, Vec<u8>>,
    lru: VecDeque<u64>,
}

impl FfmpegBackground {
    pub fn open(path: &Path, canvas: Canvas) -> PoseoverResult<Self> {
        canvas.validate()?;
        let info = media::probe_video(path)?;
        Ok(Self {
            info,
            canvas,
            cursor: 0,
            cache: HashMap::new(),
            lru: VecDeque::new(),
        })
    }

    pub fn info(&self) -> &VideoSourceInfo {
        &self.info
    }

    fn raw_frame_at(&mut self, index: u64) -> PoseoverResult<Option<Vec<u8>>> {
        if let Some(raw) = self.cache.get(&index).cloned() {
            self.touch(index);
            return Ok(Some(raw));
        }

        // Decode a batch aligned to the batch size so sequential reads hit the
        // cache for the next BG_BATCH_FRAMES-1 frames.
        let start = index - index % u64::from(BG_BATCH_FRAMES);
        let frames = media::decode_frames_rgba8(&self.info, start, BG_BATCH_FRAMES)?;
        for (offset, raw) in frames.into_iter().enumerate() {
            self.insert(start + offset as u64, raw);
        }

        match self.cache.get(&index).cloned() {
            Some(raw) => {
                self.touch(index);
                Ok(Some(raw))
            }
            // The batch ended before reaching `index`: end of stream.
            None => Ok(None),
        }
    }

    fn insert(&mut self, key: u64, raw: Vec<u8>) {
        self.cache.insert(key, raw);
        self.touch(key);
        while self.lru.len() > BG_CACHE_CAPACITY {
            if let Some(old) = self.lru.pop_front() {
                self.cache.remove(&old);
            }
        }
    }

    fn touch(&mut self, key: u64) {
        if let Some(pos) = self.lru.iter().position(|x| *x == key) {
            self.lru.remove(pos);
        }
        self.lru.push_back(key);
    }

    fn resize_to_canvas(&self, raw: Vec<u8>) -> PoseoverResult<FrameRgba> {
        if self.info.width == self.canvas.width && self.info.height == self.canvas.height {
            return FrameRgba::from_raw(self.canvas.width, self.canvas.height, raw);
        }
        let img = image::RgbaImage::from_raw(self.info.width, self.info.height, raw)
            .ok_or_else(|| PoseoverError::decode("decoded frame does not match probed size"))?;
        let resized = image::imageops::resize(
            &img,
            self.canvas.width,
            self.canvas.height,
            image::imageops::FilterType::Triangle,
        );
        FrameRgba::from_raw(self.canvas.width, self.canvas.height, resized.into_raw())
    }
}

impl BackgroundSource for FfmpegBackground {
    fn seek(&mut self, frame_index: u64) -> PoseoverResult<()> {
        self.cursor = frame_index;
        Ok(())
    }

    fn next_frame(&mut self) -> PoseoverResult<Option<FrameRgba>> {
        let Some(raw) = self.raw_frame_at(self.cursor)? else {
            return Ok(None);
        };
        self.cursor += 1;
        Ok(Some(self.resize_to_canvas(raw)?))
    }
}

/// Lexicographically ordered sprite directory, consumed one image per output
/// frame. Once exhausted, the last image is reused rather than stopping.
#[derive(Clone, Debug)]
pub struct DirSequence {
    files: Vec<PathBuf>,
    cursor: usize,
}

impl DirSequence {
    pub fn scan(dir: &Path) -> PoseoverResult<Self> {
        let mut files = Vec::new();
        let entries = std::fs::read_dir(dir).map_err(|e| {
            PoseoverError::resource(format!(
                "failed to list sprite directory '{}': {e}",
                dir.display()
            ))
        })?;
        for entry in entries {
            let entry = entry.map_err(|e| {
                PoseoverError::resource(format!(
                    "failed to list sprite directory '{}': {e}",
                    dir.display()
                ))
            })?;
            let path = entry.path();
            let is_png = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("png"));
            if is_png {
                files.push(path);
            }
        }
        files.sort();
        Ok(Self { files, cursor: 0 })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    fn next_clamped(&mut self) -> Option<&Path> {
        if self.files.is_empty() {
            return None;
        }
        let idx = self.cursor.min(self.files.len() - 1);
        self.cursor += 1;
        Some(self.files[idx].as_path())
    }

    fn skip(&mut self) {
        self.cursor += 1;
    }
}

/// Foreground frame supply, in the documented priority order: an explicit
/// timestamp index wins over a sprite directory.
#[derive(Debug)]
pub enum ForegroundSource {
    Indexed(FrameIndexTable),
    Directory(DirSequence),
}

impl ForegroundSource {
    /// Resolve the configured foreground inputs. Having neither a usable
    /// index nor a non-empty directory is a configuration error, reported
    /// before any frame is processed.
    pub fn configure(fg_dir: Option<&Path>, fg_index: Option<&Path>) -> PoseoverResult<Self> {
        if let Some(index_path) = fg_index
            && let Some(table) = FrameIndexTable::load(index_path)?
        {
            if table.is_empty() {
                return Err(PoseoverError::config(format!(
                    "frame index '{}' contains no entries",
                    index_path.display()
                )));
            }
            return Ok(Self::Indexed(table));
        }

        if let Some(dir) = fg_dir
            && dir.is_dir()
        {
            let seq = DirSequence::scan(dir)?;
            if !seq.is_empty() {
                return Ok(Self::Directory(seq));
            }
        }

        Err(PoseoverError::config(
            "no foreground source configured (need a frame index or a sprite directory)",
        ))
    }

    /// Produce the sprite for an output frame at `t_ms`. Consumes one slot of
    /// the directory cursor in directory mode.
    pub fn frame_for(&mut self, t_ms: i64) -> PoseoverResult<FrameRgba> {
        let path = match self {
            Self::Indexed(table) => table
                .resolve(t_ms)
                .map(|(_, p)| p.to_path_buf())
                .ok_or_else(|| PoseoverError::config("frame index contains no entries"))?,
            Self::Directory(seq) => seq
                .next_clamped()
                .map(Path::to_path_buf)
                .ok_or_else(|| PoseoverError::config("sprite directory contains no images"))?,
        };
        load_image_rgba(&path)
    }

    /// Advance consumption state without decoding anything.
    pub fn skip(&mut self) {
        if let Self::Directory(seq) = self {
            seq.skip();
        }
    }
}

/// Decode a sprite image. RGB inputs get a synthesized fully opaque alpha
/// channel. A missing or corrupt file is fatal for the run.
pub fn load_image_rgba(path: &Path) -> PoseoverResult<FrameRgba> {
    let img = image::open(path)
        .map_err(|e| PoseoverError::decode(format!("failed to read sprite '{}': {e}", path.display())))?;
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    FrameRgba::from_raw(width, height, rgba.into_raw())
}
