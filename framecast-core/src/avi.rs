//! MJPEG-in-AVI container writer for recorded frame streams.
//!
//! Incoming payloads are already JPEG, so recording is pure muxing: each
//! frame becomes one `00dc` chunk in the `movi` list, and `finalize`
//! writes the `idx1` index and patches the sizes and frame counts left
//! as placeholders by `create`.
//!
//! ## File layout
//!
//! ```text
//! RIFF <riff_size> AVI
//!   LIST <hdrl_size> hdrl
//!     avih (56)            main header: µs/frame, total frames, w, h
//!     LIST <strl_size> strl
//!       strh (56)          stream header: vids/MJPG, rate, length
//!       strf (40)          BITMAPINFOHEADER: w, h, 24bpp, MJPG
//!   LIST <movi_size> movi
//!     00dc <n> <jpeg...>   one chunk per frame, even-padded
//!   idx1 <16 * frames>     chunk offsets relative to 'movi'
//! ```
//!
//! All multi-byte fields are little-endian per RIFF.

use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

// Fixed offsets of the fields patched during finalize (see layout above).
const OFFSET_RIFF_SIZE: u64 = 4;
const OFFSET_TOTAL_FRAMES: u64 = 48;
const OFFSET_STREAM_LENGTH: u64 = 140;
const OFFSET_MOVI_SIZE: u64 = 216;
/// Position of the `movi` fourcc; `idx1` offsets are relative to it.
const MOVI_FOURCC_POS: u64 = 220;
/// End of the header scaffolding / start of the first frame chunk.
const MOVI_DATA_START: u64 = 224;

const AVIF_HASINDEX: u32 = 0x0000_0010;
const AVIIF_KEYFRAME: u32 = 0x0000_0010;

// ── AviWriter ────────────────────────────────────────────────────

/// Sequential MJPEG AVI writer bound to fixed frame dimensions.
#[derive(Debug)]
pub struct AviWriter {
    file: BufWriter<File>,
    path: PathBuf,
    width: u32,
    height: u32,
    /// Byte position where the next chunk will land.
    write_pos: u64,
    /// `(offset relative to 'movi', chunk data size)` per frame.
    index: Vec<(u32, u32)>,
    /// Largest frame payload seen, for the suggested-buffer fields.
    max_frame_bytes: u32,
}

impl AviWriter {
    /// Create the output file and write the header scaffolding with
    /// placeholder sizes. `width`/`height` fix the encoding geometry
    /// for the lifetime of the file.
    pub fn create(
        path: &Path,
        width: u32,
        height: u32,
        fps: u32,
    ) -> std::io::Result<Self> {
        let fps = fps.max(1);
        let mut file = BufWriter::new(File::create(path)?);

        // RIFF header.
        file.write_all(b"RIFF")?;
        file.write_all(&0u32.to_le_bytes())?; // riff_size (patched)
        file.write_all(b"AVI ")?;

        // hdrl list: avih + one strl.
        file.write_all(b"LIST")?;
        file.write_all(&192u32.to_le_bytes())?;
        file.write_all(b"hdrl")?;

        // avih — main AVI header.
        file.write_all(b"avih")?;
        file.write_all(&56u32.to_le_bytes())?;
        file.write_all(&(1_000_000 / fps).to_le_bytes())?; // µs per frame
        file.write_all(&0u32.to_le_bytes())?; // max bytes/sec
        file.write_all(&0u32.to_le_bytes())?; // padding granularity
        file.write_all(&AVIF_HASINDEX.to_le_bytes())?;
        file.write_all(&0u32.to_le_bytes())?; // total frames (patched)
        file.write_all(&0u32.to_le_bytes())?; // initial frames
        file.write_all(&1u32.to_le_bytes())?; // streams
        file.write_all(&0u32.to_le_bytes())?; // suggested buffer size
        file.write_all(&width.to_le_bytes())?;
        file.write_all(&height.to_le_bytes())?;
        file.write_all(&[0u8; 16])?; // reserved

        // strl list: strh + strf.
        file.write_all(b"LIST")?;
        file.write_all(&116u32.to_le_bytes())?;
        file.write_all(b"strl")?;

        // strh — stream header.
        file.write_all(b"strh")?;
        file.write_all(&56u32.to_le_bytes())?;
        file.write_all(b"vids")?;
        file.write_all(b"MJPG")?;
        file.write_all(&0u32.to_le_bytes())?; // flags
        file.write_all(&0u16.to_le_bytes())?; // priority
        file.write_all(&0u16.to_le_bytes())?; // language
        file.write_all(&0u32.to_le_bytes())?; // initial frames
        file.write_all(&1u32.to_le_bytes())?; // scale
        file.write_all(&fps.to_le_bytes())?; // rate (fps = rate / scale)
        file.write_all(&0u32.to_le_bytes())?; // start
        file.write_all(&0u32.to_le_bytes())?; // length in frames (patched)
        file.write_all(&0u32.to_le_bytes())?; // suggested buffer size
        file.write_all(&u32::MAX.to_le_bytes())?; // quality (default)
        file.write_all(&0u32.to_le_bytes())?; // sample size
        file.write_all(&0u16.to_le_bytes())?; // rcFrame.left
        file.write_all(&0u16.to_le_bytes())?; // rcFrame.top
        file.write_all(&(width as u16).to_le_bytes())?; // rcFrame.right
        file.write_all(&(height as u16).to_le_bytes())?; // rcFrame.bottom

        // strf — BITMAPINFOHEADER.
        file.write_all(b"strf")?;
        file.write_all(&40u32.to_le_bytes())?;
        file.write_all(&40u32.to_le_bytes())?; // biSize
        file.write_all(&(width as i32).to_le_bytes())?;
        file.write_all(&(height as i32).to_le_bytes())?;
        file.write_all(&1u16.to_le_bytes())?; // planes
        file.write_all(&24u16.to_le_bytes())?; // bit count
        file.write_all(b"MJPG")?; // compression
        file.write_all(&(width * height * 3).to_le_bytes())?; // image size
        file.write_all(&0i32.to_le_bytes())?; // x pels/meter
        file.write_all(&0i32.to_le_bytes())?; // y pels/meter
        file.write_all(&0u32.to_le_bytes())?; // colors used
        file.write_all(&0u32.to_le_bytes())?; // colors important

        // movi list — frame chunks follow.
        file.write_all(b"LIST")?;
        file.write_all(&4u32.to_le_bytes())?; // movi_size (patched)
        file.write_all(b"movi")?;

        Ok(Self {
            file,
            path: path.to_path_buf(),
            width,
            height,
            write_pos: MOVI_DATA_START,
            index: Vec::new(),
            max_frame_bytes: 0,
        })
    }

    /// Width the file is bound to.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height the file is bound to.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Frames written so far.
    pub fn frames(&self) -> usize {
        self.index.len()
    }

    /// Path of the output file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one JPEG payload as a `00dc` chunk.
    pub fn write_frame(&mut self, jpeg: &[u8]) -> std::io::Result<()> {
        let size = u32::try_from(jpeg.len()).map_err(|_| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "frame exceeds u32")
        })?;

        let offset = u32::try_from(self.write_pos - MOVI_FOURCC_POS)
            .map_err(|_| std::io::Error::other("movi list exceeds u32"))?;

        self.file.write_all(b"00dc")?;
        self.file.write_all(&size.to_le_bytes())?;
        self.file.write_all(jpeg)?;
        // RIFF chunks are word-aligned.
        let pad = (jpeg.len() % 2) as u64;
        if pad == 1 {
            self.file.write_all(&[0u8])?;
        }

        self.write_pos += 8 + size as u64 + pad;
        self.index.push((offset, size));
        self.max_frame_bytes = self.max_frame_bytes.max(size);
        Ok(())
    }

    /// Write the `idx1` index, patch every placeholder, and flush.
    ///
    /// Consumes the writer: the file handle is released exactly once.
    /// Returns the output path.
    pub fn finalize(mut self) -> std::io::Result<PathBuf> {
        // idx1 — one entry per frame chunk.
        self.file.write_all(b"idx1")?;
        self.file
            .write_all(&((self.index.len() * 16) as u32).to_le_bytes())?;
        for &(offset, size) in &self.index {
            self.file.write_all(b"00dc")?;
            self.file.write_all(&AVIIF_KEYFRAME.to_le_bytes())?;
            self.file.write_all(&offset.to_le_bytes())?;
            self.file.write_all(&size.to_le_bytes())?;
        }

        let file_end = self.write_pos + 8 + self.index.len() as u64 * 16;
        let frames = self.index.len() as u32;
        let movi_size = (self.write_pos - MOVI_FOURCC_POS) as u32;

        self.patch(OFFSET_RIFF_SIZE, (file_end - 8) as u32)?;
        self.patch(OFFSET_TOTAL_FRAMES, frames)?;
        self.patch(OFFSET_STREAM_LENGTH, frames)?;
        self.patch(OFFSET_MOVI_SIZE, movi_size)?;
        // Suggested buffer sizes in avih and strh.
        self.patch(60, self.max_frame_bytes)?;
        self.patch(144, self.max_frame_bytes)?;

        self.file.flush()?;
        Ok(self.path)
    }

    fn patch(&mut self, offset: u64, value: u32) -> std::io::Result<()> {
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(&value.to_le_bytes())?;
        self.file.seek(SeekFrom::End(0))?;
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────
