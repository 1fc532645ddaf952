// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Frame lifecycle of a dump session.
//!
//! A [`Session`] receives the buffers of each frame between [`Session::begin_picture`] and
//! [`Session::end_picture`], keeps the latest parameter buffers of its codec, writes the slice data
//! of the first frames to disk and translates them into decode descriptors.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use bytes::Bytes;
use log::debug;
use log::error;
use log::warn;
use thiserror::Error;

use crate::codec::h264::H264;
use crate::codec::h265::H265;
use crate::codec::mpeg2::Mpeg2;
use crate::codec::CodecFrame;
use crate::codec::CodecTranslator;
use crate::codec::Frame;
use crate::codec::FrameInfo;
use crate::codec::PictureIndex;
use crate::codec::TranslateError;
use crate::config::DumpConfig;
use crate::dump::Printer;
use crate::va::h264::IQMatrixBufferH264;
use crate::va::h264::PictureParameterBufferH264;
use crate::va::h264::SliceParameterBufferH264;
use crate::va::h265::PictureParameterBufferHevc;
use crate::va::h265::SliceParameterBufferHevc;
use crate::va::mpeg2::IQMatrixBufferMpeg2;
use crate::va::mpeg2::PictureParameterBufferMpeg2;
use crate::va::mpeg2::SliceParameterBufferMpeg2;
use crate::va::SurfaceId;

/// Identifier of the first surface of a session.
pub const SURFACE_ID_OFFSET: SurfaceId = 0x0400_0000;

/// Codec decoded by a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Codec {
    H264,
    H265,
    Mpeg2,
}

#[derive(Clone, Debug)]
pub enum PictureParameter {
    H264(PictureParameterBufferH264),
    H265(PictureParameterBufferHevc),
    Mpeg2(PictureParameterBufferMpeg2),
}

#[derive(Clone, Debug)]
pub enum IqMatrix {
    H264(IQMatrixBufferH264),
    Mpeg2(IQMatrixBufferMpeg2),
}

#[derive(Clone, Debug)]
pub enum SliceParameter {
    H264(SliceParameterBufferH264),
    H265(SliceParameterBufferHevc),
    Mpeg2(SliceParameterBufferMpeg2),
}

/// A buffer submitted for the frame being rendered.
#[derive(Clone, Debug)]
pub enum Buffer {
    PictureParameter(PictureParameter),
    IqMatrix(IqMatrix),
    SliceParameter(SliceParameter),
    SliceData(Bytes),
}

impl Buffer {
    fn name(&self) -> &'static str {
        match self {
            Buffer::PictureParameter(_) => "picture parameter",
            Buffer::IqMatrix(_) => "IQ matrix",
            Buffer::SliceParameter(_) => "slice parameter",
            Buffer::SliceData(_) => "slice data",
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("unknown surface {0:#x}")]
    UnknownSurface(SurfaceId),
    #[error("a picture is already being rendered to surface {0:#x}")]
    PictureInProgress(SurfaceId),
    #[error("no picture is being rendered")]
    NoPictureInProgress,
    #[error("failed to translate frame {index}: {source}")]
    Translate {
        index: u32,
        #[source]
        source: TranslateError,
    },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Surfaces of a session and the picture index each was last rendered at.
#[derive(Debug, Default)]
pub struct SurfaceRegistry {
    indices: BTreeMap<SurfaceId, u32>,
    next_id: SurfaceId,
}

impl SurfaceRegistry {
    /// Creates `count` surfaces. Until they are rendered to, their index is their position in the
    /// batch.
    pub fn create(&mut self, count: usize) -> Vec<SurfaceId> {
        (0..count)
            .map(|i| {
                let id = SURFACE_ID_OFFSET + self.next_id;
                self.next_id += 1;
                self.indices.insert(id, i as u32);
                id
            })
            .collect()
    }

    pub fn destroy(&mut self, surface: SurfaceId) -> bool {
        self.indices.remove(&surface).is_some()
    }

    pub fn contains(&self, surface: SurfaceId) -> bool {
        self.indices.contains_key(&surface)
    }

    fn set_index(&mut self, surface: SurfaceId, index: u32) {
        if let Some(i) = self.indices.get_mut(&surface) {
            *i = index;
        }
    }
}

impl PictureIndex for SurfaceRegistry {
    fn picture_index(&self, surface: SurfaceId) -> Option<u32> {
        self.indices.get(&surface).copied()
    }
}

/// File receiving the slice data of one frame.
struct SliceDump {
    path: PathBuf,
    file: File,
}

impl SliceDump {
    fn create(path: PathBuf) -> anyhow::Result<Self> {
        let file = File::create(&path)
            .with_context(|| format!("unable to open slice dump path {}", path.display()))?;
        Ok(Self { path, file })
    }

    fn append(&mut self, data: &[u8]) -> anyhow::Result<()> {
        self.file
            .write_all(data)
            .with_context(|| format!("failed to write slice data to {}", self.path.display()))
    }
}

/// Translator state and latest parameter buffers of a codec.
struct CodecContext<T: CodecTranslator> {
    state: T::State,
    snapshot: T::Snapshot,
}

impl<T: CodecTranslator> Default for CodecContext<T> {
    fn default() -> Self {
        Self {
            state: Default::default(),
            snapshot: Default::default(),
        }
    }
}

impl<T: CodecTranslator> CodecContext<T> {
    fn prepare(&mut self) {
        T::prepare(&mut self.state, &self.snapshot);
    }

    fn translate(&mut self, frame: &FrameInfo) -> Result<CodecFrame, TranslateError> {
        T::translate(&mut self.state, &self.snapshot, frame)
    }
}

enum CodecState {
    H264(CodecContext<H264>),
    H265(CodecContext<H265>),
    Mpeg2(CodecContext<Mpeg2>),
}

impl CodecState {
    fn new(codec: Codec) -> Self {
        match codec {
            Codec::H264 => CodecState::H264(Default::default()),
            Codec::H265 => CodecState::H265(Default::default()),
            Codec::Mpeg2 => CodecState::Mpeg2(Default::default()),
        }
    }

    fn codec(&self) -> Codec {
        match self {
            CodecState::H264(_) => Codec::H264,
            CodecState::H265(_) => Codec::H265,
            CodecState::Mpeg2(_) => Codec::Mpeg2,
        }
    }

    fn prepare(&mut self) {
        match self {
            CodecState::H264(ctx) => ctx.prepare(),
            CodecState::H265(ctx) => ctx.prepare(),
            CodecState::Mpeg2(ctx) => ctx.prepare(),
        }
    }

    fn translate(&mut self, frame: &FrameInfo) -> Result<CodecFrame, TranslateError> {
        match self {
            CodecState::H264(ctx) => ctx.translate(frame),
            CodecState::H265(ctx) => ctx.translate(frame),
            CodecState::Mpeg2(ctx) => ctx.translate(frame),
        }
    }

    /// Keeps `buffer` as the latest of its kind.
    fn submit(&mut self, buffer: &Buffer) {
        match (self, buffer) {
            (CodecState::H264(ctx), Buffer::PictureParameter(PictureParameter::H264(p))) => {
                ctx.snapshot.picture = Some(p.clone())
            }
            (CodecState::H264(ctx), Buffer::IqMatrix(IqMatrix::H264(m))) => {
                ctx.snapshot.matrix = Some(m.clone())
            }
            (CodecState::H264(ctx), Buffer::SliceParameter(SliceParameter::H264(s))) => {
                ctx.snapshot.slice = Some(s.clone())
            }
            (CodecState::H265(ctx), Buffer::PictureParameter(PictureParameter::H265(p))) => {
                ctx.snapshot.picture = Some(p.clone())
            }
            (CodecState::H265(ctx), Buffer::SliceParameter(SliceParameter::H265(s))) => {
                ctx.snapshot.slice = Some(s.clone())
            }
            (CodecState::H265(ctx), Buffer::SliceData(data)) => ctx.snapshot.slice_data = data.clone(),
            (CodecState::Mpeg2(ctx), Buffer::PictureParameter(PictureParameter::Mpeg2(p))) => {
                ctx.snapshot.picture = Some(p.clone())
            }
            (CodecState::Mpeg2(ctx), Buffer::IqMatrix(IqMatrix::Mpeg2(m))) => {
                ctx.snapshot.matrix = Some(m.clone())
            }
            // Slice positions are not needed to build MPEG-2 descriptors.
            (CodecState::Mpeg2(_), Buffer::SliceParameter(SliceParameter::Mpeg2(_))) => (),
            (_, Buffer::SliceData(_)) => (),
            (state, buffer) => warn!(
                "Ignoring {} buffer not matching the {:?} session",
                buffer.name(),
                state.codec()
            ),
        }
    }
}

enum RenderState {
    /// No picture is being rendered.
    Idle,
    /// Buffers are being submitted for a picture.
    Rendering {
        surface: SurfaceId,
        dump: Option<SliceDump>,
    },
}

/// A decoding session, turning the buffers of each frame into a decode descriptor.
///
/// Descriptors of the frames below [`DumpConfig::dump_count`] are printed to the session's writer
/// and returned by [`Session::end_picture`].
pub struct Session<W: Write> {
    config: DumpConfig,
    codec: CodecState,
    surfaces: SurfaceRegistry,
    frame_index: u32,
    state: RenderState,
    printer: Printer<W>,
}

impl<W: Write> Session<W> {
    pub fn new(codec: Codec, config: DumpConfig, out: W) -> Self {
        Self {
            config,
            codec: CodecState::new(codec),
            surfaces: Default::default(),
            frame_index: 0,
            state: RenderState::Idle,
            printer: Printer::new(out),
        }
    }

    pub fn codec(&self) -> Codec {
        self.codec.codec()
    }

    pub fn config(&self) -> &DumpConfig {
        &self.config
    }

    /// Index of the next frame to be ended.
    pub fn frame_index(&self) -> u32 {
        self.frame_index
    }

    pub fn surfaces(&self) -> &SurfaceRegistry {
        &self.surfaces
    }

    pub fn create_surfaces(&mut self, count: usize) -> Vec<SurfaceId> {
        self.surfaces.create(count)
    }

    pub fn destroy_surface(&mut self, surface: SurfaceId) -> Result<(), SessionError> {
        if self.surfaces.destroy(surface) {
            Ok(())
        } else {
            Err(SessionError::UnknownSurface(surface))
        }
    }

    /// Starts a picture rendered to `surface`.
    pub fn begin_picture(&mut self, surface: SurfaceId) -> Result<(), SessionError> {
        if let RenderState::Rendering { surface, .. } = self.state {
            return Err(SessionError::PictureInProgress(surface));
        }
        if !self.surfaces.contains(surface) {
            return Err(SessionError::UnknownSurface(surface));
        }

        let index = self.frame_index;
        let dump = if self.config.dumps(index) {
            match SliceDump::create(self.config.slice_file(index)) {
                Ok(dump) => Some(dump),
                Err(e) => {
                    error!("{:#}", e);
                    None
                }
            }
        } else {
            None
        };

        self.codec.prepare();
        self.state = RenderState::Rendering { surface, dump };

        Ok(())
    }

    /// Submits buffers for the current picture.
    pub fn render_picture(&mut self, buffers: &[Buffer]) -> Result<(), SessionError> {
        let RenderState::Rendering { dump, .. } = &mut self.state else {
            return Err(SessionError::NoPictureInProgress);
        };

        for buffer in buffers {
            if let (Buffer::SliceData(data), Some(sink)) = (buffer, dump.as_mut()) {
                debug!(
                    "Dumping {} bytes of slice {}/{}",
                    data.len(),
                    self.frame_index + 1,
                    self.config.dump_count
                );
                if let Err(e) = sink.append(data) {
                    error!("{:#}", e);
                }
            }

            self.codec.submit(buffer);
        }

        Ok(())
    }

    /// Ends the current picture, returning its descriptor if it is within the dumped frames.
    ///
    /// The frame counter advances even if the translation fails.
    pub fn end_picture(&mut self) -> Result<Option<Frame>, SessionError> {
        let RenderState::Rendering { surface, dump } =
            std::mem::replace(&mut self.state, RenderState::Idle)
        else {
            return Err(SessionError::NoPictureInProgress);
        };
        drop(dump);

        let index = self.frame_index;
        let result = if self.config.dumps(index) {
            let info = FrameInfo {
                index,
                surfaces: &self.surfaces,
            };
            self.codec
                .translate(&info)
                .map(|codec| Some(Frame { index, codec }))
        } else {
            Ok(None)
        };

        self.surfaces.set_index(surface, index);
        self.frame_index += 1;

        let frame = result.map_err(|source| SessionError::Translate { index, source })?;
        if let Some(frame) = &frame {
            self.printer
                .print_frame(frame)
                .with_context(|| format!("failed to print frame {}", index))?;
        }

        Ok(frame)
    }

    /// Returns the writer the descriptors were printed to.
    pub fn into_inner(self) -> W {
        self.printer.into_inner()
    }
}
