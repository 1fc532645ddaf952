// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Translation of accumulated parameter buffers into stateless decode descriptors.
//!
//! Each codec provides a [`CodecTranslator`] which turns the latest parameter snapshot of a frame
//! into the controls a V4L2 stateless decoder expects for it.

pub mod h264;
pub mod h265;
pub mod mpeg2;

use std::collections::BTreeMap;

use thiserror::Error;

use crate::dpb::DpbError;
use crate::va::SurfaceId;

/// Maps a surface to the picture index it was last rendered at.
pub trait PictureIndex {
    fn picture_index(&self, surface: SurfaceId) -> Option<u32>;
}

impl PictureIndex for BTreeMap<SurfaceId, u32> {
    fn picture_index(&self, surface: SurfaceId) -> Option<u32> {
        self.get(&surface).copied()
    }
}

/// Per-frame information handed to the translators.
pub struct FrameInfo<'a> {
    /// Index of the frame being translated.
    pub index: u32,
    /// Picture indices of the known surfaces.
    pub surfaces: &'a dyn PictureIndex,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TranslateError {
    #[error("no picture parameters were submitted")]
    MissingPictureParameters,
    #[error("no slice parameters were submitted")]
    MissingSliceParameters,
    #[error("slice data offset {offset} is out of bounds for {len} bytes of slice data")]
    SliceDataOutOfBounds { offset: usize, len: usize },
    #[error("DPB error: {0}")]
    Dpb(#[from] DpbError),
}

/// Descriptor produced for one frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CodecFrame {
    H264(h264::H264Frame),
    H265(h265::H265Frame),
    Mpeg2(mpeg2::Mpeg2Frame),
}

/// A translated frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub index: u32,
    pub codec: CodecFrame,
}

/// Translates the parameter buffers of a codec into its decode descriptor.
pub trait CodecTranslator {
    /// The parameter buffers accumulated for a frame.
    type Snapshot: Default;
    /// State kept across the frames of a session.
    type State: Default;

    /// Called before the buffers of a frame are submitted.
    fn prepare(_state: &mut Self::State, _snapshot: &Self::Snapshot) {}

    /// Builds the descriptor of the frame. Called once all its buffers have been submitted.
    fn translate(
        state: &mut Self::State,
        snapshot: &Self::Snapshot,
        frame: &FrameInfo,
    ) -> Result<CodecFrame, TranslateError>;
}

/// Copies `src` into an array of `N` elements, filling the remainder with `fill`.
pub(crate) fn copy_padded<T: Copy, const N: usize>(src: &[T], fill: T) -> [T; N] {
    let mut dst = [fill; N];
    let len = src.len().min(N);
    dst[..len].copy_from_slice(&src[..len]);
    dst
}

/// Copies the first `count` elements of `src` into an array of `N` default elements.
pub(crate) fn copy_active<T: Copy + Default, const N: usize>(src: &[T], count: usize) -> [T; N] {
    let len = count.min(src.len());
    copy_padded(&src[..len], T::default())
}
