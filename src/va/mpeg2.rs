// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use crate::va::SurfaceId;
use crate::va::VA_INVALID_SURFACE;

/// `picture_coding_extension` of `VAPictureParameterBufferMPEG2`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Mpeg2PictureCodingExtension {
    pub intra_dc_precision: u8,
    pub picture_structure: u8,
    pub top_field_first: bool,
    pub frame_pred_frame_dct: bool,
    pub concealment_motion_vectors: bool,
    pub q_scale_type: bool,
    pub intra_vlc_format: bool,
    pub alternate_scan: bool,
    pub repeat_first_field: bool,
    pub progressive_frame: bool,
    pub is_first_field: bool,
}

/// `VAPictureParameterBufferMPEG2`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PictureParameterBufferMpeg2 {
    pub horizontal_size: u16,
    pub vertical_size: u16,
    pub forward_reference_picture: SurfaceId,
    pub backward_reference_picture: SurfaceId,
    /// 1 = I, 2 = P, 3 = B.
    pub picture_coding_type: i32,
    /// The four `f_code` values packed as nibbles, `[0][0]` in the most significant one.
    pub f_code: i32,
    pub picture_coding_extension: Mpeg2PictureCodingExtension,
}

impl Default for PictureParameterBufferMpeg2 {
    fn default() -> Self {
        Self {
            horizontal_size: 0,
            vertical_size: 0,
            forward_reference_picture: VA_INVALID_SURFACE,
            backward_reference_picture: VA_INVALID_SURFACE,
            picture_coding_type: 0,
            f_code: 0,
            picture_coding_extension: Default::default(),
        }
    }
}

/// `VAIQMatrixBufferMPEG2`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IQMatrixBufferMpeg2 {
    pub load_intra_quantiser_matrix: bool,
    pub load_non_intra_quantiser_matrix: bool,
    pub load_chroma_intra_quantiser_matrix: bool,
    pub load_chroma_non_intra_quantiser_matrix: bool,
    pub intra_quantiser_matrix: [u8; 64],
    pub non_intra_quantiser_matrix: [u8; 64],
    pub chroma_intra_quantiser_matrix: [u8; 64],
    pub chroma_non_intra_quantiser_matrix: [u8; 64],
}

impl Default for IQMatrixBufferMpeg2 {
    fn default() -> Self {
        Self {
            load_intra_quantiser_matrix: false,
            load_non_intra_quantiser_matrix: false,
            load_chroma_intra_quantiser_matrix: false,
            load_chroma_non_intra_quantiser_matrix: false,
            intra_quantiser_matrix: [0; 64],
            non_intra_quantiser_matrix: [0; 64],
            chroma_intra_quantiser_matrix: [0; 64],
            chroma_non_intra_quantiser_matrix: [0; 64],
        }
    }
}

/// `VASliceParameterBufferMPEG2`. Accepted but not translated: MPEG-2 descriptors are built from
/// the picture parameters alone.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SliceParameterBufferMpeg2 {
    pub slice_data_size: u32,
    pub slice_data_offset: u32,
    pub slice_data_flag: u32,
    pub macroblock_offset: u32,
    pub slice_horizontal_position: u32,
    pub slice_vertical_position: u32,
    pub quantiser_scale_code: i32,
    pub intra_slice_flag: i32,
}
