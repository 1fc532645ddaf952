// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use enumn::N;

use crate::codec::CodecFrame;
use crate::codec::CodecTranslator;
use crate::codec::FrameInfo;
use crate::codec::TranslateError;
use crate::resolver::resolve_surface;
use crate::resolver::Resolution;
use crate::va::mpeg2::IQMatrixBufferMpeg2;
use crate::va::mpeg2::PictureParameterBufferMpeg2;

/// VBV buffer size reported for every sequence.
pub const MPEG2_VBV_BUFFER_SIZE: u32 = 1024 * 1024;
/// 4:2:0, the only chroma format handled.
pub const MPEG2_CHROMA_FORMAT_420: u8 = 1;

/// Picture coding types, as coded in the picture header.
#[derive(N, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mpeg2SliceType {
    I = 1,
    P = 2,
    B = 3,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Mpeg2Sequence {
    pub horizontal_size: u16,
    pub vertical_size: u16,
    pub vbv_buffer_size: u32,
    pub chroma_format: u8,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mpeg2SliceParams {
    /// `None` for unknown picture coding types.
    pub slice_type: Option<Mpeg2SliceType>,
    pub f_code: [[u8; 2]; 2],
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
    pub forward_ref_index: Resolution<u32>,
    pub backward_ref_index: Resolution<u32>,
}

impl Mpeg2SliceParams {
    fn new(pic: &PictureParameterBufferMpeg2, frame: &FrameInfo) -> Self {
        let ext = &pic.picture_coding_extension;
        let nibble = |shift: u32| ((pic.f_code >> shift) & 0xf) as u8;

        Self {
            slice_type: Mpeg2SliceType::n(pic.picture_coding_type),
            f_code: [[nibble(12), nibble(8)], [nibble(4), nibble(0)]],
            intra_dc_precision: ext.intra_dc_precision,
            picture_structure: ext.picture_structure,
            top_field_first: ext.top_field_first,
            frame_pred_frame_dct: ext.frame_pred_frame_dct,
            concealment_motion_vectors: ext.concealment_motion_vectors,
            q_scale_type: ext.q_scale_type,
            intra_vlc_format: ext.intra_vlc_format,
            alternate_scan: ext.alternate_scan,
            repeat_first_field: ext.repeat_first_field,
            progressive_frame: ext.progressive_frame,
            forward_ref_index: resolve_surface(
                frame.surfaces,
                pic.forward_reference_picture,
                frame.index,
            ),
            backward_ref_index: resolve_surface(
                frame.surfaces,
                pic.backward_reference_picture,
                frame.index,
            ),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mpeg2Quantization {
    pub load_intra_quantiser_matrix: bool,
    pub load_non_intra_quantiser_matrix: bool,
    pub load_chroma_intra_quantiser_matrix: bool,
    pub load_chroma_non_intra_quantiser_matrix: bool,
    pub intra_quantiser_matrix: [u8; 64],
    pub non_intra_quantiser_matrix: [u8; 64],
    pub chroma_intra_quantiser_matrix: [u8; 64],
    pub chroma_non_intra_quantiser_matrix: [u8; 64],
}

impl From<&IQMatrixBufferMpeg2> for Mpeg2Quantization {
    fn from(matrix: &IQMatrixBufferMpeg2) -> Self {
        Self {
            load_intra_quantiser_matrix: matrix.load_intra_quantiser_matrix,
            load_non_intra_quantiser_matrix: matrix.load_non_intra_quantiser_matrix,
            load_chroma_intra_quantiser_matrix: matrix.load_chroma_intra_quantiser_matrix,
            load_chroma_non_intra_quantiser_matrix: matrix.load_chroma_non_intra_quantiser_matrix,
            intra_quantiser_matrix: matrix.intra_quantiser_matrix,
            non_intra_quantiser_matrix: matrix.non_intra_quantiser_matrix,
            chroma_intra_quantiser_matrix: matrix.chroma_intra_quantiser_matrix,
            chroma_non_intra_quantiser_matrix: matrix.chroma_non_intra_quantiser_matrix,
        }
    }
}

/// Descriptor of an MPEG-2 frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mpeg2Frame {
    pub sequence: Mpeg2Sequence,
    pub slice_params: Mpeg2SliceParams,
    pub quantization: Mpeg2Quantization,
}

/// Latest MPEG-2 parameter buffers of the session.
#[derive(Clone, Debug, Default)]
pub struct Mpeg2Snapshot {
    pub picture: Option<PictureParameterBufferMpeg2>,
    pub matrix: Option<IQMatrixBufferMpeg2>,
}

pub struct Mpeg2;

impl CodecTranslator for Mpeg2 {
    type Snapshot = Mpeg2Snapshot;
    type State = ();

    fn translate(
        _: &mut Self::State,
        snapshot: &Self::Snapshot,
        frame: &FrameInfo,
    ) -> Result<CodecFrame, TranslateError> {
        let pic = snapshot
            .picture
            .as_ref()
            .ok_or(TranslateError::MissingPictureParameters)?;
        let matrix = snapshot.matrix.clone().unwrap_or_default();

        Ok(CodecFrame::Mpeg2(Mpeg2Frame {
            sequence: Mpeg2Sequence {
                horizontal_size: pic.horizontal_size,
                vertical_size: pic.vertical_size,
                vbv_buffer_size: MPEG2_VBV_BUFFER_SIZE,
                chroma_format: MPEG2_CHROMA_FORMAT_420,
            },
            slice_params: Mpeg2SliceParams::new(pic, frame),
            quantization: Mpeg2Quantization::from(&matrix),
        }))
    }
}
