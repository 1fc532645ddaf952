// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use crate::dpb::DpbPicture;
use crate::va::SurfaceId;
use crate::va::VA_INVALID_SURFACE;

pub const VA_PICTURE_H264_INVALID: u32 = 0x0000_0001;
pub const VA_PICTURE_H264_TOP_FIELD: u32 = 0x0000_0002;
pub const VA_PICTURE_H264_BOTTOM_FIELD: u32 = 0x0000_0004;
pub const VA_PICTURE_H264_SHORT_TERM_REFERENCE: u32 = 0x0000_0008;
pub const VA_PICTURE_H264_LONG_TERM_REFERENCE: u32 = 0x0000_0010;

/// Number of entries in the `ReferenceFrames` array of the picture parameters.
pub const NUM_REFERENCE_FRAMES: usize = 16;
/// Number of entries in each reference picture list of the slice parameters.
pub const NUM_REF_PIC_LIST_ENTRIES: usize = 32;

/// A picture reference: `VAPictureH264`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PictureH264 {
    pub picture_id: SurfaceId,
    pub frame_idx: u32,
    pub flags: u32,
    pub top_field_order_cnt: i32,
    pub bottom_field_order_cnt: i32,
}

impl PictureH264 {
    /// Returns a reference marked invalid, as used to fill unused list entries.
    pub fn invalid() -> Self {
        Self {
            picture_id: VA_INVALID_SURFACE,
            flags: VA_PICTURE_H264_INVALID,
            ..Default::default()
        }
    }

    pub fn is_long_term(&self) -> bool {
        self.flags & VA_PICTURE_H264_LONG_TERM_REFERENCE != 0
    }
}

impl DpbPicture for PictureH264 {
    fn key(&self) -> SurfaceId {
        self.picture_id
    }

    fn is_null(&self) -> bool {
        self.flags & VA_PICTURE_H264_INVALID != 0
    }

    fn is_reference(&self) -> bool {
        !self.is_null()
    }
}

/// `seq_fields` of `VAPictureParameterBufferH264`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct H264SeqFields {
    pub chroma_format_idc: u8,
    pub residual_colour_transform_flag: bool,
    pub gaps_in_frame_num_value_allowed_flag: bool,
    pub frame_mbs_only_flag: bool,
    pub mb_adaptive_frame_field_flag: bool,
    pub direct_8x8_inference_flag: bool,
    pub min_luma_bi_pred_size8x8: bool,
    pub log2_max_frame_num_minus4: u8,
    pub pic_order_cnt_type: u8,
    pub log2_max_pic_order_cnt_lsb_minus4: u8,
    pub delta_pic_order_always_zero_flag: bool,
}

/// `pic_fields` of `VAPictureParameterBufferH264`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct H264PicFields {
    pub entropy_coding_mode_flag: bool,
    pub weighted_pred_flag: bool,
    pub weighted_bipred_idc: u8,
    pub transform_8x8_mode_flag: bool,
    pub field_pic_flag: bool,
    pub constrained_intra_pred_flag: bool,
    pub pic_order_present_flag: bool,
    pub deblocking_filter_control_present_flag: bool,
    pub redundant_pic_cnt_present_flag: bool,
    pub reference_pic_flag: bool,
}

/// `VAPictureParameterBufferH264`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PictureParameterBufferH264 {
    pub curr_pic: PictureH264,
    pub reference_frames: [PictureH264; NUM_REFERENCE_FRAMES],
    pub picture_width_in_mbs_minus1: u16,
    pub picture_height_in_mbs_minus1: u16,
    pub bit_depth_luma_minus8: u8,
    pub bit_depth_chroma_minus8: u8,
    pub num_ref_frames: u8,
    pub seq_fields: H264SeqFields,
    pub pic_init_qp_minus26: i8,
    pub pic_init_qs_minus26: i8,
    pub chroma_qp_index_offset: i8,
    pub second_chroma_qp_index_offset: i8,
    pub pic_fields: H264PicFields,
    pub frame_num: u16,
}

impl Default for PictureParameterBufferH264 {
    fn default() -> Self {
        Self {
            curr_pic: Default::default(),
            reference_frames: [PictureH264::invalid(); NUM_REFERENCE_FRAMES],
            picture_width_in_mbs_minus1: 0,
            picture_height_in_mbs_minus1: 0,
            bit_depth_luma_minus8: 0,
            bit_depth_chroma_minus8: 0,
            num_ref_frames: 0,
            seq_fields: Default::default(),
            pic_init_qp_minus26: 0,
            pic_init_qs_minus26: 0,
            chroma_qp_index_offset: 0,
            second_chroma_qp_index_offset: 0,
            pic_fields: Default::default(),
            frame_num: 0,
        }
    }
}

impl PictureParameterBufferH264 {
    /// The reference frames the API declared as in use, i.e. the first `num_ref_frames` entries.
    pub fn active_reference_frames(&self) -> &[PictureH264] {
        let count = usize::from(self.num_ref_frames).min(NUM_REFERENCE_FRAMES);
        &self.reference_frames[..count]
    }
}

/// `VAIQMatrixBufferH264`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IQMatrixBufferH264 {
    pub scaling_list_4x4: [[u8; 16]; 6],
    pub scaling_list_8x8: [[u8; 64]; 2],
}

impl Default for IQMatrixBufferH264 {
    fn default() -> Self {
        Self {
            scaling_list_4x4: [[0; 16]; 6],
            scaling_list_8x8: [[0; 64]; 2],
        }
    }
}

/// `VASliceParameterBufferH264`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SliceParameterBufferH264 {
    pub slice_data_size: u32,
    pub slice_data_offset: u32,
    pub slice_data_flag: u32,
    pub slice_data_bit_offset: u16,
    pub first_mb_in_slice: u16,
    pub slice_type: u8,
    pub direct_spatial_mv_pred_flag: bool,
    pub num_ref_idx_l0_active_minus1: u8,
    pub num_ref_idx_l1_active_minus1: u8,
    pub cabac_init_idc: u8,
    pub slice_qp_delta: i8,
    pub disable_deblocking_filter_idc: u8,
    pub slice_alpha_c0_offset_div2: i8,
    pub slice_beta_offset_div2: i8,
    pub ref_pic_list0: [PictureH264; NUM_REF_PIC_LIST_ENTRIES],
    pub ref_pic_list1: [PictureH264; NUM_REF_PIC_LIST_ENTRIES],
    pub luma_log2_weight_denom: u8,
    pub chroma_log2_weight_denom: u8,
    pub luma_weight_l0_flag: bool,
    pub luma_weight_l0: [i16; 32],
    pub luma_offset_l0: [i16; 32],
    pub chroma_weight_l0_flag: bool,
    pub chroma_weight_l0: [[i16; 2]; 32],
    pub chroma_offset_l0: [[i16; 2]; 32],
    pub luma_weight_l1_flag: bool,
    pub luma_weight_l1: [i16; 32],
    pub luma_offset_l1: [i16; 32],
    pub chroma_weight_l1_flag: bool,
    pub chroma_weight_l1: [[i16; 2]; 32],
    pub chroma_offset_l1: [[i16; 2]; 32],
}

impl Default for SliceParameterBufferH264 {
    fn default() -> Self {
        Self {
            slice_data_size: 0,
            slice_data_offset: 0,
            slice_data_flag: 0,
            slice_data_bit_offset: 0,
            first_mb_in_slice: 0,
            slice_type: 0,
            direct_spatial_mv_pred_flag: false,
            num_ref_idx_l0_active_minus1: 0,
            num_ref_idx_l1_active_minus1: 0,
            cabac_init_idc: 0,
            slice_qp_delta: 0,
            disable_deblocking_filter_idc: 0,
            slice_alpha_c0_offset_div2: 0,
            slice_beta_offset_div2: 0,
            ref_pic_list0: [PictureH264::invalid(); NUM_REF_PIC_LIST_ENTRIES],
            ref_pic_list1: [PictureH264::invalid(); NUM_REF_PIC_LIST_ENTRIES],
            luma_log2_weight_denom: 0,
            chroma_log2_weight_denom: 0,
            luma_weight_l0_flag: false,
            luma_weight_l0: [0; 32],
            luma_offset_l0: [0; 32],
            chroma_weight_l0_flag: false,
            chroma_weight_l0: [[0; 2]; 32],
            chroma_offset_l0: [[0; 2]; 32],
            luma_weight_l1_flag: false,
            luma_weight_l1: [0; 32],
            luma_offset_l1: [0; 32],
            chroma_weight_l1_flag: false,
            chroma_weight_l1: [[0; 2]; 32],
            chroma_offset_l1: [[0; 2]; 32],
        }
    }
}
