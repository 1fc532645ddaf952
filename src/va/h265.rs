// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use crate::dpb::DpbPicture;
use crate::va::SurfaceId;
use crate::va::VA_INVALID_SURFACE;

pub const VA_PICTURE_HEVC_INVALID: u32 = 0x0000_0001;
pub const VA_PICTURE_HEVC_FIELD_PIC: u32 = 0x0000_0002;
pub const VA_PICTURE_HEVC_BOTTOM_FIELD: u32 = 0x0000_0004;
pub const VA_PICTURE_HEVC_LONG_TERM_REFERENCE: u32 = 0x0000_0008;
pub const VA_PICTURE_HEVC_RPS_ST_CURR_BEFORE: u32 = 0x0000_0010;
pub const VA_PICTURE_HEVC_RPS_ST_CURR_AFTER: u32 = 0x0000_0020;
pub const VA_PICTURE_HEVC_RPS_LT_CURR: u32 = 0x0000_0040;

/// Number of entries in the `ReferenceFrames` array of the picture parameters.
pub const NUM_REFERENCE_FRAMES: usize = 15;

/// A picture reference: `VAPictureHEVC`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PictureHevc {
    pub picture_id: SurfaceId,
    pub pic_order_cnt: i32,
    pub flags: u32,
}

impl PictureHevc {
    /// Returns a reference marked invalid, as used to fill unused entries.
    pub fn invalid() -> Self {
        Self {
            picture_id: VA_INVALID_SURFACE,
            pic_order_cnt: 0,
            flags: VA_PICTURE_HEVC_INVALID,
        }
    }

    pub fn is_field_pic(&self) -> bool {
        self.flags & VA_PICTURE_HEVC_FIELD_PIC != 0
    }

    pub fn is_bottom_field(&self) -> bool {
        self.flags & VA_PICTURE_HEVC_BOTTOM_FIELD != 0
    }
}

impl DpbPicture for PictureHevc {
    fn key(&self) -> SurfaceId {
        self.picture_id
    }

    fn is_null(&self) -> bool {
        self.picture_id == VA_INVALID_SURFACE || self.flags & VA_PICTURE_HEVC_INVALID != 0
    }

    fn is_reference(&self) -> bool {
        !self.is_null()
    }
}

/// `pic_fields` of `VAPictureParameterBufferHEVC`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HevcPicFields {
    pub chroma_format_idc: u8,
    pub separate_colour_plane_flag: bool,
    pub pcm_enabled_flag: bool,
    pub scaling_list_enabled_flag: bool,
    pub transform_skip_enabled_flag: bool,
    pub amp_enabled_flag: bool,
    pub strong_intra_smoothing_enabled_flag: bool,
    pub sign_data_hiding_enabled_flag: bool,
    pub constrained_intra_pred_flag: bool,
    pub cu_qp_delta_enabled_flag: bool,
    pub weighted_pred_flag: bool,
    pub weighted_bipred_flag: bool,
    pub transquant_bypass_enabled_flag: bool,
    pub tiles_enabled_flag: bool,
    pub entropy_coding_sync_enabled_flag: bool,
    pub pps_loop_filter_across_slices_enabled_flag: bool,
    pub loop_filter_across_tiles_enabled_flag: bool,
    pub pcm_loop_filter_disabled_flag: bool,
    pub no_pic_reordering_flag: bool,
    pub no_bi_pred_flag: bool,
}

/// `slice_parsing_fields` of `VAPictureParameterBufferHEVC`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HevcSliceParsingFields {
    pub lists_modification_present_flag: bool,
    pub long_term_ref_pics_present_flag: bool,
    pub sps_temporal_mvp_enabled_flag: bool,
    pub cabac_init_present_flag: bool,
    pub output_flag_present_flag: bool,
    pub dependent_slice_segments_enabled_flag: bool,
    pub pps_slice_chroma_qp_offsets_present_flag: bool,
    pub sample_adaptive_offset_enabled_flag: bool,
    pub deblocking_filter_override_enabled_flag: bool,
    pub pps_disable_deblocking_filter_flag: bool,
    pub slice_segment_header_extension_present_flag: bool,
    pub rap_pic_flag: bool,
    pub idr_pic_flag: bool,
    pub intra_pic_flag: bool,
}

/// `VAPictureParameterBufferHEVC`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PictureParameterBufferHevc {
    pub curr_pic: PictureHevc,
    pub reference_frames: [PictureHevc; NUM_REFERENCE_FRAMES],
    pub pic_width_in_luma_samples: u16,
    pub pic_height_in_luma_samples: u16,
    pub pic_fields: HevcPicFields,
    pub sps_max_dec_pic_buffering_minus1: u8,
    pub bit_depth_luma_minus8: u8,
    pub bit_depth_chroma_minus8: u8,
    pub pcm_sample_bit_depth_luma_minus1: u8,
    pub pcm_sample_bit_depth_chroma_minus1: u8,
    pub log2_min_luma_coding_block_size_minus3: u8,
    pub log2_diff_max_min_luma_coding_block_size: u8,
    pub log2_min_transform_block_size_minus2: u8,
    pub log2_diff_max_min_transform_block_size: u8,
    pub log2_min_pcm_luma_coding_block_size_minus3: u8,
    pub log2_diff_max_min_pcm_luma_coding_block_size: u8,
    pub max_transform_hierarchy_depth_intra: u8,
    pub max_transform_hierarchy_depth_inter: u8,
    pub init_qp_minus26: i8,
    pub diff_cu_qp_delta_depth: u8,
    pub pps_cb_qp_offset: i8,
    pub pps_cr_qp_offset: i8,
    pub log2_parallel_merge_level_minus2: u8,
    pub num_tile_columns_minus1: u8,
    pub num_tile_rows_minus1: u8,
    pub column_width_minus1: [u16; 19],
    pub row_height_minus1: [u16; 21],
    pub slice_parsing_fields: HevcSliceParsingFields,
    pub log2_max_pic_order_cnt_lsb_minus4: u8,
    pub num_short_term_ref_pic_sets: u8,
    pub num_long_term_ref_pic_sps: u8,
    pub num_ref_idx_l0_default_active_minus1: u8,
    pub num_ref_idx_l1_default_active_minus1: u8,
    pub pps_beta_offset_div2: i8,
    pub pps_tc_offset_div2: i8,
    pub num_extra_slice_header_bits: u8,
    pub st_rps_bits: u32,
}

impl Default for PictureParameterBufferHevc {
    fn default() -> Self {
        Self {
            curr_pic: Default::default(),
            reference_frames: [PictureHevc::invalid(); NUM_REFERENCE_FRAMES],
            pic_width_in_luma_samples: 0,
            pic_height_in_luma_samples: 0,
            pic_fields: Default::default(),
            sps_max_dec_pic_buffering_minus1: 0,
            bit_depth_luma_minus8: 0,
            bit_depth_chroma_minus8: 0,
            pcm_sample_bit_depth_luma_minus1: 0,
            pcm_sample_bit_depth_chroma_minus1: 0,
            log2_min_luma_coding_block_size_minus3: 0,
            log2_diff_max_min_luma_coding_block_size: 0,
            log2_min_transform_block_size_minus2: 0,
            log2_diff_max_min_transform_block_size: 0,
            log2_min_pcm_luma_coding_block_size_minus3: 0,
            log2_diff_max_min_pcm_luma_coding_block_size: 0,
            max_transform_hierarchy_depth_intra: 0,
            max_transform_hierarchy_depth_inter: 0,
            init_qp_minus26: 0,
            diff_cu_qp_delta_depth: 0,
            pps_cb_qp_offset: 0,
            pps_cr_qp_offset: 0,
            log2_parallel_merge_level_minus2: 0,
            num_tile_columns_minus1: 0,
            num_tile_rows_minus1: 0,
            column_width_minus1: [0; 19],
            row_height_minus1: [0; 21],
            slice_parsing_fields: Default::default(),
            log2_max_pic_order_cnt_lsb_minus4: 0,
            num_short_term_ref_pic_sets: 0,
            num_long_term_ref_pic_sps: 0,
            num_ref_idx_l0_default_active_minus1: 0,
            num_ref_idx_l1_default_active_minus1: 0,
            pps_beta_offset_div2: 0,
            pps_tc_offset_div2: 0,
            num_extra_slice_header_bits: 0,
            st_rps_bits: 0,
        }
    }
}

/// `LongSliceFlags` of `VASliceParameterBufferHEVC`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HevcLongSliceFlags {
    pub last_slice_of_pic: bool,
    pub dependent_slice_segment_flag: bool,
    pub slice_type: u8,
    pub color_plane_id: u8,
    pub slice_sao_luma_flag: bool,
    pub slice_sao_chroma_flag: bool,
    pub mvd_l1_zero_flag: bool,
    pub cabac_init_flag: bool,
    pub slice_temporal_mvp_enabled_flag: bool,
    pub slice_deblocking_filter_disabled_flag: bool,
    pub collocated_from_l0_flag: bool,
    pub slice_loop_filter_across_slices_enabled_flag: bool,
}

/// `VASliceParameterBufferHEVC`.
///
/// `ref_pic_list` entries are indices into the `reference_frames` of the picture parameters, with
/// `0xff` marking an unused entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SliceParameterBufferHevc {
    pub slice_data_size: u32,
    pub slice_data_offset: u32,
    pub slice_data_flag: u32,
    pub slice_data_byte_offset: u32,
    pub slice_segment_address: u32,
    pub ref_pic_list: [[u8; 15]; 2],
    pub long_slice_flags: HevcLongSliceFlags,
    pub collocated_ref_idx: u8,
    pub num_ref_idx_l0_active_minus1: u8,
    pub num_ref_idx_l1_active_minus1: u8,
    pub slice_qp_delta: i8,
    pub slice_cb_qp_offset: i8,
    pub slice_cr_qp_offset: i8,
    pub slice_beta_offset_div2: i8,
    pub slice_tc_offset_div2: i8,
    pub luma_log2_weight_denom: u8,
    pub delta_chroma_log2_weight_denom: i8,
    pub delta_luma_weight_l0: [i8; 15],
    pub luma_offset_l0: [i8; 15],
    pub delta_chroma_weight_l0: [[i8; 2]; 15],
    pub chroma_offset_l0: [[i8; 2]; 15],
    pub delta_luma_weight_l1: [i8; 15],
    pub luma_offset_l1: [i8; 15],
    pub delta_chroma_weight_l1: [[i8; 2]; 15],
    pub chroma_offset_l1: [[i8; 2]; 15],
    pub five_minus_max_num_merge_cand: u8,
    pub num_entry_point_offsets: u16,
    pub entry_offset_to_subset_array: u16,
    pub slice_data_num_emu_prevention_bytes: u16,
}

impl Default for SliceParameterBufferHevc {
    fn default() -> Self {
        Self {
            slice_data_size: 0,
            slice_data_offset: 0,
            slice_data_flag: 0,
            slice_data_byte_offset: 0,
            slice_segment_address: 0,
            ref_pic_list: [[0xff; 15]; 2],
            long_slice_flags: Default::default(),
            collocated_ref_idx: 0,
            num_ref_idx_l0_active_minus1: 0,
            num_ref_idx_l1_active_minus1: 0,
            slice_qp_delta: 0,
            slice_cb_qp_offset: 0,
            slice_cr_qp_offset: 0,
            slice_beta_offset_div2: 0,
            slice_tc_offset_div2: 0,
            luma_log2_weight_denom: 0,
            delta_chroma_log2_weight_denom: 0,
            delta_luma_weight_l0: [0; 15],
            luma_offset_l0: [0; 15],
            delta_chroma_weight_l0: [[0; 2]; 15],
            chroma_offset_l0: [[0; 2]; 15],
            delta_luma_weight_l1: [0; 15],
            luma_offset_l1: [0; 15],
            delta_chroma_weight_l1: [[0; 2]; 15],
            chroma_offset_l1: [[0; 2]; 15],
            five_minus_max_num_merge_cand: 0,
            num_entry_point_offsets: 0,
            entry_offset_to_subset_array: 0,
            slice_data_num_emu_prevention_bytes: 0,
        }
    }
}
