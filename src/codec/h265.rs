// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use bitreader::BitReader;
use bytes::Bytes;
use enumn::N;
use log::debug;
use log::warn;

use crate::codec::copy_active;
use crate::codec::CodecFrame;
use crate::codec::CodecTranslator;
use crate::codec::FrameInfo;
use crate::codec::TranslateError;
use crate::dpb::Dpb;
use crate::dpb::DpbPicture;
use crate::resolver::resolve;
use crate::resolver::Resolution;
use crate::va::h265::PictureHevc;
use crate::va::h265::PictureParameterBufferHevc;
use crate::va::h265::SliceParameterBufferHevc;
use crate::va::h265::NUM_REFERENCE_FRAMES;
use crate::va::h265::VA_PICTURE_HEVC_RPS_LT_CURR;
use crate::va::h265::VA_PICTURE_HEVC_RPS_ST_CURR_AFTER;
use crate::va::h265::VA_PICTURE_HEVC_RPS_ST_CURR_BEFORE;
use crate::va::SurfaceId;

/// Number of entries of the reference index and prediction weight arrays.
pub const H265_REF_NUM_MAX: usize = 16;

/// Slice types as coded in the slice segment header.
#[derive(N, Clone, Copy, Debug, PartialEq, Eq)]
pub enum H265SliceType {
    B = 0,
    P = 1,
    I = 2,
}

/// NAL unit types that carry slice segments, from Table 7-1.
#[derive(N, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SliceNaluType {
    TrailN = 0,
    TrailR = 1,
    TsaN = 2,
    TsaR = 3,
    StsaN = 4,
    StsaR = 5,
    RadlN = 6,
    RadlR = 7,
    RaslN = 8,
    RaslR = 9,
    BlaWLp = 16,
    BlaWRadl = 17,
    BlaNLp = 18,
    IdrWRadl = 19,
    IdrNLp = 20,
    CraNut = 21,
}

/// The two-byte NAL unit header preceding the slice segment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NaluHeader {
    pub nal_unit_type: u8,
    pub nuh_layer_id: u8,
    pub nuh_temporal_id_plus1: u8,
}

impl NaluHeader {
    /// Parses the header from the first two bytes of `data`.
    pub fn parse(data: &[u8]) -> anyhow::Result<Self> {
        let mut r = BitReader::new(data);

        // Skip forbidden_zero_bit
        r.skip(1)?;

        Ok(Self {
            nal_unit_type: r.read_u8(6)?,
            nuh_layer_id: r.read_u8(6)?,
            nuh_temporal_id_plus1: r.read_u8(3)?,
        })
    }

    pub fn slice_type(&self) -> Option<SliceNaluType> {
        SliceNaluType::n(self.nal_unit_type)
    }
}

/// Recovers the bit offset of the slice segment data within the slice data buffer.
///
/// The API only gives the byte offset of the slice segment data, rounded up. The data starts
/// right after the stop bit ending the header, which is the lowest set bit of the preceding
/// byte.
pub fn slice_data_bit_offset(
    data: &[u8],
    slice: &SliceParameterBufferHevc,
) -> Result<u32, TranslateError> {
    let offset = slice.slice_data_offset as usize + slice.slice_data_byte_offset as usize;
    if offset == 0 || offset > data.len() {
        return Err(TranslateError::SliceDataOutOfBounds {
            offset,
            len: data.len(),
        });
    }

    // Position of the stop bit, counting from 1. A zero byte yields 9.
    let stop_bit = data[offset - 1].trailing_zeros() + 1;

    Ok((offset as u32).wrapping_mul(8).saturating_sub(stop_bit))
}

fn parse_nalu_header(
    data: &[u8],
    slice: &SliceParameterBufferHevc,
) -> Result<NaluHeader, TranslateError> {
    let start = slice.slice_data_offset as usize;
    let out_of_bounds = || TranslateError::SliceDataOutOfBounds {
        offset: start,
        len: data.len(),
    };

    let header = data.get(start..start + 2).ok_or_else(out_of_bounds)?;
    NaluHeader::parse(header).map_err(|_| out_of_bounds())
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct H265Sps {
    pub chroma_format_idc: u8,
    pub separate_colour_plane_flag: bool,
    pub pic_width_in_luma_samples: u16,
    pub pic_height_in_luma_samples: u16,
    pub bit_depth_luma_minus8: u8,
    pub bit_depth_chroma_minus8: u8,
    pub log2_max_pic_order_cnt_lsb_minus4: u8,
    pub sps_max_dec_pic_buffering_minus1: u8,
    pub sps_max_num_reorder_pics: u8,
    pub sps_max_latency_increase_plus1: u8,
    pub log2_min_luma_coding_block_size_minus3: u8,
    pub log2_diff_max_min_luma_coding_block_size: u8,
    pub log2_min_luma_transform_block_size_minus2: u8,
    pub log2_diff_max_min_luma_transform_block_size: u8,
    pub max_transform_hierarchy_depth_inter: u8,
    pub max_transform_hierarchy_depth_intra: u8,
    pub scaling_list_enabled_flag: bool,
    pub amp_enabled_flag: bool,
    pub sample_adaptive_offset_enabled_flag: bool,
    pub pcm_enabled_flag: bool,
    pub pcm_sample_bit_depth_luma_minus1: u8,
    pub pcm_sample_bit_depth_chroma_minus1: u8,
    pub log2_min_pcm_luma_coding_block_size_minus3: u8,
    pub log2_diff_max_min_pcm_luma_coding_block_size: u8,
    pub pcm_loop_filter_disabled_flag: bool,
    pub num_short_term_ref_pic_sets: u8,
    pub long_term_ref_pics_present_flag: bool,
    pub num_long_term_ref_pics_sps: u8,
    pub sps_temporal_mvp_enabled_flag: bool,
    pub strong_intra_smoothing_enabled_flag: bool,
}

impl From<&PictureParameterBufferHevc> for H265Sps {
    fn from(pic: &PictureParameterBufferHevc) -> Self {
        let fields = &pic.pic_fields;
        let parsing = &pic.slice_parsing_fields;
        Self {
            chroma_format_idc: fields.chroma_format_idc,
            separate_colour_plane_flag: fields.separate_colour_plane_flag,
            pic_width_in_luma_samples: pic.pic_width_in_luma_samples,
            pic_height_in_luma_samples: pic.pic_height_in_luma_samples,
            bit_depth_luma_minus8: pic.bit_depth_luma_minus8,
            bit_depth_chroma_minus8: pic.bit_depth_chroma_minus8,
            log2_max_pic_order_cnt_lsb_minus4: pic.log2_max_pic_order_cnt_lsb_minus4,
            sps_max_dec_pic_buffering_minus1: pic.sps_max_dec_pic_buffering_minus1,
            // Not provided by the API.
            sps_max_num_reorder_pics: 0,
            sps_max_latency_increase_plus1: 0,
            log2_min_luma_coding_block_size_minus3: pic.log2_min_luma_coding_block_size_minus3,
            log2_diff_max_min_luma_coding_block_size: pic.log2_diff_max_min_luma_coding_block_size,
            log2_min_luma_transform_block_size_minus2: pic.log2_min_transform_block_size_minus2,
            log2_diff_max_min_luma_transform_block_size: pic.log2_diff_max_min_transform_block_size,
            max_transform_hierarchy_depth_inter: pic.max_transform_hierarchy_depth_inter,
            max_transform_hierarchy_depth_intra: pic.max_transform_hierarchy_depth_intra,
            scaling_list_enabled_flag: fields.scaling_list_enabled_flag,
            amp_enabled_flag: fields.amp_enabled_flag,
            sample_adaptive_offset_enabled_flag: parsing.sample_adaptive_offset_enabled_flag,
            pcm_enabled_flag: fields.pcm_enabled_flag,
            pcm_sample_bit_depth_luma_minus1: pic.pcm_sample_bit_depth_luma_minus1,
            pcm_sample_bit_depth_chroma_minus1: pic.pcm_sample_bit_depth_chroma_minus1,
            log2_min_pcm_luma_coding_block_size_minus3: pic
                .log2_min_pcm_luma_coding_block_size_minus3,
            log2_diff_max_min_pcm_luma_coding_block_size: pic
                .log2_diff_max_min_pcm_luma_coding_block_size,
            pcm_loop_filter_disabled_flag: fields.pcm_loop_filter_disabled_flag,
            num_short_term_ref_pic_sets: pic.num_short_term_ref_pic_sets,
            long_term_ref_pics_present_flag: parsing.long_term_ref_pics_present_flag,
            num_long_term_ref_pics_sps: pic.num_long_term_ref_pic_sps,
            sps_temporal_mvp_enabled_flag: parsing.sps_temporal_mvp_enabled_flag,
            strong_intra_smoothing_enabled_flag: fields.strong_intra_smoothing_enabled_flag,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct H265Pps {
    pub dependent_slice_segment_flag: bool,
    pub output_flag_present_flag: bool,
    pub num_extra_slice_header_bits: u8,
    pub sign_data_hiding_enabled_flag: bool,
    pub cabac_init_present_flag: bool,
    pub init_qp_minus26: i8,
    pub constrained_intra_pred_flag: bool,
    pub transform_skip_enabled_flag: bool,
    pub cu_qp_delta_enabled_flag: bool,
    pub diff_cu_qp_delta_depth: u8,
    pub pps_cb_qp_offset: i8,
    pub pps_cr_qp_offset: i8,
    pub pps_slice_chroma_qp_offsets_present_flag: bool,
    pub weighted_pred_flag: bool,
    pub weighted_bipred_flag: bool,
    pub transquant_bypass_enabled_flag: bool,
    pub tiles_enabled_flag: bool,
    pub entropy_coding_sync_enabled_flag: bool,
    pub num_tile_columns_minus1: u8,
    pub num_tile_rows_minus1: u8,
    pub column_width_minus1: [u16; 19],
    pub row_height_minus1: [u16; 21],
    pub loop_filter_across_tiles_enabled_flag: bool,
    pub pps_loop_filter_across_slices_enabled_flag: bool,
    pub deblocking_filter_override_enabled_flag: bool,
    pub pps_disable_deblocking_filter_flag: bool,
    pub pps_beta_offset_div2: i8,
    pub pps_tc_offset_div2: i8,
    pub lists_modification_present_flag: bool,
    pub log2_parallel_merge_level_minus2: u8,
}

impl H265Pps {
    fn new(pic: &PictureParameterBufferHevc, slice: &SliceParameterBufferHevc) -> Self {
        let fields = &pic.pic_fields;
        let parsing = &pic.slice_parsing_fields;
        Self {
            dependent_slice_segment_flag: slice.long_slice_flags.dependent_slice_segment_flag,
            output_flag_present_flag: parsing.output_flag_present_flag,
            num_extra_slice_header_bits: pic.num_extra_slice_header_bits,
            sign_data_hiding_enabled_flag: fields.sign_data_hiding_enabled_flag,
            cabac_init_present_flag: parsing.cabac_init_present_flag,
            init_qp_minus26: pic.init_qp_minus26,
            constrained_intra_pred_flag: fields.constrained_intra_pred_flag,
            transform_skip_enabled_flag: fields.transform_skip_enabled_flag,
            cu_qp_delta_enabled_flag: fields.cu_qp_delta_enabled_flag,
            diff_cu_qp_delta_depth: pic.diff_cu_qp_delta_depth,
            pps_cb_qp_offset: pic.pps_cb_qp_offset,
            pps_cr_qp_offset: pic.pps_cr_qp_offset,
            pps_slice_chroma_qp_offsets_present_flag: parsing
                .pps_slice_chroma_qp_offsets_present_flag,
            weighted_pred_flag: fields.weighted_pred_flag,
            weighted_bipred_flag: fields.weighted_bipred_flag,
            transquant_bypass_enabled_flag: fields.transquant_bypass_enabled_flag,
            tiles_enabled_flag: fields.tiles_enabled_flag,
            entropy_coding_sync_enabled_flag: fields.entropy_coding_sync_enabled_flag,
            num_tile_columns_minus1: pic.num_tile_columns_minus1,
            num_tile_rows_minus1: pic.num_tile_rows_minus1,
            column_width_minus1: pic.column_width_minus1,
            row_height_minus1: pic.row_height_minus1,
            loop_filter_across_tiles_enabled_flag: fields.loop_filter_across_tiles_enabled_flag,
            pps_loop_filter_across_slices_enabled_flag: fields
                .pps_loop_filter_across_slices_enabled_flag,
            deblocking_filter_override_enabled_flag: parsing
                .deblocking_filter_override_enabled_flag,
            pps_disable_deblocking_filter_flag: parsing.pps_disable_deblocking_filter_flag,
            pps_beta_offset_div2: pic.pps_beta_offset_div2,
            pps_tc_offset_div2: pic.pps_tc_offset_div2,
            lists_modification_present_flag: parsing.lists_modification_present_flag,
            log2_parallel_merge_level_minus2: pic.log2_parallel_merge_level_minus2,
        }
    }
}

/// Reference picture set a DPB entry belongs to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum H265Rps {
    #[default]
    None,
    StCurrBefore,
    StCurrAfter,
    LtCurr,
}

impl H265Rps {
    fn from_flags(flags: u32) -> Self {
        if flags & VA_PICTURE_HEVC_RPS_ST_CURR_BEFORE != 0 {
            H265Rps::StCurrBefore
        } else if flags & VA_PICTURE_HEVC_RPS_ST_CURR_AFTER != 0 {
            H265Rps::StCurrAfter
        } else if flags & VA_PICTURE_HEVC_RPS_LT_CURR != 0 {
            H265Rps::LtCurr
        } else {
            H265Rps::None
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct H265DpbEntry {
    pub timestamp: u32,
    pub rps: H265Rps,
    pub field_pic: bool,
    pub pic_order_cnt: [i32; 2],
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct H265PredWeightTable {
    pub luma_log2_weight_denom: u8,
    pub delta_chroma_log2_weight_denom: i8,
    pub delta_luma_weight_l0: [i8; H265_REF_NUM_MAX],
    pub luma_offset_l0: [i8; H265_REF_NUM_MAX],
    pub delta_chroma_weight_l0: [[i8; 2]; H265_REF_NUM_MAX],
    pub chroma_offset_l0: [[i8; 2]; H265_REF_NUM_MAX],
    /// Zero unless this is a B slice.
    pub delta_luma_weight_l1: [i8; H265_REF_NUM_MAX],
    pub luma_offset_l1: [i8; H265_REF_NUM_MAX],
    pub delta_chroma_weight_l1: [[i8; 2]; H265_REF_NUM_MAX],
    pub chroma_offset_l1: [[i8; 2]; H265_REF_NUM_MAX],
}

impl H265PredWeightTable {
    fn new(slice: &SliceParameterBufferHevc, is_b: bool) -> Self {
        let l0 = usize::from(slice.num_ref_idx_l0_active_minus1) + 1;
        let mut table = Self {
            luma_log2_weight_denom: slice.luma_log2_weight_denom,
            delta_chroma_log2_weight_denom: slice.delta_chroma_log2_weight_denom,
            delta_luma_weight_l0: copy_active(&slice.delta_luma_weight_l0, l0),
            luma_offset_l0: copy_active(&slice.luma_offset_l0, l0),
            delta_chroma_weight_l0: copy_active(&slice.delta_chroma_weight_l0, l0),
            chroma_offset_l0: copy_active(&slice.chroma_offset_l0, l0),
            ..Default::default()
        };

        if is_b {
            let l1 = usize::from(slice.num_ref_idx_l1_active_minus1) + 1;
            table.delta_luma_weight_l1 = copy_active(&slice.delta_luma_weight_l1, l1);
            table.luma_offset_l1 = copy_active(&slice.luma_offset_l1, l1);
            table.delta_chroma_weight_l1 = copy_active(&slice.delta_chroma_weight_l1, l1);
            table.chroma_offset_l1 = copy_active(&slice.chroma_offset_l1, l1);
        }

        table
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct H265SliceParams {
    pub bit_size: u32,
    pub data_bit_offset: u32,
    pub nal_unit_type: u8,
    pub nuh_temporal_id_plus1: u8,
    /// `None` for slice types outside of B, P and I.
    pub slice_type: Option<H265SliceType>,
    pub colour_plane_id: u8,
    pub slice_pic_order_cnt: i32,
    pub slice_sao_luma_flag: bool,
    pub slice_sao_chroma_flag: bool,
    pub slice_temporal_mvp_enabled_flag: bool,
    pub num_ref_idx_l0_active_minus1: u8,
    pub num_ref_idx_l1_active_minus1: u8,
    pub mvd_l1_zero_flag: bool,
    pub cabac_init_flag: bool,
    pub collocated_from_l0_flag: bool,
    pub collocated_ref_idx: u8,
    pub five_minus_max_num_merge_cand: u8,
    pub use_integer_mv_flag: bool,
    pub slice_qp_delta: i8,
    pub slice_cb_qp_offset: i8,
    pub slice_cr_qp_offset: i8,
    pub slice_act_y_qp_offset: i8,
    pub slice_act_cb_qp_offset: i8,
    pub slice_act_cr_qp_offset: i8,
    pub slice_deblocking_filter_disabled_flag: bool,
    pub slice_beta_offset_div2: i8,
    pub slice_tc_offset_div2: i8,
    pub slice_loop_filter_across_slices_enabled_flag: bool,
    /// 0 for a frame, 1 for a top field, 2 for a bottom field.
    pub pic_struct: u8,
    /// References usable by the slice, empty for I slices.
    pub dpb: Vec<H265DpbEntry>,
    pub num_active_dpb_entries: u8,
    /// `H265_REF_NUM_MAX` entries, or none if the slice has no list 0.
    pub ref_idx_l0: Vec<Resolution<u8>>,
    /// `H265_REF_NUM_MAX` entries, or none unless this is a B slice.
    pub ref_idx_l1: Vec<Resolution<u8>>,
    pub num_rps_poc_st_curr_before: u8,
    pub num_rps_poc_st_curr_after: u8,
    pub num_rps_poc_lt_curr: u8,
    /// `None` for I slices.
    pub pred_weight_table: Option<H265PredWeightTable>,
}

impl H265SliceParams {
    pub fn is_intra(&self) -> bool {
        self.slice_type == Some(H265SliceType::I)
    }

    pub fn is_b(&self) -> bool {
        self.slice_type == Some(H265SliceType::B)
    }
}

/// Descriptor of an H.265 frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct H265Frame {
    pub sps: H265Sps,
    pub pps: H265Pps,
    pub slice_params: H265SliceParams,
}

/// Latest H.265 parameter buffers of the session.
#[derive(Clone, Debug, Default)]
pub struct H265Snapshot {
    pub picture: Option<PictureParameterBufferHevc>,
    pub slice: Option<SliceParameterBufferHevc>,
    /// Slice data buffer the slice parameters' offsets refer to.
    pub slice_data: Bytes,
}

fn pic_struct(curr_pic: &PictureHevc) -> u8 {
    match (curr_pic.is_field_pic(), curr_pic.is_bottom_field()) {
        (false, _) => 0,
        (true, false) => 1,
        (true, true) => 2,
    }
}

/// Builds the reference list `list` of `slice`, resolving each entry to its position in the
/// slice DPB made of `dpb_keys`.
fn resolve_ref_list(
    pic: &PictureParameterBufferHevc,
    slice: &SliceParameterBufferHevc,
    list: usize,
    num_active_minus1: u8,
    dpb_keys: &[SurfaceId],
) -> Vec<Resolution<u8>> {
    let count = (usize::from(num_active_minus1) + 1).min(NUM_REFERENCE_FRAMES);
    let mut refs: Vec<_> = slice.ref_pic_list[list][..count]
        .iter()
        .map(|&idx| match pic.reference_frames.get(usize::from(idx)) {
            Some(picture) => resolve(picture, |key| dpb_keys.iter().position(|k| *k == key)),
            None => Resolution::Invalid,
        })
        .collect();
    refs.resize(H265_REF_NUM_MAX, Resolution::Invalid);
    refs
}

pub struct H265;

impl CodecTranslator for H265 {
    type Snapshot = H265Snapshot;
    type State = Dpb<PictureHevc>;

    fn translate(
        dpb: &mut Self::State,
        snapshot: &Self::Snapshot,
        frame: &FrameInfo,
    ) -> Result<CodecFrame, TranslateError> {
        let pic = snapshot
            .picture
            .as_ref()
            .ok_or(TranslateError::MissingPictureParameters)?;
        let slice = snapshot
            .slice
            .as_ref()
            .ok_or(TranslateError::MissingSliceParameters)?;

        let nalu = parse_nalu_header(&snapshot.slice_data, slice)?;
        let data_bit_offset = slice_data_bit_offset(&snapshot.slice_data, slice)?;
        if nalu.slice_type().is_none() {
            warn!(
                "NAL unit type {} does not carry a slice segment",
                nalu.nal_unit_type
            );
        }

        let output_slot = dpb.reserve_output_slot(pic.curr_pic.picture_id)?;
        let update = dpb.begin_frame_update(&pic.reference_frames, |r| {
            frame
                .surfaces
                .picture_index(r.picture_id)
                .unwrap_or(frame.index)
        });
        if let Err(e) = update {
            dpb.release(output_slot);
            return Err(e.into());
        }

        let flags = &slice.long_slice_flags;
        let slice_type = H265SliceType::n(flags.slice_type);
        let is_intra = slice_type == Some(H265SliceType::I);
        let is_b = slice_type == Some(H265SliceType::B);

        let mut slice_dpb = vec![];
        let mut dpb_keys = vec![];
        let mut num_rps_poc_st_curr_before = 0;
        let mut num_rps_poc_st_curr_after = 0;
        let mut num_rps_poc_lt_curr = 0;

        if !is_intra {
            for picture in &pic.reference_frames {
                if picture.is_null() {
                    break;
                }
                let Some(index) = frame.surfaces.picture_index(picture.picture_id) else {
                    debug!("Unknown reference surface {:#x}, ending DPB", picture.picture_id);
                    break;
                };

                let rps = H265Rps::from_flags(picture.flags);
                match rps {
                    H265Rps::StCurrBefore => num_rps_poc_st_curr_before += 1,
                    H265Rps::StCurrAfter => num_rps_poc_st_curr_after += 1,
                    H265Rps::LtCurr => num_rps_poc_lt_curr += 1,
                    H265Rps::None => (),
                }

                let timestamp = dpb
                    .lookup(picture.picture_id)
                    .map(|(entry, _)| entry.tag)
                    .unwrap_or(index);

                slice_dpb.push(H265DpbEntry {
                    timestamp,
                    rps,
                    field_pic: picture.is_field_pic(),
                    pic_order_cnt: [picture.pic_order_cnt; 2],
                });
                dpb_keys.push(picture.picture_id);
            }
        }

        let ref_idx_l0 = if is_intra {
            vec![]
        } else {
            resolve_ref_list(pic, slice, 0, slice.num_ref_idx_l0_active_minus1, &dpb_keys)
        };
        let ref_idx_l1 = if is_b {
            resolve_ref_list(pic, slice, 1, slice.num_ref_idx_l1_active_minus1, &dpb_keys)
        } else {
            vec![]
        };

        let pred_weight_table = if is_intra {
            None
        } else {
            Some(H265PredWeightTable::new(slice, is_b))
        };

        let slice_params = H265SliceParams {
            // The size in bits wraps like the 32-bit V4L2 field.
            bit_size: slice.slice_data_size.wrapping_mul(8),
            data_bit_offset,
            nal_unit_type: nalu.nal_unit_type,
            nuh_temporal_id_plus1: nalu.nuh_temporal_id_plus1,
            slice_type,
            colour_plane_id: flags.color_plane_id,
            slice_pic_order_cnt: pic.curr_pic.pic_order_cnt,
            slice_sao_luma_flag: flags.slice_sao_luma_flag,
            slice_sao_chroma_flag: flags.slice_sao_chroma_flag,
            slice_temporal_mvp_enabled_flag: flags.slice_temporal_mvp_enabled_flag,
            num_ref_idx_l0_active_minus1: slice.num_ref_idx_l0_active_minus1,
            num_ref_idx_l1_active_minus1: slice.num_ref_idx_l1_active_minus1,
            mvd_l1_zero_flag: flags.mvd_l1_zero_flag,
            cabac_init_flag: flags.cabac_init_flag,
            collocated_from_l0_flag: flags.collocated_from_l0_flag,
            collocated_ref_idx: slice.collocated_ref_idx,
            five_minus_max_num_merge_cand: slice.five_minus_max_num_merge_cand,
            use_integer_mv_flag: false,
            slice_qp_delta: slice.slice_qp_delta,
            slice_cb_qp_offset: slice.slice_cb_qp_offset,
            slice_cr_qp_offset: slice.slice_cr_qp_offset,
            slice_act_y_qp_offset: 0,
            slice_act_cb_qp_offset: 0,
            slice_act_cr_qp_offset: 0,
            slice_deblocking_filter_disabled_flag: flags.slice_deblocking_filter_disabled_flag,
            slice_beta_offset_div2: slice.slice_beta_offset_div2,
            slice_tc_offset_div2: slice.slice_tc_offset_div2,
            slice_loop_filter_across_slices_enabled_flag: flags
                .slice_loop_filter_across_slices_enabled_flag,
            pic_struct: pic_struct(&pic.curr_pic),
            num_active_dpb_entries: slice_dpb.len() as u8,
            dpb: slice_dpb,
            ref_idx_l0,
            ref_idx_l1,
            num_rps_poc_st_curr_before,
            num_rps_poc_st_curr_after,
            num_rps_poc_lt_curr,
            pred_weight_table,
        };

        let h265 = H265Frame {
            sps: H265Sps::from(pic),
            pps: H265Pps::new(pic, slice),
            slice_params,
        };

        dpb.commit_output(&pic.curr_pic, output_slot, frame.index)?;

        Ok(CodecFrame::H265(h265))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::va::h265::VA_PICTURE_HEVC_BOTTOM_FIELD;
    use crate::va::h265::VA_PICTURE_HEVC_FIELD_PIC;
    use crate::va::h265::VA_PICTURE_HEVC_INVALID;

    const K1: SurfaceId = 0x0400_0000;
    const K2: SurfaceId = 0x0400_0001;
    const K3: SurfaceId = 0x0400_0002;
    const K4: SurfaceId = 0x0400_0003;

    fn slice_at(offset: u32, byte_offset: u32) -> SliceParameterBufferHevc {
        SliceParameterBufferHevc {
            slice_data_offset: offset,
            slice_data_byte_offset: byte_offset,
            ..Default::default()
        }
    }

    fn reference(id: SurfaceId, poc: i32, flags: u32) -> PictureHevc {
        PictureHevc {
            picture_id: id,
            pic_order_cnt: poc,
            flags,
        }
    }

    #[test]
    fn bit_offset_from_stop_bit() {
        // IDR_W_RADL NAL header followed by slice header bytes.
        let data = [0x26, 0x01, 0xaf, 0x08, 0x55];

        assert_eq!(slice_data_bit_offset(&data, &slice_at(0, 4)), Ok(4 * 8 - 4));
        assert_eq!(slice_data_bit_offset(&data, &slice_at(1, 3)), Ok(4 * 8 - 4));
        // 0xaf has its lowest bit set.
        assert_eq!(slice_data_bit_offset(&data, &slice_at(0, 3)), Ok(3 * 8 - 1));
    }

    #[test]
    fn bit_offset_zero_byte() {
        let data = [0x26, 0x01, 0x00];
        assert_eq!(slice_data_bit_offset(&data, &slice_at(0, 3)), Ok(3 * 8 - 9));
    }

    #[test]
    fn bit_offset_out_of_bounds() {
        let data = [0x26, 0x01];
        assert!(matches!(
            slice_data_bit_offset(&data, &slice_at(0, 0)),
            Err(TranslateError::SliceDataOutOfBounds { offset: 0, len: 2 })
        ));
        assert!(matches!(
            slice_data_bit_offset(&data, &slice_at(1, 2)),
            Err(TranslateError::SliceDataOutOfBounds { offset: 3, len: 2 })
        ));
    }

    #[test]
    fn nalu_header() {
        // TRAIL_R, layer 0, temporal id 1.
        let header = NaluHeader::parse(&[0x02, 0x01]).unwrap();
        assert_eq!(header.nal_unit_type, 1);
        assert_eq!(header.nuh_layer_id, 0);
        assert_eq!(header.nuh_temporal_id_plus1, 1);
        assert_eq!(header.slice_type(), Some(SliceNaluType::TrailR));

        // PPS_NUT, temporal id 3.
        let header = NaluHeader::parse(&[0x44, 0x03]).unwrap();
        assert_eq!(header.nal_unit_type, 34);
        assert_eq!(header.nuh_temporal_id_plus1, 3);
        assert_eq!(header.slice_type(), None);
    }

    #[test]
    fn rps_class_priority() {
        assert_eq!(
            H265Rps::from_flags(VA_PICTURE_HEVC_RPS_ST_CURR_BEFORE | VA_PICTURE_HEVC_RPS_LT_CURR),
            H265Rps::StCurrBefore
        );
        assert_eq!(
            H265Rps::from_flags(VA_PICTURE_HEVC_RPS_ST_CURR_AFTER | VA_PICTURE_HEVC_RPS_LT_CURR),
            H265Rps::StCurrAfter
        );
        assert_eq!(H265Rps::from_flags(VA_PICTURE_HEVC_RPS_LT_CURR), H265Rps::LtCurr);
        assert_eq!(H265Rps::from_flags(0), H265Rps::None);
    }

    #[test]
    fn field_structure() {
        assert_eq!(pic_struct(&reference(K1, 0, 0)), 0);
        assert_eq!(pic_struct(&reference(K1, 0, VA_PICTURE_HEVC_FIELD_PIC)), 1);
        assert_eq!(
            pic_struct(&reference(
                K1,
                0,
                VA_PICTURE_HEVC_FIELD_PIC | VA_PICTURE_HEVC_BOTTOM_FIELD
            )),
            2
        );
    }

    fn translate(
        dpb: &mut Dpb<PictureHevc>,
        snapshot: &H265Snapshot,
        surfaces: &BTreeMap<SurfaceId, u32>,
        index: u32,
    ) -> Result<H265Frame, TranslateError> {
        let frame = FrameInfo { index, surfaces };
        match H265::translate(dpb, snapshot, &frame)? {
            CodecFrame::H265(f) => Ok(f),
            f => panic!("unexpected frame {:?}", f),
        }
    }

    fn p_snapshot() -> H265Snapshot {
        let mut picture = PictureParameterBufferHevc::default();
        picture.curr_pic = reference(K4, 8, 0);
        picture.reference_frames[0] = reference(K1, 0, VA_PICTURE_HEVC_RPS_ST_CURR_BEFORE);
        picture.reference_frames[1] = reference(K2, 4, VA_PICTURE_HEVC_RPS_ST_CURR_BEFORE);
        picture.reference_frames[2] = reference(K3, 16, VA_PICTURE_HEVC_RPS_ST_CURR_AFTER);

        let mut slice = slice_at(0, 4);
        slice.slice_data_size = 5;
        slice.long_slice_flags.slice_type = 1;
        slice.num_ref_idx_l0_active_minus1 = 2;
        slice.ref_pic_list[0][..3].copy_from_slice(&[1, 0, 0xff]);
        slice.delta_luma_weight_l0 = [7; 15];
        slice.delta_luma_weight_l1 = [9; 15];

        H265Snapshot {
            picture: Some(picture),
            slice: Some(slice),
            slice_data: Bytes::from_static(&[0x02, 0x01, 0xaf, 0x08, 0x55]),
        }
    }

    fn surfaces() -> BTreeMap<SurfaceId, u32> {
        BTreeMap::from([(K1, 0), (K2, 1), (K3, 2)])
    }

    #[test]
    fn p_slice() {
        let mut dpb = Dpb::new();
        let frame = translate(&mut dpb, &p_snapshot(), &surfaces(), 3).unwrap();
        let slice = &frame.slice_params;

        assert_eq!(slice.bit_size, 40);
        assert_eq!(slice.data_bit_offset, 28);
        assert_eq!(slice.nal_unit_type, 1);
        assert_eq!(slice.slice_type, Some(H265SliceType::P));
        assert_eq!(slice.slice_pic_order_cnt, 8);

        assert_eq!(slice.num_active_dpb_entries, 3);
        assert_eq!(
            slice.dpb.iter().map(|e| e.timestamp).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
        assert_eq!(slice.dpb[2].pic_order_cnt, [16, 16]);
        assert_eq!(slice.num_rps_poc_st_curr_before, 2);
        assert_eq!(slice.num_rps_poc_st_curr_after, 1);
        assert_eq!(slice.num_rps_poc_lt_curr, 0);

        let mut expected = vec![Resolution::Invalid; H265_REF_NUM_MAX];
        expected[0] = Resolution::Resolved(1);
        expected[1] = Resolution::Resolved(0);
        assert_eq!(slice.ref_idx_l0, expected);
        assert!(slice.ref_idx_l1.is_empty());

        let table = slice.pred_weight_table.as_ref().unwrap();
        assert_eq!(&table.delta_luma_weight_l0[..4], &[7, 7, 7, 0]);
        assert_eq!(table.delta_luma_weight_l1, [0; H265_REF_NUM_MAX]);

        let (entry, _) = dpb.lookup(K4).unwrap();
        assert_eq!(entry.tag, 3);
    }

    #[test]
    fn oversized_slice_bit_size_wraps() {
        let mut dpb = Dpb::new();
        let mut snapshot = p_snapshot();
        snapshot.slice.as_mut().unwrap().slice_data_size = (1 << 29) + 3;

        let frame = translate(&mut dpb, &snapshot, &surfaces(), 3).unwrap();
        assert_eq!(frame.slice_params.bit_size, 24);
        assert_eq!(frame.slice_params.data_bit_offset, 28);
    }

    #[test]
    fn dpb_stops_at_unknown_surface() {
        let mut dpb = Dpb::new();
        let mut surfaces = surfaces();
        surfaces.remove(&K2);

        let frame = translate(&mut dpb, &p_snapshot(), &surfaces, 3).unwrap();
        let slice = &frame.slice_params;
        assert_eq!(slice.num_active_dpb_entries, 1);
        // K2 is no longer in the slice DPB.
        assert_eq!(slice.ref_idx_l0[0], Resolution::Fallback(0));
        assert_eq!(slice.ref_idx_l0[1], Resolution::Resolved(0));
    }

    #[test]
    fn invalid_reference_entry() {
        let mut dpb = Dpb::new();
        let mut snapshot = p_snapshot();
        let picture = snapshot.picture.as_mut().unwrap();
        picture.reference_frames[1].flags |= VA_PICTURE_HEVC_INVALID;
        snapshot.slice.as_mut().unwrap().ref_pic_list[0][0] = 1;

        let frame = translate(&mut dpb, &snapshot, &surfaces(), 3).unwrap();
        let slice = &frame.slice_params;
        assert_eq!(slice.num_active_dpb_entries, 1);
        assert_eq!(slice.ref_idx_l0[0], Resolution::Invalid);
    }

    #[test]
    fn b_slice_has_both_lists() {
        let mut dpb = Dpb::new();
        let mut snapshot = p_snapshot();
        let slice = snapshot.slice.as_mut().unwrap();
        slice.long_slice_flags.slice_type = 0;
        slice.num_ref_idx_l1_active_minus1 = 0;
        slice.ref_pic_list[1][0] = 2;

        let frame = translate(&mut dpb, &snapshot, &surfaces(), 3).unwrap();
        let slice = &frame.slice_params;
        assert_eq!(slice.ref_idx_l1.len(), H265_REF_NUM_MAX);
        assert_eq!(slice.ref_idx_l1[0], Resolution::Resolved(2));
        assert_eq!(slice.ref_idx_l1[1], Resolution::Invalid);

        let table = slice.pred_weight_table.as_ref().unwrap();
        assert_eq!(&table.delta_luma_weight_l1[..2], &[9, 0]);
    }

    #[test]
    fn i_slice_has_no_references() {
        let mut dpb = Dpb::new();
        let mut snapshot = p_snapshot();
        snapshot.slice.as_mut().unwrap().long_slice_flags.slice_type = 2;

        let frame = translate(&mut dpb, &snapshot, &surfaces(), 3).unwrap();
        let slice = &frame.slice_params;
        assert!(slice.is_intra());
        assert!(slice.dpb.is_empty());
        assert_eq!(slice.num_active_dpb_entries, 0);
        assert!(slice.ref_idx_l0.is_empty());
        assert!(slice.pred_weight_table.is_none());
    }

    #[test]
    fn missing_slice_parameters() {
        let mut dpb = Dpb::new();
        let mut snapshot = p_snapshot();
        snapshot.slice = None;

        assert!(matches!(
            translate(&mut dpb, &snapshot, &surfaces(), 0),
            Err(TranslateError::MissingSliceParameters)
        ));
        assert_eq!(dpb.age(), 0);
    }

    #[test]
    fn short_slice_data_leaves_dpb_untouched() {
        let mut dpb = Dpb::new();
        let mut snapshot = p_snapshot();
        snapshot.slice_data = Bytes::from_static(&[0x02]);

        assert!(matches!(
            translate(&mut dpb, &snapshot, &surfaces(), 0),
            Err(TranslateError::SliceDataOutOfBounds { .. })
        ));
        assert_eq!(dpb.entries().count(), 0);
        assert_eq!(dpb.find_replacement_slot(), Ok(0));
    }
}
