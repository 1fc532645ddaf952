// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use enumn::N;

use crate::codec::copy_padded;
use crate::codec::CodecFrame;
use crate::codec::CodecTranslator;
use crate::codec::FrameInfo;
use crate::codec::TranslateError;
use crate::dpb::Dpb;
use crate::resolver::resolve_slot;
use crate::resolver::Resolution;
use crate::va::h264::IQMatrixBufferH264;
use crate::va::h264::PictureH264;
use crate::va::h264::PictureParameterBufferH264;
use crate::va::h264::SliceParameterBufferH264;
use crate::va::h264::NUM_REF_PIC_LIST_ENTRIES;

pub const V4L2_H264_SPS_FLAG_SEPARATE_COLOUR_PLANE: u32 = 0x01;
pub const V4L2_H264_SPS_FLAG_GAPS_IN_FRAME_NUM_VALUE_ALLOWED: u32 = 0x08;
pub const V4L2_H264_SPS_FLAG_FRAME_MBS_ONLY: u32 = 0x10;
pub const V4L2_H264_SPS_FLAG_MB_ADAPTIVE_FRAME_FIELD: u32 = 0x20;
pub const V4L2_H264_SPS_FLAG_DIRECT_8X8_INFERENCE: u32 = 0x40;

pub const V4L2_H264_PPS_FLAG_ENTROPY_CODING_MODE: u32 = 0x01;
pub const V4L2_H264_PPS_FLAG_BOTTOM_FIELD_PIC_ORDER_IN_FRAME_PRESENT: u32 = 0x02;
pub const V4L2_H264_PPS_FLAG_WEIGHTED_PRED: u32 = 0x04;
pub const V4L2_H264_PPS_FLAG_CONSTRAINED_INTRA_PRED: u32 = 0x10;
pub const V4L2_H264_PPS_FLAG_TRANSFORM_8X8_MODE: u32 = 0x40;

pub const V4L2_H264_DPB_ENTRY_FLAG_VALID: u32 = 0x01;
pub const V4L2_H264_DPB_ENTRY_FLAG_ACTIVE: u32 = 0x02;
pub const V4L2_H264_DPB_ENTRY_FLAG_LONG_TERM: u32 = 0x04;

pub const V4L2_H264_SLICE_FLAG_DIRECT_SPATIAL_MV_PRED: u32 = 0x01;

/// Slice types once normalized modulo 5.
#[derive(N, Clone, Copy, Debug, PartialEq, Eq)]
pub enum H264SliceType {
    P = 0,
    B = 1,
    I = 2,
    Sp = 3,
    Si = 4,
}

impl H264SliceType {
    pub fn from_raw(slice_type: u8) -> Self {
        // `% 5` keeps the value within the enumeration.
        Self::n(slice_type % 5).unwrap_or(H264SliceType::I)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct H264Sps {
    pub chroma_format_idc: u8,
    pub bit_depth_luma_minus8: u8,
    pub bit_depth_chroma_minus8: u8,
    pub log2_max_frame_num_minus4: u8,
    pub log2_max_pic_order_cnt_lsb_minus4: u8,
    pub pic_order_cnt_type: u8,
    pub pic_width_in_mbs_minus1: u16,
    pub pic_height_in_map_units_minus1: u16,
    pub flags: u32,
}

impl From<&PictureParameterBufferH264> for H264Sps {
    fn from(pic: &PictureParameterBufferH264) -> Self {
        let seq = &pic.seq_fields;
        let mut flags: u32 = 0;
        if seq.residual_colour_transform_flag {
            flags |= V4L2_H264_SPS_FLAG_SEPARATE_COLOUR_PLANE;
        }
        if seq.gaps_in_frame_num_value_allowed_flag {
            flags |= V4L2_H264_SPS_FLAG_GAPS_IN_FRAME_NUM_VALUE_ALLOWED;
        }
        if seq.frame_mbs_only_flag {
            flags |= V4L2_H264_SPS_FLAG_FRAME_MBS_ONLY;
        }
        if seq.mb_adaptive_frame_field_flag {
            flags |= V4L2_H264_SPS_FLAG_MB_ADAPTIVE_FRAME_FIELD;
        }
        if seq.direct_8x8_inference_flag {
            flags |= V4L2_H264_SPS_FLAG_DIRECT_8X8_INFERENCE;
        }
        Self {
            chroma_format_idc: seq.chroma_format_idc,
            bit_depth_luma_minus8: pic.bit_depth_luma_minus8,
            bit_depth_chroma_minus8: pic.bit_depth_chroma_minus8,
            log2_max_frame_num_minus4: seq.log2_max_frame_num_minus4,
            log2_max_pic_order_cnt_lsb_minus4: seq.log2_max_pic_order_cnt_lsb_minus4,
            pic_order_cnt_type: seq.pic_order_cnt_type,
            pic_width_in_mbs_minus1: pic.picture_width_in_mbs_minus1,
            pic_height_in_map_units_minus1: pic.picture_height_in_mbs_minus1,
            flags,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct H264Pps {
    pub weighted_bipred_idc: u8,
    pub pic_init_qp_minus26: i8,
    pub pic_init_qs_minus26: i8,
    pub chroma_qp_index_offset: i8,
    pub second_chroma_qp_index_offset: i8,
    pub flags: u32,
}

impl From<&PictureParameterBufferH264> for H264Pps {
    fn from(pic: &PictureParameterBufferH264) -> Self {
        let fields = &pic.pic_fields;
        let mut flags: u32 = 0;
        if fields.entropy_coding_mode_flag {
            flags |= V4L2_H264_PPS_FLAG_ENTROPY_CODING_MODE;
        }
        if fields.weighted_pred_flag {
            flags |= V4L2_H264_PPS_FLAG_WEIGHTED_PRED;
        }
        if fields.transform_8x8_mode_flag {
            flags |= V4L2_H264_PPS_FLAG_TRANSFORM_8X8_MODE;
        }
        if fields.constrained_intra_pred_flag {
            flags |= V4L2_H264_PPS_FLAG_CONSTRAINED_INTRA_PRED;
        }
        if fields.pic_order_present_flag {
            flags |= V4L2_H264_PPS_FLAG_BOTTOM_FIELD_PIC_ORDER_IN_FRAME_PRESENT;
        }
        Self {
            weighted_bipred_idc: fields.weighted_bipred_idc,
            pic_init_qp_minus26: pic.pic_init_qp_minus26,
            pic_init_qs_minus26: pic.pic_init_qs_minus26,
            chroma_qp_index_offset: pic.chroma_qp_index_offset,
            second_chroma_qp_index_offset: pic.second_chroma_qp_index_offset,
            flags,
        }
    }
}

/// One entry of the DPB array of the decode parameters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct H264DpbEntry {
    /// Slot of the entry, which is also its position in the array.
    pub slot: usize,
    pub frame_num: u32,
    /// Tag of the reference, to be matched with the timestamp of its capture buffer.
    pub timestamp: u32,
    pub top_field_order_cnt: i32,
    pub bottom_field_order_cnt: i32,
    pub flags: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct H264DecodeParams {
    pub top_field_order_cnt: i32,
    pub bottom_field_order_cnt: i32,
    pub dpb: Vec<H264DpbEntry>,
}

impl H264DecodeParams {
    fn new(curr_pic: &PictureH264, dpb: &Dpb<PictureH264>) -> Self {
        let dpb = dpb
            .entries()
            .map(|(slot, entry)| {
                let mut flags = V4L2_H264_DPB_ENTRY_FLAG_VALID;
                if entry.picture.is_long_term() {
                    flags |= V4L2_H264_DPB_ENTRY_FLAG_LONG_TERM;
                }
                if entry.used {
                    flags |= V4L2_H264_DPB_ENTRY_FLAG_ACTIVE;
                }
                H264DpbEntry {
                    slot,
                    frame_num: entry.picture.frame_idx,
                    timestamp: entry.tag,
                    top_field_order_cnt: entry.picture.top_field_order_cnt,
                    bottom_field_order_cnt: entry.picture.bottom_field_order_cnt,
                    flags,
                }
            })
            .collect();

        Self {
            top_field_order_cnt: curr_pic.top_field_order_cnt,
            bottom_field_order_cnt: curr_pic.bottom_field_order_cnt,
            dpb,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct H264ScalingMatrix {
    pub scaling_list_4x4: [[u8; 16]; 6],
    pub scaling_list_8x8: [[u8; 64]; 6],
}

impl Default for H264ScalingMatrix {
    fn default() -> Self {
        Self {
            scaling_list_4x4: [[0; 16]; 6],
            scaling_list_8x8: [[0; 64]; 6],
        }
    }
}

impl From<&IQMatrixBufferH264> for H264ScalingMatrix {
    fn from(matrix: &IQMatrixBufferH264) -> Self {
        Self {
            scaling_list_4x4: matrix.scaling_list_4x4,
            // Only the intra and inter Y lists are provided.
            scaling_list_8x8: copy_padded(&matrix.scaling_list_8x8, [0; 64]),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct H264WeightFactors {
    pub luma_weight: [i16; 32],
    pub luma_offset: [i16; 32],
    pub chroma_weight: [[i16; 2]; 32],
    pub chroma_offset: [[i16; 2]; 32],
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct H264PredWeightTable {
    pub luma_log2_weight_denom: u16,
    pub chroma_log2_weight_denom: u16,
    pub weight_factors: [H264WeightFactors; 2],
}

impl H264PredWeightTable {
    fn new(slice: &SliceParameterBufferH264) -> Self {
        Self {
            luma_log2_weight_denom: u16::from(slice.luma_log2_weight_denom),
            chroma_log2_weight_denom: u16::from(slice.chroma_log2_weight_denom),
            weight_factors: [
                H264WeightFactors {
                    luma_weight: slice.luma_weight_l0,
                    luma_offset: slice.luma_offset_l0,
                    chroma_weight: slice.chroma_weight_l0,
                    chroma_offset: slice.chroma_offset_l0,
                },
                H264WeightFactors {
                    luma_weight: slice.luma_weight_l1,
                    luma_offset: slice.luma_offset_l1,
                    chroma_weight: slice.chroma_weight_l1,
                    chroma_offset: slice.chroma_offset_l1,
                },
            ],
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct H264SliceParams {
    pub size: u32,
    pub header_bit_size: u32,
    pub first_mb_in_slice: u32,
    /// Slice type as submitted, before normalization.
    pub slice_type: u8,
    pub cabac_init_idc: u8,
    pub slice_qp_delta: i8,
    pub disable_deblocking_filter_idc: u8,
    pub slice_alpha_c0_offset_div2: i8,
    pub slice_beta_offset_div2: i8,
    pub num_ref_idx_l0_active_minus1: u8,
    pub num_ref_idx_l1_active_minus1: u8,
    /// Resolved list 0, empty for I and SI slices.
    pub ref_pic_list0: Vec<Resolution<u8>>,
    /// Resolved list 1, empty unless this is a B slice.
    pub ref_pic_list1: Vec<Resolution<u8>>,
    pub flags: u32,
    pub pred_weight_table: H264PredWeightTable,
}

impl H264SliceParams {
    pub fn kind(&self) -> H264SliceType {
        H264SliceType::from_raw(self.slice_type)
    }
}

/// Descriptor of an H.264 frame.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct H264Frame {
    pub decode_params: H264DecodeParams,
    pub pps: H264Pps,
    pub sps: H264Sps,
    pub scaling_matrix: H264ScalingMatrix,
    pub slice_params: H264SliceParams,
}

/// Latest H.264 parameter buffers of the session.
#[derive(Clone, Debug, Default)]
pub struct H264Snapshot {
    pub picture: Option<PictureParameterBufferH264>,
    pub matrix: Option<IQMatrixBufferH264>,
    pub slice: Option<SliceParameterBufferH264>,
}

fn resolve_list(
    dpb: &Dpb<PictureH264>,
    list: &[PictureH264; NUM_REF_PIC_LIST_ENTRIES],
    num_active_minus1: u8,
) -> Vec<Resolution<u8>> {
    let count = (usize::from(num_active_minus1) + 1).min(NUM_REF_PIC_LIST_ENTRIES);
    list[..count]
        .iter()
        .map(|pic| resolve_slot(dpb, pic))
        .collect()
}

fn slice_params(
    dpb: &Dpb<PictureH264>,
    pic: &PictureParameterBufferH264,
    slice: &SliceParameterBufferH264,
) -> H264SliceParams {
    let kind = H264SliceType::from_raw(slice.slice_type);

    let ref_pic_list0 = match kind {
        H264SliceType::P | H264SliceType::B => {
            resolve_list(dpb, &slice.ref_pic_list0, slice.num_ref_idx_l0_active_minus1)
        }
        _ => vec![],
    };
    let ref_pic_list1 = match kind {
        H264SliceType::B => {
            resolve_list(dpb, &slice.ref_pic_list1, slice.num_ref_idx_l1_active_minus1)
        }
        _ => vec![],
    };

    let mut flags: u32 = 0;
    if slice.direct_spatial_mv_pred_flag {
        flags |= V4L2_H264_SLICE_FLAG_DIRECT_SPATIAL_MV_PRED;
    }

    let weighted = match kind {
        H264SliceType::P | H264SliceType::Sp => pic.pic_fields.weighted_pred_flag,
        H264SliceType::B => pic.pic_fields.weighted_bipred_idc == 1,
        _ => false,
    };
    let pred_weight_table = if weighted {
        H264PredWeightTable::new(slice)
    } else {
        Default::default()
    };

    H264SliceParams {
        size: slice.slice_data_size,
        header_bit_size: u32::from(slice.slice_data_bit_offset),
        first_mb_in_slice: u32::from(slice.first_mb_in_slice),
        slice_type: slice.slice_type,
        cabac_init_idc: slice.cabac_init_idc,
        slice_qp_delta: slice.slice_qp_delta,
        disable_deblocking_filter_idc: slice.disable_deblocking_filter_idc,
        slice_alpha_c0_offset_div2: slice.slice_alpha_c0_offset_div2,
        slice_beta_offset_div2: slice.slice_beta_offset_div2,
        num_ref_idx_l0_active_minus1: slice.num_ref_idx_l0_active_minus1,
        num_ref_idx_l1_active_minus1: slice.num_ref_idx_l1_active_minus1,
        ref_pic_list0,
        ref_pic_list1,
        flags,
        pred_weight_table,
    }
}

pub struct H264;

impl CodecTranslator for H264 {
    type Snapshot = H264Snapshot;
    type State = Dpb<PictureH264>;

    fn translate(
        dpb: &mut Self::State,
        snapshot: &Self::Snapshot,
        frame: &FrameInfo,
    ) -> Result<CodecFrame, TranslateError> {
        let pic = snapshot
            .picture
            .as_ref()
            .ok_or(TranslateError::MissingPictureParameters)?;
        let matrix = snapshot.matrix.clone().unwrap_or_default();
        let slice = snapshot.slice.clone().unwrap_or_default();

        let output_slot = dpb.reserve_output_slot(pic.curr_pic.picture_id)?;

        let update = dpb.begin_frame_update(pic.active_reference_frames(), |r| {
            frame
                .surfaces
                .picture_index(r.picture_id)
                .unwrap_or(frame.index)
        });
        if let Err(e) = update {
            dpb.release(output_slot);
            return Err(e.into());
        }

        let h264 = H264Frame {
            decode_params: H264DecodeParams::new(&pic.curr_pic, dpb),
            pps: H264Pps::from(pic),
            sps: H264Sps::from(pic),
            scaling_matrix: H264ScalingMatrix::from(&matrix),
            slice_params: slice_params(dpb, pic, &slice),
        };

        dpb.commit_output(&pic.curr_pic, output_slot, frame.index)?;

        Ok(CodecFrame::H264(h264))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::va::h264::VA_PICTURE_H264_LONG_TERM_REFERENCE;
    use crate::va::h264::VA_PICTURE_H264_SHORT_TERM_REFERENCE;
    use crate::va::SurfaceId;

    const K1: SurfaceId = 0x0400_0000;
    const K2: SurfaceId = 0x0400_0001;
    const K3: SurfaceId = 0x0400_0002;

    fn pic(id: SurfaceId, frame_idx: u32, poc: i32) -> PictureH264 {
        PictureH264 {
            picture_id: id,
            frame_idx,
            flags: VA_PICTURE_H264_SHORT_TERM_REFERENCE,
            top_field_order_cnt: poc,
            bottom_field_order_cnt: poc,
        }
    }

    fn translate(
        dpb: &mut Dpb<PictureH264>,
        snapshot: &H264Snapshot,
        surfaces: &BTreeMap<SurfaceId, u32>,
        index: u32,
    ) -> H264Frame {
        let frame = FrameInfo { index, surfaces };
        match H264::translate(dpb, snapshot, &frame).unwrap() {
            CodecFrame::H264(f) => f,
            f => panic!("unexpected frame {:?}", f),
        }
    }

    fn idr_snapshot() -> H264Snapshot {
        let mut picture = PictureParameterBufferH264::default();
        picture.curr_pic = pic(K1, 0, 0);
        picture.seq_fields.frame_mbs_only_flag = true;
        picture.seq_fields.direct_8x8_inference_flag = true;
        picture.pic_fields.entropy_coding_mode_flag = true;
        picture.pic_fields.transform_8x8_mode_flag = true;

        let slice = SliceParameterBufferH264 {
            slice_data_size: 1200,
            slice_data_bit_offset: 37,
            slice_type: 7,
            ..Default::default()
        };

        H264Snapshot {
            picture: Some(picture),
            matrix: None,
            slice: Some(slice),
        }
    }

    #[test]
    fn slice_type_normalization() {
        assert_eq!(H264SliceType::from_raw(0), H264SliceType::P);
        assert_eq!(H264SliceType::from_raw(6), H264SliceType::B);
        assert_eq!(H264SliceType::from_raw(7), H264SliceType::I);
        assert_eq!(H264SliceType::from_raw(8), H264SliceType::Sp);
        assert_eq!(H264SliceType::from_raw(9), H264SliceType::Si);
    }

    #[test]
    fn sps_and_pps_flags() {
        let snapshot = idr_snapshot();
        let picture = snapshot.picture.as_ref().unwrap();

        let sps = H264Sps::from(picture);
        assert_eq!(
            sps.flags,
            V4L2_H264_SPS_FLAG_FRAME_MBS_ONLY | V4L2_H264_SPS_FLAG_DIRECT_8X8_INFERENCE
        );

        let pps = H264Pps::from(picture);
        assert_eq!(
            pps.flags,
            V4L2_H264_PPS_FLAG_ENTROPY_CODING_MODE | V4L2_H264_PPS_FLAG_TRANSFORM_8X8_MODE
        );
    }

    #[test]
    fn first_frame_emits_empty_dpb() {
        let mut dpb = Dpb::new();
        let surfaces = BTreeMap::new();
        let frame = translate(&mut dpb, &idr_snapshot(), &surfaces, 0);

        assert!(frame.decode_params.dpb.is_empty());
        assert!(frame.slice_params.ref_pic_list0.is_empty());
        assert!(frame.slice_params.ref_pic_list1.is_empty());
        assert_eq!(frame.slice_params.header_bit_size, 37);

        let entries: Vec<_> = dpb.entries().collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].1.picture.picture_id, K1);
        assert_eq!(entries[0].1.tag, 0);
    }

    #[test]
    fn references_appear_in_next_frame() {
        let mut dpb = Dpb::new();
        let mut surfaces = BTreeMap::new();
        translate(&mut dpb, &idr_snapshot(), &surfaces, 0);
        surfaces.insert(K1, 0);

        let mut snapshot = idr_snapshot();
        let picture = snapshot.picture.as_mut().unwrap();
        picture.curr_pic = pic(K2, 1, 4);
        picture.num_ref_frames = 1;
        picture.reference_frames[0] = pic(K1, 0, 0);
        let slice = snapshot.slice.as_mut().unwrap();
        slice.slice_type = 5;
        slice.num_ref_idx_l0_active_minus1 = 1;
        slice.ref_pic_list0[0] = pic(K1, 0, 0);
        slice.ref_pic_list0[1] = pic(K3, 0, 0);

        let frame = translate(&mut dpb, &snapshot, &surfaces, 1);

        assert_eq!(frame.decode_params.top_field_order_cnt, 4);
        assert_eq!(
            frame.decode_params.dpb,
            vec![H264DpbEntry {
                slot: 0,
                frame_num: 0,
                timestamp: 0,
                top_field_order_cnt: 0,
                bottom_field_order_cnt: 0,
                flags: V4L2_H264_DPB_ENTRY_FLAG_VALID | V4L2_H264_DPB_ENTRY_FLAG_ACTIVE,
            }]
        );
        assert_eq!(
            frame.slice_params.ref_pic_list0,
            vec![Resolution::Resolved(0), Resolution::Fallback(0)]
        );
        assert!(frame.slice_params.ref_pic_list1.is_empty());

        // K2 went into the next free slot with the frame index as tag.
        let (entry, slot) = dpb.lookup(K2).unwrap();
        assert_eq!((slot, entry.tag), (1, 1));
    }

    #[test]
    fn unknown_reference_gets_current_index() {
        let mut dpb = Dpb::new();
        let surfaces = BTreeMap::new();

        let mut snapshot = idr_snapshot();
        let picture = snapshot.picture.as_mut().unwrap();
        picture.curr_pic = pic(K2, 1, 4);
        picture.num_ref_frames = 1;
        let mut long_term = pic(K3, 0, 0);
        long_term.flags = VA_PICTURE_H264_LONG_TERM_REFERENCE;
        picture.reference_frames[0] = long_term;

        let frame = translate(&mut dpb, &snapshot, &surfaces, 5);
        let entry = &frame.decode_params.dpb[0];
        assert_eq!(entry.timestamp, 5);
        assert_eq!(
            entry.flags,
            V4L2_H264_DPB_ENTRY_FLAG_VALID
                | V4L2_H264_DPB_ENTRY_FLAG_LONG_TERM
                | V4L2_H264_DPB_ENTRY_FLAG_ACTIVE
        );
    }

    #[test]
    fn ref_list_length_follows_active_count() {
        let mut dpb = Dpb::new();
        let surfaces = BTreeMap::new();

        let mut snapshot = idr_snapshot();
        let slice = snapshot.slice.as_mut().unwrap();
        slice.slice_type = 1;
        slice.num_ref_idx_l0_active_minus1 = 2;
        slice.num_ref_idx_l1_active_minus1 = 40;

        let frame = translate(&mut dpb, &snapshot, &surfaces, 0);
        // The lists default to invalid pictures.
        assert_eq!(frame.slice_params.ref_pic_list0, vec![Resolution::Invalid; 3]);
        assert_eq!(frame.slice_params.ref_pic_list1.len(), NUM_REF_PIC_LIST_ENTRIES);
    }

    #[test]
    fn weights_only_with_weighted_prediction() {
        let mut dpb = Dpb::new();
        let surfaces = BTreeMap::new();

        let mut snapshot = idr_snapshot();
        let slice = snapshot.slice.as_mut().unwrap();
        slice.slice_type = 0;
        slice.luma_log2_weight_denom = 5;
        slice.luma_weight_l0[0] = 33;
        slice.chroma_offset_l1[1] = [-2, 3];

        let frame = translate(&mut dpb, &snapshot, &surfaces, 0);
        assert_eq!(frame.slice_params.pred_weight_table, Default::default());

        snapshot.picture.as_mut().unwrap().pic_fields.weighted_pred_flag = true;
        let frame = translate(&mut dpb, &snapshot, &surfaces, 1);
        let table = &frame.slice_params.pred_weight_table;
        assert_eq!(table.luma_log2_weight_denom, 5);
        assert_eq!(table.weight_factors[0].luma_weight[0], 33);
        assert_eq!(table.weight_factors[1].chroma_offset[1], [-2, 3]);

        // B slices need explicit bi-prediction.
        let picture = snapshot.picture.as_mut().unwrap();
        picture.pic_fields.weighted_pred_flag = false;
        picture.pic_fields.weighted_bipred_idc = 2;
        snapshot.slice.as_mut().unwrap().slice_type = 1;
        let frame = translate(&mut dpb, &snapshot, &surfaces, 2);
        assert_eq!(frame.slice_params.pred_weight_table, Default::default());

        snapshot.picture.as_mut().unwrap().pic_fields.weighted_bipred_idc = 1;
        let frame = translate(&mut dpb, &snapshot, &surfaces, 3);
        assert_eq!(frame.slice_params.pred_weight_table.luma_log2_weight_denom, 5);
    }

    #[test]
    fn scaling_lists_copied() {
        let mut dpb = Dpb::new();
        let surfaces = BTreeMap::new();

        let mut snapshot = idr_snapshot();
        let mut matrix = IQMatrixBufferH264::default();
        matrix.scaling_list_4x4[5] = [16; 16];
        matrix.scaling_list_8x8[1] = [24; 64];
        snapshot.matrix = Some(matrix);

        let frame = translate(&mut dpb, &snapshot, &surfaces, 0);
        assert_eq!(frame.scaling_matrix.scaling_list_4x4[5], [16; 16]);
        assert_eq!(frame.scaling_matrix.scaling_list_8x8[1], [24; 64]);
        assert_eq!(frame.scaling_matrix.scaling_list_8x8[2], [0; 64]);
    }

    #[test]
    fn sixteen_references_still_translate() {
        let mut dpb = Dpb::new();
        let surfaces = BTreeMap::new();
        let refs: Vec<SurfaceId> = (1..=16).map(|i| K1 + i).collect();

        let mut snapshot = idr_snapshot();
        let picture = snapshot.picture.as_mut().unwrap();
        picture.curr_pic = pic(K1, 16, 32);
        picture.num_ref_frames = 16;
        for (i, key) in refs.iter().enumerate() {
            picture.reference_frames[i] = pic(*key, i as u32, i as i32 * 2);
        }
        let slice = snapshot.slice.as_mut().unwrap();
        slice.slice_type = 5;
        slice.num_ref_idx_l0_active_minus1 = 15;
        for (i, key) in refs.iter().enumerate() {
            slice.ref_pic_list0[i] = pic(*key, i as u32, i as i32 * 2);
        }

        let frame = translate(&mut dpb, &snapshot, &surfaces, 0);

        // The output takes slot 0, the first 15 references the rest.
        assert_eq!(frame.decode_params.dpb.len(), 15);
        assert_eq!(frame.slice_params.ref_pic_list0.len(), 16);
        assert_eq!(frame.slice_params.ref_pic_list0[0], Resolution::Resolved(1));
        assert_eq!(frame.slice_params.ref_pic_list0[14], Resolution::Resolved(15));
        assert_eq!(frame.slice_params.ref_pic_list0[15], Resolution::Fallback(0));
        assert_eq!(dpb.lookup(K1).map(|(_, slot)| slot), Some(0));
    }

    #[test]
    fn missing_picture_parameters() {
        let mut dpb = Dpb::new();
        let surfaces = BTreeMap::new();
        let frame = FrameInfo {
            index: 0,
            surfaces: &surfaces,
        };

        assert!(matches!(
            H264::translate(&mut dpb, &Default::default(), &frame),
            Err(TranslateError::MissingPictureParameters)
        ));
        assert_eq!(dpb.age(), 0);
    }
}
