// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Text rendering of decode descriptors.
//!
//! Frames are printed as tab-indented C designated initializers, one block per frame, so the
//! output can be pasted into a table of test vectors.

use std::fmt::Display;
use std::io;
use std::io::Write;

use crate::codec::h264::H264DpbEntry;
use crate::codec::h264::H264Frame;
use crate::codec::h264::H264PredWeightTable;
use crate::codec::h264::H264SliceParams;
use crate::codec::h264::H264SliceType;
use crate::codec::h264::V4L2_H264_DPB_ENTRY_FLAG_ACTIVE;
use crate::codec::h264::V4L2_H264_DPB_ENTRY_FLAG_LONG_TERM;
use crate::codec::h264::V4L2_H264_PPS_FLAG_BOTTOM_FIELD_PIC_ORDER_IN_FRAME_PRESENT;
use crate::codec::h264::V4L2_H264_PPS_FLAG_CONSTRAINED_INTRA_PRED;
use crate::codec::h264::V4L2_H264_PPS_FLAG_ENTROPY_CODING_MODE;
use crate::codec::h264::V4L2_H264_PPS_FLAG_TRANSFORM_8X8_MODE;
use crate::codec::h264::V4L2_H264_PPS_FLAG_WEIGHTED_PRED;
use crate::codec::h264::V4L2_H264_SLICE_FLAG_DIRECT_SPATIAL_MV_PRED;
use crate::codec::h264::V4L2_H264_SPS_FLAG_DIRECT_8X8_INFERENCE;
use crate::codec::h264::V4L2_H264_SPS_FLAG_FRAME_MBS_ONLY;
use crate::codec::h264::V4L2_H264_SPS_FLAG_GAPS_IN_FRAME_NUM_VALUE_ALLOWED;
use crate::codec::h264::V4L2_H264_SPS_FLAG_MB_ADAPTIVE_FRAME_FIELD;
use crate::codec::h264::V4L2_H264_SPS_FLAG_SEPARATE_COLOUR_PLANE;
use crate::codec::h265::H265DpbEntry;
use crate::codec::h265::H265Frame;
use crate::codec::h265::H265Pps;
use crate::codec::h265::H265PredWeightTable;
use crate::codec::h265::H265Rps;
use crate::codec::h265::H265SliceParams;
use crate::codec::h265::H265SliceType;
use crate::codec::h265::H265Sps;
use crate::codec::mpeg2::Mpeg2Frame;
use crate::codec::mpeg2::Mpeg2SliceType;
use crate::codec::CodecFrame;
use crate::codec::Frame;
use crate::resolver::Resolution;

/// Writes `indent` tabs followed by a formatted line.
macro_rules! emit {
    ($printer:expr, $indent:expr, $($arg:tt)*) => {{
        $printer.indent($indent)?;
        writeln!($printer.out, $($arg)*)
    }};
}

/// Returns `name` if `flag` is set in `flags`, `none` otherwise.
fn flag_name<'a>(flags: u32, flag: u32, name: &'a str, none: &'a str) -> &'a str {
    if flags & flag != 0 {
        name
    } else {
        none
    }
}

/// Prints descriptors to a writer.
pub struct Printer<W: Write> {
    out: W,
}

impl<W: Write> Printer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn indent(&mut self, indent: usize) -> io::Result<()> {
        for _ in 0..indent {
            self.out.write_all(b"\t")?;
        }
        Ok(())
    }

    /// `.name = { a, b, },`
    fn array<T: Display>(&mut self, indent: usize, name: &str, values: &[T]) -> io::Result<()> {
        self.indent(indent)?;
        write!(self.out, ".{} = {{ ", name)?;
        for value in values {
            write!(self.out, "{}, ", value)?;
        }
        writeln!(self.out, "}},")
    }

    /// One `{ a, b, },` line per row.
    fn matrix<T: Display, const N: usize>(
        &mut self,
        indent: usize,
        name: &str,
        rows: &[[T; N]],
    ) -> io::Result<()> {
        emit!(self, indent, ".{} = {{", name)?;
        for row in rows {
            self.indent(indent + 1)?;
            write!(self.out, "{{ ")?;
            for value in row {
                write!(self.out, "{}, ", value)?;
            }
            writeln!(self.out, "}},")?;
        }
        emit!(self, indent, "}},")
    }

    fn ref_list(&mut self, indent: usize, name: &str, refs: &[Resolution<u8>]) -> io::Result<()> {
        self.indent(indent)?;
        write!(self.out, ".{} = {{ ", name)?;
        // Absent pictures are written as 0, like misses.
        for r in refs {
            write!(self.out, " {}, ", r.unwrap_or(0))?;
        }
        writeln!(self.out, "}},")
    }

    /// Prints `frame` as one initializer block.
    pub fn print_frame(&mut self, frame: &Frame) -> io::Result<()> {
        emit!(self, 1, "{{")?;
        emit!(self, 2, ".index = {},", frame.index)?;

        match &frame.codec {
            CodecFrame::H264(h264) => {
                emit!(self, 2, ".frame.h264 = {{")?;
                self.h264(3, h264)?;
                emit!(self, 2, "}},")?;
            }
            CodecFrame::H265(h265) => {
                emit!(self, 2, ".frame.h265 = {{")?;
                self.h265(3, h265)?;
                emit!(self, 2, "}},")?;
            }
            CodecFrame::Mpeg2(mpeg2) => self.mpeg2(2, mpeg2)?,
        }

        emit!(self, 1, "}},")?;
        self.out.flush()
    }

    fn h264(&mut self, indent: usize, frame: &H264Frame) -> io::Result<()> {
        let params = &frame.decode_params;
        emit!(self, indent, ".decode_param = {{")?;
        emit!(self, indent + 1, ".top_field_order_cnt = {},", params.top_field_order_cnt)?;
        emit!(self, indent + 1, ".bottom_field_order_cnt = {},", params.bottom_field_order_cnt)?;
        emit!(self, indent + 1, ".dpb = {{")?;
        for entry in &params.dpb {
            self.h264_dpb_entry(indent + 2, entry)?;
        }
        emit!(self, indent + 1, "}},")?;
        emit!(self, indent, "}},")?;

        let pps = &frame.pps;
        emit!(self, indent, ".pps = {{")?;
        emit!(self, indent + 1, ".weighted_bipred_idc = {},", pps.weighted_bipred_idc)?;
        emit!(self, indent + 1, ".pic_init_qp_minus26 = {},", pps.pic_init_qp_minus26)?;
        emit!(self, indent + 1, ".pic_init_qs_minus26 = {},", pps.pic_init_qs_minus26)?;
        emit!(self, indent + 1, ".chroma_qp_index_offset = {},", pps.chroma_qp_index_offset)?;
        emit!(
            self,
            indent + 1,
            ".second_chroma_qp_index_offset = {},",
            pps.second_chroma_qp_index_offset
        )?;
        emit!(
            self,
            indent + 1,
            ".flags = {} | {} | {} | {} | {},",
            flag_name(
                pps.flags,
                V4L2_H264_PPS_FLAG_ENTROPY_CODING_MODE,
                "V4L2_H264_PPS_FLAG_ENTROPY_CODING_MODE ",
                " 0 "
            ),
            flag_name(
                pps.flags,
                V4L2_H264_PPS_FLAG_WEIGHTED_PRED,
                "V4L2_H264_PPS_FLAG_WEIGHTED_PRED",
                "0 "
            ),
            flag_name(
                pps.flags,
                V4L2_H264_PPS_FLAG_TRANSFORM_8X8_MODE,
                "V4L2_H264_PPS_FLAG_TRANSFORM_8X8_MODE ",
                "0 "
            ),
            flag_name(
                pps.flags,
                V4L2_H264_PPS_FLAG_CONSTRAINED_INTRA_PRED,
                "V4L2_H264_PPS_FLAG_CONSTRAINED_INTRA_PRED",
                "0 "
            ),
            flag_name(
                pps.flags,
                V4L2_H264_PPS_FLAG_BOTTOM_FIELD_PIC_ORDER_IN_FRAME_PRESENT,
                "V4L2_H264_PPS_FLAG_BOTTOM_FIELD_PIC_ORDER_IN_FRAME_PRESENT",
                "0 "
            ),
        )?;
        emit!(self, indent, "}},")?;

        let sps = &frame.sps;
        emit!(self, indent, ".sps = {{")?;
        emit!(self, indent + 1, ".chroma_format_idc = {},", sps.chroma_format_idc)?;
        emit!(self, indent + 1, ".bit_depth_luma_minus8 = {},", sps.bit_depth_luma_minus8)?;
        emit!(self, indent + 1, ".bit_depth_chroma_minus8 = {},", sps.bit_depth_chroma_minus8)?;
        emit!(
            self,
            indent + 1,
            ".log2_max_frame_num_minus4 = {},",
            sps.log2_max_frame_num_minus4
        )?;
        emit!(
            self,
            indent + 1,
            ".log2_max_pic_order_cnt_lsb_minus4 = {},",
            sps.log2_max_pic_order_cnt_lsb_minus4
        )?;
        emit!(self, indent + 1, ".pic_order_cnt_type = {},", sps.pic_order_cnt_type)?;
        emit!(self, indent + 1, ".pic_width_in_mbs_minus1 = {},", sps.pic_width_in_mbs_minus1)?;
        emit!(
            self,
            indent + 1,
            ".pic_height_in_map_units_minus1 = {},",
            sps.pic_height_in_map_units_minus1
        )?;
        let sps_flag = |flag, name| flag_name(sps.flags, flag, name, "0");
        emit!(
            self,
            indent + 1,
            ".flags = {} | {} | {} | {} | {},",
            sps_flag(
                V4L2_H264_SPS_FLAG_SEPARATE_COLOUR_PLANE,
                "V4L2_H264_SPS_FLAG_SEPARATE_COLOUR_PLANE"
            ),
            sps_flag(
                V4L2_H264_SPS_FLAG_GAPS_IN_FRAME_NUM_VALUE_ALLOWED,
                "V4L2_H264_SPS_FLAG_GAPS_IN_FRAME_NUM_VALUE_ALLOWED"
            ),
            sps_flag(V4L2_H264_SPS_FLAG_FRAME_MBS_ONLY, "V4L2_H264_SPS_FLAG_FRAME_MBS_ONLY"),
            sps_flag(
                V4L2_H264_SPS_FLAG_MB_ADAPTIVE_FRAME_FIELD,
                "V4L2_H264_SPS_FLAG_MB_ADAPTIVE_FRAME_FIELD"
            ),
            sps_flag(
                V4L2_H264_SPS_FLAG_DIRECT_8X8_INFERENCE,
                "V4L2_H264_SPS_FLAG_DIRECT_8X8_INFERENCE"
            ),
        )?;
        emit!(self, indent, "}},")?;

        emit!(self, indent, ".scaling_matrix = {{")?;
        self.matrix(indent + 1, "scaling_list_4x4", &frame.scaling_matrix.scaling_list_4x4)?;
        self.matrix(indent + 1, "scaling_list_8x8", &frame.scaling_matrix.scaling_list_8x8)?;
        emit!(self, indent, "}},")?;

        self.h264_slice_params(indent, &frame.slice_params)
    }

    fn h264_dpb_entry(&mut self, indent: usize, entry: &H264DpbEntry) -> io::Result<()> {
        emit!(self, indent, "[{}] = {{", entry.slot)?;
        emit!(self, indent + 1, ".frame_num = {},", entry.frame_num)?;
        emit!(self, indent + 1, ".timestamp = TS_REF_INDEX({}),", entry.timestamp)?;
        emit!(self, indent + 1, ".top_field_order_cnt = {},", entry.top_field_order_cnt)?;
        emit!(self, indent + 1, ".bottom_field_order_cnt = {},", entry.bottom_field_order_cnt)?;
        emit!(
            self,
            indent + 1,
            ".flags = V4L2_H264_DPB_ENTRY_FLAG_VALID | {} | {},",
            flag_name(
                entry.flags,
                V4L2_H264_DPB_ENTRY_FLAG_LONG_TERM,
                "V4L2_H264_DPB_ENTRY_FLAG_LONG_TERM",
                "0"
            ),
            flag_name(
                entry.flags,
                V4L2_H264_DPB_ENTRY_FLAG_ACTIVE,
                "V4L2_H264_DPB_ENTRY_FLAG_ACTIVE",
                "0"
            ),
        )?;
        emit!(self, indent, "}},")
    }

    fn h264_slice_params(&mut self, indent: usize, slice: &H264SliceParams) -> io::Result<()> {
        emit!(self, indent, ".slice_param = {{")?;
        let indent = indent + 1;
        emit!(self, indent, ".size = {},", slice.size)?;
        emit!(self, indent, ".header_bit_size = {},", slice.header_bit_size)?;
        emit!(self, indent, ".first_mb_in_slice = {},", slice.first_mb_in_slice)?;
        emit!(self, indent, ".slice_type = {},", slice.slice_type)?;
        emit!(self, indent, ".cabac_init_idc = {},", slice.cabac_init_idc)?;
        emit!(self, indent, ".slice_qp_delta = {},", slice.slice_qp_delta)?;
        emit!(
            self,
            indent,
            ".disable_deblocking_filter_idc = {},",
            slice.disable_deblocking_filter_idc
        )?;
        emit!(self, indent, ".slice_alpha_c0_offset_div2 = {},", slice.slice_alpha_c0_offset_div2)?;
        emit!(self, indent, ".slice_beta_offset_div2 = {},", slice.slice_beta_offset_div2)?;

        let kind = slice.kind();
        if matches!(kind, H264SliceType::P | H264SliceType::B) {
            emit!(
                self,
                indent,
                ".num_ref_idx_l0_active_minus1 = {},",
                slice.num_ref_idx_l0_active_minus1
            )?;
            self.ref_list(indent, "ref_pic_list0", &slice.ref_pic_list0)?;
        }
        if kind == H264SliceType::B {
            emit!(
                self,
                indent,
                ".num_ref_idx_l1_active_minus1 = {},",
                slice.num_ref_idx_l1_active_minus1
            )?;
            self.ref_list(indent, "ref_pic_list1", &slice.ref_pic_list1)?;
        }

        if slice.flags & V4L2_H264_SLICE_FLAG_DIRECT_SPATIAL_MV_PRED != 0 {
            emit!(self, indent, ".flags = V4L2_H264_SLICE_FLAG_DIRECT_SPATIAL_MV_PRED,")?;
        }

        self.h264_pred_weight_table(indent, &slice.pred_weight_table)?;
        emit!(self, indent - 1, "}},")
    }

    fn h264_pred_weight_table(
        &mut self,
        indent: usize,
        table: &H264PredWeightTable,
    ) -> io::Result<()> {
        emit!(self, indent, ".pred_weight_table = {{")?;
        emit!(self, indent + 1, ".chroma_log2_weight_denom = {},", table.chroma_log2_weight_denom)?;
        emit!(self, indent + 1, ".luma_log2_weight_denom = {},", table.luma_log2_weight_denom)?;
        emit!(self, indent + 1, ".weight_factors = {{")?;
        for factors in &table.weight_factors {
            emit!(self, indent + 1, "{{")?;
            self.array(indent + 2, "luma_weight", &factors.luma_weight)?;
            self.array(indent + 2, "luma_offset", &factors.luma_offset)?;
            self.matrix(indent + 2, "chroma_weight", &factors.chroma_weight)?;
            self.matrix(indent + 2, "chroma_offset", &factors.chroma_offset)?;
            emit!(self, indent + 1, "}},")?;
        }
        emit!(self, indent + 1, "}},")?;
        emit!(self, indent, "}},")
    }

    fn h265(&mut self, indent: usize, frame: &H265Frame) -> io::Result<()> {
        self.h265_sps(indent, &frame.sps)?;
        self.h265_pps(indent, &frame.pps)?;
        self.h265_slice_params(indent, &frame.slice_params)
    }

    fn h265_sps(&mut self, indent: usize, sps: &H265Sps) -> io::Result<()> {
        emit!(self, indent, ".sps = {{")?;
        let i = indent + 1;
        emit!(self, i, ".chroma_format_idc = {},", sps.chroma_format_idc)?;
        emit!(self, i, ".separate_colour_plane_flag = {},", u8::from(sps.separate_colour_plane_flag))?;
        emit!(self, i, ".pic_width_in_luma_samples = {},", sps.pic_width_in_luma_samples)?;
        emit!(self, i, ".pic_height_in_luma_samples = {},", sps.pic_height_in_luma_samples)?;
        emit!(self, i, ".bit_depth_luma_minus8 = {},", sps.bit_depth_luma_minus8)?;
        emit!(self, i, ".bit_depth_chroma_minus8 = {},", sps.bit_depth_chroma_minus8)?;
        emit!(
            self,
            i,
            ".log2_max_pic_order_cnt_lsb_minus4 = {},",
            sps.log2_max_pic_order_cnt_lsb_minus4
        )?;
        emit!(
            self,
            i,
            ".sps_max_dec_pic_buffering_minus1 = {},",
            sps.sps_max_dec_pic_buffering_minus1
        )?;
        emit!(self, i, ".sps_max_num_reorder_pics = {},", sps.sps_max_num_reorder_pics)?;
        emit!(
            self,
            i,
            ".sps_max_latency_increase_plus1 = {},",
            sps.sps_max_latency_increase_plus1
        )?;
        emit!(
            self,
            i,
            ".log2_min_luma_coding_block_size_minus3 = {},",
            sps.log2_min_luma_coding_block_size_minus3
        )?;
        emit!(
            self,
            i,
            ".log2_diff_max_min_luma_coding_block_size = {},",
            sps.log2_diff_max_min_luma_coding_block_size
        )?;
        emit!(
            self,
            i,
            ".log2_min_luma_transform_block_size_minus2 = {},",
            sps.log2_min_luma_transform_block_size_minus2
        )?;
        emit!(
            self,
            i,
            ".log2_diff_max_min_luma_transform_block_size = {},",
            sps.log2_diff_max_min_luma_transform_block_size
        )?;
        emit!(
            self,
            i,
            ".max_transform_hierarchy_depth_inter = {},",
            sps.max_transform_hierarchy_depth_inter
        )?;
        emit!(
            self,
            i,
            ".max_transform_hierarchy_depth_intra = {},",
            sps.max_transform_hierarchy_depth_intra
        )?;
        emit!(self, i, ".scaling_list_enabled_flag = {},", u8::from(sps.scaling_list_enabled_flag))?;
        emit!(self, i, ".amp_enabled_flag = {},", u8::from(sps.amp_enabled_flag))?;
        emit!(
            self,
            i,
            ".sample_adaptive_offset_enabled_flag = {},",
            u8::from(sps.sample_adaptive_offset_enabled_flag)
        )?;
        emit!(self, i, ".pcm_enabled_flag = {},", u8::from(sps.pcm_enabled_flag))?;
        emit!(
            self,
            i,
            ".pcm_sample_bit_depth_luma_minus1 = {},",
            sps.pcm_sample_bit_depth_luma_minus1
        )?;
        emit!(
            self,
            i,
            ".pcm_sample_bit_depth_chroma_minus1 = {},",
            sps.pcm_sample_bit_depth_chroma_minus1
        )?;
        emit!(
            self,
            i,
            ".log2_min_pcm_luma_coding_block_size_minus3 = {},",
            sps.log2_min_pcm_luma_coding_block_size_minus3
        )?;
        emit!(
            self,
            i,
            ".log2_diff_max_min_pcm_luma_coding_block_size = {},",
            sps.log2_diff_max_min_pcm_luma_coding_block_size
        )?;
        emit!(
            self,
            i,
            ".pcm_loop_filter_disabled_flag = {},",
            u8::from(sps.pcm_loop_filter_disabled_flag)
        )?;
        emit!(self, i, ".num_short_term_ref_pic_sets = {},", sps.num_short_term_ref_pic_sets)?;
        emit!(
            self,
            i,
            ".long_term_ref_pics_present_flag = {},",
            u8::from(sps.long_term_ref_pics_present_flag)
        )?;
        emit!(self, i, ".num_long_term_ref_pics_sps = {},", sps.num_long_term_ref_pics_sps)?;
        emit!(
            self,
            i,
            ".sps_temporal_mvp_enabled_flag = {},",
            u8::from(sps.sps_temporal_mvp_enabled_flag)
        )?;
        emit!(
            self,
            i,
            ".strong_intra_smoothing_enabled_flag = {},",
            u8::from(sps.strong_intra_smoothing_enabled_flag)
        )?;
        emit!(self, indent, "}},")
    }

    fn h265_pps(&mut self, indent: usize, pps: &H265Pps) -> io::Result<()> {
        emit!(self, indent, ".pps = {{")?;
        let i = indent + 1;
        emit!(
            self,
            i,
            ".dependent_slice_segment_flag = {},",
            u8::from(pps.dependent_slice_segment_flag)
        )?;
        emit!(self, i, ".output_flag_present_flag = {},", u8::from(pps.output_flag_present_flag))?;
        emit!(self, i, ".num_extra_slice_header_bits = {},", pps.num_extra_slice_header_bits)?;
        emit!(
            self,
            i,
            ".sign_data_hiding_enabled_flag = {},",
            u8::from(pps.sign_data_hiding_enabled_flag)
        )?;
        emit!(self, i, ".cabac_init_present_flag = {},", u8::from(pps.cabac_init_present_flag))?;
        emit!(self, i, ".init_qp_minus26 = {},", pps.init_qp_minus26)?;
        emit!(
            self,
            i,
            ".constrained_intra_pred_flag = {},",
            u8::from(pps.constrained_intra_pred_flag)
        )?;
        emit!(
            self,
            i,
            ".transform_skip_enabled_flag = {},",
            u8::from(pps.transform_skip_enabled_flag)
        )?;
        emit!(self, i, ".cu_qp_delta_enabled_flag = {},", u8::from(pps.cu_qp_delta_enabled_flag))?;
        emit!(self, i, ".diff_cu_qp_delta_depth = {},", pps.diff_cu_qp_delta_depth)?;
        emit!(self, i, ".pps_cb_qp_offset = {},", pps.pps_cb_qp_offset)?;
        emit!(self, i, ".pps_cr_qp_offset = {},", pps.pps_cr_qp_offset)?;
        emit!(
            self,
            i,
            ".pps_slice_chroma_qp_offsets_present_flag = {},",
            u8::from(pps.pps_slice_chroma_qp_offsets_present_flag)
        )?;
        emit!(self, i, ".weighted_pred_flag = {},", u8::from(pps.weighted_pred_flag))?;
        emit!(self, i, ".weighted_bipred_flag = {},", u8::from(pps.weighted_bipred_flag))?;
        emit!(
            self,
            i,
            ".transquant_bypass_enabled_flag = {},",
            u8::from(pps.transquant_bypass_enabled_flag)
        )?;
        emit!(self, i, ".tiles_enabled_flag = {},", u8::from(pps.tiles_enabled_flag))?;
        emit!(
            self,
            i,
            ".entropy_coding_sync_enabled_flag = {},",
            u8::from(pps.entropy_coding_sync_enabled_flag)
        )?;
        emit!(self, i, ".num_tile_columns_minus1 = {},", pps.num_tile_columns_minus1)?;
        emit!(self, i, ".num_tile_rows_minus1 = {},", pps.num_tile_rows_minus1)?;
        if pps.tiles_enabled_flag {
            let columns = (usize::from(pps.num_tile_columns_minus1) + 1)
                .min(pps.column_width_minus1.len());
            let rows =
                (usize::from(pps.num_tile_rows_minus1) + 1).min(pps.row_height_minus1.len());
            self.array(i, "column_width_minus1", &pps.column_width_minus1[..columns])?;
            self.array(i, "row_height_minus1", &pps.row_height_minus1[..rows])?;
        }
        emit!(
            self,
            i,
            ".loop_filter_across_tiles_enabled_flag = {},",
            u8::from(pps.loop_filter_across_tiles_enabled_flag)
        )?;
        emit!(
            self,
            i,
            ".pps_loop_filter_across_slices_enabled_flag = {},",
            u8::from(pps.pps_loop_filter_across_slices_enabled_flag)
        )?;
        emit!(
            self,
            i,
            ".deblocking_filter_override_enabled_flag = {},",
            u8::from(pps.deblocking_filter_override_enabled_flag)
        )?;
        emit!(
            self,
            i,
            ".pps_disable_deblocking_filter_flag = {},",
            u8::from(pps.pps_disable_deblocking_filter_flag)
        )?;
        emit!(self, i, ".pps_beta_offset_div2 = {},", pps.pps_beta_offset_div2)?;
        emit!(self, i, ".pps_tc_offset_div2 = {},", pps.pps_tc_offset_div2)?;
        emit!(
            self,
            i,
            ".lists_modification_present_flag = {},",
            u8::from(pps.lists_modification_present_flag)
        )?;
        emit!(
            self,
            i,
            ".log2_parallel_merge_level_minus2 = {},",
            pps.log2_parallel_merge_level_minus2
        )?;
        emit!(self, indent, "}},")
    }

    fn h265_slice_params(&mut self, indent: usize, slice: &H265SliceParams) -> io::Result<()> {
        emit!(self, indent, ".slice_params = {{")?;
        let i = indent + 1;
        emit!(self, i, ".bit_size = {},", slice.bit_size)?;
        emit!(self, i, ".data_bit_offset = {},", slice.data_bit_offset)?;
        emit!(self, i, ".nal_unit_type = {},", slice.nal_unit_type)?;
        emit!(self, i, ".nuh_temporal_id_plus1 = {},", slice.nuh_temporal_id_plus1)?;
        let slice_type = match slice.slice_type {
            Some(H265SliceType::B) => "V4L2_HEVC_SLICE_TYPE_B",
            Some(H265SliceType::P) => "V4L2_HEVC_SLICE_TYPE_P",
            Some(H265SliceType::I) => "V4L2_HEVC_SLICE_TYPE_I",
            None => "V4L2_HEVC_SLICE_TYPE_INVALID",
        };
        emit!(self, i, ".slice_type = {},", slice_type)?;
        emit!(self, i, ".colour_plane_id = {},", slice.colour_plane_id)?;
        emit!(self, i, ".slice_pic_order_cnt = {},", slice.slice_pic_order_cnt)?;
        emit!(self, i, ".slice_sao_luma_flag = {},", u8::from(slice.slice_sao_luma_flag))?;
        emit!(self, i, ".slice_sao_chroma_flag = {},", u8::from(slice.slice_sao_chroma_flag))?;
        emit!(
            self,
            i,
            ".slice_temporal_mvp_enabled_flag = {},",
            u8::from(slice.slice_temporal_mvp_enabled_flag)
        )?;
        emit!(
            self,
            i,
            ".num_ref_idx_l0_active_minus1 = {},",
            slice.num_ref_idx_l0_active_minus1
        )?;
        emit!(
            self,
            i,
            ".num_ref_idx_l1_active_minus1 = {},",
            slice.num_ref_idx_l1_active_minus1
        )?;
        emit!(self, i, ".mvd_l1_zero_flag = {},", u8::from(slice.mvd_l1_zero_flag))?;
        emit!(self, i, ".cabac_init_flag = {},", u8::from(slice.cabac_init_flag))?;
        emit!(self, i, ".collocated_from_l0_flag = {},", u8::from(slice.collocated_from_l0_flag))?;
        emit!(self, i, ".collocated_ref_idx = {},", slice.collocated_ref_idx)?;
        emit!(
            self,
            i,
            ".five_minus_max_num_merge_cand = {},",
            slice.five_minus_max_num_merge_cand
        )?;
        emit!(self, i, ".use_integer_mv_flag = {},", u8::from(slice.use_integer_mv_flag))?;
        emit!(self, i, ".slice_qp_delta = {},", slice.slice_qp_delta)?;
        emit!(self, i, ".slice_cb_qp_offset = {},", slice.slice_cb_qp_offset)?;
        emit!(self, i, ".slice_cr_qp_offset = {},", slice.slice_cr_qp_offset)?;
        emit!(self, i, ".slice_act_y_qp_offset = {},", slice.slice_act_y_qp_offset)?;
        emit!(self, i, ".slice_act_cb_qp_offset = {},", slice.slice_act_cb_qp_offset)?;
        emit!(self, i, ".slice_act_cr_qp_offset = {},", slice.slice_act_cr_qp_offset)?;
        emit!(
            self,
            i,
            ".slice_deblocking_filter_disabled_flag = {},",
            u8::from(slice.slice_deblocking_filter_disabled_flag)
        )?;
        emit!(self, i, ".slice_beta_offset_div2 = {},", slice.slice_beta_offset_div2)?;
        emit!(self, i, ".slice_tc_offset_div2 = {},", slice.slice_tc_offset_div2)?;
        emit!(
            self,
            i,
            ".slice_loop_filter_across_slices_enabled_flag = {},",
            u8::from(slice.slice_loop_filter_across_slices_enabled_flag)
        )?;
        emit!(self, i, ".pic_struct = {},", slice.pic_struct)?;

        if slice.is_intra() {
            emit!(self, i, ".dpb = {{ 0 }},")?;
        } else {
            emit!(self, i, ".dpb = {{")?;
            for entry in &slice.dpb {
                self.h265_dpb_entry(i + 1, entry)?;
            }
            emit!(self, i, "}},")?;
        }
        emit!(self, i, ".num_active_dpb_entries = {},", slice.num_active_dpb_entries)?;

        self.h265_ref_idx(i, "ref_idx_l0", &slice.ref_idx_l0)?;
        self.h265_ref_idx(i, "ref_idx_l1", &slice.ref_idx_l1)?;

        emit!(self, i, ".num_rps_poc_st_curr_before = {},", slice.num_rps_poc_st_curr_before)?;
        emit!(self, i, ".num_rps_poc_st_curr_after = {},", slice.num_rps_poc_st_curr_after)?;
        emit!(self, i, ".num_rps_poc_lt_curr = {},", slice.num_rps_poc_lt_curr)?;

        match &slice.pred_weight_table {
            Some(table) => self.h265_pred_weight_table(i, table, slice.is_b())?,
            None => emit!(self, i, ".pred_weight_table = {{ 0 }},")?,
        }

        emit!(self, indent, "}},")
    }

    fn h265_dpb_entry(&mut self, indent: usize, entry: &H265DpbEntry) -> io::Result<()> {
        emit!(self, indent, "{{")?;
        emit!(self, indent + 1, ".timestamp = TS_REF_INDEX({}),", entry.timestamp)?;
        match entry.rps {
            H265Rps::StCurrBefore => {
                emit!(self, indent + 1, ".rps = V4L2_HEVC_DPB_ENTRY_RPS_ST_CURR_BEFORE,")?
            }
            H265Rps::StCurrAfter => {
                emit!(self, indent + 1, ".rps = V4L2_HEVC_DPB_ENTRY_RPS_ST_CURR_AFTER,")?
            }
            H265Rps::LtCurr => emit!(self, indent + 1, ".rps = V4L2_HEVC_DPB_ENTRY_RPS_LT_CURR,")?,
            H265Rps::None => emit!(self, indent + 1, ".rps = 0,")?,
        }
        emit!(self, indent + 1, ".field_pic = {},", u8::from(entry.field_pic))?;
        emit!(
            self,
            indent + 1,
            ".pic_order_cnt = {{ {}, {} }},",
            entry.pic_order_cnt[0],
            entry.pic_order_cnt[1]
        )?;
        emit!(self, indent, "}},")
    }

    fn h265_ref_idx(
        &mut self,
        indent: usize,
        name: &str,
        refs: &[Resolution<u8>],
    ) -> io::Result<()> {
        if refs.is_empty() {
            return emit!(self, indent, ".{} = {{ 255 }},", name);
        }
        let indices: Vec<u8> = refs.iter().map(|r| r.index()).collect();
        self.array(indent, name, &indices[..])
    }

    fn h265_pred_weight_table(
        &mut self,
        indent: usize,
        table: &H265PredWeightTable,
        is_b: bool,
    ) -> io::Result<()> {
        emit!(self, indent, ".pred_weight_table = {{")?;
        let i = indent + 1;
        emit!(self, i, ".luma_log2_weight_denom = {},", table.luma_log2_weight_denom)?;
        emit!(
            self,
            i,
            ".delta_chroma_log2_weight_denom = {},",
            table.delta_chroma_log2_weight_denom
        )?;
        self.array(i, "delta_luma_weight_l0", &table.delta_luma_weight_l0)?;
        self.array(i, "luma_offset_l0", &table.luma_offset_l0)?;
        self.matrix(i, "delta_chroma_weight_l0", &table.delta_chroma_weight_l0)?;
        self.matrix(i, "chroma_offset_l0", &table.chroma_offset_l0)?;

        if is_b {
            self.array(i, "delta_luma_weight_l1", &table.delta_luma_weight_l1)?;
            self.array(i, "luma_offset_l1", &table.luma_offset_l1)?;
            self.matrix(i, "delta_chroma_weight_l1", &table.delta_chroma_weight_l1)?;
            self.matrix(i, "chroma_offset_l1", &table.chroma_offset_l1)?;
        } else {
            for name in [
                "delta_luma_weight_l1",
                "luma_offset_l1",
                "delta_chroma_weight_l1",
                "chroma_offset_l1",
            ] {
                emit!(self, i, ".{} = {{ 0 }},", name)?;
            }
        }

        emit!(self, indent, "}},")
    }

    fn mpeg2(&mut self, indent: usize, frame: &Mpeg2Frame) -> io::Result<()> {
        let sequence = &frame.sequence;
        emit!(self, indent, ".frame.mpeg2.sequence = {{")?;
        emit!(self, indent + 1, ".horizontal_size = {},", sequence.horizontal_size)?;
        emit!(self, indent + 1, ".vertical_size = {},", sequence.vertical_size)?;
        emit!(self, indent + 1, ".vbv_buffer_size = {},", sequence.vbv_buffer_size)?;
        emit!(self, indent + 1, ".chroma_format = {},", sequence.chroma_format)?;
        emit!(self, indent, "}},")?;

        let slice = &frame.slice_params;
        emit!(self, indent, ".frame.mpeg2.slice_params = {{")?;
        let i = indent + 1;
        let slice_type = match slice.slice_type {
            Some(Mpeg2SliceType::I) => "V4L2_MPEG2_SLICE_TYPE_I",
            Some(Mpeg2SliceType::P) => "V4L2_MPEG2_SLICE_TYPE_P",
            Some(Mpeg2SliceType::B) => "V4L2_MPEG2_SLICE_TYPE_B",
            None => "V4L2_MPEG2_SLICE_TYPE_INVALID",
        };
        emit!(self, i, ".slice_type = {},", slice_type)?;
        emit!(
            self,
            i,
            ".f_code = {{ {}, {}, {}, {} }},",
            slice.f_code[0][0],
            slice.f_code[0][1],
            slice.f_code[1][0],
            slice.f_code[1][1]
        )?;
        emit!(self, i, ".intra_dc_precision = {},", slice.intra_dc_precision)?;
        emit!(self, i, ".picture_structure = {},", slice.picture_structure)?;
        emit!(self, i, ".top_field_first = {},", u8::from(slice.top_field_first))?;
        emit!(self, i, ".frame_pred_frame_dct = {},", u8::from(slice.frame_pred_frame_dct))?;
        emit!(
            self,
            i,
            ".concealment_motion_vectors = {},",
            u8::from(slice.concealment_motion_vectors)
        )?;
        emit!(self, i, ".q_scale_type = {},", u8::from(slice.q_scale_type))?;
        emit!(self, i, ".intra_vlc_format = {},", u8::from(slice.intra_vlc_format))?;
        emit!(self, i, ".alternate_scan = {},", u8::from(slice.alternate_scan))?;
        emit!(self, i, ".repeat_first_field = {},", u8::from(slice.repeat_first_field))?;
        emit!(self, i, ".progressive_frame = {},", u8::from(slice.progressive_frame))?;
        // Misses already carry the current frame index.
        emit!(self, i, ".forward_ref_index = {},", slice.forward_ref_index.unwrap_or(0))?;
        emit!(self, i, ".backward_ref_index = {},", slice.backward_ref_index.unwrap_or(0))?;
        emit!(self, indent, "}},")?;

        let q = &frame.quantization;
        emit!(self, indent, ".frame.mpeg2.quantization = {{")?;
        emit!(
            self,
            i,
            ".load_intra_quantiser_matrix = {},",
            u8::from(q.load_intra_quantiser_matrix)
        )?;
        emit!(
            self,
            i,
            ".load_non_intra_quantiser_matrix = {},",
            u8::from(q.load_non_intra_quantiser_matrix)
        )?;
        emit!(
            self,
            i,
            ".load_chroma_intra_quantiser_matrix = {},",
            u8::from(q.load_chroma_intra_quantiser_matrix)
        )?;
        emit!(
            self,
            i,
            ".load_chroma_non_intra_quantiser_matrix = {},",
            u8::from(q.load_chroma_non_intra_quantiser_matrix)
        )?;
        self.array(i, "intra_quantiser_matrix", &q.intra_quantiser_matrix)?;
        self.array(i, "non_intra_quantiser_matrix", &q.non_intra_quantiser_matrix)?;
        self.array(i, "chroma_intra_quantiser_matrix", &q.chroma_intra_quantiser_matrix)?;
        self.array(
            i,
            "chroma_non_intra_quantiser_matrix",
            &q.chroma_non_intra_quantiser_matrix,
        )?;
        emit!(self, indent, "}},")
    }
}
