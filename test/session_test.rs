// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;
    use std::path::PathBuf;

    use bytes::Bytes;

    use va_dump::codec::h264::H264Frame;
    use va_dump::codec::h264::V4L2_H264_DPB_ENTRY_FLAG_ACTIVE;
    use va_dump::codec::h264::V4L2_H264_DPB_ENTRY_FLAG_VALID;
    use va_dump::codec::h265::H265Frame;
    use va_dump::codec::h265::H265Rps;
    use va_dump::codec::mpeg2::Mpeg2Frame;
    use va_dump::codec::CodecFrame;
    use va_dump::config::DumpConfig;
    use va_dump::resolver::Resolution;
    use va_dump::session::Buffer;
    use va_dump::session::Codec;
    use va_dump::session::IqMatrix;
    use va_dump::session::PictureParameter;
    use va_dump::session::Session;
    use va_dump::session::SliceParameter;
    use va_dump::va::h264::PictureH264;
    use va_dump::va::h264::PictureParameterBufferH264;
    use va_dump::va::h264::SliceParameterBufferH264;
    use va_dump::va::h264::VA_PICTURE_H264_SHORT_TERM_REFERENCE;
    use va_dump::va::h265::PictureHevc;
    use va_dump::va::h265::PictureParameterBufferHevc;
    use va_dump::va::h265::SliceParameterBufferHevc;
    use va_dump::va::h265::VA_PICTURE_HEVC_RPS_ST_CURR_BEFORE;
    use va_dump::va::mpeg2::IQMatrixBufferMpeg2;
    use va_dump::va::mpeg2::PictureParameterBufferMpeg2;
    use va_dump::va::SurfaceId;
    use va_dump::va::VA_INVALID_SURFACE;

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    /// Creates an empty directory for the slice dumps of `name`.
    fn dump_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("va-dump-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn config(dir: &Path, dump_count: u32) -> DumpConfig {
        DumpConfig {
            dump_count,
            slices_path: dir.to_path_buf(),
            ..Default::default()
        }
    }

    fn h264_ref(id: SurfaceId, frame_idx: u32, poc: i32) -> PictureH264 {
        PictureH264 {
            picture_id: id,
            frame_idx,
            flags: VA_PICTURE_H264_SHORT_TERM_REFERENCE,
            top_field_order_cnt: poc,
            bottom_field_order_cnt: poc,
        }
    }

    fn h264_frame(frame: Option<va_dump::codec::Frame>) -> H264Frame {
        match frame.map(|f| f.codec) {
            Some(CodecFrame::H264(f)) => f,
            f => panic!("expected an H.264 frame, got {:?}", f),
        }
    }

    #[test]
    fn h264_references_follow_output_commit() {
        init_logging();
        let dir = dump_dir("h264");
        let mut session = Session::new(Codec::H264, config(&dir, 2), Vec::new());
        let surfaces = session.create_surfaces(3);
        let (k1, k2, k3) = (surfaces[0], surfaces[1], surfaces[2]);

        // IDR frame.
        let mut picture = PictureParameterBufferH264 {
            curr_pic: h264_ref(k1, 0, 0),
            ..Default::default()
        };
        picture.seq_fields.frame_mbs_only_flag = true;
        let slice = SliceParameterBufferH264 {
            slice_data_size: 4,
            slice_type: 7,
            ..Default::default()
        };

        session.begin_picture(k1).unwrap();
        session
            .render_picture(&[
                Buffer::PictureParameter(PictureParameter::H264(picture.clone())),
                Buffer::SliceParameter(SliceParameter::H264(slice.clone())),
                Buffer::SliceData(Bytes::from_static(&[0x00, 0x00, 0x01, 0x65])),
            ])
            .unwrap();
        let frame = h264_frame(session.end_picture().unwrap());

        assert!(frame.decode_params.dpb.is_empty());
        assert!(frame.slice_params.ref_pic_list0.is_empty());

        // P frame referencing the IDR frame.
        picture.curr_pic = h264_ref(k2, 1, 4);
        picture.num_ref_frames = 1;
        picture.reference_frames[0] = h264_ref(k1, 0, 0);
        let mut slice = SliceParameterBufferH264 {
            slice_data_size: 4,
            slice_type: 5,
            ..slice
        };
        slice.ref_pic_list0[0] = h264_ref(k1, 0, 0);

        session.begin_picture(k2).unwrap();
        session
            .render_picture(&[
                Buffer::PictureParameter(PictureParameter::H264(picture.clone())),
                Buffer::SliceParameter(SliceParameter::H264(slice)),
                Buffer::SliceData(Bytes::from_static(&[0x00, 0x00, 0x01, 0x41])),
            ])
            .unwrap();
        let frame = h264_frame(session.end_picture().unwrap());

        assert_eq!(frame.decode_params.dpb.len(), 1);
        let entry = &frame.decode_params.dpb[0];
        assert_eq!(entry.slot, 0);
        assert_eq!(entry.timestamp, 0);
        assert_eq!(
            entry.flags,
            V4L2_H264_DPB_ENTRY_FLAG_VALID | V4L2_H264_DPB_ENTRY_FLAG_ACTIVE
        );
        assert_eq!(frame.slice_params.ref_pic_list0, vec![Resolution::Resolved(0)]);

        // Beyond the dump count: not translated, no slice file.
        session.begin_picture(k3).unwrap();
        session
            .render_picture(&[Buffer::SliceData(Bytes::from_static(&[0xff]))])
            .unwrap();
        assert!(session.end_picture().unwrap().is_none());
        assert_eq!(session.frame_index(), 3);

        assert_eq!(fs::read(dir.join("slice-0.dump")).unwrap(), vec![0, 0, 1, 0x65]);
        assert_eq!(fs::read(dir.join("slice-1.dump")).unwrap(), vec![0, 0, 1, 0x41]);
        assert!(!dir.join("slice-2.dump").exists());

        let text = String::from_utf8(session.into_inner()).unwrap();
        assert!(text.starts_with("\t{\n\t\t.index = 0,\n\t\t.frame.h264 = {\n"));
        assert!(text.contains("\t\t.index = 1,\n"));
        assert!(text.contains("\t\t\t\t\t[0] = {\n"));
        assert!(text.contains("\t\t\t\t\t\t.timestamp = TS_REF_INDEX(0),\n"));
        assert!(!text.contains("\t\t.index = 2,\n"));

        fs::remove_dir_all(&dir).unwrap();
    }

    fn mpeg2_picture(coding_type: i32, forward: SurfaceId, backward: SurfaceId) -> Buffer {
        Buffer::PictureParameter(PictureParameter::Mpeg2(PictureParameterBufferMpeg2 {
            horizontal_size: 176,
            vertical_size: 144,
            forward_reference_picture: forward,
            backward_reference_picture: backward,
            picture_coding_type: coding_type,
            f_code: 0x11ff,
            ..Default::default()
        }))
    }

    fn mpeg2_frame(frame: Option<va_dump::codec::Frame>) -> Mpeg2Frame {
        match frame.map(|f| f.codec) {
            Some(CodecFrame::Mpeg2(f)) => f,
            f => panic!("expected an MPEG-2 frame, got {:?}", f),
        }
    }

    #[test]
    fn mpeg2_unknown_reference_falls_back_to_current_frame() {
        init_logging();
        let dir = dump_dir("mpeg2");
        let mut session = Session::new(Codec::Mpeg2, config(&dir, 3), Vec::new());
        let surfaces = session.create_surfaces(3);

        session.begin_picture(surfaces[0]).unwrap();
        session
            .render_picture(&[
                mpeg2_picture(1, VA_INVALID_SURFACE, VA_INVALID_SURFACE),
                Buffer::IqMatrix(IqMatrix::Mpeg2(IQMatrixBufferMpeg2 {
                    load_intra_quantiser_matrix: true,
                    intra_quantiser_matrix: [16; 64],
                    ..Default::default()
                })),
            ])
            .unwrap();
        let frame = mpeg2_frame(session.end_picture().unwrap());
        assert_eq!(frame.quantization.intra_quantiser_matrix, [16; 64]);

        session.begin_picture(surfaces[1]).unwrap();
        session
            .render_picture(&[mpeg2_picture(2, 0x0400_0042, VA_INVALID_SURFACE)])
            .unwrap();
        let frame = mpeg2_frame(session.end_picture().unwrap());
        assert_eq!(frame.slice_params.forward_ref_index, Resolution::Fallback(1));
        assert_eq!(frame.slice_params.backward_ref_index, Resolution::Fallback(1));
        // The IQ matrix of the first frame still applies.
        assert!(frame.quantization.load_intra_quantiser_matrix);

        session.begin_picture(surfaces[2]).unwrap();
        session
            .render_picture(&[mpeg2_picture(3, surfaces[0], surfaces[1])])
            .unwrap();
        let frame = mpeg2_frame(session.end_picture().unwrap());
        assert_eq!(frame.slice_params.forward_ref_index, Resolution::Resolved(0));
        assert_eq!(frame.slice_params.backward_ref_index, Resolution::Resolved(1));

        let text = String::from_utf8(session.into_inner()).unwrap();
        assert!(text.contains("\t\t\t.slice_type = V4L2_MPEG2_SLICE_TYPE_P,\n"));
        assert!(text.contains("\t\t\t.forward_ref_index = 1,\n"));
        assert!(text.contains("\t\t\t.f_code = { 1, 1, 15, 15 },\n"));

        fs::remove_dir_all(&dir).unwrap();
    }

    fn h265_frame(frame: Option<va_dump::codec::Frame>) -> H265Frame {
        match frame.map(|f| f.codec) {
            Some(CodecFrame::H265(f)) => f,
            f => panic!("expected an H.265 frame, got {:?}", f),
        }
    }

    fn hevc_slice(slice_type: u8) -> SliceParameterBufferHevc {
        let mut slice = SliceParameterBufferHevc {
            slice_data_size: 5,
            slice_data_byte_offset: 4,
            ..Default::default()
        };
        slice.long_slice_flags.slice_type = slice_type;
        slice
    }

    #[test]
    fn h265_slice_dpb_and_bit_offset() {
        init_logging();
        let dir = dump_dir("h265");
        let mut session = Session::new(Codec::H265, config(&dir, 2), Vec::new());
        let surfaces = session.create_surfaces(2);
        let (k1, k2) = (surfaces[0], surfaces[1]);

        // IDR_W_RADL, temporal id 0.
        let mut picture = PictureParameterBufferHevc {
            curr_pic: PictureHevc {
                picture_id: k1,
                pic_order_cnt: 0,
                flags: 0,
            },
            ..Default::default()
        };

        session.begin_picture(k1).unwrap();
        session
            .render_picture(&[
                Buffer::PictureParameter(PictureParameter::H265(picture.clone())),
                Buffer::SliceParameter(SliceParameter::H265(hevc_slice(2))),
                Buffer::SliceData(Bytes::from_static(&[0x26, 0x01, 0xaf, 0x80, 0x11])),
            ])
            .unwrap();
        let frame = h265_frame(session.end_picture().unwrap());
        let slice = &frame.slice_params;
        assert_eq!(slice.nal_unit_type, 19);
        assert_eq!(slice.data_bit_offset, 4 * 8 - 8);
        assert!(slice.dpb.is_empty());

        // TRAIL_R P slice referencing the IDR frame.
        picture.curr_pic = PictureHevc {
            picture_id: k2,
            pic_order_cnt: 4,
            flags: 0,
        };
        picture.reference_frames[0] = PictureHevc {
            picture_id: k1,
            pic_order_cnt: 0,
            flags: VA_PICTURE_HEVC_RPS_ST_CURR_BEFORE,
        };
        let mut p_slice = hevc_slice(1);
        p_slice.ref_pic_list[0][0] = 0;

        session.begin_picture(k2).unwrap();
        session
            .render_picture(&[
                Buffer::PictureParameter(PictureParameter::H265(picture)),
                Buffer::SliceParameter(SliceParameter::H265(p_slice)),
                Buffer::SliceData(Bytes::from_static(&[0x02, 0x01, 0xe0, 0x08, 0x22])),
            ])
            .unwrap();
        let frame = h265_frame(session.end_picture().unwrap());
        let slice = &frame.slice_params;

        assert_eq!(slice.nal_unit_type, 1);
        assert_eq!(slice.bit_size, 40);
        assert_eq!(slice.data_bit_offset, 28);
        assert_eq!(slice.num_active_dpb_entries, 1);
        assert_eq!(slice.dpb[0].timestamp, 0);
        assert_eq!(slice.dpb[0].rps, H265Rps::StCurrBefore);
        assert_eq!(slice.num_rps_poc_st_curr_before, 1);
        assert_eq!(slice.ref_idx_l0[0], Resolution::Resolved(0));
        assert_eq!(slice.ref_idx_l0[1], Resolution::Invalid);
        assert!(slice.ref_idx_l1.is_empty());

        let text = String::from_utf8(session.into_inner()).unwrap();
        assert!(text.contains("\t\t.frame.h265 = {\n"));
        assert!(text.contains("\t\t\t\t.slice_type = V4L2_HEVC_SLICE_TYPE_P,\n"));
        assert!(text.contains("\t\t\t\t\t\t.rps = V4L2_HEVC_DPB_ENTRY_RPS_ST_CURR_BEFORE,\n"));

        fs::remove_dir_all(&dir).unwrap();
    }
}
