// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

#![no_main]

use std::collections::BTreeMap;

use bytes::Bytes;
use libfuzzer_sys::fuzz_target;
use va_dump::codec::h265::H265Snapshot;
use va_dump::codec::h265::H265;
use va_dump::codec::CodecTranslator;
use va_dump::codec::FrameInfo;
use va_dump::va::h265::PictureHevc;
use va_dump::va::h265::PictureParameterBufferHevc;
use va_dump::va::h265::SliceParameterBufferHevc;
use va_dump::va::h265::VA_PICTURE_HEVC_RPS_ST_CURR_BEFORE;

const SURFACE_BASE: u32 = 0x0400_0000;

// Each chunk drives one frame: the first four bytes pick the output surface, the slice type, the
// slice data offset and the referenced surface, the rest is the slice data.
fuzz_target!(|data: &[u8]| {
    let mut dpb = Default::default();
    let mut surfaces = BTreeMap::new();

    for (index, chunk) in data.chunks(64).enumerate() {
        let [surface, slice_type, offset, reference, payload @ ..] = chunk else {
            break;
        };
        let index = index as u32;

        let mut picture = PictureParameterBufferHevc {
            curr_pic: PictureHevc {
                picture_id: SURFACE_BASE + u32::from(surface % 4),
                pic_order_cnt: index as i32,
                flags: 0,
            },
            ..Default::default()
        };
        picture.reference_frames[0] = PictureHevc {
            picture_id: SURFACE_BASE + u32::from(reference % 4),
            pic_order_cnt: 0,
            flags: VA_PICTURE_HEVC_RPS_ST_CURR_BEFORE,
        };

        let mut slice = SliceParameterBufferHevc {
            slice_data_size: payload.len() as u32,
            slice_data_byte_offset: u32::from(*offset),
            ..Default::default()
        };
        slice.long_slice_flags.slice_type = slice_type % 4;
        slice.ref_pic_list[0][0] = reference % 16;

        let snapshot = H265Snapshot {
            picture: Some(picture),
            slice: Some(slice),
            slice_data: Bytes::copy_from_slice(payload),
        };
        let frame = FrameInfo {
            index,
            surfaces: &surfaces,
        };
        let _ = H265::translate(&mut dpb, &snapshot, &frame);
        surfaces.insert(SURFACE_BASE + u32::from(surface % 4), index);
    }
});
