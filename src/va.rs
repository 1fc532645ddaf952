// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Decode parameter buffers as submitted through the acceleration API.
//!
//! These types mirror the fixed layouts of the VA-API picture parameter, inverse quantization
//! matrix and slice parameter buffers for each supported codec. Bitfield unions are expressed as
//! plain structs of named fields; everything else keeps the VA-API field names in snake case.

pub mod h264;
pub mod h265;
pub mod mpeg2;

/// Identifier of a surface, as handed out by the session.
pub type SurfaceId = u32;

/// Surface identifier used by the API to mark an absent picture.
pub const VA_INVALID_SURFACE: SurfaceId = 0xffff_ffff;
