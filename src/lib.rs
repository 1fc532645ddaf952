// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Test vector generator for stateless video decoders.
//!
//! This crate receives the per-frame decode parameter buffers of an MPEG-2, H.264 or H.265
//! stream, as submitted through the VA-API, and turns them into the decode descriptors a V4L2
//! stateless decoder expects for the same frames. The slice data of each frame can be dumped to
//! disk alongside, so both can be fed to a stateless decoder under test.
//!
//! The entry point is [`session::Session`]. The [`dpb`] and [`resolver`] modules hold the
//! reference picture bookkeeping shared by the H.264 and H.265 translators in [`codec`].

pub mod codec;
pub mod config;
pub mod dpb;
pub mod dump;
pub mod resolver;
pub mod session;
pub mod va;
