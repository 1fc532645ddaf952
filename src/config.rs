// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use std::path::PathBuf;

use log::warn;

/// Number of frames dumped when `DUMP_COUNT` is not set.
pub const DEFAULT_DUMP_COUNT: u32 = 3;
pub const DEFAULT_SLICES_PATH: &str = ".";
pub const DEFAULT_SLICES_FORMAT: &str = "slice-%d.dump";

/// Where and how many frames are dumped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DumpConfig {
    /// Frames with an index below this are translated and have their slice data written.
    pub dump_count: u32,
    /// Directory receiving the slice data files.
    pub slices_path: PathBuf,
    /// File name of the slice data files, `%d` being replaced by the frame index.
    pub slices_format: String,
}

impl Default for DumpConfig {
    fn default() -> Self {
        Self {
            dump_count: DEFAULT_DUMP_COUNT,
            slices_path: PathBuf::from(DEFAULT_SLICES_PATH),
            slices_format: DEFAULT_SLICES_FORMAT.to_owned(),
        }
    }
}

impl DumpConfig {
    /// Reads `DUMP_COUNT`, `DUMP_SLICES_PATH` and `DUMP_SLICES_FORMAT` from the environment.
    pub fn from_env() -> Self {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    fn from_vars<F: Fn(&str) -> Option<String>>(var: F) -> Self {
        let mut config = Self::default();

        if let Some(count) = var("DUMP_COUNT") {
            match count.trim().parse() {
                Ok(count) => config.dump_count = count,
                Err(e) => warn!(
                    "Ignoring invalid DUMP_COUNT {:?} ({}), keeping {}",
                    count, e, config.dump_count
                ),
            }
        }
        if let Some(path) = var("DUMP_SLICES_PATH") {
            config.slices_path = PathBuf::from(path);
        }
        if let Some(format) = var("DUMP_SLICES_FORMAT") {
            config.slices_format = format;
        }

        config
    }

    /// Whether frame `index` is translated and dumped.
    pub fn dumps(&self, index: u32) -> bool {
        index < self.dump_count
    }

    /// Path of the slice data file of frame `index`.
    pub fn slice_file(&self, index: u32) -> PathBuf {
        self.slices_path
            .join(self.slices_format.replacen("%d", &index.to_string(), 1))
    }
}
