// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Resolution of picture references into the indices written in reference picture lists.

use log::warn;

use crate::codec::PictureIndex;
use crate::dpb::Dpb;
use crate::dpb::DpbPicture;
use crate::va::SurfaceId;

/// Index written for an absent reference.
pub const INVALID_INDEX: u8 = 0xff;

/// Outcome of resolving a picture reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolution<T> {
    /// The reference was found.
    Resolved(T),
    /// The reference was not found and a substitute value is used.
    Fallback(T),
    /// The reference is an absent-picture marker.
    Invalid,
}

impl<T> Resolution<T> {
    /// Returns the resolved or substituted value, or `invalid` for an absent picture.
    pub fn unwrap_or(self, invalid: T) -> T {
        match self {
            Resolution::Resolved(value) | Resolution::Fallback(value) => value,
            Resolution::Invalid => invalid,
        }
    }

    #[cfg(test)]
    fn is_fallback(&self) -> bool {
        matches!(self, Resolution::Fallback(_))
    }

    #[cfg(test)]
    fn is_invalid(&self) -> bool {
        matches!(self, Resolution::Invalid)
    }
}

impl Resolution<u8> {
    /// Returns the value to write in an HEVC reference index list entry.
    pub fn index(self) -> u8 {
        self.unwrap_or(INVALID_INDEX)
    }
}

/// Resolves `picture` through `find`, which maps a picture key to its index. Misses fall back to
/// index 0.
pub fn resolve<P, F>(picture: &P, find: F) -> Resolution<u8>
where
    P: DpbPicture,
    F: FnOnce(SurfaceId) -> Option<usize>,
{
    if picture.is_null() {
        return Resolution::Invalid;
    }

    match find(picture.key()).and_then(|index| u8::try_from(index).ok()) {
        Some(index) => Resolution::Resolved(index),
        None => {
            warn!(
                "Reference to surface {:#x} not found, falling back to index 0",
                picture.key()
            );
            Resolution::Fallback(0)
        }
    }
}

/// Resolves `picture` to the slot holding it in `dpb`.
pub fn resolve_slot<P: DpbPicture>(dpb: &Dpb<P>, picture: &P) -> Resolution<u8> {
    resolve(picture, |key| dpb.lookup(key).map(|(_, slot)| slot))
}

/// Resolves a surface to its picture index, falling back to `current` if the surface is unknown.
pub fn resolve_surface(
    surfaces: &dyn PictureIndex,
    surface: SurfaceId,
    current: u32,
) -> Resolution<u32> {
    match surfaces.picture_index(surface) {
        Some(index) => Resolution::Resolved(index),
        None => {
            warn!(
                "Surface {:#x} not found, falling back to the current frame index {}",
                surface, current
            );
            Resolution::Fallback(current)
        }
    }
}
