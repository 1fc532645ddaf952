// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Reference picture table shared by the H.264 and H.265 translators.
//!
//! The table has a fixed number of slots and keeps the pictures referenced by recent frames,
//! together with the stable output tag assigned to each of them. Slots are recycled in place: a
//! new reference goes into the first empty slot, or else replaces the least recently referenced
//! entry that the current frame does not use.

use log::debug;
use log::warn;
use thiserror::Error;

use crate::va::SurfaceId;

/// Number of slots in the table.
pub const DPB_SIZE: usize = 16;

/// A picture reference that can be stored in a [`Dpb`].
pub trait DpbPicture: Clone {
    /// The key identifying the picture. At most one occupied slot holds a given key.
    fn key(&self) -> SurfaceId;
    /// Whether this is an absent-picture marker rather than an actual picture.
    fn is_null(&self) -> bool;
    /// Whether the picture can be referenced by future frames.
    fn is_reference(&self) -> bool;
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DpbError {
    #[error("no DPB slot can be replaced: all slots are reserved or in use")]
    NoReplacementSlot,
    #[error("DPB slot {0} is out of range")]
    SlotOutOfRange(usize),
}

/// An occupied slot of the table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DpbEntry<P> {
    /// The picture as supplied at insertion time.
    pub picture: P,
    /// Stable output index assigned at insertion.
    pub tag: u32,
    /// Value of the table age when the entry was last referenced.
    pub age: u32,
    /// Whether the frame being processed references this entry.
    pub used: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Slot<P> {
    Empty,
    /// Set aside for the picture being decoded until it is committed.
    Reserved,
    Occupied(DpbEntry<P>),
}

impl<P> Slot<P> {
    fn entry(&self) -> Option<&DpbEntry<P>> {
        match self {
            Slot::Occupied(entry) => Some(entry),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Dpb<P> {
    slots: [Slot<P>; DPB_SIZE],
    /// Incremented once per frame.
    age: u32,
}

impl<P: DpbPicture> Default for Dpb<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: DpbPicture> Dpb<P> {
    pub fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| Slot::Empty),
            age: 0,
        }
    }

    #[cfg(test)]
    pub(crate) fn age(&self) -> u32 {
        self.age
    }

    #[cfg(test)]
    fn slot(&self, index: usize) -> Option<&Slot<P>> {
        self.slots.get(index)
    }

    /// Iterates over the occupied slots in slot order.
    pub fn entries(&self) -> impl Iterator<Item = (usize, &DpbEntry<P>)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.entry().map(|entry| (index, entry)))
    }

    /// Finds the occupied slot holding `key`.
    pub fn lookup(&self, key: SurfaceId) -> Option<(&DpbEntry<P>, usize)> {
        self.entries()
            .find(|(_, entry)| entry.picture.key() == key)
            .map(|(index, entry)| (entry, index))
    }

    /// Returns the slot a new picture should go into: the first empty slot, or else the least
    /// recently referenced entry not used by the current frame. Reserved slots are never returned.
    pub fn find_replacement_slot(&self) -> Result<usize, DpbError> {
        if let Some(index) = self
            .slots
            .iter()
            .position(|slot| matches!(slot, Slot::Empty))
        {
            return Ok(index);
        }

        // Ties go to the lowest index: `min_by_key` returns the first minimum.
        self.entries()
            .filter(|(_, entry)| !entry.used)
            .min_by_key(|(_, entry)| entry.age)
            .map(|(index, _)| index)
            .ok_or(DpbError::NoReplacementSlot)
    }

    /// Sets a slot aside for the picture about to be decoded.
    ///
    /// The slot already holding `key` is reused if there is one, otherwise a replacement slot is
    /// picked. Its previous contents are discarded.
    pub fn reserve_output_slot(&mut self, key: SurfaceId) -> Result<usize, DpbError> {
        let index = match self.lookup(key) {
            Some((_, index)) => index,
            None => self.find_replacement_slot()?,
        };

        debug!("Reserving DPB slot {} for surface {:#x}", index, key);
        self.slots[index] = Slot::Reserved;

        Ok(index)
    }

    /// Starts a new frame referencing `references`.
    ///
    /// Every entry loses its `used` mark, then each non-null picture of `references` is either
    /// refreshed if already present or inserted with the tag computed by `tag_for`. A reference
    /// finding no free slot is left out of the table. Fails only if every slot is reserved.
    pub fn begin_frame_update<'a, F>(
        &mut self,
        references: impl IntoIterator<Item = &'a P>,
        mut tag_for: F,
    ) -> Result<(), DpbError>
    where
        P: 'a,
        F: FnMut(&P) -> u32,
    {
        self.age += 1;

        for slot in self.slots.iter_mut() {
            if let Slot::Occupied(entry) = slot {
                entry.used = false;
            }
        }

        for picture in references {
            if picture.is_null() {
                continue;
            }

            let age = self.age;
            if let Some(index) = self.lookup(picture.key()).map(|(_, index)| index) {
                if let Slot::Occupied(entry) = &mut self.slots[index] {
                    entry.age = age;
                    entry.used = true;
                }
                continue;
            }

            let index = match self.find_replacement_slot() {
                Ok(index) => index,
                Err(e) if self.slots.iter().all(|slot| matches!(slot, Slot::Reserved)) => {
                    return Err(e)
                }
                Err(_) => {
                    warn!(
                        "No DPB slot left for surface {:#x}, leaving it out",
                        picture.key()
                    );
                    continue;
                }
            };
            let tag = tag_for(picture);
            debug!(
                "Inserting surface {:#x} in DPB slot {} with tag {}",
                picture.key(),
                index,
                tag
            );
            self.slots[index] = Slot::Occupied(DpbEntry {
                picture: picture.clone(),
                tag,
                age,
                used: true,
            });
        }

        Ok(())
    }

    /// Stores the decoded picture into the slot reserved for it.
    ///
    /// Null pictures and pictures already present in another slot leave the slot empty.
    pub fn commit_output(&mut self, picture: &P, index: usize, tag: u32) -> Result<(), DpbError> {
        if index >= DPB_SIZE {
            return Err(DpbError::SlotOutOfRange(index));
        }

        let duplicate = self
            .lookup(picture.key())
            .is_some_and(|(_, found)| found != index);

        self.slots[index] = if picture.is_null() || duplicate {
            debug!("Releasing DPB slot {} without storing a picture", index);
            Slot::Empty
        } else {
            debug!(
                "Committing surface {:#x} to DPB slot {} with tag {}",
                picture.key(),
                index,
                tag
            );
            Slot::Occupied(DpbEntry {
                picture: picture.clone(),
                tag,
                age: self.age,
                used: picture.is_reference(),
            })
        };

        Ok(())
    }

    /// Gives back a reserved slot without storing anything in it.
    pub fn release(&mut self, index: usize) {
        if let Some(slot) = self.slots.get_mut(index) {
            if matches!(slot, Slot::Reserved) {
                debug!("Releasing reserved DPB slot {}", index);
                *slot = Slot::Empty;
            }
        }
    }
}
