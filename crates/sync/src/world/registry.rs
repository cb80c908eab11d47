use std::fmt;

use crate::error::SyncError;

/// Small integer handle for an item stored in a [`SlotRegistry`].
pub trait SlotId: Copy + Eq + fmt::Debug {
    const LABEL: &'static str;

    fn from_index(index: usize) -> Self;
    fn index(self) -> usize;
}

macro_rules! slot_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u16);

        impl SlotId for $name {
            const LABEL: &'static str = $label;

            fn from_index(index: usize) -> Self {
                Self(index as u16)
            }

            fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

slot_id!(
    /// Index of a player in the player registry, mirrored on every peer.
    PlayerId,
    "player"
);
slot_id!(
    /// Index of an entity in the entity registry, mirrored on every peer.
    EntityId,
    "entity"
);

/// Items that know their own slot. The registry assigns the id on add and
/// clears it on remove.
pub trait Slotted {
    type Id: SlotId;

    fn set_slot(&mut self, id: Option<Self::Id>);
}

/// Fixed-capacity slot table. New items take the lowest free index, so ids
/// are reused after removal and stay within `0..capacity`.
#[derive(Debug)]
pub struct SlotRegistry<T: Slotted> {
    slots: Vec<Option<T>>,
    len: usize,
}

impl<T: Slotted> SlotRegistry<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            len: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.slots.len()
    }

    pub fn add(&mut self, mut item: T) -> Result<T::Id, SyncError> {
        let index = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(SyncError::CapacityExceeded {
                capacity: self.slots.len(),
            })?;
        let id = T::Id::from_index(index);
        item.set_slot(Some(id));
        self.slots[index] = Some(item);
        self.len += 1;
        Ok(id)
    }

    /// Places an item at an id chosen elsewhere, used when mirroring the
    /// authoritative registry.
    pub fn insert_at(&mut self, id: T::Id, mut item: T) -> Result<(), SyncError> {
        let capacity = self.slots.len();
        let slot = self
            .slots
            .get_mut(id.index())
            .ok_or(SyncError::CapacityExceeded { capacity })?;
        if slot.is_some() {
            return Err(SyncError::SlotOccupied(id.index()));
        }
        item.set_slot(Some(id));
        *slot = Some(item);
        self.len += 1;
        Ok(())
    }

    pub fn remove(&mut self, id: T::Id) -> Result<T, SyncError> {
        let mut item = self
            .slots
            .get_mut(id.index())
            .and_then(Option::take)
            .ok_or_else(|| SyncError::not_found(T::Id::LABEL, id.index()))?;
        item.set_slot(None);
        self.len -= 1;
        Ok(item)
    }

    pub fn contains(&self, id: T::Id) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: T::Id) -> Option<&T> {
        self.slots.get(id.index()).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: T::Id) -> Option<&mut T> {
        self.slots.get_mut(id.index()).and_then(Option::as_mut)
    }

    pub fn require(&self, id: T::Id) -> Result<&T, SyncError> {
        self.get(id)
            .ok_or_else(|| SyncError::not_found(T::Id::LABEL, id.index()))
    }

    pub fn require_mut(&mut self, id: T::Id) -> Result<&mut T, SyncError> {
        self.get_mut(id)
            .ok_or_else(|| SyncError::not_found(T::Id::LABEL, id.index()))
    }

    /// Drops every item and reallocates to the new capacity.
    pub fn resize(&mut self, capacity: usize) {
        self.clear();
        self.slots = (0..capacity).map(|_| None).collect();
    }

    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            if let Some(mut item) = slot.take() {
                item.set_slot(None);
            }
        }
        self.len = 0;
    }

    pub fn ids(&self) -> Vec<T::Id> {
        self.iter().map(|(id, _)| id).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (T::Id, &T)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|item| (T::Id::from_index(index), item)))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (T::Id, &mut T)> + '_ {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_mut().map(|item| (T::Id::from_index(index), item)))
    }
}
