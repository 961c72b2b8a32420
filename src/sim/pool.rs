//! Fixed-capacity entity pool
//!
//! All slots are built once at construction and recycled forever after.
//! `acquire` always hands out the lowest free index so iteration order (and
//! therefore the whole simulation) stays deterministic.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Handle to a pool slot. The generation changes every time the slot is
/// released, so a handle kept across a recycle no longer resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId {
    index: u32,
    generation: u32,
}

impl SlotId {
    pub fn index(self) -> usize {
        self.index as usize
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

#[derive(Debug, Clone)]
struct Slot<T> {
    value: T,
    generation: u32,
    active: bool,
}

/// Arena of pre-built entities with an index free list
#[derive(Debug, Clone)]
pub struct Pool<T> {
    slots: Vec<Slot<T>>,
    free: BinaryHeap<Reverse<usize>>,
    active: usize,
}

impl<T> Pool<T> {
    /// Build `capacity` entities up front; all start inactive
    pub fn new(capacity: usize, mut build: impl FnMut(usize) -> T) -> Self {
        let slots = (0..capacity)
            .map(|i| Slot {
                value: build(i),
                generation: 0,
                active: false,
            })
            .collect();
        Self {
            slots,
            free: (0..capacity).map(Reverse).collect(),
            active: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn active_count(&self) -> usize {
        self.active
    }

    pub fn is_exhausted(&self) -> bool {
        self.free.is_empty()
    }

    /// Claim the first inactive slot, or `None` when every slot is in use
    pub fn acquire(&mut self) -> Option<SlotId> {
        let Reverse(index) = self.free.pop()?;
        let slot = &mut self.slots[index];
        slot.active = true;
        self.active += 1;
        Some(SlotId {
            index: index as u32,
            generation: slot.generation,
        })
    }

    /// Return a slot to the pool. Releasing a stale or already-free handle is
    /// a no-op; returns whether anything was released.
    pub fn release(&mut self, id: SlotId) -> bool {
        if !self.is_live(id) {
            return false;
        }
        let slot = &mut self.slots[id.index()];
        slot.active = false;
        slot.generation = slot.generation.wrapping_add(1);
        self.active -= 1;
        self.free.push(Reverse(id.index()));
        true
    }

    pub fn is_live(&self, id: SlotId) -> bool {
        self.slots
            .get(id.index())
            .is_some_and(|s| s.active && s.generation == id.generation)
    }

    pub fn get(&self, id: SlotId) -> Option<&T> {
        if self.is_live(id) {
            Some(&self.slots[id.index()].value)
        } else {
            None
        }
    }

    pub fn get_mut(&mut self, id: SlotId) -> Option<&mut T> {
        if self.is_live(id) {
            Some(&mut self.slots[id.index()].value)
        } else {
            None
        }
    }

    /// Active entities in slot order
    pub fn iter_active(&self) -> impl Iterator<Item = (SlotId, &T)> {
        self.slots.iter().enumerate().filter(|(_, s)| s.active).map(|(i, s)| {
            (
                SlotId {
                    index: i as u32,
                    generation: s.generation,
                },
                &s.value,
            )
        })
    }

    pub fn iter_active_mut(&mut self) -> impl Iterator<Item = (SlotId, &mut T)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter(|(_, s)| s.active)
            .map(|(i, s)| {
                (
                    SlotId {
                        index: i as u32,
                        generation: s.generation,
                    },
                    &mut s.value,
                )
            })
    }
}
