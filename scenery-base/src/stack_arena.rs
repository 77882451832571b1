use crate::memory::{array_size_in_bytes, bit_array_size_in_bytes, round_size_up_to_alignment_usize};
use bit_vec::BitVec;
use std::cell::Cell;
use std::ops::{Deref, DerefMut};

/// Every allocation is charged in multiples of this many bytes
pub const ARENA_ALIGNMENT: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArenaError {
    /// The arena's byte budget cannot satisfy the request
    OutOfMemory { requested: usize, remaining: usize },
    /// The budget allowed the request but the heap refused it
    HeapAllocationFailed { requested: usize },
}

impl std::error::Error for ArenaError {}

impl core::fmt::Display for ArenaError {
    fn fmt(
        &self,
        fmt: &mut core::fmt::Formatter,
    ) -> core::fmt::Result {
        match *self {
            ArenaError::OutOfMemory {
                requested,
                remaining,
            } => write!(
                fmt,
                "Stack arena out of memory: requested {} bytes, {} bytes remaining",
                requested, remaining
            ),
            ArenaError::HeapAllocationFailed { requested } => {
                write!(fmt, "Heap allocation of {} bytes failed", requested)
            }
        }
    }
}

/// A save-point in a `StackArena`. Rolling back to it releases everything allocated after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ArenaMark(usize);

impl ArenaMark {
    pub fn offset(&self) -> usize {
        self.0
    }
}

/// Per-frame stack allocator with a fixed byte budget.
///
/// Allocations are charged against the budget in LIFO order. Storage itself comes from the heap so
/// values handed out keep normal drop semantics, but the lifetime of everything allocated is tied to
/// a borrow of the arena, so results can never outlive it. Release happens by rolling back to a
/// mark (or through an `ArenaScope` guard), never per allocation.
pub struct StackArena {
    capacity: usize,
    top: Cell<usize>,
    high_water: Cell<usize>,
}

impl StackArena {
    pub fn new(capacity: usize) -> Self {
        StackArena {
            capacity,
            top: Cell::new(0),
            high_water: Cell::new(0),
        }
    }

    /// Arena without a byte budget, for work outside the frame such as grid rebuilds
    pub fn unbounded() -> Self {
        Self::new(usize::MAX)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn allocated(&self) -> usize {
        self.top.get()
    }

    pub fn remaining(&self) -> usize {
        self.capacity - self.top.get()
    }

    pub fn high_water_mark(&self) -> usize {
        self.high_water.get()
    }

    pub fn mark(&self) -> ArenaMark {
        ArenaMark(self.top.get())
    }

    /// Releases everything allocated since `mark` was taken.
    pub fn rollback(
        &self,
        mark: ArenaMark,
    ) {
        debug_assert!(
            mark.0 <= self.top.get(),
            "Rolled back to a mark that was already released"
        );
        if mark.0 <= self.top.get() {
            self.top.set(mark.0);
        } else {
            log::warn!(
                "Ignored rollback to offset {}, arena top is {}",
                mark.0,
                self.top.get()
            );
        }
    }

    /// Releases everything. Called at frame end by the owner of the arena.
    pub fn reset(&self) {
        self.top.set(0);
    }

    pub fn scope(&self) -> ArenaScope<'_> {
        ArenaScope {
            arena: self,
            mark: self.mark(),
        }
    }

    /// Reserves `bytes` of the budget, rounded up to `ARENA_ALIGNMENT`.
    pub fn charge(
        &self,
        bytes: usize,
    ) -> Result<(), ArenaError> {
        let rounded = round_size_up_to_alignment_usize(bytes, ARENA_ALIGNMENT);
        let remaining = self.remaining();
        if rounded > remaining {
            return Err(ArenaError::OutOfMemory {
                requested: rounded,
                remaining,
            });
        }

        let top = self.top.get() + rounded;
        self.top.set(top);
        if top > self.high_water.get() {
            self.high_water.set(top);
        }

        Ok(())
    }

    fn charge_array<T>(
        &self,
        count: usize,
    ) -> Result<usize, ArenaError> {
        let bytes = array_size_in_bytes::<T>(count).ok_or(ArenaError::OutOfMemory {
            requested: usize::MAX,
            remaining: self.remaining(),
        })?;
        self.charge(bytes)?;
        Ok(bytes)
    }

    /// Allocates an empty vector able to hold `capacity` values without growing.
    pub fn alloc_vec<T>(
        &self,
        capacity: usize,
    ) -> Result<ArenaVec<'_, T>, ArenaError> {
        let mark = self.mark();
        let bytes = self.charge_array::<T>(capacity)?;

        let mut items = Vec::new();
        if items.try_reserve_exact(capacity).is_err() {
            self.rollback(mark);
            return Err(ArenaError::HeapAllocationFailed { requested: bytes });
        }

        Ok(ArenaVec { arena: self, items })
    }

    /// Allocates a bit array of `len` bits, all set to `value`.
    pub fn alloc_bits(
        &self,
        len: usize,
        value: bool,
    ) -> Result<BitVec, ArenaError> {
        self.charge(bit_array_size_in_bytes(len))?;
        Ok(BitVec::from_elem(len, value))
    }

    /// Moves finished data into the arena, charging exactly its length. On failure the data is
    /// dropped and nothing is charged.
    pub fn commit_vec<T>(
        &self,
        mut items: Vec<T>,
    ) -> Result<ArenaVec<'_, T>, ArenaError> {
        self.charge_array::<T>(items.len())?;
        items.shrink_to_fit();
        Ok(ArenaVec { arena: self, items })
    }
}

/// Rolls the arena back to where it was when the scope was opened
pub struct ArenaScope<'a> {
    arena: &'a StackArena,
    mark: ArenaMark,
}

impl<'a> ArenaScope<'a> {
    pub fn arena(&self) -> &'a StackArena {
        self.arena
    }

    pub fn mark(&self) -> ArenaMark {
        self.mark
    }
}

impl<'a> Drop for ArenaScope<'a> {
    fn drop(&mut self) {
        self.arena.rollback(self.mark);
    }
}

/// A vector whose memory is charged to a `StackArena`. Growing it charges the arena for the added
/// capacity, so a push can fail with `OutOfMemory`.
pub struct ArenaVec<'a, T> {
    arena: &'a StackArena,
    items: Vec<T>,
}

impl<'a, T> ArenaVec<'a, T> {
    pub fn capacity(&self) -> usize {
        self.items.capacity()
    }

    pub fn push(
        &mut self,
        value: T,
    ) -> Result<(), ArenaError> {
        if self.items.len() == self.items.capacity() {
            self.grow(1)?;
        }

        self.items.push(value);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn truncate(
        &mut self,
        len: usize,
    ) {
        self.items.truncate(len);
    }

    pub fn swap_remove(
        &mut self,
        index: usize,
    ) -> T {
        self.items.swap_remove(index)
    }

    pub fn retain<F: FnMut(&T) -> bool>(
        &mut self,
        f: F,
    ) {
        self.items.retain(f);
    }

    /// Takes the values out of the arena vector. The arena stays charged until rolled back.
    pub fn into_vec(self) -> Vec<T> {
        self.items
    }

    fn grow(
        &mut self,
        additional: usize,
    ) -> Result<(), ArenaError> {
        let old_capacity = self.items.capacity();
        let new_capacity = (old_capacity * 2).max(old_capacity + additional).max(4);
        let added = new_capacity - old_capacity;

        let mark = self.arena.mark();
        let bytes = self.arena.charge_array::<T>(added)?;
        if self.items.try_reserve_exact(new_capacity - self.items.len()).is_err() {
            self.arena.rollback(mark);
            return Err(ArenaError::HeapAllocationFailed { requested: bytes });
        }

        Ok(())
    }
}

impl<'a, T: PartialEq> ArenaVec<'a, T> {
    /// Removes consecutive repeated values
    pub fn dedup(&mut self) {
        self.items.dedup();
    }
}

impl<'a, T: Clone> ArenaVec<'a, T> {
    pub fn extend_from_slice(
        &mut self,
        values: &[T],
    ) -> Result<(), ArenaError> {
        let available = self.items.capacity() - self.items.len();
        if values.len() > available {
            self.grow(values.len() - available)?;
        }

        self.items.extend_from_slice(values);
        Ok(())
    }
}

impl<'a, T> Deref for ArenaVec<'a, T> {
    type Target = [T];

    fn deref(&self) -> &Self::Target {
        &self.items
    }
}

impl<'a, T> DerefMut for ArenaVec<'a, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.items
    }
}

impl<'a, T: core::fmt::Debug> core::fmt::Debug for ArenaVec<'a, T> {
    fn fmt(
        &self,
        fmt: &mut core::fmt::Formatter,
    ) -> core::fmt::Result {
        fmt.debug_list().entries(self.items.iter()).finish()
    }
}
