use core::alloc::Layout;
use core::marker::PhantomData;
use core::mem::MaybeUninit;
use core::ptr::NonNull;

use crate::error::Error;
use crate::order::Link;

/// Slot has never held a value since the store was allocated.
pub(crate) const EMPTY: u8 = 0x00;

/// Slot holds an initialized value.
pub(crate) const OCCUPIED: u8 = 0x01;

/// Slot held a value that was erased. Probes continue past it; it is only
/// reclaimed when the store is replaced.
pub(crate) const TOMBSTONE: u8 = 0x02;

/// Offsets of the per-slot arrays inside the single backing allocation.
///
/// Everything before `buckets_offset` is metadata that is zero-initialized on
/// allocation (a zero tag is `EMPTY`), so tags, links and hashes can always be
/// viewed as initialized slices. Only the buckets are `MaybeUninit`.
#[derive(Debug)]
struct DataLayout {
    layout: Layout,
    links_offset: usize,
    hashes_offset: usize,
    buckets_offset: usize,
}

impl DataLayout {
    fn new<V>(capacity: usize) -> Result<Self, Error> {
        let overflow = |_| Error::CapacityOverflow;

        let tags_layout = Layout::array::<u8>(capacity).map_err(overflow)?;
        let links_layout = Layout::array::<Link>(capacity).map_err(overflow)?;
        let hashes_layout = Layout::array::<u64>(capacity).map_err(overflow)?;
        let buckets_layout = Layout::array::<MaybeUninit<V>>(capacity).map_err(overflow)?;

        let (layout, links_offset) = tags_layout.extend(links_layout).map_err(overflow)?;
        let (layout, hashes_offset) = layout.extend(hashes_layout).map_err(overflow)?;
        let (layout, buckets_offset) = layout.extend(buckets_layout).map_err(overflow)?;

        Ok(DataLayout {
            layout: layout.pad_to_align(),
            links_offset,
            hashes_offset,
            buckets_offset,
        })
    }
}

/// Fixed-capacity slot array backing a [`HashTable`].
///
/// The store owns one raw allocation and is responsible for constructing and
/// destroying values in place. It never changes size: growing the table means
/// allocating a new store and moving the live values across.
///
/// [`HashTable`]: crate::HashTable
pub(crate) struct SlotStore<V> {
    layout: DataLayout,
    alloc: NonNull<u8>,
    capacity: usize,

    _phantom: PhantomData<V>,
}

// SAFETY: The store exclusively owns its allocation and the values in it, in
// the same way a `Vec<V>` does.
unsafe impl<V: Send> Send for SlotStore<V> {}
// SAFETY: Shared access only hands out `&V`.
unsafe impl<V: Sync> Sync for SlotStore<V> {}

impl<V> Drop for SlotStore<V> {
    fn drop(&mut self) {
        self.drop_values();

        // SAFETY: `alloc` was obtained from the global allocator with exactly
        // this layout in `try_with_capacity`.
        unsafe {
            alloc::alloc::dealloc(self.alloc.as_ptr(), self.layout.layout);
        }
    }
}

impl<V> SlotStore<V> {
    /// Allocates a store of `capacity` empty slots.
    ///
    /// Fails without side effects if the layout overflows or the allocator
    /// refuses the request.
    pub(crate) fn try_with_capacity(capacity: usize) -> Result<Self, Error> {
        debug_assert!(capacity > 0);
        let layout = DataLayout::new::<V>(capacity)?;

        // SAFETY: `capacity > 0`, so the tags array alone makes the layout
        // non-zero in size. A null return is reported to the caller.
        let alloc = unsafe {
            let raw_alloc = alloc::alloc::alloc(layout.layout);
            if raw_alloc.is_null() {
                return Err(Error::AllocError {
                    layout: layout.layout,
                });
            }

            core::ptr::write_bytes(raw_alloc, 0x0, layout.buckets_offset);
            NonNull::new_unchecked(raw_alloc)
        };

        Ok(Self {
            layout,
            alloc,
            capacity,
            _phantom: PhantomData,
        })
    }

    #[inline(always)]
    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total number of bytes held by the backing allocation.
    #[cfg(any(test, feature = "stats"))]
    pub(crate) fn allocated_bytes(&self) -> usize {
        self.layout.layout.size()
    }

    fn tags_ptr(&self) -> NonNull<[u8]> {
        // Tags live at offset 0.
        NonNull::slice_from_raw_parts(self.alloc, self.capacity)
    }

    fn links_ptr(&self) -> NonNull<[Link]> {
        // SAFETY: `links_offset` is within the allocation and properly aligned
        // for `Link`, as computed by `DataLayout`.
        unsafe {
            NonNull::slice_from_raw_parts(
                self.alloc.add(self.layout.links_offset).cast(),
                self.capacity,
            )
        }
    }

    fn hashes_ptr(&self) -> NonNull<[u64]> {
        // SAFETY: `hashes_offset` is within the allocation and properly aligned
        // for `u64`, as computed by `DataLayout`.
        unsafe {
            NonNull::slice_from_raw_parts(
                self.alloc.add(self.layout.hashes_offset).cast(),
                self.capacity,
            )
        }
    }

    #[inline(always)]
    fn bucket_ptr(&self, index: usize) -> NonNull<MaybeUninit<V>> {
        assert!(index < self.capacity);
        // SAFETY: `index < capacity`, and the buckets array holds `capacity`
        // properly aligned cells starting at `buckets_offset`.
        unsafe {
            self.alloc
                .add(self.layout.buckets_offset)
                .cast::<MaybeUninit<V>>()
                .add(index)
        }
    }

    #[inline(always)]
    pub(crate) fn tags(&self) -> &[u8] {
        // SAFETY: Tags are zero-initialized on allocation and only ever hold
        // plain bytes.
        unsafe { self.tags_ptr().as_ref() }
    }

    #[inline(always)]
    fn tags_mut(&mut self) -> &mut [u8] {
        // SAFETY: As for `tags`, with exclusive access through `&mut self`.
        unsafe { self.tags_ptr().as_mut() }
    }

    #[inline(always)]
    pub(crate) fn links(&self) -> &[Link] {
        // SAFETY: Links are zero-initialized on allocation; every bit pattern
        // is a valid `Link`.
        unsafe { self.links_ptr().as_ref() }
    }

    #[inline(always)]
    pub(crate) fn links_mut(&mut self) -> &mut [Link] {
        // SAFETY: As for `links`, with exclusive access through `&mut self`.
        unsafe { self.links_ptr().as_mut() }
    }

    /// Cached hashes. Only meaningful for occupied slots.
    #[inline(always)]
    pub(crate) fn hashes(&self) -> &[u64] {
        // SAFETY: Hashes are zero-initialized on allocation.
        unsafe { self.hashes_ptr().as_ref() }
    }

    #[inline(always)]
    pub(crate) fn tag(&self, index: usize) -> u8 {
        self.tags()[index]
    }

    #[inline]
    pub(crate) fn get(&self, index: usize) -> Option<&V> {
        if self.tag(index) != OCCUPIED {
            return None;
        }
        // SAFETY: The slot is occupied.
        Some(unsafe { self.get_unchecked(index) })
    }

    /// # Safety
    ///
    /// The slot at `index` must be occupied.
    #[inline(always)]
    pub(crate) unsafe fn get_unchecked(&self, index: usize) -> &V {
        debug_assert_eq!(self.tag(index), OCCUPIED);
        // SAFETY: Caller guarantees the cell is initialized.
        unsafe { self.bucket_ptr(index).as_ref().assume_init_ref() }
    }

    /// # Safety
    ///
    /// The slot at `index` must be occupied.
    #[inline(always)]
    pub(crate) unsafe fn get_unchecked_mut(&mut self, index: usize) -> &mut V {
        debug_assert_eq!(self.tag(index), OCCUPIED);
        // SAFETY: Caller guarantees the cell is initialized.
        unsafe { self.bucket_ptr(index).as_mut().assume_init_mut() }
    }

    /// Raw pointer to the value cell at `index`, used by iterators that hand
    /// out disjoint `&mut V` borrows.
    #[inline(always)]
    pub(crate) fn value_ptr(&self, index: usize) -> *mut V {
        self.bucket_ptr(index).cast::<V>().as_ptr()
    }

    /// Constructs `value` in the empty slot at `index` and marks it occupied.
    #[inline]
    pub(crate) fn write(&mut self, index: usize, hash: u64, value: V) -> &mut V {
        assert_eq!(self.tag(index), EMPTY);

        self.tags_mut()[index] = OCCUPIED;
        // SAFETY: `hashes_ptr` covers `capacity` initialized `u64`s and we hold
        // `&mut self`.
        unsafe {
            self.hashes_ptr().as_mut()[index] = hash;
        }
        // SAFETY: `bucket_ptr` is in bounds; the cell is uninitialized since the
        // slot was empty.
        unsafe { self.bucket_ptr(index).as_mut().write(value) }
    }

    /// Moves the value out of the occupied slot at `index`, leaving `tag`
    /// behind.
    ///
    /// # Safety
    ///
    /// The slot at `index` must be occupied and `tag` must not be `OCCUPIED`.
    #[inline]
    pub(crate) unsafe fn take_unchecked(&mut self, index: usize, tag: u8) -> V {
        debug_assert_eq!(self.tag(index), OCCUPIED);
        debug_assert_ne!(tag, OCCUPIED);

        self.tags_mut()[index] = tag;
        // SAFETY: The slot was occupied, so the cell is initialized. The tag no
        // longer claims ownership, so the value is read exactly once.
        unsafe { self.bucket_ptr(index).as_ref().assume_init_read() }
    }

    /// Drops every live value and marks all slots empty, keeping the
    /// allocation.
    pub(crate) fn reset(&mut self) {
        self.drop_values();
        // SAFETY: The metadata region is plain bytes and we hold `&mut self`.
        unsafe {
            core::ptr::write_bytes(self.alloc.as_ptr(), 0x0, self.layout.buckets_offset);
        }
    }

    fn drop_values(&mut self) {
        if !core::mem::needs_drop::<V>() {
            return;
        }

        for index in 0..self.capacity {
            if self.tag(index) == OCCUPIED {
                // Untag first so a panicking destructor cannot lead to a double
                // drop.
                self.tags_mut()[index] = TOMBSTONE;
                // SAFETY: The slot was occupied, so the cell is initialized.
                unsafe {
                    self.bucket_ptr(index).as_mut().assume_init_drop();
                }
            }
        }
    }
}
