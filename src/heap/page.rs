//! Slotted page layout for variable-length tuples.
//!
//! A slotted page holds a growing slot directory at the low end and a
//! shrinking tuple heap at the high end:
//!
//! ```text
//! +--------------------+ offset 0
//! | num_slots (u16)    |
//! +--------------------+ offset 2
//! | slot offsets (u16) |  (grows downward; 0 = empty slot)
//! +--------------------+
//! | free space         |
//! +--------------------+
//! | tuple bodies       |  (packed downward from the end of the page)
//! +--------------------+ page size
//! ```
//!
//! All multi-byte fields are big-endian. Tuple bodies are kept contiguous:
//! earlier slots hold higher offsets, and allocation/deletion slide the
//! lower-offset bodies to keep the heap gap-free. Tuple lengths are not
//! stored; the length of slot `i` is the distance to the nearest non-empty
//! predecessor slot's offset (or to the end of the page).
//!
//! Invariants maintained by every mutating operation:
//!
//! - Non-empty slots are ordered by offset: `i < j` implies
//!   `slot_offset(i) > slot_offset(j)`.
//! - The last slot is never empty; trailing empty slots are trimmed on
//!   delete.
//! - Tuple bodies are contiguous from `tuple_data_start()` to the page end.

use std::borrow::{Borrow, BorrowMut};

use tracing::debug;

use crate::storage::Page;

use super::SlotId;
use super::error::HeapError;

/// Byte offset of the slot-count field within a page.
const OFFSET_NUM_SLOTS: usize = 0;

/// Offset value stored in an empty slot.
///
/// Zero is unambiguous because offset 0 holds the slot count, so no tuple
/// can ever start there.
pub const EMPTY_SLOT: u16 = 0;

/// A slotted-page view over a [`Page`].
///
/// The type parameter allows the view to wrap `&Page` (read-only),
/// `&mut Page`, or an owned `Page`. Read operations are available for any
/// borrow; mutating operations require a mutable borrow.
///
/// # Example
///
/// ```no_run
/// use minirel::heap::SlottedPage;
/// use minirel::storage::{Page, PageId};
///
/// let mut page = Page::new(PageId::new(0), 8192);
/// let mut slotted = SlottedPage::new(&mut page);
/// slotted.init();
///
/// let slot = slotted.allocate_tuple(16).unwrap();
/// assert_eq!(slotted.tuple_length(slot).unwrap(), 16);
/// ```
pub struct SlottedPage<P> {
    page: P,
}

// Read operations (available for any borrow of a Page)
impl<P: Borrow<Page>> SlottedPage<P> {
    /// Creates a slotted view over the given page.
    pub fn new(page: P) -> Self {
        Self { page }
    }

    fn page(&self) -> &Page {
        self.page.borrow()
    }

    /// Returns the page size in bytes.
    pub fn page_size(&self) -> usize {
        self.page().size()
    }

    /// Returns the number of slots in the directory, including empty ones.
    pub fn num_slots(&self) -> u16 {
        self.page().read_u16(OFFSET_NUM_SLOTS)
    }

    /// Reads a slot's stored offset without bounds checking.
    ///
    /// Callers must guarantee `slot < num_slots()`.
    fn slot_value(&self, slot: SlotId) -> u16 {
        self.page().read_u16(2 * (1 + slot as usize))
    }

    /// Returns the tuple offset stored in the given slot.
    ///
    /// The sentinel [`EMPTY_SLOT`] indicates an empty slot.
    pub fn slot_offset(&self, slot: SlotId) -> Result<u16, HeapError> {
        self.check_slot(slot)?;
        Ok(self.slot_value(slot))
    }

    /// Returns the byte index just past the end of the slot directory.
    pub fn slots_end_index(&self) -> usize {
        2 * (1 + self.num_slots() as usize)
    }

    /// Returns the smallest offset among non-empty slots, or the page size
    /// if the page holds no tuples.
    ///
    /// Scans from the last slot downward; because non-empty offsets
    /// decrease with slot index, the first non-empty slot found holds the
    /// minimum.
    pub fn tuple_data_start(&self) -> usize {
        let num_slots = self.num_slots();
        for slot in (0..num_slots).rev() {
            let value = self.slot_value(slot);
            if value != EMPTY_SLOT {
                return value as usize;
            }
        }
        self.page_size()
    }

    /// Returns the length in bytes of the tuple in the given slot.
    ///
    /// The length is not stored; it is the distance from this tuple's start
    /// to the start of the nearest non-empty predecessor slot's tuple, or
    /// to the end of the page if there is none.
    ///
    /// # Errors
    ///
    /// Returns [`HeapError::SlotOutOfRange`] for a bad index and
    /// [`HeapError::EmptySlot`] if the slot holds no tuple.
    pub fn tuple_length(&self, slot: SlotId) -> Result<usize, HeapError> {
        self.check_slot(slot)?;

        let tuple_start = self.slot_value(slot);
        if tuple_start == EMPTY_SLOT {
            return Err(HeapError::EmptySlot(slot));
        }

        for prev in (0..slot).rev() {
            let prev_start = self.slot_value(prev);
            if prev_start != EMPTY_SLOT {
                // Earlier slots have higher offsets.
                return Ok((prev_start - tuple_start) as usize);
            }
        }

        // This slot holds the tuple closest to the end of the page.
        Ok(self.page_size() - tuple_start as usize)
    }

    /// Returns the free space between the slot directory and the tuple heap.
    pub fn free_space(&self) -> usize {
        self.tuple_data_start() - self.slots_end_index()
    }

    /// Returns the bytes of the tuple in the given slot.
    pub fn tuple_data(&self, slot: SlotId) -> Result<&[u8], HeapError> {
        let start = self.slot_offset(slot)? as usize;
        let len = self.tuple_length(slot)?;
        Ok(&self.page().data()[start..start + len])
    }

    fn check_slot(&self, slot: SlotId) -> Result<(), HeapError> {
        let num_slots = self.num_slots();
        if slot >= num_slots {
            return Err(HeapError::SlotOutOfRange { slot, num_slots });
        }
        Ok(())
    }
}

// Mutating operations (require a mutable borrow of the Page)
impl<P: Borrow<Page> + BorrowMut<Page>> SlottedPage<P> {
    fn page_mut(&mut self) -> &mut Page {
        self.page.borrow_mut()
    }

    /// Initializes a freshly allocated page as an empty slotted page.
    pub fn init(&mut self) {
        self.set_num_slots(0);
    }

    fn set_num_slots(&mut self, num_slots: u16) {
        self.page_mut().write_u16(OFFSET_NUM_SLOTS, num_slots);
    }

    /// Writes a slot's offset without bounds checking.
    ///
    /// Callers must guarantee `slot < num_slots()`.
    fn set_slot_value(&mut self, slot: SlotId, value: u16) {
        self.page_mut().write_u16(2 * (1 + slot as usize), value);
    }

    /// Allocates space for a new tuple of `len` bytes and returns its slot.
    ///
    /// The first empty slot is reused if one exists; otherwise a new slot
    /// is appended to the directory (costing 2 extra bytes). The allocated
    /// space is zero-filled and placed so that tuple bodies stay contiguous
    /// and ordered.
    ///
    /// # Errors
    ///
    /// Returns [`HeapError::PageFull`] if the page lacks the free space for
    /// the tuple plus any new slot entry. This is an expected condition;
    /// callers react by trying another page.
    pub fn allocate_tuple(&mut self, len: usize) -> Result<SlotId, HeapError> {
        let num_slots = self.num_slots();

        // Find the first empty slot, tracking where the new tuple must end:
        // just below the tuple of the nearest non-empty predecessor slot.
        // Stopping at the first empty slot is sound because any non-empty
        // slot after it holds a lower offset than every one before it.
        let mut new_tuple_end = self.page_size();
        let mut slot = num_slots;
        for candidate in 0..num_slots {
            let value = self.slot_value(candidate);
            if value == EMPTY_SLOT {
                slot = candidate;
                break;
            }
            new_tuple_end = value as usize;
        }

        let mut space_needed = len;
        if slot == num_slots {
            // No empty slot to reuse; a new directory entry is required.
            space_needed += 2;
        }

        let available = self.free_space();
        if space_needed > available {
            return Err(HeapError::PageFull {
                required: space_needed,
                available,
            });
        }

        if slot == num_slots {
            self.set_num_slots(num_slots + 1);
        }

        debug!(len, slot, "allocated tuple space");

        let new_tuple_start = new_tuple_end - len;
        self.insert_tuple_range(new_tuple_end, len)?;

        // The slot must be set *after* the range insertion: the insertion
        // adjusts every slot whose offset lies below the insertion point,
        // and would shift this slot's offset too.
        self.set_slot_value(slot, new_tuple_start as u16);

        debug_assert!(
            self.slot_value(self.num_slots() - 1) != EMPTY_SLOT,
            "last slot must never be empty"
        );

        Ok(slot)
    }

    /// Deletes the tuple in the given slot.
    ///
    /// The tuple's bytes are reclaimed by sliding lower-offset tuples over
    /// them, the slot is marked empty, and trailing empty slots are trimmed
    /// from the directory.
    ///
    /// # Errors
    ///
    /// Returns [`HeapError::SlotOutOfRange`] for a bad index and
    /// [`HeapError::EmptySlot`] if the slot is already empty.
    pub fn delete_tuple(&mut self, slot: SlotId) -> Result<(), HeapError> {
        self.check_slot(slot)?;

        let tuple_start = self.slot_value(slot);
        if tuple_start == EMPTY_SLOT {
            return Err(HeapError::EmptySlot(slot));
        }
        let tuple_length = self.tuple_length(slot)?;

        debug!(
            page = self.page().page_id().page_num(),
            slot,
            start = tuple_start,
            len = tuple_length,
            "deleting tuple"
        );

        self.delete_tuple_range(tuple_start as usize, tuple_length)?;
        self.set_slot_value(slot, EMPTY_SLOT);

        // Trim trailing empty slots so the last slot is always live.
        let mut num_slots = self.num_slots();
        while num_slots > 0 && self.slot_value(num_slots - 1) == EMPTY_SLOT {
            num_slots -= 1;
        }
        if num_slots != self.num_slots() {
            self.set_num_slots(num_slots);
        }

        Ok(())
    }

    /// Opens a gap of `len` bytes ending at `off` within the tuple data
    /// area, sliding lower-offset tuple bodies downward.
    ///
    /// The gap `[off - len, off)` is zero-filled, and every slot whose
    /// offset is strictly less than `off` is decreased by `len`.
    ///
    /// # Errors
    ///
    /// Returns [`HeapError::OffsetNotInTupleData`] if `off` is outside the
    /// tuple data area and [`HeapError::RangeTooLarge`] if `len` exceeds
    /// the page's free space.
    pub fn insert_tuple_range(&mut self, off: usize, len: usize) -> Result<(), HeapError> {
        let data_start = self.tuple_data_start();
        if off < data_start || off > self.page_size() {
            return Err(HeapError::OffsetNotInTupleData { offset: off, data_start });
        }

        let available = self.free_space();
        if len > available {
            return Err(HeapError::RangeTooLarge { len, available });
        }

        // Slide [data_start, off) down to [data_start - len, off - len),
        // then zero the gap left behind.
        if off > data_start {
            self.page_mut().data_mut().copy_within(data_start..off, data_start - len);
        }
        self.page_mut().data_mut()[off - len..off].fill(0);

        let num_slots = self.num_slots();
        for slot in 0..num_slots {
            let value = self.slot_value(slot);
            if value != EMPTY_SLOT && (value as usize) < off {
                self.set_slot_value(slot, value - len as u16);
            }
        }

        Ok(())
    }

    /// Removes the `len` bytes starting at `off` from the tuple data area,
    /// sliding lower-offset tuple bodies upward to close the gap.
    ///
    /// Every slot whose offset is less than *or equal to* `off` is
    /// increased by `len`; the equality case covers the victim tuple
    /// itself, whose slot the caller clears afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`HeapError::OffsetNotInTupleData`] if `off` is outside the
    /// tuple data area and [`HeapError::RangeTooLarge`] if `len` exceeds
    /// the tuple data between `off` and the end of the page.
    pub fn delete_tuple_range(&mut self, off: usize, len: usize) -> Result<(), HeapError> {
        let data_start = self.tuple_data_start();
        if off < data_start || off > self.page_size() {
            return Err(HeapError::OffsetNotInTupleData { offset: off, data_start });
        }

        let available = self.page_size() - off;
        if len > available {
            return Err(HeapError::RangeTooLarge { len, available });
        }

        // Slide [data_start, off) up to [data_start + len, off + len).
        self.page_mut().data_mut().copy_within(data_start..off, data_start + len);

        let num_slots = self.num_slots();
        for slot in 0..num_slots {
            let value = self.slot_value(slot);
            if value != EMPTY_SLOT && (value as usize) <= off {
                self.set_slot_value(slot, value + len as u16);
            }
        }

        Ok(())
    }

    /// Returns the bytes of the tuple in the given slot, mutably.
    pub fn tuple_data_mut(&mut self, slot: SlotId) -> Result<&mut [u8], HeapError> {
        let start = self.slot_offset(slot)? as usize;
        let len = self.tuple_length(slot)?;
        Ok(&mut self.page_mut().data_mut()[start..start + len])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::PageId;

    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const PAGE_SIZE: usize = 32;

    fn empty_page() -> Page {
        let mut page = Page::new(PageId::new(0), PAGE_SIZE);
        SlottedPage::new(&mut page).init();
        page
    }

    /// Asserts the layout invariants that must hold after every operation.
    fn check_invariants(slotted: &SlottedPage<&mut Page>) {
        let num_slots = slotted.num_slots();
        assert!(num_slots as usize <= (slotted.page_size() - 2) / 2);

        if num_slots > 0 {
            assert_ne!(
                slotted.slot_offset(num_slots - 1).unwrap(),
                EMPTY_SLOT,
                "last slot must not be empty"
            );
        }

        // Non-empty slots are ordered by strictly decreasing offset, all
        // within the tuple data region.
        let mut prev_offset = slotted.page_size() + 1;
        let mut tuple_bytes = 0usize;
        for slot in 0..num_slots {
            let offset = slotted.slot_offset(slot).unwrap();
            if offset == EMPTY_SLOT {
                continue;
            }
            assert!((offset as usize) < prev_offset, "offsets must decrease");
            assert!(offset as usize >= slotted.slots_end_index());
            prev_offset = offset as usize;
            tuple_bytes += slotted.tuple_length(slot).unwrap();
        }

        // Bodies are contiguous: total tuple bytes span exactly from
        // tuple_data_start to the end of the page.
        assert_eq!(tuple_bytes, slotted.page_size() - slotted.tuple_data_start());

        // Free space accounting identity.
        assert_eq!(
            slotted.free_space(),
            slotted.page_size() - slotted.slots_end_index() - tuple_bytes
        );
    }

    #[test]
    fn test_init_empty_page() {
        let mut page = empty_page();
        let slotted = SlottedPage::new(&mut page);

        assert_eq!(slotted.num_slots(), 0);
        assert_eq!(slotted.slots_end_index(), 2);
        assert_eq!(slotted.tuple_data_start(), PAGE_SIZE);
        assert_eq!(slotted.free_space(), PAGE_SIZE - 2);
    }

    #[test]
    fn test_alloc_three_delete_middle_alloc_small() {
        let mut page = empty_page();
        let mut slotted = SlottedPage::new(&mut page);

        assert_eq!(slotted.allocate_tuple(3).unwrap(), 0);
        assert_eq!(slotted.allocate_tuple(4).unwrap(), 1);
        assert_eq!(slotted.allocate_tuple(2).unwrap(), 2);
        assert_eq!(slotted.slot_offset(0).unwrap(), 29);
        assert_eq!(slotted.slot_offset(1).unwrap(), 25);
        assert_eq!(slotted.slot_offset(2).unwrap(), 23);
        check_invariants(&slotted);

        // Deleting the middle tuple slides the last tuple up by 4 bytes.
        slotted.delete_tuple(1).unwrap();
        assert_eq!(slotted.slot_offset(0).unwrap(), 29);
        assert_eq!(slotted.slot_offset(1).unwrap(), EMPTY_SLOT);
        assert_eq!(slotted.slot_offset(2).unwrap(), 27);
        check_invariants(&slotted);

        // Reallocation reuses the empty slot; the last tuple shifts down
        // by the new tuple's 2 bytes.
        assert_eq!(slotted.allocate_tuple(2).unwrap(), 1);
        assert_eq!(slotted.slot_offset(0).unwrap(), 29);
        assert_eq!(slotted.slot_offset(1).unwrap(), 27);
        assert_eq!(slotted.slot_offset(2).unwrap(), 25);
        check_invariants(&slotted);
    }

    #[test]
    fn test_delete_preserves_tuple_bytes() {
        let mut page = empty_page();
        let mut slotted = SlottedPage::new(&mut page);

        let a = slotted.allocate_tuple(3).unwrap();
        slotted.tuple_data_mut(a).unwrap().copy_from_slice(b"AAA");
        let b = slotted.allocate_tuple(4).unwrap();
        slotted.tuple_data_mut(b).unwrap().copy_from_slice(b"BBBB");
        let c = slotted.allocate_tuple(2).unwrap();
        slotted.tuple_data_mut(c).unwrap().copy_from_slice(b"CC");

        slotted.delete_tuple(b).unwrap();

        assert_eq!(slotted.tuple_data(a).unwrap(), b"AAA");
        assert_eq!(slotted.tuple_data(c).unwrap(), b"CC");
    }

    #[test]
    fn test_trim_trailing_empty_slots() {
        let mut page = empty_page();
        let mut slotted = SlottedPage::new(&mut page);

        slotted.allocate_tuple(2).unwrap();
        slotted.allocate_tuple(2).unwrap();
        slotted.allocate_tuple(2).unwrap();

        // Deleting the last tuple trims its now-empty slot.
        slotted.delete_tuple(2).unwrap();
        assert_eq!(slotted.num_slots(), 2);
        check_invariants(&slotted);
    }

    #[test]
    fn test_trim_cascades_over_earlier_empty_slots() {
        let mut page = empty_page();
        let mut slotted = SlottedPage::new(&mut page);

        slotted.allocate_tuple(2).unwrap();
        slotted.allocate_tuple(2).unwrap();
        slotted.allocate_tuple(2).unwrap();

        slotted.delete_tuple(1).unwrap();
        assert_eq!(slotted.num_slots(), 3);

        // Deleting slot 2 leaves slots 1 and 2 both empty; both are trimmed.
        slotted.delete_tuple(2).unwrap();
        assert_eq!(slotted.num_slots(), 1);
        check_invariants(&slotted);
    }

    #[test]
    fn test_tuple_length_roundtrip() {
        let mut page = empty_page();
        let mut slotted = SlottedPage::new(&mut page);

        let slot = slotted.allocate_tuple(7).unwrap();
        assert_eq!(slotted.tuple_length(slot).unwrap(), 7);
    }

    #[test]
    fn test_alloc_then_delete_restores_free_space() {
        let mut page = empty_page();
        let mut slotted = SlottedPage::new(&mut page);

        slotted.allocate_tuple(3).unwrap();
        let before = slotted.free_space();

        // The new slot is the last one, so deleting it trims the directory
        // and restores free space exactly.
        let slot = slotted.allocate_tuple(5).unwrap();
        slotted.delete_tuple(slot).unwrap();
        assert_eq!(slotted.free_space(), before);
    }

    #[test]
    fn test_page_full() {
        let mut page = empty_page();
        let mut slotted = SlottedPage::new(&mut page);

        // 30 bytes free; a 29-byte tuple needs 29 + 2 for its slot.
        let err = slotted.allocate_tuple(29).unwrap_err();
        assert!(matches!(
            err,
            HeapError::PageFull {
                required: 31,
                available: 30
            }
        ));

        // 28 bytes + 2-byte slot fits exactly.
        slotted.allocate_tuple(28).unwrap();
        assert_eq!(slotted.free_space(), 0);
        assert!(matches!(
            slotted.allocate_tuple(1),
            Err(HeapError::PageFull { .. })
        ));
    }

    #[test]
    fn test_slot_out_of_range_reports_valid_range() {
        let mut page = empty_page();
        let mut slotted = SlottedPage::new(&mut page);
        slotted.allocate_tuple(2).unwrap();

        let err = slotted.tuple_length(5).unwrap_err();
        assert!(matches!(
            err,
            HeapError::SlotOutOfRange {
                slot: 5,
                num_slots: 1
            }
        ));
        // The message must report the actual slot count as the upper bound.
        assert_eq!(err.to_string(), "valid slots are in range [0, 1); got 5");
    }

    #[test]
    fn test_empty_slot_errors() {
        let mut page = empty_page();
        let mut slotted = SlottedPage::new(&mut page);

        slotted.allocate_tuple(2).unwrap();
        slotted.allocate_tuple(2).unwrap();
        slotted.delete_tuple(0).unwrap();

        assert!(matches!(
            slotted.tuple_length(0),
            Err(HeapError::EmptySlot(0))
        ));
        assert!(matches!(
            slotted.delete_tuple(0),
            Err(HeapError::EmptySlot(0))
        ));
    }

    #[test]
    fn test_insert_range_rejects_offset_below_data_start() {
        let mut page = empty_page();
        let mut slotted = SlottedPage::new(&mut page);
        slotted.allocate_tuple(4).unwrap();

        let data_start = slotted.tuple_data_start();
        let err = slotted.insert_tuple_range(data_start - 1, 1).unwrap_err();
        assert!(matches!(err, HeapError::OffsetNotInTupleData { .. }));
    }

    #[test]
    fn test_insert_range_rejects_oversized_length() {
        let mut page = empty_page();
        let mut slotted = SlottedPage::new(&mut page);

        let err = slotted.insert_tuple_range(PAGE_SIZE, PAGE_SIZE).unwrap_err();
        assert!(matches!(err, HeapError::RangeTooLarge { .. }));
    }

    #[test]
    fn test_delete_range_rejects_oversized_length() {
        let mut page = empty_page();
        let mut slotted = SlottedPage::new(&mut page);
        slotted.allocate_tuple(4).unwrap();

        let start = slotted.slot_offset(0).unwrap() as usize;
        let err = slotted.delete_tuple_range(start, PAGE_SIZE).unwrap_err();
        assert!(matches!(err, HeapError::RangeTooLarge { .. }));
    }

    #[test]
    fn test_zero_length_tuple() {
        let mut page = empty_page();
        let mut slotted = SlottedPage::new(&mut page);

        let slot = slotted.allocate_tuple(0).unwrap();
        assert_eq!(slotted.tuple_length(slot).unwrap(), 0);
        check_invariants(&slotted);
    }

    #[test]
    fn test_read_only_view() {
        let mut page = empty_page();
        SlottedPage::new(&mut page).allocate_tuple(4).unwrap();

        let view = SlottedPage::new(&page);
        assert_eq!(view.num_slots(), 1);
        assert_eq!(view.tuple_length(0).unwrap(), 4);
    }

    #[test]
    fn test_random_alloc_delete_preserves_invariants() {
        let mut rng = StdRng::seed_from_u64(0x5107);
        let mut page = Page::new(PageId::new(0), 256);
        let mut slotted = SlottedPage::new(&mut page);
        slotted.init();

        let mut live: Vec<SlotId> = Vec::new();
        for _ in 0..500 {
            if live.is_empty() || rng.random_bool(0.6) {
                let len = rng.random_range(1..40);
                match slotted.allocate_tuple(len) {
                    Ok(slot) => {
                        assert_eq!(slotted.tuple_length(slot).unwrap(), len);
                        live.push(slot);
                    }
                    Err(HeapError::PageFull { .. }) => {}
                    Err(err) => panic!("unexpected error: {}", err),
                }
            } else {
                let victim = live.swap_remove(rng.random_range(0..live.len()));
                slotted.delete_tuple(victim).unwrap();
            }
            check_invariants(&slotted);
        }
    }
}
