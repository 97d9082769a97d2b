use std::sync::Arc;

use bytes::{BufMut, BytesMut};

use crate::common::{DbError, PageId, RecordId, Result, SlotId, TransactionId};
use crate::tuple::{Schema, Tuple};

/// Heap page layout:
///
/// +------------------+
/// | Slot Bitmap      |  (ceil(num_slots / 8) bytes, bit i of byte i/8 = slot i)
/// +------------------+
/// | [slot 0]         |  (schema.size() bytes each)
/// | [slot 1]         |
/// | ...              |
/// +------------------+
/// | Zero Padding     |
/// +------------------+
///
/// The slot count is the largest n with n * (tuple_bits + 1) <= page_bits,
/// so the bitmap and all slots always fit inside one page. Free slots are
/// written as zeros.
#[derive(Debug, Clone)]
pub struct HeapPage {
    /// Identity of this page
    pid: PageId,
    /// Schema of every tuple on the page
    schema: Arc<Schema>,
    /// Size of the page image in bytes
    page_size: usize,
    /// Slot occupancy bitmap
    header: Vec<u8>,
    /// Slot contents, `Some` for occupied slots
    slots: Vec<Option<Tuple>>,
    /// Transaction that last dirtied the page; None when clean
    dirtied_by: Option<TransactionId>,
}

impl HeapPage {
    /// Most slots a page may have, so that every slot number fits a [`SlotId`].
    pub const MAX_SLOTS: usize = u16::MAX as usize + 1;

    /// Returns the number of tuples of `tuple_size` bytes that fit on a page.
    pub fn slot_count(tuple_size: usize, page_size: usize) -> usize {
        (page_size * 8) / (tuple_size * 8 + 1)
    }

    /// Returns the bitmap size in bytes for the given slot count.
    pub fn header_size(slot_count: usize) -> usize {
        slot_count.div_ceil(8)
    }

    /// Returns the image of a page with every slot free.
    pub fn empty_page_data(page_size: usize) -> Vec<u8> {
        vec![0u8; page_size]
    }

    /// Creates an in-memory page with every slot free.
    pub fn empty(pid: PageId, schema: Arc<Schema>, page_size: usize) -> Self {
        let num_slots = Self::slot_count(schema.size(), page_size);
        Self {
            pid,
            schema,
            page_size,
            header: vec![0u8; Self::header_size(num_slots)],
            slots: vec![None; num_slots],
            dirtied_by: None,
        }
    }

    /// Parses a page image. The page size is taken from `data.len()`.
    pub fn new(pid: PageId, schema: Arc<Schema>, data: &[u8]) -> Result<Self> {
        let page_size = data.len();
        let tuple_size = schema.size();
        let num_slots = Self::slot_count(tuple_size, page_size);
        let header_size = Self::header_size(num_slots);

        let header = data[..header_size].to_vec();
        let mut slots = Vec::with_capacity(num_slots);

        for slot in 0..num_slots {
            if !bit_is_set(&header, slot) {
                slots.push(None);
                continue;
            }
            let start = header_size + slot * tuple_size;
            let mut tuple = Tuple::from_bytes(Arc::clone(&schema), &data[start..start + tuple_size])
                .ok_or_else(|| DbError::CorruptPage {
                    page_id: pid,
                    reason: format!("slot {} does not decode as [{}]", slot, schema),
                })?;
            tuple.set_record_id(Some(RecordId::new(pid, SlotId::new(slot as u16))));
            slots.push(Some(tuple));
        }

        Ok(Self {
            pid,
            schema,
            page_size,
            header,
            slots,
            dirtied_by: None,
        })
    }

    /// Serializes the page into exactly `page_size` bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let tuple_size = self.schema.size();
        let mut buf = BytesMut::with_capacity(self.page_size);

        buf.put_slice(&self.header);
        for slot in &self.slots {
            match slot {
                Some(tuple) => tuple.write_to(&mut buf)?,
                None => buf.put_bytes(0, tuple_size),
            }
        }
        buf.put_bytes(0, self.page_size - buf.len());

        Ok(buf.to_vec())
    }

    /// Returns the page ID.
    pub fn id(&self) -> PageId {
        self.pid
    }

    /// Returns the schema of the tuples on this page.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Returns the page size in bytes.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Returns the total number of slots.
    pub fn num_slots(&self) -> usize {
        self.slots.len()
    }

    /// Returns the number of free slots.
    pub fn num_empty_slots(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_none()).count()
    }

    /// Returns whether the given slot holds a tuple.
    pub fn is_slot_used(&self, slot: usize) -> bool {
        slot < self.slots.len() && bit_is_set(&self.header, slot)
    }

    /// Returns the tuple in the given slot, if any.
    pub fn tuple(&self, slot: SlotId) -> Option<&Tuple> {
        self.slots.get(slot.as_usize()).and_then(Option::as_ref)
    }

    /// Returns the stored tuples in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &Tuple> {
        self.slots.iter().flatten()
    }

    /// Stores a copy of `tuple` in the first free slot and returns its record ID.
    pub fn insert_tuple(&mut self, tuple: &Tuple) -> Result<RecordId> {
        if **tuple.schema() != *self.schema {
            return Err(DbError::SchemaMismatch {
                expected: self.schema.to_string(),
                found: tuple.schema().to_string(),
            });
        }

        let slot = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(DbError::PageFull(self.pid))?;

        let record_id = RecordId::new(self.pid, SlotId::new(slot as u16));
        let mut stored = tuple.clone();
        stored.set_record_id(Some(record_id));
        self.slots[slot] = Some(stored);
        set_bit(&mut self.header, slot, true);

        Ok(record_id)
    }

    /// Frees the slot named by the tuple's record ID.
    pub fn delete_tuple(&mut self, tuple: &Tuple) -> Result<()> {
        let record_id = tuple.record_id().ok_or(DbError::MissingRecordId)?;
        if record_id.page_id != self.pid {
            return Err(DbError::RecordNotOnPage {
                record_id,
                page_id: self.pid,
            });
        }

        let slot = record_id.slot_id.as_usize();
        if !self.is_slot_used(slot) {
            return Err(DbError::EmptySlot {
                page_id: self.pid,
                slot_id: record_id.slot_id,
            });
        }

        self.slots[slot] = None;
        set_bit(&mut self.header, slot, false);
        Ok(())
    }

    /// Marks the page dirty on behalf of `txn`.
    pub fn mark_dirty(&mut self, txn: TransactionId) {
        self.dirtied_by = Some(txn);
    }

    /// Marks the page clean.
    pub fn mark_clean(&mut self) {
        self.dirtied_by = None;
    }

    /// Returns the transaction that last dirtied the page, if it is dirty.
    pub fn dirtied_by(&self) -> Option<TransactionId> {
        self.dirtied_by
    }

    /// Returns whether the page differs from its on-disk image.
    pub fn is_dirty(&self) -> bool {
        self.dirtied_by.is_some()
    }
}

fn bit_is_set(header: &[u8], slot: usize) -> bool {
    header[slot / 8] & (1 << (slot % 8)) != 0
}

fn set_bit(header: &mut [u8], slot: usize, used: bool) {
    if used {
        header[slot / 8] |= 1 << (slot % 8);
    } else {
        header[slot / 8] &= !(1 << (slot % 8));
    }
}
