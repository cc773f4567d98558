//! Incremental construction of rift buffers.
//!
//! A [`BufferBuilder`] appends bytes to a single buffer and never moves them.
//! Sizes that are only known after the fact are handled in two passes: a
//! zero-filled placeholder is written first, more data is appended, and then
//! the placeholder is patched.  This happens for an object's `total_size`
//! (between [`begin_object()`](BufferBuilder::begin_object) and
//! [`end_object()`](BufferBuilder::end_object)) and for every offset table
//! entry (between [`reserve_offset_entry()`](BufferBuilder::reserve_offset_entry)
//! and [`update_offset_entry()`](BufferBuilder::update_offset_entry)).
//!
//! Placeholders are addressed through typed handles ([`ObjectStart`],
//! [`EntrySlot`]) rather than raw offsets, and patches are the only writes
//! that touch previously written bytes.
use crate::{
  classify::{check_fixed_size, check_type_concepts, FixedSize, VariableSize},
  layout::{ObjectHeader, OffsetEntry},
  util::debug::HexDump,
  zerocopy::{align_up, ZeroCopy},
  RiftErr,
};
use alloc::vec::Vec;
use core::{
  fmt::{Debug, Formatter},
  ops::Deref,
  slice::{from_raw_parts, from_raw_parts_mut},
  sync::atomic::{AtomicU32, Ordering},
};

/// The capacity reserved by [`BufferBuilder::new()`].
const DEFAULT_CAPACITY: usize = 1024;

/// Source of builder generations; every builder and every reset gets its own.
static NEXT_GENERATION: AtomicU32 = AtomicU32::new(1);

fn next_generation() -> u32 {
  NEXT_GENERATION.fetch_add(1, Ordering::Relaxed)
}

#[derive(Copy, Clone, Default)]
#[repr(C, align(8))]
struct Word([u8; 8]);

/// An owned byte buffer whose first byte is always 8-byte aligned.
///
/// Objects are read in place, so the memory holding a buffer must satisfy the
/// header's alignment; a plain `Vec<u8>` makes no such promise.  Use
/// [`AlignedBuf::from_slice()`] to copy bytes received from elsewhere into
/// suitably aligned memory.
#[derive(Clone, Default)]
pub struct AlignedBuf {
  words: Vec<Word>,
  len:   usize,
}

impl AlignedBuf {
  /// Creates an empty buffer.
  pub const fn new() -> Self {
    Self {
      words: Vec::new(),
      len:   0,
    }
  }

  /// Creates an empty buffer with room for `capacity` bytes.
  pub fn with_capacity(capacity: usize) -> Self {
    Self {
      words: Vec::with_capacity(capacity.div_ceil(8)),
      len:   0,
    }
  }

  /// Copies `bytes` into a new, aligned buffer.
  pub fn from_slice(bytes: &[u8]) -> Self {
    let mut buf = Self::with_capacity(bytes.len());
    buf.extend_from_slice(bytes);
    buf
  }

  /// The number of bytes in the buffer.
  pub fn len(&self) -> usize {
    self.len
  }

  #[allow(missing_docs)]
  pub fn is_empty(&self) -> bool {
    self.len == 0
  }

  /// The number of bytes the buffer can hold without reallocating.
  pub fn capacity(&self) -> usize {
    self.words.capacity() * 8
  }

  /// The buffer's contents.
  pub fn as_bytes(&self) -> &[u8] {
    // SAFETY: Every word is initialized (zero-filled on growth), and `len`
    //         never exceeds `words.len() * 8`.
    unsafe { from_raw_parts(self.words.as_ptr() as *const u8, self.len) }
  }

  fn as_bytes_mut(&mut self) -> &mut [u8] {
    // SAFETY: As for `as_bytes()`, and we hold the only reference.
    unsafe { from_raw_parts_mut(self.words.as_mut_ptr() as *mut u8, self.len) }
  }

  fn reserve(&mut self, additional: usize) {
    let words = self.len.saturating_add(additional).div_ceil(8);
    self.words.reserve(words.saturating_sub(self.words.len()));
  }

  /// Grows the buffer by `n` zero bytes and returns them.
  fn extend_zeroed(&mut self, n: usize) -> &mut [u8] {
    let start = self.len;
    self.len += n;
    let words = self.len.div_ceil(8);
    if words > self.words.len() {
      self.words.resize(words, Word::default());
    }
    let added = &mut self.as_bytes_mut()[start..];
    added.fill(0);
    added
  }

  fn extend_from_slice(&mut self, bytes: &[u8]) {
    self.extend_zeroed(bytes.len()).copy_from_slice(bytes);
  }

  fn clear(&mut self) {
    self.words.clear();
    self.len = 0;
  }
}

impl Deref for AlignedBuf {
  type Target = [u8];

  fn deref(&self) -> &[u8] {
    self.as_bytes()
  }
}

impl AsRef<[u8]> for AlignedBuf {
  fn as_ref(&self) -> &[u8] {
    self.as_bytes()
  }
}

impl PartialEq for AlignedBuf {
  fn eq(&self, other: &Self) -> bool {
    self.as_bytes() == other.as_bytes()
  }
}

impl Eq for AlignedBuf {}

impl Debug for AlignedBuf {
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    Debug::fmt(&HexDump(self.as_bytes()), f)
  }
}

/// Handle to an object opened with [`BufferBuilder::begin_object()`].
///
/// It is consumed by [`BufferBuilder::end_object()`], so an object can only be
/// closed once.
#[derive(Debug, Eq, PartialEq)]
pub struct ObjectStart {
  offset:        usize,
  schema_id:     u32,
  version_flags: u32,
  generation:    u32,
}

impl ObjectStart {
  /// The position of the object's header in the buffer.
  pub fn offset(&self) -> usize {
    self.offset
  }

  #[allow(missing_docs)]
  pub fn schema_id(&self) -> u32 {
    self.schema_id
  }

  /// The number of bytes written for this object so far, given the builder's
  /// current length.
  pub fn relative(&self, position: usize) -> usize {
    position.saturating_sub(self.offset)
  }
}

/// Handle to an offset entry placeholder reserved with
/// [`BufferBuilder::reserve_offset_entry()`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct EntrySlot {
  offset:     usize,
  generation: u32,
}

impl EntrySlot {
  /// The position of the entry in the buffer.
  pub fn offset(&self) -> usize {
    self.offset
  }
}

/// The location of a variable-size payload in a builder's buffer.
///
/// `offset` is relative to the start of the buffer, not to any object; use
/// [`BufferBuilder::link_entry()`] to store it in an offset entry.  An offset
/// of zero marks an absent payload (nothing can follow an object header at
/// buffer position zero).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Payload {
  offset: usize,
  count:  u32,
}

impl Payload {
  /// A payload that was never written, such as an empty array.
  pub const ABSENT: Payload = Payload::new(0, 0);

  /// Describes a payload written by hand, e.g., a run of nested objects.
  pub const fn new(offset: usize, count: u32) -> Self {
    Self { offset, count }
  }

  /// The position of the payload's first byte in the buffer.
  pub const fn offset(&self) -> usize {
    self.offset
  }

  /// The number of characters or elements in the payload.
  pub const fn count(&self) -> u32 {
    self.count
  }

  #[allow(missing_docs)]
  pub const fn is_absent(&self) -> bool {
    self.offset == 0
  }
}

/// Assembles rift objects into a single, append-only buffer.
///
/// The layout of an object's fixed region is decided by its schema: the
/// builder only pads at object, offset table and array boundaries, so callers
/// writing fixed fields with [`write_value()`](Self::write_value) must pad for
/// them where the schema says so.
///
/// ```
/// use rift::{BufferBuilder, RiftErr};
///
/// # fn main() -> Result<(), RiftErr> {
/// let mut builder = BufferBuilder::new();
/// let object = builder.begin_object(7, 0);
/// builder.write_value(1.5f64);
/// let total_size = builder.end_object(object)?;
/// assert_eq!(total_size, 24);
/// assert_eq!(builder.len(), 24);
/// # Ok(())
/// # }
/// ```
pub struct BufferBuilder {
  buf:        AlignedBuf,
  /// Unique to this builder and replaced on every reset, so handles from
  /// another builder or from before a reset are rejected.
  generation: u32,
}

impl Default for BufferBuilder {
  fn default() -> Self {
    Self::new()
  }
}

impl BufferBuilder {
  /// Creates a new builder with a small initial capacity.
  pub fn new() -> Self {
    Self::with_capacity(DEFAULT_CAPACITY)
  }

  /// Creates a new builder that can hold `capacity` bytes before reallocating.
  pub fn with_capacity(capacity: usize) -> Self {
    Self {
      buf:        AlignedBuf::with_capacity(capacity),
      generation: next_generation(),
    }
  }

  /// Reserves room for at least `additional` more bytes.
  pub fn reserve(&mut self, additional: usize) {
    self.buf.reserve(additional);
  }

  /// The number of bytes written so far.
  pub fn len(&self) -> usize {
    self.buf.len()
  }

  #[allow(missing_docs)]
  pub fn is_empty(&self) -> bool {
    self.buf.is_empty()
  }

  /// The write cursor, i.e., the position the next byte will be written at.
  pub fn current_offset(&self) -> usize {
    self.buf.len()
  }

  /// The bytes written so far.
  pub fn as_bytes(&self) -> &[u8] {
    self.buf.as_bytes()
  }

  /// Finishes building, returning the buffer.
  pub fn into_buffer(self) -> AlignedBuf {
    self.buf
  }

  /// Clears the buffer so the builder can be reused.
  ///
  /// Handles obtained before the reset are rejected afterwards.
  pub fn reset(&mut self) {
    self.buf.clear();
    self.generation = next_generation();
  }

  /// Appends zero bytes until the cursor is a multiple of `alignment`.
  ///
  /// `alignment` must be a power of two.
  pub fn pad_to_alignment(&mut self, alignment: usize) -> Result<(), RiftErr> {
    if !alignment.is_power_of_two() {
      return Err(err!(debug, RiftErr::InvalidAlignment(alignment)));
    }
    self.pad_to(alignment);
    Ok(())
  }

  fn pad_to(&mut self, alignment: usize) {
    let padding = align_up(self.len(), alignment) - self.len();
    self.buf.extend_zeroed(padding);
  }

  /// Appends `value` in little-endian byte order.
  ///
  /// No padding is added; the cursor should already be aligned for `T` if
  /// the schema places the field at its natural alignment.
  pub fn write_value<T: FixedSize>(&mut self, value: T) {
    let size = const { check_fixed_size::<T>() };
    value.write_le(self.buf.extend_zeroed(size));
  }

  /// Appends raw bytes.
  pub fn write_raw(&mut self, bytes: &[u8]) {
    self.buf.extend_from_slice(bytes);
  }

  /// Starts a new object, writing its header with a placeholder size.
  ///
  /// The cursor is padded to the header's alignment first.
  pub fn begin_object(&mut self, schema_id: u32, version_flags: u32) -> ObjectStart {
    self.pad_to(ObjectHeader::ALIGN);
    let offset = self.len();
    let header = ObjectHeader::new(schema_id, 0, version_flags);
    self.buf.extend_from_slice(header.as_bytes());
    log::trace!("begin object 0x{:08X} at {}", schema_id, offset);
    ObjectStart {
      offset,
      schema_id,
      version_flags,
      generation: self.generation,
    }
  }

  /// Closes an object, patching its header with the number of bytes written
  /// since [`begin_object()`](Self::begin_object).  Returns that size.
  pub fn end_object(&mut self, start: ObjectStart) -> Result<u32, RiftErr> {
    self.check_handle(start.generation, start.offset, ObjectHeader::SIZE)?;
    let total_size = total_size(start.offset, self.len())?;
    let header =
      ObjectHeader::new(start.schema_id, total_size, start.version_flags);
    self.patch(start.offset, header.as_bytes());
    log::trace!(
      "end object 0x{:08X} at {}: {} bytes",
      start.schema_id,
      start.offset,
      total_size
    );
    Ok(total_size)
  }

  /// Appends a zero-filled offset entry to be patched later.
  ///
  /// The cursor is padded to the entry's alignment first, so consecutive
  /// reservations form a contiguous offset table.
  pub fn reserve_offset_entry(&mut self) -> EntrySlot {
    self.pad_to(OffsetEntry::ALIGN);
    let offset = self.len();
    self.buf.extend_zeroed(OffsetEntry::SIZE);
    EntrySlot {
      offset,
      generation: self.generation,
    }
  }

  /// Overwrites a reserved entry.
  ///
  /// `data_offset` is relative to the owning object's start; see
  /// [`link_entry()`](Self::link_entry) to patch from a [`Payload`].
  pub fn update_offset_entry(
    &mut self,
    slot: EntrySlot,
    data_offset: u32,
    data_count: u32,
  ) -> Result<(), RiftErr> {
    self.check_handle(slot.generation, slot.offset, OffsetEntry::SIZE)?;
    if slot.offset % OffsetEntry::ALIGN != 0 {
      return Err(err!(
        debug,
        RiftErr::Unaligned {
          needed: OffsetEntry::ALIGN,
          addr:   slot.offset,
        }
      ));
    }
    let entry = OffsetEntry::new(data_offset, data_count);
    self.patch(slot.offset, entry.as_bytes());
    Ok(())
  }

  /// Points a reserved entry at `payload`, which must have been written after
  /// `object`'s header.  An absent payload produces an all-zero entry.
  pub fn link_entry(
    &mut self,
    object: &ObjectStart,
    slot: EntrySlot,
    payload: Payload,
  ) -> Result<(), RiftErr> {
    self.check_handle(object.generation, object.offset, ObjectHeader::SIZE)?;
    if payload.is_absent() {
      return self.update_offset_entry(slot, 0, 0);
    }
    let first = object.offset + ObjectHeader::SIZE;
    if payload.offset < first || payload.offset > self.len() {
      return Err(err!(
        debug,
        RiftErr::OutOfBounds {
          end:   payload.offset,
          limit: self.len(),
        }
      ));
    }
    let relative = payload.offset - object.offset;
    let relative = u32::try_from(relative)
      .map_err(|_| err!(debug, RiftErr::ObjectTooLarge(relative)))?;
    self.update_offset_entry(slot, relative, payload.count)
  }

  /// Appends the bytes of `text` and a single zero terminator.
  ///
  /// Text payloads are not padded.  The returned payload counts the bytes of
  /// `text`, excluding the terminator.
  pub fn add_string(&mut self, text: &str) -> Result<Payload, RiftErr> {
    let count = payload_count(text.len())?;
    let offset = self.len();
    self.buf.extend_from_slice(text.as_bytes());
    self.buf.extend_from_slice(&[0]);
    Ok(Payload::new(offset, count))
  }

  /// Appends `elements` in little-endian byte order, after padding to the
  /// element type's alignment.
  ///
  /// An empty slice writes nothing and returns [`Payload::ABSENT`].
  pub fn add_array<T: FixedSize>(
    &mut self,
    elements: &[T],
  ) -> Result<Payload, RiftErr> {
    let size = const { check_fixed_size::<T>() };
    if elements.is_empty() {
      return Ok(Payload::ABSENT);
    }
    let count = payload_count(elements.len())?;
    let bytes = elements
      .len()
      .checked_mul(size)
      .ok_or_else(|| err!(debug, RiftErr::PayloadTooLarge(elements.len())))?;
    self.pad_to(T::WIRE_ALIGN);
    let offset = self.len();
    let target = self.buf.extend_zeroed(bytes);
    for (element, chunk) in elements.iter().zip(target.chunks_exact_mut(size)) {
      element.write_le(chunk);
    }
    Ok(Payload::new(offset, count))
  }

  /// Appends any variable-size value: text through
  /// [`add_string()`](Self::add_string), sequences through
  /// [`add_array()`](Self::add_array).
  pub fn add_variable<V>(&mut self, value: &V) -> Result<Payload, RiftErr>
  where
    V: VariableSize + ?Sized,
  {
    let _ = const { check_type_concepts::<V>() };
    value.append_to(self)
  }

  /// Appends a variable-size value and points `slot` at it.
  pub fn add_variable_field<V>(
    &mut self,
    object: &ObjectStart,
    slot: EntrySlot,
    value: &V,
  ) -> Result<Payload, RiftErr>
  where
    V: VariableSize + ?Sized,
  {
    let payload = self.add_variable(value)?;
    self.link_entry(object, slot, payload)?;
    Ok(payload)
  }

  /// Appends a run of whole objects, one per item, for a sequence of nested
  /// records.
  ///
  /// `write` must emit exactly one object per call, starting with
  /// [`begin_object()`](Self::begin_object).  The run is padded to 8 bytes at
  /// the end.  If `items` is empty nothing is written and the payload is
  /// absent.
  pub fn add_objects<I, F>(
    &mut self,
    items: I,
    mut write: F,
  ) -> Result<Payload, RiftErr>
  where
    I: IntoIterator,
    F: FnMut(&mut Self, I::Item) -> Result<(), RiftErr>,
  {
    let offset = align_up(self.len(), ObjectHeader::ALIGN);
    let mut count = 0usize;
    for item in items {
      write(self, item)?;
      count += 1;
    }
    if count == 0 {
      return Ok(Payload::ABSENT);
    }
    // The last element gets the same stride as the others.
    self.pad_to(ObjectHeader::ALIGN);
    Ok(Payload::new(offset, payload_count(count)?))
  }

  fn check_handle(
    &self,
    generation: u32,
    position: usize,
    size: usize,
  ) -> Result<(), RiftErr> {
    if generation != self.generation || position + size > self.len() {
      return Err(err!(
        debug,
        RiftErr::StaleHandle {
          position,
          len: self.len(),
        }
      ));
    }
    Ok(())
  }

  fn patch(&mut self, position: usize, bytes: &[u8]) {
    self.buf.as_bytes_mut()[position..position + bytes.len()]
      .copy_from_slice(bytes);
  }
}

impl Debug for BufferBuilder {
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    let mut df = f.debug_struct("BufferBuilder");
    df.field("len", &self.len());
    df.field("generation", &self.generation);
    df.field("bytes", &HexDump(self.as_bytes()));
    df.finish()
  }
}

/// The `total_size` of an object spanning `start..end`.
fn total_size(start: usize, end: usize) -> Result<u32, RiftErr> {
  let size = end - start;
  u32::try_from(size).map_err(|_| err!(debug, RiftErr::ObjectTooLarge(size)))
}

fn payload_count(count: usize) -> Result<u32, RiftErr> {
  u32::try_from(count).map_err(|_| err!(debug, RiftErr::PayloadTooLarge(count)))
}
