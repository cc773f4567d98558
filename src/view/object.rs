use crate::{
  classify::{check_fixed_size, FixedSize},
  layout::{ObjectHeader, OffsetEntry, VersionFlags},
  util::{debug::HexDump, OkOrLog},
  view::{ArrayElement, SequenceView, TextView},
  zerocopy::{align_check, align_up, bounds_check, ZeroCopy},
  RiftErr,
};
use core::{
  fmt::{Debug, Formatter},
  slice::from_raw_parts,
};
use log::Level;

/// A validated, read-only view of one object inside a byte buffer.
///
/// The view covers exactly the object's `total_size` bytes, starting at its
/// header.  All reads are bounds checked against that extent; reads that would
/// need a particular alignment are alignment checked too.
#[derive(Copy, Clone)]
pub struct ObjectView<'a> {
  header: &'a ObjectHeader,
  bytes:  &'a [u8],
}

impl<'a> ObjectView<'a> {
  /// Validates the object at the start of `buffer` and returns a view of it.
  ///
  /// Checks, in order: the buffer is not empty, its start is 8-byte aligned,
  /// it holds a complete header, the magic number matches, `total_size`
  /// covers at least the header, and the buffer holds `total_size` bytes.
  /// Bytes past `total_size` are ignored.
  pub fn from_bytes(buffer: &'a [u8]) -> Result<Self, RiftErr> {
    if buffer.is_empty() {
      return Err(err!(debug, RiftErr::NullBuffer));
    }
    align_check(buffer.as_ptr(), ObjectHeader::ALIGN)?;
    if buffer.len() < ObjectHeader::SIZE {
      return Err(err!(
        debug,
        RiftErr::BufferTooShort {
          needed:    ObjectHeader::SIZE,
          available: buffer.len(),
        }
      ));
    }
    let header = ObjectHeader::bbrf(buffer, &mut 0)?;
    header.validate()?;
    let total_size = header.total_size() as usize;
    let bytes = buffer.get(..total_size).ok_or_log(
      Level::Debug,
      RiftErr::TotalSizeOverflow {
        declared:  total_size,
        available: buffer.len(),
      },
    )?;
    Ok(Self { header, bytes })
  }

  /// Validates the object at `ptr`, as [`ObjectView::from_bytes()`] does.
  ///
  /// # Safety
  ///
  /// `ptr` must be null, or point to memory that stays readable and unchanged
  /// for `'a`.  That memory must hold at least a header's worth of bytes when
  /// `ptr` is aligned, and at least the header's `total_size` bytes when the
  /// header is valid.
  pub unsafe fn from_ptr(ptr: *const u8) -> Result<Self, RiftErr> {
    if ptr.is_null() {
      return Err(err!(debug, RiftErr::NullBuffer));
    }
    align_check(ptr, ObjectHeader::ALIGN)?;
    let header = &*(ptr as *const ObjectHeader);
    header.validate()?;
    Self::from_bytes(from_raw_parts(ptr, header.total_size() as usize))
  }

  /// Creates a view without validating the header.
  ///
  /// Field reads stay bounds checked against the smaller of `total_size` and
  /// the buffer's length.
  ///
  /// # Safety
  ///
  /// `buffer` must start at an 8-byte aligned address and hold at least
  /// [`ObjectHeader::SIZE`] bytes.
  pub unsafe fn from_bytes_unchecked(buffer: &'a [u8]) -> Self {
    let header = ObjectHeader::bbrf_u(buffer, &mut 0);
    let total_size = (header.total_size() as usize).min(buffer.len());
    Self {
      header,
      bytes: &buffer[..total_size],
    }
  }

  /// The object's header.
  pub fn header(&self) -> &'a ObjectHeader {
    self.header
  }

  /// Identifies the object's schema.
  pub fn schema_id(&self) -> u32 {
    self.header.schema_id()
  }

  /// The number of bytes in the object, including its header.
  pub fn total_size(&self) -> u32 {
    self.header.total_size()
  }

  /// The raw version & flags word.
  pub fn version_flags(&self) -> u32 {
    self.header.version_flags()
  }

  /// The version & flags word, unpacked.
  pub fn version(&self) -> VersionFlags {
    VersionFlags::from(self.version_flags())
  }

  /// The object's bytes, header included.
  pub fn as_bytes(&self) -> &'a [u8] {
    self.bytes
  }

  /// Returns the `size_needed` bytes at `offset` from the object's start.
  ///
  /// This is the bounds check every other read goes through: the range must
  /// end at or before `total_size`.
  pub fn field_bytes(
    &self,
    offset: usize,
    size_needed: usize,
  ) -> Result<&'a [u8], RiftErr> {
    let end = offset
      .checked_add(size_needed)
      .ok_or_log(Level::Debug, RiftErr::ArithmeticOverflow)?;
    bounds_check(self.bytes, end)?;
    Ok(&self.bytes[offset..end])
  }

  /// Decodes the fixed-size value at `offset`.
  ///
  /// `offset` must be a multiple of `T`'s alignment, up to the 8-byte
  /// alignment objects start at.
  pub fn read_fixed_field<T: FixedSize>(&self, offset: usize) -> Result<T, RiftErr> {
    let size = const { check_fixed_size::<T>() };
    check_offset_alignment(offset, T::WIRE_ALIGN)?;
    let bytes = self.field_bytes(offset, size)?;
    Ok(T::read_le(bytes))
  }

  /// References entry `index` of the offset table at `table_offset`, which
  /// has `num_entries` entries.
  pub fn offset_entry(
    &self,
    table_offset: usize,
    index: usize,
    num_entries: usize,
  ) -> Result<&'a OffsetEntry, RiftErr> {
    if index >= num_entries {
      return Err(err!(
        debug,
        RiftErr::IndexOutOfBounds {
          index,
          count: num_entries,
        }
      ));
    }
    if table_offset < ObjectHeader::SIZE {
      return Err(err!(debug, RiftErr::TableOverlapsHeader(table_offset)));
    }
    check_offset_alignment(table_offset, OffsetEntry::ALIGN)?;
    let mut cursor = index
      .checked_mul(OffsetEntry::SIZE)
      .and_then(|bytes| table_offset.checked_add(bytes))
      .ok_or_log(Level::Debug, RiftErr::ArithmeticOverflow)?;
    OffsetEntry::bbrf(self.bytes, &mut cursor)
  }

  /// The text an entry points to, or `None` if the entry is absent.
  ///
  /// The payload must fit, terminator included, inside the object.
  pub fn text(&self, entry: &OffsetEntry) -> Result<Option<TextView<'a>>, RiftErr> {
    if entry.is_absent() {
      return Ok(None);
    }
    let with_nul = (entry.size() as usize)
      .checked_add(1)
      .ok_or_log(Level::Debug, RiftErr::ArithmeticOverflow)?;
    let bytes = self.field_bytes(entry.offset() as usize, with_nul)?;
    Ok(Some(TextView::new(bytes)))
  }

  /// The sequence an entry points to, or `None` if the entry is absent.
  ///
  /// The payload's offset must be aligned for the element type and all of
  /// its elements must fit inside the object.
  pub fn sequence<T>(
    &self,
    entry: &OffsetEntry,
  ) -> Result<Option<SequenceView<'a, T>>, RiftErr>
  where
    T: ArrayElement<'a>,
  {
    if entry.is_absent() {
      return Ok(None);
    }
    let offset = entry.offset() as usize;
    let len = entry.size() as usize;
    check_offset_alignment(offset, T::ALIGN)?;
    let size = len
      .checked_mul(T::STRIDE)
      .ok_or_log(Level::Debug, RiftErr::ArithmeticOverflow)?;
    let bytes = self.field_bytes(offset, size)?;
    Ok(Some(SequenceView::new(bytes, len)))
  }

  /// Looks up a text field through the offset table.
  pub fn text_field(
    &self,
    table_offset: usize,
    index: usize,
    num_entries: usize,
  ) -> Result<Option<TextView<'a>>, RiftErr> {
    let entry = self.offset_entry(table_offset, index, num_entries)?;
    self.text(entry)
  }

  /// Looks up a sequence field through the offset table.
  pub fn sequence_field<T>(
    &self,
    table_offset: usize,
    index: usize,
    num_entries: usize,
  ) -> Result<Option<SequenceView<'a, T>>, RiftErr>
  where
    T: ArrayElement<'a>,
  {
    let entry = self.offset_entry(table_offset, index, num_entries)?;
    self.sequence(entry)
  }
}

/// Checks an object-relative offset against `alignment`.
///
/// Objects only promise 8-byte alignment, so stricter alignments are checked
/// as 8.
fn check_offset_alignment(offset: usize, alignment: usize) -> Result<(), RiftErr> {
  let needed = alignment.min(ObjectHeader::ALIGN);
  if offset % needed != 0 {
    return Err(err!(
      debug,
      RiftErr::Unaligned {
        needed,
        addr: offset,
      }
    ));
  }
  Ok(())
}

impl<'a> Debug for ObjectView<'a> {
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    let mut df = f.debug_struct("ObjectView");
    df.field("header", self.header);
    df.field("body", &HexDump(&self.bytes[ObjectHeader::SIZE.min(self.bytes.len())..]));
    df.finish()
  }
}

impl<'a> PartialEq for ObjectView<'a> {
  fn eq(&self, other: &Self) -> bool {
    self.bytes == other.bytes
  }
}

/// Walks the objects written back to back into one buffer.
///
/// Each object after the first starts at the next 8-byte boundary after its
/// predecessor, which is where [`BufferBuilder::begin_object()`] puts it.
/// Iteration stops after the first invalid object.  A zeroed tail too short
/// to hold a header is padding and ends the walk without an error.
///
/// [`BufferBuilder::begin_object()`]: crate::BufferBuilder::begin_object
pub fn objects(buffer: &[u8]) -> Objects<'_> {
  Objects {
    buffer,
    cursor: 0,
    failed: false,
  }
}

/// Iterator returned by [`objects()`].
#[derive(Clone, Debug)]
pub struct Objects<'a> {
  buffer: &'a [u8],
  cursor: usize,
  failed: bool,
}

impl<'a> Iterator for Objects<'a> {
  type Item = Result<ObjectView<'a>, RiftErr>;

  fn next(&mut self) -> Option<Self::Item> {
    if self.failed || self.cursor >= self.buffer.len() {
      return None;
    }
    let rest = &self.buffer[self.cursor..];
    if rest.len() < ObjectHeader::SIZE && rest.iter().all(|&b| b == 0) {
      self.cursor = self.buffer.len();
      return None;
    }
    match ObjectView::from_bytes(rest) {
      Ok(view) => {
        let end = self.cursor + view.total_size() as usize;
        self.cursor = align_up(end, ObjectHeader::ALIGN);
        Some(Ok(view))
      },
      Err(err) => {
        self.failed = true;
        Some(Err(err))
      },
    }
  }
}
