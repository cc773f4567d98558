//! The two wire structures every rift buffer is made of.
//!
//! ```text
//! ObjectHeader (16 bytes, 8-byte aligned):
//!   offset 0  magic          u32   MAGIC
//!   offset 4  schema_id      u32   hash of the record schema
//!   offset 8  total_size     u32   bytes in this object incl. header
//!   offset 12 version_flags  u32   packed version + feature flags
//!
//! OffsetEntry (8 bytes, 4-byte aligned):
//!   offset 0  offset  u32   byte offset from object start to payload (0 = absent)
//!   offset 4  size    u32   element/char/byte count of payload
//! ```
//!
//! All fields are little-endian on every platform.  An object is a header,
//! then its fixed fields at schema-determined offsets, then its offset table
//! (if the schema has variable-size fields), then the variable-size payloads.
use crate::{util::debug::ShortHexDump, zerocopy::{ZeroCopy, U32}, RiftErr};
use core::{
  fmt::{Debug, Formatter},
  hash::Hasher,
  mem::{align_of, size_of},
};
use siphasher::sip::SipHasher13;

/// Identifies rift objects: the bytes `RFS1` when read little-endian.
pub const MAGIC: u32 = 0x3153_4652;

/// The common header for every object.
#[repr(C, align(8))]
#[derive(Clone, Copy, Eq, PartialEq, Hash)]
pub struct ObjectHeader {
  magic:         U32,
  schema_id:     U32,
  total_size:    U32,
  version_flags: U32,
}

const _: () = assert!(size_of::<ObjectHeader>() == 16);
const _: () = assert!(align_of::<ObjectHeader>() == 8);

// SAFETY: Four `U32`s, which are byte arrays, with no padding.
unsafe impl ZeroCopy for ObjectHeader {}

impl ObjectHeader {
  /// The size of a header, in bytes.
  pub const SIZE: usize = size_of::<ObjectHeader>();
  /// The alignment every object (and so every header) starts at.
  pub const ALIGN: usize = align_of::<ObjectHeader>();

  /// Creates a new header.
  pub const fn new(schema_id: u32, total_size: u32, version_flags: u32) -> Self {
    Self {
      magic:         U32::new(MAGIC),
      schema_id:     U32::new(schema_id),
      total_size:    U32::new(total_size),
      version_flags: U32::new(version_flags),
    }
  }

  /// The magic number as stored, which is [`MAGIC`] for valid headers.
  #[inline(always)]
  pub const fn magic(&self) -> u32 {
    self.magic.get()
  }

  /// Identifies the object's schema.
  #[inline(always)]
  pub const fn schema_id(&self) -> u32 {
    self.schema_id.get()
  }

  /// The number of bytes in the object, including this header.
  #[inline(always)]
  pub const fn total_size(&self) -> u32 {
    self.total_size.get()
  }

  /// The raw version & feature flags word.
  #[inline(always)]
  pub const fn version_flags(&self) -> u32 {
    self.version_flags.get()
  }

  /// Confirms the magic number and that `total_size` can hold the header.
  pub fn validate(&self) -> Result<(), RiftErr> {
    if self.magic() != MAGIC {
      return Err(err!(debug, RiftErr::BadMagic(self.magic())));
    }
    if (self.total_size() as usize) < Self::SIZE {
      return Err(err!(debug, RiftErr::TotalSizeTooSmall(self.total_size())));
    }
    Ok(())
  }
}

impl Debug for ObjectHeader {
  fn fmt(&self, f: &mut Formatter) -> core::fmt::Result {
    let mut builder = f.debug_struct("ObjectHeader");
    builder.field("magic", &ShortHexDump(self.magic.bytes(), 0));
    builder.field("schema_id", &format_args!("0x{:08X}", self.schema_id()));
    builder.field("total_size", &self.total_size());
    builder.field("version", &VersionFlags::from(self.version_flags()));
    builder.finish()
  }
}

/// Locates one variable-size field inside its object.
#[repr(C, align(4))]
#[derive(Clone, Copy, Default, Eq, PartialEq, Hash)]
pub struct OffsetEntry {
  offset: U32,
  size:   U32,
}

const _: () = assert!(size_of::<OffsetEntry>() == 8);
const _: () = assert!(align_of::<OffsetEntry>() == 4);

// SAFETY: Two `U32`s, which are byte arrays, with no padding.
unsafe impl ZeroCopy for OffsetEntry {}

impl OffsetEntry {
  /// The size of an entry, in bytes.
  pub const SIZE: usize = size_of::<OffsetEntry>();
  /// The alignment of every entry (and so of every offset table).
  pub const ALIGN: usize = align_of::<OffsetEntry>();
  /// The all-zero entry of an absent field.
  pub const ABSENT: OffsetEntry = OffsetEntry::new(0, 0);

  /// Creates a new entry.
  pub const fn new(offset: u32, size: u32) -> Self {
    Self {
      offset: U32::new(offset),
      size:   U32::new(size),
    }
  }

  /// Byte offset from the owning object's start to the payload.
  #[inline(always)]
  pub const fn offset(&self) -> u32 {
    self.offset.get()
  }

  /// Characters for text, elements for arrays.
  #[inline(always)]
  pub const fn size(&self) -> u32 {
    self.size.get()
  }

  /// Returns `true` if the field is absent, which is the case whenever the
  /// offset is zero, whatever the size says.
  #[inline(always)]
  pub const fn is_absent(&self) -> bool {
    self.offset() == 0
  }
}

impl Debug for OffsetEntry {
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    if self.is_absent() {
      write!(f, "OffsetEntry(absent)")
    } else {
      write!(f, "OffsetEntry(0x{:x}, {})", self.offset(), self.size())
    }
  }
}

/// The packed `version_flags` header word.
///
/// Bits 0-7 hold the minor version, bits 8-15 the major version, and bits
/// 16-31 are feature flags.
#[derive(Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct VersionFlags(u32);

impl VersionFlags {
  /// Version 1.0 with no flags set.
  pub const CURRENT: VersionFlags = VersionFlags::new(1, 0, 0);

  /// Packs a version and flags.
  pub const fn new(major: u8, minor: u8, flags: u16) -> Self {
    Self((minor as u32) | ((major as u32) << 8) | ((flags as u32) << 16))
  }

  /// The packed word, as stored in the header.
  pub const fn bits(self) -> u32 {
    self.0
  }

  #[allow(missing_docs)]
  pub const fn major(self) -> u8 {
    (self.0 >> 8) as u8
  }

  #[allow(missing_docs)]
  pub const fn minor(self) -> u8 {
    self.0 as u8
  }

  /// The feature flag bits.
  pub const fn flags(self) -> u16 {
    (self.0 >> 16) as u16
  }

  /// Returns `true` iff every bit of `flags` is set.
  pub const fn has_flags(self, flags: u16) -> bool {
    self.flags() & flags == flags
  }
}

impl From<u32> for VersionFlags {
  fn from(bits: u32) -> Self {
    Self(bits)
  }
}

impl From<VersionFlags> for u32 {
  fn from(value: VersionFlags) -> Self {
    value.0
  }
}

impl Debug for VersionFlags {
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    write!(f, "v{}.{} flags=0x{:04X}", self.major(), self.minor(), self.flags())
  }
}

/// Derives a schema id from a schema's canonical name or definition text.
///
/// This is SipHash-1-3 with zero keys, folded to 32 bits, so the same text
/// always produces the same id on every platform.
pub fn schema_id(definition: &str) -> u32 {
  let mut hasher = SipHasher13::new_with_keys(0, 0);
  hasher.write(definition.as_bytes());
  let hash = hasher.finish();
  (hash ^ (hash >> 32)) as u32
}

#[cfg(test)]
mod test {
  use super::*;
  use std::format;

  #[test]
  fn header_layout() {
    let header = ObjectHeader::new(0xAABB_CCDD, 48, 0x0001_0100);
    let bytes = header.as_bytes();
    assert_eq!(bytes.len(), 16);
    assert_eq!(&bytes[0..4], b"RFS1");
    assert_eq!(&bytes[4..8], &[0xDD, 0xCC, 0xBB, 0xAA]);
    assert_eq!(&bytes[8..12], &48u32.to_le_bytes());
    assert_eq!(&bytes[12..16], &0x0001_0100u32.to_le_bytes());
    assert!(header.validate().is_ok());
  }

  #[repr(align(8))]
  struct Aligned([u8; 16]);

  #[test]
  fn header_validation() -> Result<(), RiftErr> {
    let small = ObjectHeader::new(1, 15, 0);
    assert_eq!(small.validate(), Err(RiftErr::TotalSizeTooSmall(15)));

    let mut aligned = Aligned([0u8; 16]);
    aligned.0.copy_from_slice(ObjectHeader::new(1, 16, 0).as_bytes());
    aligned.0[0] = b'X';
    let header = ObjectHeader::bbrf(&aligned.0[..], &mut 0)?;
    assert!(matches!(header.validate(), Err(RiftErr::BadMagic(_))));

    // One byte in, the same bytes can't be referenced as a header at all.
    let err = ObjectHeader::bbrf(&aligned.0[1..], &mut 0).unwrap_err();
    assert!(err.is_bounds_violation() || err.is_alignment_violation());
    Ok(())
  }

  #[test]
  fn entry_layout() {
    let entry = OffsetEntry::new(40, 3);
    assert_eq!(entry.as_bytes(), &[40, 0, 0, 0, 3, 0, 0, 0]);
    assert!(!entry.is_absent());
    assert!(OffsetEntry::ABSENT.is_absent());
    assert!(OffsetEntry::new(0, 99).is_absent());
    assert_eq!(format!("{:?}", OffsetEntry::new(0, 5)), "OffsetEntry(absent)");
  }

  #[test]
  fn version_flags() {
    let vf = VersionFlags::new(2, 7, 0b101);
    assert_eq!(vf.major(), 2);
    assert_eq!(vf.minor(), 7);
    assert_eq!(vf.flags(), 0b101);
    assert!(vf.has_flags(0b100));
    assert!(!vf.has_flags(0b010));
    assert_eq!(VersionFlags::from(vf.bits()), vf);
    assert_eq!(VersionFlags::CURRENT.bits(), 0x0000_0100);
  }

  #[test]
  fn schema_ids_are_stable() {
    let a = schema_id("PlayerState { health: f32, name: string }");
    let b = schema_id("PlayerState { health: f32, name: string }");
    let c = schema_id("PlayerState { health: f64, name: string }");
    assert_eq!(a, b);
    assert_ne!(a, c);
  }
}
