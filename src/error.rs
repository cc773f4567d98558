use core::{
  fmt::{Debug, Display, Formatter},
  num::TryFromIntError,
  str::Utf8Error,
};

/// Errors produced while building or reading rift buffers.
///
/// Every variant belongs to one [`ErrKind`], which is what most callers will
/// want to match on.  The variants themselves carry enough detail to locate
/// the offending bytes when debugging a corrupt buffer.
#[allow(missing_docs)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum RiftErr {
  /// An empty buffer (or a null pointer) was supplied where an object was
  /// expected.
  NullBuffer,

  /// The buffer ended before a complete object header could be read.
  BufferTooShort {
    needed:    usize,
    available: usize,
  },

  /// The header's magic number was not [`crate::MAGIC`].
  BadMagic(u32),

  /// The header declared a `total_size` smaller than the header itself.
  TotalSizeTooSmall(u32),

  /// The header declared a `total_size` larger than the supplied buffer.
  TotalSizeOverflow {
    declared:  usize,
    available: usize,
  },

  /// The object's schema id did not match the one the view was written for.
  SchemaMismatch {
    expected: u32,
    observed: u32,
  },

  /// A computed byte range ended past the object's `total_size`.
  OutOfBounds {
    end:   usize,
    limit: usize,
  },

  /// An element or offset table index was not less than the declared count.
  IndexOutOfBounds {
    index: usize,
    count: usize,
  },

  /// An offset table was placed inside the object header.
  TableOverlapsHeader(usize),

  /// An offset or length calculation overflowed `usize`.
  ArithmeticOverflow,

  /// A typed read was attempted at an address that doesn't satisfy the
  /// type's natural alignment.
  Unaligned {
    needed: usize,
    addr:   usize,
  },

  /// An object grew past the 4 GiB representable in its header.
  ObjectTooLarge(usize),

  /// A text or array payload has more items than an offset entry can count.
  PayloadTooLarge(usize),

  /// Text payload bytes were not valid UTF-8.
  InvalidUtf8 {
    valid_up_to: usize,
  },

  /// An alignment that isn't a (non-zero) power of two was requested.
  InvalidAlignment(usize),

  /// A builder handle referred to bytes that no longer exist, either because
  /// the builder was reset or the handle came from a different buffer.
  StaleHandle {
    position: usize,
    len:      usize,
  },
}

/// The broad category of a [`RiftErr`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ErrKind {
  /// The buffer isn't a rift object at all: bad magic, truncated header,
  /// wrong schema, and so on.  Views are never constructed over such data.
  InvalidBuffer,
  /// A field, element, or table entry reached past the object's extent.
  BoundsViolation,
  /// A typed read landed on an address the type can't be read from.
  AlignmentViolation,
  /// An object or payload didn't fit the format's 32-bit size fields.
  Capacity,
  /// Payload bytes were well-formed but not valid for the requested type.
  Encoding,
  /// The builder was driven incorrectly (programmer error).
  Usage,
}

impl RiftErr {
  /// Returns the category of this error.
  pub const fn kind(&self) -> ErrKind {
    match self {
      RiftErr::NullBuffer
      | RiftErr::BufferTooShort { .. }
      | RiftErr::BadMagic(_)
      | RiftErr::TotalSizeTooSmall(_)
      | RiftErr::TotalSizeOverflow { .. }
      | RiftErr::SchemaMismatch { .. } => ErrKind::InvalidBuffer,
      RiftErr::OutOfBounds { .. }
      | RiftErr::IndexOutOfBounds { .. }
      | RiftErr::TableOverlapsHeader(_)
      | RiftErr::ArithmeticOverflow => ErrKind::BoundsViolation,
      RiftErr::Unaligned { .. } => ErrKind::AlignmentViolation,
      RiftErr::ObjectTooLarge(_) | RiftErr::PayloadTooLarge(_) => {
        ErrKind::Capacity
      },
      RiftErr::InvalidUtf8 { .. } => ErrKind::Encoding,
      RiftErr::InvalidAlignment(_) | RiftErr::StaleHandle { .. } => {
        ErrKind::Usage
      },
    }
  }

  /// Shorthand for `self.kind() == ErrKind::InvalidBuffer`.
  pub fn is_invalid_buffer(&self) -> bool {
    self.kind() == ErrKind::InvalidBuffer
  }

  /// Shorthand for `self.kind() == ErrKind::BoundsViolation`.
  pub fn is_bounds_violation(&self) -> bool {
    self.kind() == ErrKind::BoundsViolation
  }

  /// Shorthand for `self.kind() == ErrKind::AlignmentViolation`.
  pub fn is_alignment_violation(&self) -> bool {
    self.kind() == ErrKind::AlignmentViolation
  }
}

impl Display for RiftErr {
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    Debug::fmt(self, f)
  }
}

#[cfg(feature = "std")]
impl std::error::Error for RiftErr {}

impl From<Utf8Error> for RiftErr {
  fn from(src: Utf8Error) -> Self {
    RiftErr::InvalidUtf8 {
      valid_up_to: src.valid_up_to(),
    }
  }
}

impl From<TryFromIntError> for RiftErr {
  fn from(_value: TryFromIntError) -> Self {
    RiftErr::ArithmeticOverflow
  }
}
