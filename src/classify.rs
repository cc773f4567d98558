//! Compile-time classification of value types.
//!
//! Every type that can appear in a rift object is exactly one of:
//!
//! - **fixed-size** ([`FixedSize`]): encoded by a direct, byte-order corrected
//!   copy of `size_of::<T>()` bytes.  This covers every numeric primitive,
//!   `bool` (always one byte), fixed-length arrays of fixed-size types, and
//!   aggregates declared with [`declare_fixed_size!`](crate::declare_fixed_size).
//! - **variable-size** ([`VariableSize`]): text and dynamic sequences of
//!   fixed-size elements.  These are always appended as a separate payload
//!   and addressed through an [`OffsetEntry`](crate::OffsetEntry).
//!
//! Types implementing neither trait are unclassified, and using them with the
//! builder or views is a compile error.  Classifying a type both ways is a
//! compile error too:
//!
//! ```compile_fail
//! use rift::classify::{check_type_concepts, Classified, TypeClass};
//!
//! struct Ambiguous;
//!
//! impl Classified for Ambiguous {
//!   const FIXED_SIZE: bool = true;
//!   const VARIABLE_SIZE: bool = true;
//! }
//!
//! const CLASS: TypeClass = check_type_concepts::<Ambiguous>();
//! ```
//!
//! The set of variable-size kinds is closed: each one needs a payload encoding
//! that an offset entry can describe, so [`VariableSize`] is sealed.
use crate::{builder::BufferBuilder, Payload, RiftErr};
use alloc::{string::String, vec::Vec};
use core::mem::{align_of, size_of};

/// Which encoding strategy a type uses.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum TypeClass {
  /// Copied directly, with per-field byte order conversion.
  FixedSize,
  /// Appended as a separate payload and addressed through an offset entry.
  VariableSize,
}

/// Declares how a type is classified.
///
/// Prefer implementing [`FixedSize`] (through
/// [`declare_fixed_size!`](crate::declare_fixed_size) for aggregates) over
/// implementing this directly; the flags here are what
/// [`check_type_concepts()`] validates.
pub trait Classified {
  /// The type is encoded by a direct copy.
  const FIXED_SIZE: bool;
  /// The type is encoded as a separate, length-prefixed payload.
  const VARIABLE_SIZE: bool;
}

/// Returns `true` iff `T` is classified as fixed-size.
pub const fn is_fixed_size<T: Classified + ?Sized>() -> bool {
  T::FIXED_SIZE
}

/// Returns `true` iff `T` is classified as variable-size.
pub const fn is_variable_size<T: Classified + ?Sized>() -> bool {
  T::VARIABLE_SIZE
}

/// Checks that `T` has exactly one classification and returns it.
///
/// When evaluated in a const context (which the builder and views always do
/// for the types they're used with), an ambiguous or missing classification
/// fails the build.
pub const fn check_type_concepts<T: Classified + ?Sized>() -> TypeClass {
  assert!(
    !(T::FIXED_SIZE && T::VARIABLE_SIZE),
    "Type cannot be both fixed-size and variable-size."
  );
  if T::FIXED_SIZE {
    TypeClass::FixedSize
  } else if T::VARIABLE_SIZE {
    TypeClass::VariableSize
  } else {
    panic!("Type is neither fixed-size nor variable-size.")
  }
}

/// Checks that `T` is classified fixed-size and occupies at least one byte,
/// and returns its wire size.
///
/// Every builder and view operation on a fixed-size type evaluates this in a
/// const context.  Zero-size types have no position to be read back from:
///
/// ```compile_fail
/// let mut builder = rift::BufferBuilder::new();
/// builder.write_value([0u8; 0]);
/// ```
pub const fn check_fixed_size<T: FixedSize>() -> usize {
  match check_type_concepts::<T>() {
    TypeClass::FixedSize => {},
    TypeClass::VariableSize => panic!("Type is not fixed-size."),
  }
  assert!(T::WIRE_SIZE > 0, "Fixed-size types must occupy at least one byte.");
  T::WIRE_SIZE
}

/// A type whose encoded length is `size_of::<Self>()` regardless of content.
///
/// Values are written in little-endian byte order.  Implementations for
/// aggregates should come from [`declare_fixed_size!`](crate::declare_fixed_size),
/// which verifies the layout at compile time.
pub trait FixedSize: Classified + Copy + Sized + 'static {
  /// The number of bytes a value occupies on the wire.
  const WIRE_SIZE: usize = size_of::<Self>();
  /// The alignment a value is written at inside arrays and read at by views.
  const WIRE_ALIGN: usize = align_of::<Self>();

  /// Writes the value into `target`, which is exactly `WIRE_SIZE` bytes.
  fn write_le(&self, target: &mut [u8]);

  /// Reads a value from `source`, which is exactly `WIRE_SIZE` bytes.
  fn read_le(source: &[u8]) -> Self;

  /// Returns the value with the byte order of every field reversed.
  ///
  /// This is the conversion a host with the opposite byte order would apply;
  /// it is its own inverse.
  fn byte_swapped(self) -> Self;
}

gen_fixed_prim!(u8, u16, u32, u64, u128, i8, i16, i32, i64, i128, f32, f64);

impl Classified for bool {
  const FIXED_SIZE: bool = true;
  const VARIABLE_SIZE: bool = false;
}

/// `bool` is always a single byte: `0` for `false`, anything else for `true`.
impl FixedSize for bool {
  #[inline(always)]
  fn write_le(&self, target: &mut [u8]) {
    target[0] = *self as u8;
  }

  #[inline(always)]
  fn read_le(source: &[u8]) -> Self {
    source[0] != 0
  }

  #[inline(always)]
  fn byte_swapped(self) -> Self {
    self
  }
}

impl<T: FixedSize, const N: usize> Classified for [T; N] {
  const FIXED_SIZE: bool = true;
  const VARIABLE_SIZE: bool = false;
}

impl<T: FixedSize, const N: usize> FixedSize for [T; N] {
  fn write_le(&self, target: &mut [u8]) {
    let size = T::WIRE_SIZE;
    for (i, item) in self.iter().enumerate() {
      item.write_le(&mut target[i * size..(i + 1) * size]);
    }
  }

  fn read_le(source: &[u8]) -> Self {
    let size = T::WIRE_SIZE;
    core::array::from_fn(|i| T::read_le(&source[i * size..(i + 1) * size]))
  }

  fn byte_swapped(self) -> Self {
    self.map(FixedSize::byte_swapped)
  }
}

mod sealed {
  pub trait Sealed {}
}

/// A type whose encoded length depends on its content.
///
/// Variable-size values are appended after an object's fixed region and found
/// through an offset entry holding their position and [`Self::count()`].
pub trait VariableSize: Classified + sealed::Sealed {
  /// The count stored in the offset entry: characters (bytes) for text,
  /// elements for sequences.
  fn count(&self) -> usize;

  /// Appends the payload to `builder`.
  fn append_to(&self, builder: &mut BufferBuilder) -> Result<Payload, RiftErr>;
}

impl Classified for str {
  const FIXED_SIZE: bool = false;
  const VARIABLE_SIZE: bool = true;
}

impl sealed::Sealed for str {}

impl VariableSize for str {
  fn count(&self) -> usize {
    self.len()
  }

  fn append_to(&self, builder: &mut BufferBuilder) -> Result<Payload, RiftErr> {
    builder.add_string(self)
  }
}

impl Classified for String {
  const FIXED_SIZE: bool = false;
  const VARIABLE_SIZE: bool = true;
}

impl sealed::Sealed for String {}

impl VariableSize for String {
  fn count(&self) -> usize {
    self.len()
  }

  fn append_to(&self, builder: &mut BufferBuilder) -> Result<Payload, RiftErr> {
    builder.add_string(self)
  }
}

impl<T: FixedSize> Classified for [T] {
  const FIXED_SIZE: bool = false;
  const VARIABLE_SIZE: bool = true;
}

impl<T: FixedSize> sealed::Sealed for [T] {}

impl<T: FixedSize> VariableSize for [T] {
  fn count(&self) -> usize {
    self.len()
  }

  fn append_to(&self, builder: &mut BufferBuilder) -> Result<Payload, RiftErr> {
    builder.add_array(self)
  }
}

impl<T: FixedSize> Classified for Vec<T> {
  const FIXED_SIZE: bool = false;
  const VARIABLE_SIZE: bool = true;
}

impl<T: FixedSize> sealed::Sealed for Vec<T> {}

impl<T: FixedSize> VariableSize for Vec<T> {
  fn count(&self) -> usize {
    self.len()
  }

  fn append_to(&self, builder: &mut BufferBuilder) -> Result<Payload, RiftErr> {
    builder.add_array(self)
  }
}
