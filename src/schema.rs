//! The interface between this crate and code generated from schema
//! definitions.
//!
//! A schema compiler emits, for each record type, a layout type describing
//! where the record's fields live ([`ObjectLayout`]) and a typed view with one
//! accessor per field ([`SchemaView`]).  Generated accessors are thin: they
//! forward to [`ObjectView`] with the constants from the layout.
//!
//! ```
//! use rift::{BufferBuilder, ObjectLayout, ObjectView, RiftErr, SchemaView, TextView};
//!
//! struct CityLayout;
//!
//! impl ObjectLayout for CityLayout {
//!   const SCHEMA_ID: u32 = 0x0C17_0001;
//!   const FIXED_SIZE: usize = 32;
//!   const TABLE_OFFSET: usize = 24;
//!   const NUM_ENTRIES: usize = 1;
//! }
//!
//! #[derive(Copy, Clone)]
//! struct CityView<'a>(ObjectView<'a>);
//!
//! impl<'a> SchemaView<'a> for CityView<'a> {
//!   type Layout = CityLayout;
//!
//!   fn from_object(object: ObjectView<'a>) -> Self {
//!     CityView(object)
//!   }
//!
//!   fn object(&self) -> ObjectView<'a> {
//!     self.0
//!   }
//! }
//!
//! impl<'a> CityView<'a> {
//!   fn population(&self) -> Result<u64, RiftErr> {
//!     self.fixed_field(16)
//!   }
//!
//!   fn name(&self) -> Result<Option<TextView<'a>>, RiftErr> {
//!     self.text_field(0)
//!   }
//! }
//!
//! # fn main() -> Result<(), RiftErr> {
//! let mut builder = BufferBuilder::new();
//! let object = CityLayout::begin_object(&mut builder);
//! builder.write_value(9_700_000u64);
//! let name = builder.reserve_offset_entry();
//! builder.add_variable_field(&object, name, "Hong Kong")?;
//! builder.end_object(object)?;
//!
//! let buffer = builder.into_buffer();
//! let city = CityView::new(&buffer)?;
//! assert_eq!(city.population()?, 9_700_000);
//! assert_eq!(city.name()?.unwrap(), "Hong Kong");
//! # Ok(())
//! # }
//! ```
use crate::{
  builder::{BufferBuilder, ObjectStart},
  classify::FixedSize,
  layout::VersionFlags,
  view::{ArrayElement, ObjectView, SequenceView, TextView},
  RiftErr,
};
use core::marker::PhantomData;

/// Where a record type's fields live inside its objects.
///
/// Offsets are relative to the object's start, so the header occupies
/// `0..16` and the first fixed field is at 16 or later.
pub trait ObjectLayout {
  /// The id every object of this type carries.
  const SCHEMA_ID: u32;
  /// The size of the header, fixed fields and offset table together, i.e.,
  /// the offset the first variable-size payload can start at.
  const FIXED_SIZE: usize;
  /// Where the offset table starts.
  const TABLE_OFFSET: usize;
  /// The number of variable-size fields.
  const NUM_ENTRIES: usize;
  /// The version & flags word written into new objects.
  const VERSION_FLAGS: u32 = VersionFlags::CURRENT.bits();

  /// Opens a new object of this type.
  fn begin_object(builder: &mut BufferBuilder) -> ObjectStart {
    builder.begin_object(Self::SCHEMA_ID, Self::VERSION_FLAGS)
  }
}

/// A typed, read-only view of one record type.
pub trait SchemaView<'a>: Sized {
  /// The layout the view reads.
  type Layout: ObjectLayout;

  /// Wraps an object already known to carry [`ObjectLayout::SCHEMA_ID`].
  fn from_object(object: ObjectView<'a>) -> Self;

  /// The underlying untyped view.
  fn object(&self) -> ObjectView<'a>;

  /// Validates `buffer` as an object of this type.
  fn new(buffer: &'a [u8]) -> Result<Self, RiftErr> {
    Self::from_checked(ObjectView::from_bytes(buffer)?)
  }

  /// Validates the object at `ptr` as one of this type.
  ///
  /// # Safety
  ///
  /// As for [`ObjectView::from_ptr()`].
  unsafe fn from_ptr(ptr: *const u8) -> Result<Self, RiftErr> {
    Self::from_checked(ObjectView::from_ptr(ptr)?)
  }

  /// Wraps `object` after checking its schema id.
  fn from_checked(object: ObjectView<'a>) -> Result<Self, RiftErr> {
    let expected = <Self::Layout as ObjectLayout>::SCHEMA_ID;
    if object.schema_id() != expected {
      return Err(err!(
        debug,
        RiftErr::SchemaMismatch {
          expected,
          observed: object.schema_id(),
        }
      ));
    }
    Ok(Self::from_object(object))
  }

  /// Decodes the fixed field at `offset`.
  fn fixed_field<T: FixedSize>(&self, offset: usize) -> Result<T, RiftErr> {
    self.object().read_fixed_field(offset)
  }

  /// Looks up variable-size field `index` as text.
  fn text_field(&self, index: usize) -> Result<Option<TextView<'a>>, RiftErr> {
    self.object().text_field(
      <Self::Layout as ObjectLayout>::TABLE_OFFSET,
      index,
      <Self::Layout as ObjectLayout>::NUM_ENTRIES,
    )
  }

  /// Looks up variable-size field `index` as a sequence.
  fn sequence_field<T>(
    &self,
    index: usize,
  ) -> Result<Option<SequenceView<'a, T>>, RiftErr>
  where
    T: ArrayElement<'a>,
  {
    self.object().sequence_field(
      <Self::Layout as ObjectLayout>::TABLE_OFFSET,
      index,
      <Self::Layout as ObjectLayout>::NUM_ENTRIES,
    )
  }
}

/// Marks a sequence whose elements are whole objects, read through `V`.
///
/// Elements are spaced by the layout's `FIXED_SIZE` rounded up to 8, which is
/// where consecutive [`BufferBuilder::add_objects()`] entries land, so nested
/// records cannot have variable-size fields of their own.
///
/// ```ignore
/// let waypoints: SequenceView<Nested<WaypointView>> = route.sequence_field(0)?;
/// ```
pub struct Nested<V>(PhantomData<fn() -> V>);
