//! A zero-copy binary object format.
//!
//! Objects are written with a [`BufferBuilder`] into a single, 8-byte aligned
//! byte buffer and read back in place through an [`ObjectView`], without a
//! parsing pass.  Every object starts with a 16-byte [`ObjectHeader`],
//! followed by fixed-size fields at schema-determined offsets, an optional
//! table of [`OffsetEntry`]s, and the variable-size payloads (text and
//! arrays) those entries point to.
//!
//! ```
//! use rift::{BufferBuilder, ObjectView, RiftErr, VersionFlags};
//!
//! # fn main() -> Result<(), RiftErr> {
//! let mut builder = BufferBuilder::new();
//! let object = builder.begin_object(0xC0FFEE, VersionFlags::CURRENT.bits());
//! builder.write_value(42u32);
//! builder.write_value(7u32);
//! let slot = builder.reserve_offset_entry();
//! let name = builder.add_string("Major-General")?;
//! builder.link_entry(&object, slot, name)?;
//! builder.end_object(object)?;
//!
//! let buffer = builder.into_buffer();
//! let view = ObjectView::from_bytes(&buffer)?;
//! assert_eq!(view.schema_id(), 0xC0FFEE);
//! assert_eq!(view.read_fixed_field::<u32>(16)?, 42);
//! let name = view.text_field(24, 0, 1)?.unwrap();
//! assert_eq!(name.as_str()?, "Major-General");
//! # Ok(())
//! # }
//! ```
#![no_std]

#[cfg(any(test, feature = "std"))]
extern crate std;

extern crate alloc;

/// Internal Macros
#[macro_use]
mod macros;

pub mod builder;
pub mod classify;
mod error;
pub mod layout;
pub mod schema;
pub mod view;
pub mod zerocopy;

mod util;

pub use self::{
  builder::{AlignedBuf, BufferBuilder, EntrySlot, ObjectStart, Payload},
  classify::{FixedSize, TypeClass, VariableSize},
  error::{ErrKind, RiftErr},
  layout::{schema_id, ObjectHeader, OffsetEntry, VersionFlags, MAGIC},
  schema::{Nested, ObjectLayout, SchemaView},
  view::{objects, ArrayElement, ObjectView, SequenceView, TextView},
};
