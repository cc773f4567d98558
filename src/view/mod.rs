//! Validating, zero-copy readers over rift buffers.
//!
//! An [`ObjectView`] is only ever constructed over bytes whose header has been
//! validated, and every read through it is checked against the object's
//! declared `total_size`.  Views borrow the buffer and never copy it; text and
//! sequences are handed out as further views into the same bytes.
mod object;
mod sequence;
mod text;

pub use self::{
  object::{objects, ObjectView, Objects},
  sequence::{ArrayElement, SequenceIter, SequenceView},
  text::TextView,
};
