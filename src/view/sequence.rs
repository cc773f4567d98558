use crate::{
  classify::{check_fixed_size, FixedSize},
  layout::ObjectHeader,
  schema::{Nested, ObjectLayout, SchemaView},
  zerocopy::align_up,
  RiftErr,
};
use alloc::vec::Vec;
use core::{
  fmt::{Debug, Formatter},
  iter::FusedIterator,
  marker::PhantomData,
};

/// An element type a [`SequenceView`] can hold.
///
/// Fixed-size types decode to a value.  Schema views, wrapped in [`Nested`],
/// are constructed over each element's bytes instead.  Which of the two
/// happens is decided by the element type, at compile time.
///
/// Element types are classified before any bytes are read.  A type claiming
/// both classifications is rejected when the view is instantiated:
///
/// ```compile_fail
/// use rift::{
///   classify::{Classified, FixedSize},
///   ObjectView, OffsetEntry,
/// };
///
/// #[derive(Copy, Clone)]
/// struct Both(u32);
///
/// impl Classified for Both {
///   const FIXED_SIZE: bool = true;
///   const VARIABLE_SIZE: bool = true;
/// }
///
/// impl FixedSize for Both {
///   fn write_le(&self, target: &mut [u8]) {
///     self.0.write_le(target)
///   }
///
///   fn read_le(source: &[u8]) -> Self {
///     Both(u32::read_le(source))
///   }
///
///   fn byte_swapped(self) -> Self {
///     Both(self.0.byte_swapped())
///   }
/// }
///
/// let entry = OffsetEntry::new(16, 1);
/// let seq = ObjectView::from_bytes(&[])
///   .and_then(|view| view.sequence::<Both>(&entry).map(|seq| seq.is_some()));
/// assert!(seq.is_err());
/// ```
pub trait ArrayElement<'a> {
  /// What [`SequenceView::at()`] hands out.
  type Item;
  /// The distance in bytes between consecutive elements.
  const STRIDE: usize;
  /// The alignment of the first element, relative to the object's start.
  const ALIGN: usize;

  /// Produces an element from exactly `STRIDE` bytes.
  fn element(bytes: &'a [u8]) -> Result<Self::Item, RiftErr>;
}

impl<'a, T: FixedSize> ArrayElement<'a> for T {
  type Item = T;
  const STRIDE: usize = check_fixed_size::<T>();
  const ALIGN: usize = T::WIRE_ALIGN;

  #[inline(always)]
  fn element(bytes: &'a [u8]) -> Result<T, RiftErr> {
    Ok(T::read_le(bytes))
  }
}

impl<'a, V: SchemaView<'a>> ArrayElement<'a> for Nested<V> {
  type Item = V;
  const STRIDE: usize =
    align_up(<V::Layout as ObjectLayout>::FIXED_SIZE, ObjectHeader::ALIGN);
  const ALIGN: usize = ObjectHeader::ALIGN;

  fn element(bytes: &'a [u8]) -> Result<V, RiftErr> {
    V::new(bytes)
  }
}

/// A zero-copy view of an array payload.
pub struct SequenceView<'a, T: ArrayElement<'a>> {
  bytes:   &'a [u8],
  len:     usize,
  _marker: PhantomData<fn() -> T>,
}

impl<'a, T: ArrayElement<'a>> Clone for SequenceView<'a, T> {
  fn clone(&self) -> Self {
    *self
  }
}

impl<'a, T: ArrayElement<'a>> Copy for SequenceView<'a, T> {}

impl<'a, T: ArrayElement<'a>> SequenceView<'a, T> {
  /// `bytes` must be exactly `len * T::STRIDE` long.
  pub(crate) fn new(bytes: &'a [u8], len: usize) -> Self {
    debug_assert_eq!(Some(bytes.len()), len.checked_mul(T::STRIDE));
    Self {
      bytes,
      len,
      _marker: PhantomData,
    }
  }

  /// The number of elements.
  pub fn len(&self) -> usize {
    self.len
  }

  /// The number of elements, as stored in the offset entry.
  pub fn size(&self) -> usize {
    self.len
  }

  #[allow(missing_docs)]
  pub fn is_empty(&self) -> bool {
    self.len == 0
  }

  /// The payload's bytes.
  pub fn as_bytes(&self) -> &'a [u8] {
    self.bytes
  }

  /// Returns element `index`.
  pub fn at(&self, index: usize) -> Result<T::Item, RiftErr> {
    if index >= self.len {
      return Err(err!(
        debug,
        RiftErr::IndexOutOfBounds {
          index,
          count: self.len,
        }
      ));
    }
    let start = index * T::STRIDE;
    T::element(&self.bytes[start..start + T::STRIDE])
  }

  /// Iterates over the elements in order.
  pub fn iter(&self) -> SequenceIter<'a, T> {
    SequenceIter {
      view: *self,
      next: 0,
    }
  }

  /// Collects every element, stopping at the first that fails.
  pub fn to_vec(&self) -> Result<Vec<T::Item>, RiftErr> {
    self.iter().collect()
  }
}

impl<'a, T> Debug for SequenceView<'a, T>
where
  T: ArrayElement<'a>,
  T::Item: Debug,
{
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    f.debug_list().entries(self.iter()).finish()
  }
}

impl<'a, T: ArrayElement<'a>> IntoIterator for SequenceView<'a, T> {
  type IntoIter = SequenceIter<'a, T>;
  type Item = Result<T::Item, RiftErr>;

  fn into_iter(self) -> Self::IntoIter {
    self.iter()
  }
}

/// Iterator over the elements of a [`SequenceView`].
pub struct SequenceIter<'a, T: ArrayElement<'a>> {
  view: SequenceView<'a, T>,
  next: usize,
}

impl<'a, T: ArrayElement<'a>> Iterator for SequenceIter<'a, T> {
  type Item = Result<T::Item, RiftErr>;

  fn next(&mut self) -> Option<Self::Item> {
    if self.next >= self.view.len {
      return None;
    }
    let item = self.view.at(self.next);
    self.next += 1;
    Some(item)
  }

  fn size_hint(&self) -> (usize, Option<usize>) {
    let remaining = self.view.len - self.next;
    (remaining, Some(remaining))
  }
}

impl<'a, T: ArrayElement<'a>> ExactSizeIterator for SequenceIter<'a, T> {}

impl<'a, T: ArrayElement<'a>> FusedIterator for SequenceIter<'a, T> {}

#[cfg(test)]
mod test {
  use super::*;
  use crate::{util::init_test_logger, AlignedBuf, BufferBuilder, ObjectView};
  use rand::{Rng, SeedableRng};
  use std::{format, vec};

  fn floats(values: &[f32]) -> Result<AlignedBuf, RiftErr> {
    let mut builder = BufferBuilder::new();
    let object = builder.begin_object(5, 0);
    builder.write_value(1u8);
    let slot = builder.reserve_offset_entry();
    builder.add_variable_field(&object, slot, values)?;
    builder.end_object(object)?;
    Ok(builder.into_buffer())
  }

  #[test]
  fn fixed_elements() -> Result<(), RiftErr> {
    init_test_logger();
    let buffer = floats(&[1.0, 2.5, -4.0])?;
    let view = ObjectView::from_bytes(&buffer)?;
    let Some(seq) = view.sequence_field::<f32>(20, 0, 1)? else {
      panic!("sequence should be present");
    };
    assert_eq!(seq.len(), 3);
    assert_eq!(seq.size(), 3);
    assert_eq!(seq.at(1)?, 2.5);
    assert_eq!(seq.to_vec()?, vec![1.0, 2.5, -4.0]);
    assert_eq!(seq.iter().len(), 3);
    assert_eq!(format!("{:?}", seq), "[Ok(1.0), Ok(2.5), Ok(-4.0)]");

    let err = seq.at(3).unwrap_err();
    assert_eq!(err, RiftErr::IndexOutOfBounds { index: 3, count: 3 });
    Ok(())
  }

  #[test]
  fn empty_sequences_are_absent() -> Result<(), RiftErr> {
    let buffer = floats(&[])?;
    let view = ObjectView::from_bytes(&buffer)?;
    assert!(view.sequence_field::<f32>(20, 0, 1)?.is_none());
    assert_eq!(view.total_size(), 28);
    Ok(())
  }

  #[test]
  fn random_arrays() -> Result<(), RiftErr> {
    let mut rng = rand::rngs::StdRng::seed_from_u64(7);
    for _ in 0..32 {
      let len = rng.gen_range(1..64);
      let values = (0..len).map(|_| rng.gen::<u64>()).collect::<Vec<_>>();
      let mut builder = BufferBuilder::new();
      let object = builder.begin_object(9, 0);
      let slot = builder.reserve_offset_entry();
      builder.write_value(rng.gen::<u8>());
      builder.add_variable_field(&object, slot, &values)?;
      builder.end_object(object)?;

      let buffer = builder.into_buffer();
      let view = ObjectView::from_bytes(&buffer)?;
      let entry = view.offset_entry(16, 0, 1)?;
      assert_eq!(entry.offset() % 8, 0);
      let seq = view.sequence::<u64>(entry)?.map(|s| s.to_vec());
      assert_eq!(seq.transpose()?, Some(values));
    }
    Ok(())
  }
}
