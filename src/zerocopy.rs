//! Types and helpers for referencing data directly inside byte buffers.
//!
//! # Zero Copy Types
//!
//! [`U32`] is a `u32` that is always stored little-endian and has an alignment
//! of 1, which is what the header and offset table fields are made of.  On
//! little-endian hosts the conversion is a no-op.
//!
//! The main type of interest is [`ZeroCopy`], an `unsafe` trait marking a
//! type as safe to reference in place inside a byte buffer: it must accept
//! any bit pattern, have no padding, and be identical on every platform.
//! Unlike the fixed-size types of [`crate::classify`], which are decoded by
//! value, `ZeroCopy` types are handed out as references into the buffer, so
//! the buffer address must also satisfy the type's alignment.  Every
//! reference is bounds and alignment checked.
use crate::RiftErr;
use core::{
  mem::{align_of, size_of},
  slice::from_raw_parts,
};

/// Bounds check that returns [`RiftErr::OutOfBounds`] on failure.
#[inline(always)]
pub(crate) fn bounds_check<T>(buffer: &T, to: usize) -> Result<(), RiftErr>
where
  T: AsRef<[u8]> + ?Sized,
{
  if to > buffer.as_ref().len() {
    let err = RiftErr::OutOfBounds {
      end:   to,
      limit: buffer.as_ref().len(),
    };
    Err(err!(trace, err))
  } else {
    Ok(())
  }
}

/// Alignment check that returns [`RiftErr::Unaligned`] on failure.
///
/// `alignment` must be a power of two.
#[inline(always)]
pub(crate) fn align_check(addr: *const u8, alignment: usize) -> Result<(), RiftErr> {
  let addr = addr as usize;
  if addr & (alignment - 1) != 0 {
    Err(err!(
      debug,
      RiftErr::Unaligned {
        needed: alignment,
        addr,
      }
    ))
  } else {
    Ok(())
  }
}

/// Rounds `n` up to the next multiple of `alignment`, which must be a power
/// of two.
#[inline(always)]
pub(crate) const fn align_up(n: usize, alignment: usize) -> usize {
  (n + alignment - 1) & !(alignment - 1)
}

/// Marks a type that may be referenced directly inside a byte buffer.
///
/// # Safety
///
/// Implementors must be `#[repr(C)]` or `#[repr(transparent)]`, contain no
/// padding, and accept every bit pattern.
pub unsafe trait ZeroCopy: Copy + Send + Sync {
  /// Returns a zero-copy reference to an object at `source[cursor]`,
  /// advancing the cursor past it.
  #[inline(always)]
  fn bbrf<'a, T>(source: &'a T, cursor: &mut usize) -> Result<&'a Self, RiftErr>
  where
    T: AsRef<[u8]> + ?Sized,
  {
    let end = cursor
      .checked_add(size_of::<Self>())
      .ok_or(RiftErr::ArithmeticOverflow)?;
    bounds_check(source, end)?;
    let ptr = source.as_ref()[*cursor..].as_ptr();
    align_check(ptr, align_of::<Self>())?;
    unsafe { Ok(Self::bbrf_u(source, cursor)) }
  }

  /// An unsafe version of [`ZeroCopy::bbrf()`] without the bounds and
  /// alignment checks.
  #[inline(always)]
  unsafe fn bbrf_u<'a, T>(source: &'a T, cursor: &mut usize) -> &'a Self
  where
    T: AsRef<[u8]> + ?Sized,
  {
    let ptr = source.as_ref().as_ptr().add(*cursor) as *const Self;
    *cursor += size_of::<Self>();
    &*ptr
  }

  /// Returns a zero-copy reference to a slice of `len` objects starting at
  /// `source[cursor]`.
  fn bbrfs<'a, T>(
    source: &'a T,
    cursor: &mut usize,
    len: usize,
  ) -> Result<&'a [Self], RiftErr>
  where
    T: AsRef<[u8]> + ?Sized,
  {
    let end = size_of::<Self>()
      .checked_mul(len)
      .and_then(|bytes| cursor.checked_add(bytes))
      .ok_or(RiftErr::ArithmeticOverflow)?;
    bounds_check(source, end)?;
    let ptr = source.as_ref()[*cursor..].as_ptr();
    align_check(ptr, align_of::<Self>())?;
    unsafe {
      *cursor = end;
      Ok(from_raw_parts(ptr as *const Self, len))
    }
  }

  /// Views the object as its raw bytes.
  #[inline(always)]
  fn as_bytes(&self) -> &[u8] {
    // SAFETY: `ZeroCopy` types have no padding, so every byte is initialized.
    unsafe { from_raw_parts(self as *const Self as *const u8, size_of::<Self>()) }
  }
}

gen_le_prim!(u32, U32);

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn le_prims_are_little_endian() {
    let value = U32::new(0x0102_0304);
    assert_eq!(value.bytes(), &[4, 3, 2, 1]);
    assert_eq!(value.get(), 0x0102_0304);
    assert_eq!(value, 0x0102_0304u32);
    assert_eq!(align_of::<U32>(), 1);
    assert_eq!(u32::from(U32::from(u32::MAX - 1)), u32::MAX - 1);
  }

  #[test]
  fn reference_in_place() -> Result<(), RiftErr> {
    let bytes = [1u8, 0, 0, 0, 2, 0, 0, 0, 3, 0, 0, 0];
    let cursor = &mut 0;
    let first = U32::bbrf(&bytes[..], cursor)?;
    assert_eq!(first.get(), 1);
    assert_eq!(*cursor, 4);
    let rest = U32::bbrfs(&bytes[..], cursor, 2)?;
    assert_eq!(rest, &[U32::new(2), U32::new(3)]);
    assert_eq!(*cursor, 12);

    let err = U32::bbrf(&bytes[..], cursor).unwrap_err();
    assert_eq!(err, RiftErr::OutOfBounds { end: 16, limit: 12 });
    Ok(())
  }

  #[test]
  fn alignment_helpers() {
    assert_eq!(align_up(0, 8), 0);
    assert_eq!(align_up(1, 8), 8);
    assert_eq!(align_up(17, 4), 20);
    assert!(align_check(8 as *const u8, 8).is_ok());
    assert_eq!(
      align_check(12 as *const u8, 8),
      Err(RiftErr::Unaligned { needed: 8, addr: 12 })
    );
  }
}
