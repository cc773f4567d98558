use crate::{util::LogErr, RiftErr};
use alloc::string::{String, ToString};
use core::fmt::{Debug, Display, Formatter, Write};
use log::Level;

/// A zero-copy view of a text payload.
///
/// The payload is the text's bytes followed by a single terminator byte,
/// which is excluded from [`len()`](Self::len).  UTF-8 validity is only
/// checked when the text is requested as a `str`.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct TextView<'a> {
  /// Includes the terminator.
  bytes: &'a [u8],
}

impl<'a> TextView<'a> {
  /// `bytes` must hold at least the terminator.
  pub(crate) fn new(bytes: &'a [u8]) -> Self {
    debug_assert!(!bytes.is_empty());
    Self { bytes }
  }

  /// The number of bytes of text, excluding the terminator.
  pub fn len(&self) -> usize {
    self.bytes.len() - 1
  }

  #[allow(missing_docs)]
  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// The text's bytes, excluding the terminator.
  pub fn as_bytes(&self) -> &'a [u8] {
    &self.bytes[..self.len()]
  }

  /// The text's bytes, including the terminator.
  pub fn as_bytes_with_nul(&self) -> &'a [u8] {
    self.bytes
  }

  /// Points at the text's first byte inside the buffer.
  pub fn as_ptr(&self) -> *const u8 {
    self.bytes.as_ptr()
  }

  /// The text as a `str`, failing if it isn't valid UTF-8.
  pub fn as_str(&self) -> Result<&'a str, RiftErr> {
    core::str::from_utf8(self.as_bytes())
      .map_err(RiftErr::from)
      .log_err(Level::Debug)
  }

  /// Copies the text into an owned `String`.
  pub fn to_owned_string(&self) -> Result<String, RiftErr> {
    self.as_str().map(ToString::to_string)
  }
}

impl<'a> Display for TextView<'a> {
  /// Invalid UTF-8 sequences are shown as `U+FFFD`.
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    for chunk in self.as_bytes().utf8_chunks() {
      f.write_str(chunk.valid())?;
      if !chunk.invalid().is_empty() {
        f.write_char(char::REPLACEMENT_CHARACTER)?;
      }
    }
    Ok(())
  }
}

impl<'a> Debug for TextView<'a> {
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    match core::str::from_utf8(self.as_bytes()) {
      Ok(text) => Debug::fmt(text, f),
      Err(_) => Debug::fmt(self.as_bytes(), f),
    }
  }
}

impl<'a> PartialEq<str> for TextView<'a> {
  fn eq(&self, other: &str) -> bool {
    self.as_bytes() == other.as_bytes()
  }
}

impl<'a, 'b> PartialEq<&'b str> for TextView<'a> {
  fn eq(&self, other: &&'b str) -> bool {
    self.as_bytes() == other.as_bytes()
  }
}
