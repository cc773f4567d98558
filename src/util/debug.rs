use core::fmt::{Debug, Formatter, Write};

/// Formats a byte buffer as rows of 32 bytes, keyed by row offset.
pub(crate) struct HexDump<'a>(pub &'a [u8]);

impl<'a> Debug for HexDump<'a> {
  fn fmt(&self, f: &mut Formatter) -> core::fmt::Result {
    use alloc::{format, string::String};

    let mut b = f.debug_struct("[u8]");
    let mut line = String::with_capacity(100);
    let mut start = 0usize;

    for (count, &byte) in self.0.iter().enumerate() {
      // End of line
      if (count % 32) == 0 && count != 0 {
        let linenum = format!("{:04X?}", start);
        b.field(linenum.as_str(), &line.as_str());
        start += 32;
        line.clear();
      }
      if (count % 8) == 0 && count != start {
        write!(&mut line, " ")?;
      }
      if (count % 4) == 0 && count != start {
        write!(&mut line, " ")?;
      }
      write!(&mut line, "{:02X?}", byte)?;
    }
    // Last remaining line
    if !line.is_empty() {
      let linenum = format!("{:04X?}", start);
      b.field(linenum.as_str(), &line.as_str());
    }

    b.finish()
  }
}

/// Hex dump for short (i.e., single-line) byte strings.
///
/// The output will be a continuous string of hex digits, interleaved by a `:`
/// character every `self.1` bytes.  A group size of `0` disables the `:`s.
pub(crate) struct ShortHexDump<'a>(pub &'a [u8], pub usize);

impl<'a> Debug for ShortHexDump<'a> {
  fn fmt(&self, f: &mut Formatter) -> core::fmt::Result {
    for (i, byte) in self.0.iter().enumerate() {
      if self.1 != 0 && i != 0 && (i % self.1) == 0 {
        write!(f, ":")?;
      }
      write!(f, "{:02X}", byte)?;
    }
    Ok(())
  }
}
