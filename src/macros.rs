/// A macro wrapper for building an error value that allows logging of
/// errors.
///
/// Specifically, in debug builds, before the error is handed back a call is
/// made to the [`log`] macro at `$level` describing the error and where it was
/// raised.  With the `backtrace` feature enabled, a stack backtrace is logged
/// as well.
///
/// Usage:  `err!(trace, U) -> U`
macro_rules! err {
  ($level:ident, $error:expr) => {{
    let error = $error;

    #[cfg(debug_assertions)]
    {
      ::log::$level!("{}:{}: {:?}", file!(), line!(), &error);
      #[cfg(feature = "backtrace")]
      {
        let bt = backtrace::Backtrace::new();
        ::log::$level!("{:?}", bt);
      }
    }

    error
  }};
}

/// Generates a little-endian, alignment-free version of a primitive type.
///
/// The generated type is always stored little-endian on every platform and
/// has an alignment of 1, so it can be referenced in place anywhere inside a
/// byte buffer.
///
/// # Parameters
///
/// - `native_prim`: The corresponding native primitive type (e.g., `u32`)
/// - `le_prim`: The desired name for the generated little-endian type.
macro_rules! gen_le_prim {
  ($native_prim:ident, $le_prim:ident) => {
    /// A little-endian, unaligned version of the corresponding primitive.
    #[repr(transparent)]
    #[derive(Copy, Clone, Eq, PartialEq, Hash)]
    pub struct $le_prim([u8; ::core::mem::size_of::<$native_prim>()]);

    // SAFETY: A plain byte array accepts every bit pattern and has alignment 1.
    unsafe impl $crate::zerocopy::ZeroCopy for $le_prim {}

    impl $le_prim {
      /// Creates an instance from its little-endian bytes.
      pub const fn from_bytes(
        bytes: [u8; ::core::mem::size_of::<$native_prim>()],
      ) -> $le_prim {
        $le_prim(bytes)
      }

      /// Creates an instance from a native value.
      pub const fn new(value: $native_prim) -> $le_prim {
        $le_prim(value.to_le_bytes())
      }

      /// Gets the associated native primitive.
      pub const fn get(&self) -> $native_prim {
        $native_prim::from_le_bytes(self.0)
      }

      /// Retrieves the raw (little-endian) bytes of the value.
      pub const fn bytes(&self) -> &[u8; ::core::mem::size_of::<$native_prim>()] {
        &self.0
      }
    }

    impl ::core::convert::From<$native_prim> for $le_prim {
      fn from(src: $native_prim) -> Self {
        $le_prim::new(src)
      }
    }

    impl ::core::convert::From<$le_prim> for $native_prim {
      fn from(src: $le_prim) -> Self {
        src.get()
      }
    }

    impl ::core::cmp::PartialEq<$native_prim> for $le_prim {
      fn eq(&self, other: &$native_prim) -> bool {
        self.get() == *other
      }
    }

    impl ::core::fmt::Debug for $le_prim {
      fn fmt(&self, f: &mut ::core::fmt::Formatter) -> ::core::fmt::Result {
        ::core::fmt::Debug::fmt(&self.get(), f)
      }
    }

    impl ::core::fmt::Display for $le_prim {
      fn fmt(&self, f: &mut ::core::fmt::Formatter) -> ::core::fmt::Result {
        ::core::fmt::Display::fmt(&self.get(), f)
      }
    }

    impl Default for $le_prim {
      fn default() -> Self {
        $le_prim::new(0)
      }
    }
  };
}

/// Generates the [`FixedSize`] implementation for a primitive numeric type.
///
/// [`FixedSize`]: crate::classify::FixedSize
macro_rules! gen_fixed_prim {
  ($($prim:ident),+ $(,)?) => {
    $(
      impl $crate::classify::Classified for $prim {
        const FIXED_SIZE: bool = true;
        const VARIABLE_SIZE: bool = false;
      }

      impl $crate::classify::FixedSize for $prim {
        #[inline(always)]
        fn write_le(&self, target: &mut [u8]) {
          target.copy_from_slice(&self.to_le_bytes());
        }

        #[inline(always)]
        fn read_le(source: &[u8]) -> Self {
          let mut bytes = [0u8; ::core::mem::size_of::<$prim>()];
          bytes.copy_from_slice(source);
          $prim::from_le_bytes(bytes)
        }

        #[inline(always)]
        fn byte_swapped(self) -> Self {
          $prim::from_ne_bytes({
            let mut bytes = self.to_ne_bytes();
            bytes.reverse();
            bytes
          })
        }
      }
    )+
  };
}

/// Declares an aggregate type as fixed-size, i.e., encodable by a direct,
/// byte-order corrected copy of each of its fields.
///
/// Every field must be listed, in declaration order, along with its type.  The
/// declaration is checked at compile time:
///
/// - each field type must itself be [`FixedSize`];
/// - the fields must sit back to back in memory in declaration order, with no
///   padding before, between, or after them (in practice: `#[repr(C)]` with
///   naturally ordered fields);
/// - the type must be `Copy + 'static`, which rules out ownership, borrowed
///   pointers and trait objects.
///
/// On the wire the fields are written in declaration order, each in
/// little-endian byte order, so the encoded bytes equal the in-memory bytes on
/// little-endian hosts.
///
/// ```
/// use rift::{declare_fixed_size, FixedSize};
///
/// #[repr(C)]
/// #[derive(Copy, Clone, Debug, PartialEq)]
/// pub struct Vec3 {
///   x: f32,
///   y: f32,
///   z: f32,
/// }
///
/// declare_fixed_size!(Vec3 { x: f32, y: f32, z: f32 });
///
/// let mut bytes = [0u8; 12];
/// Vec3 { x: 1.0, y: 2.0, z: 3.0 }.write_le(&mut bytes);
/// assert_eq!(&bytes[4..8], &2.0f32.to_le_bytes());
/// ```
///
/// Types with padding bytes are rejected:
///
/// ```compile_fail
/// use rift::declare_fixed_size;
///
/// #[repr(C)]
/// #[derive(Copy, Clone)]
/// pub struct Padded {
///   flag:  u8,
///   value: u32,
/// }
///
/// declare_fixed_size!(Padded { flag: u8, value: u32 });
/// ```
///
/// [`FixedSize`]: crate::classify::FixedSize
#[macro_export]
macro_rules! declare_fixed_size {
  ($ty:ident { $($field:ident : $fty:ty),+ $(,)? }) => {
    impl $crate::classify::Classified for $ty {
      const FIXED_SIZE: bool = true;
      const VARIABLE_SIZE: bool = false;
    }

    const _: () = {
      let mut at = 0usize;
      $(
        assert!(
          ::core::mem::offset_of!($ty, $field) == at,
          concat!(
            stringify!($ty),
            " declared fixed-size, but field `",
            stringify!($field),
            "` is padded or out of declaration order",
          ),
        );
        at += ::core::mem::size_of::<$fty>();
      )+
      assert!(
        at == ::core::mem::size_of::<$ty>(),
        concat!(
          stringify!($ty),
          " declared fixed-size, but has trailing padding",
        ),
      );
    };

    const _: $crate::classify::TypeClass =
      $crate::classify::check_type_concepts::<$ty>();

    impl $crate::classify::FixedSize for $ty {
      fn write_le(&self, target: &mut [u8]) {
        let mut at = 0usize;
        $(
          let end = at + <$fty as $crate::classify::FixedSize>::WIRE_SIZE;
          $crate::classify::FixedSize::write_le(&self.$field, &mut target[at..end]);
          at = end;
        )+
        let _ = at;
      }

      fn read_le(source: &[u8]) -> Self {
        let mut at = 0usize;
        $(
          let end = at + <$fty as $crate::classify::FixedSize>::WIRE_SIZE;
          let $field =
            <$fty as $crate::classify::FixedSize>::read_le(&source[at..end]);
          at = end;
        )+
        let _ = at;
        $ty { $($field),+ }
      }

      fn byte_swapped(self) -> Self {
        $ty {
          $($field: $crate::classify::FixedSize::byte_swapped(self.$field)),+
        }
      }
    }
  };
}
