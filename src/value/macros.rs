/// Generates one exact-width little-endian decoder.
macro_rules! impl_exact_view {
    ($type:ty, $size:literal) => {
        paste::paste! {
            #[doc = "Decodes the value as a little-endian `" $type "`."]
            #[doc = ""]
            #[doc = "# Errors"]
            #[doc = "[`Error::InvalidSize`] unless the value is exactly " $size " byte(s) long."]
            #[inline]
            pub fn [<to_ $type>](&self) -> Result<$type> {
                let raw: [u8; $size] = self
                    .bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| Error::InvalidSize { size: self.bytes.len() })?;
                Ok(<$type>::from_le_bytes(raw))
            }
        }
    };
}

/// Generates decoders for every integer width a register access can have.
macro_rules! impl_exact_views {
    () => {
        impl_exact_view!(u8, 1);
        impl_exact_view!(i8, 1);
        impl_exact_view!(u16, 2);
        impl_exact_view!(i16, 2);
        impl_exact_view!(u32, 4);
        impl_exact_view!(i32, 4);
        impl_exact_view!(u64, 8);
        impl_exact_view!(i64, 8);
    };
}

pub(super) use impl_exact_view;
pub(super) use impl_exact_views;
