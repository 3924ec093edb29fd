/// Generates a typed read/write accessor pair for one unsigned width.
macro_rules! impl_typed_access {
    ($type:ty, $size:literal) => {
        paste::paste! {
            #[doc = "Reads a little-endian `" $type "` at `offset` of `region`."]
            #[doc = ""]
            #[doc = "Validated like [`read`](Self::read) with a size of " $size "."]
            #[inline]
            pub fn [<read_ $type>](&mut self, region: usize, offset: u64) -> Result<$type> {
                self.read(region, offset, $size)?.[<to_ $type>]()
            }

            #[doc = "Writes a little-endian `" $type "` at `offset` of `region`."]
            #[doc = ""]
            #[doc = "Validated like [`write`](Self::write) with a size of " $size "."]
            #[inline]
            pub fn [<write_ $type>](&mut self, region: usize, offset: u64, value: $type) -> Result<()> {
                self.write(region, offset, &value.to_le_bytes())
            }
        }
    };
}

/// Generates typed accessors for every bus access width.
macro_rules! impl_typed_accessors {
    () => {
        impl_typed_access!(u8, 1);
        impl_typed_access!(u16, 2);
        impl_typed_access!(u32, 4);
        impl_typed_access!(u64, 8);
    };
}

pub(super) use impl_typed_access;
pub(super) use impl_typed_accessors;
