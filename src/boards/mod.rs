//! Reference board drivers built only on the [`BoardDriver`](crate::BoardDriver)
//! primitives.
//!
//! Each board module declares its register map as a static
//! [`BoardLayout`](crate::BoardLayout) and wraps a driver with named
//! operations that compose `read`, `write`, `set_flag` and the shadow cache.

pub mod pci2724;
pub mod pci6204;

use crate::error::{Error, Result};

/// Fails with [`Error::InvalidChannel`] unless `min <= channel <= max`.
pub(crate) fn check_channel(channel: u32, min: u32, max: u32) -> Result<()> {
    if (min..=max).contains(&channel) {
        Ok(())
    } else {
        Err(Error::InvalidChannel { channel, min, max })
    }
}

#[test]
fn channel_bounds() {
    assert!(check_channel(1, 1, 2).is_ok());
    assert!(check_channel(2, 1, 2).is_ok());
    let err = check_channel(3, 1, 2).unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidChannel {
            channel: 3,
            min: 1,
            max: 2
        }
    ));
    assert_eq!(
        err.to_string(),
        "invalid channel: ch should be in 1-2 while 3 is given"
    );
}
