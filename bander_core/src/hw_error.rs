//! Maps `Box<dyn Error>` from trait boundaries to typed `BanderError`.
//!
//! The capability traits in `bander_traits` return `Box<dyn Error + Send + Sync>`;
//! this module converts those to our typed error enum, with an optional
//! feature-gated path for `bander_hardware::HwError` downcasting.

use crate::error::BanderError;

/// Map a trait-boundary error to a typed `BanderError`.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> BanderError {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<bander_hardware::HwError>() {
            return match hw {
                bander_hardware::HwError::InvalidChannel(ch) => BanderError::InvalidChannel(*ch),
                other => BanderError::HardwareFault(other.to_string()),
            };
        }
    }

    BanderError::Hardware(e.to_string())
}

/// Same as `map_hw_error` for the boxed form returned by the traits.
pub(crate) fn map_boxed(e: Box<dyn std::error::Error + Send + Sync>) -> eyre::Report {
    eyre::Report::new(map_hw_error(&*e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn foreign_errors_keep_their_message() {
        let e = std::io::Error::other("bus glitch");
        assert_eq!(
            map_hw_error(&e),
            BanderError::Hardware("bus glitch".to_string())
        );
    }

    #[cfg(feature = "hardware-errors")]
    #[test]
    fn invalid_channel_is_downcast() {
        let e = bander_hardware::HwError::InvalidChannel(9);
        assert_eq!(map_hw_error(&e), BanderError::InvalidChannel(9));
    }
}
