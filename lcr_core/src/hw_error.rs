//! Maps `Box<dyn Error>` from trait boundaries to typed `AcqError`.
//!
//! The traits in `lcr_traits` use `Box<dyn Error + Send + Sync>`; this module
//! converts those to our typed error enum, with a feature-gated path for
//! `lcr_hardware::HwError` downcasting.

use crate::error::AcqError;

/// Map a trait-boundary error to a typed `AcqError`.
///
/// Known hardware error types are downcast first, then string heuristics apply.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> AcqError {
    #[cfg(feature = "hardware-errors")]
    {
        use lcr_hardware::error::HwError;
        if let Some(hw) = e.downcast_ref::<HwError>() {
            return AcqError::HardwareFault(hw.to_string());
        }
    }

    let s = e.to_string();
    if s.to_lowercase().contains("timed out") || s.to_lowercase().contains("timeout") {
        AcqError::Timeout
    } else {
        AcqError::Hardware(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_errors_fall_back_to_message() {
        let e = std::io::Error::other("port vanished");
        match map_hw_error(&e) {
            AcqError::Hardware(msg) => assert!(msg.contains("port vanished")),
            other => panic!("unexpected {other:?}"),
        }
        let t = std::io::Error::other("read timed out");
        assert!(matches!(map_hw_error(&t), AcqError::Timeout));
    }

    #[cfg(feature = "hardware-errors")]
    #[test]
    fn hardware_errors_are_typed() {
        let e = lcr_hardware::error::HwError::Disconnected;
        assert!(matches!(map_hw_error(&e), AcqError::HardwareFault(_)));
        let io = lcr_hardware::error::HwError::Io(std::io::Error::other("framing"));
        assert!(matches!(map_hw_error(&io), AcqError::HardwareFault(m) if m.contains("framing")));
    }
}
