//! Classifies `Box<dyn Error>` from the source seam into a [`SourceFault`].
//!
//! Sources return boxed errors so any driver can plug in; this module
//! recovers a typed fault for logging, with an optional feature-gated path
//! for `proxi_hardware::HwError` downcasting.

use crate::error::SourceFault;

/// Map a source-boundary error to a typed fault.
///
/// Known hardware errors are downcast first, then string heuristics apply.
pub fn classify_source_error(e: &(dyn std::error::Error + 'static)) -> SourceFault {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<proxi_hardware::error::HwError>() {
            return match hw {
                proxi_hardware::error::HwError::EchoTimeout => SourceFault::Timeout,
                other => SourceFault::Hardware(other.to_string()),
            };
        }
    }

    if let Some(io) = e.downcast_ref::<std::io::Error>()
        && matches!(
            io.kind(),
            std::io::ErrorKind::BrokenPipe | std::io::ErrorKind::NotConnected
        )
    {
        return SourceFault::Disconnected;
    }

    let s = e.to_string();
    if s.to_lowercase().contains("timeout") || s.to_lowercase().contains("timed out") {
        SourceFault::Timeout
    } else {
        SourceFault::Hardware(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_broken_pipe_is_disconnect() {
        let e = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone");
        assert_eq!(classify_source_error(&e), SourceFault::Disconnected);
    }

    #[test]
    fn timeout_text_is_timeout() {
        let e = std::io::Error::other("echo timeout on pin 9");
        assert_eq!(classify_source_error(&e), SourceFault::Timeout);
    }

    #[test]
    fn other_errors_are_hardware_faults() {
        let e = std::io::Error::other("gpio busy");
        assert_eq!(
            classify_source_error(&e),
            SourceFault::Hardware("gpio busy".into())
        );
    }

    #[cfg(feature = "hardware-errors")]
    #[test]
    fn hw_echo_timeout_downcasts() {
        let e = proxi_hardware::error::HwError::EchoTimeout;
        assert_eq!(classify_source_error(&e), SourceFault::Timeout);
    }
}
