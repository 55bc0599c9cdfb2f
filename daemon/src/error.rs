use thiserror::Error;

/// Failure of a single volume-backend call.
///
/// Every variant is recoverable: the mute manager logs it and treats the
/// affected application as having nothing to mute for this tick.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
// Only the Windows backend produces anything but `Unsupported`.
#[cfg_attr(not(windows), allow(dead_code))]
pub enum BackendError {
    /// The session (or its process) disappeared between lookup and use.
    #[error("audio session vanished")]
    SessionVanished,

    #[error("access denied")]
    AccessDenied,

    #[error("OS audio call failed: {0}")]
    Os(String),

    /// No volume backend exists for this platform.
    #[error("per-application audio control is not supported on this platform")]
    Unsupported,
}

#[cfg(windows)]
impl From<windows::core::Error> for BackendError {
    fn from(e: windows::core::Error) -> Self {
        use windows::Win32::Foundation::E_ACCESSDENIED;
        use windows::Win32::Media::Audio::AUDCLNT_E_DEVICE_INVALIDATED;

        let code = e.code();
        if code == E_ACCESSDENIED {
            BackendError::AccessDenied
        } else if code == AUDCLNT_E_DEVICE_INVALIDATED {
            BackendError::SessionVanished
        } else {
            BackendError::Os(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_human_readable() {
        assert_eq!(BackendError::SessionVanished.to_string(), "audio session vanished");
        assert_eq!(
            BackendError::Os("E_FAIL".into()).to_string(),
            "OS audio call failed: E_FAIL"
        );
        assert!(BackendError::Unsupported.to_string().contains("not supported"));
    }
}
