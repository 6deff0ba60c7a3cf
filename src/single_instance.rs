//! Single instance lock.
//!
//! Only one LangTone may hold the global keyboard hook. The lock is a named
//! mutex owned by [`InstanceLock`] and released when the lock is dropped.

use crate::error::InstanceError;
use windows::{
    core::PCWSTR,
    Win32::{
        Foundation::{CloseHandle, GetLastError, ERROR_ALREADY_EXISTS, HANDLE},
        System::Threading::CreateMutexW,
        UI::WindowsAndMessaging::{MessageBoxW, MB_ICONINFORMATION, MB_OK},
    },
};

/// Mutex name, scoped to the user's session.
const LOCK_NAME: &str = "Local\\LangTone_KeyboardHook";

fn to_wide(text: &str) -> Vec<u16> {
    text.encode_utf16().chain(std::iter::once(0)).collect()
}

/// Proof that this process is the only LangTone in the session.
#[derive(Debug)]
pub struct InstanceLock {
    handle: HANDLE,
}

impl InstanceLock {
    /// Takes the session-wide lock.
    pub fn acquire() -> Result<Self, InstanceError> {
        Self::acquire_named(LOCK_NAME)
    }

    fn acquire_named(name: &str) -> Result<Self, InstanceError> {
        let name = to_wide(name);

        unsafe {
            let handle = CreateMutexW(None, true, PCWSTR(name.as_ptr()))
                .map_err(|e| InstanceError::Create(e.to_string()))?;

            // Opening an existing mutex succeeds too; only the last error tells
            if GetLastError() == ERROR_ALREADY_EXISTS {
                let _ = CloseHandle(handle);
                return Err(InstanceError::AlreadyRunning);
            }

            Ok(Self { handle })
        }
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        unsafe {
            if let Err(e) = CloseHandle(self.handle) {
                log::debug!("Failed to release instance lock: {}", e);
            }
        }
    }
}

/// Tells the user where the running instance is.
pub fn notify_already_running() {
    let title = to_wide("LangTone");
    let message = to_wide(
        "LangTone is already listening for language changes.\n\n\
         Use the tray icon to exit it.",
    );

    unsafe {
        let _ = MessageBoxW(
            None,
            PCWSTR(message.as_ptr()),
            PCWSTR(title.as_ptr()),
            MB_OK | MB_ICONINFORMATION,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_lock_name(name: &str) -> String {
        format!("Local\\LangTone_Test_{}_{}", name, std::process::id())
    }

    #[test]
    fn test_second_lock_is_refused() {
        let name = test_lock_name("second");
        let first = InstanceLock::acquire_named(&name).unwrap();

        assert!(matches!(
            InstanceLock::acquire_named(&name),
            Err(InstanceError::AlreadyRunning)
        ));
        drop(first);
    }

    #[test]
    fn test_lock_released_on_drop() {
        let name = test_lock_name("released");
        let first = InstanceLock::acquire_named(&name).unwrap();
        drop(first);

        assert!(InstanceLock::acquire_named(&name).is_ok());
    }
}
