//! Reads the active input language of the foreground application.

use crate::error::QueryError;
use crate::language::LanguageId;

/// Source of the currently active input language.
pub trait LayoutSource: Send + Sync {
    fn current_language(&self) -> Result<LanguageId, QueryError>;
}

/// Queries the layout of the thread that owns the foreground window.
///
/// The hook thread has its own (unrelated) layout, so the query always
/// targets the window the user is typing into.
#[cfg(windows)]
#[derive(Debug, Default, Clone, Copy)]
pub struct ForegroundLayoutSource;

#[cfg(windows)]
impl LayoutSource for ForegroundLayoutSource {
    fn current_language(&self) -> Result<LanguageId, QueryError> {
        use windows::Win32::UI::{
            Input::KeyboardAndMouse::GetKeyboardLayout,
            WindowsAndMessaging::{GetForegroundWindow, GetWindowThreadProcessId},
        };

        unsafe {
            let hwnd = GetForegroundWindow();
            if hwnd.is_invalid() {
                return Err(QueryError::NoForegroundWindow);
            }

            let thread_id = GetWindowThreadProcessId(hwnd, None);
            if thread_id == 0 {
                return Err(QueryError::NoOwningThread);
            }

            let hkl = GetKeyboardLayout(thread_id);
            Ok(LanguageId::from_layout_handle(hkl.0 as isize))
        }
    }
}
