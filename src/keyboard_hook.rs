//! Keyboard hook module.
//!
//! Installs a `WH_KEYBOARD_LL` hook on a dedicated message-loop thread and
//! reports language-switch gestures. The hook never decides whether the
//! language actually changed, and every event is passed down the chain.

use crate::error::HookError;
use crate::gesture::{GesturePolicy, GestureTracker, HookAction};
use std::cell::RefCell;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use windows::Win32::{
    Foundation::{HINSTANCE, HWND, LPARAM, LRESULT, WPARAM},
    System::{LibraryLoader::GetModuleHandleW, Threading::GetCurrentThreadId},
    UI::WindowsAndMessaging::{
        CallNextHookEx, DispatchMessageW, GetMessageW, PeekMessageW, PostThreadMessageW,
        SetWindowsHookExW, TranslateMessage, UnhookWindowsHookEx, HHOOK, KBDLLHOOKSTRUCT, MSG,
        PM_NOREMOVE, WH_KEYBOARD_LL, WINDOWS_HOOK_ID, WM_QUIT, WM_USER,
    },
};

/// Callback type for recognized gestures.
pub type GestureCallback = Arc<dyn Fn() + Send + Sync>;

/// Per-hook state, owned by the hook thread.
struct HookSink {
    tracker: GestureTracker,
    on_gesture: GestureCallback,
}

thread_local! {
    // Low-level hook procedures are always called on the installing thread
    // and receive no user data, so the owning hook's state lives here.
    static HOOK_SINK: RefCell<Option<HookSink>> = const { RefCell::new(None) };
}

/// Low-level keyboard hook callback. Must stay fast and non-blocking.
unsafe extern "system" fn keyboard_hook_proc(
    n_code: i32,
    w_param: WPARAM,
    l_param: LPARAM,
) -> LRESULT {
    let callback = HOOK_SINK.with(|sink| {
        let mut sink = sink.borrow_mut();
        let sink = sink.as_mut()?;
        // SAFETY: only read for key messages with nCode >= 0, where lParam
        // points to a KBDLLHOOKSTRUCT
        let action = sink.tracker.on_hook_event(n_code, w_param.0 as u32, || unsafe {
            (*(l_param.0 as *const KBDLLHOOKSTRUCT)).vkCode
        });
        match action {
            HookAction::NotifyAndForward => Some(Arc::clone(&sink.on_gesture)),
            HookAction::Forward => None,
        }
    });

    // Invoked after the borrow ends in case the callback re-enters the hook
    if let Some(cb) = callback {
        log::trace!("Language switch gesture recognized");
        cb();
    }

    CallNextHookEx(HHOOK::default(), n_code, w_param, l_param)
}

/// Global keyboard hook for language-switch gestures.
pub struct KeyboardHook {
    thread_id: u32,
    thread: Option<JoinHandle<()>>,
}

impl KeyboardHook {
    /// Installs the hook and returns once it is live.
    ///
    /// Fails when the module handle cannot be resolved or Windows rejects
    /// the hook; nothing is left running in that case.
    pub fn start(policy: GesturePolicy, on_gesture: GestureCallback) -> Result<Self, HookError> {
        let (ready_tx, ready_rx) = mpsc::channel();

        let thread = thread::Builder::new()
            .name("keyboard-hook".to_string())
            .spawn(move || hook_thread(policy, on_gesture, ready_tx))?;

        match ready_rx.recv() {
            Ok(Ok(thread_id)) => {
                log::info!("Keyboard hook installed ({:?})", policy);
                Ok(Self {
                    thread_id,
                    thread: Some(thread),
                })
            }
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                let _ = thread.join();
                Err(HookError::ThreadExited)
            }
        }
    }

    /// Uninstalls the hook. Safe to call more than once.
    pub fn stop(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };

        // Post WM_QUIT to exit the message loop
        unsafe {
            if let Err(e) = PostThreadMessageW(self.thread_id, WM_QUIT, WPARAM(0), LPARAM(0)) {
                log::warn!("Failed to post quit to hook thread: {}", e);
            }
        }

        if thread.join().is_err() {
            log::error!("Keyboard hook thread panicked");
        }
        log::info!("Keyboard hook stopped");
    }
}

impl Drop for KeyboardHook {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Installs the hook, reports the outcome and pumps messages until WM_QUIT.
fn hook_thread(
    policy: GesturePolicy,
    on_gesture: GestureCallback,
    ready: mpsc::Sender<Result<u32, HookError>>,
) {
    HOOK_SINK.with(|sink| {
        *sink.borrow_mut() = Some(HookSink {
            tracker: GestureTracker::new(policy),
            on_gesture,
        });
    });

    let hook = match install_hook(WH_KEYBOARD_LL) {
        Ok(hook) => hook,
        Err(e) => {
            HOOK_SINK.with(|sink| sink.borrow_mut().take());
            let _ = ready.send(Err(e));
            return;
        }
    };

    unsafe {
        // Create the thread's message queue before anyone posts WM_QUIT to it
        let mut msg = MSG::default();
        let _ = PeekMessageW(&mut msg, HWND::default(), WM_USER, WM_USER, PM_NOREMOVE);

        let _ = ready.send(Ok(GetCurrentThreadId()));

        // Message loop
        loop {
            let result = GetMessageW(&mut msg, HWND::default(), 0, 0);
            if result.0 == 0 || result.0 == -1 {
                break;
            }
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }

        // Cleanup is best effort
        if let Err(e) = UnhookWindowsHookEx(hook) {
            log::warn!("UnhookWindowsHookEx failed: {}", e);
        }
    }

    HOOK_SINK.with(|sink| sink.borrow_mut().take());
}

fn install_hook(hook_id: WINDOWS_HOOK_ID) -> Result<HHOOK, HookError> {
    unsafe {
        let module = GetModuleHandleW(None).map_err(|e| HookError::ModuleHandle(e.to_string()))?;
        SetWindowsHookExW(
            hook_id,
            Some(keyboard_hook_proc),
            HINSTANCE::from(module),
            0,
        )
        .map_err(|e| HookError::Install(e.to_string()))
    }
}
