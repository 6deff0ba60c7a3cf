//! Error types.

use thiserror::Error;

/// Failure to install the global keyboard hook.
///
/// Fatal for the application: without the hook no gesture is ever seen.
#[derive(Error, Debug)]
pub enum HookError {
    #[error("module handle unavailable: {0}")]
    ModuleHandle(String),

    #[error("SetWindowsHookExW rejected the hook: {0}")]
    Install(String),

    #[error("failed to spawn hook thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("hook thread exited before reporting its status")]
    ThreadExited,
}

/// Failure to take the single-instance lock.
#[derive(Error, Debug)]
pub enum InstanceError {
    #[error("another instance is already running")]
    AlreadyRunning,

    #[error("failed to create instance mutex: {0}")]
    Create(String),
}

/// Failure to read the active layout of the foreground application.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("no foreground window")]
    NoForegroundWindow,

    #[error("foreground window has no owning thread")]
    NoOwningThread,
}

/// Audio playback failure. Always recovered by the fallback tone.
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("MCI command `{command}` failed with code {code}")]
    Mci { command: String, code: u32 },

    #[error("audio playback is not supported on this platform")]
    Unsupported,
}

/// Configuration file failure.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("config format: {0}")]
    Format(#[from] serde_json::Error),
}
