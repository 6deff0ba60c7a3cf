//! LangTone - plays a sound when the Windows input language changes.

// Hide console window in release builds
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]
// Only the platform-independent core is built elsewhere
#![cfg_attr(not(windows), allow(dead_code))]

mod config;
mod detector;
mod error;
mod gesture;
#[cfg(windows)]
mod keyboard_hook;
mod language;
mod layout;
#[cfg(windows)]
mod single_instance;
mod sound;
#[cfg(windows)]
mod tray;

#[cfg(windows)]
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("LangTone starting...");

    let instance_lock = match single_instance::InstanceLock::acquire() {
        Ok(lock) => lock,
        Err(error::InstanceError::AlreadyRunning) => {
            log::warn!("Another instance is already running");
            single_instance::notify_already_running();
            return;
        }
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    };

    let code = match app::run() {
        Ok(()) => 0,
        Err(e) => {
            log::error!("{}", e);
            1
        }
    };

    drop(instance_lock);
    log::info!("LangTone stopped");
    std::process::exit(code);
}

#[cfg(not(windows))]
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::error!("LangTone requires Windows: it listens to the Win32 keyboard hook");
    std::process::exit(1);
}

#[cfg(windows)]
mod app {
    use crate::config::{base_dir, resolve_path, ConfigManager};
    use crate::detector::{LanguageChange, LanguageChangeDetector};
    use crate::keyboard_hook::KeyboardHook;
    use crate::layout::ForegroundLayoutSource;
    use crate::sound::LanguageAudioPlayer;
    use crate::tray::TrayIconManager;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::mpsc::{self, TryRecvError};
    use std::sync::Arc;
    use std::time::Duration;
    use windows::Win32::{
        Foundation::HWND,
        UI::WindowsAndMessaging::{
            DispatchMessageW, PeekMessageW, TranslateMessage, MSG, PM_REMOVE, WM_QUIT,
        },
    };

    /// Runs until Exit is chosen from the tray menu.
    pub fn run() -> Result<(), Box<dyn std::error::Error>> {
        let config_manager = ConfigManager::new();
        let config = config_manager.load();
        log::info!("Configuration loaded from {}", config_manager.path().display());

        let audio_dir = resolve_path(&base_dir(), &config.sound.audio_dir);
        let mut audio = LanguageAudioPlayer::new(&audio_dir, config.sound.clone());

        // Channel for language change events (from worker thread to main thread)
        let (change_tx, change_rx) = mpsc::channel::<LanguageChange>();

        let detector = Arc::new(LanguageChangeDetector::new(
            Box::new(ForegroundLayoutSource),
            config.debounce(),
            Arc::new(move |change: LanguageChange| {
                if let Err(e) = change_tx.send(change) {
                    log::error!("Failed to send language event: {}", e);
                }
            }),
        )?);
        let initial = detector.last_known();
        log::info!("Initial language: {} ({})", initial.name(), initial);

        let gesture_detector = Arc::clone(&detector);
        let mut keyboard_hook =
            KeyboardHook::start(config.gesture, Arc::new(move || gesture_detector.schedule()))?;

        let should_exit = Arc::new(AtomicBool::new(false));
        let mut tray = TrayIconManager::new();
        let exit_flag = Arc::clone(&should_exit);
        tray.set_exit_callback(Arc::new(move || {
            exit_flag.store(true, Ordering::SeqCst);
        }));
        if let Err(e) = tray.start(initial.name()) {
            log::error!("Failed to start tray icon: {}", e);
        }

        log::info!("LangTone running");

        // Main message loop
        let mut msg = MSG::default();
        while !should_exit.load(Ordering::SeqCst) {
            tray.process_menu_events();

            match change_rx.try_recv() {
                Ok(change) => {
                    log::info!("Language changed: {} ({})", change.name, change.language);
                    tray.set_language(&change.name);
                    audio.play_language_audio(Some(&change.name));
                }
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => {
                    log::error!("Language channel disconnected");
                    break;
                }
            }

            // Process Windows messages (tray icon window lives on this thread)
            unsafe {
                if PeekMessageW(&mut msg, HWND::default(), 0, 0, PM_REMOVE).as_bool() {
                    if msg.message == WM_QUIT {
                        break;
                    }
                    let _ = TranslateMessage(&msg);
                    DispatchMessageW(&msg);
                } else {
                    std::thread::sleep(Duration::from_millis(16));
                }
            }
        }

        log::info!("LangTone shutting down...");

        keyboard_hook.stop();
        detector.shutdown();
        audio.stop();
        tray.stop();

        Ok(())
    }
}
