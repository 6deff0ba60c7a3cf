//! Sound module for language change notifications.
//!
//! Plays `<Language>.mp3` (or `.wav`) from the audio directory through MCI.
//! When no clip matches or playback fails, falls back to a short beep.

use crate::config::SoundConfig;
use crate::error::AudioError;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
#[cfg(windows)]
use windows::{core::PCWSTR, Win32::Foundation::HWND, Win32::Media::Multimedia::mciSendStringW};

/// Clip extensions MCI can play without extra codecs.
const CLIP_EXTENSIONS: &[&str] = &["mp3", "wav"];

// Windows Beep: frequency 37-32767 Hz
const MIN_TONE_HZ: u32 = 37;
const MAX_TONE_HZ: u32 = 32767;
const MAX_TONE_MS: u32 = 2000;

/// MCI alias of the clip currently open.
#[cfg(windows)]
const MCI_ALIAS: &str = "langtone_clip";

// Note: windows crate doesn't export Beep, so we use direct linking
#[cfg(windows)]
#[link(name = "kernel32")]
extern "system" {
    fn Beep(dwFreq: u32, dwDuration: u32) -> i32;
}

#[cfg(windows)]
fn mci_send(command: &str) -> Result<(), AudioError> {
    let wide: Vec<u16> = command.encode_utf16().chain(std::iter::once(0)).collect();
    let code = unsafe { mciSendStringW(PCWSTR(wide.as_ptr()), None, HWND::default()) };
    if code == 0 {
        Ok(())
    } else {
        Err(AudioError::Mci {
            command: command.to_string(),
            code,
        })
    }
}

/// Indexes clip files by lower-cased file stem.
fn index_clips(dir: &Path) -> HashMap<String, PathBuf> {
    let mut clips = HashMap::new();

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!("Audio directory {} unavailable: {}", dir.display(), e);
            return clips;
        }
    };

    for path in entries.filter_map(|entry| entry.ok()).map(|entry| entry.path()) {
        let is_clip = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| CLIP_EXTENSIONS.iter().any(|c| ext.eq_ignore_ascii_case(c)))
            .unwrap_or(false);
        if !is_clip || !path.is_file() {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            clips.insert(stem.to_lowercase(), path.clone());
        }
    }

    log::debug!("Indexed {} audio clips in {}", clips.len(), dir.display());
    clips
}

/// Plays the clip for a language, or the fallback tone.
pub struct LanguageAudioPlayer {
    config: SoundConfig,
    clips: HashMap<String, PathBuf>,
    clip_open: bool,
}

impl LanguageAudioPlayer {
    /// Creates a player for clips in `dir`.
    pub fn new(dir: &Path, config: SoundConfig) -> Self {
        let clips = if config.enabled {
            index_clips(dir)
        } else {
            HashMap::new()
        };
        Self {
            config,
            clips,
            clip_open: false,
        }
    }

    /// Finds the clip whose file stem equals `language`, ignoring case.
    pub fn clip_for(&self, language: &str) -> Option<&Path> {
        self.clips
            .get(&language.to_lowercase())
            .map(PathBuf::as_path)
    }

    /// Plays the clip for `language`. Never fails: any problem ends in the
    /// fallback tone.
    pub fn play_language_audio(&mut self, language: Option<&str>) {
        if !self.config.enabled {
            return;
        }

        self.stop();

        let clip = language.and_then(|name| self.clip_for(name)).map(Path::to_path_buf);
        match clip {
            Some(path) => {
                if let Err(e) = self.play_clip(&path) {
                    log::warn!("Failed to play {}: {}", path.display(), e);
                    self.stop();
                    self.play_fallback();
                }
            }
            None => {
                log::debug!("No clip for {:?}, using fallback tone", language);
                self.play_fallback();
            }
        }
    }

    #[cfg(windows)]
    fn play_clip(&mut self, path: &Path) -> Result<(), AudioError> {
        mci_send(&format!(
            "open \"{}\" type mpegvideo alias {}",
            path.display(),
            MCI_ALIAS
        ))?;
        self.clip_open = true;
        mci_send(&format!("play {}", MCI_ALIAS))
    }

    #[cfg(not(windows))]
    fn play_clip(&mut self, _path: &Path) -> Result<(), AudioError> {
        Err(AudioError::Unsupported)
    }

    /// Frequency and duration of the fallback tone, within what `Beep` accepts.
    fn fallback_tone(&self) -> (u32, u32) {
        (
            self.config.fallback_frequency.clamp(MIN_TONE_HZ, MAX_TONE_HZ),
            self.config.fallback_duration_ms.min(MAX_TONE_MS),
        )
    }

    /// Plays the fallback tone on a short-lived thread. `Beep` blocks for
    /// the whole tone.
    fn play_fallback(&self) {
        let (frequency, duration_ms) = self.fallback_tone();
        let spawned = thread::Builder::new()
            .name("fallback-tone".to_string())
            .spawn(move || beep(frequency, duration_ms));
        if let Err(e) = spawned {
            log::warn!("Failed to start fallback tone: {}", e);
        }
    }

    /// Stops and closes the current clip, if any.
    pub fn stop(&mut self) {
        if self.clip_open {
            self.clip_open = false;
            close_clip();
        }
    }
}

#[cfg(windows)]
fn close_clip() {
    if let Err(e) = mci_send(&format!("close {}", MCI_ALIAS)) {
        log::debug!("{}", e);
    }
}

#[cfg(not(windows))]
fn close_clip() {}

#[cfg(windows)]
fn beep(frequency: u32, duration_ms: u32) {
    unsafe {
        Beep(frequency, duration_ms);
    }
}

#[cfg(not(windows))]
fn beep(frequency: u32, duration_ms: u32) {
    log::debug!("Fallback tone {} Hz for {} ms", frequency, duration_ms);
}

impl Drop for LanguageAudioPlayer {
    fn drop(&mut self) {
        self.stop();
    }
}
