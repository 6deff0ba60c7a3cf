//! System tray module.
//!
//! Shows the current input language and an Exit command.

use std::sync::Arc;
use tray_icon::{
    menu::{Menu, MenuEvent, MenuId, MenuItem, PredefinedMenuItem},
    Icon, TrayIcon, TrayIconBuilder,
};

/// Callback type for tray actions.
pub type TrayCallback = Arc<dyn Fn() + Send + Sync>;

const TOOLTIP: &str = "LangTone";
const ICON_SIZE: u32 = 32;
const ICON_COLOR: (u8, u8, u8) = (0x33, 0x99, 0xFF);

/// Tray icon manager.
pub struct TrayIconManager {
    tray_icon: Option<TrayIcon>,
    status_item: Option<MenuItem>,
    on_exit: Option<TrayCallback>,
    menu_exit_id: Option<MenuId>,
}

impl TrayIconManager {
    /// Creates a new tray icon manager.
    pub fn new() -> Self {
        Self {
            tray_icon: None,
            status_item: None,
            on_exit: None,
            menu_exit_id: None,
        }
    }

    pub fn set_exit_callback(&mut self, on_exit: TrayCallback) {
        self.on_exit = Some(on_exit);
    }

    /// Filled circle on a transparent background.
    fn create_icon() -> Result<Icon, tray_icon::BadIcon> {
        let size = ICON_SIZE;
        let center = size as f32 / 2.0;
        let radius = center - 2.0;
        let (r, g, b) = ICON_COLOR;

        let mut rgba = Vec::with_capacity((size * size * 4) as usize);
        for y in 0..size {
            for x in 0..size {
                let dx = x as f32 - center;
                let dy = y as f32 - center;
                if (dx * dx + dy * dy).sqrt() <= radius {
                    rgba.extend_from_slice(&[r, g, b, 255]);
                } else {
                    rgba.extend_from_slice(&[0, 0, 0, 0]);
                }
            }
        }

        Icon::from_rgba(rgba, size, size)
    }

    /// Starts the tray icon showing `language`.
    pub fn start(&mut self, language: &str) -> Result<(), Box<dyn std::error::Error>> {
        let status_item = MenuItem::new(status_text(language), false, None);
        let menu_exit = MenuItem::new("Exit LangTone", true, None);
        self.menu_exit_id = Some(menu_exit.id().clone());

        let menu = Menu::new();
        menu.append(&status_item)?;
        menu.append(&PredefinedMenuItem::separator())?;
        menu.append(&menu_exit)?;

        let tray = TrayIconBuilder::new()
            .with_icon(Self::create_icon()?)
            .with_tooltip(tooltip_text(language))
            .with_menu(Box::new(menu))
            .build()?;

        self.tray_icon = Some(tray);
        self.status_item = Some(status_item);

        Ok(())
    }

    /// Shows a new current language in the tooltip and menu.
    pub fn set_language(&self, language: &str) {
        if let Some(ref item) = self.status_item {
            item.set_text(status_text(language));
        }
        if let Some(ref tray) = self.tray_icon {
            if let Err(e) = tray.set_tooltip(Some(tooltip_text(language))) {
                log::warn!("Failed to update tray tooltip: {}", e);
            }
        }
    }

    /// Processes menu events. Should be called from the main event loop.
    pub fn process_menu_events(&self) {
        while let Ok(event) = MenuEvent::receiver().try_recv() {
            if Some(&event.id) == self.menu_exit_id.as_ref() {
                if let Some(ref cb) = self.on_exit {
                    cb();
                }
            }
        }
    }

    /// Stops the tray icon.
    pub fn stop(&mut self) {
        self.status_item = None;
        self.tray_icon = None;
    }
}

impl Default for TrayIconManager {
    fn default() -> Self {
        Self::new()
    }
}

fn status_text(language: &str) -> String {
    format!("Language: {}", language)
}

fn tooltip_text(language: &str) -> String {
    format!("{} - {}", TOOLTIP, language)
}
