//! Input language identifiers and their display names.

use std::fmt;

/// Active input language: the low 16 bits of a keyboard layout handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LanguageId(pub u16);

/// Known languages. Several identifiers may share one name.
const LANGUAGE_NAMES: &[(u16, &str)] = &[
    (0x0409, "English"),
    (0x0809, "English"),
    (0x0402, "Bulgarian"),
    (0x0407, "German"),
    (0x040C, "French"),
    (0x0410, "Italian"),
    (0x0C0A, "Spanish"),
    (0x0419, "Russian"),
    (0x041F, "Turkish"),
];

/// Name used for identifiers missing from the table.
pub const UNKNOWN_LANGUAGE: &str = "Unknown";

impl LanguageId {
    /// Placeholder used when the initial query fails.
    pub const UNKNOWN: LanguageId = LanguageId(0);

    /// Extracts the language from a keyboard layout handle (`HKL`).
    pub fn from_layout_handle(hkl: isize) -> Self {
        Self((hkl as usize & 0xFFFF) as u16)
    }

    /// Resolves the human-readable name, "Unknown" if not in the table.
    pub fn name(self) -> &'static str {
        LANGUAGE_NAMES
            .iter()
            .find(|(id, _)| *id == self.0)
            .map(|(_, name)| *name)
            .unwrap_or(UNKNOWN_LANGUAGE)
    }
}

impl fmt::Display for LanguageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04X}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_names() {
        assert_eq!(LanguageId(0x0402).name(), "Bulgarian");
        assert_eq!(LanguageId(0x0409).name(), "English");
        assert_eq!(LanguageId(0x0809).name(), "English");
        assert_eq!(LanguageId(0x0419).name(), "Russian");
    }

    #[test]
    fn test_unknown_name() {
        assert_eq!(LanguageId(0x0411).name(), UNKNOWN_LANGUAGE);
        assert_eq!(LanguageId::UNKNOWN.name(), UNKNOWN_LANGUAGE);
    }

    #[test]
    fn test_from_layout_handle_keeps_low_word() {
        // Bulgarian language with a Phonetic device id in the high word
        assert_eq!(
            LanguageId::from_layout_handle(0x0002_0402),
            LanguageId(0x0402)
        );
        assert_eq!(
            LanguageId::from_layout_handle(0x0409_0409),
            LanguageId(0x0409)
        );
        assert_eq!(LanguageId::from_layout_handle(-1), LanguageId(0xFFFF));
    }

    #[test]
    fn test_display() {
        assert_eq!(LanguageId(0x409).to_string(), "0x0409");
        assert_eq!(LanguageId(0x0C0A).to_string(), "0x0C0A");
    }
}
