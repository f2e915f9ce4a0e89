//! カード配色

/// カードの配色（RGB）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardTheme {
    pub key: &'static str,
    pub label: &'static str,
    pub bg: [u8; 3],
    pub primary: [u8; 3],
    pub secondary: [u8; 3],
    pub text: [u8; 3],
    pub subtext: [u8; 3],
    pub border: [u8; 3],
}

pub const THEMES: &[CardTheme] = &[
    CardTheme {
        key: "blue",
        label: "Blue",
        bg: [0xF5, 0xF8, 0xFF],
        primary: [0x1F, 0x6F, 0xEB],
        secondary: [0xD6, 0xE4, 0xFF],
        text: [0x0B, 0x12, 0x20],
        subtext: [0x47, 0x55, 0x69],
        border: [0xA4, 0xC2, 0xFF],
    },
    CardTheme {
        key: "green",
        label: "Green",
        bg: [0xF3, 0xFF, 0xF6],
        primary: [0x00, 0xA6, 0x76],
        secondary: [0xC8, 0xF2, 0xE5],
        text: [0x0B, 0x12, 0x20],
        subtext: [0x47, 0x55, 0x69],
        border: [0x9B, 0xE5, 0xD1],
    },
    CardTheme {
        key: "red",
        label: "Red",
        bg: [0xFF, 0xF5, 0xF5],
        primary: [0xD6, 0x45, 0x45],
        secondary: [0xFF, 0xD6, 0xD6],
        text: [0x0B, 0x12, 0x20],
        subtext: [0x47, 0x55, 0x69],
        border: [0xFF, 0xC0, 0xC0],
    },
    CardTheme {
        key: "neutral",
        label: "Neutral",
        bg: [0xF7, 0xF7, 0xF7],
        primary: [0x11, 0x18, 0x27],
        secondary: [0xE5, 0xE7, 0xEB],
        text: [0x0B, 0x12, 0x20],
        subtext: [0x47, 0x55, 0x69],
        border: [0xD1, 0xD5, 0xDB],
    },
];

impl CardTheme {
    /// キー（大文字小文字を区別しない）から配色を取得
    pub fn by_key(key: &str) -> Option<CardTheme> {
        let key = key.trim().to_lowercase();
        THEMES.iter().find(|t| t.key == key).copied()
    }
}

impl Default for CardTheme {
    fn default() -> Self {
        THEMES[0]
    }
}
