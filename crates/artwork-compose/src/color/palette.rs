//! Named ink and garment colors

use super::{Cmyk, Rgb};
use crate::types::{ComposeError, Result};

/// What kind of ink or fabric a palette entry stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum SpaceKind {
    #[default]
    Process,
    Metallic,
    Glow,
    Reflective,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PaletteEntry {
    pub name: String,
    pub hex: String,
    pub cmyk: Cmyk,
    #[cfg_attr(feature = "serde", serde(default))]
    pub space_kind: SpaceKind,
    /// Manufacturer or category the entry was listed under
    #[cfg_attr(feature = "serde", serde(default))]
    pub group: Option<String>,
}

impl PaletteEntry {
    fn builtin(row: &Row, group: &str) -> Self {
        let (name, hex, [c, m, y, k], space_kind) = *row;
        Self {
            name: name.to_string(),
            hex: hex.to_string(),
            cmyk: Cmyk::new(c, m, y, k),
            space_kind,
            group: Some(group.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Palette {
    pub name: String,
    pub entries: Vec<PaletteEntry>,
}

impl Palette {
    pub fn new(name: impl Into<String>, entries: Vec<PaletteEntry>) -> Self {
        Self {
            name: name.into(),
            entries,
        }
    }

    /// Exact, case-insensitive hex lookup. The first matching entry wins.
    pub fn find_by_hex(&self, hex: &str) -> Option<&PaletteEntry> {
        let wanted = normalize_hex(hex)?;
        self.entries
            .iter()
            .find(|entry| normalize_hex(&entry.hex).as_deref() == Some(wanted.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries listed under `group`
    pub fn group<'a>(&'a self, group: &'a str) -> impl Iterator<Item = &'a PaletteEntry> + 'a {
        self.entries
            .iter()
            .filter(move |entry| entry.group.as_deref() == Some(group))
    }

    /// Load a palette from a JSON file
    #[cfg(feature = "serde")]
    pub async fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let palette: Palette = serde_json::from_slice(&bytes)
            .map_err(|e| ComposeError::Config(format!("Failed to parse palette: {}", e)))?;
        palette.validate()?;
        Ok(palette)
    }

    /// Save a palette to a JSON file
    #[cfg(feature = "serde")]
    pub async fn save(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ComposeError::Config(format!("Failed to serialize palette: {}", e)))?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    /// Every entry needs a parseable hex and CMYK within 0..=100
    pub fn validate(&self) -> Result<()> {
        for entry in &self.entries {
            Rgb::from_hex(&entry.hex)?;
            let Cmyk { c, m, y, k } = entry.cmyk;
            if [c, m, y, k].iter().any(|v| *v > 100) {
                return Err(ComposeError::Config(format!(
                    "Palette entry {:?} has CMYK outside 0-100: {}",
                    entry.name, entry.cmyk
                )));
            }
        }
        Ok(())
    }
}

/// Uppercase `#RRGGBB` for any form [`Rgb::from_hex`] accepts
fn normalize_hex(hex: &str) -> Option<String> {
    Rgb::from_hex(hex).ok().map(|rgb| rgb.to_hex())
}

/// Ink and garment palettes handed to the color model
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Catalogs {
    pub ink: Palette,
    pub garment: Palette,
}

impl Catalogs {
    pub fn new(ink: Palette, garment: Palette) -> Self {
        Self { ink, garment }
    }

    /// The palettes shipped with the crate
    pub fn builtin() -> Self {
        let collect = |tables: &[(&str, &[Row])]| {
            tables
                .iter()
                .flat_map(|(group, rows)| rows.iter().map(move |row| PaletteEntry::builtin(row, group)))
                .collect::<Vec<_>>()
        };

        Self {
            ink: Palette::new(
                "Inks",
                collect(&[("process", PROCESS_INKS), ("specialty", SPECIALTY_INKS)]),
            ),
            garment: Palette::new(
                "Garments",
                collect(&[
                    ("Gildan", GILDAN),
                    ("Fruit of the Loom", FRUIT_OF_THE_LOOM),
                    ("hi-viz", HI_VIZ),
                    ("pastels", PASTELS),
                ]),
            ),
        }
    }
}

// =============================================================================
// Built-in Tables
// =============================================================================

type Row = (&'static str, &'static str, [u8; 4], SpaceKind);

use SpaceKind::{Glow, Metallic, Process, Reflective};

const GILDAN: &[Row] = &[
    ("Black", "#000000", [0, 0, 0, 100], Process),
    ("White", "#FFFFFF", [0, 0, 0, 0], Process),
    ("Ash", "#B8B8B8", [0, 0, 0, 28], Process),
    ("Sport Grey", "#8C8C8C", [0, 0, 0, 45], Process),
    ("Dark Heather", "#616161", [0, 0, 0, 62], Process),
    ("Red", "#FF0000", [0, 100, 100, 0], Process),
    ("Cardinal Red", "#B71234", [0, 90, 71, 28], Process),
    ("Cherry Red", "#C5282F", [0, 84, 76, 23], Process),
    ("Orange", "#FF8C00", [0, 45, 100, 0], Process),
    ("Gold", "#FFD700", [0, 16, 100, 0], Process),
    ("Yellow Haze", "#FFFF99", [0, 0, 40, 0], Process),
    ("Daisy", "#FFFF00", [0, 0, 100, 0], Process),
    ("Royal Blue", "#0047AB", [100, 58, 0, 33], Process),
    ("Navy", "#000080", [100, 100, 0, 50], Process),
    ("Irish Green", "#00FF00", [100, 0, 100, 0], Process),
    ("Forest Green", "#228B22", [76, 0, 76, 45], Process),
    ("Purple", "#800080", [0, 100, 0, 50], Process),
    ("Heliconia", "#FF1493", [0, 92, 42, 0], Process),
    ("Safety Pink", "#FF69B4", [0, 59, 29, 0], Process),
    ("Safety Orange", "#FF4500", [0, 73, 100, 0], Process),
    ("Safety Green", "#32CD32", [75, 0, 75, 20], Process),
    ("Maroon", "#800000", [0, 100, 100, 50], Process),
    ("Brown", "#A52A2A", [0, 74, 74, 35], Process),
    ("Tan", "#D2B48C", [0, 14, 33, 18], Process),
    ("Light Blue", "#ADD8E6", [24, 6, 0, 10], Process),
    ("Light Pink", "#FFB6C1", [0, 29, 24, 0], Process),
    ("Natural", "#F5F5DC", [0, 0, 10, 4], Process),
];

const FRUIT_OF_THE_LOOM: &[Row] = &[
    ("Black", "#000000", [0, 0, 0, 100], Process),
    ("White", "#FFFFFF", [0, 0, 0, 0], Process),
    ("Heather Grey", "#D3D3D3", [0, 0, 0, 17], Process),
    ("Red", "#FF0000", [0, 100, 100, 0], Process),
    ("Navy", "#000080", [100, 100, 0, 50], Process),
    ("Royal Blue", "#4169E1", [74, 58, 0, 12], Process),
    ("Kelly Green", "#4CBB17", [70, 0, 87, 27], Process),
    ("Purple", "#800080", [0, 100, 0, 50], Process),
    ("Orange", "#FFA500", [0, 35, 100, 0], Process),
    ("Yellow", "#FFFF00", [0, 0, 100, 0], Process),
    ("Sky Blue", "#87CEEB", [43, 16, 0, 8], Process),
    ("Pink", "#FFC0CB", [0, 25, 20, 0], Process),
    ("Lime Green", "#32CD32", [75, 0, 75, 20], Process),
    ("Burgundy", "#800020", [0, 100, 75, 50], Process),
    ("Forest Green", "#228B22", [76, 0, 76, 45], Process),
];

const HI_VIZ: &[Row] = &[
    ("Hi-Viz Orange", "#FF6600", [0, 60, 100, 0], Process),
    ("Hi-Viz Yellow", "#FFFF00", [0, 0, 100, 0], Process),
    ("Hi-Viz Green", "#00FF00", [100, 0, 100, 0], Process),
    ("Hi-Viz Pink", "#FF1493", [0, 92, 42, 0], Process),
];

const PASTELS: &[Row] = &[
    ("Pastel Blue", "#B8E6FF", [28, 10, 0, 0], Process),
    ("Pastel Pink", "#FFD1DC", [0, 18, 14, 0], Process),
    ("Pastel Yellow", "#FFFF99", [0, 0, 40, 0], Process),
    ("Pastel Green", "#90EE90", [43, 0, 43, 7], Process),
    ("Pastel Purple", "#DDA0DD", [13, 28, 0, 13], Process),
];

const PROCESS_INKS: &[Row] = &[
    ("Black", "#000000", [0, 0, 0, 100], Process),
    ("White", "#FFFFFF", [0, 0, 0, 0], Process),
    ("Process Cyan", "#00AEEF", [100, 0, 0, 0], Process),
    ("Process Magenta", "#EC008C", [0, 100, 0, 0], Process),
    ("Process Yellow", "#FFF200", [0, 0, 100, 0], Process),
    ("Red", "#FF0000", [0, 100, 100, 0], Process),
    ("Orange", "#FF8C00", [0, 45, 100, 0], Process),
    ("Royal Blue", "#0047AB", [100, 58, 0, 33], Process),
    ("Navy", "#000080", [100, 100, 0, 50], Process),
    ("Kelly Green", "#4CBB17", [70, 0, 87, 27], Process),
    ("Purple", "#800080", [0, 100, 0, 50], Process),
    ("Maroon", "#800000", [0, 100, 100, 50], Process),
];

const SPECIALTY_INKS: &[Row] = &[
    ("Metallic Gold", "#FFD700", [0, 16, 100, 0], Metallic),
    ("Metallic Silver", "#C0C0C0", [0, 0, 0, 25], Metallic),
    ("Glow in Dark", "#F0F8FF", [6, 3, 0, 0], Glow),
    ("Reflective", "#E5E5E5", [0, 0, 0, 10], Reflective),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_by_hex_is_case_insensitive() {
        let catalogs = Catalogs::builtin();
        let entry = catalogs.garment.find_by_hex("ff8c00").unwrap();
        assert_eq!(entry.name, "Orange");
        assert_eq!(entry.group.as_deref(), Some("Gildan"));
        assert!(catalogs.garment.find_by_hex("#ff8c01").is_none());
    }

    #[test]
    fn test_first_hit_wins() {
        let catalogs = Catalogs::builtin();
        // Listed by both manufacturers and as hi-viz
        let entry = catalogs.garment.find_by_hex("#FFFF00").unwrap();
        assert_eq!(entry.name, "Daisy");
    }

    #[test]
    fn test_specialty_inks() {
        let catalogs = Catalogs::builtin();
        let silver = catalogs.ink.find_by_hex("#C0C0C0").unwrap();
        assert_eq!(silver.space_kind, SpaceKind::Metallic);
        assert_eq!(silver.cmyk, Cmyk::new(0, 0, 0, 25));
        assert_eq!(catalogs.ink.group("specialty").count(), 4);
    }

    #[test]
    fn test_short_hex_is_expanded() {
        let catalogs = Catalogs::builtin();
        let black = catalogs.garment.find_by_hex("#000").unwrap();
        assert_eq!(black.name, "Black");
        assert_eq!(black.cmyk, Cmyk::new(0, 0, 0, 100));
        assert!(catalogs.garment.find_by_hex("#00").is_none());
    }

    #[test]
    fn test_builtin_tables_validate() {
        let catalogs = Catalogs::builtin();
        catalogs.ink.validate().unwrap();
        catalogs.garment.validate().unwrap();
    }
}
