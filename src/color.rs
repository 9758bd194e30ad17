use palette::{named, Hsl, IntoColor, Srgb};

// ---------------------------------------------------------------------------
// Palette generator
// ---------------------------------------------------------------------------

/// Fixed display colours for cluster labels, reused cyclically.
const BASE_COLORS: [Srgb<u8>; 10] = [
    named::RED,
    named::BLUE,
    named::GREEN,
    named::ORANGE,
    named::PURPLE,
    named::BROWN,
    named::PINK,
    named::GRAY,
    named::OLIVE,
    named::CYAN,
];

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_colors(n: usize) -> Vec<Srgb<u8>> {
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            rgb.into_format::<u8>()
        })
        .collect()
}

/// `#rrggbb` form of a colour, as the presentation layer expects it.
pub fn to_hex(color: Srgb<u8>) -> String {
    format!("#{:02x}{:02x}{:02x}", color.red, color.green, color.blue)
}

// ---------------------------------------------------------------------------
// Palette: cluster label → colour
// ---------------------------------------------------------------------------

/// Ordered list of display colours; label `l` maps to `colors[l % len]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    colors: Vec<Srgb<u8>>,
}

impl Default for Palette {
    fn default() -> Self {
        Palette {
            colors: BASE_COLORS.to_vec(),
        }
    }
}

impl Palette {
    /// The first `n` base colours, or `n` evenly spaced hues when `n`
    /// exceeds the base set. `n` is clamped to at least one entry.
    pub fn with_size(n: usize) -> Self {
        let n = n.max(1);
        if n <= BASE_COLORS.len() {
            Palette {
                colors: BASE_COLORS[..n].to_vec(),
            }
        } else {
            Self::evenly_spaced(n)
        }
    }

    pub fn evenly_spaced(n: usize) -> Self {
        let colors = generate_colors(n.max(1));
        Palette { colors }
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Colour for a cluster label; labels past the end wrap around.
    pub fn color_for(&self, label: usize) -> Srgb<u8> {
        self.colors[label % self.colors.len()]
    }

    pub fn hex_for(&self, label: usize) -> String {
        to_hex(self.color_for(label))
    }
}
