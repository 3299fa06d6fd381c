//! Static palette data and the state-to-color table.

use rand::Rng;

/// Maximum per-channel perturbation applied to colors that wrap past the
/// palette length.
const JITTER: f32 = 0.05;

pub struct Palette {
    pub name: &'static str,
    pub colors: &'static [&'static str],
}

/// The built-in palettes, consumed read-only. Each entry is an ordered list
/// of `RRGGBB` hex colors assigned to states cyclically.
pub const PALETTES: &[Palette] = &[
    Palette {
        name: "ember",
        colors: &["0b0c10", "5c1a1b", "a63c06", "f2a65a", "f58549", "eec170"],
    },
    Palette {
        name: "tide",
        colors: &["03045e", "0077b6", "00b4d8", "90e0ef", "caf0f8"],
    },
    Palette {
        name: "moss",
        colors: &["081c15", "1b4332", "2d6a4f", "52b788", "b7e4c7", "d8f3dc"],
    },
    Palette {
        name: "dusk",
        colors: &["10002b", "3c096c", "7b2cbf", "c77dff", "e0aaff"],
    },
    Palette {
        name: "signal",
        colors: &["000000", "ff595e", "ffca3a", "8ac926", "1982c4", "6a4c93"],
    },
    Palette {
        name: "paper",
        colors: &["fdfcdc", "fed9b7", "f07167", "0081a7", "00afb9"],
    },
];

/// Parse an `RRGGBB` hex string into normalized RGB. Malformed entries map
/// to black rather than failing; palette data is static and covered by a
/// test.
fn parse_hex(hex: &str) -> [f32; 3] {
    let channel = |i: usize| {
        u8::from_str_radix(hex.get(i..i + 2).unwrap_or("00"), 16).unwrap_or(0) as f32 / 255.0
    };
    [channel(0), channel(2), channel(4)]
}

/// Per-state display colors, one normalized RGB triple per state index.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorTable {
    pub colors: Vec<[f32; 3]>,
}

impl ColorTable {
    /// Assign palette colors cyclically across `n_states`. Indices past the
    /// palette's natural length get a small random perturbation so repeated
    /// hues stay distinguishable.
    pub fn generate<R: Rng>(palette: &Palette, n_states: usize, rng: &mut R) -> Self {
        let base: Vec<[f32; 3]> = palette.colors.iter().map(|h| parse_hex(h)).collect();
        let colors = (0..n_states)
            .map(|i| {
                let mut c = base[i % base.len()];
                if i >= base.len() {
                    for ch in &mut c {
                        *ch = (*ch + rng.gen_range(-JITTER..=JITTER)).clamp(0.0, 1.0);
                    }
                }
                c
            })
            .collect();
        Self { colors }
    }

    /// Map a grid of states to colors. Pure; used by the display-idempotence
    /// test as the CPU mirror of the display shader.
    pub fn map_cells(&self, grid: &[u8]) -> Vec<[f32; 3]> {
        grid.iter().map(|&s| self.colors[s as usize]).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::thread_rng;

    #[test]
    fn palette_data_parses_cleanly() {
        for palette in PALETTES {
            assert!(!palette.colors.is_empty());
            for hex in palette.colors {
                assert_eq!(hex.len(), 6, "palette {} has a malformed entry", palette.name);
                assert!(u32::from_str_radix(hex, 16).is_ok());
            }
        }
    }

    #[test]
    fn channels_stay_normalized() {
        let mut rng = thread_rng();
        for palette in PALETTES {
            let table = ColorTable::generate(palette, 64, &mut rng);
            assert_eq!(table.colors.len(), 64);
            for c in &table.colors {
                assert!(c.iter().all(|v| (0.0..=1.0).contains(v)));
            }
        }
    }

    #[test]
    fn wrapped_colors_stay_near_their_base() {
        let mut rng = thread_rng();
        let palette = &PALETTES[0];
        let table = ColorTable::generate(palette, palette.colors.len() * 3, &mut rng);
        for (i, c) in table.colors.iter().enumerate() {
            let base = parse_hex(palette.colors[i % palette.colors.len()]);
            for (got, want) in c.iter().zip(base.iter()) {
                assert!((got - want).abs() <= JITTER + 1e-6);
            }
        }
    }

    #[test]
    fn colors_below_palette_length_are_exact() {
        let mut rng = thread_rng();
        let palette = &PALETTES[1];
        let table = ColorTable::generate(palette, palette.colors.len(), &mut rng);
        for (i, hex) in palette.colors.iter().enumerate() {
            assert_eq!(table.colors[i], parse_hex(hex));
        }
    }

    #[test]
    fn mapping_the_same_grid_twice_is_identical() {
        let mut rng = thread_rng();
        let table = ColorTable::generate(&PALETTES[2], 16, &mut rng);
        let grid: Vec<u8> = (0..256u16).map(|i| (i % 16) as u8).collect();
        assert_eq!(table.map_cells(&grid), table.map_cells(&grid));
    }
}
