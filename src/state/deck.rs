//! Card and deck construction.
//!
//! Builds a shuffled deck of pairs and annotates each card with cosmetic
//! placement data. Game rules only ever look at `pair_key`, `flipped` and
//! `matched`.

use super::rng::GameRng;

/// How cards are laid out on the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Layout {
    /// Tight grid
    #[default]
    Tight,
    /// Grid with extra spacing and jitter
    Loose,
    /// One pile
    Stacked,
}

impl Layout {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Tight),
            1 => Some(Self::Loose),
            2 => Some(Self::Stacked),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tight => "tight",
            Self::Loose => "loose",
            Self::Stacked => "stacked",
        }
    }
}

/// How much cards are rotated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    #[default]
    Straight,
    Slight,
    Wild,
}

impl Rotation {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Straight),
            1 => Some(Self::Slight),
            2 => Some(Self::Wild),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Straight => "none",
            Self::Slight => "some",
            Self::Wild => "lots",
        }
    }

    /// Maximum absolute angle in degrees.
    fn max_angle(&self) -> f32 {
        match self {
            Self::Straight => 0.0,
            Self::Slight => 12.0,
            Self::Wild => 45.0,
        }
    }
}

/// Cosmetic deck parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cosmetics {
    /// Card-set id, interpreted by the client
    pub card_set: u32,
    pub layout: Layout,
    pub rotation: Rotation,
}

/// Where a card sits on the table, in cell units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
    /// Rotation in degrees
    pub angle: f32,
}

impl Placement {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({"x": self.x, "y": self.y, "angle": self.angle})
    }
}

/// A single card.
#[derive(Debug, Clone)]
pub struct Card {
    /// Position in the deck
    pub index: usize,
    /// Shared with exactly one other card
    pub pair_key: usize,
    pub flipped: bool,
    pub matched: bool,
    pub placement: Placement,
}

impl Card {
    /// Client view. The pair key is only revealed while the card is face up.
    pub fn to_json(&self) -> serde_json::Value {
        let mut obj = serde_json::json!({
            "index": self.index,
            "flipped": self.flipped,
            "matched": self.matched,
            "placement": self.placement.to_json()
        });
        if self.flipped || self.matched {
            obj["pair_key"] = serde_json::json!(self.pair_key);
        }
        obj
    }
}

/// Build a shuffled deck of `pair_count` pairs.
pub fn build_deck(pair_count: usize, cosmetics: Cosmetics, rng: &mut GameRng) -> Vec<Card> {
    let mut keys: Vec<usize> = (0..pair_count).flat_map(|k| [k, k]).collect();
    rng.shuffle(&mut keys);

    let total = keys.len();
    let columns = grid_columns(total);

    keys.into_iter()
        .enumerate()
        .map(|(index, pair_key)| Card {
            index,
            pair_key,
            flipped: false,
            matched: false,
            placement: place(index, columns, cosmetics, rng),
        })
        .collect()
}

/// Columns of a roughly square grid holding `total` cards.
fn grid_columns(total: usize) -> usize {
    let mut columns = 1;
    while columns * columns < total {
        columns += 1;
    }
    columns
}

fn place(index: usize, columns: usize, cosmetics: Cosmetics, rng: &mut GameRng) -> Placement {
    let max_angle = cosmetics.rotation.max_angle();
    let angle = if max_angle > 0.0 {
        rng.gen_range_f32(-max_angle..max_angle)
    } else {
        0.0
    };

    let (x, y) = match cosmetics.layout {
        Layout::Tight => ((index % columns) as f32, (index / columns) as f32),
        Layout::Loose => {
            let jitter_x = rng.gen_range_f32(-0.15..0.15);
            let jitter_y = rng.gen_range_f32(-0.15..0.15);
            (
                (index % columns) as f32 * 1.4 + jitter_x,
                (index / columns) as f32 * 1.4 + jitter_y,
            )
        }
        Layout::Stacked => (rng.gen_range_f32(-0.5..0.5), rng.gen_range_f32(-0.5..0.5)),
    };

    Placement { x, y, angle }
}
