//! Game creation parameters.
//!
//! Turns the loosely-typed query parameters of a creation request into a
//! [`GameParams`]. Parsing never fails: every missing or invalid value is
//! replaced by its default and reported as a [`ParamWarning`].
//!
//! | key  | meaning                                   | default            |
//! |------|-------------------------------------------|--------------------|
//! | `n`  | pair count                                | configured default |
//! | `t`  | mode, `1` classic / `2` rush              | configured default |
//! | `m`  | max players, `0` or `∞` for unlimited     | configured default |
//! | `ct` | card-set id                               | `0`                |
//! | `cl` | layout, `0` tight / `1` loose / `2` stack | `0`                |
//! | `cr` | rotation, `0` none / `1` some / `2` lots  | `0`                |

use std::collections::HashMap;
use std::fmt;

use super::deck::{Cosmetics, Layout, Rotation};
use super::game::GameMode;
use crate::config::GameSettings;

/// Typed, validated creation parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameParams {
    pub pair_count: usize,
    pub mode: GameMode,
    /// 0 means unlimited
    pub max_players: usize,
    pub cosmetics: Cosmetics,
}

impl GameParams {
    /// Parameters built entirely from configured defaults.
    pub fn defaults(settings: &GameSettings) -> Self {
        Self {
            pair_count: settings.default_pair_count,
            mode: settings.default_mode,
            max_players: settings.default_max_players,
            cosmetics: Cosmetics::default(),
        }
    }

    /// Parse query parameters, substituting defaults for bad values.
    pub fn from_query(
        query: &HashMap<String, String>,
        settings: &GameSettings,
    ) -> (Self, Vec<ParamWarning>) {
        let mut params = Self::defaults(settings);
        let mut warnings = Vec::new();
        let mut warn = |key: &'static str, value: Option<&String>, fallback: String| {
            warnings.push(ParamWarning {
                key,
                value: value.cloned(),
                fallback,
            });
        };

        let n = query.get("n");
        match n.and_then(|v| v.trim().parse::<usize>().ok()) {
            Some(count) if count >= 1 => params.pair_count = count,
            _ => warn("n", n, params.pair_count.to_string()),
        }

        let t = query.get("t");
        match t.and_then(|v| v.trim().parse::<i64>().ok()).and_then(GameMode::from_code) {
            Some(mode) => params.mode = mode,
            None => warn("t", t, params.mode.as_str().to_string()),
        }

        let m = query.get("m");
        match m.map(|v| v.trim()) {
            Some("∞") => params.max_players = 0,
            Some(v) => match v.parse::<usize>() {
                Ok(max) => params.max_players = max,
                Err(_) => warn("m", m, params.max_players.to_string()),
            },
            None => warn("m", m, params.max_players.to_string()),
        }

        let ct = query.get("ct");
        match ct.and_then(|v| v.trim().parse::<u32>().ok()) {
            Some(card_set) => params.cosmetics.card_set = card_set,
            None => warn("ct", ct, "0".to_string()),
        }

        let cl = query.get("cl");
        match cl.and_then(|v| v.trim().parse::<i64>().ok()).and_then(Layout::from_code) {
            Some(layout) => params.cosmetics.layout = layout,
            None => warn("cl", cl, Layout::default().as_str().to_string()),
        }

        let cr = query.get("cr");
        match cr.and_then(|v| v.trim().parse::<i64>().ok()).and_then(Rotation::from_code) {
            Some(rotation) => params.cosmetics.rotation = rotation,
            None => warn("cr", cr, Rotation::default().as_str().to_string()),
        }

        (params, warnings)
    }
}

/// A parameter that was missing or invalid and replaced by a default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamWarning {
    pub key: &'static str,
    /// Raw value, `None` when missing
    pub value: Option<String>,
    pub fallback: String,
}

impl fmt::Display for ParamWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(v) => write!(f, "invalid {} {:?}, defaulting to {}", self.key, v, self.fallback),
            None => write!(f, "missing {}, defaulting to {}", self.key, self.fallback),
        }
    }
}
