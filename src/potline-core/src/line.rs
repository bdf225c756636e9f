// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Potting lines and their independently addressed components.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AddressError;

/// One of the two physical potting lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Line {
    One,
    Two,
}

impl Line {
    pub const ALL: [Line; 2] = [Line::One, Line::Two];

    /// Line number as printed on the machines (1 or 2).
    pub fn number(self) -> u8 {
        match self {
            Line::One => 1,
            Line::Two => 2,
        }
    }

    /// Position of the line in per-line tables.
    pub fn index(self) -> usize {
        match self {
            Line::One => 0,
            Line::Two => 1,
        }
    }
}

impl TryFrom<u8> for Line {
    type Error = AddressError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Line::One),
            2 => Ok(Line::Two),
            other => Err(AddressError::InvalidLine(other.to_string())),
        }
    }
}

impl From<Line> for u8 {
    fn from(line: Line) -> Self {
        line.number()
    }
}

impl FromStr for Line {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        trimmed
            .parse::<u8>()
            .map_err(|_| AddressError::InvalidLine(trimmed.to_string()))
            .and_then(Line::try_from)
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Sub-unit of a line with its own active-lot register.
///
/// `Pc` is the potting-cell controller, `Os` the outfeed/pallet station.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Component {
    #[default]
    Pc,
    Os,
}

impl Component {
    pub const ALL: [Component; 2] = [Component::Pc, Component::Os];

    pub fn as_str(self) -> &'static str {
        match self {
            Component::Pc => "PC",
            Component::Os => "OS",
        }
    }
}

impl FromStr for Component {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PC" => Ok(Component::Pc),
            "OS" => Ok(Component::Os),
            _ => Err(AddressError::InvalidComponent(s.trim().to_string())),
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
