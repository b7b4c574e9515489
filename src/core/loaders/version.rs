use std::fmt;

use crate::core::error::{InstallerError, InstallerResult};

/// A Minecraft release number such as `1.12.2` or `1.20`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameVersion {
    pub raw: String,
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl GameVersion {
    pub fn parse(raw: &str) -> InstallerResult<Self> {
        let raw = raw.trim();
        let parts: Vec<&str> = raw.split('.').collect();
        if parts.len() < 2 {
            return Err(invalid(raw, "expected major.minor[.patch]"));
        }

        let mut numbers = Vec::with_capacity(parts.len());
        for part in &parts {
            numbers.push(part.parse::<u32>().map_err(|_| invalid(raw, "non-numeric segment"))?);
        }

        Ok(Self {
            raw: raw.to_string(),
            major: numbers[0],
            minor: numbers[1],
            patch: numbers.get(2).copied().unwrap_or(0),
        })
    }

    /// Whether this release is at least `major.minor.patch`.
    pub fn at_least(&self, major: u32, minor: u32, patch: u32) -> bool {
        (self.major, self.minor, self.patch) >= (major, minor, patch)
    }
}

impl fmt::Display for GameVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// A Forge-family loader version (`14.23.5.2860`, `47.2.0`, `20.4.80-beta`).
///
/// `raw` is the version as it appears in artifact names, without any leading
/// `{game}-` prefix. `minor` folds the second and third segments together for
/// four-part versions so builds compare the way Forge numbers them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderVersion {
    pub raw: String,
    pub major: u32,
    pub minor: u32,
    pub build: u32,
}

impl LoaderVersion {
    pub fn parse(raw: &str, game: &GameVersion) -> InstallerResult<Self> {
        let input = raw.trim();
        let bare = strip_game_prefix(input, game);

        // `20.4.80-beta` and `10.13.4.1614-1.7.10` carry a trailing qualifier.
        let numeric = bare.split('-').next().unwrap_or(bare);
        let parts: Vec<&str> = numeric.split('.').collect();
        if parts.len() < 3 {
            return Err(invalid(input, "expected at least three segments"));
        }

        let number = |s: &str| s.parse::<u32>().map_err(|_| invalid(input, "non-numeric segment"));

        let major = number(parts[0])?;
        let minor = if parts.len() == 4 {
            number(&format!("{:0>2}{:0>2}", parts[1], parts[2]))?
        } else {
            number(parts[1])?
        };
        let build = number(parts[parts.len() - 1])?;

        Ok(Self {
            raw: bare.to_string(),
            major,
            minor,
            build,
        })
    }
}

impl fmt::Display for LoaderVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Drop a leading `{game}-` from `1.12.2-14.23.5.2851`. The prefix only has to
/// name the same major.minor release as `game`, so `1.12` targets still match.
fn strip_game_prefix<'a>(input: &'a str, game: &GameVersion) -> &'a str {
    let Some((prefix, rest)) = input.split_once('-') else {
        return input;
    };
    if prefix.split('.').count() > 3 {
        return input;
    }
    match GameVersion::parse(prefix) {
        Ok(v) if v.major == game.major && v.minor == game.minor => rest,
        _ => input,
    }
}

fn invalid(raw: &str, reason: &str) -> InstallerError {
    InstallerError::InvalidVersion {
        raw: raw.to_string(),
        reason: reason.to_string(),
    }
}
