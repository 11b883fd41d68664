//! `{{coord}}` template parsing
//!
//! Handles the two common forms of the geographical coordinates template:
//! sexagesimal (`{{coord|57|18|22|N|4|27|32|W}}`) and decimal
//! (`{{coord|44.112|N|87.913|W}}` or `{{coord|44.112|-87.913}}`).

use super::{cached, strip_comments, strip_nowiki};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use thiserror::Error;

static RE_COORD: OnceLock<Option<Regex>> = OnceLock::new();

/// A position in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coord {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordError {
    #[error("No coord data found")]
    NotFound,

    #[error("Malformed coord template: {0}")]
    Malformed(String),

    #[error("Invalid latitude: {0}")]
    InvalidLatitude(f64),

    #[error("Invalid longitude: {0}")]
    InvalidLongitude(f64),
}

/// Parse the first `{{coord|...}}` template in an article body
pub fn parse_coords(text: &str) -> Result<Coord, CoordError> {
    let re = cached(&RE_COORD, r"(?i)\{\{coord\|([^}]*)\}\}").ok_or(CoordError::NotFound)?;
    let cleaned = strip_nowiki(&strip_comments(text)).into_owned();
    let caps = re.captures(&cleaned).ok_or(CoordError::NotFound)?;

    let parts: Vec<&str> = caps[1].split('|').map(str::trim).collect();

    // Leading parameters such as `display=` or a region code come before the numbers
    let first = parts
        .iter()
        .position(|p| p.parse::<f64>().is_ok())
        .unwrap_or(parts.len().saturating_sub(1));
    let parts = &parts[first..];

    let coord = match parse_sexagesimal(parts) {
        Some(result) => result?,
        None => parse_decimal(parts)?,
    };

    if coord.lat.abs() > 90.0 {
        return Err(CoordError::InvalidLatitude(coord.lat));
    }
    if coord.lon.abs() > 180.0 {
        return Err(CoordError::InvalidLongitude(coord.lon));
    }
    Ok(coord)
}

fn number(part: &str) -> Result<f64, CoordError> {
    part.parse()
        .map_err(|_| CoordError::Malformed(format!("not a number: {:?}", part)))
}

/// Degrees, minutes, seconds and hemisphere to signed decimal degrees
fn dms(degrees: &str, minutes: &str, seconds: &str, hemisphere: &str) -> Result<f64, CoordError> {
    let value = number(degrees)? + number(minutes)? / 60.0 + number(seconds)? / 3600.0;
    Ok(match hemisphere {
        "S" | "W" => -value,
        _ => value,
    })
}

/// `d|m|s|N/S|d|m|s|E/W`, or `None` if the parts are not in that shape
fn parse_sexagesimal(parts: &[&str]) -> Option<Result<Coord, CoordError>> {
    if parts.len() < 8 {
        return None;
    }
    if !matches!(parts[3], "N" | "S") || !matches!(parts[7], "E" | "W") {
        return None;
    }

    let lat = dms(parts[0], parts[1], parts[2], parts[3]);
    let lon = dms(parts[4], parts[5], parts[6], parts[7]);
    Some(lat.and_then(|lat| lon.map(|lon| Coord { lat, lon })))
}

/// `lat|[N/S]|lon|[E/W]`
fn parse_decimal(parts: &[&str]) -> Result<Coord, CoordError> {
    if parts.len() < 2 {
        return Err(CoordError::NotFound);
    }

    let mut lat = number(parts[0])?;
    let mut rest = &parts[1..];
    match rest.first() {
        Some(&"S") => {
            lat = -lat;
            rest = &rest[1..];
        }
        Some(&"N") => rest = &rest[1..],
        _ => {}
    }

    let Some((lon, rest)) = rest.split_first() else {
        return Err(CoordError::Malformed("missing longitude".into()));
    };
    let mut lon = number(lon)?;
    if rest.first() == Some(&"W") {
        lon = -lon;
    }

    Ok(Coord { lat, lon })
}
