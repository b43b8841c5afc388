// src/matching/address.rs
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

const STREET_SUFFIXES: [(&str, &str); 24] = [
    ("st", "street"), ("str", "street"), ("street", "street"),
    ("rd", "road"), ("road", "road"),
    ("ave", "avenue"), ("av", "avenue"), ("avenue", "avenue"),
    ("blvd", "boulevard"), ("blv", "boulevard"), ("boulevard", "boulevard"),
    ("dr", "drive"), ("drive", "drive"),
    ("ln", "lane"), ("lane", "lane"),
    ("ct", "court"), ("court", "court"),
    ("pl", "place"), ("place", "place"),
    ("pkwy", "parkway"), ("parkway", "parkway"),
    ("hwy", "highway"), ("highway", "highway"),
    ("way", "way"),
];

const DIRECTIONALS: [(&str, &str); 8] = [
    ("n", "north"), ("s", "south"), ("e", "east"), ("w", "west"),
    ("ne", "northeast"), ("nw", "northwest"), ("se", "southeast"), ("sw", "southwest"),
];

const UNIT_DESIGNATORS: [(&str, &str); 11] = [
    ("#", "apt"), ("apt", "apt"), ("apartment", "apt"),
    ("ste", "ste"), ("suite", "ste"), ("unit", "unit"),
    ("bldg", "bldg"), ("building", "bldg"),
    ("fl", "fl"), ("floor", "fl"), ("room", "rm"),
];

const STATES: [(&str, &str); 51] = [
    ("al", "alabama"), ("ak", "alaska"), ("az", "arizona"), ("ar", "arkansas"),
    ("ca", "california"), ("co", "colorado"), ("ct", "connecticut"), ("de", "delaware"),
    ("dc", "district of columbia"), ("fl", "florida"), ("ga", "georgia"), ("hi", "hawaii"),
    ("id", "idaho"), ("il", "illinois"), ("in", "indiana"), ("ia", "iowa"),
    ("ks", "kansas"), ("ky", "kentucky"), ("la", "louisiana"), ("me", "maine"),
    ("md", "maryland"), ("ma", "massachusetts"), ("mi", "michigan"), ("mn", "minnesota"),
    ("ms", "mississippi"), ("mo", "missouri"), ("mt", "montana"), ("ne", "nebraska"),
    ("nv", "nevada"), ("nh", "new hampshire"), ("nj", "new jersey"), ("nm", "new mexico"),
    ("ny", "new york"), ("nc", "north carolina"), ("nd", "north dakota"), ("oh", "ohio"),
    ("ok", "oklahoma"), ("or", "oregon"), ("pa", "pennsylvania"), ("ri", "rhode island"),
    ("sc", "south carolina"), ("sd", "south dakota"), ("tn", "tennessee"), ("tx", "texas"),
    ("ut", "utah"), ("vt", "vermont"), ("va", "virginia"), ("wa", "washington"),
    ("wv", "west virginia"), ("wi", "wisconsin"), ("wy", "wyoming"),
];

static ZIP: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{5}(-\d{4})?$").expect("static zip regex"));
static ADDRESS_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+[a-z]?$|^\d+-\d+$").expect("static number regex"));

/// Tagged components of a US-style street address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressComponents {
    pub number: String,
    pub street: String,
    pub unit: String,
    pub city: String,
    pub state: String,
    pub zip: String,
}

impl AddressComponents {
    fn is_empty(&self) -> bool {
        self.number.is_empty() && self.street.is_empty() && self.city.is_empty() && self.zip.is_empty()
    }

    fn joined(&self) -> String {
        [&self.number, &self.street, &self.unit, &self.city, &self.state, &self.zip]
            .iter()
            .filter(|s| !s.is_empty())
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Tags the address and joins the tagged values in canonical order,
/// lowercase. Returns an empty string when nothing could be tagged.
pub fn normalize_address(address: &str) -> String {
    match tag_address(address) {
        Some(components) => components.joined(),
        None => {
            debug!("Address '{}' could not be tagged, considered unusable.", address);
            String::new()
        }
    }
}

pub fn tag_address(address: &str) -> Option<AddressComponents> {
    let lower = address.to_lowercase().replace('#', " # ");
    let mut segments: Vec<Vec<String>> = lower
        .split([',', '\n', ';'])
        .map(|segment| {
            segment
                .split_whitespace()
                .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric() && c != '#' && c != '-').to_string())
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
        })
        .filter(|tokens| !tokens.is_empty())
        .collect();

    if segments.is_empty() {
        return None;
    }

    let mut components = AddressComponents::default();
    take_zip_and_state(&mut segments, &mut components);
    segments.retain(|s| !s.is_empty());
    if segments.is_empty() {
        return (!components.zip.is_empty()).then_some(components);
    }

    let (street_tokens, city_tokens): (Vec<String>, Vec<String>) = if segments.len() > 1 {
        let mut street = segments.remove(0);
        let mut city = Vec::new();
        for segment in segments {
            if unit_designator(&segment[0]).is_some() {
                street.extend(segment);
            } else {
                city.extend(segment);
            }
        }
        (street, city)
    } else {
        split_single_line(segments.remove(0))
    };

    tag_street_line(street_tokens, &mut components);
    components.city = city_tokens.join(" ");

    if components.is_empty() {
        None
    } else {
        Some(components)
    }
}

fn take_zip_and_state(segments: &mut [Vec<String>], components: &mut AddressComponents) {
    let multi_segment = segments.len() > 1;
    let Some(last) = segments.last_mut() else {
        return;
    };

    if last.last().is_some_and(|t| ZIP.is_match(t)) {
        components.zip = last.pop().unwrap_or_default();
    }

    // Without a zip or a separate segment, "ct" or "washington" is more likely part of the street.
    if !multi_segment && components.zip.is_empty() {
        return;
    }

    for words in [2, 3, 1] {
        if last.len() < words {
            continue;
        }
        let candidate = last[last.len() - words..].join(" ");
        let state = STATES
            .iter()
            .find(|(abbr, name)| (words == 1 && *abbr == candidate) || *name == candidate);
        if let Some((abbr, _)) = state {
            components.state = abbr.to_string();
            last.truncate(last.len() - words);
            break;
        }
    }
}

/// Splits a comma-less address after the street suffix (and any unit that follows it).
fn split_single_line(tokens: Vec<String>) -> (Vec<String>, Vec<String>) {
    let suffix_idx = tokens
        .iter()
        .enumerate()
        .skip(1)
        .filter(|(_, t)| street_suffix(t).is_some())
        .map(|(i, _)| i)
        .last();

    let Some(mut end) = suffix_idx.map(|i| i + 1) else {
        return (tokens, Vec::new());
    };
    if end < tokens.len() && unit_designator(&tokens[end]).is_some() {
        end = (end + 2).min(tokens.len());
    }
    let mut street = tokens;
    let city = street.split_off(end);
    (street, city)
}

fn tag_street_line(tokens: Vec<String>, components: &mut AddressComponents) {
    let mut street = Vec::new();
    let mut unit = Vec::new();
    let mut iter = tokens.into_iter().peekable();

    if let Some(first) = iter.peek() {
        if ADDRESS_NUMBER.is_match(first) {
            components.number = iter.next().unwrap_or_default();
        }
    }

    while let Some(token) = iter.next() {
        if let Some(designator) = unit_designator(&token) {
            unit.push(designator.to_string());
            if let Some(id) = iter.next() {
                unit.push(id);
            }
            continue;
        }
        street.push(token);
    }

    let last_idx = street.len().saturating_sub(1);
    components.street = street
        .iter()
        .enumerate()
        .map(|(i, t)| {
            if i == last_idx && i > 0 {
                street_suffix(t).unwrap_or(t).to_string()
            } else {
                directional(t).unwrap_or(t).to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ");
    components.unit = unit.join(" ");
}

fn street_suffix(token: &str) -> Option<&'static str> {
    STREET_SUFFIXES.iter().find(|(abbr, _)| *abbr == token).map(|(_, full)| *full)
}

fn directional(token: &str) -> Option<&'static str> {
    DIRECTIONALS.iter().find(|(abbr, _)| *abbr == token).map(|(_, full)| *full)
}

fn unit_designator(token: &str) -> Option<&'static str> {
    UNIT_DESIGNATORS.iter().find(|(raw, _)| *raw == token).map(|(_, canonical)| *canonical)
}
