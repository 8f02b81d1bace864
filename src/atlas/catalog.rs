//! Extract named region outlines from an SVG map document
//!
//! Only `<path>` elements are considered. The region name comes from the first
//! of `data-name`, `title`, `id` or `class` that is present; names taken from
//! identifiers are prettified ("united_kingdom" -> "United Kingdom").

use nom::branch::alt;
use nom::bytes::complete::{tag, take_till, take_while1};
use nom::character::complete::{char, multispace0, multispace1};
use nom::multi::many0;
use nom::sequence::{delimited, preceded, separated_pair};
use nom::{IResult, Parser};
use std::collections::BTreeMap;
use std::path::Path;

use crate::core::types::RegionId;

/// Region outlines keyed by region name
#[derive(Debug, Clone, Default)]
pub struct GeometryCatalog {
    paths: BTreeMap<RegionId, String>,
}

impl GeometryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a path; returns false if the name is already taken
    pub fn insert(&mut self, region: RegionId, path: impl Into<String>) -> bool {
        if self.paths.contains_key(&region) {
            return false;
        }
        self.paths.insert(region, path.into());
        true
    }

    pub fn get(&self, region: &RegionId) -> Option<&str> {
        self.paths.get(region).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RegionId, &str)> {
        self.paths.iter().map(|(id, path)| (id, path.as_str()))
    }

    /// Read and scan an SVG file
    pub fn load(path: &Path) -> crate::core::Result<Self> {
        let document = std::fs::read_to_string(path)?;
        Ok(extract_region_paths(&document))
    }
}

/// Turn an identifier into a display name: `-`/`_` become spaces and each
/// word starts upper-case
pub fn normalize_region_name(raw: &str) -> String {
    raw.replace(['-', '_'], " ")
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

fn attribute_name(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || matches!(c, '-' | '_' | ':' | '.')).parse(input)
}

fn quoted(input: &str) -> IResult<&str, &str> {
    alt((
        delimited(char('"'), take_till(|c| c == '"'), char('"')),
        delimited(char('\''), take_till(|c| c == '\''), char('\'')),
    ))
    .parse(input)
}

fn attribute(input: &str) -> IResult<&str, (&str, &str)> {
    preceded(
        multispace1,
        separated_pair(attribute_name, (multispace0, char('='), multispace0), quoted),
    )
    .parse(input)
}

/// `<path` followed by its attribute list (the closing `>` is not consumed)
fn path_element(input: &str) -> IResult<&str, Vec<(&str, &str)>> {
    preceded(tag("<path"), many0(attribute)).parse(input)
}

fn region_name(attributes: &[(&str, &str)]) -> Option<String> {
    let find = |key: &str| {
        attributes
            .iter()
            .find(|(name, value)| *name == key && !value.trim().is_empty())
            .map(|(_, value)| value.trim())
    };

    if let Some(name) = find("data-name").or_else(|| find("title")) {
        return Some(name.to_string());
    }
    find("id")
        .or_else(|| find("class"))
        .map(normalize_region_name)
        .filter(|name| !name.is_empty())
}

/// Scan an SVG document for named `<path>` elements.
///
/// Paths without outline data or without any usable name are skipped. When
/// two paths share a name the first one wins.
pub fn extract_region_paths(document: &str) -> GeometryCatalog {
    let mut catalog = GeometryCatalog::new();
    let mut rest = document;

    while let Some(start) = rest.find("<path") {
        let candidate = &rest[start..];
        rest = &candidate[5..];

        let Ok((_, attributes)) = path_element(candidate) else {
            continue;
        };
        // Guard against e.g. `<pathway`: the tag must end or have attributes
        let after = &candidate[5..];
        if attributes.is_empty() && !after.trim_start().starts_with(['/', '>']) {
            continue;
        }

        let outline = attributes
            .iter()
            .find(|(name, _)| *name == "d")
            .map(|(_, value)| value.trim())
            .filter(|d| !d.is_empty());
        let (Some(outline), Some(name)) = (outline, region_name(&attributes)) else {
            continue;
        };

        if !catalog.insert(RegionId::new(name.clone()), outline) {
            tracing::debug!(region = %name, "duplicate region outline ignored");
        }
    }

    tracing::debug!(regions = catalog.len(), "extracted region outlines");
    catalog
}

#[cfg(test)]
mod tests {
    use super::*;

    const SVG: &str = r#"<svg xmlns="http://www.w3.org/2000/svg">
  <g id="countries">
    <path id="united_kingdom" d="M0,0H10V10H0Z"/>
    <path data-name="Côte d'Ivoire" id="civ" d="M20,0H30V10H20Z" />
    <path title="Spain" class="land" d="M40,0 H50 V10 H40 Z"></path>
    <path class="north-korea" d='M60,0H70V10H60Z'/>
    <path id="no-outline"/>
    <path d="M80,0H90V10H80Z"/>
    <path id="United_Kingdom" d="M0,0H1V1H0Z"/>
  </g>
</svg>"#;

    #[test]
    fn test_name_precedence() {
        let catalog = extract_region_paths(SVG);
        let names: Vec<&str> = catalog.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(names, vec!["Côte d'Ivoire", "North Korea", "Spain", "United Kingdom"]);
    }

    #[test]
    fn test_first_duplicate_wins() {
        let catalog = extract_region_paths(SVG);
        assert_eq!(
            catalog.get(&RegionId::new("United Kingdom")),
            Some("M0,0H10V10H0Z")
        );
    }

    #[test]
    fn test_normalize_region_name() {
        assert_eq!(normalize_region_name("united_kingdom"), "United Kingdom");
        assert_eq!(normalize_region_name("bosnia-and-herzegovina"), "Bosnia And Herzegovina");
        assert_eq!(normalize_region_name("France"), "France");
    }

    #[test]
    fn test_non_path_elements_ignored() {
        let catalog = extract_region_paths(r#"<pathway id="x" d="M0,0H1V1Z"/><rect id="y"/>"#);
        assert!(catalog.is_empty());
    }
}
