//! The five fixed news categories and their naming conventions.
//!
//! A category is stored on records by its full name, abbreviated to two
//! letters for directory names, and reduced to a single prefix letter for
//! registration identifiers (`REG_NOTICIA`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Lavagem de Dinheiro")]
    MoneyLaundering,
    #[serde(rename = "Crime")]
    Crime,
    #[serde(rename = "Fraude")]
    Fraud,
    #[serde(rename = "Empresarial")]
    Corporate,
    #[serde(rename = "Ambiental")]
    Environmental,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::MoneyLaundering,
        Category::Crime,
        Category::Fraud,
        Category::Corporate,
        Category::Environmental,
    ];

    /// Name as stored in the `CATEGORIA` column.
    pub fn full_name(self) -> &'static str {
        match self {
            Category::MoneyLaundering => "Lavagem de Dinheiro",
            Category::Crime => "Crime",
            Category::Fraud => "Fraude",
            Category::Corporate => "Empresarial",
            Category::Environmental => "Ambiental",
        }
    }

    /// Two-letter directory name under the media and remote bases.
    pub fn abbreviation(self) -> &'static str {
        match self {
            Category::MoneyLaundering => "LD",
            Category::Crime => "CR",
            Category::Fraud => "FF",
            Category::Corporate => "SE",
            Category::Environmental => "SA",
        }
    }

    /// Leading letter of registration identifiers. `N` is shared by
    /// money-laundering and fraud.
    pub fn path_prefix(self) -> char {
        match self {
            Category::MoneyLaundering => 'N',
            Category::Crime => 'C',
            Category::Fraud => 'N',
            Category::Corporate => 'E',
            Category::Environmental => 'A',
        }
    }

    /// `TIPO_SUSPEITA` written to the auxiliary index.
    pub fn suspicion_type(self) -> &'static str {
        match self {
            Category::MoneyLaundering => "Lavagem de Dinheiro",
            Category::Crime => "Crimes",
            Category::Fraud => "Fraude Financeira",
            Category::Corporate => "Saúde Empresarial",
            Category::Environmental => "SocioAmbiental",
        }
    }

    /// `TIPO_INFORMACAO` written to the auxiliary index.
    pub fn information_type(self) -> &'static str {
        match self {
            Category::MoneyLaundering | Category::Fraud => "DTECFLEX",
            Category::Crime => "DTECCRIM",
            Category::Corporate => "DTECEMP",
            Category::Environmental => "DTECAMB",
        }
    }

    /// (abbreviation, prefix letter, full name).
    pub fn triple(self) -> (&'static str, char, &'static str) {
        (self.abbreviation(), self.path_prefix(), self.full_name())
    }

    pub fn from_full_name(name: &str) -> Option<Category> {
        Self::ALL.into_iter().find(|c| c.full_name() == name)
    }

    /// Case-insensitive lookup by two-letter abbreviation.
    pub fn from_abbreviation(abbr: &str) -> Option<Category> {
        Self::ALL
            .into_iter()
            .find(|c| c.abbreviation().eq_ignore_ascii_case(abbr))
    }

    /// Accepts a full name or an abbreviation, ignoring surrounding whitespace.
    pub fn normalize(input: &str) -> Result<Category, ValidationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::InvalidCategory(input.to_string()));
        }

        Self::from_full_name(trimmed)
            .or_else(|| Self::from_abbreviation(trimmed))
            .ok_or_else(|| ValidationError::InvalidCategory(input.to_string()))
    }

    /// Blank or missing input means "every category".
    pub fn normalize_optional(input: Option<&str>) -> Result<Option<Category>, ValidationError> {
        match input {
            Some(s) if !s.trim().is_empty() => Category::normalize(s).map(Some),
            _ => Ok(None),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.full_name())
    }
}

impl FromStr for Category {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::normalize(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_full_names() {
        for category in Category::ALL {
            assert_eq!(Category::normalize(category.full_name()).unwrap(), category);
        }
    }

    #[test]
    fn test_normalize_abbreviation_any_case_round_trips() {
        for category in Category::ALL {
            let abbr = category.abbreviation();
            for input in [abbr.to_string(), abbr.to_lowercase(), format!(" {} ", abbr)] {
                let normalized = Category::normalize(&input).unwrap();
                let back = Category::from_abbreviation(normalized.abbreviation()).unwrap();
                assert_eq!(back.full_name(), category.full_name());
            }
        }
    }

    #[test]
    fn test_normalize_mixed_case_abbreviation() {
        assert_eq!(Category::normalize("Cr").unwrap(), Category::Crime);
        assert_eq!(Category::normalize("sA").unwrap(), Category::Environmental);
    }

    #[test]
    fn test_normalize_rejects_empty_and_unknown() {
        assert_eq!(
            Category::normalize(""),
            Err(ValidationError::InvalidCategory(String::new()))
        );
        assert_eq!(
            Category::normalize("XX"),
            Err(ValidationError::InvalidCategory("XX".to_string()))
        );
        assert!(Category::normalize("   ").is_err());
        assert!(Category::normalize("crime").is_err());
    }

    #[test]
    fn test_fixed_table() {
        assert_eq!(Category::MoneyLaundering.triple(), ("LD", 'N', "Lavagem de Dinheiro"));
        assert_eq!(Category::Crime.triple(), ("CR", 'C', "Crime"));
        assert_eq!(Category::Fraud.triple(), ("FF", 'N', "Fraude"));
        assert_eq!(Category::Corporate.triple(), ("SE", 'E', "Empresarial"));
        assert_eq!(Category::Environmental.triple(), ("SA", 'A', "Ambiental"));
    }

    #[test]
    fn test_publish_mapping() {
        assert_eq!(Category::Crime.suspicion_type(), "Crimes");
        assert_eq!(Category::Crime.information_type(), "DTECCRIM");
        assert_eq!(Category::Fraud.information_type(), "DTECFLEX");
        assert_eq!(Category::Corporate.suspicion_type(), "Saúde Empresarial");
    }

    #[test]
    fn test_serde_uses_full_name() {
        let json = serde_json::to_string(&Category::MoneyLaundering).unwrap();
        assert_eq!(json, "\"Lavagem de Dinheiro\"");
        let parsed: Category = serde_json::from_str("\"Ambiental\"").unwrap();
        assert_eq!(parsed, Category::Environmental);
    }
}
