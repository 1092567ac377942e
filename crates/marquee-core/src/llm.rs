use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Chat models the query endpoint accepts.
///
/// Anything else is rejected before a provider call is made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SupportedModel {
    #[serde(rename = "gpt-3.5-turbo")]
    Gpt35Turbo,
    #[serde(rename = "gpt-4")]
    Gpt4,
    #[serde(rename = "gpt-4-turbo")]
    Gpt4Turbo,
    #[serde(rename = "gpt-4o")]
    Gpt4o,
    #[default]
    #[serde(rename = "gpt-4o-mini")]
    Gpt4oMini,
}

impl SupportedModel {
    pub const ALL: [Self; 5] = [
        Self::Gpt35Turbo,
        Self::Gpt4,
        Self::Gpt4Turbo,
        Self::Gpt4o,
        Self::Gpt4oMini,
    ];

    /// Provider model identifier.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gpt35Turbo => "gpt-3.5-turbo",
            Self::Gpt4 => "gpt-4",
            Self::Gpt4Turbo => "gpt-4-turbo",
            Self::Gpt4o => "gpt-4o",
            Self::Gpt4oMini => "gpt-4o-mini",
        }
    }
}

impl fmt::Display for SupportedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SupportedModel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|model| model.as_str() == wanted)
            .ok_or_else(|| {
                let supported: Vec<&str> = Self::ALL.iter().map(|m| m.as_str()).collect();
                Error::Validation(format!(
                    "unsupported model '{wanted}'; expected one of: {}",
                    supported.join(", ")
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_supported_models() {
        for model in SupportedModel::ALL {
            assert_eq!(model.as_str().parse::<SupportedModel>().unwrap(), model);
        }
    }

    #[test]
    fn test_unsupported_model_is_validation_error() {
        let err = "text-davinci-003".parse::<SupportedModel>().unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(err.stage(), "validation");
        assert!(err.to_string().contains("gpt-4o"));
    }

    #[test]
    fn test_serde_uses_provider_names() {
        let json = serde_json::to_string(&SupportedModel::Gpt35Turbo).unwrap();
        assert_eq!(json, "\"gpt-3.5-turbo\"");
    }
}
