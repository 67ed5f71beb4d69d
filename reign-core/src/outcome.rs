//! Outcome tiers, approaches, and the badges shown to the player.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Result tier of a skill check. Ordered from worst to best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutcomeTier {
    CriticalFailure,
    Failure,
    Success,
    CriticalSuccess,
}

impl OutcomeTier {
    pub const ALL: [OutcomeTier; 4] = [
        OutcomeTier::CriticalSuccess,
        OutcomeTier::Success,
        OutcomeTier::Failure,
        OutcomeTier::CriticalFailure,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OutcomeTier::CriticalSuccess => "critical-success",
            OutcomeTier::Success => "success",
            OutcomeTier::Failure => "failure",
            OutcomeTier::CriticalFailure => "critical-failure",
        }
    }

    pub fn is_success(self) -> bool {
        self >= OutcomeTier::Success
    }
}

impl fmt::Display for OutcomeTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutcomeTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OutcomeTier::ALL
            .into_iter()
            .find(|t| t.as_str() == s.to_ascii_lowercase().replace('_', "-"))
            .ok_or_else(|| format!("unknown outcome tier '{s}'"))
    }
}

/// Strategy the player commits to before the check is rolled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Approach {
    Virtuous,
    Practical,
    Ruthless,
}

impl Approach {
    pub fn as_str(self) -> &'static str {
        match self {
            Approach::Virtuous => "virtuous",
            Approach::Practical => "practical",
            Approach::Ruthless => "ruthless",
        }
    }
}

impl fmt::Display for Approach {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Approach {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "virtuous" => Ok(Approach::Virtuous),
            "practical" => Ok(Approach::Practical),
            "ruthless" => Ok(Approach::Ruthless),
            _ => Err(format!("unknown approach '{s}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    Positive,
    Negative,
    Neutral,
}

/// One human-readable effect summary, shown before commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub polarity: Polarity,
}

impl Badge {
    pub fn new(text: impl Into<String>, polarity: Polarity) -> Self {
        Self {
            text: text.into(),
            icon: None,
            polarity,
        }
    }

    pub fn positive(text: impl Into<String>) -> Self {
        Self::new(text, Polarity::Positive)
    }

    pub fn negative(text: impl Into<String>) -> Self {
        Self::new(text, Polarity::Negative)
    }

    pub fn neutral(text: impl Into<String>) -> Self {
        Self::new(text, Polarity::Neutral)
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }
}

impl fmt::Display for Badge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = match self.polarity {
            Polarity::Positive => '+',
            Polarity::Negative => '-',
            Polarity::Neutral => '*',
        };
        write!(f, "[{marker}] {}", self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_ordering() {
        assert!(OutcomeTier::CriticalSuccess > OutcomeTier::Success);
        assert!(OutcomeTier::Failure > OutcomeTier::CriticalFailure);
        assert!(OutcomeTier::Success.is_success());
        assert!(!OutcomeTier::Failure.is_success());
    }

    #[test]
    fn test_parse_names() {
        assert_eq!(
            "critical_success".parse::<OutcomeTier>(),
            Ok(OutcomeTier::CriticalSuccess)
        );
        assert_eq!("Failure".parse::<OutcomeTier>(), Ok(OutcomeTier::Failure));
        assert!("meh".parse::<OutcomeTier>().is_err());
        assert_eq!("Ruthless".parse::<Approach>(), Ok(Approach::Ruthless));
    }

    #[test]
    fn test_serde_names_match_display() {
        let json = serde_json::to_string(&OutcomeTier::CriticalFailure).unwrap();
        assert_eq!(json, "\"critical-failure\"");
        let json = serde_json::to_string(&Approach::Virtuous).unwrap();
        assert_eq!(json, "\"virtuous\"");
    }
}
