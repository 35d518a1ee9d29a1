//! Narration tone/format and audio voice vocabularies.
//!
//! The generators accept only these values; anything else is rejected at
//! the boundary rather than forwarded to the providers.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};

/// Narration delivery tone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NarrationTone {
    #[serde(rename = "anime drama")]
    AnimeDrama,
    #[serde(rename = "noir")]
    Noir,
    #[serde(rename = "shonen epic")]
    ShonenEpic,
    #[serde(rename = "comedic dub")]
    ComedicDub,
}

/// Narration output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NarrationFormat {
    #[serde(rename = "narrative prose")]
    NarrativeProse,
    #[serde(rename = "screenplay-style")]
    Screenplay,
}

/// Synthesized voice selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoiceType {
    Male,
    Female,
    Neutral,
}

impl NarrationTone {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AnimeDrama => "anime drama",
            Self::Noir => "noir",
            Self::ShonenEpic => "shonen epic",
            Self::ComedicDub => "comedic dub",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            "anime drama" => Ok(Self::AnimeDrama),
            "noir" => Ok(Self::Noir),
            "shonen epic" => Ok(Self::ShonenEpic),
            "comedic dub" => Ok(Self::ComedicDub),
            _ => Err(CoreError::Validation(format!(
                "Invalid narration tone '{s}'. Must be one of: anime drama, noir, shonen epic, comedic dub"
            ))),
        }
    }
}

impl NarrationFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NarrativeProse => "narrative prose",
            Self::Screenplay => "screenplay-style",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            "narrative prose" => Ok(Self::NarrativeProse),
            "screenplay-style" => Ok(Self::Screenplay),
            _ => Err(CoreError::Validation(format!(
                "Invalid narration format '{s}'. Must be one of: narrative prose, screenplay-style"
            ))),
        }
    }
}

impl VoiceType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
            Self::Neutral => "neutral",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            "male" => Ok(Self::Male),
            "female" => Ok(Self::Female),
            "neutral" => Ok(Self::Neutral),
            _ => Err(CoreError::Validation(format!(
                "Invalid voice type '{s}'. Must be one of: male, female, neutral"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tone_round_trips() {
        for tone in [
            NarrationTone::AnimeDrama,
            NarrationTone::Noir,
            NarrationTone::ShonenEpic,
            NarrationTone::ComedicDub,
        ] {
            assert_eq!(NarrationTone::from_str(tone.as_str()).unwrap(), tone);
        }
    }

    #[test]
    fn format_round_trips() {
        for format in [NarrationFormat::NarrativeProse, NarrationFormat::Screenplay] {
            assert_eq!(NarrationFormat::from_str(format.as_str()).unwrap(), format);
        }
    }

    #[test]
    fn voice_round_trips() {
        for voice in [VoiceType::Male, VoiceType::Female, VoiceType::Neutral] {
            assert_eq!(VoiceType::from_str(voice.as_str()).unwrap(), voice);
        }
    }

    #[test]
    fn unknown_values_rejected() {
        assert!(NarrationTone::from_str("western").is_err());
        assert!(NarrationFormat::from_str("haiku").is_err());
        assert!(VoiceType::from_str("robot").is_err());
    }

    #[test]
    fn serde_uses_display_labels() {
        let json = serde_json::to_string(&NarrationTone::ShonenEpic).unwrap();
        assert_eq!(json, "\"shonen epic\"");
        let json = serde_json::to_string(&NarrationFormat::Screenplay).unwrap();
        assert_eq!(json, "\"screenplay-style\"");
    }
}
