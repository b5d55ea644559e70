//! Player identity types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Separator used in user-supplied tags and upstream career URLs.
pub const URL_TAG_SEPARATOR: char = '-';

/// Separator between name and discriminator in a battletag.
pub const BATTLETAG_SEPARATOR: char = '#';

/// Platform a player is looked up on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Pc,
    Console,
}

impl Platform {
    /// Key used by the platform filter list on the profile page.
    pub fn filter_key(self) -> &'static str {
        match self {
            Platform::Pc => "mouseKeyboard",
            Platform::Console => "controller",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Pc => "pc",
            Platform::Console => "console",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pc" => Ok(Platform::Pc),
            "console" => Ok(Platform::Console),
            _ => Err(AppError::InvalidPlatform(s.to_string())),
        }
    }
}

/// A user-supplied tag split into its normalized parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedTag {
    /// Portion before the discriminator, e.g. `Player`
    pub name: String,
    /// Whole tag with `#` as separator, e.g. `Player#1234`
    pub full_tag: String,
}

impl NormalizedTag {
    pub fn parse(tag: &str) -> Self {
        let full_tag = tag.replace(URL_TAG_SEPARATOR, "#");
        let name = match full_tag.find(BATTLETAG_SEPARATOR) {
            Some(idx) => full_tag[..idx].to_string(),
            None => full_tag.clone(),
        };
        Self { name, full_tag }
    }

    /// Tag as it appears in career URLs, e.g. `Player-1234`.
    pub fn url_form(&self) -> String {
        self.full_tag.replace(BATTLETAG_SEPARATOR, "-")
    }
}

/// Resolved career path fragment addressing one profile document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalLocator(String);

impl CanonicalLocator {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CanonicalLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A response record of the search-by-name endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SearchPlayer {
    #[serde(default)]
    pub battle_tag: String,
    #[serde(default)]
    pub portrait: Option<String>,
    #[serde(default)]
    pub frame: Option<String>,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub namecard: Option<String>,
}

/// A response record of the unlocks endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockData {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub icon: String,
}

/// A player identity confirmed to exist upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerIdentity {
    pub platform: Platform,
    /// Tag exactly as the caller supplied it
    pub raw_tag: String,
    pub name: String,
    pub full_tag: String,
    pub public: bool,
    pub portrait: Option<String>,
    pub frame: Option<String>,
    pub namecard: Option<String>,
}

impl PlayerIdentity {
    /// Build an identity from a search record, or from the tag alone.
    pub fn from_search(
        platform: Platform,
        raw_tag: &str,
        tag: &NormalizedTag,
        found: Option<SearchPlayer>,
    ) -> Self {
        match found {
            Some(player) => Self {
                platform,
                raw_tag: raw_tag.to_string(),
                name: tag.name.clone(),
                full_tag: if player.battle_tag.is_empty() {
                    tag.full_tag.clone()
                } else {
                    player.battle_tag
                },
                public: player.is_public,
                portrait: player.portrait,
                frame: player.frame,
                namecard: player.namecard,
            },
            None => Self {
                platform,
                raw_tag: raw_tag.to_string(),
                name: tag.name.clone(),
                full_tag: tag.full_tag.clone(),
                public: true,
                portrait: None,
                frame: None,
                namecard: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_from_str() {
        assert_eq!("pc".parse::<Platform>().unwrap(), Platform::Pc);
        assert_eq!("Console".parse::<Platform>().unwrap(), Platform::Console);
        assert!(matches!(
            "xbl".parse::<Platform>(),
            Err(AppError::InvalidPlatform(p)) if p == "xbl"
        ));
    }

    #[test]
    fn test_platform_filter_keys() {
        assert_eq!(Platform::Pc.filter_key(), "mouseKeyboard");
        assert_eq!(Platform::Console.filter_key(), "controller");
    }

    #[test]
    fn test_normalized_tag() {
        let tag = NormalizedTag::parse("Player-1234");
        assert_eq!(tag.name, "Player");
        assert_eq!(tag.full_tag, "Player#1234");
        assert_eq!(tag.url_form(), "Player-1234");

        let tag = NormalizedTag::parse("Player");
        assert_eq!(tag.name, "Player");
        assert_eq!(tag.full_tag, "Player");
    }

    #[test]
    fn test_search_player_decodes_upstream_shape() {
        let players: Vec<SearchPlayer> = serde_json::from_str(
            r#"[{"battleTag":"Player#1234","frame":"0x1","isPublic":false,"lastUpdated":1,"namecard":"0x2","portrait":"0x3","title":"0x4"}]"#,
        )
        .unwrap();

        assert_eq!(players[0].battle_tag, "Player#1234");
        assert!(!players[0].is_public);
        assert_eq!(players[0].namecard.as_deref(), Some("0x2"));
    }

    #[test]
    fn test_identity_without_search_hit_is_public() {
        let tag = NormalizedTag::parse("Player-1234");
        let identity = PlayerIdentity::from_search(Platform::Pc, "Player-1234", &tag, None);
        assert!(identity.public);
        assert_eq!(identity.full_tag, "Player#1234");
    }
}
