//! Player statistics records.
//!
//! Field names serialize in camelCase to match the JSON shape consumers of the
//! stats API already rely on.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Hero key of the pseudo-hero aggregating every hero.
pub const ALL_HEROES: &str = "allHeroes";

/// A scraped stat value after best-effort typing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl StatValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            StatValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            StatValue::Integer(v) => Some(*v as f64),
            StatValue::Float(v) => Some(*v),
            StatValue::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            StatValue::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for StatValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatValue::Integer(v) => write!(f, "{v}"),
            StatValue::Float(v) => write!(f, "{v}"),
            StatValue::Text(v) => f.write_str(v),
        }
    }
}

/// One stat category of a hero, keyed by normalized stat name.
pub type StatMap = BTreeMap<String, StatValue>;

/// Competitive rating for one role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
    pub group: String,
    pub tier: i64,
    pub role: String,
    pub role_icon: String,
    pub rank_icon: String,
    pub tier_icon: String,
}

/// Summary stats of one hero as shown in the top heroes section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TopHeroStats {
    pub time_played: String,
    pub games_won: i64,
    pub weapon_accuracy: i64,
    pub critical_hit_accuracy: i64,
    pub eliminations_per_life: f64,
    pub multi_kill_best: i64,
    pub objective_kills: f64,
    /// Set once any recognized category row was read for this hero
    #[serde(default)]
    pub valid: bool,
    pub games_played: i64,
    pub games_lost: i64,
    pub win_percentage: i64,
    pub objective_kills_best: i64,
    pub healing_done_best: i64,
    pub damage_done_best: i64,
    pub kill_streak_best: i64,
}

/// Detailed stats of one hero grouped by category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CareerStats {
    pub assists: Option<StatMap>,
    pub average: Option<StatMap>,
    pub best: Option<StatMap>,
    pub combat: Option<StatMap>,
    pub hero_specific: Option<StatMap>,
    pub game: Option<StatMap>,
    pub match_awards: Option<StatMap>,

    /// No longer shown on every profile, so omitted when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deaths: Option<StatMap>,
}

impl CareerStats {
    /// Mutable access to a category by its normalized header name.
    ///
    /// Creates the category on first use; unknown names yield `None`.
    pub fn category_mut(&mut self, name: &str) -> Option<&mut StatMap> {
        let slot = match name {
            "assists" => &mut self.assists,
            "average" => &mut self.average,
            "best" => &mut self.best,
            "combat" => &mut self.combat,
            "deaths" => &mut self.deaths,
            "heroSpecific" => &mut self.hero_specific,
            "game" => &mut self.game,
            "matchAwards" => &mut self.match_awards,
            _ => return None,
        };
        Some(slot.get_or_insert_with(StatMap::new))
    }

    /// Integer value of a `game` category stat.
    pub fn game_int(&self, key: &str) -> Option<i64> {
        self.game.as_ref()?.get(key)?.as_i64()
    }

    /// Integer value of a `best` category stat.
    pub fn best_int(&self, key: &str) -> Option<i64> {
        self.best.as_ref()?.get(key)?.as_i64()
    }
}

/// Top heroes and career stats of one game mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct StatsCollection {
    pub top_heroes: BTreeMap<String, TopHeroStats>,
    pub career_stats: BTreeMap<String, CareerStats>,
}

impl StatsCollection {
    /// Games played, won and lost of the `allHeroes` entry, zero when absent.
    pub fn all_heroes_games(&self) -> (i64, i64, i64) {
        match self.career_stats.get(ALL_HEROES) {
            Some(stats) => (
                stats.game_int("gamesPlayed").unwrap_or(0),
                stats.game_int("gamesWon").unwrap_or(0),
                stats.game_int("gamesLost").unwrap_or(0),
            ),
            None => (0, 0, 0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct QuickPlayStatsCollection {
    #[serde(flatten)]
    pub stats: StatsCollection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CompetitiveStatsCollection {
    pub season: Option<i64>,
    #[serde(flatten)]
    pub stats: StatsCollection,
}

/// Full stats of a player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStats {
    pub icon: String,
    pub name: String,
    pub endorsement: i64,
    pub endorsement_icon: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namecard_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namecard_title: String,
    pub namecard_image: String,
    pub ratings: Vec<Rating>,
    pub games_played: i64,
    pub games_won: i64,
    pub games_lost: i64,
    pub quick_play_stats: QuickPlayStatsCollection,
    pub competitive_stats: CompetitiveStatsCollection,
    pub private: bool,
}

impl PlayerStats {
    /// Record for a profile that hides its stats.
    pub fn private() -> Self {
        Self {
            private: true,
            ..Self::default()
        }
    }
}

/// Aggregate competitive numbers of the summary view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CompetitiveSummary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<i64>,
    #[serde(flatten)]
    pub mode: ModeSummary,
}

/// Aggregate numbers of one game mode in the summary view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ModeSummary {
    #[serde(default, skip_serializing_if = "is_zero")]
    pub games_played: i64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub games_won: i64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub games_lost: i64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub time_played: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub most_played_hero: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub most_played_hero_time_played: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub most_played_hero_games_played: i64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub most_played_hero_win_percentage: i64,
}

pub type QuickplaySummary = ModeSummary;

fn is_zero(value: &i64) -> bool {
    *value == 0
}

/// Summary stats of a player without per-hero detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStatsProfile {
    pub icon: String,
    pub name: String,
    pub endorsement: i64,
    pub endorsement_icon: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namecard_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namecard_title: String,
    pub namecard_image: String,
    pub competitive_stats: CompetitiveSummary,
    pub quickplay_stats: QuickplaySummary,
    pub ratings: Vec<Rating>,
    pub private: bool,
}

impl PlayerStatsProfile {
    /// Record for a profile that hides its stats.
    pub fn private() -> Self {
        Self {
            private: true,
            ..Self::default()
        }
    }
}

/// Which of the two record shapes a request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewKind {
    Full,
    Summary,
}

impl fmt::Display for ViewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewKind::Full => f.write_str("full"),
            ViewKind::Summary => f.write_str("profile"),
        }
    }
}

/// A request for one record of one player.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StatsRequest {
    pub platform: String,
    pub tag: String,
    pub view: ViewKind,
}

impl StatsRequest {
    pub fn new(platform: impl Into<String>, tag: impl Into<String>, view: ViewKind) -> Self {
        Self {
            platform: platform.into(),
            tag: tag.into(),
            view,
        }
    }

    pub fn full(platform: impl Into<String>, tag: impl Into<String>) -> Self {
        Self::new(platform, tag, ViewKind::Full)
    }

    pub fn summary(platform: impl Into<String>, tag: impl Into<String>) -> Self {
        Self::new(platform, tag, ViewKind::Summary)
    }
}

impl fmt::Display for StatsRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.view {
            ViewKind::Full => write!(f, "{}/{}", self.platform, self.tag),
            ViewKind::Summary => write!(f, "{}/{} (profile)", self.platform, self.tag),
        }
    }
}

/// Either record shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StatsRecord {
    Full(PlayerStats),
    Summary(PlayerStatsProfile),
}

impl StatsRecord {
    pub fn view(&self) -> ViewKind {
        match self {
            StatsRecord::Full(_) => ViewKind::Full,
            StatsRecord::Summary(_) => ViewKind::Summary,
        }
    }

    pub fn is_private(&self) -> bool {
        match self {
            StatsRecord::Full(stats) => stats.private,
            StatsRecord::Summary(profile) => profile.private,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// Decode a record whose shape is known from its cache key.
    pub fn from_json(view: ViewKind, bytes: &[u8]) -> serde_json::Result<Self> {
        match view {
            ViewKind::Full => serde_json::from_slice(bytes).map(StatsRecord::Full),
            ViewKind::Summary => serde_json::from_slice(bytes).map(StatsRecord::Summary),
        }
    }

    pub fn into_full(self) -> Option<PlayerStats> {
        match self {
            StatsRecord::Full(stats) => Some(stats),
            StatsRecord::Summary(_) => None,
        }
    }

    pub fn into_summary(self) -> Option<PlayerStatsProfile> {
        match self {
            StatsRecord::Summary(profile) => Some(profile),
            StatsRecord::Full(_) => None,
        }
    }
}
