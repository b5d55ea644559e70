// src/services/aggregator.rs

//! Assembly of the public stats records from extracted page data.

use crate::models::{
    CompetitiveStatsCollection, CompetitiveSummary, ModeSummary, PlayerIdentity, PlayerStats,
    PlayerStatsProfile, QuickPlayStatsCollection, UnlockData,
};
use crate::services::extractor::{
    ExtractedProfile, ExtractedSummary, GeneralInfo, ModeSnapshot, win_percentage,
};

/// Namecard fields resolved outside the page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Namecard {
    pub id: String,
    pub title: String,
    pub image: String,
}

impl Namecard {
    /// Combine the page's namecard id with the search record and unlock data.
    ///
    /// The search record's namecard is the image fallback when the unlock
    /// lookup did not succeed.
    pub fn resolve(
        info: &GeneralInfo,
        identity: &PlayerIdentity,
        unlock: Option<UnlockData>,
    ) -> Self {
        let mut namecard = Self {
            id: info.namecard_id.clone().unwrap_or_default(),
            title: String::new(),
            image: identity.namecard.clone().unwrap_or_default(),
        };
        if let Some(unlock) = unlock {
            namecard.title = unlock.name;
            namecard.image = unlock.icon;
        }
        namecard
    }
}

/// Build the full stats record.
pub fn build_full(profile: ExtractedProfile, namecard: Namecard) -> PlayerStats {
    let (qp_played, qp_won, qp_lost) = profile.quick_play.all_heroes_games();
    let (comp_played, comp_won, comp_lost) = profile.competitive.all_heroes_games();
    let info = profile.info;

    PlayerStats {
        icon: info.icon,
        name: info.name,
        endorsement: info.endorsement,
        endorsement_icon: info.endorsement_icon,
        title: info.title,
        namecard_id: namecard.id,
        namecard_title: namecard.title,
        namecard_image: namecard.image,
        ratings: profile.ratings,
        games_played: qp_played + comp_played,
        games_won: qp_won + comp_won,
        games_lost: qp_lost + comp_lost,
        quick_play_stats: QuickPlayStatsCollection {
            stats: profile.quick_play,
        },
        competitive_stats: CompetitiveStatsCollection {
            season: profile.season,
            stats: profile.competitive,
        },
        private: false,
    }
}

/// Build the summary record.
pub fn build_summary(summary: ExtractedSummary, namecard: Namecard) -> PlayerStatsProfile {
    let info = summary.info;

    PlayerStatsProfile {
        icon: info.icon,
        name: info.name,
        endorsement: info.endorsement,
        endorsement_icon: info.endorsement_icon,
        title: info.title,
        namecard_id: namecard.id,
        namecard_title: namecard.title,
        namecard_image: namecard.image,
        competitive_stats: CompetitiveSummary {
            season: summary.season,
            mode: mode_summary(summary.competitive),
        },
        quickplay_stats: mode_summary(summary.quick_play),
        ratings: summary.ratings,
        private: false,
    }
}

fn mode_summary(snapshot: ModeSnapshot) -> ModeSummary {
    let mut mode = ModeSummary::default();

    if let Some(all) = &snapshot.all_heroes {
        mode.games_played = all.game_int("gamesPlayed").unwrap_or(0);
        mode.games_won = all.game_int("gamesWon").unwrap_or(0);
        mode.games_lost = all.game_int("gamesLost").unwrap_or(0);
        mode.time_played = all
            .game
            .as_ref()
            .and_then(|game| game.get("timePlayed"))
            .map(|v| v.to_string())
            .unwrap_or_default();
    }

    if let Some(hero) = snapshot.most_played {
        mode.most_played_hero = hero.name;
        mode.most_played_hero_time_played = hero.time_played;
        if let Some(career) = &hero.career {
            let played = career.game_int("gamesPlayed").unwrap_or(0);
            let won = career.game_int("gamesWon").unwrap_or(0);
            mode.most_played_hero_games_played = played;
            mode.most_played_hero_win_percentage = win_percentage(won, played);
        }
    }

    mode
}
