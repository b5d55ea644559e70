// src/services/extractor.rs

//! Profile page extraction.
//!
//! Walks a parsed career page and lifts general info, ratings and per-mode
//! statistics out of it. Nothing here performs I/O, so a document never
//! outlives the synchronous call that reads it.

use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::error::{AppError, Result};
use crate::models::{ALL_HEROES, CareerStats, Platform, Rating, StatsCollection, TopHeroStats};
use crate::utils::text::{
    coerce, normalize_key, parse_float_lenient, parse_int_lenient, static_regex,
};

static ENDORSEMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"/(\d+)-([a-z0-9]+)\.svg"));
static RANK_RE: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"https://\S+Rank_([a-zA-Z]+)Tier-([a-f0-9]+)\.png"));
static TIER_RE: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"https://\S+TierDivision_(\d+)-[a-f0-9]+\.png"));
static FILTER_RE: LazyLock<Regex> = LazyLock::new(|| static_regex(r"^([a-zA-Z]+)Filter$"));

/// Game modes shown on a career page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameMode {
    QuickPlay,
    Competitive,
}

impl GameMode {
    fn view_class(self) -> &'static str {
        match self {
            GameMode::QuickPlay => "quickPlay-view",
            GameMode::Competitive => "competitive-view",
        }
    }
}

/// A parsed career page.
pub struct ProfileDocument {
    html: Html,
}

impl ProfileDocument {
    /// Parse a page body, rejecting the site's soft "Page Not Found" page.
    pub fn parse(body: &str) -> Result<Self> {
        let html = Html::parse_document(body);
        let heading = parse_selector("[slot=heading]")?;
        if let Some(el) = html.select(&heading).next() {
            if text_of(el) == "Page Not Found" {
                return Err(AppError::NotFound);
            }
        }
        Ok(Self { html })
    }

    pub fn html(&self) -> &Html {
        &self.html
    }
}

/// Identity fields shown in the page masthead.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeneralInfo {
    pub icon: String,
    pub name: String,
    pub endorsement: i64,
    pub endorsement_icon: String,
    pub title: String,
    pub namecard_id: Option<String>,
}

/// Everything the full stats view needs from a page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedProfile {
    pub info: GeneralInfo,
    pub ratings: Vec<Rating>,
    pub quick_play: StatsCollection,
    pub competitive: StatsCollection,
    pub season: Option<i64>,
}

/// The hero listed first in a mode's time-played ranking.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MostPlayedHero {
    /// Display name as shown on the page
    pub name: String,
    pub time_played: String,
    /// Career stats of that hero when the page has them
    pub career: Option<CareerStats>,
}

/// The subset of one mode the summary view reads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModeSnapshot {
    pub all_heroes: Option<CareerStats>,
    pub most_played: Option<MostPlayedHero>,
}

/// Everything the summary view needs from a page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedSummary {
    pub info: GeneralInfo,
    pub ratings: Vec<Rating>,
    pub quick_play: ModeSnapshot,
    pub competitive: ModeSnapshot,
    pub season: Option<i64>,
}

/// Views of the page scoped to one platform.
struct PlatformView<'a> {
    profile_view: ElementRef<'a>,
    rank_wrapper: Option<ElementRef<'a>>,
}

/// Extract general info, ratings and both modes in full.
pub fn extract_full(doc: &ProfileDocument, platform: Platform) -> Result<ExtractedProfile> {
    let html = doc.html();
    let view = platform_view(html, platform)?;

    let mut quick_play = extract_mode(&view, GameMode::QuickPlay)?;
    let mut competitive = extract_mode(&view, GameMode::Competitive)?;
    enrich_top_heroes(&mut quick_play);
    enrich_top_heroes(&mut competitive);

    Ok(ExtractedProfile {
        info: general_info(html)?,
        ratings: ratings(&view)?,
        quick_play,
        competitive,
        season: season(html)?,
    })
}

/// Extract general info, ratings and the summary subset of both modes.
pub fn extract_summary(doc: &ProfileDocument, platform: Platform) -> Result<ExtractedSummary> {
    let html = doc.html();
    let view = platform_view(html, platform)?;

    Ok(ExtractedSummary {
        info: general_info(html)?,
        ratings: ratings(&view)?,
        quick_play: mode_snapshot(&view, GameMode::QuickPlay)?,
        competitive: mode_snapshot(&view, GameMode::Competitive)?,
        season: season(html)?,
    })
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn first_text(scope: ElementRef<'_>, selector: &Selector) -> String {
    scope.select(selector).next().map(text_of).unwrap_or_default()
}

fn first_attr(scope: ElementRef<'_>, selector: &Selector, attr: &str) -> String {
    scope
        .select(selector)
        .next()
        .and_then(|el| el.value().attr(attr))
        .unwrap_or_default()
        .to_string()
}

/// Locate the profile view and rank wrapper of the requested platform.
fn platform_view(html: &Html, platform: Platform) -> Result<PlatformView<'_>> {
    let filters = parse_selector(".Profile-player--filters .Profile-player--filter")?;
    let key = platform.filter_key();

    let listed = html.select(&filters).any(|el| {
        el.value()
            .id()
            .and_then(|id| FILTER_RE.captures(id))
            .and_then(|caps| caps.get(1))
            .is_some_and(|m| m.as_str() == key)
    });
    if !listed {
        log::debug!("No {key} filter on profile page");
        return Err(AppError::InvalidPlatform(platform.to_string()));
    }

    let view_selector = parse_selector(&format!(".Profile-view.{key}-view"))?;
    let Some(profile_view) = html.select(&view_selector).next() else {
        log::debug!("Filter {key} listed but its profile view is missing");
        return Err(AppError::InvalidPlatform(platform.to_string()));
    };

    let wrapper_selector =
        parse_selector(&format!(".Profile-playerSummary--rankWrapper.{key}-view"))?;
    let rank_wrapper = html.select(&wrapper_selector).next();

    Ok(PlatformView {
        profile_view,
        rank_wrapper,
    })
}

fn general_info(html: &Html) -> Result<GeneralInfo> {
    let name_sel = parse_selector(".Profile-player--name")?;
    let masthead_sel = parse_selector(".Profile-masthead")?;
    let portrait_sel = parse_selector(".Profile-player--portrait")?;
    let endorsement_sel = parse_selector(".Profile-playerSummary--endorsement")?;
    let title_sel = parse_selector(".Profile-player--title")?;

    let mut info = GeneralInfo {
        name: html
            .select(&name_sel)
            .next()
            .map(text_of)
            .unwrap_or_default(),
        ..GeneralInfo::default()
    };

    let Some(masthead) = html.select(&masthead_sel).next() else {
        log::debug!("Profile page has no masthead");
        return Ok(info);
    };

    info.icon = first_attr(masthead, &portrait_sel, "src");
    info.endorsement_icon = unwrap_svg_path(&first_attr(masthead, &endorsement_sel, "src"));
    info.endorsement = ENDORSEMENT_RE
        .captures(&info.endorsement_icon)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0);
    info.title = first_text(masthead, &title_sel);
    info.namecard_id = masthead.value().attr("namecard-id").map(str::to_string);

    Ok(info)
}

/// `/svg?path=<url>` icons are served through a proxy; keep the real path.
fn unwrap_svg_path(icon: &str) -> String {
    if !icon.starts_with("/svg") {
        return icon.to_string();
    }
    icon.split_once('?')
        .and_then(|(_, query)| {
            url::form_urlencoded::parse(query.as_bytes())
                .find(|(k, v)| k == "path" && !v.is_empty())
                .map(|(_, v)| v.into_owned())
        })
        .unwrap_or_else(|| icon.to_string())
}

fn ratings(view: &PlatformView<'_>) -> Result<Vec<Rating>> {
    let Some(wrapper) = view.rank_wrapper else {
        return Ok(Vec::new());
    };

    let role_wrapper_sel = parse_selector(".Profile-playerSummary--roleWrapper")?;
    let role_img_sel = parse_selector(".Profile-playerSummary--role img")?;
    let role_use_sel = parse_selector(".Profile-playerSummary--role use")?;
    let rank_sel = parse_selector("img.Profile-playerSummary--rank")?;

    let mut ratings = Vec::new();
    for role_wrapper in wrapper.select(&role_wrapper_sel) {
        let role_icon = role_wrapper
            .select(&role_img_sel)
            .find_map(|el| el.value().attr("src"))
            .or_else(|| {
                role_wrapper.select(&role_use_sel).find_map(|el| {
                    el.value()
                        .attrs()
                        .find(|(name, _)| *name == "href")
                        .map(|(_, value)| value)
                })
            })
            .unwrap_or_default()
            .to_string();

        let mut rank_icons = role_wrapper
            .select(&rank_sel)
            .map(|el| el.value().attr("src").unwrap_or_default().to_string());
        let rank_icon = rank_icons.next().unwrap_or_default();
        let tier_icon = rank_icons.next().unwrap_or_default();

        let Some(group) = RANK_RE
            .captures(&rank_icon)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
        else {
            log::debug!("Skipping role {role_icon:?} without a recognizable rank icon");
            continue;
        };

        let tier = TIER_RE
            .captures(&tier_icon)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0);

        ratings.push(Rating {
            group,
            tier,
            role: role_name(&role_icon),
            role_icon,
            rank_icon,
            tier_icon,
        });
    }
    Ok(ratings)
}

/// Role icons are named `<role>-<hash>.svg`.
fn role_name(icon: &str) -> String {
    let path = icon.split(['?', '#']).next().unwrap_or(icon);
    let file = path.rsplit('/').next().unwrap_or(path);
    file.split('-').next().unwrap_or(file).to_string()
}

fn season(html: &Html) -> Result<Option<i64>> {
    let selector = parse_selector("[data-latestherostatrankseasonow2]")?;
    Ok(html
        .select(&selector)
        .next()
        .and_then(|el| el.value().attr("data-latestherostatrankseasonow2"))
        .and_then(|v| v.trim().parse().ok()))
}

fn mode_section<'a>(
    view: &PlatformView<'a>,
    prefix: &str,
    mode: GameMode,
) -> Result<Option<ElementRef<'a>>> {
    let selector = parse_selector(&format!("{prefix}.{}", mode.view_class()))?;
    Ok(view.profile_view.select(&selector).next())
}

fn extract_mode(view: &PlatformView<'_>, mode: GameMode) -> Result<StatsCollection> {
    let top_heroes = match mode_section(view, ".Profile-heroSummary--view", mode)? {
        Some(section) => hero_summary(section)?,
        None => BTreeMap::new(),
    };
    let career_stats = match mode_section(view, ".stats", mode)? {
        Some(section) => career_stats(section, None)?,
        None => BTreeMap::new(),
    };
    Ok(StatsCollection {
        top_heroes,
        career_stats,
    })
}

fn mode_snapshot(view: &PlatformView<'_>, mode: GameMode) -> Result<ModeSnapshot> {
    let most_played = match mode_section(view, ".Profile-heroSummary--view", mode)? {
        Some(section) => first_progress_bar(section)?,
        None => None,
    };

    let mut wanted = vec![ALL_HEROES.to_string()];
    if let Some((_, key, _)) = &most_played {
        wanted.push(key.clone());
    }

    let mut careers = match mode_section(view, ".stats", mode)? {
        Some(section) => career_stats(section, Some(wanted.as_slice()))?,
        None => BTreeMap::new(),
    };

    let most_played = most_played.map(|(name, key, time_played)| MostPlayedHero {
        career: careers.get(&key).cloned(),
        name,
        time_played,
    });

    Ok(ModeSnapshot {
        all_heroes: careers.remove(ALL_HEROES),
        most_played,
    })
}

/// Display name, hero key and description of the first progress bar.
fn first_progress_bar(section: ElementRef<'_>) -> Result<Option<(String, String, String)>> {
    let bar_sel = parse_selector(".Profile-progressBar")?;
    let title_sel = parse_selector(".Profile-progressBar-title")?;
    let desc_sel = parse_selector(".Profile-progressBar-description")?;

    Ok(section.select(&bar_sel).next().map(|bar| {
        let name = first_text(bar, &title_sel);
        let key = normalize_key(&name);
        (name, key, first_text(bar, &desc_sel))
    }))
}

/// Map dropdown option values to their (optionally normalized) labels.
fn dropdown_options(section: ElementRef<'_>, normalize: bool) -> Result<HashMap<String, String>> {
    let option_sel = parse_selector(".Profile-dropdown option")?;
    Ok(section
        .select(&option_sel)
        .filter_map(|opt| {
            let value = opt.value().attr("value")?.to_string();
            let label = text_of(opt);
            Some((value, if normalize { normalize_key(&label) } else { label }))
        })
        .collect())
}

fn hero_summary(section: ElementRef<'_>) -> Result<BTreeMap<String, TopHeroStats>> {
    let categories = dropdown_options(section, true)?;
    let group_sel = parse_selector("div.Profile-progressBars")?;
    let bar_sel = parse_selector(".Profile-progressBar")?;
    let title_sel = parse_selector(".Profile-progressBar-title")?;
    let desc_sel = parse_selector(".Profile-progressBar-description")?;

    let mut heroes: BTreeMap<String, TopHeroStats> = BTreeMap::new();
    for group in section.select(&group_sel) {
        let category = group
            .value()
            .attr("data-category-id")
            .and_then(|id| categories.get(id))
            .map(String::as_str)
            .unwrap_or_default();

        for bar in group.select(&bar_sel) {
            let hero = normalize_key(&first_text(bar, &title_sel));
            let value = first_text(bar, &desc_sel);
            let stats = heroes.entry(hero).or_default();

            let recognized = match category {
                "timePlayed" => {
                    stats.time_played = value;
                    true
                }
                "gamesWon" => {
                    stats.games_won = parse_int_lenient(&value);
                    true
                }
                "weaponAccuracy" => {
                    stats.weapon_accuracy = parse_int_lenient(&value);
                    true
                }
                "criticalHitAccuracy" => {
                    stats.critical_hit_accuracy = parse_int_lenient(&value);
                    true
                }
                "eliminationsPerLife" => {
                    stats.eliminations_per_life = parse_float_lenient(&value);
                    true
                }
                "multikillBest" => {
                    stats.multi_kill_best = parse_int_lenient(&value);
                    true
                }
                "objectiveKills" => {
                    stats.objective_kills = parse_float_lenient(&value);
                    true
                }
                _ => false,
            };
            stats.valid |= recognized;
        }
    }
    Ok(heroes)
}

/// Career stats of a mode, optionally limited to the given hero keys.
fn career_stats(
    section: ElementRef<'_>,
    only: Option<&[String]>,
) -> Result<BTreeMap<String, CareerStats>> {
    let heroes = dropdown_options(section, false)?;
    let container_sel = parse_selector(".stats-container")?;
    let category_sel = parse_selector("div.category")?;
    let header_sel = parse_selector(".header p")?;
    let item_sel = parse_selector(".stat-item")?;
    let name_sel = parse_selector(".name")?;
    let value_sel = parse_selector(".value")?;

    let mut result: BTreeMap<String, CareerStats> = BTreeMap::new();
    for container in section.select(&container_sel) {
        let Some(option) = container
            .value()
            .classes()
            .filter_map(|class| class.strip_prefix("option-"))
            .last()
        else {
            continue;
        };
        let Some(hero_name) = heroes.get(option) else {
            log::debug!("Skipping stats container for unknown option {option}");
            continue;
        };

        let hero = normalize_key(hero_name);
        if only.is_some_and(|keys| !keys.contains(&hero)) {
            continue;
        }

        for category in container.select(&category_sel) {
            let category_key = normalize_key(&first_text(category, &header_sel));
            for item in category.select(&item_sel) {
                let key = normalize_key(&first_text(item, &name_sel));
                let value = coerce(&first_text(item, &value_sel));

                let career = result.entry(hero.clone()).or_default();
                if let Some(stats) = career.category_mut(&category_key) {
                    stats.insert(key, value);
                }
            }
        }
    }
    Ok(result)
}

/// Fill the per-hero game and best numbers from that hero's career stats.
fn enrich_top_heroes(collection: &mut StatsCollection) {
    for (hero, top) in collection.top_heroes.iter_mut() {
        let Some(career) = collection.career_stats.get(hero) else {
            continue;
        };

        if let Some(played) = career.game_int("gamesPlayed") {
            top.games_played = played;
        }
        if let Some(lost) = career.game_int("gamesLost") {
            top.games_lost = lost;
        }
        let won = career.game_int("gamesWon").unwrap_or(top.games_won);
        top.win_percentage = win_percentage(won, top.games_played);

        if let Some(v) = career.best_int("objectiveKillsMostInGame") {
            top.objective_kills_best = v;
        }
        if let Some(v) = career.best_int("healingDoneMostInGame") {
            top.healing_done_best = v;
        }
        if let Some(v) = career
            .best_int("allDamageDoneMostInGame")
            .or_else(|| career.best_int("heroDamageDoneMostInGame"))
        {
            top.damage_done_best = v;
        }
        if let Some(v) = career.best_int("killStreakBest") {
            top.kill_streak_best = v;
        }
    }
}

/// Rounded share of games won, 0 without games.
pub fn win_percentage(won: i64, played: i64) -> i64 {
    if played <= 0 {
        return 0;
    }
    (won as f64 * 100.0 / played as f64).round() as i64
}
