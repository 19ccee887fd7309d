/// DotaForge — Match Source
///
/// OpenDota API klient pro match analýzu.
/// - /api/matches/{id}               — detail zápasu (players, duration, skóre)
/// - /api/constants/heroes           — hero id → jména
/// - /api/constants/items            — item konstanty (dname, cost, img)
/// - /api/heroes/{id}/matchups       — winrate proti jednotlivým hrdinům
/// - /api/heroes/{id}/itemPopularity — populární itemy podle fáze hry
///
/// OpenDota vrací částečně vyplněné dokumenty — každé pole je lenient,
/// chybějící nebo nesmyslná hodnota = neutrální default, nikdy chyba.

use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, warn};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

const OPENDOTA_BASE: &str = "https://api.opendota.com";

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("OpenDota HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("decode failed: {0}")]
    Decode(#[from] serde_json::Error),
}

// ── Lenient deserializace ─────────────────────────────────────────────────────
// OpenDota má null/chybějící countery podle lobby typu — bereme 0 místo chyby.

fn lenient_u32<'de, D: Deserializer<'de>>(de: D) -> Result<u32, D::Error> {
    let v = serde_json::Value::deserialize(de)?;
    Ok(v.as_u64().unwrap_or(0).min(u32::MAX as u64) as u32)
}

fn lenient_u64<'de, D: Deserializer<'de>>(de: D) -> Result<u64, D::Error> {
    let v = serde_json::Value::deserialize(de)?;
    Ok(v.as_u64().unwrap_or(0))
}

fn lenient_bool<'de, D: Deserializer<'de>>(de: D) -> Result<bool, D::Error> {
    let v = serde_json::Value::deserialize(de)?;
    Ok(v.as_bool().unwrap_or(false))
}

// ── Match snapshot ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MatchSnapshot {
    #[serde(default, deserialize_with = "lenient_u64")]
    pub match_id:         u64,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub duration:         u32,          // sekundy, může být 0
    #[serde(default, deserialize_with = "lenient_bool")]
    pub radiant_win:      bool,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub radiant_score:    u32,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub dire_score:       u32,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub first_blood_time: u32,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub game_mode:        u32,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub lobby_type:       u32,
    #[serde(default)]
    pub players:          Vec<Player>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Player {
    #[serde(default)]
    pub account_id:   Option<u64>,
    #[serde(default)]
    pub personaname:  Option<String>,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub hero_id:      u32,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub player_slot:  u32,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub kills:        u32,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub deaths:       u32,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub assists:      u32,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub gold_per_min: u32,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub xp_per_min:   u32,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub net_worth:    u32,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub last_hits:    u32,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub denies:       u32,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub obs_placed:   u32,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub sen_placed:   u32,
}

impl Player {
    /// Slot < 128 = Radiant strana
    pub fn is_radiant(&self) -> bool {
        self.player_slot < 128
    }

    pub fn display_name(&self) -> String {
        match self.personaname.as_deref() {
            Some(n) if !n.trim().is_empty() => n.to_string(),
            _ => format!("Player {}", self.player_slot),
        }
    }
}

// ── Hero konstanty ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HeroData {
    #[serde(default, deserialize_with = "lenient_u32")]
    pub id:             u32,
    #[serde(default)]
    pub name:           String,   // "npc_dota_hero_zuus"
    #[serde(default)]
    pub localized_name: String,   // "Zeus"
}

/// Read-only lookup tabulka postavená jednou při startu a předávaná explicitně
/// (žádné globální singletony).
#[derive(Debug, Clone, Default)]
pub struct HeroLookup {
    by_id:   HashMap<u32, HeroData>,
    by_norm: HashMap<String, u32>,
}

impl HeroLookup {
    pub fn from_constants(raw: &str) -> Result<Self, SourceError> {
        let table: HashMap<String, HeroData> = serde_json::from_str(raw)?;
        let mut by_id = HashMap::new();
        let mut by_norm = HashMap::new();
        for hero in table.into_values() {
            if hero.id == 0 {
                continue;
            }
            if !hero.localized_name.is_empty() {
                by_norm.insert(normalize_name(&hero.localized_name), hero.id);
            }
            by_id.insert(hero.id, hero);
        }
        debug!("hero constants loaded: {} heroes", by_id.len());
        Ok(Self { by_id, by_norm })
    }

    pub fn localized(&self, hero_id: u32) -> String {
        self.by_id
            .get(&hero_id)
            .map(|h| h.localized_name.clone())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| format!("Hero ID {hero_id}"))
    }

    /// Interní jméno bez "npc_dota_hero_" prefixu (používá se v URL ikonek)
    pub fn internal_short(&self, hero_id: u32) -> Option<String> {
        self.by_id
            .get(&hero_id)
            .map(|h| h.name.trim_start_matches("npc_dota_hero_").to_string())
            .filter(|n| !n.is_empty())
    }

    /// Vyhledání podle uživatelského vstupu — case/diakritika/interpunkce insensitive
    /// ("natures prophet" i "Nature's Prophet" najdou totéž)
    pub fn find_by_name(&self, input: &str) -> Option<&HeroData> {
        let id = self.by_norm.get(&normalize_name(input))?;
        self.by_id.get(id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

fn normalize_name(name: &str) -> String {
    name.nfkd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_alphanumeric())
        .collect()
}

// ── Item konstanty ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemData {
    #[serde(default, deserialize_with = "lenient_u32")]
    pub id:    u32,
    #[serde(default)]
    pub dname: String,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub cost:  u32,
    #[serde(default)]
    pub img:   String,
}

/// Itemy klíčované interním jménem ("phase_boots") i číselným id.
#[derive(Debug, Clone, Default)]
pub struct ItemLookup {
    by_name: HashMap<String, ItemData>,
    by_id:   HashMap<u32, ItemData>,
}

impl ItemLookup {
    pub fn from_constants(raw: &str) -> Result<Self, SourceError> {
        let table: HashMap<String, ItemData> = serde_json::from_str(raw)?;
        let mut by_id = HashMap::new();
        for item in table.values() {
            if item.id != 0 {
                by_id.insert(item.id, item.clone());
            }
        }
        debug!("item constants loaded: {} items", table.len());
        Ok(Self { by_name: table, by_id })
    }

    pub fn by_id(&self, id: u32) -> Option<&ItemData> {
        self.by_id.get(&id)
    }

    /// Display jméno pro klíč z itemPopularity — interní jméno, číselné id,
    /// nebo fallback na prettifikaci klíče ("phase_boots" → "Phase Boots")
    pub fn display_for_key(&self, key: &str) -> String {
        if let Some(item) = self.by_name.get(key) {
            if !item.dname.is_empty() {
                return item.dname.clone();
            }
        }
        if let Ok(id) = key.parse::<u32>() {
            if let Some(item) = self.by_id.get(&id) {
                if !item.dname.is_empty() {
                    return item.dname.clone();
                }
            }
        }
        prettify_key(key)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

pub fn prettify_key(key: &str) -> String {
    key.split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// ── Matchupy a item popularita ────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MatchupEntry {
    #[serde(default, deserialize_with = "lenient_u32")]
    pub hero_id:      u32,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub games_played: u32,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub wins:         u32,
}

impl MatchupEntry {
    pub fn win_rate(&self) -> f64 {
        if self.games_played == 0 {
            return 0.5; // žádná data → neutrální
        }
        self.wins as f64 / self.games_played as f64
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemPopularity {
    #[serde(default)]
    pub start_game_items: HashMap<String, u32>,
    #[serde(default)]
    pub early_game_items: HashMap<String, u32>,
    #[serde(default)]
    pub mid_game_items:   HashMap<String, u32>,
    #[serde(default)]
    pub late_game_items:  HashMap<String, u32>,
}

// ── OpenDota klient ───────────────────────────────────────────────────────────

pub struct OpenDota {
    client:   reqwest::Client,
    base_url: String,
}

impl Default for OpenDota {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenDota {
    pub fn new() -> Self {
        Self::with_base_url(OPENDOTA_BASE)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent("dota-forger/0.1 (match analysis)")
                .timeout(std::time::Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            base_url: base_url.into(),
        }
    }

    async fn get_raw(&self, path: &str, scope: &str) -> Result<String, SourceError> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self.client.get(&url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!("OpenDota {scope} failed: HTTP {status}");
            return Err(SourceError::Http {
                status: status.as_u16(),
                body:   snippet(&body, 200),
            });
        }
        Ok(resp.text().await?)
    }

    pub async fn fetch_match(&self, match_id: u64) -> Result<MatchSnapshot, SourceError> {
        let raw = self.get_raw(&format!("/api/matches/{match_id}"), "match").await?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub async fn hero_constants(&self) -> Result<HeroLookup, SourceError> {
        let raw = self.get_raw("/api/constants/heroes", "constants/heroes").await?;
        HeroLookup::from_constants(&raw)
    }

    pub async fn item_constants(&self) -> Result<ItemLookup, SourceError> {
        let raw = self.get_raw("/api/constants/items", "constants/items").await?;
        ItemLookup::from_constants(&raw)
    }

    pub async fn hero_matchups(&self, hero_id: u32) -> Result<Vec<MatchupEntry>, SourceError> {
        let raw = self
            .get_raw(&format!("/api/heroes/{hero_id}/matchups"), "matchups")
            .await?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub async fn item_popularity(&self, hero_id: u32) -> Result<ItemPopularity, SourceError> {
        let raw = self
            .get_raw(&format!("/api/heroes/{hero_id}/itemPopularity"), "itemPopularity")
            .await?;
        Ok(serde_json::from_str(&raw)?)
    }
}

/// Ořez na max N znaků s respektem k UTF-8 hranicím
fn snippet(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

// ── Draft kontext pro guide prompt ────────────────────────────────────────────

/// Sestaví textový blok s OpenDota statistikami pro guide prompt:
/// 3 nejhorší matchupy proti pickenutým nepřátelům + 5 nejpopulárnějších itemů.
/// Prázdný výsledek = žádná použitelná data (caller dosadí placeholder).
pub fn draft_context(
    hero_name: &str,
    matchups: &[MatchupEntry],
    popularity: &ItemPopularity,
    enemy_ids: &[u32],
    heroes: &HeroLookup,
    items: &ItemLookup,
) -> String {
    let mut out = String::new();

    let mut counters: Vec<&MatchupEntry> = matchups
        .iter()
        .filter(|m| m.games_played > 0 && enemy_ids.contains(&m.hero_id))
        .collect();
    counters.sort_by(|a, b| {
        a.win_rate()
            .partial_cmp(&b.win_rate())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    counters.truncate(3);

    if !counters.is_empty() {
        let info = counters
            .iter()
            .map(|c| {
                format!(
                    "{} ({:.0}% winrate vs them)",
                    heroes.localized(c.hero_id),
                    c.win_rate() * 100.0
                )
            })
            .collect::<Vec<_>>()
            .join(", ");
        out.push_str(&format!(
            "- **Historical Matchups vs Enemies**: {hero_name} struggles against: {info}.\n"
        ));
    }

    let mut popular: Vec<(&String, &u32)> = popularity
        .early_game_items
        .iter()
        .chain(popularity.mid_game_items.iter())
        .chain(popularity.late_game_items.iter())
        .collect();
    popular.sort_by(|a, b| b.1.cmp(a.1));
    popular.truncate(5);

    if !popular.is_empty() {
        let names = popular
            .iter()
            .map(|(key, _)| items.display_for_key(key))
            .collect::<Vec<_>>()
            .join(", ");
        out.push_str(&format!("- **Most Popular Items**: {names}.\n"));
    }

    out
}

// ── Testy ─────────────────────────────────────────────────────────────────────
