//! Metrics Engine pro derived performance highlights
//! Heuristika místo AI/ML - jednoduché pravidlové skórování z raw match statistik
//!
//! Čistě synchronní, bez I/O. Nikdy nepanikaří a nevrací chybu — chybějící
//! statistiky jsou nuly, prázdný seznam hráčů dá prázdný výstup.

use match_source::{MatchSnapshot, Player};
use serde::{Deserialize, Serialize};

/// Kategorie highlight metriky
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetricCategory {
    Farming,
    TeamFighting,
    Vision,
    EconomicImpact,
}

impl MetricCategory {
    pub fn label(&self) -> &'static str {
        match self {
            MetricCategory::Farming => "Farming",
            MetricCategory::TeamFighting => "Team Fighting",
            MetricCategory::Vision => "Vision",
            MetricCategory::EconomicImpact => "Economic Impact",
        }
    }
}

/// Známka — spodní hranice pásma je vždy inkluzivní (90 = A+, 89 = A)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    APlus,
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    pub fn from_score(score: u32) -> Self {
        if score >= 90 {
            Grade::APlus
        } else if score >= 80 {
            Grade::A
        } else if score >= 70 {
            Grade::B
        } else if score >= 60 {
            Grade::C
        } else if score >= 50 {
            Grade::D
        } else {
            Grade::F
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Grade::APlus => "A+",
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        }
    }
}

/// Barevné pásmo pro UI — čistá funkce skóre, nezávislá na kategorii
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorBand {
    Blue,
    Green,
    Yellow,
    Red,
}

impl ColorBand {
    pub fn from_score(score: u32) -> Self {
        if score >= 80 {
            ColorBand::Blue
        } else if score >= 70 {
            ColorBand::Green
        } else if score >= 60 {
            ColorBand::Yellow
        } else {
            ColorBand::Red
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ColorBand::Blue => "blue",
            ColorBand::Green => "green",
            ColorBand::Yellow => "yellow",
            ColorBand::Red => "red",
        }
    }
}

/// Jeden spočítaný highlight — top hráč dané kategorie.
/// `player_index` ukazuje do `players` stejného snapshotu.
#[derive(Debug, Clone, Serialize)]
pub struct PerformanceMetric {
    pub category:     MetricCategory,
    pub player_index: usize,
    pub player_name:  String,
    pub hero_id:      u32,
    pub score:        u32,          // 0-100
    pub grade:        Grade,
    pub color:        ColorBand,
    pub detail:       String,
}

/// Spočítá 4 highlighty (farming, teamfight, vision, ekonomika) ze snapshotu.
/// Výběr hráče je extremem — první maximum vyhrává, takže výsledek je stabilní
/// vůči přeuspořádání seznamu hráčů.
pub fn compute_highlights(snapshot: &MatchSnapshot) -> Vec<PerformanceMetric> {
    if snapshot.players.is_empty() {
        return Vec::new();
    }
    vec![
        farming_highlight(snapshot),
        teamfight_highlight(snapshot),
        vision_highlight(snapshot),
        economy_highlight(snapshot),
    ]
}

fn metric(
    category: MetricCategory,
    snapshot: &MatchSnapshot,
    index: usize,
    score: u32,
    detail: String,
) -> PerformanceMetric {
    let player = &snapshot.players[index];
    PerformanceMetric {
        category,
        player_index: index,
        player_name: player.display_name(),
        hero_id: player.hero_id,
        score,
        grade: Grade::from_score(score),
        color: ColorBand::from_score(score),
        detail,
    }
}

/// První maximum vyhrává (stabilní tie-break podle pořadí na vstupu)
fn index_of_max(players: &[Player], key: impl Fn(&Player) -> u32) -> usize {
    let mut best = 0;
    for (i, p) in players.iter().enumerate().skip(1) {
        if key(p) > key(&players[best]) {
            best = i;
        }
    }
    best
}

// ── Farming ───────────────────────────────────────────────────────────────────

fn farming_highlight(snapshot: &MatchSnapshot) -> PerformanceMetric {
    let idx = index_of_max(&snapshot.players, |p| p.gold_per_min);
    let p = &snapshot.players[idx];
    let score = farming_score(p.gold_per_min);
    let detail = format!("{} GPM with {} last hits", p.gold_per_min, p.last_hits);
    metric(MetricCategory::Farming, snapshot, idx, score, detail)
}

/// GPM → skóre, monotónní schodová funkce
fn farming_score(gpm: u32) -> u32 {
    if gpm >= 700 {
        95
    } else if gpm >= 600 {
        85
    } else if gpm >= 550 {
        80
    } else if gpm >= 450 {
        70
    } else if gpm >= 350 {
        60
    } else if gpm >= 250 {
        45
    } else {
        30
    }
}

// ── Team fight ────────────────────────────────────────────────────────────────

fn teamfight_highlight(snapshot: &MatchSnapshot) -> PerformanceMetric {
    let idx = index_of_max(&snapshot.players, |p| p.kills + p.assists);
    let p = &snapshot.players[idx];

    let side_kills: u32 = snapshot
        .players
        .iter()
        .filter(|q| q.is_radiant() == p.is_radiant())
        .map(|q| q.kills)
        .sum();

    let (score, detail) = if side_kills == 0 {
        // 0/0 participace nedefinovaná → neutrálních 50
        (50, format!("{} kills and {} assists", p.kills, p.assists))
    } else {
        let participation = (p.kills + p.assists) as f64 / side_kills as f64;
        let kda = (p.kills + p.assists) as f64 / p.deaths.max(1) as f64;
        let score = ((participation * 100.0).min(100.0) * 0.6
            + ((kda / 5.0) * 100.0).min(100.0) * 0.4)
            .round() as u32;
        let detail = format!(
            "{:.0}% kill participation, {:.1} KDA",
            (participation * 100.0).min(100.0),
            kda
        );
        (score, detail)
    };

    metric(MetricCategory::TeamFighting, snapshot, idx, score, detail)
}

// ── Vision ────────────────────────────────────────────────────────────────────

fn vision_highlight(snapshot: &MatchSnapshot) -> PerformanceMetric {
    let idx = index_of_max(&snapshot.players, |p| p.obs_placed);
    let p = &snapshot.players[idx];

    let score = if snapshot.duration == 0 {
        0 // bez délky zápasu nelze normalizovat
    } else {
        let wards_per_10 = p.obs_placed as f64 / (snapshot.duration as f64 / 600.0);
        vision_score(wards_per_10)
    };

    let detail = format!(
        "{} observer + {} sentry wards placed",
        p.obs_placed, p.sen_placed
    );
    metric(MetricCategory::Vision, snapshot, idx, score, detail)
}

fn vision_score(wards_per_10: f64) -> u32 {
    if wards_per_10 >= 7.0 {
        90
    } else if wards_per_10 >= 5.0 {
        75
    } else if wards_per_10 >= 3.0 {
        60
    } else if wards_per_10 >= 1.0 {
        40
    } else {
        20
    }
}

// ── Ekonomika ─────────────────────────────────────────────────────────────────

fn economy_highlight(snapshot: &MatchSnapshot) -> PerformanceMetric {
    let idx = index_of_max(&snapshot.players, |p| p.net_worth);
    let p = &snapshot.players[idx];
    let score = ((p.net_worth as f64 / 50_000.0 * 100.0).min(100.0)).round() as u32;
    let detail = format!("{} net worth at the end", p.net_worth);
    metric(MetricCategory::EconomicImpact, snapshot, idx, score, detail)
}

// ── Testy ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn player(slot: u32, gpm: u32, k: u32, d: u32, a: u32, net: u32, obs: u32) -> Player {
        Player {
            player_slot: slot,
            gold_per_min: gpm,
            kills: k,
            deaths: d,
            assists: a,
            net_worth: net,
            obs_placed: obs,
            ..Default::default()
        }
    }

    fn snapshot(duration: u32, players: Vec<Player>) -> MatchSnapshot {
        MatchSnapshot { duration, players, ..Default::default() }
    }

    #[test]
    fn four_metrics_with_bounded_scores() {
        let snap = snapshot(
            2400,
            vec![
                player(0, 520, 8, 3, 12, 18_000, 2),
                player(1, 310, 2, 7, 9, 9_500, 14),
                player(128, 640, 11, 2, 4, 27_000, 0),
            ],
        );
        let metrics = compute_highlights(&snap);
        assert_eq!(metrics.len(), 4);
        for m in &metrics {
            assert!(m.score <= 100);
            assert!(m.player_index < snap.players.len());
        }
        assert_eq!(metrics[0].category, MetricCategory::Farming);
        assert_eq!(metrics[3].category, MetricCategory::EconomicImpact);
    }

    #[test]
    fn empty_player_list_yields_no_metrics() {
        assert!(compute_highlights(&snapshot(1800, vec![])).is_empty());
    }

    #[test]
    fn farming_score_is_monotonic() {
        let mut last = 0;
        for gpm in (0..=800).step_by(5) {
            let score = farming_score(gpm);
            assert!(score >= last, "score dropped at {gpm} GPM");
            last = score;
        }
        // hranice pásem
        assert_eq!(farming_score(700), 95);
        assert_eq!(farming_score(699), 85);
        assert_eq!(farming_score(600), 85);
        assert_eq!(farming_score(599), 80);
        assert_eq!(farming_score(550), 80);
        assert_eq!(farming_score(549), 70);
        assert_eq!(farming_score(450), 70);
        assert_eq!(farming_score(350), 60);
        assert_eq!(farming_score(250), 45);
        assert_eq!(farming_score(249), 30);
    }

    #[test]
    fn vision_score_is_zero_for_zero_duration() {
        for obs in [0, 1, 5, 30] {
            let snap = snapshot(0, vec![player(0, 0, 0, 0, 0, 0, obs)]);
            let vision = &compute_highlights(&snap)[2];
            assert_eq!(vision.category, MetricCategory::Vision);
            assert_eq!(vision.score, 0);
        }
    }

    #[test]
    fn teamfight_defaults_to_fifty_without_side_kills() {
        // top hráč má jen asistence, celá jeho strana 0 killů
        let snap = snapshot(
            1800,
            vec![
                player(0, 300, 0, 4, 9, 8_000, 0),
                player(1, 280, 0, 2, 1, 7_000, 0),
                player(128, 400, 3, 1, 0, 12_000, 0),
            ],
        );
        let teamfight = &compute_highlights(&snap)[1];
        assert_eq!(teamfight.category, MetricCategory::TeamFighting);
        assert_eq!(teamfight.player_index, 0);
        assert_eq!(teamfight.score, 50);
    }

    #[test]
    fn grade_bands_are_total_with_closed_lower_bounds() {
        for score in 0..=100 {
            // from_score je totální — jen projdeme celé pásmo
            let _ = Grade::from_score(score);
        }
        assert_eq!(Grade::from_score(90), Grade::APlus);
        assert_eq!(Grade::from_score(89), Grade::A);
        assert_eq!(Grade::from_score(80), Grade::A);
        assert_eq!(Grade::from_score(79), Grade::B);
        assert_eq!(Grade::from_score(70), Grade::B);
        assert_eq!(Grade::from_score(69), Grade::C);
        assert_eq!(Grade::from_score(60), Grade::C);
        assert_eq!(Grade::from_score(59), Grade::D);
        assert_eq!(Grade::from_score(50), Grade::D);
        assert_eq!(Grade::from_score(49), Grade::F);
        assert_eq!(Grade::from_score(0), Grade::F);
    }

    #[test]
    fn color_bands_follow_score() {
        assert_eq!(ColorBand::from_score(80), ColorBand::Blue);
        assert_eq!(ColorBand::from_score(79), ColorBand::Green);
        assert_eq!(ColorBand::from_score(70), ColorBand::Green);
        assert_eq!(ColorBand::from_score(69), ColorBand::Yellow);
        assert_eq!(ColorBand::from_score(60), ColorBand::Yellow);
        assert_eq!(ColorBand::from_score(59), ColorBand::Red);
    }

    #[test]
    fn scores_are_stable_under_player_reordering() {
        let a = player(0, 520, 8, 3, 12, 18_000, 2);
        let b = player(128, 640, 11, 2, 4, 27_000, 7);
        let fwd = compute_highlights(&snapshot(2400, vec![a.clone(), b.clone()]));
        let rev = compute_highlights(&snapshot(2400, vec![b, a]));
        for (m1, m2) in fwd.iter().zip(rev.iter()) {
            assert_eq!(m1.score, m2.score);
            assert_eq!(m1.player_name, m2.player_name);
        }
    }

    #[test]
    fn ties_break_to_first_player_in_input_order() {
        let snap = snapshot(
            1800,
            vec![player(0, 500, 0, 0, 0, 0, 0), player(1, 500, 0, 0, 0, 0, 0)],
        );
        let farming = &compute_highlights(&snap)[0];
        assert_eq!(farming.player_index, 0);
    }

    #[test]
    fn two_player_scenario_matches_reference_values() {
        // P1: 800 GPM, 10/0/5, 40k net, 10 obs — strana Radiant
        // P2: 200 GPM, 1/10/0, 5k net, 0 obs — strana Dire
        let snap = snapshot(
            1800,
            vec![
                player(0, 800, 10, 0, 5, 40_000, 10),
                player(128, 200, 1, 10, 0, 5_000, 0),
            ],
        );
        let metrics = compute_highlights(&snap);

        let farming = &metrics[0];
        assert_eq!(farming.player_index, 0);
        assert_eq!(farming.score, 95);

        // 10 wardů za 30 minut = 3.33/10min → pásmo 60
        let vision = &metrics[2];
        assert_eq!(vision.player_index, 0);
        assert_eq!(vision.score, 60);

        // 40000/50000 × 100 = 80
        let economy = &metrics[3];
        assert_eq!(economy.player_index, 0);
        assert_eq!(economy.score, 80);

        // participace 15/10 → cap 100, KDA 15 → cap 100 → 100
        let teamfight = &metrics[1];
        assert_eq!(teamfight.player_index, 0);
        assert_eq!(teamfight.score, 100);
        assert_eq!(teamfight.grade, Grade::APlus);
    }
}
