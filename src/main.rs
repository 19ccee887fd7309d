/// DotaForge — Match Analyzer
///
/// Co dělá:
///   1. Stáhne hero + item konstanty z OpenDota (paralelně, nezávislé requesty)
///   2. Stáhne match snapshot podle match ID
///   3. Spočítá 4 performance highlighty (lokálně, bez AI)
///   4. Pošle insights prompt přes AI proxy a vytiskne coaching report
///   5. Volitelně vygeneruje hero guide pro vybraného hrdinu ze zápasu
///
/// Co NEDĚLÁ: žádné retry, žádná cache mezi běhy — jeden zápas, jeden průchod
///
/// Spuštění:
///   cargo run --bin match-analyzer -- <match_id> [hero_name [role]]

use ai_extractor::{openai_text, parse_guide, parse_insights, prompts, AiClient, AiRoute};
use anyhow::{Context, Result};
use dotenv::dotenv;
use logger::{now_iso, AiStatusEvent, ApiStatusEvent, EventLogger, MatchAnalyzedEvent, MetricEvent};
use match_source::{draft_context, HeroLookup, ItemLookup, MatchSnapshot, OpenDota};
use metrics_engine::{compute_highlights, PerformanceMetric};
use std::env;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    let mut args = env::args().skip(1);
    let match_id: u64 = args
        .next()
        .context("usage: match-analyzer <match_id> [hero_name [role]]")?
        .parse()
        .context("match_id must be a number, e.g. 7123456789")?;
    let guide_hero = args.next();
    let guide_role = args.next().unwrap_or_else(|| "Core".to_string());

    let log_dir = env::var("ANALYSIS_LOG_DIR").unwrap_or_else(|_| "logs".to_string());
    let proxy_base =
        env::var("AI_PROXY_BASE_URL").unwrap_or_else(|_| "http://127.0.0.1:8787".to_string());

    info!("=== DotaForge Match Analyzer ===");
    info!("Match ID: {match_id}");
    info!("AI proxy: {proxy_base}");
    info!("Logs: ./{log_dir}/");

    let logger = EventLogger::new(&log_dir);
    let opendota = OpenDota::new();

    // Konstanty paralelně — oba requesty nezávislé, render čeká na oba.
    // Výpadek konstant není fatální: lookupy degradují na fallback jména.
    let (heroes, items) = tokio::join!(opendota.hero_constants(), opendota.item_constants());
    let heroes = match heroes {
        Ok(h) => {
            log_api(&logger, "constants/heroes", true, "ok");
            h
        }
        Err(e) => {
            warn!("hero constants unavailable: {e}");
            log_api(&logger, "constants/heroes", false, &e.to_string());
            HeroLookup::default()
        }
    };
    let items = match items {
        Ok(i) => {
            log_api(&logger, "constants/items", true, "ok");
            i
        }
        Err(e) => {
            warn!("item constants unavailable: {e}");
            log_api(&logger, "constants/items", false, &e.to_string());
            ItemLookup::default()
        }
    };

    // Match data jsou nutná — bez nich není co analyzovat
    let snapshot = match opendota.fetch_match(match_id).await {
        Ok(s) => {
            log_api(&logger, "match", true, "ok");
            s
        }
        Err(e) => {
            log_api(&logger, "match", false, &e.to_string());
            println!("Failed to load match {match_id}: {e}");
            return Ok(());
        }
    };

    let metrics = compute_highlights(&snapshot);
    print_overview(&snapshot, &metrics, &heroes);

    let _ = logger.log(&MatchAnalyzedEvent {
        ts:            now_iso(),
        event:         "MATCH_ANALYZED",
        match_id:      snapshot.match_id,
        duration_secs: snapshot.duration,
        radiant_win:   snapshot.radiant_win,
        radiant_score: snapshot.radiant_score,
        dire_score:    snapshot.dire_score,
        players:       snapshot.players.len(),
    });
    for m in &metrics {
        let _ = logger.log(&MetricEvent {
            ts:       now_iso(),
            event:    "PERFORMANCE_METRIC",
            match_id: snapshot.match_id,
            category: m.category.label().to_string(),
            player:   m.player_name.clone(),
            score:    m.score,
            grade:    m.grade.label().to_string(),
        });
    }

    let ai = AiClient::new(&proxy_base);

    // AI insights — každá chyba se chytá tady, převádí na banner a loguje.
    // Analýza metrik výš zůstává na obrazovce i když AI selže.
    let prompt = prompts::insights_prompt(&snapshot, &metrics, &heroes);
    match ai.generate(AiRoute::OpenAi, &prompt).await {
        Ok(envelope) => match openai_text(&envelope).and_then(parse_insights) {
            Ok(report) => {
                print_insights(&report);
                log_ai(&logger, AiRoute::OpenAi, true, "ok");
            }
            Err(e) => {
                println!("\nAI insights unavailable: {e}");
                log_ai(&logger, AiRoute::OpenAi, false, &e.to_string());
            }
        },
        Err(e) => {
            println!("\nAI insights unavailable: {e}");
            log_ai(&logger, AiRoute::OpenAi, false, &e.to_string());
        }
    }

    // Volitelný hero guide pro hrdinu ze zápasu
    if let Some(hero_input) = guide_hero {
        run_hero_guide(
            &opendota, &ai, &logger, &snapshot, &heroes, &items, &hero_input, &guide_role,
        )
        .await;
    }

    Ok(())
}

async fn run_hero_guide(
    opendota: &OpenDota,
    ai: &AiClient,
    logger: &EventLogger,
    snapshot: &MatchSnapshot,
    heroes: &HeroLookup,
    items: &ItemLookup,
    hero_input: &str,
    role: &str,
) {
    let Some(hero) = heroes.find_by_name(hero_input) else {
        warn!("hero '{hero_input}' not found in constants, skipping guide");
        return;
    };
    let Some(pick) = snapshot.players.iter().find(|p| p.hero_id == hero.id) else {
        warn!("hero '{}' did not play in this match, skipping guide", hero.localized_name);
        return;
    };

    let allies: Vec<String> = snapshot
        .players
        .iter()
        .filter(|p| p.is_radiant() == pick.is_radiant() && p.hero_id != hero.id)
        .map(|p| heroes.localized(p.hero_id))
        .collect();
    let enemy_ids: Vec<u32> = snapshot
        .players
        .iter()
        .filter(|p| p.is_radiant() != pick.is_radiant())
        .map(|p| p.hero_id)
        .collect();
    let enemies: Vec<String> = enemy_ids.iter().map(|id| heroes.localized(*id)).collect();

    // Matchup statistiky jsou jen obohacení — výpadek degraduje na placeholder
    let (matchups, popularity) = tokio::join!(
        opendota.hero_matchups(hero.id),
        opendota.item_popularity(hero.id)
    );
    let context = match (matchups, popularity) {
        (Ok(m), Ok(p)) => {
            log_api(logger, "matchups", true, "ok");
            draft_context(&hero.localized_name, &m, &p, &enemy_ids, heroes, items)
        }
        (m, p) => {
            let msg = m.err().or(p.err()).map(|e| e.to_string()).unwrap_or_default();
            log_api(logger, "matchups", false, &msg);
            "Failed to fetch real-time data from OpenDota.".to_string()
        }
    };

    let prompt =
        prompts::hero_guide_prompt(&hero.localized_name, role, &allies, &enemies, &context);
    match ai.generate(AiRoute::OpenAi, &prompt).await {
        Ok(envelope) => match openai_text(&envelope).and_then(parse_guide) {
            Ok(guide) => {
                print_guide(&hero.localized_name, role, &guide);
                log_ai(logger, AiRoute::OpenAi, true, "ok");
            }
            Err(e) => {
                println!("\nHero guide unavailable: {e}");
                log_ai(logger, AiRoute::OpenAi, false, &e.to_string());
            }
        },
        Err(e) => {
            println!("\nHero guide unavailable: {e}");
            log_ai(logger, AiRoute::OpenAi, false, &e.to_string());
        }
    }
}

// ── Výstup ────────────────────────────────────────────────────────────────────

fn print_overview(snapshot: &MatchSnapshot, metrics: &[PerformanceMetric], heroes: &HeroLookup) {
    let winner = if snapshot.radiant_win { "Radiant" } else { "Dire" };
    println!("\n=== Match {} ===", snapshot.match_id);
    println!(
        "{} victory — Radiant {} : {} Dire, duration {}",
        winner,
        snapshot.radiant_score,
        snapshot.dire_score,
        prompts::format_duration(snapshot.duration)
    );

    println!("\nPlayers:");
    for p in &snapshot.players {
        let side = if p.is_radiant() { "Radiant" } else { "Dire" };
        println!(
            "  {:<20} {:<18} {:>7} {:>2}/{:>2}/{:>2}  {} GPM  {} net worth",
            p.display_name(),
            heroes.localized(p.hero_id),
            side,
            p.kills,
            p.deaths,
            p.assists,
            p.gold_per_min,
            p.net_worth,
        );
    }

    println!("\nPerformance highlights:");
    for m in metrics {
        println!(
            "  {:<16} {:<20} {:>3}/100  {:<2} [{}]  {}",
            m.category.label(),
            m.player_name,
            m.score,
            m.grade.label(),
            m.color.label(),
            m.detail,
        );
    }
}

fn print_insights(report: &ai_extractor::InsightReport) {
    println!("\nAI-Powered Gameplay Insights:");
    for insight in &report.insights {
        println!(
            "  [{}] {} ({})",
            insight.severity.to_uppercase(),
            insight.title,
            insight.kind
        );
        if !insight.description.is_empty() {
            println!("      {}", insight.description);
        }
        if !insight.suggestion.is_empty() {
            println!("      💡 {}", insight.suggestion);
        }
    }
    if !report.coaching_recommendations.is_empty() {
        println!("\nCoaching recommendations:");
        for rec in &report.coaching_recommendations {
            println!("  - {rec}");
        }
    }
}

fn print_guide(hero: &str, role: &str, guide: &ai_extractor::HeroGuide) {
    println!("\n=== {hero} Guide ({role}) ===");

    println!("\nStarting items: {}", join_or_na(&guide.item_build.starting_items));
    println!("Core items:");
    for c in &guide.item_build.core_items {
        println!("  - {}: {}", c.item, c.reason);
    }
    println!("Situational items:");
    for c in &guide.item_build.situational_items {
        println!("  - {}: {}", c.item, c.reason);
    }

    println!("\nSkill build: {}", if guide.skill_build.is_empty() { "N/A" } else { &guide.skill_build });

    print_phase("Laning Phase (0-10 min)", &guide.laning_phase);
    print_phase("Mid Game (10-25 min)", &guide.mid_game);
    print_phase("Late Game (25+ min)", &guide.late_game);
    print_phase("Things to Avoid", &guide.things_to_avoid);
}

fn print_phase(title: &str, tips: &[String]) {
    println!("\n{title}:");
    for tip in tips {
        println!("  - {tip}");
    }
}

fn join_or_na(list: &[String]) -> String {
    if list.is_empty() {
        "N/A".to_string()
    } else {
        list.join(", ")
    }
}

// ── Event helpery ─────────────────────────────────────────────────────────────

fn log_api(logger: &EventLogger, scope: &str, ok: bool, message: &str) {
    let _ = logger.log(&ApiStatusEvent {
        ts:          now_iso(),
        event:       "API_STATUS",
        source:      "opendota".to_string(),
        scope:       scope.to_string(),
        ok,
        status_code: if ok { Some(200) } else { None },
        message:     message.to_string(),
    });
}

fn log_ai(logger: &EventLogger, route: AiRoute, ok: bool, message: &str) {
    let _ = logger.log(&AiStatusEvent {
        ts:      now_iso(),
        event:   "AI_STATUS",
        route:   route.label().to_string(),
        ok,
        message: message.to_string(),
    });
}
