/// DotaForge — Counter Picker
///
/// Postaví dva draft rostery z argumentů, nechá AI navrhnout countery
/// a vytiskne tabulku návrhů.
///
/// Spuštění:
///   cargo run --bin counter-picker -- --ally Zeus --ally Juggernaut --enemy Axe --enemy "Anti-Mage"

use ai_extractor::{gemini_text, parse_suggestions, prompts, AiClient, AiRoute};
use anyhow::{bail, Result};
use dotenv::dotenv;
use logger::{now_iso, AiStatusEvent, EventLogger};
use match_source::OpenDota;
use std::env;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let (ally_inputs, enemy_inputs) = parse_rosters(env::args().skip(1))?;
    if enemy_inputs.is_empty() {
        bail!("usage: counter-picker --ally <hero> ... --enemy <hero> ...");
    }

    let log_dir = env::var("ANALYSIS_LOG_DIR").unwrap_or_else(|_| "logs".to_string());
    let proxy_base =
        env::var("AI_PROXY_BASE_URL").unwrap_or_else(|_| "http://127.0.0.1:8787".to_string());

    info!("=== DotaForge Counter Picker ===");
    info!("Allies: {:?}", ally_inputs);
    info!("Enemies: {:?}", enemy_inputs);

    let logger = EventLogger::new(&log_dir);

    // Hero konstanty kvůli normalizaci uživatelských jmen ("natures prophet"
    // → "Nature's Prophet"). Výpadek konstant → jména jdou do promptu tak jak jsou.
    let heroes = match OpenDota::new().hero_constants().await {
        Ok(h) => h,
        Err(e) => {
            warn!("hero constants unavailable, using raw names: {e}");
            match_source::HeroLookup::default()
        }
    };
    let resolve = |input: &String| -> String {
        match heroes.find_by_name(input) {
            Some(h) => h.localized_name.clone(),
            None => {
                if !heroes.is_empty() {
                    warn!("hero '{input}' not recognized, passing through");
                }
                input.clone()
            }
        }
    };
    let allies: Vec<String> = ally_inputs.iter().map(resolve).collect();
    let enemies: Vec<String> = enemy_inputs.iter().map(resolve).collect();

    let prompt = prompts::counter_pick_prompt(&allies, &enemies);
    let ai = AiClient::new(&proxy_base);

    match ai.generate(AiRoute::Gemini, &prompt).await {
        Ok(envelope) => match gemini_text(&envelope).and_then(parse_suggestions) {
            Ok(suggestions) => {
                println!("\nSuggested picks:");
                for s in &suggestions {
                    println!("  {:<20} {:<12} {}", s.hero, s.role, s.reason);
                }
                log_ai(&logger, true, "ok");
            }
            Err(e) => {
                println!("Suggestions unavailable: {e}");
                log_ai(&logger, false, &e.to_string());
            }
        },
        Err(e) => {
            println!("Suggestions unavailable: {e}");
            log_ai(&logger, false, &e.to_string());
        }
    }

    Ok(())
}

/// Jednoduchý scan --ally/--enemy párů, bez clap
fn parse_rosters(mut args: impl Iterator<Item = String>) -> Result<(Vec<String>, Vec<String>)> {
    let mut allies = Vec::new();
    let mut enemies = Vec::new();
    while let Some(flag) = args.next() {
        match flag.as_str() {
            "--ally" => match args.next() {
                Some(name) => allies.push(name),
                None => bail!("--ally requires a hero name"),
            },
            "--enemy" => match args.next() {
                Some(name) => enemies.push(name),
                None => bail!("--enemy requires a hero name"),
            },
            other => bail!("unknown argument '{other}'"),
        }
    }
    Ok((allies, enemies))
}

fn log_ai(logger: &EventLogger, ok: bool, message: &str) {
    let _ = logger.log(&AiStatusEvent {
        ts:      now_iso(),
        event:   "AI_STATUS",
        route:   "gemini".to_string(),
        ok,
        message: message.to_string(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rosters_are_split_by_flag() {
        let args = ["--ally", "Zeus", "--enemy", "Axe", "--ally", "Lion"]
            .iter()
            .map(|s| s.to_string());
        let (allies, enemies) = parse_rosters(args).unwrap();
        assert_eq!(allies, vec!["Zeus", "Lion"]);
        assert_eq!(enemies, vec!["Axe"]);
    }

    #[test]
    fn dangling_flag_is_an_error() {
        let args = ["--ally"].iter().map(|s| s.to_string());
        assert!(parse_rosters(args).is_err());
    }

    #[test]
    fn unknown_flag_is_an_error() {
        let args = ["--frog", "Zeus"].iter().map(|s| s.to_string());
        assert!(parse_rosters(args).is_err());
    }
}
