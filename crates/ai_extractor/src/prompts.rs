//! Prompt šablony pro guide / insights / counter-pick volání.
//!
//! Každý prompt dostává předpočítaná čísla (metriky, winraty) — model má řešit
//! kontext a trade-offy, ne aritmetiku. Guide a insights chtějí raw JSON objekt,
//! counter-pick chce ```json fenced blok (obě cesty extraktoru zůstávají živé).

use match_source::{HeroLookup, MatchSnapshot};
use metrics_engine::PerformanceMetric;

/// mm:ss z délky zápasu v sekundách
pub fn format_duration(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

fn roster_line(names: &[String]) -> String {
    if names.is_empty() {
        "None".to_string()
    } else {
        names.join(", ")
    }
}

/// Personalizovaný hero guide pro konkrétní draft a roli.
pub fn hero_guide_prompt(
    hero_name: &str,
    role: &str,
    allies: &[String],
    enemies: &[String],
    opendota_context: &str,
) -> String {
    let context = if opendota_context.trim().is_empty() {
        "N/A"
    } else {
        opendota_context
    };

    format!(
        r#"You are a Dota 2 expert coach and analyst.

Goal: Generate a personalized, strategic hero guide for {hero} playing as **{role}**. The guide must be tailored to the specific matchup context provided below.

Matchup Context:
- Selected Hero: {hero}
- Role: {role}
- Allied Team Picks: {allies}
- Enemy Team Picks: {enemies}

**Extra Data from OpenDota API (use this to inform your suggestions):**
{context}

Instructions:
- Your response must be a valid single JSON object. Do not include any text or markdown outside the JSON object.
- Tailor all guidance to this specific draft and matchup. Use the OpenDota data to provide statistically-backed advice.
- Avoid generic advice. All recommendations must be matchup-specific and practical.
- Be concise: 4-5 bullet points per section max.

Required JSON Structure:

{{
  "itemBuild": {{
    "startingItems": ["Tango", "Quelling Blade"],
    "coreItems": [
      {{ "item": "Black King Bar", "reason": "To counter enemy disables" }}
    ],
    "situationalItems": [
      {{ "item": "Lotus Orb", "reason": "To reflect or remove silences" }}
    ]
  }},
  "skillBuild": "Prioritize Arc Lightning for lane harass. Suggested build: Q-Q-E-Q-R-Q-Q.",
  "laningPhase": ["Focus on safe last-hitting with your high base damage."],
  "midGame": ["Join fights after key item timings."],
  "lateGame": ["Position behind your frontline."],
  "thingsToAvoid": ["Avoid face-checking high ground without vision."]
}}

Additional Guidelines:
- Be specific with item and skill justifications, explaining *why* they are good against this enemy team composition.
- Use accurate Dota 2 item/spell names only.
- Your response must be 100% valid JSON. No extra commentary."#,
        hero = hero_name,
        role = role,
        allies = roster_line(allies),
        enemies = roster_line(enemies),
        context = context,
    )
}

/// Insights prompt z dohraného zápasu — statistiky všech hráčů plus spočítané
/// highlighty, odpověď je raw JSON objekt s povinným "insights" klíčem.
pub fn insights_prompt(
    snapshot: &MatchSnapshot,
    metrics: &[PerformanceMetric],
    heroes: &HeroLookup,
) -> String {
    let winner = if snapshot.radiant_win { "Radiant" } else { "Dire" };

    let mut player_lines = String::new();
    for p in &snapshot.players {
        let side = if p.is_radiant() { "Radiant" } else { "Dire" };
        player_lines.push_str(&format!(
            "- {} ({}, {side}): {}/{}/{} KDA, {} GPM, {} XPM, {} net worth, {} last hits, {} observer wards\n",
            p.display_name(),
            heroes.localized(p.hero_id),
            p.kills,
            p.deaths,
            p.assists,
            p.gold_per_min,
            p.xp_per_min,
            p.net_worth,
            p.last_hits,
            p.obs_placed,
        ));
    }

    let mut metric_lines = String::new();
    for m in metrics {
        metric_lines.push_str(&format!(
            "- {}: {} — score {}/100 (grade {}), {}\n",
            m.category.label(),
            m.player_name,
            m.score,
            m.grade.label(),
            m.detail,
        ));
    }

    format!(
        r#"You are a Dota 2 expert coach and analyst.

Goal: Analyze the finished match below and produce actionable gameplay insights.

Match Summary:
- Match ID: {id}
- Duration: {duration}
- Score: Radiant {rs} : {ds} Dire ({winner} victory)

Players:
{player_lines}
Computed Performance Highlights:
{metric_lines}
Instructions:
- Your response must be a valid single JSON object. Do not include any text or markdown outside the JSON object.
- Provide 4-6 insights. Each insight must reference concrete numbers from the stats above.
- Severity reflects how much the issue decided the game.

Required JSON Structure:

{{
  "insights": [
    {{
      "type": "warning|improvement|vision|objective",
      "title": "High Early Game Deaths",
      "description": "What happened, with numbers.",
      "suggestion": "One concrete thing to do differently.",
      "severity": "high|medium|low"
    }}
  ],
  "coachingRecommendations": ["One-line habit to practice next game."]
}}"#,
        id = snapshot.match_id,
        duration = format_duration(snapshot.duration),
        rs = snapshot.radiant_score,
        ds = snapshot.dire_score,
    )
}

/// Counter-pick návrhy pro rozehraný draft — odpověď v ```json fenced bloku.
pub fn counter_pick_prompt(allies: &[String], enemies: &[String]) -> String {
    format!(
        r#"**Dota 2 Counter Picker Assistant**

**Goal:** Suggest the best remaining hero picks for the allied team given the draft below.

**Draft Context:**
- **Allied Team:** {allies}
- **Enemy Team:** {enemies}

**Task:** Provide 3-5 hero suggestions that counter the enemy draft and synergize with the allied picks. For each suggestion give the hero name, the role it should fill, and a short matchup-specific reason.

**Output Format:** Your response MUST be a single, valid JSON object inside a ```json code block. Do not include any other text, notes, or markdown formatting outside of the JSON object.

Required JSON Structure:

```json
{{
  "suggestions": [
    {{ "hero": "Axe", "role": "Offlane", "reason": "Counter Call punishes their melee core." }}
  ]
}}
```"#,
        allies = roster_line(allies),
        enemies = roster_line(enemies),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use match_source::Player;
    use metrics_engine::compute_highlights;

    #[test]
    fn duration_formats_as_minutes_seconds() {
        assert_eq!(format_duration(0), "0:00");
        assert_eq!(format_duration(65), "1:05");
        assert_eq!(format_duration(2400), "40:00");
    }

    #[test]
    fn guide_prompt_carries_draft_and_context() {
        let prompt = hero_guide_prompt(
            "Zeus",
            "Mid",
            &["Juggernaut (Carry)".into()],
            &["Anti-Mage".into()],
            "- **Most Popular Items**: Aghanim's Scepter.\n",
        );
        assert!(prompt.contains("hero guide for Zeus"));
        assert!(prompt.contains("Juggernaut (Carry)"));
        assert!(prompt.contains("Anti-Mage"));
        assert!(prompt.contains("Aghanim's Scepter"));
        assert!(!prompt.contains("N/A"));
    }

    #[test]
    fn guide_prompt_placeholder_without_context() {
        let prompt = hero_guide_prompt("Zeus", "Mid", &[], &[], "  ");
        assert!(prompt.contains("N/A"));
        assert!(prompt.contains("Allied Team Picks: None"));
    }

    #[test]
    fn insights_prompt_embeds_stats_and_metrics() {
        let snap = MatchSnapshot {
            match_id: 42,
            duration: 1800,
            radiant_win: true,
            radiant_score: 30,
            dire_score: 12,
            players: vec![Player {
                personaname: Some("Shadow_Blade".into()),
                gold_per_min: 620,
                kills: 9,
                net_worth: 21_000,
                ..Default::default()
            }],
            ..Default::default()
        };
        let metrics = compute_highlights(&snap);
        let prompt = insights_prompt(&snap, &metrics, &match_source::HeroLookup::default());
        assert!(prompt.contains("Match ID: 42"));
        assert!(prompt.contains("Duration: 30:00"));
        assert!(prompt.contains("Shadow_Blade"));
        assert!(prompt.contains("620 GPM"));
        assert!(prompt.contains("Farming"));
        assert!(prompt.contains("\"insights\""));
    }

    #[test]
    fn counter_pick_prompt_requests_fenced_json() {
        let prompt = counter_pick_prompt(&["Zeus".into()], &["Axe".into()]);
        assert!(prompt.contains("```json"));
        assert!(prompt.contains("\"suggestions\""));
    }
}
