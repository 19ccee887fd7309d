/// DotaForge — AI Extractor
///
/// Převádí nedůvěryhodný free-text z generativního API na validované struktury.
/// Extrakce JSON payloadu: ```json fenced blok má vždy přednost, fallback je
/// holý objekt/pole nalezený brace matchingem. Celá extrakce žije za tímhle
/// jedním rozhraním.
///
/// Dvě schémata, dvě přísnosti:
/// - HeroGuide: lenient po polích (chybějící sekce = prázdný default)
/// - InsightReport / PickSuggestions: top-level klíč povinný, jinak chyba

use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

pub mod prompts;

#[derive(Debug, Error)]
pub enum ExtractError {
    /// V odpovědi není žádný JSON-shaped podřetězec
    #[error("could not find a JSON block in the AI response")]
    MalformedResponse { raw: String },
    /// JSON-shaped podřetězec nalezen, ale neprošel parserem
    #[error("AI response JSON failed to parse: {message}")]
    InvalidJson { raw: String, message: String },
    /// Parsovaný JSON nemá strukturálně povinný top-level klíč
    #[error("AI response is missing required field \"{field}\"")]
    MissingField { field: &'static str, raw: String },
    /// Envelope bez textového obsahu
    #[error("AI returned an empty response")]
    EmptyCandidate,
}

// ── Lokalizace a parse JSON payloadu ──────────────────────────────────────────

/// Najde a naparsuje JSON payload ve free-text odpovědi.
pub fn parse_value(text: &str) -> Result<Value, ExtractError> {
    let candidate = locate_payload(text)
        .ok_or_else(|| ExtractError::MalformedResponse { raw: text.to_string() })?;
    serde_json::from_str(candidate).map_err(|e| ExtractError::InvalidJson {
        raw:     text.to_string(),
        message: e.to_string(),
    })
}

fn locate_payload(text: &str) -> Option<&str> {
    // fenced blok vyhrává i když je v textu holý objekt
    let fence = Regex::new(r"(?s)```json\s*(.*?)\s*```").expect("static regex must compile");
    if let Some(caps) = fence.captures(text) {
        debug!("payload located via fenced block");
        return caps.get(1).map(|m| m.as_str());
    }
    bare_span(text)
}

/// Holý span: první otvírák ({ nebo [, podle toho co je v textu dřív)
/// až poslední odpovídající uzavírák stejného druhu.
fn bare_span(text: &str) -> Option<&str> {
    let (close, start) = match (text.find('{'), text.find('[')) {
        (Some(o), Some(a)) if a < o => (']', a),
        (Some(o), _) => ('}', o),
        (None, Some(a)) => (']', a),
        (None, None) => return None,
    };
    let end = text.rfind(close)?;
    if end <= start {
        return None;
    }
    Some(&text[start..=end])
}

// ── Provider envelopes ────────────────────────────────────────────────────────
// Dva tvary odpovědí z proxy: Gemini vrací text v candidates[..], OpenAI
// v choices[..] (obsah je nominálně rovnou JSON, ale extrakcí projde stejně).

pub fn gemini_text(envelope: &Value) -> Result<&str, ExtractError> {
    envelope
        .pointer("/candidates/0/content/parts/0/text")
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .ok_or(ExtractError::EmptyCandidate)
}

pub fn openai_text(envelope: &Value) -> Result<&str, ExtractError> {
    envelope
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .ok_or(ExtractError::EmptyCandidate)
}

// ── Hero guide (lenient po polích) ────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize)]
pub struct HeroGuide {
    pub item_build:      ItemBuild,
    pub skill_build:     String,
    pub laning_phase:    Vec<String>,
    pub mid_game:        Vec<String>,
    pub late_game:       Vec<String>,
    pub things_to_avoid: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ItemBuild {
    pub starting_items:    Vec<String>,
    pub core_items:        Vec<ItemChoice>,
    pub situational_items: Vec<ItemChoice>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemChoice {
    pub item:   String,
    pub reason: String,
}

/// Guide je lenient: každá chybějící sekce degraduje na prázdný default,
/// žádný top-level klíč není povinný.
pub fn parse_guide(text: &str) -> Result<HeroGuide, ExtractError> {
    let v = parse_value(text)?;
    let item_build = v.get("itemBuild").cloned().unwrap_or(Value::Null);
    Ok(HeroGuide {
        item_build: ItemBuild {
            starting_items:    str_list(&item_build, "startingItems"),
            core_items:        item_choices(&item_build, "coreItems"),
            situational_items: item_choices(&item_build, "situationalItems"),
        },
        skill_build:     str_field(&v, "skillBuild"),
        laning_phase:    str_list(&v, "laningPhase"),
        mid_game:        str_list(&v, "midGame"),
        late_game:       str_list(&v, "lateGame"),
        things_to_avoid: str_list(&v, "thingsToAvoid"),
    })
}

// ── Insights (strict top-level) ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct InsightReport {
    pub insights:                 Vec<Insight>,
    pub coaching_recommendations: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Insight {
    pub kind:        String,   // "warning" | "improvement" | "vision" | "objective"
    pub title:       String,
    pub description: String,
    pub suggestion:  String,
    pub severity:    String,   // "high" | "medium" | "low"
}

/// Klíč "insights" je povinný — jeho absence shodí celou extrakci.
/// Jednotlivé položky už jsou lenient.
pub fn parse_insights(text: &str) -> Result<InsightReport, ExtractError> {
    let v = parse_value(text)?;
    let items = v
        .get("insights")
        .and_then(Value::as_array)
        .ok_or_else(|| ExtractError::MissingField { field: "insights", raw: text.to_string() })?;
    Ok(InsightReport {
        insights:                 items.iter().map(insight_from).collect(),
        coaching_recommendations: str_list(&v, "coachingRecommendations"),
    })
}

fn insight_from(v: &Value) -> Insight {
    Insight {
        kind:        str_field_or(v, "type", "improvement"),
        title:       str_field(v, "title"),
        description: str_field(v, "description"),
        suggestion:  str_field(v, "suggestion"),
        severity:    str_field_or(v, "severity", "medium"),
    }
}

// ── Counter-pick návrhy (strict top-level) ────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct PickSuggestion {
    pub hero:   String,
    pub role:   String,
    pub reason: String,
}

pub fn parse_suggestions(text: &str) -> Result<Vec<PickSuggestion>, ExtractError> {
    let v = parse_value(text)?;
    let items = v
        .get("suggestions")
        .and_then(Value::as_array)
        .ok_or_else(|| ExtractError::MissingField { field: "suggestions", raw: text.to_string() })?;
    Ok(items
        .iter()
        .map(|s| PickSuggestion {
            hero:   str_field(s, "hero"),
            role:   str_field(s, "role"),
            reason: str_field(s, "reason"),
        })
        .collect())
}

// ── Value helpery ─────────────────────────────────────────────────────────────

fn str_field(v: &Value, key: &str) -> String {
    v.get(key).and_then(Value::as_str).unwrap_or_default().to_string()
}

fn str_field_or(v: &Value, key: &str, default: &str) -> String {
    v.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default)
        .to_string()
}

fn str_list(v: &Value, key: &str) -> Vec<String> {
    v.get(key)
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(|x| x.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}

/// Bere jen objekty s "item" klíčem — starší bare-string tvar se přeskakuje
fn item_choices(v: &Value, key: &str) -> Vec<ItemChoice> {
    v.get(key)
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(|x| {
                    let item = x.get("item")?.as_str()?.to_string();
                    Some(ItemChoice { item, reason: str_field(x, "reason") })
                })
                .collect()
        })
        .unwrap_or_default()
}

// ── AI klient (thin wrapper na proxy) ─────────────────────────────────────────

#[derive(Debug, Error)]
pub enum AiCallError {
    #[error("AI proxy HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("decode failed: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiRoute {
    Gemini,
    OpenAi,
}

impl AiRoute {
    fn path(&self) -> &'static str {
        match self {
            AiRoute::Gemini => "/api/gemini",
            AiRoute::OpenAi => "/api/openai",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AiRoute::Gemini => "gemini",
            AiRoute::OpenAi => "openai",
        }
    }
}

/// Pošle prompt přes key-guarding proxy a vrátí provider envelope.
/// Žádné retry, žádná cancellation — jeden request na jednu uživatelskou akci.
pub struct AiClient {
    client:   reqwest::Client,
    base_url: String,
}

impl AiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(60))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            base_url: base_url.into(),
        }
    }

    pub async fn generate(&self, route: AiRoute, prompt: &str) -> Result<Value, AiCallError> {
        let url = format!("{}{}", self.base_url, route.path());
        let resp = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "prompt": prompt }))
            .send()
            .await?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(AiCallError::Http {
                status: status.as_u16(),
                body:   body.chars().take(200).collect(),
            });
        }
        Ok(serde_json::from_str(&body)?)
    }
}

// ── Testy ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fenced_block_is_extracted() {
        let v = parse_value("prefix ```json\n{\"a\":1}\n``` suffix").unwrap();
        assert_eq!(v, json!({"a": 1}));
    }

    #[test]
    fn fenced_block_wins_over_bare_braces() {
        let v = parse_value("intro {\"decoy\":true} ```json\n{\"a\":1}\n``` outro").unwrap();
        assert_eq!(v, json!({"a": 1}));
    }

    #[test]
    fn bare_object_span_is_fallback() {
        let v = parse_value("the model says {\"a\": [1, 2]} thanks").unwrap();
        assert_eq!(v, json!({"a": [1, 2]}));
    }

    #[test]
    fn bare_array_span_is_supported() {
        let v = parse_value("here: [1, 2, 3] done").unwrap();
        assert_eq!(v, json!([1, 2, 3]));
    }

    #[test]
    fn no_json_at_all_is_malformed() {
        let err = parse_value("no json here").unwrap_err();
        assert!(matches!(err, ExtractError::MalformedResponse { .. }));
    }

    #[test]
    fn unclosed_brace_is_malformed() {
        let err = parse_value("broken { payload").unwrap_err();
        assert!(matches!(err, ExtractError::MalformedResponse { .. }));
    }

    #[test]
    fn trailing_comma_is_invalid_json_not_malformed() {
        let err = parse_value("```json\n{\"a\":1,}\n```").unwrap_err();
        match err {
            ExtractError::InvalidJson { raw, .. } => assert!(raw.contains("a\":1")),
            other => panic!("expected InvalidJson, got {other:?}"),
        }
    }

    #[test]
    fn round_trip_through_prose_and_fence() {
        let original = json!({
            "itemBuild": { "startingItems": ["Tango"], "coreItems": [] },
            "skillBuild": "Q-W-Q-E",
            "laningPhase": ["farm", "deny"]
        });
        let wrapped = format!(
            "Sure! Here is the guide you asked for:\n```json\n{}\n```\nGood luck!",
            serde_json::to_string_pretty(&original).unwrap()
        );
        assert_eq!(parse_value(&wrapped).unwrap(), original);
    }

    #[test]
    fn gemini_envelope_unwraps_nested_text() {
        let envelope = json!({
            "candidates": [
                { "content": { "parts": [ { "text": "```json\n{\"x\":1}\n```" } ] } }
            ]
        });
        let text = gemini_text(&envelope).unwrap();
        assert_eq!(parse_value(text).unwrap(), json!({"x": 1}));
    }

    #[test]
    fn openai_envelope_unwraps_content() {
        let envelope = json!({
            "choices": [ { "message": { "content": "{\"x\":1}" } } ]
        });
        let text = openai_text(&envelope).unwrap();
        assert_eq!(parse_value(text).unwrap(), json!({"x": 1}));
    }

    #[test]
    fn empty_candidate_is_its_own_error() {
        let envelope = json!({ "candidates": [] });
        assert!(matches!(gemini_text(&envelope), Err(ExtractError::EmptyCandidate)));
        let blank = json!({ "choices": [ { "message": { "content": "   " } } ] });
        assert!(matches!(openai_text(&blank), Err(ExtractError::EmptyCandidate)));
    }

    #[test]
    fn guide_defaults_missing_sections() {
        let text = r#"{"itemBuild": {"startingItems": ["Tango", "Quelling Blade"]}, "skillBuild": "max Q"}"#;
        let guide = parse_guide(text).unwrap();
        assert_eq!(guide.item_build.starting_items.len(), 2);
        assert!(guide.item_build.core_items.is_empty());
        assert_eq!(guide.skill_build, "max Q");
        assert!(guide.laning_phase.is_empty());
        assert!(guide.things_to_avoid.is_empty());
    }

    #[test]
    fn guide_reads_item_reason_pairs() {
        let text = r#"{
            "itemBuild": {
                "coreItems": [
                    { "item": "Black King Bar", "reason": "to counter disables" },
                    "bare string from an old prompt revision"
                ]
            }
        }"#;
        let guide = parse_guide(text).unwrap();
        assert_eq!(guide.item_build.core_items.len(), 1);
        assert_eq!(guide.item_build.core_items[0].item, "Black King Bar");
    }

    #[test]
    fn missing_insights_key_fails_whole_extraction() {
        let err = parse_insights(r#"{"coachingRecommendations": ["ward more"]}"#).unwrap_err();
        match err {
            ExtractError::MissingField { field, .. } => assert_eq!(field, "insights"),
            other => panic!("expected MissingField, got {other:?}"),
        }
    }

    #[test]
    fn insight_items_are_lenient() {
        let text = r#"{
            "insights": [
                { "title": "Low GPM", "description": "supports starved", "suggestion": "stack camps" },
                { "type": "vision", "title": "Few wards", "severity": "high" }
            ]
        }"#;
        let report = parse_insights(text).unwrap();
        assert_eq!(report.insights.len(), 2);
        assert_eq!(report.insights[0].kind, "improvement");
        assert_eq!(report.insights[0].severity, "medium");
        assert_eq!(report.insights[1].kind, "vision");
        assert_eq!(report.insights[1].severity, "high");
        assert!(report.coaching_recommendations.is_empty());
    }

    #[test]
    fn suggestions_require_top_level_key() {
        assert!(matches!(
            parse_suggestions(r#"{"heroes": []}"#),
            Err(ExtractError::MissingField { field: "suggestions", .. })
        ));
        let ok = parse_suggestions(
            r#"```json
            {"suggestions": [{"hero": "Axe", "role": "Offlane", "reason": "cleaves through melee"}]}
            ```"#,
        )
        .unwrap();
        assert_eq!(ok.len(), 1);
        assert_eq!(ok[0].hero, "Axe");
    }
}
