use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::Error as _;
use serde_json::Value as JsonValue;

use crate::llm::ChatModel;
use crate::models::{AnalysisResult, ScoredMatch};
use crate::rag::RAGEngine;

pub const SUMMARY_QUERY: &str = "financial transactions bank account contact payment transfer \
deposit withdrawal amount date balance credit debit";
pub const SUMMARY_LIMIT: u64 = 50;
pub const SUMMARY_SCORE_THRESHOLD: f32 = 0.6;

static CODE_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^\s*```[A-Za-z]*\s*\n?(.*?)\n?\s*```\s*$").unwrap()
});

static TRAILING_COMMA: Lazy<Regex> = Lazy::new(|| Regex::new(r",(\s*[}\]])").unwrap());

const SYSTEM_PROMPT: &str = "You are a financial analyst. You reply with a single JSON object and \
nothing else: no prose, no Markdown.";

const SCHEMA: &str = r#"{
  "transactionCounts": { "total": 0, "credits": 0, "debits": 0 },
  "bankBreakdown": [ { "name": "string", "count": 0, "totalAmount": 0.0 } ],
  "contactBreakdown": [ { "name": "string", "count": 0, "totalAmount": 0.0 } ],
  "accountBreakdown": [ { "name": "string", "count": 0, "totalAmount": 0.0 } ],
  "monthlyTrend": [ { "month": "YYYY-MM", "count": 0, "totalAmount": 0.0 } ],
  "transactionTypes": [ { "type": "string", "count": 0, "percentage": 0.0 } ],
  "keyInsights": [ "string" ],
  "executiveSummary": "string"
}"#;

pub fn build_prompt(matches: &[ScoredMatch]) -> String {
    let records = matches
        .iter()
        .map(|m| m.document.page_content.as_str())
        .collect::<Vec<_>>()
        .join("\n---\n");

    format!(
        "Analyse the following {} transaction records.\n\n\
         Records:\n{}\n\n\
         Respond with JSON matching exactly this schema. Use numbers for counts and amounts, \
         and empty arrays when a breakdown does not apply:\n{}",
        matches.len(),
        records,
        SCHEMA
    )
}

/// Remove a surrounding Markdown code fence, if any.
pub fn strip_code_fences(raw: &str) -> &str {
    match CODE_FENCE.captures(raw).and_then(|c| c.get(1)) {
        Some(body) => body.as_str().trim(),
        None => raw.trim(),
    }
}

fn repair(text: &str) -> Option<String> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(TRAILING_COMMA.replace_all(&text[start..=end], "$1").into_owned())
}

fn parse_object(text: &str) -> serde_json::Result<AnalysisResult> {
    let value: JsonValue = serde_json::from_str(text)?;
    if !value.is_object() {
        return Err(serde_json::Error::custom("expected a JSON object"));
    }
    serde_json::from_value(value)
}

/// Parse the model's answer, repairing common damage. Never fails: output
/// that cannot be read yields [`fallback`].
pub fn parse_analysis(raw: &str) -> AnalysisResult {
    let text = strip_code_fences(raw);

    let parsed = parse_object(text).or_else(|first| {
        tracing::debug!("Model output is not valid JSON ({}), attempting repair", first);
        match repair(text) {
            Some(repaired) => parse_object(&repaired),
            None => Err(first),
        }
    });

    match parsed {
        Ok(mut analysis) => {
            analysis.processing_error = false;
            analysis
        }
        Err(e) => {
            tracing::warn!("Could not parse analysis JSON: {}", e);
            fallback()
        }
    }
}

pub fn fallback() -> AnalysisResult {
    AnalysisResult {
        executive_summary: "The analysis could not be generated because the model response was \
                            not valid JSON."
            .to_string(),
        processing_error: true,
        ..AnalysisResult::default()
    }
}

fn no_records() -> AnalysisResult {
    AnalysisResult {
        executive_summary: "No transaction records matched closely enough to analyse. Upload a \
                            CSV file through /sync first."
            .to_string(),
        ..AnalysisResult::default()
    }
}

pub async fn summarize(engine: &RAGEngine, llm: &dyn ChatModel) -> Result<AnalysisResult> {
    let matches = engine
        .retrieve(SUMMARY_QUERY, SUMMARY_LIMIT, SUMMARY_SCORE_THRESHOLD)
        .await?;

    if matches.is_empty() {
        tracing::info!("No records above {} for summary", SUMMARY_SCORE_THRESHOLD);
        return Ok(no_records());
    }

    tracing::info!("Summarizing {} records", matches.len());
    let raw = llm.complete(SYSTEM_PROMPT, &build_prompt(&matches), 0.0).await?;
    Ok(parse_analysis(&raw))
}
