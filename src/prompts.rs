use crate::models::ScoredMatch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Maximum,
    Minimum,
    Summary,
    Pattern,
    General,
}

// Checked in order; the first group with a hit wins.
const KEYWORDS: &[(QueryKind, &[&str])] = &[
    (QueryKind::Maximum, &["maximum", "highest", "largest"]),
    (QueryKind::Minimum, &["minimum", "lowest", "smallest"]),
    (QueryKind::Summary, &["summary", "overview"]),
    (QueryKind::Pattern, &["pattern", "trend"]),
];

impl QueryKind {
    pub fn classify(query: &str) -> Self {
        let query = query.to_lowercase();
        KEYWORDS
            .iter()
            .find(|(_, words)| words.iter().any(|w| query.contains(w)))
            .map(|(kind, _)| *kind)
            .unwrap_or(QueryKind::General)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QueryKind::Maximum => "maximum",
            QueryKind::Minimum => "minimum",
            QueryKind::Summary => "summary",
            QueryKind::Pattern => "pattern",
            QueryKind::General => "general",
        }
    }

    pub fn system_prompt(&self) -> &'static str {
        match self {
            QueryKind::Maximum => MAXIMUM_PROMPT,
            QueryKind::Minimum => MINIMUM_PROMPT,
            QueryKind::Summary => SUMMARY_PROMPT,
            QueryKind::Pattern => PATTERN_PROMPT,
            QueryKind::General => GENERAL_PROMPT,
        }
    }
}

const MAXIMUM_PROMPT: &str = "You are a financial data analyst. The user is asking for the largest \
values in their transaction records. Compare the amounts in the provided records, identify the \
highest ones, and state the amount, date, counterparty and bank of each. Only use figures that \
appear in the records. If the records do not contain amounts, say so.";

const MINIMUM_PROMPT: &str = "You are a financial data analyst. The user is asking for the smallest \
values in their transaction records. Compare the amounts in the provided records, identify the \
lowest ones, and state the amount, date, counterparty and bank of each. Only use figures that \
appear in the records. If the records do not contain amounts, say so.";

const SUMMARY_PROMPT: &str = "You are a financial data analyst. Give a concise overview of the \
provided transaction records: how many there are, the total and typical amounts, the banks and \
counterparties involved and the period covered. Only use figures that appear in the records.";

const PATTERN_PROMPT: &str = "You are a financial data analyst. Look for patterns in the provided \
transaction records: recurring payments, frequent counterparties, changes over time and unusual \
outliers. Explain each pattern briefly and cite the records that show it. Do not invent data.";

const GENERAL_PROMPT: &str = "You are a helpful assistant that answers questions about the user's \
financial transaction records. Answer using only the provided records. If the answer is not in \
the records, say that you could not find it.";

/// Render matches as one context block, best match first.
pub fn format_context(matches: &[ScoredMatch]) -> String {
    if matches.is_empty() {
        return "No relevant records were found.".to_string();
    }
    matches
        .iter()
        .enumerate()
        .map(|(i, m)| format!("Record {} (score {:.3}):\n{}", i + 1, m.score, m.document.page_content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn user_prompt(context: &str, query: &str) -> String {
    format!("Transaction records:\n{}\n\nQuestion: {}", context, query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Document, DocumentMetadata};

    #[test]
    fn test_keyword_classification() {
        assert_eq!(QueryKind::classify("What was the HIGHEST payment?"), QueryKind::Maximum);
        assert_eq!(QueryKind::classify("largest deposit"), QueryKind::Maximum);
        assert_eq!(QueryKind::classify("smallest transfer in May"), QueryKind::Minimum);
        assert_eq!(QueryKind::classify("Give me an overview"), QueryKind::Summary);
        assert_eq!(QueryKind::classify("spending trend by month"), QueryKind::Pattern);
        assert_eq!(QueryKind::classify("who paid rent?"), QueryKind::General);
    }

    #[test]
    fn test_first_group_wins() {
        // Both "maximum" and "trend" appear; the maximum group is checked first.
        assert_eq!(QueryKind::classify("maximum trend"), QueryKind::Maximum);
        assert_eq!(QueryKind::classify("lowest summary"), QueryKind::Minimum);
    }

    #[test]
    fn test_substring_match() {
        // "summary" is matched inside "summarys"; matching is plain substring.
        assert_eq!(QueryKind::classify("summarys please"), QueryKind::Summary);
        assert_eq!(QueryKind::classify("patterns"), QueryKind::Pattern);
    }

    #[test]
    fn test_each_kind_has_distinct_prompt() {
        let kinds = [
            QueryKind::Maximum,
            QueryKind::Minimum,
            QueryKind::Summary,
            QueryKind::Pattern,
            QueryKind::General,
        ];
        for (i, a) in kinds.iter().enumerate() {
            for b in &kinds[i + 1..] {
                assert_ne!(a.system_prompt(), b.system_prompt());
            }
        }
    }

    #[test]
    fn test_format_context() {
        let matches = vec![
            ScoredMatch {
                document: Document {
                    page_content: "amount: 10".to_string(),
                    metadata: DocumentMetadata { source: "a.csv".to_string(), row: 0 },
                },
                score: 0.9,
            },
            ScoredMatch {
                document: Document {
                    page_content: "amount: 20".to_string(),
                    metadata: DocumentMetadata { source: "a.csv".to_string(), row: 1 },
                },
                score: 0.75,
            },
        ];
        let context = format_context(&matches);
        assert_eq!(
            context,
            "Record 1 (score 0.900):\namount: 10\n\nRecord 2 (score 0.750):\namount: 20"
        );
    }

    #[test]
    fn test_format_empty_context() {
        assert_eq!(format_context(&[]), "No relevant records were found.");
    }
}
