use regex::Regex;
use serde_json::Value as JsonValue;
use std::sync::LazyLock;

#[allow(clippy::expect_used)]
static CHART_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"```json:chart\s*([\s\S]*?)\s*```").expect("chart fence pattern is a literal")
});

/// A model reply split into display text and an optional chart block
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedReply {
    pub text: String,
    pub chart: Option<JsonValue>,
}

/// Splits the first ```json:chart block out of a raw reply.
///
/// A block whose body is not valid JSON stays in the text untouched, the
/// parse error is logged and no chart is returned.
pub fn extract_reply(raw: &str) -> ExtractedReply {
    let unchanged = || ExtractedReply {
        text: raw.to_string(),
        chart: None,
    };

    let Some(body) = CHART_FENCE
        .captures(raw)
        .and_then(|captures| captures.get(1))
    else {
        return unchanged();
    };

    match serde_json::from_str::<JsonValue>(body.as_str()) {
        Ok(chart) => ExtractedReply {
            text: CHART_FENCE.replace(raw, "").into_owned(),
            chart: Some(chart),
        },
        Err(error) => {
            tracing::warn!(%error, "malformed chart block, keeping raw text");
            unchanged()
        }
    }
}
