//! JSON Reply Extraction
//!
//! Models asked for bare JSON sometimes wrap it in markdown fences or add a
//! sentence around it.

/// Best-effort JSON object text from a model reply.
///
/// Prefers the content of the first ``` fence (language tag skipped), then
/// the span from the first `{` to the last `}`, else the trimmed input.
pub fn extract_json_object(response_text: &str) -> String {
    let trimmed = response_text.trim();

    if let Some(start) = trimmed.find("```") {
        let after_fence = &trimmed[start + 3..];
        let content = match after_fence.find('\n') {
            Some(nl) => &after_fence[nl + 1..],
            None => after_fence.trim_start_matches("json"),
        };
        if let Some(end) = content.find("```") {
            return content[..end].trim().to_string();
        }
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start <= end {
            return trimmed[start..=end].to_string();
        }
    }

    trimmed.to_string()
}
