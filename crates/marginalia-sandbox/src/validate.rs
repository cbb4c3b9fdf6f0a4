//! Shape checks for script output

use marginalia_domain::AnalysisResult;
use serde_json::Value;

/// List every way `output` deviates from the analysis result shape
///
/// Accepted: a plain object whose optional `categories` is an array of
/// strings, whose optional `usefulnessScore` is a number in `0..=100` and
/// whose optional `customFields` is a plain object. Other keys are ignored.
pub fn output_violations(output: &Value) -> Vec<String> {
    let Some(object) = output.as_object() else {
        return vec![format!("output must be a JSON object, got {}", kind(output))];
    };

    let mut violations = Vec::new();

    if let Some(categories) = object.get("categories") {
        match categories.as_array() {
            Some(items) => {
                if let Some(index) = items.iter().position(|item| !item.is_string()) {
                    violations.push(format!("categories[{}] must be a string", index));
                }
            }
            None => violations.push(format!(
                "categories must be an array, got {}",
                kind(categories)
            )),
        }
    }

    if let Some(score) = object.get("usefulnessScore") {
        match score.as_f64() {
            Some(value) if (0.0..=100.0).contains(&value) => {}
            Some(value) => violations.push(format!(
                "usefulnessScore must be between 0 and 100, got {}",
                value
            )),
            None => violations.push(format!(
                "usefulnessScore must be a number, got {}",
                kind(score)
            )),
        }
    }

    if let Some(fields) = object.get("customFields") {
        if !fields.is_object() {
            violations.push(format!("customFields must be an object, got {}", kind(fields)));
        }
    }

    violations
}

/// Convert already validated output into an analysis result
///
/// Categories are trimmed and blank entries dropped; a list with nothing
/// left contributes no categories. Scores are rounded to the nearest integer.
pub(crate) fn to_analysis_result(output: &Value) -> AnalysisResult {
    let categories = output
        .get("categories")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|category| !category.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .filter(|categories| !categories.is_empty());

    let usefulness_score = output
        .get("usefulnessScore")
        .and_then(Value::as_f64)
        .map(|score| score.round().clamp(0.0, 100.0) as u8);

    let custom_fields = output
        .get("customFields")
        .and_then(Value::as_object)
        .cloned();

    AnalysisResult {
        categories,
        usefulness_score,
        custom_fields,
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
