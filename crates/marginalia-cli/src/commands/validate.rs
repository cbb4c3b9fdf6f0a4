//! Validate command implementation.

use crate::cli::ValidateArgs;
use crate::error::{CliError, Result};
use marginalia_engine::SchemaValidator;
use serde_json::Value;
use std::fs;

/// Execute the validate command.
pub fn execute_validate(args: ValidateArgs) -> Result<()> {
    let document: Value = serde_json::from_str(&fs::read_to_string(&args.input)?)?;

    let validator = SchemaValidator::new();
    let report = if args.analysed {
        validator.validate_output(&document)
    } else {
        validator.validate_input(&document)
    };

    if !report.is_valid() {
        return Err(CliError::InvalidInput(format!(
            "{}: {}",
            args.input.display(),
            report.message()
        )));
    }

    let count = document["bookmarks"].as_array().map_or(0, Vec::len);
    println!(
        "{} is valid ({} bookmarks, {} warning(s))",
        args.input.display(),
        count,
        report.warnings.len()
    );
    Ok(())
}
