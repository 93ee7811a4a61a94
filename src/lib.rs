//! # Reforge - exam bank rewriting toolkit
//!
//! Small, single-run transformations over JSON documents of exam-question
//! records (QCM banks): rename a field's value through a lookup table, set a
//! field to a constant, collect the unique values of a field, put record
//! keys into a fixed order, or re-encode the text.
//!
//! ## Modules
//!
//! - **rewrite**: the recursive [`FieldRewriter`] and its [`RewriteRule`]s
//! - **encoding**: repair of double-decoded UTF-8 text
//! - **document**: loading, shape checks and atomic pretty-printed saves
//!
//! ## Quick Start
//!
//! ```rust
//! use reforge::rewrite::{apply, RewriteRule};
//! use serde_json::json;
//!
//! let data = json!([
//!     {"Subtopic": "La motricité gastrique", "X": 1},
//!     {"Subtopic": "Other", "X": 2}
//! ]);
//!
//! let rule = RewriteRule::lookup([("La motricité gastrique", "Motricité Gastrique")]);
//! let result = apply(data, "Subtopic", &rule);
//!
//! assert_eq!(result.changes, 1);
//! assert_eq!(result.value[0]["Subtopic"], "Motricité Gastrique");
//! ```

use log::info;
use serde_json::Value;

pub mod document;
pub mod encoding;
pub mod error;
pub mod rewrite;
pub mod types;

// Re-export commonly used types for convenience
pub use error::{ReforgeError, Result};
pub use rewrite::{FieldRewriter, KeyOrder, Rewrite, RewriteRule, UnknownKeys};
pub use types::{CleanConfig, CleanReport, RunConfig, RunReport, Shape, DEFAULT_INDENT};

/// Main entry point: load, rewrite and save one document
///
/// Nothing is written until the whole tree has been rewritten.
pub fn run(config: &RunConfig) -> Result<RunReport> {
    // Fail before reading anything if there is nowhere to write
    if config.rule.mutates() && config.output.is_none() {
        return Err(ReforgeError::MissingOutput);
    }

    let mut data = document::load(&config.input)?;
    document::check_shape(&data, config.shape)?;

    match config.rule {
        RewriteRule::Reorder { .. } => info!("Applying reorder rule to every object"),
        ref rule => info!("Applying {} rule to '{}' values", rule.name(), config.key),
    }
    let rewriter = FieldRewriter::new(config.key.clone(), config.rule.clone());
    let rewrite = rewriter.apply_in_place(&mut data);
    info!(
        "{} matching objects, {} changed",
        rewrite.matched, rewrite.changes
    );

    let mut report = RunReport {
        input: config.input.clone(),
        output: config.output.clone(),
        records: document::record_count(&data),
        matched: rewrite.matched,
        changes: rewrite.changes,
        collected: rewrite.collected.into_iter().collect(),
        unmapped: rewrite.unmapped.into_iter().collect(),
        written: false,
    };

    let Some(output) = &config.output else {
        return Ok(report);
    };

    if config.rule.mutates() {
        if config.skip_unchanged && report.changes == 0 {
            info!("No values to update, leaving {} untouched", output.display());
            return Ok(report);
        }
        document::save(output, &data, config.indent)?;
    } else {
        document::save(output, &report.collected, config.indent)?;
    }

    info!("Saved data to {}", output.display());
    report.written = true;
    Ok(report)
}

/// Re-encode a document: escapes decoded, non-ASCII written literally,
/// and optionally double-decoded UTF-8 repaired
pub fn clean(config: &CleanConfig) -> Result<CleanReport> {
    let mut data: Value = document::load(&config.input)?;

    let repaired = if config.repair {
        encoding::repair_mojibake(&mut data)
    } else {
        0
    };
    if repaired > 0 {
        info!("Repaired {} garbled strings", repaired);
    }

    document::save(&config.output, &data, config.indent)?;
    info!("Wrote cleaned data to {}", config.output.display());

    Ok(CleanReport {
        input: config.input.clone(),
        output: config.output.clone(),
        records: document::record_count(&data),
        repaired,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::Path;

    fn write_input(dir: &Path, value: &Value) -> std::path::PathBuf {
        let path = dir.join("input.json");
        std::fs::write(&path, serde_json::to_string(value).unwrap()).unwrap();
        path
    }

    #[test]
    fn test_run_rename_writes_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(
            dir.path(),
            &json!([
                {"Subtopic": "La motricité gastrique", "X": 1},
                {"Subtopic": "Other", "X": 2}
            ]),
        );
        let output = dir.path().join("out.json");
        let config = RunConfig::new(
            &input,
            "Subtopic",
            RewriteRule::lookup([("La motricité gastrique", "Motricité Gastrique")]),
        )
        .with_output(&output);

        let report = run(&config).unwrap();

        assert_eq!(report.changes, 1);
        assert_eq!(report.records, 2);
        assert_eq!(report.unmapped, vec!["Other"]);
        assert!(report.written);
        assert_eq!(
            document::load(&output).unwrap(),
            json!([
                {"Subtopic": "Motricité Gastrique", "X": 1},
                {"Subtopic": "Other", "X": 2}
            ])
        );
    }

    #[test]
    fn test_run_skip_unchanged_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(dir.path(), &json!([{"Subtopic": "Sécrétion Biliaire"}]));
        let output = dir.path().join("out.json");
        let mut config = RunConfig::new(
            &input,
            "Subtopic",
            RewriteRule::lookup([("La sécrétion biliaire", "Sécrétion Biliaire")]),
        )
        .with_output(&output);
        config.skip_unchanged = true;

        let report = run(&config).unwrap();

        assert_eq!(report.changes, 0);
        assert!(!report.written);
        assert!(!output.exists());
    }

    #[test]
    fn test_run_collect_writes_sorted_values() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(
            dir.path(),
            &json!([{"Subtopic": "A"}, {"Subtopic": "B"}, {"Subtopic": "A"}]),
        );
        let output = dir.path().join("subtopics.json");
        let config = RunConfig::new(&input, "Subtopic", RewriteRule::Collect).with_output(&output);

        let report = run(&config).unwrap();

        assert_eq!(report.collected, vec!["A", "B"]);
        assert_eq!(document::load(&output).unwrap(), json!(["A", "B"]));
    }

    #[test]
    fn test_run_collect_without_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(dir.path(), &json!({"Subtopic": "A"}));
        let config = RunConfig::new(&input, "Subtopic", RewriteRule::Collect);

        let report = run(&config).unwrap();

        assert_eq!(report.collected, vec!["A"]);
        assert!(!report.written);
    }

    #[test]
    fn test_run_requires_output_for_mutating_rules() {
        let config = RunConfig::new("missing.json", "YearAsked", RewriteRule::assign("2025"));
        assert!(matches!(run(&config), Err(ReforgeError::MissingOutput)));
    }

    #[test]
    fn test_run_malformed_input_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("bad.json");
        std::fs::write(&input, "[{\"YearAsked\": ").unwrap();
        let output = dir.path().join("out.json");
        let config =
            RunConfig::new(&input, "YearAsked", RewriteRule::assign("2025")).with_output(&output);

        assert!(matches!(run(&config), Err(ReforgeError::MalformedJson { .. })));
        assert!(!output.exists());
    }

    #[test]
    fn test_run_shape_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(dir.path(), &json!({"QuestionText": "Q"}));
        let output = dir.path().join("out.json");
        let mut config = RunConfig::new(
            &input,
            "QuestionText",
            RewriteRule::reorder(KeyOrder::exam_question(), UnknownKeys::Drop),
        )
        .with_output(&output);
        config.shape = Shape::Array;

        assert!(matches!(run(&config), Err(ReforgeError::ShapeMismatch { .. })));
        assert!(!output.exists());
    }

    #[test]
    fn test_clean_repairs_and_keeps_text_literal() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.json");
        std::fs::write(&input, r#"[{"YearAsked": "Février", "Subtopic": "SÃ©cr"}]"#).unwrap();
        let output = dir.path().join("cleaned_data.json");
        let config = CleanConfig {
            input,
            output: output.clone(),
            repair: true,
            indent: DEFAULT_INDENT,
        };

        let report = clean(&config).unwrap();

        assert_eq!(report.repaired, 1);
        assert_eq!(report.records, 1);
        let text = std::fs::read_to_string(&output).unwrap();
        assert!(text.contains("\"YearAsked\": \"Février\""));
        assert!(text.contains("\"Subtopic\": \"Sécr\""));
    }
}
