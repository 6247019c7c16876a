//! pipeline.rs
//!
//! The four-stage generation pipeline: summarize the file, select the
//! functions worth testing, explore conditions per function, then generate
//! one Unity test per function. Each stage's output is threaded into the
//! next through named locals.

use std::collections::HashMap;

use serde_json::Value;
use tracing::info;

use crate::error::PipelineError;
use crate::llm::prompt;
use crate::llm::ModelInvoker;
use crate::testgen::suite::TestSuite;
use crate::testgen::SourceFile;

/// Everything a run produced, intermediates included, so callers can
/// render a report without re-deriving anything.
#[derive(Debug)]
pub struct PipelineRun {
    pub summaries: String,
    pub functions: Vec<String>,
    pub conditions: HashMap<String, Vec<String>>,
    pub suite: TestSuite,
}

pub fn run_pipeline(
    model: &dyn ModelInvoker,
    source: &SourceFile,
) -> Result<PipelineRun, PipelineError> {
    // Stage 1: summarize every function in the file.
    info!(module = %source.module, "summarizing source functions");
    let summaries = model.invoke_text(&prompt::summarize(&source.contents)?)?;

    // Stage 2: narrow the summaries down to testable functions.
    let selected = model.invoke_json(&prompt::select_testable(&summaries)?)?;
    let functions = string_array(&selected).ok_or_else(|| {
        PipelineError::Contract(format!(
            "expected a JSON array of function names, got: {selected}"
        ))
    })?;
    info!(count = functions.len(), "functions selected for testing");

    // Stage 3: explore conditions for every function. This pass runs to
    // completion before any generation call: conditions first, tests after.
    let mut conditions: HashMap<String, Vec<String>> = HashMap::new();
    for function in &functions {
        let response = model.invoke_json(&prompt::explore_conditions(function, &source.contents)?)?;
        let list = condition_list(&response, function)?;
        info!(function = %function, conditions = list.len(), "conditions explored");
        conditions.insert(function.clone(), list);
    }

    // Stage 4: one Unity test per function, in selection order.
    let mut suite = TestSuite::new();
    for function in &functions {
        let conds = &conditions[function];
        let code = model.invoke_text(&prompt::generate_test(
            function,
            &source.module,
            conds,
            &source.contents,
        )?)?;
        info!(function = %function, "test generated");
        suite.push(function.clone(), code);
    }

    Ok(PipelineRun {
        summaries,
        functions,
        conditions,
        suite,
    })
}

fn string_array(value: &Value) -> Option<Vec<String>> {
    value
        .as_array()?
        .iter()
        .map(|v| v.as_str().map(str::to_owned))
        .collect()
}

fn condition_list(response: &Value, function: &str) -> Result<Vec<String>, PipelineError> {
    let entry = response.get(function).ok_or_else(|| {
        PipelineError::Contract(format!("condition response has no entry for `{function}`"))
    })?;

    string_array(entry).ok_or_else(|| {
        PipelineError::Contract(format!(
            "conditions for `{function}` are not an array of strings"
        ))
    })
}
