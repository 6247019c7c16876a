use crate::error::PipelineError;

/// A fully rendered prompt, ready to send.
#[derive(Debug, Clone)]
pub struct LlmPrompt {
    pub system: String,
    pub user: String,
}

/* ============================================================
   System prompts (stable, reused)
   ============================================================ */

fn text_system_prompt() -> String {
    r#"
You are an expert embedded systems engineer who writes correct, minimal, high-signal C unit tests.

Rules:
- Follow the requested output format exactly
- Do NOT refactor or restate production code
- Tests must be deterministic and runnable on real hardware
- Only output what the task asks for, nothing else
"#
    .trim()
    .to_string()
}

fn json_system_prompt() -> String {
    r#"
You are a precise assistant that answers with machine-readable JSON.

Rules:
- Output exactly one raw, parsable JSON value
- No markdown, no code fences, no commentary
- Use plain double-quoted strings
"#
    .trim()
    .to_string()
}

/* ============================================================
   Stage templates
   ============================================================ */

const SUMMARIZE_TEMPLATE: &str = r#"
Based on the following file, list all functions in JSON format as the following:
{json_example}
The description should include information such as:
- Comments
- Related functions
- What the function returns (not just the return type, but a description of what the return value is)
- Extra context and assumptions

{file_contents}
"#;

const JSON_EXAMPLE: &str = r#"
export interface FunctionInfo {
  [name: string]: {
    description: string;
    returnType: string;
    parameters: Record<string, { description: string; type: string }>;
  };
}
"#;

const SELECT_TESTABLE_TEMPLATE: &str = r#"
Given the following function summaries, narrow down the list of functions you should test and return them as an array.
Only output a raw, parsable JSON string, with no additional formatting, markdown, or code block syntax.
Do not enclose the output in triple backticks or any other delimiters.

Summaries: {summaries}
"#;

const EXPLORE_CONDITIONS_TEMPLATE: &str = r#"
Given a testable function and the source code it belongs to, explore testable conditions (expected return values, if statements, loops, and so on) for the function.
Always consider these conditions:
- What if the function is partially successful (what if a read completes halfway)?
- What if the function completely fails?

Go through all possible parameters, including edge cases. What happens if parameter A is null? What happens if parameter B is valid but does not exist in the database?
For example:
fn read_and_sum(file_A, file_B, offset_A, offset_B):
- What if file_A/file_B is null?
- What if offset_A/offset_B is a negative number?
- What if everything is valid but A or B are greater than the file size?
- What if a read is successful but the sum exceeds the max value of an int?
- What if the read fails?
- What if the read value is not an int?

You MUST include ALL POSSIBLE CONDITIONS and ALL POSSIBLE PARAMETERS. DO NOT ASSUME that a success or failure condition can cover other conditions.
You should also include any other conditions that you think are important to test.

Output the result in JSON format where the keys are the function names and the values the list of conditions as a paragraph description.
The description should include information such as:
- Whether the condition is a success or failure condition
- What the condition is checking for
- What the condition is doing
- Any other relevant information

Example output:
{{
  "function_name": [
    "condition_1 is a success condition that checks for X and does Y. The return value should be Z",
    "condition_2 is a failure condition that checks for A and does B. The return value should be C"
  ]
}}

Only output a raw, parsable JSON string, with no additional formatting, markdown, or code block syntax.
Do not enclose the output in triple backticks or any other delimiters.

Testable function: {function}
Source code: {file_contents}
"#;

const GENERATE_TEST_TEMPLATE: &str = r#"
Given the following instructions on generating tests, the conditions your test should explore, and the source code, generate a test for {function_name}.

For each condition, create an initialize -> call -> validate pattern within the test function. Always comment beforehand to clarify your intent.
The test should be in the style of Unity tests, which are used for testing embedded systems. The tests should be written in C and follow the Unity test framework conventions.
Test functions should be named test_{module}_<function_name>.
DO NOT CREATE MOCKS, tests are run on real hardware.

Only output raw C code, with no additional formatting, markdown, or code block syntax. Do not enclose the output in triple backticks or any other delimiters.

Conditions:
{conditions}

Source code: {file_contents}
"#;

/* ============================================================
   Stage builders
   ============================================================ */

/// Stage 1: enumerate and describe every function in the file.
pub fn summarize(file_contents: &str) -> Result<LlmPrompt, PipelineError> {
    let user = render(
        SUMMARIZE_TEMPLATE,
        &[
            ("json_example", JSON_EXAMPLE.trim()),
            ("file_contents", file_contents),
        ],
    )?;

    Ok(LlmPrompt {
        system: text_system_prompt(),
        user,
    })
}

/// Stage 2: narrow the summaries down to functions worth testing.
pub fn select_testable(summaries: &str) -> Result<LlmPrompt, PipelineError> {
    let user = render(SELECT_TESTABLE_TEMPLATE, &[("summaries", summaries)])?;

    Ok(LlmPrompt {
        system: json_system_prompt(),
        user,
    })
}

/// Stage 3: enumerate test conditions for one selected function.
pub fn explore_conditions(function: &str, file_contents: &str) -> Result<LlmPrompt, PipelineError> {
    let user = render(
        EXPLORE_CONDITIONS_TEMPLATE,
        &[("function", function), ("file_contents", file_contents)],
    )?;

    Ok(LlmPrompt {
        system: json_system_prompt(),
        user,
    })
}

/// Stage 4: emit Unity test source for one function and its conditions.
pub fn generate_test(
    function_name: &str,
    module: &str,
    conditions: &[String],
    file_contents: &str,
) -> Result<LlmPrompt, PipelineError> {
    let condition_block = conditions
        .iter()
        .map(|c| format!("- {c}"))
        .collect::<Vec<_>>()
        .join("\n");

    let user = render(
        GENERATE_TEST_TEMPLATE,
        &[
            ("function_name", function_name),
            ("module", module),
            ("conditions", &condition_block),
            ("file_contents", file_contents),
        ],
    )?;

    Ok(LlmPrompt {
        system: text_system_prompt(),
        user,
    })
}

/* ============================================================
   Template rendering
   ============================================================ */

/// Substitute `{name}` placeholders. `{{` and `}}` escape literal braces.
/// The template is scanned once, so substituted values are never
/// re-interpreted as placeholders (source files are full of braces).
fn render(template: &str, vars: &[(&str, &str)]) -> Result<String, PipelineError> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.trim().chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(ch) => name.push(ch),
                        None => {
                            return Err(PipelineError::Template { variable: name });
                        }
                    }
                }

                match vars.iter().find(|(k, _)| *k == name) {
                    Some((_, value)) => out.push_str(value),
                    None => {
                        return Err(PipelineError::Template { variable: name });
                    }
                }
            }
            _ => out.push(c),
        }
    }

    Ok(out)
}
