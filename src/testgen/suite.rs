use serde::Serialize;

/// Unity test source for one function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedTest {
    pub function: String,
    pub code: String,
}

/// Accumulates generated tests in insertion order. No dedup, no sorting:
/// the suite order must match the selection order.
#[derive(Debug, Default, Clone, Serialize)]
pub struct TestSuite {
    tests: Vec<GeneratedTest>,
}

impl TestSuite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, function: impl Into<String>, code: impl Into<String>) {
        self.tests.push(GeneratedTest {
            function: function.into(),
            code: code.into(),
        });
    }

    pub fn len(&self) -> usize {
        self.tests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GeneratedTest> {
        self.tests.iter()
    }

    pub fn tests(&self) -> &[GeneratedTest] {
        &self.tests
    }
}
