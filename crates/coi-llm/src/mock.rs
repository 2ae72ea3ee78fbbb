//! Scripted provider for tests and offline runs

use crate::LlmError;
use coi_domain::traits::LlmProvider;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

#[derive(Debug, Default)]
struct Script {
    by_marker: Vec<(String, Result<String, LlmError>)>,
    exact: HashMap<String, Result<String, LlmError>>,
    failures: VecDeque<LlmError>,
}

/// Provider that answers from a script, never touching the network
///
/// Answers are chosen in this order: a queued failure, an answer registered
/// for the exact prompt, the first answer whose marker the prompt contains,
/// and finally the fallback. Clones share the script and the call counter,
/// so a test can keep a handle after moving the provider into a pipeline.
///
/// # Examples
///
/// ```
/// use coi_llm::{LlmError, MockProvider};
/// use coi_domain::traits::LlmProvider;
///
/// let model = MockProvider::new(r#"{"policy_number": "GL-2024-001"}"#);
/// model.answer_when("CERTIFICATE HOLDER", "Riverside Property Group is covered.");
/// model.fail_next(LlmError::RateLimitExceeded);
///
/// assert!(model.generate("Extract the fields").is_err());
/// assert_eq!(model.generate("Extract the fields").unwrap(), r#"{"policy_number": "GL-2024-001"}"#);
/// assert!(model.generate("...CERTIFICATE HOLDER...").unwrap().starts_with("Riverside"));
/// assert_eq!(model.call_count(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct MockProvider {
    fallback: String,
    script: Arc<Mutex<Script>>,
    calls: Arc<AtomicUsize>,
    delay: Option<Duration>,
}

impl MockProvider {
    /// Provider answering `fallback` to anything unscripted
    pub fn new(fallback: impl Into<String>) -> Self {
        Self {
            fallback: fallback.into(),
            script: Arc::default(),
            calls: Arc::default(),
            delay: None,
        }
    }

    /// Sleep this long before every answer
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Answer `response` to exactly `prompt`
    pub fn answer(&self, prompt: impl Into<String>, response: impl Into<String>) {
        self.script().exact.insert(prompt.into(), Ok(response.into()));
    }

    /// Answer `response` to any prompt containing `marker`
    pub fn answer_when(&self, marker: impl Into<String>, response: impl Into<String>) {
        self.script().by_marker.push((marker.into(), Ok(response.into())));
    }

    /// Fail every prompt containing `marker`
    pub fn fail_when(&self, marker: impl Into<String>, error: LlmError) {
        self.script().by_marker.push((marker.into(), Err(error)));
    }

    /// Fail the next call, whatever the prompt; queued failures are used in order
    pub fn fail_next(&self, error: LlmError) {
        self.script().failures.push_back(error);
    }

    /// Calls made so far, across all clones
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new("The certificate was reviewed against every configured rule.")
    }
}

impl LlmProvider for MockProvider {
    type Error = LlmError;

    fn generate(&self, prompt: &str) -> Result<String, Self::Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }

        let mut script = self.script();
        if let Some(error) = script.failures.pop_front() {
            return Err(error);
        }
        if let Some(answer) = script.exact.get(prompt) {
            return answer.clone();
        }
        script
            .by_marker
            .iter()
            .find(|(marker, _)| prompt.contains(marker.as_str()))
            .map(|(_, answer)| answer.clone())
            .unwrap_or_else(|| Ok(self.fallback.clone()))
    }

    fn generate_structured(&self, prompt: &str, _schema: &str) -> Result<String, Self::Error> {
        self.generate(prompt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coi_domain::traits::Transient;

    #[test]
    fn test_fallback_answer() {
        let model = MockProvider::new("{}");
        assert_eq!(model.generate("Extract fields from: ACORD 25").unwrap(), "{}");
        assert_eq!(model.generate_structured("anything", "{}").unwrap(), "{}");
    }

    #[test]
    fn test_exact_prompt_beats_marker() {
        let model = MockProvider::default();
        model.answer_when("Insurer", "marker");
        model.answer("Insurer A: Travelers", "exact");

        assert_eq!(model.generate("Insurer A: Travelers").unwrap(), "exact");
        assert_eq!(model.generate("Insurer B: Hartford").unwrap(), "marker");
    }

    #[test]
    fn test_first_matching_marker_wins() {
        let model = MockProvider::default();
        model.fail_when("WORKERS COMPENSATION", LlmError::ModelNotAvailable("gemini-pro".to_string()));
        model.answer_when("LIABILITY", "liability summary");

        let err = model
            .generate("GENERAL LIABILITY / WORKERS COMPENSATION")
            .unwrap_err();
        assert!(!err.is_transient());
        assert_eq!(model.generate("GENERAL LIABILITY").unwrap(), "liability summary");
    }

    #[test]
    fn test_queued_failures_in_order() {
        let model = MockProvider::new("ok");
        model.fail_next(LlmError::RateLimitExceeded);
        model.fail_next(LlmError::Communication("connection reset".to_string()));

        assert_eq!(model.generate("x"), Err(LlmError::RateLimitExceeded));
        assert!(matches!(model.generate("x"), Err(LlmError::Communication(_))));
        assert_eq!(model.generate("x").unwrap(), "ok");
    }

    #[test]
    fn test_clones_share_script_and_calls() {
        let model = MockProvider::new("ok");
        let handle = model.clone();
        handle.fail_next(LlmError::RateLimitExceeded);

        assert!(model.generate("x").is_err());
        model.generate("x").unwrap();
        assert_eq!(handle.call_count(), 2);
    }
}
