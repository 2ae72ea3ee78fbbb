//! ComplianceEvaluator - applies a RuleSet to one document's fields

use crate::{EvaluationError, RuleSet};
use coi_domain::{ComplianceResult, DocumentId, EvaluationContext, FieldMap, RunId};
use tracing::{debug, info};

/// Applies a RuleSet to a FieldMap under an explicit context
///
/// Evaluation is a pure function of its inputs: the same fields, rules and
/// context always produce the same [`ComplianceResult`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ComplianceEvaluator;

impl ComplianceEvaluator {
    /// Create an evaluator
    pub fn new() -> Self {
        Self
    }

    /// Evaluate every rule and derive the aggregate status
    ///
    /// # Arguments
    ///
    /// * `run_id` - Run the result belongs to
    /// * `document_id` - Evaluated document
    /// * `fields` - Extracted fields
    /// * `rules` - Rules to apply
    /// * `ctx` - Reference date, minimums and required endorsements
    ///
    /// # Errors
    ///
    /// Returns [`EvaluationError::InvalidContext`] when the context fails
    /// validation; no rule runs in that case. Rule-level problems never
    /// surface here, they become failed verdicts.
    pub fn evaluate(
        &self,
        run_id: RunId,
        document_id: DocumentId,
        fields: &FieldMap,
        rules: &RuleSet,
        ctx: &EvaluationContext,
    ) -> Result<ComplianceResult, EvaluationError> {
        ctx.validate().map_err(EvaluationError::InvalidContext)?;

        debug!(
            "Evaluating {} rules against {} fields of {}",
            rules.len(),
            fields.len(),
            document_id
        );
        let verdicts = rules.evaluate_all(fields, ctx);
        let result = ComplianceResult::new(run_id, document_id, verdicts);

        info!(
            "Document {} is {} ({} blocking failures, {} advisory failures)",
            result.document_id,
            result.status,
            result.blocking_failures().count(),
            result.advisory_failures().count()
        );
        Ok(result)
    }
}
