use std::fmt;
use std::time::Duration;

use crate::scheduler::RunStats;

use super::error::EvalError;
use super::value::Value;

/// Detailed evaluation report returned by
/// [`Expression::evaluate_detailed()`](super::engine::Expression::evaluate_detailed).
///
/// Contains the result, the number of scheduler steps, the deepest native
/// batching level reached and the wall-clock duration of the evaluation.
/// A failed evaluation reports the steps taken up to the failure.
#[derive(Debug, Clone)]
#[must_use]
pub struct EvaluationReport {
    result: Result<Value, EvalError>,
    stats: RunStats,
    duration: Duration,
}

impl EvaluationReport {
    pub(crate) fn new(result: Result<Value, EvalError>, stats: RunStats, duration: Duration) -> Self {
        Self {
            result,
            stats,
            duration,
        }
    }

    /// The evaluation result, same as [`Expression::evaluate()`](super::engine::Expression::evaluate).
    pub fn result(&self) -> Result<&Value, &EvalError> {
        self.result.as_ref()
    }

    /// Consume the report, keeping only the result.
    pub fn into_result(self) -> Result<Value, EvalError> {
        self.result
    }

    /// Scheduler steps executed.
    #[must_use]
    pub fn steps(&self) -> usize {
        self.stats.steps
    }

    /// Deepest native batching level reached.
    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.stats.max_depth
    }

    /// Wall-clock duration of the evaluation.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.duration
    }
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.result {
            Ok(v) => write!(f, "result: {v}")?,
            Err(e) => write!(f, "error: {e}")?,
        }
        write!(f, ", steps: {}", self.stats.steps)?;
        write!(f, ", depth: {}", self.stats.max_depth)?;
        write!(f, ", duration: {:?}", self.duration)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(steps: usize, max_depth: usize) -> RunStats {
        RunStats { steps, max_depth }
    }

    #[test]
    fn report_accessors() {
        let report = EvaluationReport::new(
            Ok(Value::Bool(true)),
            stats(12, 2),
            Duration::from_nanos(500),
        );

        assert_eq!(report.result(), Ok(&Value::Bool(true)));
        assert_eq!(report.steps(), 12);
        assert_eq!(report.max_depth(), 2);
        assert_eq!(report.duration(), Duration::from_nanos(500));
        assert_eq!(report.into_result(), Ok(Value::Bool(true)));
    }

    #[test]
    fn report_display_with_value() {
        let report =
            EvaluationReport::new(Ok(Value::from("x")), stats(3, 1), Duration::from_nanos(500));
        let s = report.to_string();
        assert!(s.contains("result: 'x'"));
        assert!(s.contains("steps: 3"));
        assert!(s.contains("depth: 1"));
    }

    #[test]
    fn report_display_with_error() {
        let report = EvaluationReport::new(
            Err(EvalError::BudgetExceeded { budget: 5 }),
            stats(5, 2),
            Duration::from_nanos(100),
        );
        let s = report.to_string();
        assert!(s.contains("error: step budget of 5 exceeded"));
        assert!(s.contains("steps: 5"));
        assert_eq!(report.steps(), 5);
    }
}
