mod formulas;

pub(crate) use formulas::points_for;

use serde::Serialize;

use super::domain::{Criterion, CriterionId, CriterionKind, Student};

/// Discrete contribution of one criterion to a total, kept so score reviews
/// can be audited line by line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreLine {
    pub criterion_id: CriterionId,
    pub kind: CriterionKind,
    pub points: f64,
    pub weight_percent: f64,
    pub weighted: f64,
}

/// Scoring output for a single application.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub lines: Vec<ScoreLine>,
    pub total: f64,
}

/// Applies every active criterion to a student profile. Inactive criteria
/// contribute no line at all, so a breakdown always mirrors the rubric that
/// was live when it ran.
pub fn score_application(student: &Student, criteria: &[Criterion]) -> ScoreBreakdown {
    let mut lines = Vec::new();
    let mut total = 0.0;

    for criterion in criteria.iter().filter(|criterion| criterion.is_active()) {
        let points = points_for(criterion.kind, student);
        let weighted = points * criterion.weight_percent / 100.0;
        total += weighted;
        lines.push(ScoreLine {
            criterion_id: criterion.id,
            kind: criterion.kind,
            points,
            weight_percent: criterion.weight_percent,
            weighted,
        });
    }

    ScoreBreakdown { lines, total }
}

/// Which applications a batch rescore touches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RescoreScope {
    Year(String),
    AllYears,
}

/// Counters reported back from a batch rescore. Failed items are logged and
/// skipped, never aborting the rest of the batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RescoreSummary {
    pub rescored: usize,
    pub failed: usize,
}
