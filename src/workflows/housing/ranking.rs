use std::cmp::Ordering;

use super::domain::Application;

/// Competition order for the global ranking: higher score first, earlier
/// submission wins score ties, lower id settles exact ties so repeated runs
/// agree on the order.
pub(crate) fn rank_order(a: &Application, b: &Application) -> Ordering {
    b.total_score
        .total_cmp(&a.total_score)
        .then_with(|| a.submitted_at.cmp(&b.submitted_at))
        .then_with(|| a.id.cmp(&b.id))
}

/// Sorts the still-competing set into rank order and stamps dense 1-based
/// ranks. The caller persists every row, so each refresh fully overwrites the
/// previous ranking rather than patching it.
pub(crate) fn ranked(mut competing: Vec<Application>) -> Vec<Application> {
    competing.sort_by(rank_order);
    for (position, application) in competing.iter_mut().enumerate() {
        application.rank = Some(position as u32 + 1);
    }
    competing
}
