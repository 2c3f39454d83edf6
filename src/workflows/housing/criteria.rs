use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::domain::{Criterion, CriterionId, CriterionKind, CriterionStatus};
use super::notify::NotificationSink;
use super::scoring::{RescoreScope, RescoreSummary};
use super::service::{HousingError, HousingService, ValidationError};
use super::store::{HousingStore, NewCriterion};

/// Fields accepted when registering a criterion. Status defaults to active.
#[derive(Debug, Clone, Deserialize)]
pub struct CriterionDraft {
    pub name: String,
    pub description: Option<String>,
    pub kind: CriterionKind,
    pub max_points: f64,
    pub weight_percent: f64,
    pub status: Option<CriterionStatus>,
}

/// Allow-listed criterion fields an update may touch.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CriterionUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub kind: Option<CriterionKind>,
    pub max_points: Option<f64>,
    pub weight_percent: Option<f64>,
    pub status: Option<CriterionStatus>,
}

impl CriterionUpdate {
    fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.kind.is_none()
            && self.max_points.is_none()
            && self.weight_percent.is_none()
            && self.status.is_none()
    }

    /// Weight, status, and kind all feed the scoring formulas, so touching
    /// any of them invalidates every stored score.
    fn touches_scoring(&self) -> bool {
        self.weight_percent.is_some() || self.status.is_some() || self.kind.is_some()
    }
}

/// A criterion write plus the recompute it triggered, if any.
#[derive(Debug, Clone, Serialize)]
pub struct CriterionChange {
    pub criterion: Criterion,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rescore: Option<RescoreSummary>,
}

impl<S, N> HousingService<S, N>
where
    S: HousingStore + 'static,
    N: NotificationSink + 'static,
{
    /// Register a scoring criterion, holding the active weight budget at
    /// 100%. Creating one never rescores; existing scores stay valid until a
    /// live criterion actually changes.
    pub fn create_criterion(&self, draft: CriterionDraft) -> Result<Criterion, HousingError> {
        let name = draft.name.trim();
        if name.is_empty() {
            return Err(ValidationError::MissingCriterionName.into());
        }
        let status = draft.status.unwrap_or(CriterionStatus::Active);

        if status == CriterionStatus::Active {
            let active_total = self.active_weight_total(None)?;
            if active_total + draft.weight_percent > 100.0 {
                return Err(HousingError::WeightBudgetExceeded {
                    active_total,
                    attempted: draft.weight_percent,
                });
            }
        }

        Ok(self.store.insert_criterion(NewCriterion {
            name: name.to_string(),
            description: draft.description,
            kind: draft.kind,
            max_points: draft.max_points,
            weight_percent: draft.weight_percent,
            status,
            created_at: Utc::now(),
        })?)
    }

    /// Apply allow-listed edits to a criterion. Touching weight, status, or
    /// kind triggers a synchronous recompute of every still-competing
    /// application before the call returns.
    pub fn update_criterion(
        &self,
        id: CriterionId,
        update: CriterionUpdate,
    ) -> Result<CriterionChange, HousingError> {
        if update.is_empty() {
            return Err(ValidationError::EmptyUpdate.into());
        }
        let mut criterion = self
            .store
            .criterion(id)?
            .ok_or(HousingError::CriterionNotFound { criterion: id })?;

        let next_weight = update.weight_percent.unwrap_or(criterion.weight_percent);
        let next_status = update.status.unwrap_or(criterion.status);
        if next_status == CriterionStatus::Active {
            // Budget check excludes the row under update so its old weight is
            // not counted twice.
            let active_total = self.active_weight_total(Some(id))?;
            if active_total + next_weight > 100.0 {
                return Err(HousingError::WeightBudgetExceeded {
                    active_total,
                    attempted: next_weight,
                });
            }
        }

        let touches_scoring = update.touches_scoring();
        if let Some(name) = update.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(ValidationError::MissingCriterionName.into());
            }
            criterion.name = name;
        }
        if let Some(description) = update.description {
            criterion.description = if description.trim().is_empty() {
                None
            } else {
                Some(description)
            };
        }
        if let Some(kind) = update.kind {
            criterion.kind = kind;
        }
        if let Some(max_points) = update.max_points {
            criterion.max_points = max_points;
        }
        criterion.weight_percent = next_weight;
        criterion.status = next_status;
        self.store.update_criterion(criterion.clone())?;

        let rescore = if touches_scoring {
            Some(self.rescore(RescoreScope::AllYears)?)
        } else {
            None
        };

        Ok(CriterionChange { criterion, rescore })
    }

    /// Flip a criterion between active and inactive. Always recomputes, since
    /// both directions change which formulas apply.
    pub fn set_criterion_status(
        &self,
        id: CriterionId,
        status: CriterionStatus,
    ) -> Result<CriterionChange, HousingError> {
        let mut criterion = self
            .store
            .criterion(id)?
            .ok_or(HousingError::CriterionNotFound { criterion: id })?;

        if status == CriterionStatus::Active {
            let active_total = self.active_weight_total(Some(id))?;
            if active_total + criterion.weight_percent > 100.0 {
                return Err(HousingError::WeightBudgetExceeded {
                    active_total,
                    attempted: criterion.weight_percent,
                });
            }
        }

        criterion.status = status;
        self.store.update_criterion(criterion.clone())?;

        let rescore = self.rescore(RescoreScope::AllYears)?;
        Ok(CriterionChange {
            criterion,
            rescore: Some(rescore),
        })
    }

    pub fn criterion(&self, id: CriterionId) -> Result<Criterion, HousingError> {
        self.store
            .criterion(id)?
            .ok_or(HousingError::CriterionNotFound { criterion: id })
    }

    /// List criteria, optionally narrowed to one status.
    pub fn criteria(
        &self,
        status: Option<CriterionStatus>,
    ) -> Result<Vec<Criterion>, HousingError> {
        Ok(self
            .store
            .criteria()?
            .into_iter()
            .filter(|criterion| status.map_or(true, |wanted| criterion.status == wanted))
            .collect())
    }

    fn active_weight_total(&self, exclude: Option<CriterionId>) -> Result<f64, HousingError> {
        Ok(self
            .store
            .criteria()?
            .iter()
            .filter(|criterion| criterion.is_active() && Some(criterion.id) != exclude)
            .map(|criterion| criterion.weight_percent)
            .sum())
    }
}
