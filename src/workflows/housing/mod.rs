//! Dormitory housing applications: weighted scoring against a configurable
//! criteria registry, a global dense ranking, capacity-based admission
//! proposals, greedy room allocation, and the appeal workflow layered on top
//! of rejections.
//!
//! The [`service::HousingService`] ties the pieces together behind a store
//! trait and a notification sink; [`router::housing_router`] exposes it over
//! HTTP.

pub mod admission;
pub mod allocation;
pub mod appeals;
pub mod criteria;
pub mod domain;
pub mod memory;
pub mod notify;
pub(crate) mod ranking;
pub mod router;
pub mod scoring;
pub mod service;
pub mod store;

#[cfg(test)]
mod tests;

pub use admission::{
    AdmissionDecision, AdmissionProposal, AdmissionRequest, ConfirmationSummary, DecisionEntry,
    ProposalEntry,
};
pub use allocation::{AllocationRequest, AllocationSummary, AssignmentView};
pub use appeals::{AppealDecision, AppealRequest, AppealRuling};
pub use criteria::{CriterionChange, CriterionDraft, CriterionUpdate};
pub use domain::{
    Appeal, AppealId, AppealStatus, Application, ApplicationDetailView, ApplicationId,
    ApplicationStatus, ApplicationView, AssignedRoomView, Criterion, CriterionId, CriterionKind,
    CriterionStatus, DeliveryStatus, Dormitory, DormitoryId, Evaluation, Notification,
    NotificationId, NotificationKind, Room, RoomId, RoomType, ScoreLineView, Student, StudentId,
};
pub use memory::MemoryStore;
pub use notify::{MemoryNotifications, NotificationDraft, NotificationSink, NotifyError};
pub use router::housing_router;
pub use scoring::{score_application, RescoreScope, RescoreSummary, ScoreBreakdown, ScoreLine};
pub use service::{
    ApplicationFilter, ApplicationUpdate, HousingError, HousingService, StudentProfileOutcome,
    StudentUpdate, SubmitApplication, ValidationError,
};
pub use store::{
    HousingStore, NewAppeal, NewApplication, NewCriterion, NewDormitory, NewRoom, NewStudent,
    StoreError,
};
