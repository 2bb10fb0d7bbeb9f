//! Repository Layer - Core Traits
//!
//! Defines the abstract interfaces for data access.
//! The workflow engine only sees these traits; SQLite is one implementation.

use async_trait::async_trait;

use crate::domain::{DomainResult, Entity, NewTreatmentPlan, StatusChange, TreatmentPlanItem};

/// Core repository trait for CRUD operations
///
/// Generic over any Entity type.
/// All operations are async to support various backends.
#[async_trait]
pub trait Repository<T: Entity>: Send + Sync {
    /// Create a new entity
    async fn create(&self, entity: &T) -> DomainResult<T>;

    /// Find entity by ID
    async fn find_by_id(&self, id: T::Id) -> DomainResult<Option<T>>;

    /// List all entities
    async fn list(&self) -> DomainResult<Vec<T>>;

    /// Update an existing entity
    async fn update(&self, entity: &T) -> DomainResult<T>;

    /// Delete entity by ID
    async fn delete(&self, id: T::Id) -> DomainResult<()>;
}

/// Treatment-plan storage as the periodontal workflow uses it
#[async_trait]
pub trait PlanStore: Repository<TreatmentPlanItem> {
    /// All items of a patient, ordered by sort order
    async fn list_by_patient(&self, patient_id: &str) -> DomainResult<Vec<TreatmentPlanItem>>;

    /// Append items in one transaction, assigning fresh sort orders in input order
    async fn append_plans(&self, patient_id: &str, plans: &[NewTreatmentPlan]) -> DomainResult<Vec<TreatmentPlanItem>>;

    /// Apply status writes in one transaction; unknown ids fail the whole batch
    async fn apply_status_changes(&self, changes: &[StatusChange]) -> DomainResult<Vec<TreatmentPlanItem>>;

    /// Read the patient's items, let `plan` pick the status writes and apply
    /// them, all inside one transaction. An error from `plan` writes nothing.
    async fn rewrite_statuses<F>(&self, patient_id: &str, plan: F) -> DomainResult<Vec<TreatmentPlanItem>>
    where
        F: FnOnce(&[TreatmentPlanItem]) -> DomainResult<Vec<StatusChange>> + Send;

    async fn update_memo(&self, id: u32, memo: Option<String>) -> DomainResult<TreatmentPlanItem>;
}
