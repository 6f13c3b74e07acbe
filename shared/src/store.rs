//! Storage collaborators used by the domain handlers.
//!
//! Every patient and message operation is scoped by the owning user's id, so
//! ownership is enforced by the store rather than by the request pipeline.

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{Message, MessageRole, NewPatient, Page, Patient, PatientChanges, User};
use crate::Result;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Create an account; `None` when the email is already registered.
    async fn create_user(&self, email: &str, password: &str) -> Result<Option<User>>;

    /// The account matching both email and password, if any.
    async fn authenticate(&self, email: &str, password: &str) -> Result<Option<User>>;
}

#[async_trait]
pub trait PatientStore: Send + Sync {
    /// One page of the owner's patients, newest first, plus the total count.
    async fn list_patients(&self, owner: Uuid, page: Page) -> Result<(Vec<Patient>, i64)>;

    async fn create_patient(&self, owner: Uuid, patient: NewPatient) -> Result<Patient>;

    async fn find_patient(&self, owner: Uuid, id: Uuid) -> Result<Option<Patient>>;

    async fn update_patient(&self, owner: Uuid, id: Uuid, changes: PatientChanges) -> Result<Option<Patient>>;

    /// `false` when nothing owned by `owner` matched.
    async fn delete_patient(&self, owner: Uuid, id: Uuid) -> Result<bool>;
}

#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn append_message(&self, patient_id: Uuid, role: MessageRole, content: &str) -> Result<Message>;

    /// Oldest first, at most `limit`.
    async fn list_messages(&self, patient_id: Uuid, limit: i64) -> Result<Vec<Message>>;
}

/// Everything the API handlers need from storage.
pub trait Store: UserStore + PatientStore + MessageStore {}

impl<T> Store for T where T: UserStore + PatientStore + MessageStore {}
