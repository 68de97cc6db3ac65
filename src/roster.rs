//! Worker registration with unique-id and unique-role enforcement.

use thiserror::Error;

use crate::types::{Role, Worker, WorkerId};

/// Why a registration attempt was rejected. Fatal to the attempt only; the
/// roster and every earlier registration stay usable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error("worker id {0} is already registered")]
    DuplicateId(WorkerId),
    #[error("role {0} is already bound to worker {1}")]
    DuplicateRole(Role, WorkerId),
    #[error("invalid task number {0} (expected 1..=5)")]
    InvalidRole(usize),
    #[error("roster is full ({0} workers)")]
    RosterFull(usize),
}

/// The worker pool: at most one worker per role, unique ids, capped at the
/// number of roles.
pub struct Roster {
    workers: Vec<Worker>,
}

impl Roster {
    pub fn new() -> Self {
        Self {
            workers: Vec::new(),
        }
    }

    /// Register a worker by the original 1-based task number.
    pub fn register(
        &mut self,
        id: WorkerId,
        name: impl Into<String>,
        task_number: usize,
    ) -> Result<&Worker, RegistrationError> {
        let role = Role::from_index(task_number)
            .ok_or(RegistrationError::InvalidRole(task_number))?;
        self.register_role(id, name, role)
    }

    /// Register a worker for an explicit role.
    pub fn register_role(
        &mut self,
        id: WorkerId,
        name: impl Into<String>,
        role: Role,
    ) -> Result<&Worker, RegistrationError> {
        if self.workers.len() >= Role::ALL.len() {
            return Err(RegistrationError::RosterFull(self.workers.len()));
        }
        if self.workers.iter().any(|w| w.id == id) {
            return Err(RegistrationError::DuplicateId(id));
        }
        if let Some(holder) = self.workers.iter().find(|w| w.role == role) {
            return Err(RegistrationError::DuplicateRole(role, holder.id));
        }
        self.workers.push(Worker::new(id, name, role));
        Ok(self.workers.last().expect("just pushed"))
    }

    /// All registered workers, in registration order.
    pub fn workers(&self) -> &[Worker] {
        &self.workers
    }
}
