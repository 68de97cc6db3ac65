//! Shared identifiers, the order model, and the fixed worker roles.

use std::fmt;

/// Unique identifier for a submitted order.
pub type OrderId = u64;
/// Unique identifier for a worker thread.
pub type WorkerId = u64;
/// 1-based table number in `1..=N`.
pub type TableId = usize;

/// A guest's request for items plus an optional/assigned table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Order {
    /// Stable order identifier, assigned at submission and never reused.
    pub id: OrderId,
    /// Requested item names, immutable after submission.
    pub items: Vec<String>,
    /// Assigned table, if any.
    pub table: Option<TableId>,
    /// Set exactly once, by the worker that processed the order.
    pub completed: bool,
    /// Identity of the worker that completed the order.
    pub completed_by: Option<WorkerId>,
}

impl Order {
    /// Construct a fresh, unprocessed order.
    pub fn new(id: OrderId, items: Vec<String>, table: Option<TableId>) -> Self {
        Self {
            id,
            items,
            table,
            completed: false,
            completed_by: None,
        }
    }
}

/// The fixed task a worker performs for every order it processes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    Cook,
    Serve,
    CleanTable,
    WashDishes,
    SelectTable,
}

impl Role {
    /// All roles, in their original 1-based task order.
    pub const ALL: [Role; 5] = [
        Role::Cook,
        Role::Serve,
        Role::CleanTable,
        Role::WashDishes,
        Role::SelectTable,
    ];

    /// Map the original 1-based task number onto a role.
    pub fn from_index(index: usize) -> Option<Role> {
        match index {
            1 => Some(Role::Cook),
            2 => Some(Role::Serve),
            3 => Some(Role::CleanTable),
            4 => Some(Role::WashDishes),
            5 => Some(Role::SelectTable),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Cook => "Cook",
            Role::Serve => "Serve",
            Role::CleanTable => "Clean Table",
            Role::WashDishes => "Wash Dishes",
            Role::SelectTable => "Select Table",
        };
        f.write_str(name)
    }
}

/// A registered worker bound to exactly one role.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Worker {
    pub id: WorkerId,
    pub name: String,
    pub role: Role,
}

impl Worker {
    pub fn new(id: WorkerId, name: impl Into<String>, role: Role) -> Self {
        Self {
            id,
            name: name.into(),
            role,
        }
    }
}
