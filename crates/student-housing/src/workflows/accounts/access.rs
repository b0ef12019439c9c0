use serde::{Deserialize, Serialize};

use super::domain::{Role, UserId};
use crate::workflows::error::WorkflowError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Accommodation,
    Application,
    Lease,
    Invoice,
    Maintenance,
    Notification,
    User,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    View,
    Create,
    Edit,
    Approve,
    Reject,
    Sign,
    Update,
    Delete,
}

impl Role {
    /// Static permission matrix. Master admins hold every permission.
    pub fn permits(self, resource: Resource, action: Action) -> bool {
        use Action::*;
        use Resource::*;

        match self {
            Role::MasterAdmin => true,
            Role::Admin => matches!(
                (resource, action),
                (Accommodation, View | Edit)
                    | (Application, View | Approve | Reject)
                    | (Lease, View | Create | Edit)
                    | (Invoice, View | Create | Edit)
                    | (Maintenance, View | Update)
                    | (Notification, View | Create)
            ),
            Role::Student => matches!(
                (resource, action),
                (Accommodation, View)
                    | (Application, View | Create)
                    | (Lease, View | Sign)
                    | (Invoice, View)
                    | (Maintenance, View | Create)
                    | (Notification, View)
            ),
        }
    }
}

/// The authenticated caller behind a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: UserId,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn is_master(&self) -> bool {
        self.role == Role::MasterAdmin
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    pub fn is_student(&self) -> bool {
        self.role == Role::Student
    }

    pub fn require(&self, resource: Resource, action: Action) -> Result<(), WorkflowError> {
        if self.role.permits(resource, action) {
            Ok(())
        } else {
            Err(WorkflowError::forbidden(
                "You do not have permission to perform this action",
            ))
        }
    }

    /// Master admins manage everything; admins manage what they own.
    pub fn manages(&self, owner: Option<UserId>) -> bool {
        self.is_master() || (self.role == Role::Admin && owner == Some(self.user_id))
    }

    pub fn require_manager(&self, owner: Option<UserId>, what: &str) -> Result<(), WorkflowError> {
        if self.manages(owner) {
            Ok(())
        } else {
            Err(WorkflowError::forbidden(format!(
                "You do not have permission to manage this {what}"
            )))
        }
    }

    /// Owners and managing admins may read a record.
    pub fn can_view(&self, owner: UserId, manager: Option<UserId>) -> bool {
        self.user_id == owner || self.manages(manager)
    }
}
