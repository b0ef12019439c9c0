use std::collections::BTreeSet;

use super::accommodations::{AccommodationId, AccommodationRepository};
use super::accounts::{Actor, Role, UserId};
use super::error::RepositoryError;

/// Which records an actor may see in listings.
///
/// Master admins see everything, admins see records for accommodations they manage,
/// and students see their own.
#[derive(Debug, Clone)]
pub(crate) struct Scope {
    actor: Actor,
    managed: BTreeSet<AccommodationId>,
}

impl Scope {
    pub(crate) fn for_actor<S>(store: &S, actor: Actor) -> Result<Self, RepositoryError>
    where
        S: AccommodationRepository + ?Sized,
    {
        let managed = if actor.role == Role::Admin {
            store
                .list_accommodations()?
                .into_iter()
                .filter(|accommodation| accommodation.admin_id == Some(actor.user_id))
                .map(|accommodation| accommodation.id)
                .collect()
        } else {
            BTreeSet::new()
        };
        Ok(Self { actor, managed })
    }

    pub(crate) fn admits(&self, owner: UserId, accommodation: AccommodationId) -> bool {
        match self.actor.role {
            Role::MasterAdmin => true,
            Role::Admin => self.managed.contains(&accommodation),
            Role::Student => owner == self.actor.user_id,
        }
    }

    pub(crate) fn covers(&self, accommodation: AccommodationId) -> bool {
        self.actor.is_master() || self.managed.contains(&accommodation)
    }
}
