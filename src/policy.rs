//! Access-control decisions for the marketplace.
//!
//! Every mutation path runs through these functions before touching the store.
//! They are pure: an [`Actor`] is always an authenticated identity (anonymous
//! callers are rejected by the extractor before policy is consulted), and a
//! missing profile means the identity carries no role, which fails every
//! role-gated check.

use uuid::Uuid;

use crate::models::Role;

/// An authenticated identity together with its optional role profile.
#[derive(Debug, Clone)]
pub struct Actor {
    pub id: Uuid,
    pub profile: Option<ProfileRef>,
}

#[derive(Debug, Clone)]
pub struct ProfileRef {
    pub role: Role,
}

impl Actor {
    pub fn new(id: Uuid, role: Option<Role>) -> Self {
        Self {
            id,
            profile: role.map(|role| ProfileRef { role }),
        }
    }

    fn role(&self) -> Option<Role> {
        self.profile.as_ref().map(|p| p.role)
    }
}

/// Only sellers may list products.
pub fn can_create_product(actor: &Actor) -> bool {
    actor.role() == Some(Role::Seller)
}

/// Mutation (update/delete) is owner-only. Role is irrelevant once ownership
/// holds.
pub fn can_mutate_product(actor: &Actor, owner_id: Uuid) -> bool {
    actor.id == owner_id
}

/// The contact-seller form is for buyers looking at someone else's listing.
/// Sellers and the owner never see it.
pub fn can_contact_seller(actor: &Actor, owner_id: Uuid) -> bool {
    actor.role() == Some(Role::Buyer) && actor.id != owner_id
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seller() -> Actor {
        Actor::new(Uuid::new_v4(), Some(Role::Seller))
    }

    fn buyer() -> Actor {
        Actor::new(Uuid::new_v4(), Some(Role::Buyer))
    }

    fn roleless() -> Actor {
        Actor::new(Uuid::new_v4(), None)
    }

    #[test]
    fn only_sellers_create() {
        assert!(can_create_product(&seller()));
        assert!(!can_create_product(&buyer()));
        assert!(!can_create_product(&roleless()));
    }

    #[test]
    fn mutation_is_ownership_only() {
        let owner_id = Uuid::new_v4();

        for actor in [seller(), buyer(), roleless()] {
            assert!(!can_mutate_product(&actor, owner_id));
            let as_owner = Actor {
                id: owner_id,
                ..actor
            };
            assert!(can_mutate_product(&as_owner, owner_id));
        }
    }

    #[test]
    fn contact_requires_buyer_on_foreign_listing() {
        let owner_id = Uuid::new_v4();

        assert!(can_contact_seller(&buyer(), owner_id));
        assert!(!can_contact_seller(&seller(), owner_id));
        assert!(!can_contact_seller(&roleless(), owner_id));

        // The owner never contacts themselves, whatever their role.
        let owner_as_buyer = Actor::new(owner_id, Some(Role::Buyer));
        assert!(!can_contact_seller(&owner_as_buyer, owner_id));
    }
}
