//! Account service: user profiles and shipping addresses.

use tracing::instrument;

use bazaar_core::{AddressId, UserId};

use super::ServiceError;
use crate::models::{Address, AddressChanges, AddressFields, UserProfile};
use crate::store::{Store, StoreTx};

const PROFILE_NOT_FOUND: &str = "Profile not found.";
const NO_ADDRESS: &str = "No address found for the user.";
const ADDRESS_NOT_FOUND: &str = "Address not found.";
const NOT_OWNER: &str = "You do not have permission to edit this address.";

/// Account service.
pub struct AccountService<'a> {
    store: &'a dyn Store,
}

impl<'a> AccountService<'a> {
    /// Create a new account service.
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// The user's profile.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the user has no profile.
    pub async fn profile(&self, user_id: UserId) -> Result<UserProfile, ServiceError> {
        let mut tx = self.store.begin().await?;
        profile_of(tx.as_mut(), user_id).await
    }

    /// The most recently created address of the user.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the user has no address.
    pub async fn latest_address(&self, user_id: UserId) -> Result<Address, ServiceError> {
        let mut tx = self.store.begin().await?;
        let profile = profile_of(tx.as_mut(), user_id).await?;
        tx.latest_address(profile.id)
            .await?
            .ok_or_else(|| ServiceError::not_found(NO_ADDRESS))
    }

    /// Add an address to the user's profile.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::InvalidArgument` if a field is missing or invalid.
    #[instrument(skip(self, changes))]
    pub async fn create_address(
        &self,
        user_id: UserId,
        changes: AddressChanges,
    ) -> Result<Address, ServiceError> {
        let fields = AddressFields::create(changes).map_err(ServiceError::invalid)?;

        let mut tx = self.store.begin().await?;
        let profile = profile_of(tx.as_mut(), user_id).await?;
        let address = tx.create_address(profile.id, &fields).await?;
        tx.commit().await?;

        tracing::info!(address_id = %address.id, "Address created");
        Ok(address)
    }

    /// Apply a partial update to one of the user's addresses.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the address does not exist.
    /// Returns `ServiceError::PermissionDenied` if it belongs to another user.
    /// Returns `ServiceError::InvalidArgument` if a supplied field is invalid.
    #[instrument(skip(self, changes))]
    pub async fn edit_address(
        &self,
        user_id: UserId,
        address_id: AddressId,
        changes: AddressChanges,
    ) -> Result<Address, ServiceError> {
        let mut tx = self.store.begin().await?;
        let address = tx
            .get_address(address_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(ADDRESS_NOT_FOUND))?;

        let owner = tx.get_profile(user_id).await?;
        if owner.map(|profile| profile.id) != Some(address.profile_id) {
            tracing::warn!(user_id = %user_id, address_id = %address_id, "Address edit refused");
            return Err(ServiceError::permission_denied(NOT_OWNER));
        }

        let address = Address {
            fields: address.fields.apply(changes).map_err(ServiceError::invalid)?,
            ..address
        };
        tx.update_address(&address).await?;
        tx.commit().await?;
        Ok(address)
    }
}

async fn profile_of(tx: &mut dyn StoreTx, user_id: UserId) -> Result<UserProfile, ServiceError> {
    tx.get_profile(user_id)
        .await?
        .ok_or_else(|| ServiceError::not_found(PROFILE_NOT_FOUND))
}
