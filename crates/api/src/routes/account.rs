//! Profile and shipping address route handlers.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::Serialize;
use tracing::instrument;

use bazaar_core::{AddressId, ProfileId, UserId};

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::{Address, AddressChanges, UserProfile};
use crate::state::AppState;

/// Profile as returned by the API.
#[derive(Debug, Serialize)]
pub struct ProfileView {
    pub id: ProfileId,
    pub user: UserId,
    pub is_super_user: bool,
}

impl From<UserProfile> for ProfileView {
    fn from(profile: UserProfile) -> Self {
        Self {
            id: profile.id,
            user: profile.user_id,
            is_super_user: profile.is_super_user,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AddressView {
    pub id: AddressId,
    pub user_profile: ProfileId,
    pub address: String,
    pub phone_number: String,
    pub city: String,
    pub district: String,
    pub state: String,
    pub country: String,
    pub pincode: String,
}

impl From<Address> for AddressView {
    fn from(address: Address) -> Self {
        let fields = address.fields;
        Self {
            id: address.id,
            user_profile: address.profile_id,
            address: fields.address,
            phone_number: fields.phone_number,
            city: fields.city,
            district: fields.district,
            state: fields.state,
            country: fields.country,
            pincode: fields.pincode,
        }
    }
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn profile(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<ProfileView>> {
    let profile = state.accounts().profile(user.id).await?;
    Ok(Json(profile.into()))
}

/// The caller's most recently created address.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn latest_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<AddressView>> {
    let address = state.accounts().latest_address(user.id).await?;
    Ok(Json(address.into()))
}

#[instrument(skip(state, user, body), fields(user_id = %user.id))]
pub async fn create_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    body: std::result::Result<Json<AddressChanges>, JsonRejection>,
) -> Result<(StatusCode, Json<AddressView>)> {
    let Json(changes) = body?;
    let address = state.accounts().create_address(user.id, changes).await?;
    Ok((StatusCode::CREATED, Json(address.into())))
}

#[instrument(skip(state, user, body), fields(user_id = %user.id))]
pub async fn edit_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(address_id): Path<AddressId>,
    body: std::result::Result<Json<AddressChanges>, JsonRejection>,
) -> Result<Json<AddressView>> {
    let Json(changes) = body?;
    let address = state
        .accounts()
        .edit_address(user.id, address_id, changes)
        .await?;
    Ok(Json(address.into()))
}
