//! Shipping address types and field validation.

use serde::Deserialize;

use bazaar_core::{AddressId, ProfileId};

/// A shipping address owned by a user profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    pub id: AddressId,
    pub profile_id: ProfileId,
    pub fields: AddressFields,
}

/// Validated address fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressFields {
    pub address: String,
    pub phone_number: String,
    pub city: String,
    pub district: String,
    pub state: String,
    pub country: String,
    pub pincode: String,
}

/// Raw address fields from a request body; absent fields are left unchanged
/// on edit and required on create.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddressChanges {
    pub address: Option<String>,
    pub phone_number: Option<String>,
    pub city: Option<String>,
    pub district: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub pincode: Option<String>,
}

const MAX_PHONE_NUMBER: usize = 15;
const MAX_REGION: usize = 100;
const MAX_PINCODE: usize = 10;

impl AddressFields {
    /// Build fields for a new address; every field is required.
    ///
    /// # Errors
    ///
    /// Returns a message naming the first missing or invalid field.
    pub fn create(changes: AddressChanges) -> Result<Self, String> {
        let required = |value: Option<String>, name: &str| {
            value.ok_or_else(|| format!("{name}: This field is required."))
        };

        let fields = Self {
            address: required(changes.address, "address")?,
            phone_number: required(changes.phone_number, "phone_number")?,
            city: required(changes.city, "city")?,
            district: required(changes.district, "district")?,
            state: required(changes.state, "state")?,
            country: required(changes.country, "country")?,
            pincode: required(changes.pincode, "pincode")?,
        };
        fields.validate()?;
        Ok(fields)
    }

    /// Apply a partial update, validating the result.
    ///
    /// # Errors
    ///
    /// Returns a message naming the first invalid field.
    pub fn apply(&self, changes: AddressChanges) -> Result<Self, String> {
        let fields = Self {
            address: changes.address.unwrap_or_else(|| self.address.clone()),
            phone_number: changes
                .phone_number
                .unwrap_or_else(|| self.phone_number.clone()),
            city: changes.city.unwrap_or_else(|| self.city.clone()),
            district: changes.district.unwrap_or_else(|| self.district.clone()),
            state: changes.state.unwrap_or_else(|| self.state.clone()),
            country: changes.country.unwrap_or_else(|| self.country.clone()),
            pincode: changes.pincode.unwrap_or_else(|| self.pincode.clone()),
        };
        fields.validate()?;
        Ok(fields)
    }

    fn validate(&self) -> Result<(), String> {
        let checks = [
            ("address", &self.address, None),
            ("phone_number", &self.phone_number, Some(MAX_PHONE_NUMBER)),
            ("city", &self.city, Some(MAX_REGION)),
            ("district", &self.district, Some(MAX_REGION)),
            ("state", &self.state, Some(MAX_REGION)),
            ("country", &self.country, Some(MAX_REGION)),
            ("pincode", &self.pincode, Some(MAX_PINCODE)),
        ];

        for (name, value, max) in checks {
            if value.trim().is_empty() {
                return Err(format!("{name}: This field may not be blank."));
            }
            if let Some(max) = max {
                if value.chars().count() > max {
                    return Err(format!(
                        "{name}: Ensure this field has no more than {max} characters."
                    ));
                }
            }
        }
        Ok(())
    }
}
