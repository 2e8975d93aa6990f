//! Address Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use crate::domain::aggregates::OrderAddress;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressKind {
    Shipping,
    Billing,
}

impl AddressKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Shipping => "shipping",
            Self::Billing => "billing",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "shipping" => Some(Self::Shipping),
            "billing" => Some(Self::Billing),
            _ => None,
        }
    }
}

impl fmt::Display for AddressKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Address {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub phone_no: String,
    pub address_line1: String,
    pub address_line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub landmark: Option<String>,
    pub kind: AddressKind,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Address {
    /// Rules that hold for every stored address, checked after create and
    /// after a patch has been merged.
    pub fn validate(&self) -> Result<(), AddressError> {
        let required = [
            ("name", &self.name), ("address line 1", &self.address_line1), ("city", &self.city),
            ("state", &self.state), ("postal code", &self.postal_code), ("country", &self.country),
        ];
        if let Some((field, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(AddressError::Missing(*field));
        }
        if self.phone_no.len() != 10 || !self.phone_no.chars().all(|c| c.is_ascii_digit()) {
            return Err(AddressError::Phone);
        }
        let texts = [Some(&self.name), Some(&self.address_line1), self.address_line2.as_ref(),
            Some(&self.city), Some(&self.state), Some(&self.postal_code), Some(&self.country), self.landmark.as_ref()];
        if texts.into_iter().flatten().any(|v| !is_address_text(v)) {
            return Err(AddressError::Charset);
        }
        if self.address_line2.as_deref().is_some_and(|l2| l2.trim().eq_ignore_ascii_case(self.address_line1.trim())) {
            return Err(AddressError::DuplicateLine);
        }
        Ok(())
    }

    /// Copy of the postal fields embedded into an order.
    pub fn snapshot(&self) -> OrderAddress {
        OrderAddress {
            name: self.name.clone(), phone_no: self.phone_no.clone(),
            address_line1: self.address_line1.clone(), address_line2: self.address_line2.clone(),
            city: self.city.clone(), state: self.state.clone(), postal_code: self.postal_code.clone(),
            country: self.country.clone(), landmark: self.landmark.clone(),
        }
    }

    pub fn touch(&mut self) { self.updated_at = Utc::now(); }
}

/// Letters, digits, whitespace and `,.-`.
pub fn is_address_text(value: &str) -> bool {
    value.chars().all(|c| c.is_ascii_alphanumeric() || c.is_whitespace() || matches!(c, ',' | '.' | '-'))
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("phone number must be 10 digits")]
    Phone,
    #[error("address fields may only contain letters, digits, spaces and , . -")]
    Charset,
    #[error("address line 1 and address line 2 must be different")]
    DuplicateLine,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address() -> Address {
        let now = Utc::now();
        Address {
            id: Uuid::now_v7(), user_id: Uuid::now_v7(), name: "Asha Menon".into(), phone_no: "9876543210".into(),
            address_line1: "12 MG Road".into(), address_line2: Some("Near Metro".into()), city: "Kochi".into(),
            state: "Kerala".into(), postal_code: "682001".into(), country: "India".into(), landmark: None,
            kind: AddressKind::Shipping, created_at: now, updated_at: now,
        }
    }

    #[test]
    fn test_valid_address() {
        assert_eq!(address().validate(), Ok(()));
    }

    #[test]
    fn test_rejections() {
        let mut a = address();
        a.phone_no = "98765".into();
        assert_eq!(a.validate(), Err(AddressError::Phone));

        let mut a = address();
        a.address_line2 = Some("12 mg road".into());
        assert_eq!(a.validate(), Err(AddressError::DuplicateLine));

        let mut a = address();
        a.city = "Kochi!".into();
        assert_eq!(a.validate(), Err(AddressError::Charset));

        let mut a = address();
        a.country = " ".into();
        assert_eq!(a.validate(), Err(AddressError::Missing("country")));
    }

    #[test]
    fn test_snapshot_copies_fields() {
        let a = address();
        let snap = a.snapshot();
        assert_eq!(snap.address_line1, a.address_line1);
        assert_eq!(snap.phone_no, a.phone_no);
    }
}
