use crate::crypto::keys::KeyMaterial;
use crate::types::{Address, AddressStatus, AddressType};

#[derive(Debug, Clone)]
pub struct AddressRecord {
    pub id: String,
    pub email: String,
    pub display_name: String,
    /// Rank within the account; 1 is the primary address.
    pub order: usize,
    pub status: AddressStatus,
    pub address_type: AddressType,
    pub keys: Vec<KeyMaterial>,
    pub allow_send: bool,
}

impl AddressRecord {
    pub fn to_address(&self) -> Address {
        Address {
            id: self.id.clone(),
            email: self.email.clone(),
            display_name: self.display_name.clone(),
            order: self.order,
            status: self.status,
            address_type: self.address_type,
            send: self.allow_send && self.status == AddressStatus::Enabled,
            receive: self.status == AddressStatus::Enabled,
            keys: self
                .keys
                .iter()
                .enumerate()
                .map(|(i, key)| key.to_key(i == 0))
                .collect(),
        }
    }
}
