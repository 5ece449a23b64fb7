//! Saved network devices.
//!
//! Device records are plain inventory: no key material is involved, so
//! these operations only check the caller's role.

use std::net::IpAddr;

use crate::access::Permission;
use crate::errors::{PvaError, Result};
use crate::store::{Device, NewDevice, RecordStore, User};

use super::engine::{validate_name, VaultEngine};

/// Longest accepted device description.
const MAX_DESCRIPTION_LEN: usize = 1024;

impl<S: RecordStore> VaultEngine<S> {
    /// Save a device.  The address is stored in canonical form;
    /// `Conflict` if that address is already saved.
    pub fn create_device(&self, user: &User, device: NewDevice) -> Result<Device> {
        user.role.require(Permission::ManageDevices)?;
        let (ip, name, description) = checked_fields(device.ip, device.name, device.description)?;

        let saved = self.store().insert_device(NewDevice {
            ip,
            name,
            description,
        })?;
        tracing::debug!(device_id = saved.id, user_id = user.id, "saved device");
        Ok(saved)
    }

    pub fn list_devices(&self, user: &User) -> Result<Vec<Device>> {
        user.role.require(Permission::ViewDevices)?;
        self.store().list_devices()
    }

    /// Replace every field of a saved device.
    pub fn update_device(&self, user: &User, device: Device) -> Result<()> {
        user.role.require(Permission::ManageDevices)?;
        let (ip, name, description) = checked_fields(device.ip, device.name, device.description)?;

        self.store().update_device(&Device {
            id: device.id,
            ip,
            name,
            description,
        })?;
        tracing::debug!(device_id = device.id, user_id = user.id, "updated device");
        Ok(())
    }

    pub fn delete_device(&self, user: &User, id: i64) -> Result<()> {
        user.role.require(Permission::ManageDevices)?;
        self.store().delete_device(id)?;
        tracing::debug!(device_id = id, user_id = user.id, "deleted device");
        Ok(())
    }
}

fn checked_fields(
    ip: String,
    name: String,
    description: String,
) -> Result<(String, String, String)> {
    let addr: IpAddr = ip
        .trim()
        .parse()
        .map_err(|_| PvaError::Validation(format!("'{ip}' is not an IP address")))?;
    validate_name("device name", &name)?;
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(PvaError::Validation(format!(
            "device description cannot exceed {MAX_DESCRIPTION_LEN} characters"
        )));
    }
    Ok((addr.to_string(), name, description))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addresses_are_canonicalised() {
        let (ip, _, _) =
            checked_fields(" 2001:DB8:0:0::1 ".into(), "nas".into(), String::new()).unwrap();
        assert_eq!(ip, "2001:db8::1");
    }

    #[test]
    fn bad_addresses_and_names_are_rejected() {
        assert!(checked_fields("10.0.0.256".into(), "x".into(), String::new()).is_err());
        assert!(checked_fields("router".into(), "x".into(), String::new()).is_err());
        assert!(checked_fields("10.0.0.1".into(), "  ".into(), String::new()).is_err());
        assert!(checked_fields("10.0.0.1".into(), "x".into(), "d".repeat(1025)).is_err());
    }
}
