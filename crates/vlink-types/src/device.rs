use serde::{Deserialize, Serialize};

/// Identifies the "device" the core presents itself as to the cloud
/// service — outer envelope fields `imei`/`mac`/`model`/`sdk`/`mod`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    pub imei: String,
    pub mac: String,
    pub model: String,
    pub sdk: String,
    #[serde(rename = "mod")]
    pub modification: String,
}

impl DeviceIdentity {
    /// Uppercase hex MD5 of the IMEI, embedded in every envelope as
    /// `imeiMD5`.
    pub fn imei_md5(&self) -> String {
        format!("{:X}", md5::compute(self.imei.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn imei_md5_is_uppercase_hex() {
        let device = DeviceIdentity {
            imei: "123456789012345".to_string(),
            mac: "AA:BB:CC:DD:EE:FF".to_string(),
            model: "X1".to_string(),
            sdk: "30".to_string(),
            modification: "std".to_string(),
        };
        let digest = device.imei_md5();
        assert_eq!(digest.len(), 32);
        assert_eq!(digest, digest.to_uppercase());
    }
}
