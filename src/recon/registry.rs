use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::error::ReconError;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeviceRecord {
    #[serde(alias = "PC名")]
    pub device: String,
    #[serde(alias = "使用者")]
    pub user: String,
    #[serde(default, alias = "OS")]
    pub os: String,
    #[serde(default, alias = "取得日時")]
    pub captured_at: String,
}

/// Devices expected to submit, in registry file order.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    devices: Vec<DeviceRecord>,
}

impl Registry {
    /// A repeated device keeps the slot of its first row and the values of
    /// its last one.
    pub fn from_records(records: impl IntoIterator<Item = DeviceRecord>) -> Self {
        let mut devices: Vec<DeviceRecord> = Vec::new();
        let mut slots: HashMap<String, usize> = HashMap::new();
        for record in records {
            match slots.get(&record.device) {
                Some(&idx) => devices[idx] = record,
                None => {
                    slots.insert(record.device.clone(), devices.len());
                    devices.push(record);
                }
            }
        }
        Self { devices }
    }

    pub fn parse_csv(raw: &str) -> Result<Self, ReconError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(raw.as_bytes());
        let mut records = Vec::new();
        for record in reader.deserialize::<DeviceRecord>() {
            let record = record.map_err(|err| ReconError::parse("device registry", err))?;
            if record.device.is_empty() {
                continue;
            }
            records.push(record);
        }
        Ok(Self::from_records(records))
    }

    pub fn load(path: &Path) -> Result<Self, ReconError> {
        let raw = fs::read_to_string(path).map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                ReconError::NotFound {
                    what: "device registry",
                    path: path.to_path_buf(),
                }
            } else {
                ReconError::io(path, err)
            }
        })?;
        let registry = Self::parse_csv(&raw)?;
        if registry.is_empty() {
            return Err(ReconError::parse(
                path.display().to_string(),
                "registry lists no devices",
            ));
        }
        Ok(registry)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DeviceRecord> {
        self.devices.iter()
    }

    pub fn contains(&self, device: &str) -> bool {
        self.devices.iter().any(|d| d.device == device)
    }
}

impl<'a> IntoIterator for &'a Registry {
    type Item = &'a DeviceRecord;
    type IntoIter = std::slice::Iter<'a, DeviceRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
