use std::fmt;

use mbgate_register::{BaseType, TypedValue, WordOrder};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SessionError};

const MAX_NAME_LEN: usize = 32;
const MIN_SLAVE_ID: u8 = 1;
const MAX_SLAVE_ID: u8 = 247;
const ADDRESS_SPACE: usize = 0x1_0000;

/// Modbus data table a register belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegisterKind {
    Coil,
    DiscreteInput,
    InputRegister,
    HoldingRegister,
}

impl RegisterKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RegisterKind::Coil => "coil",
            RegisterKind::DiscreteInput => "discrete_input",
            RegisterKind::InputRegister => "input_register",
            RegisterKind::HoldingRegister => "holding_register",
        }
    }

    /// Coils and discrete inputs hold single bits.
    pub fn is_bit(self) -> bool {
        matches!(self, RegisterKind::Coil | RegisterKind::DiscreteInput)
    }
}

impl fmt::Display for RegisterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Layout of one register definition on a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterSpec {
    pub kind: RegisterKind,
    pub address: u16,
    #[serde(rename = "type")]
    pub base_type: BaseType,
    #[serde(default)]
    pub word_order: WordOrder,
}

impl RegisterSpec {
    pub fn new(kind: RegisterKind, address: u16, base_type: BaseType, word_order: WordOrder) -> Self {
        Self {
            kind,
            address,
            base_type,
            word_order,
        }
    }

    /// Number of consecutive registers the definition occupies.
    pub fn register_count(&self) -> usize {
        self.base_type.register_count()
    }

    /// Whether two definitions in the same table share any address.
    pub fn overlaps(&self, other: &RegisterSpec) -> bool {
        if self.kind != other.kind {
            return false;
        }
        let (a, b) = (usize::from(self.address), usize::from(other.address));
        a < b + other.register_count() && b < a + self.register_count()
    }

    fn validate(&self) -> Result<()> {
        let count = self.register_count();
        if usize::from(self.address) + count > ADDRESS_SPACE {
            return Err(SessionError::InvalidCommand(format!(
                "{count} register(s) at address {} overflow the address space",
                self.address
            )));
        }
        if self.kind.is_bit() && self.base_type != BaseType::Bool {
            return Err(SessionError::InvalidCommand(format!(
                "{} must be bool, got {}",
                self.kind, self.base_type
            )));
        }
        Ok(())
    }
}

/// Commands understood by the gateway.
///
/// Serialized as a JSON object tagged by `cmd`, e.g.
/// `{"cmd":"create_device","name":"meter","slave_id":1}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    CreateDevice {
        name: String,
        slave_id: u8,
    },
    ReadDevice {
        name: String,
    },
    UpdateDevice {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        new_name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        slave_id: Option<u8>,
    },
    DeleteDevice {
        name: String,
    },
    CreateRegister {
        device: String,
        register: RegisterSpec,
        /// Initial contents; empty leaves the registers zeroed.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        words: Vec<u16>,
    },
    ReadRegister {
        device: String,
        kind: RegisterKind,
        address: u16,
    },
    UpdateRegister {
        device: String,
        register: RegisterSpec,
        words: Vec<u16>,
    },
    ListDevices,
}

impl Command {
    /// Build an `update_register` carrying the encoded words of `value`.
    pub fn write_value(
        device: impl Into<String>,
        kind: RegisterKind,
        address: u16,
        value: &TypedValue,
    ) -> Result<Self> {
        let command = Command::UpdateRegister {
            device: device.into(),
            register: RegisterSpec::new(kind, address, value.base_type(), value.word_order()),
            words: value.encode(),
        };
        command.validate()?;
        Ok(command)
    }

    /// The `cmd` tag this command serializes with.
    pub fn name(&self) -> &'static str {
        match self {
            Command::CreateDevice { .. } => "create_device",
            Command::ReadDevice { .. } => "read_device",
            Command::UpdateDevice { .. } => "update_device",
            Command::DeleteDevice { .. } => "delete_device",
            Command::CreateRegister { .. } => "create_register",
            Command::ReadRegister { .. } => "read_register",
            Command::UpdateRegister { .. } => "update_register",
            Command::ListDevices => "list_devices",
        }
    }

    /// Check the command against the gateway's limits before it is sent.
    pub fn validate(&self) -> Result<()> {
        match self {
            Command::CreateDevice { name, slave_id } => {
                validate_name("device name", name)?;
                validate_slave_id(*slave_id)
            }
            Command::ReadDevice { name } | Command::DeleteDevice { name } => {
                validate_name("device name", name)
            }
            Command::UpdateDevice {
                name,
                new_name,
                slave_id,
            } => {
                validate_name("device name", name)?;
                if new_name.is_none() && slave_id.is_none() {
                    return Err(SessionError::InvalidCommand(
                        "update_device changes nothing".to_string(),
                    ));
                }
                if let Some(new_name) = new_name {
                    validate_name("new device name", new_name)?;
                }
                if let Some(slave_id) = slave_id {
                    validate_slave_id(*slave_id)?;
                }
                Ok(())
            }
            Command::CreateRegister {
                device,
                register,
                words,
            } => {
                validate_name("device name", device)?;
                register.validate()?;
                if !words.is_empty() {
                    validate_words(register, words)?;
                }
                Ok(())
            }
            Command::ReadRegister { device, .. } => validate_name("device name", device),
            Command::UpdateRegister {
                device,
                register,
                words,
            } => {
                validate_name("device name", device)?;
                register.validate()?;
                validate_words(register, words)
            }
            Command::ListDevices => Ok(()),
        }
    }

    /// Validate and serialize to the JSON wire form.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        self.validate()?;
        Ok(serde_json::to_vec(self)?)
    }
}

fn validate_name(what: &str, name: &str) -> Result<()> {
    if name.is_empty() || name.len() > MAX_NAME_LEN {
        return Err(SessionError::InvalidCommand(format!(
            "invalid {what} length: {} (max {MAX_NAME_LEN})",
            name.len()
        )));
    }
    Ok(())
}

fn validate_slave_id(slave_id: u8) -> Result<()> {
    if !(MIN_SLAVE_ID..=MAX_SLAVE_ID).contains(&slave_id) {
        return Err(SessionError::InvalidCommand(format!(
            "slave id {slave_id} outside {MIN_SLAVE_ID}..={MAX_SLAVE_ID}"
        )));
    }
    Ok(())
}

fn validate_words(register: &RegisterSpec, words: &[u16]) -> Result<()> {
    let expected = register.register_count();
    if words.len() != expected {
        return Err(SessionError::InvalidCommand(format!(
            "{} needs {expected} word(s), got {}",
            register.base_type,
            words.len()
        )));
    }
    if register.base_type == BaseType::Bool && words[0] > 1 {
        return Err(SessionError::InvalidCommand(format!(
            "bool register word must be 0 or 1, got {}",
            words[0]
        )));
    }
    Ok(())
}
