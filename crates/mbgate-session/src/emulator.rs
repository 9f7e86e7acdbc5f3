use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use mbgate_channel::{ChannelError, PacketSink, PacketSource};
use mbgate_frame::{FragmentWriter, FrameError, FrameProfile, MessageReader};
use mbgate_register::RegisterMap;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::command::{Command, RegisterKind, RegisterSpec};
use crate::error::{Result, SessionError};
use crate::response::DeviceResponse;

#[derive(Debug, Clone, Default)]
struct Device {
    slave_id: u8,
    registers: Vec<RegisterSpec>,
    tables: BTreeMap<RegisterKind, RegisterMap>,
}

impl Device {
    fn find(&self, kind: RegisterKind, address: u16) -> Option<&RegisterSpec> {
        self.registers
            .iter()
            .find(|spec| spec.kind == kind && spec.address == address)
    }

    fn read_words(&self, spec: &RegisterSpec) -> Vec<u16> {
        self.tables
            .get(&spec.kind)
            .and_then(|table| table.read_words(spec.address, spec.register_count()).ok())
            .unwrap_or_else(|| vec![0; spec.register_count()])
    }

    fn register_json(&self, spec: &RegisterSpec) -> serde_json::Value {
        json!({
            "kind": spec.kind,
            "address": spec.address,
            "type": spec.base_type,
            "word_order": spec.word_order,
            "words": self.read_words(spec),
        })
    }

    fn summary(&self, name: &str) -> serde_json::Value {
        json!({
            "name": name,
            "slave_id": self.slave_id,
            "registers": self.registers.len(),
        })
    }
}

/// Device side of the command vocabulary, held entirely in memory.
///
/// Every command gets exactly one reply; failures are reported in the reply
/// (`{"status":"error","error":...}`) and never stop the emulator.
#[derive(Debug, Clone, Default)]
pub struct DeviceEmulator {
    devices: BTreeMap<String, Device>,
}

impl DeviceEmulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of the configured devices, sorted.
    pub fn device_names(&self) -> Vec<String> {
        self.devices.keys().cloned().collect()
    }

    /// Apply one command and build its reply.
    pub fn handle(&mut self, command: &Command) -> DeviceResponse {
        debug!(cmd = command.name(), "emulator handling command");
        if let Err(err) = command.validate() {
            return DeviceResponse::error(validation_message(err));
        }
        match self.apply(command) {
            Ok(response) => response,
            Err(message) => {
                debug!(cmd = command.name(), error = %message, "command rejected");
                DeviceResponse::error(message)
            }
        }
    }

    /// Parse a request, apply it, and serialize the reply.
    pub fn handle_bytes(&mut self, request: &[u8]) -> Vec<u8> {
        let response = match serde_json::from_slice::<Command>(request) {
            Ok(command) => self.handle(&command),
            Err(err) => {
                warn!(size = request.len(), error = %err, "unparseable command");
                DeviceResponse::error("invalid command")
            }
        };
        serde_json::to_vec(&response)
            .unwrap_or_else(|_| br#"{"status":"error","error":"internal error"}"#.to_vec())
    }

    /// Answer commands arriving on a channel until `running` clears or the
    /// inbound side closes. Returns the number of commands handled.
    pub fn serve<W, R>(
        &mut self,
        sink: W,
        source: R,
        profile: &FrameProfile,
        running: &AtomicBool,
        poll: Duration,
    ) -> Result<u64>
    where
        W: PacketSink,
        R: PacketSource,
    {
        let mut writer = FragmentWriter::new(sink, profile.clone())?;
        let mut reader = MessageReader::new(source, profile);
        let mut served = 0u64;
        info!(profile = profile.name(), "emulator serving");

        while running.load(Ordering::Relaxed) {
            let request = match reader.read_message(poll) {
                Ok(Some(request)) => request,
                Ok(None) => continue,
                Err(FrameError::Channel(ChannelError::Closed)) => {
                    info!(served, "host closed channel");
                    return Ok(served);
                }
                Err(err) => return Err(SessionError::Frame(err)),
            };

            let reply = self.handle_bytes(&request);
            served += 1;
            // A host that gave up before the reply may already be gone.
            if let Err(err) = writer.send(&reply) {
                warn!(error = %err, "reply not delivered");
            }
        }

        info!(served, "emulator stopped");
        Ok(served)
    }

    fn apply(&mut self, command: &Command) -> std::result::Result<DeviceResponse, String> {
        match command {
            Command::CreateDevice { name, slave_id } => {
                if self.devices.contains_key(name) {
                    return Err(format!("device '{name}' already exists"));
                }
                self.check_slave_id_free(*slave_id, None)?;
                let device = Device {
                    slave_id: *slave_id,
                    ..Device::default()
                };
                let summary = device.summary(name);
                self.devices.insert(name.clone(), device);
                Ok(DeviceResponse::ok().with_field("device", summary))
            }
            Command::ReadDevice { name } => {
                let device = self.device(name)?;
                let registers: Vec<serde_json::Value> = device
                    .registers
                    .iter()
                    .map(|spec| device.register_json(spec))
                    .collect();
                Ok(DeviceResponse::ok().with_field(
                    "device",
                    json!({
                        "name": name,
                        "slave_id": device.slave_id,
                        "registers": registers,
                    }),
                ))
            }
            Command::UpdateDevice {
                name,
                new_name,
                slave_id,
            } => {
                self.device(name)?;
                if let Some(slave_id) = slave_id {
                    self.check_slave_id_free(*slave_id, Some(name))?;
                }
                if let Some(new_name) = new_name {
                    if new_name != name && self.devices.contains_key(new_name) {
                        return Err(format!("device '{new_name}' already exists"));
                    }
                }

                let Some(mut device) = self.devices.remove(name) else {
                    return Err(format!("no such device '{name}'"));
                };
                if let Some(slave_id) = slave_id {
                    device.slave_id = *slave_id;
                }
                let name = new_name.clone().unwrap_or_else(|| name.clone());
                let summary = device.summary(&name);
                self.devices.insert(name, device);
                Ok(DeviceResponse::ok().with_field("device", summary))
            }
            Command::DeleteDevice { name } => {
                if self.devices.remove(name).is_none() {
                    return Err(format!("no such device '{name}'"));
                }
                Ok(DeviceResponse::ok().with_field("deleted", json!(name)))
            }
            Command::CreateRegister {
                device,
                register,
                words,
            } => {
                let dev = self.device_mut(device)?;
                if let Some(existing) = dev.registers.iter().find(|spec| spec.overlaps(register)) {
                    return Err(format!(
                        "{} at {} overlaps existing {} register at {}",
                        register.kind, register.address, existing.base_type, existing.address
                    ));
                }
                if !words.is_empty() {
                    write_table(dev, register, words)?;
                }
                dev.registers.push(register.clone());
                let body = dev.register_json(register);
                Ok(DeviceResponse::ok().with_field("register", body))
            }
            Command::ReadRegister {
                device,
                kind,
                address,
            } => {
                let dev = self.device(device)?;
                let spec = dev
                    .find(*kind, *address)
                    .ok_or_else(|| format!("no {kind} register at {address}"))?;
                Ok(DeviceResponse::ok().with_field("register", dev.register_json(spec)))
            }
            Command::UpdateRegister {
                device,
                register,
                words,
            } => {
                let dev = self.device_mut(device)?;
                let spec = dev
                    .find(register.kind, register.address)
                    .cloned()
                    .ok_or_else(|| {
                        format!("no {} register at {}", register.kind, register.address)
                    })?;
                if spec.base_type != register.base_type {
                    return Err(format!(
                        "register at {} is {}, not {}",
                        spec.address, spec.base_type, register.base_type
                    ));
                }
                write_table(dev, &spec, words)?;
                Ok(DeviceResponse::ok().with_field("register", dev.register_json(&spec)))
            }
            Command::ListDevices => {
                let devices: Vec<serde_json::Value> = self
                    .devices
                    .iter()
                    .map(|(name, device)| device.summary(name))
                    .collect();
                Ok(DeviceResponse::ok().with_field("devices", json!(devices)))
            }
        }
    }

    fn device(&self, name: &str) -> std::result::Result<&Device, String> {
        self.devices
            .get(name)
            .ok_or_else(|| format!("no such device '{name}'"))
    }

    fn device_mut(&mut self, name: &str) -> std::result::Result<&mut Device, String> {
        self.devices
            .get_mut(name)
            .ok_or_else(|| format!("no such device '{name}'"))
    }

    fn check_slave_id_free(
        &self,
        slave_id: u8,
        except: Option<&str>,
    ) -> std::result::Result<(), String> {
        let taken = self
            .devices
            .iter()
            .find(|(name, device)| device.slave_id == slave_id && Some(name.as_str()) != except);
        match taken {
            Some((name, _)) => Err(format!("slave id {slave_id} already used by '{name}'")),
            None => Ok(()),
        }
    }
}

fn write_table(
    device: &mut Device,
    spec: &RegisterSpec,
    words: &[u16],
) -> std::result::Result<(), String> {
    device
        .tables
        .entry(spec.kind)
        .or_default()
        .write_words(spec.address, words)
        .map_err(|err| err.to_string())
}

fn validation_message(err: SessionError) -> String {
    match err {
        SessionError::InvalidCommand(message) => message,
        other => other.to_string(),
    }
}
