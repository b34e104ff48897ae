use clap::{App, Arg};
use colored::*;
use satpool::dataset::VarHandle;
use satpool::housekeeping::{HkPacketHeader, HousekeepingSetPacket};
use satpool::ids::{MessageQueueId, NO_OBJECT};
use satpool::ipc::{LocalQueue, LocalStore, MessageQueue, QueueHub, StorageManager};
use satpool::pool::{PoolEntryMap, PoolObject};
use satpool::serialize::Endianness;
use satpool::time::{CdsShortTime, TIMESTAMP_SIZE};
use satpool::{
    CommandMessage, HasLocalDataPool, HkCommand, HkManagerConfig, HkSubscription, InternalErrorReporter,
    LocalDataPoolManager, LocalDataSet, LocalPoolDataSet, LocalPoolId, MutexTimeout, ObjectId, PoolEntry,
    PoolVariable, PoolVector, ReadWriteMode, Sid, StoreConfig,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time;
use tracing::{error, info, warn};

const THERMAL_CONTROLLER_ID: ObjectId = 0x4400_0001;
const DEFAULT_CYCLES: &str = "20";
const DEFAULT_PERIOD_MS: &str = "200";
const DEFAULT_FACTOR: &str = "5";
const QUEUE_DEPTH: usize = 32;

// Pool ids of the thermal controller
const TEMPERATURE: LocalPoolId = 1;
const HEATER: LocalPoolId = 2;
const PANEL_TEMPERATURES: LocalPoolId = 3;
const LIMIT_VIOLATIONS: LocalPoolId = 10;

const STATUS_SET_ID: u32 = 1;
const DIAGNOSTICS_SET_ID: u32 = 2;

const TEMPERATURE_LOW_LIMIT: f32 = 16.0;
const TEMPERATURE_HIGH_LIMIT: f32 = 25.0;

/// What the ground segment saw on one queue message.
#[derive(Debug, Serialize)]
struct PacketRecord {
    cycle: u32,
    kind: &'static str,
    sid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    valid: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    local_pool_ids: Option<Vec<LocalPoolId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    collection_interval_s: Option<f32>,
    #[serde(with = "serde_bytes")]
    payload: Vec<u8>,
}

struct ThermalData {
    period_ms: u32,
    ops_queue: MessageQueueId,

    status_set: LocalPoolDataSet<4>,
    temperature: VarHandle<PoolVariable<f32>>,
    panels: VarHandle<PoolVector<f32, 3>>,

    diagnostics_set: LocalPoolDataSet<2>,
    violations: VarHandle<PoolVariable<u32>>,

    heater_switch: PoolVariable<u8>,
}

impl ThermalData {
    fn new(manager: &LocalDataPoolManager, period_ms: u32, ops_queue: MessageQueueId) -> satpool::Result<Self> {
        let pool = manager.pool();

        let mut status_set = LocalPoolDataSet::new(pool, STATUS_SET_ID);
        let temperature = status_set.register_variable(PoolVariable::new(pool, TEMPERATURE, ReadWriteMode::ReadWrite))?;
        status_set.register_variable(PoolVariable::<u8>::new(pool, HEATER, ReadWriteMode::Read))?;
        let panels = status_set.register_variable(PoolVector::new(pool, PANEL_TEMPERATURES, ReadWriteMode::ReadWrite))?;

        let mut diagnostics_set = LocalPoolDataSet::new(pool, DIAGNOSTICS_SET_ID);
        let violations = diagnostics_set.register_variable(PoolVariable::new(pool, LIMIT_VIOLATIONS, ReadWriteMode::ReadWrite))?;

        Ok(Self {
            period_ms,
            ops_queue,
            status_set,
            temperature,
            panels,
            diagnostics_set,
            violations,
            heater_switch: PoolVariable::new(pool, HEATER, ReadWriteMode::ReadWrite),
        })
    }

    /// One control cycle: switch the heater, then update the measured values.
    fn step(&mut self, cycle: u32) -> satpool::Result<()> {
        let temperature = 20.0 + 6.0 * (cycle as f32 * 0.35).sin();

        let heater_on = u8::from(temperature < TEMPERATURE_LOW_LIMIT + 1.0);
        if heater_on != self.heater_switch.value() || !self.heater_switch.is_valid() {
            self.heater_switch.set_value(heater_on);
            self.heater_switch.commit_with_validity(true, MutexTimeout::Polling)?;
            self.heater_switch.set_changed(true);
        }

        // A failed read still leaves the set checked out, so always commit.
        let read_result = self.status_set.read(MutexTimeout::Polling);
        if let Some(variable) = self.status_set.get_mut(&self.temperature) {
            variable.set_value(temperature);
        }
        if let Some(vector) = self.status_set.get_mut(&self.panels) {
            for (index, value) in vector.values_mut().iter_mut().enumerate() {
                *value = temperature - 1.5 * index as f32;
            }
        }
        self.status_set.commit_with_validity(read_result.is_ok(), MutexTimeout::Polling)?;
        self.status_set.set_changed(true);
        read_result?;

        if !(TEMPERATURE_LOW_LIMIT..=TEMPERATURE_HIGH_LIMIT).contains(&temperature) {
            let read_result = self.diagnostics_set.read(MutexTimeout::Polling);
            if let Some(variable) = self.diagnostics_set.get_mut(&self.violations) {
                variable.set_value(variable.value().wrapping_add(1));
                variable.set_valid(read_result.is_ok());
            }
            self.diagnostics_set.commit(MutexTimeout::Polling)?;
            read_result?;
        }
        Ok(())
    }
}

impl HasLocalDataPool for ThermalData {
    fn object_id(&self) -> ObjectId {
        THERMAL_CONTROLLER_ID
    }

    fn periodic_operation_frequency_ms(&self) -> u32 {
        self.period_ms
    }

    fn initialize_local_data_pool(
        &mut self,
        entries: &mut PoolEntryMap,
        manager: &mut LocalDataPoolManager,
    ) -> satpool::Result<()> {
        entries.insert(TEMPERATURE, PoolEntry::zeroed::<f32>(1));
        entries.insert(HEATER, PoolEntry::zeroed::<u8>(1));
        entries.insert(PANEL_TEMPERATURES, PoolEntry::zeroed::<f32>(3));
        entries.insert(LIMIT_VIOLATIONS, PoolEntry::new(&[0u32], true));

        let status_sid = self.status_set.sid();
        let diagnostics_sid = self.diagnostics_set.sid();
        let period_s = self.period_ms as f32 / 1000.0;
        manager.subscribe_for_periodic_packet(self, HkSubscription::regular(status_sid, true, period_s))?;
        manager.subscribe_for_periodic_packet(self, HkSubscription::diagnostics(diagnostics_sid, true, period_s * 2.0))?;

        let ops_queue = self.ops_queue;
        manager.subscribe_for_set_update_message(self, STATUS_SET_ID, NO_OBJECT, ops_queue, true)?;
        manager.subscribe_for_variable_update_message(self, HEATER, NO_OBJECT, ops_queue, false)?;
        Ok(())
    }

    fn data_set_mut(&mut self, sid: Sid) -> Option<&mut dyn LocalDataSet> {
        if sid == self.status_set.sid() {
            Some(&mut self.status_set)
        } else if sid == self.diagnostics_set.sid() {
            Some(&mut self.diagnostics_set)
        } else {
            None
        }
    }

    fn pool_object_mut(&mut self, lpid: LocalPoolId) -> Option<&mut dyn PoolObject> {
        if lpid == HEATER {
            Some(&mut self.heater_switch)
        } else {
            None
        }
    }
}

struct ThermalController {
    manager: LocalDataPoolManager,
    data: ThermalData,
}

impl ThermalController {
    fn perform_operation(&mut self, cycle: u32) {
        if let Err(e) = self.data.step(cycle) {
            warn!("ThermalController: cycle {}: control step failed: {}", cycle, e);
        }
        while let Some(message) = self.manager.receive_message() {
            if let Err(e) = self.manager.handle_housekeeping_message(&mut self.data, &message) {
                warn!("ThermalController: command 0x{:04x} failed: {}", message.command_id(), e);
            }
        }
        if let Err(e) = self.manager.perform_hk_operation(&mut self.data) {
            warn!("ThermalController: cycle {}: housekeeping pass: {}", cycle, e);
        }
    }
}

fn drain_ground(ground: &LocalQueue, store: &dyn StorageManager, cycle: u32) {
    while let Some(message) = ground.receive() {
        let record = match message.command {
            HkCommand::HkReport { store_id, .. } | HkCommand::DiagnosticsReport { store_id, .. } => {
                let kind = if matches!(message.command, HkCommand::DiagnosticsReport { .. }) {
                    "diagnostics"
                } else {
                    "hk"
                };
                store
                    .get_data(store_id)
                    .and_then(|data| {
                        let (header, payload) = HkPacketHeader::parse(&data, Endianness::Big)?;
                        Ok(PacketRecord {
                            cycle,
                            kind,
                            sid: header.sid.to_string(),
                            valid: Some(header.valid),
                            local_pool_ids: None,
                            collection_interval_s: None,
                            payload: payload.to_vec(),
                        })
                    })
            }
            HkCommand::HkDefinitionsReport { store_id, .. }
            | HkCommand::DiagnosticsDefinitionReport { store_id, .. } => store
                .get_data(store_id)
                .and_then(|data| HousekeepingSetPacket::parse(&data, Endianness::Big))
                .map(|packet| PacketRecord {
                    cycle,
                    kind: "structure",
                    sid: packet.sid.to_string(),
                    valid: Some(packet.valid),
                    local_pool_ids: Some(packet.local_pool_ids),
                    collection_interval_s: Some(packet.collection_interval_s),
                    payload: Vec::new(),
                }),
            HkCommand::HkRequestSuccess { sid } => {
                println!("{} {} {}", "✅".green(), "request succeeded for".bright_green(), sid);
                continue;
            }
            HkCommand::HkRequestFailure { sid, error_code } => {
                println!(
                    "{} {} {} (0x{:04x})",
                    "❌".red(),
                    "request failed for".bright_red(),
                    sid,
                    error_code
                );
                continue;
            }
            ref other => {
                warn!("ground: unexpected message 0x{:04x}", other.command_id());
                continue;
            }
        };

        match record.and_then(|r| serde_json::to_string(&r).map_err(|_| satpool::PoolError::BufferTooShort)) {
            Ok(json) => println!("{} {}", "📡".bright_blue(), json.cyan()),
            Err(e) => error!("ground: could not decode packet: {}", e),
        }
        if let Err(e) = message.clear(store) {
            warn!("ground: releasing store data failed: {}", e);
        }
    }
}

fn drain_operations(ops: &LocalQueue, store: &dyn StorageManager) {
    while let Some(message) = ops.receive() {
        match message.command {
            HkCommand::UpdateSnapshotSet { sid, store_id } => {
                let stamp = store
                    .get_data(store_id)
                    .ok()
                    .filter(|data| data.len() >= TIMESTAMP_SIZE)
                    .and_then(|data| CdsShortTime::from_bytes(&data[..TIMESTAMP_SIZE]).ok())
                    .and_then(|time| time.to_datetime());
                match stamp {
                    Some(time) => println!("{} snapshot of {} taken at {}", "📸".yellow(), sid, time),
                    None => warn!("ops: snapshot of {} is unreadable", sid),
                }
            }
            HkCommand::UpdateNotificationVariable { gpid } => {
                println!("{} {} changed", "🔔".yellow(), gpid);
            }
            ref other => info!("ops: message 0x{:04x}", other.command_id()),
        }
        if let Err(e) = message.clear(store) {
            warn!("ops: releasing store data failed: {}", e);
        }
    }
}

fn load_config(path: Option<&str>) -> Result<HkManagerConfig, Box<dyn std::error::Error>> {
    match path {
        Some(path) => Ok(HkManagerConfig::from_json(&std::fs::read_to_string(path)?)?),
        None => Ok(HkManagerConfig::default()),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let matches = App::new("satpool-sim")
        .version("0.1.0")
        .author("Space Systems Engineering Team")
        .about("🛰️  Local data pool and housekeeping simulation")
        .arg(
            Arg::with_name("cycles")
                .short("c")
                .long("cycles")
                .value_name("CYCLES")
                .help("Number of controller cycles to run")
                .takes_value(true)
                .default_value(DEFAULT_CYCLES),
        )
        .arg(
            Arg::with_name("period-ms")
                .short("p")
                .long("period-ms")
                .value_name("MS")
                .help("Controller task period in milliseconds")
                .takes_value(true)
                .default_value(DEFAULT_PERIOD_MS),
        )
        .arg(
            Arg::with_name("factor")
                .short("f")
                .long("factor")
                .value_name("FACTOR")
                .help("Interval factor for regular (non-diagnostic) packets")
                .takes_value(true)
                .default_value(DEFAULT_FACTOR),
        )
        .arg(
            Arg::with_name("config")
                .long("config")
                .value_name("FILE")
                .help("Housekeeping manager configuration (JSON)")
                .takes_value(true),
        )
        .get_matches();

    let cycles: u32 = matches.value_of("cycles").unwrap_or(DEFAULT_CYCLES).parse()?;
    let period_ms: u32 = matches.value_of("period-ms").unwrap_or(DEFAULT_PERIOD_MS).parse()?;
    let factor: u8 = matches.value_of("factor").unwrap_or(DEFAULT_FACTOR).parse()?;

    println!("{}", "🛰️  satpool housekeeping simulator".bright_blue().bold());
    println!("================================");

    let hub = QueueHub::new();
    let ground = hub.create_queue(QUEUE_DEPTH);
    let ops = hub.create_queue(QUEUE_DEPTH);
    let store = Arc::new(LocalStore::new(&StoreConfig::default()));
    let reporter = Arc::new(InternalErrorReporter::new());

    let mut config = load_config(matches.value_of("config"))?;
    config.non_diagnostic_interval_factor = factor;
    config.hk_destination = Some(ground.id());

    let manager = LocalDataPoolManager::new(
        THERMAL_CONTROLLER_ID,
        Box::new(hub.create_queue(QUEUE_DEPTH)),
        store.clone(),
        config,
    )
    .with_error_reporter(reporter.clone());
    let data = ThermalData::new(&manager, period_ms, ops.id())?;
    let mut controller = ThermalController { manager, data };
    controller.manager.initialize_after_task_creation(&mut controller.data)?;

    let status_sid = Sid::new(THERMAL_CONTROLLER_ID, STATUS_SET_ID);
    let diagnostics_sid = Sid::new(THERMAL_CONTROLLER_ID, DIAGNOSTICS_SET_ID);
    let controller_queue = controller.manager.queue_id();

    let mut interval = time::interval(Duration::from_millis(u64::from(period_ms)));
    for cycle in 1..=cycles {
        interval.tick().await;

        // Ground commands at fixed cycles
        let command = match cycle {
            3 => Some(HkCommand::structure_report(status_sid, false)),
            6 => Some(HkCommand::one_shot_report(diagnostics_sid, true)),
            8 => Some(HkCommand::one_shot_report(status_sid, true)),
            10 => Some(HkCommand::toggle_reporting(diagnostics_sid, false, true)),
            _ => None,
        };
        if let Some(command) = command {
            if let Err(e) = ground.send_message(controller_queue, CommandMessage::new(command)) {
                warn!("ground: command could not be sent: {}", e);
            }
        }

        controller.perform_operation(cycle);
        drain_ground(&ground, store.as_ref(), cycle);
        drain_operations(&ops, store.as_ref());
    }

    let counters = reporter.counters();
    info!(
        "internal errors: lost tm {}, queue hits {}, store hits {}",
        counters.lost_tm, counters.queue_hits, counters.store_hits
    );
    println!("{} {} free store elements", "🚀 simulation finished,".bright_green(), store.free_elements());
    Ok(())
}
