use std::fmt::{Display, Formatter};

use hashbrown::HashSet;
use log::{debug, info, warn};
use serde::Deserialize;

use vsteer_core::model::{Model, ModelSettings};

use crate::control::packet::{ether_type, EtherType, PacketInError};

/// A rule adding a forwarding entry: packets entering on `in_port` leave on `out_port`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FlowRule {
    pub table: u8,
    pub priority: u16,
    pub in_port: u32,
    pub out_port: u32,
}

impl Display for FlowRule {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "flow-mod cmd=add,table={},prio={} in_port={} actions=output:{}",
            self.table, self.priority, self.in_port, self.out_port
        )
    }
}

/// The switch-side runtime the controller issues its decisions to.
pub trait SwitchDriver {
    fn execute(&mut self, dp_id: u64, rule: &FlowRule);
    fn packet_out(&mut self, dp_id: u64, data: &[u8], in_port: u32, out_port: u32);
}

#[derive(Deserialize, Debug, Clone)]
pub struct ControllerSettings {
    pub designated_switch: u64,
    pub output_port: u32,
    #[serde(default = "default_port")]
    pub baseline_in_port: u32,
    #[serde(default = "default_port")]
    pub baseline_out_port: u32,
    #[serde(default = "default_priority")]
    pub baseline_priority: u16,
    #[serde(default = "default_priority")]
    pub priority: u16,
}

fn default_port() -> u32 {
    1
}

fn default_priority() -> u16 {
    1000
}

impl ModelSettings for ControllerSettings {}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SwitchState {
    #[default]
    Disconnected,
    Connected,
}

/// What the controller knows about one switch.
#[derive(Clone, Debug, Default)]
pub struct SwitchContext {
    pub dp_id: u64,
    pub state: SwitchState,
    pub packets_seen: u64,
    prioritized: HashSet<u32>,
}

impl SwitchContext {
    pub fn new(dp_id: u64) -> Self {
        Self {
            dp_id,
            ..Self::default()
        }
    }

    pub fn is_prioritized(&self, in_port: u32) -> bool {
        self.prioritized.contains(&in_port)
    }
}

#[derive(Clone, Debug)]
pub struct PacketIn {
    pub in_port: u32,
    pub data: Vec<u8>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PacketVerdict {
    /// A priority rule was installed and the packet forwarded.
    Prioritized(FlowRule),
    Forwarded { ether_type: EtherType },
}

/// Reactive control plane over explicit per-switch contexts.
///
/// On connect a baseline rule is installed. On packet-in the EtherType is read; IPv4 traffic
/// seen by the designated switch gets a priority rule for its ingress port, installed once
/// per port. Every packet whose type could be read is sent out of the configured port.
#[derive(Clone, Debug)]
pub struct FlowController {
    settings: ControllerSettings,
}

impl Model for FlowController {
    type Settings = ControllerSettings;

    fn with_settings(settings: &ControllerSettings) -> Self {
        Self {
            settings: settings.clone(),
        }
    }
}

impl FlowController {
    pub fn baseline_rule(&self) -> FlowRule {
        FlowRule {
            table: 0,
            priority: self.settings.baseline_priority,
            in_port: self.settings.baseline_in_port,
            out_port: self.settings.baseline_out_port,
        }
    }

    pub fn on_connect(&self, ctx: &mut SwitchContext, driver: &mut impl SwitchDriver) {
        ctx.state = SwitchState::Connected;
        let rule = self.baseline_rule();
        info!("Switch {} connected, installing {}", ctx.dp_id, rule);
        driver.execute(ctx.dp_id, &rule);
    }

    pub fn on_packet_in(
        &self,
        ctx: &mut SwitchContext,
        packet: &PacketIn,
        driver: &mut impl SwitchDriver,
    ) -> Result<PacketVerdict, PacketInError> {
        if ctx.state != SwitchState::Connected {
            warn!("Packet-in from switch {} before handshake", ctx.dp_id);
        }
        ctx.packets_seen += 1;
        let ether_type = ether_type(&packet.data).inspect_err(|e| {
            warn!("Rejecting packet-in from switch {}: {}", ctx.dp_id, e);
        })?;

        let mut verdict = PacketVerdict::Forwarded { ether_type };
        if ether_type == EtherType::Ipv4
            && ctx.dp_id == self.settings.designated_switch
            && !ctx.prioritized.contains(&packet.in_port)
        {
            let rule = FlowRule {
                table: 0,
                priority: self.settings.priority,
                in_port: packet.in_port,
                out_port: self.settings.output_port,
            };
            info!("Prioritizing port {} on switch {}: {}", packet.in_port, ctx.dp_id, rule);
            driver.execute(ctx.dp_id, &rule);
            ctx.prioritized.insert(packet.in_port);
            verdict = PacketVerdict::Prioritized(rule);
        }

        debug!(
            "Forwarding {} packet from port {} to port {} on switch {}",
            ether_type, packet.in_port, self.settings.output_port, ctx.dp_id
        );
        driver.packet_out(
            ctx.dp_id,
            &packet.data,
            packet.in_port,
            self.settings.output_port,
        );
        Ok(verdict)
    }
}
