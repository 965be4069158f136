use std::net::Ipv4Addr;

use hashbrown::HashMap;
use log::{debug, info, warn};
use typed_builder::TypedBuilder;

use vsteer_core::agent::AgentId;
use vsteer_core::bucket::TimeMS;
use vsteer_core::radio::DatagramSocket;
use vsteer_models::control::advisor::decode_summaries;
use vsteer_models::control::controller::{
    FlowController, FlowRule, PacketIn, PacketVerdict, SwitchContext, SwitchDriver,
};
use vsteer_models::control::packet::{udp_payload, UdpFrame};
use vsteer_models::net::datagram::LossySocket;

/// Flow table and port counters of one OpenFlow datapath.
#[derive(Clone, Debug, Default, TypedBuilder)]
pub struct Datapath {
    pub dp_id: u64,
    #[builder(default)]
    table: Vec<FlowRule>,
    #[builder(default)]
    port_tx: HashMap<u32, u64>,
    #[builder(default)]
    delivered: Vec<Vec<u8>>,
}

impl Datapath {
    /// Highest priority rule matching the ingress port. Among equal priorities the rule
    /// installed first wins.
    pub fn lookup(&self, in_port: u32) -> Option<&FlowRule> {
        self.table.iter().find(|rule| rule.in_port == in_port)
    }

    pub fn rules(&self) -> &[FlowRule] {
        &self.table
    }

    pub fn tx_on(&self, port: u32) -> u64 {
        self.port_tx.get(&port).copied().unwrap_or_default()
    }

    pub fn tx_counts(&self) -> impl Iterator<Item = (u32, u64)> + '_ {
        self.port_tx.iter().map(|(port, count)| (*port, *count))
    }

    /// Payloads of every frame that left the datapath.
    pub fn delivered(&self) -> &[Vec<u8>] {
        &self.delivered
    }

    fn output(&mut self, out_port: u32, frame: &[u8]) {
        *self.port_tx.entry(out_port).or_default() += 1;
        if let Some(payload) = udp_payload(frame) {
            self.delivered.push(payload.to_vec());
        }
    }
}

impl SwitchDriver for Datapath {
    fn execute(&mut self, dp_id: u64, rule: &FlowRule) {
        info!("dpctl {}: {}", dp_id, rule);
        // An add with the same match and priority replaces the existing entry.
        self.table
            .retain(|old| !(old.in_port == rule.in_port && old.priority == rule.priority));
        let at = self
            .table
            .iter()
            .position(|old| old.priority < rule.priority)
            .unwrap_or(self.table.len());
        self.table.insert(at, *rule);
    }

    fn packet_out(&mut self, dp_id: u64, data: &[u8], in_port: u32, out_port: u32) {
        debug!(
            "Packet-out on switch {} from port {} to port {}",
            dp_id, in_port, out_port
        );
        self.output(out_port, data);
    }
}

/// The switch in front of the controller. Datagrams addressed to the controller enter the
/// datapath on the uplink port; table misses go to the controller as packet-in.
#[derive(TypedBuilder)]
pub struct OfSwitch {
    socket: LossySocket,
    controller: FlowController,
    datapath: Datapath,
    context: SwitchContext,
    uplink_port: u32,
    #[builder(default)]
    packet_ins: u64,
    #[builder(default)]
    rejected: u64,
}

impl OfSwitch {
    pub fn connect(&mut self) {
        self.controller
            .on_connect(&mut self.context, &mut self.datapath);
    }

    pub fn datapath(&self) -> &Datapath {
        &self.datapath
    }

    pub fn context(&self) -> &SwitchContext {
        &self.context
    }

    pub fn packet_ins(&self) -> u64 {
        self.packet_ins
    }

    pub fn rejected(&self) -> u64 {
        self.rejected
    }

    /// Runs every datagram waiting for the controller through the datapath.
    pub fn process(&mut self, now: TimeMS) {
        let controller_id = self.socket.local_id();
        while let Some(datagram) = self.socket.recv() {
            let frame = UdpFrame::builder()
                .src_ip(node_address(datagram.from))
                .dst_ip(node_address(controller_id))
                .build()
                .wrap(&datagram.payload);
            self.ingress(now, frame);
        }
    }

    fn ingress(&mut self, now: TimeMS, frame: Vec<u8>) {
        let delivered_before = self.datapath.delivered.len();
        match self.datapath.lookup(self.uplink_port).copied() {
            Some(rule) => {
                debug!("Frame matched {} at {}", rule, now);
                self.datapath.output(rule.out_port, &frame);
            }
            None => {
                self.packet_ins += 1;
                let packet = PacketIn {
                    in_port: self.uplink_port,
                    data: frame,
                };
                match self
                    .controller
                    .on_packet_in(&mut self.context, &packet, &mut self.datapath)
                {
                    Ok(PacketVerdict::Prioritized(rule)) => {
                        info!("Controller prioritized port {} at {}", rule.in_port, now)
                    }
                    Ok(PacketVerdict::Forwarded { ether_type }) => {
                        debug!("Controller forwarded a {} frame at {}", ether_type, now)
                    }
                    Err(e) => {
                        self.rejected += 1;
                        let (err_type, err_code) = e.error_code();
                        warn!(
                            "Packet-in rejected with type {} code {}: {}",
                            err_type, err_code, e
                        );
                    }
                }
            }
        }
        for payload in self.datapath.delivered[delivered_before..].iter() {
            for (idx, row) in decode_summaries(payload).iter().enumerate() {
                info!("Controller received group {} summary {:?}", idx + 1, row);
            }
        }
    }
}

/// Addresses in 10.1.0.0/16 follow the node identity.
pub fn node_address(node: AgentId) -> Ipv4Addr {
    Ipv4Addr::from(0x0a01_0000u32 + (node.as_u32() & 0xffff) + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn higher_priority_rules_are_looked_up_first() {
        let mut datapath = Datapath::builder().dp_id(2).build();
        let low = FlowRule {
            table: 0,
            priority: 10,
            in_port: 2,
            out_port: 1,
        };
        let high = FlowRule {
            priority: 1000,
            out_port: 3,
            ..low
        };
        datapath.execute(2, &low);
        datapath.execute(2, &high);
        assert_eq!(datapath.lookup(2), Some(&high));
        datapath.execute(2, &high);
        assert_eq!(datapath.rules().len(), 2);
        assert_eq!(datapath.lookup(5), None);
    }

    #[test]
    fn node_addresses_are_distinct() {
        assert_eq!(node_address(AgentId::from(0)), Ipv4Addr::new(10, 1, 0, 1));
        assert_ne!(node_address(AgentId::from(1)), node_address(AgentId::from(2)));
    }
}
