use vsteer_models::control::controller::{FlowRule, SwitchDriver};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PacketOut {
    pub dp_id: u64,
    pub data: Vec<u8>,
    pub in_port: u32,
    pub out_port: u32,
}

/// Records everything the controller asks a switch to do.
#[derive(Clone, Debug, Default)]
pub struct RecordingDriver {
    pub rules: Vec<(u64, FlowRule)>,
    pub packet_outs: Vec<PacketOut>,
}

impl RecordingDriver {
    pub fn commands(&self) -> Vec<String> {
        self.rules.iter().map(|(_, rule)| rule.to_string()).collect()
    }
}

impl SwitchDriver for RecordingDriver {
    fn execute(&mut self, dp_id: u64, rule: &FlowRule) {
        self.rules.push((dp_id, *rule));
    }

    fn packet_out(&mut self, dp_id: u64, data: &[u8], in_port: u32, out_port: u32) {
        self.packet_outs.push(PacketOut {
            dp_id,
            data: data.to_vec(),
            in_port,
            out_port,
        });
    }
}
