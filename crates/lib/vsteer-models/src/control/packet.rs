use std::fmt::{Display, Formatter};
use std::net::Ipv4Addr;

use thiserror::Error;
use typed_builder::TypedBuilder;

pub const ETHERNET_HEADER_SIZE: usize = 14;
pub const VLAN_TAG_SIZE: usize = 4;
pub const IPV4_HEADER_SIZE: usize = 20;
pub const UDP_HEADER_SIZE: usize = 8;

const ETH_TYPE_OFFSET: usize = 12;
const ETH_TYPE_VLAN: u16 = 0x8100;
const IP_PROTO_UDP: u8 = 17;

/// OpenFlow error type `OFPET_BAD_REQUEST`.
pub const OFPET_BAD_REQUEST: u16 = 1;
/// OpenFlow error code `OFPBRC_BAD_LEN`.
pub const OFPBRC_BAD_LEN: u16 = 6;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EtherType {
    Ipv4,
    Arp,
    Ipv6,
    Other(u16),
}

impl From<u16> for EtherType {
    fn from(value: u16) -> Self {
        match value {
            0x0800 => EtherType::Ipv4,
            0x0806 => EtherType::Arp,
            0x86dd => EtherType::Ipv6,
            other => EtherType::Other(other),
        }
    }
}

impl Display for EtherType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            EtherType::Ipv4 => write!(f, "IPv4"),
            EtherType::Arp => write!(f, "ARP"),
            EtherType::Ipv6 => write!(f, "IPv6"),
            EtherType::Other(value) => write!(f, "0x{:04x}", value),
        }
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PacketInError {
    #[error("packet-in carries {actual} bytes, {needed} needed to read the protocol type")]
    Truncated { needed: usize, actual: usize },
}

impl PacketInError {
    /// The `(type, code)` pair reported back to the switch.
    pub fn error_code(&self) -> (u16, u16) {
        match self {
            PacketInError::Truncated { .. } => (OFPET_BAD_REQUEST, OFPBRC_BAD_LEN),
        }
    }
}

/// Network-layer protocol of an Ethernet frame, looking through one 802.1Q tag.
pub fn ether_type(frame: &[u8]) -> Result<EtherType, PacketInError> {
    let outer = read_u16(frame, ETH_TYPE_OFFSET)?;
    if outer != ETH_TYPE_VLAN {
        return Ok(EtherType::from(outer));
    }
    Ok(EtherType::from(read_u16(
        frame,
        ETH_TYPE_OFFSET + VLAN_TAG_SIZE,
    )?))
}

fn read_u16(frame: &[u8], offset: usize) -> Result<u16, PacketInError> {
    match frame.get(offset..offset + 2) {
        Some(bytes) => Ok(u16::from_be_bytes([bytes[0], bytes[1]])),
        None => Err(PacketInError::Truncated {
            needed: offset + 2,
            actual: frame.len(),
        }),
    }
}

/// Addressing used to wrap a datagram payload into an Ethernet/IPv4/UDP frame.
#[derive(Clone, Copy, Debug, TypedBuilder)]
pub struct UdpFrame {
    #[builder(default = [0x02, 0, 0, 0, 0, 0x01])]
    pub src_mac: [u8; 6],
    #[builder(default = [0x02, 0, 0, 0, 0, 0x02])]
    pub dst_mac: [u8; 6],
    pub src_ip: Ipv4Addr,
    pub dst_ip: Ipv4Addr,
    #[builder(default = 9)]
    pub src_port: u16,
    #[builder(default = 9)]
    pub dst_port: u16,
    #[builder(default = 64)]
    pub ttl: u8,
}

impl UdpFrame {
    pub fn wrap(&self, payload: &[u8]) -> Vec<u8> {
        let udp_len = (UDP_HEADER_SIZE + payload.len()) as u16;
        let ip_len = IPV4_HEADER_SIZE as u16 + udp_len;
        let mut frame =
            Vec::with_capacity(ETHERNET_HEADER_SIZE + IPV4_HEADER_SIZE + udp_len as usize);

        frame.extend_from_slice(&self.dst_mac);
        frame.extend_from_slice(&self.src_mac);
        frame.extend_from_slice(&0x0800u16.to_be_bytes());

        let mut ip = [0u8; IPV4_HEADER_SIZE];
        ip[0] = 0x45;
        ip[2..4].copy_from_slice(&ip_len.to_be_bytes());
        ip[8] = self.ttl;
        ip[9] = IP_PROTO_UDP;
        ip[12..16].copy_from_slice(&self.src_ip.octets());
        ip[16..20].copy_from_slice(&self.dst_ip.octets());
        let checksum = ipv4_checksum(&ip);
        ip[10..12].copy_from_slice(&checksum.to_be_bytes());
        frame.extend_from_slice(&ip);

        frame.extend_from_slice(&self.src_port.to_be_bytes());
        frame.extend_from_slice(&self.dst_port.to_be_bytes());
        frame.extend_from_slice(&udp_len.to_be_bytes());
        frame.extend_from_slice(&0u16.to_be_bytes());
        frame.extend_from_slice(payload);
        frame
    }
}

/// Payload of a frame produced by [`UdpFrame::wrap`], if it is an untagged IPv4/UDP frame.
pub fn udp_payload(frame: &[u8]) -> Option<&[u8]> {
    if ether_type(frame).ok()? != EtherType::Ipv4 {
        return None;
    }
    let ip = frame.get(ETHERNET_HEADER_SIZE..)?;
    let header_len = ((*ip.first()? & 0x0f) as usize) * 4;
    if *ip.get(9)? != IP_PROTO_UDP {
        return None;
    }
    let udp = ip.get(header_len..)?;
    let udp_len = u16::from_be_bytes([*udp.get(4)?, *udp.get(5)?]) as usize;
    udp.get(UDP_HEADER_SIZE..udp_len)
}

fn ipv4_checksum(header: &[u8; IPV4_HEADER_SIZE]) -> u16 {
    let mut sum: u32 = header
        .chunks_exact(2)
        .map(|word| u16::from_be_bytes([word[0], word[1]]) as u32)
        .sum();
    while sum > 0xffff {
        sum = (sum & 0xffff) + (sum >> 16);
    }
    !(sum as u16)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> UdpFrame {
        UdpFrame::builder()
            .src_ip(Ipv4Addr::new(10, 1, 1, 1))
            .dst_ip(Ipv4Addr::new(10, 1, 1, 9))
            .build()
    }

    #[test]
    fn wrapped_frames_are_ipv4() {
        let bytes = frame().wrap(b"hello");
        assert_eq!(bytes.len(), 14 + 20 + 8 + 5);
        assert_eq!(ether_type(&bytes), Ok(EtherType::Ipv4));
        assert_eq!(udp_payload(&bytes), Some(&b"hello"[..]));
    }

    #[test]
    fn header_checksum_verifies() {
        let bytes = frame().wrap(&[]);
        let header: [u8; IPV4_HEADER_SIZE] = bytes[14..34].try_into().expect("ip header");
        // Summing a header with its checksum in place folds to 0xffff.
        assert_eq!(ipv4_checksum(&header), 0);
    }

    #[test]
    fn vlan_tag_is_skipped() {
        let mut bytes = vec![0u8; 18];
        bytes[12..14].copy_from_slice(&0x8100u16.to_be_bytes());
        bytes[16..18].copy_from_slice(&0x0806u16.to_be_bytes());
        assert_eq!(ether_type(&bytes), Ok(EtherType::Arp));
        assert_eq!(
            ether_type(&bytes[..15]),
            Err(PacketInError::Truncated {
                needed: 18,
                actual: 15
            })
        );
    }

    #[test]
    fn short_frames_are_rejected_with_bad_len() {
        let err = ether_type(&[0u8; 13]).expect_err("too short");
        assert_eq!(err.error_code(), (OFPET_BAD_REQUEST, OFPBRC_BAD_LEN));
    }
}
