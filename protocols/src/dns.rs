use std::net::Ipv4Addr;

use anyhow::{Context, ensure};
use dns_parser::{Packet, QueryType, RData, ResponseCode};
use pnet::packet::dns::{DnsClass, DnsTypes, MutableDnsPacket, Opcode, Retcode};

use rdns_common::network::address::reverse_pointer;

pub const DNS_HDR_LEN: usize = 12;
const CLASS_IN: DnsClass = DnsClass(1);

/// Response code of a DNS reply, reduced to what a PTR lookup cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rcode {
    NoError,
    FormatError,
    ServerFailure,
    NameError,
    NotImplemented,
    Refused,
    Other(u8),
}

impl From<ResponseCode> for Rcode {
    fn from(code: ResponseCode) -> Self {
        match code {
            ResponseCode::NoError => Rcode::NoError,
            ResponseCode::FormatError => Rcode::FormatError,
            ResponseCode::ServerFailure => Rcode::ServerFailure,
            ResponseCode::NameError => Rcode::NameError,
            ResponseCode::NotImplemented => Rcode::NotImplemented,
            ResponseCode::Refused => Rcode::Refused,
            ResponseCode::Reserved(code) => Rcode::Other(code),
        }
    }
}

/// The parts of a PTR reply needed to match it to a query and classify it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PtrResponse {
    pub id: u16,
    /// Name from the question section, if the server echoed one.
    pub qname: Option<String>,
    pub rcode: Rcode,
    pub truncated: bool,
    /// PTR targets in answer order, without the trailing dot.
    pub names: Vec<String>,
}

impl PtrResponse {
    /// Whether the echoed question is the reverse name of `addr`.
    pub fn answers(&self, addr: Ipv4Addr) -> bool {
        self.qname
            .as_deref()
            .is_some_and(|qname| qname.eq_ignore_ascii_case(&reverse_pointer(addr)))
    }
}

/// Encodes a standard PTR query for `addr` with transaction id `id`.
pub fn create_ptr_packet(addr: Ipv4Addr, id: u16, recurse: bool) -> anyhow::Result<Vec<u8>> {
    let qname: Vec<u8> = encode_dns_name(&reverse_pointer(addr))?;
    let q_fixed_len: usize = 4;
    let total: usize = DNS_HDR_LEN + qname.len() + q_fixed_len;
    let mut buffer: Vec<u8> = vec![0u8; total];

    {
        let mut dns: MutableDnsPacket =
            MutableDnsPacket::new(&mut buffer).context("creating dns header")?;
        dns.set_id(id);
        dns.set_is_response(0);
        dns.set_opcode(Opcode::StandardQuery);
        dns.set_is_authoriative(0);
        dns.set_is_truncated(0);
        dns.set_is_recursion_desirable(u8::from(recurse));
        dns.set_is_recursion_available(0);
        dns.set_zero_reserved(0);
        dns.set_is_non_authenticated_data(0);
        dns.set_rcode(Retcode::NoError);
        dns.set_query_count(1);
        dns.set_response_count(0);
        dns.set_authority_rr_count(0);
        dns.set_additional_rr_count(0);
    }

    // The question section is written by hand after the fixed header.
    let mut cursor: usize = DNS_HDR_LEN;

    buffer[cursor..cursor + qname.len()].copy_from_slice(&qname);
    cursor += qname.len();

    let type_bytes: [u8; 2] = DnsTypes::PTR.0.to_be_bytes();
    buffer[cursor..cursor + 2].copy_from_slice(&type_bytes);
    cursor += 2;

    let class_bytes: [u8; 2] = CLASS_IN.0.to_be_bytes();
    buffer[cursor..cursor + 2].copy_from_slice(&class_bytes);

    Ok(buffer)
}

/// Transaction id of a datagram, readable even when the rest is garbage.
pub fn response_id(payload: &[u8]) -> Option<u16> {
    match payload {
        [hi, lo, ..] => Some(u16::from_be_bytes([*hi, *lo])),
        _ => None,
    }
}

/// Decodes a reply to a PTR query.
pub fn parse_ptr_response(payload: &[u8]) -> anyhow::Result<PtrResponse> {
    let packet = Packet::parse(payload).context("failed to parse DNS packet")?;
    ensure!(!packet.header.query, "packet {} is a query, not a response", packet.header.id);

    let qname: Option<String> = packet
        .questions
        .iter()
        .find(|question| question.qtype == QueryType::PTR)
        .map(|question| question.qname.to_string());

    let names: Vec<String> = packet
        .answers
        .iter()
        .filter_map(|record| match &record.data {
            RData::PTR(ptr) => Some(ptr.0.to_string()),
            _ => None,
        })
        .collect();

    Ok(PtrResponse {
        id: packet.header.id,
        qname,
        rcode: packet.header.response_code.into(),
        truncated: packet.header.truncated,
        names,
    })
}

fn encode_dns_name(name: &str) -> anyhow::Result<Vec<u8>> {
    let mut encoded: Vec<u8> = Vec::with_capacity(name.len() + 2);
    for label in name.split('.') {
        if label.is_empty() {
            continue;
        }
        ensure!(label.len() < 64, "label {label} is longer than 63 bytes");
        encoded.push(label.len() as u8);
        encoded.extend_from_slice(label.as_bytes());
    }
    encoded.push(0);
    Ok(encoded)
}
