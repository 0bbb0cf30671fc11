//! Conversions between the record model and hickory wire types.
//!
//! Shared by the update listener and the RFC2136 backend so both sides
//! agree on the value string format for every record type.

use crate::engine::{Directive, Prerequisite, Rcode, RrClass, TypeSelector, UpdateRequest};
use crate::error::{Error, Result};
use crate::record::{fqdn, Record, RecordType};
use hickory_proto::op::{Message, ResponseCode};
use hickory_proto::rr::rdata::{A, AAAA, CNAME, MX, NS, PTR, SOA, SRV, TXT};
use hickory_proto::rr::{
    DNSClass, Name, RData, Record as WireRecord, RecordType as WireType,
};
use std::str::FromStr;

/// Map a wire record type into the model, or `None` if unsupported.
pub fn model_type(rtype: WireType) -> Option<RecordType> {
    match rtype {
        WireType::A => Some(RecordType::A),
        WireType::AAAA => Some(RecordType::Aaaa),
        WireType::CNAME => Some(RecordType::Cname),
        WireType::TXT => Some(RecordType::Txt),
        WireType::NS => Some(RecordType::Ns),
        WireType::PTR => Some(RecordType::Ptr),
        WireType::MX => Some(RecordType::Mx),
        WireType::SRV => Some(RecordType::Srv),
        WireType::SOA => Some(RecordType::Soa),
        _ => None,
    }
}

/// Map a model record type to its wire type.
pub fn wire_type(rtype: RecordType) -> WireType {
    match rtype {
        RecordType::A => WireType::A,
        RecordType::Aaaa => WireType::AAAA,
        RecordType::Cname => WireType::CNAME,
        RecordType::Txt => WireType::TXT,
        RecordType::Ns => WireType::NS,
        RecordType::Ptr => WireType::PTR,
        RecordType::Mx => WireType::MX,
        RecordType::Srv => WireType::SRV,
        RecordType::Soa => WireType::SOA,
    }
}

/// Build the type selector a query or prerequisite carries.
pub fn selector(rtype: WireType) -> TypeSelector {
    if rtype == WireType::ANY {
        TypeSelector::Any
    } else {
        match model_type(rtype) {
            Some(rtype) => TypeSelector::Exact(rtype),
            None => TypeSelector::Unsupported(u16::from(rtype)),
        }
    }
}

/// Map a wire class to the model class.
pub fn rr_class(class: DNSClass) -> RrClass {
    match class {
        DNSClass::IN => RrClass::In,
        DNSClass::ANY => RrClass::Any,
        DNSClass::NONE => RrClass::None,
        other => RrClass::Other(u16::from(other)),
    }
}

/// Map an outcome code to a wire response code.
pub fn response_code(rcode: Rcode) -> ResponseCode {
    match rcode {
        Rcode::NoError => ResponseCode::NoError,
        Rcode::ServFail => ResponseCode::ServFail,
        Rcode::NxDomain => ResponseCode::NXDomain,
        Rcode::NotImp => ResponseCode::NotImp,
        Rcode::Refused => ResponseCode::Refused,
        Rcode::YxDomain => ResponseCode::YXDomain,
        Rcode::YxRrset => ResponseCode::YXRRSet,
        Rcode::NxRrset => ResponseCode::NXRRSet,
        Rcode::NotAuth => ResponseCode::NotAuth,
    }
}

fn rdata_values(rdata: &RData) -> Option<Vec<String>> {
    match rdata {
        RData::A(a) => Some(vec![a.0.to_string()]),
        RData::AAAA(aaaa) => Some(vec![aaaa.0.to_string()]),
        RData::CNAME(cname) => Some(vec![cname.0.to_string()]),
        RData::NS(ns) => Some(vec![ns.0.to_string()]),
        RData::PTR(ptr) => Some(vec![ptr.0.to_string()]),
        RData::TXT(txt) => Some(
            txt.txt_data()
                .iter()
                .map(|data| String::from_utf8_lossy(data).into_owned())
                .collect(),
        ),
        RData::MX(mx) => Some(vec![format!("{} {}", mx.preference(), mx.exchange())]),
        RData::SRV(srv) => Some(vec![format!(
            "{} {} {} {}",
            srv.priority(),
            srv.weight(),
            srv.port(),
            srv.target()
        )]),
        RData::SOA(soa) => Some(vec![format!(
            "{} {} {} {} {} {} {}",
            soa.mname(),
            soa.rname(),
            soa.serial(),
            soa.refresh(),
            soa.retry(),
            soa.expire(),
            soa.minimum()
        )]),
        _ => None,
    }
}

/// Convert a wire record into the model, or `None` for unsupported types.
pub fn record_from_wire(record: &WireRecord) -> Option<Record> {
    let rtype = model_type(record.record_type())?;
    let values = record.data().and_then(rdata_values)?;
    Some(Record::new(
        record.name().to_string(),
        rtype,
        record.ttl(),
        values,
    ))
}

fn parse_name(s: &str) -> Result<Name> {
    Name::from_str(&fqdn(s))
        .map_err(|err| Error::invalid_record(format!("bad name '{s}': {err}")))
}

/// Build the wire RDATA for one model record.
///
/// Multi-value records are only supported for TXT; every other type
/// encodes its first value string.
pub fn rdata_for(record: &Record) -> Result<RData> {
    let first = record
        .values
        .first()
        .ok_or_else(|| Error::invalid_record(format!("record {} has no value", record.name)))?;
    match record.rtype {
        RecordType::A => {
            let addr = first
                .parse()
                .map_err(|_| Error::invalid_record(format!("bad IPv4 address '{first}'")))?;
            Ok(RData::A(A(addr)))
        }
        RecordType::Aaaa => {
            let addr = first
                .parse()
                .map_err(|_| Error::invalid_record(format!("bad IPv6 address '{first}'")))?;
            Ok(RData::AAAA(AAAA(addr)))
        }
        RecordType::Cname => Ok(RData::CNAME(CNAME(parse_name(first)?))),
        RecordType::Ns => Ok(RData::NS(NS(parse_name(first)?))),
        RecordType::Ptr => Ok(RData::PTR(PTR(parse_name(first)?))),
        RecordType::Txt => Ok(RData::TXT(TXT::new(record.values.clone()))),
        RecordType::Mx => {
            let mut parts = first.split_whitespace();
            let (Some(pref), Some(exchange), None) =
                (parts.next(), parts.next(), parts.next())
            else {
                return Err(Error::invalid_record(format!(
                    "MX value must be '<preference> <exchange>', got '{first}'"
                )));
            };
            let pref: u16 = pref
                .parse()
                .map_err(|_| Error::invalid_record(format!("bad MX preference '{pref}'")))?;
            Ok(RData::MX(MX::new(pref, parse_name(exchange)?)))
        }
        RecordType::Srv => {
            let parts: Vec<&str> = first.split_whitespace().collect();
            let [priority, weight, port, target] = parts.as_slice() else {
                return Err(Error::invalid_record(format!(
                    "SRV value must be '<priority> <weight> <port> <target>', got '{first}'"
                )));
            };
            let parse_u16 = |s: &str| {
                s.parse::<u16>()
                    .map_err(|_| Error::invalid_record(format!("bad SRV field '{s}'")))
            };
            Ok(RData::SRV(SRV::new(
                parse_u16(priority)?,
                parse_u16(weight)?,
                parse_u16(port)?,
                parse_name(target)?,
            )))
        }
        RecordType::Soa => {
            let parts: Vec<&str> = first.split_whitespace().collect();
            let [mname, rname, serial, refresh, retry, expire, minimum] = parts.as_slice()
            else {
                return Err(Error::invalid_record(format!(
                    "SOA value must carry seven fields, got '{first}'"
                )));
            };
            let parse_u32 = |s: &str| {
                s.parse::<u32>()
                    .map_err(|_| Error::invalid_record(format!("bad SOA field '{s}'")))
            };
            let parse_i32 = |s: &str| {
                s.parse::<i32>()
                    .map_err(|_| Error::invalid_record(format!("bad SOA field '{s}'")))
            };
            Ok(RData::SOA(SOA::new(
                parse_name(mname)?,
                parse_name(rname)?,
                parse_u32(serial)?,
                parse_i32(refresh)?,
                parse_i32(retry)?,
                parse_i32(expire)?,
                parse_u32(minimum)?,
            )))
        }
    }
}

/// Convert a model record into an IN-class wire record.
pub fn record_to_wire(record: &Record) -> Result<WireRecord> {
    let name = parse_name(&record.name)?;
    let rdata = rdata_for(record)?;
    let mut wire = WireRecord::from_rdata(name, record.ttl, rdata);
    wire.set_dns_class(DNSClass::IN);
    Ok(wire)
}

/// Decode a dynamic update message into an update request.
///
/// The zone comes from the zone (query) section, prerequisites from the
/// answer section, and directives from the authority section.
pub fn decode_update(message: &Message) -> Result<UpdateRequest> {
    let zone = message
        .queries()
        .first()
        .ok_or_else(|| Error::invalid_record("update message has no zone section"))?;

    let prerequisites = message
        .answers()
        .iter()
        .map(|record| Prerequisite {
            name: fqdn(&record.name().to_string()),
            class: rr_class(record.dns_class()),
            rtype: selector(record.record_type()),
        })
        .collect();

    let directives = message
        .name_servers()
        .iter()
        .map(|record| Directive {
            name: fqdn(&record.name().to_string()),
            class: rr_class(record.dns_class()),
            rtype: selector(record.record_type()),
            ttl: record.ttl(),
            values: record
                .data()
                .and_then(rdata_values)
                .unwrap_or_default(),
        })
        .collect();

    Ok(UpdateRequest {
        zone_name: fqdn(&zone.name().to_string()),
        prerequisites,
        directives,
    })
}
