//! Decoders turning raw DNS answers into typed records.
//!
//! Every decoder separates a temporary server condition from a definitive
//! negative answer, which decides whether the caller may retry.

use std::net::{Ipv4Addr, Ipv6Addr};

use trust_dns_resolver::proto::op::{Message, ResponseCode};
use trust_dns_resolver::proto::rr::{Name, RData, Record};

use super::{DecodeError, MxRecord};

fn parse(packet: &[u8]) -> Result<Message, DecodeError> {
    let message = Message::from_vec(packet).map_err(|err| DecodeError::Malformed(err.to_string()))?;
    if message.truncated() {
        return Err(DecodeError::Transient("truncated answer".into()));
    }
    match message.response_code() {
        ResponseCode::NoError => Ok(message),
        code @ (ResponseCode::FormErr
        | ResponseCode::NXDomain
        | ResponseCode::NotImp
        | ResponseCode::Refused) => Err(DecodeError::Negative(code.to_str().into())),
        code => Err(DecodeError::Transient(code.to_str().into())),
    }
}

fn answer_data(message: &Message) -> impl Iterator<Item = &RData> {
    message.answers().iter().filter_map(Record::data)
}

/// Renders a wire name without the trailing root dot.
pub(crate) fn display_name(name: &Name) -> String {
    name.to_ascii().trim_end_matches('.').to_string()
}

/// `Some(target)` if the name is an alias, `None` if it is canonical.
pub fn cname(packet: &[u8]) -> Result<Option<String>, DecodeError> {
    let message = parse(packet)?;
    let target = answer_data(&message).find_map(|data| match data {
        RData::CNAME(cname) => Some(display_name(&cname.0)),
        _ => None,
    });
    Ok(target)
}

/// MX records in answer order. Exchange names are lower-cased.
pub fn mx(packet: &[u8]) -> Result<Vec<MxRecord>, DecodeError> {
    let message = parse(packet)?;
    Ok(answer_data(&message)
        .filter_map(|data| match data {
            RData::MX(mx) => Some(MxRecord::new(
                mx.preference(),
                display_name(mx.exchange()).to_ascii_lowercase(),
            )),
            _ => None,
        })
        .collect())
}

pub fn a(packet: &[u8]) -> Result<Vec<Ipv4Addr>, DecodeError> {
    let message = parse(packet)?;
    Ok(answer_data(&message)
        .filter_map(|data| match data {
            RData::A(a) => Some(a.0),
            _ => None,
        })
        .collect())
}

pub fn aaaa(packet: &[u8]) -> Result<Vec<Ipv6Addr>, DecodeError> {
    let message = parse(packet)?;
    Ok(answer_data(&message)
        .filter_map(|data| match data {
            RData::AAAA(aaaa) => Some(aaaa.0),
            _ => None,
        })
        .collect())
}
