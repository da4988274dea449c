use crate::envelope::encode_local_part;

use super::engine::{ExchangerState, RecipientState};
use super::{AddressRun, ExchangerSpan, ResolvedSet, Span};

/// Packs canonical recipients, then each exchanger's IPv4 run followed by its
/// IPv6 run, into one buffer. Pure; runs once all queries are answered.
pub(crate) fn assemble<S: AsRef<str>>(
    addresses: &[S],
    recipients: &[RecipientState],
    exchangers: &[ExchangerState],
) -> ResolvedSet {
    let mut out = ResolvedSet::default();

    for (address, state) in addresses.iter().zip(recipients) {
        debug_assert!(state.pending.is_none());
        let address = address.as_ref().as_bytes();
        let offset = out.buffer.len();
        match state.at_offset {
            Some(at) => {
                encode_local_part(&address[..at], &mut out.buffer);
                out.buffer.push(b'@');
                out.buffer.extend_from_slice(state.domain.as_bytes());
            }
            None => out.buffer.extend_from_slice(address),
        }
        out.recipients.push(Span {
            offset,
            len: out.buffer.len() - offset,
        });
    }

    for exchanger in exchangers {
        debug_assert!(exchanger.pending_v4.is_none() && exchanger.pending_v6.is_none());
        let v4 = AddressRun {
            offset: out.buffer.len(),
            count: exchanger.v4.len(),
        };
        out.buffer.extend(exchanger.v4.iter().flatten());
        let v6 = AddressRun {
            offset: out.buffer.len(),
            count: exchanger.v6.len(),
        };
        out.buffer.extend(exchanger.v6.iter().flatten());
        out.exchangers.push(ExchangerSpan { v4, v6 });
    }

    out
}
