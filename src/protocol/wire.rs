//! Event wire codec.
//!
//! Each event encodes as one counted TLV block (`core::packer`). Nested events,
//! such as the inner event of a push or the messages of a pull response, are
//! carried in a single record whose value is `[Kind(2)] [Block]`.

use bytes::Bytes;

use crate::core::packer::{CountPrefix, TlvPacker};
use crate::core::packet::{Packet, PacketReader};
use crate::core::tlv::{Tlv, TlvBlock};
use crate::error::{constants, ProtocolError, Result};
use crate::protocol::event::*;

/// Record tags used by the event codec.
pub mod tags {
    pub const HOST: u16 = 0x0001;
    pub const TICKET: u16 = 0x0002;
    pub const NOTIFY_TYPE: u16 = 0x0010;
    pub const REQUEST_ID: u16 = 0x0020;
    pub const INNER_EVENT: u16 = 0x0021;
    pub const UIN: u16 = 0x0030;
    pub const SYNC_CURSOR: u16 = 0x0040;
    pub const PULLED_MESSAGE: u16 = 0x0041;
    pub const SENDER_UIN: u16 = 0x0050;
    pub const TEXT: u16 = 0x0051;
    pub const GROUP_UIN: u16 = 0x0052;
}

/// Deepest chain of nested events accepted in either direction.
pub const MAX_NESTING_DEPTH: usize = 8;

fn nesting_error(depth: usize) -> ProtocolError {
    ProtocolError::malformed(format!(
        "{}: depth {depth} exceeds {MAX_NESTING_DEPTH}",
        constants::ERR_NESTING_TOO_DEEP
    ))
}

/// Build the packer holding `event`'s records.
pub fn pack_event(event: &ProtocolEvent) -> Result<TlvPacker> {
    pack_at(event, 0)
}

fn pack_at(event: &ProtocolEvent, depth: usize) -> Result<TlvPacker> {
    let mut packer = TlvPacker::new();

    match event {
        ProtocolEvent::PushConfig(e) => {
            packer.put_tlv(&Tlv::from_text(tags::HOST, &e.host)?)?;
            packer.put_tlv(&Tlv::new(tags::TICKET, e.ticket.clone())?)?;
        }
        ProtocolEvent::PushNotify(e) => {
            packer.put_tlv(&Tlv::from_u32(tags::NOTIFY_TYPE, e.notify_type.code()))?;
        }
        ProtocolEvent::OnlineReqPush(OnlineReqPushEvent { request_id, inner })
        | ProtocolEvent::PushTransMsg(PushTransMsgEvent { request_id, inner }) => {
            packer.put_tlv(&Tlv::from_u32(tags::REQUEST_ID, *request_id))?;
            let nested = inner
                .as_deref()
                .map(|inner| nested_tlv(tags::INNER_EVENT, inner, depth + 1))
                .transpose()?;
            packer.put_tlv(nested.as_ref())?;
        }
        ProtocolEvent::OnlineRespPush(e) => {
            packer.put_tlv(&Tlv::from_u64(tags::UIN, e.uin))?;
            packer.put_tlv(&Tlv::from_u32(tags::REQUEST_ID, e.request_id))?;
        }
        ProtocolEvent::PullMessage(e) => {
            let cursor = e
                .cursor
                .clone()
                .map(|c| Tlv::new(tags::SYNC_CURSOR, c))
                .transpose()?;
            packer.put_tlv(cursor.as_ref())?;
        }
        ProtocolEvent::PullMessageResponse(e) => {
            let cursor = e
                .sync_cursor
                .clone()
                .map(|c| Tlv::new(tags::SYNC_CURSOR, c))
                .transpose()?;
            packer.put_tlv(cursor.as_ref())?;
            for message in &e.messages {
                packer.put_tlv(&nested_tlv(tags::PULLED_MESSAGE, message, depth + 1)?)?;
            }
        }
        ProtocolEvent::FriendMessage(e) => {
            packer.put_tlv(&Tlv::from_u64(tags::SENDER_UIN, e.from_uin))?;
            packer.put_tlv(&Tlv::from_text(tags::TEXT, &e.text)?)?;
        }
        ProtocolEvent::GroupMessage(e) => {
            packer.put_tlv(&Tlv::from_u64(tags::GROUP_UIN, e.group_uin))?;
            packer.put_tlv(&Tlv::from_u64(tags::SENDER_UIN, e.member_uin))?;
            packer.put_tlv(&Tlv::from_text(tags::TEXT, &e.text)?)?;
        }
    }

    Ok(packer)
}

/// Encode `event` as a plain counted block.
pub fn encode_event(event: &ProtocolEvent) -> Result<Bytes> {
    Ok(pack_event(event)?.to_bytes(CountPrefix::Always))
}

fn nested_tlv(tag: u16, event: &ProtocolEvent, depth: usize) -> Result<Tlv> {
    if depth > MAX_NESTING_DEPTH {
        return Err(nesting_error(depth));
    }
    let block = pack_at(event, depth)?.finalize(CountPrefix::Always);
    let mut packet = Packet::with_capacity(2 + block.len());
    packet.put_u16(event.kind().code()).put_packet(&block);
    Tlv::new(tag, packet.into_bytes())
}

fn decode_nested(tlv: &Tlv, depth: usize) -> Result<ProtocolEvent> {
    if depth > MAX_NESTING_DEPTH {
        return Err(nesting_error(depth));
    }
    let mut reader = PacketReader::new(tlv.value());
    let code = reader.read_u16()?;
    let block = reader.read_bytes(reader.remaining())?;
    decode_at(kind_from_code(code)?, block, depth)
}

fn kind_from_code(code: u16) -> Result<EventKind> {
    EventKind::from_code(code).ok_or_else(|| {
        ProtocolError::malformed(format!("{}: 0x{code:04x}", constants::ERR_UNKNOWN_EVENT_KIND))
    })
}

/// Decode a block whose kind is only known by its wire code.
pub fn decode_event_code(code: u16, block: &[u8]) -> Result<ProtocolEvent> {
    decode_event(kind_from_code(code)?, block)
}

/// Decode a counted block into the event of the given kind.
///
/// Nested events deeper than `MAX_NESTING_DEPTH` are rejected as malformed.
pub fn decode_event(kind: EventKind, block: &[u8]) -> Result<ProtocolEvent> {
    decode_at(kind, block, 0)
}

fn decode_at(kind: EventKind, block: &[u8], depth: usize) -> Result<ProtocolEvent> {
    let block = TlvBlock::parse(block)?;

    let event = match kind {
        EventKind::PushConfig => ProtocolEvent::PushConfig(PushConfigEvent {
            host: block.require(tags::HOST)?.as_str()?.to_owned(),
            ticket: block.require(tags::TICKET)?.value().clone(),
        }),
        EventKind::PushNotify => ProtocolEvent::PushNotify(PushNotifyEvent {
            notify_type: NotifyType::from_code(block.require(tags::NOTIFY_TYPE)?.as_u32()?),
        }),
        EventKind::OnlineReqPush => ProtocolEvent::OnlineReqPush(OnlineReqPushEvent {
            request_id: block.require(tags::REQUEST_ID)?.as_u32()?,
            inner: decode_inner(&block, depth)?,
        }),
        EventKind::PushTransMsg => ProtocolEvent::PushTransMsg(PushTransMsgEvent {
            request_id: block.require(tags::REQUEST_ID)?.as_u32()?,
            inner: decode_inner(&block, depth)?,
        }),
        EventKind::OnlineRespPush => ProtocolEvent::OnlineRespPush(OnlineRespPushEvent {
            uin: block.require(tags::UIN)?.as_u64()?,
            request_id: block.require(tags::REQUEST_ID)?.as_u32()?,
        }),
        EventKind::PullMessage => ProtocolEvent::PullMessage(PullMessageEvent {
            cursor: block.get(tags::SYNC_CURSOR).map(|t| t.value().clone()),
        }),
        EventKind::PullMessageResponse => {
            ProtocolEvent::PullMessageResponse(PullMessageResponseEvent {
                sync_cursor: block.get(tags::SYNC_CURSOR).map(|t| t.value().clone()),
                messages: block
                    .all(tags::PULLED_MESSAGE)
                    .map(|tlv| decode_nested(tlv, depth + 1))
                    .collect::<Result<Vec<_>>>()?,
            })
        }
        EventKind::FriendMessage => ProtocolEvent::FriendMessage(FriendMessageEvent {
            from_uin: block.require(tags::SENDER_UIN)?.as_u64()?,
            text: block.require(tags::TEXT)?.as_str()?.to_owned(),
        }),
        EventKind::GroupMessage => ProtocolEvent::GroupMessage(GroupMessageEvent {
            group_uin: block.require(tags::GROUP_UIN)?.as_u64()?,
            member_uin: block.require(tags::SENDER_UIN)?.as_u64()?,
            text: block.require(tags::TEXT)?.as_str()?.to_owned(),
        }),
    };

    Ok(event)
}

fn decode_inner(block: &TlvBlock, depth: usize) -> Result<Option<Box<ProtocolEvent>>> {
    block
        .get(tags::INNER_EVENT)
        .map(|tlv| decode_nested(tlv, depth + 1).map(Box::new))
        .transpose()
}
