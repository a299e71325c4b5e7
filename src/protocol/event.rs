//! Protocol events: the closed set of business messages the engine routes.
//!
//! Every variant wraps its own payload struct. `EventKind` is the plain
//! discriminator used by the registry and carried on the wire as a `u16` code.

use bytes::Bytes;

/// Discriminator for `ProtocolEvent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    PushConfig,
    PushNotify,
    OnlineReqPush,
    PushTransMsg,
    OnlineRespPush,
    PullMessage,
    PullMessageResponse,
    FriendMessage,
    GroupMessage,
}

impl EventKind {
    pub const ALL: [EventKind; 9] = [
        EventKind::PushConfig,
        EventKind::PushNotify,
        EventKind::OnlineReqPush,
        EventKind::PushTransMsg,
        EventKind::OnlineRespPush,
        EventKind::PullMessage,
        EventKind::PullMessageResponse,
        EventKind::FriendMessage,
        EventKind::GroupMessage,
    ];

    /// Wire code carried next to the encoded block
    pub fn code(self) -> u16 {
        match self {
            EventKind::PushConfig => 0x0101,
            EventKind::PushNotify => 0x0102,
            EventKind::OnlineReqPush => 0x0103,
            EventKind::PushTransMsg => 0x0104,
            EventKind::OnlineRespPush => 0x0105,
            EventKind::PullMessage => 0x0201,
            EventKind::PullMessageResponse => 0x0202,
            EventKind::FriendMessage => 0x0301,
            EventKind::GroupMessage => 0x0302,
        }
    }

    pub fn from_code(code: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.code() == code)
    }

    pub fn name(self) -> &'static str {
        match self {
            EventKind::PushConfig => "PushConfig",
            EventKind::PushNotify => "PushNotify",
            EventKind::OnlineReqPush => "OnlineReqPush",
            EventKind::PushTransMsg => "PushTransMsg",
            EventKind::OnlineRespPush => "OnlineRespPush",
            EventKind::PullMessage => "PullMessage",
            EventKind::PullMessageResponse => "PullMessageResponse",
            EventKind::FriendMessage => "FriendMessage",
            EventKind::GroupMessage => "GroupMessage",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Sub-type of a notify push. Codes follow the server's message type numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotifyType {
    NewMember,
    GroupCreated,
    GroupRequest,
    GroupRequestAccepted,
    GroupInvitation,
    GroupRequest525,
    StrangerMessage,
    FriendMessage,
    FriendMessageSingle,
    FriendPttMessage,
    FriendFileMessage,
    FriendRequest,
    FriendIncreaseSingle,
    BlackListUpdate,
    Unknown(u32),
}

impl NotifyType {
    pub fn code(self) -> u32 {
        match self {
            NotifyType::NewMember => 33,
            NotifyType::GroupCreated => 38,
            NotifyType::BlackListUpdate => 44,
            NotifyType::GroupRequest => 84,
            NotifyType::GroupRequestAccepted => 85,
            NotifyType::GroupInvitation => 87,
            NotifyType::StrangerMessage => 141,
            NotifyType::FriendMessage => 166,
            NotifyType::FriendMessageSingle => 167,
            NotifyType::FriendRequest => 187,
            NotifyType::FriendIncreaseSingle => 191,
            NotifyType::FriendPttMessage => 208,
            NotifyType::GroupRequest525 => 525,
            NotifyType::FriendFileMessage => 529,
            NotifyType::Unknown(code) => code,
        }
    }

    pub fn from_code(code: u32) -> Self {
        match code {
            33 => NotifyType::NewMember,
            38 => NotifyType::GroupCreated,
            44 => NotifyType::BlackListUpdate,
            84 => NotifyType::GroupRequest,
            85 => NotifyType::GroupRequestAccepted,
            87 => NotifyType::GroupInvitation,
            141 => NotifyType::StrangerMessage,
            166 => NotifyType::FriendMessage,
            167 => NotifyType::FriendMessageSingle,
            187 => NotifyType::FriendRequest,
            191 => NotifyType::FriendIncreaseSingle,
            208 => NotifyType::FriendPttMessage,
            525 => NotifyType::GroupRequest525,
            529 => NotifyType::FriendFileMessage,
            other => NotifyType::Unknown(other),
        }
    }
}

/// Server hands out a new upload/relay endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushConfigEvent {
    pub host: String,
    pub ticket: Bytes,
}

/// Server signals that something new is waiting to be pulled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushNotifyEvent {
    pub notify_type: NotifyType,
}

/// Online push that must be confirmed back to the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnlineReqPushEvent {
    pub request_id: u32,
    pub inner: Option<Box<ProtocolEvent>>,
}

/// Transferred message push that must be confirmed back to the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushTransMsgEvent {
    pub request_id: u32,
    pub inner: Option<Box<ProtocolEvent>>,
}

/// Confirmation of an online or trans-message push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnlineRespPushEvent {
    pub uin: u64,
    pub request_id: u32,
}

impl OnlineRespPushEvent {
    pub fn confirm(uin: u64, request_id: u32) -> Self {
        Self { uin, request_id }
    }
}

/// Incremental pull request. `cursor: None` asks for a fresh sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullMessageEvent {
    pub cursor: Option<Bytes>,
}

/// Reply to a pull. An absent cursor means the server sent no update.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PullMessageResponseEvent {
    pub sync_cursor: Option<Bytes>,
    pub messages: Vec<ProtocolEvent>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FriendMessageEvent {
    pub from_uin: u64,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupMessageEvent {
    pub group_uin: u64,
    pub member_uin: u64,
    pub text: String,
}

/// Every inbound or outbound business message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolEvent {
    PushConfig(PushConfigEvent),
    PushNotify(PushNotifyEvent),
    OnlineReqPush(OnlineReqPushEvent),
    PushTransMsg(PushTransMsgEvent),
    OnlineRespPush(OnlineRespPushEvent),
    PullMessage(PullMessageEvent),
    PullMessageResponse(PullMessageResponseEvent),
    FriendMessage(FriendMessageEvent),
    GroupMessage(GroupMessageEvent),
}

impl ProtocolEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            ProtocolEvent::PushConfig(_) => EventKind::PushConfig,
            ProtocolEvent::PushNotify(_) => EventKind::PushNotify,
            ProtocolEvent::OnlineReqPush(_) => EventKind::OnlineReqPush,
            ProtocolEvent::PushTransMsg(_) => EventKind::PushTransMsg,
            ProtocolEvent::OnlineRespPush(_) => EventKind::OnlineRespPush,
            ProtocolEvent::PullMessage(_) => EventKind::PullMessage,
            ProtocolEvent::PullMessageResponse(_) => EventKind::PullMessageResponse,
            ProtocolEvent::FriendMessage(_) => EventKind::FriendMessage,
            ProtocolEvent::GroupMessage(_) => EventKind::GroupMessage,
        }
    }

    /// Nested event that should be dispatched on its own, if any.
    pub fn inner_event(&self) -> Option<&ProtocolEvent> {
        match self {
            ProtocolEvent::OnlineReqPush(e) => e.inner.as_deref(),
            ProtocolEvent::PushTransMsg(e) => e.inner.as_deref(),
            _ => None,
        }
    }
}

/// Payload type that can be awaited as the reply to a correlated request.
pub trait ReplyEvent: Sized + Send + 'static {
    const KIND: EventKind;

    /// Unwrap the payload, handing the event back if it is a different variant.
    fn from_event(event: ProtocolEvent) -> std::result::Result<Self, ProtocolEvent>;
}

macro_rules! event_payload {
    ($($variant:ident => $payload:ty),* $(,)?) => {
        $(
            impl From<$payload> for ProtocolEvent {
                fn from(payload: $payload) -> Self {
                    ProtocolEvent::$variant(payload)
                }
            }

            impl ReplyEvent for $payload {
                const KIND: EventKind = EventKind::$variant;

                fn from_event(event: ProtocolEvent) -> std::result::Result<Self, ProtocolEvent> {
                    match event {
                        ProtocolEvent::$variant(payload) => Ok(payload),
                        other => Err(other),
                    }
                }
            }
        )*
    };
}

event_payload! {
    PushConfig => PushConfigEvent,
    PushNotify => PushNotifyEvent,
    OnlineReqPush => OnlineReqPushEvent,
    PushTransMsg => PushTransMsgEvent,
    OnlineRespPush => OnlineRespPushEvent,
    PullMessage => PullMessageEvent,
    PullMessageResponse => PullMessageResponseEvent,
    FriendMessage => FriendMessageEvent,
    GroupMessage => GroupMessageEvent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_codes_are_unique_and_reversible() {
        for kind in EventKind::ALL {
            assert_eq!(EventKind::from_code(kind.code()), Some(kind));
        }
        assert_eq!(EventKind::from_code(0xFFFF), None);
    }

    #[test]
    fn test_notify_codes_roundtrip() {
        for code in [33, 38, 44, 84, 85, 87, 141, 166, 167, 187, 191, 208, 525, 529] {
            let notify = NotifyType::from_code(code);
            assert!(!matches!(notify, NotifyType::Unknown(_)));
            assert_eq!(notify.code(), code);
        }
        assert_eq!(NotifyType::from_code(9999), NotifyType::Unknown(9999));
    }

    #[test]
    fn test_reply_unwrap_rejects_other_variant() {
        let event: ProtocolEvent = OnlineRespPushEvent::confirm(10000, 7).into();
        assert_eq!(event.kind(), EventKind::OnlineRespPush);

        let back = PullMessageResponseEvent::from_event(event.clone());
        assert_eq!(back, Err(event.clone()));
        assert_eq!(
            OnlineRespPushEvent::from_event(event),
            Ok(OnlineRespPushEvent::confirm(10000, 7))
        );
    }

    #[test]
    fn test_inner_event_exposed() {
        let inner = ProtocolEvent::FriendMessage(FriendMessageEvent {
            from_uin: 1,
            text: "hi".into(),
        });
        let push = ProtocolEvent::OnlineReqPush(OnlineReqPushEvent {
            request_id: 3,
            inner: Some(Box::new(inner.clone())),
        });
        assert_eq!(push.inner_event(), Some(&inner));
        assert_eq!(
            ProtocolEvent::PushNotify(PushNotifyEvent {
                notify_type: NotifyType::FriendMessage
            })
            .inner_event(),
            None
        );
    }
}
