//! Server push handling: endpoint updates, push confirmations and incremental pulls.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, trace};

use crate::error::Result;
use crate::protocol::event::{
    EventKind, NotifyType, OnlineRespPushEvent, ProtocolEvent, PullMessageEvent,
    PullMessageResponseEvent,
};
use crate::protocol::logic::BusinessLogic;
use crate::protocol::session::SessionContext;

#[derive(Debug, Default)]
pub struct PushEventLogic;

impl PushEventLogic {
    pub fn construct() -> Arc<dyn BusinessLogic> {
        Arc::new(PushEventLogic)
    }
}

/// What a notify push asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NotifyAction {
    Pull,
    GroupSystemMessage,
    FriendSystemMessage,
    Ignore,
}

fn notify_action(notify: NotifyType) -> NotifyAction {
    match notify {
        NotifyType::NewMember
        | NotifyType::GroupCreated
        | NotifyType::GroupRequestAccepted
        | NotifyType::FriendMessage
        | NotifyType::FriendMessageSingle
        | NotifyType::FriendPttMessage
        | NotifyType::StrangerMessage
        | NotifyType::FriendFileMessage => NotifyAction::Pull,
        NotifyType::GroupRequest | NotifyType::GroupRequest525 | NotifyType::GroupInvitation => {
            NotifyAction::GroupSystemMessage
        }
        NotifyType::FriendRequest | NotifyType::FriendIncreaseSingle => {
            NotifyAction::FriendSystemMessage
        }
        NotifyType::BlackListUpdate | NotifyType::Unknown(_) => NotifyAction::Ignore,
    }
}

/// Pull everything newer than the stored cursor and route what came back.
async fn pull_messages(ctx: &SessionContext) -> Result<()> {
    let ticket = ctx.state().begin_pull().await;
    let response: PullMessageResponseEvent = ctx
        .send_request(PullMessageEvent {
            cursor: ticket.cursor().cloned(),
        })
        .await?;

    let committed = ctx
        .state()
        .commit_pull(&ticket, response.sync_cursor)
        .await;
    debug!(
        generation = ticket.generation(),
        committed,
        messages = response.messages.len(),
        "Pull completed"
    );

    for message in response.messages {
        ctx.dispatch(message);
    }
    Ok(())
}

#[async_trait]
impl BusinessLogic for PushEventLogic {
    fn name(&self) -> &'static str {
        "PushEvent Logic"
    }

    fn subscriptions(&self) -> &'static [EventKind] {
        &[
            EventKind::PushConfig,
            EventKind::PushNotify,
            EventKind::OnlineReqPush,
            EventKind::PushTransMsg,
        ]
    }

    async fn incoming(&self, ctx: &SessionContext, event: ProtocolEvent) -> Result<()> {
        match event {
            ProtocolEvent::PushConfig(push) => {
                ctx.state().set_highway(push.host, push.ticket).await;
            }
            ProtocolEvent::OnlineReqPush(push) => {
                if let Some(inner) = push.inner {
                    ctx.dispatch(*inner);
                }
                let _ack: OnlineRespPushEvent = ctx
                    .send_request(OnlineRespPushEvent::confirm(ctx.uin(), push.request_id))
                    .await?;
            }
            ProtocolEvent::PushTransMsg(push) => {
                if let Some(inner) = push.inner {
                    ctx.dispatch(*inner);
                }
                let confirm = OnlineRespPushEvent::confirm(ctx.uin(), push.request_id);
                let task_ctx = ctx.clone();
                ctx.spawn_supervised(
                    "PushTransMsg confirmation",
                    Some(EventKind::PushTransMsg),
                    async move {
                        task_ctx.send_request::<OnlineRespPushEvent>(confirm).await?;
                        Ok(())
                    },
                );
            }
            ProtocolEvent::PushNotify(push) => match notify_action(push.notify_type) {
                NotifyAction::Pull => pull_messages(ctx).await?,
                NotifyAction::GroupSystemMessage => {
                    debug!(notify = ?push.notify_type, "Group system message notify");
                }
                NotifyAction::FriendSystemMessage => {
                    debug!(notify = ?push.notify_type, "Friend system message notify");
                }
                NotifyAction::Ignore => {
                    trace!(notify = ?push.notify_type, "Notify ignored");
                }
            },
            other => ctx.post_event_to_entity(other),
        }
        Ok(())
    }
}
