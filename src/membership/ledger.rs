//! Points bookkeeping driven by membership events.
//!
//! [`run_ledger`] is the only task that mutates balances in response to
//! events, so the membership check and the following update for a user can
//! never interleave with another event's.

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::context::AppContext;
use crate::error::Result;
use crate::membership::event::{EventKind, MembershipEvent, Role};
use crate::storage::Scope;
use crate::telegram::formatters;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transition {
    Award,
    DeductIfMember,
    Ignore,
}

fn transition(event: &MembershipEvent) -> Transition {
    match (event.scope, event.kind) {
        // The channel owner shows up as a join when the channel is created.
        (
            Scope::Channel,
            EventKind::Joined { role: Role::Creator } | EventKind::Added { role: Role::Creator },
        ) => Transition::Ignore,
        (_, EventKind::Joined { .. } | EventKind::Added { .. }) => Transition::Award,
        (_, EventKind::Left | EventKind::Kicked) => Transition::DeductIfMember,
        (_, EventKind::DeleteArtifact | EventKind::Other) => Transition::Ignore,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointsChange {
    pub user_id: i64,
    pub scope: Scope,
    pub delta: i64,
    pub balance: i64,
    pub notified: bool,
}

/// Applies one event to the store and notifies the user. Returns `None` when
/// the event does not move points.
///
/// The notification goes out after the store update has committed; a failed
/// send does not undo it.
pub async fn apply_event(ctx: &AppContext, event: &MembershipEvent) -> Result<Option<PointsChange>> {
    let reward = ctx.config.join_reward;
    let user_id = event.user_id;

    let (delta, balance, text) = match transition(event) {
        Transition::Ignore => return Ok(None),
        Transition::Award => {
            let balance = ctx.store.apply_delta(user_id, reward, event.scope)?;
            (reward, balance, formatters::joined(event.scope, reward, balance))
        }
        Transition::DeductIfMember => {
            if !ctx.store.get_membership(user_id, event.scope)? {
                debug!(user_id, scope = %event.scope, "Leave without recorded membership, skipping");
                return Ok(None);
            }
            let adjustment = ctx.store.adjust(user_id, -reward, event.scope)?;
            (
                adjustment.applied,
                adjustment.balance,
                formatters::left(event.scope, -adjustment.applied, adjustment.balance),
            )
        }
    };

    let notified = ctx.notifier.notify(user_id, &text).await;

    Ok(Some(PointsChange {
        user_id,
        scope: event.scope,
        delta,
        balance,
        notified,
    }))
}

/// Ledger task: applies events in arrival order until every sender is gone.
pub async fn run_ledger(ctx: Arc<AppContext>, mut rx: mpsc::Receiver<MembershipEvent>) {
    info!("Points ledger started");
    while let Some(event) = rx.recv().await {
        match apply_event(&ctx, &event).await {
            Ok(Some(change)) => info!(
                user_id = change.user_id,
                scope = %change.scope,
                delta = change.delta,
                balance = change.balance,
                notified = change.notified,
                "Points updated"
            ),
            Ok(None) => debug!(?event, "Event left points unchanged"),
            Err(e) => error!(?event, error = %e, "Failed to apply membership event"),
        }
    }
    info!("Points ledger stopped");
}
