use std::sync::Arc;

use crate::config::Config;
use crate::storage::PointsStore;
use crate::telegram::invite::InviteLinkSource;
use crate::telegram::notifications::{Messenger, Notifier};

/// Everything the responder and the ledger need, built once at startup.
pub struct AppContext {
    pub config: Config,
    pub store: PointsStore,
    pub invites: Arc<dyn InviteLinkSource>,
    pub messenger: Arc<dyn Messenger>,
    pub notifier: Notifier,
}

impl AppContext {
    pub fn new(
        config: Config,
        store: PointsStore,
        invites: Arc<dyn InviteLinkSource>,
        messenger: Arc<dyn Messenger>,
    ) -> Self {
        let notifier = Notifier::new(Arc::clone(&messenger));
        Self {
            config,
            store,
            invites,
            messenger,
            notifier,
        }
    }
}
