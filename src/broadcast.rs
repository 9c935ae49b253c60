use serde::Serialize;
use tokio::sync::broadcast;

use crate::model::MatchModel;

/// Hook invoked after a match row has been stored. Implementations must not
/// block; delivery is best effort.
pub trait MatchBroadcaster: Send + Sync {
    fn notify(&self, created: &MatchModel);
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum MatchEvent {
    MatchCreated(MatchModel),
}

/// In-process fan-out of match events. Subscribers that fall behind by more
/// than the channel capacity miss the oldest events.
#[derive(Clone)]
pub struct MatchFeed {
    tx: broadcast::Sender<MatchEvent>,
}

impl MatchFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MatchEvent> {
        self.tx.subscribe()
    }
}

impl MatchBroadcaster for MatchFeed {
    fn notify(&self, created: &MatchModel) {
        // No subscribers is not an error
        let _ = self.tx.send(MatchEvent::MatchCreated(created.clone()));
    }
}
