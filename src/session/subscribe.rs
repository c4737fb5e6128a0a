//! Per-kind event subscriptions.

use crate::dispatch::{Event, EventKind};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

pub(crate) type EventHandler = Arc<dyn Fn(&Event) + Send + Sync>;
pub(crate) type LineHandler = Arc<dyn Fn(&str) + Send + Sync>;

/// Identifies a registered handler, see [`Session::unsubscribe`][crate::Session::unsubscribe].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Default)]
pub(crate) struct Subscriptions {
  next_id: AtomicU64,
  events: RwLock<HashMap<EventKind, Vec<(SubscriptionId, EventHandler)>>>,
  lines: RwLock<Vec<(SubscriptionId, LineHandler)>>,
}

impl Subscriptions {
  fn next_id(&self) -> SubscriptionId {
    SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed))
  }

  pub fn add(&self, kind: EventKind, handler: EventHandler) -> SubscriptionId {
    let id = self.next_id();
    self
      .events
      .write()
      .unwrap_or_else(|poisoned| poisoned.into_inner())
      .entry(kind)
      .or_default()
      .push((id, handler));
    id
  }

  pub fn add_line(&self, handler: LineHandler) -> SubscriptionId {
    let id = self.next_id();
    self
      .lines
      .write()
      .unwrap_or_else(|poisoned| poisoned.into_inner())
      .push((id, handler));
    id
  }

  /// Returns `true` if a handler was removed.
  pub fn remove(&self, id: SubscriptionId) -> bool {
    let mut removed = false;
    let mut events = self
      .events
      .write()
      .unwrap_or_else(|poisoned| poisoned.into_inner());
    for handlers in events.values_mut() {
      let before = handlers.len();
      handlers.retain(|(handler_id, _)| *handler_id != id);
      removed |= handlers.len() != before;
    }
    drop(events);

    let mut lines = self
      .lines
      .write()
      .unwrap_or_else(|poisoned| poisoned.into_inner());
    let before = lines.len();
    lines.retain(|(handler_id, _)| *handler_id != id);
    removed | (lines.len() != before)
  }

  /// Call every handler registered for the kind of `event`, in registration order.
  ///
  /// Handlers are called without holding the registry lock, so they may
  /// subscribe or unsubscribe.
  pub fn publish(&self, event: &Event) {
    let handlers = {
      let events = self
        .events
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
      match events.get(&event.kind()) {
        Some(handlers) => handlers
          .iter()
          .map(|(_, handler)| handler.clone())
          .collect::<Vec<_>>(),
        None => return,
      }
    };
    for handler in handlers {
      handler(event);
    }
  }

  pub fn publish_line(&self, line: &str) {
    let handlers = self
      .lines
      .read()
      .unwrap_or_else(|poisoned| poisoned.into_inner())
      .iter()
      .map(|(_, handler)| handler.clone())
      .collect::<Vec<_>>();
    for handler in handlers {
      handler(line);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::Mutex;

  #[test]
  fn handlers_run_in_registration_order() {
    let subs = Subscriptions::default();
    let seen = Arc::new(Mutex::new(Vec::new()));
    for n in 0..3 {
      let seen = seen.clone();
      subs.add(
        EventKind::Connected,
        Arc::new(move |_| seen.lock().unwrap().push(n)),
      );
    }
    subs.publish(&Event::Connected);
    subs.publish(&Event::HostLeft);
    assert_eq!(*seen.lock().unwrap(), [0, 1, 2]);
  }

  #[test]
  fn unsubscribe() {
    let subs = Subscriptions::default();
    let count = Arc::new(AtomicU64::new(0));
    let id = {
      let count = count.clone();
      subs.add(
        EventKind::HostLeft,
        Arc::new(move |_| {
          count.fetch_add(1, Ordering::SeqCst);
        }),
      )
    };
    subs.publish(&Event::HostLeft);
    assert!(subs.remove(id));
    assert!(!subs.remove(id));
    subs.publish(&Event::HostLeft);
    assert_eq!(count.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn handler_may_subscribe_while_running() {
    let subs = Arc::new(Subscriptions::default());
    let inner = subs.clone();
    subs.add(
      EventKind::Connected,
      Arc::new(move |_| {
        inner.add(EventKind::HostLeft, Arc::new(|_| {}));
      }),
    );
    subs.publish(&Event::Connected);
  }

  #[test]
  fn raw_lines() {
    let subs = Subscriptions::default();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    subs.add_line(Arc::new(move |line| sink.lock().unwrap().push(line.to_owned())));
    subs.publish_line("PING :tmi.twitch.tv");
    assert_eq!(*seen.lock().unwrap(), ["PING :tmi.twitch.tv"]);
  }
}
