//! ## Chat session
//!
//! A [`Session`] ties a [`Transport`] to the [`Dispatcher`] for a single room.
//!
//! It owns the connection lifecycle, caches the latest room state, user
//! state, chat message and whisper, and sends outgoing messages through
//! the chat and whisper [`Throttle`]s.
//!
//! Lines are handled one at a time, in the order the transport delivers
//! them, and every event from a line is delivered before the next line is
//! looked at. Handlers run on the transport's reader thread.

mod subscribe;
pub mod write;

pub use subscribe::SubscriptionId;
pub use write::{RoomCommand, SameMessageBypass};

use crate::dispatch::{
  DispatchContext, DispatchMode, Dispatcher, Event, EventKind, Outcome, SendKind,
};
use crate::emotes::{EmoteCollection, EmoteTier};
use crate::msg::{ChatMessage, RoomState, UserState, WhisperMessage};
use crate::throttle::{Throttle, ThrottleConfig, Violation};
use crate::transport::{Priority, Transport, TransportError, TransportEvents};
use rand::{thread_rng, Rng};
use std::fmt::Display;
use std::sync::{Arc, Mutex, RwLock, Weak};
use subscribe::Subscriptions;

/// Default server host.
pub const HOST: &str = "irc.chat.twitch.tv";

/// Default server port (TLS).
pub const PORT: u16 = 6697;

/// Credentials used to authenticate to Twitch IRC.
///
/// The [`Default`] impl uses [`Credentials::anon`].
#[derive(Clone)]
pub struct Credentials {
  /// The _login_ of the user.
  pub nick: String,

  /// The oauth2 token.
  pub pass: String,
}

impl Credentials {
  const ANON_RANGE: std::ops::Range<u32> = 10000..99999;

  /// Instantiate credentials from a `nick` and `pass`.
  pub fn new(nick: impl ToString, pass: impl ToString) -> Self {
    Self {
      nick: nick.to_string(),
      pass: pass.to_string(),
    }
  }

  /// An anonymous login.
  ///
  /// Twitch allows logging in using any username in the form `justinfan?????`
  /// where `?` is any digit. Anonymous sessions can read chat, but not send to it.
  pub fn anon() -> Self {
    Self {
      pass: "just_a_lil_guy".into(),
      nick: format!("justinfan{}", thread_rng().gen_range(Self::ANON_RANGE)),
    }
  }

  pub fn is_anon(&self) -> bool {
    let Some(digits) = self.nick.strip_prefix("justinfan") else {
      return false;
    };
    let Some(digits) = digits.parse::<u32>().ok() else {
      return false;
    };
    Self::ANON_RANGE.contains(&digits)
  }
}

impl Default for Credentials {
  fn default() -> Self {
    Self::anon()
  }
}

impl std::fmt::Debug for Credentials {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Credentials")
      .field("nick", &self.nick)
      .finish_non_exhaustive()
  }
}

/// Session configuration.
#[derive(Clone, Debug)]
pub struct Config {
  /// Credentials to use when logging in.
  pub credentials: Credentials,

  /// Room to join, without the `#`.
  pub room: String,

  pub host: String,
  pub port: u16,

  /// Reply to server `PING`s automatically.
  pub auto_pong: bool,

  /// Replace emotes in chat messages using [`Config::emotes`].
  pub replace_emotes: bool,

  /// Tier used to decide which emotes may be replaced.
  pub emote_tier: EmoteTier,

  pub emotes: Arc<EmoteCollection>,

  /// [`None`] disables throttling of chat messages.
  pub chat_throttle: Option<ThrottleConfig>,

  /// [`None`] disables throttling of whispers.
  pub whisper_throttle: Option<ThrottleConfig>,

  /// Pass raw lines through the chat throttle.
  pub throttle_raw: bool,

  pub dispatch_mode: DispatchMode,

  /// Log lines which match no rule.
  pub log_unclassified: bool,

  /// Initial chat command prefixes.
  pub chat_prefixes: Vec<char>,

  /// Initial whisper command prefixes.
  pub whisper_prefixes: Vec<char>,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      credentials: Credentials::default(),
      room: String::new(),
      host: HOST.into(),
      port: PORT,
      auto_pong: true,
      replace_emotes: false,
      emote_tier: EmoteTier::Everyone,
      emotes: Arc::default(),
      chat_throttle: Some(ThrottleConfig::chat()),
      whisper_throttle: Some(ThrottleConfig::whisper()),
      throttle_raw: false,
      dispatch_mode: DispatchMode::Double,
      log_unclassified: false,
      chat_prefixes: vec!['!'],
      whisper_prefixes: vec!['!'],
    }
  }
}

impl Config {
  /// Instantiate a config for `room` from some `credentials`.
  pub fn new(credentials: Credentials, room: impl AsRef<str>) -> Self {
    Self {
      credentials,
      room: normalize_room(room.as_ref()),
      ..Default::default()
    }
  }
}

fn normalize_room(room: &str) -> String {
  room.trim().trim_start_matches('#').to_ascii_lowercase()
}

/// Builder for a [`Session`].
#[derive(Clone, Debug, Default)]
pub struct SessionBuilder {
  config: Config,
}

impl SessionBuilder {
  pub fn credentials(mut self, credentials: Credentials) -> Self {
    self.config.credentials = credentials;
    self
  }

  /// Room to join. A leading `#` is stripped.
  pub fn room(mut self, room: impl AsRef<str>) -> Self {
    self.config.room = normalize_room(room.as_ref());
    self
  }

  pub fn server(mut self, host: impl Into<String>, port: u16) -> Self {
    self.config.host = host.into();
    self.config.port = port;
    self
  }

  pub fn auto_pong(mut self, enabled: bool) -> Self {
    self.config.auto_pong = enabled;
    self
  }

  /// Replace emotes in chat messages with the entries in `emotes`
  /// which are available to `tier`.
  pub fn replace_emotes(
    mut self,
    emotes: impl Into<Arc<EmoteCollection>>,
    tier: EmoteTier,
  ) -> Self {
    self.config.replace_emotes = true;
    self.config.emotes = emotes.into();
    self.config.emote_tier = tier;
    self
  }

  pub fn chat_throttle(mut self, throttle: Option<ThrottleConfig>) -> Self {
    self.config.chat_throttle = throttle;
    self
  }

  pub fn whisper_throttle(mut self, throttle: Option<ThrottleConfig>) -> Self {
    self.config.whisper_throttle = throttle;
    self
  }

  pub fn throttle_raw(mut self, enabled: bool) -> Self {
    self.config.throttle_raw = enabled;
    self
  }

  pub fn dispatch_mode(mut self, mode: DispatchMode) -> Self {
    self.config.dispatch_mode = mode;
    self
  }

  pub fn log_unclassified(mut self, enabled: bool) -> Self {
    self.config.log_unclassified = enabled;
    self
  }

  pub fn chat_prefixes(mut self, prefixes: impl IntoIterator<Item = char>) -> Self {
    self.config.chat_prefixes = prefixes.into_iter().collect();
    self
  }

  pub fn whisper_prefixes(mut self, prefixes: impl IntoIterator<Item = char>) -> Self {
    self.config.whisper_prefixes = prefixes.into_iter().collect();
    self
  }

  pub fn config(&self) -> &Config {
    &self.config
  }

  /// Create the session. It starts out [`ConnectionState::Disconnected`].
  pub fn build(self, transport: Arc<dyn Transport>) -> Session {
    Session::new(self.config, transport)
  }
}

/// Connection lifecycle of a [`Session`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConnectionState {
  #[default]
  Disconnected,

  /// The transport is opening the connection.
  Connecting,

  /// Credentials and capability requests are being sent.
  Authenticating,

  /// The room was joined, and the server has not yet confirmed the login.
  JoinedAwaitingConfirmation,

  /// The login was confirmed. Lines are being classified.
  Listening,
}

/// Result of a send which did not fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sent {
  /// The line was handed to the transport.
  Queued,

  /// The line was dropped by a throttle.
  Throttled(Violation),
}

/// Failed to send a line.
#[derive(Debug)]
pub enum SendError {
  /// The session is disconnected.
  NotConnected,

  /// The transport rejected the line.
  Transport(TransportError),
}

impl From<TransportError> for SendError {
  fn from(value: TransportError) -> Self {
    Self::Transport(value)
  }
}

impl Display for SendError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      SendError::NotConnected => write!(f, "failed to send: not connected"),
      SendError::Transport(e) => write!(f, "failed to send: {e}"),
    }
  }
}

impl std::error::Error for SendError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      SendError::NotConnected => None,
      SendError::Transport(e) => Some(e),
    }
  }
}

/// A consistent copy of the session's cached state.
///
/// `version` increases every time any of the other fields change.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Snapshot {
  pub version: u64,
  pub state: ConnectionState,
  pub room_state: RoomState,
  pub user_state: Option<UserState>,
  pub last_message: Option<ChatMessage>,
  pub last_whisper: Option<WhisperMessage>,
  pub chat_prefixes: Vec<char>,
  pub whisper_prefixes: Vec<char>,
}

impl Snapshot {
  fn bump(&mut self) {
    self.version += 1;
  }
}

struct Shared {
  config: Config,
  transport: Arc<dyn Transport>,
  dispatcher: Dispatcher,
  cache: RwLock<Snapshot>,
  subscriptions: Subscriptions,
  chat_throttle: Option<Throttle>,
  whisper_throttle: Option<Throttle>,
  bypass: Mutex<SameMessageBypass>,
  /// Held while a line is handled, so lines never interleave.
  pipeline: Mutex<()>,
}

/// A chat session for a single room.
///
/// Cloning a session yields another handle to the same session.
#[derive(Clone)]
pub struct Session {
  shared: Arc<Shared>,
}

impl Session {
  /// The [`SessionBuilder`] provides a builder for setting up the session configuration.
  pub fn builder() -> SessionBuilder {
    SessionBuilder::default()
  }

  /// Create a handle which does not keep the session alive.
  ///
  /// Event handlers which need to call back into the session should capture
  /// this instead of a [`Session`] clone.
  pub fn downgrade(&self) -> WeakSession {
    WeakSession(Arc::downgrade(&self.shared))
  }

  pub fn new(config: Config, transport: Arc<dyn Transport>) -> Self {
    let cache = Snapshot {
      room_state: RoomState {
        room: config.room.clone(),
        ..Default::default()
      },
      chat_prefixes: config.chat_prefixes.clone(),
      whisper_prefixes: config.whisper_prefixes.clone(),
      ..Default::default()
    };
    Self {
      shared: Arc::new(Shared {
        chat_throttle: config.chat_throttle.clone().map(Throttle::new),
        whisper_throttle: config.whisper_throttle.clone().map(Throttle::new),
        config,
        transport,
        dispatcher: Dispatcher::new(),
        cache: RwLock::new(cache),
        subscriptions: Subscriptions::default(),
        bypass: Mutex::new(SameMessageBypass::default()),
        pipeline: Mutex::new(()),
      }),
    }
  }

  #[inline]
  pub fn config(&self) -> &Config {
    &self.shared.config
  }

  #[inline]
  pub fn credentials(&self) -> &Credentials {
    &self.shared.config.credentials
  }

  #[inline]
  pub fn room(&self) -> &str {
    &self.shared.config.room
  }

  /// Register `handler` for events of `kind`.
  ///
  /// Handlers for the same kind run in registration order.
  pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> SubscriptionId
  where
    F: Fn(&Event) + Send + Sync + 'static,
  {
    self.shared.subscriptions.add(kind, Arc::new(handler))
  }

  /// Register `handler` for every line received while connected,
  /// before the line is classified.
  pub fn on_raw_line<F>(&self, handler: F) -> SubscriptionId
  where
    F: Fn(&str) + Send + Sync + 'static,
  {
    self.shared.subscriptions.add_line(Arc::new(handler))
  }

  /// Remove a handler. Returns `false` if it was already removed.
  pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
    self.shared.subscriptions.remove(id)
  }

  /// Start connecting. Does nothing unless the session is disconnected.
  ///
  /// Login happens once the transport reports that it is connected.
  pub fn connect(&self) -> Result<(), TransportError> {
    {
      let mut cache = self.shared.write_cache();
      if cache.state != ConnectionState::Disconnected {
        debug!(state = ?cache.state, "connect called while not disconnected");
        return Ok(());
      }
      cache.state = ConnectionState::Connecting;
      cache.bump();
    }

    let config = &self.shared.config;
    debug!(host = %config.host, port = config.port, room = %config.room, "connecting");
    let events: Arc<dyn TransportEvents> = Arc::new(EventsHandle(Arc::downgrade(&self.shared)));
    if let Err(e) = self.shared.transport.connect(&config.host, config.port, events) {
      warn!("failed to connect: {e}");
      self.shared.set_state(ConnectionState::Disconnected);
      return Err(e);
    }
    Ok(())
  }

  /// Disconnect. Valid in any state, including from inside an event handler.
  ///
  /// No [`Event::Disconnected`] is emitted for a disconnect requested here.
  pub fn disconnect(&self) {
    self.shared.disconnect();
  }

  /// Handle one received line, as if the transport had delivered it.
  pub fn handle_line(&self, line: &str) {
    self.shared.handle_line(line);
  }

  pub fn state(&self) -> ConnectionState {
    self.shared.read_cache().state
  }

  /// A consistent copy of all cached state.
  pub fn snapshot(&self) -> Snapshot {
    self.shared.read_cache().clone()
  }

  pub fn room_state(&self) -> RoomState {
    self.shared.read_cache().room_state.clone()
  }

  pub fn user_state(&self) -> Option<UserState> {
    self.shared.read_cache().user_state.clone()
  }

  pub fn last_message(&self) -> Option<ChatMessage> {
    self.shared.read_cache().last_message.clone()
  }

  pub fn last_whisper(&self) -> Option<WhisperMessage> {
    self.shared.read_cache().last_whisper.clone()
  }

  pub fn chat_prefixes(&self) -> Vec<char> {
    self.shared.read_cache().chat_prefixes.clone()
  }

  pub fn whisper_prefixes(&self) -> Vec<char> {
    self.shared.read_cache().whisper_prefixes.clone()
  }

  /// Register a chat command prefix. Returns `false` if it was already registered.
  pub fn add_chat_prefix(&self, prefix: char) -> bool {
    self.shared.update_prefixes(PrefixSet::Chat, |p| add_prefix(p, prefix))
  }

  /// Returns `false` if `prefix` was not registered.
  pub fn remove_chat_prefix(&self, prefix: char) -> bool {
    self.shared.update_prefixes(PrefixSet::Chat, |p| remove_prefix(p, prefix))
  }

  /// Register a whisper command prefix. Returns `false` if it was already registered.
  pub fn add_whisper_prefix(&self, prefix: char) -> bool {
    self.shared.update_prefixes(PrefixSet::Whisper, |p| add_prefix(p, prefix))
  }

  /// Returns `false` if `prefix` was not registered.
  pub fn remove_whisper_prefix(&self, prefix: char) -> bool {
    self.shared.update_prefixes(PrefixSet::Whisper, |p| remove_prefix(p, prefix))
  }

  /// Send a chat message to the session's room.
  pub fn send_message(&self, body: &str) -> Result<Sent, SendError> {
    self.shared.ensure_connected()?;
    let sent = self.shared.bypass().body(body).into_owned();
    let config = &self.shared.config;
    let line = write::chat_line(&config.credentials.nick, &config.room, &sent);
    let result = self.shared.send_through(
      SendKind::Chat,
      self.shared.chat_throttle.as_ref(),
      &sent,
      line,
      Priority::Normal,
    );
    if let Ok(Sent::Queued) = result {
      self.shared.bypass().sent(body, &sent);
    }
    result
  }

  /// Send a `/me` message to the session's room.
  pub fn send_action(&self, body: &str) -> Result<Sent, SendError> {
    self.send_message(&format!("/me {body}"))
  }

  /// Send a moderation or room settings command to the session's room.
  pub fn send_command(&self, command: &RoomCommand) -> Result<Sent, SendError> {
    self.send_message(&command.to_string())
  }

  /// Send a whisper to `recipient`.
  pub fn send_whisper(&self, recipient: &str, body: &str) -> Result<Sent, SendError> {
    self.shared.ensure_connected()?;
    let line = write::whisper_line(&self.shared.config.credentials.nick, recipient, body);
    self.shared.send_through(
      SendKind::Whisper,
      self.shared.whisper_throttle.as_ref(),
      body,
      line,
      Priority::Normal,
    )
  }

  /// Send a line as-is.
  ///
  /// This bypasses throttling unless [`Config::throttle_raw`] is set,
  /// in which case it counts against the chat throttle.
  pub fn send_raw(&self, line: &str) -> Result<Sent, SendError> {
    self.shared.ensure_connected()?;
    let throttle = match self.shared.config.throttle_raw {
      true => self.shared.chat_throttle.as_ref(),
      false => None,
    };
    let line = write::sanitize(line).into_owned();
    self
      .shared
      .send_through(SendKind::Raw, throttle, &line, line.clone(), Priority::Normal)
  }

  /// Leave the session's room without disconnecting.
  pub fn part(&self) -> Result<(), SendError> {
    self.shared.ensure_connected()?;
    let line = write::part_line(&self.shared.config.room);
    Ok(self.shared.transport.send_line(&line, Priority::Normal)?)
  }

  /// Join the session's room again after [`Session::part`].
  pub fn rejoin(&self) -> Result<(), SendError> {
    self.shared.ensure_connected()?;
    let line = write::join_line(&self.shared.config.room);
    Ok(self.shared.transport.send_line(&line, Priority::Normal)?)
  }
}

impl std::fmt::Debug for Session {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Session")
      .field("config", &self.shared.config)
      .field("state", &self.state())
      .finish_non_exhaustive()
  }
}

enum PrefixSet {
  Chat,
  Whisper,
}

fn add_prefix(prefixes: &mut Vec<char>, prefix: char) -> bool {
  if prefixes.contains(&prefix) {
    return false;
  }
  prefixes.push(prefix);
  true
}

fn remove_prefix(prefixes: &mut Vec<char>, prefix: char) -> bool {
  let before = prefixes.len();
  prefixes.retain(|p| *p != prefix);
  prefixes.len() != before
}

impl Shared {
  fn read_cache(&self) -> std::sync::RwLockReadGuard<'_, Snapshot> {
    self.cache.read().unwrap_or_else(|poisoned| poisoned.into_inner())
  }

  fn write_cache(&self) -> std::sync::RwLockWriteGuard<'_, Snapshot> {
    self.cache.write().unwrap_or_else(|poisoned| poisoned.into_inner())
  }

  fn bypass(&self) -> std::sync::MutexGuard<'_, SameMessageBypass> {
    self.bypass.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
  }

  fn set_state(&self, state: ConnectionState) {
    let mut cache = self.write_cache();
    if cache.state != state {
      trace!(from = ?cache.state, to = ?state, "state change");
      cache.state = state;
      cache.bump();
    }
  }

  fn update_prefixes(&self, set: PrefixSet, update: impl FnOnce(&mut Vec<char>) -> bool) -> bool {
    let mut cache = self.write_cache();
    let prefixes = match set {
      PrefixSet::Chat => &mut cache.chat_prefixes,
      PrefixSet::Whisper => &mut cache.whisper_prefixes,
    };
    let changed = update(prefixes);
    if changed {
      cache.bump();
    }
    changed
  }

  fn ensure_connected(&self) -> Result<(), SendError> {
    match self.read_cache().state {
      ConnectionState::Disconnected | ConnectionState::Connecting => Err(SendError::NotConnected),
      _ => Ok(()),
    }
  }

  fn send_through(
    &self,
    kind: SendKind,
    throttle: Option<&Throttle>,
    text: &str,
    line: String,
    priority: Priority,
  ) -> Result<Sent, SendError> {
    if let Some(throttle) = throttle {
      if let Err(violation) = throttle.check(text) {
        debug!(?kind, %violation, "dropped outgoing line");
        self.subscriptions.publish(&Event::Throttled {
          kind,
          violation,
          line,
        });
        return Ok(Sent::Throttled(violation));
      }
    }
    self.transport.send_line(&line, priority)?;
    Ok(Sent::Queued)
  }

  fn disconnect(&self) {
    let was = {
      let mut cache = self.write_cache();
      let was = cache.state;
      if was != ConnectionState::Disconnected {
        cache.state = ConnectionState::Disconnected;
        cache.bump();
      }
      was
    };
    if was != ConnectionState::Disconnected {
      debug!(from = ?was, "disconnecting");
    }
    self.transport.disconnect();
  }

  fn on_connected(&self) {
    {
      let mut cache = self.write_cache();
      if cache.state != ConnectionState::Connecting {
        debug!(state = ?cache.state, "ignoring connected callback");
        return;
      }
      cache.state = ConnectionState::Authenticating;
      cache.bump();
    }

    let config = &self.config;
    trace!(
      "PASS ***; NICK {:?}; CAP REQ {:?}; JOIN #{}",
      config.credentials.nick,
      write::CAPABILITIES,
      config.room
    );
    for line in write::login_lines(&config.credentials, &config.room) {
      if let Err(e) = self.transport.send_line(&line, Priority::High) {
        warn!("failed to send login line: {e}");
        self.disconnect();
        return;
      }
    }

    {
      let mut cache = self.write_cache();
      if cache.state != ConnectionState::Authenticating {
        return;
      }
      cache.state = ConnectionState::JoinedAwaitingConfirmation;
      cache.bump();
    }

    if let Err(e) = self.transport.listen() {
      warn!("failed to start listening: {e}");
      self.disconnect();
    }
  }

  fn on_disconnected(&self, error: Option<&TransportError>) {
    let was = {
      let mut cache = self.write_cache();
      let was = cache.state;
      cache.state = ConnectionState::Disconnected;
      if was != ConnectionState::Disconnected {
        cache.bump();
      }
      was
    };
    if was == ConnectionState::Disconnected {
      return;
    }
    match error {
      Some(e) => warn!("connection lost: {e}"),
      None => debug!("connection closed"),
    }
    self.subscriptions.publish(&Event::Disconnected);
  }

  fn handle_line(&self, line: &str) {
    let _pipeline = self
      .pipeline
      .lock()
      .unwrap_or_else(|poisoned| poisoned.into_inner());

    if self.read_cache().state == ConnectionState::Disconnected {
      trace!(line, "ignoring line while disconnected");
      return;
    }

    self.subscriptions.publish_line(line);

    let outcomes = {
      let cache = self.read_cache();
      let ctx = DispatchContext {
        room: &self.config.room,
        username: &self.config.credentials.nick,
        chat_prefixes: &cache.chat_prefixes,
        whisper_prefixes: &cache.whisper_prefixes,
        auto_pong: self.config.auto_pong,
        mode: self.config.dispatch_mode,
        room_state: &cache.room_state,
        emotes: self
          .config
          .replace_emotes
          .then_some((self.config.emotes.as_ref(), self.config.emote_tier)),
        log_unclassified: self.config.log_unclassified,
      };
      self.dispatcher.dispatch(line, &ctx)
    };

    for outcome in outcomes {
      match outcome {
        Outcome::Emit(event) => {
          self.apply(&event);
          self.subscriptions.publish(&event);
        }
        Outcome::Reply(reply) => {
          if let Err(e) = self.transport.send_line(&reply, Priority::High) {
            warn!("failed to send reply: {e}");
          }
        }
        Outcome::Disconnect => {
          warn!(nick = %self.config.credentials.nick, "login rejected");
          self.disconnect();
        }
      }
    }
  }

  /// Update the cache for an event, before it is delivered.
  fn apply(&self, event: &Event) {
    let mut cache = self.write_cache();
    match event {
      Event::Connected => {
        if cache.state == ConnectionState::Disconnected {
          return;
        }
        debug!("login confirmed");
        cache.state = ConnectionState::Listening;
      }
      Event::Message(message) | Event::ChatCommand { message, .. } => {
        cache.last_message = Some(message.clone());
      }
      Event::WhisperReceived(whisper) => cache.last_whisper = Some(whisper.clone()),
      Event::RoomStateChanged(state) => cache.room_state = state.clone(),
      Event::UserStateChanged(state) => cache.user_state = Some(state.clone()),
      _ => return,
    }
    cache.bump();
  }
}

/// A handle to a [`Session`] which does not keep it alive.
#[derive(Clone)]
pub struct WeakSession(Weak<Shared>);

impl WeakSession {
  /// Returns `None` once every [`Session`] handle was dropped.
  pub fn upgrade(&self) -> Option<Session> {
    self.0.upgrade().map(|shared| Session { shared })
  }
}

/// Forwards transport callbacks to a session without keeping it alive.
struct EventsHandle(Weak<Shared>);

impl TransportEvents for EventsHandle {
  fn on_connected(&self) {
    if let Some(shared) = self.0.upgrade() {
      shared.on_connected();
    }
  }

  fn on_line(&self, line: &str) {
    if let Some(shared) = self.0.upgrade() {
      shared.handle_line(line);
    }
  }

  fn on_disconnected(&self, error: Option<&TransportError>) {
    if let Some(shared) = self.0.upgrade() {
      shared.on_disconnected(error);
    }
  }
}

static_assert_send!(Session);
static_assert_sync!(Session);
static_assert_send!(WeakSession);
static_assert_sync!(WeakSession);

#[cfg(test)]
mod tests {
  use super::*;

  #[derive(Default)]
  struct NullTransport;

  impl Transport for NullTransport {
    fn connect(&self, _: &str, _: u16, _: Arc<dyn TransportEvents>) -> Result<(), TransportError> {
      Ok(())
    }
    fn disconnect(&self) {}
    fn send_line(&self, _: &str, _: Priority) -> Result<(), TransportError> {
      Ok(())
    }
    fn listen(&self) -> Result<(), TransportError> {
      Ok(())
    }
  }

  #[test]
  fn anon_credentials() {
    let credentials = Credentials::anon();
    assert!(credentials.is_anon());
    assert!(!Credentials::new("bot", "oauth:x").is_anon());
    assert!(!format!("{credentials:?}").contains("just_a_lil_guy"));
  }

  #[test]
  fn builder_normalizes_room() {
    let session = Session::builder()
      .room("#PajLada ")
      .build(Arc::new(NullTransport));
    assert_eq!(session.room(), "pajlada");
    assert_eq!(session.room_state().room, "pajlada");
    assert_eq!(session.state(), ConnectionState::Disconnected);
  }

  #[test]
  fn defaults() {
    let config = Config::default();
    assert_eq!(config.host, HOST);
    assert_eq!(config.port, PORT);
    assert!(config.auto_pong);
    assert!(!config.throttle_raw);
    assert_eq!(config.chat_throttle, Some(ThrottleConfig::chat()));
    assert_eq!(config.whisper_throttle, Some(ThrottleConfig::whisper()));
    assert_eq!(config.chat_prefixes, ['!']);
  }

  #[test]
  fn prefixes() {
    let session = Session::builder().room("a").build(Arc::new(NullTransport));
    let version = session.snapshot().version;
    assert!(session.add_chat_prefix('?'));
    assert!(!session.add_chat_prefix('?'));
    assert_eq!(session.chat_prefixes(), ['!', '?']);
    assert!(session.remove_chat_prefix('!'));
    assert!(!session.remove_chat_prefix('!'));
    assert!(session.add_whisper_prefix('$'));
    assert_eq!(session.whisper_prefixes(), ['!', '$']);
    assert_eq!(session.snapshot().version, version + 3);
  }

  #[test]
  fn sends_require_connection() {
    let session = Session::builder().room("a").build(Arc::new(NullTransport));
    assert!(matches!(session.send_message("hi"), Err(SendError::NotConnected)));
    assert!(matches!(session.send_whisper("b", "hi"), Err(SendError::NotConnected)));
    assert!(matches!(session.send_raw("PING"), Err(SendError::NotConnected)));
  }

  #[test]
  fn weak_handle_does_not_keep_session_alive() {
    let session = Session::builder().room("a").build(Arc::new(NullTransport));
    let weak = session.downgrade();
    session.subscribe(EventKind::Connected, {
      let weak = weak.clone();
      move |_| drop(weak.upgrade())
    });
    assert_eq!(weak.upgrade().map(|s| s.room().to_owned()).as_deref(), Some("a"));
    drop(session);
    assert!(weak.upgrade().is_none());
  }

  #[test]
  fn lines_are_ignored_while_disconnected() {
    let session = Session::builder().room("a").build(Arc::new(NullTransport));
    session.handle_line(":tmi.twitch.tv 001 bot :Welcome, GLHF!");
    assert_eq!(session.state(), ConnectionState::Disconnected);
  }
}
