//! ## Line classification
//!
//! Every incoming line is matched against an ordered table of rules.
//! Each rule is a predicate plus a handler. The first rule whose
//! predicate matches runs its handler, and the handler's [`Flow`]
//! decides whether evaluation continues with the next rules.
//!
//! Only the chat command rule continues (unless [`DispatchMode::Single`]
//! is selected), so a command line yields a [`Event::ChatCommand`]
//! followed by a [`Event::Message`].
//!
//! Whisper lines are matched against a separate table, in which
//! [`Event::WhisperReceived`] always continues to the whisper command rule.
//!
//! The [`Dispatcher`] itself is pure: it reads the line and the
//! [`DispatchContext`], and returns the [`Outcome`]s for the session to apply.

use crate::command::{command_prefix, CommandInvocation};
use crate::emotes::{EmoteCollection, EmoteTier};
use crate::irc::{is_whisper_line, Command, IrcMessageRef, Tag};
use crate::msg::{
  is_login_failure_text, ChatMessage, FromIrc, HostTarget, Membership, MembershipKind,
  ModeratorChange, Names, Notice, ResubscriptionNotice, RoomState, RoomStateUpdate,
  SubscriptionNotice, UserState, WhisperMessage,
};
use crate::throttle::Violation;

/// Reply sent for every server `PING`.
pub const PONG: &str = "PONG :tmi.twitch.tv";

/// A classified line, or a session notification.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
  /// The server accepted the login (`001`).
  Connected,

  /// A user subscribed for the first time.
  NewSubscriber(SubscriptionNotice),

  /// A chat message starting with a registered chat prefix.
  ChatCommand {
    command: CommandInvocation,
    message: ChatMessage,
  },

  /// A chat message in the session's room.
  Message(ChatMessage),

  ViewerJoined(Membership),
  ViewerLeft(Membership),
  ModeratorJoined(ModeratorChange),
  ModeratorLeft(ModeratorChange),

  /// The server rejected the credentials. The session is disconnected.
  LoginError {
    /// Login which was attempted.
    username: String,
    /// Diagnostic text sent by the server.
    message: String,
  },

  /// The room stopped being hosted.
  HostLeft,

  /// The room settings changed. This carries the merged state,
  /// not just the changed fields.
  RoomStateChanged(RoomState),

  /// The session user's state in the room changed.
  UserStateChanged(UserState),

  /// A user renewed their subscription.
  ReSubscriber(ResubscriptionNotice),

  HostingStopped {
    hosting_room: String,
    viewers: u64,
  },

  HostingStarted {
    hosting_room: String,
    target_room: String,
    viewers: u64,
  },

  /// Users which were in the room when it was joined.
  ExistingUsers(Names),

  WhisperReceived(WhisperMessage),

  /// A whisper starting with a registered whisper prefix.
  WhisperCommand {
    command: CommandInvocation,
    whisper: WhisperMessage,
  },

  /// An outgoing line was dropped by a throttle.
  Throttled {
    kind: SendKind,
    violation: Violation,
    line: String,
  },

  /// The transport reported that the connection was lost.
  Disconnected,
}

/// The kind of an [`Event`], used to subscribe to it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EventKind {
  Connected,
  NewSubscriber,
  ChatCommand,
  Message,
  ViewerJoined,
  ViewerLeft,
  ModeratorJoined,
  ModeratorLeft,
  LoginError,
  HostLeft,
  RoomStateChanged,
  UserStateChanged,
  ReSubscriber,
  HostingStopped,
  HostingStarted,
  ExistingUsers,
  WhisperReceived,
  WhisperCommand,
  Throttled,
  Disconnected,
}

impl Event {
  pub fn kind(&self) -> EventKind {
    match self {
      Event::Connected => EventKind::Connected,
      Event::NewSubscriber(_) => EventKind::NewSubscriber,
      Event::ChatCommand { .. } => EventKind::ChatCommand,
      Event::Message(_) => EventKind::Message,
      Event::ViewerJoined(_) => EventKind::ViewerJoined,
      Event::ViewerLeft(_) => EventKind::ViewerLeft,
      Event::ModeratorJoined(_) => EventKind::ModeratorJoined,
      Event::ModeratorLeft(_) => EventKind::ModeratorLeft,
      Event::LoginError { .. } => EventKind::LoginError,
      Event::HostLeft => EventKind::HostLeft,
      Event::RoomStateChanged(_) => EventKind::RoomStateChanged,
      Event::UserStateChanged(_) => EventKind::UserStateChanged,
      Event::ReSubscriber(_) => EventKind::ReSubscriber,
      Event::HostingStopped { .. } => EventKind::HostingStopped,
      Event::HostingStarted { .. } => EventKind::HostingStarted,
      Event::ExistingUsers(_) => EventKind::ExistingUsers,
      Event::WhisperReceived(_) => EventKind::WhisperReceived,
      Event::WhisperCommand { .. } => EventKind::WhisperCommand,
      Event::Throttled { .. } => EventKind::Throttled,
      Event::Disconnected => EventKind::Disconnected,
    }
  }
}

/// Which outgoing path a line was sent through.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SendKind {
  Chat,
  Whisper,
  Raw,
}

/// Whether a chat command line is also delivered as a chat message.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DispatchMode {
  /// Command lines yield [`Event::ChatCommand`] and then [`Event::Message`].
  #[default]
  Double,

  /// Command lines yield only [`Event::ChatCommand`].
  Single,
}

/// Session state the rules need to classify a line.
#[derive(Clone, Copy, Debug)]
pub struct DispatchContext<'a> {
  /// Room the session has joined, without the `#`.
  pub room: &'a str,

  /// Login of the session user.
  pub username: &'a str,

  pub chat_prefixes: &'a [char],
  pub whisper_prefixes: &'a [char],

  /// Reply to `PING` with [`PONG`].
  pub auto_pong: bool,

  pub mode: DispatchMode,

  /// Last known room settings, which room state updates are overlaid on.
  pub room_state: &'a RoomState,

  /// Set when chat message emotes should be replaced.
  pub emotes: Option<(&'a EmoteCollection, EmoteTier)>,

  /// Log lines which match no rule.
  pub log_unclassified: bool,
}

/// What the session should do in response to a line.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
  /// Deliver an event to subscribers.
  Emit(Event),

  /// Send a line at high priority.
  Reply(String),

  /// Disconnect the transport.
  Disconnect,
}

/// Returned by a rule handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
  /// Keep evaluating the rules after this one.
  Continue,

  /// Stop evaluating rules for this line.
  Stop,
}

type Predicate = fn(&IrcMessageRef<'_>, &DispatchContext<'_>) -> bool;
type Handler = fn(&IrcMessageRef<'_>, &DispatchContext<'_>, &mut Vec<Outcome>) -> Flow;

/// A single entry of the classification table.
#[derive(Clone, Copy)]
pub struct Rule {
  name: &'static str,
  matches: Predicate,
  handle: Handler,
}

impl Rule {
  const fn new(name: &'static str, matches: Predicate, handle: Handler) -> Self {
    Self {
      name,
      matches,
      handle,
    }
  }

  pub fn name(&self) -> &'static str {
    self.name
  }
}

impl std::fmt::Debug for Rule {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_tuple("Rule").field(&self.name).finish()
  }
}

const RULES: &[Rule] = &[
  Rule::new("welcome", is_welcome, on_welcome),
  Rule::new("subscription", is_subscription, on_subscription),
  Rule::new("chat_command", is_chat_command, on_chat_command),
  Rule::new("chat_message", is_chat_message, on_chat_message),
  Rule::new("join", is_join, on_membership),
  Rule::new("part", is_part, on_membership),
  Rule::new("moderator_granted", is_moderator_granted, on_moderator_change),
  Rule::new("moderator_revoked", is_moderator_revoked, on_moderator_change),
  Rule::new("login_failure", is_login_failure, on_login_failure),
  Rule::new("host_off", is_host_off, on_host_off),
  Rule::new("room_state", is_room_state, on_room_state),
  Rule::new("user_state", is_user_state, on_user_state),
  Rule::new("resubscription", is_resubscription, on_resubscription),
  Rule::new("ping", is_ping, on_ping),
  Rule::new("hosting_stopped", is_hosting_stopped, on_host_target),
  Rule::new("hosting_started", is_hosting_started, on_host_target),
  Rule::new("names", is_names, on_names),
];

const WHISPER_RULES: &[Rule] = &[
  Rule::new("whisper", is_whisper, on_whisper),
  Rule::new("whisper_command", is_whisper_command, on_whisper_command),
];

/// Classifies lines into [`Outcome`]s.
#[derive(Clone, Debug)]
pub struct Dispatcher {
  rules: &'static [Rule],
  whisper_rules: &'static [Rule],
}

impl Default for Dispatcher {
  fn default() -> Self {
    Self::new()
  }
}

impl Dispatcher {
  pub fn new() -> Self {
    Self {
      rules: RULES,
      whisper_rules: WHISPER_RULES,
    }
  }

  /// The rules for non-whisper lines, in evaluation order.
  pub fn rules(&self) -> &[Rule] {
    self.rules
  }

  /// The rules for whisper lines, in evaluation order.
  pub fn whisper_rules(&self) -> &[Rule] {
    self.whisper_rules
  }

  /// Classify `line`.
  ///
  /// Never fails: a line which matches no rule, or which matches a rule
  /// but cannot be built into its message type, yields no outcomes.
  pub fn dispatch(&self, line: &str, ctx: &DispatchContext<'_>) -> Vec<Outcome> {
    let mut out = Vec::new();
    let Some(message) = IrcMessageRef::parse(line) else {
      if ctx.log_unclassified {
        trace!(line, "unparseable line");
      }
      return out;
    };

    let rules = match is_whisper_line(line) {
      true => self.whisper_rules,
      false => self.rules,
    };

    let mut matched = false;
    for rule in rules {
      if !(rule.matches)(&message, ctx) {
        continue;
      }
      matched = true;
      trace!(rule = rule.name, "matched");
      if (rule.handle)(&message, ctx, &mut out) == Flow::Stop {
        break;
      }
    }

    if !matched && ctx.log_unclassified {
      trace!(line, "unclassified line");
    }
    out
  }
}

/// Build `T`, logging lines which matched a rule but could not be built.
fn build<T: FromIrc>(message: &IrcMessageRef<'_>) -> Option<T> {
  match T::from_irc(message) {
    Ok(value) => Some(value),
    Err(e) => {
      debug!(line = message.raw(), "{e}");
      None
    }
  }
}

fn chat_message(message: &IrcMessageRef<'_>, ctx: &DispatchContext<'_>) -> Option<ChatMessage> {
  let chat: ChatMessage = build(message)?;
  Some(match ctx.emotes {
    Some((emotes, tier)) => chat.with_emotes_replaced(emotes, tier),
    None => chat,
  })
}

fn msg_id_is(message: &IrcMessageRef<'_>, id: &str) -> bool {
  message.tag(Tag::MsgId) == Some(id)
}

fn mode_flag<'src>(message: &IrcMessageRef<'src>) -> Option<&'src str> {
  message.params()?.split_whitespace().next()
}

fn host_target_is_stop(message: &IrcMessageRef<'_>) -> bool {
  message
    .text()
    .and_then(|text| text.split_whitespace().next())
    == Some("-")
}

// predicates, in table order

fn is_welcome(message: &IrcMessageRef<'_>, _: &DispatchContext<'_>) -> bool {
  message.command() == Command::RplWelcome
}

fn is_subscription(message: &IrcMessageRef<'_>, ctx: &DispatchContext<'_>) -> bool {
  message.command() == Command::UserNotice
    && message.is_in_room(ctx.room)
    && msg_id_is(message, "sub")
}

fn is_chat_message(message: &IrcMessageRef<'_>, ctx: &DispatchContext<'_>) -> bool {
  message.command() == Command::Privmsg && message.is_in_room(ctx.room)
}

fn is_chat_command(message: &IrcMessageRef<'_>, ctx: &DispatchContext<'_>) -> bool {
  is_chat_message(message, ctx)
    && message
      .text()
      .and_then(|text| command_prefix(text, ctx.chat_prefixes))
      .is_some()
}

fn is_join(message: &IrcMessageRef<'_>, ctx: &DispatchContext<'_>) -> bool {
  message.command() == Command::Join && message.is_in_room(ctx.room)
}

fn is_part(message: &IrcMessageRef<'_>, ctx: &DispatchContext<'_>) -> bool {
  message.command() == Command::Part && message.is_in_room(ctx.room)
}

fn is_moderator_granted(message: &IrcMessageRef<'_>, ctx: &DispatchContext<'_>) -> bool {
  message.command() == Command::Mode
    && message.is_in_room(ctx.room)
    && mode_flag(message) == Some("+o")
}

fn is_moderator_revoked(message: &IrcMessageRef<'_>, ctx: &DispatchContext<'_>) -> bool {
  message.command() == Command::Mode
    && message.is_in_room(ctx.room)
    && mode_flag(message) == Some("-o")
}

fn is_login_failure(message: &IrcMessageRef<'_>, _: &DispatchContext<'_>) -> bool {
  message.command() == Command::Notice
    && message.text().is_some_and(is_login_failure_text)
}

fn is_host_off(message: &IrcMessageRef<'_>, _: &DispatchContext<'_>) -> bool {
  message.command() == Command::Notice && msg_id_is(message, "host_off")
}

fn is_room_state(message: &IrcMessageRef<'_>, ctx: &DispatchContext<'_>) -> bool {
  message.command() == Command::RoomState && message.is_in_room(ctx.room)
}

fn is_user_state(message: &IrcMessageRef<'_>, ctx: &DispatchContext<'_>) -> bool {
  message.command() == Command::UserState && message.is_in_room(ctx.room)
}

fn is_resubscription(message: &IrcMessageRef<'_>, ctx: &DispatchContext<'_>) -> bool {
  message.command() == Command::UserNotice
    && message.is_in_room(ctx.room)
    && msg_id_is(message, "resub")
}

fn is_ping(message: &IrcMessageRef<'_>, _: &DispatchContext<'_>) -> bool {
  message.command() == Command::Ping
}

fn is_hosting_stopped(message: &IrcMessageRef<'_>, _: &DispatchContext<'_>) -> bool {
  message.command() == Command::HostTarget && host_target_is_stop(message)
}

fn is_hosting_started(message: &IrcMessageRef<'_>, _: &DispatchContext<'_>) -> bool {
  message.command() == Command::HostTarget && !host_target_is_stop(message)
}

fn is_names(message: &IrcMessageRef<'_>, _: &DispatchContext<'_>) -> bool {
  message.command() == Command::RplNames
}

fn is_whisper(message: &IrcMessageRef<'_>, _: &DispatchContext<'_>) -> bool {
  message.command() == Command::Whisper
}

fn is_whisper_command(message: &IrcMessageRef<'_>, ctx: &DispatchContext<'_>) -> bool {
  is_whisper(message, ctx)
    && message
      .params()
      .and_then(|params| params.split_once(" :"))
      .and_then(|(_, text)| command_prefix(text, ctx.whisper_prefixes))
      .is_some()
}

// handlers

fn on_welcome(_: &IrcMessageRef<'_>, _: &DispatchContext<'_>, out: &mut Vec<Outcome>) -> Flow {
  out.push(Outcome::Emit(Event::Connected));
  Flow::Stop
}

fn on_subscription(
  message: &IrcMessageRef<'_>,
  _: &DispatchContext<'_>,
  out: &mut Vec<Outcome>,
) -> Flow {
  if let Some(sub) = build(message) {
    out.push(Outcome::Emit(Event::NewSubscriber(sub)));
  }
  Flow::Stop
}

fn on_chat_command(
  message: &IrcMessageRef<'_>,
  ctx: &DispatchContext<'_>,
  out: &mut Vec<Outcome>,
) -> Flow {
  let command = chat_message(message, ctx).and_then(|chat| {
    CommandInvocation::parse(chat.text(), ctx.chat_prefixes).map(|command| (command, chat))
  });
  if let Some((command, message)) = command {
    out.push(Outcome::Emit(Event::ChatCommand { command, message }));
  }
  match ctx.mode {
    DispatchMode::Double => Flow::Continue,
    DispatchMode::Single => Flow::Stop,
  }
}

fn on_chat_message(
  message: &IrcMessageRef<'_>,
  ctx: &DispatchContext<'_>,
  out: &mut Vec<Outcome>,
) -> Flow {
  if let Some(chat) = chat_message(message, ctx) {
    out.push(Outcome::Emit(Event::Message(chat)));
  }
  Flow::Stop
}

fn on_membership(
  message: &IrcMessageRef<'_>,
  _: &DispatchContext<'_>,
  out: &mut Vec<Outcome>,
) -> Flow {
  if let Some(membership) = build::<Membership>(message) {
    out.push(Outcome::Emit(match membership.kind() {
      MembershipKind::Join => Event::ViewerJoined(membership),
      MembershipKind::Part => Event::ViewerLeft(membership),
    }));
  }
  Flow::Stop
}

fn on_moderator_change(
  message: &IrcMessageRef<'_>,
  _: &DispatchContext<'_>,
  out: &mut Vec<Outcome>,
) -> Flow {
  if let Some(change) = build::<ModeratorChange>(message) {
    out.push(Outcome::Emit(match change.granted() {
      true => Event::ModeratorJoined(change),
      false => Event::ModeratorLeft(change),
    }));
  }
  Flow::Stop
}

fn on_login_failure(
  message: &IrcMessageRef<'_>,
  ctx: &DispatchContext<'_>,
  out: &mut Vec<Outcome>,
) -> Flow {
  let text = build::<Notice>(message)
    .map(|notice| notice.text().to_owned())
    .unwrap_or_default();
  out.push(Outcome::Disconnect);
  out.push(Outcome::Emit(Event::LoginError {
    username: ctx.username.to_owned(),
    message: text,
  }));
  Flow::Stop
}

fn on_host_off(_: &IrcMessageRef<'_>, _: &DispatchContext<'_>, out: &mut Vec<Outcome>) -> Flow {
  out.push(Outcome::Emit(Event::HostLeft));
  Flow::Stop
}

fn on_room_state(
  message: &IrcMessageRef<'_>,
  ctx: &DispatchContext<'_>,
  out: &mut Vec<Outcome>,
) -> Flow {
  if let Some(update) = build::<RoomStateUpdate>(message) {
    out.push(Outcome::Emit(Event::RoomStateChanged(
      ctx.room_state.overlay(&update),
    )));
  }
  Flow::Stop
}

fn on_user_state(
  message: &IrcMessageRef<'_>,
  _: &DispatchContext<'_>,
  out: &mut Vec<Outcome>,
) -> Flow {
  if let Some(state) = build(message) {
    out.push(Outcome::Emit(Event::UserStateChanged(state)));
  }
  Flow::Stop
}

fn on_resubscription(
  message: &IrcMessageRef<'_>,
  _: &DispatchContext<'_>,
  out: &mut Vec<Outcome>,
) -> Flow {
  if let Some(resub) = build(message) {
    out.push(Outcome::Emit(Event::ReSubscriber(resub)));
  }
  Flow::Stop
}

fn on_ping(_: &IrcMessageRef<'_>, ctx: &DispatchContext<'_>, out: &mut Vec<Outcome>) -> Flow {
  if ctx.auto_pong {
    out.push(Outcome::Reply(PONG.to_owned()));
  }
  Flow::Stop
}

fn on_host_target(
  message: &IrcMessageRef<'_>,
  _: &DispatchContext<'_>,
  out: &mut Vec<Outcome>,
) -> Flow {
  let event = match build::<HostTarget>(message) {
    Some(HostTarget::Stopped {
      hosting_room,
      viewers,
    }) => Event::HostingStopped {
      hosting_room,
      viewers,
    },
    Some(HostTarget::Started {
      hosting_room,
      target_room,
      viewers,
    }) => Event::HostingStarted {
      hosting_room,
      target_room,
      viewers,
    },
    None => return Flow::Stop,
  };
  out.push(Outcome::Emit(event));
  Flow::Stop
}

fn on_names(message: &IrcMessageRef<'_>, _: &DispatchContext<'_>, out: &mut Vec<Outcome>) -> Flow {
  if let Some(names) = build(message) {
    out.push(Outcome::Emit(Event::ExistingUsers(names)));
  }
  Flow::Stop
}

fn on_whisper(
  message: &IrcMessageRef<'_>,
  _: &DispatchContext<'_>,
  out: &mut Vec<Outcome>,
) -> Flow {
  if let Some(whisper) = build(message) {
    out.push(Outcome::Emit(Event::WhisperReceived(whisper)));
  }
  Flow::Continue
}

fn on_whisper_command(
  message: &IrcMessageRef<'_>,
  ctx: &DispatchContext<'_>,
  out: &mut Vec<Outcome>,
) -> Flow {
  let command = build::<WhisperMessage>(message).and_then(|whisper| {
    CommandInvocation::parse(whisper.text(), ctx.whisper_prefixes)
      .map(|command| (command, whisper))
  });
  if let Some((command, whisper)) = command {
    out.push(Outcome::Emit(Event::WhisperCommand { command, whisper }));
  }
  Flow::Stop
}

static_assert_send!(Dispatcher);
static_assert_sync!(Dispatcher);
static_assert_send!(Event);
