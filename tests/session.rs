use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tmi_session::{
  ConnectionState, Event, EventKind, Priority, SendKind, Sent, Session, SessionBuilder,
  ThrottleConfig, Transport, TransportError, TransportEvents, Violation,
};

/// Records sent lines and lets the test drive the connection.
#[derive(Default)]
struct MockTransport {
  sent: Mutex<Vec<(String, Priority)>>,
  events: Mutex<Option<Arc<dyn TransportEvents>>>,
  connects: AtomicUsize,
  disconnects: AtomicUsize,
  listens: AtomicUsize,
}

impl MockTransport {
  fn events(&self) -> Arc<dyn TransportEvents> {
    self
      .events
      .lock()
      .unwrap()
      .clone()
      .expect("connect was not called")
  }

  fn open(&self) {
    self.events().on_connected();
  }

  fn receive(&self, line: &str) {
    self.events().on_line(line);
  }

  fn lose_connection(&self) {
    self.events().on_disconnected(Some(&TransportError::Closed));
  }

  fn sent(&self) -> Vec<(String, Priority)> {
    self.sent.lock().unwrap().clone()
  }

  fn lines(&self) -> Vec<String> {
    self.sent().into_iter().map(|(line, _)| line).collect()
  }

  fn clear(&self) {
    self.sent.lock().unwrap().clear();
  }
}

impl Transport for MockTransport {
  fn connect(
    &self,
    _: &str,
    _: u16,
    events: Arc<dyn TransportEvents>,
  ) -> Result<(), TransportError> {
    self.connects.fetch_add(1, Ordering::SeqCst);
    *self.events.lock().unwrap() = Some(events);
    Ok(())
  }

  fn disconnect(&self) {
    self.disconnects.fetch_add(1, Ordering::SeqCst);
  }

  fn send_line(&self, line: &str, priority: Priority) -> Result<(), TransportError> {
    self.sent.lock().unwrap().push((line.to_owned(), priority));
    Ok(())
  }

  fn listen(&self) -> Result<(), TransportError> {
    self.listens.fetch_add(1, Ordering::SeqCst);
    Ok(())
  }
}

const WELCOME: &str = ":tmi.twitch.tv 001 bot :Welcome, GLHF!";
const PRIVMSG: &str = "@badge-info=;badges=;color=#0000FF;display-name=JuN1oRRRR;emotes=;flags=;id=e9d998c3;mod=0;room-id=11148817;subscriber=0;tmi-sent-ts=1594545155039;turbo=0;user-id=29803735;user-type= :jun1orrrr!jun1orrrr@jun1orrrr.tmi.twitch.tv PRIVMSG #pajlada :";
const WHISPER: &str = "@badges=;color=;display-name=A;emotes=;message-id=1;thread-id=1_2;turbo=0;user-id=1;user-type= :a!a@a.tmi.twitch.tv WHISPER bot :";

fn privmsg(text: &str) -> String {
  format!("{PRIVMSG}{text}")
}

fn whisper(text: &str) -> String {
  format!("{WHISPER}{text}")
}

fn builder() -> SessionBuilder {
  Session::builder()
    .credentials(tmi_session::Credentials::new("bot", "oauth:secret"))
    .room("#pajlada")
}

fn setup(builder: SessionBuilder) -> (Session, Arc<MockTransport>) {
  let transport = Arc::new(MockTransport::default());
  let session = builder.build(transport.clone());
  (session, transport)
}

/// Connect and confirm the login, then forget the login lines.
fn listening(builder: SessionBuilder) -> (Session, Arc<MockTransport>) {
  let (session, transport) = setup(builder);
  session.connect().unwrap();
  transport.open();
  transport.receive(WELCOME);
  transport.clear();
  (session, transport)
}

fn record(session: &Session, kinds: &[EventKind]) -> Arc<Mutex<Vec<Event>>> {
  let events = Arc::new(Mutex::new(Vec::new()));
  for kind in kinds {
    let events = events.clone();
    session.subscribe(*kind, move |event| events.lock().unwrap().push(event.clone()));
  }
  events
}

fn kinds(events: &Mutex<Vec<Event>>) -> Vec<EventKind> {
  events.lock().unwrap().iter().map(Event::kind).collect()
}

#[test]
fn login_handshake() {
  let (session, transport) = setup(builder());
  let events = record(&session, &[EventKind::Connected]);

  session.connect().unwrap();
  assert_eq!(session.state(), ConnectionState::Connecting);
  assert!(transport.sent().is_empty());

  transport.open();
  assert_eq!(session.state(), ConnectionState::JoinedAwaitingConfirmation);
  assert_eq!(transport.listens.load(Ordering::SeqCst), 1);
  assert_eq!(
    transport.lines(),
    [
      "PASS oauth:secret",
      "NICK bot",
      "USER bot 8 * :bot",
      "CAP REQ twitch.tv/membership",
      "CAP REQ twitch.tv/commands",
      "CAP REQ twitch.tv/tags",
      "JOIN #pajlada",
    ]
  );
  assert!(transport
    .sent()
    .iter()
    .all(|(_, priority)| *priority == Priority::High));

  transport.receive(WELCOME);
  assert_eq!(session.state(), ConnectionState::Listening);
  assert_eq!(kinds(&events), [EventKind::Connected]);
}

#[test]
fn connect_twice_is_ignored() {
  let (session, transport) = setup(builder());
  session.connect().unwrap();
  session.connect().unwrap();
  assert_eq!(transport.connects.load(Ordering::SeqCst), 1);
}

#[test]
fn login_failure() {
  let (session, transport) = setup(builder());
  let events = record(
    &session,
    &[
      EventKind::LoginError,
      EventKind::Disconnected,
      EventKind::Message,
    ],
  );
  session.connect().unwrap();
  transport.open();

  transport.receive(":tmi.twitch.tv NOTICE * :Login authentication failed");
  assert_eq!(session.state(), ConnectionState::Disconnected);
  assert_eq!(transport.disconnects.load(Ordering::SeqCst), 1);

  transport.receive(&privmsg("too late"));
  transport.lose_connection();

  assert_eq!(
    *events.lock().unwrap(),
    [Event::LoginError {
      username: "bot".into(),
      message: "Login authentication failed".into(),
    }]
  );
}

#[test]
fn lost_connection_is_reported_once() {
  let (session, transport) = listening(builder());
  let events = record(&session, &[EventKind::Disconnected]);

  transport.lose_connection();
  transport.lose_connection();

  assert_eq!(session.state(), ConnectionState::Disconnected);
  assert_eq!(kinds(&events), [EventKind::Disconnected]);
}

#[test]
fn requested_disconnect_is_not_reported() {
  let (session, transport) = listening(builder());
  let events = record(&session, &[EventKind::Disconnected]);

  session.disconnect();
  transport.lose_connection();

  assert!(events.lock().unwrap().is_empty());
  assert!(matches!(
    session.send_message("hi"),
    Err(tmi_session::SendError::NotConnected)
  ));
}

#[test]
fn disconnect_from_handler() {
  let (session, transport) = listening(builder());
  let events = record(&session, &[EventKind::Message]);
  let handle = session.clone();
  session.subscribe(EventKind::Message, move |_| handle.disconnect());

  transport.receive(&privmsg("first"));
  transport.receive(&privmsg("second"));

  assert_eq!(session.state(), ConnectionState::Disconnected);
  assert_eq!(events.lock().unwrap().len(), 1);
  assert_eq!(session.last_message().unwrap().text(), "first");
}

#[test]
fn command_is_delivered_before_message() {
  let (session, transport) = listening(builder());
  let events = record(&session, &[EventKind::ChatCommand, EventKind::Message]);

  transport.receive(&privmsg("!give bob 5"));

  let events = events.lock().unwrap();
  assert_eq!(events.len(), 2);
  match &events[0] {
    Event::ChatCommand { command, message } => {
      assert_eq!(command.command(), "give");
      assert_eq!(command.args(), ["bob", "5"]);
      assert_eq!(message.text(), "!give bob 5");
    }
    other => panic!("expected chat command, got {other:?}"),
  }
  assert!(matches!(&events[1], Event::Message(m) if m.text() == "!give bob 5"));
}

#[test]
fn single_dispatch() {
  let (session, transport) = listening(builder().dispatch_mode(tmi_session::DispatchMode::Single));
  let events = record(&session, &[EventKind::ChatCommand, EventKind::Message]);

  transport.receive(&privmsg("!give bob 5"));
  transport.receive(&privmsg("hello"));

  assert_eq!(
    kinds(&events),
    [EventKind::ChatCommand, EventKind::Message]
  );
}

#[test]
fn prefixes_can_change_while_listening() {
  let (session, transport) = listening(builder());
  let events = record(&session, &[EventKind::ChatCommand]);

  transport.receive(&privmsg("?help"));
  assert!(session.add_chat_prefix('?'));
  transport.receive(&privmsg("?help"));

  assert_eq!(kinds(&events), [EventKind::ChatCommand]);
}

#[test]
fn room_state_is_merged() {
  let (session, transport) = listening(builder());
  let events = record(&session, &[EventKind::RoomStateChanged]);

  transport.receive("@emote-only=0;followers-only=-1;r9k=0;room-id=11148817;slow=0;subs-only=1 :tmi.twitch.tv ROOMSTATE #pajlada");
  transport.receive("@room-id=11148817;slow=5 :tmi.twitch.tv ROOMSTATE #pajlada");

  let state = session.room_state();
  assert!(state.subscriber_only);
  assert_eq!(state.slow, 5);
  assert_eq!(state.room, "pajlada");

  let events = events.lock().unwrap();
  assert_eq!(events.len(), 2);
  assert_eq!(events[1], Event::RoomStateChanged(state));
}

#[test]
fn other_rooms_are_ignored() {
  let (session, transport) = listening(builder());
  let events = record(&session, &[EventKind::Message]);

  transport.receive(&privmsg("hi").replace("#pajlada", "#forsen"));

  assert!(events.lock().unwrap().is_empty());
  assert!(session.last_message().is_none());
}

#[test]
fn caches() {
  let (session, transport) = listening(builder());
  let version = session.snapshot().version;

  transport.receive(&privmsg("hello"));
  transport.receive(&whisper("psst"));
  transport.receive("@badges=;color=;display-name=bot;emote-sets=0;mod=1;subscriber=0;user-type=mod :tmi.twitch.tv USERSTATE #pajlada");

  let snapshot = session.snapshot();
  assert_eq!(snapshot.last_message.unwrap().text(), "hello");
  assert_eq!(snapshot.last_whisper.unwrap().text(), "psst");
  assert!(snapshot.user_state.unwrap().is_moderator());
  assert_eq!(snapshot.version, version + 3);
}

#[test]
fn whisper_command() {
  let (session, transport) = listening(builder());
  let events = record(
    &session,
    &[EventKind::WhisperReceived, EventKind::WhisperCommand],
  );

  transport.receive(&whisper("!status now"));

  assert_eq!(
    kinds(&events),
    [EventKind::WhisperReceived, EventKind::WhisperCommand]
  );
}

#[test]
fn ping_is_answered_first() {
  let (_session, transport) = listening(builder());
  transport.receive("PING :tmi.twitch.tv");
  assert_eq!(
    transport.sent(),
    [("PONG :tmi.twitch.tv".to_owned(), Priority::High)]
  );

  let (_session, transport) = listening(builder().auto_pong(false));
  transport.receive("PING :tmi.twitch.tv");
  assert!(transport.sent().is_empty());
}

#[test]
fn raw_lines_are_observed_before_events() {
  let (session, transport) = listening(builder());
  let order = Arc::new(Mutex::new(Vec::new()));
  {
    let order = order.clone();
    session.on_raw_line(move |line| order.lock().unwrap().push(format!("raw {line}")));
  }
  {
    let order = order.clone();
    session.subscribe(EventKind::Message, move |event| {
      if let Event::Message(message) = event {
        order.lock().unwrap().push(format!("message {}", message.text()));
      }
    });
  }

  let line = privmsg("hi");
  transport.receive(&line);

  assert_eq!(
    *order.lock().unwrap(),
    [format!("raw {line}"), "message hi".to_owned()]
  );
}

#[test]
fn outgoing_lines() {
  let (session, transport) = listening(builder());

  assert_eq!(session.send_message("hello").unwrap(), Sent::Queued);
  assert_eq!(session.send_message("hello").unwrap(), Sent::Queued);
  session.send_action("waves").unwrap();
  session
    .send_command(&tmi_session::RoomCommand::Slow(Some(Some(30))))
    .unwrap();
  session.send_whisper("randers", "psst").unwrap();
  session.send_raw("PRIVMSG #pajlada :raw\r\n").unwrap();
  session.part().unwrap();
  session.rejoin().unwrap();

  assert_eq!(
    transport.lines(),
    [
      ":bot!bot@bot.tmi.twitch.tv PRIVMSG #pajlada :hello",
      ":bot!bot@bot.tmi.twitch.tv PRIVMSG #pajlada :hello \u{2800}",
      ":bot!bot@bot.tmi.twitch.tv PRIVMSG #pajlada :/me waves",
      ":bot!bot@bot.tmi.twitch.tv PRIVMSG #pajlada :/slow 30",
      ":bot~bot@bot.tmi.twitch.tv PRIVMSG #jtv :/w randers psst",
      "PRIVMSG #pajlada :raw ",
      "PART #pajlada",
      "JOIN #pajlada",
    ]
  );
}

#[test]
fn throttled_messages_are_reported() {
  let (session, transport) = listening(
    builder()
      .chat_throttle(Some(
        ThrottleConfig::new(1, Duration::from_secs(30)).max_length(10),
      ))
      .whisper_throttle(None),
  );
  let events = record(&session, &[EventKind::Throttled]);

  assert_eq!(
    session.send_message("this one is too long").unwrap(),
    Sent::Throttled(Violation::TooLong)
  );
  assert_eq!(session.send_message("first").unwrap(), Sent::Queued);
  assert_eq!(
    session.send_message("second").unwrap(),
    Sent::Throttled(Violation::TooManyMessages)
  );
  for _ in 0..5 {
    assert_eq!(session.send_whisper("a", "unlimited").unwrap(), Sent::Queued);
  }
  assert_eq!(session.send_raw("PING").unwrap(), Sent::Queued);

  assert_eq!(transport.sent().len(), 7);
  let events = events.lock().unwrap();
  assert_eq!(events.len(), 2);
  match &events[1] {
    Event::Throttled {
      kind,
      violation,
      line,
    } => {
      assert_eq!(*kind, SendKind::Chat);
      assert_eq!(*violation, Violation::TooManyMessages);
      assert_eq!(line, ":bot!bot@bot.tmi.twitch.tv PRIVMSG #pajlada :second");
    }
    other => panic!("expected throttled, got {other:?}"),
  }
}

#[test]
fn raw_lines_may_be_throttled() {
  let (session, _transport) = listening(
    builder()
      .chat_throttle(Some(ThrottleConfig::new(1, Duration::from_secs(30))))
      .throttle_raw(true),
  );
  assert_eq!(session.send_raw("PING").unwrap(), Sent::Queued);
  assert_eq!(
    session.send_raw("PING").unwrap(),
    Sent::Throttled(Violation::TooManyMessages)
  );
}

#[test]
fn unsubscribed_handlers_are_not_called() {
  let (session, transport) = listening(builder());
  let count = Arc::new(AtomicUsize::new(0));
  let id = {
    let count = count.clone();
    session.subscribe(EventKind::Message, move |_| {
      count.fetch_add(1, Ordering::SeqCst);
    })
  };

  transport.receive(&privmsg("one"));
  assert!(session.unsubscribe(id));
  transport.receive(&privmsg("two"));

  assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn throttled_repeat_keeps_the_duplicate_suffix() {
  let (session, transport) = listening(
    builder().chat_throttle(Some(ThrottleConfig::new(1, Duration::from_millis(200)))),
  );

  assert_eq!(session.send_message("hi").unwrap(), Sent::Queued);
  assert_eq!(
    session.send_message("hi").unwrap(),
    Sent::Throttled(Violation::TooManyMessages)
  );
  std::thread::sleep(Duration::from_millis(250));
  assert_eq!(session.send_message("hi").unwrap(), Sent::Queued);

  assert_eq!(
    transport.lines(),
    [
      ":bot!bot@bot.tmi.twitch.tv PRIVMSG #pajlada :hi",
      ":bot!bot@bot.tmi.twitch.tv PRIVMSG #pajlada :hi \u{2800}",
    ]
  );
}
