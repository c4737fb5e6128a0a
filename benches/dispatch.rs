use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tmi_session::{DispatchContext, DispatchMode, Dispatcher, RoomState};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

const LINES: &[&str] = &[
  ":tmi.twitch.tv 001 bot :Welcome, GLHF!",
  "PING :tmi.twitch.tv",
  "@badge-info=;badges=;color=#0000FF;display-name=JuN1oRRRR;emotes=;flags=;id=e9d998c3;mod=0;room-id=11148817;subscriber=0;tmi-sent-ts=1594545155039;turbo=0;user-id=29803735;user-type= :jun1orrrr!jun1orrrr@jun1orrrr.tmi.twitch.tv PRIVMSG #pajlada :dank cam",
  "@badge-info=subscriber/22;badges=moderator/1,subscriber/12;color=#19E6E6;display-name=randers;emotes=25:6-10;flags=;id=6e2ccb1f;mod=1;room-id=11148817;subscriber=1;tmi-sent-ts=1594556065407;turbo=0;user-id=40286300;user-type=mod :randers!randers@randers.tmi.twitch.tv PRIVMSG #pajlada :!give Kappa 5",
  ":randers!randers@randers.tmi.twitch.tv JOIN #pajlada",
  ":randers!randers@randers.tmi.twitch.tv PART #pajlada",
  "@emote-only=0;followers-only=-1;r9k=0;room-id=11148817;slow=0;subs-only=0 :tmi.twitch.tv ROOMSTATE #pajlada",
  "@badges=;color=;display-name=bot;emote-sets=0;mod=0;subscriber=0;user-type= :tmi.twitch.tv USERSTATE #pajlada",
  "@badges=;color=;display-name=A;emotes=;message-id=1;thread-id=1_2;turbo=0;user-id=1;user-type= :a!a@a.tmi.twitch.tv WHISPER bot :!status",
  ":tmi.twitch.tv CAP * ACK :twitch.tv/tags",
];

fn dispatch(c: &mut Criterion) {
  let dispatcher = Dispatcher::new();
  let room_state = RoomState::default();
  for mode in [DispatchMode::Double, DispatchMode::Single] {
    let ctx = DispatchContext {
      room: "pajlada",
      username: "bot",
      chat_prefixes: &['!'],
      whisper_prefixes: &['!'],
      auto_pong: true,
      mode,
      room_state: &room_state,
      emotes: None,
      log_unclassified: false,
    };
    c.bench_with_input(
      BenchmarkId::new("dispatch", format!("{mode:?}")),
      &LINES,
      |b, lines| {
        b.iter(|| {
          for line in lines.iter() {
            black_box(dispatcher.dispatch(line, &ctx));
          }
        })
      },
    );
  }
}

criterion_group!(benches, dispatch);
criterion_main!(benches);
