//! Pipelines run end-to-end against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port in a background thread, then
//! drives it with the default ureq transport through `send`/`recv` arrows,
//! exactly as a contract test would.

use std::collections::BTreeMap;
use std::net::SocketAddr;

use assay::{config, join, recv, send, Context, Failure, LogLevel, Segment, Slot, Stream};
use serde::{Deserialize, Serialize};
use url::Url;

fn start_server() -> SocketAddr {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    addr
}

fn base(addr: SocketAddr) -> Segment {
    Url::parse(&format!("http://{addr}/")).unwrap().into()
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
struct Site {
    site: String,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
struct Order {
    id: u32,
    item: String,
    tags: Vec<String>,
}

#[test]
fn json_scenario() {
    let addr = start_server();
    let site = Slot::<Site>::default();

    let pipeline = join([
        send::get("%v/json", &[base(addr)]),
        send::accept_json(),
        recv::code([200]),
        recv::served_json(),
        recv::recv(&site),
    ]);
    let ctx = pipeline.apply(Context::default_io());

    assert!(ctx.failure().is_none(), "{:?}", ctx.failure());
    assert_eq!(site.get().site, "example.com");
}

#[test]
fn status_mismatch_scenario() {
    let addr = start_server();

    let pipeline = join([
        send::get("%v/other", &[base(addr)]),
        send::accept_json(),
        recv::code([200]),
    ]);
    let err = pipeline.run(Context::default_io()).unwrap_err();

    assert_eq!(
        err,
        Failure::Status {
            expected: vec![200],
            actual: 400
        }
    );
}

#[test]
fn undefined_header_scenario() {
    let addr = start_server();

    let pipeline = join([
        send::get("%v/json", &[base(addr)]),
        recv::code([200]),
        recv::header("x-content-type").any(),
    ]);
    let err = pipeline.run(Context::default_io()).unwrap_err();

    assert_eq!(
        err,
        Failure::Undefined {
            name: "x-content-type".to_string()
        }
    );
}

#[test]
fn header_matchers() {
    let addr = start_server();
    let content = Slot::<String>::default();

    let pipeline = join([
        send::get("%v/json", &[base(addr)]),
        recv::code([200]),
        recv::header("Content-Type").is("application/json"),
        recv::header("content-type").any(),
        recv::header("CONTENT-TYPE").string(&content),
    ]);
    assert!(pipeline.run(Context::default_io()).is_ok());
    assert_eq!(content.get(), "application/json");

    let mismatch = join([
        send::get("%v/json", &[base(addr)]),
        recv::header("content-type").is("foo/bar"),
    ]);
    assert!(matches!(
        mismatch.run(Context::default_io()),
        Err(Failure::Mismatch { .. })
    ));
}

#[test]
fn form_and_raw_bodies() {
    let addr = start_server();
    let site = Slot::<Site>::default();
    let raw = Slot::<Vec<u8>>::default();

    let form = join([
        send::get("%v/form", &[base(addr)]),
        recv::code([200]),
        recv::served_form(),
        recv::recv(&site),
    ]);
    assert!(form.run(Context::default_io()).is_ok());
    assert_eq!(site.get().site, "example.com");

    let bytes = join([
        send::get("%v/form", &[base(addr)]),
        recv::code([200]),
        recv::served().any(),
        recv::bytes(&raw),
    ]);
    assert!(bytes.run(Context::default_io()).is_ok());
    assert_eq!(raw.get(), b"site=example.com");
}

#[test]
fn json_round_trip_through_echo() {
    let addr = start_server();
    let sent = Order {
        id: 7,
        item: "book".to_string(),
        tags: vec!["a".to_string(), "b".to_string()],
    };
    let echoed = Slot::<Order>::default();

    let pipeline = join([
        send::post("%v/echo", &[base(addr)]),
        send::content_json(),
        send::send_value(&sent),
        recv::code([200]),
        recv::served_json(),
        recv::recv(&echoed),
    ]);
    assert!(pipeline.run(Context::default_io()).is_ok());
    assert_eq!(echoed.get(), sent);
}

#[test]
fn form_round_trip_through_echo() {
    let addr = start_server();
    let sent = Site {
        site: "example.com/a b".to_string(),
    };
    let echoed = Slot::<Site>::default();

    let pipeline = join([
        send::put("%v/echo", &[base(addr)]),
        send::content_form(),
        send::send_value(&sent),
        recv::code([200]),
        recv::served_form(),
        recv::recv(&echoed),
    ]);
    assert!(pipeline.run(Context::default_io()).is_ok());
    assert_eq!(echoed.get(), sent);
}

#[test]
fn stream_payload_is_sent() {
    let addr = start_server();
    let text = Slot::<String>::default();

    let pipeline = join([
        send::post("%v/echo", &[base(addr)]),
        send::content().is("text/plain"),
        send::send(Stream::new(std::io::Cursor::new(b"streamed".to_vec()))),
        recv::code([200]),
        recv::text(&text),
    ]);
    assert!(pipeline.run(Context::default_io()).is_ok());
    assert_eq!(text.get(), "streamed");
}

#[test]
fn query_params_reach_the_server() {
    #[derive(Serialize)]
    struct Search {
        q: String,
        page: u32,
    }

    let addr = start_server();
    let seen = Slot::<BTreeMap<String, String>>::default();

    let pipeline = join([
        send::get("%v/query?lang=en", &[base(addr)]),
        send::params(&Search {
            q: "a b".to_string(),
            page: 2,
        }),
        recv::code([200]),
        recv::served_json(),
        recv::recv(&seen),
    ]);
    assert!(pipeline.run(Context::default_io()).is_ok());

    let seen = seen.get();
    assert_eq!(seen.get("lang").map(String::as_str), Some("en"));
    assert_eq!(seen.get("q").map(String::as_str), Some("a b"));
    assert_eq!(seen.get("page").map(String::as_str), Some("2"));
}

#[test]
fn headers_reach_the_server() {
    let addr = start_server();
    let token = Slot::<String>::default();
    let seen = Slot::<BTreeMap<String, String>>::default();

    let pipeline = join([
        send::get("%v/headers", &[base(addr)]),
        send::header("X-Trace").is("abc"),
        send::authorization().val(&token),
        recv::code([200]),
        recv::recv(&seen),
    ]);
    token.set("Bearer late".to_string());

    let ctx = Context::new([
        config::default_transport(),
        config::default_header("User-Agent", "assay-tests"),
        config::log_level(LogLevel::Payload),
    ]);
    assert!(pipeline.run(ctx).is_ok());

    let seen = seen.get();
    assert_eq!(seen.get("x-trace").map(String::as_str), Some("abc"));
    assert_eq!(seen.get("authorization").map(String::as_str), Some("Bearer late"));
    assert_eq!(seen.get("user-agent").map(String::as_str), Some("assay-tests"));
}

#[derive(Debug, Default, Clone, Deserialize)]
struct HitCount {
    hits: usize,
}

#[test]
fn exchange_is_sent_once_per_context() {
    let addr = start_server();
    let first = Slot::<HitCount>::default();
    let total = Slot::<HitCount>::default();

    let pipeline = join([
        send::get("%v/hits", &[base(addr)]),
        recv::code([200]),
        recv::header("content-type").any(),
        recv::served_json(),
        recv::code([200, 201]),
        recv::recv(&first),
    ]);
    assert!(pipeline.run(Context::default_io()).is_ok());
    assert_eq!(first.get().hits, 1);

    let check = join([
        send::get("%v/hits/total", &[base(addr)]),
        recv::code([200]),
        recv::recv(&total),
    ]);
    assert!(check.run(Context::default_io()).is_ok());
    assert_eq!(total.get().hits, 1);
}

#[test]
fn failed_pipeline_never_sends() {
    let addr = start_server();
    let total = Slot::<HitCount>::default();

    let pipeline = join([
        send::post("%v/hits", &[base(addr)]),
        send::send("no content type"),
        recv::code([200]),
    ]);
    let ctx = pipeline.apply(Context::default_io());
    assert_eq!(ctx.failure(), Some(&Failure::UnknownContentType));
    assert!(!ctx.is_resolved());
    assert!(ctx.response().is_none());

    let check = join([
        send::get("%v/hits/total", &[base(addr)]),
        recv::recv(&total),
    ]);
    assert!(check.run(Context::default_io()).is_ok());
    assert_eq!(total.get().hits, 0);
}

#[test]
fn same_pipeline_runs_on_fresh_contexts() {
    let addr = start_server();
    let first = Slot::<HitCount>::default();

    let pipeline = join([
        send::get("%v/hits", &[base(addr)]),
        recv::code([200]),
        recv::recv(&first),
    ]);
    for expected in 1..=3 {
        assert!(pipeline.run(Context::default_io()).is_ok());
        assert_eq!(first.get().hits, expected);
    }
}

#[test]
fn connection_refused_is_transport_failure() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let pipeline = join([send::get("%v/json", &[base(addr)]), recv::code([200])]);
    let ctx = pipeline.apply(Context::new([config::timeout(std::time::Duration::from_secs(5))]));
    assert!(matches!(ctx.failure(), Some(Failure::Transport(_))));
    assert!(ctx.is_resolved());
}
