/* src/server/core/rust/src/dispatch/tests.rs */

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use futures_util::StreamExt;
use serde_json::{Value, json};
use tokio::sync::oneshot;

use crate::cache::{CachePolicy, PatchCache};
use crate::context::DispatchOptions;
use crate::errors::RouterError;
use crate::events::RouterEvent;
use crate::fetch::ServerTransport;
use crate::handler::{
  BoxFuture, Handler, cache, from_client, from_client_value, from_server, from_server_with, plain,
  proxy_upstream,
};
use crate::headers;
use crate::request::{Method, Request};
use crate::response::Response;
use crate::router::Router;

fn counting_server(counter: &Arc<AtomicUsize>, patch: Value) -> Handler {
  let counter = Arc::clone(counter);
  from_server(move |_| {
    counter.fetch_add(1, Ordering::SeqCst);
    let patch = patch.clone();
    async move { Ok(patch) }
  })
}

fn counting_client(counter: &Arc<AtomicUsize>, patch: Value) -> Handler {
  let counter = Arc::clone(counter);
  from_client(move |_| {
    counter.fetch_add(1, Ordering::SeqCst);
    let patch = patch.clone();
    async move { Ok(patch) }
  })
}

async fn collect(router: &Router, request: Request, options: DispatchOptions) -> Vec<Value> {
  let response = Response::new(options.context);
  router.run(request, response, options).collect().await
}

struct FixedCache(Option<Value>);

impl PatchCache for FixedCache {
  fn cached_patch(&self, _handler: &Handler, _request: &Request) -> BoxFuture<Option<Value>> {
    let hit = self.0.clone();
    Box::pin(async move { hit })
  }
}

#[tokio::test]
async fn handler_error_aborts_chain_and_yields_error_patch() {
  let never = Arc::new(AtomicUsize::new(0));
  let reported = Arc::new(AtomicUsize::new(0));
  let reported_in = Arc::clone(&reported);
  let router = Router::builder()
    .get(
      "/p/:id",
      [
        from_client_value(json!({ "page": "Product" })),
        from_server(|_| async { Err(RouterError::handler("db offline")) }),
        counting_server(&never, json!({ "unreachable": true })),
      ],
    )
    .error_reporter(move |_| {
      reported_in.fetch_add(1, Ordering::SeqCst);
    })
    .build()
    .unwrap();
  let mut events = router.subscribe();

  let patches = collect(&router, Request::get("/p/1"), DispatchOptions::server()).await;

  assert_eq!(patches.len(), 2);
  assert_eq!(patches[0], json!({ "page": "Product" }));
  assert_eq!(patches[1]["page"], "Error");
  assert_eq!(patches[1]["error"], "db offline");
  assert!(patches[1]["stack"].is_string());
  assert_eq!(never.load(Ordering::SeqCst), 0);
  assert_eq!(reported.load(Ordering::SeqCst), 1);
  assert_eq!(
    events.try_recv().unwrap(),
    RouterEvent::Error { path: "/p/1".into(), message: "db offline".into() }
  );
}

#[tokio::test]
async fn error_page_sets_server_status() {
  let router = Router::builder()
    .get("/boom", [plain(|_| async { Err(RouterError::handler("x")) })])
    .build()
    .unwrap();
  let response = Response::server();
  let state =
    router.run_all(Request::get("/boom"), response.clone(), DispatchOptions::server(), &json!({})).await;
  assert_eq!(state["page"], "Error");
  assert_eq!(response.status(), 500);
}

#[tokio::test]
async fn custom_error_handler() {
  let router = Router::builder()
    .get("/p/:id", [plain(|_| async { Err(RouterError::handler("nope")) })])
    .error(|err, params, _req, _res| json!({ "page": "Oops", "reason": err.to_string(), "id": params.get_str("id") }))
    .build()
    .unwrap();
  let state =
    router.run_all(Request::get("/p/7"), Response::server(), DispatchOptions::server(), &json!({})).await;
  assert_eq!(state, json!({ "page": "Oops", "reason": "nope", "id": "7" }));
}

#[tokio::test]
async fn client_json_request_has_no_from_client_data() {
  let client_calls = Arc::new(AtomicUsize::new(0));
  let router = Router::builder()
    .get(
      "/p/:id",
      [
        counting_client(&client_calls, json!({ "clientOnly": true })),
        from_server(|args| async move { Ok(json!({ "product": { "id": args.params.get_str("id") } })) }),
      ],
    )
    .build()
    .unwrap();

  for options in [DispatchOptions::client(), DispatchOptions::server()] {
    let response = Response::new(options.context);
    let state = router.run_all(Request::get("/p/3.json"), response, options, &json!({})).await;
    assert!(state.get("clientOnly").is_none(), "{state}");
    assert_eq!(state["product"]["id"], "3");
  }
  assert_eq!(client_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn server_html_runs_ssr_handlers() {
  let router = Router::builder()
    .get("/p/:id", [from_client_value(json!({ "page": "Product" })), from_server(|_| async {
      Ok(json!({ "product": { "name": "Shoe" } }))
    })])
    .build()
    .unwrap();
  let response = Response::server();
  let state =
    router.run_all(Request::get("/p/1"), response.clone(), DispatchOptions::server(), &json!({})).await;
  assert_eq!(state, json!({ "page": "Product", "product": { "name": "Shoe" } }));
  assert_eq!(response.header(headers::RESPONSE_TYPE).as_deref(), Some("ssr"));
  assert_eq!(response.header(headers::HANDLER).as_deref(), Some("/p/:id"));
}

#[tokio::test]
async fn client_navigation_yields_loading_preamble_first() {
  let router = Router::builder()
    .get("/p/:id", [from_client_value(json!({ "page": "Product" })), from_server(|_| async {
      Ok(json!({ "product": { "name": "Shoe" }, "loading": false }))
    })])
    .build()
    .unwrap();
  let request = Request::get("/p/1?color=red").with_origin("https", "shop.test");
  let patches = collect(&router, request, DispatchOptions::client()).await;

  assert_eq!(patches.len(), 3);
  assert_eq!(patches[0]["loading"], true);
  assert_eq!(patches[0]["location"]["pathname"], "/p/1");
  assert_eq!(patches[0]["location"]["search"], "?color=red");
  assert_eq!(patches[0]["location"]["hostname"], "shop.test");
  assert_eq!(patches[1], json!({ "page": "Product" }));
  assert_eq!(patches[2]["loading"], false);
}

#[tokio::test]
async fn hydration_skips_preamble() {
  let router = Router::builder().get("/", [from_client_value(json!({ "page": "Home" }))]).build().unwrap();
  let patches = collect(&router, Request::get("/"), DispatchOptions::hydration()).await;
  assert_eq!(patches, vec![json!({ "page": "Home" })]);
}

#[tokio::test]
async fn client_cache_hit_skips_from_server_handlers() {
  let server_calls = Arc::new(AtomicUsize::new(0));
  let router = Router::builder()
    .get(
      "/p/:id",
      [
        cache(CachePolicy::new().server(300).client(true)),
        from_client_value(json!({ "page": "Product" })),
        counting_server(&server_calls, json!({ "product": "fresh" })),
      ],
    )
    .patch_cache(Arc::new(FixedCache(Some(json!({ "product": "cached" })))))
    .build()
    .unwrap();

  let patches = collect(&router, Request::get("/p/1"), DispatchOptions::client()).await;

  assert_eq!(patches.len(), 1, "{patches:?}");
  assert_eq!(patches[0]["page"], "Product");
  assert_eq!(patches[0]["product"], "cached");
  assert_eq!(patches[0]["location"]["pathname"], "/p/1");
  assert_eq!(server_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn cached_result_without_from_client_takes_from_server_slot() {
  let router = Router::builder()
    .get("/p/:id", [cache(CachePolicy::new().client(true)), from_server(|_| async {
      Ok(json!({ "product": "fresh" }))
    })])
    .patch_cache(Arc::new(FixedCache(Some(json!({ "product": "cached" })))))
    .build()
    .unwrap();
  let patches = collect(&router, Request::get("/p/1"), DispatchOptions::client()).await;
  assert_eq!(patches.len(), 1);
  assert_eq!(patches[0]["product"], "cached");
}

#[tokio::test]
async fn cache_miss_falls_back_to_network() {
  let server_calls = Arc::new(AtomicUsize::new(0));
  let router = Router::builder()
    .get("/p/:id", [cache(CachePolicy::new().client(true)), counting_server(&server_calls, json!({ "product": "fresh" }))])
    .patch_cache(Arc::new(FixedCache(None)))
    .build()
    .unwrap();
  let patches = collect(&router, Request::get("/p/1"), DispatchOptions::client()).await;
  assert_eq!(patches[0]["loading"], true);
  assert_eq!(patches[1]["product"], "fresh");
  assert_eq!(server_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn without_client_caching_cache_is_not_consulted() {
  let router = Router::builder()
    .get("/p/:id", [from_server(|_| async { Ok(json!({ "product": "fresh" })) })])
    .patch_cache(Arc::new(FixedCache(Some(json!({ "product": "cached" })))))
    .build()
    .unwrap();
  let state =
    router.run_all(Request::get("/p/1"), Response::client(), DispatchOptions::client(), &json!({})).await;
  assert_eq!(state["product"], "fresh");
}

#[tokio::test]
async fn cache_handler_on_post_route_becomes_error_patch() {
  let router = Router::builder()
    .post("/cart", [cache(CachePolicy::new().server(60)), plain(|_| async { Ok(json!({ "ok": true })) })])
    .build()
    .unwrap();
  let response = Response::server();
  let state = router
    .run_all(Request::new(Method::Post, "/cart"), response.clone(), DispatchOptions::server(), &json!({}))
    .await;
  assert_eq!(state["page"], "Error");
  assert!(state.get("ok").is_none());
  assert!(response.server_cache().is_none());
}

#[tokio::test]
async fn run_all_leaves_initial_state_untouched() {
  let router = Router::builder()
    .get("/", [plain(|_| async { Ok(json!({ "list": [3], "page": "Home" })) })])
    .build()
    .unwrap();
  let initial = json!({ "list": [1, 2], "user": { "name": "x" } });
  let state = router.run_all(Request::get("/"), Response::server(), DispatchOptions::server(), &initial).await;
  assert_eq!(state, json!({ "list": [3], "page": "Home", "user": { "name": "x" } }));
  assert_eq!(initial, json!({ "list": [1, 2], "user": { "name": "x" } }));
}

#[tokio::test]
async fn string_patch_replaces_state() {
  let router = Router::builder()
    .get("/robots.txt", [plain(|_| async { Ok(json!("User-agent: *")) })])
    .build()
    .unwrap();
  let state = router
    .run_all(Request::get("/robots.txt"), Response::server(), DispatchOptions::server(), &json!({ "a": 1 }))
    .await;
  assert_eq!(state, json!("User-agent: *"));
}

#[tokio::test]
async fn null_results_are_not_yielded() {
  let router = Router::builder()
    .get("/", [plain(|_| async { Ok(Value::Null) }), from_client_value(json!({ "page": "Home" }))])
    .build()
    .unwrap();
  let patches = collect(&router, Request::get("/"), DispatchOptions::server()).await;
  assert_eq!(patches, vec![json!({ "page": "Home" })]);
}

#[tokio::test]
async fn default_fallback_is_404() {
  let router = Router::builder().build().unwrap();
  let response = Response::server();
  let state =
    router.run_all(Request::get("/nowhere"), response.clone(), DispatchOptions::server(), &json!({})).await;
  assert_eq!(state, json!({ "page": "404" }));
  assert_eq!(response.status(), 404);
  assert_eq!(response.header(headers::HANDLER).as_deref(), Some("fallback"));
}

#[tokio::test]
async fn custom_fallback_sees_query_params() {
  let router = Router::builder()
    .fallback([plain(|args| async move { Ok(json!({ "page": "Search", "q": args.params.get_str("q") })) })])
    .build()
    .unwrap();
  let state =
    router.run_all(Request::get("/x?q=boots"), Response::server(), DispatchOptions::server(), &json!({})).await;
  assert_eq!(state, json!({ "page": "Search", "q": "boots" }));
}

#[tokio::test]
async fn proxy_handler_marks_response_and_skips_on_client() {
  let router = Router::builder()
    .get("/blog/*path", [proxy_upstream(|args| async move {
      args.response.send(format!("proxied {}", args.params.get_str("path").unwrap_or_default()));
      Ok(Value::Null)
    })])
    .build()
    .unwrap();

  let response = Response::server();
  let _ = router.run_all(Request::get("/blog/a/b"), response.clone(), DispatchOptions::server(), &json!({})).await;
  assert_eq!(response.header(headers::RESPONSE_TYPE).as_deref(), Some("proxy"));
  assert_eq!(response.snapshot().body.as_deref(), Some("proxied a/b"));

  let response = Response::client();
  let _ = router.run_all(Request::get("/blog/a/b"), response.clone(), DispatchOptions::client(), &json!({})).await;
  assert!(response.snapshot().body.is_none());
}

#[tokio::test]
async fn from_server_with_uses_client_function_on_client() {
  let router = Router::builder()
    .get("/p/:id", [from_server_with(
      |_| async { Ok(json!({ "source": "server" })) },
      |_| async { Ok(json!({ "source": "client" })) },
    )])
    .build()
    .unwrap();
  let client = router.run_all(Request::get("/p/1"), Response::client(), DispatchOptions::client(), &json!({})).await;
  assert_eq!(client["source"], "client");
  let server = router.run_all(Request::get("/p/1"), Response::server(), DispatchOptions::server(), &json!({})).await;
  assert_eq!(server["source"], "server");
}

struct Gate {
  calls: AtomicUsize,
  pending: Mutex<HashMap<String, oneshot::Receiver<Value>>>,
}

impl ServerTransport for Gate {
  fn fetch_json(&self, url: &str) -> BoxFuture<Result<Value, RouterError>> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    let rx = self.pending.lock().unwrap().remove(url);
    Box::pin(async move {
      match rx {
        Some(rx) => rx.await.map_err(|e| RouterError::upstream(e.to_string())),
        None => Err(RouterError::upstream("no response queued")),
      }
    })
  }
}

#[tokio::test]
async fn transport_fetches_json_variant_and_emits_fetch() {
  let (tx, rx) = oneshot::channel();
  let gate = Arc::new(Gate {
    calls: AtomicUsize::new(0),
    pending: Mutex::new(HashMap::from([("/p/1.json?x=1".to_string(), rx)])),
  });
  let router = Router::builder()
    .get("/p/:id", [from_server(|_| async { Ok(json!({ "source": "server" })) })])
    .transport(gate.clone())
    .build()
    .unwrap();
  let mut events = router.subscribe();
  tx.send(json!({ "source": "network" })).unwrap();

  let state =
    router.run_all(Request::get("/p/1?x=1"), Response::client(), DispatchOptions::client(), &json!({})).await;
  assert_eq!(state["source"], "network");
  assert_eq!(gate.calls.load(Ordering::SeqCst), 1);
  assert_eq!(events.try_recv().unwrap(), RouterEvent::Fetch { path: "/p/1".into() });
}

#[tokio::test]
async fn superseded_navigation_is_dropped_silently() {
  let (tx_a, rx_a) = oneshot::channel();
  let (tx_b, rx_b) = oneshot::channel();
  let gate = Arc::new(Gate {
    calls: AtomicUsize::new(0),
    pending: Mutex::new(HashMap::from([
      ("/p/a.json".to_string(), rx_a),
      ("/p/b.json".to_string(), rx_b),
    ])),
  });
  let router = Router::builder()
    .get("/p/:id", [from_server(|_| async { Ok(Value::Null) })])
    .transport(gate.clone())
    .build()
    .unwrap();

  let first = {
    let router = router.clone();
    tokio::spawn(async move { collect(&router, Request::get("/p/a"), DispatchOptions::client()).await })
  };
  while gate.calls.load(Ordering::SeqCst) == 0 {
    tokio::task::yield_now().await;
  }

  tx_b.send(json!({ "product": "b" })).unwrap();
  let second = collect(&router, Request::get("/p/b"), DispatchOptions::client()).await;
  tx_a.send(json!({ "product": "a" })).unwrap();
  let first = first.await.unwrap();

  assert_eq!(second.len(), 2);
  assert_eq!(second[1], json!({ "product": "b" }));
  // Only the loading preamble survives; no data and no error page.
  assert_eq!(first.len(), 1);
  assert_eq!(first[0]["loading"], true);
}

#[tokio::test]
async fn named_handler_is_reported_in_header() {
  let router = Router::builder()
    .get("/p/:id", [
      from_server(|_| async { Ok(json!({ "product": {} })) }).named("product-loader"),
      from_client_value(json!({ "page": "Product" })),
    ])
    .build()
    .unwrap();
  let response = Response::server();
  router.run_all(Request::get("/p/1"), response.clone(), DispatchOptions::server(), &json!({})).await;
  assert_eq!(response.header(headers::HANDLER).as_deref(), Some("product-loader"));
}
