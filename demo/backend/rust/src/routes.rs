/* demo/backend/rust/src/routes.rs */

use serde_json::{Value, json};
use storefront_router::{
  CachePolicy, CustomCacheKey, Handler, HandlerArgs, Router, RouterBuilder, RouterError,
  StorefrontConfig, cache, from_client, from_client_value, from_server, plain, proxy_upstream,
};
use tracing::error;
use url::form_urlencoded;

use crate::catalog;

fn home() -> Vec<Handler> {
  vec![
    from_server(|_: HandlerArgs| async {
      Ok::<_, RouterError>(json!({ "featured": serde_json::to_value(catalog::featured())? }))
    }),
    from_client(|_: HandlerArgs| async {
      Ok::<_, RouterError>(json!({ "page": "Home", "categories": serde_json::to_value(catalog::CATEGORIES)? }))
    }),
  ]
}

fn category() -> Vec<Handler> {
  // Campaign parameters do not change the listing.
  let key = CustomCacheKey::new().exclude_query_parameters(["utm_source", "utm_campaign"]);
  vec![
    cache(CachePolicy::new().server_with_key(300, key).client(true)),
    from_server(|args: HandlerArgs| async move {
      let slug = args.params.get_str("slug").unwrap_or_default();
      let Some(category) = catalog::category(slug) else {
        args.response.set_status(404);
        return Ok(json!({ "category": null, "products": [] }));
      };
      let products = catalog::in_category(slug, args.params.get_str("sort"));
      Ok::<_, RouterError>(json!({
        "category": serde_json::to_value(category)?,
        "products": serde_json::to_value(products)?,
      }))
    }),
    from_client_value(json!({ "page": "Category" })),
  ]
}

fn product_id(args: &HandlerArgs) -> Option<u32> {
  args.params.get_str("id").and_then(|id| id.parse().ok())
}

fn product() -> Vec<Handler> {
  vec![
    cache(CachePolicy::new().server(60)),
    from_server(|args: HandlerArgs| async move {
      match product_id(&args).and_then(catalog::product) {
        Some(product) => Ok::<_, RouterError>(json!({ "product": serde_json::to_value(product)? })),
        None => {
          args.response.set_status(404);
          Ok(json!({ "product": null }))
        }
      }
    }),
    from_client(|args: HandlerArgs| async move {
      let page = if product_id(&args).and_then(catalog::product).is_some() { "Product" } else { "404" };
      Ok::<_, RouterError>(json!({ "page": page }))
    }),
  ]
}

/// Sends visitors without a session to the login page.
fn require_session() -> Handler {
  plain(|args: HandlerArgs| async move {
    if args.request.cookie("session").is_none() {
      let query = form_urlencoded::Serializer::new(String::new()).append_pair("return", &args.request.path).finish();
      args.response.redirect(format!("/login?{query}"), 302);
    }
    Ok::<_, RouterError>(Value::Null)
  })
}

fn account() -> RouterBuilder {
  RouterBuilder::new()
    .get(
      "/",
      [
        require_session(),
        from_server(|args: HandlerArgs| async move {
          let user = args.request.cookie("session").unwrap_or_default();
          Ok::<_, RouterError>(json!({ "account": { "user": user } }))
        }),
        from_client_value(json!({ "page": "Account" })),
      ],
    )
    .get(
      "/orders",
      [
        require_session(),
        from_server(|_: HandlerArgs| async { Ok::<_, RouterError>(json!({ "orders": [] })) }),
        from_client_value(json!({ "page": "Orders" })),
      ],
    )
}

fn login() -> Vec<Handler> {
  vec![plain(|args: HandlerArgs| async move {
    args.response.set_cookie("session", "guest");
    let target = args.params.get_str("return").unwrap_or("/account").to_string();
    args.response.redirect(target, 303);
    Ok::<_, RouterError>(Value::Null)
  })]
}

/// Pages still served by the previous storefront.
fn legacy() -> Vec<Handler> {
  vec![proxy_upstream(|args: HandlerArgs| async move {
    let rest = args.params.get_str("rest").unwrap_or_default();
    args.response.set_header("content-type", "text/html; charset=utf-8");
    args.response.send(format!("<!DOCTYPE html><p>Legacy page: {rest}</p>"));
    Ok::<_, RouterError>(Value::Null)
  })]
}

pub fn build(config: &StorefrontConfig) -> Result<Router, RouterError> {
  Router::builder()
    .with_config(config)
    .get("/", home())
    .get("/s/:slug", category())
    .get("/p/:id", product())
    .get("/login", [from_client_value(json!({ "page": "Login" }))])
    .post("/login", login())
    .get("/legacy/*rest", legacy())
    .nest("/account", account())
    .app_shell([from_client_value(json!({ "page": "AppShell" }))])
    .error_reporter(|err| error!(code = err.code(), error = %err, "request failed"))
    .build()
}

#[cfg(test)]
mod tests {
  use axum::body::Body;
  use axum::http::{Request, StatusCode};
  use http_body_util::BodyExt;
  use storefront_router_axum::{IntoAxumRouter, ServeOptions};
  use tower::ServiceExt;

  use super::*;

  async fn get(uri: &str, cookie: Option<&str>) -> (StatusCode, axum::http::HeaderMap, String) {
    call("GET", uri, cookie).await
  }

  async fn call(method: &str, uri: &str, cookie: Option<&str>) -> (StatusCode, axum::http::HeaderMap, String) {
    let router = build(&StorefrontConfig::default()).unwrap();
    let app = router.into_axum_router(ServeOptions::default());
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
      req = req.header("cookie", cookie);
    }
    let resp = app.oneshot(req.body(Body::empty()).unwrap()).await.unwrap();
    let status = resp.status();
    let headers = resp.headers().clone();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    (status, headers, String::from_utf8(bytes.to_vec()).unwrap())
  }

  #[tokio::test]
  async fn product_json() {
    let (status, _, body) = get("/p/3.json", None).await;
    assert_eq!(status, StatusCode::OK);
    let data: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(data["product"]["name"], "Canvas Tote");
  }

  #[tokio::test]
  async fn unknown_product_is_404() {
    let (status, _, body) = get("/p/99.json", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(serde_json::from_str::<Value>(&body).unwrap(), json!({ "product": null }));
  }

  #[tokio::test]
  async fn category_sorts_by_query() {
    let (_, headers, body) = get("/s/shoes.json?sort=price&utm_source=mail", None).await;
    let data: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(data["products"][0]["id"], 2);
    assert_eq!(headers["x-sf-cache-key"], "dev:/s/shoes.json?sort=price");
  }

  #[tokio::test]
  async fn account_requires_session() {
    let (status, headers, _) = get("/account", None).await;
    assert_eq!(status, StatusCode::FOUND);
    assert_eq!(headers["location"], "/login?return=%2Faccount");

    let (status, _, body) = get("/account/orders", Some("session=ana")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("\"page\":\"Orders\""));
  }

  #[tokio::test]
  async fn login_sets_session_and_returns() {
    let (status, headers, _) = get("/account/orders", None).await;
    assert_eq!(status, StatusCode::FOUND);
    let target = headers["location"].to_str().unwrap().to_string();
    assert_eq!(target, "/login?return=%2Faccount%2Forders");

    let (status, headers, _) = call("POST", &target, None).await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(headers["location"], "/account/orders");
    assert_eq!(headers["set-cookie"], "session=guest");
  }

  #[tokio::test]
  async fn legacy_pages_are_proxied() {
    let (status, headers, body) = get("/legacy/help/returns", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers["x-sf-response-type"], "proxy");
    assert_eq!(body, "<!DOCTYPE html><p>Legacy page: help/returns</p>");
  }

  #[tokio::test]
  async fn app_shell_is_routable() {
    let (status, _, body) = get(storefront_router::APP_SHELL_PATH, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("AppShell"));
  }
}
