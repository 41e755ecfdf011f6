/* src/server/adapter/axum/src/render.rs */

use serde_json::Value;

/// Make serialized JSON safe to embed in an HTML `<script>` element.
pub fn escape_json_for_html(json: &str) -> String {
  let mut out = String::with_capacity(json.len());
  for c in json.chars() {
    match c {
      '<' => out.push_str("\\u003c"),
      '>' => out.push_str("\\u003e"),
      '&' => out.push_str("\\u0026"),
      '\u{2028}' => out.push_str("\\u2028"),
      '\u{2029}' => out.push_str("\\u2029"),
      _ => out.push(c),
    }
  }
  out
}

/// Insert the state tree into `shell` as a JSON script before `</body>`.
pub fn inject_state(shell: &str, data_id: &str, state: &Value) -> String {
  let escaped = escape_json_for_html(&state.to_string());
  let script = format!(r#"<script id="{data_id}" type="application/json">{escaped}</script>"#);
  let mut html = shell.to_string();
  match html.rfind("</body>") {
    Some(pos) => html.insert_str(pos, &script),
    None => html.push_str(&script),
  }
  html
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn escapes_script_breakers() {
    let out = escape_json_for_html(r#"{"a":"</script><b>&amp;\u2028"}"#);
    assert!(!out.contains('<'));
    assert!(!out.contains('>'));
    assert!(!out.contains('&'));
    assert!(out.contains("\\u003c/script\\u003e"));
  }

  #[test]
  fn line_separators_are_escaped() {
    assert_eq!(escape_json_for_html("\u{2028}\u{2029}"), "\\u2028\\u2029");
  }

  #[test]
  fn escaped_json_still_parses_to_same_value() {
    let state = json!({ "title": "<Shoes & Boots>" });
    let escaped = escape_json_for_html(&state.to_string());
    assert_eq!(serde_json::from_str::<Value>(&escaped).unwrap(), state);
  }

  #[test]
  fn injects_before_body_end() {
    let html = inject_state("<html><body><div id=\"root\"></div></body></html>", "__data", &json!({ "a": 1 }));
    assert_eq!(
      html,
      r#"<html><body><div id="root"></div><script id="__data" type="application/json">{"a":1}</script></body></html>"#
    );
  }

  #[test]
  fn appends_without_body() {
    let html = inject_state("<div></div>", "state", &json!(null));
    assert!(html.ends_with(r#"<script id="state" type="application/json">null</script>"#));
  }
}
