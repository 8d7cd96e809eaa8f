//! `GET /`: the chat page.
//!
//! A visit without `session_id` is redirected to a fresh random one so
//! every conversation has a shareable URL; otherwise the page shell is
//! served and talks to `/history` and `/chat` from the browser.

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use serde::Deserialize;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct IndexQuery {
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Eight lowercase hex characters.
pub fn new_session_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}

pub async fn index(State(state): State<AppState>, Query(query): Query<IndexQuery>) -> Response {
    match query.session_id.filter(|s| !s.is_empty()) {
        None => {
            let location = format!("/?session_id={}", new_session_id());
            (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
        }
        Some(session_id) => {
            Html(render_page(&session_id, state.config.history.max_message_chars)).into_response()
        }
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn render_page(session_id: &str, max_message_chars: usize) -> String {
    let session_id = escape_html(session_id);
    format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>wikichat</title>
<style>
  body {{ font-family: system-ui, sans-serif; max-width: 900px; margin: 2rem auto; padding: 0 1rem; background: #0d1117; color: #c9d1d9; }}
  h1 {{ color: #58a6ff; }}
  .layout {{ display: flex; gap: 1.5rem; }}
  .sessions {{ width: 12rem; }}
  .sessions a {{ display: block; color: #58a6ff; text-decoration: none; margin: 0.2em 0; }}
  .chat {{ flex: 1; }}
  .msg {{ background: #161b22; border: 1px solid #30363d; border-radius: 6px; padding: 0.6rem 0.8rem; margin: 0.5rem 0; white-space: pre-wrap; }}
  .msg.user {{ border-color: #1f6feb; }}
  .msg.error {{ border-color: #f85149; }}
  form {{ display: flex; gap: 0.5rem; margin-top: 1rem; }}
  input {{ flex: 1; padding: 0.5rem; background: #0d1117; color: #c9d1d9; border: 1px solid #30363d; border-radius: 6px; }}
  button {{ padding: 0.5rem 1rem; }}
  code {{ background: #21262d; padding: 0.2em 0.4em; border-radius: 3px; }}
</style>
</head>
<body>
<h1>wikichat</h1>
<p>Session <code id="sid">{session_id}</code> · <a href="/" style="color:#58a6ff">new chat</a> · <a href="#" id="token" style="color:#58a6ff">set token</a></p>
<div class="layout">
  <div class="sessions"><strong>Sessions</strong><div id="sessions"></div></div>
  <div class="chat">
    <div id="log"></div>
    <form id="form"><input id="message" maxlength="{max_message_chars}" autocomplete="off" placeholder="Ask anything"><button>Send</button></form>
  </div>
</div>
<script>
const sessionId = document.getElementById("sid").textContent;
const log = document.getElementById("log");
function token() {{ return localStorage.getItem("wikichat_token") || ""; }}
function headers() {{ return {{ "Content-Type": "application/json", "Authorization": "Bearer " + token() }}; }}
function add(role, text) {{
  const div = document.createElement("div");
  div.className = "msg " + role;
  div.textContent = text;
  log.appendChild(div);
}}
async function loadHistory() {{
  const r = await fetch("/history?session_id=" + encodeURIComponent(sessionId), {{ headers: headers() }});
  if (r.status === 401) {{ add("error", "Set your API token to start chatting."); return; }}
  const data = await r.json();
  log.innerHTML = "";
  data.history.forEach(m => add(m.role, m.text));
  const list = document.getElementById("sessions");
  list.innerHTML = "";
  data.sessions.forEach(s => {{
    const a = document.createElement("a");
    a.href = "/?session_id=" + encodeURIComponent(s);
    a.textContent = s;
    list.appendChild(a);
  }});
}}
document.getElementById("token").onclick = e => {{
  e.preventDefault();
  const t = prompt("API token");
  if (t !== null) {{ localStorage.setItem("wikichat_token", t.trim()); loadHistory(); }}
}};
document.getElementById("form").onsubmit = async e => {{
  e.preventDefault();
  const input = document.getElementById("message");
  const message = input.value.trim();
  if (!message) return;
  input.value = "";
  add("user", message);
  const r = await fetch("/chat?session_id=" + encodeURIComponent(sessionId), {{
    method: "POST", headers: headers(), body: JSON.stringify({{ message }})
  }});
  const data = await r.json();
  if (r.ok) {{ add("agent", data.response); loadHistory(); }}
  else {{ add("error", data.response || data.error || JSON.stringify(data)); }}
}};
loadHistory();
</script>
</body>
</html>"##
    )
}
