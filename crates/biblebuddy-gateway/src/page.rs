//! The single-page chat UI served at `/`.

pub const TITLE: &str = "📖 BibleBuddy";

pub const WELCOME: &str = "Welcome to BibleBuddy, your AI-powered Bible study companion! \
This application uses OpenAI's GPT-4 model to provide biblically grounded guidance and answers. \
Ask questions, seek explanations, or request study plans for any part of the Bible.";

pub const INPUT_PLACEHOLDER: &str = "Ask a question about the Bible or request study guidance...";

pub const MISSING_KEY_NOTICE: &str = "Please add your OpenAI API key to continue.";

pub const TURN_ERROR_NOTICE: &str = "Sorry, there was an error processing your request.";

pub const SIDEBAR_TITLE: &str = "About BibleBuddy";

pub const SIDEBAR_INTRO: &str = "BibleBuddy is your AI-powered Bible study companion. It can help you:";

pub const SIDEBAR_ITEMS: [&str; 4] = [
    "Understand biblical passages",
    "Explore themes and concepts",
    "Get study plans for books of the Bible",
    "Receive biblically-based guidance",
];

pub const SIDEBAR_OUTRO: &str = "All responses are grounded in scripture with verse references.";

pub const SIDEBAR_WARNING: &str = "Remember: While BibleBuddy is a helpful tool, it's not a substitute for \
personal study, prayer, or guidance from spiritual leaders.";

const TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>BibleBuddy</title>
<style>
  body { margin: 0; font-family: system-ui, sans-serif; display: flex; min-height: 100vh; color: #262730; }
  aside { width: 18rem; background: #f0f2f6; padding: 1.5rem; box-sizing: border-box; }
  aside .info { background: #e3edf9; border-radius: .5rem; padding: .75rem; }
  aside .warning { background: #fff6dd; border-radius: .5rem; padding: .75rem; margin-top: 1rem; }
  main { flex: 1; max-width: 46rem; margin: 0 auto; padding: 2rem 1rem 7rem; }
  .notice { background: #e3edf9; border-radius: .5rem; padding: .75rem; }
  .error { background: #ffe2e2; border-radius: .5rem; padding: .75rem; margin: .5rem 0; }
  .msg { padding: .75rem 1rem; border-radius: .5rem; margin: .5rem 0; }
  .msg .body p, .msg .body ul, .msg .body ol { margin: .4rem 0; }
  .msg .body pre { background: #f6f8fa; padding: .5rem; border-radius: .25rem; overflow-x: auto; }
  .msg.user { background: #f0f2f6; }
  .msg.assistant { background: #fff; border: 1px solid #e6e6e6; }
  .msg .role { font-size: .75rem; font-weight: 600; text-transform: uppercase; opacity: .6; }
  form { position: fixed; bottom: 0; left: 18rem; right: 0; padding: 1rem; background: #fff; display: flex; gap: .5rem; }
  form input { flex: 1; padding: .75rem; border: 1px solid #ccc; border-radius: .5rem; }
  form button { padding: .75rem 1.25rem; border: 0; border-radius: .5rem; background: #ff4b4b; color: #fff; }
  form input:disabled, form button:disabled { opacity: .5; }
</style>
</head>
<body>
<aside>
  <h2>{{SIDEBAR_TITLE}}</h2>
  <div class="info">
    <p>{{SIDEBAR_INTRO}}</p>
    <ul>{{SIDEBAR_ITEMS}}</ul>
    <p>{{SIDEBAR_OUTRO}}</p>
  </div>
  <div class="warning">{{SIDEBAR_WARNING}}</div>
</aside>
<main>
  <h1>{{TITLE}}</h1>
  <p>{{WELCOME}}</p>
  <div id="notice" class="notice" hidden>🗝️ {{MISSING_KEY_NOTICE}}</div>
  <div id="transcript"></div>
  <div id="status"></div>
</main>
<form id="chat">
  <input id="prompt" autocomplete="off" placeholder="{{INPUT_PLACEHOLDER}}" disabled>
  <button type="submit" disabled>Send</button>
</form>
<script>
(function () {
  const transcript = document.getElementById("transcript");
  const statusBox = document.getElementById("status");
  const form = document.getElementById("chat");
  const input = document.getElementById("prompt");
  const button = form.querySelector("button");
  let sessionId = null;

  function render(messages) {
    transcript.replaceChildren();
    for (const m of messages) {
      const div = document.createElement("div");
      div.className = "msg " + m.role;
      const role = document.createElement("div");
      role.className = "role";
      role.textContent = m.role;
      const body = document.createElement("div");
      body.className = "body";
      // Server-rendered markdown; raw HTML in the content is escaped.
      body.innerHTML = m.html;
      div.append(role, body);
      transcript.append(div);
    }
    window.scrollTo(0, document.body.scrollHeight);
  }

  function setBusy(busy) {
    input.disabled = busy;
    button.disabled = busy;
    statusBox.textContent = busy ? "Thinking..." : "";
  }

  function showError(message) {
    const div = document.createElement("div");
    div.className = "error";
    div.textContent = "{{TURN_ERROR_NOTICE}}" + (message ? " (" + message + ")" : "");
    transcript.append(div);
  }

  async function start() {
    const status = await fetch("/api/status").then(r => r.json());
    if (!status.credential_configured) {
      document.getElementById("notice").hidden = false;
      return;
    }
    const created = await fetch("/api/sessions", { method: "POST" }).then(r => r.json());
    sessionId = created.session_id;
    setBusy(false);
    input.focus();
  }

  form.addEventListener("submit", async function (event) {
    event.preventDefault();
    const content = input.value;
    if (!sessionId || !content.trim()) return;
    input.value = "";
    setBusy(true);
    try {
      const resp = await fetch("/api/sessions/" + sessionId + "/turns", {
        method: "POST",
        headers: { "Content-Type": "application/json" },
        body: JSON.stringify({ content: content }),
      });
      const body = await resp.json();
      if (resp.ok) {
        render(body.messages);
      } else {
        const history = await fetch("/api/sessions/" + sessionId + "/messages").then(r => r.json());
        if (history.messages) render(history.messages);
        showError(body.error && body.error.message);
      }
    } catch (err) {
      showError(String(err));
    } finally {
      setBusy(false);
      input.focus();
    }
  });

  start().catch(err => showError(String(err)));
})();
</script>
</body>
</html>
"#;

/// Renders the page. The strings are fixed, so this runs once at startup.
pub fn render_index() -> String {
    let items: String = SIDEBAR_ITEMS
        .iter()
        .map(|item| format!("<li>{}</li>", escape(item)))
        .collect();

    TEMPLATE
        .replace("{{TITLE}}", &escape(TITLE))
        .replace("{{WELCOME}}", &escape(WELCOME))
        .replace("{{MISSING_KEY_NOTICE}}", &escape(MISSING_KEY_NOTICE))
        .replace("{{INPUT_PLACEHOLDER}}", &escape(INPUT_PLACEHOLDER))
        .replace("{{TURN_ERROR_NOTICE}}", &escape(TURN_ERROR_NOTICE))
        .replace("{{SIDEBAR_TITLE}}", &escape(SIDEBAR_TITLE))
        .replace("{{SIDEBAR_INTRO}}", &escape(SIDEBAR_INTRO))
        .replace("{{SIDEBAR_ITEMS}}", &items)
        .replace("{{SIDEBAR_OUTRO}}", &escape(SIDEBAR_OUTRO))
        .replace("{{SIDEBAR_WARNING}}", &escape(SIDEBAR_WARNING))
}

pub(crate) fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
