//! Form pages.
//!
//! Both pages post the four fields to `/api/ticket/:platform`, show the
//! returned PNG as a preview and offer it as a download. The mobile page also
//! reports the viewport width and regenerates the preview when it changes.

use axum::{extract::State, response::Html};
use std::sync::Arc;

use crate::config::{Field, Platform, TicketConfig};

use super::super::state::AppState;

/// Handle GET / - desktop form.
pub async fn desktop(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(render_page(&state.ticket, Platform::Desktop))
}

/// Handle GET /mobile - mobile form.
pub async fn mobile(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(render_page(&state.ticket, Platform::Mobile))
}

fn render_page(config: &TicketConfig, platform: Platform) -> String {
    let fields: String = Field::ALL
        .iter()
        .map(|field| {
            format!(
                r#"    <label>{label}<input type="text" name="{key}" placeholder="{placeholder}"></label>
"#,
                label = field_label(*field),
                key = field.form_key(),
                placeholder = escape_html(config.defaults.get(*field)),
            )
        })
        .collect();

    let (viewport_input, width_style) = match platform {
        Platform::Desktop => ("", format!("{}px", config.canvas.width)),
        Platform::Mobile => (
            r#"    <input type="hidden" name="viewportWidth" id="viewportWidth">
"#,
            "100%".to_string(),
        ),
    };

    PAGE.replace("{{platform}}", platform.as_str())
        .replace("{{fields}}", &fields)
        .replace("{{viewport_input}}", viewport_input)
        .replace("{{preview_width}}", &width_style)
        .replace("{{file_name}}", &escape_html(&config.download_file_name))
        .replace("{{mobile}}", if platform == Platform::Mobile { "true" } else { "false" })
}

fn field_label(field: Field) -> &'static str {
    match field {
        Field::Origin => "出发地",
        Field::Destination => "目的地",
        Field::Name => "姓名",
        Field::Date => "日期",
    }
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

const PAGE: &str = r#"<!DOCTYPE html>
<html lang="zh-CN">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>ticket-stamp</title>
  <style>
    body { font-family: sans-serif; margin: 1rem; }
    form label { display: block; margin: 0.4rem 0; }
    form input[type=text] { margin-left: 0.5rem; }
    #preview { max-width: {{preview_width}}; display: block; margin-top: 1rem; }
    #download[aria-disabled=true] { pointer-events: none; opacity: 0.4; }
  </style>
</head>
<body>
  <form id="ticket" action="/api/ticket/{{platform}}" method="post">
{{fields}}{{viewport_input}}    <button type="submit" id="generate">生成图片</button>
    <a id="download" download="{{file_name}}" aria-disabled="true">下载图片</a>
  </form>
  <img id="preview" alt="">
  <script>
    const form = document.getElementById('ticket');
    const button = document.getElementById('generate');
    const link = document.getElementById('download');
    const preview = document.getElementById('preview');
    const mobile = {{mobile}};

    async function generate() {
      if (mobile) {
        document.getElementById('viewportWidth').value = window.innerWidth;
      }
      button.disabled = true;
      link.setAttribute('aria-disabled', 'true');
      try {
        const response = await fetch(form.action, {
          method: 'POST',
          body: new URLSearchParams(new FormData(form)),
        });
        if (!response.ok) {
          alert(await response.text());
          return;
        }
        const url = URL.createObjectURL(await response.blob());
        if (preview.src) URL.revokeObjectURL(preview.src);
        preview.src = url;
        link.href = url;
        link.setAttribute('aria-disabled', 'false');
      } finally {
        button.disabled = false;
      }
    }

    form.addEventListener('submit', (event) => {
      event.preventDefault();
      generate();
    });

    if (mobile) {
      let timer;
      window.addEventListener('resize', () => {
        clearTimeout(timer);
        timer = setTimeout(() => { if (preview.src) generate(); }, 200);
      });
    }
  </script>
</body>
</html>
"#;
