//! Bootstrap HTML for the browser terminal.
//!
//! One self-contained page: the terminal element, the disconnect overlay,
//! and the script tag pointing at the bundled client assets under the
//! configured base path.

/// Render the terminal bootstrap page.
///
/// When `allow_iframe` is set the overlay offers no reconnect button, since
/// an embedded terminal is reconnected by its host page.
pub fn render(title: &str, base_path: &str, allow_iframe: bool) -> String {
    let overlay_body = if allow_iframe {
        r#"<em>Disconnected. Reload the embedding page to reconnect.</em>"#.to_string()
    } else {
        r#"<button onclick="location.reload();">reconnect</button>"#.to_string()
    };

    // The markup contains `"#` (the options toggler href), so the template
    // needs double-hash raw string delimiters.
    format!(
        r##"<!doctype html>
<html lang="en">
  <head>
    <meta charset="UTF-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1.0" />
    <title>{title}</title>
    <link rel="stylesheet" href="{base}/client/main.css" />
  </head>
  <body>
    <div id="overlay">
      <div class="error">
        <div id="msg"></div>
        {overlay}
      </div>
    </div>
    <div id="options">
      <a class="toggler" href="#"><i class="fas fa-cogs"></i></a>
      <textarea class="editor"></textarea>
    </div>
    <div id="terminal"></div>
    <script type="module" src="{base}/client/main.js"></script>
  </body>
</html>
"##,
        title = escape(title),
        base = base_path,
        overlay = overlay_body,
    )
}

/// Minimal HTML escaping for the title.
fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

// =============================================================================
// Tests
// =============================================================================
