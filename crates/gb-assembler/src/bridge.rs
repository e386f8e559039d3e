use gb_core::{AssembledDocument, WIRE_COMPLETE, WIRE_ERROR, WIRE_HEIGHT, WIRE_STATS};

use crate::html_utils::{find_ci, insert_at, open_tag_positions};

/// Global set by the bridge script; its presence marks an injected document.
pub const BRIDGE_SENTINEL: &str = "__gameboxBridge";

const BRIDGE_TEMPLATE: &str = r#"<script data-gamebox="bridge">
(function () {
  if (window.__SENTINEL__) { return; }
  window.__SENTINEL__ = true;

  function post(type, payload) {
    if (window.parent && window.parent !== window) {
      window.parent.postMessage({ type: type, payload: payload }, '*');
    }
  }

  window.reportStats = function (stats) {
    post('__STATS__', stats);
  };
  window.reportComplete = function (score) {
    post('__COMPLETE__', { completed: true, score: score, completedAt: new Date().toISOString() });
  };
  window.sendGameStats = function (stats) {
    if (stats && stats.completed) {
      window.reportComplete(stats.score);
    } else {
      window.reportStats(stats);
    }
  };
  window.reportGameStats = window.sendGameStats;
  window.completeGame = window.reportComplete;

  window.addEventListener('error', function (event) {
    post('__ERROR__', {
      message: String(event.message || 'Unknown error'),
      source: event.filename || null,
      line: event.lineno || null,
      column: event.colno || null
    });
    event.preventDefault();
    return true;
  });

  function reportHeight() {
    var body = document.body;
    var root = document.documentElement;
    if (!body || !root) { return; }
    var height = Math.max(
      body.scrollHeight,
      body.offsetHeight,
      root.clientHeight,
      root.scrollHeight,
      root.offsetHeight
    );
    post('__HEIGHT__', { height: height });
  }

  window.addEventListener('load', reportHeight);
  window.addEventListener('resize', reportHeight);

  var observing = false;
  function observe() {
    if (observing || !document.body) { return; }
    observing = true;
    new MutationObserver(reportHeight).observe(document.body, {
      childList: true,
      subtree: true,
      attributes: true,
      characterData: true
    });
    reportHeight();
  }
  if (document.readyState === 'loading') {
    document.addEventListener('DOMContentLoaded', observe);
  } else {
    observe();
  }
})();
</script>
"#;

pub fn bridge_script() -> String {
    BRIDGE_TEMPLATE
        .replace("__SENTINEL__", BRIDGE_SENTINEL)
        .replace("__STATS__", WIRE_STATS)
        .replace("__COMPLETE__", WIRE_COMPLETE)
        .replace("__ERROR__", WIRE_ERROR)
        .replace("__HEIGHT__", WIRE_HEIGHT)
}

pub fn has_bridge(html: &str) -> bool {
    html.contains(BRIDGE_SENTINEL)
}

/// Adds the bridge script once. It goes at the end of `<head>` so the
/// reporting functions exist before any game script runs.
pub fn inject_bridge(document: AssembledDocument) -> AssembledDocument {
    if has_bridge(document.as_str()) {
        return document;
    }
    document.map_html(|html| {
        let script = bridge_script();
        let at = find_ci(&html, "</head>")
            .or_else(|| open_tag_positions(&html, "body").first().copied())
            .or_else(|| find_ci(&html, "</body>"));
        match at {
            Some(at) => insert_at(&html, at, &script),
            None => html + &script,
        }
    })
}
