use axum::body::Body;
use axum::extract::Request;
use axum::handler::HandlerWithoutStateExt;
use axum::response::{Html, Response};
use std::convert::Infallible;
use std::path::Path;
use tower::util::BoxCloneService;
use tower::ServiceExt;
use tower_http::services::ServeDir;

/// Service type used as the router fallback
pub type StaticService = BoxCloneService<Request, Response, Infallible>;

/// Serve files from `dir`, or the built-in monitor page if it does not exist
///
/// Files missing from an existing directory are answered with 404.
pub fn static_service(dir: &Path) -> StaticService {
    if !dir.is_dir() {
        tracing::warn!(
            dir = %dir.display(),
            "Static directory not found, serving built-in monitor page"
        );
        return BoxCloneService::new(monitor_page.into_service());
    }

    let files = ServeDir::new(dir).append_index_html_on_directories(true);
    BoxCloneService::new(ServiceExt::<Request>::map_response(files, |response| {
        response.map(Body::new)
    }))
}

/// Minimal live monitor used when no static site is deployed
pub async fn monitor_page() -> Html<&'static str> {
    Html(MONITOR_HTML)
}

const MONITOR_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>ICRA Browsing Monitor</title>
    <style>
        body { font-family: sans-serif; background: #111827; color: #f3f4f6; margin: 2rem; }
        h1 { color: #60a5fa; }
        #status { color: #9ca3af; }
        table { width: 100%; border-collapse: collapse; font-family: monospace; }
        td, th { padding: 0.25rem 0.5rem; text-align: left; border-bottom: 1px solid #374151; }
    </style>
</head>
<body>
    <h1>Browsing Monitor</h1>
    <p id="status">Connecting...</p>
    <table>
        <thead><tr><th>Time</th><th>Identity</th><th>Resource</th></tr></thead>
        <tbody id="visits"></tbody>
    </table>

    <script>
        const STREAM_LIMIT = 50;
        const scheme = window.location.protocol === 'https:' ? 'wss' : 'ws';
        const ws = new WebSocket(`${scheme}://${window.location.host}/ws/browsing`);
        const status = document.getElementById('status');
        const visits = document.getElementById('visits');

        function formatUri(uri) {
            let text = `${uri.protocol}://${uri.hostname}`;
            if (uri.port !== null) text += `:${uri.port}`;
            if (uri.path !== null) text += uri.path;
            return text;
        }

        ws.onopen = () => { status.textContent = 'Connected'; };
        ws.onclose = () => { status.textContent = 'Disconnected'; };

        ws.onmessage = (event) => {
            const visit = JSON.parse(event.data);
            const row = document.createElement('tr');
            for (const text of [
                new Date(visit.timestamp).toLocaleTimeString(),
                visit.identity,
                formatUri(visit.uri),
            ]) {
                const cell = document.createElement('td');
                cell.textContent = text;
                row.appendChild(cell);
            }
            visits.insertBefore(row, visits.firstChild);
            while (visits.children.length > STREAM_LIMIT) {
                visits.removeChild(visits.lastChild);
            }
        };
    </script>
</body>
</html>
"#;
