//! The development server.
//!
//! A thin static file server over the output directory. Before a page
//! request is answered, the corresponding input file (and its ancestor index
//! chain) is re-rendered on demand — single file, no batching — so edits
//! show up on refresh without a watcher. A request for a path the current
//! pass does not know about triggers a full render, which picks up new
//! files.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::extract::{Request, State};
use axum::http::{Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Redirect, Response};
use tower_http::services::ServeDir;
use tracing::{debug, info, warn};

use skiff::render::{RenderPass, Site};

use crate::ServeArgs;

struct ServeState {
    site: Site,
    pass: Mutex<RenderPass>,
}

pub async fn run(args: &ServeArgs) -> Result<(), anyhow::Error> {
    let site = args.site.to_site();

    // Initial full render; serve requests keep it fresh from here.
    let pass = {
        let site = site.clone();
        tokio::task::spawn_blocking(move || site.render(false)).await??
    };

    let output_dir = site.output_dir.clone();
    let state = Arc::new(ServeState {
        site,
        pass: Mutex::new(pass),
    });

    let serve_dir = ServeDir::new(&output_dir).append_index_html_on_directories(true);

    let app = Router::new()
        .fallback_service(serve_dir)
        .layer(middleware::from_fn_with_state(state.clone(), refresh));

    let addr: SocketAddr = ([127, 0, 0, 1], args.port).into();
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) if err.kind() == std::io::ErrorKind::AddrInUse => {
            return Err(anyhow::anyhow!("Port {} is already in use", args.port));
        }
        Err(err) => return Err(err.into()),
    };

    let url = format!("http://localhost:{}", args.port);
    info!("Serving the site at {url}");

    if args.open
        && let Err(err) = open::that(&url)
    {
        warn!("Failed to open browser: {err}");
    }

    axum::serve(listener, app).await?;

    Ok(())
}

/// Re-render the requested file before the static server answers.
async fn refresh(
    State(state): State<Arc<ServeState>>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    if method != Method::GET && method != Method::HEAD {
        return next.run(request).await;
    }

    let path = request.uri().path().to_string();

    let prefix = {
        let pass = state.pass.lock().expect("server state poisoned");
        pass.config.prefix.clone()
    };

    // Requests outside the site prefix are redirected into it, mirroring how
    // the published site would behave behind the prefix.
    if !prefix.is_empty() && !path.starts_with(&prefix) {
        return Redirect::temporary(&format!("{prefix}{path}")).into_response();
    }

    let mut relative = path
        .strip_prefix(&prefix)
        .unwrap_or(&path)
        .trim_start_matches('/')
        .to_string();
    if relative.is_empty() || relative.ends_with('/') {
        relative.push_str("index.html");
    }

    let render_result =
        tokio::task::spawn_blocking(move || rerender(&state, &relative)).await;

    match render_result {
        Ok(Ok(())) => next.run(request).await,
        Ok(Err(err)) => {
            (StatusCode::INTERNAL_SERVER_ERROR, format!("Error! {err:#}")).into_response()
        }
        Err(join_err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Error! {join_err}"),
        )
            .into_response(),
    }
}

/// Map an output-relative request path back to its input file and re-render
/// it. Unknown paths are left to the static server's 404.
fn rerender(state: &ServeState, relative: &str) -> Result<(), anyhow::Error> {
    let input_path = state.site.input_dir.join(relative);
    let markdown_path = input_path.with_extension("md");

    let target = if input_path.is_file() {
        input_path
    } else if markdown_path.is_file() {
        markdown_path
    } else {
        return Ok(());
    };

    debug!("Re-rendering '{}' on demand", target.display());

    let mut pass = state.pass.lock().expect("server state poisoned");
    if !pass.render_one(&target)? {
        // A file the last pass never saw: rediscover everything.
        *pass = state.site.render(false)?;
    }

    Ok(())
}
