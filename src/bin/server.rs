#[cfg(target_arch = "wasm32")]
fn main() {}

#[cfg(not(target_arch = "wasm32"))]
use clap::Parser;
#[cfg(not(target_arch = "wasm32"))]
use simple_logger::SimpleLogger;
#[cfg(not(target_arch = "wasm32"))]
use std::fs;
#[cfg(not(target_arch = "wasm32"))]
use std::io::Cursor;
#[cfg(not(target_arch = "wasm32"))]
use std::path::{Path, PathBuf};
#[cfg(not(target_arch = "wasm32"))]
use tiny_http::{Header, Request, Response, Server, StatusCode};

/// Serves the browser client (markup, stylesheet and wasm bundle) for local play.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Parser, Debug)]
struct Opts {
    /// Address to serve the page on
    #[arg(long, default_value = "127.0.0.1:8080")]
    listen: String,
    /// Directory holding index.html and the wasm-pack output under pkg/
    #[arg(long, default_value = "web")]
    root: PathBuf,
    /// Diagnostics level
    #[arg(long, default_value = "info")]
    log_level: log::LevelFilter,
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    let opts = Opts::parse();
    SimpleLogger::new().with_level(opts.log_level).init()?;

    let root = opts
        .root
        .canonicalize()
        .map_err(|e| anyhow::anyhow!("page directory {}: {}", opts.root.display(), e))?;
    if !root.join("pkg").exists() {
        log::warn!(
            "{} has no pkg/ directory; build it with `wasm-pack build --target web --out-dir {}/pkg`",
            root.display(),
            opts.root.display()
        );
    }

    let server = Server::http(&opts.listen).map_err(|e| anyhow::anyhow!("bind {}: {}", opts.listen, e))?;
    println!("Serving {} on http://{}", root.display(), opts.listen);
    for request in server.incoming_requests() {
        serve(&root, request);
    }
    Ok(())
}

#[cfg(not(target_arch = "wasm32"))]
fn serve(root: &Path, request: Request) {
    let url = request.url().to_string();
    let method = request.method().to_string();
    let path = resolve(root, url.split('?').next().unwrap_or("/"));
    let file = path.as_ref().and_then(|p| fs::File::open(p).ok());
    let (status, result) = match (path, file) {
        (Some(path), Some(file)) => {
            let mut resp = Response::from_file(file).with_status_code(StatusCode(200));
            if let Ok(h) = Header::from_bytes("Content-Type", content_type_for(&path).as_bytes()) {
                resp.add_header(h);
            }
            (200, request.respond(resp))
        }
        _ => (404, request.respond(not_found_response())),
    };
    if let Err(e) = result {
        log::warn!("{} {}: {}", method, url, e);
    }
    log::info!("{} {} -> {}", method, url, status);
}

/// Maps a request path onto a file under `root`, refusing anything that
/// escapes it.
#[cfg(not(target_arch = "wasm32"))]
fn resolve(root: &Path, url: &str) -> Option<PathBuf> {
    let rel = url.trim_start_matches('/');
    let mut path = root.join(if rel.is_empty() { "index.html" } else { rel });
    if path.is_dir() {
        path = path.join("index.html");
    }
    let path = path.canonicalize().ok()?;
    (path.is_file() && path.starts_with(root)).then_some(path)
}

#[cfg(not(target_arch = "wasm32"))]
fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()).unwrap_or("") {
        "html" => "text/html; charset=utf-8",
        "js" => "application/javascript",
        "css" => "text/css",
        "wasm" => "application/wasm",
        "json" => "application/json",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn not_found_response() -> Response<Cursor<Vec<u8>>> {
    Response::from_string("Not Found").with_status_code(StatusCode(404))
}
