use crate::http::{Request, Status};
use crate::method::{Method, MethodSet};
use crate::response::Response;
use crate::router::Handler;
use log::{error, warn};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Get the content type for a file based on its extension
fn get_content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" => "text/javascript",
        "txt" | "hpp" | "rs" => "text/plain",
        "md" => "text/markdown",
        "csv" => "text/csv",
        "json" => "application/json",
        "xml" => "application/xml",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        "wasm" => "application/wasm",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        _ => "application/octet-stream",
    }
}

/// Serves files below a root directory.
///
/// The full request path is appended to the root; directories are answered
/// with their index file. Only GET is allowed.
#[derive(Debug, Clone)]
pub struct FileHandler {
    root: PathBuf,
    index_file: String,
}

impl FileHandler {
    /// Create a handler serving files from `root`
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            index_file: "index.html".to_string(),
        }
    }

    /// Use a different file name for directory requests
    pub fn with_index_file(mut self, index_file: &str) -> Self {
        self.index_file = index_file.to_string();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a request path onto the filesystem, refusing to climb out of the root
    fn resolve(&self, request_path: &str) -> Option<PathBuf> {
        let path = request_path.split('?').next().unwrap_or("");

        let mut fs_path = self.root.clone();
        for segment in path.split('/') {
            match segment {
                "" | "." => continue,
                ".." => return None,
                _ => fs_path.push(segment),
            }
        }

        if fs_path.is_dir() {
            fs_path.push(&self.index_file);
        }
        Some(fs_path)
    }
}

impl Handler for FileHandler {
    fn handle(&self, request: &Request, response: &mut Response) {
        if request.method() != &Method::Get {
            response
                .set_status(Status::MethodNotAllowed)
                .set_header("Allow", &MethodSet::GET.to_string());
            return;
        }

        let Some(path) = self.resolve(request.path()) else {
            warn!("Rejected path outside document root: {}", request.path());
            response.set_status(Status::NotFound);
            return;
        };

        match fs::read(&path) {
            Ok(contents) => {
                response
                    .set_status(Status::Ok)
                    .set_header("Content-Type", get_content_type(&path));
                if let Err(e) = response.write_body(&contents) {
                    error!("Error sending {}: {}", path.display(), e);
                }
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                response.set_status(Status::NotFound);
            }
            Err(e) => {
                error!("Error reading {}: {}", path.display(), e);
                response.set_status(Status::InternalServerError);
            }
        }
    }
}
