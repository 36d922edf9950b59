#![allow(dead_code)]

use segroute::{HandlerRequest, HandlerResponse};
use serde_json::json;
use std::io;
use std::sync::{Arc, Mutex};

/// Handler that reports the matched pattern and captured params.
pub fn describe(req: &HandlerRequest) -> HandlerResponse {
    HandlerResponse::json(
        200,
        json!({
            "route": req.route_path(),
            "params": req.path_params_map(),
            "input": req.input,
        }),
    )
}

pub fn request(method: http::Method, uri: &str) -> http::Request<Vec<u8>> {
    http::Request::builder()
        .method(method)
        .uri(uri)
        .body(Vec::new())
        .unwrap()
}

pub fn get(uri: &str) -> http::Request<Vec<u8>> {
    request(http::Method::GET, uri)
}

/// In-memory log writer shared between a sink and the test.
#[derive(Clone, Default)]
pub struct Capture(Arc<Mutex<Vec<u8>>>);

impl Capture {
    pub fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }

    /// One parsed JSON object per emitted event.
    pub fn events(&self) -> Vec<serde_json::Value> {
        self.contents()
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }
}

impl io::Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub mod temp_files {
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Temporary file with the given extension, removed on drop.
    pub fn create_temp(content: &str, ext: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new()
            .prefix("segroute_test_")
            .suffix(&format!(".{ext}"))
            .tempfile()
            .unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    pub fn create_temp_yaml(content: &str) -> NamedTempFile {
        create_temp(content, "yaml")
    }

    pub fn create_temp_json(content: &str) -> NamedTempFile {
        create_temp(content, "json")
    }
}
