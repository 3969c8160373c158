//! In-memory backend and recording UI shared by the unit tests.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::client::ImagineBackend;
use crate::controllers::PreviewFrame;
use crate::error::{ImagineError, Result};
use crate::models::{
    GenerateRequest, GenerateResponse, GeneratedImage, ModelInfo, ReturnedImage, SourceImage,
    UploadFile, UploadResponse,
};
use crate::ui::Ui;

type Scripted<T> = (Option<Duration>, Result<T>);

#[derive(Default)]
pub struct MockBackend {
    uploads: Mutex<VecDeque<Scripted<UploadResponse>>>,
    generations: Mutex<VecDeque<Scripted<GenerateResponse>>>,
    model: Mutex<Option<String>>,
    upload_log: Mutex<Vec<UploadFile>>,
    generate_log: Mutex<Vec<GenerateRequest>>,
}

impl MockBackend {
    pub fn push_upload(&self, reply: Result<UploadResponse>) {
        self.uploads.lock().unwrap().push_back((None, reply));
    }

    pub fn push_upload_delayed(&self, delay: Duration, reply: Result<UploadResponse>) {
        self.uploads.lock().unwrap().push_back((Some(delay), reply));
    }

    pub fn push_generate(&self, reply: Result<GenerateResponse>) {
        self.generations.lock().unwrap().push_back((None, reply));
    }

    pub fn push_generate_delayed(&self, delay: Duration, reply: Result<GenerateResponse>) {
        self.generations.lock().unwrap().push_back((Some(delay), reply));
    }

    pub fn set_model(&self, model: &str) {
        *self.model.lock().unwrap() = Some(model.to_string());
    }

    pub fn upload_calls(&self) -> usize {
        self.upload_log.lock().unwrap().len()
    }

    pub fn generate_calls(&self) -> usize {
        self.generate_log.lock().unwrap().len()
    }

    pub fn last_generate(&self) -> Option<GenerateRequest> {
        self.generate_log.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ImagineBackend for MockBackend {
    async fn upload(&self, file: UploadFile) -> Result<UploadResponse> {
        self.upload_log.lock().unwrap().push(file);
        let (delay, reply) = self
            .uploads
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or((None, Err(ImagineError::RequestError("no scripted upload".into()))));
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        reply
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse> {
        self.generate_log.lock().unwrap().push(request.clone());
        let (delay, reply) = self
            .generations
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or((None, Err(ImagineError::RequestError("no scripted generation".into()))));
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        reply
    }

    async fn model_info(&self) -> Result<ModelInfo> {
        match self.model.lock().unwrap().clone() {
            Some(model) => Ok(ModelInfo { model }),
            None => Err(ImagineError::RequestError("model server offline".into())),
        }
    }

    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>> {
        Ok(url.as_bytes().to_vec())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    Alert(String),
    GenerateEnabled(bool),
    Progress(u8),
    ProgressHidden,
    SourcePreview(String),
    SourceCleared,
    FilePickerReset,
    Gallery(usize),
    Preview(usize),
    PreviewClosed,
}

#[derive(Default)]
pub struct RecordingUi {
    events: Mutex<Vec<UiEvent>>,
}

impl RecordingUi {
    fn push(&self, event: UiEvent) {
        self.events.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<UiEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn alerts(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                UiEvent::Alert(message) => Some(message),
                _ => None,
            })
            .collect()
    }
}

impl Ui for RecordingUi {
    fn alert(&self, message: &str) {
        self.push(UiEvent::Alert(message.to_string()));
    }

    fn set_generate_enabled(&self, enabled: bool) {
        self.push(UiEvent::GenerateEnabled(enabled));
    }

    fn show_progress(&self, percent: u8) {
        self.push(UiEvent::Progress(percent));
    }

    fn hide_progress(&self) {
        self.push(UiEvent::ProgressHidden);
    }

    fn show_source_preview(&self, image: &SourceImage) {
        self.push(UiEvent::SourcePreview(image.filename.clone()));
    }

    fn clear_source_preview(&self) {
        self.push(UiEvent::SourceCleared);
    }

    fn reset_file_picker(&self) {
        self.push(UiEvent::FilePickerReset);
    }

    fn render_gallery(&self, images: &[GeneratedImage]) {
        self.push(UiEvent::Gallery(images.len()));
    }

    fn render_preview(&self, frame: &PreviewFrame) {
        self.push(UiEvent::Preview(frame.index));
    }

    fn close_preview(&self) {
        self.push(UiEvent::PreviewClosed);
    }
}

pub fn image(name: &str) -> GeneratedImage {
    GeneratedImage {
        url: format!("/generated/{}.png", name),
        filename: format!("{}.png", name),
        prompt: name.to_string(),
        seed: None,
        model: String::new(),
        width: 1024,
        height: 1024,
        source_image: None,
        settings: None,
    }
}

pub fn returned(name: &str, prompt: &str, seed: i64) -> ReturnedImage {
    ReturnedImage {
        url: format!("/generated/{}.png", name),
        filename: format!("{}.png", name),
        prompt: prompt.to_string(),
        seed: Some(seed),
        width: None,
        height: None,
        source_image: None,
    }
}

pub fn png(name: &str) -> UploadFile {
    UploadFile::new(name, "image/png", vec![0x89, 0x50, 0x4e, 0x47])
}

/// Accepts a single HTTP connection on a local port, answers it with
/// `status` and a JSON `body`, and yields the raw request it received.
pub async fn serve_once(status: &str, body: &str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_request(&mut socket).await;
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.unwrap();
        request
    });
    (base_url, handle)
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut raw = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = socket.read(&mut buf).await.unwrap();
        if n == 0 {
            break;
        }
        raw.extend_from_slice(&buf[..n]);
        if request_complete(&raw) {
            break;
        }
    }
    String::from_utf8_lossy(&raw).into_owned()
}

fn request_complete(raw: &[u8]) -> bool {
    let text = String::from_utf8_lossy(raw);
    let Some(split) = text.find("\r\n\r\n") else {
        return false;
    };
    let head = text[..split].to_ascii_lowercase();
    let body_len = raw.len() - (split + 4);

    let content_length = head
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|value| value.trim().parse::<usize>().ok());
    match content_length {
        Some(expected) => body_len >= expected,
        None if head.contains("transfer-encoding: chunked") => text.ends_with("0\r\n\r\n"),
        None => true,
    }
}
