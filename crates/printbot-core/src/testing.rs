//! In-memory fakes of the ports, shared by unit tests.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Barrier;

use crate::{
    domain::{ChatId, MessageId, MessageRef},
    errors::Error,
    messaging::{
        port::{FilePort, MessagingPort},
        types::{MessagingCapabilities, RemoteFile},
    },
    print::{JobReport, PrintPort},
    Result,
};

// ============== Messenger ==============

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Sent {
    Text(ChatId, String),
    Reply(MessageRef, String),
}

impl Sent {
    pub fn text(&self) -> &str {
        match self {
            Sent::Text(_, t) | Sent::Reply(_, t) => t,
        }
    }
}

#[derive(Default)]
pub struct FakeMessenger {
    next_id: Mutex<i32>,
    sent: Mutex<Vec<Sent>>,
    fail_sends: bool,
    max_message_len: Option<usize>,
}

impl FakeMessenger {
    pub fn failing() -> Self {
        Self {
            fail_sends: true,
            ..Self::default()
        }
    }

    pub fn with_max_message_len(max: usize) -> Self {
        Self {
            max_message_len: Some(max),
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.sent().iter().map(|s| s.text().to_string()).collect()
    }

    fn alloc(&self, chat_id: ChatId) -> MessageRef {
        let mut guard = self.next_id.lock().unwrap();
        *guard += 1;
        MessageRef {
            chat_id,
            message_id: MessageId(1000 + *guard),
        }
    }

    fn record(&self, sent: Sent) -> Result<()> {
        self.sent.lock().unwrap().push(sent);
        if self.fail_sends {
            return Err(Error::SendFailed("chat not found".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl MessagingPort for FakeMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        MessagingCapabilities {
            supports_replies: true,
            max_message_len: self.max_message_len.unwrap_or(4096),
        }
    }

    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageRef> {
        self.record(Sent::Text(chat_id, text.to_string()))?;
        Ok(self.alloc(chat_id))
    }

    async fn reply_text(&self, to: MessageRef, text: &str) -> Result<MessageRef> {
        self.record(Sent::Reply(to, text.to_string()))?;
        Ok(self.alloc(to.chat_id))
    }
}

// ============== Files ==============

#[derive(Clone, Debug)]
pub enum FileScript {
    Bytes(Vec<u8>),
    /// Served without the channel reporting a size.
    Unsized(Vec<u8>),
    /// Resolved with this reported size; content is never fetched.
    Sized(u64),
    ResolveFails(String),
    /// Writes `partial` and then reports a network fault.
    DownloadFails { partial: Vec<u8>, error: String },
}

#[derive(Default)]
pub struct FakeFiles {
    scripts: Mutex<HashMap<String, FileScript>>,
    resolves: AtomicUsize,
    downloads: AtomicUsize,
}

impl FakeFiles {
    pub fn with(self, file_id: &str, script: FileScript) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(file_id.to_string(), script);
        self
    }

    pub fn resolves(&self) -> usize {
        self.resolves.load(Ordering::SeqCst)
    }

    pub fn downloads(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }

    fn script(&self, file_id: &str) -> Result<FileScript> {
        self.scripts
            .lock()
            .unwrap()
            .get(file_id)
            .cloned()
            .ok_or_else(|| Error::External(format!("file not found: {file_id}")))
    }
}

#[async_trait]
impl FilePort for FakeFiles {
    async fn resolve(&self, file_id: &str) -> Result<RemoteFile> {
        self.resolves.fetch_add(1, Ordering::SeqCst);
        let size = match self.script(file_id)? {
            FileScript::Bytes(b) => Some(b.len() as u64),
            FileScript::Sized(n) => Some(n),
            FileScript::Unsized(_) => None,
            FileScript::ResolveFails(e) => return Err(Error::External(e)),
            FileScript::DownloadFails { .. } => None,
        };
        Ok(RemoteFile {
            file_id: file_id.to_string(),
            path: format!("documents/{file_id}"),
            size,
        })
    }

    async fn download(
        &self,
        file: &RemoteFile,
        dst: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<()> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        match self.script(&file.file_id)? {
            FileScript::Bytes(b) | FileScript::Unsized(b) => {
                dst.write_all(&b).await?;
                Ok(())
            }
            FileScript::DownloadFails { partial, error } => {
                dst.write_all(&partial).await?;
                dst.flush().await?;
                Err(Error::External(error))
            }
            FileScript::Sized(_) | FileScript::ResolveFails(_) => {
                Err(Error::External("unexpected download".to_string()))
            }
        }
    }
}

// ============== Printer ==============

#[derive(Clone, Debug)]
pub enum PrinterScript {
    Succeed(String),
    Fail(String),
    Unavailable(String),
    Hang,
    Panic,
}

#[derive(Clone, Debug)]
pub struct Submission {
    pub path: PathBuf,
    /// File content at the moment of submission, if it existed.
    pub content: Option<Vec<u8>>,
    /// Content re-read after the barrier (if any) was passed.
    pub content_after_wait: Option<Vec<u8>>,
}

pub struct FakePrinter {
    script: PrinterScript,
    barrier: Option<Arc<Barrier>>,
    submitted: Mutex<Vec<Submission>>,
}

impl FakePrinter {
    pub fn new(script: PrinterScript) -> Self {
        Self {
            script,
            barrier: None,
            submitted: Mutex::new(Vec::new()),
        }
    }

    /// Every submission waits until `n` submissions are in flight at once.
    pub fn rendezvous(mut self, n: usize) -> Self {
        self.barrier = Some(Arc::new(Barrier::new(n)));
        self
    }

    pub fn submitted(&self) -> Vec<Submission> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl PrintPort for FakePrinter {
    async fn submit(&self, path: &Path) -> Result<JobReport> {
        let content = tokio::fs::read(path).await.ok();
        let mut content_after_wait = None;
        if let Some(b) = &self.barrier {
            b.wait().await;
            content_after_wait = tokio::fs::read(path).await.ok();
        }
        self.submitted.lock().unwrap().push(Submission {
            path: path.to_path_buf(),
            content,
            content_after_wait,
        });

        match &self.script {
            PrinterScript::Succeed(out) => Ok(JobReport {
                exit_code: Some(0),
                stdout: out.clone(),
                stderr: String::new(),
            }),
            PrinterScript::Fail(err) => Ok(JobReport {
                exit_code: Some(1),
                stdout: String::new(),
                stderr: err.clone(),
            }),
            PrinterScript::Unavailable(e) => Err(Error::External(e.clone())),
            PrinterScript::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(JobReport::default())
            }
            PrinterScript::Panic => panic!("printer adapter panicked"),
        }
    }
}

/// Files (not directories) currently under `root`, recursively.
pub fn files_under(root: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let Ok(rd) = std::fs::read_dir(&dir) else {
            continue;
        };
        for ent in rd.flatten() {
            let p = ent.path();
            if p.is_dir() {
                stack.push(p);
            } else {
                out.push(p);
            }
        }
    }
    out.sort();
    out
}
