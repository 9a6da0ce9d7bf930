//! 子进程输出的双路消费：实时转发到终端，同时保留一份内存副本

use std::io::Write;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

/// 可在读取任务与执行器之间共享的输出缓冲
///
/// 读取任务被中止时，已经写入的部分依然保留。
#[derive(Debug, Clone, Default)]
pub struct CaptureBuffer {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl CaptureBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    fn append(&self, bytes: &[u8]) {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend_from_slice(bytes);
    }

    /// 当前已捕获的内容，非UTF-8字节按替换字符处理
    pub fn contents(&self) -> String {
        let bytes = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamTarget {
    Stdout,
    Stderr,
}

/// 按行读取一个输出流，写入缓冲并按需转发到终端
///
/// 转发的每一行带 `[id]` 前缀，并行模式下交错的输出仍可区分来源。
#[derive(Debug, Clone)]
pub struct OutputTee {
    job_id: i64,
    target: StreamTarget,
    echo: bool,
    buffer: CaptureBuffer,
}

impl OutputTee {
    pub fn new(job_id: i64, target: StreamTarget, echo: bool, buffer: CaptureBuffer) -> Self {
        Self {
            job_id,
            target,
            echo,
            buffer,
        }
    }

    /// 读到EOF为止
    pub async fn pump<R>(self, reader: R) -> std::io::Result<()>
    where
        R: AsyncRead + Unpin,
    {
        let mut reader = BufReader::new(reader);
        let mut line = Vec::new();
        loop {
            line.clear();
            if reader.read_until(b'\n', &mut line).await? == 0 {
                break;
            }
            self.buffer.append(&line);
            if self.echo {
                self.echo_line(&line);
            }
        }
        Ok(())
    }

    fn echo_line(&self, line: &[u8]) {
        let text = String::from_utf8_lossy(line);
        let text = text.trim_end_matches(['\r', '\n']);
        // 整行一次写出，避免并发任务的输出在行内交错
        let _ = match self.target {
            StreamTarget::Stdout => writeln!(std::io::stdout().lock(), "[{}] {}", self.job_id, text),
            StreamTarget::Stderr => writeln!(std::io::stderr().lock(), "[{}] {}", self.job_id, text),
        };
    }
}
