//! Progress bars for index builds, with log output routed above them.

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io::{self, Write};
use std::sync::OnceLock;
use tracing_subscriber::fmt::MakeWriter;

static MULTI_PROGRESS: OnceLock<MultiProgress> = OnceLock::new();

const EMBED_TEMPLATE: &str =
    "{spinner:.green} {msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({eta})";

fn multi_progress() -> &'static MultiProgress {
    MULTI_PROGRESS.get_or_init(|| {
        let mp = MultiProgress::new();
        mp.set_draw_target(ProgressDrawTarget::stderr_with_hz(10));
        mp
    })
}

/// Progress bar counting embedded chunks during a build
pub fn embedding_progress_bar(total_chunks: u64, model: &str) -> ProgressBar {
    let bar = multi_progress().add(ProgressBar::new(total_chunks));
    if let Ok(style) = ProgressStyle::with_template(EMBED_TEMPLATE) {
        bar.set_style(style.progress_chars("=> "));
    }
    bar.set_message(format!("Embedding with {}", model));
    bar
}

fn emit_line(line: &str) {
    let _ = multi_progress().println(line.trim_end_matches('\r'));
}

/// `tracing` writer factory whose lines are printed above active progress bars
#[derive(Default, Clone)]
pub struct LogWriterFactory;

/// Line-buffered writer handed out by [`LogWriterFactory`]
pub struct LogWriter {
    buffer: String,
}

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.push_str(&String::from_utf8_lossy(buf));
        while let Some(idx) = self.buffer.find('\n') {
            emit_line(&self.buffer[..idx]);
            self.buffer.drain(..=idx);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.buffer.is_empty() {
            emit_line(&self.buffer);
            self.buffer.clear();
        }
        Ok(())
    }
}

impl Drop for LogWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

impl<'a> MakeWriter<'a> for LogWriterFactory {
    type Writer = LogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogWriter {
            buffer: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writer_buffers_partial_lines() {
        let mut writer = LogWriterFactory.make_writer();
        writer.write_all(b"Embedding batch 1/3").unwrap();
        assert_eq!(writer.buffer, "Embedding batch 1/3");

        writer.write_all(b" done\nnext").unwrap();
        assert_eq!(writer.buffer, "next");

        writer.flush().unwrap();
        assert!(writer.buffer.is_empty());
    }

    #[test]
    fn test_embedding_bar_tracks_chunks() {
        let bar = embedding_progress_bar(10, "fake-embedder");
        bar.inc(4);
        assert_eq!(bar.position(), 4);
        assert_eq!(bar.length(), Some(10));
        bar.finish_and_clear();
    }
}
