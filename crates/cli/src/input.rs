//! Line input shared by the prompt loop and the confirmation gateway.

use tokio::sync::{Mutex, mpsc};

/// A queue of lines typed by the user.
///
/// Only one reader receives each line: the REPL while idle, the
/// confirmation gateway while a tool waits for approval.
pub struct LineInput {
    rx: Mutex<mpsc::Receiver<String>>,
}

impl LineInput {
    /// Read lines from stdin on a dedicated thread.
    pub fn stdin() -> Self {
        let (tx, rx) = mpsc::channel(16);
        std::thread::spawn(move || {
            for line in std::io::stdin().lines() {
                let Ok(line) = line else { break };
                if tx.blocking_send(line).is_err() {
                    break;
                }
            }
        });
        Self { rx: Mutex::new(rx) }
    }

    #[cfg(test)]
    pub fn scripted(lines: &[&str]) -> Self {
        let (tx, rx) = mpsc::channel(lines.len().max(1));
        for line in lines {
            let _ = tx.try_send(line.to_string());
        }
        Self { rx: Mutex::new(rx) }
    }

    /// The next line, or `None` once input is closed.
    pub async fn next_line(&self) -> Option<String> {
        self.rx.lock().await.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_lines_then_eof() {
        let input = LineInput::scripted(&["one", "two"]);
        assert_eq!(input.next_line().await.as_deref(), Some("one"));
        assert_eq!(input.next_line().await.as_deref(), Some("two"));
        assert_eq!(input.next_line().await, None);
    }
}
