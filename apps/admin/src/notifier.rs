//! Terminal rendition of the dashboard's notices and confirmation prompts.

use std::io::{self, BufRead, Write};

use async_trait::async_trait;
use client_core::{ConfirmPrompt, Notice, NoticeKind, NotificationSink};
use tracing::warn;

pub struct TerminalNotifier {
    assume_yes: bool,
}

impl TerminalNotifier {
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }
}

#[async_trait]
impl NotificationSink for TerminalNotifier {
    async fn confirm(&self, prompt: &ConfirmPrompt) -> bool {
        if self.assume_yes {
            return true;
        }

        let question = format!(
            "{} {} Delete order {}? [{}] (y/N): ",
            prompt.title, prompt.text, prompt.order_id, prompt.confirm_label
        );
        let answer = tokio::task::spawn_blocking(move || -> io::Result<String> {
            let mut stdout = io::stdout();
            stdout.write_all(question.as_bytes())?;
            stdout.flush()?;
            let mut line = String::new();
            io::stdin().lock().read_line(&mut line)?;
            Ok(line)
        })
        .await;

        match answer {
            Ok(Ok(line)) => is_affirmative(&line),
            Ok(Err(err)) => {
                warn!(error = %err, "notice: could not read confirmation, treating as decline");
                false
            }
            Err(err) => {
                warn!(error = %err, "notice: confirmation task failed, treating as decline");
                false
            }
        }
    }

    async fn notify(&self, notice: Notice) {
        let line = format_notice(&notice);
        match notice.kind {
            NoticeKind::Error => eprintln!("{line}"),
            NoticeKind::Success | NoticeKind::Info => println!("{line}"),
        }
    }
}

pub(crate) fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

pub(crate) fn format_notice(notice: &Notice) -> String {
    let mut line = format!("[{}] {}", notice.title, notice.text);
    if let Some(hint) = &notice.hint {
        line.push_str(" (");
        line.push_str(hint);
        line.push(')');
    }
    line
}
