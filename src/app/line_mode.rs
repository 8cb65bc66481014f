use crate::state::{ChatController, ChatUpdate};
use crate::types::Language;
use anyhow::Result;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;

/// Writes the growing reply as it streams, printing only the new suffix.
#[derive(Default)]
struct ReplyPrinter {
    printed: usize,
}

impl ReplyPrinter {
    fn apply<W: Write, E: Write>(
        &mut self,
        update: &ChatUpdate,
        out: &mut W,
        err: &mut E,
    ) -> Result<()> {
        match update {
            ChatUpdate::AssistantDelta { content } => {
                if let Some(fresh) = content.get(self.printed..) {
                    out.write_all(fresh.as_bytes())?;
                    out.flush()?;
                }
                self.printed = content.len();
            }
            ChatUpdate::TurnFailed { message } => {
                self.end_line(out)?;
                writeln!(err, "error: {message}")?;
            }
            _ => {}
        }
        Ok(())
    }

    fn end_line<W: Write>(&mut self, out: &mut W) -> Result<()> {
        if self.printed > 0 {
            writeln!(out)?;
            self.printed = 0;
        }
        Ok(())
    }
}

/// One user turn per non-blank input line; replies stream to `out` and
/// failures go to `err`. Returns at end of input.
pub async fn run_line_mode<R, W, E>(
    controller: &ChatController,
    updates: &mut mpsc::UnboundedReceiver<ChatUpdate>,
    language: Language,
    reader: R,
    out: &mut W,
    err: &mut E,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
    E: Write,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        let text = line.trim();
        if text.is_empty() {
            continue;
        }

        let mut printer = ReplyPrinter::default();
        let turn = controller.send_message(text, language);
        tokio::pin!(turn);
        let result = loop {
            tokio::select! {
                result = &mut turn => break result,
                Some(update) = updates.recv() => printer.apply(&update, out, err)?,
            }
        };
        while let Ok(update) = updates.try_recv() {
            printer.apply(&update, out, err)?;
        }
        printer.end_line(out)?;

        if let Err(error) = result {
            tracing::debug!(%error, "line mode turn failed");
        }
    }
    Ok(())
}
