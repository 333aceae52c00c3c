//! Terminal presentation sink.
//!
//! Renders status changes and readings as lines of text. The fill gauge is a
//! ten-cell bar colored by its style bucket.

use std::io::{self, Write};

use bioguard_core::{PresentationSink, StatusKind, TriggerAction, TriggerControl};
use bioguard_types::StyleBucket;
use owo_colors::OwoColorize;
use time::OffsetDateTime;

/// Number of cells in the gauge bar.
const GAUGE_CELLS: usize = 10;

/// Writes everything the core renders to a terminal stream.
pub struct TerminalSink<W: Write + Send = io::Stdout> {
    out: W,
    no_color: bool,
    quiet: bool,
    timestamps: bool,
    summary: Option<(String, String)>,
    light: Option<String>,
    fill: Option<u8>,
    bucket: Option<StyleBucket>,
}

impl TerminalSink<io::Stdout> {
    /// Sink writing to stdout.
    pub fn stdout(no_color: bool, quiet: bool) -> Self {
        Self::new(io::stdout(), no_color, quiet)
    }
}

impl<W: Write + Send> TerminalSink<W> {
    /// Sink writing to `out`, with timestamps.
    pub fn new(out: W, no_color: bool, quiet: bool) -> Self {
        Self {
            out,
            no_color,
            quiet,
            timestamps: true,
            summary: None,
            light: None,
            fill: None,
            bucket: None,
        }
    }

    /// Enable or disable the leading clock time on each line.
    #[must_use]
    pub fn with_timestamps(mut self, timestamps: bool) -> Self {
        self.timestamps = timestamps;
        self
    }

    /// Give back the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, line: &str) {
        let stamped = if self.timestamps {
            format!("[{}] {}", clock(), line)
        } else {
            line.to_string()
        };
        if let Err(e) = writeln!(self.out, "{}", stamped).and_then(|()| self.out.flush()) {
            tracing::debug!("Failed to write to terminal: {}", e);
        }
    }

    fn gauge(&self) -> String {
        let (bar, percent) = match self.fill {
            Some(percent) => {
                let filled = (usize::from(percent) * GAUGE_CELLS).div_ceil(100).min(GAUGE_CELLS);
                (
                    format!("{}{}", "█".repeat(filled), "░".repeat(GAUGE_CELLS - filled)),
                    format!("{:>3}%", percent),
                )
            }
            None => ("░".repeat(GAUGE_CELLS), " --%".to_string()),
        };
        let label = self
            .bucket
            .map(|b| b.as_str().to_uppercase())
            .unwrap_or_else(|| "-".to_string());
        let text = format!("{} {} {:<5}", bar, percent, label);

        if self.no_color {
            return text;
        }
        match self.bucket {
            Some(StyleBucket::Alta) => format!("{}", text.red().bold()),
            Some(StyleBucket::Media) => format!("{}", text.truecolor(255, 165, 0)),
            Some(StyleBucket::Baixa) => format!("{}", text.yellow()),
            None => format!("{}", text.dimmed()),
        }
    }
}

/// Local wall-clock time as `HH:MM:SS`.
fn clock() -> String {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    format!("{:02}:{:02}:{:02}", now.hour(), now.minute(), now.second())
}

impl<W: Write + Send> PresentationSink for TerminalSink<W> {
    fn set_status(&mut self, message: &str, kind: StatusKind) {
        if self.quiet {
            return;
        }
        let line = match (kind, self.no_color) {
            (_, true) => message.to_string(),
            (StatusKind::Connected, false) => format!("{}", message.green()),
            (StatusKind::Disconnected, false) => format!("{}", message.yellow()),
        };
        self.emit(&line);
    }

    fn set_summary(&mut self, color: &str, contamination: &str) {
        self.summary = Some((color.to_string(), contamination.to_string()));
    }

    fn set_light_text(&mut self, text: &str) {
        self.light = Some(text.to_string());
    }

    fn set_fill(&mut self, percent: Option<u8>, bucket: Option<StyleBucket>) {
        self.bucket = bucket;
        if percent.is_some() {
            self.fill = percent;
        }

        let gauge = self.gauge();
        let (color, contamination) = self
            .summary
            .clone()
            .unwrap_or_else(|| (String::new(), String::new()));
        let light = self.light.clone().unwrap_or_default();
        self.emit(&format!(
            "{}  {} | {} | Luz: {}",
            gauge, color, contamination, light
        ));
    }

    fn set_trigger(&mut self, control: TriggerControl) {
        tracing::debug!(label = control.label, enabled = control.enabled, "Trigger updated");
        if !self.quiet && control.enabled && control.action == TriggerAction::Disconnect {
            self.emit("Press Ctrl+C to disconnect");
        }
    }

    fn alert(&mut self, message: &str) {
        let line = if self.no_color {
            format!("! {}", message)
        } else {
            format!("{} {}", "!".red().bold(), message.red())
        };
        self.emit(&line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bioguard_core::decoder;

    fn sink() -> TerminalSink<Vec<u8>> {
        TerminalSink::new(Vec::new(), true, false).with_timestamps(false)
    }

    fn output(sink: TerminalSink<Vec<u8>>) -> String {
        String::from_utf8(sink.into_inner()).unwrap()
    }

    #[test]
    fn test_renders_reading_line() {
        let mut sink = sink();
        decoder::handle_payload(
            "Cor: Vermelho | Contaminação: Muito Escuro | Intensidade Luz: 45%".as_bytes(),
            &mut sink,
        )
        .unwrap();

        assert_eq!(
            output(sink),
            "██████████ 100% ALTA   Cor: Vermelho | Contaminação: Muito Escuro | Luz: 45%\n"
        );
    }

    #[test]
    fn test_gauge_proportions() {
        let mut sink = sink();
        sink.set_fill(Some(33), Some(StyleBucket::Baixa));
        assert!(sink.gauge().starts_with("████░░░░░░  33% BAIXA"));

        sink.set_fill(Some(66), Some(StyleBucket::Media));
        assert!(sink.gauge().starts_with("███████░░░  66% MEDIA"));
    }

    #[test]
    fn test_unknown_keeps_previous_height() {
        let mut sink = sink();
        sink.set_fill(Some(66), Some(StyleBucket::Media));
        sink.set_fill(None, None);

        assert!(sink.gauge().starts_with("███████░░░  66% -"));
    }

    #[test]
    fn test_empty_gauge_before_first_reading() {
        let sink = sink();
        assert_eq!(sink.gauge(), format!("{}  --% -    ", "░".repeat(10)));
    }

    #[test]
    fn test_quiet_suppresses_status_only() {
        let mut sink = TerminalSink::new(Vec::new(), true, true).with_timestamps(false);
        sink.set_status("Conectado com sucesso!", StatusKind::Connected);
        sink.set_trigger(TriggerControl::disconnect());
        sink.alert("Bluetooth não é suportado neste sistema.");

        assert_eq!(output(sink), "! Bluetooth não é suportado neste sistema.\n");
    }

    #[test]
    fn test_status_and_hint() {
        let mut sink = sink();
        sink.set_status("Conectado com sucesso!", StatusKind::Connected);
        sink.set_trigger(TriggerControl::disconnect());
        sink.set_trigger(TriggerControl::connect());

        assert_eq!(
            output(sink),
            "Conectado com sucesso!\nPress Ctrl+C to disconnect\n"
        );
    }
}
