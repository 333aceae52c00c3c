//! Decode command implementation.

use anyhow::{Context, Result};
use bioguard_core::decoder;
use bioguard_types::Reading;
use serde_json::{Value, json};

use crate::cli::OutputFormat;
use crate::terminal::TerminalSink;

pub fn cmd_decode(payload: &str, format: OutputFormat, no_color: bool) -> Result<()> {
    let reading = Reading::parse(payload).context("Malformed payload")?;

    match format {
        OutputFormat::Text => {
            let mut sink = TerminalSink::stdout(no_color, false).with_timestamps(false);
            decoder::render(&reading, &mut sink);
        }
        OutputFormat::Json => {
            let output = serde_json::to_string_pretty(&format_reading_json(&reading))
                .context("Failed to serialize reading")?;
            println!("{}", output);
        }
    }
    Ok(())
}

/// JSON view of a reading, including what the gauge would show.
pub fn format_reading_json(reading: &Reading) -> Value {
    json!({
        "color": reading.color_label,
        "contamination": reading.contamination_label,
        "light": reading.light_label,
        "light_percent": reading.light_percent(),
        "level": reading.level,
        "fill_percent": reading.fill_percent(),
        "bucket": reading.bucket(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_for_known_level() {
        let reading =
            Reading::parse("Cor: Amarelo Claro | Contaminação: Muito Claro | Intensidade Luz: 80%")
                .unwrap();
        let value = format_reading_json(&reading);

        assert_eq!(value["level"], "low");
        assert_eq!(value["fill_percent"], 33);
        assert_eq!(value["bucket"], "baixa");
        assert_eq!(value["light"], "80%");
        assert_eq!(value["light_percent"], 80);
    }

    #[test]
    fn test_json_for_unknown_level() {
        let reading = Reading::parse("Cor: Verde | Contaminação: ? | Intensidade Luz: n/a").unwrap();
        let value = format_reading_json(&reading);

        assert_eq!(value["level"], "unknown");
        assert!(value["fill_percent"].is_null());
        assert!(value["bucket"].is_null());
        assert!(value["light_percent"].is_null());
    }

    #[test]
    fn test_malformed_payload_is_an_error() {
        let err = cmd_decode("only one segment", OutputFormat::Json, true).unwrap_err();
        assert!(err.to_string().contains("Malformed payload"));
    }
}
