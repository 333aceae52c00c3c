//! Payload decoding and rendering into a [`PresentationSink`].

use tracing::{debug, warn};

use bioguard_types::{DecodeResult, Reading};

use crate::sink::PresentationSink;

/// Decode a raw characteristic value and render it.
///
/// Malformed payloads are logged and dropped without touching the sink.
pub fn handle_payload<S>(raw: &[u8], sink: &mut S) -> DecodeResult<Reading>
where
    S: PresentationSink + ?Sized,
{
    match Reading::decode(raw) {
        Ok(reading) => {
            debug!(
                color = %reading.color_label,
                contamination = %reading.contamination_label,
                light = %reading.light_label,
                level = %reading.level,
                "Reading received"
            );
            render(&reading, sink);
            Ok(reading)
        }
        Err(warning) => {
            warn!("{}", warning);
            Err(warning)
        }
    }
}

/// Write one reading into the sink.
pub fn render<S>(reading: &Reading, sink: &mut S)
where
    S: PresentationSink + ?Sized,
{
    sink.set_summary(&reading.color_label, &reading.contamination_label);
    sink.set_light_text(&reading.light_label);
    sink.set_fill(reading.fill_percent(), reading.bucket());
}
