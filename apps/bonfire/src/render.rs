//! Stdout rendering of log records. Consumes dispatched events only; holds
//! no protocol state.

use time::macros::format_description;
use time::OffsetDateTime;

use crate::model::{LogRecord, RenderSink};

/// Prints one line per record in the shape `12:34:56 Bob > hi`, and an
/// indented follow-up line when a round trip is confirmed.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutRenderer;

fn clock(timestamp_ms: i64) -> String {
    let format = format_description!("[hour]:[minute]:[second]");
    OffsetDateTime::from_unix_timestamp(timestamp_ms.div_euclid(1000))
        .ok()
        .and_then(|ts| ts.format(format).ok())
        .unwrap_or_else(|| "--:--:--".to_string())
}

impl RenderSink for StdoutRenderer {
    fn appended(&self, record: &LogRecord) {
        let stamp = clock(record.timestamp_ms);
        match &record.author {
            Some(author) => println!("{stamp} {author} > {}", record.contents),
            None => println!("{stamp} {}", record.contents),
        }
    }

    fn confirmed(&self, record: &LogRecord) {
        if let Some(round_trip) = &record.round_trip {
            println!("    (delivered in {round_trip}ms)");
        }
    }
}
