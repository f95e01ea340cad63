//! Text form of an inference result, as printed over the diagnostic UART.

use crate::classifier::ModelInfo;
use crate::result::{ImpulseResult, Predictions};
use std::fmt::Write;

/// Scores are printed with a fixed five decimals.
fn format_float(value: f32) -> String {
    format!("{value:.5}")
}

/// Render `result` in the board's prediction report layout.
pub fn render(result: &ImpulseResult, model: &ModelInfo) -> String {
    let mut out = String::new();
    let t = &result.timing;
    let _ = writeln!(
        out,
        "Predictions (DSP: {} us., Classification: {} us., Anomaly: {} us.): ",
        t.dsp_us, t.classification_us, t.anomaly_us
    );
    out.push('[');

    match &result.predictions {
        Predictions::ObjectDetection(boxes) => {
            let found = boxes.first().map_or(false, |bb| bb.value > 0.0);
            for bb in boxes.iter().filter(|bb| bb.value != 0.0) {
                let _ = writeln!(
                    out,
                    "    {} ({}) [ x: {}, y: {}, width: {}, height: {} ]",
                    bb.label,
                    format_float(bb.value),
                    bb.x,
                    bb.y,
                    bb.width,
                    bb.height
                );
            }
            if !found {
                out.push_str("    No objects found\n");
            }
        }
        Predictions::Classification(items) => {
            let last = items.len().saturating_sub(1);
            for (ix, item) in items.iter().enumerate() {
                let _ = writeln!(out, "    {}: {}", item.label, format_float(item.value));
                if model.has_anomaly || ix != last {
                    out.push_str(", ");
                }
            }
        }
    }

    if let Some(anomaly) = result.anomaly {
        out.push_str(&format_float(anomaly));
    }
    out.push_str("]\n");
    out
}
