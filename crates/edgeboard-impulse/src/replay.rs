//! Stand-in for the vendor classifier.
//!
//! Pulls the whole signal through the same windowed interface the real SDK
//! uses, then answers with a recorded result.

use crate::classifier::{Classifier, ModelInfo};
use crate::result::ImpulseResult;
use crate::signal::Signal;
use crate::{ImpulseError, Result};
use std::time::Instant;

/// Items pulled from the signal per `get_data` call.
const WINDOW: usize = 256;

pub struct ReplayClassifier {
    model: ModelInfo,
    result: ImpulseResult,
    fail_code: Option<i32>,
}

impl ReplayClassifier {
    pub fn new(model: ModelInfo, result: ImpulseResult) -> Result<Self> {
        model.check(&result)?;
        Ok(Self {
            model,
            result,
            fail_code: None,
        })
    }

    /// Make every following run fail with `code`.
    pub fn fail_with(&mut self, code: i32) {
        self.fail_code = Some(code);
    }
}

impl Classifier for ReplayClassifier {
    fn model(&self) -> &ModelInfo {
        &self.model
    }

    fn run(&mut self, signal: &dyn Signal, debug: bool) -> Result<ImpulseResult> {
        if let Some(code) = self.fail_code {
            return Err(ImpulseError::Classifier(code));
        }

        let total = signal.total_length();
        if total != self.model.input_frame_size {
            return Err(ImpulseError::InputSize {
                expected: self.model.input_frame_size,
                actual: total,
            });
        }

        let started = Instant::now();
        let mut window = [0f32; WINDOW];
        let mut offset = 0;
        let mut non_finite = 0usize;
        while offset < total {
            let len = WINDOW.min(total - offset);
            signal.get_data(offset, &mut window[..len])?;
            non_finite += window[..len].iter().filter(|v| !v.is_finite()).count();
            offset += len;
        }
        if non_finite > 0 {
            log::warn!("{non_finite} non-finite feature values");
        }
        if debug {
            log::debug!("streamed {total} features in {:?}", started.elapsed());
        }

        let mut result = self.result.clone();
        result.timing.dsp_us = started.elapsed().as_micros() as i64;
        Ok(result)
    }
}
