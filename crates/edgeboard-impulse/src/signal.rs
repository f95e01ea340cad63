use crate::{ImpulseError, Result};

/// Streamable input handed to the classifier. The classifier pulls windows
/// through [`Signal::get_data`] rather than receiving the whole buffer.
pub trait Signal {
    fn total_length(&self) -> usize;

    /// Copy `out.len()` items starting at `offset` into `out`.
    fn get_data(&self, offset: usize, out: &mut [f32]) -> Result<()>;
}

/// Signal over a borrowed feature array, typically a `static` table.
#[derive(Debug, Clone, Copy)]
pub struct StaticSignal<'a> {
    features: &'a [f32],
}

impl<'a> StaticSignal<'a> {
    pub fn new(features: &'a [f32]) -> Self {
        Self { features }
    }
}

impl Signal for StaticSignal<'_> {
    fn total_length(&self) -> usize {
        self.features.len()
    }

    fn get_data(&self, offset: usize, out: &mut [f32]) -> Result<()> {
        let end = offset
            .checked_add(out.len())
            .filter(|&end| end <= self.features.len())
            .ok_or(ImpulseError::OutOfRange {
                offset,
                len: out.len(),
                total: self.features.len(),
            })?;
        out.copy_from_slice(&self.features[offset..end]);
        Ok(())
    }
}
