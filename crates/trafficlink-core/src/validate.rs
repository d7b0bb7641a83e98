//! Response validation.

use crate::error::Mismatch;

/// Whether `trace` begins with `prefix`. An empty prefix always matches.
pub fn starts_with(trace: &[u8], prefix: &[u8]) -> bool {
    trace.starts_with(prefix)
}

/// Whether `needle` occurs contiguously in `trace`. An empty needle always
/// matches.
pub fn contains_subsequence(trace: &[u8], needle: &[u8]) -> bool {
    needle.is_empty() || trace.windows(needle.len()).any(|window| window == needle)
}

/// Checks applied to a completed response.
///
/// Having expectations at all means a response is required: an empty trace
/// fails even when both patterns are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Expectations {
    /// Bytes the response must begin with.
    pub prefix: Vec<u8>,
    /// Bytes the response must contain.
    pub contains: Vec<u8>,
}

impl Expectations {
    /// Expect a non-empty response matching `prefix` and `contains`.
    pub fn new(prefix: Vec<u8>, contains: Vec<u8>) -> Self {
        Self { prefix, contains }
    }

    /// Validate `trace`.
    pub fn check(&self, trace: &[u8]) -> Result<(), Mismatch> {
        if trace.is_empty() {
            return Err(Mismatch::EmptyResponse);
        }
        if !starts_with(trace, &self.prefix) {
            return Err(Mismatch::Prefix);
        }
        if !contains_subsequence(trace, &self.contains) {
            return Err(Mismatch::Contains);
        }
        Ok(())
    }
}
