//! Response and ResponseList — ordered aggregation of per-target results.
//!
//! A `ResponseList` binds each response to the settings record that
//! produced it, preserving input order regardless of completion order.

use thiserror::Error;

use crate::output::CommandOutput;
use crate::settings::{HostSettings, SettingsList};

/// Result of a single work unit, classified three ways.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Response {
    /// The operation ran to completion; the output may still carry a
    /// nonzero exit code.
    Completed(CommandOutput),
    /// The operation or its transport failed for this target.
    Failed(String),
    /// No result arrived before the run's deadline; the sentinel value
    /// every slot starts out as.
    Timeout,
}

impl Response {
    /// A response counts as failed if it is an error, a timeout, or a
    /// completed output with a nonzero exit code.
    pub fn failed(&self) -> bool {
        match self {
            Response::Completed(output) => !output.ok(),
            Response::Failed(_) | Response::Timeout => true,
        }
    }

    /// Complement of [`Response::failed`].
    pub fn succeeded(&self) -> bool {
        !self.failed()
    }

    /// True for the `Timeout` sentinel.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Response::Timeout)
    }
}

/// Error returned when setting a response outside the list's range.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("response index {index} out of range (total {total})")]
pub struct IndexOutOfRange {
    /// The offending index.
    pub index: usize,
    /// Number of slots in the list.
    pub total: usize,
}

/// Ordered responses, index-aligned with the settings list that produced
/// them. Created once per run, populated incrementally, read-only to
/// callers after the run completes.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ResponseList {
    responses: Vec<Response>,
    settings: SettingsList,
}

impl ResponseList {
    /// Preallocate one slot per settings record, all set to the
    /// `Timeout` sentinel.
    pub fn new(settings: SettingsList) -> Self {
        let responses = vec![Response::Timeout; settings.len()];
        Self {
            responses,
            settings,
        }
    }

    /// Build a list from a completed run's parallel arrays.
    ///
    /// Returns an error if the arrays differ in length.
    pub fn from_parts(
        settings: SettingsList,
        responses: Vec<Response>,
    ) -> Result<Self, IndexOutOfRange> {
        if responses.len() != settings.len() {
            return Err(IndexOutOfRange {
                index: responses.len(),
                total: settings.len(),
            });
        }
        Ok(Self {
            responses,
            settings,
        })
    }

    /// Record the response for one slot.
    pub fn set(&mut self, index: usize, response: Response) -> Result<(), IndexOutOfRange> {
        match self.responses.get_mut(index) {
            Some(slot) => {
                *slot = response;
                Ok(())
            }
            None => Err(IndexOutOfRange {
                index,
                total: self.settings.len(),
            }),
        }
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.responses.len()
    }

    /// True when the run covered no targets.
    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }

    /// The response at `index`, if in range.
    pub fn get(&self, index: usize) -> Option<&Response> {
        self.responses.get(index)
    }

    /// Iterate over responses in input order.
    pub fn iter(&self) -> std::slice::Iter<'_, Response> {
        self.responses.iter()
    }

    /// The settings list this run executed against.
    pub fn settings(&self) -> &SettingsList {
        &self.settings
    }

    /// Pair each response with its target's display identifier, in order.
    pub fn zip_with_host(&self) -> impl Iterator<Item = (&Response, &str)> {
        self.responses
            .iter()
            .zip(self.settings.iter().map(|s| s.host_string.as_str()))
    }

    /// Pair each response with its full settings record, in order.
    pub fn zip_with_settings(&self) -> impl Iterator<Item = (&Response, &HostSettings)> {
        self.responses.iter().zip(self.settings.iter())
    }

    /// True if every response failed.
    pub fn all_failed(&self) -> bool {
        self.responses.iter().all(Response::failed)
    }

    /// True if every response succeeded.
    pub fn all_succeeded(&self) -> bool {
        self.responses.iter().all(Response::succeeded)
    }
}

impl std::ops::Index<usize> for ResponseList {
    type Output = Response;

    fn index(&self, index: usize) -> &Response {
        &self.responses[index]
    }
}

impl<'a> IntoIterator for &'a ResponseList {
    type Item = &'a Response;
    type IntoIter = std::slice::Iter<'a, Response>;

    fn into_iter(self) -> Self::IntoIter {
        self.responses.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hosts(n: usize) -> SettingsList {
        (0..n)
            .map(|i| HostSettings::new(format!("host{}", i)))
            .collect()
    }

    #[test]
    fn new_prefills_with_timeout() {
        let list = ResponseList::new(hosts(3));
        assert_eq!(list.len(), 3);
        assert!(list.iter().all(Response::is_timeout));
    }

    #[test]
    fn set_records_in_place() {
        let mut list = ResponseList::new(hosts(2));
        list.set(1, Response::Completed(CommandOutput::success("ok")))
            .expect("index in range");
        assert!(list[0].is_timeout());
        assert!(list[1].succeeded());
    }

    #[test]
    fn set_out_of_range_fails() {
        let mut list = ResponseList::new(hosts(2));
        let err = list.set(2, Response::Timeout).unwrap_err();
        assert_eq!(err, IndexOutOfRange { index: 2, total: 2 });
    }

    #[test]
    fn from_parts_rejects_length_mismatch() {
        let result = ResponseList::from_parts(hosts(2), vec![Response::Timeout]);
        assert!(result.is_err());
    }

    #[test]
    fn zip_with_host_preserves_order() {
        let mut list = ResponseList::new(hosts(2));
        list.set(0, Response::Completed(CommandOutput::success("a")))
            .expect("index in range");
        list.set(1, Response::Failed("boom".into()))
            .expect("index in range");
        let pairs: Vec<_> = list.zip_with_host().collect();
        assert_eq!(pairs[0].1, "host0:22");
        assert_eq!(pairs[1].1, "host1:22");
        assert!(pairs[0].0.succeeded());
        assert!(pairs[1].0.failed());
    }

    #[test]
    fn zip_with_settings_pairs_full_records() {
        let mut list = ResponseList::new(hosts(2));
        list.set(0, Response::Completed(CommandOutput::success("a")))
            .expect("index in range");
        let pairs: Vec<_> = list.zip_with_settings().collect();
        assert_eq!(pairs[0].1.host, "host0");
        assert_eq!(pairs[0].1.port, crate::DEFAULT_PORT);
        assert!(pairs[0].0.succeeded());
        assert_eq!(pairs[1].1.host, "host1");
        assert!(pairs[1].0.is_timeout());
    }

    #[test]
    fn nonzero_exit_code_counts_as_failed() {
        let response = Response::Completed(CommandOutput::failure(1, "nope"));
        assert!(response.failed());
        assert!(!response.succeeded());
    }

    #[test]
    fn timeout_counts_as_failed() {
        assert!(Response::Timeout.failed());
    }

    #[test]
    fn all_classifications() {
        let mut list = ResponseList::new(hosts(2));
        list.set(0, Response::Completed(CommandOutput::success("")))
            .expect("index in range");
        list.set(1, Response::Completed(CommandOutput::success("")))
            .expect("index in range");
        assert!(list.all_succeeded());
        assert!(!list.all_failed());

        list.set(1, Response::Failed("boom".into()))
            .expect("index in range");
        assert!(!list.all_succeeded());
        assert!(!list.all_failed());

        list.set(0, Response::Timeout).expect("index in range");
        assert!(list.all_failed());
    }
}
