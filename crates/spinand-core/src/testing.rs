//! Recording bus for unit tests

use std::collections::VecDeque;
use std::vec::Vec;

use maybe_async::maybe_async;

use crate::bus::{BusMode, Leg, SpiBus};
use crate::spi::LaneWidth;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockError;

impl core::fmt::Display for MockError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "mock bus failure")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded {
    Write(Vec<u8>, LaneWidth),
    Read(usize, LaneWidth),
}

/// Records every transaction and answers reads from a queue
#[derive(Debug, Default)]
pub struct MockBus {
    pub mode: BusMode,
    pub transactions: Vec<Vec<Recorded>>,
    pub responses: VecDeque<Vec<u8>>,
    pub fail_next: bool,
}

impl MockBus {
    pub fn new(mode: BusMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    /// Queue bytes returned by the next read leg
    pub fn respond(&mut self, data: &[u8]) {
        self.responses.push_back(data.to_vec());
    }

    /// Command bytes of every transaction, in order
    pub fn headers(&self) -> Vec<Vec<u8>> {
        self.transactions
            .iter()
            .filter_map(|t| match t.first() {
                Some(Recorded::Write(data, _)) => Some(data.clone()),
                _ => None,
            })
            .collect()
    }
}

#[maybe_async(AFIT)]
impl SpiBus for MockBus {
    type Error = MockError;

    fn mode(&self) -> BusMode {
        self.mode
    }

    async fn transfer(&mut self, legs: &mut [Leg<'_>]) -> Result<(), MockError> {
        if self.fail_next {
            self.fail_next = false;
            return Err(MockError);
        }

        let mut record = Vec::new();
        for leg in legs.iter_mut() {
            match leg {
                Leg::Write { data, width } => record.push(Recorded::Write(data.to_vec(), *width)),
                Leg::Read { buf, width } => {
                    let response = self.responses.pop_front().unwrap_or_default();
                    let n = response.len().min(buf.len());
                    buf[..n].copy_from_slice(&response[..n]);
                    record.push(Recorded::Read(buf.len(), *width));
                }
            }
        }
        self.transactions.push(record);
        Ok(())
    }
}
