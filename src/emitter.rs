// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! The `RecordEmitter` collaborator.
//!
//! The producer core never frames, serializes, or transmits anything: it
//! hands finished [`BatchArrowRecords`] envelopes to an abstract emitter.
//! What happens downstream -- Arrow IPC encoding, gRPC streaming, batching
//! onto a socket -- is out of scope for this crate.

use crate::payload::BatchArrowRecords;

/// Receives completed batches produced by [`crate::producer::TracesProducer::build_batch`].
///
/// Implementations are expected to live in the transport layer; this crate
/// provides no implementations beyond [`NullEmitter`], which is useful for
/// tests and benchmarks that only care about the producer's own work.
pub trait RecordEmitter {
    /// The error type an emitter implementation may raise.
    type Error;

    /// Accepts one completed batch. Implementations own `batch` afterwards.
    fn emit(&mut self, batch: BatchArrowRecords) -> Result<(), Self::Error>;
}

/// An emitter that discards every batch it receives.
#[derive(Debug, Default)]
pub struct NullEmitter {
    /// Running count of batches discarded, useful in tests.
    pub emitted: usize,
}

impl RecordEmitter for NullEmitter {
    type Error = std::convert::Infallible;

    fn emit(&mut self, batch: BatchArrowRecords) -> Result<(), Self::Error> {
        self.emitted += 1;
        drop(batch);
        Ok(())
    }
}
