//! Error kinds for the core engine, split along the fatal/recoverable line
//! the design calls for. Fatal errors are returned up to the caller (and, in
//! the binary, mapped to a distinct process exit code); recoverable errors
//! are logged at the point of occurrence and never escape the event loop.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("out of memory allocating history ring ({slots} slots x {targets} targets)")]
    HistoryAllocation { slots: usize, targets: usize },

    #[error("no resolvable targets")]
    NoTargets,

    #[error("interval too short for {targets} targets (one slot would be zero-length)")]
    IntervalTooShort { targets: usize },
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("send to target failed: {0}")]
    Send(String),

    #[error("receive failed: {0}")]
    Recv(String),

    #[error("unexpected ICMP type={icmp_type} code={code}")]
    UnexpectedIcmp { icmp_type: u8, code: u8 },

    #[error("packet too short ({len} bytes)")]
    ShortPacket { len: usize },
}
