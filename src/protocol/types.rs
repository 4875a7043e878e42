//! Response Types
//!
//! Every frame the server receives gets exactly one [`Response`]. Responses
//! are plain UTF-8 text with no length prefix:
//!
//! ```text
//! Status: Ok, Result: Command=add, Result=5, DateOfTime=2024-03-01 12:30:05
//! 1,add,5,2024-03-01 12:30:05\n2,add,-1,2024-03-01 12:31:10\n
//! Error enter command!
//! Error result overflow!
//! Error server failure!
//! ```
//!
//! Listing an empty store serializes to zero bytes.

use crate::store::Record;
use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;

/// Reply to a malformed or unknown command.
pub const COMMAND_ERROR: &str = "Error enter command!";

/// Reply when the sum does not fit in an `i32`.
pub const OVERFLOW_ERROR: &str = "Error result overflow!";

/// Reply when the store fails to complete a call.
pub const STORE_ERROR: &str = "Error server failure!";

/// The outcome of one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// An `add` was persisted as this record
    Saved(Record),

    /// Result of `getall`, one line per record
    Records(Vec<Record>),

    /// Unknown command or bad operands
    CommandError,

    /// The sum overflowed, nothing was stored
    Overflow,

    /// The store failed, nothing can be assumed about the request
    StoreFailure,
}

impl Response {
    /// Serializes the response into bytes ready to write to the socket.
    pub fn serialize(&self) -> Bytes {
        let mut buf = BytesMut::new();
        self.write_to(&mut buf);
        buf.freeze()
    }

    /// Writes the serialized response into a buffer.
    pub fn write_to(&self, buf: &mut BytesMut) {
        match self {
            Response::Saved(record) => {
                buf.put_slice(
                    format!(
                        "Status: Ok, Result: Command={}, Result={}, DateOfTime={}",
                        record.command,
                        record.result,
                        record.timestamp()
                    )
                    .as_bytes(),
                );
            }
            Response::Records(records) => {
                for record in records {
                    buf.put_slice(
                        format!(
                            "{},{},{},{}\n",
                            record.id,
                            record.command,
                            record.result,
                            record.timestamp()
                        )
                        .as_bytes(),
                    );
                }
            }
            Response::CommandError => buf.put_slice(COMMAND_ERROR.as_bytes()),
            Response::Overflow => buf.put_slice(OVERFLOW_ERROR.as_bytes()),
            Response::StoreFailure => buf.put_slice(STORE_ERROR.as_bytes()),
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.serialize();
        f.write_str(&String::from_utf8_lossy(&bytes))
    }
}
