//! Text Protocol Implementation
//!
//! One frame in, one response out. A frame is whatever a single read of up
//! to [`FRAME_SIZE`] bytes returns; there is no delimiter or length prefix,
//! so larger requests are cut at the buffer boundary and parsed as-is.
//!
//! | Token 0  | Further tokens  | Effect                              |
//! |----------|-----------------|-------------------------------------|
//! | `add`    | `<int> <int>`   | persist the sum, reply with it      |
//! | `getall` | none            | one line per stored record          |
//! | other    | anything        | `Error enter command!`              |
//!
//! ## Modules
//!
//! - `parser`: splits a frame into a [`Command`]
//! - `types`: defines [`Response`] and its serialization
//!
//! ## Example
//!
//! ```
//! use calc_server::protocol::{parse_frame, Command, Response};
//!
//! let command = parse_frame(b"getall").unwrap();
//! assert_eq!(command, Command::ListAll);
//!
//! let bytes = Response::CommandError.serialize();
//! assert_eq!(&bytes[..], b"Error enter command!");
//! ```

pub mod parser;
pub mod types;

pub use parser::{parse_frame, Command, ParseError, ParseResult};
pub use types::{Response, COMMAND_ERROR, OVERFLOW_ERROR, STORE_ERROR};

/// Label of the addition command (also the label its records carry).
pub const ADD: &str = "add";

/// Label of the list command.
pub const GET_ALL: &str = "getall";

/// Bytes taken from the socket per read. One read is one frame.
pub const FRAME_SIZE: usize = 1024;
