//! Text parsers and presentation helpers for Redis diagnostic reports.
//!
//! Nothing in here talks to a server: every function takes the raw text a
//! store returned and produces plain data. The parsers never fail, malformed
//! input only yields a smaller result.

pub mod clients;
pub mod fields;
pub mod format;
pub mod info;
pub mod search;
pub mod summary;

pub use clients::{parse_client_list, ClientRecord};
pub use fields::Fields;
pub use format::{format_bytes, format_time};
pub use info::{parse_info, ParsedInfo};
pub use search::{filter_keys, Page};
pub use summary::Summary;
