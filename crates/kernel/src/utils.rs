mod host_and_port;
pub use host_and_port::*;
mod query_kv;
pub use query_kv::*;
mod scheme_port;
pub use scheme_port::*;
mod with_length_or_chunked;
pub use with_length_or_chunked::*;
