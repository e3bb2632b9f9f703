mod datagram;
mod extension_headers;
mod fetch;
mod header;
mod object_status;
mod subgroup;

pub use datagram::*;
pub use extension_headers::*;
pub use fetch::*;
pub use header::*;
pub use object_status::*;
pub use subgroup::*;
