mod decode;
mod encode;
mod integer;
mod kvp;
mod location;
mod string;
mod track_namespace;
mod varint;

pub use decode::*;
pub use encode::*;
pub use kvp::*;
pub use location::*;
pub use string::*;
pub use track_namespace::*;
pub use varint::*;
