//! Wire format
//!
//! Every frame, in both directions, is one compact JSON document. The
//! transport provides framing; nothing here adds a length prefix.

pub mod constants;
pub mod decode;
pub mod encode;

pub use decode::decode_frame;
pub use encode::encode_frame;
