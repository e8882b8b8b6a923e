//! USB mouse and gamepad input shaped into serial mouse packets.

pub mod pipeline;
pub mod shaping;

pub use pipeline::{BootMouseReport, MousePacket, MousePipeline, RawMouseAccumulator, WHEEL_LIMIT};
pub use shaping::{cosine_smooth, travel_limit, BUFFER_LIMIT, PACKET_AXIS_LIMIT};
