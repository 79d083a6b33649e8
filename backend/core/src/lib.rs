pub mod error;
pub mod literal;
pub mod node;
pub mod traits;
pub mod value;

pub use error::{NotFoundReason, ProbeError, ProbeResult};
pub use literal::{
    decode_int_literal, decode_literal, decode_string_literal, encode_literal,
    encode_string_literal, Literal,
};
pub use node::{materialize, Attributes, Node};
pub use traits::{IntrospectionTransport, RawNode, RawState};
pub use value::{
    decode_object_id, decode_value, encode_value, Color, DateTime, Float, PlainValue, Point, Point3D,
    Rectangle, Size, Time, ValueType, WireValue,
};
