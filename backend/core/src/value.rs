//! Wire value codec.
//!
//! Attribute values travel as `[type_id, value_1, value_2, ...]` arrays. The
//! leading id selects one of the kinds below and fixes how many trailing
//! values follow. Integers are signed 32-bit unless the kind says otherwise;
//! anything outside that range is a decode error rather than a truncation.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use chrono::{NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{ProbeError, ProbeResult};

// ---------------------------------------------------------------------------
// Type ids
// ---------------------------------------------------------------------------

/// Leading type id of a wire value array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    Plain,
    Rectangle,
    Point,
    Size,
    Color,
    DateTime,
    Time,
    Point3D,
}

impl ValueType {
    pub fn from_id(id: i64) -> Option<Self> {
        match id {
            0 => Some(Self::Plain),
            1 => Some(Self::Rectangle),
            2 => Some(Self::Point),
            3 => Some(Self::Size),
            4 => Some(Self::Color),
            5 => Some(Self::DateTime),
            6 => Some(Self::Time),
            7 => Some(Self::Point3D),
            _ => None,
        }
    }

    pub fn id(self) -> i64 {
        match self {
            Self::Plain => 0,
            Self::Rectangle => 1,
            Self::Point => 2,
            Self::Size => 3,
            Self::Color => 4,
            Self::DateTime => 5,
            Self::Time => 6,
            Self::Point3D => 7,
        }
    }

    /// Number of values that follow the type id.
    pub fn arity(self) -> usize {
        match self {
            Self::Plain | Self::DateTime => 1,
            Self::Point | Self::Size => 2,
            Self::Point3D => 3,
            Self::Rectangle | Self::Color | Self::Time => 4,
        }
    }
}

// ---------------------------------------------------------------------------
// Value kinds
// ---------------------------------------------------------------------------

/// A plain attribute: marshalled directly as a bool, integer, double,
/// string, list or string-keyed map.
///
/// Lists of plain values appear for conventional attributes such as
/// `Children`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PlainValue {
    Bool(bool),
    Int(i32),
    Float(Float),
    Text(String),
    List(Vec<PlainValue>),
    Map(BTreeMap<String, PlainValue>),
}

/// A double attribute with a total order, so decoded values stay `Eq`,
/// `Ord` and `Hash`.
///
/// Equality is bitwise: `NaN == NaN`, `0.0 != -0.0`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Float(pub f64);

impl Float {
    pub fn get(self) -> f64 {
        self.0
    }
}

impl PartialEq for Float {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for Float {}

impl PartialOrd for Float {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Float {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl Hash for Float {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Rectangle {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rectangle {
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    pub fn width(&self) -> i32 {
        self.w
    }

    pub fn height(&self) -> i32 {
        self.h
    }

    /// Centre point, rounded towards the origin and clamped to the i32 range.
    pub fn center(&self) -> Point {
        Point::new(midpoint(self.x, self.w), midpoint(self.y, self.h))
    }
}

fn midpoint(origin: i32, extent: i32) -> i32 {
    let mid = i64::from(origin) + i64::from(extent) / 2;
    mid.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Size {
    pub w: i32,
    pub h: i32,
}

impl Size {
    pub fn new(w: i32, h: i32) -> Self {
        Self { w, h }
    }

    pub fn width(&self) -> i32 {
        self.w
    }

    pub fn height(&self) -> i32 {
        self.h
    }
}

/// RGBA colour, each channel in `0..=255`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: i32,
    pub g: i32,
    pub b: i32,
    pub a: i32,
}

impl Color {
    pub fn new(r: i32, g: i32, b: i32, a: i32) -> ProbeResult<Self> {
        for (channel, value) in [("red", r), ("green", g), ("blue", b), ("alpha", a)] {
            if !(0..=255).contains(&value) {
                return Err(ProbeError::decode(format!(
                    "color {channel} channel {value} outside 0..=255"
                )));
            }
        }
        Ok(Self { r, g, b, a })
    }

    pub fn red(&self) -> i32 {
        self.r
    }

    pub fn green(&self) -> i32 {
        self.g
    }

    pub fn blue(&self) -> i32 {
        self.b
    }

    pub fn alpha(&self) -> i32 {
        self.a
    }
}

/// A UTC timestamp in seconds since the epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DateTime {
    pub timestamp: i64,
}

impl DateTime {
    pub fn new(timestamp: i64) -> Self {
        Self { timestamp }
    }

    /// `None` when the timestamp is outside chrono's representable range.
    pub fn to_utc(&self) -> Option<chrono::DateTime<Utc>> {
        chrono::DateTime::from_timestamp(self.timestamp, 0)
    }
}

/// A time of day without a date component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Time {
    pub hour: i32,
    pub minute: i32,
    pub second: i32,
    pub millisecond: i32,
}

impl Time {
    pub fn new(hour: i32, minute: i32, second: i32, millisecond: i32) -> ProbeResult<Self> {
        let time = Self {
            hour,
            minute,
            second,
            millisecond,
        };
        if time.to_naive_time().is_none() {
            return Err(ProbeError::decode(format!(
                "invalid time {hour:02}:{minute:02}:{second:02}.{millisecond:03}"
            )));
        }
        Ok(time)
    }

    pub fn to_naive_time(&self) -> Option<NaiveTime> {
        NaiveTime::from_hms_milli_opt(
            u32::try_from(self.hour).ok()?,
            u32::try_from(self.minute).ok()?,
            u32::try_from(self.second).ok()?,
            // chrono treats ms >= 1000 as a leap second; that is not a valid wire time.
            u32::try_from(self.millisecond).ok().filter(|ms| *ms < 1000)?,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Point3D {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Point3D {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

/// A decoded attribute value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum WireValue {
    Plain(PlainValue),
    Rectangle(Rectangle),
    Point(Point),
    Size(Size),
    Color(Color),
    DateTime(DateTime),
    Time(Time),
    Point3D(Point3D),
}

impl WireValue {
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Plain(_) => ValueType::Plain,
            Self::Rectangle(_) => ValueType::Rectangle,
            Self::Point(_) => ValueType::Point,
            Self::Size(_) => ValueType::Size,
            Self::Color(_) => ValueType::Color,
            Self::DateTime(_) => ValueType::DateTime,
            Self::Time(_) => ValueType::Time,
            Self::Point3D(_) => ValueType::Point3D,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Plain(PlainValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Self::Plain(PlainValue::Int(i)) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Plain(PlainValue::Float(f)) => Some(f.get()),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Plain(PlainValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_rectangle(&self) -> Option<Rectangle> {
        match self {
            Self::Rectangle(r) => Some(*r),
            _ => None,
        }
    }
}

impl From<bool> for WireValue {
    fn from(value: bool) -> Self {
        Self::Plain(PlainValue::Bool(value))
    }
}

impl From<i32> for WireValue {
    fn from(value: i32) -> Self {
        Self::Plain(PlainValue::Int(value))
    }
}

impl From<f64> for WireValue {
    fn from(value: f64) -> Self {
        Self::Plain(PlainValue::Float(Float(value)))
    }
}

impl From<&str> for WireValue {
    fn from(value: &str) -> Self {
        Self::Plain(PlainValue::Text(value.to_string()))
    }
}

impl From<String> for WireValue {
    fn from(value: String) -> Self {
        Self::Plain(PlainValue::Text(value))
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decode one `[type_id, ...]` wire array.
pub fn decode_value(raw: &Value) -> ProbeResult<WireValue> {
    let items = raw
        .as_array()
        .ok_or_else(|| ProbeError::decode(format!("expected a value array, got {raw}")))?;
    let (head, rest) = items
        .split_first()
        .ok_or_else(|| ProbeError::decode("empty value array"))?;
    let type_id = head
        .as_i64()
        .ok_or_else(|| ProbeError::decode(format!("type id must be an integer, got {head}")))?;
    let value_type = ValueType::from_id(type_id)
        .ok_or_else(|| ProbeError::decode(format!("unknown type id {type_id}")))?;

    if rest.len() != value_type.arity() {
        return Err(ProbeError::decode(format!(
            "{value_type:?} needs {} values, got {}",
            value_type.arity(),
            rest.len()
        )));
    }

    let value = match value_type {
        ValueType::Plain => WireValue::Plain(decode_plain(&rest[0])?),
        ValueType::Rectangle => WireValue::Rectangle(Rectangle::new(
            int32(&rest[0])?,
            int32(&rest[1])?,
            int32(&rest[2])?,
            int32(&rest[3])?,
        )),
        ValueType::Point => WireValue::Point(Point::new(int32(&rest[0])?, int32(&rest[1])?)),
        ValueType::Size => WireValue::Size(Size::new(int32(&rest[0])?, int32(&rest[1])?)),
        ValueType::Color => WireValue::Color(Color::new(
            int32(&rest[0])?,
            int32(&rest[1])?,
            int32(&rest[2])?,
            int32(&rest[3])?,
        )?),
        ValueType::DateTime => WireValue::DateTime(DateTime::new(int64(&rest[0])?)),
        ValueType::Time => WireValue::Time(Time::new(
            int32(&rest[0])?,
            int32(&rest[1])?,
            int32(&rest[2])?,
            int32(&rest[3])?,
        )?),
        ValueType::Point3D => WireValue::Point3D(Point3D::new(
            int32(&rest[0])?,
            int32(&rest[1])?,
            int32(&rest[2])?,
        )),
    };
    Ok(value)
}

/// Decode the `id` attribute, which is a plain 64-bit integer rather than
/// an ordinary 32-bit plain value.
pub fn decode_object_id(raw: &Value) -> ProbeResult<i64> {
    match raw.as_array().map(Vec::as_slice) {
        Some([head, id]) if head.as_i64() == Some(ValueType::Plain.id()) => int64(id),
        _ => Err(ProbeError::decode(format!("expected a plain integer id, got {raw}"))),
    }
}

fn decode_plain(raw: &Value) -> ProbeResult<PlainValue> {
    match raw {
        Value::Bool(b) => Ok(PlainValue::Bool(*b)),
        // Integers keep the 32-bit bound; only genuine doubles become floats.
        Value::Number(n) if n.is_f64() => n
            .as_f64()
            .map(|f| PlainValue::Float(Float(f)))
            .ok_or_else(|| ProbeError::decode(format!("unsupported number {n}"))),
        Value::Number(_) => Ok(PlainValue::Int(int32(raw)?)),
        Value::String(s) => Ok(PlainValue::Text(s.clone())),
        Value::Array(items) => items
            .iter()
            .map(decode_plain)
            .collect::<ProbeResult<Vec<_>>>()
            .map(PlainValue::List),
        Value::Object(entries) => entries
            .iter()
            .map(|(key, item)| Ok((key.clone(), decode_plain(item)?)))
            .collect::<ProbeResult<BTreeMap<_, _>>>()
            .map(PlainValue::Map),
        Value::Null => Err(ProbeError::decode("null is not a plain value")),
    }
}

fn int64(raw: &Value) -> ProbeResult<i64> {
    raw.as_i64()
        .ok_or_else(|| ProbeError::decode(format!("expected a 64-bit integer, got {raw}")))
}

fn int32(raw: &Value) -> ProbeResult<i32> {
    let wide = int64(raw)?;
    i32::try_from(wide)
        .map_err(|_| ProbeError::decode(format!("integer {wide} outside the signed 32-bit range")))
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Encode a value into its wire array form.
pub fn encode_value(value: &WireValue) -> Value {
    let id = value.value_type().id();
    match value {
        WireValue::Plain(plain) => json!([id, encode_plain(plain)]),
        WireValue::Rectangle(r) => json!([id, r.x, r.y, r.w, r.h]),
        WireValue::Point(p) => json!([id, p.x, p.y]),
        WireValue::Size(s) => json!([id, s.w, s.h]),
        WireValue::Color(c) => json!([id, c.r, c.g, c.b, c.a]),
        WireValue::DateTime(d) => json!([id, d.timestamp]),
        WireValue::Time(t) => json!([id, t.hour, t.minute, t.second, t.millisecond]),
        WireValue::Point3D(p) => json!([id, p.x, p.y, p.z]),
    }
}

fn encode_plain(plain: &PlainValue) -> Value {
    match plain {
        PlainValue::Bool(b) => json!(b),
        PlainValue::Int(i) => json!(i),
        PlainValue::Float(f) => json!(f.get()),
        PlainValue::Text(s) => json!(s),
        PlainValue::List(items) => Value::Array(items.iter().map(encode_plain).collect()),
        PlainValue::Map(entries) => Value::Object(
            entries
                .iter()
                .map(|(key, item)| (key.clone(), encode_plain(item)))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_every_kind() {
        let cases = vec![
            (json!([0, true]), WireValue::from(true)),
            (json!([0, 42]), WireValue::from(42)),
            (json!([0, "hello"]), WireValue::from("hello")),
            (
                json!([1, 12, 13, 100, 150]),
                WireValue::Rectangle(Rectangle::new(12, 13, 100, 150)),
            ),
            (json!([2, 50, 100]), WireValue::Point(Point::new(50, 100))),
            (json!([3, 640, 480]), WireValue::Size(Size::new(640, 480))),
            (
                json!([4, 50, 100, 200, 255]),
                WireValue::Color(Color { r: 50, g: 100, b: 200, a: 255 }),
            ),
            (json!([5, 1377209927]), WireValue::DateTime(DateTime::new(1377209927))),
            (
                json!([6, 12, 34, 1, 23]),
                WireValue::Time(Time { hour: 12, minute: 34, second: 1, millisecond: 23 }),
            ),
            (json!([7, 1, -2, 3]), WireValue::Point3D(Point3D::new(1, -2, 3))),
        ];
        for (raw, expected) in cases {
            assert_eq!(decode_value(&raw).unwrap(), expected, "decoding {raw}");
            assert_eq!(encode_value(&expected), raw);
        }
    }

    #[test]
    fn int32_boundaries() {
        assert_eq!(decode_value(&json!([0, 2147483647])).unwrap().as_int(), Some(i32::MAX));
        assert_eq!(decode_value(&json!([0, -2147483648])).unwrap().as_int(), Some(i32::MIN));
        assert!(decode_value(&json!([0, 2147483648_i64])).is_err());
        assert!(decode_value(&json!([0, -2147483649_i64])).is_err());
        assert!(decode_value(&json!([2, 0, 4294967296_i64])).is_err());
    }

    #[test]
    fn datetime_takes_64_bit_timestamps() {
        let far = 4_102_444_800_i64; // 2100-01-01
        let value = decode_value(&json!([5, far])).unwrap();
        let WireValue::DateTime(dt) = value else { panic!("not a datetime") };
        assert_eq!(dt.to_utc().unwrap().format("%Y-%m-%d").to_string(), "2100-01-01");
    }

    #[test]
    fn unknown_type_id_is_an_error() {
        let err = decode_value(&json!([8, 1])).unwrap_err();
        assert!(err.to_string().contains("unknown type id 8"), "{err}");
        assert!(decode_value(&json!([-1, 1])).is_err());
    }

    #[test]
    fn arity_mismatch_is_an_error() {
        assert!(decode_value(&json!([1, 1, 2, 3])).is_err());
        assert!(decode_value(&json!([2, 1, 2, 3])).is_err());
        assert!(decode_value(&json!([0])).is_err());
        assert!(decode_value(&json!([])).is_err());
    }

    #[test]
    fn rejects_out_of_range_color_and_time() {
        assert!(decode_value(&json!([4, 256, 0, 0, 0])).is_err());
        assert!(decode_value(&json!([4, 0, -1, 0, 0])).is_err());
        assert!(decode_value(&json!([6, 24, 0, 0, 0])).is_err());
        assert!(decode_value(&json!([6, 0, 0, 0, 1000])).is_err());
    }

    #[test]
    fn plain_lists_decode_recursively() {
        let value = decode_value(&json!([0, ["DashController", "PanelController"]])).unwrap();
        assert_eq!(
            value,
            WireValue::Plain(PlainValue::List(vec![
                PlainValue::Text("DashController".into()),
                PlainValue::Text("PanelController".into()),
            ]))
        );
    }

    #[test]
    fn doubles_and_maps_are_plain() {
        let opacity = decode_value(&json!([0, 0.5])).unwrap();
        assert_eq!(opacity.as_float(), Some(0.5));
        assert_eq!(opacity, WireValue::from(0.5));
        assert_eq!(encode_value(&opacity), json!([0, 0.5]));

        let hints = decode_value(&json!([0, {"scale": 1.25, "names": ["a"], "depth": 2}])).unwrap();
        let WireValue::Plain(PlainValue::Map(entries)) = &hints else {
            panic!("not a map: {hints:?}")
        };
        assert_eq!(entries["scale"], PlainValue::Float(Float(1.25)));
        assert_eq!(entries["depth"], PlainValue::Int(2));
        assert_eq!(encode_value(&hints), json!([0, {"depth": 2, "names": ["a"], "scale": 1.25}]));
    }

    #[test]
    fn whole_numbers_still_obey_the_int32_bound() {
        assert_eq!(decode_value(&json!([0, 7])).unwrap().as_int(), Some(7));
        assert!(decode_value(&json!([0, 2147483648_i64])).is_err());
        assert!(decode_value(&json!([0, u64::MAX])).is_err());
        assert!(decode_value(&json!([0, {"big": 2147483648_i64}])).is_err());
    }

    #[test]
    fn floats_order_totally() {
        assert!(Float(-1.0) < Float(0.5));
        assert_eq!(Float(f64::NAN), Float(f64::NAN));
        assert_ne!(Float(0.0), Float(-0.0));
    }

    #[test]
    fn nulls_are_not_plain() {
        assert!(decode_value(&json!([0, null])).is_err());
        assert!(decode_value(&json!({"type": 0})).is_err());
    }

    #[test]
    fn object_id_accepts_int64() {
        assert_eq!(decode_object_id(&json!([0, 9_000_000_000_i64])).unwrap(), 9_000_000_000);
        assert!(decode_object_id(&json!([0, "7"])).is_err());
        assert!(decode_object_id(&json!([1, 7])).is_err());
        assert!(decode_object_id(&json!(7)).is_err());
    }

    #[test]
    fn rectangle_center() {
        assert_eq!(Rectangle::new(10, 10, 20, 41).center(), Point::new(20, 30));
        assert_eq!(Rectangle::new(-10, -10, 5, 5).center(), Point::new(-8, -8));
    }

    #[test]
    fn rectangle_center_saturates_at_the_int32_edge() {
        let rect = decode_value(&json!([1, 2147483647, 0, 2, 0]))
            .unwrap()
            .as_rectangle()
            .unwrap();
        assert_eq!(rect.center(), Point::new(i32::MAX, 0));
        assert_eq!(
            Rectangle::new(i32::MIN, i32::MIN, -4, i32::MIN).center(),
            Point::new(i32::MIN, i32::MIN)
        );
        assert_eq!(
            Rectangle::new(i32::MAX, 0, i32::MAX, 0).center(),
            Point::new(i32::MAX, 0)
        );
    }
}
