//! Parameter schema: per-class static tables describing the shape of a
//! node's option struct, used for default application, constructor keyword
//! binding, and live-parameter validation.

bitflags::bitflags! {
    pub struct ParamFlags: u16 {
        const NON_NULL         = 0b0000_0001;
        const FILEPATH         = 0b0000_0010;
        const ALLOW_NODE       = 0b0000_0100;
        const ALLOW_LIVE_CHANGE = 0b0000_1000;
        const CONSTRUCTOR      = 0b0001_0000;
        const DOT_DISPLAY_MAIN = 0b0010_0000;
        const DOT_DISPLAY_AUX  = 0b0100_0000;
    }
}

/// The parameter's value type tag.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ParamType {
    I32,
    U32,
    F32,
    F64,
    Bool,
    Rational,
    Vec2,
    Vec3,
    Vec4,
    Mat4,
    Str,
    Data,
    Node,
    NodeList,
    NodeDict,
    Select,
    Flags,
    IVec2,
    IVec3,
    IVec4,
    UVec2,
    UVec3,
    UVec4,
}

/// A value literal, used both for parameter defaults and for constructor
/// keyword arguments.
#[derive(Clone, Debug, PartialEq)]
pub enum ParamValue {
    I32(i32),
    U32(u32),
    F32(f32),
    F64(f64),
    Bool(bool),
    Rational(i32, i32),
    Vec2(crate::math::Vec2),
    Vec3(crate::math::Vec3),
    Vec4(crate::math::Vec4),
    Mat4(Box<crate::math::Mat4>),
    Str(String),
    Data(Vec<u8>),
    Node(Option<super::NodeId>),
    NodeList(Vec<super::NodeId>),
    Select(u32),
    Flags(u32),
}

/// One named option table entry: the choice set for `Select`/`Flags`
/// parameters.
#[derive(Clone, Debug)]
pub struct Choice {
    pub name: &'static str,
    pub value: u32,
}

/// A single parameter declaration within a class's static table.
#[derive(Clone, Debug)]
pub struct ParamDesc {
    pub name: &'static str,
    pub ty: ParamType,
    pub default: ParamValue,
    pub flags: ParamFlags,
    pub choices: &'static [Choice],
}

impl ParamDesc {
    pub const fn new(name: &'static str, ty: ParamType, default: ParamValue, flags: ParamFlags) -> ParamDesc {
        ParamDesc {
            name,
            ty,
            default,
            flags,
            choices: &[],
        }
    }
}
