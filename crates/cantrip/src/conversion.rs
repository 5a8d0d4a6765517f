use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::{
    engine::Engine,
    error::{EngineError, EngineResult},
    function::Function,
    types::Type,
    typesystem::TypeSystem,
    value::Value,
};

/// Rank of a conversion sequence, best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ConversionRank {
    ExactMatch = 1,
    Promotion = 2,
    Conversion = 3,
    UserDefinedConversion = 4,
    NotConvertible = 5,
}

/// Describes a widening conversion between fundamental types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericPromotion {
    None,
    Integral,
    FloatingPoint,
}

/// Describes a narrowing conversion between fundamental types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericConversion {
    None,
    Boolean,
    Integral,
    FloatingPoint,
}

// Conversion ids 1..=25 form a 5x5 matrix over (bool, char, int, float,
// double); id 0 is a plain copy.
#[rustfmt::skip]
const STDCONV_TABLE: [u32; 25] = [
    //            bool  char  int  float double
    /* bool */      0,    2,    3,    4,    5,
    /* char */      6,    0,    8,    9,   10,
    /* int */      11,   12,    0,   14,   15,
    /* float */    16,   17,   18,    0,   20,
    /* double */   21,   22,   23,   24,    0,
];

const ENUM_TO_INT: u32 = 26;
const DERIVED_TO_BASE: u32 = 27;
const NOT_CONVERTIBLE: u32 = 28;
const CONST_QUAL_ADJUST: u32 = 1 << 5;
const REF_CONV: u32 = 1 << 6;
const D2B_DEPTH_OFFSET: u32 = 8;
const CONV_ID_MASK: u32 = (1 << 5) - 1;
const DEPTH_MASK: u32 = 255;

#[rustfmt::skip]
const CONVERSION_RANKS: [ConversionRank; 26] = [
    ConversionRank::ExactMatch, // copy
    ConversionRank::ExactMatch, ConversionRank::Promotion,  ConversionRank::Promotion,  ConversionRank::Promotion,  ConversionRank::Promotion,
    ConversionRank::Conversion, ConversionRank::ExactMatch, ConversionRank::Promotion,  ConversionRank::Promotion,  ConversionRank::Promotion,
    ConversionRank::Conversion, ConversionRank::Conversion, ConversionRank::ExactMatch, ConversionRank::Promotion,  ConversionRank::Promotion,
    ConversionRank::Conversion, ConversionRank::Conversion, ConversionRank::Conversion, ConversionRank::ExactMatch, ConversionRank::Promotion,
    ConversionRank::Conversion, ConversionRank::Conversion, ConversionRank::Conversion, ConversionRank::Conversion, ConversionRank::ExactMatch,
];

// Category bits per conversion id: promotions in the low bits,
// conversions above.
const CAT_INTEGRAL_PROMOTION: u8 = 1;
const CAT_FLOATING_POINT_PROMOTION: u8 = 2;
const CAT_BOOLEAN_CONVERSION: u8 = 4;
const CAT_INTEGRAL_CONVERSION: u8 = 8;
const CAT_FLOATING_POINT_CONVERSION: u8 = 16;

#[rustfmt::skip]
const CONVERSION_CATEGORIES: [u8; 26] = [
    0, // copy
    0,                        CAT_INTEGRAL_PROMOTION,   CAT_INTEGRAL_PROMOTION,   CAT_FLOATING_POINT_PROMOTION, CAT_FLOATING_POINT_PROMOTION,
    CAT_BOOLEAN_CONVERSION,   0,                        CAT_INTEGRAL_PROMOTION,   CAT_FLOATING_POINT_PROMOTION, CAT_FLOATING_POINT_PROMOTION,
    CAT_BOOLEAN_CONVERSION,   CAT_INTEGRAL_CONVERSION,  0,                        CAT_FLOATING_POINT_PROMOTION, CAT_FLOATING_POINT_PROMOTION,
    CAT_BOOLEAN_CONVERSION,   CAT_INTEGRAL_CONVERSION,  CAT_INTEGRAL_CONVERSION,  0,                            CAT_FLOATING_POINT_PROMOTION,
    CAT_BOOLEAN_CONVERSION,   CAT_INTEGRAL_CONVERSION,  CAT_INTEGRAL_CONVERSION,  CAT_FLOATING_POINT_CONVERSION, 0,
];

const FUNDAMENTALS: [Type; 5] = [Type::BOOL, Type::CHAR, Type::INT, Type::FLOAT, Type::DOUBLE];

/// Whether user-defined conversion functions marked `explicit` may be
/// considered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConversionPolicy {
    #[default]
    AllowExplicit,
    NoExplicitConversions,
}

/// A builtin conversion, encoded in a single 32-bit word.
///
/// A standard conversion is one of: a copy, a reference binding, a
/// fundamental-to-fundamental conversion, a derived-to-base conversion
/// (with its depth), an enum-to-int conversion, or not-convertible; plus
/// two independent flags for qualification adjustment (adding `const`)
/// and reference conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StandardConversion(u32);

impl Default for StandardConversion {
    /// A reference conversion that, when applied to a value, has no effect.
    fn default() -> Self {
        Self(REF_CONV)
    }
}

impl StandardConversion {
    /// The no-op reference conversion.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// A plain copy without qualification adjustment.
    #[must_use]
    pub fn copy() -> Self {
        Self(0)
    }

    #[must_use]
    pub fn enum_to_int() -> Self {
        Self(ENUM_TO_INT)
    }

    #[must_use]
    pub fn derived_to_base(depth: i32, is_ref_conv: bool, qual_adjust: bool) -> Self {
        let mut d = DERIVED_TO_BASE | ((depth as u32 & DEPTH_MASK) << D2B_DEPTH_OFFSET);
        if is_ref_conv {
            d |= REF_CONV;
        }
        if qual_adjust {
            d |= CONST_QUAL_ADJUST;
        }
        Self(d)
    }

    #[must_use]
    pub fn not_convertible() -> Self {
        Self(NOT_CONVERTIBLE)
    }

    /// Builds a conversion between two fundamental types, which may be
    /// references with differing `const` qualifications.
    #[must_use]
    pub fn between_fundamentals(src: Type, dest: Type) -> Self {
        debug_assert!(src.is_fundamental() && dest.is_fundamental());

        if src.base() == Type::VOID
            || dest.base() == Type::VOID
            || (dest.is_reference() && src.base() != dest.base())
            || (dest.is_reference() && src.is_const() && !dest.is_const())
        {
            return Self::not_convertible();
        }

        let row = src.base().data() - 2;
        let col = dest.base().data() - 2;
        let mut d = STDCONV_TABLE[(row * 5 + col) as usize];
        if dest.is_reference() {
            d |= REF_CONV;
        }
        if dest.is_const() && !src.is_const() {
            d |= CONST_QUAL_ADJUST;
        }
        Self(d)
    }

    /// True for the no-op reference conversion.
    #[must_use]
    pub fn is_none(self) -> bool {
        self.0 == REF_CONV
    }

    #[must_use]
    pub fn is_copy(self) -> bool {
        self.0 & REF_CONV == 0 && self.0 & CONV_ID_MASK == 0
    }

    #[must_use]
    pub fn is_reference_conversion(self) -> bool {
        self.0 & REF_CONV != 0
    }

    #[must_use]
    pub fn has_qualification_adjustment(self) -> bool {
        self.0 & CONST_QUAL_ADJUST != 0
    }

    #[must_use]
    pub fn is_derived_to_base(self) -> bool {
        self.0 & CONV_ID_MASK == DERIVED_TO_BASE
    }

    /// Number of derivation steps of a derived-to-base conversion.
    #[must_use]
    pub fn derived_to_base_depth(self) -> i32 {
        ((self.0 >> D2B_DEPTH_OFFSET) & DEPTH_MASK) as i32
    }

    #[must_use]
    pub fn is_enum_to_int(self) -> bool {
        self.0 & CONV_ID_MASK == ENUM_TO_INT
    }

    #[must_use]
    pub fn numeric_promotion(self) -> NumericPromotion {
        match self.category() & (CAT_INTEGRAL_PROMOTION | CAT_FLOATING_POINT_PROMOTION) {
            CAT_INTEGRAL_PROMOTION => NumericPromotion::Integral,
            CAT_FLOATING_POINT_PROMOTION => NumericPromotion::FloatingPoint,
            _ => NumericPromotion::None,
        }
    }

    #[must_use]
    pub fn numeric_conversion(self) -> NumericConversion {
        match self.category() & (CAT_BOOLEAN_CONVERSION | CAT_INTEGRAL_CONVERSION | CAT_FLOATING_POINT_CONVERSION) {
            CAT_BOOLEAN_CONVERSION => NumericConversion::Boolean,
            CAT_INTEGRAL_CONVERSION => NumericConversion::Integral,
            CAT_FLOATING_POINT_CONVERSION => NumericConversion::FloatingPoint,
            _ => NumericConversion::None,
        }
    }

    #[must_use]
    pub fn is_numeric_promotion(self) -> bool {
        self.numeric_promotion() != NumericPromotion::None
    }

    #[must_use]
    pub fn is_numeric_conversion(self) -> bool {
        self.numeric_conversion() != NumericConversion::None
    }

    /// Narrowing is exactly a numeric conversion.
    #[must_use]
    pub fn is_narrowing(self) -> bool {
        self.is_numeric_conversion()
    }

    fn category(self) -> u8 {
        let id = (self.0 & CONV_ID_MASK) as usize;
        if id < CONVERSION_CATEGORIES.len() {
            CONVERSION_CATEGORIES[id]
        } else if id == ENUM_TO_INT as usize {
            CAT_INTEGRAL_CONVERSION
        } else {
            0
        }
    }

    /// The rank of this conversion; never `UserDefinedConversion`, which
    /// only the outer [`Conversion`] can produce.
    #[must_use]
    pub fn rank(self) -> ConversionRank {
        if self.is_derived_to_base() {
            return ConversionRank::Conversion;
        }
        if self.0 == NOT_CONVERTIBLE {
            return ConversionRank::NotConvertible;
        }
        let id = (self.0 & CONV_ID_MASK) as usize;
        if id == ENUM_TO_INT as usize {
            ConversionRank::Conversion
        } else {
            CONVERSION_RANKS[id]
        }
    }

    /// The source base type, when the conversion is fundamental (`AUTO`
    /// for copies, reference conversions and derived-to-base).
    #[must_use]
    pub fn src_type(self) -> Type {
        let id = self.0 & CONV_ID_MASK;
        match id {
            0 => Type::AUTO,
            1..=25 => FUNDAMENTALS[((id - 1) / 5) as usize],
            ENUM_TO_INT => Type::AUTO,
            DERIVED_TO_BASE => Type::AUTO,
            _ => Type::NULL,
        }
    }

    /// The destination base type, when the conversion is fundamental.
    #[must_use]
    pub fn dest_type(self) -> Type {
        let id = self.0 & CONV_ID_MASK;
        match id {
            0 => Type::AUTO,
            1..=25 => FUNDAMENTALS[((id - 1) % 5) as usize],
            ENUM_TO_INT => Type::INT,
            DERIVED_TO_BASE => Type::AUTO,
            _ => Type::NULL,
        }
    }

    /// Adds a qualification adjustment; cannot remove one.
    #[must_use]
    pub fn with_qual_adjustment(self, adjust: bool) -> Self {
        if adjust { Self(self.0 | CONST_QUAL_ADJUST) } else { self }
    }

    /// Computes, if possible, the standard conversion from `src` to
    /// `dest`; otherwise returns `not_convertible()`. Takes `const`-ness
    /// and references into account.
    #[must_use]
    pub fn compute(src: Type, dest: Type, ts: &TypeSystem) -> Self {
        if dest.is_reference() && src.is_const() && !dest.is_const() {
            return Self::not_convertible();
        }

        if dest.is_fundamental() && src.is_fundamental() {
            return Self::between_fundamentals(src, dest);
        }

        if src.is_object() && dest.is_object() {
            let (Some(src_class), Some(dest_class)) = (ts.get_class(src), ts.get_class(dest)) else {
                return Self::not_convertible();
            };
            let depth = src_class.inheritance_level(&dest_class);
            if depth < 0 {
                return Self::not_convertible();
            }

            let adjust = dest.is_const() && !src.is_const();

            if depth == 0 {
                if dest.is_reference() {
                    return Self::none().with_qual_adjustment(adjust);
                }
                if !dest_class.is_copy_constructible() {
                    return Self::not_convertible();
                }
                return Self::copy().with_qual_adjustment(adjust);
            }
            if !dest.is_reference() && !dest_class.is_copy_constructible() {
                return Self::not_convertible();
            }
            return Self::derived_to_base(depth, dest.is_reference(), adjust);
        }

        if src.base() == dest.base() {
            let adjust = dest.is_const() && !src.is_const();
            if dest.is_reference() {
                return Self::none();
            }
            if dest.is_enum() || dest.is_closure() || dest.is_function_type() {
                return Self::copy().with_qual_adjustment(adjust);
            }
        } else if src.is_enum() && dest.base() == Type::INT {
            if dest.is_reference() {
                return Self::not_convertible();
            }
            let adjust = dest.is_const() && !src.is_const();
            return Self::enum_to_int().with_qual_adjustment(adjust);
        }

        Self::not_convertible()
    }

    /// Applies the conversion to a value.
    pub fn apply(conv: Self, value: &Value, engine: &Engine) -> EngineResult<Value> {
        if conv.is_reference_conversion() {
            return Ok(value.clone());
        }

        if conv.is_copy() {
            return engine.copy(value);
        }

        if conv.is_derived_to_base() {
            let class = engine
                .type_system()
                .get_class(value.get_type())
                .ok_or_else(|| EngineError::unknown_type(value.get_type()))?;
            let target = class
                .indirect_base(conv.derived_to_base_depth())
                .ok_or_else(|| EngineError::conversion_error(value.get_type(), "base class"))?;
            let copy_ctor = target
                .copy_constructor()
                .ok_or_else(|| EngineError::copy_error(target.name()))?;
            return copy_ctor.invoke(engine, &[Value::void(), value.clone()]);
        }

        fundamental_conversion(value, conv.dest_type().base(), engine)
    }
}

impl PartialOrd for StandardConversion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for StandardConversion {
    /// Orders conversions for overload resolution: smaller is better.
    ///
    /// Compares rank first, then derived-to-base depth (shallower is
    /// better), then prefers reference conversions, then the absence of a
    /// qualification adjustment.
    fn cmp(&self, other: &Self) -> Ordering {
        let by_rank = self.rank().cmp(&other.rank());
        if by_rank != Ordering::Equal {
            return by_rank;
        }

        if self.is_derived_to_base() && other.is_derived_to_base() {
            let by_depth = self.derived_to_base_depth().cmp(&other.derived_to_base_depth());
            if by_depth != Ordering::Equal {
                return by_depth;
            }
        }

        match (self.is_reference_conversion(), other.is_reference_conversion()) {
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            _ => {}
        }

        match (self.has_qualification_adjustment(), other.has_qualification_adjustment()) {
            (false, true) => Ordering::Less,
            (true, false) => Ordering::Greater,
            _ => Ordering::Equal,
        }
    }
}

/// Reads a value of any fundamental (or enum) type as an `f64`.
fn numeric_value(v: &Value) -> EngineResult<f64> {
    let ty = v.get_type();
    let out = match ty.base() {
        Type::BOOL => v.as_bool().map(|b| f64::from(u8::from(b))),
        Type::CHAR => v.as_char().map(|c| f64::from(c as u32)),
        Type::INT => v.as_int().map(f64::from),
        Type::FLOAT => v.as_float().map(f64::from),
        Type::DOUBLE => v.as_double(),
        _ if ty.is_enum() => v.as_enumerator().map(|e| f64::from(e.value())),
        _ => None,
    };
    out.ok_or_else(|| EngineError::conversion_error(ty, "fundamental type"))
}

/// Builds a new value of fundamental base type `dest` from `src`.
pub(crate) fn fundamental_conversion(src: &Value, dest: Type, _engine: &Engine) -> EngineResult<Value> {
    let n = numeric_value(src)?;
    match dest.base() {
        Type::BOOL => Ok(Value::bool_(n != 0.0)),
        Type::CHAR => {
            let code = n as u32;
            Ok(Value::char_(char::from_u32(code).unwrap_or('\0')))
        }
        Type::INT => Ok(Value::int(n as i32)),
        Type::FLOAT => Ok(Value::float(n as f32)),
        Type::DOUBLE => Ok(Value::double(n)),
        other => Err(EngineError::conversion_error(src.get_type(), other)),
    }
}

/// A full conversion sequence: `std1 · user? · std2`.
///
/// The user-defined step, when present, is either a converting
/// constructor of the destination class or a conversion function of the
/// source class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversion {
    conv1: StandardConversion,
    function: Option<Function>,
    conv3: StandardConversion,
}

impl Conversion {
    #[must_use]
    pub fn new(conv1: StandardConversion, function: Option<Function>, conv3: StandardConversion) -> Self {
        Self { conv1, function, conv3 }
    }

    #[must_use]
    pub fn not_convertible() -> Self {
        Self::new(StandardConversion::not_convertible(), None, StandardConversion::none())
    }

    #[must_use]
    pub fn first_standard_conversion(&self) -> StandardConversion {
        self.conv1
    }

    #[must_use]
    pub fn user_defined_function(&self) -> Option<&Function> {
        self.function.as_ref()
    }

    #[must_use]
    pub fn second_standard_conversion(&self) -> StandardConversion {
        self.conv3
    }

    #[must_use]
    pub fn rank(&self) -> ConversionRank {
        if self.conv1 == StandardConversion::not_convertible() {
            return ConversionRank::NotConvertible;
        }
        if self.function.is_some() {
            return ConversionRank::UserDefinedConversion;
        }
        self.conv1.rank()
    }

    #[must_use]
    pub fn is_invalid(&self) -> bool {
        self.conv1.rank() == ConversionRank::NotConvertible
    }

    #[must_use]
    pub fn is_narrowing(&self) -> bool {
        self.conv1.is_narrowing() || self.conv3.is_narrowing()
    }

    #[must_use]
    pub fn is_user_defined(&self) -> bool {
        self.function.is_some()
    }

    /// Computes a conversion sequence from `src` to `dest`, trying the
    /// standard conversion first, then converting constructors of the
    /// destination class, then conversion functions of the source class.
    /// Returns `not_convertible()` when nothing matches; never errors.
    #[must_use]
    pub fn compute(src: Type, dest: Type, ts: &TypeSystem, policy: ConversionPolicy) -> Self {
        let stdconv = StandardConversion::compute(src, dest, ts);
        if stdconv != StandardConversion::not_convertible() {
            return Self::new(stdconv, None, StandardConversion::none());
        }

        if !src.is_object() && !dest.is_object() {
            return Self::not_convertible();
        }

        if dest.is_object() {
            if let Some(dest_class) = ts.get_class(dest) {
                let conv = select_converting_constructor(src, &dest_class.constructors(), dest, ts, policy);
                if !conv.is_invalid() {
                    return conv;
                }
            }
        }

        if src.is_object() {
            if let Some(src_class) = ts.get_class(src) {
                let conv = select_cast(src, &src_class.casts(), dest, ts, policy);
                if !conv.is_invalid() {
                    return conv;
                }
            }
        }

        Self::not_convertible()
    }

    /// Ranks two conversion sequences: a purely-standard conversion beats
    /// any user-defined one; two user-defined conversions compare by their
    /// second standard conversion.
    #[must_use]
    pub fn comp(a: &Self, b: &Self) -> Ordering {
        match (a.function.is_none(), b.function.is_none()) {
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            (true, true) => return a.conv1.cmp(&b.conv1),
            (false, false) => {}
        }
        a.conv3.cmp(&b.conv3)
    }

    /// Applies the conversion sequence to a value.
    pub fn apply(conv: &Self, value: &Value, engine: &Engine) -> EngineResult<Value> {
        let Some(function) = &conv.function else {
            return StandardConversion::apply(conv.conv1, value, engine);
        };

        let mut ret = StandardConversion::apply(conv.conv1, value, engine)?;
        ret = if function.is_cast() {
            function.invoke(engine, &[ret])?
        } else {
            function.invoke(engine, &[Value::void(), ret])?
        };
        StandardConversion::apply(conv.conv3, &ret, engine)
    }

    /// Applies a conversion per element over a range of values, in place.
    pub fn apply_all(convs: &[Self], values: &mut [Value], engine: &Engine) -> EngineResult<()> {
        for (conv, slot) in convs.iter().zip(values.iter_mut()) {
            *slot = Self::apply(conv, &slot.clone(), engine)?;
        }
        Ok(())
    }
}

impl From<StandardConversion> for Conversion {
    fn from(conv: StandardConversion) -> Self {
        Self::new(conv, None, StandardConversion::none())
    }
}

/// Picks the best converting constructor among `ctors`, detecting
/// ambiguity by keeping the two best first conversions.
fn select_converting_constructor(
    src: Type,
    ctors: &[Function],
    dest: Type,
    ts: &TypeSystem,
    policy: ConversionPolicy,
) -> Conversion {
    if dest.is_reference() && !dest.is_const() && src.is_const() {
        return Conversion::not_convertible();
    }

    let mut best_conv = StandardConversion::not_convertible();
    let mut best_ctor: Option<Function> = None;
    let mut ambiguous_conv = StandardConversion::not_convertible();

    for ctor in ctors {
        if ctor.parameter_count() != 2 {
            continue;
        }
        if ctor.is_explicit() && policy == ConversionPolicy::NoExplicitConversions {
            continue;
        }
        let Some(param) = ctor.parameter(1) else { continue };
        let first = StandardConversion::compute(src, param, ts);
        if first == StandardConversion::not_convertible() {
            continue;
        }

        match first.cmp(&best_conv) {
            Ordering::Less => {
                best_conv = first;
                best_ctor = Some(ctor.clone());
                ambiguous_conv = StandardConversion::not_convertible();
            }
            Ordering::Greater => {}
            Ordering::Equal => {
                ambiguous_conv = first;
            }
        }
    }

    if best_conv.cmp(&ambiguous_conv) != Ordering::Less {
        // Either nothing matched or two candidates tied.
        return Conversion::not_convertible();
    }

    Conversion::new(best_conv, best_ctor, StandardConversion::none())
}

/// Picks the first viable conversion function among `casts`.
fn select_cast(src: Type, casts: &[Function], dest: Type, ts: &TypeSystem, policy: ConversionPolicy) -> Conversion {
    for cast in casts {
        if cast.is_explicit() && policy == ConversionPolicy::NoExplicitConversions {
            continue;
        }
        let Some(source) = cast.cast_source() else { continue };
        let first = StandardConversion::compute(src, source, ts);
        if first == StandardConversion::not_convertible() {
            continue;
        }
        let Some(target) = cast.cast_target() else { continue };
        let mut second = StandardConversion::compute(target, dest, ts);
        if second == StandardConversion::not_convertible() {
            continue;
        }
        // Collapse a trailing copy to identity to avoid a spurious copy.
        if second == StandardConversion::copy() {
            second = StandardConversion::none();
        }
        return Conversion::new(first, Some(cast.clone()), second);
    }

    Conversion::not_convertible()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fundamental_matrix_ranks() {
        let ts = TypeSystem::new();
        // identity
        assert_eq!(
            StandardConversion::compute(Type::INT, Type::INT, &ts).rank(),
            ConversionRank::ExactMatch
        );
        // promotion
        assert_eq!(
            StandardConversion::compute(Type::BOOL, Type::INT, &ts).rank(),
            ConversionRank::Promotion
        );
        assert_eq!(
            StandardConversion::compute(Type::INT, Type::DOUBLE, &ts).rank(),
            ConversionRank::Promotion
        );
        // narrowing
        assert_eq!(
            StandardConversion::compute(Type::DOUBLE, Type::INT, &ts).rank(),
            ConversionRank::Conversion
        );
        assert!(StandardConversion::compute(Type::DOUBLE, Type::INT, &ts).is_narrowing());
    }

    #[test]
    fn const_discipline_on_references() {
        let ts = TypeSystem::new();
        let conv = StandardConversion::compute(Type::INT.with_const(), Type::reference(Type::INT), &ts);
        assert_eq!(conv, StandardConversion::not_convertible());

        let conv = StandardConversion::compute(Type::INT, Type::const_reference(Type::INT), &ts);
        assert!(conv.is_reference_conversion());
        assert!(conv.has_qualification_adjustment());
        assert_eq!(conv.rank(), ConversionRank::ExactMatch);
    }

    #[test]
    fn void_is_never_convertible() {
        let ts = TypeSystem::new();
        assert_eq!(
            StandardConversion::compute(Type::VOID, Type::INT, &ts),
            StandardConversion::not_convertible()
        );
        assert_eq!(
            StandardConversion::compute(Type::INT, Type::VOID, &ts),
            StandardConversion::not_convertible()
        );
    }

    #[test]
    fn ordering_prefers_better_rank_and_fewer_adjustments() {
        let exact = StandardConversion::copy();
        let ts = TypeSystem::new();
        let promo = StandardConversion::compute(Type::INT, Type::DOUBLE, &ts);
        assert!(exact < promo);

        let plain_ref = StandardConversion::none();
        let adjusted_ref = StandardConversion::none().with_qual_adjustment(true);
        assert!(plain_ref < adjusted_ref);

        let shallow = StandardConversion::derived_to_base(1, true, false);
        let deep = StandardConversion::derived_to_base(3, true, false);
        assert!(shallow < deep);
    }

    #[test]
    fn conversion_src_dest_types() {
        let ts = TypeSystem::new();
        let conv = StandardConversion::compute(Type::BOOL, Type::INT, &ts);
        assert_eq!(conv.src_type(), Type::BOOL);
        assert_eq!(conv.dest_type(), Type::INT);
        assert_eq!(StandardConversion::enum_to_int().dest_type(), Type::INT);
    }
}
