//! Value converters
//!
//! Generated wrappers implement [`Converters`] with an empty body and refer to
//! the default methods by name: `decode_<type>` for arguments, `to_<type>` for
//! results and `default_<type>` for arguments the caller may leave out. A
//! wrapper overrides a method to change how one type crosses the boundary.
//! Sequences append `_sequence` to the element's name (`to_dom_string_sequence`,
//! `decode_entity_sequence`).
//!
//! Numeric decoders follow the usual script-to-integer rules: the value is
//! converted to a number, non-finite values become 0, and the rest is truncated
//! and wrapped into the target width.

use std::rc::Rc;

use rquickjs::Value;

use super::boundary;
use super::call::CallInfo;
use super::entity::{downcast_entity, Entity, EntityRef};
use super::value::ScriptValue;
use crate::core::error::{BindingError, BindingResult};

fn to_number<'js>(info: &CallInfo<'js>, value: &Value<'js>) -> BindingResult<f64> {
    if let Some(number) = value.as_number() {
        return Ok(number);
    }
    boundary::call_global::<f64>(info.ctx(), "Number", value.clone())
        .map_err(|_| BindingError::native("value cannot be converted to a number"))
}

/// Truncates `number` and wraps it into a `bits` wide integer.
fn wrap_integer(number: f64, bits: i32, signed: bool) -> f64 {
    if !number.is_finite() {
        return 0.0;
    }
    let modulus = 2f64.powi(bits);
    let wrapped = number.trunc().rem_euclid(modulus);
    if signed && wrapped >= modulus / 2.0 {
        wrapped - modulus
    } else {
        wrapped
    }
}

fn is_nullish(value: &Value<'_>) -> bool {
    value.is_null() || value.is_undefined()
}

fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}

macro_rules! integer_converters {
    ($($ty:ty, $bits:expr, $signed:expr => $decode:ident, $decode_nullable:ident, $to:ident, $to_nullable:ident, $default:ident;)*) => {
        $(
            fn $decode<'js>(info: &CallInfo<'js>, value: &Value<'js>) -> BindingResult<$ty> {
                let number = to_number(info, value)?;
                Ok(wrap_integer(number, $bits, $signed) as $ty)
            }

            fn $decode_nullable<'js>(
                info: &CallInfo<'js>,
                value: &Value<'js>,
            ) -> BindingResult<Option<$ty>> {
                if is_nullish(value) {
                    Ok(None)
                } else {
                    Self::$decode(info, value).map(Some)
                }
            }

            fn $to<'js>(info: &CallInfo<'js>, value: $ty) -> BindingResult<Value<'js>> {
                Ok(Value::new_number(info.ctx().clone(), value as f64))
            }

            fn $to_nullable<'js>(
                info: &CallInfo<'js>,
                value: Option<$ty>,
            ) -> BindingResult<Value<'js>> {
                match value {
                    Some(value) => Self::$to(info, value),
                    None => Ok(Value::new_null(info.ctx().clone())),
                }
            }

            fn $default() -> $ty {
                0
            }
        )*
    };
}

macro_rules! float_converters {
    ($($ty:ty, $restricted:expr => $decode:ident, $decode_nullable:ident, $to:ident, $to_nullable:ident, $default:ident;)*) => {
        $(
            fn $decode<'js>(info: &CallInfo<'js>, value: &Value<'js>) -> BindingResult<$ty> {
                let number = to_number(info, value)? as $ty;
                if $restricted && !number.is_finite() {
                    return Err(BindingError::native("value is not a finite number"));
                }
                Ok(number)
            }

            fn $decode_nullable<'js>(
                info: &CallInfo<'js>,
                value: &Value<'js>,
            ) -> BindingResult<Option<$ty>> {
                if is_nullish(value) {
                    Ok(None)
                } else {
                    Self::$decode(info, value).map(Some)
                }
            }

            fn $to<'js>(info: &CallInfo<'js>, value: $ty) -> BindingResult<Value<'js>> {
                Ok(Value::new_number(info.ctx().clone(), value as f64))
            }

            fn $to_nullable<'js>(
                info: &CallInfo<'js>,
                value: Option<$ty>,
            ) -> BindingResult<Value<'js>> {
                match value {
                    Some(value) => Self::$to(info, value),
                    None => Ok(Value::new_null(info.ctx().clone())),
                }
            }

            fn $default() -> $ty {
                0.0
            }
        )*
    };
}

macro_rules! sequence_converters {
    ($($ty:ty => $decode_element:ident, $to_element:ident => $decode:ident, $decode_nullable:ident, $to:ident, $to_nullable:ident, $default:ident;)*) => {
        $(
            fn $decode<'js>(info: &CallInfo<'js>, value: &Value<'js>) -> BindingResult<Vec<$ty>> {
                let array = value
                    .as_array()
                    .ok_or_else(|| BindingError::native("value is not an array"))?;
                let mut items = Vec::with_capacity(array.len());
                for i in 0..array.len() {
                    let item: Value<'js> = array.get(i)?;
                    items.push(Self::$decode_element(info, &item)?);
                }
                Ok(items)
            }

            fn $decode_nullable<'js>(
                info: &CallInfo<'js>,
                value: &Value<'js>,
            ) -> BindingResult<Option<Vec<$ty>>> {
                if is_nullish(value) {
                    Ok(None)
                } else {
                    Self::$decode(info, value).map(Some)
                }
            }

            fn $to<'js>(info: &CallInfo<'js>, values: Vec<$ty>) -> BindingResult<Value<'js>> {
                let array = rquickjs::Array::new(info.ctx().clone())?;
                for (i, value) in values.into_iter().enumerate() {
                    array.set(i, Self::$to_element(info, value)?)?;
                }
                Ok(array.into_value())
            }

            fn $to_nullable<'js>(
                info: &CallInfo<'js>,
                values: Option<Vec<$ty>>,
            ) -> BindingResult<Value<'js>> {
                match values {
                    Some(values) => Self::$to(info, values),
                    None => Ok(Value::new_null(info.ctx().clone())),
                }
            }

            fn $default() -> Vec<$ty> {
                Vec::new()
            }
        )*
    };
}

/// Default conversions between script values and native types.
pub trait Converters {
    // ------------------------------------------------------------------
    // Strings
    // ------------------------------------------------------------------

    fn decode_dom_string<'js>(info: &CallInfo<'js>, value: &Value<'js>) -> BindingResult<String> {
        if let Some(string) = value.as_string() {
            return Ok(string.to_string()?);
        }
        if value.is_symbol() {
            return Err(BindingError::native("a symbol cannot be converted to a string"));
        }
        boundary::call_global::<String>(info.ctx(), "String", value.clone())
            .map_err(|_| BindingError::native("value cannot be converted to a string"))
    }

    fn decode_nullable_dom_string<'js>(
        info: &CallInfo<'js>,
        value: &Value<'js>,
    ) -> BindingResult<Option<String>> {
        if is_nullish(value) {
            Ok(None)
        } else {
            Self::decode_dom_string(info, value).map(Some)
        }
    }

    fn to_dom_string<'js>(info: &CallInfo<'js>, value: String) -> BindingResult<Value<'js>> {
        let string = rquickjs::String::from_str(info.ctx().clone(), &value)?;
        Ok(string.into_value())
    }

    fn to_nullable_dom_string<'js>(
        info: &CallInfo<'js>,
        value: Option<String>,
    ) -> BindingResult<Value<'js>> {
        match value {
            Some(value) => Self::to_dom_string(info, value),
            None => Ok(Value::new_null(info.ctx().clone())),
        }
    }

    fn default_dom_string() -> String {
        String::new()
    }

    fn decode_usv_string<'js>(info: &CallInfo<'js>, value: &Value<'js>) -> BindingResult<String> {
        Self::decode_dom_string(info, value)
    }

    fn decode_nullable_usv_string<'js>(
        info: &CallInfo<'js>,
        value: &Value<'js>,
    ) -> BindingResult<Option<String>> {
        Self::decode_nullable_dom_string(info, value)
    }

    fn to_usv_string<'js>(info: &CallInfo<'js>, value: String) -> BindingResult<Value<'js>> {
        Self::to_dom_string(info, value)
    }

    fn to_nullable_usv_string<'js>(
        info: &CallInfo<'js>,
        value: Option<String>,
    ) -> BindingResult<Value<'js>> {
        Self::to_nullable_dom_string(info, value)
    }

    fn default_usv_string() -> String {
        String::new()
    }

    // ------------------------------------------------------------------
    // Booleans
    // ------------------------------------------------------------------

    fn decode_boolean<'js>(info: &CallInfo<'js>, value: &Value<'js>) -> BindingResult<bool> {
        if let Some(b) = value.as_bool() {
            return Ok(b);
        }
        Ok(boundary::call_global::<bool>(info.ctx(), "Boolean", value.clone())?)
    }

    fn decode_nullable_boolean<'js>(
        info: &CallInfo<'js>,
        value: &Value<'js>,
    ) -> BindingResult<Option<bool>> {
        if is_nullish(value) {
            Ok(None)
        } else {
            Self::decode_boolean(info, value).map(Some)
        }
    }

    fn to_boolean<'js>(info: &CallInfo<'js>, value: bool) -> BindingResult<Value<'js>> {
        Ok(Value::new_bool(info.ctx().clone(), value))
    }

    fn to_nullable_boolean<'js>(
        info: &CallInfo<'js>,
        value: Option<bool>,
    ) -> BindingResult<Value<'js>> {
        match value {
            Some(value) => Self::to_boolean(info, value),
            None => Ok(Value::new_null(info.ctx().clone())),
        }
    }

    fn default_boolean() -> bool {
        false
    }

    // ------------------------------------------------------------------
    // Numbers
    // ------------------------------------------------------------------

    integer_converters! {
        i8, 8, true => decode_byte, decode_nullable_byte, to_byte, to_nullable_byte, default_byte;
        u8, 8, false => decode_octet, decode_nullable_octet, to_octet, to_nullable_octet, default_octet;
        i16, 16, true => decode_short, decode_nullable_short, to_short, to_nullable_short, default_short;
        u16, 16, false => decode_unsigned_short, decode_nullable_unsigned_short, to_unsigned_short, to_nullable_unsigned_short, default_unsigned_short;
        i32, 32, true => decode_long, decode_nullable_long, to_long, to_nullable_long, default_long;
        u32, 32, false => decode_unsigned_long, decode_nullable_unsigned_long, to_unsigned_long, to_nullable_unsigned_long, default_unsigned_long;
        i64, 64, true => decode_long_long, decode_nullable_long_long, to_long_long, to_nullable_long_long, default_long_long;
        u64, 64, false => decode_unsigned_long_long, decode_nullable_unsigned_long_long, to_unsigned_long_long, to_nullable_unsigned_long_long, default_unsigned_long_long;
    }

    float_converters! {
        f32, true => decode_float, decode_nullable_float, to_float, to_nullable_float, default_float;
        f32, false => decode_unrestricted_float, decode_nullable_unrestricted_float, to_unrestricted_float, to_nullable_unrestricted_float, default_unrestricted_float;
        f64, true => decode_double, decode_nullable_double, to_double, to_nullable_double, default_double;
        f64, false => decode_unrestricted_double, decode_nullable_unrestricted_double, to_unrestricted_double, to_nullable_unrestricted_double, default_unrestricted_double;
    }

    // ------------------------------------------------------------------
    // any
    // ------------------------------------------------------------------

    fn decode_any<'js>(info: &CallInfo<'js>, value: &Value<'js>) -> BindingResult<ScriptValue> {
        Ok(info.scope().to_script_value(value))
    }

    fn decode_nullable_any<'js>(
        info: &CallInfo<'js>,
        value: &Value<'js>,
    ) -> BindingResult<ScriptValue> {
        Self::decode_any(info, value)
    }

    fn to_any<'js>(info: &CallInfo<'js>, value: ScriptValue) -> BindingResult<Value<'js>> {
        Ok(value.to_js(info.scope())?)
    }

    fn to_nullable_any<'js>(info: &CallInfo<'js>, value: ScriptValue) -> BindingResult<Value<'js>> {
        Self::to_any(info, value)
    }

    fn default_any() -> ScriptValue {
        ScriptValue::Undefined
    }

    // ------------------------------------------------------------------
    // Sequences
    // ------------------------------------------------------------------

    sequence_converters! {
        String => decode_dom_string, to_dom_string => decode_dom_string_sequence, decode_nullable_dom_string_sequence, to_dom_string_sequence, to_nullable_dom_string_sequence, default_dom_string_sequence;
        String => decode_usv_string, to_usv_string => decode_usv_string_sequence, decode_nullable_usv_string_sequence, to_usv_string_sequence, to_nullable_usv_string_sequence, default_usv_string_sequence;
        bool => decode_boolean, to_boolean => decode_boolean_sequence, decode_nullable_boolean_sequence, to_boolean_sequence, to_nullable_boolean_sequence, default_boolean_sequence;
        i8 => decode_byte, to_byte => decode_byte_sequence, decode_nullable_byte_sequence, to_byte_sequence, to_nullable_byte_sequence, default_byte_sequence;
        u8 => decode_octet, to_octet => decode_octet_sequence, decode_nullable_octet_sequence, to_octet_sequence, to_nullable_octet_sequence, default_octet_sequence;
        i16 => decode_short, to_short => decode_short_sequence, decode_nullable_short_sequence, to_short_sequence, to_nullable_short_sequence, default_short_sequence;
        u16 => decode_unsigned_short, to_unsigned_short => decode_unsigned_short_sequence, decode_nullable_unsigned_short_sequence, to_unsigned_short_sequence, to_nullable_unsigned_short_sequence, default_unsigned_short_sequence;
        i32 => decode_long, to_long => decode_long_sequence, decode_nullable_long_sequence, to_long_sequence, to_nullable_long_sequence, default_long_sequence;
        u32 => decode_unsigned_long, to_unsigned_long => decode_unsigned_long_sequence, decode_nullable_unsigned_long_sequence, to_unsigned_long_sequence, to_nullable_unsigned_long_sequence, default_unsigned_long_sequence;
        i64 => decode_long_long, to_long_long => decode_long_long_sequence, decode_nullable_long_long_sequence, to_long_long_sequence, to_nullable_long_long_sequence, default_long_long_sequence;
        u64 => decode_unsigned_long_long, to_unsigned_long_long => decode_unsigned_long_long_sequence, decode_nullable_unsigned_long_long_sequence, to_unsigned_long_long_sequence, to_nullable_unsigned_long_long_sequence, default_unsigned_long_long_sequence;
        f32 => decode_float, to_float => decode_float_sequence, decode_nullable_float_sequence, to_float_sequence, to_nullable_float_sequence, default_float_sequence;
        f32 => decode_unrestricted_float, to_unrestricted_float => decode_unrestricted_float_sequence, decode_nullable_unrestricted_float_sequence, to_unrestricted_float_sequence, to_nullable_unrestricted_float_sequence, default_unrestricted_float_sequence;
        f64 => decode_double, to_double => decode_double_sequence, decode_nullable_double_sequence, to_double_sequence, to_nullable_double_sequence, default_double_sequence;
        f64 => decode_unrestricted_double, to_unrestricted_double => decode_unrestricted_double_sequence, decode_nullable_unrestricted_double_sequence, to_unrestricted_double_sequence, to_nullable_unrestricted_double_sequence, default_unrestricted_double_sequence;
        ScriptValue => decode_any, to_any => decode_any_sequence, decode_nullable_any_sequence, to_any_sequence, to_nullable_any_sequence, default_any_sequence;
    }

    // ------------------------------------------------------------------
    // Entities
    // ------------------------------------------------------------------

    /// Accepts only objects created by the calling context for a `T`.
    fn decode_entity<'js, T: Entity>(
        info: &CallInfo<'js>,
        value: &Value<'js>,
    ) -> BindingResult<Rc<T>> {
        let expected = || BindingError::native(format!("value is not a {}", short_type_name::<T>()));
        let object = value.as_object().ok_or_else(expected)?;
        let entity = info
            .scope()
            .lookup_native_for(object)
            .map_err(|_| expected())?;
        downcast_entity::<T>(&entity).ok_or_else(expected)
    }

    fn decode_nullable_entity<'js, T: Entity>(
        info: &CallInfo<'js>,
        value: &Value<'js>,
    ) -> BindingResult<Option<Rc<T>>> {
        if is_nullish(value) {
            Ok(None)
        } else {
            Self::decode_entity(info, value).map(Some)
        }
    }

    fn to_entity<'js>(info: &CallInfo<'js>, value: EntityRef) -> BindingResult<Value<'js>> {
        info.wrap(value)
    }

    fn to_nullable_entity<'js>(
        info: &CallInfo<'js>,
        value: Option<EntityRef>,
    ) -> BindingResult<Value<'js>> {
        info.wrap_nullable(value)
    }

    fn decode_entity_sequence<'js, T: Entity>(
        info: &CallInfo<'js>,
        value: &Value<'js>,
    ) -> BindingResult<Vec<Rc<T>>> {
        let array = value
            .as_array()
            .ok_or_else(|| BindingError::native("value is not an array"))?;
        let mut items = Vec::with_capacity(array.len());
        for i in 0..array.len() {
            let item: Value<'js> = array.get(i)?;
            items.push(Self::decode_entity::<T>(info, &item)?);
        }
        Ok(items)
    }

    fn decode_nullable_entity_sequence<'js, T: Entity>(
        info: &CallInfo<'js>,
        value: &Value<'js>,
    ) -> BindingResult<Option<Vec<Rc<T>>>> {
        if is_nullish(value) {
            Ok(None)
        } else {
            Self::decode_entity_sequence(info, value).map(Some)
        }
    }

    fn default_entity_sequence<T: Entity>() -> Vec<Rc<T>> {
        Vec::new()
    }

    fn to_entity_sequence<'js>(
        info: &CallInfo<'js>,
        values: Vec<EntityRef>,
    ) -> BindingResult<Value<'js>> {
        let array = rquickjs::Array::new(info.ctx().clone())?;
        for (i, entity) in values.into_iter().enumerate() {
            array.set(i, info.wrap(entity)?)?;
        }
        Ok(array.into_value())
    }

    fn to_nullable_entity_sequence<'js>(
        info: &CallInfo<'js>,
        values: Option<Vec<EntityRef>>,
    ) -> BindingResult<Value<'js>> {
        match values {
            Some(values) => Self::to_entity_sequence(info, values),
            None => Ok(Value::new_null(info.ctx().clone())),
        }
    }
}
