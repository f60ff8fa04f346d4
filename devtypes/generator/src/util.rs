// Licensed under the Apache-2.0 license

//! Utility functions for identifier conversion and literal formatting.
//!
//! Everything emitted by the backends is C/C++ source, so names taken from
//! the catalog have to be turned into identifiers and values into literals.

/// Converts arbitrary text to a C identifier.
///
/// Every character outside `[A-Za-z0-9_]` becomes `_`, and a leading digit
/// gets an underscore prefix. Case is preserved so the symbol table and the
/// decoders derive the same identifier from the same name.
///
/// # Examples
/// ```
/// use devtypes_generator::util::c_ident;
/// assert_eq!(c_ident("temp.C"), "temp_C");
/// assert_eq!(c_ident("9DOF"), "_9DOF");
/// ```
pub fn c_ident(name: &str) -> String {
    let mut result = String::with_capacity(name.len() + 1);
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        result.push('_');
    }
    result.extend(name.chars().map(|c| {
        if c.is_ascii_alphanumeric() || c == '_' {
            c
        } else {
            '_'
        }
    }));
    result
}

/// Quotes text as a C string literal, escaping where required.
///
/// # Examples
/// ```
/// use devtypes_generator::util::c_string_literal;
/// assert_eq!(c_string_literal(r#"a"b\c"#), r#""a\"b\\c""#);
/// ```
pub fn c_string_literal(text: &str) -> String {
    let mut result = String::with_capacity(text.len() + 2);
    result.push('"');
    for c in text.chars() {
        match c {
            '"' => result.push_str("\\\""),
            '\\' => result.push_str("\\\\"),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            c => result.push(c),
        }
    }
    result.push('"');
    result
}

/// Wraps text in a C++ raw string literal so it can be inlined verbatim.
///
/// The plain `R"(...)"` form is used unless the text itself contains `)"`,
/// in which case a named delimiter is chosen that does not occur in the text.
///
/// # Examples
/// ```
/// use devtypes_generator::util::raw_string_literal;
/// assert_eq!(raw_string_literal(r#"{"a":1}"#), r#"R"({"a":1})""#);
/// ```
pub fn raw_string_literal(text: &str) -> String {
    if !text.contains(")\"") {
        return format!("R\"({text})\"");
    }
    let mut delim = String::from("raw");
    while text.contains(&format!("){delim}\"")) {
        delim.push('_');
    }
    format!("R\"{delim}({text}){delim}\"")
}

/// Formats a number the way it is written in integer arithmetic.
///
/// Whole values print without a fractional part; anything else falls back
/// to the float text.
pub fn c_number(val: f64) -> String {
    if val.fract() == 0.0 && val.abs() < 1e15 {
        format!("{}", val as i64)
    } else {
        format!("{val:?}")
    }
}

/// Formats a number as a C `float` literal.
///
/// # Examples
/// ```
/// use devtypes_generator::util::c_float;
/// assert_eq!(c_float(10.0), "10.0f");
/// assert_eq!(c_float(0.25), "0.25f");
/// ```
pub fn c_float(val: f64) -> String {
    format!("{val:?}f")
}

/// Formats a bus address the way the tables spell it (`0x0a`).
pub fn hex_addr(addr: u8) -> String {
    format!("0x{addr:02x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_c_ident() {
        assert_eq!(c_ident("prox"), "prox");
        assert_eq!(c_ident("x-axis"), "x_axis");
        assert_eq!(c_ident("3v3"), "_3v3");
        assert_eq!(c_ident("Temp °C"), "Temp__C");
        assert_eq!(c_ident(""), "");
    }

    #[test]
    fn test_raw_string_literal() {
        assert_eq!(raw_string_literal(""), "R\"()\"");
        assert_eq!(raw_string_literal("0x60"), "R\"(0x60)\"");
        assert_eq!(
            raw_string_literal("a)\"b"),
            "R\"raw(a)\"b)raw\""
        );
        assert_eq!(
            raw_string_literal("a)\"b)raw\""),
            "R\"raw_(a)\"b)raw\")raw_\""
        );
    }

    #[test]
    fn test_c_number() {
        assert_eq!(c_number(10.0), "10");
        assert_eq!(c_number(-3.0), "-3");
        assert_eq!(c_number(0.5), "0.5");
    }

    #[test]
    fn test_c_float() {
        assert_eq!(c_float(1.0), "1.0f");
        assert_eq!(c_float(-40.0), "-40.0f");
        assert_eq!(c_float(0.1), "0.1f");
    }

    #[test]
    fn test_hex_addr() {
        assert_eq!(hex_addr(0), "0x00");
        assert_eq!(hex_addr(0x7f), "0x7f");
    }
}
