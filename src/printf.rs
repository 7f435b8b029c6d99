//! printf-style message rendering
//!
//! Log calls take a printf format string plus a list of [`Arg`] values. The
//! directive grammar is the one the color tokenizer recognises:
//! `%[flags][width][.precision]verb`, with `%%` for a literal percent sign.

use std::fmt;

use crate::color::directive_len;

/// A single log argument
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Int(i64),
    Uint(u64),
    Float(f64),
    Bool(bool),
    Char(char),
    Str(String),
    /// Address rendered by `%p`
    Ptr(usize),
    /// Any other value, captured through its `Display` or `Debug` impl
    Value {
        text: String,
        type_name: &'static str,
    },
}

impl Arg {
    /// Capture a value through its `Display` impl
    pub fn display<T: fmt::Display + ?Sized>(value: &T) -> Self {
        Arg::Value {
            text: value.to_string(),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Capture a value through its `Debug` impl
    pub fn debug<T: fmt::Debug + ?Sized>(value: &T) -> Self {
        Arg::Value {
            text: format!("{:?}", value),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Capture the address of a value
    pub fn pointer<T: ?Sized>(value: &T) -> Self {
        Arg::Ptr(value as *const T as *const () as usize)
    }

    /// Name of the argument's type as shown by `%T`
    pub fn type_name(&self) -> &'static str {
        match self {
            Arg::Int(_) => "i64",
            Arg::Uint(_) => "u64",
            Arg::Float(_) => "f64",
            Arg::Bool(_) => "bool",
            Arg::Char(_) => "char",
            Arg::Str(_) => "String",
            Arg::Ptr(_) => "pointer",
            Arg::Value { type_name, .. } => *type_name,
        }
    }

    fn as_float(&self) -> Option<f64> {
        match self {
            Arg::Int(i) => Some(*i as f64),
            Arg::Uint(u) => Some(*u as f64),
            Arg::Float(f) => Some(*f),
            _ => None,
        }
    }

    fn as_code_point(&self) -> Option<u32> {
        match self {
            Arg::Int(i) => u32::try_from(*i).ok(),
            Arg::Uint(u) => u32::try_from(*u).ok(),
            Arg::Char(c) => Some(*c as u32),
            _ => None,
        }
    }

    fn as_text(&self) -> Option<&str> {
        match self {
            Arg::Str(s) => Some(s),
            Arg::Value { text, .. } => Some(text),
            _ => None,
        }
    }
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Int(i) => write!(f, "{}", i),
            Arg::Uint(u) => write!(f, "{}", u),
            Arg::Float(x) => f.write_str(&format_general(*x, None, false, false)),
            Arg::Bool(b) => write!(f, "{}", b),
            Arg::Char(c) => write!(f, "{}", c),
            Arg::Str(s) => f.write_str(s),
            Arg::Ptr(p) => write!(f, "0x{:x}", p),
            Arg::Value { text, .. } => f.write_str(text),
        }
    }
}

macro_rules! impl_from_int {
    ($variant:ident, $wide:ty, $($t:ty),+) => {
        $(
            impl From<$t> for Arg {
                fn from(v: $t) -> Self {
                    Arg::$variant(v as $wide)
                }
            }

            impl From<&$t> for Arg {
                fn from(v: &$t) -> Self {
                    Arg::$variant(*v as $wide)
                }
            }
        )+
    };
}

impl_from_int!(Int, i64, i8, i16, i32, i64, isize);
impl_from_int!(Uint, u64, u8, u16, u32, u64, usize);
impl_from_int!(Float, f64, f32, f64);

impl From<bool> for Arg {
    fn from(v: bool) -> Self {
        Arg::Bool(v)
    }
}

impl From<&bool> for Arg {
    fn from(v: &bool) -> Self {
        Arg::Bool(*v)
    }
}

impl From<char> for Arg {
    fn from(v: char) -> Self {
        Arg::Char(v)
    }
}

impl From<&str> for Arg {
    fn from(v: &str) -> Self {
        Arg::Str(v.to_string())
    }
}

impl From<String> for Arg {
    fn from(v: String) -> Self {
        Arg::Str(v)
    }
}

impl From<&String> for Arg {
    fn from(v: &String) -> Self {
        Arg::Str(v.clone())
    }
}

impl From<&std::path::Path> for Arg {
    fn from(v: &std::path::Path) -> Self {
        Arg::Str(v.display().to_string())
    }
}

impl From<&std::path::PathBuf> for Arg {
    fn from(v: &std::path::PathBuf) -> Self {
        Arg::Str(v.display().to_string())
    }
}

/// Borrowing conversion into [`Arg`], used by the logging macros so
/// arguments are not moved out of the caller
pub trait ToArg {
    fn to_arg(&self) -> Arg;
}

macro_rules! impl_to_arg_copy {
    ($($t:ty),*) => {
        $(
            impl ToArg for $t {
                fn to_arg(&self) -> Arg {
                    Arg::from(*self)
                }
            }
        )*
    };
}

impl_to_arg_copy!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64, bool, char);

impl ToArg for str {
    fn to_arg(&self) -> Arg {
        Arg::from(self)
    }
}

impl ToArg for String {
    fn to_arg(&self) -> Arg {
        Arg::from(self)
    }
}

impl ToArg for std::path::Path {
    fn to_arg(&self) -> Arg {
        Arg::from(self)
    }
}

impl ToArg for std::path::PathBuf {
    fn to_arg(&self) -> Arg {
        Arg::from(self)
    }
}

impl ToArg for Arg {
    fn to_arg(&self) -> Arg {
        self.clone()
    }
}

impl<T: ToArg + ?Sized> ToArg for &T {
    fn to_arg(&self) -> Arg {
        (**self).to_arg()
    }
}

/// A parsed `%[flags][width][.precision]verb` directive
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Directive {
    minus: bool,
    plus: bool,
    space: bool,
    zero: bool,
    sharp: bool,
    width: Option<usize>,
    precision: Option<usize>,
    bad_width: bool,
    bad_precision: bool,
    verb: u8,
}

/// Largest width or precision a directive may ask for
const MAX_PADDING: usize = 1_000_000;

impl Directive {
    /// Parse a directive already validated by `directive_len`
    fn parse(directive: &str) -> Self {
        let bytes = directive.as_bytes();
        let mut d = Directive::default();
        let mut i = 1;

        while i < bytes.len() {
            match bytes[i] {
                b'-' => d.minus = true,
                b'+' => d.plus = true,
                b' ' => d.space = true,
                b'0' => d.zero = true,
                b'#' => d.sharp = true,
                _ => break,
            }
            i += 1;
        }

        let (width, next) = read_number(bytes, i);
        match width {
            Some(w) if w > MAX_PADDING => d.bad_width = true,
            _ => d.width = width,
        }
        i = next;

        if bytes.get(i) == Some(&b'.') {
            let (precision, next) = read_number(bytes, i + 1);
            match precision.unwrap_or(0) {
                p if p > MAX_PADDING => d.bad_precision = true,
                p => d.precision = Some(p),
            }
            i = next;
        }

        d.verb = bytes.get(i).copied().unwrap_or(b'v');
        d
    }

    /// Render one argument; an oversized width or precision is reported
    /// in front of the value and otherwise ignored
    fn render(&self, arg: &Arg) -> String {
        let mut out = String::new();
        if self.bad_width {
            out.push_str("%!(BADWIDTH)");
        }
        if self.bad_precision {
            out.push_str("%!(BADPREC)");
        }
        let body = match self.format(arg) {
            Some((body, numeric)) => self.pad(body, numeric),
            None => format!("%!{}({}={})", self.verb as char, arg.type_name(), arg),
        };
        out.push_str(&body);
        out
    }

    /// Format the argument without padding; the flag says whether zero
    /// padding applies. `None` means the verb does not fit the argument.
    fn format(&self, arg: &Arg) -> Option<(String, bool)> {
        match self.verb {
            b'v' => Some(match arg {
                Arg::Int(_) | Arg::Uint(_) => (self.integer(arg, b'd')?, true),
                Arg::Float(x) => self.float(*x, b'g'),
                Arg::Str(_) | Arg::Value { .. } => (self.text(arg.as_text()?), false),
                _ => (arg.to_string(), false),
            }),
            b's' => Some(match arg.as_text() {
                Some(text) => (self.text(text), false),
                None => (self.text(&arg.to_string()), false),
            }),
            b'd' => match arg {
                Arg::Char(c) => Some((self.unsigned(false, *c as u128, b'd'), true)),
                _ => Some((self.integer(arg, b'd')?, true)),
            },
            b'x' | b'X' => match arg {
                Arg::Str(_) | Arg::Value { .. } => {
                    let text = arg.as_text()?;
                    let hex: String = text
                        .bytes()
                        .map(|b| {
                            if self.verb == b'x' {
                                format!("{:02x}", b)
                            } else {
                                format!("{:02X}", b)
                            }
                        })
                        .collect();
                    Some((hex, false))
                }
                Arg::Char(c) => Some((self.unsigned(false, *c as u128, self.verb), true)),
                _ => Some((self.integer(arg, self.verb)?, true)),
            },
            b'o' | b'b' => Some((self.integer(arg, self.verb)?, true)),
            b'c' => {
                let c = char::from_u32(arg.as_code_point()?)?;
                Some((c.to_string(), false))
            }
            b'q' => match arg {
                Arg::Str(_) | Arg::Value { .. } => Some((format!("{:?}", arg.as_text()?), false)),
                _ => {
                    let c = char::from_u32(arg.as_code_point()?)?;
                    Some((format!("{:?}", c), false))
                }
            },
            b'U' => Some((format!("U+{:04X}", arg.as_code_point()?), false)),
            b'e' | b'E' | b'f' | b'F' | b'g' | b'G' => Some(self.float(arg.as_float()?, self.verb)),
            b't' => match arg {
                Arg::Bool(b) => Some((b.to_string(), false)),
                _ => None,
            },
            b'p' => match arg {
                Arg::Ptr(p) => Some((format!("0x{:x}", p), false)),
                Arg::Uint(u) => Some((format!("0x{:x}", u), false)),
                _ => None,
            },
            b'T' => Some((arg.type_name().to_string(), false)),
            _ => None,
        }
    }

    fn text(&self, text: &str) -> String {
        match self.precision {
            Some(p) => text.chars().take(p).collect(),
            None => text.to_string(),
        }
    }

    fn integer(&self, arg: &Arg, verb: u8) -> Option<String> {
        match arg {
            Arg::Int(i) => Some(self.unsigned(*i < 0, (*i as i128).unsigned_abs(), verb)),
            Arg::Uint(u) => Some(self.unsigned(false, *u as u128, verb)),
            _ => None,
        }
    }

    fn unsigned(&self, negative: bool, magnitude: u128, verb: u8) -> String {
        let mut digits = match verb {
            b'x' => format!("{:x}", magnitude),
            b'X' => format!("{:X}", magnitude),
            b'o' => format!("{:o}", magnitude),
            b'b' => format!("{:b}", magnitude),
            _ => magnitude.to_string(),
        };
        if let Some(p) = self.precision {
            if digits.len() < p {
                digits = "0".repeat(p - digits.len()) + &digits;
            }
        }
        let prefix = match (self.sharp, verb) {
            (true, b'x') => "0x",
            (true, b'X') => "0X",
            (true, b'o') => "0",
            _ => "",
        };
        format!("{}{}{}", self.sign(negative), prefix, digits)
    }

    fn sign(&self, negative: bool) -> &'static str {
        if negative {
            "-"
        } else if self.plus {
            "+"
        } else if self.space {
            " "
        } else {
            ""
        }
    }

    fn float(&self, x: f64, verb: u8) -> (String, bool) {
        let upper = verb.is_ascii_uppercase();
        if x.is_nan() {
            return ("NaN".to_string(), false);
        }
        if x.is_infinite() {
            let sign = if x < 0.0 { "-" } else { "+" };
            return (format!("{}Inf", sign), false);
        }
        let body = match verb {
            b'e' | b'E' => format_exponent(x.abs(), self.precision.unwrap_or(6), upper),
            b'f' | b'F' => format!("{:.*}", self.precision.unwrap_or(6), x.abs()),
            _ => format_general(x.abs(), self.precision, upper, self.sharp),
        };
        (format!("{}{}", self.sign(x.is_sign_negative()), body), true)
    }

    fn pad(&self, body: String, numeric: bool) -> String {
        let Some(width) = self.width else {
            return body;
        };
        let len = body.chars().count();
        if len >= width {
            return body;
        }
        let fill = width - len;
        if self.minus {
            body + &" ".repeat(fill)
        } else if self.zero && numeric {
            let split = sign_prefix_len(&body);
            format!("{}{}{}", &body[..split], "0".repeat(fill), &body[split..])
        } else {
            " ".repeat(fill) + &body
        }
    }
}

fn read_number(bytes: &[u8], mut i: usize) -> (Option<usize>, usize) {
    let mut value: Option<usize> = None;
    while let Some(b) = bytes.get(i).filter(|b| b.is_ascii_digit()) {
        value = Some(value.unwrap_or(0).saturating_mul(10).saturating_add((b - b'0') as usize));
        i += 1;
    }
    (value, i)
}

fn sign_prefix_len(body: &str) -> usize {
    let mut n = 0;
    if body.starts_with(['-', '+', ' ']) {
        n = 1;
    }
    let rest = &body[n..];
    if rest.starts_with("0x") || rest.starts_with("0X") {
        n += 2;
    }
    n
}

/// `d.dddddde±dd` for a non-negative finite `x`
fn format_exponent(x: f64, precision: usize, upper: bool) -> String {
    let raw = format!("{:.*e}", precision, x);
    let (mantissa, exp) = split_exponent(&raw);
    join_exponent(mantissa, exp, upper)
}

/// Shortest of fixed or exponent notation, `%g` style
fn format_general(x: f64, precision: Option<usize>, upper: bool, keep_zeros: bool) -> String {
    match precision {
        None => {
            let raw = format!("{:e}", x);
            let (mantissa, exp) = split_exponent(&raw);
            if !(-4..21).contains(&exp) {
                join_exponent(mantissa, exp, upper)
            } else {
                x.to_string()
            }
        }
        Some(p) => {
            let p = p.max(1);
            let raw = format!("{:.*e}", p - 1, x);
            let (mantissa, exp) = split_exponent(&raw);
            if exp < -4 || exp >= p as i32 {
                let mantissa = if keep_zeros {
                    mantissa.to_string()
                } else {
                    trim_fraction(mantissa)
                };
                join_exponent(&mantissa, exp, upper)
            } else {
                let decimals = (p as i32 - 1 - exp).max(0) as usize;
                let fixed = format!("{:.*}", decimals, x);
                if keep_zeros {
                    fixed
                } else {
                    trim_fraction(&fixed)
                }
            }
        }
    }
}

fn split_exponent(s: &str) -> (&str, i32) {
    match s.split_once('e') {
        Some((mantissa, exp)) => (mantissa, exp.parse().unwrap_or(0)),
        None => (s, 0),
    }
}

fn join_exponent(mantissa: &str, exp: i32, upper: bool) -> String {
    let e = if upper { 'E' } else { 'e' };
    let sign = if exp < 0 { '-' } else { '+' };
    format!("{}{}{}{:02}", mantissa, e, sign, exp.abs())
}

fn trim_fraction(s: &str) -> String {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s.to_string()
    }
}

/// Render `format` against `args`
///
/// Missing arguments render as `%!<verb>(MISSING)`; unused ones are listed in
/// a trailing `%!(EXTRA ...)` so nothing passed to a log call is lost.
pub fn sprintf(format: &str, args: &[Arg]) -> String {
    let bytes = format.as_bytes();
    let mut out = String::with_capacity(format.len() + 16 * args.len());
    let mut next_arg = 0;
    let mut literal_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'%' {
            i += 1;
            continue;
        }
        out.push_str(&format[literal_start..i]);

        if bytes.get(i + 1) == Some(&b'%') {
            out.push('%');
            i += 2;
        } else if let Some(len) = directive_len(&bytes[i..]) {
            let directive = Directive::parse(&format[i..i + len]);
            match args.get(next_arg) {
                Some(arg) => out.push_str(&directive.render(arg)),
                None => {
                    out.push_str("%!");
                    out.push(directive.verb as char);
                    out.push_str("(MISSING)");
                }
            }
            next_arg += 1;
            i += len;
        } else {
            out.push('%');
            i += 1;
        }
        literal_start = i;
    }
    out.push_str(&format[literal_start..]);

    if next_arg < args.len() {
        let extra: Vec<String> = args[next_arg..]
            .iter()
            .map(|a| format!("{}={}", a.type_name(), a))
            .collect();
        out.push_str("%!(EXTRA ");
        out.push_str(&extra.join(", "));
        out.push(')');
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sprintf_strings_and_ints() {
        assert_eq!(
            sprintf("User %s logged in", &[Arg::from("alice")]),
            "User alice logged in"
        );
        assert_eq!(
            sprintf("%d items, %v left", &[Arg::from(3), Arg::from(-2i64)]),
            "3 items, -2 left"
        );
    }

    #[test]
    fn test_sprintf_width_and_flags() {
        assert_eq!(sprintf("[%5d]", &[Arg::from(42)]), "[   42]");
        assert_eq!(sprintf("[%-5d]", &[Arg::from(42)]), "[42   ]");
        assert_eq!(sprintf("[%05d]", &[Arg::from(-42)]), "[-0042]");
        assert_eq!(sprintf("[%+d]", &[Arg::from(7)]), "[+7]");
        assert_eq!(sprintf("[%6s]", &[Arg::from("ab")]), "[    ab]");
        assert_eq!(sprintf("[%.2s]", &[Arg::from("abcdef")]), "[ab]");
    }

    #[test]
    fn test_sprintf_radix_verbs() {
        assert_eq!(sprintf("%x", &[Arg::from(255u32)]), "ff");
        assert_eq!(sprintf("%X", &[Arg::from(255u32)]), "FF");
        assert_eq!(sprintf("%#x", &[Arg::from(255u32)]), "0xff");
        assert_eq!(sprintf("%o", &[Arg::from(8)]), "10");
        assert_eq!(sprintf("%b", &[Arg::from(5)]), "101");
        assert_eq!(sprintf("%x", &[Arg::from("hi")]), "6869");
        assert_eq!(sprintf("%08x", &[Arg::from(255)]), "000000ff");
    }

    #[test]
    fn test_sprintf_floats() {
        assert_eq!(sprintf("%f", &[Arg::from(1.5)]), "1.500000");
        assert_eq!(sprintf("%.2f", &[Arg::from(3.14159)]), "3.14");
        assert_eq!(sprintf("%e", &[Arg::from(1234.5)]), "1.234500e+03");
        assert_eq!(sprintf("%E", &[Arg::from(0.00012)]), "1.200000E-04");
        assert_eq!(sprintf("%g", &[Arg::from(0.5)]), "0.5");
        assert_eq!(sprintf("%g", &[Arg::from(1e21)]), "1e+21");
        assert_eq!(sprintf("%.3g", &[Arg::from(3.14159)]), "3.14");
        assert_eq!(sprintf("%v", &[Arg::from(2.0)]), "2");
        assert_eq!(sprintf("%8.3f", &[Arg::from(-1.0)]), "  -1.000");
    }

    #[test]
    fn test_sprintf_char_bool_quote_unicode() {
        assert_eq!(sprintf("%c", &[Arg::from(65)]), "A");
        assert_eq!(sprintf("%q", &[Arg::from("a\"b")]), "\"a\\\"b\"");
        assert_eq!(sprintf("%q", &[Arg::from('x')]), "'x'");
        assert_eq!(sprintf("%U", &[Arg::from('✓')]), "U+2713");
        assert_eq!(sprintf("%t", &[Arg::from(true)]), "true");
        assert_eq!(sprintf("%T", &[Arg::from(1u8)]), "u64");
    }

    #[test]
    fn test_sprintf_display_and_debug_values() {
        let err = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
        assert_eq!(sprintf("failed: %v", &[Arg::display(&err)]), "failed: disk gone");
        assert_eq!(sprintf("%v", &[Arg::debug(&vec![1, 2])]), "[1, 2]");
        let value = 5u8;
        let rendered = sprintf("%p", &[Arg::pointer(&value)]);
        assert!(rendered.starts_with("0x"));
    }

    #[test]
    fn test_sprintf_percent_escape_and_stray() {
        assert_eq!(sprintf("100%%", &[]), "100%");
        assert_eq!(sprintf("rate 50%!", &[]), "rate 50%!");
        // A space is a flag, so `% o` is an octal directive
        assert_eq!(sprintf("50% o", &[Arg::from(8)]), "50 10");
    }

    #[test]
    fn test_sprintf_missing_and_extra_args() {
        assert_eq!(sprintf("%s and %d", &[Arg::from("a")]), "a and %!d(MISSING)");
        assert_eq!(
            sprintf("only %s", &[Arg::from("a"), Arg::from(2)]),
            "only a%!(EXTRA i64=2)"
        );
    }

    #[test]
    fn test_sprintf_oversized_width_and_precision() {
        assert_eq!(
            sprintf("value %99999999999999999999d", &[Arg::from(1)]),
            "value %!(BADWIDTH)1"
        );
        assert_eq!(
            sprintf("%.2000000f", &[Arg::from(1.5)]),
            "%!(BADPREC)1.500000"
        );
        assert_eq!(sprintf("[%1000000d]", &[Arg::from(7)]).len(), 1_000_002);
        assert_eq!(
            sprintf("%1000001s and %d", &[Arg::from("a"), Arg::from(2)]),
            "%!(BADWIDTH)a and 2"
        );
    }

    #[test]
    fn test_to_arg_borrows() {
        let name = String::from("bob");
        let path = std::path::PathBuf::from("/tmp/x");
        let by_ref = &name;
        let args = [name.to_arg(), by_ref.to_arg(), path.to_arg(), 3u8.to_arg()];
        assert_eq!(sprintf("%s %s %s %d", &args), "bob bob /tmp/x 3");
        assert_eq!(name, "bob");
    }

    #[test]
    fn test_sprintf_bad_verb_for_argument() {
        assert_eq!(sprintf("%t", &[Arg::from(1)]), "%!t(i64=1)");
    }

    #[test]
    fn test_sprintf_ignores_escape_codes() {
        let colored = "\x1b[92mUser \x1b[0m\x1b[93m%s\x1b[0m";
        assert_eq!(
            sprintf(colored, &[Arg::from("alice")]),
            "\x1b[92mUser \x1b[0m\x1b[93malice\x1b[0m"
        );
    }
}
