//! Caller identity for log prefixes
//!
//! The emission macros capture the qualified name of the enclosing function at
//! compile time. The name is split at its last `::` into a scope (module or
//! type path) and a method, which become the `[pkg--..--][method--..--] `
//! prefix on every non-info line.

/// Path separator inside a qualified function name
pub const SEPARATOR: &str = "::";

/// Name of the helper item the [`call_site!`](crate::call_site) macro declares
#[doc(hidden)]
pub const HELPER_ITEM: &str = "__svclog_call_site";

const CLOSURE_SEGMENT: &str = "{{closure}}";

/// Compile-time identity of the code that emitted a log line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallSite {
    qualified: &'static str,
    file: &'static str,
    line: u32,
}

impl CallSite {
    /// Create a call site from an explicit qualified name
    pub const fn new(qualified: &'static str) -> Self {
        Self {
            qualified,
            file: "",
            line: 0,
        }
    }

    /// Create a call site with source location
    pub const fn with_location(qualified: &'static str, file: &'static str, line: u32) -> Self {
        Self {
            qualified,
            file,
            line,
        }
    }

    /// Qualified name of the calling function, e.g. `app::store::Store::save`
    pub fn qualified_name(&self) -> &'static str {
        self.qualified
    }

    /// Source file of the call, empty when unknown
    pub fn file(&self) -> &'static str {
        self.file
    }

    /// Source line of the call, zero when unknown
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Split the qualified name into `(scope, method)`
    pub fn split(&self) -> Option<(&'static str, &'static str)> {
        split_qualified_name(self.qualified)
    }
}

/// Turn the raw `type_name` of the macro helper into the enclosing function's name
///
/// Drops the helper item and any `{{closure}}` segments so a log call inside a
/// closure or async block is attributed to the function that contains it.
#[doc(hidden)]
pub fn enclosing_function(raw: &'static str) -> &'static str {
    let mut name = raw
        .strip_suffix(HELPER_ITEM)
        .and_then(|n| n.strip_suffix(SEPARATOR))
        .unwrap_or(raw);
    while let Some(outer) = name
        .strip_suffix(CLOSURE_SEGMENT)
        .and_then(|n| n.strip_suffix(SEPARATOR))
    {
        name = outer;
    }
    name
}

/// Split `name` at its last separator
///
/// Fails when there is no separator, when it opens the name or when it
/// closes it.
pub fn split_qualified_name(name: &str) -> Option<(&str, &str)> {
    let idx = name.rfind(SEPARATOR)?;
    if idx == 0 || idx + SEPARATOR.len() == name.len() {
        return None;
    }
    Some((&name[..idx], &name[idx + SEPARATOR.len()..]))
}

/// Render the prefix for a call site, `None` if the name cannot be split
///
/// A `None` here makes the registry drop the whole log call.
pub fn caller_prefix(site: &CallSite) -> Option<String> {
    let (scope, method) = site.split()?;
    Some(format!("[pkg--{}--][method--{}--] ", scope, method))
}

/// Capture the [`CallSite`] of the enclosing function
#[macro_export]
macro_rules! call_site {
    () => {{
        fn __svclog_call_site() {}
        fn __svclog_name_of<T>(_: T) -> &'static str {
            ::core::any::type_name::<T>()
        }
        $crate::CallSite::with_location(
            $crate::caller::enclosing_function(__svclog_name_of(__svclog_call_site)),
            file!(),
            line!(),
        )
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TypeY;

    impl TypeY {
        fn method_z(&self) -> CallSite {
            crate::call_site!()
        }
    }

    #[test]
    fn test_split_qualified_name() {
        assert_eq!(
            split_qualified_name("pkg_x::TypeY::method_z"),
            Some(("pkg_x::TypeY", "method_z"))
        );
        assert_eq!(split_qualified_name("a::b"), Some(("a", "b")));
    }

    #[test]
    fn test_split_rejects_malformed_names() {
        assert_eq!(split_qualified_name("no_separator"), None);
        assert_eq!(split_qualified_name("::leading"), None);
        assert_eq!(split_qualified_name("trailing::"), None);
        assert_eq!(split_qualified_name(""), None);
    }

    #[test]
    fn test_caller_prefix_format() {
        let site = CallSite::new("pkgX::TypeY::MethodZ");
        assert_eq!(
            caller_prefix(&site).unwrap(),
            "[pkg--pkgX::TypeY--][method--MethodZ--] "
        );
        assert!(caller_prefix(&CallSite::new("main")).is_none());
    }

    #[test]
    fn test_call_site_macro_names_enclosing_function() {
        let site = crate::call_site!();
        assert_eq!(
            site.qualified_name(),
            "svclog::caller::tests::test_call_site_macro_names_enclosing_function"
        );
        assert!(site.file().ends_with("caller.rs"));
        assert!(site.line() > 0);
    }

    #[test]
    fn test_call_site_macro_inside_method() {
        let site = TypeY.method_z();
        let (scope, method) = site.split().unwrap();
        assert!(scope.ends_with("TypeY"));
        assert_eq!(method, "method_z");
    }

    #[test]
    fn test_call_site_macro_inside_closure() {
        let capture = || crate::call_site!();
        let site = capture();
        assert_eq!(
            site.split().map(|(_, method)| method),
            Some("test_call_site_macro_inside_closure")
        );
    }

    #[test]
    fn test_enclosing_function_strips_helper_and_closures() {
        assert_eq!(
            enclosing_function("app::run::{{closure}}::{{closure}}::__svclog_call_site"),
            "app::run"
        );
        assert_eq!(enclosing_function("app::run"), "app::run");
    }
}
