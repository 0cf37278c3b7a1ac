//! Renders compile errors into their fixed, location-anchored form.

use crate::error::CompileError;

/// `<message> (file: <f>, line: <l>, column: <c>)`, followed by
/// `\nCaused by: <cause>` when the error wraps a collaborator failure.
pub fn format(error: &CompileError) -> String {
    let mut out = format!("{} {}", error.message, error.origin);
    if let Some(cause) = &error.cause {
        out.push_str("\nCaused by: ");
        out.push_str(cause);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::Origin;

    #[test]
    fn plain_message() {
        let err = CompileError::unresolved_type(
            "No::Such::Type",
            Origin::new("testdata/typefail.yaml", 3, 5),
        );
        insta::assert_snapshot!(
            format(&err),
            @"Reference to unresolved type 'No::Such::Type' (file: testdata/typefail.yaml, line: 3, column: 5)"
        );
    }

    #[test]
    fn cause_is_kept_verbatim() {
        let err = CompileError::type_mismatch(
            "typemismatchfail",
            "bad value (file: internal.rs, line: 316)",
            Origin::new("testdata/typemismatchfail.yaml", 11, 7),
        );
        assert_eq!(
            format(&err),
            "error while building call typemismatchfail (file: testdata/typemismatchfail.yaml, line: 11, column: 7)\nCaused by: bad value (file: internal.rs, line: 316)"
        );
    }
}
