//! Conversions between QuickJS values and Rust types

use crate::error::{RuntimeError, RuntimeResult};
use rquickjs::convert::Coerced;
use rquickjs::{CaughtError, Value};

/// Convert a value to a string the way JavaScript's `String(value)` does.
pub fn coerce_string(value: &Value<'_>) -> RuntimeResult<String> {
    let Coerced(text) = value.get::<Coerced<String>>()?;
    Ok(text)
}

/// Whether the value is `null` or `undefined`
pub fn is_nullish(value: &Value<'_>) -> bool {
    value.is_null() || value.is_undefined()
}

/// Extract a structured error from a caught JavaScript exception.
///
/// `source_name` fills in the file when QuickJS did not record one.
pub fn extract_exception(caught: CaughtError<'_>, source_name: &str) -> RuntimeError {
    match caught {
        CaughtError::Exception(exc) => {
            let obj = exc.as_object();
            let error_type = obj
                .get::<_, Option<String>>("name")
                .ok()
                .flatten()
                .unwrap_or_else(|| "Error".to_string());
            let message = exc.message().unwrap_or_default();
            let file = obj
                .get::<_, Option<String>>("fileName")
                .ok()
                .flatten()
                .filter(|f| !f.is_empty())
                .or_else(|| Some(source_name.to_string()));
            let line = obj
                .get::<_, Option<i32>>("lineNumber")
                .ok()
                .flatten()
                .and_then(|l| u32::try_from(l).ok());
            let column = obj
                .get::<_, Option<i32>>("columnNumber")
                .ok()
                .flatten()
                .and_then(|c| u32::try_from(c).ok());

            RuntimeError::Script {
                error_type,
                message,
                file,
                line,
                column,
            }
        }
        CaughtError::Value(value) => {
            // `throw "text"` and friends
            let message = coerce_string(&value).unwrap_or_else(|_| value.type_name().to_string());
            RuntimeError::Script {
                error_type: "Uncaught".to_string(),
                message,
                file: Some(source_name.to_string()),
                line: None,
                column: None,
            }
        }
        CaughtError::Error(err) => RuntimeError::from(err),
    }
}
