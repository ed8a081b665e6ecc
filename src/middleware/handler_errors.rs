//! Errors recorded by handlers on an otherwise normal response

use std::convert::Infallible;

use axum::response::{IntoResponseParts, Response, ResponseParts};

/// Ordered error messages a handler attached to its response.
///
/// The status code alone does not tell the telemetry middleware that a
/// handler failed internally; a handler returning 200 with a recorded error is
/// still logged as a failure and has the error recorded on its span.
///
/// ```ignore
/// async fn handler() -> impl IntoResponse {
///     (StatusCode::INTERNAL_SERVER_ERROR, HandlerErrors::from("db timeout"), "oops")
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandlerErrors(Vec<String>);

impl HandlerErrors {
    pub fn push(&mut self, message: impl ToString) {
        self.0.push(message.to_string());
    }

    pub fn messages(&self) -> &[String] {
        &self.0
    }

    /// Append an error to the response, keeping any recorded earlier.
    pub fn attach(response: &mut Response, message: impl ToString) {
        let extensions = response.extensions_mut();
        match extensions.get_mut::<HandlerErrors>() {
            Some(errors) => errors.push(message),
            None => {
                extensions.insert(HandlerErrors(vec![message.to_string()]));
            }
        }
    }
}

impl From<&str> for HandlerErrors {
    fn from(message: &str) -> Self {
        Self(vec![message.to_string()])
    }
}

impl From<String> for HandlerErrors {
    fn from(message: String) -> Self {
        Self(vec![message])
    }
}

impl From<Vec<String>> for HandlerErrors {
    fn from(messages: Vec<String>) -> Self {
        Self(messages)
    }
}

impl IntoResponseParts for HandlerErrors {
    type Error = Infallible;

    fn into_response_parts(self, mut res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        res.extensions_mut().insert(self);
        Ok(res)
    }
}
