//! The single message type every service is dispatched over.

use super::blog::*;
use super::calculator::*;
use super::greet::*;
use serde::{Deserialize, Serialize};
use streamcall::Status;

/// Declares [`Message`] with one variant per payload type (named after the
/// type), plus `From<T> for Message` and `TryFrom<Message> for T`.
macro_rules! messages {
    ($($payload:ident),+ $(,)?) => {
        /// Any request or response of any service.
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        #[serde(tag = "type", content = "body")]
        pub enum Message {
            $($payload($payload)),+
        }

        impl Message {
            /// The payload type name, for logs and error messages.
            pub fn kind(&self) -> &'static str {
                match self {
                    $(Message::$payload(_) => stringify!($payload)),+
                }
            }
        }

        $(
            impl From<$payload> for Message {
                fn from(msg: $payload) -> Self {
                    Message::$payload(msg)
                }
            }

            impl TryFrom<Message> for $payload {
                type Error = Status;

                fn try_from(msg: Message) -> Result<Self, Status> {
                    match msg {
                        Message::$payload(inner) => Ok(inner),
                        other => Err(Status::invalid_argument(format!(
                            "expected {}, got {}",
                            stringify!($payload),
                            other.kind()
                        ))),
                    }
                }
            }
        )+
    };
}

messages! {
    CreateResourceRequest,
    CreateResourceResponse,
    ReadResourceRequest,
    ReadResourceResponse,
    UpdateResourceRequest,
    UpdateResourceResponse,
    DeleteResourceRequest,
    DeleteResourceResponse,
    ListResourcesRequest,
    ListResourcesResponse,
    SumRequest,
    SumResponse,
    SquareRootRequest,
    SquareRootResponse,
    PrimeDecompositionRequest,
    PrimeDecompositionResponse,
    ComputeAverageRequest,
    ComputeAverageResponse,
    FindMaximumRequest,
    FindMaximumResponse,
    GreetRequest,
    GreetResponse,
}
