pub(crate) mod http;

pub(crate) use http::{assert_error, state_with_connection, with_user};
