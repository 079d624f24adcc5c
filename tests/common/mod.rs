#![allow(dead_code)]

pub use runtree_test_utils::recorder::{Recorder, captured_options, captured_options_in};
pub use runtree_test_utils::{init_tracing, with_timeout};
