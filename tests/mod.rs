mod common;

mod api_tests;
mod logging_tests;
