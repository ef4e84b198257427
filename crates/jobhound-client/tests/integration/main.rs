mod common;
mod guard_tests;
mod pipeline_tests;
mod redis_tests;
