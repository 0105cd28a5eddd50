/// Integration tests for the readmission pipeline
/// Run specific tests with `cargo test <module>::<submodule>`
/// For example: `cargo test pipeline::end_to_end_test`
// Utility modules
pub mod utils;

// Whole-pipeline tests
pub mod pipeline {
    pub mod chunking_test;
    pub mod end_to_end_test;
    pub mod extract_test;
    pub mod synthetic_test;
}

// Stage tests
pub mod algorithm {
    pub mod checkpoint_test;
    pub mod model_test;
    pub mod utilization_test;
}
