pub(crate) mod multipart_tests;
pub(crate) mod server_tests;
