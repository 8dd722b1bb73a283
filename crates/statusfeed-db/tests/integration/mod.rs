
mod catalog_tests;
mod feed_tests;
mod fingerprint_tests;
mod job_tests;
mod lock_tests;
mod sqlite_tests;
