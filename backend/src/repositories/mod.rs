pub mod common;
pub mod course;
pub mod course_store;
#[cfg(any(test, feature = "test-utils"))]
pub mod memory;
pub mod user;

pub use common::*;
pub use course::{CourseRepository, PgCourseRepository};
pub use course_store::{CourseStore, PgCourseStore};
pub use user::{PgUserDirectory, UserDirectory};
