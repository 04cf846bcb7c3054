pub mod attendance_session;
pub mod authorization;
pub mod course;
pub mod identity;
pub mod token;

pub use attendance_session::{
    build_check_in_url, AttendanceSessionManager, AttendanceStatusView, CheckInOutcome,
    CheckInPolicy, SessionError,
};
pub use authorization::{AuthorizationGate, Caller, GateDecision};
pub use course::{CourseError, CourseService, EnrollmentOutcome};
pub use identity::{Identity, IdentityVerifier, JwtIdentityVerifier};
pub use token::{RandomTokenGenerator, TokenGenerator};
