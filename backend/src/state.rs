use std::sync::Arc;

use crate::{
    config::Config,
    db::connection::DbPool,
    repositories::{
        CourseRepository, CourseStore, PgCourseRepository, PgCourseStore, PgUserDirectory,
        UserDirectory,
    },
    services::{
        AttendanceSessionManager, AuthorizationGate, CheckInPolicy, CourseService,
        IdentityVerifier, JwtIdentityVerifier, RandomTokenGenerator, TokenGenerator,
    },
};

/// Store adapters the services are built over.
pub struct Stores {
    pub directory: Arc<dyn UserDirectory>,
    pub courses: Arc<dyn CourseRepository>,
    pub sessions: Arc<dyn CourseStore>,
    pub tokens: Arc<dyn TokenGenerator>,
}

impl Stores {
    pub fn postgres(pool: &DbPool) -> Self {
        Self {
            directory: Arc::new(PgUserDirectory::new(pool.clone())),
            courses: Arc::new(PgCourseRepository::new(pool.clone())),
            sessions: Arc::new(PgCourseStore::new(pool.clone())),
            tokens: Arc::new(RandomTokenGenerator::new()),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub config: Config,
    pub identity: Arc<dyn IdentityVerifier>,
    pub gate: AuthorizationGate,
    pub sessions: AttendanceSessionManager,
    pub courses: CourseService,
}

impl AppState {
    pub fn new(pool: DbPool, config: Config) -> Self {
        let stores = Stores::postgres(&pool);
        Self::with_stores(pool, config, stores)
    }

    /// Wires the services over arbitrary store adapters. The pool is only used for health checks.
    pub fn with_stores(pool: DbPool, config: Config, stores: Stores) -> Self {
        let policy = CheckInPolicy {
            require_token: config.check_in_requires_token,
            require_enrollment: config.check_in_requires_enrollment,
        };
        Self {
            identity: Arc::new(JwtIdentityVerifier::new(config.jwt_secret.clone())),
            gate: AuthorizationGate::new(stores.directory.clone(), config.role_lookup_timeout()),
            sessions: AttendanceSessionManager::new(
                stores.sessions,
                stores.tokens,
                policy,
                config.session_create_attempts,
            ),
            courses: CourseService::new(stores.courses, stores.directory),
            pool,
            config,
        }
    }
}
