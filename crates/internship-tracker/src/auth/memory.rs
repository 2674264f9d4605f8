use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use super::password::{hash_password, verify_password, DEFAULT_PASSWORD_COST};
use super::{AuthError, Authenticator, Credentials, Registration, Session, UserProfile};
use crate::applications::OwnerId;
use crate::clock::Clock;

struct UserRecord {
    profile: UserProfile,
    password_hash: String,
}

struct SessionGrant {
    user: OwnerId,
    expires_at: DateTime<Utc>,
}

#[derive(Default)]
struct AuthTables {
    users: Vec<UserRecord>,
    sessions: HashMap<String, SessionGrant>,
    last_id: u64,
}

/// Process-local accounts and sessions. Tokens are opaque v4 uuids valid for
/// `session_ttl` after login; expired grants are dropped on the next login.
pub struct InMemoryAuthenticator {
    tables: Mutex<AuthTables>,
    clock: Arc<dyn Clock>,
    session_ttl: Duration,
    password_cost: u32,
}

impl InMemoryAuthenticator {
    pub fn new(clock: Arc<dyn Clock>, session_ttl: Duration) -> Self {
        Self {
            tables: Mutex::new(AuthTables::default()),
            clock,
            session_ttl,
            password_cost: DEFAULT_PASSWORD_COST,
        }
    }

    /// bcrypt work factor for newly registered passwords.
    pub fn with_password_cost(mut self, cost: u32) -> Self {
        self.password_cost = cost;
        self
    }

    fn lock(&self) -> Result<MutexGuard<'_, AuthTables>, AuthError> {
        self.tables
            .lock()
            .map_err(|_| AuthError::Unavailable("account table lock poisoned".into()))
    }
}

impl Authenticator for InMemoryAuthenticator {
    fn register(&self, registration: Registration) -> Result<UserProfile, AuthError> {
        let username = registration.username.trim().to_string();
        let email = registration.email.trim().to_string();
        if username.is_empty() {
            return Err(AuthError::InvalidRegistration("username is required"));
        }
        if !email.contains('@') {
            return Err(AuthError::InvalidRegistration("a valid email is required"));
        }
        if registration.password.is_empty() {
            return Err(AuthError::InvalidRegistration("password is required"));
        }

        let password_hash = hash_password(&registration.password, self.password_cost)?;
        let mut tables = self.lock()?;
        if tables
            .users
            .iter()
            .any(|user| user.profile.username == username)
        {
            return Err(AuthError::UsernameTaken);
        }
        if tables.users.iter().any(|user| user.profile.email == email) {
            return Err(AuthError::EmailTaken);
        }

        tables.last_id += 1;
        let profile = UserProfile {
            id: OwnerId(tables.last_id),
            username,
            email,
            age: registration.age,
            gender: registration.gender,
            phone: registration.phone,
            last_login_at: None,
        };
        tables.users.push(UserRecord {
            profile: profile.clone(),
            password_hash,
        });

        info!(user_id = %profile.id, "user registered");
        Ok(profile)
    }

    fn login(&self, credentials: Credentials) -> Result<Session, AuthError> {
        let now = self.clock.now();
        let email = credentials.email.trim();
        let stored = {
            let tables = self.lock()?;
            let stored = tables
                .users
                .iter()
                .find(|user| user.profile.email == email)
                .map(|user| (user.profile.id, user.password_hash.clone()));
            stored
        };

        let Some((user_id, password_hash)) = stored else {
            warn!("login attempted for unknown email");
            return Err(AuthError::InvalidCredentials);
        };
        if !verify_password(&credentials.password, &password_hash) {
            warn!(%user_id, "login rejected: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let mut tables = self.lock()?;
        let Some(user) = tables
            .users
            .iter_mut()
            .find(|user| user.profile.id == user_id)
        else {
            return Err(AuthError::UnknownUser);
        };
        user.profile.last_login_at = Some(now);
        let profile = user.profile.clone();
        let token = Uuid::new_v4().simple().to_string();
        let expires_at = now + self.session_ttl;
        tables.sessions.retain(|_, grant| grant.expires_at > now);
        tables.sessions.insert(
            token.clone(),
            SessionGrant {
                user: profile.id,
                expires_at,
            },
        );

        info!(user_id = %profile.id, %expires_at, "session issued");
        Ok(Session {
            token,
            expires_at,
            user: profile,
        })
    }

    fn authorize(&self, token: &str) -> Result<OwnerId, AuthError> {
        let now = self.clock.now();
        let mut tables = self.lock()?;
        let Some(grant) = tables.sessions.get(token) else {
            return Err(AuthError::InvalidToken);
        };
        if grant.expires_at <= now {
            tables.sessions.remove(token);
            return Err(AuthError::SessionExpired);
        }
        Ok(grant.user)
    }

    fn profile(&self, user: OwnerId) -> Result<UserProfile, AuthError> {
        let tables = self.lock()?;
        let profile = tables
            .users
            .iter()
            .find(|record| record.profile.id == user)
            .map(|record| record.profile.clone());
        profile.ok_or(AuthError::UnknownUser)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::MIN_PASSWORD_COST;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicI64, Ordering};

    struct SteppingClock {
        seconds: AtomicI64,
    }

    impl SteppingClock {
        fn advance(&self, by: Duration) {
            self.seconds.fetch_add(by.num_seconds(), Ordering::SeqCst);
        }
    }

    impl Clock for SteppingClock {
        fn now(&self) -> DateTime<Utc> {
            Utc.timestamp_opt(self.seconds.load(Ordering::SeqCst), 0)
                .single()
                .expect("valid timestamp")
        }
    }

    fn authenticator() -> (Arc<SteppingClock>, InMemoryAuthenticator) {
        let clock = Arc::new(SteppingClock {
            seconds: AtomicI64::new(1_735_689_600),
        });
        let auth = InMemoryAuthenticator::new(clock.clone(), Duration::hours(24))
            .with_password_cost(MIN_PASSWORD_COST);
        (clock, auth)
    }

    fn registration(username: &str, email: &str) -> Registration {
        Registration {
            username: username.to_string(),
            email: email.to_string(),
            password: "s3cret".to_string(),
            ..Registration::default()
        }
    }

    #[test]
    fn register_then_login_issues_a_token_for_the_user() {
        let (_, auth) = authenticator();
        let profile = auth
            .register(registration("winter", "winter@example.com"))
            .expect("registers");

        let session = auth
            .login(Credentials {
                email: "winter@example.com".to_string(),
                password: "s3cret".to_string(),
            })
            .expect("logs in");

        assert_eq!(session.user.id, profile.id);
        assert!(session.user.last_login_at.is_some());
        assert_eq!(auth.authorize(&session.token).expect("authorized"), profile.id);
    }

    #[test]
    fn duplicate_username_and_email_are_rejected() {
        let (_, auth) = authenticator();
        auth.register(registration("winter", "winter@example.com"))
            .expect("registers");

        assert!(matches!(
            auth.register(registration("winter", "other@example.com")),
            Err(AuthError::UsernameTaken)
        ));
        assert!(matches!(
            auth.register(registration("summer", "winter@example.com")),
            Err(AuthError::EmailTaken)
        ));
    }

    #[test]
    fn wrong_password_and_unknown_email_look_the_same() {
        let (_, auth) = authenticator();
        auth.register(registration("winter", "winter@example.com"))
            .expect("registers");

        let wrong = auth.login(Credentials {
            email: "winter@example.com".to_string(),
            password: "nope".to_string(),
        });
        let unknown = auth.login(Credentials {
            email: "nobody@example.com".to_string(),
            password: "s3cret".to_string(),
        });
        assert!(matches!(wrong, Err(AuthError::InvalidCredentials)));
        assert!(matches!(unknown, Err(AuthError::InvalidCredentials)));
    }

    #[test]
    fn sessions_expire_after_the_ttl() {
        let (clock, auth) = authenticator();
        auth.register(registration("winter", "winter@example.com"))
            .expect("registers");
        let session = auth
            .login(Credentials {
                email: "winter@example.com".to_string(),
                password: "s3cret".to_string(),
            })
            .expect("logs in");

        clock.advance(Duration::hours(24));
        assert!(matches!(
            auth.authorize(&session.token),
            Err(AuthError::SessionExpired)
        ));
        assert!(matches!(
            auth.authorize(&session.token),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn login_forgets_expired_sessions() {
        let (clock, auth) = authenticator();
        auth.register(registration("winter", "winter@example.com"))
            .expect("registers");
        let credentials = || Credentials {
            email: "winter@example.com".to_string(),
            password: "s3cret".to_string(),
        };
        let mut stale = Vec::new();
        for _ in 0..5 {
            stale.push(auth.login(credentials()).expect("logs in").token);
        }

        clock.advance(Duration::hours(48));
        let fresh = auth.login(credentials()).expect("logs in");

        let tables = auth.tables.lock().expect("tables lock");
        assert_eq!(tables.sessions.len(), 1);
        assert!(tables.sessions.contains_key(&fresh.token));
        assert!(stale.iter().all(|token| !tables.sessions.contains_key(token)));
    }

    #[test]
    fn passwords_are_stored_as_bcrypt_hashes() {
        let (_, auth) = authenticator();
        auth.register(registration("winter", "winter@example.com"))
            .expect("registers");

        let tables = auth.tables.lock().expect("tables lock");
        let stored = &tables.users[0].password_hash;
        assert!(stored.starts_with("$2b$04$"));
        assert!(!stored.contains("s3cret"));
    }

    #[test]
    fn registration_requires_username_email_and_password() {
        let (_, auth) = authenticator();
        assert!(matches!(
            auth.register(registration(" ", "a@example.com")),
            Err(AuthError::InvalidRegistration(_))
        ));
        assert!(matches!(
            auth.register(registration("winter", "not-an-email")),
            Err(AuthError::InvalidRegistration(_))
        ));
    }
}
