use std::fmt;

/// Who is signed in, if anyone.
///
/// The token is only ever set from a successful login or registration
/// response. Every sign-in and sign-out starts a new generation, so work
/// issued under one session can be told apart from the next.
#[derive(Default, Clone)]
pub struct Session {
    token: Option<String>,
    username: Option<String>,
    generation: u64,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn sign_in(&mut self, token: impl Into<String>, username: impl Into<String>) {
        self.token = Some(token.into());
        self.username = Some(username.into());
        self.generation += 1;
    }

    pub fn clear(&mut self) {
        self.token = None;
        self.username = None;
        self.generation += 1;
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("username", &self.username)
            .field("generation", &self.generation)
            .finish()
    }
}
