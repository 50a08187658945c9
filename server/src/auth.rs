//! Identity collaborator. The room subsystem never inspects credentials; it
//! only needs "opaque token in, identity out".

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: String,
    pub display_name: String,
}

impl Identity {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Identity {
            id: id.into(),
            display_name: display_name.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidCredential;

pub trait Authenticator: Send + Sync {
    fn authenticate(&self, token: &str) -> Result<Identity, InvalidCredential>;
}

/// Development authenticator backing the binary: accepts `"<id>:<name>"`
/// tokens. A deployment substitutes its own implementation (session lookup,
/// JWT validation, ...) behind the same trait.
pub struct TokenAuth;

impl Authenticator for TokenAuth {
    fn authenticate(&self, token: &str) -> Result<Identity, InvalidCredential> {
        let (id, name) = token.split_once(':').ok_or(InvalidCredential)?;
        if id.is_empty() || name.is_empty() {
            return Err(InvalidCredential);
        }
        Ok(Identity::new(id, name))
    }
}
