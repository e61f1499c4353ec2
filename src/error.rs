use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtwError {
    #[error("backend rejected provider registration with status {0}")]
    RegistrationFailed(u32),
    #[error("provider names must not contain embedded NUL characters: {0:?}")]
    InvalidProviderNameCharacters(String),
}
