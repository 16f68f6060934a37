use thiserror::Error;

#[derive(Error, Debug)]
pub enum AccountsError {
    /// The owner to account mapping could not be read
    #[error("Account store unavailable: {0}")]
    Unavailable(String),
}
