use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    #[display("invalid configuration")]
    Config,
    /// Backend or HTTP clients could not be constructed.
    #[display("could not initialise")]
    Setup,
    #[display("reconciliation cycle failed")]
    Cycle,
}
